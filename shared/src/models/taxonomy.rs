//! Rice leaf disease class taxonomy

use serde::Serialize;

/// Class names in the order the classifier emits them
pub const RICE_CLASSES: [&str; 7] = [
    "Bacterial_leaf_blight",
    "Brown_spot",
    "Healthy",
    "Leaf_blast",
    "Leaf_scald",
    "Sheath_blight",
    "Tungro",
];

/// Name of the class that denotes a disease-free leaf
pub const HEALTHY_CLASS: &str = "Healthy";

/// Fixed, ordered list of classes with one designated healthy class.
///
/// The order is the index order of every probability vector and the
/// tie-break order for label selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassTaxonomy {
    names: Vec<String>,
    healthy_index: usize,
}

/// Reasons a taxonomy cannot be built
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaxonomyError {
    #[error("taxonomy must contain at least one class")]
    Empty,

    #[error("duplicate class name: {0}")]
    DuplicateClass(String),

    #[error("healthy class {0} is not part of the taxonomy")]
    MissingHealthy(String),
}

impl ClassTaxonomy {
    pub fn new<I, S>(names: I, healthy: &str) -> Result<Self, TaxonomyError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.is_empty() {
            return Err(TaxonomyError::Empty);
        }
        for (i, name) in names.iter().enumerate() {
            if names[..i].contains(name) {
                return Err(TaxonomyError::DuplicateClass(name.clone()));
            }
        }
        let healthy_index = names
            .iter()
            .position(|n| n == healthy)
            .ok_or_else(|| TaxonomyError::MissingHealthy(healthy.to_string()))?;

        Ok(Self {
            names,
            healthy_index,
        })
    }

    /// The seven-class rice taxonomy
    pub fn rice() -> Self {
        Self {
            names: RICE_CLASSES.iter().map(|s| s.to_string()).collect(),
            healthy_index: 2,
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn healthy_index(&self) -> usize {
        self.healthy_index
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }
}

impl Default for ClassTaxonomy {
    fn default() -> Self {
        Self::rice()
    }
}
