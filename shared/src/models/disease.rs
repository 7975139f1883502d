//! Static disease metadata with per-language text

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::Language;

/// Cause text for diseases the catalog does not know
pub const INFORMATION_NOT_AVAILABLE: &str = "Information not available";

/// Localized description of one disease
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LanguageBlock {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub local_name: String,
    #[serde(default)]
    pub cause: String,
    #[serde(default)]
    pub solutions: Vec<String>,
    #[serde(default, alias = "pesticicides")]
    pub pesticides: Vec<String>,
}

/// One disease as stored in the catalog file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiseaseEntry {
    pub id: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub languages: BTreeMap<String, LanguageBlock>,
    #[serde(default)]
    pub cure_steps: Vec<String>,
    #[serde(default)]
    pub recommended_pesticides: Vec<serde_json::Value>,
    #[serde(default)]
    pub eligible_schemes: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    diseases: Vec<DiseaseEntry>,
}

/// Disease details resolved for one language
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiseaseInfo {
    pub id: String,
    pub name: String,
    pub local_name: String,
    pub cause: String,
    pub solutions: Vec<String>,
    pub pesticides: Vec<String>,
    pub cure_steps: Vec<String>,
    pub recommended_pesticides: Vec<serde_json::Value>,
    pub eligible_schemes: Vec<serde_json::Value>,
    pub image_url: String,
    pub all_languages: BTreeMap<String, LanguageBlock>,
    /// False when the id is unknown and this is the default record
    pub found: bool,
}

impl DiseaseInfo {
    /// Record returned for ids missing from the catalog
    pub fn unavailable(id: &str) -> Self {
        Self {
            id: id.to_string(),
            name: id.to_string(),
            local_name: id.to_string(),
            cause: INFORMATION_NOT_AVAILABLE.to_string(),
            solutions: Vec::new(),
            pesticides: Vec::new(),
            cure_steps: Vec::new(),
            recommended_pesticides: Vec::new(),
            eligible_schemes: Vec::new(),
            image_url: String::new(),
            all_languages: BTreeMap::new(),
            found: false,
        }
    }
}

/// Short listing entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiseaseSummary {
    pub id: String,
    pub name: String,
    pub local_name: String,
    pub image_url: String,
}

/// Read-only catalog of disease metadata
#[derive(Debug, Clone, Default)]
pub struct DiseaseCatalog {
    entries: Vec<DiseaseEntry>,
}

impl DiseaseCatalog {
    pub fn new(entries: Vec<DiseaseEntry>) -> Self {
        Self { entries }
    }

    /// Parse the `{"diseases": [...]}` catalog format
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let file: CatalogFile = serde_json::from_str(json)?;
        Ok(Self::new(file.diseases))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&DiseaseEntry> {
        self.entries.iter().find(|d| d.id == id)
    }

    /// Details for `id` in `lang`, falling back to English text and then
    /// to the default record
    pub fn lookup(&self, id: &str, lang: Language) -> DiseaseInfo {
        let Some(entry) = self.get(id) else {
            return DiseaseInfo::unavailable(id);
        };

        let block = entry
            .languages
            .get(lang.catalog_key())
            .or_else(|| entry.languages.get(Language::English.catalog_key()))
            .cloned()
            .unwrap_or_default();

        let all_languages = Language::ALL
            .iter()
            .map(|l| {
                let key = l.catalog_key();
                (
                    key.to_string(),
                    entry.languages.get(key).cloned().unwrap_or_default(),
                )
            })
            .collect();

        DiseaseInfo {
            id: entry.id.clone(),
            name: block.name.clone().unwrap_or_else(|| entry.id.clone()),
            local_name: block.local_name,
            cause: block.cause,
            solutions: block.solutions,
            pesticides: block.pesticides,
            cure_steps: entry.cure_steps.clone(),
            recommended_pesticides: entry.recommended_pesticides.clone(),
            eligible_schemes: entry.eligible_schemes.clone(),
            image_url: entry.image_url.clone(),
            all_languages,
            found: true,
        }
    }

    /// English name and local name of every disease
    pub fn summaries(&self) -> Vec<DiseaseSummary> {
        self.entries
            .iter()
            .map(|d| {
                let english = d.languages.get(Language::English.catalog_key());
                DiseaseSummary {
                    id: d.id.clone(),
                    name: english
                        .and_then(|b| b.name.clone())
                        .unwrap_or_else(|| d.id.clone()),
                    local_name: english.map(|b| b.local_name.clone()).unwrap_or_default(),
                    image_url: d.image_url.clone(),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"{
        "diseases": [
            {
                "id": "Brown_spot",
                "image_url": "https://example.org/brown_spot.jpg",
                "languages": {
                    "english": {
                        "name": "Brown Spot",
                        "local_name": "Brown spot",
                        "cause": "Fungus Bipolaris oryzae",
                        "solutions": ["Balanced fertilization"],
                        "pesticides": ["Mancozeb"]
                    },
                    "hindi": {
                        "name": "भूरा धब्बा",
                        "local_name": "भूरा धब्बा रोग",
                        "cause": "कवक",
                        "solutions": [],
                        "pesticicides": ["मैनकोजेब"]
                    }
                },
                "cure_steps": ["Remove infected stubble"],
                "eligible_schemes": [{"name": "PMFBY"}]
            }
        ]
    }"#;

    #[test]
    fn test_lookup_in_requested_language() {
        let catalog = DiseaseCatalog::from_json(CATALOG).unwrap();
        let info = catalog.lookup("Brown_spot", Language::Hindi);
        assert!(info.found);
        assert_eq!(info.name, "भूरा धब्बा");
        assert_eq!(info.pesticides, vec!["मैनकोजेब".to_string()]);
        assert_eq!(info.cure_steps, vec!["Remove infected stubble".to_string()]);
        assert_eq!(info.all_languages.len(), 4);
    }

    #[test]
    fn test_lookup_falls_back_to_english() {
        let catalog = DiseaseCatalog::from_json(CATALOG).unwrap();
        let info = catalog.lookup("Brown_spot", Language::Kannada);
        assert_eq!(info.name, "Brown Spot");
        assert_eq!(info.cause, "Fungus Bipolaris oryzae");
    }

    #[test]
    fn test_unknown_disease_gets_default_record() {
        let catalog = DiseaseCatalog::from_json(CATALOG).unwrap();
        let info = catalog.lookup("Tungro", Language::English);
        assert!(!info.found);
        assert_eq!(info.name, "Tungro");
        assert_eq!(info.cause, INFORMATION_NOT_AVAILABLE);
        assert!(info.solutions.is_empty());
    }

    #[test]
    fn test_summaries_use_english_names() {
        let catalog = DiseaseCatalog::from_json(CATALOG).unwrap();
        let summaries = catalog.summaries();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].name, "Brown Spot");
        assert_eq!(summaries[0].local_name, "Brown spot");
    }
}
