//! Crop seasons and their disease-risk weights

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Crop season derived from the calendar month
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Season {
    /// June to September (Kharif)
    WetMonsoon,
    /// October to January (Rabi)
    DryCool,
    /// February to May (Zaid)
    DryHot,
}

/// Season for each month, January first
const MONTH_SEASONS: [Season; 12] = [
    Season::DryCool,
    Season::DryHot,
    Season::DryHot,
    Season::DryHot,
    Season::DryHot,
    Season::WetMonsoon,
    Season::WetMonsoon,
    Season::WetMonsoon,
    Season::WetMonsoon,
    Season::DryCool,
    Season::DryCool,
    Season::DryCool,
];

impl Season {
    pub const ALL: [Season; 3] = [Season::WetMonsoon, Season::DryCool, Season::DryHot];

    /// Season for a 1-based month number, `None` outside 1..=12
    pub fn for_month(month: u32) -> Option<Self> {
        month
            .checked_sub(1)
            .and_then(|i| MONTH_SEASONS.get(i as usize))
            .copied()
    }

    /// Name used by Indian agricultural calendars
    pub fn local_name(&self) -> &'static str {
        match self {
            Season::WetMonsoon => "Kharif",
            Season::DryCool => "Rabi",
            Season::DryHot => "Zaid",
        }
    }
}

impl std::fmt::Display for Season {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Season::WetMonsoon => write!(f, "wet_monsoon"),
            Season::DryCool => write!(f, "dry_cool"),
            Season::DryHot => write!(f, "dry_hot"),
        }
    }
}

impl std::str::FromStr for Season {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "wet_monsoon" | "kharif" => Ok(Season::WetMonsoon),
            "dry_cool" | "rabi" => Ok(Season::DryCool),
            "dry_hot" | "zaid" => Ok(Season::DryHot),
            other => Err(format!("unknown season: {}", other)),
        }
    }
}

/// Current crop season for a calendar date
pub fn current_season(date: NaiveDate) -> Season {
    MONTH_SEASONS[date.month0() as usize]
}

/// Per-season multiplicative weights keyed by class name.
///
/// Classes missing from a season's table keep a weight of 1.0.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeasonWeightTable {
    weights: BTreeMap<Season, BTreeMap<String, f64>>,
}

impl SeasonWeightTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace one weight
    pub fn with_weight(mut self, season: Season, class: impl Into<String>, weight: f64) -> Self {
        self.weights
            .entry(season)
            .or_default()
            .insert(class.into(), weight);
        self
    }

    /// Weights for rice diseases in each season
    pub fn rice() -> Self {
        Self::new()
            .with_weight(Season::WetMonsoon, "Leaf_blast", 1.10)
            .with_weight(Season::WetMonsoon, "Bacterial_leaf_blight", 1.05)
            .with_weight(Season::WetMonsoon, "Sheath_blight", 1.10)
            .with_weight(Season::WetMonsoon, "Tungro", 1.05)
            .with_weight(Season::DryCool, "Brown_spot", 1.10)
            .with_weight(Season::DryCool, "Leaf_scald", 1.05)
            .with_weight(Season::DryHot, "Leaf_scald", 1.10)
            .with_weight(Season::DryHot, "Brown_spot", 1.05)
    }

    /// Listed weights for a season, in class-name order
    pub fn weights_for(&self, season: Season) -> impl Iterator<Item = (&str, f64)> {
        self.weights
            .get(&season)
            .into_iter()
            .flat_map(|m| m.iter().map(|(k, v)| (k.as_str(), *v)))
    }

    /// Weight for one class, 1.0 when unlisted
    pub fn weight(&self, season: Season, class: &str) -> f64 {
        self.weights
            .get(&season)
            .and_then(|m| m.get(class))
            .copied()
            .unwrap_or(1.0)
    }
}
