//! Context-aware re-weighting of classifier probabilities
//!
//! The classifier only sees pixels. The adjuster folds in two priors, in this
//! order: current weather (disease-favourable conditions move mass away from
//! the healthy class) and crop season (per-season disease weights plus a mild
//! healthy deflation). Each stage renormalizes on its own, so swapping them
//! changes the result.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::season::{Season, SeasonWeightTable};
use super::taxonomy::ClassTaxonomy;
use super::weather::{WeatherRiskRule, WeatherSnapshot};

/// Number of ranked alternatives reported with a prediction
pub const TOP_K: usize = 3;

/// Reasons a probability vector cannot be adjusted
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AdjustError {
    #[error("probability vector has {actual} entries, taxonomy has {expected}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("probability at index {index} is invalid: {value}")]
    InvalidProbability { index: usize, value: f64 },

    #[error("probability vector has no mass to normalize")]
    ZeroMass,
}

/// Class probabilities in taxonomy order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProbabilityVector(Vec<f64>);

impl ProbabilityVector {
    /// Wrap raw values, rejecting negative or non-finite entries
    pub fn new(values: Vec<f64>) -> Result<Self, AdjustError> {
        if let Some((index, &value)) = values
            .iter()
            .enumerate()
            .find(|(_, v)| !v.is_finite() || **v < 0.0)
        {
            return Err(AdjustError::InvalidProbability { index, value });
        }
        Ok(Self(values))
    }

    pub fn values(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<f64> {
        self.0.get(index).copied()
    }

    pub fn sum(&self) -> f64 {
        self.0.iter().sum()
    }

    /// Rescale so the entries sum to 1.0.
    ///
    /// Entries are divided by the largest one first, so vectors whose plain
    /// sum would overflow still normalize.
    pub fn normalized(&self) -> Result<Self, AdjustError> {
        if let Some((index, &value)) = self.0.iter().enumerate().find(|(_, v)| !v.is_finite()) {
            return Err(AdjustError::InvalidProbability { index, value });
        }
        let peak = self.0.iter().copied().fold(0.0, f64::max);
        if peak <= 0.0 {
            return Err(AdjustError::ZeroMass);
        }
        let scaled: Vec<f64> = self.0.iter().map(|v| v / peak).collect();
        let total: f64 = scaled.iter().sum();
        Ok(Self(scaled.into_iter().map(|v| v / total).collect()))
    }

    fn scale_all(&mut self, factor: f64) {
        self.0.iter_mut().for_each(|v| *v *= factor);
    }

    fn scale_at(&mut self, index: usize, factor: f64) {
        if let Some(v) = self.0.get_mut(index) {
            *v *= factor;
        }
    }
}

impl From<ProbabilityVector> for Vec<f64> {
    fn from(v: ProbabilityVector) -> Self {
        v.0
    }
}

/// Scaling factors applied by the weather and season stages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjustmentPolicy {
    pub risk: WeatherRiskRule,
    /// Healthy probability above this skips the weather stage
    pub healthy_dominant_above: f64,
    /// Lower bound (inclusive) of the moderate-healthy band
    pub moderate_healthy_min: f64,
    /// Moderate band: every class scaled by this...
    pub moderate_boost: f64,
    /// ...then healthy scaled again by this
    pub moderate_healthy_factor: f64,
    /// Low band: every class scaled by this...
    pub low_boost: f64,
    /// ...then healthy scaled again by this
    pub low_healthy_factor: f64,
    /// Applied to healthy in every season
    pub seasonal_healthy_factor: f64,
}

impl Default for AdjustmentPolicy {
    fn default() -> Self {
        Self {
            risk: WeatherRiskRule::default(),
            healthy_dominant_above: 0.55,
            moderate_healthy_min: 0.35,
            moderate_boost: 1.10,
            moderate_healthy_factor: 0.80,
            low_boost: 1.20,
            low_healthy_factor: 0.75,
            seasonal_healthy_factor: 0.98,
        }
    }
}

/// One class and its probability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedClass {
    pub class: String,
    pub confidence: f64,
}

/// Final, context-adjusted prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjustedPrediction {
    pub final_label: String,
    pub confidence: f64,
    /// At most [`TOP_K`] classes, highest first, ties in taxonomy order
    pub top_k: Vec<RankedClass>,
    pub adjusted: ProbabilityVector,
}

/// Applies weather and season priors to raw classifier output
#[derive(Debug, Clone)]
pub struct ProbabilityAdjuster {
    taxonomy: ClassTaxonomy,
    season_weights: SeasonWeightTable,
    policy: AdjustmentPolicy,
}

impl Default for ProbabilityAdjuster {
    fn default() -> Self {
        Self::new(
            ClassTaxonomy::rice(),
            SeasonWeightTable::rice(),
            AdjustmentPolicy::default(),
        )
    }
}

impl ProbabilityAdjuster {
    pub fn new(
        taxonomy: ClassTaxonomy,
        season_weights: SeasonWeightTable,
        policy: AdjustmentPolicy,
    ) -> Self {
        Self {
            taxonomy,
            season_weights,
            policy,
        }
    }

    pub fn taxonomy(&self) -> &ClassTaxonomy {
        &self.taxonomy
    }

    pub fn policy(&self) -> &AdjustmentPolicy {
        &self.policy
    }

    /// Validate and normalize raw classifier output
    pub fn prepare(&self, raw: &[f64]) -> Result<ProbabilityVector, AdjustError> {
        if raw.len() != self.taxonomy.len() {
            return Err(AdjustError::ShapeMismatch {
                expected: self.taxonomy.len(),
                actual: raw.len(),
            });
        }
        ProbabilityVector::new(raw.to_vec())?.normalized()
    }

    /// Run both stages and pick the label
    pub fn adjust(
        &self,
        raw: &[f64],
        weather: Option<&WeatherSnapshot>,
        season: Season,
    ) -> Result<AdjustedPrediction, AdjustError> {
        let prepared = self.prepare(raw)?;
        let after_weather = self.weather_stage(&prepared, weather)?;
        let adjusted = self.season_stage(&after_weather, season)?;
        Ok(self.select(adjusted))
    }

    /// Shift mass away from healthy when the weather favours disease.
    ///
    /// Expects a normalized vector; the band thresholds are probabilities.
    pub fn weather_stage(
        &self,
        probs: &ProbabilityVector,
        weather: Option<&WeatherSnapshot>,
    ) -> Result<ProbabilityVector, AdjustError> {
        self.check_shape(probs)?;
        let Some(weather) = weather else {
            return Ok(probs.clone());
        };
        let healthy = self.taxonomy.healthy_index();
        let healthy_prob = probs.get(healthy).unwrap_or(0.0);
        let policy = &self.policy;

        if healthy_prob > policy.healthy_dominant_above {
            return Ok(probs.clone());
        }

        let risky = policy.risk.is_risky(weather);
        let mut scaled = probs.clone();
        if risky {
            let (boost, healthy_factor) = if healthy_prob >= policy.moderate_healthy_min {
                (policy.moderate_boost, policy.moderate_healthy_factor)
            } else {
                (policy.low_boost, policy.low_healthy_factor)
            };
            scaled.scale_all(boost);
            scaled.scale_at(healthy, healthy_factor);
        }
        scaled.normalized()
    }

    /// Apply the season's class weights and the healthy deflation
    pub fn season_stage(
        &self,
        probs: &ProbabilityVector,
        season: Season,
    ) -> Result<ProbabilityVector, AdjustError> {
        self.check_shape(probs)?;
        let mut scaled = probs.clone();
        for (class, weight) in self.season_weights.weights_for(season) {
            if let Some(index) = self.taxonomy.index_of(class) {
                scaled.scale_at(index, weight);
            }
        }
        scaled.scale_at(
            self.taxonomy.healthy_index(),
            self.policy.seasonal_healthy_factor,
        );
        scaled.normalized()
    }

    /// Rank classes by probability; equal values keep taxonomy order
    pub fn rank(&self, probs: &ProbabilityVector) -> Vec<RankedClass> {
        let mut order: Vec<usize> = (0..probs.len()).collect();
        order.sort_by(|&a, &b| {
            let pa = probs.values()[a];
            let pb = probs.values()[b];
            pb.partial_cmp(&pa).unwrap_or(Ordering::Equal).then(a.cmp(&b))
        });
        order
            .into_iter()
            .filter_map(|i| {
                self.taxonomy.name(i).map(|name| RankedClass {
                    class: name.to_string(),
                    confidence: probs.values()[i],
                })
            })
            .collect()
    }

    /// Pair each value with its class name, in taxonomy order
    pub fn labelled(&self, values: &[f64]) -> Vec<RankedClass> {
        self.taxonomy
            .names()
            .iter()
            .zip(values)
            .map(|(class, &confidence)| RankedClass {
                class: class.clone(),
                confidence,
            })
            .collect()
    }

    fn check_shape(&self, probs: &ProbabilityVector) -> Result<(), AdjustError> {
        if probs.len() != self.taxonomy.len() {
            return Err(AdjustError::ShapeMismatch {
                expected: self.taxonomy.len(),
                actual: probs.len(),
            });
        }
        Ok(())
    }

    fn select(&self, adjusted: ProbabilityVector) -> AdjustedPrediction {
        let mut top_k = self.rank(&adjusted);
        top_k.truncate(TOP_K);
        let (final_label, confidence) = top_k
            .first()
            .map(|r| (r.class.clone(), r.confidence))
            .unwrap_or_default();

        AdjustedPrediction {
            final_label,
            confidence,
            top_k,
            adjusted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn weather(humidity: f64, temperature: f64, rain: bool) -> WeatherSnapshot {
        WeatherSnapshot {
            humidity,
            temperature,
            rain,
            pressure: 1008.0,
            wind_speed: 3.1,
            condition: "Rain".to_string(),
            description: "light rain".to_string(),
            location_name: "Thanjavur".to_string(),
        }
    }

    fn risky() -> WeatherSnapshot {
        weather(85.0, 27.0, true)
    }

    fn calm() -> WeatherSnapshot {
        weather(40.0, 35.0, false)
    }

    #[test]
    fn test_shape_mismatch_is_rejected() {
        let adjuster = ProbabilityAdjuster::default();
        let err = adjuster
            .adjust(&[0.5, 0.5], None, Season::DryHot)
            .unwrap_err();
        assert_eq!(
            err,
            AdjustError::ShapeMismatch {
                expected: 7,
                actual: 2
            }
        );
    }

    #[test]
    fn test_invalid_entries_are_rejected() {
        let adjuster = ProbabilityAdjuster::default();
        let raw = [0.1, -0.1, 0.5, 0.1, 0.1, 0.2, 0.1];
        assert!(matches!(
            adjuster.adjust(&raw, None, Season::DryHot),
            Err(AdjustError::InvalidProbability { index: 1, .. })
        ));

        let zeros = [0.0; 7];
        assert_eq!(
            adjuster.adjust(&zeros, None, Season::DryHot),
            Err(AdjustError::ZeroMass)
        );
    }

    #[test]
    fn test_unnormalized_input_is_normalized_first() {
        let adjuster = ProbabilityAdjuster::default();
        // Healthy is 0.6 only after normalization (1.2 / 2.0)
        let raw = [0.2, 0.1, 1.2, 0.1, 0.1, 0.2, 0.1];
        let prepared = adjuster.prepare(&raw).unwrap();
        assert!((prepared.sum() - 1.0).abs() < EPS);
        assert!((prepared.values()[2] - 0.6).abs() < EPS);

        let staged = adjuster.weather_stage(&prepared, Some(&risky())).unwrap();
        assert_eq!(staged, prepared);
    }

    #[test]
    fn test_healthy_dominant_survives_wet_monsoon() {
        let adjuster = ProbabilityAdjuster::default();
        let raw = [0.10, 0.05, 0.60, 0.05, 0.05, 0.10, 0.05];

        let prepared = adjuster.prepare(&raw).unwrap();
        let staged = adjuster.weather_stage(&prepared, Some(&risky())).unwrap();
        assert_eq!(staged, prepared);

        let result = adjuster
            .adjust(&raw, Some(&risky()), Season::WetMonsoon)
            .unwrap();
        assert_eq!(result.final_label, "Healthy");

        let expected = [0.105, 0.05, 0.588, 0.055, 0.05, 0.11, 0.0525];
        let total: f64 = expected.iter().sum();
        for (got, want) in result.adjusted.values().iter().zip(expected) {
            assert!((got - want / total).abs() < EPS);
        }
    }

    #[test]
    fn test_low_healthy_risky_weather_ratio() {
        let adjuster = ProbabilityAdjuster::default();
        let raw = [0.20, 0.10, 0.30, 0.10, 0.10, 0.10, 0.10];
        let prepared = adjuster.prepare(&raw).unwrap();
        let staged = adjuster.weather_stage(&prepared, Some(&risky())).unwrap();

        let ratio = staged.values()[2] / staged.values()[0];
        let expected = (0.30 * 0.90) / (0.20 * 1.20);
        assert!((ratio - expected).abs() < EPS);
        assert!((staged.sum() - 1.0).abs() < EPS);
    }

    #[test]
    fn test_moderate_healthy_risky_weather_ratio() {
        let adjuster = ProbabilityAdjuster::default();
        let raw = [0.15, 0.10, 0.45, 0.10, 0.05, 0.10, 0.05];
        let prepared = adjuster.prepare(&raw).unwrap();
        let staged = adjuster.weather_stage(&prepared, Some(&risky())).unwrap();

        let ratio = staged.values()[2] / staged.values()[0];
        let expected = (0.45 * 0.88) / (0.15 * 1.10);
        assert!((ratio - expected).abs() < EPS);
    }

    #[test]
    fn test_calm_weather_leaves_ratios_alone() {
        let adjuster = ProbabilityAdjuster::default();
        let raw = [0.20, 0.10, 0.30, 0.10, 0.10, 0.10, 0.10];
        let prepared = adjuster.prepare(&raw).unwrap();
        let staged = adjuster.weather_stage(&prepared, Some(&calm())).unwrap();
        for (a, b) in staged.values().iter().zip(prepared.values()) {
            assert!((a - b).abs() < EPS);
        }
    }

    #[test]
    fn test_season_stage_runs_without_weather() {
        let adjuster = ProbabilityAdjuster::default();
        let raw = [1.0 / 7.0; 7];
        let result = adjuster.adjust(&raw, None, Season::DryCool).unwrap();
        // Brown_spot carries the largest dry-cool weight
        assert_eq!(result.final_label, "Brown_spot");
        assert_eq!(result.top_k[1].class, "Leaf_scald");
        assert!(result.adjusted.values()[2] < result.adjusted.values()[0]);
    }

    #[test]
    fn test_tie_break_follows_taxonomy_order() {
        let adjuster = ProbabilityAdjuster::new(
            ClassTaxonomy::rice(),
            SeasonWeightTable::new(),
            AdjustmentPolicy::default(),
        );
        let raw = [0.10, 0.30, 0.10, 0.30, 0.10, 0.05, 0.05];
        let result = adjuster.adjust(&raw, None, Season::DryHot).unwrap();

        assert_eq!(result.final_label, "Brown_spot");
        let names: Vec<&str> = result.top_k.iter().map(|r| r.class.as_str()).collect();
        assert_eq!(names, vec!["Brown_spot", "Leaf_blast", "Bacterial_leaf_blight"]);
    }

    #[test]
    fn test_top_k_shrinks_with_small_taxonomy() {
        let taxonomy = ClassTaxonomy::new(["Blight", "Healthy"], "Healthy").unwrap();
        let adjuster =
            ProbabilityAdjuster::new(taxonomy, SeasonWeightTable::new(), AdjustmentPolicy::default());
        let result = adjuster.adjust(&[0.3, 0.7], None, Season::DryHot).unwrap();
        assert_eq!(result.top_k.len(), 2);
        assert_eq!(result.final_label, "Healthy");
    }

    #[test]
    fn test_labelled_keeps_taxonomy_order() {
        let adjuster = ProbabilityAdjuster::default();
        let labelled = adjuster.labelled(&[0.0, 0.1, 0.2, 0.3, 0.4, 0.5, 0.6]);
        assert_eq!(labelled.len(), 7);
        assert_eq!(labelled[0].class, "Bacterial_leaf_blight");
        assert_eq!(labelled[6].class, "Tungro");
        assert_eq!(labelled[6].confidence, 0.6);
    }
}
