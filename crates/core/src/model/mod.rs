//! Purchase-propensity scoring
//!
//! Turns a customer's crop feature rows into per-crop purchase probabilities. Rows are
//! min-max scaled on the customer's own data, then either fed to a freshly trained
//! [`RandomForest`] or, when the labels cannot support training, scored by the
//! normalized engagement heuristic. Nothing is cached between calls.

pub mod forest;
pub mod scaler;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::recommendation::Recommendation;
use crate::features::CropFeatureRow;

pub use forest::{ForestParams, RandomForest};
pub use scaler::MinMaxScaler;

/// Fixed priors returned for customers without any recorded action.
pub const COLD_START_PRIORS: [(&str, f64); 2] = [("Wheat", 0.1), ("Rice", 0.05)];

pub const HEURISTIC_FLOOR: f64 = 0.01;
pub const HEURISTIC_CEILING: f64 = 0.99;

/// Rows each label class needs before the forest is trained.
pub const MIN_CLASS_SUPPORT: usize = 2;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum ModelError {
    #[error("cannot score an empty feature set")]
    EmptyTrainingSet,
    #[error("feature width mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("{samples} samples but {labels} labels")]
    LabelMismatch { samples: usize, labels: usize },
    #[error("feature column {column} holds a non-finite value")]
    NonFiniteFeature { column: usize },
    #[error("classifier produced an out-of-range probability {0}")]
    InvalidProbability(f64),
    #[error("classifier has not been fitted")]
    NotFitted,
    #[error("invalid model parameter: {0}")]
    InvalidParameter(String),
}

/// Binary classifier used for the trained path.
pub trait Classifier {
    fn fit(&mut self, features: &[Vec<f64>], labels: &[bool]) -> Result<(), ModelError>;

    /// Positive-class probability for one scaled sample.
    fn predict_proba(&self, sample: &[f64]) -> Result<f64, ModelError>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringMethod {
    ColdStart,
    Heuristic,
    Forest,
}

impl ScoringMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ColdStart => "cold_start",
            Self::Heuristic => "heuristic",
            Self::Forest => "forest",
        }
    }
}

/// Scored crops, sorted by descending probability.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PropensityOutput {
    pub method: ScoringMethod,
    pub recommendations: Vec<Recommendation>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PropensityModel {
    params: ForestParams,
}

impl PropensityModel {
    pub fn new(params: ForestParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &ForestParams {
        &self.params
    }

    pub fn cold_start() -> PropensityOutput {
        PropensityOutput {
            method: ScoringMethod::ColdStart,
            recommendations: COLD_START_PRIORS
                .iter()
                .map(|(crop, probability)| Recommendation::new(*crop, *probability))
                .collect(),
        }
    }

    pub fn score(&self, rows: &[CropFeatureRow]) -> Result<PropensityOutput, ModelError> {
        self.score_with(rows, RandomForest::new(self.params.clone()))
    }

    pub fn score_with<C: Classifier>(
        &self,
        rows: &[CropFeatureRow],
        mut classifier: C,
    ) -> Result<PropensityOutput, ModelError> {
        if rows.is_empty() {
            return Err(ModelError::EmptyTrainingSet);
        }

        let labels: Vec<bool> = rows.iter().map(CropFeatureRow::label).collect();
        let raw: Vec<_> = rows.iter().map(CropFeatureRow::vector).collect();
        let scaled = MinMaxScaler::fit_transform(&raw)?;

        let (method, probabilities) = if needs_fallback(&labels) {
            (ScoringMethod::Heuristic, heuristic_probabilities(rows))
        } else {
            classifier.fit(&scaled, &labels)?;
            let probabilities = scaled
                .iter()
                .map(|sample| {
                    let probability = classifier.predict_proba(sample)?;
                    if !(0.0..=1.0).contains(&probability) {
                        return Err(ModelError::InvalidProbability(probability));
                    }
                    Ok(probability)
                })
                .collect::<Result<Vec<_>, ModelError>>()?;
            (ScoringMethod::Forest, probabilities)
        };

        let mut recommendations: Vec<Recommendation> = rows
            .iter()
            .zip(probabilities)
            .map(|(row, probability)| Recommendation::new(row.crop.clone(), probability))
            .collect();
        recommendations.sort_by(|a, b| b.purchase_prob.total_cmp(&a.purchase_prob));

        Ok(PropensityOutput { method, recommendations })
    }
}

fn needs_fallback(labels: &[bool]) -> bool {
    let positives = labels.iter().filter(|label| **label).count();
    let negatives = labels.len() - positives;
    labels.len() < 2 || positives < MIN_CLASS_SUPPORT || negatives < MIN_CLASS_SUPPORT
}

fn heuristic_probabilities(rows: &[CropFeatureRow]) -> Vec<f64> {
    let max = rows.iter().map(|row| row.total_weighted_score).fold(f64::NEG_INFINITY, f64::max);
    let max = if max > 0.0 { max } else { 1.0 };

    rows.iter()
        .map(|row| (row.total_weighted_score / max).clamp(HEURISTIC_FLOOR, HEURISTIC_CEILING))
        .collect()
}
