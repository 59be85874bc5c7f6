//! Bagged ensemble of Gini decision trees for binary classification.
//!
//! Each tree is grown on a bootstrap sample and considers a random subset of
//! `max_features` columns at every split, continuing through the remaining columns only
//! when none of the sampled ones separates the node. Trees grow until nodes are pure or
//! smaller than `min_samples_split`. A leaf's value is its positive fraction and the
//! forest probability is the mean over trees. All randomness comes from one seeded
//! `StdRng`, so a fixed seed gives identical predictions.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::{Classifier, ModelError};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_trees: usize,
    pub seed: u64,
    /// Columns sampled per split. `None` means `floor(sqrt(width))`, at least one.
    pub max_features: Option<usize>,
    pub min_samples_split: usize,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self { n_trees: 100, seed: 42, max_features: None, min_samples_split: 2 }
    }
}

impl ForestParams {
    fn features_per_split(&self, width: usize) -> usize {
        let sampled = self.max_features.unwrap_or_else(|| (width as f64).sqrt().floor() as usize);
        sampled.clamp(1, width.max(1))
    }
}

#[derive(Clone, Debug, PartialEq)]
enum Node {
    Leaf { positive_fraction: f64 },
    Split { feature: usize, threshold: f64, left: Box<Node>, right: Box<Node> },
}

impl Node {
    fn predict(&self, sample: &[f64]) -> f64 {
        let mut node = self;
        loop {
            match node {
                Node::Leaf { positive_fraction } => return *positive_fraction,
                Node::Split { feature, threshold, left, right } => {
                    node = if sample[*feature] <= *threshold { left } else { right };
                }
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RandomForest {
    params: ForestParams,
    width: usize,
    trees: Vec<Node>,
}

impl RandomForest {
    pub fn new(params: ForestParams) -> Self {
        Self { params, width: 0, trees: Vec::new() }
    }

    pub fn params(&self) -> &ForestParams {
        &self.params
    }

    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }

    fn validate(features: &[Vec<f64>], labels: &[bool]) -> Result<usize, ModelError> {
        if features.is_empty() {
            return Err(ModelError::EmptyTrainingSet);
        }
        if features.len() != labels.len() {
            return Err(ModelError::LabelMismatch {
                samples: features.len(),
                labels: labels.len(),
            });
        }

        let width = features[0].len();
        if width == 0 {
            return Err(ModelError::DimensionMismatch { expected: 1, actual: 0 });
        }
        for row in features {
            if row.len() != width {
                return Err(ModelError::DimensionMismatch { expected: width, actual: row.len() });
            }
            if let Some(column) = row.iter().position(|value| !value.is_finite()) {
                return Err(ModelError::NonFiniteFeature { column });
            }
        }

        Ok(width)
    }
}

impl Classifier for RandomForest {
    fn fit(&mut self, features: &[Vec<f64>], labels: &[bool]) -> Result<(), ModelError> {
        let width = Self::validate(features, labels)?;
        if self.params.n_trees == 0 {
            return Err(ModelError::InvalidParameter("n_trees must be greater than zero".into()));
        }

        let mut rng = StdRng::seed_from_u64(self.params.seed);
        let grower = TreeGrower {
            features,
            labels,
            max_features: self.params.features_per_split(width),
            min_samples_split: self.params.min_samples_split.max(2),
            width,
        };

        let samples = features.len();
        let mut trees = Vec::with_capacity(self.params.n_trees);
        for _ in 0..self.params.n_trees {
            let bootstrap: Vec<usize> = (0..samples).map(|_| rng.gen_range(0..samples)).collect();
            trees.push(grower.grow(bootstrap, &mut rng));
        }

        self.width = width;
        self.trees = trees;
        Ok(())
    }

    fn predict_proba(&self, sample: &[f64]) -> Result<f64, ModelError> {
        if self.trees.is_empty() {
            return Err(ModelError::NotFitted);
        }
        if sample.len() != self.width {
            return Err(ModelError::DimensionMismatch {
                expected: self.width,
                actual: sample.len(),
            });
        }

        let total: f64 = self.trees.iter().map(|tree| tree.predict(sample)).sum();
        Ok(total / self.trees.len() as f64)
    }
}

struct TreeGrower<'a> {
    features: &'a [Vec<f64>],
    labels: &'a [bool],
    max_features: usize,
    min_samples_split: usize,
    width: usize,
}

struct Candidate {
    feature: usize,
    threshold: f64,
    impurity: f64,
}

impl TreeGrower<'_> {
    fn grow(&self, samples: Vec<usize>, rng: &mut StdRng) -> Node {
        let positives = samples.iter().filter(|&&index| self.labels[index]).count();
        let leaf = Node::Leaf { positive_fraction: positives as f64 / samples.len() as f64 };

        if positives == 0 || positives == samples.len() || samples.len() < self.min_samples_split {
            return leaf;
        }

        let mut order: Vec<usize> = (0..self.width).collect();
        order.shuffle(rng);

        let mut best: Option<Candidate> = None;
        for (visited, &feature) in order.iter().enumerate() {
            if visited >= self.max_features && best.is_some() {
                break;
            }
            let Some(candidate) = self.best_split(&samples, feature) else {
                continue;
            };
            if best.as_ref().map_or(true, |current| candidate.impurity < current.impurity) {
                best = Some(candidate);
            }
        }

        let Some(split) = best else {
            return leaf;
        };

        let (left, right): (Vec<usize>, Vec<usize>) = samples
            .into_iter()
            .partition(|&index| self.features[index][split.feature] <= split.threshold);

        Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left: Box::new(self.grow(left, rng)),
            right: Box::new(self.grow(right, rng)),
        }
    }

    /// Lowest weighted Gini split on one column, or `None` if the column is constant here.
    fn best_split(&self, samples: &[usize], feature: usize) -> Option<Candidate> {
        let mut values: Vec<(f64, bool)> = samples
            .iter()
            .map(|&index| (self.features[index][feature], self.labels[index]))
            .collect();
        values.sort_by(|a, b| a.0.total_cmp(&b.0));

        let total = values.len() as f64;
        let total_positive = values.iter().filter(|(_, label)| *label).count() as f64;

        let mut left_positive = 0.0;
        let mut best: Option<Candidate> = None;
        for split_at in 1..values.len() {
            if values[split_at - 1].1 {
                left_positive += 1.0;
            }
            let (low, high) = (values[split_at - 1].0, values[split_at].0);
            if high <= low {
                continue;
            }

            let left_count = split_at as f64;
            let right_count = total - left_count;
            let impurity = (left_count * gini(left_positive, left_count)
                + right_count * gini(total_positive - left_positive, right_count))
                / total;

            if best.as_ref().map_or(true, |current| impurity < current.impurity) {
                let midpoint = low + (high - low) / 2.0;
                let threshold = if midpoint >= high { low } else { midpoint };
                best = Some(Candidate { feature, threshold, impurity });
            }
        }

        best
    }
}

fn gini(positive: f64, count: f64) -> f64 {
    let p = positive / count;
    1.0 - p * p - (1.0 - p) * (1.0 - p)
}
