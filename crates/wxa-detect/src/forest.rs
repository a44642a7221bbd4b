// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use wxa_core::{FeatureMatrix, StableRng, WxaError};

const DEFAULT_NUM_TREES: usize = 100;
const DEFAULT_SAMPLE_SIZE: usize = 256;
const DEFAULT_CONTAMINATION: f64 = 0.05;
const DEFAULT_SEED: u64 = 42;

/// Euler-Mascheroni constant, used in the expected-path normalizer.
const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Configuration for [`IsolationForest`].
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ForestConfig {
    pub num_trees: usize,
    /// Per-tree subsample size; capped at the training row count.
    pub sample_size: usize,
    /// Expected anomaly fraction in the training data, 0 < c < 1.
    pub contamination: f64,
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            num_trees: DEFAULT_NUM_TREES,
            sample_size: DEFAULT_SAMPLE_SIZE,
            contamination: DEFAULT_CONTAMINATION,
            seed: DEFAULT_SEED,
        }
    }
}

impl ForestConfig {
    fn validate(&self) -> Result<(), WxaError> {
        if self.num_trees == 0 {
            return Err(WxaError::invalid_input(
                "ForestConfig.num_trees must be >= 1; got 0",
            ));
        }
        if self.sample_size < 2 {
            return Err(WxaError::invalid_input(format!(
                "ForestConfig.sample_size must be >= 2; got {}",
                self.sample_size
            )));
        }
        if !self.contamination.is_finite()
            || self.contamination <= 0.0
            || self.contamination >= 1.0
        {
            return Err(WxaError::invalid_input(format!(
                "ForestConfig.contamination must satisfy 0 < c < 1; got {}",
                self.contamination
            )));
        }
        Ok(())
    }
}

/// Untrained isolation forest: validated configuration only.
///
/// [`IsolationForest::train`] consumes a feature matrix and produces an
/// immutable [`TrainedForest`]; there is no incremental update.
#[derive(Clone, Copy, Debug)]
pub struct IsolationForest {
    config: ForestConfig,
}

impl IsolationForest {
    pub fn new(config: ForestConfig) -> Result<Self, WxaError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ForestConfig {
        &self.config
    }

    /// Fits the ensemble on `features` and the decision threshold implied by
    /// the contamination fraction. Deterministic for a fixed seed.
    pub fn train(&self, features: &FeatureMatrix) -> Result<TrainedForest, WxaError> {
        let n = features.n();
        if n < 2 {
            return Err(WxaError::insufficient_data(format!(
                "isolation forest training requires at least 2 rows; got {n}"
            )));
        }

        let psi = self.config.sample_size.min(n);
        let max_depth = (psi as f64).log2().ceil() as usize;

        // One master stream derives per-tree seeds so tree count changes do
        // not correlate trees with each other.
        let mut seeder = StableRng::new(self.config.seed);
        let mut trees = Vec::with_capacity(self.config.num_trees);
        for _ in 0..self.config.num_trees {
            let mut rng = StableRng::new(seeder.next_u64());

            let mut sample_indices = Vec::with_capacity(psi);
            for _ in 0..psi {
                sample_indices.push(rng.gen_range(n)?);
            }

            trees.push(build_node(
                features,
                &sample_indices,
                0,
                max_depth,
                &mut rng,
            )?);
        }

        let mut trained = TrainedForest {
            trees,
            d: features.d(),
            psi,
            normalizer: average_path_length(psi),
            threshold: 0.0,
        };

        // The decision boundary is the contamination-quantile of the
        // training scores; classification is strictly below it, so a
        // zero-variance table (all scores equal) flags nothing.
        let training_scores = trained.score(features)?;
        trained.threshold = quantile(&training_scores, self.config.contamination)?;
        Ok(trained)
    }
}

/// Immutable trained ensemble bound to the feature width it was fit on.
#[derive(Clone, Debug)]
pub struct TrainedForest {
    trees: Vec<Node>,
    d: usize,
    psi: usize,
    normalizer: f64,
    threshold: f64,
}

impl TrainedForest {
    /// Feature width the forest was trained on.
    pub fn dims(&self) -> usize {
        self.d
    }

    /// Fitted decision boundary in score space.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// One score per row, in row order. Lower means more anomalous.
    pub fn score(&self, features: &FeatureMatrix) -> Result<Vec<f64>, WxaError> {
        if features.d() != self.d {
            return Err(WxaError::invalid_input(format!(
                "feature width mismatch: forest trained on d={}, got d={}",
                self.d,
                features.d()
            )));
        }

        let mut scores = Vec::with_capacity(features.n());
        for row in features.rows() {
            scores.push(self.score_row(row));
        }
        Ok(scores)
    }

    /// One verdict per row; `true` iff the row falls strictly below the
    /// fitted contamination threshold.
    pub fn classify(&self, features: &FeatureMatrix) -> Result<Vec<bool>, WxaError> {
        let scores = self.score(features)?;
        Ok(scores.iter().map(|&s| s < self.threshold).collect())
    }

    fn score_row(&self, row: &[f64]) -> f64 {
        let total_depth: f64 = self
            .trees
            .iter()
            .map(|tree| path_length(tree, row, 0))
            .sum();
        let avg_depth = total_depth / self.trees.len() as f64;

        // 2^(-E[h]/c(psi)) is near 1 for easily isolated points; flip the
        // sign so lower = more anomalous, centered like a decision function.
        0.5 - 2.0_f64.powf(-avg_depth / self.normalizer)
    }
}

#[derive(Clone, Debug)]
enum Node {
    Internal {
        feature: usize,
        split: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
    Leaf {
        size: usize,
    },
}

fn build_node(
    features: &FeatureMatrix,
    indices: &[usize],
    depth: usize,
    max_depth: usize,
    rng: &mut StableRng,
) -> Result<Node, WxaError> {
    if depth >= max_depth || indices.len() <= 1 {
        return Ok(Node::Leaf {
            size: indices.len(),
        });
    }

    let feature = rng.gen_range(features.d())?;
    let mut min_val = f64::INFINITY;
    let mut max_val = f64::NEG_INFINITY;
    for &idx in indices {
        let value = feature_value(features, idx, feature)?;
        min_val = min_val.min(value);
        max_val = max_val.max(value);
    }

    // No spread on the chosen axis: these points cannot be separated here.
    if max_val <= min_val {
        return Ok(Node::Leaf {
            size: indices.len(),
        });
    }

    let split = rng.uniform(min_val, max_val)?;
    let mut left_indices = Vec::new();
    let mut right_indices = Vec::new();
    for &idx in indices {
        if feature_value(features, idx, feature)? < split {
            left_indices.push(idx);
        } else {
            right_indices.push(idx);
        }
    }

    let left = build_node(features, &left_indices, depth + 1, max_depth, rng)?;
    let right = build_node(features, &right_indices, depth + 1, max_depth, rng)?;
    Ok(Node::Internal {
        feature,
        split,
        left: Box::new(left),
        right: Box::new(right),
    })
}

fn feature_value(features: &FeatureMatrix, row: usize, col: usize) -> Result<f64, WxaError> {
    features
        .row(row)
        .and_then(|r| r.get(col).copied())
        .ok_or_else(|| {
            WxaError::invalid_input(format!(
                "feature index out of bounds: row={row}, col={col}, n={}, d={}",
                features.n(),
                features.d()
            ))
        })
}

fn path_length(node: &Node, row: &[f64], depth: usize) -> f64 {
    match node {
        // Unresolved leaves stand in for the expected depth of the points
        // grouped there.
        Node::Leaf { size } => depth as f64 + average_path_length(*size),
        Node::Internal {
            feature,
            split,
            left,
            right,
        } => {
            let value = row.get(*feature).copied().unwrap_or(0.0);
            let next = if value < *split { left } else { right };
            path_length(next, row, depth + 1)
        }
    }
}

/// Expected path length c(n) of an unsuccessful BST search over n points.
fn average_path_length(n: usize) -> f64 {
    if n <= 1 {
        return 0.0;
    }
    let n = n as f64;
    2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
}

/// Linearly interpolated quantile of an unsorted sample, `q` in (0, 1).
fn quantile(values: &[f64], q: f64) -> Result<f64, WxaError> {
    if values.is_empty() {
        return Err(WxaError::insufficient_data(
            "quantile of an empty sample is undefined",
        ));
    }
    if !q.is_finite() || q <= 0.0 || q >= 1.0 {
        return Err(WxaError::invalid_input(format!(
            "quantile fraction must satisfy 0 < q < 1; got {q}"
        )));
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let rank = q * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        return Ok(sorted[lo]);
    }
    let weight = rank - lo as f64;
    Ok(sorted[lo] * (1.0 - weight) + sorted[hi] * weight)
}
