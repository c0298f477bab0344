//! Isolation forest outlier model
//!
//! Each tree isolates points by recursive random axis-aligned splits over a
//! subsample of the training rows. Points that are easy to isolate (short
//! average path length across the ensemble) score as anomalies. The decision
//! threshold is the `contamination` quantile of the training scores, so roughly
//! that fraction of the training set is voted "outlier".

use crate::error::{CostAnalyticsError, CostAnalyticsResult};
use crate::features::stats::{percentile, sorted};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Hyperparameters for [`IsolationForest`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsolationForestParams {
    /// Number of trees
    pub n_estimators: usize,
    /// Upper bound on rows drawn per tree
    pub max_samples: usize,
    /// Expected outlier fraction in the training data
    pub contamination: f64,
    /// Draw rows with replacement
    pub bootstrap: bool,
    /// RNG seed; fixed so retraining on the same data gives the same model
    pub seed: u64,
}

impl Default for IsolationForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_samples: 256,
            contamination: 0.1,
            bootstrap: false,
            seed: 42,
        }
    }
}

/// One node in a tree's flat arena
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TreeNode {
    /// Internal split: `x[feature] <= threshold` goes left
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    /// Terminal node holding `size` training rows
    Leaf { size: usize },
}

/// A single isolation tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsolationTree {
    nodes: Vec<TreeNode>,
}

impl IsolationTree {
    fn fit(rows: &[&[f64]], max_depth: usize, rng: &mut StdRng) -> Self {
        let mut tree = Self { nodes: Vec::new() };
        tree.grow(rows, 0, max_depth, rng);
        tree
    }

    /// Recursively grow a subtree, returning its root index
    fn grow(&mut self, rows: &[&[f64]], depth: usize, max_depth: usize, rng: &mut StdRng) -> usize {
        let index = self.nodes.len();
        self.nodes.push(TreeNode::Leaf { size: rows.len() });

        if depth >= max_depth || rows.len() <= 1 {
            return index;
        }

        // Only features that still vary inside this node can split it
        let width = rows[0].len();
        let splittable: Vec<(usize, f64, f64)> = (0..width)
            .filter_map(|feature| {
                let (lo, hi) = rows.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), r| {
                    (lo.min(r[feature]), hi.max(r[feature]))
                });
                (hi > lo).then_some((feature, lo, hi))
            })
            .collect();

        if splittable.is_empty() {
            return index;
        }

        let (feature, lo, hi) = splittable[rng.gen_range(0..splittable.len())];
        let threshold = rng.gen_range(lo..hi);

        let (left_rows, right_rows): (Vec<&[f64]>, Vec<&[f64]>) =
            rows.iter().copied().partition(|r| r[feature] <= threshold);

        let left = self.grow(&left_rows, depth + 1, max_depth, rng);
        let right = self.grow(&right_rows, depth + 1, max_depth, rng);
        self.nodes[index] = TreeNode::Split {
            feature,
            threshold,
            left,
            right,
        };
        index
    }

    /// Depth at which `row` lands plus the expected remaining depth of its leaf
    fn path_length(&self, row: &[f64]) -> f64 {
        let mut node = 0;
        let mut depth = 0.0;
        loop {
            match &self.nodes[node] {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if row[*feature] <= *threshold { *left } else { *right };
                    depth += 1.0;
                }
                TreeNode::Leaf { size } => return depth + average_path_length(*size),
            }
        }
    }
}

/// Average path length of an unsuccessful BST search over `n` points
pub fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

/// Fitted isolation forest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsolationForest {
    params: IsolationForestParams,
    trees: Vec<IsolationTree>,
    /// Rows actually drawn per tree
    sample_size: usize,
    /// Training-score quantile subtracted by the decision function
    offset: f64,
    n_features: usize,
}

impl IsolationForest {
    /// Fit the ensemble on row-major data
    pub fn fit(rows: &[Vec<f64>], params: IsolationForestParams) -> CostAnalyticsResult<Self> {
        if rows.is_empty() {
            return Err(CostAnalyticsError::CalculationError {
                details: "cannot fit isolation forest on an empty matrix".to_string(),
            });
        }
        if !(0.0..=0.5).contains(&params.contamination) {
            return Err(CostAnalyticsError::ConfigurationError {
                message: format!(
                    "contamination must be in [0, 0.5], got {}",
                    params.contamination
                ),
            });
        }
        if params.n_estimators == 0 {
            return Err(CostAnalyticsError::ConfigurationError {
                message: "n_estimators must be positive".to_string(),
            });
        }

        let n_features = rows[0].len();
        let sample_size = params.max_samples.clamp(1, rows.len());
        let max_depth = (sample_size as f64).log2().ceil().max(1.0) as usize;
        let mut rng = StdRng::seed_from_u64(params.seed);

        let trees = (0..params.n_estimators)
            .map(|_| {
                let indices: Vec<usize> = if params.bootstrap {
                    (0..sample_size).map(|_| rng.gen_range(0..rows.len())).collect()
                } else {
                    rand::seq::index::sample(&mut rng, rows.len(), sample_size).into_vec()
                };
                let subsample: Vec<&[f64]> = indices.iter().map(|&i| rows[i].as_slice()).collect();
                IsolationTree::fit(&subsample, max_depth, &mut rng)
            })
            .collect();

        let mut forest = Self {
            params,
            trees,
            sample_size,
            offset: 0.0,
            n_features,
        };

        let training_scores = sorted(&forest.score_samples(rows)?);
        forest.offset = percentile(&training_scores, forest.params.contamination * 100.0);
        Ok(forest)
    }

    /// Raw anomaly score in [-1, 0); lower is more anomalous
    pub fn score_samples(&self, rows: &[Vec<f64>]) -> CostAnalyticsResult<Vec<f64>> {
        let normalizer = average_path_length(self.sample_size);
        rows.iter()
            .map(|row| {
                if row.len() != self.n_features {
                    return Err(CostAnalyticsError::CalculationError {
                        details: format!(
                            "forest fitted on {} features, got {}",
                            self.n_features,
                            row.len()
                        ),
                    });
                }
                let mean_path = self.trees.iter().map(|t| t.path_length(row)).sum::<f64>()
                    / self.trees.len() as f64;
                let score = if normalizer > 0.0 {
                    -(2f64.powf(-mean_path / normalizer))
                } else {
                    -1.0
                };
                Ok(score)
            })
            .collect()
    }

    /// Score shifted so that negative values are outliers
    pub fn decision_function(&self, rows: &[Vec<f64>]) -> CostAnalyticsResult<Vec<f64>> {
        Ok(self
            .score_samples(rows)?
            .into_iter()
            .map(|s| s - self.offset)
            .collect())
    }

    /// Binary vote per row: `true` means outlier
    pub fn predict(&self, rows: &[Vec<f64>]) -> CostAnalyticsResult<Vec<bool>> {
        Ok(self
            .decision_function(rows)?
            .into_iter()
            .map(|d| d < 0.0)
            .collect())
    }

    /// Hyperparameters used at fit time
    pub fn params(&self) -> &IsolationForestParams {
        &self.params
    }

    /// Number of fitted trees
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Decision threshold on the raw score
    pub fn offset(&self) -> f64 {
        self.offset
    }
}
