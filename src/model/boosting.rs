//! Second-order gradient boosting on log-loss
//!
//! One model type covers both boosted-tree families: depth-wise growth with
//! column subsampling, and leaf-wise growth bounded by a leaf budget. Binary
//! problems fit one score per row; multi-class problems fit one score per class
//! and combine them with a softmax.

use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use super::dataset::Matrix;
use super::error::ModelError;
use super::tree::{fit_gradient_tree, GradientTreeParams, Tree};
use super::{check_training_input, sigmoid, softmax_in_place, Classifier};

const MIN_HESSIAN: f64 = 1e-16;
const MIN_PRIOR: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Growth {
    /// Split every node until `max_depth`
    DepthWise,
    /// Split the best leaf first until `num_leaves`
    LeafWise,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoostParams {
    pub n_estimators: usize,
    pub learning_rate: f64,
    /// `None` means unlimited depth
    pub max_depth: Option<usize>,
    /// Leaf budget, used by leaf-wise growth only
    pub num_leaves: Option<usize>,
    /// Fraction of rows drawn without replacement for each round
    pub subsample: f64,
    /// Fraction of features drawn for each round
    pub colsample_bytree: f64,
    pub reg_lambda: f64,
    pub min_child_weight: f64,
    pub min_samples_leaf: usize,
    pub growth: Growth,
    pub seed: u64,
}

impl BoostParams {
    /// Defaults for the depth-wise family.
    pub fn depth_wise() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.3,
            max_depth: Some(6),
            num_leaves: None,
            subsample: 1.0,
            colsample_bytree: 1.0,
            reg_lambda: 1.0,
            min_child_weight: 1.0,
            min_samples_leaf: 1,
            growth: Growth::DepthWise,
            seed: 42,
        }
    }

    /// Defaults for the leaf-wise family.
    pub fn leaf_wise() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: None,
            num_leaves: Some(31),
            subsample: 1.0,
            colsample_bytree: 1.0,
            reg_lambda: 0.0,
            min_child_weight: 1e-3,
            min_samples_leaf: 20,
            growth: Growth::LeafWise,
            seed: 42,
        }
    }

    fn validate(&self) -> Result<(), ModelError> {
        let invalid = |name: &str, reason: String| ModelError::InvalidParameter {
            name: name.to_string(),
            reason,
        };
        if self.n_estimators == 0 {
            return Err(invalid("n_estimators", "must be at least 1".to_string()));
        }
        if self.learning_rate.is_nan() || self.learning_rate <= 0.0 {
            return Err(invalid("learning_rate", format!("must be positive, got {}", self.learning_rate)));
        }
        for (name, fraction) in [("subsample", self.subsample), ("colsample_bytree", self.colsample_bytree)] {
            if fraction.is_nan() || fraction <= 0.0 || fraction > 1.0 {
                return Err(invalid(name, format!("must be in (0, 1], got {}", fraction)));
            }
        }
        if self.num_leaves.is_some_and(|n| n < 2) {
            return Err(invalid("num_leaves", "must be at least 2".to_string()));
        }
        Ok(())
    }

    fn tree_params(&self) -> GradientTreeParams {
        GradientTreeParams {
            max_depth: self.max_depth,
            max_leaves: match self.growth {
                Growth::DepthWise => None,
                Growth::LeafWise => self.num_leaves,
            },
            min_child_weight: self.min_child_weight,
            min_samples_leaf: self.min_samples_leaf.max(1),
            lambda: self.reg_lambda,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoosting {
    pub params: BoostParams,
    n_classes: usize,
    n_features: usize,
    base_scores: Vec<f64>,
    /// One tree per output score per round
    rounds: Vec<Vec<Tree>>,
}

impl GradientBoosting {
    pub fn new(params: BoostParams) -> Self {
        Self {
            params,
            n_classes: 0,
            n_features: 0,
            base_scores: Vec::new(),
            rounds: Vec::new(),
        }
    }

    fn n_outputs(n_classes: usize) -> usize {
        if n_classes == 2 {
            1
        } else {
            n_classes
        }
    }

    fn raw_scores(&self, row: &[f64]) -> Vec<f64> {
        let mut scores = self.base_scores.clone();
        for round in &self.rounds {
            for (s, tree) in scores.iter_mut().zip(round) {
                *s += self.params.learning_rate * tree.leaf(row)[0];
            }
        }
        scores
    }

    fn to_proba(n_classes: usize, mut scores: Vec<f64>) -> Vec<f64> {
        if n_classes == 2 {
            let p = sigmoid(scores[0]);
            vec![1.0 - p, p]
        } else {
            softmax_in_place(&mut scores);
            scores
        }
    }
}

impl Classifier for GradientBoosting {
    fn fit(&mut self, x: &Matrix, y: &[usize], n_classes: usize) -> Result<(), ModelError> {
        check_training_input(x, y, n_classes)?;
        self.params.validate()?;

        let n = x.nrows();
        let d = x.ncols();
        let outputs = Self::n_outputs(n_classes);
        let tree_params = self.params.tree_params();

        let mut counts = vec![0.0; n_classes];
        for &c in y {
            counts[c] += 1.0;
        }
        let priors: Vec<f64> = counts.iter().map(|c| (c / n as f64).max(MIN_PRIOR)).collect();
        self.base_scores = if outputs == 1 {
            vec![(priors[1] / priors[0]).ln()]
        } else {
            priors.iter().map(|p| p.ln()).collect()
        };

        let mut scores: Vec<Vec<f64>> = vec![self.base_scores.clone(); n];
        let mut rng = StdRng::seed_from_u64(self.params.seed);
        let n_rows = ((n as f64 * self.params.subsample).round() as usize).clamp(1, n);
        let n_cols = ((d as f64 * self.params.colsample_bytree).round() as usize).clamp(1, d.max(1));

        self.rounds = Vec::with_capacity(self.params.n_estimators);
        let mut grad = vec![vec![0.0; n]; outputs];
        let mut hess = vec![vec![0.0; n]; outputs];

        for _ in 0..self.params.n_estimators {
            for i in 0..n {
                let probs = Self::to_proba(n_classes, scores[i].clone());
                for k in 0..outputs {
                    // Binary problems score the positive class.
                    let class = if outputs == 1 { 1 } else { k };
                    let p = probs[class];
                    let target = if y[i] == class { 1.0 } else { 0.0 };
                    grad[k][i] = p - target;
                    hess[k][i] = (p * (1.0 - p)).max(MIN_HESSIAN);
                }
            }

            let rows: Vec<usize> = if n_rows < n {
                sample(&mut rng, n, n_rows).into_vec()
            } else {
                (0..n).collect()
            };
            let features: Vec<usize> = if n_cols < d {
                let mut f = sample(&mut rng, d, n_cols).into_vec();
                f.sort_unstable();
                f
            } else {
                (0..d).collect()
            };

            let round: Vec<Tree> = (0..outputs)
                .map(|k| fit_gradient_tree(x, &grad[k], &hess[k], rows.clone(), &features, &tree_params))
                .collect();

            for (i, row) in x.rows().enumerate() {
                for (k, tree) in round.iter().enumerate() {
                    scores[i][k] += self.params.learning_rate * tree.leaf(row)[0];
                }
            }
            self.rounds.push(round);
        }

        self.n_classes = n_classes;
        self.n_features = d;
        tracing::debug!(
            rounds = self.rounds.len(),
            growth = ?self.params.growth,
            "gradient boosting fitted"
        );
        Ok(())
    }

    fn predict_proba(&self, x: &Matrix) -> Result<Vec<Vec<f64>>, ModelError> {
        if self.rounds.is_empty() {
            return Err(ModelError::NotFitted);
        }
        if x.ncols() != self.n_features {
            return Err(ModelError::FeatureCount {
                expected: self.n_features,
                actual: x.ncols(),
            });
        }
        Ok(x
            .rows()
            .map(|row| Self::to_proba(self.n_classes, self.raw_scores(row)))
            .collect())
    }
}
