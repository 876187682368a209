//! Random forest of bootstrapped Gini trees

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::dataset::Matrix;
use super::error::ModelError;
use super::tree::{fit_classification_tree, ClassTreeParams, Tree};
use super::{check_training_input, Classifier};

/// Number of features tried at each split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaxFeatures {
    Sqrt,
    Log2,
    All,
}

impl MaxFeatures {
    pub fn count(self, n_features: usize) -> usize {
        let d = n_features as f64;
        let k = match self {
            Self::Sqrt => d.sqrt().floor() as usize,
            Self::Log2 => d.log2().floor() as usize,
            Self::All => n_features,
        };
        k.clamp(1, n_features.max(1))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: MaxFeatures,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::Sqrt,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    pub params: ForestParams,
    trees: Vec<Tree>,
    n_classes: usize,
    n_features: usize,
}

impl RandomForest {
    pub fn new(params: ForestParams) -> Self {
        Self {
            params,
            trees: Vec::new(),
            n_classes: 0,
            n_features: 0,
        }
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

impl Classifier for RandomForest {
    fn fit(&mut self, x: &Matrix, y: &[usize], n_classes: usize) -> Result<(), ModelError> {
        check_training_input(x, y, n_classes)?;
        if self.params.n_estimators == 0 {
            return Err(ModelError::InvalidParameter {
                name: "n_estimators".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        let n = x.nrows();
        let tree_params = ClassTreeParams {
            max_depth: self.params.max_depth,
            min_samples_split: self.params.min_samples_split.max(2),
            min_samples_leaf: self.params.min_samples_leaf.max(1),
            max_features: Some(self.params.max_features.count(x.ncols())),
        };
        let seed = self.params.seed;

        self.trees = (0..self.params.n_estimators)
            .into_par_iter()
            .map(|t| {
                let mut rng = StdRng::seed_from_u64(seed.wrapping_add(t as u64));
                let bootstrap: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                fit_classification_tree(x, y, n_classes, bootstrap, &tree_params, &mut rng)
            })
            .collect();
        self.n_classes = n_classes;
        self.n_features = x.ncols();

        tracing::debug!(trees = self.trees.len(), "random forest fitted");
        Ok(())
    }

    fn predict_proba(&self, x: &Matrix) -> Result<Vec<Vec<f64>>, ModelError> {
        if self.trees.is_empty() {
            return Err(ModelError::NotFitted);
        }
        if x.ncols() != self.n_features {
            return Err(ModelError::FeatureCount {
                expected: self.n_features,
                actual: x.ncols(),
            });
        }

        let n_trees = self.trees.len() as f64;
        Ok(x
            .rows()
            .map(|row| {
                let mut probs = vec![0.0; self.n_classes];
                for tree in &self.trees {
                    for (p, v) in probs.iter_mut().zip(tree.leaf(row)) {
                        *p += v / n_trees;
                    }
                }
                probs
            })
            .collect())
    }
}
