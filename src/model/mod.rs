//! Model module - classifier families, hyperparameter search and the voting ensemble

pub mod boosting;
pub mod dataset;
pub mod ensemble;
pub mod error;
pub mod forest;
pub mod logistic;
pub mod metrics;
pub mod naive_bayes;
pub mod search;
pub mod train;
pub mod tree;

use serde::{Deserialize, Serialize};

pub use boosting::{BoostParams, GradientBoosting, Growth};
pub use dataset::{split_dataset, Dataset, Matrix, StratifiedKFold};
pub use ensemble::{ModelArtifact, SoftVotingEnsemble, ARTIFACT_FORMAT_VERSION};
pub use error::ModelError;
pub use forest::{ForestParams, MaxFeatures, RandomForest};
pub use logistic::{LogisticParams, LogisticRegression, Penalty};
pub use metrics::{ClassMetrics, ClassificationReport};
pub use naive_bayes::{GaussianNaiveBayes, NaiveBayesParams};
pub use search::{randomized_search, SearchGrids, SearchOutcome};
pub use train::{train_ensemble, TrainConfig, TrainingOutcome};

/// Uniform fit / probability interface shared by every model family.
pub trait Classifier {
    /// Fit on rows of `x` with class indices `y` in `0..n_classes`.
    fn fit(&mut self, x: &Matrix, y: &[usize], n_classes: usize) -> Result<(), ModelError>;

    /// One probability vector of length `n_classes` per row.
    fn predict_proba(&self, x: &Matrix) -> Result<Vec<Vec<f64>>, ModelError>;

    /// Most probable class index per row.
    fn predict(&self, x: &Matrix) -> Result<Vec<usize>, ModelError> {
        Ok(self.predict_proba(x)?.iter().map(|p| argmax(p)).collect())
    }
}

/// The five model families the ensemble is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelFamily {
    LogisticRegression,
    RandomForest,
    NaiveBayes,
    /// Depth-wise boosted trees with column subsampling
    GradientBoostA,
    /// Leaf-wise boosted trees with a leaf budget
    GradientBoostB,
}

impl ModelFamily {
    pub const ALL: [ModelFamily; 5] = [
        Self::LogisticRegression,
        Self::RandomForest,
        Self::NaiveBayes,
        Self::GradientBoostA,
        Self::GradientBoostB,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::LogisticRegression => "logistic_regression",
            Self::RandomForest => "random_forest",
            Self::NaiveBayes => "naive_bayes",
            Self::GradientBoostA => "gradient_boost_a",
            Self::GradientBoostB => "gradient_boost_b",
        }
    }
}

impl std::fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One hyperparameter setting for one family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", content = "params", rename_all = "snake_case")]
pub enum ModelSpec {
    LogisticRegression(LogisticParams),
    RandomForest(ForestParams),
    NaiveBayes(NaiveBayesParams),
    GradientBoostA(BoostParams),
    GradientBoostB(BoostParams),
}

impl ModelSpec {
    pub fn family(&self) -> ModelFamily {
        match self {
            Self::LogisticRegression(_) => ModelFamily::LogisticRegression,
            Self::RandomForest(_) => ModelFamily::RandomForest,
            Self::NaiveBayes(_) => ModelFamily::NaiveBayes,
            Self::GradientBoostA(_) => ModelFamily::GradientBoostA,
            Self::GradientBoostB(_) => ModelFamily::GradientBoostB,
        }
    }

    /// An unfitted model with these parameters.
    pub fn build(&self) -> TrainedModel {
        match self {
            Self::LogisticRegression(p) => TrainedModel::LogisticRegression(LogisticRegression::new(p.clone())),
            Self::RandomForest(p) => TrainedModel::RandomForest(RandomForest::new(p.clone())),
            Self::NaiveBayes(p) => TrainedModel::NaiveBayes(GaussianNaiveBayes::new(p.clone())),
            Self::GradientBoostA(p) => TrainedModel::GradientBoostA(GradientBoosting::new(p.clone())),
            Self::GradientBoostB(p) => TrainedModel::GradientBoostB(GradientBoosting::new(p.clone())),
        }
    }
}

/// A model of any family, fitted or not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", content = "model", rename_all = "snake_case")]
pub enum TrainedModel {
    LogisticRegression(LogisticRegression),
    RandomForest(RandomForest),
    NaiveBayes(GaussianNaiveBayes),
    GradientBoostA(GradientBoosting),
    GradientBoostB(GradientBoosting),
}

impl TrainedModel {
    pub fn family(&self) -> ModelFamily {
        match self {
            Self::LogisticRegression(_) => ModelFamily::LogisticRegression,
            Self::RandomForest(_) => ModelFamily::RandomForest,
            Self::NaiveBayes(_) => ModelFamily::NaiveBayes,
            Self::GradientBoostA(_) => ModelFamily::GradientBoostA,
            Self::GradientBoostB(_) => ModelFamily::GradientBoostB,
        }
    }

    fn as_classifier(&self) -> &dyn Classifier {
        match self {
            Self::LogisticRegression(m) => m,
            Self::RandomForest(m) => m,
            Self::NaiveBayes(m) => m,
            Self::GradientBoostA(m) | Self::GradientBoostB(m) => m,
        }
    }

    fn as_classifier_mut(&mut self) -> &mut dyn Classifier {
        match self {
            Self::LogisticRegression(m) => m,
            Self::RandomForest(m) => m,
            Self::NaiveBayes(m) => m,
            Self::GradientBoostA(m) | Self::GradientBoostB(m) => m,
        }
    }
}

impl Classifier for TrainedModel {
    fn fit(&mut self, x: &Matrix, y: &[usize], n_classes: usize) -> Result<(), ModelError> {
        self.as_classifier_mut().fit(x, y, n_classes)
    }

    fn predict_proba(&self, x: &Matrix) -> Result<Vec<Vec<f64>>, ModelError> {
        self.as_classifier().predict_proba(x)
    }
}

/// Common checks before fitting any family.
pub(crate) fn check_training_input(x: &Matrix, y: &[usize], n_classes: usize) -> Result<(), ModelError> {
    if x.nrows() == 0 || x.ncols() == 0 {
        return Err(ModelError::EmptyData);
    }
    if x.nrows() != y.len() {
        return Err(ModelError::LengthMismatch {
            rows: x.nrows(),
            labels: y.len(),
        });
    }
    if n_classes < 2 {
        return Err(ModelError::SingleClass(n_classes));
    }
    if let Some(&bad) = y.iter().find(|&&c| c >= n_classes) {
        return Err(ModelError::InvalidParameter {
            name: "y".to_string(),
            reason: format!("class index {} out of range for {} classes", bad, n_classes),
        });
    }
    Ok(())
}

/// Index of the largest value; the first one wins ties.
pub fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate() {
        if *v > values[best] {
            best = i;
        }
    }
    best
}

pub(crate) fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

/// Numerically stable softmax. `-inf` entries get probability zero.
pub(crate) fn softmax_in_place(values: &mut [f64]) {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        let n = values.len() as f64;
        values.iter_mut().for_each(|v| *v = 1.0 / n);
        return;
    }
    let mut sum = 0.0;
    for v in values.iter_mut() {
        *v = (*v - max).exp();
        sum += *v;
    }
    values.iter_mut().for_each(|v| *v /= sum);
}
