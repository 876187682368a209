//! End-to-end training: split, search every family, vote, evaluate

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use super::dataset::{split_dataset, Dataset};
use super::ensemble::{ModelArtifact, SoftVotingEnsemble};
use super::error::ModelError;
use super::metrics::ClassificationReport;
use super::search::{randomized_search, SearchGrids, SearchOutcome};
use super::{Classifier, ModelFamily};
use crate::pipeline::{LabelEncoding, TARGET_COLUMN};

/// Training configuration, loadable from JSON. Absent fields take defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    pub input: PathBuf,
    pub target_column: String,
    /// Feature columns in order; `None` uses every column except the target
    pub features: Option<Vec<String>>,
    pub test_size: f64,
    pub seed: u64,
    pub n_iter: usize,
    pub cv_folds: usize,
    pub families: Vec<ModelFamily>,
    pub grids: SearchGrids,
    pub artifact_path: PathBuf,
    pub report_path: Option<PathBuf>,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("smote.csv"),
            target_column: TARGET_COLUMN.to_string(),
            features: None,
            test_size: 0.4,
            seed: 42,
            n_iter: 5,
            cv_folds: 3,
            families: ModelFamily::ALL.to_vec(),
            grids: SearchGrids::default(),
            artifact_path: PathBuf::from("ensemble_model.json"),
            report_path: Some(PathBuf::from("training_report.json")),
        }
    }
}

impl TrainConfig {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read training config: {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse training config: {}", path.display()))
    }

    /// Resolve the feature list against a loaded table.
    pub fn feature_columns(&self, df: &DataFrame) -> Vec<String> {
        match &self.features {
            Some(features) => features.clone(),
            None => df
                .get_column_names()
                .iter()
                .map(|name| name.to_string())
                .filter(|name| *name != self.target_column)
                .collect(),
        }
    }
}

/// Everything a training run produces.
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub artifact: ModelArtifact,
    pub searches: Vec<SearchOutcome>,
    pub report: ClassificationReport,
    pub train_rows: usize,
    pub test_rows: usize,
}

/// Fit the voting ensemble on `df` and score it on a held-out split.
pub fn train_ensemble(df: &DataFrame, config: &TrainConfig) -> Result<TrainingOutcome> {
    if config.families.is_empty() {
        anyhow::bail!("No model families selected for training");
    }

    let features = config.feature_columns(df);
    if features.is_empty() {
        anyhow::bail!("No feature columns to train on");
    }
    let data = Dataset::from_frame(df, &features, &config.target_column)?;
    let encoding =
        LabelEncoding::detect(&data.classes).ok_or_else(|| ModelError::UnsupportedLabels(data.classes.clone()))?;
    if data.n_classes() < 2 {
        return Err(ModelError::SingleClass(data.n_classes()).into());
    }

    let (train, test) = split_dataset(&data, config.test_size, config.seed)?;
    tracing::info!(
        rows = data.len(),
        train_rows = train.len(),
        test_rows = test.len(),
        features = features.len(),
        encoding = ?encoding,
        "starting ensemble training"
    );

    let mut searches = Vec::with_capacity(config.families.len());
    for &family in &config.families {
        let outcome = randomized_search(family, &config.grids, &train, config.n_iter, config.cv_folds, config.seed)
            .with_context(|| format!("Hyperparameter search failed for {}", family))?;
        searches.push(outcome);
    }

    let ensemble = SoftVotingEnsemble::new(searches.iter().map(|s| s.best_model.clone()).collect());
    let predicted = ensemble.predict(&test.x)?;
    let labels: Vec<String> = data.classes.iter().map(|c| c.to_string()).collect();
    let report = ClassificationReport::compute(&test.y, &predicted, &labels);
    tracing::info!(accuracy = report.accuracy, "ensemble evaluated on held-out split");

    let artifact = ModelArtifact::new(features, data.classes.clone(), ensemble)?;

    Ok(TrainingOutcome {
        artifact,
        searches,
        report,
        train_rows: train.len(),
        test_rows: test.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn separable_frame(n: usize) -> DataFrame {
        let a: Vec<f64> = (0..n).map(|i| (if i % 2 == 0 { 1.0 } else { 6.0 }) + (i % 5) as f64 * 0.1).collect();
        let b: Vec<i64> = (0..n).map(|i| (i % 3) as i64).collect();
        let label: Vec<i64> = (0..n).map(|i| (i % 2) as i64).collect();
        df! {
            "a" => a,
            "b" => b,
            TARGET_COLUMN => label,
        }
        .unwrap()
    }

    fn quick_config() -> TrainConfig {
        let mut config = TrainConfig {
            n_iter: 1,
            families: vec![ModelFamily::NaiveBayes, ModelFamily::LogisticRegression],
            ..TrainConfig::default()
        };
        config.grids.logistic_regression.c = vec![1.0];
        config.grids.logistic_regression.penalty = vec![crate::model::Penalty::L2];
        config
    }

    #[test]
    fn test_features_default_to_all_but_target() {
        let df = separable_frame(10);
        assert_eq!(TrainConfig::default().feature_columns(&df), vec!["a", "b"]);
    }

    #[test]
    fn test_train_ensemble_on_separable_data() {
        let df = separable_frame(60);
        let outcome = train_ensemble(&df, &quick_config()).unwrap();

        assert_eq!(outcome.train_rows + outcome.test_rows, 60);
        assert_eq!(outcome.test_rows, 24);
        assert_eq!(outcome.searches.len(), 2);
        assert_eq!(outcome.artifact.feature_names, vec!["a", "b"]);
        assert_eq!(outcome.artifact.label_encoding, LabelEncoding::Binary);
        assert!(outcome.report.accuracy > 0.9);
    }

    #[test]
    fn test_rejects_unknown_label_values() {
        let df = df! {
            "a" => [1.0, 2.0, 3.0, 4.0],
            TARGET_COLUMN => [0i64, 5, 0, 5],
        }
        .unwrap();
        let err = train_ensemble(&df, &quick_config()).unwrap_err();
        assert!(err.to_string().contains("neither binary"));
    }

    #[test]
    fn test_partial_json_config_keeps_defaults() {
        let config: TrainConfig = serde_json::from_str(r#"{"n_iter": 2, "families": ["naive_bayes"]}"#).unwrap();
        assert_eq!(config.n_iter, 2);
        assert_eq!(config.families, vec![ModelFamily::NaiveBayes]);
        assert_eq!(config.cv_folds, 3);
        assert_eq!(config.test_size, 0.4);
    }
}
