//! JSON training report
//!
//! Records the run settings, every scored search candidate and the held-out
//! evaluation of the final ensemble.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;

use crate::model::{ClassificationReport, ModelFamily, SearchOutcome, TrainConfig, TrainingOutcome};

/// Report metadata
#[derive(Debug, Clone, Serialize)]
pub struct ReportMetadata {
    pub timestamp: String,
    pub cardiopipe_version: String,
    pub input_file: String,
    pub artifact_file: String,
    pub trained_at: String,
}

/// Settings used for the run
#[derive(Debug, Clone, Serialize)]
pub struct TrainingSettings {
    pub target_column: String,
    pub features: Vec<String>,
    pub classes: Vec<i64>,
    pub test_size: f64,
    pub seed: u64,
    pub n_iter: usize,
    pub cv_folds: usize,
    pub train_rows: usize,
    pub test_rows: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrainingReport<'a> {
    pub metadata: ReportMetadata,
    pub settings: TrainingSettings,
    pub members: Vec<ModelFamily>,
    pub searches: &'a [SearchOutcome],
    pub evaluation: &'a ClassificationReport,
}

impl<'a> TrainingReport<'a> {
    pub fn new(config: &TrainConfig, outcome: &'a TrainingOutcome) -> Self {
        let artifact = &outcome.artifact;
        Self {
            metadata: ReportMetadata {
                timestamp: Utc::now().to_rfc3339(),
                cardiopipe_version: env!("CARGO_PKG_VERSION").to_string(),
                input_file: config.input.display().to_string(),
                artifact_file: config.artifact_path.display().to_string(),
                trained_at: artifact.trained_at.to_rfc3339(),
            },
            settings: TrainingSettings {
                target_column: config.target_column.clone(),
                features: artifact.feature_names.clone(),
                classes: artifact.classes.clone(),
                test_size: config.test_size,
                seed: config.seed,
                n_iter: config.n_iter,
                cv_folds: config.cv_folds,
                train_rows: outcome.train_rows,
                test_rows: outcome.test_rows,
            },
            members: artifact.ensemble.families(),
            searches: &outcome.searches,
            evaluation: &outcome.report,
        }
    }
}

pub fn export_training_report(report: &TrainingReport<'_>, output_path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("Failed to serialize training report")?;
    std::fs::write(output_path, json)
        .with_context(|| format!("Failed to write training report to {}", output_path.display()))?;
    Ok(())
}
