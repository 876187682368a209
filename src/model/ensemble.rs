//! Soft-voting ensemble and its persisted artifact

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::dataset::Matrix;
use super::error::ModelError;
use super::{Classifier, ModelFamily, TrainedModel};
use crate::pipeline::LabelEncoding;

/// Bumped whenever the artifact layout changes incompatibly.
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// Uniform average of the members' class probabilities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoftVotingEnsemble {
    members: Vec<TrainedModel>,
}

impl SoftVotingEnsemble {
    pub fn new(members: Vec<TrainedModel>) -> Self {
        Self { members }
    }

    pub fn members(&self) -> &[TrainedModel] {
        &self.members
    }

    pub fn families(&self) -> Vec<ModelFamily> {
        self.members.iter().map(TrainedModel::family).collect()
    }
}

impl Classifier for SoftVotingEnsemble {
    fn fit(&mut self, x: &Matrix, y: &[usize], n_classes: usize) -> Result<(), ModelError> {
        for member in &mut self.members {
            member.fit(x, y, n_classes)?;
        }
        Ok(())
    }

    fn predict_proba(&self, x: &Matrix) -> Result<Vec<Vec<f64>>, ModelError> {
        if self.members.is_empty() {
            return Err(ModelError::NotFitted);
        }
        let weight = 1.0 / self.members.len() as f64;
        let mut total: Vec<Vec<f64>> = Vec::new();
        for member in &self.members {
            let probs = member.predict_proba(x)?;
            if total.is_empty() {
                total = probs
                    .into_iter()
                    .map(|row| row.into_iter().map(|p| p * weight).collect())
                    .collect();
            } else {
                for (acc, row) in total.iter_mut().zip(probs) {
                    for (a, p) in acc.iter_mut().zip(row) {
                        *a += p * weight;
                    }
                }
            }
        }
        Ok(total)
    }
}

/// Everything the predictor needs, persisted as one JSON document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub format_version: u32,
    pub trained_at: DateTime<Utc>,
    /// Feature order the ensemble was fit on
    pub feature_names: Vec<String>,
    /// Original label value for each class index
    pub classes: Vec<i64>,
    pub label_encoding: LabelEncoding,
    pub ensemble: SoftVotingEnsemble,
}

impl ModelArtifact {
    pub fn new(
        feature_names: Vec<String>,
        classes: Vec<i64>,
        ensemble: SoftVotingEnsemble,
    ) -> Result<Self, ModelError> {
        let label_encoding =
            LabelEncoding::detect(&classes).ok_or_else(|| ModelError::UnsupportedLabels(classes.clone()))?;
        Ok(Self {
            format_version: ARTIFACT_FORMAT_VERSION,
            trained_at: Utc::now(),
            feature_names,
            classes,
            label_encoding,
            ensemble,
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        let json = serde_json::to_string(self).context("Failed to serialize model artifact")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write model artifact: {}", path.display()))?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read model artifact: {}", path.display()))?;
        let artifact: Self = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse model artifact: {}", path.display()))?;
        if artifact.format_version != ARTIFACT_FORMAT_VERSION {
            return Err(ModelError::UnsupportedVersion {
                found: artifact.format_version,
                expected: ARTIFACT_FORMAT_VERSION,
            }
            .into());
        }
        Ok(artifact)
    }

    pub fn predict_proba(&self, x: &Matrix) -> Result<Vec<Vec<f64>>, ModelError> {
        if x.ncols() != self.feature_names.len() {
            return Err(ModelError::FeatureCount {
                expected: self.feature_names.len(),
                actual: x.ncols(),
            });
        }
        self.ensemble.predict_proba(x)
    }

    /// Probability mass on the disease-present classes.
    ///
    /// For a binary model this is P(1); for a four-way model, 1 - P(healthy).
    pub fn disease_probability(&self, probs: &[f64]) -> f64 {
        let p: f64 = self
            .classes
            .iter()
            .zip(probs)
            .filter(|(class, _)| self.label_encoding.is_disease(**class))
            .map(|(_, p)| p)
            .sum();
        p.clamp(0.0, 1.0)
    }

    /// Label value of the most probable class.
    pub fn predicted_class(&self, probs: &[f64]) -> i64 {
        self.classes[super::argmax(probs)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NaiveBayesParams, LogisticParams, ModelSpec};
    use tempfile::TempDir;

    fn fitted_ensemble(classes: usize) -> (SoftVotingEnsemble, Matrix) {
        let rows: Vec<Vec<f64>> = (0..30).map(|i| vec![(i % classes) as f64 * 3.0, (i % 4) as f64]).collect();
        let x = Matrix::from_rows(&rows).unwrap();
        let y: Vec<usize> = (0..30).map(|i| i % classes).collect();
        let mut ensemble = SoftVotingEnsemble::new(vec![
            ModelSpec::NaiveBayes(NaiveBayesParams::default()).build(),
            ModelSpec::LogisticRegression(LogisticParams::default()).build(),
        ]);
        ensemble.fit(&x, &y, classes).unwrap();
        (ensemble, x)
    }

    #[test]
    fn test_soft_vote_is_member_mean() {
        let (ensemble, x) = fitted_ensemble(2);
        let nb = ensemble.members()[0].predict_proba(&x).unwrap();
        let lr = ensemble.members()[1].predict_proba(&x).unwrap();
        let votes = ensemble.predict_proba(&x).unwrap();
        for i in 0..x.nrows() {
            for k in 0..2 {
                assert!((votes[i][k] - (nb[i][k] + lr[i][k]) / 2.0).abs() < 1e-12);
            }
            assert!((votes[i].iter().sum::<f64>() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_artifact_round_trip() {
        let (ensemble, x) = fitted_ensemble(2);
        let artifact = ModelArtifact::new(vec!["a".into(), "b".into()], vec![0, 1], ensemble).unwrap();

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.json");
        artifact.save(&path).unwrap();
        let loaded = ModelArtifact::load(&path).unwrap();

        assert_eq!(loaded.label_encoding, LabelEncoding::Binary);
        assert_eq!(loaded.predict_proba(&x).unwrap(), artifact.predict_proba(&x).unwrap());
    }

    #[test]
    fn test_four_way_disease_probability() {
        let (ensemble, _) = fitted_ensemble(4);
        let artifact = ModelArtifact::new(vec!["a".into(), "b".into()], vec![1, 2, 3, 4], ensemble).unwrap();
        assert_eq!(artifact.label_encoding, LabelEncoding::FourWay);

        let probs = [0.1, 0.2, 0.3, 0.4];
        assert!((artifact.disease_probability(&probs) - 0.6).abs() < 1e-12);
        assert_eq!(artifact.predicted_class(&probs), 4);
    }

    #[test]
    fn test_unsupported_labels() {
        let (ensemble, _) = fitted_ensemble(2);
        let err = ModelArtifact::new(vec!["a".into(), "b".into()], vec![0, 7], ensemble).unwrap_err();
        assert_eq!(err, ModelError::UnsupportedLabels(vec![0, 7]));
    }

    #[test]
    fn test_version_mismatch_is_rejected() {
        let (ensemble, _) = fitted_ensemble(2);
        let mut artifact = ModelArtifact::new(vec!["a".into(), "b".into()], vec![0, 1], ensemble).unwrap();
        artifact.format_version = 99;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.json");
        artifact.save(&path).unwrap();
        let err = ModelArtifact::load(&path).unwrap_err();
        assert!(err.to_string().contains("version 99"));
    }

    #[test]
    fn test_feature_count_checked() {
        let (ensemble, _) = fitted_ensemble(2);
        let artifact = ModelArtifact::new(vec!["a".into(), "b".into()], vec![0, 1], ensemble).unwrap();
        let x = Matrix::from_rows(&[vec![1.0]]).unwrap();
        assert_eq!(
            artifact.predict_proba(&x).unwrap_err(),
            ModelError::FeatureCount { expected: 2, actual: 1 }
        );
    }
}
