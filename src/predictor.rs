//! Loaded ensemble plus request validation
//!
//! A [`Predictor`] can only be obtained from a successfully loaded artifact, so
//! every code path that holds one is ready to answer. Feature vectors are built
//! by name in the order recorded in the artifact.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::model::{Matrix, ModelArtifact, ModelError};
use crate::pipeline::{engineer_answers, BinConfig, BinningError, LabelEncoding};

/// Why a prediction request was rejected before reaching the model.
#[derive(Debug, Error, PartialEq)]
pub enum RequestError {
    #[error("request body must be a JSON object")]
    NotAnObject,

    #[error("missing required field(s): {}", .0.join(", "))]
    MissingFields(Vec<String>),

    #[error("unknown field(s): {}", .0.join(", "))]
    UnknownFields(Vec<String>),

    #[error("field '{field}' {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Result of scoring one feature vector.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    /// Probability that heart disease is present, in `[0, 1]`
    pub probability: f64,
    /// Most probable label value
    pub class: i64,
    pub class_probabilities: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct Predictor {
    artifact: ModelArtifact,
    bins: BinConfig,
}

impl Predictor {
    pub fn load(path: &Path) -> Result<Self> {
        let artifact = ModelArtifact::load(path)
            .with_context(|| format!("Failed to load model from {}", path.display()))?;
        tracing::info!(
            path = %path.display(),
            members = artifact.ensemble.members().len(),
            features = artifact.feature_names.len(),
            trained_at = %artifact.trained_at,
            "model artifact loaded"
        );
        Ok(Self::from_artifact(artifact))
    }

    pub fn from_artifact(artifact: ModelArtifact) -> Self {
        Self {
            artifact,
            bins: BinConfig::default(),
        }
    }

    pub fn feature_names(&self) -> &[String] {
        &self.artifact.feature_names
    }

    pub fn label_encoding(&self) -> LabelEncoding {
        self.artifact.label_encoding
    }

    /// Check a request body and build the feature vector in model order.
    ///
    /// All structural problems are reported before any value is parsed: missing
    /// names first, then unknown names, then the first unparseable value.
    pub fn validate_features(&self, body: &Value) -> Result<Vec<f64>, RequestError> {
        let object = body.as_object().ok_or(RequestError::NotAnObject)?;

        let missing: Vec<String> = self
            .feature_names()
            .iter()
            .filter(|name| !object.contains_key(name.as_str()))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(RequestError::MissingFields(missing));
        }

        let known: BTreeSet<&str> = self.feature_names().iter().map(String::as_str).collect();
        let unknown: Vec<String> = object
            .keys()
            .filter(|key| !known.contains(key.as_str()))
            .cloned()
            .collect();
        if !unknown.is_empty() {
            return Err(RequestError::UnknownFields(unknown));
        }

        self.feature_names()
            .iter()
            .map(|name| parse_value(name, object))
            .collect()
    }

    /// Score one feature vector already in model order.
    pub fn predict_vector(&self, features: &[f64]) -> Result<Prediction, ModelError> {
        let x = Matrix::new(1, features.len(), features.to_vec())?;
        let mut probs = self.artifact.predict_proba(&x)?;
        let class_probabilities = probs.pop().ok_or(ModelError::EmptyData)?;
        Ok(Prediction {
            probability: self.artifact.disease_probability(&class_probabilities),
            class: self.artifact.predicted_class(&class_probabilities),
            class_probabilities,
        })
    }

    /// Score raw survey answers (unbinned BMI and day-counts, separate diet flags).
    pub fn predict_answers(&self, answers: &HashMap<String, f64>) -> Result<Prediction> {
        let engineered = engineer_answers(answers, &self.bins)?;
        let features = self
            .feature_names()
            .iter()
            .map(|name| {
                engineered
                    .get(name)
                    .copied()
                    .ok_or_else(|| BinningError::MissingValue {
                        column: name.clone(),
                        row: 0,
                    })
            })
            .collect::<Result<Vec<f64>, _>>()?;
        Ok(self.predict_vector(&features)?)
    }
}

fn parse_value(name: &str, object: &Map<String, Value>) -> Result<f64, RequestError> {
    let invalid = |reason: String| RequestError::InvalidValue {
        field: name.to_string(),
        reason,
    };
    let value = match object.get(name) {
        Some(Value::Number(n)) => n.as_f64().ok_or_else(|| invalid(format!("is not representable: {}", n)))?,
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| invalid(format!("is not numeric: {:?}", s)))?,
        Some(Value::Null) | None => return Err(invalid("is null".to_string())),
        Some(other) => return Err(invalid(format!("must be a number, got {}", other))),
    };
    if !value.is_finite() {
        return Err(invalid(format!("must be finite, got {}", value)));
    }
    Ok(value)
}
