//! Multinomial logistic regression with L1 or L2 penalty
//!
//! Features are standardized with the training mean and deviation. The loss is
//! `C * sum(log-loss) + penalty(w)`, minimized by full-batch proximal gradient
//! descent. The intercept is never penalized.

use serde::{Deserialize, Serialize};

use super::dataset::Matrix;
use super::error::ModelError;
use super::{check_training_input, softmax_in_place, Classifier};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Penalty {
    L1,
    L2,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticParams {
    /// Inverse regularization strength
    pub c: f64,
    pub penalty: Penalty,
    pub max_iter: usize,
    pub tol: f64,
}

impl Default for LogisticParams {
    fn default() -> Self {
        Self {
            c: 1.0,
            penalty: Penalty::L2,
            max_iter: 500,
            tol: 1e-4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    pub params: LogisticParams,
    means: Vec<f64>,
    scales: Vec<f64>,
    /// `weights[k]` holds the coefficients for class `k`
    weights: Vec<Vec<f64>>,
    intercepts: Vec<f64>,
}

impl LogisticRegression {
    pub fn new(params: LogisticParams) -> Self {
        Self {
            params,
            means: Vec::new(),
            scales: Vec::new(),
            weights: Vec::new(),
            intercepts: Vec::new(),
        }
    }

    fn standardize(&self, row: &[f64], out: &mut [f64]) {
        for (j, v) in row.iter().enumerate() {
            out[j] = (v - self.means[j]) / self.scales[j];
        }
    }

    fn scores(&self, z: &[f64], out: &mut [f64]) {
        for (k, w) in self.weights.iter().enumerate() {
            out[k] = self.intercepts[k] + w.iter().zip(z).map(|(a, b)| a * b).sum::<f64>();
        }
    }
}

fn column_moments(x: &Matrix) -> (Vec<f64>, Vec<f64>) {
    let n = x.nrows() as f64;
    let cols = x.ncols();
    let mut means = vec![0.0; cols];
    for row in x.rows() {
        for (m, v) in means.iter_mut().zip(row) {
            *m += v / n;
        }
    }
    let mut scales = vec![0.0; cols];
    for row in x.rows() {
        for (j, v) in row.iter().enumerate() {
            scales[j] += (v - means[j]).powi(2) / n;
        }
    }
    for s in scales.iter_mut() {
        *s = if *s > 0.0 { s.sqrt() } else { 1.0 };
    }
    (means, scales)
}

fn soft_threshold(value: f64, threshold: f64) -> f64 {
    if value > threshold {
        value - threshold
    } else if value < -threshold {
        value + threshold
    } else {
        0.0
    }
}

impl Classifier for LogisticRegression {
    fn fit(&mut self, x: &Matrix, y: &[usize], n_classes: usize) -> Result<(), ModelError> {
        check_training_input(x, y, n_classes)?;
        if self.params.c.is_nan() || self.params.c <= 0.0 {
            return Err(ModelError::InvalidParameter {
                name: "C".to_string(),
                reason: format!("must be positive, got {}", self.params.c),
            });
        }

        let (means, scales) = column_moments(x);
        self.means = means;
        self.scales = scales;

        let n = x.nrows();
        let d = x.ncols();
        let z: Vec<Vec<f64>> = x
            .rows()
            .map(|row| {
                let mut out = vec![0.0; d];
                self.standardize(row, &mut out);
                out
            })
            .collect();

        // Mean loss plus lambda * penalty, with lambda = 1 / (C * n).
        let lambda = 1.0 / (self.params.c * n as f64);
        let mean_sq_norm = z.iter().map(|r| r.iter().map(|v| v * v).sum::<f64>() + 1.0).sum::<f64>() / n as f64;
        let lipschitz = 0.5 * mean_sq_norm
            + match self.params.penalty {
                Penalty::L2 => lambda,
                Penalty::L1 => 0.0,
            };
        let step = 1.0 / lipschitz;

        self.weights = vec![vec![0.0; d]; n_classes];
        self.intercepts = vec![0.0; n_classes];

        let mut probs = vec![0.0; n_classes];
        for iteration in 0..self.params.max_iter {
            let mut grad_w = vec![vec![0.0; d]; n_classes];
            let mut grad_b = vec![0.0; n_classes];

            for (row, &label) in z.iter().zip(y) {
                self.scores(row, &mut probs);
                softmax_in_place(&mut probs);
                for k in 0..n_classes {
                    let residual = probs[k] - if k == label { 1.0 } else { 0.0 };
                    grad_b[k] += residual / n as f64;
                    for (g, v) in grad_w[k].iter_mut().zip(row) {
                        *g += residual * v / n as f64;
                    }
                }
            }

            let mut max_change: f64 = 0.0;
            for k in 0..n_classes {
                let new_b = self.intercepts[k] - step * grad_b[k];
                max_change = max_change.max((new_b - self.intercepts[k]).abs());
                self.intercepts[k] = new_b;

                for j in 0..d {
                    let w = self.weights[k][j];
                    let new_w = match self.params.penalty {
                        Penalty::L2 => w - step * (grad_w[k][j] + lambda * w),
                        Penalty::L1 => soft_threshold(w - step * grad_w[k][j], step * lambda),
                    };
                    max_change = max_change.max((new_w - w).abs());
                    self.weights[k][j] = new_w;
                }
            }

            if max_change < self.params.tol {
                tracing::trace!(iteration, "logistic regression converged");
                break;
            }
        }

        Ok(())
    }

    fn predict_proba(&self, x: &Matrix) -> Result<Vec<Vec<f64>>, ModelError> {
        if self.weights.is_empty() {
            return Err(ModelError::NotFitted);
        }
        if x.ncols() != self.means.len() {
            return Err(ModelError::FeatureCount {
                expected: self.means.len(),
                actual: x.ncols(),
            });
        }

        let mut z = vec![0.0; x.ncols()];
        Ok(x
            .rows()
            .map(|row| {
                self.standardize(row, &mut z);
                let mut probs = vec![0.0; self.weights.len()];
                self.scores(&z, &mut probs);
                softmax_in_place(&mut probs);
                probs
            })
            .collect())
    }
}
