//! Gaussian naive Bayes

use serde::{Deserialize, Serialize};

use super::dataset::Matrix;
use super::error::ModelError;
use super::{check_training_input, softmax_in_place, Classifier};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NaiveBayesParams {
    /// Fraction of the largest feature variance added to every variance
    pub var_smoothing: f64,
}

impl Default for NaiveBayesParams {
    fn default() -> Self {
        Self { var_smoothing: 1e-9 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaussianNaiveBayes {
    pub params: NaiveBayesParams,
    /// `None` for classes absent from the training data
    log_priors: Vec<Option<f64>>,
    means: Vec<Vec<f64>>,
    variances: Vec<Vec<f64>>,
}

impl GaussianNaiveBayes {
    pub fn new(params: NaiveBayesParams) -> Self {
        Self {
            params,
            log_priors: Vec::new(),
            means: Vec::new(),
            variances: Vec::new(),
        }
    }
}

impl Classifier for GaussianNaiveBayes {
    fn fit(&mut self, x: &Matrix, y: &[usize], n_classes: usize) -> Result<(), ModelError> {
        check_training_input(x, y, n_classes)?;
        let d = x.ncols();
        let n = x.nrows() as f64;

        let mut counts = vec![0.0; n_classes];
        let mut means = vec![vec![0.0; d]; n_classes];
        for (row, &class) in x.rows().zip(y) {
            counts[class] += 1.0;
            for (m, v) in means[class].iter_mut().zip(row) {
                *m += v;
            }
        }
        for (mean, count) in means.iter_mut().zip(&counts) {
            if *count > 0.0 {
                mean.iter_mut().for_each(|m| *m /= count);
            }
        }

        let mut variances = vec![vec![0.0; d]; n_classes];
        for (row, &class) in x.rows().zip(y) {
            for j in 0..d {
                variances[class][j] += (row[j] - means[class][j]).powi(2);
            }
        }

        // Smoothing is relative to the largest overall feature variance.
        let mut max_var: f64 = 0.0;
        for j in 0..d {
            let mean = x.rows().map(|r| r[j]).sum::<f64>() / n;
            let var = x.rows().map(|r| (r[j] - mean).powi(2)).sum::<f64>() / n;
            max_var = max_var.max(var);
        }
        let epsilon = (self.params.var_smoothing * max_var).max(f64::MIN_POSITIVE);

        for (var, count) in variances.iter_mut().zip(&counts) {
            for v in var.iter_mut() {
                let within = if *count > 0.0 { *v / count } else { 0.0 };
                *v = within + epsilon;
            }
        }

        self.log_priors = counts
            .iter()
            .map(|c| (*c > 0.0).then(|| (c / n).ln()))
            .collect();
        self.means = means;
        self.variances = variances;
        Ok(())
    }

    fn predict_proba(&self, x: &Matrix) -> Result<Vec<Vec<f64>>, ModelError> {
        if self.log_priors.is_empty() {
            return Err(ModelError::NotFitted);
        }
        let d = self.means[0].len();
        if x.ncols() != d {
            return Err(ModelError::FeatureCount {
                expected: d,
                actual: x.ncols(),
            });
        }

        Ok(x
            .rows()
            .map(|row| {
                let mut joint: Vec<f64> = self
                    .log_priors
                    .iter()
                    .enumerate()
                    .map(|(k, prior)| match prior {
                        Some(prior) => {
                            prior
                                + row
                                    .iter()
                                    .zip(&self.means[k])
                                    .zip(&self.variances[k])
                                    .map(|((v, m), var)| {
                                        -0.5 * (2.0 * std::f64::consts::PI * var).ln()
                                            - (v - m).powi(2) / (2.0 * var)
                                    })
                                    .sum::<f64>()
                        }
                        None => f64::NEG_INFINITY,
                    })
                    .collect();
                softmax_in_place(&mut joint);
                joint
            })
            .collect())
    }
}
