//! Classification metrics
//!
//! Accuracy comes from smartcore. Its precision and recall only score a binary
//! positive class, so the per-class rows are counted here.

use serde::Serialize;
use smartcore::metrics::accuracy;

use super::dataset::to_labels;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassMetrics {
    pub label: String,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Per-class precision/recall/F1 plus overall accuracy and averages.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationReport {
    pub classes: Vec<ClassMetrics>,
    pub accuracy: f64,
    pub macro_avg: ClassMetrics,
    pub weighted_avg: ClassMetrics,
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

impl ClassificationReport {
    /// Build the report; `labels[k]` names class index `k`.
    pub fn compute(y_true: &[usize], y_pred: &[usize], labels: &[String]) -> Self {
        let overall = if y_true.is_empty() {
            0.0
        } else {
            accuracy(&to_labels(y_true), &to_labels(y_pred))
        };

        let k = labels.len();
        let mut tp = vec![0usize; k];
        let mut predicted = vec![0usize; k];
        let mut support = vec![0usize; k];
        for (&t, &p) in y_true.iter().zip(y_pred) {
            support[t] += 1;
            predicted[p] += 1;
            if t == p {
                tp[t] += 1;
            }
        }

        let classes: Vec<ClassMetrics> = (0..k)
            .map(|c| {
                let precision = ratio(tp[c], predicted[c]);
                let recall = ratio(tp[c], support[c]);
                let f1 = if precision + recall > 0.0 {
                    2.0 * precision * recall / (precision + recall)
                } else {
                    0.0
                };
                ClassMetrics {
                    label: labels[c].clone(),
                    precision,
                    recall,
                    f1,
                    support: support[c],
                }
            })
            .collect();

        let total: usize = support.iter().sum();
        let mean = |f: fn(&ClassMetrics) -> f64| -> f64 {
            if k == 0 {
                0.0
            } else {
                classes.iter().map(f).sum::<f64>() / k as f64
            }
        };
        let weighted = |f: fn(&ClassMetrics) -> f64| -> f64 {
            if total == 0 {
                0.0
            } else {
                classes.iter().map(|c| f(c) * c.support as f64).sum::<f64>() / total as f64
            }
        };

        let macro_avg = ClassMetrics {
            label: "macro avg".to_string(),
            precision: mean(|c| c.precision),
            recall: mean(|c| c.recall),
            f1: mean(|c| c.f1),
            support: total,
        };
        let weighted_avg = ClassMetrics {
            label: "weighted avg".to_string(),
            precision: weighted(|c| c.precision),
            recall: weighted(|c| c.recall),
            f1: weighted(|c| c.f1),
            support: total,
        };

        Self {
            accuracy: overall,
            classes,
            macro_avg,
            weighted_avg,
        }
    }
}
