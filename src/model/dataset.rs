//! Dense feature matrices, label encoding, splits and cross-validation folds
//!
//! Splitting and fold assignment are delegated to smartcore. [`Matrix`] is the
//! row-major layout the model families read; it converts to and from
//! smartcore's `DenseMatrix` at that boundary.

use anyhow::{Context, Result};
use polars::prelude::*;
use smartcore::linalg::basic::arrays::{Array, Array2};
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::model_selection::{train_test_split, BaseKFold, KFold};
use smartcore::numbers::basenum::Number;

use super::error::ModelError;
use crate::pipeline::loader::column_as_f64;
use crate::pipeline::read_label_codes;

/// Row-major dense matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    data: Vec<f64>,
    rows: usize,
    cols: usize,
}

impl Matrix {
    pub fn new(rows: usize, cols: usize, data: Vec<f64>) -> Result<Self, ModelError> {
        if data.len() != rows * cols {
            return Err(ModelError::ShapeMismatch {
                len: data.len(),
                rows,
                cols,
            });
        }
        Ok(Self { data, rows, cols })
    }

    /// Build from equally sized rows.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self, ModelError> {
        let cols = rows.first().map(Vec::len).unwrap_or(0);
        if let Some(bad) = rows.iter().find(|r| r.len() != cols) {
            return Err(ModelError::FeatureCount {
                expected: cols,
                actual: bad.len(),
            });
        }
        let data = rows.iter().flatten().copied().collect();
        Self::new(rows.len(), cols, data)
    }

    pub fn nrows(&self) -> usize {
        self.rows
    }

    pub fn ncols(&self) -> usize {
        self.cols
    }

    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[i * self.cols + j]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        self.data.chunks(self.cols.max(1)).take(self.rows)
    }

    /// Copy into smartcore's dense matrix.
    pub fn to_dense(&self) -> DenseMatrix<f64> {
        DenseMatrix::new(self.rows, self.cols, self.data.clone(), false)
    }

    pub fn from_dense(x: &DenseMatrix<f64>) -> Self {
        let (rows, cols) = x.shape();
        let mut data = Vec::with_capacity(rows * cols);
        for i in 0..rows {
            for j in 0..cols {
                data.push(*x.get((i, j)));
            }
        }
        Self { data, rows, cols }
    }
}

/// Features and class indices ready for training.
///
/// `y[i]` indexes into `classes`, which holds the original label values in
/// ascending order.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub x: Matrix,
    pub y: Vec<usize>,
    pub classes: Vec<i64>,
    pub feature_names: Vec<String>,
}

impl Dataset {
    /// Read `features` and `target` from a table. Nulls are rejected.
    pub fn from_frame(df: &DataFrame, features: &[String], target: &str) -> Result<Self> {
        let labels = read_label_codes(df, target)?;
        let mut classes = labels.clone();
        classes.sort_unstable();
        classes.dedup();

        let columns = features
            .iter()
            .map(|name| {
                let values = column_as_f64(df, name)?;
                values
                    .into_iter()
                    .enumerate()
                    .map(|(row, v)| {
                        v.with_context(|| format!("Feature '{}' has a missing value at row {}", name, row))
                    })
                    .collect::<Result<Vec<f64>>>()
            })
            .collect::<Result<Vec<_>>>()?;

        let rows = df.height();
        let mut data = Vec::with_capacity(rows * features.len());
        for i in 0..rows {
            data.extend(columns.iter().map(|col| col[i]));
        }
        let x = Matrix::new(rows, features.len(), data)?;

        let y = labels
            .iter()
            .map(|label| classes.binary_search(label).unwrap_or_default())
            .collect();

        Ok(Self {
            x,
            y,
            classes,
            feature_names: features.to_vec(),
        })
    }

    pub fn n_classes(&self) -> usize {
        self.classes.len()
    }

    pub fn len(&self) -> usize {
        self.y.len()
    }

    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }
}

/// Class indices as smartcore label values.
pub(crate) fn to_labels(y: &[usize]) -> Vec<i32> {
    y.iter().map(|&c| c as i32).collect()
}

pub(crate) fn from_labels(y: &[i32]) -> Vec<usize> {
    y.iter().map(|&c| c.max(0) as usize).collect()
}

/// Seeded shuffled train/test split via smartcore.
///
/// The test part gets `floor(n * test_size)` rows and must leave both parts
/// non-empty.
pub fn split_dataset(data: &Dataset, test_size: f64, seed: u64) -> Result<(Dataset, Dataset), ModelError> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(ModelError::InvalidParameter {
            name: "test_size".to_string(),
            reason: format!("must be in (0, 1), got {}", test_size),
        });
    }
    let n = data.len();
    let n_test = (n as f32 * test_size as f32) as usize;
    if n_test == 0 || n_test >= n {
        return Err(ModelError::TooFewRows { folds: 2, rows: n });
    }

    let (x_train, x_test, y_train, y_test) =
        train_test_split(&data.x.to_dense(), &to_labels(&data.y), test_size as f32, true, Some(seed));
    let part = |x: &DenseMatrix<f64>, y: &[i32]| Dataset {
        x: Matrix::from_dense(x),
        y: from_labels(y),
        classes: data.classes.clone(),
        feature_names: data.feature_names.clone(),
    };
    Ok((part(&x_train, &y_train), part(&x_test, &y_test)))
}

/// Stratified k-fold splitter.
///
/// Each class's rows are shuffled and split by smartcore's [`KFold`]; fold `i`
/// validates on the union of every class's part `i`, so every fold keeps
/// roughly the overall class balance. Usable wherever smartcore takes a
/// [`BaseKFold`].
#[derive(Debug, Clone, PartialEq)]
pub struct StratifiedKFold {
    folds: Vec<(Vec<usize>, Vec<usize>)>,
}

impl StratifiedKFold {
    pub fn new(y: &[usize], n_classes: usize, n_splits: usize, seed: u64) -> Result<Self, ModelError> {
        if n_splits < 2 {
            return Err(ModelError::InvalidParameter {
                name: "cv_folds".to_string(),
                reason: format!("need at least 2 folds, got {}", n_splits),
            });
        }
        if y.len() < n_splits {
            return Err(ModelError::TooFewRows {
                folds: n_splits,
                rows: y.len(),
            });
        }

        let kfold = KFold::default()
            .with_n_splits(n_splits)
            .with_shuffle(true)
            .with_seed(Some(seed));
        let mut validation: Vec<Vec<usize>> = vec![Vec::new(); n_splits];
        let mut next_fold = 0;
        for class in 0..n_classes {
            let members: Vec<usize> = (0..y.len()).filter(|&i| y[i] == class).collect();
            if members.len() < n_splits {
                // Too few to split; deal them out so no fold is left without them.
                for i in members {
                    validation[next_fold].push(i);
                    next_fold = (next_fold + 1) % n_splits;
                }
                continue;
            }
            let ids = DenseMatrix::new(members.len(), 1, members.iter().map(|&i| i as f64).collect(), false);
            for (fold, (_, test)) in kfold.split(&ids).enumerate() {
                validation[fold].extend(test.into_iter().map(|j| members[j]));
            }
        }

        let folds = validation
            .into_iter()
            .map(|mut held_out| {
                held_out.sort_unstable();
                let train = (0..y.len()).filter(|i| held_out.binary_search(i).is_err()).collect();
                (train, held_out)
            })
            .collect();
        Ok(Self { folds })
    }

    /// `(train, validation)` index pairs.
    pub fn folds(&self) -> &[(Vec<usize>, Vec<usize>)] {
        &self.folds
    }
}

impl BaseKFold for StratifiedKFold {
    type Output = std::vec::IntoIter<(Vec<usize>, Vec<usize>)>;

    fn split<T: Number, X: Array2<T>>(&self, _x: &X) -> Self::Output {
        self.folds.clone().into_iter()
    }

    fn n_splits(&self) -> usize {
        self.folds.len()
    }
}
