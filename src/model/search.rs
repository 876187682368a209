//! Hyperparameter grids and randomized search with stratified cross-validation
//!
//! Fold scoring runs through smartcore's `cross_validate`; the model families
//! plug in via [`FoldEstimator`].

use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use smartcore::api::{Predictor, SupervisedEstimator};
use smartcore::error::Failed;
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::metrics::accuracy;
use smartcore::model_selection::cross_validate;

use super::boosting::{BoostParams, Growth};
use super::dataset::{from_labels, to_labels, Dataset, Matrix, StratifiedKFold};
use super::error::ModelError;
use super::forest::{ForestParams, MaxFeatures};
use super::logistic::{LogisticParams, Penalty};
use super::naive_bayes::NaiveBayesParams;
use super::{Classifier, ModelFamily, ModelSpec, TrainedModel};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogisticGrid {
    pub c: Vec<f64>,
    pub penalty: Vec<Penalty>,
    pub max_iter: usize,
}

impl Default for LogisticGrid {
    fn default() -> Self {
        Self {
            c: vec![0.001, 1.0, 1000.0],
            penalty: vec![Penalty::L1, Penalty::L2],
            max_iter: 500,
        }
    }
}

impl LogisticGrid {
    fn candidates(&self) -> Vec<ModelSpec> {
        let mut out = Vec::new();
        for &c in &self.c {
            for &penalty in &self.penalty {
                out.push(ModelSpec::LogisticRegression(LogisticParams {
                    c,
                    penalty,
                    max_iter: self.max_iter,
                    ..Default::default()
                }));
            }
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestGrid {
    pub n_estimators: Vec<usize>,
    pub max_depth: Vec<Option<usize>>,
    pub min_samples_split: Vec<usize>,
    pub min_samples_leaf: Vec<usize>,
    pub max_features: Vec<MaxFeatures>,
}

impl Default for ForestGrid {
    fn default() -> Self {
        Self {
            n_estimators: vec![100, 300],
            max_depth: vec![Some(10), Some(30), None],
            min_samples_split: vec![2, 10],
            min_samples_leaf: vec![1, 4],
            max_features: vec![MaxFeatures::Sqrt, MaxFeatures::Log2],
        }
    }
}

impl ForestGrid {
    fn candidates(&self, seed: u64) -> Vec<ModelSpec> {
        let mut out = Vec::new();
        for &n_estimators in &self.n_estimators {
            for &max_depth in &self.max_depth {
                for &min_samples_split in &self.min_samples_split {
                    for &min_samples_leaf in &self.min_samples_leaf {
                        for &max_features in &self.max_features {
                            out.push(ModelSpec::RandomForest(ForestParams {
                                n_estimators,
                                max_depth,
                                min_samples_split,
                                min_samples_leaf,
                                max_features,
                                seed,
                            }));
                        }
                    }
                }
            }
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NaiveBayesGrid {
    pub var_smoothing: Vec<f64>,
}

impl Default for NaiveBayesGrid {
    fn default() -> Self {
        Self {
            var_smoothing: vec![1e-9],
        }
    }
}

/// Depth-wise boosting grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoostAGrid {
    pub n_estimators: Vec<usize>,
    pub learning_rate: Vec<f64>,
    pub max_depth: Vec<usize>,
    pub subsample: Vec<f64>,
    pub colsample_bytree: Vec<f64>,
}

impl Default for BoostAGrid {
    fn default() -> Self {
        Self {
            n_estimators: vec![100, 300],
            learning_rate: vec![0.01, 0.1, 0.2],
            max_depth: vec![3, 7],
            subsample: vec![0.8, 1.0],
            colsample_bytree: vec![0.8, 1.0],
        }
    }
}

impl BoostAGrid {
    fn candidates(&self, seed: u64) -> Vec<ModelSpec> {
        let mut out = Vec::new();
        for &n_estimators in &self.n_estimators {
            for &learning_rate in &self.learning_rate {
                for &max_depth in &self.max_depth {
                    for &subsample in &self.subsample {
                        for &colsample_bytree in &self.colsample_bytree {
                            out.push(ModelSpec::GradientBoostA(BoostParams {
                                n_estimators,
                                learning_rate,
                                max_depth: Some(max_depth),
                                subsample,
                                colsample_bytree,
                                seed,
                                ..BoostParams::depth_wise()
                            }));
                        }
                    }
                }
            }
        }
        out
    }
}

/// Leaf-wise boosting grid. A negative `max_depth` means no depth limit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoostBGrid {
    pub n_estimators: Vec<usize>,
    pub learning_rate: Vec<f64>,
    pub num_leaves: Vec<usize>,
    pub max_depth: Vec<i64>,
    pub subsample: Vec<f64>,
}

impl Default for BoostBGrid {
    fn default() -> Self {
        Self {
            n_estimators: vec![100, 300],
            learning_rate: vec![0.01, 0.1],
            num_leaves: vec![31, 50],
            max_depth: vec![-1, 10],
            subsample: vec![0.8, 1.0],
        }
    }
}

impl BoostBGrid {
    fn candidates(&self, seed: u64) -> Vec<ModelSpec> {
        let mut out = Vec::new();
        for &n_estimators in &self.n_estimators {
            for &learning_rate in &self.learning_rate {
                for &num_leaves in &self.num_leaves {
                    for &max_depth in &self.max_depth {
                        for &subsample in &self.subsample {
                            out.push(ModelSpec::GradientBoostB(BoostParams {
                                n_estimators,
                                learning_rate,
                                num_leaves: Some(num_leaves),
                                max_depth: usize::try_from(max_depth).ok().filter(|d| *d > 0),
                                subsample,
                                seed,
                                growth: Growth::LeafWise,
                                ..BoostParams::leaf_wise()
                            }));
                        }
                    }
                }
            }
        }
        out
    }
}

/// Search grids for every family.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchGrids {
    pub logistic_regression: LogisticGrid,
    pub random_forest: ForestGrid,
    pub naive_bayes: NaiveBayesGrid,
    pub gradient_boost_a: BoostAGrid,
    pub gradient_boost_b: BoostBGrid,
}

impl SearchGrids {
    /// Every grid point of one family, in a fixed order.
    pub fn candidates(&self, family: ModelFamily, seed: u64) -> Vec<ModelSpec> {
        match family {
            ModelFamily::LogisticRegression => self.logistic_regression.candidates(),
            ModelFamily::RandomForest => self.random_forest.candidates(seed),
            ModelFamily::NaiveBayes => self
                .naive_bayes
                .var_smoothing
                .iter()
                .map(|&var_smoothing| ModelSpec::NaiveBayes(NaiveBayesParams { var_smoothing }))
                .collect(),
            ModelFamily::GradientBoostA => self.gradient_boost_a.candidates(seed),
            ModelFamily::GradientBoostB => self.gradient_boost_b.candidates(seed),
        }
    }
}

/// Cross-validation result for one sampled grid point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateScore {
    pub spec: ModelSpec,
    pub fold_scores: Vec<f64>,
    pub mean_score: f64,
}

/// Search result for one family, with the winner refit on all training rows.
#[derive(Debug, Clone, Serialize)]
pub struct SearchOutcome {
    pub family: ModelFamily,
    pub candidates: Vec<CandidateScore>,
    pub best_index: usize,
    #[serde(skip)]
    pub best_model: TrainedModel,
}

impl SearchOutcome {
    pub fn best(&self) -> &CandidateScore {
        &self.candidates[self.best_index]
    }
}

/// Draw `n_iter` distinct grid points, or the whole grid if it is no larger.
pub fn sample_candidates(grid: Vec<ModelSpec>, n_iter: usize, seed: u64) -> Vec<ModelSpec> {
    if grid.len() <= n_iter {
        return grid;
    }
    let mut rng = StdRng::seed_from_u64(seed);
    let picks = sample(&mut rng, grid.len(), n_iter).into_vec();
    picks.into_iter().map(|i| grid[i].clone()).collect()
}

/// Parameters smartcore hands to [`FoldEstimator::fit`] on every fold.
#[derive(Debug, Clone)]
struct FoldParams {
    spec: ModelSpec,
    n_classes: usize,
}

/// Adapter between smartcore's estimator traits and [`TrainedModel`].
struct FoldEstimator {
    model: Option<TrainedModel>,
}

impl Predictor<DenseMatrix<f64>, Vec<i32>> for FoldEstimator {
    fn predict(&self, x: &DenseMatrix<f64>) -> Result<Vec<i32>, Failed> {
        let model = self.model.as_ref().ok_or_else(|| Failed::predict("estimator is not fitted"))?;
        let predicted = Classifier::predict(model, &Matrix::from_dense(x)).map_err(|e| Failed::predict(&e.to_string()))?;
        Ok(to_labels(&predicted))
    }
}

impl SupervisedEstimator<DenseMatrix<f64>, Vec<i32>, FoldParams> for FoldEstimator {
    fn new() -> Self {
        Self { model: None }
    }

    fn fit(x: &DenseMatrix<f64>, y: &Vec<i32>, params: FoldParams) -> Result<Self, Failed> {
        let mut model = params.spec.build();
        Classifier::fit(&mut model, &Matrix::from_dense(x), &from_labels(y), params.n_classes)
            .map_err(|e| Failed::fit(&e.to_string()))?;
        Ok(Self { model: Some(model) })
    }
}

/// Per-fold validation accuracy of one grid point.
fn score_candidate(
    spec: &ModelSpec,
    x: &DenseMatrix<f64>,
    y: &Vec<i32>,
    n_classes: usize,
    cv: &StratifiedKFold,
) -> Result<Vec<f64>, ModelError> {
    let params = FoldParams {
        spec: spec.clone(),
        n_classes,
    };
    let result = cross_validate(
        FoldEstimator { model: None },
        x,
        y,
        params,
        cv,
        &|truth: &Vec<i32>, predicted: &Vec<i32>| accuracy(truth, predicted),
    )
    .map_err(|e| ModelError::CrossValidation(e.to_string()))?;
    Ok(result.test_score)
}

/// Randomized search over one family's grid.
///
/// Candidates are scored by mean stratified k-fold accuracy; ties go to the
/// earliest sampled candidate. The best one is refit on all of `data`.
pub fn randomized_search(
    family: ModelFamily,
    grids: &SearchGrids,
    data: &Dataset,
    n_iter: usize,
    cv_folds: usize,
    seed: u64,
) -> Result<SearchOutcome, ModelError> {
    let grid = grids.candidates(family, seed);
    if grid.is_empty() {
        return Err(ModelError::EmptyGrid(family.to_string()));
    }
    let sampled = sample_candidates(grid, n_iter.max(1), seed);
    let cv = StratifiedKFold::new(&data.y, data.n_classes(), cv_folds, seed)?;
    let x = data.x.to_dense();
    let y = to_labels(&data.y);

    let candidates = sampled
        .into_par_iter()
        .map(|spec| -> Result<CandidateScore, ModelError> {
            let fold_scores = score_candidate(&spec, &x, &y, data.n_classes(), &cv)?;
            let mean_score = fold_scores.iter().sum::<f64>() / fold_scores.len() as f64;
            Ok(CandidateScore {
                spec,
                fold_scores,
                mean_score,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut best_index = 0;
    for (i, candidate) in candidates.iter().enumerate() {
        if candidate.mean_score > candidates[best_index].mean_score {
            best_index = i;
        }
    }

    let mut best_model = candidates[best_index].spec.build();
    best_model.fit(&data.x, &data.y, data.n_classes())?;

    tracing::info!(
        family = %family,
        candidates = candidates.len(),
        best_score = candidates[best_index].mean_score,
        "randomized search finished"
    );

    Ok(SearchOutcome {
        family,
        candidates,
        best_index,
        best_model,
    })
}
