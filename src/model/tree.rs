//! Decision trees shared by the forest and the boosting models
//!
//! Two builders produce the same [`Tree`] layout:
//! - [`fit_classification_tree`]: CART with Gini impurity, grown depth-first,
//!   leaves hold class frequencies.
//! - [`fit_gradient_tree`]: second-order regression tree on gradient/hessian
//!   pairs, grown best-first so it can stop at a leaf budget. Leaves hold one
//!   additive score.

use rand::rngs::StdRng;
use rand::seq::index::sample;
use serde::{Deserialize, Serialize};

use super::dataset::Matrix;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    Leaf {
        value: Vec<f64>,
    },
    /// Rows with `x[feature] <= threshold` go left.
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    /// Leaf payload for one row.
    pub fn leaf(&self, row: &[f64]) -> &[f64] {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                Node::Leaf { value } => return value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, Node::Leaf { .. }))
            .count()
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], index: usize) -> usize {
            match &nodes[index] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        walk(&self.nodes, 0)
    }
}

fn sorted_by_feature(x: &Matrix, indices: &[usize], feature: usize) -> Vec<usize> {
    let mut sorted = indices.to_vec();
    sorted.sort_by(|&a, &b| x.get(a, feature).total_cmp(&x.get(b, feature)));
    sorted
}

// ---------------------------------------------------------------------------
// Classification (Gini)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct ClassTreeParams {
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features tried per split; `None` tries all of them
    pub max_features: Option<usize>,
}

struct ClassSplit {
    feature: usize,
    threshold: f64,
    score: f64,
    left: Vec<usize>,
    right: Vec<usize>,
}

fn class_counts(y: &[usize], indices: &[usize], n_classes: usize) -> Vec<f64> {
    let mut counts = vec![0.0; n_classes];
    for &i in indices {
        counts[y[i]] += 1.0;
    }
    counts
}

/// `sum(count^2) / n`; larger means purer. Weighted child Gini is minimized
/// exactly when the sum of this over both children is maximized.
fn purity(counts: &[f64], n: f64) -> f64 {
    if n == 0.0 {
        0.0
    } else {
        counts.iter().map(|c| c * c).sum::<f64>() / n
    }
}

fn best_class_split(
    x: &Matrix,
    y: &[usize],
    n_classes: usize,
    indices: &[usize],
    features: &[usize],
    min_leaf: usize,
) -> Option<ClassSplit> {
    let n = indices.len();
    if n < 2 {
        return None;
    }
    let total = class_counts(y, indices, n_classes);
    let parent = purity(&total, n as f64);
    let mut best: Option<(usize, f64, f64, usize)> = None;
    let mut best_sorted: Vec<usize> = Vec::new();

    for &feature in features {
        let sorted = sorted_by_feature(x, indices, feature);
        let mut left = vec![0.0; n_classes];
        for pos in 0..n - 1 {
            let i = sorted[pos];
            left[y[i]] += 1.0;
            let n_left = pos + 1;
            let here = x.get(i, feature);
            let next = x.get(sorted[pos + 1], feature);
            if here == next || n_left < min_leaf || n - n_left < min_leaf {
                continue;
            }
            let right: Vec<f64> = total.iter().zip(&left).map(|(t, l)| t - l).collect();
            let score = purity(&left, n_left as f64) + purity(&right, (n - n_left) as f64);
            if score > parent + 1e-12 && best.map_or(true, |(_, _, s, _)| score > s) {
                best = Some((feature, (here + next) / 2.0, score, n_left));
                best_sorted = sorted.clone();
            }
        }
    }

    best.map(|(feature, threshold, score, n_left)| {
        let right = best_sorted.split_off(n_left);
        ClassSplit {
            feature,
            threshold,
            score,
            left: best_sorted,
            right,
        }
    })
}

/// Grow a Gini tree over `indices`.
pub fn fit_classification_tree(
    x: &Matrix,
    y: &[usize],
    n_classes: usize,
    indices: Vec<usize>,
    params: &ClassTreeParams,
    rng: &mut StdRng,
) -> Tree {
    let mut nodes = vec![Node::Leaf { value: Vec::new() }];
    let mut stack = vec![(0usize, indices, 0usize)];
    let d = x.ncols();
    let n_try = params.max_features.unwrap_or(d).clamp(1, d.max(1));

    while let Some((node, rows, depth)) = stack.pop() {
        let counts = class_counts(y, &rows, n_classes);
        let n = rows.len() as f64;
        let is_pure = counts.iter().filter(|c| **c > 0.0).count() <= 1;
        let depth_reached = params.max_depth.is_some_and(|m| depth >= m);

        let split = if is_pure || depth_reached || rows.len() < params.min_samples_split {
            None
        } else {
            let features: Vec<usize> = if n_try < d {
                sample(rng, d, n_try).into_vec()
            } else {
                (0..d).collect()
            };
            best_class_split(x, y, n_classes, &rows, &features, params.min_samples_leaf.max(1))
        };

        match split {
            Some(split) => {
                tracing::trace!(node, feature = split.feature, score = split.score, "class split");
                let left = nodes.len();
                nodes.push(Node::Leaf { value: Vec::new() });
                let right = nodes.len();
                nodes.push(Node::Leaf { value: Vec::new() });
                nodes[node] = Node::Split {
                    feature: split.feature,
                    threshold: split.threshold,
                    left,
                    right,
                };
                stack.push((right, split.right, depth + 1));
                stack.push((left, split.left, depth + 1));
            }
            None => {
                let value = counts.iter().map(|c| c / n).collect();
                nodes[node] = Node::Leaf { value };
            }
        }
    }

    Tree { nodes }
}

// ---------------------------------------------------------------------------
// Gradient regression (second order)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct GradientTreeParams {
    pub max_depth: Option<usize>,
    /// Leaf budget for best-first growth; `None` grows every useful split
    pub max_leaves: Option<usize>,
    pub min_child_weight: f64,
    pub min_samples_leaf: usize,
    /// L2 regularization on leaf scores
    pub lambda: f64,
}

struct GradSplit {
    feature: usize,
    threshold: f64,
    gain: f64,
    left: Vec<usize>,
    right: Vec<usize>,
}

struct OpenLeaf {
    node: usize,
    rows: Vec<usize>,
    depth: usize,
    split: Option<GradSplit>,
}

fn leaf_score(g: f64, h: f64, lambda: f64) -> f64 {
    -g / (h + lambda)
}

fn best_gradient_split(
    x: &Matrix,
    grad: &[f64],
    hess: &[f64],
    indices: &[usize],
    features: &[usize],
    params: &GradientTreeParams,
) -> Option<GradSplit> {
    let n = indices.len();
    if n < 2 * params.min_samples_leaf.max(1) {
        return None;
    }
    let g_total: f64 = indices.iter().map(|&i| grad[i]).sum();
    let h_total: f64 = indices.iter().map(|&i| hess[i]).sum();
    let parent = g_total * g_total / (h_total + params.lambda);

    let mut best: Option<(usize, f64, f64, usize)> = None;
    let mut best_sorted: Vec<usize> = Vec::new();

    for &feature in features {
        let sorted = sorted_by_feature(x, indices, feature);
        let (mut g_left, mut h_left) = (0.0, 0.0);
        for pos in 0..n - 1 {
            let i = sorted[pos];
            g_left += grad[i];
            h_left += hess[i];
            let n_left = pos + 1;
            let here = x.get(i, feature);
            let next = x.get(sorted[pos + 1], feature);
            if here == next || n_left < params.min_samples_leaf || n - n_left < params.min_samples_leaf {
                continue;
            }
            let (g_right, h_right) = (g_total - g_left, h_total - h_left);
            if h_left < params.min_child_weight || h_right < params.min_child_weight {
                continue;
            }
            let gain = 0.5
                * (g_left * g_left / (h_left + params.lambda)
                    + g_right * g_right / (h_right + params.lambda)
                    - parent);
            if gain > 1e-12 && best.map_or(true, |(_, _, b, _)| gain > b) {
                best = Some((feature, (here + next) / 2.0, gain, n_left));
                best_sorted = sorted.clone();
            }
        }
    }

    best.map(|(feature, threshold, gain, n_left)| {
        let right = best_sorted.split_off(n_left);
        GradSplit {
            feature,
            threshold,
            gain,
            left: best_sorted,
            right,
        }
    })
}

/// Grow a regression tree on gradient statistics, restricted to `features`.
///
/// The open leaf with the largest gain is split first. Without a leaf budget
/// this ends with the same tree as level-by-level growth.
pub fn fit_gradient_tree(
    x: &Matrix,
    grad: &[f64],
    hess: &[f64],
    indices: Vec<usize>,
    features: &[usize],
    params: &GradientTreeParams,
) -> Tree {
    let can_split = |depth: usize| params.max_depth.map_or(true, |m| depth < m);
    let mut nodes = vec![Node::Leaf { value: Vec::new() }];

    let split = if can_split(0) {
        best_gradient_split(x, grad, hess, &indices, features, params)
    } else {
        None
    };
    let mut open = vec![OpenLeaf {
        node: 0,
        rows: indices,
        depth: 0,
        split,
    }];
    let mut closed: Vec<(usize, Vec<usize>)> = Vec::new();
    let mut n_leaves = 1;

    loop {
        if params.max_leaves.is_some_and(|m| n_leaves >= m) {
            break;
        }
        let best = open
            .iter()
            .enumerate()
            .filter_map(|(pos, leaf)| leaf.split.as_ref().map(|s| (pos, s.gain)))
            .max_by(|a, b| a.1.total_cmp(&b.1));
        let Some((pos, _)) = best else { break };

        let leaf = open.swap_remove(pos);
        let Some(split) = leaf.split else { break };

        let left = nodes.len();
        nodes.push(Node::Leaf { value: Vec::new() });
        let right = nodes.len();
        nodes.push(Node::Leaf { value: Vec::new() });
        nodes[leaf.node] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        n_leaves += 1;

        for (node, rows) in [(left, split.left), (right, split.right)] {
            let depth = leaf.depth + 1;
            let child_split = if can_split(depth) {
                best_gradient_split(x, grad, hess, &rows, features, params)
            } else {
                None
            };
            match child_split {
                Some(s) => open.push(OpenLeaf {
                    node,
                    rows,
                    depth,
                    split: Some(s),
                }),
                None => closed.push((node, rows)),
            }
        }
    }

    let finished = open
        .into_iter()
        .map(|leaf| (leaf.node, leaf.rows))
        .chain(closed);
    for (node, rows) in finished {
        let g: f64 = rows.iter().map(|&i| grad[i]).sum();
        let h: f64 = rows.iter().map(|&i| hess[i]).sum();
        nodes[node] = Node::Leaf {
            value: vec![leaf_score(g, h, params.lambda)],
        };
    }

    Tree { nodes }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn step_data() -> (Matrix, Vec<usize>) {
        let rows: Vec<Vec<f64>> = (0..20).map(|i| vec![i as f64, 1.0]).collect();
        let y = (0..20).map(|i| usize::from(i >= 10)).collect();
        (Matrix::from_rows(&rows).unwrap(), y)
    }

    fn class_params() -> ClassTreeParams {
        ClassTreeParams {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
        }
    }

    #[test]
    fn test_classification_tree_finds_step() {
        let (x, y) = step_data();
        let mut rng = StdRng::seed_from_u64(0);
        let tree = fit_classification_tree(&x, &y, 2, (0..20).collect(), &class_params(), &mut rng);

        assert_eq!(tree.n_leaves(), 2);
        assert_eq!(tree.leaf(&[3.0, 1.0]), &[1.0, 0.0]);
        assert_eq!(tree.leaf(&[12.0, 1.0]), &[0.0, 1.0]);
        // Split sits halfway between 9 and 10.
        assert_eq!(tree.leaf(&[9.4, 1.0]), &[1.0, 0.0]);
        assert_eq!(tree.leaf(&[9.6, 1.0]), &[0.0, 1.0]);
    }

    #[test]
    fn test_depth_limit_gives_leaf_frequencies() {
        let (x, y) = step_data();
        let mut rng = StdRng::seed_from_u64(0);
        let params = ClassTreeParams {
            max_depth: Some(0),
            ..class_params()
        };
        let tree = fit_classification_tree(&x, &y, 2, (0..20).collect(), &params, &mut rng);
        assert_eq!(tree.depth(), 0);
        assert_eq!(tree.leaf(&[0.0, 1.0]), &[0.5, 0.5]);
    }

    #[test]
    fn test_min_samples_leaf_is_respected() {
        let rows: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64]).collect();
        let x = Matrix::from_rows(&rows).unwrap();
        let y: Vec<usize> = (0..10).map(|i| usize::from(i == 0)).collect();
        let mut rng = StdRng::seed_from_u64(0);
        let params = ClassTreeParams {
            min_samples_leaf: 4,
            ..class_params()
        };
        let tree = fit_classification_tree(&x, &y, 2, (0..10).collect(), &params, &mut rng);
        // The pure split isolating row 0 is not allowed.
        assert_ne!(tree.leaf(&[0.0]), &[0.0, 1.0]);
    }

    #[test]
    fn test_gradient_tree_leaf_scores() {
        let (x, y) = step_data();
        let grad: Vec<f64> = y.iter().map(|&c| if c == 1 { -1.0 } else { 1.0 }).collect();
        let hess = vec![1.0; 20];
        let params = GradientTreeParams {
            max_depth: Some(3),
            max_leaves: None,
            min_child_weight: 1.0,
            min_samples_leaf: 1,
            lambda: 0.0,
        };
        let tree = fit_gradient_tree(&x, &grad, &hess, (0..20).collect(), &[0, 1], &params);
        assert_eq!(tree.n_leaves(), 2);
        assert!((tree.leaf(&[0.0, 1.0])[0] + 1.0).abs() < 1e-12);
        assert!((tree.leaf(&[19.0, 1.0])[0] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_leaf_budget_caps_growth() {
        let rows: Vec<Vec<f64>> = (0..32).map(|i| vec![i as f64]).collect();
        let x = Matrix::from_rows(&rows).unwrap();
        let grad: Vec<f64> = (0..32).map(|i| ((i * 7) % 5) as f64 - 2.0).collect();
        let hess = vec![1.0; 32];
        let params = GradientTreeParams {
            max_depth: None,
            max_leaves: Some(4),
            min_child_weight: 1e-3,
            min_samples_leaf: 1,
            lambda: 1.0,
        };
        let tree = fit_gradient_tree(&x, &grad, &hess, (0..32).collect(), &[0], &params);
        assert!(tree.n_leaves() <= 4);
        assert!(tree.n_leaves() >= 2);
    }
}
