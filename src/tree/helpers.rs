//! Helper functions for tree building.
//!
//! Trees are grown over index lists into a shared feature matrix, with a
//! per-sample weight. A bootstrap draw therefore never copies rows: it only
//! turns into integer weights.

use super::{Criterion, Leaf, Node, TreeNode};
use crate::primitives::Matrix;
use rand::rngs::StdRng;
use rand::seq::index::sample;

/// Splits whose impurity decrease is below this are not taken.
const MIN_IMPURITY_DECREASE: f32 = 1e-7;

/// Feature values closer than this are treated as equal.
const FEATURE_EPS: f32 = 1e-10;

/// Gini impurity of a weighted class distribution.
///
/// Gini = 1 - Σ(p_i²)
pub fn gini_impurity(class_weights: &[f32]) -> f32 {
    let total: f32 = class_weights.iter().sum();
    if total <= 0.0 {
        return 0.0;
    }
    1.0 - class_weights
        .iter()
        .map(|w| {
            let p = w / total;
            p * p
        })
        .sum::<f32>()
}

/// Shannon entropy (base 2) of a weighted class distribution.
pub fn entropy(class_weights: &[f32]) -> f32 {
    let total: f32 = class_weights.iter().sum();
    if total <= 0.0 {
        return 0.0;
    }
    -class_weights
        .iter()
        .filter(|&&w| w > 0.0)
        .map(|w| {
            let p = w / total;
            p * p.log2()
        })
        .sum::<f32>()
}

pub(super) fn impurity(criterion: Criterion, class_weights: &[f32]) -> f32 {
    match criterion {
        Criterion::Gini => gini_impurity(class_weights),
        Criterion::Entropy => entropy(class_weights),
    }
}

/// Weighted class histogram over `indices`.
pub(super) fn class_weights(
    indices: &[usize],
    y: &[usize],
    weights: &[f32],
    n_classes: usize,
) -> Vec<f32> {
    let mut counts = vec![0.0f32; n_classes];
    for &i in indices {
        counts[y[i]] += weights[i];
    }
    counts
}

/// Candidate split found for a node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct Split {
    pub feature_idx: usize,
    pub threshold: f32,
    /// Parent impurity minus the weighted child impurity
    pub gain: f32,
}

/// Settings shared by every node of one tree.
pub(super) struct GrowParams<'a> {
    pub x: &'a Matrix<f32>,
    pub y: &'a [usize],
    pub weights: &'a [f32],
    pub n_classes: usize,
    pub criterion: Criterion,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub n_candidate_features: usize,
}

/// Best threshold on one feature, scanning sorted values once.
///
/// Thresholds are midpoints between consecutive distinct values, and
/// both children must hold at least `min_samples_leaf` samples.
pub(super) fn find_best_split_for_feature(
    params: &GrowParams<'_>,
    indices: &[usize],
    feature_idx: usize,
    parent_weights: &[f32],
) -> Option<Split> {
    if indices.len() < 2 {
        return None;
    }
    let x = params.x;
    let mut sorted: Vec<usize> = indices.to_vec();
    sorted.sort_by(|&a, &b| x.get(a, feature_idx).total_cmp(&x.get(b, feature_idx)));

    let total: f32 = parent_weights.iter().sum();
    if total <= 0.0 {
        return None;
    }
    let parent_impurity = impurity(params.criterion, parent_weights);

    let mut left = vec![0.0f32; params.n_classes];
    let mut best: Option<Split> = None;

    for pos in 0..sorted.len() - 1 {
        let idx = sorted[pos];
        left[params.y[idx]] += params.weights[idx];

        let n_left = pos + 1;
        let n_right = sorted.len() - n_left;
        if n_left < params.min_samples_leaf || n_right < params.min_samples_leaf {
            continue;
        }

        let v = x.get(idx, feature_idx);
        let next = x.get(sorted[pos + 1], feature_idx);
        if next - v <= FEATURE_EPS {
            continue;
        }

        let right: Vec<f32> = parent_weights
            .iter()
            .zip(&left)
            .map(|(p, l)| p - l)
            .collect();
        let w_left: f32 = left.iter().sum();
        let w_right = total - w_left;
        let child = (w_left * impurity(params.criterion, &left)
            + w_right * impurity(params.criterion, &right))
            / total;
        let gain = parent_impurity - child;

        if gain > MIN_IMPURITY_DECREASE && best.map_or(true, |b| gain > b.gain) {
            let mut threshold = v + (next - v) / 2.0;
            if threshold >= next {
                threshold = v;
            }
            best = Some(Split {
                feature_idx,
                threshold,
                gain,
            });
        }
    }

    best
}

/// Best split over a random subset of `n_candidate_features` features.
///
/// When none of the drawn features can split the node, further features
/// are tried until one can or all have been visited.
pub(super) fn find_best_split(
    params: &GrowParams<'_>,
    indices: &[usize],
    parent_weights: &[f32],
    rng: &mut StdRng,
) -> Option<Split> {
    let n_features = params.x.n_cols();
    let order: Vec<usize> = if params.n_candidate_features >= n_features {
        (0..n_features).collect()
    } else {
        sample(rng, n_features, n_features).into_vec()
    };

    let mut best: Option<Split> = None;
    for (visited, feature_idx) in order.into_iter().enumerate() {
        if visited >= params.n_candidate_features && best.is_some() {
            break;
        }
        if let Some(split) = find_best_split_for_feature(params, indices, feature_idx, parent_weights)
        {
            if best.map_or(true, |b| split.gain > b.gain) {
                best = Some(split);
            }
        }
    }
    best
}

fn make_leaf(class_weights: Vec<f32>, n_samples: usize) -> TreeNode {
    let total: f32 = class_weights.iter().sum();
    let distribution = if total > 0.0 {
        class_weights.iter().map(|w| w / total).collect()
    } else {
        class_weights
    };
    TreeNode::Leaf(Leaf {
        distribution,
        n_samples,
    })
}

/// Grows a tree recursively, accumulating impurity decreases per feature.
pub(super) fn build_tree(
    params: &GrowParams<'_>,
    indices: Vec<usize>,
    depth: usize,
    rng: &mut StdRng,
    importances: &mut [f32],
) -> TreeNode {
    let n_samples = indices.len();
    let node_weights = class_weights(&indices, params.y, params.weights, params.n_classes);

    let is_pure = node_weights.iter().filter(|&&w| w > 0.0).count() <= 1;
    let at_max_depth = params.max_depth.is_some_and(|d| depth >= d);
    let too_small = n_samples < params.min_samples_split || n_samples < 2 * params.min_samples_leaf;
    if is_pure || at_max_depth || too_small {
        return make_leaf(node_weights, n_samples);
    }

    let Some(split) = find_best_split(params, &indices, &node_weights, rng) else {
        return make_leaf(node_weights, n_samples);
    };

    let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
        .iter()
        .partition(|&&i| params.x.get(i, split.feature_idx) <= split.threshold);
    if left_idx.is_empty() || right_idx.is_empty() {
        return make_leaf(node_weights, n_samples);
    }

    let node_total: f32 = node_weights.iter().sum();
    importances[split.feature_idx] += node_total * split.gain;

    let left = build_tree(params, left_idx, depth + 1, rng, importances);
    let right = build_tree(params, right_idx, depth + 1, rng, importances);

    TreeNode::Node(Node {
        feature_idx: split.feature_idx,
        threshold: split.threshold,
        left: Box::new(left),
        right: Box::new(right),
    })
}

#[cfg(test)]
#[path = "helpers_tests.rs"]
mod tests;
