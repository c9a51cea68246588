//! CART trees over weighted samples, and the forests built from them.
//!
//! Trees take class indices (`0..n_classes`); PU labels are mapped to
//! indices by the ensemble wrappers before they reach a tree.
//!
//! ```
//! use epiml::prelude::*;
//!
//! // visits, claims per member; class 1 = visits above 3
//! let x = Matrix::from_vec(6, 2, vec![
//!     1.0, 0.0,
//!     2.0, 1.0,
//!     3.0, 0.0,
//!     5.0, 1.0,
//!     6.0, 0.0,
//!     8.0, 1.0,
//! ])?;
//! let y = vec![0, 0, 0, 1, 1, 1];
//!
//! let mut tree = DecisionTreeClassifier::new().with_max_depth(3);
//! tree.fit(&x, &y)?;
//! assert_eq!(tree.predict(&x)?, y);
//! # Ok::<(), epiml::EpimlError>(())
//! ```

mod forest;
pub(crate) mod helpers;

pub use forest::{ClassWeight, RandomForestClassifier, Sampling};

use crate::error::{EpimlError, Result};
use crate::primitives::Matrix;
use crate::repr::Repr;
use crate::traits::{unknown_param, Classifier, ParamValue, Tunable};
use helpers::{build_tree, GrowParams};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Split on `x[feature_idx] <= threshold`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Feature column tested
    pub feature_idx: usize,
    /// Midpoint between the two closest values on either side
    pub threshold: f32,
    /// Taken when the test holds
    pub left: Box<TreeNode>,
    /// Taken otherwise
    pub right: Box<TreeNode>,
}

/// Terminal node holding the normalized class distribution of the training
/// weight that reached it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Leaf {
    /// Class probabilities (sum to 1 unless the leaf is empty)
    pub distribution: Vec<f32>,
    /// Number of distinct training samples in this leaf
    pub n_samples: usize,
}

impl Leaf {
    /// Most probable class (lowest index wins ties).
    #[must_use]
    pub fn class_label(&self) -> usize {
        let mut best = 0;
        for (i, &p) in self.distribution.iter().enumerate() {
            if p > self.distribution[best] {
                best = i;
            }
        }
        best
    }
}

/// Tree node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TreeNode {
    /// Split
    Node(Node),
    /// Prediction
    Leaf(Leaf),
}

impl TreeNode {
    /// Longest path to a leaf; a lone leaf has depth 0.
    #[must_use]
    pub fn depth(&self) -> usize {
        match self {
            TreeNode::Leaf(_) => 0,
            TreeNode::Node(node) => 1 + node.left.depth().max(node.right.depth()),
        }
    }

    /// Number of leaves below this node.
    #[must_use]
    pub fn n_leaves(&self) -> usize {
        match self {
            TreeNode::Leaf(_) => 1,
            TreeNode::Node(node) => node.left.n_leaves() + node.right.n_leaves(),
        }
    }

    fn leaf_for(&self, sample: &[f32]) -> &Leaf {
        let mut node = self;
        loop {
            match node {
                TreeNode::Leaf(leaf) => return leaf,
                TreeNode::Node(internal) => {
                    node = if sample[internal.feature_idx] <= internal.threshold {
                        &internal.left
                    } else {
                        &internal.right
                    };
                }
            }
        }
    }
}

/// Split quality measure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Criterion {
    /// Gini impurity
    #[default]
    Gini,
    /// Information gain (entropy)
    Entropy,
}

impl Criterion {
    pub(crate) fn name(self) -> &'static str {
        match self {
            Criterion::Gini => "gini",
            Criterion::Entropy => "entropy",
        }
    }

    pub(crate) fn parse(value: &str) -> Result<Self> {
        match value {
            "gini" => Ok(Criterion::Gini),
            "entropy" => Ok(Criterion::Entropy),
            other => Err(EpimlError::invalid_param("criterion", other, "'gini' or 'entropy'")),
        }
    }
}

/// Number of features considered when looking for the best split.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum MaxFeatures {
    /// Every feature
    #[default]
    All,
    /// `sqrt(n_features)`
    Sqrt,
    /// `log2(n_features)`
    Log2,
    /// A fraction of the features, in (0, 1]
    Fraction(f32),
    /// A fixed number of features
    Count(usize),
}

impl MaxFeatures {
    /// Resolves to a count in `1..=n_features`.
    #[must_use]
    pub fn resolve(self, n_features: usize) -> usize {
        let n = match self {
            MaxFeatures::All => n_features,
            MaxFeatures::Sqrt => (n_features as f32).sqrt() as usize,
            MaxFeatures::Log2 => (n_features as f32).log2() as usize,
            MaxFeatures::Fraction(f) => (f * n_features as f32) as usize,
            MaxFeatures::Count(c) => c,
        };
        n.clamp(1, n_features.max(1))
    }

    /// Parses `'sqrt'`, `'log2'`, `'auto'`, `None`, an integer or a fraction.
    ///
    /// # Errors
    ///
    /// Returns an error for unrecognized values.
    pub fn from_param(value: &ParamValue) -> Result<Self> {
        match value {
            ParamValue::None => Ok(MaxFeatures::All),
            ParamValue::Str(s) => match s.as_str() {
                "sqrt" | "auto" => Ok(MaxFeatures::Sqrt),
                "log2" => Ok(MaxFeatures::Log2),
                other => Err(EpimlError::invalid_param("max_features", other, "'sqrt' or 'log2'")),
            },
            ParamValue::Int(n) if *n > 0 => Ok(MaxFeatures::Count(*n as usize)),
            ParamValue::Float(f) if *f > 0.0 && *f <= 1.0 => Ok(MaxFeatures::Fraction(*f as f32)),
            other => Err(EpimlError::invalid_param(
                "max_features",
                other,
                "None, 'sqrt', 'log2', a positive integer or a fraction in (0, 1]",
            )),
        }
    }
}

impl fmt::Display for MaxFeatures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaxFeatures::All => write!(f, "None"),
            MaxFeatures::Sqrt => write!(f, "'sqrt'"),
            MaxFeatures::Log2 => write!(f, "'log2'"),
            MaxFeatures::Fraction(v) => write!(f, "{v}"),
            MaxFeatures::Count(c) => write!(f, "{c}"),
        }
    }
}

/// Decision tree classifier using the CART algorithm.
///
/// Splits maximize the weighted impurity decrease; leaves keep the class
/// distribution so `predict_proba` is available.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTreeClassifier {
    tree: Option<TreeNode>,
    criterion: Criterion,
    max_depth: Option<usize>,
    min_samples_split: usize,
    min_samples_leaf: usize,
    max_features: MaxFeatures,
    random_state: Option<u64>,
    n_features: Option<usize>,
    n_classes: usize,
    feature_importances: Option<Vec<f32>>,
}

impl DecisionTreeClassifier {
    /// Creates a new decision tree classifier with default parameters.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tree: None,
            criterion: Criterion::Gini,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::All,
            random_state: None,
            n_features: None,
            n_classes: 0,
            feature_importances: None,
        }
    }

    /// Sets the maximum depth of the tree (root has depth 0).
    #[must_use]
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Sets the split criterion.
    #[must_use]
    pub fn with_criterion(mut self, criterion: Criterion) -> Self {
        self.criterion = criterion;
        self
    }

    /// Minimum number of samples required to split a node.
    #[must_use]
    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples;
        self
    }

    /// Minimum number of samples required in each leaf.
    #[must_use]
    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples;
        self
    }

    /// Number of features to consider at each split.
    #[must_use]
    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    /// Sets the random state used to pick candidate features.
    #[must_use]
    pub fn with_random_state(mut self, random_state: u64) -> Self {
        self.random_state = Some(random_state);
        self
    }

    /// The fitted tree, if any.
    #[must_use]
    pub fn tree(&self) -> Option<&TreeNode> {
        self.tree.as_ref()
    }

    /// Number of features seen during fit.
    #[must_use]
    pub fn n_features(&self) -> Option<usize> {
        self.n_features
    }

    /// Normalized impurity-decrease importances.
    #[must_use]
    pub fn feature_importances(&self) -> Option<&[f32]> {
        self.feature_importances.as_deref()
    }

    /// Fits with per-sample weights. Samples with zero weight are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error on mismatched lengths, empty data or invalid parameters.
    pub fn fit_weighted(
        &mut self,
        x: &Matrix<f32>,
        y: &[usize],
        sample_weight: Option<&[f32]>,
    ) -> Result<()> {
        let n_classes = y.iter().max().map_or(0, |&m| m + 1);
        self.fit_with_classes(x, y, sample_weight, n_classes)
    }

    /// Fits knowing the total number of classes (a bootstrap draw may miss some).
    pub(crate) fn fit_with_classes(
        &mut self,
        x: &Matrix<f32>,
        y: &[usize],
        sample_weight: Option<&[f32]>,
        n_classes: usize,
    ) -> Result<()> {
        let (n_rows, n_cols) = x.shape();
        if n_rows != y.len() {
            return Err(EpimlError::dimension_mismatch("n_samples", n_rows, y.len()));
        }
        if n_rows == 0 {
            return Err(EpimlError::empty_input("Cannot fit with zero samples"));
        }
        if self.min_samples_split < 2 {
            return Err(EpimlError::invalid_param(
                "min_samples_split",
                self.min_samples_split,
                ">= 2",
            ));
        }
        if self.min_samples_leaf < 1 {
            return Err(EpimlError::invalid_param(
                "min_samples_leaf",
                self.min_samples_leaf,
                ">= 1",
            ));
        }
        if let Some(&bad) = y.iter().find(|&&c| c >= n_classes) {
            return Err(EpimlError::InvalidLabels {
                message: format!("class {bad} outside 0..{n_classes}"),
            });
        }

        let owned;
        let weights = match sample_weight {
            Some(w) => {
                if w.len() != n_rows {
                    return Err(EpimlError::dimension_mismatch("sample_weight", n_rows, w.len()));
                }
                w
            }
            None => {
                owned = vec![1.0f32; n_rows];
                &owned
            }
        };

        let indices: Vec<usize> = (0..n_rows).filter(|&i| weights[i] > 0.0).collect();
        if indices.is_empty() {
            return Err(EpimlError::empty_input("all sample weights are zero"));
        }

        let params = GrowParams {
            x,
            y,
            weights,
            n_classes,
            criterion: self.criterion,
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split,
            min_samples_leaf: self.min_samples_leaf,
            n_candidate_features: self.max_features.resolve(n_cols),
        };
        let mut rng = match self.random_state {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut importances = vec![0.0f32; n_cols];
        let tree = build_tree(&params, indices, 0, &mut rng, &mut importances);

        let total: f32 = importances.iter().sum();
        if total > 0.0 {
            importances.iter_mut().for_each(|v| *v /= total);
        }

        self.tree = Some(tree);
        self.n_features = Some(n_cols);
        self.n_classes = n_classes;
        self.feature_importances = Some(importances);
        Ok(())
    }

    fn check_input(&self, x: &Matrix<f32>) -> Result<&TreeNode> {
        let tree = self
            .tree
            .as_ref()
            .ok_or_else(|| EpimlError::not_fitted("DecisionTreeClassifier"))?;
        if let Some(expected) = self.n_features {
            if x.n_cols() != expected {
                return Err(EpimlError::dimension_mismatch("n_features", expected, x.n_cols()));
            }
        }
        Ok(tree)
    }
}

impl Default for DecisionTreeClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Classifier for DecisionTreeClassifier {
    fn fit(&mut self, x: &Matrix<f32>, y: &[usize]) -> Result<()> {
        self.fit_weighted(x, y, None)
    }

    fn predict_proba(&self, x: &Matrix<f32>) -> Result<Matrix<f32>> {
        let tree = self.check_input(x)?;
        let n_samples = x.n_rows();
        let mut data = Vec::with_capacity(n_samples * self.n_classes);
        for row in 0..n_samples {
            let leaf = tree.leaf_for(x.row_slice(row));
            data.extend_from_slice(&leaf.distribution);
        }
        Matrix::from_vec(n_samples, self.n_classes, data)
    }

    fn predict(&self, x: &Matrix<f32>) -> Result<Vec<usize>> {
        let tree = self.check_input(x)?;
        Ok((0..x.n_rows())
            .map(|row| tree.leaf_for(x.row_slice(row)).class_label())
            .collect())
    }

    fn n_classes(&self) -> usize {
        self.n_classes
    }

    fn set_random_state(&mut self, seed: u64) {
        self.random_state = Some(seed);
    }
}

impl Tunable for DecisionTreeClassifier {
    fn set_param(&mut self, name: &str, value: &ParamValue) -> Result<()> {
        match name {
            "criterion" => match value {
                ParamValue::Str(s) => self.criterion = Criterion::parse(s)?,
                other => return Err(EpimlError::invalid_param(name, other, "'gini' or 'entropy'")),
            },
            "max_depth" => self.max_depth = value.as_opt_usize(name)?,
            "min_samples_split" => self.min_samples_split = value.as_usize(name)?,
            "min_samples_leaf" => self.min_samples_leaf = value.as_usize(name)?,
            "max_features" => self.max_features = MaxFeatures::from_param(value)?,
            "random_state" => self.random_state = value.as_opt_usize(name)?.map(|v| v as u64),
            _ => return Err(unknown_param("DecisionTreeClassifier", name)),
        }
        Ok(())
    }
}

impl fmt::Display for DecisionTreeClassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = Repr::new("DecisionTreeClassifier")
            .text("criterion", self.criterion.name())
            .opt("max_depth", self.max_depth)
            .param("max_features", self.max_features)
            .param("min_samples_leaf", self.min_samples_leaf)
            .param("min_samples_split", self.min_samples_split)
            .opt("random_state", self.random_state);
        write!(f, "{repr}")
    }
}

#[cfg(test)]
mod tests;
