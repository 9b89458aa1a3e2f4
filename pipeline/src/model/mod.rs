//! Classifiers used by the training step.
//!
//! - [`DecisionTree`] - a single CART tree grown to purity
//! - [`RandomForest`] - bootstrap ensemble of trees with feature subsampling
//!
//! Both implement [`Classifier`]. Labels are handled as class indices; the
//! [`LabelEncoder`] maps a label column to indices and back.

pub mod decision_tree;
pub mod random_forest;

use std::str::FromStr;

use ndarray::Array2;
use serde::Serialize;

use crate::error::{ModelError, ModelResult};
use crate::table::{Cell, Column};

pub use decision_tree::{DecisionTree, TreeNode};
pub use random_forest::RandomForest;

/// Number of trees in a forest unless configured otherwise.
pub const DEFAULT_N_ESTIMATORS: usize = 100;

// =============================================================================
// Classifier
// =============================================================================

/// A classifier over numeric feature matrices and class indices.
pub trait Classifier: Send + Sync {
    /// Fit on `x` (one row per sample) with labels `y` in `0..n_classes`.
    fn fit(&mut self, x: &Array2<f64>, y: &[usize], n_classes: usize) -> ModelResult<()>;

    /// Class probabilities, one row per sample and one column per class.
    fn predict_proba(&self, x: &Array2<f64>) -> ModelResult<Array2<f64>>;

    /// Per-feature importance, normalized to sum to one.
    fn feature_importances(&self) -> Option<Vec<f64>>;

    /// Most probable class per row. Ties go to the lowest class index.
    fn predict(&self, x: &Array2<f64>) -> ModelResult<Vec<usize>> {
        let proba = self.predict_proba(x)?;
        Ok(proba
            .rows()
            .into_iter()
            .map(|row| {
                let mut best = 0;
                for (class, &p) in row.iter().enumerate() {
                    if p > row[best] {
                        best = class;
                    }
                }
                best
            })
            .collect())
    }
}

// =============================================================================
// Algorithm Selection
// =============================================================================

/// Which classifier the training step fits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    DecisionTree,
    RandomForest,
}

impl Algorithm {
    /// `"decision_tree"` selects a single tree; any other name a forest.
    pub fn from_name(name: &str) -> Self {
        if name.trim() == "decision_tree" {
            Algorithm::DecisionTree
        } else {
            Algorithm::RandomForest
        }
    }

    /// Build an unfitted classifier.
    pub fn build(&self, options: &ModelOptions, seed: u64) -> Box<dyn Classifier> {
        match self {
            Algorithm::DecisionTree => {
                let mut tree = DecisionTree::new()
                    .with_min_samples_split(options.min_samples_split)
                    .with_min_samples_leaf(options.min_samples_leaf)
                    .with_seed(seed);
                if let Some(depth) = options.max_depth {
                    tree = tree.with_max_depth(depth);
                }
                if let Some(max_features) = options.max_features {
                    tree = tree.with_max_features(max_features);
                }
                Box::new(tree)
            }
            Algorithm::RandomForest => {
                let mut forest = RandomForest::new(options.n_estimators)
                    .with_min_samples_split(options.min_samples_split)
                    .with_min_samples_leaf(options.min_samples_leaf)
                    .with_bootstrap(options.bootstrap)
                    .with_seed(seed);
                if let Some(depth) = options.max_depth {
                    forest = forest.with_max_depth(depth);
                }
                if let Some(max_features) = options.max_features {
                    forest = forest.with_max_features(max_features);
                }
                Box::new(forest)
            }
        }
    }
}

/// Hyperparameters exposed to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelOptions {
    /// Trees in a forest.
    pub n_estimators: usize,
    /// Seed for bootstrap and feature sampling. `None` draws a fresh one.
    pub seed: Option<u64>,
    /// Depth limit per tree; unlimited when `None`.
    pub max_depth: Option<usize>,
    /// Smallest node that may be split.
    pub min_samples_split: usize,
    /// Smallest leaf a split may produce.
    pub min_samples_leaf: usize,
    /// Features considered per split. `None` means all for a single tree and
    /// [`MaxFeatures::Sqrt`] for a forest.
    pub max_features: Option<MaxFeatures>,
    /// Whether forest trees train on bootstrap samples.
    pub bootstrap: bool,
}

impl Default for ModelOptions {
    fn default() -> Self {
        Self {
            n_estimators: DEFAULT_N_ESTIMATORS,
            seed: None,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            bootstrap: true,
        }
    }
}

/// How many features a split may look at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaxFeatures {
    /// Square root of n_features
    Sqrt,
    /// Log2 of n_features
    Log2,
    /// Fixed number, capped at n_features
    Fixed(usize),
    /// All features
    All,
}

impl MaxFeatures {
    /// Number of features per split for `n_features` columns, at least one.
    pub fn resolve(self, n_features: usize) -> usize {
        match self {
            MaxFeatures::Sqrt => (n_features as f64).sqrt().ceil() as usize,
            MaxFeatures::Log2 => (n_features as f64).log2().ceil() as usize,
            MaxFeatures::Fixed(n) => n.min(n_features),
            MaxFeatures::All => n_features,
        }
        .max(1)
    }
}

impl FromStr for MaxFeatures {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sqrt" => Ok(MaxFeatures::Sqrt),
            "log2" => Ok(MaxFeatures::Log2),
            "all" => Ok(MaxFeatures::All),
            other => match other.parse::<usize>() {
                Ok(n) if n > 0 => Ok(MaxFeatures::Fixed(n)),
                _ => Err(format!(
                    "expected sqrt, log2, all or a positive count, got '{}'",
                    other
                )),
            },
        }
    }
}

// =============================================================================
// Labels
// =============================================================================

/// Maps label values to class indices `0..n_classes` and back.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelEncoder {
    classes: Vec<Cell>,
}

impl LabelEncoder {
    /// Learn the classes of a label column and encode it.
    pub fn fit(column: &Column) -> ModelResult<(Self, Vec<usize>)> {
        if let Some(row) = column.cells().iter().position(Cell::is_missing) {
            return Err(ModelError::MissingLabel { row });
        }

        let mut classes: Vec<Cell> = column.cells().to_vec();
        classes.sort_by(|a, b| a.total_cmp(b));
        classes.dedup_by(|a, b| a.total_cmp(b).is_eq());

        let encoder = Self { classes };
        let encoded = column
            .cells()
            .iter()
            .map(|cell| encoder.index_of(cell))
            .collect();
        Ok((encoder, encoded))
    }

    fn index_of(&self, cell: &Cell) -> usize {
        self.classes
            .binary_search_by(|c| c.total_cmp(cell))
            .unwrap_or_default()
    }

    pub fn n_classes(&self) -> usize {
        self.classes.len()
    }

    pub fn classes(&self) -> &[Cell] {
        &self.classes
    }

    /// Label value of a class index.
    pub fn decode(&self, class: usize) -> Cell {
        self.classes.get(class).cloned().unwrap_or(Cell::Missing)
    }
}

/// Percentage of matching labels, rounded to two decimals.
pub fn accuracy(predicted: &[usize], actual: &[usize]) -> f64 {
    if actual.is_empty() {
        return 0.0;
    }
    let correct = predicted
        .iter()
        .zip(actual)
        .filter(|(p, a)| p == a)
        .count();
    let percent = correct as f64 / actual.len() as f64 * 100.0;
    (percent * 100.0).round() / 100.0
}

/// Gini impurity of a class histogram.
pub(crate) fn gini(counts: &[usize], total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let n = total as f64;
    1.0 - counts
        .iter()
        .map(|&c| (c as f64 / n).powi(2))
        .sum::<f64>()
}
