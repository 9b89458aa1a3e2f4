//! Random Forest implementation

use ndarray::{Array1, Array2, Axis};
use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

use super::decision_tree::DecisionTree;
use super::{Classifier, MaxFeatures};
use crate::error::{ModelError, ModelResult};

/// Random Forest model
#[derive(Debug, Clone)]
pub struct RandomForest {
    /// Individual trees
    trees: Vec<DecisionTree>,
    /// Number of trees
    pub n_estimators: usize,
    /// Maximum depth per tree
    pub max_depth: Option<usize>,
    /// Minimum samples to split a node
    pub min_samples_split: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Features considered per split
    pub max_features: MaxFeatures,
    /// Bootstrap sampling
    pub bootstrap: bool,
    /// Base seed; tree `i` uses `seed + i`
    pub seed: u64,
    n_features: usize,
    n_classes: usize,
    feature_importances: Option<Array1<f64>>,
}

impl Default for RandomForest {
    fn default() -> Self {
        Self::new(super::DEFAULT_N_ESTIMATORS)
    }
}

impl RandomForest {
    pub fn new(n_estimators: usize) -> Self {
        Self {
            trees: Vec::new(),
            n_estimators: n_estimators.max(1),
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::Sqrt,
            bootstrap: true,
            seed: 0,
            n_features: 0,
            n_classes: 0,
            feature_importances: None,
        }
    }

    /// Set maximum depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples.max(2);
        self
    }

    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples.max(1);
        self
    }

    /// Set max features strategy
    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    pub fn with_bootstrap(mut self, bootstrap: bool) -> Self {
        self.bootstrap = bootstrap;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    fn fit_tree(
        &self,
        tree_idx: usize,
        x: &Array2<f64>,
        y: &[usize],
        n_classes: usize,
        max_features: usize,
    ) -> ModelResult<DecisionTree> {
        let n_samples = x.nrows();
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed.wrapping_add(tree_idx as u64));

        let sample_indices: Vec<usize> = if self.bootstrap {
            (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect()
        } else {
            (0..n_samples).collect()
        };

        let x_boot = x.select(Axis(0), &sample_indices);
        let y_boot: Vec<usize> = sample_indices.iter().map(|&i| y[i]).collect();

        let mut tree = DecisionTree::new()
            .with_min_samples_split(self.min_samples_split)
            .with_min_samples_leaf(self.min_samples_leaf)
            .with_max_features(MaxFeatures::Fixed(max_features))
            .with_seed(rng.next_u64());
        if let Some(d) = self.max_depth {
            tree = tree.with_max_depth(d);
        }

        tree.fit(&x_boot, &y_boot, n_classes)?;
        Ok(tree)
    }

    fn compute_feature_importances(&mut self) {
        let mut total = vec![0.0; self.n_features];

        for tree in &self.trees {
            if let Some(imp) = tree.feature_importances() {
                for (acc, val) in total.iter_mut().zip(imp) {
                    *acc += val;
                }
            }
        }

        let n_trees = self.trees.len().max(1) as f64;
        for imp in &mut total {
            *imp /= n_trees;
        }
        self.feature_importances = Some(Array1::from_vec(total));
    }
}

impl Classifier for RandomForest {
    fn fit(&mut self, x: &Array2<f64>, y: &[usize], n_classes: usize) -> ModelResult<()> {
        let n_samples = x.nrows();
        if n_samples == 0 {
            return Err(ModelError::EmptyTrainingSet);
        }
        if n_samples != y.len() {
            return Err(ModelError::ShapeMismatch {
                expected: format!("{} labels", n_samples),
                actual: format!("{} labels", y.len()),
            });
        }

        self.n_features = x.ncols();
        self.n_classes = n_classes;
        let max_features = self.max_features.resolve(self.n_features);

        // Each tree owns its RNG, so results do not depend on scheduling
        let trees: Vec<DecisionTree> = (0..self.n_estimators)
            .into_par_iter()
            .map(|tree_idx| self.fit_tree(tree_idx, x, y, n_classes, max_features))
            .collect::<ModelResult<Vec<_>>>()?;

        self.trees = trees;
        self.compute_feature_importances();

        Ok(())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> ModelResult<Array2<f64>> {
        if self.trees.is_empty() {
            return Err(ModelError::NotFitted);
        }

        let mut total = Array2::<f64>::zeros((x.nrows(), self.n_classes));
        for tree in &self.trees {
            total += &tree.predict_proba(x)?;
        }
        total /= self.trees.len() as f64;

        Ok(total)
    }

    fn feature_importances(&self) -> Option<Vec<f64>> {
        self.feature_importances.as_ref().map(|imp| imp.to_vec())
    }
}
