//! CART decision tree classifier

use ndarray::{Array1, Array2, ArrayView1};
use rand::seq::index;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use super::{gini, Classifier, MaxFeatures};
use crate::error::{ModelError, ModelResult};

/// Decision tree node
#[derive(Debug, Clone)]
pub enum TreeNode {
    /// Leaf node with class probabilities
    Leaf {
        proba: Vec<f64>,
        n_samples: usize,
    },
    /// Internal node with split
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        n_samples: usize,
        impurity: f64,
    },
}

/// Best split found for a node
struct SplitCandidate {
    feature_idx: usize,
    threshold: f64,
    gain: f64,
}

/// Decision tree model
#[derive(Debug, Clone)]
pub struct DecisionTree {
    /// Tree root
    root: Option<TreeNode>,
    /// Maximum depth
    pub max_depth: Option<usize>,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Features considered per split (all when `None`)
    pub max_features: Option<MaxFeatures>,
    /// Seed for feature sampling
    pub seed: u64,
    n_features: usize,
    n_classes: usize,
    feature_importances: Option<Array1<f64>>,
}

impl Default for DecisionTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DecisionTree {
    pub fn new() -> Self {
        Self {
            root: None,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
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

    /// Set minimum samples to split
    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples.max(2);
        self
    }

    /// Set minimum samples in leaf
    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples.max(1);
        self
    }

    /// Consider only a random subset of features at each split
    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = Some(max_features);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn root(&self) -> Option<&TreeNode> {
        self.root.as_ref()
    }

    fn build_tree(
        &self,
        x: &Array2<f64>,
        y: &[usize],
        indices: &[usize],
        depth: usize,
        rng: &mut ChaCha8Rng,
        importances: &mut [f64],
    ) -> TreeNode {
        let n_samples = indices.len();
        let counts = self.class_counts(y, indices);
        let impurity = gini(&counts, n_samples);

        let should_stop = n_samples < self.min_samples_split
            || n_samples < 2 * self.min_samples_leaf
            || self.max_depth.map_or(false, |d| depth >= d)
            || impurity <= f64::EPSILON;

        if should_stop {
            return self.leaf(&counts, n_samples);
        }

        let Some(split) = self.find_best_split(x, y, indices, &counts, impurity, rng) else {
            return self.leaf(&counts, n_samples);
        };

        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| x[[i, split.feature_idx]] <= split.threshold);

        importances[split.feature_idx] += n_samples as f64 * split.gain;

        let left = Box::new(self.build_tree(x, y, &left_indices, depth + 1, rng, importances));
        let right = Box::new(self.build_tree(x, y, &right_indices, depth + 1, rng, importances));

        TreeNode::Split {
            feature_idx: split.feature_idx,
            threshold: split.threshold,
            left,
            right,
            n_samples,
            impurity,
        }
    }

    fn leaf(&self, counts: &[usize], n_samples: usize) -> TreeNode {
        let n = n_samples.max(1) as f64;
        TreeNode::Leaf {
            proba: counts.iter().map(|&c| c as f64 / n).collect(),
            n_samples,
        }
    }

    fn class_counts(&self, y: &[usize], indices: &[usize]) -> Vec<usize> {
        let mut counts = vec![0; self.n_classes];
        for &i in indices {
            counts[y[i]] += 1;
        }
        counts
    }

    /// Scan candidate features with a sorted sweep. A split between two
    /// equal values is never proposed. Among equally good splits the first
    /// one found wins.
    fn find_best_split(
        &self,
        x: &Array2<f64>,
        y: &[usize],
        indices: &[usize],
        total: &[usize],
        parent_impurity: f64,
        rng: &mut ChaCha8Rng,
    ) -> Option<SplitCandidate> {
        let n = indices.len();
        let per_split = self.max_features.map(|m| m.resolve(self.n_features));
        let candidates: Vec<usize> = match per_split {
            Some(k) if k < self.n_features => {
                let mut picked = index::sample(rng, self.n_features, k).into_vec();
                picked.sort_unstable();
                picked
            }
            _ => (0..self.n_features).collect(),
        };

        let mut best: Option<SplitCandidate> = None;

        for feature_idx in candidates {
            let mut sorted: Vec<(f64, usize)> =
                indices.iter().map(|&i| (x[[i, feature_idx]], y[i])).collect();
            sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut left = vec![0usize; self.n_classes];
            let mut right = total.to_vec();

            for pos in 0..n - 1 {
                let (value, class) = sorted[pos];
                left[class] += 1;
                right[class] -= 1;

                let next = sorted[pos + 1].0;
                if next <= value {
                    continue;
                }

                let left_n = pos + 1;
                let right_n = n - left_n;
                if left_n < self.min_samples_leaf || right_n < self.min_samples_leaf {
                    continue;
                }

                let weighted = (left_n as f64 * gini(&left, left_n)
                    + right_n as f64 * gini(&right, right_n))
                    / n as f64;
                let gain = parent_impurity - weighted;

                if best.as_ref().map_or(true, |b| gain > b.gain + 1e-12) {
                    let mut threshold = value / 2.0 + next / 2.0;
                    if threshold >= next {
                        threshold = value;
                    }
                    best = Some(SplitCandidate {
                        feature_idx,
                        threshold,
                        gain,
                    });
                }
            }
        }

        best
    }

    fn predict_row<'a>(&'a self, node: &'a TreeNode, sample: ArrayView1<f64>) -> &'a [f64] {
        match node {
            TreeNode::Leaf { proba, .. } => proba,
            TreeNode::Split {
                feature_idx,
                threshold,
                left,
                right,
                ..
            } => {
                if sample[*feature_idx] <= *threshold {
                    self.predict_row(left, sample)
                } else {
                    self.predict_row(right, sample)
                }
            }
        }
    }

    /// Get tree depth (edges from root to the deepest leaf)
    pub fn get_depth(&self) -> usize {
        fn depth(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 0,
                TreeNode::Split { left, right, .. } => 1 + depth(left).max(depth(right)),
            }
        }
        self.root.as_ref().map_or(0, depth)
    }

    /// Get number of leaves
    pub fn get_n_leaves(&self) -> usize {
        fn leaves(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 1,
                TreeNode::Split { left, right, .. } => leaves(left) + leaves(right),
            }
        }
        self.root.as_ref().map_or(0, leaves)
    }
}

impl Classifier for DecisionTree {
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
        if let Some(&bad) = y.iter().find(|&&c| c >= n_classes) {
            return Err(ModelError::ShapeMismatch {
                expected: format!("class index below {}", n_classes),
                actual: format!("class index {}", bad),
            });
        }

        self.n_features = x.ncols();
        self.n_classes = n_classes;

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut importances = vec![0.0; self.n_features];
        let indices: Vec<usize> = (0..n_samples).collect();
        self.root = Some(self.build_tree(x, y, &indices, 0, &mut rng, &mut importances));

        // Normalize feature importances
        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            for imp in &mut importances {
                *imp /= total;
            }
        }
        self.feature_importances = Some(Array1::from_vec(importances));

        Ok(())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> ModelResult<Array2<f64>> {
        let root = self.root.as_ref().ok_or(ModelError::NotFitted)?;
        if x.ncols() != self.n_features {
            return Err(ModelError::ShapeMismatch {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }

        let mut proba = Array2::zeros((x.nrows(), self.n_classes));
        for (i, sample) in x.rows().into_iter().enumerate() {
            for (class, &p) in self.predict_row(root, sample).iter().enumerate() {
                proba[[i, class]] = p;
            }
        }
        Ok(proba)
    }

    fn feature_importances(&self) -> Option<Vec<f64>> {
        self.feature_importances.as_ref().map(|imp| imp.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_fits_separable_data() {
        let x = array![[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0]];
        let y = vec![0, 0, 1, 1];

        let mut tree = DecisionTree::new();
        tree.fit(&x, &y, 2).unwrap();

        assert_eq!(tree.predict(&x).unwrap(), y);
        assert_eq!(tree.get_depth(), 1);
        assert_eq!(tree.get_n_leaves(), 2);
    }

    #[test]
    fn test_learns_xor() {
        // no single split has positive gain, the tree still grows to purity
        let x = array![[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0]];
        let y = vec![0, 1, 1, 0];

        let mut tree = DecisionTree::new();
        tree.fit(&x, &y, 2).unwrap();
        assert_eq!(tree.predict(&x).unwrap(), y);
    }

    #[test]
    fn test_conflicting_rows_get_majority() {
        let x = array![[1.0], [1.0], [1.0], [2.0]];
        let y = vec![1, 1, 0, 0];

        let mut tree = DecisionTree::new();
        tree.fit(&x, &y, 2).unwrap();

        let proba = tree.predict_proba(&array![[1.0]]).unwrap();
        assert!((proba[[0, 1]] - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(tree.predict(&x).unwrap(), vec![1, 1, 1, 0]);
    }

    #[test]
    fn test_threshold_is_midpoint() {
        let x = array![[1.0], [3.0]];
        let y = vec![0, 1];

        let mut tree = DecisionTree::new();
        tree.fit(&x, &y, 2).unwrap();
        match tree.root().unwrap() {
            TreeNode::Split { threshold, .. } => assert_eq!(*threshold, 2.0),
            TreeNode::Leaf { .. } => panic!("expected a split"),
        }
        assert_eq!(tree.predict(&array![[1.9], [2.1]]).unwrap(), vec![0, 1]);
    }

    #[test]
    fn test_max_depth() {
        let x = array![[1.0, 1.0], [2.0, 2.0], [3.0, 3.0], [4.0, 4.0]];
        let y = vec![0, 1, 0, 1];

        let mut tree = DecisionTree::new().with_max_depth(2);
        tree.fit(&x, &y, 2).unwrap();
        assert_eq!(tree.get_depth(), 2);
    }

    #[test]
    fn test_min_samples_stop_growth() {
        let x = array![[1.0], [2.0], [3.0]];
        let y = vec![0, 1, 1];
        let mut tree = DecisionTree::new().with_min_samples_leaf(2);
        tree.fit(&x, &y, 2).unwrap();
        assert_eq!(tree.get_n_leaves(), 1);

        let x = array![[0.0], [0.0], [1.0], [1.0]];
        let y = vec![0, 0, 1, 1];
        let mut tree = DecisionTree::new().with_min_samples_split(5);
        tree.fit(&x, &y, 2).unwrap();
        assert_eq!(tree.get_n_leaves(), 1);
        assert_eq!(tree.get_depth(), 0);
    }

    #[test]
    fn test_feature_sampling_is_seeded() {
        let x = array![
            [1.0, 5.0, 0.0],
            [2.0, 4.0, 1.0],
            [3.0, 3.0, 0.0],
            [4.0, 2.0, 1.0],
            [5.0, 1.0, 0.0]
        ];
        let y = vec![0, 0, 1, 1, 1];
        let fit = |seed| {
            let mut tree = DecisionTree::new()
                .with_max_features(MaxFeatures::Fixed(1))
                .with_seed(seed);
            tree.fit(&x, &y, 2).unwrap();
            tree.predict_proba(&x).unwrap()
        };
        assert_eq!(fit(4), fit(4));
    }

    #[test]
    fn test_feature_importances() {
        let x = array![[1.0, 0.0], [2.0, 0.0], [3.0, 0.0], [4.0, 0.0]];
        let y = vec![0, 0, 1, 1];

        let mut tree = DecisionTree::new();
        tree.fit(&x, &y, 2).unwrap();

        let importances = tree.feature_importances().unwrap();
        assert_eq!(importances, vec![1.0, 0.0]);
    }

    #[test]
    fn test_errors() {
        let tree = DecisionTree::new();
        assert!(matches!(
            tree.predict(&array![[1.0]]),
            Err(ModelError::NotFitted)
        ));

        let mut tree = DecisionTree::new();
        let empty = Array2::<f64>::zeros((0, 2));
        assert!(matches!(
            tree.fit(&empty, &[], 2),
            Err(ModelError::EmptyTrainingSet)
        ));

        tree.fit(&array![[1.0, 2.0], [2.0, 1.0]], &[0, 1], 2).unwrap();
        assert!(matches!(
            tree.predict(&array![[1.0]]),
            Err(ModelError::ShapeMismatch { .. })
        ));
    }
}
