//! Depth-limited decision tree with impurity-based splits

use crate::{Error, Result};
use ndarray::{Array2, ArrayView1};
use rand::Rng;
use std::cmp::Ordering;

/// Split quality criterion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Criterion {
    /// Gini impurity: `1 - sum(p_i^2)`
    Gini,
    /// Shannon entropy: `-sum(p_i * log2(p_i))`
    Entropy,
}

impl Criterion {
    /// Impurity of a class-count vector
    pub fn impurity(&self, counts: &[f32], total: f32) -> f32 {
        if total <= 0.0 {
            return 0.0;
        }
        match self {
            Criterion::Gini => {
                1.0 - counts
                    .iter()
                    .map(|&c| {
                        let p = c / total;
                        p * p
                    })
                    .sum::<f32>()
            }
            Criterion::Entropy => counts
                .iter()
                .filter(|&&c| c > 0.0)
                .map(|&c| {
                    let p = c / total;
                    -p * p.log2()
                })
                .sum(),
        }
    }
}

/// Number of features examined per split
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaxFeatures {
    /// All features
    All,
    /// `ceil(sqrt(n_features))`, the classifier default
    Sqrt,
    /// `ceil(log2(n_features))`
    Log2,
    /// Fixed count, clamped to the feature count
    Exact(usize),
}

impl MaxFeatures {
    /// Resolve to a concrete count for the given feature dimension
    pub fn resolve(&self, n_features: usize) -> usize {
        let k = match self {
            MaxFeatures::All => n_features,
            MaxFeatures::Sqrt => (n_features as f64).sqrt().ceil() as usize,
            MaxFeatures::Log2 => (n_features as f64).log2().ceil() as usize,
            MaxFeatures::Exact(k) => *k,
        };
        k.clamp(1, n_features.max(1))
    }
}

/// Tree-growing hyperparameters
#[derive(Debug, Clone, Copy)]
pub struct TreeParams {
    /// Maximum split depth; the root sits at depth 0
    pub max_depth: usize,
    /// Minimum samples required to attempt a split
    pub min_samples_split: usize,
    /// Features examined per split
    pub max_features: MaxFeatures,
    /// Split quality criterion
    pub criterion: Criterion,
}

impl TreeParams {
    /// Classifier defaults with the given depth limit
    pub fn new(max_depth: usize) -> Self {
        Self {
            max_depth,
            min_samples_split: 2,
            max_features: MaxFeatures::Sqrt,
            criterion: Criterion::Gini,
        }
    }
}

/// One node of a fitted tree, arena-linked by index
#[derive(Debug, Clone, PartialEq)]
pub enum TreeNode {
    /// Terminal node holding a normalized class distribution
    Leaf { distribution: Vec<f32> },
    /// Binary split: `x[feature] <= threshold` goes left
    Split {
        feature: usize,
        threshold: f32,
        left: usize,
        right: usize,
    },
}

/// A fitted decision tree
#[derive(Debug, Clone)]
pub struct DecisionTree {
    nodes: Vec<TreeNode>,
    n_classes: usize,
}

impl DecisionTree {
    /// Fit on all rows of `x`
    pub fn fit(
        x: &Array2<f32>,
        y: &[usize],
        n_classes: usize,
        params: &TreeParams,
        rng: &mut impl Rng,
    ) -> Result<Self> {
        let indices: Vec<usize> = (0..x.nrows()).collect();
        Self::fit_indices(x, y, &indices, n_classes, params, rng)
    }

    /// Fit on a row subset (bootstrap sample); indices may repeat
    pub fn fit_indices(
        x: &Array2<f32>,
        y: &[usize],
        indices: &[usize],
        n_classes: usize,
        params: &TreeParams,
        rng: &mut impl Rng,
    ) -> Result<Self> {
        if x.nrows() != y.len() {
            return Err(Error::InvalidParameter(format!(
                "row/label count mismatch: {} rows, {} labels",
                x.nrows(),
                y.len()
            )));
        }
        if indices.is_empty() {
            return Err(Error::InvalidParameter("empty training set".to_string()));
        }
        if n_classes == 0 {
            return Err(Error::InvalidParameter("n_classes must be positive".to_string()));
        }
        if let Some(&bad) = y.iter().find(|&&label| label >= n_classes) {
            return Err(Error::InvalidParameter(format!(
                "label {bad} out of range for {n_classes} classes"
            )));
        }

        let mut builder = TreeBuilder {
            x,
            y,
            n_classes,
            params,
            rng,
            nodes: Vec::new(),
        };
        builder.grow(indices, 0);
        Ok(Self {
            nodes: builder.nodes,
            n_classes,
        })
    }

    /// Class distribution at the leaf this row falls into
    pub fn predict_proba_row(&self, row: ArrayView1<'_, f32>) -> &[f32] {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                TreeNode::Leaf { distribution } => return distribution,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    /// Number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Arena view, root first
    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    /// Number of classes
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Split depth of the tree (a lone leaf has depth 0)
    pub fn depth(&self) -> usize {
        self.depth_from(0)
    }

    fn depth_from(&self, idx: usize) -> usize {
        match &self.nodes[idx] {
            TreeNode::Leaf { .. } => 0,
            TreeNode::Split { left, right, .. } => {
                1 + self.depth_from(*left).max(self.depth_from(*right))
            }
        }
    }
}

struct TreeBuilder<'a, R: Rng> {
    x: &'a Array2<f32>,
    y: &'a [usize],
    n_classes: usize,
    params: &'a TreeParams,
    rng: &'a mut R,
    nodes: Vec<TreeNode>,
}

impl<R: Rng> TreeBuilder<'_, R> {
    fn grow(&mut self, indices: &[usize], depth: usize) -> usize {
        let mut counts = vec![0.0f32; self.n_classes];
        for &i in indices {
            counts[self.y[i]] += 1.0;
        }
        let total = indices.len() as f32;
        let pure = counts.iter().filter(|&&c| c > 0.0).count() <= 1;

        if depth >= self.params.max_depth
            || indices.len() < self.params.min_samples_split
            || pure
        {
            return self.push_leaf(counts, total);
        }

        match self.best_split(indices, &counts, total) {
            Some((feature, threshold)) => {
                let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
                    .iter()
                    .copied()
                    .partition(|&i| self.x[[i, feature]] <= threshold);

                // reserve the split slot so children get consecutive ids
                let id = self.nodes.len();
                self.nodes.push(TreeNode::Leaf {
                    distribution: Vec::new(),
                });
                let left = self.grow(&left_idx, depth + 1);
                let right = self.grow(&right_idx, depth + 1);
                self.nodes[id] = TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                };
                id
            }
            None => self.push_leaf(counts, total),
        }
    }

    fn push_leaf(&mut self, counts: Vec<f32>, total: f32) -> usize {
        let distribution = counts.iter().map(|&c| c / total).collect();
        let id = self.nodes.len();
        self.nodes.push(TreeNode::Leaf { distribution });
        id
    }

    /// Best `(feature, threshold)` over a random feature subset, or `None`
    /// when no split improves on the parent impurity
    fn best_split(
        &mut self,
        indices: &[usize],
        counts: &[f32],
        total: f32,
    ) -> Option<(usize, f32)> {
        let n_features = self.x.ncols();
        let k = self.params.max_features.resolve(n_features);
        let features = self.sample_features(n_features, k);
        let parent = self.params.criterion.impurity(counts, total);

        let mut best: Option<(f32, usize, f32)> = None;
        for f in features {
            let mut vals: Vec<(f32, usize)> = indices
                .iter()
                .map(|&i| (self.x[[i, f]], self.y[i]))
                .collect();
            vals.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));

            let mut left_counts = vec![0.0f32; self.n_classes];
            for i in 1..vals.len() {
                left_counts[vals[i - 1].1] += 1.0;
                if vals[i].0 <= vals[i - 1].0 {
                    continue;
                }
                let threshold = (vals[i - 1].0 + vals[i].0) / 2.0;
                let left_total = i as f32;
                let right_total = total - left_total;
                let right_counts: Vec<f32> = counts
                    .iter()
                    .zip(left_counts.iter())
                    .map(|(&all, &l)| all - l)
                    .collect();
                let weighted = (left_total
                    * self.params.criterion.impurity(&left_counts, left_total)
                    + right_total
                        * self.params.criterion.impurity(&right_counts, right_total))
                    / total;
                let gain = parent - weighted;
                if gain > 1e-7 && best.map_or(true, |(g, _, _)| gain > g) {
                    best = Some((gain, f, threshold));
                }
            }
        }
        best.map(|(_, f, t)| (f, t))
    }

    /// Sample `k` distinct features by partial Fisher-Yates
    fn sample_features(&mut self, n: usize, k: usize) -> Vec<usize> {
        let mut pool: Vec<usize> = (0..n).collect();
        for i in 0..k.min(n) {
            let j = self.rng.random_range(i..n);
            pool.swap(i, j);
        }
        pool.truncate(k.min(n));
        pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::arr2;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn separable_data() -> (Array2<f32>, Vec<usize>) {
        let x = arr2(&[
            [0.0, 0.0],
            [0.1, 0.2],
            [0.2, 0.1],
            [1.0, 1.0],
            [0.9, 1.1],
            [1.1, 0.9],
        ]);
        let y = vec![0, 0, 0, 1, 1, 1];
        (x, y)
    }

    #[test]
    fn test_gini_impurity() {
        let c = Criterion::Gini;
        assert_relative_eq!(c.impurity(&[4.0, 0.0], 4.0), 0.0);
        assert_relative_eq!(c.impurity(&[2.0, 2.0], 4.0), 0.5);
    }

    #[test]
    fn test_entropy_impurity() {
        let c = Criterion::Entropy;
        assert_relative_eq!(c.impurity(&[4.0, 0.0], 4.0), 0.0);
        assert_relative_eq!(c.impurity(&[2.0, 2.0], 4.0), 1.0);
    }

    #[test]
    fn test_max_features_resolve() {
        assert_eq!(MaxFeatures::All.resolve(5), 5);
        assert_eq!(MaxFeatures::Sqrt.resolve(5), 3);
        assert_eq!(MaxFeatures::Sqrt.resolve(4), 2);
        assert_eq!(MaxFeatures::Log2.resolve(8), 3);
        assert_eq!(MaxFeatures::Exact(10).resolve(5), 5);
        assert_eq!(MaxFeatures::Exact(0).resolve(5), 1);
    }

    #[test]
    fn test_fit_separable() {
        let (x, y) = separable_data();
        let mut params = TreeParams::new(5);
        params.max_features = MaxFeatures::All;
        let mut rng = StdRng::seed_from_u64(0);
        let tree = DecisionTree::fit(&x, &y, 2, &params, &mut rng).unwrap();

        for (i, &label) in y.iter().enumerate() {
            let proba = tree.predict_proba_row(x.row(i));
            assert_relative_eq!(proba[label], 1.0);
        }
    }

    #[test]
    fn test_depth_bound() {
        let (x, y) = separable_data();
        for max_depth in 1..4 {
            let params = TreeParams::new(max_depth);
            let mut rng = StdRng::seed_from_u64(7);
            let tree = DecisionTree::fit(&x, &y, 2, &params, &mut rng).unwrap();
            assert!(tree.depth() <= max_depth);
        }
    }

    #[test]
    fn test_zero_depth_is_single_leaf() {
        let (x, y) = separable_data();
        let params = TreeParams::new(0);
        let mut rng = StdRng::seed_from_u64(0);
        let tree = DecisionTree::fit(&x, &y, 2, &params, &mut rng).unwrap();
        assert_eq!(tree.node_count(), 1);
        let proba = tree.predict_proba_row(x.row(0));
        assert_relative_eq!(proba[0], 0.5);
        assert_relative_eq!(proba[1], 0.5);
    }

    #[test]
    fn test_leaf_distributions_normalized() {
        let (x, y) = separable_data();
        let params = TreeParams::new(5);
        let mut rng = StdRng::seed_from_u64(1);
        let tree = DecisionTree::fit(&x, &y, 2, &params, &mut rng).unwrap();
        for node in tree.nodes() {
            if let TreeNode::Leaf { distribution } = node {
                let sum: f32 = distribution.iter().sum();
                assert_relative_eq!(sum, 1.0, epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn test_fit_rejects_bad_input() {
        let (x, _) = separable_data();
        let params = TreeParams::new(3);
        let mut rng = StdRng::seed_from_u64(0);

        // label/row mismatch
        assert!(DecisionTree::fit(&x, &[0, 1], 2, &params, &mut rng).is_err());
        // out-of-range label
        let y_bad = vec![0, 0, 0, 1, 1, 5];
        assert!(DecisionTree::fit(&x, &y_bad, 2, &params, &mut rng).is_err());
    }

    #[test]
    fn test_constant_features_yield_leaf() {
        let x = arr2(&[[1.0, 1.0], [1.0, 1.0], [1.0, 1.0], [1.0, 1.0]]);
        let y = vec![0, 1, 0, 1];
        let params = TreeParams::new(5);
        let mut rng = StdRng::seed_from_u64(0);
        let tree = DecisionTree::fit(&x, &y, 2, &params, &mut rng).unwrap();
        // no usable split exists
        assert_eq!(tree.node_count(), 1);
    }

    #[test]
    fn test_deterministic_for_seed() {
        let (x, y) = separable_data();
        let params = TreeParams::new(5);
        let mut rng_a = StdRng::seed_from_u64(9);
        let mut rng_b = StdRng::seed_from_u64(9);
        let a = DecisionTree::fit(&x, &y, 2, &params, &mut rng_a).unwrap();
        let b = DecisionTree::fit(&x, &y, 2, &params, &mut rng_b).unwrap();
        assert_eq!(a.nodes(), b.nodes());
    }
}
