//! Bootstrap-aggregated tree ensemble

use super::tree::{Criterion, DecisionTree, MaxFeatures, TreeParams};
use crate::{Error, Result};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Random-forest classifier
///
/// Each tree is grown on a bootstrap sample (drawn with replacement) with
/// its own RNG derived from the ensemble seed, so fitting is fully
/// deterministic. Prediction averages the per-tree leaf class distributions
/// and takes the argmax.
pub struct RandomForestClassifier {
    n_estimators: usize,
    params: TreeParams,
    seed: u64,
    trees: Vec<DecisionTree>,
    n_features: usize,
    n_classes: usize,
}

impl RandomForestClassifier {
    /// Create an unfitted forest
    pub fn new(n_estimators: usize, max_depth: usize, seed: u64) -> Self {
        Self {
            n_estimators,
            params: TreeParams::new(max_depth),
            seed,
            trees: Vec::new(),
            n_features: 0,
            n_classes: 0,
        }
    }

    /// Override the split criterion
    pub fn with_criterion(mut self, criterion: Criterion) -> Self {
        self.params.criterion = criterion;
        self
    }

    /// Override the per-split feature subset size
    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.params.max_features = max_features;
        self
    }

    /// Fit on a feature matrix and label vector
    ///
    /// Labels must be contiguous class indices; the class count is
    /// `max(y) + 1`.
    pub fn fit(&mut self, x: &Array2<f32>, y: &[usize]) -> Result<()> {
        if x.nrows() == 0 {
            return Err(Error::InvalidParameter("empty training set".to_string()));
        }
        if x.nrows() != y.len() {
            return Err(Error::InvalidParameter(format!(
                "row/label count mismatch: {} rows, {} labels",
                x.nrows(),
                y.len()
            )));
        }
        if self.n_estimators == 0 {
            return Err(Error::InvalidParameter(
                "n_estimators must be positive".to_string(),
            ));
        }

        let n_classes = y.iter().max().map_or(0, |&m| m + 1);
        let n = x.nrows();

        let mut trees = Vec::with_capacity(self.n_estimators);
        for t in 0..self.n_estimators {
            let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(t as u64));
            let sample: Vec<usize> = (0..n).map(|_| rng.random_range(0..n)).collect();
            trees.push(DecisionTree::fit_indices(
                x,
                y,
                &sample,
                n_classes,
                &self.params,
                &mut rng,
            )?);
        }

        self.trees = trees;
        self.n_features = x.ncols();
        self.n_classes = n_classes;
        Ok(())
    }

    /// Averaged class probabilities, one row per input row
    pub fn predict_proba(&self, x: &Array2<f32>) -> Result<Array2<f32>> {
        if self.trees.is_empty() {
            return Err(Error::InvalidParameter(
                "forest has not been fitted".to_string(),
            ));
        }
        if x.ncols() != self.n_features {
            return Err(Error::ShapeMismatch {
                expected: vec![x.nrows(), self.n_features],
                got: vec![x.nrows(), x.ncols()],
            });
        }

        let mut proba = Array2::<f32>::zeros((x.nrows(), self.n_classes));
        for (i, row) in x.rows().into_iter().enumerate() {
            for tree in &self.trees {
                for (c, &p) in tree.predict_proba_row(row).iter().enumerate() {
                    proba[[i, c]] += p;
                }
            }
            let scale = 1.0 / self.trees.len() as f32;
            for c in 0..self.n_classes {
                proba[[i, c]] *= scale;
            }
        }
        Ok(proba)
    }

    /// Predicted class labels
    pub fn predict(&self, x: &Array2<f32>) -> Result<Vec<usize>> {
        let proba = self.predict_proba(x)?;
        Ok(proba
            .rows()
            .into_iter()
            .map(|row| {
                row.iter()
                    .enumerate()
                    .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
                    .map_or(0, |(c, _)| c)
            })
            .collect())
    }

    /// Number of trees requested
    pub fn n_estimators(&self) -> usize {
        self.n_estimators
    }

    /// Depth limit per tree
    pub fn max_depth(&self) -> usize {
        self.params.max_depth
    }

    /// Ensemble seed
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Fitted trees (empty before `fit`)
    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    /// Feature dimension seen at fit time
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Class count seen at fit time
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }
}
