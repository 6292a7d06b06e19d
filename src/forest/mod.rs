//! Tree-ensemble classifier
//!
//! A small random forest: depth-limited decision trees grown on bootstrap
//! samples with impurity-based splits, predictions by averaging the leaf
//! class distributions across the ensemble. This is the only fixture that is
//! actually fitted; the network fixtures export freshly initialized weights.

mod encode;
mod random_forest;
mod tree;

pub use random_forest::RandomForestClassifier;
pub use tree::{Criterion, DecisionTree, MaxFeatures, TreeNode, TreeParams};
