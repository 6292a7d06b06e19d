//! Flattening a fitted forest into an exportable model
//!
//! The ensemble is encoded as parallel arrays over all nodes of all trees,
//! the layout tree-ensemble interchange consumers expect: per-node tree id,
//! node id, split feature, threshold, true/false child ids, a leaf flag,
//! and a dense `[n_nodes, n_classes]` leaf-distribution matrix. Ids are
//! stored as f32 like every other tensor; at fixture scale they are exactly
//! representable.

use super::random_forest::RandomForestClassifier;
use super::tree::TreeNode;
use crate::io::{Model, ModelMetadata};
use crate::manifest::{GraphManifest, IoSpec, NodeSpec, OpKind, DEFAULT_OPSET};
use crate::{Error, Result, Tensor};
use serde_json::json;

const NODE_NAME: &str = "tree_ensemble";

impl RandomForestClassifier {
    /// Flatten the fitted ensemble into an exportable model
    ///
    /// The split condition is `x[feature] <= threshold`; the true branch is
    /// the left child.
    pub fn to_model(&self, name: &str) -> Result<Model> {
        if self.trees().is_empty() {
            return Err(Error::InvalidParameter(
                "forest has not been fitted".to_string(),
            ));
        }

        let n_classes = self.n_classes();
        let mut tree_ids = Vec::new();
        let mut node_ids = Vec::new();
        let mut feature_ids = Vec::new();
        let mut thresholds = Vec::new();
        let mut true_ids = Vec::new();
        let mut false_ids = Vec::new();
        let mut is_leaf = Vec::new();
        let mut class_weights = Vec::new();

        for (t, tree) in self.trees().iter().enumerate() {
            for (n, node) in tree.nodes().iter().enumerate() {
                tree_ids.push(t as f32);
                node_ids.push(n as f32);
                match node {
                    TreeNode::Split {
                        feature,
                        threshold,
                        left,
                        right,
                    } => {
                        feature_ids.push(*feature as f32);
                        thresholds.push(*threshold);
                        true_ids.push(*left as f32);
                        false_ids.push(*right as f32);
                        is_leaf.push(0.0);
                        class_weights.extend(std::iter::repeat(0.0).take(n_classes));
                    }
                    TreeNode::Leaf { distribution } => {
                        feature_ids.push(0.0);
                        thresholds.push(0.0);
                        true_ids.push(0.0);
                        false_ids.push(0.0);
                        is_leaf.push(1.0);
                        class_weights.extend(distribution.iter().copied());
                    }
                }
            }
        }

        let n_nodes = tree_ids.len();
        let parameters = vec![
            param("nodes_treeids", tree_ids)?,
            param("nodes_nodeids", node_ids)?,
            param("nodes_featureids", feature_ids)?,
            param("nodes_values", thresholds)?,
            param("nodes_truenodeids", true_ids)?,
            param("nodes_falsenodeids", false_ids)?,
            param("nodes_is_leaf", is_leaf)?,
            (
                format!("{NODE_NAME}.nodes_class_weights"),
                Tensor::from_vec(class_weights, vec![n_nodes, n_classes])?,
            ),
        ];

        let manifest = GraphManifest::new(DEFAULT_OPSET)
            .with_input(IoSpec::batched("float_input", &[self.n_features()]))
            .with_output(IoSpec::batched("label", &[]))
            .with_output(IoSpec::batched("probabilities", &[n_classes]))
            .with_node(NodeSpec::new(
                NODE_NAME,
                OpKind::TreeEnsembleClassifier,
                json!({
                    "n_trees": self.n_estimators(),
                    "max_depth": self.max_depth(),
                    "n_features": self.n_features(),
                    "n_classes": n_classes,
                    "n_nodes": n_nodes,
                    "post_transform": "none",
                }),
            ));

        let metadata = ModelMetadata::new(name, "random_forest");

        Ok(Model::new(metadata, manifest, parameters))
    }
}

fn param(suffix: &str, values: Vec<f32>) -> Result<(String, Tensor)> {
    let len = values.len();
    Ok((
        format!("{NODE_NAME}.{suffix}"),
        Tensor::from_vec(values, vec![len])?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;

    fn fitted_forest() -> RandomForestClassifier {
        let x = arr2(&[
            [0.0, 0.0],
            [0.1, 0.2],
            [1.0, 1.0],
            [0.9, 1.1],
        ]);
        let y = vec![0, 0, 1, 1];
        let mut forest = RandomForestClassifier::new(3, 4, 42);
        forest.fit(&x, &y).unwrap();
        forest
    }

    #[test]
    fn test_unfitted_rejected() {
        let forest = RandomForestClassifier::new(3, 4, 42);
        assert!(forest.to_model("f").is_err());
    }

    #[test]
    fn test_parallel_arrays_consistent() {
        let forest = fitted_forest();
        let model = forest.to_model("test_forest").unwrap();

        let total_nodes: usize = forest.trees().iter().map(|t| t.node_count()).sum();
        let tree_ids = model.get_parameter("tree_ensemble.nodes_treeids").unwrap();
        assert_eq!(tree_ids.shape(), &[total_nodes]);

        for suffix in [
            "nodes_nodeids",
            "nodes_featureids",
            "nodes_values",
            "nodes_truenodeids",
            "nodes_falsenodeids",
            "nodes_is_leaf",
        ] {
            let t = model
                .get_parameter(&format!("tree_ensemble.{suffix}"))
                .unwrap();
            assert_eq!(t.shape(), &[total_nodes]);
        }

        let weights = model
            .get_parameter("tree_ensemble.nodes_class_weights")
            .unwrap();
        assert_eq!(weights.shape(), &[total_nodes, forest.n_classes()]);
    }

    #[test]
    fn test_leaf_rows_carry_distributions() {
        let forest = fitted_forest();
        let model = forest.to_model("test_forest").unwrap();

        let is_leaf = model.get_parameter("tree_ensemble.nodes_is_leaf").unwrap();
        let weights = model
            .get_parameter("tree_ensemble.nodes_class_weights")
            .unwrap();
        let n_classes = forest.n_classes();

        for (n, &flag) in is_leaf.data().iter().enumerate() {
            let row: f32 = (0..n_classes)
                .map(|c| weights.data()[n * n_classes + c])
                .sum();
            if flag == 1.0 {
                assert!((row - 1.0).abs() < 1e-5, "leaf row must sum to 1, got {row}");
            } else {
                assert_eq!(row, 0.0);
            }
        }
    }

    #[test]
    fn test_manifest_signatures() {
        let forest = fitted_forest();
        let model = forest.to_model("test_forest").unwrap();

        assert_eq!(model.metadata.architecture, "random_forest");
        assert_eq!(model.manifest.inputs.len(), 1);
        assert_eq!(model.manifest.inputs[0].name, "float_input");
        assert_eq!(model.manifest.inputs[0].dims, vec![None, Some(2)]);
        assert_eq!(model.manifest.outputs.len(), 2);
        assert_eq!(model.manifest.outputs[1].name, "probabilities");
        assert_eq!(model.manifest.outputs[1].dims, vec![None, Some(2)]);

        let node = &model.manifest.nodes[0];
        assert_eq!(node.op, OpKind::TreeEnsembleClassifier);
        assert_eq!(node.attrs["n_trees"], json!(3));
        model.validate().unwrap();
    }
}
