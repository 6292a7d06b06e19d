//! Artifact verification
//!
//! The acceptance checks a fixture must pass before the downstream demo
//! tool will accept it: the file exists and is non-empty, parses under its
//! format's own schema checker, carries a manifest whose opset and
//! signatures validate, and declares parameter tensors whose shapes agree
//! with the manifest's node attributes. The report also carries the
//! artifact digest the external verifier binds proofs to.

use crate::io::{load_model, Model, ModelFormat};
use crate::manifest::{IoSpec, NodeSpec, OpKind};
use crate::{Error, Result};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Verification report for one artifact
#[derive(Debug, Clone)]
pub struct ArtifactReport {
    /// Artifact path
    pub path: PathBuf,
    /// File size in bytes
    pub size_bytes: u64,
    /// Detected format
    pub format: ModelFormat,
    /// `sha256-` prefixed hex digest over the raw bytes
    pub digest: String,
    /// Model name from metadata
    pub name: String,
    /// Architecture from metadata
    pub architecture: String,
    /// Number of parameter tensors
    pub tensor_count: usize,
    /// Total scalar parameter count
    pub param_count: u64,
    /// Operator-set version
    pub opset: u32,
    /// Declared inputs
    pub inputs: Vec<IoSpec>,
    /// Declared outputs
    pub outputs: Vec<IoSpec>,
    /// Checks that passed, in order
    pub checks: Vec<String>,
}

/// Verify an artifact on disk
pub fn verify_artifact(path: impl AsRef<Path>) -> Result<ArtifactReport> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(Error::ArtifactNotFound {
            path: path.to_path_buf(),
        });
    }
    let size_bytes = std::fs::metadata(path)?.len();
    if size_bytes == 0 {
        return Err(Error::VerificationFailed("artifact is empty".to_string()));
    }

    let format = path
        .extension()
        .and_then(|s| s.to_str())
        .and_then(ModelFormat::from_extension)
        .ok_or_else(|| {
            Error::VerificationFailed(format!("unrecognized extension: {}", path.display()))
        })?;

    let mut checks = vec!["file exists and is non-empty".to_string()];

    let bytes = std::fs::read(path)?;
    let digest = sha256_digest(&bytes);

    let model = load_model(path)?;
    checks.push(format!("parses as {format}"));

    if model.manifest.nodes.is_empty() {
        return Err(Error::VerificationFailed(
            "manifest declares no nodes".to_string(),
        ));
    }
    if model.manifest.inputs.is_empty() || model.manifest.outputs.is_empty() {
        return Err(Error::VerificationFailed(
            "manifest is missing input or output signatures".to_string(),
        ));
    }
    model.validate()?;
    checks.push(format!("opset {} within supported range", model.manifest.opset));
    checks.push("declared I/O signatures well-formed".to_string());

    for node in &model.manifest.nodes {
        check_node_parameters(&model, node)?;
    }
    checks.push("parameter shapes agree with manifest".to_string());

    Ok(ArtifactReport {
        path: path.to_path_buf(),
        size_bytes,
        format,
        digest,
        name: model.metadata.name.clone(),
        architecture: model.metadata.architecture.clone(),
        tensor_count: model.tensor_count(),
        param_count: model.param_count(),
        opset: model.manifest.opset,
        inputs: model.manifest.inputs.clone(),
        outputs: model.manifest.outputs.clone(),
        checks,
    })
}

fn sha256_digest(bytes: &[u8]) -> String {
    let hash = Sha256::digest(bytes);
    let hex: String = hash.iter().map(|b| format!("{b:02x}")).collect();
    format!("sha256-{hex}")
}

/// Check every parameter a node declares exists with the declared shape
fn check_node_parameters(model: &Model, node: &NodeSpec) -> Result<()> {
    for (suffix, shape) in expected_parameters(node)? {
        let name = format!("{}.{}", node.name, suffix);
        let tensor = model.get_parameter(&name).ok_or_else(|| {
            Error::VerificationFailed(format!("missing parameter tensor '{name}'"))
        })?;
        if tensor.shape() != shape.as_slice() {
            return Err(Error::VerificationFailed(format!(
                "parameter '{}' has shape {:?}, manifest declares {:?}",
                name,
                tensor.shape(),
                shape
            )));
        }
    }
    Ok(())
}

/// Parameter suffixes and shapes implied by a node's attributes
fn expected_parameters(node: &NodeSpec) -> Result<Vec<(&'static str, Vec<usize>)>> {
    let dim = |key: &str| -> Result<usize> {
        node.attrs[key].as_u64().map(|v| v as usize).ok_or_else(|| {
            Error::VerificationFailed(format!(
                "node '{}' ({}) is missing attribute '{}'",
                node.name, node.op, key
            ))
        })
    };
    let dims2 = |key: &str| -> Result<(usize, usize)> {
        let pair = node.attrs[key].as_array().and_then(|a| {
            match (a.first().and_then(|v| v.as_u64()), a.get(1).and_then(|v| v.as_u64())) {
                (Some(x), Some(y)) => Some((x as usize, y as usize)),
                _ => None,
            }
        });
        pair.ok_or_else(|| {
            Error::VerificationFailed(format!(
                "node '{}' ({}) is missing attribute '{}'",
                node.name, node.op, key
            ))
        })
    };

    Ok(match node.op {
        OpKind::Linear => {
            let (inf, outf) = (dim("in_features")?, dim("out_features")?);
            vec![("weight", vec![outf, inf]), ("bias", vec![outf])]
        }
        OpKind::Conv2d => {
            let (in_c, out_c) = (dim("in_channels")?, dim("out_channels")?);
            let groups = dim("groups")?;
            let (kh, kw) = dims2("kernel")?;
            if groups == 0 || in_c % groups != 0 {
                return Err(Error::VerificationFailed(format!(
                    "node '{}': invalid groups {groups} for {in_c} input channels",
                    node.name
                )));
            }
            vec![
                ("weight", vec![out_c, in_c / groups, kh, kw]),
                ("bias", vec![out_c]),
            ]
        }
        OpKind::BatchNorm2d => {
            let c = dim("num_features")?;
            vec![
                ("gamma", vec![c]),
                ("beta", vec![c]),
                ("running_mean", vec![c]),
                ("running_var", vec![c]),
            ]
        }
        OpKind::TreeEnsembleClassifier => {
            let (n_nodes, n_classes) = (dim("n_nodes")?, dim("n_classes")?);
            vec![
                ("nodes_treeids", vec![n_nodes]),
                ("nodes_nodeids", vec![n_nodes]),
                ("nodes_featureids", vec![n_nodes]),
                ("nodes_values", vec![n_nodes]),
                ("nodes_truenodeids", vec![n_nodes]),
                ("nodes_falsenodeids", vec![n_nodes]),
                ("nodes_is_leaf", vec![n_nodes]),
                ("nodes_class_weights", vec![n_nodes, n_classes]),
            ]
        }
        OpKind::Relu
        | OpKind::Softmax
        | OpKind::Flatten
        | OpKind::MaxPool2d
        | OpKind::AvgPool2d
        | OpKind::GlobalAvgPool2d => Vec::new(),
    })
}
