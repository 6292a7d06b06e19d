//! Graph manifest embedded in exported artifacts
//!
//! An artifact carries two halves: the parameter tensors, and a manifest
//! describing topology — an ordered node list with operator kinds and
//! attributes, plus the declared input/output signatures. The manifest is
//! stored as JSON under the `graph` key of the artifact's header metadata so
//! a consuming runtime can reconstruct the network without this crate.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Operator-set version written when a fixture does not pin one
pub const DEFAULT_OPSET: u32 = 12;

/// Oldest operator-set version consumers are expected to support
pub const MIN_SUPPORTED_OPSET: u32 = 11;

/// Newest operator-set version this crate can emit
pub const MAX_SUPPORTED_OPSET: u32 = DEFAULT_OPSET;

/// Operator vocabulary of the manifest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpKind {
    Linear,
    Relu,
    Softmax,
    Flatten,
    Conv2d,
    BatchNorm2d,
    MaxPool2d,
    AvgPool2d,
    GlobalAvgPool2d,
    TreeEnsembleClassifier,
}

impl OpKind {
    /// Operator-set version that introduced this operator
    ///
    /// Global average pooling arrived in opset 12; everything else is
    /// available from the minimum supported version.
    pub fn min_opset(&self) -> u32 {
        match self {
            OpKind::GlobalAvgPool2d => 12,
            _ => MIN_SUPPORTED_OPSET,
        }
    }

    /// Manifest name of this operator
    pub fn as_str(&self) -> &'static str {
        match self {
            OpKind::Linear => "linear",
            OpKind::Relu => "relu",
            OpKind::Softmax => "softmax",
            OpKind::Flatten => "flatten",
            OpKind::Conv2d => "conv2d",
            OpKind::BatchNorm2d => "batch_norm2d",
            OpKind::MaxPool2d => "max_pool2d",
            OpKind::AvgPool2d => "avg_pool2d",
            OpKind::GlobalAvgPool2d => "global_avg_pool2d",
            OpKind::TreeEnsembleClassifier => "tree_ensemble_classifier",
        }
    }
}

impl std::fmt::Display for OpKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One node of the graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSpec {
    /// Node name; parameter tensors are prefixed with it (`conv2d1.weight`)
    pub name: String,

    /// Operator kind
    pub op: OpKind,

    /// Operator attributes (kernel sizes, strides, feature counts, ...)
    #[serde(default)]
    pub attrs: serde_json::Value,
}

impl NodeSpec {
    /// Create a node spec
    pub fn new(name: impl Into<String>, op: OpKind, attrs: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            op,
            attrs,
        }
    }
}

/// Declared model input or output
///
/// `None` marks a dynamic dimension; the fixtures use it for the leading
/// batch axis, matching the dynamic batch the consumers expect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IoSpec {
    /// Signature name (`input`, `output`, `float_input`, ...)
    pub name: String,

    /// Dimensions; `null` in JSON for a dynamic axis
    pub dims: Vec<Option<usize>>,
}

impl IoSpec {
    /// Signature with a dynamic leading batch axis followed by static dims
    pub fn batched(name: impl Into<String>, dims: &[usize]) -> Self {
        let mut all = vec![None];
        all.extend(dims.iter().map(|&d| Some(d)));
        Self {
            name: name.into(),
            dims: all,
        }
    }

    /// Fully static signature
    pub fn fixed(name: impl Into<String>, dims: &[usize]) -> Self {
        Self {
            name: name.into(),
            dims: dims.iter().map(|&d| Some(d)).collect(),
        }
    }

    /// Check the signature is well-formed: at most one dynamic axis, and it
    /// must lead; static dims must be non-zero.
    pub fn validate(&self) -> Result<()> {
        for (i, dim) in self.dims.iter().enumerate() {
            match dim {
                None if i != 0 => {
                    return Err(Error::InvalidParameter(format!(
                        "signature '{}': dynamic axis only allowed in leading position",
                        self.name
                    )));
                }
                Some(0) => {
                    return Err(Error::InvalidParameter(format!(
                        "signature '{}': zero-sized dimension",
                        self.name
                    )));
                }
                _ => {}
            }
        }
        Ok(())
    }
}

/// Topology manifest of an exported model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphManifest {
    /// Operator-set version of the artifact
    pub opset: u32,

    /// Declared model inputs
    pub inputs: Vec<IoSpec>,

    /// Declared model outputs
    pub outputs: Vec<IoSpec>,

    /// Ordered node list
    pub nodes: Vec<NodeSpec>,
}

impl GraphManifest {
    /// Create an empty manifest at the given opset
    pub fn new(opset: u32) -> Self {
        Self {
            opset,
            inputs: Vec::new(),
            outputs: Vec::new(),
            nodes: Vec::new(),
        }
    }

    /// Add a model input
    pub fn with_input(mut self, input: IoSpec) -> Self {
        self.inputs.push(input);
        self
    }

    /// Add a model output
    pub fn with_output(mut self, output: IoSpec) -> Self {
        self.outputs.push(output);
        self
    }

    /// Add a single node
    pub fn with_node(mut self, node: NodeSpec) -> Self {
        self.nodes.push(node);
        self
    }

    /// Add a list of nodes
    pub fn with_nodes(mut self, nodes: impl IntoIterator<Item = NodeSpec>) -> Self {
        self.nodes.extend(nodes);
        self
    }

    /// Validate the opset against the supported range and every node's
    /// minimum, and check the I/O signatures are well-formed
    pub fn validate(&self) -> Result<()> {
        if self.opset < MIN_SUPPORTED_OPSET || self.opset > MAX_SUPPORTED_OPSET {
            return Err(Error::UnsupportedOpset {
                opset: self.opset,
                reason: format!(
                    "supported range is {MIN_SUPPORTED_OPSET}..={MAX_SUPPORTED_OPSET}"
                ),
            });
        }

        for node in &self.nodes {
            if node.op.min_opset() > self.opset {
                return Err(Error::UnsupportedOpset {
                    opset: self.opset,
                    reason: format!(
                        "operator '{}' (node '{}') requires opset {}",
                        node.op,
                        node.name,
                        node.op.min_opset()
                    ),
                });
            }
        }

        for spec in self.inputs.iter().chain(self.outputs.iter()) {
            spec.validate()?;
        }

        Ok(())
    }

    /// Serialize to the JSON string embedded in artifact metadata
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| Error::Serialization(format!("manifest serialization failed: {e}")))
    }

    /// Parse a manifest from artifact metadata
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| Error::Serialization(format!("manifest parsing failed: {e}")))
    }
}
