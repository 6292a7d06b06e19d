//! Model structure for serialization

use crate::manifest::{GraphManifest, DEFAULT_OPSET};
use crate::{Error, Result, Tensor};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Model metadata carried in every artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Model name/identifier
    pub name: String,

    /// Model architecture type (e.g., "mlp", "cnn", "random_forest")
    pub architecture: String,

    /// Producer version
    pub version: String,

    /// Operator-set version of the artifact
    pub opset: u32,

    /// Custom metadata fields (feature names, class labels, ...)
    pub custom: HashMap<String, serde_json::Value>,
}

impl ModelMetadata {
    /// Create new metadata with minimal fields
    pub fn new(name: impl Into<String>, architecture: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            architecture: architecture.into(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            opset: DEFAULT_OPSET,
            custom: HashMap::new(),
        }
    }

    /// Pin the operator-set version
    pub fn with_opset(mut self, opset: u32) -> Self {
        self.opset = opset;
        self
    }

    /// Add custom metadata field
    pub fn with_custom(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.custom.insert(key.into(), value);
        self
    }
}

/// Information about a model parameter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterInfo {
    /// Parameter name (e.g., "conv2d1.weight")
    pub name: String,

    /// Parameter shape
    pub shape: Vec<usize>,

    /// Data type (always "f32" for the fixtures)
    pub dtype: String,
}

/// Serializable model state (text formats)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelState {
    /// Model metadata
    pub metadata: ModelMetadata,

    /// Graph manifest
    pub manifest: GraphManifest,

    /// Parameter information
    pub parameters: Vec<ParameterInfo>,

    /// Flattened parameter data
    pub data: Vec<f32>,
}

/// High-level model abstraction for I/O
pub struct Model {
    /// Model metadata
    pub metadata: ModelMetadata,

    /// Graph manifest
    pub manifest: GraphManifest,

    /// Model parameters
    pub parameters: Vec<(String, Tensor)>,
}

impl Model {
    /// Create a new model
    pub fn new(
        metadata: ModelMetadata,
        manifest: GraphManifest,
        parameters: Vec<(String, Tensor)>,
    ) -> Self {
        Self {
            metadata,
            manifest,
            parameters,
        }
    }

    /// Add a custom metadata field
    pub fn with_custom(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.custom.insert(key.into(), value);
        self
    }

    /// Get parameter by name
    pub fn get_parameter(&self, name: &str) -> Option<&Tensor> {
        self.parameters
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, t)| t)
    }

    /// Number of parameter tensors
    pub fn tensor_count(&self) -> usize {
        self.parameters.len()
    }

    /// Total scalar parameter count
    pub fn param_count(&self) -> u64 {
        self.parameters.iter().map(|(_, t)| t.len() as u64).sum()
    }

    /// Check the model is internally consistent: the manifest validates and
    /// the metadata opset agrees with it
    pub fn validate(&self) -> Result<()> {
        self.manifest.validate()?;
        if self.metadata.opset != self.manifest.opset {
            return Err(Error::UnsupportedOpset {
                opset: self.metadata.opset,
                reason: format!(
                    "metadata opset disagrees with manifest opset {}",
                    self.manifest.opset
                ),
            });
        }
        Ok(())
    }

    /// Convert model to serializable state
    pub fn to_state(&self) -> ModelState {
        let mut data = Vec::new();
        let parameters: Vec<ParameterInfo> = self
            .parameters
            .iter()
            .map(|(name, tensor)| {
                data.extend(tensor.data().iter().copied());
                ParameterInfo {
                    name: name.clone(),
                    shape: tensor.shape().to_vec(),
                    dtype: "f32".to_string(),
                }
            })
            .collect();

        ModelState {
            metadata: self.metadata.clone(),
            manifest: self.manifest.clone(),
            parameters,
            data,
        }
    }

    /// Create model from serializable state
    pub fn from_state(state: ModelState) -> Result<Self> {
        let mut offset: usize = 0;
        let mut parameters = Vec::with_capacity(state.parameters.len());
        for info in state.parameters {
            let size: usize = info.shape.iter().product();
            let end = offset
                .checked_add(size)
                .filter(|&end| end <= state.data.len())
                .ok_or_else(|| {
                    Error::Serialization(format!(
                        "parameter '{}' data out of bounds",
                        info.name
                    ))
                })?;
            let tensor = Tensor::from_vec(state.data[offset..end].to_vec(), info.shape)?;
            offset = end;
            parameters.push((info.name, tensor));
        }
        if offset != state.data.len() {
            return Err(Error::Serialization(format!(
                "trailing parameter data: {} of {} values consumed",
                offset,
                state.data.len()
            )));
        }

        Ok(Self {
            metadata: state.metadata,
            manifest: state.manifest,
            parameters,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::{GraphManifest, IoSpec, NodeSpec, OpKind};
    use serde_json::json;

    fn sample_manifest() -> GraphManifest {
        GraphManifest::new(12)
            .with_input(IoSpec::batched("input", &[2]))
            .with_output(IoSpec::batched("output", &[3]))
            .with_node(NodeSpec::new(
                "linear1",
                OpKind::Linear,
                json!({"in_features": 2, "out_features": 3}),
            ))
    }

    #[test]
    fn test_metadata_defaults() {
        let meta = ModelMetadata::new("test-model", "mlp");
        assert_eq!(meta.name, "test-model");
        assert_eq!(meta.architecture, "mlp");
        assert_eq!(meta.opset, DEFAULT_OPSET);
    }

    #[test]
    fn test_metadata_with_opset_and_custom() {
        let meta = ModelMetadata::new("test", "mlp")
            .with_opset(11)
            .with_custom("hidden", json!(8));
        assert_eq!(meta.opset, 11);
        assert_eq!(meta.custom.get("hidden").unwrap(), &json!(8));
    }

    #[test]
    fn test_parameter_access() {
        let params = vec![
            (
                "linear1.weight".to_string(),
                Tensor::from_vec(vec![1.0; 6], vec![3, 2]).unwrap(),
            ),
            ("linear1.bias".to_string(), Tensor::vector(vec![0.0; 3])),
        ];
        let model = Model::new(ModelMetadata::new("t", "mlp"), sample_manifest(), params);

        assert!(model.get_parameter("linear1.weight").is_some());
        assert!(model.get_parameter("missing").is_none());
        assert_eq!(model.tensor_count(), 2);
        assert_eq!(model.param_count(), 9);
    }

    #[test]
    fn test_state_round_trip_preserves_shapes() {
        let params = vec![
            (
                "linear1.weight".to_string(),
                Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], vec![3, 2]).unwrap(),
            ),
            ("linear1.bias".to_string(), Tensor::vector(vec![0.1, 0.2, 0.3])),
        ];
        let original = Model::new(ModelMetadata::new("t", "mlp"), sample_manifest(), params);

        let state = original.to_state();
        let restored = Model::from_state(state).unwrap();

        assert_eq!(restored.metadata.name, original.metadata.name);
        assert_eq!(restored.manifest, original.manifest);
        let weight = restored.get_parameter("linear1.weight").unwrap();
        assert_eq!(weight.shape(), &[3, 2]);
        assert_eq!(weight.data(), original.get_parameter("linear1.weight").unwrap().data());
    }

    #[test]
    fn test_from_state_rejects_truncated_data() {
        let params = vec![(
            "w".to_string(),
            Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0], vec![2, 2]).unwrap(),
        )];
        let model = Model::new(ModelMetadata::new("t", "mlp"), sample_manifest(), params);
        let mut state = model.to_state();
        state.data.truncate(2);
        assert!(Model::from_state(state).is_err());
    }

    #[test]
    fn test_from_state_rejects_trailing_data() {
        let params = vec![("w".to_string(), Tensor::vector(vec![1.0]))];
        let model = Model::new(ModelMetadata::new("t", "mlp"), sample_manifest(), params);
        let mut state = model.to_state();
        state.data.push(9.0);
        assert!(Model::from_state(state).is_err());
    }

    #[test]
    fn test_validate_opset_agreement() {
        let model = Model::new(
            ModelMetadata::new("t", "mlp").with_opset(11),
            sample_manifest(), // opset 12
            vec![],
        );
        assert!(model.validate().is_err());

        let model = Model::new(
            ModelMetadata::new("t", "mlp").with_opset(12),
            sample_manifest(),
            vec![],
        );
        assert!(model.validate().is_ok());
    }
}
