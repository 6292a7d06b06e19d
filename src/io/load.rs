//! Model loading functionality

use super::format::ModelFormat;
use super::model::{Model, ModelMetadata, ModelState};
use crate::manifest::{GraphManifest, DEFAULT_OPSET};
use crate::{Error, Result, Tensor};
use std::collections::HashMap;
use std::path::Path;

/// Load a model from a file
///
/// The format is automatically detected from the file extension.
pub fn load_model(path: impl AsRef<Path>) -> Result<Model> {
    let path = path.as_ref();

    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .ok_or_else(|| Error::Serialization("File has no extension".to_string()))?;

    let format = ModelFormat::from_extension(ext)
        .ok_or_else(|| Error::Serialization(format!("Unsupported file extension: {ext}")))?;

    // Handle SafeTensors separately (binary format)
    if format == ModelFormat::SafeTensors {
        return load_safetensors(path);
    }

    let content = std::fs::read_to_string(path)?;

    let state: ModelState = match format {
        ModelFormat::Json => serde_json::from_str(&content)
            .map_err(|e| Error::Serialization(format!("JSON deserialization failed: {e}")))?,
        ModelFormat::Yaml => serde_yaml::from_str(&content)
            .map_err(|e| Error::Serialization(format!("YAML deserialization failed: {e}")))?,
        ModelFormat::SafeTensors => unreachable!(), // Handled above
    };

    Model::from_state(state)
}

/// Load model from SafeTensors format
fn load_safetensors(path: &Path) -> Result<Model> {
    let data =
        std::fs::read(path).map_err(|e| Error::Serialization(format!("Failed to read file: {e}")))?;

    // Parse header metadata first
    let (_, st_metadata) = safetensors::SafeTensors::read_metadata(&data)
        .map_err(|e| Error::Serialization(format!("SafeTensors parsing failed: {e}")))?;

    let header = st_metadata.metadata().clone().unwrap_or_default();
    let name = header
        .get("name")
        .cloned()
        .unwrap_or_else(|| "unknown".to_string());
    let architecture = header
        .get("architecture")
        .cloned()
        .unwrap_or_else(|| "unknown".to_string());
    let opset = header
        .get("opset")
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_OPSET);

    // The manifest is optional on load; verification decides how strict to be
    let manifest = match header.get("graph") {
        Some(json) => GraphManifest::from_json(json)?,
        None => GraphManifest::new(opset),
    };

    let custom: HashMap<String, serde_json::Value> = match header.get("custom") {
        Some(json) => serde_json::from_str(json)
            .map_err(|e| Error::Serialization(format!("custom metadata parsing failed: {e}")))?,
        None => HashMap::new(),
    };

    let mut metadata = ModelMetadata::new(name, architecture).with_opset(opset);
    metadata.custom = custom;
    if let Some(version) = header.get("version") {
        metadata.version = version.clone();
    }

    let safetensors = safetensors::SafeTensors::deserialize(&data)
        .map_err(|e| Error::Serialization(format!("SafeTensors parsing failed: {e}")))?;

    // Restore shaped tensors; sort by name for a deterministic order
    let mut names = safetensors.names();
    names.sort_unstable();
    let mut parameters = Vec::with_capacity(names.len());
    for tensor_name in names {
        let view = safetensors
            .tensor(tensor_name)
            .map_err(|e| Error::Serialization(format!("tensor '{tensor_name}' missing: {e}")))?;
        let values: &[f32] = bytemuck::cast_slice(view.data());
        let tensor = Tensor::from_vec(values.to_vec(), view.shape().to_vec())?;
        parameters.push((tensor_name.to_string(), tensor));
    }

    Ok(Model::new(metadata, manifest, parameters))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{save_model, ModelFormat, SaveConfig};
    use crate::manifest::{IoSpec, NodeSpec, OpKind};
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn sample_model() -> Model {
        let params = vec![
            (
                "linear1.weight".to_string(),
                Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0], vec![2, 2]).unwrap(),
            ),
            ("linear1.bias".to_string(), Tensor::vector(vec![0.5, 0.6])),
        ];
        let manifest = GraphManifest::new(11)
            .with_input(IoSpec::batched("input", &[2]))
            .with_output(IoSpec::batched("output", &[2]))
            .with_node(NodeSpec::new(
                "linear1",
                OpKind::Linear,
                json!({"in_features": 2, "out_features": 2}),
            ));
        Model::new(
            ModelMetadata::new("load-test", "mlp").with_opset(11),
            manifest,
            params,
        )
    }

    fn round_trip(format: ModelFormat) -> Model {
        let original = sample_model();
        let temp_file = NamedTempFile::new().unwrap();
        let temp_path = temp_file.path().with_extension(format.extension());

        save_model(&original, &temp_path, &SaveConfig::new(format)).unwrap();
        let loaded = load_model(&temp_path).unwrap();
        std::fs::remove_file(temp_path).ok();
        loaded
    }

    #[test]
    fn test_round_trip_json() {
        let loaded = round_trip(ModelFormat::Json);
        assert_eq!(loaded.metadata.name, "load-test");
        assert_eq!(loaded.metadata.opset, 11);
        assert_eq!(loaded.get_parameter("linear1.weight").unwrap().shape(), &[2, 2]);
    }

    #[test]
    fn test_round_trip_yaml() {
        let loaded = round_trip(ModelFormat::Yaml);
        assert_eq!(loaded.metadata.name, "load-test");
        assert_eq!(loaded.manifest.nodes.len(), 1);
    }

    #[test]
    fn test_round_trip_safetensors() {
        let original = sample_model();
        let loaded = round_trip(ModelFormat::SafeTensors);

        assert_eq!(loaded.metadata.name, original.metadata.name);
        assert_eq!(loaded.metadata.architecture, original.metadata.architecture);
        assert_eq!(loaded.metadata.opset, 11);
        assert_eq!(loaded.manifest, original.manifest);
        assert_eq!(loaded.tensor_count(), original.tensor_count());

        for (name, tensor) in &original.parameters {
            let restored = loaded.get_parameter(name).unwrap();
            assert_eq!(restored.shape(), tensor.shape());
            assert_eq!(restored.data(), tensor.data());
        }
    }

    #[test]
    fn test_load_unsupported_extension() {
        let temp_file = NamedTempFile::new().unwrap();
        let temp_path = temp_file.path().with_extension("bin");
        assert!(load_model(&temp_path).is_err());
    }

    #[test]
    fn test_load_no_extension() {
        let result = load_model("model_without_extension");
        assert!(result.is_err());
        if let Err(err) = result {
            assert!(err.to_string().contains("no extension"));
        }
    }

    #[test]
    fn test_load_file_not_found() {
        assert!(load_model("nonexistent.json").is_err());
        assert!(load_model("nonexistent.safetensors").is_err());
    }

    #[test]
    fn test_load_invalid_json() {
        let temp_file = NamedTempFile::new().unwrap();
        let temp_path = temp_file.path().with_extension("json");

        let mut f = std::fs::File::create(&temp_path).unwrap();
        f.write_all(b"{ invalid json }").unwrap();
        drop(f);

        assert!(load_model(&temp_path).is_err());
        std::fs::remove_file(temp_path).ok();
    }

    #[test]
    fn test_load_invalid_safetensors() {
        let temp_file = NamedTempFile::new().unwrap();
        let temp_path = temp_file.path().with_extension("safetensors");

        let mut f = std::fs::File::create(&temp_path).unwrap();
        f.write_all(b"not valid safetensors binary data").unwrap();
        drop(f);

        assert!(load_model(&temp_path).is_err());
        std::fs::remove_file(temp_path).ok();
    }

    #[test]
    fn test_load_safetensors_custom_metadata() {
        let original = sample_model().with_custom("feature_names", json!(["a", "b"]));
        let temp_file = NamedTempFile::new().unwrap();
        let temp_path = temp_file.path().with_extension("safetensors");

        save_model(&original, &temp_path, &SaveConfig::default()).unwrap();
        let loaded = load_model(&temp_path).unwrap();
        assert_eq!(
            loaded.metadata.custom.get("feature_names").unwrap(),
            &json!(["a", "b"])
        );
        std::fs::remove_file(temp_path).ok();
    }
}
