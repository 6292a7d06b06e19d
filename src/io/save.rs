//! Model saving functionality

use super::format::{ModelFormat, SaveConfig};
use super::model::Model;
use crate::{Error, Result};
use safetensors::tensor::{Dtype, TensorView};
use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Save a model to a file
///
/// # Arguments
///
/// * `model` - The model to save
/// * `path` - Output file path
/// * `config` - Save configuration (format, options)
pub fn save_model(model: &Model, path: impl AsRef<Path>, config: &SaveConfig) -> Result<()> {
    let path = path.as_ref();

    match config.format {
        ModelFormat::SafeTensors => {
            // SafeTensors is binary format - handle separately
            return save_safetensors(model, path);
        }
        ModelFormat::Json => {
            let state = model.to_state();
            let data = if config.pretty {
                serde_json::to_string_pretty(&state)
                    .map_err(|e| Error::Serialization(format!("JSON serialization failed: {e}")))?
            } else {
                serde_json::to_string(&state)
                    .map_err(|e| Error::Serialization(format!("JSON serialization failed: {e}")))?
            };
            let mut file = File::create(path)?;
            file.write_all(data.as_bytes())?;
        }
        ModelFormat::Yaml => {
            let state = model.to_state();
            let data = serde_yaml::to_string(&state)
                .map_err(|e| Error::Serialization(format!("YAML serialization failed: {e}")))?;
            let mut file = File::create(path)?;
            file.write_all(data.as_bytes())?;
        }
    }

    Ok(())
}

/// Save model in SafeTensors format with the graph manifest embedded in the
/// header metadata
fn save_safetensors(model: &Model, path: &Path) -> Result<()> {
    // Collect tensor data with proper lifetime management
    let tensor_data: Vec<(String, Vec<u8>, Vec<usize>)> = model
        .parameters
        .iter()
        .map(|(name, tensor)| {
            let data = tensor.data();
            let bytes: Vec<u8> = bytemuck::cast_slice(data.as_slice().unwrap()).to_vec();
            (name.clone(), bytes, tensor.shape().to_vec())
        })
        .collect();

    // Create TensorViews from collected data
    let views: Vec<(&str, TensorView<'_>)> = tensor_data
        .iter()
        .map(|(name, bytes, shape)| {
            let view = TensorView::new(Dtype::F32, shape.clone(), bytes).unwrap();
            (name.as_str(), view)
        })
        .collect();

    // Header metadata: model identity, opset, and the JSON graph manifest
    let mut metadata = HashMap::new();
    metadata.insert("name".to_string(), model.metadata.name.clone());
    metadata.insert(
        "architecture".to_string(),
        model.metadata.architecture.clone(),
    );
    metadata.insert("version".to_string(), model.metadata.version.clone());
    metadata.insert("opset".to_string(), model.metadata.opset.to_string());
    metadata.insert("graph".to_string(), model.manifest.to_json()?);
    if !model.metadata.custom.is_empty() {
        let custom = serde_json::to_string(&model.metadata.custom)
            .map_err(|e| Error::Serialization(format!("custom metadata failed: {e}")))?;
        metadata.insert("custom".to_string(), custom);
    }

    let safetensor_bytes = safetensors::serialize(views, Some(metadata))
        .map_err(|e| Error::Serialization(format!("SafeTensors serialization failed: {e}")))?;

    std::fs::write(path, safetensor_bytes)?;

    Ok(())
}
