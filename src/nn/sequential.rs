//! Ordered layer stack

use super::Layer;
use crate::manifest::NodeSpec;
use crate::{Result, Tensor};
use std::collections::HashMap;

/// Ordered list of layers; the only composition the fixtures need
///
/// Node names are assigned per operator stem in declaration order
/// (`conv2d1`, `relu1`, `conv2d2`, ...), and parameter tensors inherit them
/// as prefixes.
#[derive(Default)]
pub struct Sequential {
    layers: Vec<Box<dyn Layer>>,
}

impl Sequential {
    /// Create an empty stack
    pub fn new() -> Self {
        Self { layers: Vec::new() }
    }

    /// Append a layer
    pub fn add(mut self, layer: impl Layer + 'static) -> Self {
        self.layers.push(Box::new(layer));
        self
    }

    /// Number of layers
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Forward pass through every layer
    pub fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let mut current = x.clone();
        for layer in &self.layers {
            current = layer.forward(&current)?;
        }
        Ok(current)
    }

    /// Thread shape inference through the stack, returning every layer's
    /// output shape
    ///
    /// Fails on the first pair of adjacent layers with incompatible shapes,
    /// which is the structural invariant a stack must satisfy before export.
    pub fn infer_shapes(&self, input: &[usize]) -> Result<Vec<Vec<usize>>> {
        let mut shapes = Vec::with_capacity(self.layers.len());
        let mut current = input.to_vec();
        for layer in &self.layers {
            current = layer.output_shape(&current)?;
            shapes.push(current.clone());
        }
        Ok(shapes)
    }

    /// Final output shape for the given input shape
    pub fn output_shape(&self, input: &[usize]) -> Result<Vec<usize>> {
        Ok(self
            .infer_shapes(input)?
            .pop()
            .unwrap_or_else(|| input.to_vec()))
    }

    /// Layers paired with their assigned node names
    pub fn named_layers(&self) -> Vec<(String, &dyn Layer)> {
        let mut counts: HashMap<&'static str, usize> = HashMap::new();
        self.layers
            .iter()
            .map(|layer| {
                let count = counts.entry(layer.name_hint()).or_insert(0);
                *count += 1;
                (format!("{}{}", layer.name_hint(), count), layer.as_ref())
            })
            .collect()
    }

    /// All parameter tensors, named `<node>.<param>`
    pub fn parameters(&self) -> Vec<(String, Tensor)> {
        self.named_layers()
            .iter()
            .flat_map(|(name, layer)| layer.parameters(name))
            .collect()
    }

    /// Manifest nodes in stack order
    pub fn manifest_nodes(&self) -> Vec<NodeSpec> {
        self.named_layers()
            .iter()
            .map(|(name, layer)| NodeSpec::new(name.clone(), layer.op_kind(), layer.attrs()))
            .collect()
    }
}
