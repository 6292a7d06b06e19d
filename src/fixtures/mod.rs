//! The fixture builders
//!
//! Five deterministic models for the downstream demo/verification tool:
//! a trained fraud classifier, a backward-compatibility MLP, and three
//! vision networks. Builders take no input; every random draw is seeded,
//! so rebuilding produces byte-identical artifacts.

mod compat;
mod fraud;
mod vision;

pub use compat::build_compat_model;
pub use fraud::{build_fraud_model, fraud_training_data};
pub use vision::{build_simple_cnn, build_tiny_mobilenet, build_tiny_resnet};

use crate::io::Model;
use crate::manifest::{GraphManifest, IoSpec};
use crate::nn::Sequential;
use crate::{io::ModelMetadata, Result};

/// The five fixtures, in build order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fixture {
    Fraud,
    Compat,
    SimpleCnn,
    TinyResNet,
    TinyMobileNet,
}

impl Fixture {
    /// All fixtures in build order
    pub const ALL: [Fixture; 5] = [
        Fixture::Fraud,
        Fixture::Compat,
        Fixture::SimpleCnn,
        Fixture::TinyResNet,
        Fixture::TinyMobileNet,
    ];

    /// The vision subset
    pub const VISION: [Fixture; 3] =
        [Fixture::SimpleCnn, Fixture::TinyResNet, Fixture::TinyMobileNet];

    /// Fixed artifact base name (extension appended per format)
    pub fn base_name(&self) -> &'static str {
        match self {
            Fixture::Fraud => "fraud_model",
            Fixture::Compat => "test_model_compatible",
            Fixture::SimpleCnn => "simple_cnn",
            Fixture::TinyResNet => "tiny_resnet",
            Fixture::TinyMobileNet => "tiny_mobilenet",
        }
    }

    /// Human-readable description for summaries
    pub fn description(&self) -> &'static str {
        match self {
            Fixture::Fraud => "random-forest fraud classifier",
            Fixture::Compat => "compatibility-test MLP (5 -> 8 -> 2)",
            Fixture::SimpleCnn => "lightweight CNN, 28x28 grayscale -> 10 classes",
            Fixture::TinyResNet => "small conv stack, 224x224 RGB -> 1000 classes",
            Fixture::TinyMobileNet => "depthwise-separable CNN, 224x224 RGB -> 1000 classes",
        }
    }

    /// Build the fixture model
    pub fn build(&self) -> Result<Model> {
        match self {
            Fixture::Fraud => build_fraud_model(),
            Fixture::Compat => build_compat_model(),
            Fixture::SimpleCnn => build_simple_cnn(),
            Fixture::TinyResNet => build_tiny_resnet(),
            Fixture::TinyMobileNet => build_tiny_mobilenet(),
        }
    }
}

/// Package a layer stack as an exportable model
///
/// Shape inference validates the stack (every adjacent pair of layers must
/// agree) and supplies the declared output signature; the manifest is
/// validated against the pinned opset before the model is returned, so an
/// opset-11 fixture cannot carry a 12-only operator.
pub(crate) fn network_model(
    net: &Sequential,
    name: &str,
    architecture: &str,
    input_shape: &[usize],
    opset: u32,
) -> Result<Model> {
    let output_shape = net.output_shape(input_shape)?;

    let manifest = GraphManifest::new(opset)
        .with_input(IoSpec::batched("input", input_shape))
        .with_output(IoSpec::batched("output", &output_shape))
        .with_nodes(net.manifest_nodes());
    manifest.validate()?;

    let metadata = ModelMetadata::new(name, architecture).with_opset(opset);
    Ok(Model::new(metadata, manifest, net.parameters()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_names_are_the_published_ones() {
        let names: Vec<&str> = Fixture::ALL.iter().map(|f| f.base_name()).collect();
        assert_eq!(
            names,
            vec![
                "fraud_model",
                "test_model_compatible",
                "simple_cnn",
                "tiny_resnet",
                "tiny_mobilenet"
            ]
        );
    }

    #[test]
    fn test_vision_subset() {
        assert_eq!(Fixture::VISION.len(), 3);
        assert!(!Fixture::VISION.contains(&Fixture::Fraud));
    }
}
