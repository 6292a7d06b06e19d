//! Backward-compatibility fixture
//!
//! A minimal MLP pinned to the oldest supported opset, for consumers that
//! cannot load current-opset artifacts. The opset pin is enforced by
//! manifest validation: this stack must stay within the opset-11 operator
//! vocabulary.

use super::{network_model, Fixture};
use crate::io::Model;
use crate::nn::{Linear, ReLU, Sequential, Softmax};
use crate::Result;
use rand::rngs::StdRng;
use rand::SeedableRng;

const SEED: u64 = 7;

/// Operator-set version the compatibility fixture is pinned to
pub const COMPAT_OPSET: u32 = 11;

/// Input feature count
pub const COMPAT_INPUTS: usize = 5;

const HIDDEN: usize = 8;
const CLASSES: usize = 2;

/// Build the 5 -> 8 -> 2 softmax classifier with seeded random weights
pub fn build_compat_model() -> Result<Model> {
    let mut rng = StdRng::seed_from_u64(SEED);
    let net = Sequential::new()
        .add(Linear::new(COMPAT_INPUTS, HIDDEN, &mut rng))
        .add(ReLU)
        .add(Linear::new(HIDDEN, CLASSES, &mut rng))
        .add(Softmax);

    network_model(
        &net,
        Fixture::Compat.base_name(),
        "mlp",
        &[COMPAT_INPUTS],
        COMPAT_OPSET,
    )
}
