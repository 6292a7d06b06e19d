//! Model container and artifact serialization
//!
//! Artifacts are written in one of three formats. SafeTensors is the
//! interchange default: parameter tensors with true shapes, plus header
//! metadata carrying the model identity and the JSON graph manifest, so a
//! consuming runtime needs nothing from this crate. JSON and YAML carry the
//! same content in text form.

mod format;
mod load;
mod model;
mod save;

pub use format::{ModelFormat, SaveConfig};
pub use load::load_model;
pub use model::{Model, ModelMetadata, ModelState, ParameterInfo};
pub use save::save_model;
