//! Asset loading: baked textures and glTF/GLB models.
//!
//! Loads run off the event-loop thread and come back as [`Pending`] handles.

pub mod model;
pub mod pending;
pub mod texture;

pub use model::ModelLoader;
pub use pending::Pending;
pub use texture::{TextureLoader, TextureOptions};
