//! Core errors (renderer-agnostic).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("node '{name}' not found among the model's top-level children")]
    MissingNode { name: String },

    #[error("node '{name}' has no mesh to receive a material")]
    NotAMesh { name: String },

    #[error("unknown material id {0}")]
    UnknownMaterial(u32),

    #[error("unknown texture id {0}")]
    UnknownTexture(u32),

    #[error("Generic error: {0}")]
    Generic(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
