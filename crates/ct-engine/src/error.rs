//! Error types for the rendering engine.

use thiserror::Error;

/// A sample asset could not be turned into PCM. Voices swallow these
/// into silence; they never abort a row.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssetError {
    #[error("sample asset not found: {asset}")]
    NotFound { asset: String },
    #[error("sample asset {asset} is unreadable: {reason}")]
    Unreadable { asset: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("could not allocate a buffer of {frames} frames")]
    Allocation { frames: usize },
    #[error(transparent)]
    Asset(#[from] AssetError),
}

pub type Result<T> = std::result::Result<T, EngineError>;
