//! Session-level error type.

use crate::assets::AssetError;
use crate::export::ExportError;
use crate::raster::RasterError;
use thiserror::Error;

/// Errors surfaced by session operations.
///
/// Failures are terminal for the operation they occur in and never corrupt
/// surfaces that already initialized.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Raster error: {0}")]
    Raster(#[from] RasterError),
    #[error("Page {0} is out of range")]
    PageOutOfRange(usize),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Invalid color: {0}")]
    InvalidColor(String),
    #[error("Asset error: {0}")]
    Asset(#[from] AssetError),
    #[error("Export error: {0}")]
    Export(#[from] ExportError),
}

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;
