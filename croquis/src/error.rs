//! Error types used by the crate.

use image::ImageError;
use thiserror::Error;

/// Croquis error type.
///
/// Validation failures reference the offending request field so the request
/// layer can report them without exposing internals. Per-element failures
/// during layout composition are not errors at all; they are collected as
/// [`SkipReason`](crate::layout::SkipReason)s on the composed page.
#[derive(Debug, Error)]
pub enum CroquisError {
    /// A request field failed validation.
    #[error("invalid value for `{field}`: {message}")]
    Configuration {
        /// Name of the rejected request field.
        field: String,
        /// What was wrong with it.
        message: String,
    },
    /// A referenced layer, session or asset does not exist.
    #[error("{0} not found")]
    NotFound(String),
    /// Geometry unusable for the requested operation.
    #[error("degenerate geometry: {0}")]
    DegenerateGeometry(String),
    /// The layer registry could not be read.
    #[error("layer registry unavailable: {0}")]
    Registry(String),
    /// Image encoding or decoding error.
    #[error("image codec error: {0:?}")]
    ImageCodec(#[from] ImageError),
    /// Failure while assembling or writing an output document.
    #[error("export failed: {0}")]
    Export(String),
    /// Error reading/writing data to the FS.
    #[error("failed to read file")]
    FsIo(#[from] std::io::Error),
}

impl CroquisError {
    /// Shorthand for a configuration error.
    pub fn config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Configuration {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Machine-readable kind of the failure, stable across message changes.
    pub fn kind(&self) -> &'static str {
        match self {
            CroquisError::Configuration { .. } => "configuration",
            CroquisError::NotFound(_) => "not_found",
            CroquisError::DegenerateGeometry(_) => "degenerate_geometry",
            CroquisError::Registry(_) => "registry",
            CroquisError::ImageCodec(_) => "image_codec",
            CroquisError::Export(_) => "export",
            CroquisError::FsIo(_) => "io",
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CroquisError>;
