//! Error types for raster handling.

use thiserror::Error;

/// Errors that can occur while building, encoding or reading rasters.
#[derive(Debug, Error)]
pub enum RasterError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The decoded grid and its coordinate axes disagree.
    #[error("invalid grid: {0}")]
    InvalidGrid(String),

    /// The artifact bytes do not form a valid raster container.
    #[error("invalid raster artifact: {0}")]
    InvalidArtifact(String),

    /// A chunk's stored CRC does not match its contents.
    #[error("checksum mismatch in {0} chunk")]
    ChecksumMismatch(&'static str),
}

/// Result type for raster operations.
pub type Result<T> = std::result::Result<T, RasterError>;
