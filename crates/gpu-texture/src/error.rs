//! Error types for GPU texture handling.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GpuError {
    /// Raw sample buffers must have 1, 3 or 4 bytes per pixel.
    #[error("unsupported pixel format: {0} bytes per pixel")]
    UnsupportedPixelFormat(usize),

    #[error("GPU backend error: {0}")]
    Backend(String),
}

pub type Result<T> = std::result::Result<T, GpuError>;
