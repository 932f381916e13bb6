//! Error types for raster compositing.

use thiserror::Error;

use tile_common::TileError;

/// Errors that can occur while configuring a compositor or building tiles.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompositorError {
    /// Fewer than one or more than three sources.
    #[error("expected 1 to 3 sources, got {0}")]
    SourceCount(usize),

    /// A source could not be opened or its images enumerated.
    #[error("failed to fetch source {source_index}: {message}")]
    Fetch { source_index: usize, message: String },

    /// Sources (or levels of one source) do not line up.
    #[error("source {source_index} has a different {property}: expected {expected}, got {actual}")]
    Inconsistent {
        source_index: usize,
        property: String,
        expected: String,
        actual: String,
    },

    /// Band layout not renderable.
    #[error("unsupported band count: {0}")]
    UnsupportedBandCount(String),

    /// Tiles were requested before configuration succeeded.
    #[error("compositor is not ready (state: {0})")]
    NotReady(String),

    /// Zoom level outside the pyramid.
    #[error("tile {0} is outside the tile grid")]
    OutOfRange(String),

    /// A window read failed or returned malformed data.
    #[error("failed to read raster window: {0}")]
    Read(String),

    /// Raster not known to the opener.
    #[error("raster not found: {0}")]
    NotFound(String),

    /// The image pyramid does not form a valid tile grid.
    #[error("invalid tile grid: {0}")]
    Grid(String),
}

impl CompositorError {
    /// Create an Inconsistent error.
    pub fn inconsistent(
        source_index: usize,
        property: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::Inconsistent {
            source_index,
            property: property.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create a Read error.
    pub fn read(msg: impl Into<String>) -> Self {
        Self::Read(msg.into())
    }
}

impl From<TileError> for CompositorError {
    fn from(err: TileError) -> Self {
        Self::Grid(err.to_string())
    }
}

/// Result type for compositor operations.
pub type Result<T> = std::result::Result<T, CompositorError>;
