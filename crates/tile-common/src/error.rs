//! Error types for tile grid and tile state handling.

use thiserror::Error;

/// Result type alias using TileError.
pub type TileResult<T> = Result<T, TileError>;

/// Errors raised while building or querying tile grids.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TileError {
    #[error("Tile grid must have at least one level")]
    EmptyGrid,

    #[error("Tile grid arrays disagree on level count: {0}")]
    LevelCountMismatch(String),

    #[error("Resolutions must strictly decrease: level {level} has {resolution}, previous level has {previous}")]
    NonMonotonicResolution {
        level: usize,
        resolution: f64,
        previous: f64,
    },

    #[error("Invalid resolution at level {level}: {resolution}")]
    InvalidResolution { level: usize, resolution: f64 },

    #[error("Zoom level {0} is outside the tile grid")]
    LevelOutOfRange(u32),

    #[error("Unsupported CRS: {0}")]
    UnsupportedCrs(String),
}
