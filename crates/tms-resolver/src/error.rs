//! Error types for tile matrix set resolution.

use thiserror::Error;

use tile_common::TileError;

/// Errors that can occur while resolving a tile matrix set.
///
/// Errors are cloneable so the resolver can keep the failure around after it
/// has moved into its terminal state.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResolverError {
    /// Non-success HTTP status.
    #[error("request to {url} failed with status {status}")]
    Transport { url: String, status: u16 },

    /// The request could not be sent or the body not read.
    #[error("request to {url} failed: {message}")]
    Http { url: String, message: String },

    /// Response body is not the expected JSON document.
    #[error("malformed metadata from {url}: {message}")]
    Json { url: String, message: String },

    /// The tileset has no link with `rel == "item"`.
    #[error("tileset {0} has no item link")]
    MissingItemLink(String),

    /// The requested tile matrix set is not offered by the tileset.
    #[error("could not find tile matrix set '{0}' in the tileset links")]
    MatrixSetNotFound(String),

    /// The definition declares a CRS we cannot handle.
    #[error("unsupported CRS: {0}")]
    UnsupportedCrs(String),

    #[error("invalid URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    /// The definition does not describe a valid pyramid.
    #[error("invalid tile grid: {0}")]
    Grid(String),
}

impl From<TileError> for ResolverError {
    fn from(err: TileError) -> Self {
        match err {
            TileError::UnsupportedCrs(crs) => ResolverError::UnsupportedCrs(crs),
            other => ResolverError::Grid(other.to_string()),
        }
    }
}

/// Result type for resolver operations.
pub type Result<T> = std::result::Result<T, ResolverError>;
