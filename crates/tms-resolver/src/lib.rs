//! Tile matrix set discovery for OGC API - Tiles endpoints.
//!
//! Resolution is a two-stage metadata fetch:
//!
//! ```text
//! tileset description ──► item link (URL template)
//!          │
//!          └─► tileMatrixSetLinks[id] ──► tile matrix set definition
//!                                                │
//!                                                ▼
//!                                     TileGrid + TileUrlFunction
//! ```
//!
//! Failures never escape [`TileMatrixSetResolver::resolve`]; they move the
//! resolver into its terminal `Error` state and are kept for inspection.

pub mod error;
pub mod fetch;
pub mod limits;
pub mod model;
pub mod resolver;
pub mod template;

pub use error::{ResolverError, Result};
pub use fetch::{FetchConfig, HttpFetcher, MetadataFetcher, ACCEPT_JSON};
pub use limits::TileMatrixLimits;
pub use model::{Link, TileMatrixDefinition, TileMatrixSetDefinition, TileMatrixSetLink, TileSetMetadata};
pub use resolver::{build_tile_grid, ResolverOptions, ResolverState, TileMatrixSetResolver};
pub use template::{expand_template, TileUrlFunction};
