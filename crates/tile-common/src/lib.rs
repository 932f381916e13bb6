//! Common types shared by the tile acquisition and texture pipeline.

pub mod bbox;
pub mod crs;
pub mod error;
pub mod grid;
pub mod tile;

pub use bbox::BoundingBox;
pub use crs::{AxisOrientation, CrsCode};
pub use error::{TileError, TileResult};
pub use grid::{TileGrid, TileLevel, TileRange};
pub use tile::{Tile, TileCoord, TileData, TileState};
