//! Tile grid geometry.
//!
//! A [`TileGrid`] describes one pyramid: for every zoom level the origin of the
//! tile matrix (top-left corner), the resolution in map units per pixel, the
//! matrix dimensions and the pixel size of a tile. Level 0 is the coarsest.
//! Rows grow downwards from the origin, columns grow to the east.

use serde::{Deserialize, Serialize};

use crate::bbox::BoundingBox;
use crate::error::{TileError, TileResult};
use crate::tile::TileCoord;

/// Scale denominator of WebMercatorQuad level 0.
const WEB_MERCATOR_SCALE_DENOMINATOR: f64 = 559_082_264.028_717_8;

/// Standardized rendering pixel size (0.28mm) in meters.
pub const STANDARD_PIXEL_SIZE: f64 = 0.00028;

const WEB_MERCATOR_MAX_EXTENT: f64 = 20_037_508.342_789_244;

/// Geometry of a single pyramid level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TileLevel {
    /// Top-left corner of the tile matrix in map units
    pub origin: [f64; 2],
    /// Map units per pixel
    pub resolution: f64,
    /// Number of tile columns and rows
    pub matrix_size: [u32; 2],
    /// Tile width and height in pixels
    pub tile_size: [u32; 2],
}

impl TileLevel {
    /// Span of one tile in map units (x, y).
    pub fn tile_span(&self) -> [f64; 2] {
        [
            self.resolution * self.tile_size[0] as f64,
            self.resolution * self.tile_size[1] as f64,
        ]
    }
}

/// An inclusive range of tiles at one zoom level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRange {
    pub z: u32,
    pub min_x: u32,
    pub max_x: u32,
    pub min_y: u32,
    pub max_y: u32,
}

impl TileRange {
    pub fn contains(&self, coord: &TileCoord) -> bool {
        coord.z == self.z
            && coord.x >= self.min_x
            && coord.x <= self.max_x
            && coord.y >= self.min_y
            && coord.y <= self.max_y
    }

    /// Number of tiles in the range.
    pub fn count(&self) -> u64 {
        (self.max_x - self.min_x + 1) as u64 * (self.max_y - self.min_y + 1) as u64
    }

    /// Iterate tiles row by row.
    pub fn iter(&self) -> impl Iterator<Item = TileCoord> + '_ {
        (self.min_y..=self.max_y)
            .flat_map(move |y| (self.min_x..=self.max_x).map(move |x| TileCoord::new(self.z, x, y)))
    }
}

/// Immutable description of a tile pyramid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileGrid {
    levels: Vec<TileLevel>,
    extent: Option<BoundingBox>,
}

impl TileGrid {
    /// Build a grid from per-level geometry, coarsest level first.
    pub fn new(levels: Vec<TileLevel>) -> TileResult<Self> {
        if levels.is_empty() {
            return Err(TileError::EmptyGrid);
        }

        for (level, entry) in levels.iter().enumerate() {
            if !entry.resolution.is_finite() || entry.resolution <= 0.0 {
                return Err(TileError::InvalidResolution {
                    level,
                    resolution: entry.resolution,
                });
            }
        }

        for (level, pair) in levels.windows(2).enumerate() {
            if pair[1].resolution >= pair[0].resolution {
                return Err(TileError::NonMonotonicResolution {
                    level: level + 1,
                    resolution: pair[1].resolution,
                    previous: pair[0].resolution,
                });
            }
        }

        Ok(Self {
            levels,
            extent: None,
        })
    }

    /// Build a grid from parallel per-level arrays.
    pub fn from_arrays(
        origins: &[[f64; 2]],
        resolutions: &[f64],
        matrix_sizes: &[[u32; 2]],
        tile_sizes: &[[u32; 2]],
    ) -> TileResult<Self> {
        let count = resolutions.len();
        if origins.len() != count || matrix_sizes.len() != count || tile_sizes.len() != count {
            return Err(TileError::LevelCountMismatch(format!(
                "origins={}, resolutions={}, matrix_sizes={}, tile_sizes={}",
                origins.len(),
                count,
                matrix_sizes.len(),
                tile_sizes.len()
            )));
        }

        let levels = (0..count)
            .map(|i| TileLevel {
                origin: origins[i],
                resolution: resolutions[i],
                matrix_size: matrix_sizes[i],
                tile_size: tile_sizes[i],
            })
            .collect();

        Self::new(levels)
    }

    /// Attach the valid extent of the grid.
    pub fn with_extent(mut self, extent: BoundingBox) -> Self {
        self.extent = Some(extent);
        self
    }

    /// Standard Web Mercator (Google/OSM) grid with 23 levels of 256px tiles.
    pub fn web_mercator() -> Self {
        let levels = (0..=22u32)
            .map(|z| {
                let n = 2u32.pow(z);
                TileLevel {
                    origin: [-WEB_MERCATOR_MAX_EXTENT, WEB_MERCATOR_MAX_EXTENT],
                    resolution: WEB_MERCATOR_SCALE_DENOMINATOR * STANDARD_PIXEL_SIZE / n as f64,
                    matrix_size: [n, n],
                    tile_size: [256, 256],
                }
            })
            .collect();

        Self {
            levels,
            extent: Some(BoundingBox::new(
                -WEB_MERCATOR_MAX_EXTENT,
                -WEB_MERCATOR_MAX_EXTENT,
                WEB_MERCATOR_MAX_EXTENT,
                WEB_MERCATOR_MAX_EXTENT,
            )),
        }
    }

    /// Geographic grid with a 2:1 matrix at level 0 (WorldCRS84Quad).
    pub fn world_crs84() -> Self {
        let levels = (0..=17u32)
            .map(|z| {
                let n_rows = 2u32.pow(z);
                TileLevel {
                    origin: [-180.0, 90.0],
                    resolution: 180.0 / 256.0 / n_rows as f64,
                    matrix_size: [n_rows * 2, n_rows],
                    tile_size: [256, 256],
                }
            })
            .collect();

        Self {
            levels,
            extent: Some(BoundingBox::new(-180.0, -90.0, 180.0, 90.0)),
        }
    }

    pub fn levels(&self) -> &[TileLevel] {
        &self.levels
    }

    pub fn level(&self, z: u32) -> Option<&TileLevel> {
        self.levels.get(z as usize)
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    /// Finest zoom level.
    pub fn max_zoom(&self) -> u32 {
        (self.levels.len() - 1) as u32
    }

    pub fn extent(&self) -> Option<&BoundingBox> {
        self.extent.as_ref()
    }

    pub fn resolutions(&self) -> Vec<f64> {
        self.levels.iter().map(|l| l.resolution).collect()
    }

    pub fn resolution(&self, z: u32) -> Option<f64> {
        self.level(z).map(|l| l.resolution)
    }

    pub fn origin(&self, z: u32) -> Option<[f64; 2]> {
        self.level(z).map(|l| l.origin)
    }

    pub fn tile_size(&self, z: u32) -> Option<[u32; 2]> {
        self.level(z).map(|l| l.tile_size)
    }

    pub fn matrix_size(&self, z: u32) -> Option<[u32; 2]> {
        self.level(z).map(|l| l.matrix_size)
    }

    /// Check whether a tile exists in the matrix of its level.
    pub fn contains(&self, coord: &TileCoord) -> bool {
        self.level(coord.z).map_or(false, |l| {
            coord.x < l.matrix_size[0] && coord.y < l.matrix_size[1]
        })
    }

    /// Extent of a tile in map units.
    pub fn tile_extent(&self, coord: &TileCoord) -> Option<BoundingBox> {
        let level = self.level(coord.z)?;
        let [span_x, span_y] = level.tile_span();

        let min_x = level.origin[0] + coord.x as f64 * span_x;
        let max_y = level.origin[1] - coord.y as f64 * span_y;

        Some(BoundingBox::new(min_x, max_y - span_y, min_x + span_x, max_y))
    }

    /// Find which tile of level `z` contains a point.
    pub fn tile_coord_for_point(&self, x: f64, y: f64, z: u32) -> Option<TileCoord> {
        let level = self.level(z)?;
        let [span_x, span_y] = level.tile_span();

        let col = ((x - level.origin[0]) / span_x).floor() as i64;
        let row = ((level.origin[1] - y) / span_y).floor() as i64;

        if col < 0
            || row < 0
            || col >= level.matrix_size[0] as i64
            || row >= level.matrix_size[1] as i64
        {
            return None;
        }

        Some(TileCoord::new(z, col as u32, row as u32))
    }

    /// Level whose resolution is closest to `resolution`.
    pub fn z_for_resolution(&self, resolution: f64) -> u32 {
        let mut best = 0usize;
        let mut best_diff = f64::INFINITY;
        for (z, level) in self.levels.iter().enumerate() {
            let diff = (level.resolution - resolution).abs();
            if diff < best_diff {
                best = z;
                best_diff = diff;
            }
        }
        best as u32
    }

    /// Full tile matrix range of a level.
    pub fn full_tile_range(&self, z: u32) -> Option<TileRange> {
        let level = self.level(z)?;
        if level.matrix_size[0] == 0 || level.matrix_size[1] == 0 {
            return None;
        }
        Some(TileRange {
            z,
            min_x: 0,
            max_x: level.matrix_size[0] - 1,
            min_y: 0,
            max_y: level.matrix_size[1] - 1,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn level(resolution: f64) -> TileLevel {
        TileLevel {
            origin: [0.0, 0.0],
            resolution,
            matrix_size: [1, 1],
            tile_size: [256, 256],
        }
    }

    #[test]
    fn test_rejects_empty_grid() {
        assert_eq!(TileGrid::new(vec![]).unwrap_err(), TileError::EmptyGrid);
    }

    #[test]
    fn test_rejects_non_monotonic_resolutions() {
        let err = TileGrid::new(vec![level(10.0), level(5.0), level(5.0)]).unwrap_err();
        assert!(matches!(
            err,
            TileError::NonMonotonicResolution { level: 2, .. }
        ));

        let err = TileGrid::new(vec![level(1.0), level(2.0)]).unwrap_err();
        assert!(matches!(err, TileError::NonMonotonicResolution { .. }));
    }

    #[test]
    fn test_rejects_invalid_resolution() {
        let err = TileGrid::new(vec![level(0.0)]).unwrap_err();
        assert!(matches!(err, TileError::InvalidResolution { level: 0, .. }));
    }

    #[test]
    fn test_from_arrays_length_mismatch() {
        let err = TileGrid::from_arrays(
            &[[0.0, 0.0]],
            &[2.0, 1.0],
            &[[1, 1], [2, 2]],
            &[[256, 256], [256, 256]],
        )
        .unwrap_err();
        assert!(matches!(err, TileError::LevelCountMismatch(_)));
    }

    #[test]
    fn test_web_mercator_resolutions() {
        let grid = TileGrid::web_mercator();
        assert_eq!(grid.level_count(), 23);

        let expected = 2.0 * WEB_MERCATOR_MAX_EXTENT / 256.0;
        assert!((grid.resolution(0).unwrap() - expected).abs() < 1e-6);

        let resolutions = grid.resolutions();
        for pair in resolutions.windows(2) {
            assert!(pair[0] > pair[1]);
        }
    }

    #[test]
    fn test_tile_extent_covers_world_at_zero() {
        let grid = TileGrid::web_mercator();
        let bbox = grid.tile_extent(&TileCoord::new(0, 0, 0)).unwrap();

        assert!((bbox.min_x + WEB_MERCATOR_MAX_EXTENT).abs() < 1.0);
        assert!((bbox.max_x - WEB_MERCATOR_MAX_EXTENT).abs() < 1.0);
        assert!((bbox.min_y + WEB_MERCATOR_MAX_EXTENT).abs() < 1.0);
        assert!((bbox.max_y - WEB_MERCATOR_MAX_EXTENT).abs() < 1.0);
    }

    #[test]
    fn test_tile_coord_for_point() {
        let grid = TileGrid::world_crs84();

        // Western hemisphere at level 0
        assert_eq!(
            grid.tile_coord_for_point(-90.0, 0.0, 0),
            Some(TileCoord::new(0, 0, 0))
        );
        // Eastern hemisphere
        assert_eq!(
            grid.tile_coord_for_point(90.0, 0.0, 0),
            Some(TileCoord::new(0, 1, 0))
        );
        // Level 1: 4x2 matrix
        assert_eq!(
            grid.tile_coord_for_point(-45.0, -45.0, 1),
            Some(TileCoord::new(1, 1, 1))
        );
        assert_eq!(grid.tile_coord_for_point(-200.0, 0.0, 0), None);
        assert_eq!(grid.tile_coord_for_point(0.0, 0.0, 99), None);
    }

    #[test]
    fn test_z_for_resolution() {
        let grid = TileGrid::web_mercator();
        let r5 = grid.resolution(5).unwrap();
        assert_eq!(grid.z_for_resolution(r5), 5);
        assert_eq!(grid.z_for_resolution(r5 * 1.1), 5);
        assert_eq!(grid.z_for_resolution(1e12), 0);
        assert_eq!(grid.z_for_resolution(1e-12), 22);
    }

    #[test]
    fn test_full_tile_range() {
        let grid = TileGrid::world_crs84();
        let range = grid.full_tile_range(1).unwrap();
        assert_eq!(range.count(), 8);
        assert_eq!(range.iter().count(), 8);
        assert!(range.contains(&TileCoord::new(1, 3, 1)));
        assert!(!range.contains(&TileCoord::new(1, 4, 0)));
        assert!(grid.contains(&TileCoord::new(1, 3, 1)));
        assert!(!grid.contains(&TileCoord::new(1, 4, 1)));
    }

    #[test]
    fn test_tile_range_iterates_row_major() {
        let grid = TileGrid::web_mercator();
        let coords: Vec<TileCoord> = grid.full_tile_range(1).unwrap().iter().collect();
        assert_eq!(
            coords,
            vec![
                TileCoord::new(1, 0, 0),
                TileCoord::new(1, 1, 0),
                TileCoord::new(1, 0, 1),
                TileCoord::new(1, 1, 1),
            ]
        );
        assert!(grid.full_tile_range(99).is_none());
    }
}
