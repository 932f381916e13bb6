//! Per-level tile limits advertised by a tileset.

use std::collections::HashMap;

use tile_common::TileCoord;

use crate::model::TileMatrixSetLimit;

/// Valid tile ranges keyed by tile matrix identifier.
///
/// Levels without an entry are unrestricted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TileMatrixLimits {
    by_matrix: HashMap<String, TileMatrixSetLimit>,
}

impl TileMatrixLimits {
    pub fn new(limits: Vec<TileMatrixSetLimit>) -> Self {
        Self {
            by_matrix: limits
                .into_iter()
                .map(|limit| (limit.tile_matrix.clone(), limit))
                .collect(),
        }
    }

    pub fn get(&self, matrix_id: &str) -> Option<&TileMatrixSetLimit> {
        self.by_matrix.get(matrix_id)
    }

    /// Check a tile against the limits of its matrix.
    pub fn contains(&self, matrix_id: &str, coord: &TileCoord) -> bool {
        match self.by_matrix.get(matrix_id) {
            Some(limit) => {
                coord.x >= limit.min_tile_col
                    && coord.x <= limit.max_tile_col
                    && coord.y >= limit.min_tile_row
                    && coord.y <= limit.max_tile_row
            }
            None => true,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.by_matrix.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains() {
        let limits = TileMatrixLimits::new(vec![TileMatrixSetLimit {
            tile_matrix: "2".to_string(),
            min_tile_row: 1,
            max_tile_row: 2,
            min_tile_col: 0,
            max_tile_col: 1,
        }]);

        assert!(limits.contains("2", &TileCoord::new(2, 1, 2)));
        assert!(!limits.contains("2", &TileCoord::new(2, 2, 2)));
        assert!(!limits.contains("2", &TileCoord::new(2, 0, 0)));
        // No entry for level 3
        assert!(limits.contains("3", &TileCoord::new(3, 7, 7)));
    }
}
