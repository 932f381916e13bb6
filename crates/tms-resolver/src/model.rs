//! Wire types for OGC API - Tiles metadata documents.

use serde::{Deserialize, Serialize};

/// Link relation marking the tile URL template.
pub const ITEM_REL: &str = "item";

/// A tileset description.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TileSetMetadata {
    #[serde(default)]
    pub links: Vec<Link>,
    #[serde(default)]
    pub tile_matrix_set_links: Vec<TileMatrixSetLink>,
}

impl TileSetMetadata {
    /// First link whose relation is `item`.
    pub fn item_link(&self) -> Option<&Link> {
        self.links.iter().find(|link| link.rel == ITEM_REL)
    }

    /// Link for the tile matrix set with the given identifier.
    pub fn matrix_set_link(&self, id: &str) -> Option<&TileMatrixSetLink> {
        self.tile_matrix_set_links
            .iter()
            .find(|link| link.tile_matrix_set == id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Link {
    pub rel: String,
    pub href: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TileMatrixSetLink {
    pub tile_matrix_set: String,
    #[serde(rename = "tileMatrixSetURI")]
    pub tile_matrix_set_uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tile_matrix_set_limits: Option<Vec<TileMatrixSetLimit>>,
}

/// Valid tile range of one tile matrix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TileMatrixSetLimit {
    pub tile_matrix: String,
    pub min_tile_row: u32,
    pub max_tile_row: u32,
    pub min_tile_col: u32,
    pub max_tile_col: u32,
}

/// A tile matrix set definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TileMatrixSetDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(alias = "id")]
    pub identifier: String,
    #[serde(rename = "supportedCRS", alias = "crs")]
    pub supported_crs: String,
    #[serde(alias = "tileMatrices")]
    pub tile_matrix: Vec<TileMatrixDefinition>,
}

/// One pyramid level of a tile matrix set definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TileMatrixDefinition {
    #[serde(alias = "id")]
    pub identifier: String,
    pub scale_denominator: f64,
    #[serde(alias = "pointOfOrigin")]
    pub top_left_corner: [f64; 2],
    pub matrix_width: u32,
    pub matrix_height: u32,
    pub tile_width: u32,
    pub tile_height: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tileset() {
        let json = r#"{
            "links": [
                {"rel": "self", "href": "https://example.com/tiles", "type": "application/json"},
                {"rel": "item", "href": "tiles/{tileMatrixSetId}/{tileMatrix}/{tileRow}/{tileCol}.png", "type": "image/png"}
            ],
            "tileMatrixSetLinks": [
                {
                    "tileMatrixSet": "WebMercatorQuad",
                    "tileMatrixSetURI": "../tileMatrixSets/WebMercatorQuad",
                    "tileMatrixSetLimits": [
                        {"tileMatrix": "0", "minTileRow": 0, "maxTileRow": 0, "minTileCol": 0, "maxTileCol": 0}
                    ]
                }
            ]
        }"#;

        let tileset: TileSetMetadata = serde_json::from_str(json).unwrap();
        assert_eq!(tileset.item_link().unwrap().media_type.as_deref(), Some("image/png"));

        let link = tileset.matrix_set_link("WebMercatorQuad").unwrap();
        assert_eq!(link.tile_matrix_set_uri, "../tileMatrixSets/WebMercatorQuad");
        assert_eq!(link.tile_matrix_set_limits.as_ref().unwrap().len(), 1);
        assert!(tileset.matrix_set_link("WorldCRS84Quad").is_none());
    }

    #[test]
    fn test_parse_definition() {
        let json = r#"{
            "title": "Google Maps Compatible for the World",
            "identifier": "WebMercatorQuad",
            "supportedCRS": "http://www.opengis.net/def/crs/EPSG/0/3857",
            "tileMatrix": [
                {
                    "identifier": "0",
                    "scaleDenominator": 559082264.028717,
                    "topLeftCorner": [-20037508.3427892, 20037508.3427892],
                    "matrixWidth": 1,
                    "matrixHeight": 1,
                    "tileWidth": 256,
                    "tileHeight": 256
                }
            ]
        }"#;

        let definition: TileMatrixSetDefinition = serde_json::from_str(json).unwrap();
        assert_eq!(definition.identifier, "WebMercatorQuad");
        assert_eq!(definition.tile_matrix.len(), 1);
        assert_eq!(definition.tile_matrix[0].tile_width, 256);
    }

    #[test]
    fn test_missing_links_default_to_empty() {
        let tileset: TileSetMetadata = serde_json::from_str("{}").unwrap();
        assert!(tileset.item_link().is_none());
        assert!(tileset.tile_matrix_set_links.is_empty());
    }
}
