//! Common test fixtures: OGC API - Tiles metadata documents.

use serde_json::{json, Value};

/// Tileset description served by the mock fetcher.
pub const TILESET_URL: &str = "https://maps.example.com/collections/blueMarble/map/tiles/WebMercatorQuad";

/// Relative item link of [`tileset`].
pub const ITEM_HREF: &str = "WebMercatorQuad/{tileMatrix}/{tileRow}/{tileCol}.png";

/// `ITEM_HREF` resolved against `TILESET_URL`.
pub const TILE_TEMPLATE: &str =
    "https://maps.example.com/collections/blueMarble/map/tiles/WebMercatorQuad/{tileMatrix}/{tileRow}/{tileCol}.png";

pub const WEB_MERCATOR_QUAD_URL: &str = "https://maps.example.com/tileMatrixSets/WebMercatorQuad";
pub const WGS1984_QUAD_URL: &str = "https://maps.example.com/tileMatrixSets/WGS1984Quad";

/// Scale denominator of WebMercatorQuad level 0.
pub const WEB_MERCATOR_SCALE_0: f64 = 559082264.0287178;

/// Half the width of the Web Mercator world in meters.
pub const WEB_MERCATOR_HALF_WORLD: f64 = 20037508.3427892;

/// Scale denominator of WGS1984Quad level 0.
pub const WGS1984_SCALE_0: f64 = 279541132.0143589;

/// A tileset with an item link and the given `(id, uri)` matrix set links.
pub fn tileset(matrix_sets: &[(&str, &str)]) -> Value {
    json!({
        "title": "Blue Marble",
        "links": [
            { "rel": "self", "href": TILESET_URL, "type": "application/json" },
            { "rel": "item", "href": ITEM_HREF, "type": "image/png" }
        ],
        "tileMatrixSetLinks": matrix_sets
            .iter()
            .map(|(id, uri)| json!({ "tileMatrixSet": id, "tileMatrixSetURI": uri }))
            .collect::<Vec<_>>()
    })
}

/// The default tileset, offering WebMercatorQuad and WGS1984Quad.
pub fn default_tileset() -> Value {
    tileset(&[
        ("WebMercatorQuad", WEB_MERCATOR_QUAD_URL),
        ("WGS1984Quad", WGS1984_QUAD_URL),
    ])
}

/// A tileset whose only link is `self`.
pub fn tileset_without_item_link() -> Value {
    json!({
        "links": [{ "rel": "self", "href": TILESET_URL }],
        "tileMatrixSetLinks": [
            { "tileMatrixSet": "WebMercatorQuad", "tileMatrixSetURI": WEB_MERCATOR_QUAD_URL }
        ]
    })
}

/// WebMercatorQuad tileset with limits on level 2.
pub fn tileset_with_limits() -> Value {
    json!({
        "links": [{ "rel": "item", "href": ITEM_HREF }],
        "tileMatrixSetLinks": [{
            "tileMatrixSet": "WebMercatorQuad",
            "tileMatrixSetURI": WEB_MERCATOR_QUAD_URL,
            "tileMatrixSetLimits": [
                { "tileMatrix": "2", "minTileRow": 1, "maxTileRow": 2, "minTileCol": 0, "maxTileCol": 1 }
            ]
        }]
    })
}

/// WebMercatorQuad definition with `levels` matrices.
pub fn web_mercator_definition(levels: u32) -> Value {
    let matrices: Vec<Value> = (0..levels)
        .map(|z| {
            let size = 1u32 << z;
            json!({
                "identifier": z.to_string(),
                "scaleDenominator": WEB_MERCATOR_SCALE_0 / size as f64,
                "topLeftCorner": [-WEB_MERCATOR_HALF_WORLD, WEB_MERCATOR_HALF_WORLD],
                "matrixWidth": size,
                "matrixHeight": size,
                "tileWidth": 256,
                "tileHeight": 256
            })
        })
        .collect();

    json!({
        "title": "Google Maps Compatible for the World",
        "identifier": "WebMercatorQuad",
        "supportedCRS": "http://www.opengis.net/def/crs/EPSG/0/3857",
        "tileMatrix": matrices
    })
}

/// WGS1984Quad definition in EPSG:4326, whose corners are latitude first.
pub fn wgs1984_definition(levels: u32) -> Value {
    let matrices: Vec<Value> = (0..levels)
        .map(|z| {
            let rows = 1u32 << z;
            json!({
                "identifier": z.to_string(),
                "scaleDenominator": WGS1984_SCALE_0 / rows as f64,
                "topLeftCorner": [90.0, -180.0],
                "matrixWidth": rows * 2,
                "matrixHeight": rows,
                "tileWidth": 256,
                "tileHeight": 256
            })
        })
        .collect();

    json!({
        "identifier": "WGS1984Quad",
        "supportedCRS": "http://www.opengis.net/def/crs/EPSG/0/4326",
        "tileMatrix": matrices
    })
}

/// A definition whose second matrix is coarser than the first.
pub fn non_monotonic_definition() -> Value {
    let mut definition = web_mercator_definition(2);
    definition["tileMatrix"][1]["scaleDenominator"] = json!(WEB_MERCATOR_SCALE_0 * 2.0);
    definition
}

/// A definition in a CRS the registry does not know.
pub fn unknown_crs_definition() -> Value {
    let mut definition = web_mercator_definition(1);
    definition["supportedCRS"] = json!("http://www.opengis.net/def/crs/EPSG/0/2056");
    definition
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_web_mercator_definition() {
        let definition = web_mercator_definition(3);
        assert_eq!(definition["tileMatrix"].as_array().unwrap().len(), 3);
        assert_eq!(definition["tileMatrix"][2]["matrixWidth"], 4);
    }

    #[test]
    fn test_tileset_links() {
        let tileset = default_tileset();
        assert_eq!(tileset["links"][1]["rel"], "item");
        assert_eq!(tileset["tileMatrixSetLinks"].as_array().unwrap().len(), 2);
    }
}
