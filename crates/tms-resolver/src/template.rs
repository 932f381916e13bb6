//! `{name}` URL templates.

use std::collections::HashMap;

use tile_common::TileCoord;

use crate::limits::TileMatrixLimits;

/// Replace every `{name}` placeholder with the value returned by `lookup`.
///
/// Names are word characters (`[A-Za-z0-9_]`). Placeholders without a value
/// expand to an empty string. Braces that do not form a placeholder are
/// copied through unchanged.
pub fn expand_template<F>(template: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let mut out = String::with_capacity(template.len() + 16);
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];

        match after.find('}') {
            Some(end)
                if end > 0
                    && after[..end]
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || c == '_') =>
            {
                if let Some(value) = lookup(&after[..end]) {
                    out.push_str(&value);
                }
                rest = &after[end + 1..];
            }
            _ => {
                out.push('{');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

/// Builds tile URLs for one resolved tile matrix set.
#[derive(Debug, Clone)]
pub struct TileUrlFunction {
    template: String,
    tile_matrix_set_id: String,
    matrix_ids: Vec<String>,
    context: HashMap<String, String>,
    limits: TileMatrixLimits,
}

impl TileUrlFunction {
    /// `matrix_ids[z]` is the original identifier of pyramid level `z`.
    pub fn new(
        template: impl Into<String>,
        tile_matrix_set_id: impl Into<String>,
        matrix_ids: Vec<String>,
        context: HashMap<String, String>,
    ) -> Self {
        Self {
            template: template.into(),
            tile_matrix_set_id: tile_matrix_set_id.into(),
            matrix_ids,
            context,
            limits: TileMatrixLimits::default(),
        }
    }

    pub fn with_limits(mut self, limits: TileMatrixLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// Identifier of the tile matrix backing level `z`.
    pub fn matrix_id(&self, z: u32) -> Option<&str> {
        self.matrix_ids.get(z as usize).map(String::as_str)
    }

    /// URL for a tile, `None` when the level is unknown or the tile falls
    /// outside the advertised limits.
    pub fn url_for(&self, coord: &TileCoord) -> Option<String> {
        let matrix_id = self.matrix_id(coord.z)?;
        if !self.limits.contains(matrix_id, coord) {
            return None;
        }

        Some(expand_template(&self.template, |name| match name {
            "tileMatrixSetId" => Some(self.tile_matrix_set_id.clone()),
            "tileMatrix" => Some(matrix_id.to_string()),
            "tileCol" => Some(coord.x.to_string()),
            "tileRow" => Some(coord.y.to_string()),
            other => self.context.get(other).cloned(),
        }))
    }
}
