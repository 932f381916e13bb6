//! Tile matrix set resolver state machine.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use reqwest::Url;
use serde::de::DeserializeOwned;
use tracing::{debug, error, info, instrument};

use tile_common::grid::STANDARD_PIXEL_SIZE;
use tile_common::{AxisOrientation, BoundingBox, CrsCode, TileGrid, TileLevel};

use crate::error::{ResolverError, Result};
use crate::fetch::{MetadataFetcher, ACCEPT_JSON};
use crate::limits::TileMatrixLimits;
use crate::model::{TileMatrixSetDefinition, TileSetMetadata};
use crate::template::TileUrlFunction;

/// What to resolve.
#[derive(Debug, Clone)]
pub struct ResolverOptions {
    /// URL of the tileset description
    pub url: String,
    /// Identifier of the tile matrix set to use (e.g. "WebMercatorQuad")
    pub tile_matrix_set: String,
    /// Target CRS; derived from the definition when `None`
    pub projection: Option<CrsCode>,
    /// Extra values for `{name}` placeholders in the tile URL template
    pub context: HashMap<String, String>,
}

impl ResolverOptions {
    pub fn new(url: impl Into<String>, tile_matrix_set: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            tile_matrix_set: tile_matrix_set.into(),
            projection: None,
            context: HashMap::new(),
        }
    }

    pub fn with_projection(mut self, projection: CrsCode) -> Self {
        self.projection = Some(projection);
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }
}

/// Resolver lifecycle. `Ready` and `Error` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolverState {
    Loading,
    Ready,
    Error,
}

impl fmt::Display for ResolverState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResolverState::Loading => "loading",
            ResolverState::Ready => "ready",
            ResolverState::Error => "error",
        };
        f.write_str(name)
    }
}

struct Resolved {
    grid: TileGrid,
    urls: TileUrlFunction,
    projection: CrsCode,
    limits: TileMatrixLimits,
}

/// Discovers the tile grid and tile URLs of an OGC API - Tiles tileset.
pub struct TileMatrixSetResolver {
    options: ResolverOptions,
    state: ResolverState,
    error: Option<ResolverError>,
    tile_grid: Option<Arc<TileGrid>>,
    url_function: Option<TileUrlFunction>,
    projection: Option<CrsCode>,
    limits: TileMatrixLimits,
}

impl TileMatrixSetResolver {
    pub fn new(options: ResolverOptions) -> Self {
        Self {
            projection: options.projection,
            options,
            state: ResolverState::Loading,
            error: None,
            tile_grid: None,
            url_function: None,
            limits: TileMatrixLimits::default(),
        }
    }

    pub fn state(&self) -> ResolverState {
        self.state
    }

    /// The failure that moved the resolver into `Error`.
    pub fn error(&self) -> Option<&ResolverError> {
        self.error.as_ref()
    }

    pub fn tile_grid(&self) -> Option<Arc<TileGrid>> {
        self.tile_grid.clone()
    }

    pub fn tile_url_function(&self) -> Option<&TileUrlFunction> {
        self.url_function.as_ref()
    }

    pub fn projection(&self) -> Option<CrsCode> {
        self.projection
    }

    pub fn matrix_limits(&self) -> &TileMatrixLimits {
        &self.limits
    }

    /// Run both metadata fetches and settle into `Ready` or `Error`.
    ///
    /// Once a terminal state is reached further calls return it unchanged.
    #[instrument(skip(self, fetcher), fields(url = %self.options.url, matrix_set = %self.options.tile_matrix_set))]
    pub async fn resolve(&mut self, fetcher: &dyn MetadataFetcher) -> ResolverState {
        if self.state != ResolverState::Loading {
            return self.state;
        }

        match self.try_resolve(fetcher).await {
            Ok(resolved) => {
                info!(
                    levels = resolved.grid.level_count(),
                    projection = %resolved.projection,
                    "Tile matrix set resolved"
                );
                self.tile_grid = Some(Arc::new(resolved.grid));
                self.url_function = Some(resolved.urls);
                self.projection = Some(resolved.projection);
                self.limits = resolved.limits;
                self.state = ResolverState::Ready;
            }
            Err(e) => {
                error!(error = %e, "Failed to resolve tile matrix set");
                self.error = Some(e);
                self.state = ResolverState::Error;
            }
        }

        self.state
    }

    async fn try_resolve(&self, fetcher: &dyn MetadataFetcher) -> Result<Resolved> {
        let tileset_url = parse_url(&self.options.url)?;
        let tileset: TileSetMetadata = fetch_json(fetcher, tileset_url.as_str()).await?;

        let item = tileset
            .item_link()
            .ok_or_else(|| ResolverError::MissingItemLink(self.options.url.clone()))?;
        let template = resolve_href(&tileset_url, &item.href)?;

        let matrix_set_link = tileset
            .matrix_set_link(&self.options.tile_matrix_set)
            .ok_or_else(|| ResolverError::MatrixSetNotFound(self.options.tile_matrix_set.clone()))?;
        let limits = TileMatrixLimits::new(
            matrix_set_link
                .tile_matrix_set_limits
                .clone()
                .unwrap_or_default(),
        );

        let definition_url = resolve_href(&tileset_url, &matrix_set_link.tile_matrix_set_uri)?;
        debug!(definition_url = %definition_url, "Fetching tile matrix set definition");
        let definition: TileMatrixSetDefinition = fetch_json(fetcher, &definition_url).await?;

        let (grid, projection) = build_tile_grid(&definition, self.options.projection)?;
        let matrix_ids = definition
            .tile_matrix
            .iter()
            .map(|m| m.identifier.clone())
            .collect();

        let urls = TileUrlFunction::new(
            template,
            self.options.tile_matrix_set.clone(),
            matrix_ids,
            self.options.context.clone(),
        )
        .with_limits(limits.clone());

        Ok(Resolved {
            grid,
            urls,
            projection,
            limits,
        })
    }
}

/// Derive a tile grid from a tile matrix set definition.
///
/// Uses `projection` when given, otherwise the CRS declared by the
/// definition. Origins are swapped for CRSs whose first axis is not east.
/// Matrix order is preserved: entry `i` becomes pyramid level `i`.
pub fn build_tile_grid(
    definition: &TileMatrixSetDefinition,
    projection: Option<CrsCode>,
) -> Result<(TileGrid, CrsCode)> {
    let projection = match projection {
        Some(projection) => projection,
        None => CrsCode::from_identifier(&definition.supported_crs)?,
    };

    let swap_axes = projection.axis_orientation() != AxisOrientation::EastNorth;
    let meters_per_unit = projection.meters_per_unit();

    let levels: Vec<TileLevel> = definition
        .tile_matrix
        .iter()
        .map(|matrix| {
            let [a, b] = matrix.top_left_corner;
            TileLevel {
                origin: if swap_axes { [b, a] } else { [a, b] },
                resolution: matrix.scale_denominator * STANDARD_PIXEL_SIZE / meters_per_unit,
                matrix_size: [matrix.matrix_width, matrix.matrix_height],
                tile_size: [matrix.tile_width, matrix.tile_height],
            }
        })
        .collect();

    let mut grid = TileGrid::new(levels)?;

    if let Some(level) = grid.level(0).copied() {
        let width = level.matrix_size[0] as f64 * level.tile_span()[0];
        let height = level.matrix_size[1] as f64 * level.tile_span()[1];
        let [x, y] = level.origin;
        grid = grid.with_extent(BoundingBox::new(x, y - height, x + width, y));
    }

    Ok((grid, projection))
}

fn parse_url(url: &str) -> Result<Url> {
    Url::parse(url).map_err(|e| ResolverError::InvalidUrl {
        url: url.to_string(),
        message: e.to_string(),
    })
}

/// Resolve `href` against the document it came from, keeping `{}` intact.
fn resolve_href(base: &Url, href: &str) -> Result<String> {
    if href.contains("://") {
        return Ok(href.to_string());
    }

    let joined = base.join(href).map_err(|e| ResolverError::InvalidUrl {
        url: href.to_string(),
        message: e.to_string(),
    })?;

    Ok(joined
        .as_str()
        .replace("%7B", "{")
        .replace("%7D", "}")
        .replace("%7b", "{")
        .replace("%7d", "}"))
}

async fn fetch_json<T: DeserializeOwned>(fetcher: &dyn MetadataFetcher, url: &str) -> Result<T> {
    let body = fetcher.get(url, ACCEPT_JSON).await?;
    serde_json::from_slice(&body).map_err(|e| ResolverError::Json {
        url: url.to_string(),
        message: e.to_string(),
    })
}
