//! Composites co-registered raster sources into 8-bit tile buffers.

use std::fmt;
use std::sync::Arc;

use futures::future::try_join_all;
use tracing::{debug, error, info, instrument, warn};

use tile_common::{CrsCode, Tile, TileCoord, TileData, TileGrid, TileLevel};

use crate::container::{PixelWindow, RasterImage, RasterOpener};
use crate::error::{CompositorError, Result};
use crate::samples::{Rescale, SampleBuffer};
use crate::source::{CompositorOptions, SourceDescriptor};

/// Maximum number of sources that can be composited.
pub const MAX_SOURCES: usize = 3;

/// Origin/extent tolerance, in pixels of the level being compared.
const PIXEL_TOLERANCE: f64 = 0.01;

/// Relative tolerance on resolutions.
const RESOLUTION_TOLERANCE: f64 = 1e-6;

/// Lifecycle of a compositor's sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceState {
    Loading,
    Ready,
    Error,
}

impl fmt::Display for SourceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceState::Loading => write!(f, "loading"),
            SourceState::Ready => write!(f, "ready"),
            SourceState::Error => write!(f, "error"),
        }
    }
}

/// A composited tile: `bands` bytes per pixel, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositedTile {
    pub width: u32,
    pub height: u32,
    pub bands: usize,
    pub data: Vec<u8>,
}

impl CompositedTile {
    /// Bytes of the pixel at column `x`, row `y`.
    pub fn pixel(&self, x: u32, y: u32) -> &[u8] {
        let start = (y as usize * self.width as usize + x as usize) * self.bands;
        &self.data[start..start + self.bands]
    }

    pub fn into_tile_data(self) -> TileData {
        TileData::Samples {
            width: self.width,
            height: self.height,
            data: self.data,
        }
    }
}

/// Extra bands synthesized after the source bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Padding {
    None,
    /// Two gray sources: the second copied into B
    Pair,
    /// Alpha only
    Alpha,
    /// One gray band: copied into G and B, then alpha
    GrayAlpha,
    /// Two gray sources: the second copied into B, then alpha
    PairAlpha,
}

impl Padding {
    fn for_layout(source_count: usize, samples_per_pixel: usize, add_alpha: bool) -> Self {
        match (source_count, samples_per_pixel, add_alpha) {
            (2, 1, false) => Padding::Pair,
            (_, _, false) => Padding::None,
            (1, 1, true) => Padding::GrayAlpha,
            (2, 1, true) => Padding::PairAlpha,
            _ => Padding::Alpha,
        }
    }

    fn extra_bands(&self) -> usize {
        match self {
            Padding::None => 0,
            Padding::Pair | Padding::Alpha => 1,
            Padding::PairAlpha => 2,
            Padding::GrayAlpha => 3,
        }
    }

    fn has_alpha(&self) -> bool {
        matches!(self, Padding::Alpha | Padding::GrayAlpha | Padding::PairAlpha)
    }
}

/// Images of one source.
type Pyramid = Vec<Arc<dyn RasterImage>>;

struct Configured {
    /// Per source, coarsest level first
    pyramids: Vec<Pyramid>,
    grid: Arc<TileGrid>,
    projection: Option<CrsCode>,
    samples_per_pixel: usize,
    padding: Padding,
}

impl Configured {
    fn band_count(&self) -> usize {
        self.pyramids.len() * self.samples_per_pixel + self.padding.extra_bands()
    }
}

/// Turns one to three raster sources into renderable tiles.
pub struct RasterCompositor {
    sources: Vec<SourceDescriptor>,
    options: CompositorOptions,
    state: SourceState,
    error: Option<CompositorError>,
    configured: Option<Configured>,
}

impl fmt::Debug for RasterCompositor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RasterCompositor")
            .field("sources", &self.sources)
            .field("state", &self.state)
            .field("error", &self.error)
            .finish()
    }
}

impl RasterCompositor {
    /// Create a compositor over 1 to 3 sources.
    pub fn new(sources: Vec<SourceDescriptor>, options: CompositorOptions) -> Result<Self> {
        if sources.is_empty() || sources.len() > MAX_SOURCES {
            return Err(CompositorError::SourceCount(sources.len()));
        }

        Ok(Self {
            sources,
            options,
            state: SourceState::Loading,
            error: None,
            configured: None,
        })
    }

    pub fn sources(&self) -> &[SourceDescriptor] {
        &self.sources
    }

    pub fn state(&self) -> SourceState {
        self.state
    }

    pub fn error(&self) -> Option<&CompositorError> {
        self.error.as_ref()
    }

    pub fn tile_grid(&self) -> Option<Arc<TileGrid>> {
        self.configured.as_ref().map(|c| c.grid.clone())
    }

    pub fn projection(&self) -> Option<CrsCode> {
        self.configured.as_ref().and_then(|c| c.projection)
    }

    /// Bytes per pixel of composited tiles.
    pub fn band_count(&self) -> Option<usize> {
        self.configured.as_ref().map(Configured::band_count)
    }

    /// Open every source, validate that they line up and derive the tile grid.
    ///
    /// A source that cannot be fetched moves the compositor to
    /// [`SourceState::Error`] and is reported through [`Self::error`].
    /// Consistency and band-layout violations also set the error state, and
    /// are returned to the caller.
    #[instrument(skip(self, opener), fields(sources = self.sources.len()))]
    pub async fn configure(&mut self, opener: &dyn RasterOpener) -> Result<SourceState> {
        if self.state != SourceState::Loading {
            return Ok(self.state);
        }

        let fetches = self
            .sources
            .iter()
            .enumerate()
            .map(|(index, source)| fetch_pyramid(opener, index, source));

        let pyramids = match try_join_all(fetches).await {
            Ok(pyramids) => pyramids,
            Err(e) => {
                error!(error = %e, "Failed to fetch raster sources");
                self.state = SourceState::Error;
                self.error = Some(e);
                return Ok(SourceState::Error);
            }
        };

        match self.build(pyramids) {
            Ok(configured) => {
                info!(
                    levels = configured.grid.level_count(),
                    bands = configured.band_count(),
                    projection = ?configured.projection,
                    "Raster sources ready"
                );
                self.configured = Some(configured);
                self.state = SourceState::Ready;
                Ok(SourceState::Ready)
            }
            Err(e) => {
                error!(error = %e, "Raster sources are not compatible");
                self.state = SourceState::Error;
                self.error = Some(e.clone());
                Err(e)
            }
        }
    }

    fn build(&self, pyramids: Vec<Pyramid>) -> Result<Configured> {
        let reference = &pyramids[0];
        for (index, pyramid) in pyramids.iter().enumerate() {
            check_consistency(index, pyramid, reference)?;
        }

        let samples_per_pixel = reference[0].samples_per_pixel() as usize;
        check_band_layout(pyramids.len(), samples_per_pixel)?;

        let projection = match self.options.projection {
            Some(crs) => Some(crs),
            None => projection_from_keys(reference[0].as_ref()),
        };

        let pyramids: Vec<Pyramid> = pyramids
            .into_iter()
            .map(|mut pyramid| {
                pyramid.reverse();
                pyramid
            })
            .collect();

        let grid = build_grid(&pyramids[0])?;
        let add_alpha = self.sources.iter().any(|s| s.nodata.is_some());

        Ok(Configured {
            padding: Padding::for_layout(pyramids.len(), samples_per_pixel, add_alpha),
            pyramids,
            grid: Arc::new(grid),
            projection,
            samples_per_pixel,
        })
    }

    /// Read and composite tile `z/x/y`.
    #[instrument(skip(self), level = "debug")]
    pub async fn load_tile(&self, z: u32, x: u32, y: u32) -> Result<CompositedTile> {
        let configured = match (self.state, &self.configured) {
            (SourceState::Ready, Some(configured)) => configured,
            _ => return Err(CompositorError::NotReady(self.state.to_string())),
        };

        let coord = TileCoord::new(z, x, y);
        let level = match configured.grid.level(z) {
            Some(level) if configured.grid.contains(&coord) => level,
            _ => return Err(CompositorError::OutOfRange(coord.to_string())),
        };

        let [width, height] = level.tile_size;
        let window = PixelWindow::new(x * width, y * height, width, height);
        let pixel_count = window.pixel_count();

        let reads = try_join_all(
            configured
                .pyramids
                .iter()
                .map(|pyramid| pyramid[z as usize].read_window(window)),
        )
        .await?;

        for (index, bands) in reads.iter().enumerate() {
            if bands.len() != configured.samples_per_pixel {
                return Err(CompositorError::read(format!(
                    "source {} returned {} bands, expected {}",
                    index,
                    bands.len(),
                    configured.samples_per_pixel
                )));
            }
            if let Some(short) = bands.iter().find(|band| band.len() != pixel_count) {
                return Err(CompositorError::read(format!(
                    "source {} returned {} samples, expected {}",
                    index,
                    short.len(),
                    pixel_count
                )));
            }
        }

        let data = composite(
            &reads,
            &self.sources,
            configured.samples_per_pixel,
            configured.padding,
            self.options.normalize,
            pixel_count,
        );

        debug!(tile = %coord, bytes = data.len(), "Composited tile");

        Ok(CompositedTile {
            width,
            height,
            bands: configured.band_count(),
            data,
        })
    }

    /// Load `tile` through its state machine, ending in `Loaded` or `Error`.
    pub async fn load_into(&self, tile: &Tile) {
        let coord = tile.coord();
        tile.load_with(async move {
            self.load_tile(coord.z, coord.x, coord.y)
                .await
                .map(CompositedTile::into_tile_data)
        })
        .await
    }
}

async fn fetch_pyramid(
    opener: &dyn RasterOpener,
    index: usize,
    source: &SourceDescriptor,
) -> Result<Pyramid> {
    let fetch_error = move |e: CompositorError| CompositorError::Fetch {
        source_index: index,
        message: e.to_string(),
    };

    let container = opener
        .open(&source.url, &source.overviews)
        .await
        .map_err(fetch_error)?;
    let count = container.image_count().await.map_err(fetch_error)?;
    if count == 0 {
        return Err(CompositorError::Fetch {
            source_index: index,
            message: format!("{} contains no images", source.url),
        });
    }

    let images = try_join_all((0..count).map(|i| container.image(i)))
        .await
        .map_err(fetch_error)?;

    debug!(source = index, url = %source.url, images = count, "Fetched raster images");
    Ok(images)
}

fn close(a: f64, b: f64, tolerance: f64) -> bool {
    (a - b).abs() <= tolerance
}

fn resolutions_match(a: [f64; 2], b: [f64; 2]) -> bool {
    a.iter()
        .zip(b.iter())
        .all(|(a, b)| close(*a, *b, b.abs() * RESOLUTION_TOLERANCE))
}

/// Compare every level of `pyramid` with the reference pyramid.
fn check_consistency(index: usize, pyramid: &Pyramid, reference: &Pyramid) -> Result<()> {
    if pyramid.len() != reference.len() {
        return Err(CompositorError::inconsistent(
            index,
            "number of resolutions",
            reference.len().to_string(),
            pyramid.len().to_string(),
        ));
    }

    let expected_bands = reference[0].samples_per_pixel();

    for (image, reference_image) in pyramid.iter().zip(reference.iter()) {
        if image.samples_per_pixel() != expected_bands {
            return Err(CompositorError::inconsistent(
                index,
                "samples per pixel",
                expected_bands.to_string(),
                image.samples_per_pixel().to_string(),
            ));
        }

        let tolerance = reference_image.resolution()[0].abs() * PIXEL_TOLERANCE;

        let expected = reference_image.bounding_box().to_array();
        let actual = image.bounding_box().to_array();
        if !expected
            .iter()
            .zip(actual.iter())
            .all(|(a, b)| close(*a, *b, tolerance))
        {
            return Err(CompositorError::inconsistent(
                index,
                "extent",
                format!("{:?}", expected),
                format!("{:?}", actual),
            ));
        }

        let expected = reference_image.origin();
        let actual = image.origin();
        if !close(expected[0], actual[0], tolerance) || !close(expected[1], actual[1], tolerance) {
            return Err(CompositorError::inconsistent(
                index,
                "origin",
                format!("{:?}", expected),
                format!("{:?}", actual),
            ));
        }

        let expected = reference_image.resolution();
        let actual = image.resolution();
        if !resolutions_match(actual, expected) {
            return Err(CompositorError::inconsistent(
                index,
                "resolution",
                format!("{:?}", expected),
                format!("{:?}", actual),
            ));
        }

        let expected = reference_image.tile_size();
        let actual = image.tile_size();
        if expected != actual {
            return Err(CompositorError::inconsistent(
                index,
                "tile size",
                format!("{:?}", expected),
                format!("{:?}", actual),
            ));
        }
    }

    Ok(())
}

fn check_band_layout(source_count: usize, samples_per_pixel: usize) -> Result<()> {
    if source_count == 1 {
        if !matches!(samples_per_pixel, 1 | 3 | 4) {
            return Err(CompositorError::UnsupportedBandCount(format!(
                "a single source must have 1, 3 or 4 samples per pixel, got {}",
                samples_per_pixel
            )));
        }
    } else if samples_per_pixel != 1 {
        return Err(CompositorError::UnsupportedBandCount(format!(
            "each of {} sources must have 1 sample per pixel, got {}",
            source_count, samples_per_pixel
        )));
    }
    Ok(())
}

fn projection_from_keys(image: &dyn RasterImage) -> Option<CrsCode> {
    let Some(code) = image.geo_keys().and_then(|keys| keys.epsg_code()) else {
        warn!("Raster declares no EPSG code");
        return None;
    };

    let crs = CrsCode::from_epsg(code);
    if crs.is_none() {
        warn!(epsg = code, "Unrecognized EPSG code in raster geo keys");
    }
    crs
}

/// Tile grid over a coarsest-first pyramid.
fn build_grid(pyramid: &Pyramid) -> Result<TileGrid> {
    let levels = pyramid
        .iter()
        .map(|image| {
            let tile_size = image.tile_size();
            if tile_size[0] == 0 || tile_size[1] == 0 {
                return Err(CompositorError::Grid(format!(
                    "image has an empty tile size {:?}",
                    tile_size
                )));
            }
            Ok(TileLevel {
                origin: image.origin(),
                resolution: image.resolution()[0].abs(),
                matrix_size: [
                    image.width().div_ceil(tile_size[0]),
                    image.height().div_ceil(tile_size[1]),
                ],
                tile_size,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let extent = pyramid[pyramid.len() - 1].bounding_box();
    Ok(TileGrid::new(levels)?.with_extent(extent))
}

/// Interleave source bands into 8-bit pixels.
fn composite(
    reads: &[Vec<SampleBuffer>],
    sources: &[SourceDescriptor],
    samples_per_pixel: usize,
    padding: Padding,
    normalize: bool,
    pixel_count: usize,
) -> Vec<u8> {
    let band_count = reads.len() * samples_per_pixel + padding.extra_bands();

    let rescales: Vec<Rescale> = reads
        .iter()
        .zip(sources)
        .map(|(bands, source)| {
            if !normalize {
                return Rescale::identity();
            }
            let (natural_min, natural_max) = bands
                .first()
                .map(|band| band.sample_type().natural_range())
                .unwrap_or((0.0, 255.0));
            Rescale::from_range(
                source.min.unwrap_or(natural_min),
                source.max.unwrap_or(natural_max),
            )
        })
        .collect();

    let mut data = vec![0u8; pixel_count * band_count];

    for pixel in 0..pixel_count {
        let offset = pixel * band_count;
        let mut opaque = false;

        for (s, (bands, source)) in reads.iter().zip(sources).enumerate() {
            for (b, band) in bands.iter().enumerate() {
                let raw = band.value(pixel);
                if source.is_nodata(raw) {
                    continue;
                }
                opaque = true;

                let value = rescales[s].apply(raw);
                let out = offset + s * samples_per_pixel + b;
                data[out] = value;

                match padding {
                    Padding::GrayAlpha => {
                        data[out + 1] = value;
                        data[out + 2] = value;
                    }
                    Padding::Pair | Padding::PairAlpha if s == 1 => data[out + 1] = value,
                    _ => {}
                }
            }
        }

        if padding.has_alpha() && opaque {
            data[offset + band_count - 1] = 255;
        }
    }

    data
}
