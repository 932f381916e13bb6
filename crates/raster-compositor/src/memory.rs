//! In-memory raster containers.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use tile_common::BoundingBox;

use crate::container::{GeoKeys, PixelWindow, RasterContainer, RasterImage, RasterOpener};
use crate::error::{CompositorError, Result};
use crate::samples::SampleBuffer;

/// A raster image whose bands live in memory.
#[derive(Debug, Clone)]
pub struct MemoryImage {
    width: u32,
    height: u32,
    bands: Vec<SampleBuffer>,
    origin: [f64; 2],
    resolution: [f64; 2],
    tile_size: [u32; 2],
    geo_keys: Option<GeoKeys>,
}

impl MemoryImage {
    /// North-up image with unit pixels whose bottom-left corner is at 0,0.
    pub fn new(width: u32, height: u32, bands: Vec<SampleBuffer>) -> Self {
        Self {
            width,
            height,
            bands,
            origin: [0.0, height as f64],
            resolution: [1.0, -1.0],
            tile_size: [256, 256],
            geo_keys: None,
        }
    }

    pub fn with_origin(mut self, origin: [f64; 2]) -> Self {
        self.origin = origin;
        self
    }

    pub fn with_resolution(mut self, resolution: [f64; 2]) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn with_tile_size(mut self, tile_size: [u32; 2]) -> Self {
        self.tile_size = tile_size;
        self
    }

    pub fn with_geo_keys(mut self, keys: GeoKeys) -> Self {
        self.geo_keys = Some(keys);
        self
    }

    pub fn bands(&self) -> &[SampleBuffer] {
        &self.bands
    }
}

#[async_trait]
impl RasterImage for MemoryImage {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn bounding_box(&self) -> BoundingBox {
        let x1 = self.origin[0] + self.width as f64 * self.resolution[0];
        let y1 = self.origin[1] + self.height as f64 * self.resolution[1];
        BoundingBox::new(
            self.origin[0].min(x1),
            self.origin[1].min(y1),
            self.origin[0].max(x1),
            self.origin[1].max(y1),
        )
    }

    fn origin(&self) -> [f64; 2] {
        self.origin
    }

    fn resolution(&self) -> [f64; 2] {
        self.resolution
    }

    fn tile_size(&self) -> [u32; 2] {
        self.tile_size
    }

    fn samples_per_pixel(&self) -> u16 {
        self.bands.len() as u16
    }

    fn geo_keys(&self) -> Option<GeoKeys> {
        self.geo_keys
    }

    async fn read_window(&self, window: PixelWindow) -> Result<Vec<SampleBuffer>> {
        let expected = self.width as usize * self.height as usize;
        self.bands
            .iter()
            .enumerate()
            .map(|(i, band)| {
                if band.len() != expected {
                    return Err(CompositorError::read(format!(
                        "band {} holds {} samples, expected {}",
                        i,
                        band.len(),
                        expected
                    )));
                }
                Ok(band.window(self.width, self.height, window))
            })
            .collect()
    }
}

/// A pyramid of [`MemoryImage`]s, full resolution first.
#[derive(Debug, Clone, Default)]
pub struct MemoryRaster {
    images: Vec<Arc<MemoryImage>>,
}

impl MemoryRaster {
    pub fn new(images: Vec<MemoryImage>) -> Self {
        Self {
            images: images.into_iter().map(Arc::new).collect(),
        }
    }
}

#[async_trait]
impl RasterContainer for MemoryRaster {
    async fn image_count(&self) -> Result<usize> {
        Ok(self.images.len())
    }

    async fn image(&self, index: usize) -> Result<Arc<dyn RasterImage>> {
        self.images
            .get(index)
            .map(|image| image.clone() as Arc<dyn RasterImage>)
            .ok_or_else(|| CompositorError::read(format!("image {} does not exist", index)))
    }
}

/// Resolves locators to registered [`MemoryRaster`]s.
#[derive(Debug, Clone, Default)]
pub struct MemoryOpener {
    rasters: HashMap<String, Arc<MemoryRaster>>,
}

impl MemoryOpener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_raster(mut self, url: impl Into<String>, raster: MemoryRaster) -> Self {
        self.insert(url, raster);
        self
    }

    pub fn insert(&mut self, url: impl Into<String>, raster: MemoryRaster) {
        self.rasters.insert(url.into(), Arc::new(raster));
    }
}

impl MemoryOpener {
    fn lookup(&self, url: &str) -> Result<&Arc<MemoryRaster>> {
        self.rasters
            .get(url)
            .ok_or_else(|| CompositorError::NotFound(url.to_string()))
    }
}

#[async_trait]
impl RasterOpener for MemoryOpener {
    /// Open `url`, appending the images of each overview raster after the
    /// primary pyramid in declared order.
    async fn open(&self, url: &str, overviews: &[String]) -> Result<Arc<dyn RasterContainer>> {
        let primary = self.lookup(url)?;
        if overviews.is_empty() {
            return Ok(primary.clone() as Arc<dyn RasterContainer>);
        }

        let mut images = primary.images.clone();
        for overview in overviews {
            images.extend(self.lookup(overview)?.images.iter().cloned());
        }

        debug!(url = %url, overviews = overviews.len(), images = images.len(), "Merged external overviews");
        Ok(Arc::new(MemoryRaster { images }))
    }
}
