//! Abstractions over tiled, pyramidal raster containers.
//!
//! Concrete formats (GeoTIFF, COG over HTTP range requests, ...) implement
//! these traits; the compositor only sees images, windows and samples.

use std::sync::Arc;

use async_trait::async_trait;

use tile_common::BoundingBox;

use crate::error::Result;
use crate::samples::SampleBuffer;

/// GeoTIFF "user-defined" key value, meaning no EPSG code is declared.
pub const USER_DEFINED_KEY: u32 = 32767;

/// Pixel-space rectangle, right and bottom exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelWindow {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl PixelWindow {
    pub fn new(left: u32, top: u32, width: u32, height: u32) -> Self {
        Self {
            left,
            top,
            right: left + width,
            bottom: top + height,
        }
    }

    pub fn width(&self) -> u32 {
        self.right - self.left
    }

    pub fn height(&self) -> u32 {
        self.bottom - self.top
    }

    pub fn pixel_count(&self) -> usize {
        self.width() as usize * self.height() as usize
    }
}

/// CRS keys carried by a raster image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GeoKeys {
    pub projected_type: Option<u32>,
    pub geographic_type: Option<u32>,
}

impl GeoKeys {
    pub fn projected(code: u32) -> Self {
        Self {
            projected_type: Some(code),
            geographic_type: None,
        }
    }

    pub fn geographic(code: u32) -> Self {
        Self {
            projected_type: None,
            geographic_type: Some(code),
        }
    }

    /// The projected code if present, otherwise the geographic one.
    pub fn epsg_code(&self) -> Option<u32> {
        let declared = |code: Option<u32>| code.filter(|c| *c != 0 && *c != USER_DEFINED_KEY);
        declared(self.projected_type).or(declared(self.geographic_type))
    }
}

/// One resolution level of a raster.
#[async_trait]
pub trait RasterImage: Send + Sync {
    fn width(&self) -> u32;

    fn height(&self) -> u32;

    /// Map-space extent covered by the image.
    fn bounding_box(&self) -> BoundingBox;

    /// Map coordinate of the top-left pixel corner.
    fn origin(&self) -> [f64; 2];

    /// Map units per pixel along x and y. Y is negative for north-up images.
    fn resolution(&self) -> [f64; 2];

    /// Internal tile size in pixels.
    fn tile_size(&self) -> [u32; 2];

    fn samples_per_pixel(&self) -> u16;

    fn geo_keys(&self) -> Option<GeoKeys>;

    /// Read every band over `window`, one buffer per band.
    ///
    /// Parts of the window beyond the image edge come back as zero.
    async fn read_window(&self, window: PixelWindow) -> Result<Vec<SampleBuffer>>;
}

/// A raster file (plus its overviews) exposing an ordered list of images,
/// full resolution first.
#[async_trait]
pub trait RasterContainer: Send + Sync {
    async fn image_count(&self) -> Result<usize>;

    async fn image(&self, index: usize) -> Result<Arc<dyn RasterImage>>;
}

/// Opens raster containers by locator.
#[async_trait]
pub trait RasterOpener: Send + Sync {
    /// Open `url`, including any external `overviews`.
    async fn open(&self, url: &str, overviews: &[String]) -> Result<Arc<dyn RasterContainer>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_dimensions() {
        let window = PixelWindow::new(256, 512, 256, 256);
        assert_eq!(window.right, 512);
        assert_eq!(window.bottom, 768);
        assert_eq!(window.pixel_count(), 65536);
    }

    #[test]
    fn test_geo_keys_prefer_projected() {
        let keys = GeoKeys {
            projected_type: Some(3857),
            geographic_type: Some(4326),
        };
        assert_eq!(keys.epsg_code(), Some(3857));
        assert_eq!(GeoKeys::geographic(4326).epsg_code(), Some(4326));
    }

    #[test]
    fn test_geo_keys_user_defined() {
        let keys = GeoKeys {
            projected_type: Some(USER_DEFINED_KEY),
            geographic_type: Some(4269),
        };
        assert_eq!(keys.epsg_code(), Some(4269));
        assert_eq!(GeoKeys::default().epsg_code(), None);
    }
}
