//! Source descriptors and compositor options.

use tile_common::CrsCode;

/// One raster input.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SourceDescriptor {
    /// Locator of the raster container
    pub url: String,
    /// Locators of precomputed lower-resolution overviews
    pub overviews: Vec<String>,
    /// Raw value mapped to 0; defaults to the minimum of the sample type
    pub min: Option<f64>,
    /// Raw value mapped to 255; defaults to the maximum of the sample type
    pub max: Option<f64>,
    /// Raw value meaning "no data here"
    pub nodata: Option<f64>,
}

impl SourceDescriptor {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_overviews(mut self, overviews: Vec<String>) -> Self {
        self.overviews = overviews;
        self
    }

    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    pub fn with_nodata(mut self, nodata: f64) -> Self {
        self.nodata = Some(nodata);
        self
    }

    /// Check a raw sample against the nodata sentinel. NaN matches NaN.
    pub fn is_nodata(&self, value: f64) -> bool {
        match self.nodata {
            Some(nodata) if nodata.is_nan() => value.is_nan(),
            Some(nodata) => value == nodata,
            None => false,
        }
    }
}

/// Compositor-wide settings.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositorOptions {
    /// Target CRS; read from the first source's geo keys when `None`
    pub projection: Option<CrsCode>,
    /// Rescale samples into 0..255. When off, raw values are saturated to u8.
    pub normalize: bool,
}

impl Default for CompositorOptions {
    fn default() -> Self {
        Self {
            projection: None,
            normalize: true,
        }
    }
}
