//! Multi-source raster compositing.
//!
//! A [`RasterCompositor`] takes one to three co-registered raster sources,
//! checks that their pyramids line up, and turns windowed sample reads into
//! 8-bit channel-interleaved tile buffers ready for GPU upload.
//!
//! # Architecture
//!
//! ```text
//! RasterCompositor::configure(opener)
//!      │
//!      ├─► open every source and enumerate its images (joined)
//!      │
//!      ├─► validate bands / extent / origin / resolutions / tile sizes
//!      │
//!      └─► TileGrid (coarsest level first)
//!
//! RasterCompositor::load_tile(z, x, y)
//!      │
//!      ├─► read the tile window from every source (joined)
//!      │
//!      └─► rescale to 0..255, apply nodata, synthesize alpha
//! ```

pub mod compositor;
pub mod container;
pub mod error;
pub mod memory;
pub mod samples;
pub mod source;

pub use compositor::{CompositedTile, RasterCompositor, SourceState};
pub use container::{GeoKeys, PixelWindow, RasterContainer, RasterImage, RasterOpener};
pub use error::{CompositorError, Result};
pub use memory::{MemoryImage, MemoryOpener, MemoryRaster};
pub use samples::{Rescale, SampleBuffer, SampleType};
pub use source::{CompositorOptions, SourceDescriptor};
