//! Headless GPU context.
//!
//! The probe has no window to draw into, so textures are plain ids and
//! uploads are only logged and tallied.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use image::RgbaImage;
use tracing::{debug, info};

use gpu_texture::{GpuContext, GpuError, PixelFormat, TextureParameters};

#[derive(Debug, Default)]
pub struct HeadlessGpu {
    next_id: AtomicU64,
    uploads: AtomicUsize,
    uploaded_bytes: AtomicUsize,
    live: AtomicUsize,
}

impl HeadlessGpu {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upload_count(&self) -> usize {
        self.uploads.load(Ordering::Relaxed)
    }

    pub fn uploaded_bytes(&self) -> usize {
        self.uploaded_bytes.load(Ordering::Relaxed)
    }

    /// Textures and buffers not yet released.
    pub fn live_resources(&self) -> usize {
        self.live.load(Ordering::Relaxed)
    }

    fn allocate(&self) -> u64 {
        self.live.fetch_add(1, Ordering::Relaxed);
        self.next_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn release(&self) {
        self.live.fetch_sub(1, Ordering::Relaxed);
    }

    fn record_upload(&self, bytes: usize) {
        self.uploads.fetch_add(1, Ordering::Relaxed);
        self.uploaded_bytes.fetch_add(bytes, Ordering::Relaxed);
    }
}

impl GpuContext for HeadlessGpu {
    type Texture = u64;
    type Buffer = u64;

    fn create_texture(&self, parameters: &TextureParameters) -> Result<u64, GpuError> {
        let id = self.allocate();
        debug!(texture = id, ?parameters, "Created texture");
        Ok(id)
    }

    fn upload_image(&self, texture: &u64, image: &RgbaImage) -> Result<(), GpuError> {
        self.record_upload(image.as_raw().len());
        info!(
            texture = *texture,
            width = image.width(),
            height = image.height(),
            "Uploaded image"
        );
        Ok(())
    }

    fn upload_pixels(
        &self,
        texture: &u64,
        width: u32,
        height: u32,
        format: PixelFormat,
        data: &[u8],
    ) -> Result<(), GpuError> {
        let expected = width as usize * height as usize * format.bytes_per_pixel();
        if data.len() != expected {
            return Err(GpuError::Backend(format!(
                "expected {} bytes for {}x{} {:?}, got {}",
                expected,
                width,
                height,
                format,
                data.len()
            )));
        }

        self.record_upload(data.len());
        info!(texture = *texture, width, height, ?format, "Uploaded pixels");
        Ok(())
    }

    fn delete_texture(&self, texture: u64) {
        self.release();
        debug!(texture, "Deleted texture");
    }

    fn create_buffer(&self, vertices: &[f32]) -> Result<u64, GpuError> {
        let id = self.allocate();
        debug!(buffer = id, vertices = vertices.len(), "Created buffer");
        Ok(id)
    }

    fn delete_buffer(&self, buffer: u64) {
        self.release();
        debug!(buffer, "Deleted buffer");
    }
}
