//! A GPU context that records calls instead of touching hardware.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;

use image::RgbaImage;

use gpu_texture::{GpuContext, GpuError, PixelFormat, TextureParameters};

/// One recorded GPU operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GpuCall {
    CreateTexture(u32),
    UploadImage {
        texture: u32,
        width: u32,
        height: u32,
    },
    UploadPixels {
        texture: u32,
        width: u32,
        height: u32,
        format: PixelFormat,
        data: Vec<u8>,
    },
    DeleteTexture(u32),
    CreateBuffer {
        buffer: u32,
        vertices: Vec<u32>,
    },
    DeleteBuffer(u32),
}

/// Records every call; handles are sequential ids.
#[derive(Debug, Default)]
pub struct RecordingGpu {
    next_id: AtomicU32,
    calls: Mutex<Vec<GpuCall>>,
    fail_uploads: AtomicBool,
}

impl RecordingGpu {
    pub fn new() -> Self {
        Self::default()
    }

    /// A context whose uploads always fail.
    pub fn failing_uploads() -> Self {
        Self {
            fail_uploads: AtomicBool::new(true),
            ..Self::default()
        }
    }

    /// Make subsequent uploads fail or succeed.
    pub fn set_fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::Relaxed);
    }

    fn check_upload(&self) -> Result<(), GpuError> {
        if self.fail_uploads.load(Ordering::Relaxed) {
            return Err(GpuError::Backend("upload rejected".to_string()));
        }
        Ok(())
    }

    pub fn calls(&self) -> Vec<GpuCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Image and pixel uploads, placeholders included.
    pub fn upload_count(&self) -> usize {
        self.count(|c| matches!(c, GpuCall::UploadImage { .. } | GpuCall::UploadPixels { .. }))
    }

    /// Uploads larger than the 1x1 placeholder.
    pub fn data_upload_count(&self) -> usize {
        self.count(|c| match c {
            GpuCall::UploadImage { .. } => true,
            GpuCall::UploadPixels { width, height, .. } => *width * *height > 1,
            _ => false,
        })
    }

    pub fn textures_created(&self) -> usize {
        self.count(|c| matches!(c, GpuCall::CreateTexture(_)))
    }

    pub fn textures_deleted(&self) -> usize {
        self.count(|c| matches!(c, GpuCall::DeleteTexture(_)))
    }

    pub fn buffers_created(&self) -> usize {
        self.count(|c| matches!(c, GpuCall::CreateBuffer { .. }))
    }

    pub fn buffers_deleted(&self) -> usize {
        self.count(|c| matches!(c, GpuCall::DeleteBuffer(_)))
    }

    /// Textures and buffers created but not yet deleted.
    pub fn live_resources(&self) -> usize {
        self.textures_created() + self.buffers_created()
            - self.textures_deleted()
            - self.buffers_deleted()
    }

    /// The most recent pixel upload.
    pub fn last_pixel_upload(&self) -> Option<GpuCall> {
        self.calls()
            .into_iter()
            .rev()
            .find(|c| matches!(c, GpuCall::UploadPixels { .. }))
    }

    fn count(&self, predicate: impl Fn(&GpuCall) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| predicate(c)).count()
    }

    fn record(&self, call: GpuCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn next(&self) -> u32 {
        self.next_id.fetch_add(1, Ordering::Relaxed) + 1
    }
}

impl GpuContext for RecordingGpu {
    type Texture = u32;
    type Buffer = u32;

    fn create_texture(&self, _parameters: &TextureParameters) -> Result<u32, GpuError> {
        let id = self.next();
        self.record(GpuCall::CreateTexture(id));
        Ok(id)
    }

    fn upload_image(&self, texture: &u32, image: &RgbaImage) -> Result<(), GpuError> {
        self.check_upload()?;
        self.record(GpuCall::UploadImage {
            texture: *texture,
            width: image.width(),
            height: image.height(),
        });
        Ok(())
    }

    fn upload_pixels(
        &self,
        texture: &u32,
        width: u32,
        height: u32,
        format: PixelFormat,
        data: &[u8],
    ) -> Result<(), GpuError> {
        self.check_upload()?;
        self.record(GpuCall::UploadPixels {
            texture: *texture,
            width,
            height,
            format,
            data: data.to_vec(),
        });
        Ok(())
    }

    fn delete_texture(&self, texture: u32) {
        self.record(GpuCall::DeleteTexture(texture));
    }

    fn create_buffer(&self, vertices: &[f32]) -> Result<u32, GpuError> {
        let id = self.next();
        self.record(GpuCall::CreateBuffer {
            buffer: id,
            vertices: vertices.iter().map(|v| v.to_bits()).collect(),
        });
        Ok(id)
    }

    fn delete_buffer(&self, buffer: u32) {
        self.record(GpuCall::DeleteBuffer(buffer));
    }
}
