//! [`GpuContext`] over a wgpu device and queue.
//!
//! Textures are stored as `Rgba8Unorm`; luminance and RGB uploads are
//! expanded to four channels on the CPU before the copy.

use std::sync::{Arc, Mutex};

use image::RgbaImage;
use tracing::debug;
use wgpu::util::DeviceExt;

use crate::context::{Filter, GpuContext, PixelFormat, TextureParameters, Wrap};
use crate::error::{GpuError, Result};

/// A texture slot. The backing wgpu texture is (re)allocated on each upload
/// so its size follows the uploaded pixels.
pub struct WgpuTexture {
    sampler: wgpu::Sampler,
    allocation: Mutex<Option<Allocation>>,
}

struct Allocation {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl WgpuTexture {
    pub fn sampler(&self) -> &wgpu::Sampler {
        &self.sampler
    }

    /// Run `f` with the current texture view, if anything was uploaded.
    pub fn with_view<R>(&self, f: impl FnOnce(&wgpu::TextureView) -> R) -> Option<R> {
        let guard = self.allocation.lock().ok()?;
        guard.as_ref().map(|allocation| f(&allocation.view))
    }

    /// Size of the current allocation.
    pub fn size(&self) -> Option<(u32, u32)> {
        let guard = self.allocation.lock().ok()?;
        guard.as_ref().map(|a| (a.texture.width(), a.texture.height()))
    }
}

pub struct WgpuContext {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
}

impl WgpuContext {
    pub fn new(device: Arc<wgpu::Device>, queue: Arc<wgpu::Queue>) -> Self {
        Self { device, queue }
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    fn write_rgba(&self, texture: &WgpuTexture, width: u32, height: u32, rgba: &[u8]) -> Result<()> {
        let expected = width as usize * height as usize * 4;
        if rgba.len() != expected {
            return Err(GpuError::Backend(format!(
                "expected {} bytes for a {}x{} RGBA upload, got {}",
                expected,
                width,
                height,
                rgba.len()
            )));
        }

        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };

        let mut guard = texture
            .allocation
            .lock()
            .map_err(|_| GpuError::Backend("texture lock poisoned".to_string()))?;

        let reuse = guard
            .as_ref()
            .map(|a| a.texture.width() == width && a.texture.height() == height)
            .unwrap_or(false);

        if !reuse {
            if let Some(old) = guard.take() {
                old.texture.destroy();
            }
            let gpu_texture = self.device.create_texture(&wgpu::TextureDescriptor {
                label: Some("tile.texture"),
                size,
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8Unorm,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            });
            let view = gpu_texture.create_view(&wgpu::TextureViewDescriptor::default());
            *guard = Some(Allocation {
                texture: gpu_texture,
                view,
            });
        }

        let Some(allocation) = guard.as_ref() else {
            return Err(GpuError::Backend("texture was not allocated".to_string()));
        };

        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &allocation.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(width * 4),
                rows_per_image: Some(height),
            },
            size,
        );

        Ok(())
    }
}

fn filter_mode(filter: Filter) -> wgpu::FilterMode {
    match filter {
        Filter::Nearest => wgpu::FilterMode::Nearest,
        Filter::Linear => wgpu::FilterMode::Linear,
    }
}

fn address_mode(wrap: Wrap) -> wgpu::AddressMode {
    match wrap {
        Wrap::ClampToEdge => wgpu::AddressMode::ClampToEdge,
        Wrap::Repeat => wgpu::AddressMode::Repeat,
    }
}

/// Expand 1- or 3-channel pixels to RGBA. Luminance fills R, G and B.
pub fn expand_to_rgba(format: PixelFormat, data: &[u8]) -> Vec<u8> {
    match format {
        PixelFormat::Rgba => data.to_vec(),
        PixelFormat::Rgb => data
            .chunks_exact(3)
            .flat_map(|p| [p[0], p[1], p[2], 255])
            .collect(),
        PixelFormat::Luminance => data.iter().flat_map(|v| [*v, *v, *v, 255]).collect(),
    }
}

impl GpuContext for WgpuContext {
    type Texture = WgpuTexture;
    type Buffer = wgpu::Buffer;

    fn create_texture(&self, parameters: &TextureParameters) -> Result<WgpuTexture> {
        let sampler = self.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("tile.sampler"),
            address_mode_u: address_mode(parameters.wrap_s),
            address_mode_v: address_mode(parameters.wrap_t),
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: filter_mode(parameters.mag_filter),
            min_filter: filter_mode(parameters.min_filter),
            ..Default::default()
        });

        Ok(WgpuTexture {
            sampler,
            allocation: Mutex::new(None),
        })
    }

    fn upload_image(&self, texture: &WgpuTexture, image: &RgbaImage) -> Result<()> {
        let (width, height) = image.dimensions();
        self.write_rgba(texture, width, height, image.as_raw())
    }

    fn upload_pixels(
        &self,
        texture: &WgpuTexture,
        width: u32,
        height: u32,
        format: PixelFormat,
        data: &[u8],
    ) -> Result<()> {
        let rgba = expand_to_rgba(format, data);
        self.write_rgba(texture, width, height, &rgba)
    }

    fn delete_texture(&self, texture: WgpuTexture) {
        if let Ok(mut guard) = texture.allocation.lock() {
            if let Some(allocation) = guard.take() {
                allocation.texture.destroy();
            }
        }
    }

    fn create_buffer(&self, vertices: &[f32]) -> Result<wgpu::Buffer> {
        let buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("tile.coords"),
                contents: bytemuck::cast_slice(vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
        debug!(bytes = buffer.size(), "Created tile coordinate buffer");
        Ok(buffer)
    }

    fn delete_buffer(&self, buffer: wgpu::Buffer) {
        buffer.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_luminance() {
        assert_eq!(
            expand_to_rgba(PixelFormat::Luminance, &[7, 9]),
            vec![7, 7, 7, 255, 9, 9, 9, 255]
        );
    }

    #[test]
    fn test_expand_rgb() {
        assert_eq!(expand_to_rgba(PixelFormat::Rgb, &[1, 2, 3]), vec![1, 2, 3, 255]);
    }
}
