//! The GPU surface seen by tile textures.

use image::RgbaImage;

use crate::error::{GpuError, Result};

/// Layout of raw pixel uploads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// One byte per pixel
    Luminance,
    /// Three bytes per pixel
    Rgb,
    /// Four bytes per pixel
    Rgba,
}

impl PixelFormat {
    pub fn from_bytes_per_pixel(bytes: usize) -> Result<Self> {
        match bytes {
            1 => Ok(PixelFormat::Luminance),
            3 => Ok(PixelFormat::Rgb),
            4 => Ok(PixelFormat::Rgba),
            other => Err(GpuError::UnsupportedPixelFormat(other)),
        }
    }

    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelFormat::Luminance => 1,
            PixelFormat::Rgb => 3,
            PixelFormat::Rgba => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    Nearest,
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wrap {
    ClampToEdge,
    Repeat,
}

/// Sampling state applied to a texture at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureParameters {
    pub min_filter: Filter,
    pub mag_filter: Filter,
    pub wrap_s: Wrap,
    pub wrap_t: Wrap,
    pub mipmaps: bool,
}

/// Clamped, linearly filtered, no mipmaps.
pub const TILE_TEXTURE_PARAMETERS: TextureParameters = TextureParameters {
    min_filter: Filter::Linear,
    mag_filter: Filter::Linear,
    wrap_s: Wrap::ClampToEdge,
    wrap_t: Wrap::ClampToEdge,
    mipmaps: false,
};

/// Texture and buffer operations a tile texture needs.
///
/// Handles are owned values; deleting one consumes it.
pub trait GpuContext: Send + Sync {
    type Texture: Send + Sync;
    type Buffer: Send + Sync;

    fn create_texture(&self, parameters: &TextureParameters) -> Result<Self::Texture>;

    /// Replace the texture contents with a decoded image.
    fn upload_image(&self, texture: &Self::Texture, image: &RgbaImage) -> Result<()>;

    /// Replace the texture contents with raw row-major pixels.
    fn upload_pixels(
        &self,
        texture: &Self::Texture,
        width: u32,
        height: u32,
        format: PixelFormat,
        data: &[u8],
    ) -> Result<()>;

    fn delete_texture(&self, texture: Self::Texture);

    /// Create a vertex buffer holding `vertices`.
    fn create_buffer(&self, vertices: &[f32]) -> Result<Self::Buffer>;

    fn delete_buffer(&self, buffer: Self::Buffer);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_bytes_per_pixel() {
        assert_eq!(PixelFormat::from_bytes_per_pixel(1), Ok(PixelFormat::Luminance));
        assert_eq!(PixelFormat::from_bytes_per_pixel(3), Ok(PixelFormat::Rgb));
        assert_eq!(PixelFormat::from_bytes_per_pixel(4), Ok(PixelFormat::Rgba));
        assert_eq!(
            PixelFormat::from_bytes_per_pixel(2),
            Err(GpuError::UnsupportedPixelFormat(2))
        );
        assert_eq!(
            PixelFormat::from_bytes_per_pixel(5),
            Err(GpuError::UnsupportedPixelFormat(5))
        );
    }
}
