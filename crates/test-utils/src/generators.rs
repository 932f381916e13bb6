//! Test data generators for synthetic rasters and tiles.
//!
//! These generators create predictable, verifiable patterns that can be
//! used across the test suite.

use image::RgbaImage;

use raster_compositor::{GeoKeys, MemoryImage, MemoryRaster, SampleBuffer};
use tile_common::{Tile, TileCoord, TileData};

/// Creates a test band with predictable values.
///
/// Each sample is `col * 100 + row`, which makes it easy to check that a
/// window was cut from the right place.
///
/// # Example
///
/// ```
/// use test_utils::create_test_grid;
///
/// let grid = create_test_grid(10, 5);
/// assert_eq!(grid.len(), 50);
/// assert_eq!(grid[1], 100);  // col=1, row=0
/// assert_eq!(grid[10], 1);   // col=0, row=1
/// ```
pub fn create_test_grid(width: usize, height: usize) -> Vec<u16> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            data.push((col * 100 + row) as u16);
        }
    }
    data
}

/// Creates an 8-bit band ramping from 0 on the left to 255 on the right.
pub fn create_gradient_band(width: usize, height: usize) -> Vec<u8> {
    let mut data = Vec::with_capacity(width * height);
    for _row in 0..height {
        for col in 0..width {
            let value = (col * 255) / width.saturating_sub(1).max(1);
            data.push(value.min(255) as u8);
        }
    }
    data
}

/// Creates an 8-bit band filled with `value`, with `nodata` at the given
/// `(col, row)` positions.
pub fn create_band_with_nodata(
    width: usize,
    height: usize,
    value: u8,
    nodata: u8,
    positions: &[(usize, usize)],
) -> Vec<u8> {
    let mut data = vec![value; width * height];
    for &(col, row) in positions {
        if col < width && row < height {
            data[row * width + col] = nodata;
        }
    }
    data
}

/// Creates RGBA pixel data for a simple gradient pattern.
pub fn create_test_rgba_pixels(width: usize, height: usize) -> Vec<u8> {
    let mut pixels = Vec::with_capacity(width * height * 4);
    for y in 0..height {
        for x in 0..width {
            let r = ((x as f32 / width as f32) * 255.0) as u8;
            let g = ((y as f32 / height as f32) * 255.0) as u8;
            pixels.extend_from_slice(&[r, g, 128, 255]);
        }
    }
    pixels
}

/// A decoded RGBA test image.
pub fn create_test_image(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_raw(
        width,
        height,
        create_test_rgba_pixels(width as usize, height as usize),
    )
    .unwrap()
}

/// Builds a raster pyramid, full resolution first.
///
/// Level `l` is `width >> l` by `height >> l` pixels at resolution `2^l`,
/// all sharing the top-left corner `[0, height]` so extents line up.
/// `bands(w, h)` supplies the samples of each level.
pub fn create_pyramid<F>(
    width: u32,
    height: u32,
    levels: u32,
    tile_size: u32,
    bands: F,
) -> MemoryRaster
where
    F: Fn(u32, u32) -> Vec<SampleBuffer>,
{
    let images = (0..levels)
        .map(|level| {
            let w = width >> level;
            let h = height >> level;
            let resolution = (1u32 << level) as f64;
            MemoryImage::new(w, h, bands(w, h))
                .with_origin([0.0, height as f64])
                .with_resolution([resolution, -resolution])
                .with_tile_size([tile_size, tile_size])
                .with_geo_keys(GeoKeys::projected(3857))
        })
        .collect();
    MemoryRaster::new(images)
}

/// A pyramid with `band_count` gradient bands of 8-bit samples.
pub fn create_u8_pyramid(
    width: u32,
    height: u32,
    levels: u32,
    tile_size: u32,
    band_count: usize,
) -> MemoryRaster {
    create_pyramid(width, height, levels, tile_size, |w, h| {
        (0..band_count)
            .map(|_| SampleBuffer::U8(create_gradient_band(w as usize, h as usize)))
            .collect()
    })
}

/// A pyramid of one constant 8-bit band.
pub fn create_constant_pyramid(
    width: u32,
    height: u32,
    levels: u32,
    tile_size: u32,
    value: u8,
) -> MemoryRaster {
    create_pyramid(width, height, levels, tile_size, |w, h| {
        vec![SampleBuffer::U8(vec![value; (w * h) as usize])]
    })
}

/// A loaded tile holding `bytes_per_pixel`-wide zeroed samples.
pub fn create_loaded_tile(coord: TileCoord, width: u32, height: u32, bytes_per_pixel: usize) -> Tile {
    Tile::loaded(
        coord,
        TileData::Samples {
            width,
            height,
            data: vec![0; width as usize * height as usize * bytes_per_pixel],
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_test_grid() {
        let grid = create_test_grid(3, 2);
        assert_eq!(grid, vec![0, 100, 200, 1, 101, 201]);
    }

    #[test]
    fn test_gradient_band_spans_full_range() {
        let band = create_gradient_band(256, 1);
        assert_eq!(band[0], 0);
        assert_eq!(band[255], 255);
    }

    #[test]
    fn test_band_with_nodata() {
        let band = create_band_with_nodata(2, 2, 7, 0, &[(1, 1), (5, 5)]);
        assert_eq!(band, vec![7, 7, 7, 0]);
    }

    #[test]
    fn test_test_image_dimensions() {
        let image = create_test_image(8, 4);
        assert_eq!(image.dimensions(), (8, 4));
    }
}
