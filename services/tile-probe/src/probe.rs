//! Probe commands.

use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use reqwest::Client;
use tracing::{info, instrument, warn};

use gpu_texture::TileTexture;
use raster_compositor::{
    CompositorOptions, GeoKeys, MemoryImage, MemoryOpener, MemoryRaster, RasterCompositor, SampleBuffer,
    SourceDescriptor, SourceState,
};
use tile_common::{Tile, TileCoord, TileData, TileGrid};
use tms_resolver::{HttpFetcher, ResolverState, TileMatrixSetResolver};

use crate::config::ProbeProfile;
use crate::gpu::HeadlessGpu;

/// Number of sample URLs printed per level.
const SAMPLE_URLS: usize = 4;

/// Resolve the profile's tile matrix set.
pub async fn resolve(profile: &ProbeProfile) -> Result<TileMatrixSetResolver> {
    let fetcher = HttpFetcher::new(&profile.fetch_config()).context("Failed to create HTTP client")?;
    let mut resolver = TileMatrixSetResolver::new(profile.resolver_options()?);

    if resolver.resolve(&fetcher).await != ResolverState::Ready {
        let reason = resolver
            .error()
            .map(|e| e.to_string())
            .unwrap_or_else(|| "unknown error".to_string());
        bail!("Failed to resolve {}: {}", profile.tile_matrix_set, reason);
    }
    Ok(resolver)
}

/// Print the grid levels and a few tile URLs of `sample_level`.
pub fn print_summary(resolver: &TileMatrixSetResolver, sample_level: u32) -> Result<()> {
    let grid = resolver
        .tile_grid()
        .ok_or_else(|| anyhow!("resolver has no tile grid"))?;
    let urls = resolver
        .tile_url_function()
        .ok_or_else(|| anyhow!("resolver has no tile URL function"))?;

    match resolver.projection() {
        Some(crs) => println!("projection: {}", crs),
        None => println!("projection: unknown"),
    }
    if let Some(extent) = grid.extent() {
        println!("extent: {:?} ({:.3} x {:.3})", extent.to_array(), extent.width(), extent.height());
    }
    println!("template: {}", urls.template());
    println!();
    print_levels(&grid);

    println!();
    let Some(range) = grid.full_tile_range(sample_level) else {
        warn!(level = sample_level, "Sample level is outside the grid");
        return Ok(());
    };
    for coord in range.iter().take(SAMPLE_URLS) {
        match urls.url_for(&coord) {
            Some(url) => println!("{} {}", coord, url),
            None => println!("{} (outside limits)", coord),
        }
    }
    info!(level = sample_level, tiles = range.count(), "Printed sample URLs");
    Ok(())
}

fn print_levels(grid: &TileGrid) {
    println!(
        "{:>5} {:>20} {:>12} {:>10} {:>40}",
        "level", "resolution", "matrix", "tile", "origin"
    );
    for (z, level) in grid.levels().iter().enumerate() {
        println!(
            "{:>5} {:>20.6} {:>12} {:>10} {:>40}",
            z,
            level.resolution,
            format!("{}x{}", level.matrix_size[0], level.matrix_size[1]),
            format!("{}x{}", level.tile_size[0], level.tile_size[1]),
            format!("[{:.3}, {:.3}]", level.origin[0], level.origin[1]),
        );
    }
}

/// Download one tile, push it through a texture and optionally save it.
#[instrument(skip(profile, resolver))]
pub async fn fetch_tile(
    profile: &ProbeProfile,
    resolver: &TileMatrixSetResolver,
    coord: TileCoord,
    output: Option<&Path>,
) -> Result<()> {
    let url = resolver
        .tile_url_function()
        .and_then(|urls| urls.url_for(&coord))
        .ok_or_else(|| anyhow!("tile {} is outside the tile matrix set", coord))?;

    let client = profile
        .fetch_config()
        .build_client()
        .context("Failed to create HTTP client")?;

    let tile = Tile::new(coord);
    let gpu = Arc::new(HeadlessGpu::new());
    let mut texture = TileTexture::new(tile.clone(), gpu.clone())?;

    tile.load_with(download_image(&client, &url)).await;
    let updated = texture.sync()?;

    info!(
        tile = %coord,
        updated,
        uploads = gpu.upload_count(),
        bytes = gpu.uploaded_bytes(),
        "Tile texture ready"
    );

    save_tile(&tile, output)?;
    texture.dispose();
    Ok(())
}

async fn download_image(client: &Client, url: &str) -> Result<TileData> {
    info!(url = %url, "Downloading tile");
    let response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("Request failed: {}", url))?;

    let status = response.status();
    if !status.is_success() {
        bail!("{} returned HTTP {}", url, status.as_u16());
    }

    let body = response.bytes().await.context("Failed to read tile body")?;
    let image = image::load_from_memory(&body).context("Failed to decode tile image")?;
    Ok(TileData::Image(image.to_rgba8()))
}

/// Composite a tile from a synthetic in-memory raster.
#[instrument(skip(output))]
pub async fn composite_demo(
    coord: TileCoord,
    source_count: usize,
    nodata: Option<f64>,
    output: Option<&Path>,
) -> Result<()> {
    let mut opener = MemoryOpener::new();
    let mut sources = Vec::with_capacity(source_count);
    for i in 0..source_count {
        let url = format!("memory://band{}", i);
        opener.insert(url.clone(), synthetic_raster(i as u32));
        let source = SourceDescriptor::new(url);
        sources.push(match nodata {
            Some(value) => source.with_nodata(value),
            None => source,
        });
    }

    let mut compositor = RasterCompositor::new(sources, CompositorOptions::default())?;
    if compositor.configure(&opener).await? != SourceState::Ready {
        let reason = compositor
            .error()
            .map(|e| e.to_string())
            .unwrap_or_else(|| "unknown error".to_string());
        bail!("Compositor failed to configure: {}", reason);
    }

    if let Some(grid) = compositor.tile_grid() {
        print_levels(&grid);
    }

    let tile = Tile::new(coord);
    let gpu = Arc::new(HeadlessGpu::new());
    let mut texture = TileTexture::new(tile.clone(), gpu.clone())?;

    compositor.load_into(&tile).await;
    if !texture.sync()? {
        bail!("Tile {} did not load: {:?}", coord, tile.state());
    }

    info!(
        tile = %coord,
        bands = compositor.band_count(),
        bytes = gpu.uploaded_bytes(),
        "Composited tile uploaded"
    );

    save_tile(&tile, output)?;
    texture.dispose();
    Ok(())
}

/// A 1024x1024 three level pyramid whose samples form a diagonal gradient.
/// Pixels on the outer border are 0.
fn synthetic_raster(phase: u32) -> MemoryRaster {
    const SIZE: u32 = 1024;
    const LEVELS: u32 = 3;

    let images = (0..LEVELS)
        .map(|level| {
            let size = SIZE >> level;
            let resolution = (1u32 << level) as f64;
            let band: Vec<u8> = (0..size)
                .flat_map(|y| {
                    (0..size).map(move |x| {
                        if x == 0 || y == 0 || x == size - 1 || y == size - 1 {
                            0
                        } else {
                            ((x + y + phase * 64) % 255 + 1) as u8
                        }
                    })
                })
                .collect();
            MemoryImage::new(size, size, vec![SampleBuffer::U8(band)])
                .with_origin([0.0, SIZE as f64])
                .with_resolution([resolution, -resolution])
                .with_tile_size([256, 256])
                .with_geo_keys(GeoKeys::projected(3857))
        })
        .collect();
    MemoryRaster::new(images)
}

/// Write a loaded tile to `output` as PNG.
fn save_tile(tile: &Tile, output: Option<&Path>) -> Result<()> {
    let Some(path) = output else {
        return Ok(());
    };
    let data = tile
        .data()
        .ok_or_else(|| anyhow!("tile {} is not loaded", tile.coord()))?;

    match data.as_ref() {
        TileData::Image(image) => image
            .save(path)
            .with_context(|| format!("Failed to write {:?}", path))?,
        TileData::Samples { width, height, data: bytes } => {
            let color = match data.bytes_per_pixel() {
                Some(1) => image::ColorType::L8,
                Some(2) => image::ColorType::La8,
                Some(3) => image::ColorType::Rgb8,
                Some(4) => image::ColorType::Rgba8,
                other => bail!("cannot save tile with {:?} bytes per pixel", other),
            };
            image::save_buffer(path, bytes, *width, *height, color)
                .with_context(|| format!("Failed to write {:?}", path))?;
        }
    }

    info!(path = %path.display(), "Saved tile");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_synthetic_raster_border_is_transparent() {
        let opener = MemoryOpener::new().with_raster("memory://band0", synthetic_raster(0));
        let source = SourceDescriptor::new("memory://band0").with_nodata(0.0);
        let mut compositor = RasterCompositor::new(vec![source], CompositorOptions::default()).unwrap();
        assert_eq!(compositor.configure(&opener).await.unwrap(), SourceState::Ready);

        // Level 0 is the coarsest image, a single 256x256 tile
        let tile = compositor.load_tile(0, 0, 0).await.unwrap();
        assert_eq!(tile.pixel(0, 0), &[0, 0, 0, 0]);
        assert_eq!(tile.pixel(1, 1)[3], 255);
    }

    #[test]
    fn test_save_composited_tile() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tile.png");
        let tile = Tile::loaded(
            TileCoord::new(0, 0, 0),
            TileData::Samples {
                width: 2,
                height: 2,
                data: vec![10, 255, 20, 255, 30, 0, 40, 255],
            },
        );

        save_tile(&tile, Some(&path)).unwrap();
        let saved = image::open(&path).unwrap();
        assert_eq!(saved.color(), image::ColorType::La8);
        assert_eq!((saved.width(), saved.height()), (2, 2));
    }

    #[test]
    fn test_save_requires_loaded_tile() {
        let dir = tempfile::tempdir().unwrap();
        let tile = Tile::new(TileCoord::new(0, 0, 0));
        assert!(save_tile(&tile, Some(&dir.path().join("tile.png"))).is_err());
        assert!(save_tile(&tile, None).is_ok());
    }

    #[tokio::test]
    async fn test_composite_demo_writes_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("composite.png");

        composite_demo(TileCoord::new(2, 1, 1), 3, Some(0.0), Some(&path))
            .await
            .unwrap();

        let saved = image::open(&path).unwrap();
        assert_eq!(saved.color(), image::ColorType::Rgba8);
        assert_eq!((saved.width(), saved.height()), (256, 256));
    }
}
