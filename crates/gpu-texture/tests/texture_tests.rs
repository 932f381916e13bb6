//! Tile texture lifecycle against a recording GPU context.

use std::sync::Arc;

use gpu_texture::{GpuError, PixelFormat, TextureEvent, TileTexture, TileTextureCache, TILE_QUAD};
use test_utils::{create_loaded_tile, create_test_image, GpuCall, RecordingGpu};
use tile_common::{Tile, TileCoord, TileData, TileState};

fn samples(width: u32, height: u32, bytes_per_pixel: usize) -> TileData {
    TileData::Samples {
        width,
        height,
        data: vec![7; width as usize * height as usize * bytes_per_pixel],
    }
}

#[test]
fn test_loaded_tile_uploads_immediately() {
    let gpu = Arc::new(RecordingGpu::new());
    let tile = create_loaded_tile(TileCoord::new(3, 1, 2), 256, 256, 4);

    let texture = TileTexture::new(tile, gpu.clone()).unwrap();

    assert!(texture.is_loaded());
    assert!(!texture.is_listening());
    assert_eq!(gpu.textures_created(), 1);
    assert_eq!(gpu.buffers_created(), 1);
    assert_eq!(gpu.upload_count(), 1);
    assert_eq!(gpu.data_upload_count(), 1);

    let quad: Vec<u32> = TILE_QUAD.iter().map(|v| v.to_bits()).collect();
    assert!(gpu
        .calls()
        .contains(&GpuCall::CreateBuffer { buffer: 1, vertices: quad }));
}

#[test]
fn test_image_tiles_use_image_upload() {
    let gpu = Arc::new(RecordingGpu::new());
    let tile = Tile::loaded(TileCoord::new(0, 0, 0), TileData::Image(create_test_image(256, 256)));

    let _texture = TileTexture::new(tile, gpu.clone()).unwrap();

    assert!(gpu.calls().iter().any(|c| matches!(
        c,
        GpuCall::UploadImage { width: 256, height: 256, .. }
    )));
}

#[test]
fn test_pixel_format_follows_bytes_per_pixel() {
    for (bpp, format) in [
        (1, PixelFormat::Luminance),
        (3, PixelFormat::Rgb),
        (4, PixelFormat::Rgba),
    ] {
        let gpu = Arc::new(RecordingGpu::new());
        let tile = create_loaded_tile(TileCoord::new(0, 0, 0), 4, 4, bpp);
        let _texture = TileTexture::new(tile, gpu.clone()).unwrap();

        match gpu.last_pixel_upload() {
            Some(GpuCall::UploadPixels { format: uploaded, width: 4, height: 4, .. }) => {
                assert_eq!(uploaded, format)
            }
            other => panic!("unexpected upload: {:?}", other),
        }
    }
}

#[test]
fn test_unsupported_bytes_per_pixel() {
    for bpp in [2usize, 5] {
        let gpu = Arc::new(RecordingGpu::new());
        let tile = create_loaded_tile(TileCoord::new(0, 0, 0), 4, 4, bpp);

        let err = TileTexture::new(tile, gpu.clone()).unwrap_err();
        assert_eq!(err, GpuError::UnsupportedPixelFormat(bpp));
        // Partially created resources are released
        assert_eq!(gpu.live_resources(), 0);
    }
}

#[test]
fn test_pending_tile_gets_placeholder_then_one_upload() {
    let gpu = Arc::new(RecordingGpu::new());
    let tile = Tile::new(TileCoord::new(2, 0, 1));

    let mut texture = TileTexture::new(tile.clone(), gpu.clone()).unwrap();
    let mut events = texture.subscribe();

    assert!(!texture.is_loaded());
    assert!(texture.is_listening());
    assert_eq!(gpu.upload_count(), 1);
    assert_eq!(gpu.data_upload_count(), 0);
    assert_eq!(
        gpu.last_pixel_upload(),
        Some(GpuCall::UploadPixels {
            texture: 2,
            width: 1,
            height: 1,
            format: PixelFormat::Rgba,
            data: vec![0, 0, 0, 0],
        })
    );

    // Loading is not terminal
    tile.set_state(TileState::Loading);
    assert!(!texture.sync().unwrap());
    assert!(texture.is_listening());

    tile.set_state(TileState::Loaded(Arc::new(samples(256, 256, 4))));
    assert!(texture.sync().unwrap());
    assert!(texture.is_loaded());
    assert!(!texture.is_listening());
    assert_eq!(gpu.data_upload_count(), 1);
    assert_eq!(events.try_recv().unwrap(), TextureEvent::Updated(TileCoord::new(2, 0, 1)));

    // Nothing further happens once loaded
    tile.set_state(TileState::Loaded(Arc::new(samples(256, 256, 4))));
    assert!(!texture.sync().unwrap());
    assert_eq!(gpu.data_upload_count(), 1);
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn test_changed_waits_for_completion() {
    let gpu = Arc::new(RecordingGpu::new());
    let tile = Tile::new(TileCoord::new(1, 1, 1));
    let mut texture = TileTexture::new(tile.clone(), gpu.clone()).unwrap();
    let mut events = texture.subscribe();

    let loader = tile.clone();
    let handle = tokio::spawn(async move {
        loader
            .load_with(async { Ok::<_, String>(samples(8, 8, 3)) })
            .await;
    });

    assert!(texture.changed().await.unwrap());
    handle.await.unwrap();

    assert!(texture.is_loaded());
    assert_eq!(gpu.data_upload_count(), 1);
    assert_eq!(events.recv().await.unwrap(), TextureEvent::Updated(TileCoord::new(1, 1, 1)));
}

#[test]
fn test_changed_stays_pending_while_loading() {
    let gpu = Arc::new(RecordingGpu::new());
    let tile = Tile::new(TileCoord::new(3, 0, 0));
    let mut texture = TileTexture::new(tile.clone(), gpu.clone()).unwrap();

    let mut changed = tokio_test::task::spawn(texture.changed());
    tokio_test::assert_pending!(changed.poll());

    tile.set_state(TileState::Loading);
    tokio_test::assert_pending!(changed.poll());

    tile.set_state(TileState::Empty);
    assert!(!tokio_test::assert_ready_ok!(changed.poll()));
    drop(changed);

    assert!(!texture.is_listening());
    assert_eq!(gpu.data_upload_count(), 0);
}

#[test]
fn test_failed_tile_keeps_placeholder() {
    let gpu = Arc::new(RecordingGpu::new());
    let tile = Tile::new(TileCoord::new(0, 0, 0));
    let mut texture = TileTexture::new(tile.clone(), gpu.clone()).unwrap();

    tile.set_state(TileState::Error("404".to_string()));
    assert!(!texture.sync().unwrap());
    assert!(!texture.is_loaded());
    assert!(!texture.is_listening());
    assert_eq!(gpu.upload_count(), 1);
}

#[test]
fn test_dispose_before_completion() {
    let gpu = Arc::new(RecordingGpu::new());
    let tile = Tile::new(TileCoord::new(4, 2, 2));
    let mut texture = TileTexture::new(tile.clone(), gpu.clone()).unwrap();
    assert_eq!(tile.listener_count(), 1);

    texture.dispose();
    assert!(texture.is_disposed());
    assert_eq!(tile.listener_count(), 0);
    assert_eq!(gpu.textures_deleted(), 1);
    assert_eq!(gpu.buffers_deleted(), 1);

    // A late completion is ignored
    tile.set_state(TileState::Loaded(Arc::new(samples(256, 256, 4))));
    assert!(!texture.sync().unwrap());
    assert_eq!(gpu.data_upload_count(), 0);
}

#[test]
fn test_dispose_is_idempotent() {
    let gpu = Arc::new(RecordingGpu::new());
    let tile = create_loaded_tile(TileCoord::new(0, 0, 0), 2, 2, 4);

    let mut texture = TileTexture::new(tile, gpu.clone()).unwrap();
    texture.dispose();
    texture.dispose();
    drop(texture);

    assert_eq!(gpu.textures_deleted(), 1);
    assert_eq!(gpu.buffers_deleted(), 1);
    assert_eq!(gpu.live_resources(), 0);
}

#[test]
fn test_drop_releases_resources() {
    let gpu = Arc::new(RecordingGpu::new());
    {
        let _texture = TileTexture::new(Tile::new(TileCoord::new(0, 0, 0)), gpu.clone()).unwrap();
        assert_eq!(gpu.live_resources(), 2);
    }
    assert_eq!(gpu.live_resources(), 0);
}

#[test]
fn test_upload_failure_is_reported() {
    let gpu = Arc::new(RecordingGpu::failing_uploads());
    let err = TileTexture::new(Tile::new(TileCoord::new(0, 0, 0)), gpu.clone()).unwrap_err();

    assert!(matches!(err, GpuError::Backend(_)));
    assert_eq!(gpu.live_resources(), 0);
}

#[test]
fn test_failed_upload_keeps_texture_pending() {
    let gpu = Arc::new(RecordingGpu::new());
    let tile = Tile::new(TileCoord::new(2, 1, 1));
    let mut texture = TileTexture::new(tile.clone(), gpu.clone()).unwrap();
    let mut events = texture.subscribe();

    gpu.set_fail_uploads(true);
    tile.set_state(TileState::Loaded(Arc::new(samples(16, 16, 4))));
    assert!(matches!(texture.sync(), Err(GpuError::Backend(_))));
    assert!(!texture.is_loaded());
    assert!(texture.is_listening());
    assert!(events.try_recv().is_err());

    // A later completion is still applied
    gpu.set_fail_uploads(false);
    tile.set_state(TileState::Loaded(Arc::new(samples(16, 16, 4))));
    assert!(texture.sync().unwrap());
    assert!(texture.is_loaded());
    assert_eq!(gpu.data_upload_count(), 1);
    assert_eq!(events.try_recv().unwrap(), TextureEvent::Updated(TileCoord::new(2, 1, 1)));
}

#[test]
fn test_unsupported_completion_is_not_loaded() {
    let gpu = Arc::new(RecordingGpu::new());
    let tile = Tile::new(TileCoord::new(0, 0, 0));
    let mut texture = TileTexture::new(tile.clone(), gpu.clone()).unwrap();

    tile.set_state(TileState::Loaded(Arc::new(samples(4, 4, 2))));
    assert_eq!(texture.sync().unwrap_err(), GpuError::UnsupportedPixelFormat(2));
    assert!(!texture.is_loaded());
    assert_eq!(gpu.data_upload_count(), 0);
}

#[test]
fn test_cache_reuses_textures() {
    let gpu = Arc::new(RecordingGpu::new());
    let mut cache = TileTextureCache::new(gpu.clone(), 8);
    let tile = Tile::new(TileCoord::new(1, 0, 0));

    cache.get_or_create(&tile).unwrap();
    cache.get_or_create(&tile).unwrap();

    assert_eq!(cache.len(), 1);
    assert_eq!(gpu.textures_created(), 1);
    assert_eq!(cache.stats().hits, 1);
    assert_eq!(cache.stats().misses, 1);
}

#[test]
fn test_cache_replaces_texture_of_reloaded_tile() {
    let gpu = Arc::new(RecordingGpu::new());
    let mut cache = TileTextureCache::new(gpu.clone(), 8);
    let coord = TileCoord::new(1, 0, 0);

    cache.get_or_create(&Tile::new(coord)).unwrap();
    let texture = cache.get_or_create(&create_loaded_tile(coord, 2, 2, 4)).unwrap();
    assert!(texture.is_loaded());

    assert_eq!(cache.len(), 1);
    assert_eq!(gpu.textures_created(), 2);
    assert_eq!(gpu.textures_deleted(), 1);
}

#[test]
fn test_cache_sync_all_reports_updates() {
    let gpu = Arc::new(RecordingGpu::new());
    let mut cache = TileTextureCache::new(gpu.clone(), 8);

    let tiles: Vec<Tile> = (0..3).map(|x| Tile::new(TileCoord::new(2, x, 0))).collect();
    for tile in &tiles {
        cache.get_or_create(tile).unwrap();
    }

    tiles[1].set_state(TileState::Loaded(Arc::new(samples(4, 4, 1))));
    assert_eq!(cache.sync_all(), vec![TileCoord::new(2, 1, 0)]);
    assert!(cache.sync_all().is_empty());
}

#[test]
fn test_cache_retain_and_expire() {
    let gpu = Arc::new(RecordingGpu::new());
    let mut cache = TileTextureCache::new(gpu.clone(), 2);

    for x in 0..4 {
        cache.get_or_create(&Tile::new(TileCoord::new(2, x, 0))).unwrap();
    }
    assert_eq!(cache.len(), 4);

    // Drop tiles leaving the render set
    assert_eq!(cache.retain(|coord| coord.x != 0), 1);
    assert_eq!(cache.len(), 3);

    // Touch x=1 so x=2 is the least recently used
    cache.get(&TileCoord::new(2, 1, 0)).unwrap();
    assert_eq!(cache.expire_cache(), 1);
    assert_eq!(cache.len(), 2);
    assert!(cache.contains(&TileCoord::new(2, 1, 0)));
    assert!(!cache.contains(&TileCoord::new(2, 2, 0)));
    assert_eq!(cache.stats().evictions, 1);

    assert_eq!(gpu.textures_deleted(), 2);
    drop(cache);
    assert_eq!(gpu.live_resources(), 0);
}
