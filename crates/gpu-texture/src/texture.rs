//! One tile bound to one GPU texture.

use std::fmt;
use std::sync::Arc;

use tokio::sync::{broadcast, watch};
use tracing::{debug, warn};

use tile_common::{Tile, TileCoord, TileData, TileState};

use crate::context::{GpuContext, PixelFormat, TILE_TEXTURE_PARAMETERS};
use crate::error::Result;

/// Unit-square corners, counter-clockwise from the origin.
pub const TILE_QUAD: [f32; 8] = [0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0];

/// Fully transparent RGBA pixel shown while a tile loads.
pub const PLACEHOLDER_PIXEL: [u8; 4] = [0, 0, 0, 0];

const EVENT_CAPACITY: usize = 16;

/// Emitted by a [`TileTexture`] when its contents change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureEvent {
    /// The real tile data replaced the placeholder.
    Updated(TileCoord),
}

/// A texture tracking the load state of a tile.
pub struct TileTexture<G: GpuContext> {
    tile: Tile,
    gpu: Arc<G>,
    texture: Option<G::Texture>,
    coords: Option<G::Buffer>,
    loaded: bool,
    listener: Option<watch::Receiver<TileState>>,
    events: broadcast::Sender<TextureEvent>,
    disposed: bool,
}

impl<G: GpuContext> TileTexture<G> {
    /// Create the texture and quad buffer for `tile`.
    ///
    /// A loaded tile is uploaded immediately. Otherwise a transparent
    /// placeholder is uploaded and the texture listens for the tile's
    /// completion.
    pub fn new(tile: Tile, gpu: Arc<G>) -> Result<Self> {
        let coords = gpu.create_buffer(&TILE_QUAD)?;
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        let mut this = Self {
            tile,
            gpu,
            texture: None,
            coords: Some(coords),
            loaded: false,
            listener: None,
            events,
            disposed: false,
        };
        this.texture = Some(this.gpu.create_texture(&TILE_TEXTURE_PARAMETERS)?);

        let mut listener = this.tile.subscribe();
        let loaded = listener.borrow_and_update().is_loaded();

        if loaded {
            this.upload_tile()?;
            this.loaded = true;
        } else {
            this.upload_placeholder()?;
            this.listener = Some(listener);
        }

        Ok(this)
    }

    pub fn tile(&self) -> &Tile {
        &self.tile
    }

    pub fn coord(&self) -> TileCoord {
        self.tile.coord()
    }

    /// True once real tile data has been uploaded.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// True while waiting for the tile to finish loading.
    pub fn is_listening(&self) -> bool {
        self.listener.is_some()
    }

    pub fn texture(&self) -> Option<&G::Texture> {
        self.texture.as_ref()
    }

    pub fn coords(&self) -> Option<&G::Buffer> {
        self.coords.as_ref()
    }

    /// Subscribe to change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<TextureEvent> {
        self.events.subscribe()
    }

    /// Apply a pending tile state change without waiting.
    ///
    /// Returns true when the texture was updated.
    pub fn sync(&mut self) -> Result<bool> {
        let Some(listener) = self.listener.as_mut() else {
            return Ok(false);
        };

        match listener.has_changed() {
            Ok(true) => {}
            Ok(false) => return Ok(false),
            Err(_) => {
                self.listener = None;
                return Ok(false);
            }
        }

        let state = listener.borrow_and_update().clone();
        self.handle_state(state)
    }

    /// Wait until the tile reaches a terminal state and apply it.
    ///
    /// Returns true when the texture was updated, false when the tile ended
    /// in an error or empty state, or nothing is being listened to.
    pub async fn changed(&mut self) -> Result<bool> {
        loop {
            let Some(listener) = self.listener.as_mut() else {
                return Ok(false);
            };

            if listener.changed().await.is_err() {
                self.listener = None;
                return Ok(false);
            }

            let state = listener.borrow_and_update().clone();
            if state.is_terminal() {
                return self.handle_state(state);
            }
        }
    }

    fn handle_state(&mut self, state: TileState) -> Result<bool> {
        let coord = self.tile.coord();
        match state {
            TileState::Loaded(_) => {
                // A failed upload keeps the placeholder and the listener
                self.upload_tile()?;
                self.loaded = true;
                self.listener = None;
                debug!(tile = %coord, "Tile texture updated");
                let _ = self.events.send(TextureEvent::Updated(coord));
                Ok(true)
            }
            TileState::Error(message) => {
                warn!(tile = %coord, error = %message, "Tile failed to load, keeping placeholder");
                self.listener = None;
                Ok(false)
            }
            TileState::Empty => {
                debug!(tile = %coord, "Tile is empty, keeping placeholder");
                self.listener = None;
                Ok(false)
            }
            TileState::Idle | TileState::Loading => Ok(false),
        }
    }

    fn upload_placeholder(&self) -> Result<()> {
        if let Some(texture) = &self.texture {
            self.gpu
                .upload_pixels(texture, 1, 1, PixelFormat::Rgba, &PLACEHOLDER_PIXEL)?;
        }
        Ok(())
    }

    fn upload_tile(&self) -> Result<()> {
        let (Some(texture), Some(data)) = (&self.texture, self.tile.data()) else {
            return Ok(());
        };

        match data.as_ref() {
            TileData::Image(image) => self.gpu.upload_image(texture, image),
            TileData::Samples {
                width,
                height,
                data: bytes,
            } => {
                let format = PixelFormat::from_bytes_per_pixel(data.bytes_per_pixel().unwrap_or(0))?;
                self.gpu.upload_pixels(texture, *width, *height, format, bytes)
            }
        }
    }

    /// Release the texture and buffer and stop listening. Safe to call
    /// more than once.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.listener = None;

        if let Some(buffer) = self.coords.take() {
            self.gpu.delete_buffer(buffer);
        }
        if let Some(texture) = self.texture.take() {
            self.gpu.delete_texture(texture);
        }

        debug!(tile = %self.tile.coord(), "Tile texture disposed");
    }
}

impl<G: GpuContext> Drop for TileTexture<G> {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl<G: GpuContext> fmt::Debug for TileTexture<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TileTexture")
            .field("tile", &self.tile)
            .field("loaded", &self.loaded)
            .field("listening", &self.listener.is_some())
            .field("disposed", &self.disposed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quad_is_unit_square() {
        let corners: Vec<(f32, f32)> = TILE_QUAD.chunks(2).map(|c| (c[0], c[1])).collect();
        assert_eq!(corners, vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)]);
    }

    #[test]
    fn test_placeholder_is_transparent() {
        assert_eq!(PLACEHOLDER_PIXEL[3], 0);
    }
}
