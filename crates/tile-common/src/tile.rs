//! Tile coordinates and tile load state.
//!
//! A [`Tile`] is a cheaply cloneable handle shared between whoever loads the
//! tile and whoever renders it. Every state change is published on a
//! `tokio::sync::watch` channel, so a consumer can either poll
//! (`has_changed`) from the event loop or await the next transition.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use image::RgbaImage;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::debug;

/// A tile coordinate (z/x/y).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileCoord {
    /// Zoom level (pyramid level index)
    pub z: u32,
    /// Column (x)
    pub x: u32,
    /// Row (y)
    pub y: u32,
}

impl TileCoord {
    pub fn new(z: u32, x: u32, y: u32) -> Self {
        Self { z, x, y }
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}

/// Pixel payload of a loaded tile.
#[derive(Debug, Clone)]
pub enum TileData {
    /// A decoded image (e.g. PNG/JPEG fetched from a tile URL)
    Image(RgbaImage),
    /// Raw channel-interleaved bytes, row-major
    Samples {
        width: u32,
        height: u32,
        data: Vec<u8>,
    },
}

impl TileData {
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            TileData::Image(image) => image.dimensions(),
            TileData::Samples { width, height, .. } => (*width, *height),
        }
    }

    /// Bytes per pixel of the payload, `None` when the buffer does not divide
    /// evenly into pixels.
    pub fn bytes_per_pixel(&self) -> Option<usize> {
        match self {
            TileData::Image(_) => Some(4),
            TileData::Samples {
                width,
                height,
                data,
            } => {
                let pixels = *width as usize * *height as usize;
                if pixels == 0 || data.len() % pixels != 0 {
                    None
                } else {
                    Some(data.len() / pixels)
                }
            }
        }
    }
}

/// Load state of a tile.
#[derive(Debug, Clone)]
pub enum TileState {
    Idle,
    Loading,
    Loaded(Arc<TileData>),
    Error(String),
    /// The source has no data for this tile
    Empty,
}

impl TileState {
    pub fn is_loaded(&self) -> bool {
        matches!(self, TileState::Loaded(_))
    }

    /// Loaded, Error and Empty are final.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TileState::Loaded(_) | TileState::Error(_) | TileState::Empty
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            TileState::Idle => "idle",
            TileState::Loading => "loading",
            TileState::Loaded(_) => "loaded",
            TileState::Error(_) => "error",
            TileState::Empty => "empty",
        }
    }
}

struct TileInner {
    coord: TileCoord,
    state: watch::Sender<TileState>,
}

/// Shared handle to a tile and its load state.
#[derive(Clone)]
pub struct Tile {
    inner: Arc<TileInner>,
}

impl Tile {
    /// Create an idle tile.
    pub fn new(coord: TileCoord) -> Self {
        Self::with_state(coord, TileState::Idle)
    }

    pub fn with_state(coord: TileCoord, state: TileState) -> Self {
        let (sender, _) = watch::channel(state);
        Self {
            inner: Arc::new(TileInner {
                coord,
                state: sender,
            }),
        }
    }

    /// Create a tile that already holds its data.
    pub fn loaded(coord: TileCoord, data: TileData) -> Self {
        Self::with_state(coord, TileState::Loaded(Arc::new(data)))
    }

    pub fn coord(&self) -> TileCoord {
        self.inner.coord
    }

    /// True when both handles point at the same tile.
    pub fn ptr_eq(&self, other: &Tile) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> TileState {
        self.inner.state.borrow().clone()
    }

    pub fn is_loaded(&self) -> bool {
        self.inner.state.borrow().is_loaded()
    }

    /// Pixel data if the tile is loaded.
    pub fn data(&self) -> Option<Arc<TileData>> {
        match &*self.inner.state.borrow() {
            TileState::Loaded(data) => Some(data.clone()),
            _ => None,
        }
    }

    /// Publish a new state to every subscriber.
    pub fn set_state(&self, state: TileState) {
        debug!(tile = %self.inner.coord, state = state.name(), "Tile state changed");
        self.inner.state.send_replace(state);
    }

    /// Register a change listener. Dropping the receiver deregisters it.
    pub fn subscribe(&self) -> watch::Receiver<TileState> {
        self.inner.state.subscribe()
    }

    /// Number of live change listeners.
    pub fn listener_count(&self) -> usize {
        self.inner.state.receiver_count()
    }

    /// Drive the tile through `Loading` to `Loaded` or `Error`.
    pub async fn load_with<F, E>(&self, load: F)
    where
        F: Future<Output = Result<TileData, E>>,
        E: fmt::Display,
    {
        self.set_state(TileState::Loading);
        match load.await {
            Ok(data) => self.set_state(TileState::Loaded(Arc::new(data))),
            Err(e) => self.set_state(TileState::Error(e.to_string())),
        }
    }
}

impl fmt::Debug for Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tile")
            .field("coord", &self.inner.coord)
            .field("state", &self.inner.state.borrow().name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples(width: u32, height: u32, bpp: usize) -> TileData {
        TileData::Samples {
            width,
            height,
            data: vec![0; width as usize * height as usize * bpp],
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(TileCoord::new(3, 4, 2).to_string(), "3/4/2");
    }

    #[test]
    fn test_bytes_per_pixel() {
        assert_eq!(samples(4, 4, 1).bytes_per_pixel(), Some(1));
        assert_eq!(samples(4, 4, 3).bytes_per_pixel(), Some(3));
        assert_eq!(
            TileData::Image(RgbaImage::new(2, 2)).bytes_per_pixel(),
            Some(4)
        );

        let ragged = TileData::Samples {
            width: 2,
            height: 2,
            data: vec![0; 5],
        };
        assert_eq!(ragged.bytes_per_pixel(), None);
    }

    #[test]
    fn test_state_transitions_reach_subscribers() {
        let tile = Tile::new(TileCoord::new(1, 0, 0));
        let mut rx = tile.subscribe();
        assert_eq!(tile.listener_count(), 1);
        assert!(!rx.has_changed().unwrap());

        tile.set_state(TileState::Loaded(Arc::new(samples(1, 1, 4))));
        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().is_loaded());
        assert!(tile.is_loaded());
        assert!(tile.data().is_some());

        drop(rx);
        assert_eq!(tile.listener_count(), 0);
    }

    #[test]
    fn test_subscriber_wakes_on_change() {
        let tile = Tile::new(TileCoord::new(2, 1, 1));
        let mut rx = tile.subscribe();
        let mut changed = tokio_test::task::spawn(rx.changed());

        tokio_test::assert_pending!(changed.poll());
        tile.set_state(TileState::Loading);
        assert!(changed.is_woken());
        tokio_test::assert_ready_ok!(changed.poll());
    }

    #[tokio::test]
    async fn test_load_with_error() {
        let tile = Tile::new(TileCoord::new(0, 0, 0));
        tile.load_with(async { Err::<TileData, _>("boom") }).await;

        match tile.state() {
            TileState::Error(message) => assert_eq!(message, "boom"),
            other => panic!("unexpected state {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_load_with_success() {
        let tile = Tile::new(TileCoord::new(0, 0, 0));
        tile.load_with(async { Ok::<_, String>(samples(2, 2, 4)) })
            .await;
        assert!(tile.state().is_terminal());
        assert_eq!(tile.data().unwrap().dimensions(), (2, 2));
    }
}
