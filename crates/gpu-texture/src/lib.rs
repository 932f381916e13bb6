//! GPU textures for map tiles.
//!
//! A [`TileTexture`] binds one [`tile_common::Tile`] to a texture and a quad
//! buffer on a [`GpuContext`]. Tiles that are still loading show a 1x1
//! transparent placeholder until their data arrives; the texture then
//! re-uploads once and notifies its subscribers.
//!
//! [`TileTextureCache`] keeps textures keyed by tile coordinate and disposes
//! the ones that leave the render set or fall out of the LRU.

pub mod cache;
pub mod context;
pub mod error;
pub mod texture;

#[cfg(feature = "wgpu")]
pub mod wgpu_backend;

pub use cache::{TextureCacheStats, TileTextureCache};
pub use context::{Filter, GpuContext, PixelFormat, TextureParameters, Wrap, TILE_TEXTURE_PARAMETERS};
pub use error::{GpuError, Result};
pub use texture::{TextureEvent, TileTexture, PLACEHOLDER_PIXEL, TILE_QUAD};

#[cfg(feature = "wgpu")]
pub use wgpu_backend::{expand_to_rgba, WgpuContext, WgpuTexture};
