//! LRU cache of tile textures.
//!
//! Textures are keyed by tile coordinate. The cache grows freely while a
//! frame is being assembled; [`TileTextureCache::expire_cache`] then trims it
//! back to the high-water mark, disposing the least recently used textures.

use std::sync::Arc;

use lru::LruCache;
use tracing::{debug, info, warn};

use tile_common::{Tile, TileCoord};

use crate::context::GpuContext;
use crate::error::{GpuError, Result};
use crate::texture::TileTexture;

/// Counters for the texture cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TextureCacheStats {
    /// Lookups answered by an existing texture
    pub hits: u64,
    /// Lookups that created a texture
    pub misses: u64,
    /// Textures disposed by `expire_cache`
    pub evictions: u64,
    /// Textures disposed by `retain` or replaced by a newer tile
    pub removals: u64,
}

impl TextureCacheStats {
    /// Hit rate as a percentage (0-100).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

/// Tile textures keyed by coordinate, at most one per coordinate.
pub struct TileTextureCache<G: GpuContext> {
    gpu: Arc<G>,
    textures: LruCache<TileCoord, TileTexture<G>>,
    high_water_mark: usize,
    stats: TextureCacheStats,
}

impl<G: GpuContext> TileTextureCache<G> {
    pub fn new(gpu: Arc<G>, high_water_mark: usize) -> Self {
        Self {
            gpu,
            textures: LruCache::unbounded(),
            high_water_mark,
            stats: TextureCacheStats::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    pub fn high_water_mark(&self) -> usize {
        self.high_water_mark
    }

    pub fn stats(&self) -> TextureCacheStats {
        self.stats
    }

    pub fn contains(&self, coord: &TileCoord) -> bool {
        self.textures.contains(coord)
    }

    /// Look up a texture and mark it as recently used.
    pub fn get(&mut self, coord: &TileCoord) -> Option<&mut TileTexture<G>> {
        self.textures.get_mut(coord)
    }

    /// Texture for `tile`, created on first use.
    ///
    /// A cached texture bound to a different tile handle at the same
    /// coordinate is disposed and replaced.
    pub fn get_or_create(&mut self, tile: &Tile) -> Result<&mut TileTexture<G>> {
        let coord = tile.coord();
        let cached = self.textures.peek(&coord).map(|texture| texture.tile().ptr_eq(tile));

        match cached {
            Some(true) => self.stats.hits += 1,
            stale => {
                if stale.is_some() {
                    if let Some(mut old) = self.textures.pop(&coord) {
                        old.dispose();
                    }
                    self.stats.removals += 1;
                    debug!(tile = %coord, "Replacing texture of a reloaded tile");
                }
                self.stats.misses += 1;
                let texture = TileTexture::new(tile.clone(), self.gpu.clone())?;
                self.textures.put(coord, texture);
            }
        }

        self.textures
            .get_mut(&coord)
            .ok_or_else(|| GpuError::Backend(format!("texture for {} missing from cache", coord)))
    }

    /// Apply pending tile changes to every cached texture.
    ///
    /// Returns the coordinates whose textures were updated.
    pub fn sync_all(&mut self) -> Vec<TileCoord> {
        let mut updated = Vec::new();
        for (coord, texture) in self.textures.iter_mut() {
            match texture.sync() {
                Ok(true) => updated.push(*coord),
                Ok(false) => {}
                Err(e) => warn!(tile = %coord, error = %e, "Failed to update tile texture"),
            }
        }
        updated
    }

    /// Dispose every texture whose coordinate fails `keep`.
    pub fn retain<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&TileCoord) -> bool,
    {
        let doomed: Vec<TileCoord> = self
            .textures
            .iter()
            .map(|(coord, _)| *coord)
            .filter(|coord| !keep(coord))
            .collect();

        for coord in &doomed {
            if let Some(mut texture) = self.textures.pop(coord) {
                texture.dispose();
            }
        }

        self.stats.removals += doomed.len() as u64;
        if !doomed.is_empty() {
            debug!(removed = doomed.len(), remaining = self.textures.len(), "Released tile textures");
        }
        doomed.len()
    }

    /// Evict least recently used textures until the cache is at or below its
    /// high-water mark.
    pub fn expire_cache(&mut self) -> usize {
        let mut evicted = 0;
        while self.textures.len() > self.high_water_mark {
            match self.textures.pop_lru() {
                Some((_, mut texture)) => {
                    texture.dispose();
                    evicted += 1;
                }
                None => break,
            }
        }

        if evicted > 0 {
            self.stats.evictions += evicted as u64;
            info!(
                evicted = evicted,
                remaining = self.textures.len(),
                high_water_mark = self.high_water_mark,
                "Texture cache eviction"
            );
        }
        evicted
    }

    /// Dispose every texture.
    pub fn clear(&mut self) {
        while let Some((_, mut texture)) = self.textures.pop_lru() {
            texture.dispose();
        }
    }
}

impl<G: GpuContext> Drop for TileTextureCache<G> {
    fn drop(&mut self) {
        self.clear();
    }
}
