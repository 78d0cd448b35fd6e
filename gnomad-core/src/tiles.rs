//! Tile decoding and the bounded tile cache

use futures::future::join_all;
use lru::LruCache;
use parking_lot::{Mutex, MutexGuard};
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;

use crate::config::TrackOptions;
use crate::coords::{ChromosomeTable, LocalInterval};
use crate::error::Result;
use crate::io::vcf::{VcfHeader, VcfRecord};
use crate::io::VariantSource;
use crate::tileset::{TilesetInfo, TilesetResolver};
use crate::types::{TileId, VariantEntry};

/// Decoded entries of one tile, shared between the cache and its readers
pub type TileData = Arc<Vec<VariantEntry>>;

/// Least-recently-used map from tile id to decoded entries.
pub struct TileCache {
    cache: LruCache<TileId, TileData>,
}

impl TileCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: LruCache::new(capacity),
        }
    }

    /// Look up a tile and mark it most recently used
    pub fn get(&mut self, id: &TileId) -> Option<TileData> {
        self.cache.get(id).cloned()
    }

    pub fn contains(&self, id: &TileId) -> bool {
        self.cache.contains(id)
    }

    /// Insert a tile, returning the id evicted to make room, if any.
    pub fn insert(&mut self, id: TileId, entries: TileData) -> Option<TileId> {
        match self.cache.push(id, entries) {
            Some((evicted, _)) if evicted != id => Some(evicted),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.cache.cap().get()
    }

    pub fn clear(&mut self) {
        self.cache.clear();
    }
}

/// Everything needed to turn tile ids into decoded variants for one dataset.
///
/// Decoding only borrows the source immutably. The cache sits behind its
/// own lock, held for lookups and inserts but never across a decode, so
/// one session can serve several requests at once.
pub struct TileSource {
    table: Arc<ChromosomeTable>,
    variants: Arc<dyn VariantSource>,
    resolver: TilesetResolver,
    tileset: TilesetInfo,
    max_tile_width: f64,
    cache: Mutex<TileCache>,
}

impl TileSource {
    pub fn new(table: Arc<ChromosomeTable>, variants: Arc<dyn VariantSource>, options: &TrackOptions) -> Self {
        let mut resolver = TilesetResolver::new(options.tile_size);
        let tileset = resolver.resolve(&table).clone();

        Self {
            table,
            variants,
            resolver,
            tileset,
            max_tile_width: options.max_tile_width,
            cache: Mutex::new(TileCache::new(options.cache_tiles)),
        }
    }

    pub fn with_max_tile_width(mut self, max_tile_width: f64) -> Self {
        self.max_tile_width = max_tile_width;
        self
    }

    /// Switch zoom levels to explicit resolutions. Cached tiles were cut for
    /// the old widths, so they are dropped.
    pub fn set_resolutions(&mut self, resolutions: Option<Vec<f64>>) {
        self.resolver.set_resolutions(resolutions);
        let tileset = self.resolver.resolve(&self.table).clone();
        if tileset != self.tileset {
            self.tileset = tileset;
            self.cache.get_mut().clear();
        }
    }

    pub fn tileset_info(&self) -> &TilesetInfo {
        &self.tileset
    }

    pub fn chromosomes(&self) -> &Arc<ChromosomeTable> {
        &self.table
    }

    pub fn max_tile_width(&self) -> f64 {
        self.max_tile_width
    }

    /// Lock the cache. Do not hold the guard across an await.
    pub fn cache(&self) -> MutexGuard<'_, TileCache> {
        self.cache.lock()
    }

    /// Cached entries for a tile, without decoding
    pub fn cached(&self, id: &TileId) -> Option<TileData> {
        self.cache.lock().get(id)
    }

    /// Entries for one tile, from the cache or freshly decoded.
    pub async fn tile(&self, id: TileId) -> Result<TileData> {
        if let Some(entries) = self.cached(&id) {
            log::trace!("Tile {} served from cache", id);
            return Ok(entries);
        }

        let entries = Arc::new(self.decode_tile(id).await?);
        self.store(id, entries.clone());
        Ok(entries)
    }

    /// Entries for many tiles. Misses are decoded concurrently and cached
    /// once all of them finish; tiles that decoded successfully are cached
    /// even when another tile in the batch fails.
    pub async fn fetch_tiles(&self, ids: &[TileId]) -> Result<HashMap<TileId, TileData>> {
        let mut results = HashMap::with_capacity(ids.len());
        let mut missing = Vec::new();

        for &id in ids {
            if results.contains_key(&id) || missing.contains(&id) {
                continue;
            }
            match self.cached(&id) {
                Some(entries) => {
                    results.insert(id, entries);
                }
                None => missing.push(id),
            }
        }

        let decoded = join_all(
            missing
                .iter()
                .map(|&id| async move { (id, self.decode_tile(id).await) }),
        )
        .await;

        let mut first_error = None;
        for (id, outcome) in decoded {
            match outcome {
                Ok(entries) => {
                    let entries = Arc::new(entries);
                    self.store(id, entries.clone());
                    results.insert(id, entries);
                }
                Err(e) => {
                    log::warn!("Failed to decode tile {}: {}", id, e);
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(results),
        }
    }

    fn store(&self, id: TileId, entries: TileData) {
        if let Some(evicted) = self.cache.lock().insert(id, entries) {
            log::debug!("Evicted tile {} from cache", evicted);
        }
    }

    /// Decode a tile without touching the cache.
    ///
    /// Tiles wider than the configured maximum decode to nothing. Records
    /// that fail to parse are skipped.
    pub async fn decode_tile(&self, id: TileId) -> Result<Vec<VariantEntry>> {
        if self.tileset.is_too_wide(id.zoom, self.max_tile_width) {
            log::debug!(
                "Tile {} is {:.0} wide (max {:.0}), not decoding",
                id,
                self.tileset.tile_width(id.zoom),
                self.max_tile_width
            );
            return Ok(Vec::new());
        }

        let (min_x, max_x) = self.tileset.tile_bounds(id);
        let intervals = self.table.overlapping(min_x, max_x);
        if intervals.is_empty() {
            return Ok(Vec::new());
        }

        let header = self.variants.header().await?;
        let parts = join_all(
            intervals
                .iter()
                .map(|interval| self.decode_interval(&header, interval)),
        )
        .await;

        // join_all keeps input order, which is chromosome table order
        let mut entries = Vec::new();
        for part in parts {
            entries.extend(part?);
        }

        log::debug!(
            "Decoded tile {} [{:.0}, {:.0}) across {} chromosome(s): {} entries",
            id,
            min_x,
            max_x,
            intervals.len(),
            entries.len()
        );
        Ok(entries)
    }

    async fn decode_interval(&self, header: &VcfHeader, interval: &LocalInterval) -> Result<Vec<VariantEntry>> {
        let lines = self
            .variants
            .fetch_lines(&interval.name, interval.start, interval.end)
            .await?;

        let mut entries = Vec::with_capacity(lines.len());
        let mut skipped = 0usize;

        for line in &lines {
            match VcfRecord::parse(header, line) {
                Ok(record) => entries.extend(record.to_entries(header, &interval.name, interval.offset)),
                Err(e) => {
                    skipped += 1;
                    log::warn!("Skipping record on {}: {}", interval.name, e);
                }
            }
        }

        if skipped > 0 {
            log::warn!(
                "Skipped {} malformed record(s) on {}:{}-{}",
                skipped,
                interval.name,
                interval.start,
                interval.end
            );
        }

        Ok(entries)
    }
}
