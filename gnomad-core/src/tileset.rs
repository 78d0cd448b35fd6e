use serde::{Deserialize, Serialize};

use crate::coords::ChromosomeTable;
use crate::types::{GenomicPos, TileId, ZoomLevel};

pub const TILE_SIZE: u32 = 1024;

/// Zoom bounds for a dataset, derived from the genome length and tile size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TilesetInfo {
    pub tile_size: u32,
    pub bins_per_dimension: u32,
    pub max_zoom: ZoomLevel,
    pub max_width: f64,
    pub min_pos: f64,
    pub max_pos: f64,
    /// Explicit bin resolutions, sorted descending. When set, zoom level `z`
    /// uses `resolutions[z] * bins_per_dimension` as its tile width instead
    /// of power-of-two subdivision.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolutions: Option<Vec<f64>>,
}

impl TilesetInfo {
    pub fn from_total_length(total_length: GenomicPos, tile_size: u32) -> Self {
        let ratio = total_length as f64 / tile_size as f64;
        let max_zoom = if ratio > 1.0 { ratio.log2().ceil() as ZoomLevel } else { 0 };

        Self {
            tile_size,
            bins_per_dimension: tile_size,
            max_zoom,
            max_width: total_length as f64,
            min_pos: 0.0,
            max_pos: total_length as f64,
            resolutions: None,
        }
    }

    pub fn with_resolutions(total_length: GenomicPos, tile_size: u32, resolutions: &[f64]) -> Self {
        let mut sorted: Vec<f64> = resolutions.iter().copied().filter(|r| *r > 0.0).collect();
        sorted.sort_by(|a, b| b.total_cmp(a));

        let mut info = Self::from_total_length(total_length, tile_size);
        if !sorted.is_empty() {
            info.max_zoom = (sorted.len() - 1) as ZoomLevel;
            info.resolutions = Some(sorted);
        }
        info
    }

    /// Width of one tile at `zoom`, in absolute genome units.
    pub fn tile_width(&self, zoom: ZoomLevel) -> f64 {
        match &self.resolutions {
            Some(resolutions) => {
                let index = (zoom as usize).min(resolutions.len() - 1);
                resolutions[index] * self.bins_per_dimension as f64
            }
            None => self.max_width / 2f64.powi(zoom as i32),
        }
    }

    /// Absolute `[start, end)` covered by a tile.
    pub fn tile_bounds(&self, id: TileId) -> (f64, f64) {
        let width = self.tile_width(id.zoom);
        let start = self.min_pos + id.x as f64 * width;
        (start, start + width)
    }

    /// Number of tiles needed to cover the genome at `zoom`.
    pub fn tiles_at(&self, zoom: ZoomLevel) -> u64 {
        let width = self.tile_width(zoom);
        ((self.max_pos - self.min_pos) / width).ceil().max(1.0) as u64
    }

    pub fn is_too_wide(&self, zoom: ZoomLevel, max_tile_width: f64) -> bool {
        self.tile_width(zoom) > max_tile_width
    }
}

/// Lazily computes and memoizes the [`TilesetInfo`] of one dataset.
#[derive(Debug, Clone)]
pub struct TilesetResolver {
    tile_size: u32,
    resolutions: Option<Vec<f64>>,
    resolved: Option<TilesetInfo>,
}

impl TilesetResolver {
    pub fn new(tile_size: u32) -> Self {
        Self {
            tile_size,
            resolutions: None,
            resolved: None,
        }
    }

    /// Switch to explicit-resolution mode; forces recomputation.
    pub fn set_resolutions(&mut self, resolutions: Option<Vec<f64>>) {
        if self.resolutions != resolutions {
            self.resolutions = resolutions;
            self.resolved = None;
        }
    }

    pub fn resolve(&mut self, table: &ChromosomeTable) -> &TilesetInfo {
        let tile_size = self.tile_size;
        let resolutions = self.resolutions.as_deref();
        self.resolved.get_or_insert_with(|| match resolutions {
            Some(res) => TilesetInfo::with_resolutions(table.total_length(), tile_size, res),
            None => TilesetInfo::from_total_length(table.total_length(), tile_size),
        })
    }

    pub fn get(&self) -> Option<&TilesetInfo> {
        self.resolved.as_ref()
    }
}

impl Default for TilesetResolver {
    fn default() -> Self {
        Self::new(TILE_SIZE)
    }
}
