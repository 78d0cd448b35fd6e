//! Dataset and track settings shared by the worker and the CLI

use serde::{Deserialize, Serialize};

use crate::tileset::TILE_SIZE;

/// Tiles wider than this (genome units) are not decoded
pub const DEFAULT_MAX_TILE_WIDTH: f64 = 2e5;

/// Where a dataset's data lives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataConfig {
    /// Bgzipped VCF, over HTTP(S) or on disk
    pub vcf_url: String,

    /// Tabix index; `<vcf_url>.tbi` when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tbi_url: Option<String>,

    /// Tab-separated `name<TAB>length` rows
    pub chrom_sizes_url: String,

    /// Overrides `TrackOptions::max_tile_width` for this dataset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tile_width: Option<f64>,

    /// Explicit per-zoom resolutions (genome units per bin). When set, zoom
    /// `z` tiles are `resolutions[z] * bins_per_dimension` wide instead of
    /// halving from the whole genome.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolutions: Option<Vec<f64>>,
}

impl DataConfig {
    pub fn new<V: Into<String>, C: Into<String>>(vcf_url: V, chrom_sizes_url: C) -> Self {
        Self {
            vcf_url: vcf_url.into(),
            tbi_url: None,
            chrom_sizes_url: chrom_sizes_url.into(),
            max_tile_width: None,
            resolutions: None,
        }
    }

    pub fn tbi_url(&self) -> String {
        self.tbi_url
            .clone()
            .unwrap_or_else(|| format!("{}.tbi", self.vcf_url))
    }

    /// Widest tile this dataset decodes, falling back to the track option
    pub fn max_tile_width(&self, options: &TrackOptions) -> f64 {
        self.max_tile_width.unwrap_or(options.max_tile_width)
    }
}

/// RGBA overrides for the semantic palette slots
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorScale {
    pub variant: [f32; 4],
    pub insertion: [f32; 4],
    pub deletion: [f32; 4],
    pub inversion: [f32; 4],
    pub duplication: [f32; 4],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackOptions {
    /// Rectangle height in pixels
    #[serde(default = "default_variant_height")]
    pub variant_height: f32,

    #[serde(default = "default_max_tile_width")]
    pub max_tile_width: f64,

    #[serde(default = "default_tile_size")]
    pub tile_size: u32,

    /// Decoded tiles kept per dataset
    #[serde(default = "default_cache_tiles")]
    pub cache_tiles: usize,

    /// Quiet period before a batch of tile requests is sent
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_scale: Option<ColorScale>,
}

fn default_variant_height() -> f32 { 12.0 }
fn default_max_tile_width() -> f64 { DEFAULT_MAX_TILE_WIDTH }
fn default_tile_size() -> u32 { TILE_SIZE }
fn default_cache_tiles() -> usize { 20 }
fn default_debounce_ms() -> u64 { 200 }

impl Default for TrackOptions {
    fn default() -> Self {
        Self {
            variant_height: default_variant_height(),
            max_tile_width: default_max_tile_width(),
            tile_size: default_tile_size(),
            cache_tiles: default_cache_tiles(),
            debounce_ms: default_debounce_ms(),
            color_scale: None,
        }
    }
}
