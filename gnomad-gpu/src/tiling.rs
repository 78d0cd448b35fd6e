/*!
# 1-D Tiling

Viewport → tile math for a horizontal track: which zoom level a viewport
wants, which tiles at that level it can see, where the legend rows sit, and
how to stretch geometry drawn at one scale onto another.
*/

use gnomad_core::{TileId, TilesetInfo, ZoomLevel};

use crate::scale::LinearScale;

/// Pixels a single tile is meant to cover at its native zoom
pub const VIEW_RESOLUTION: f64 = 384.0;

/// Legend rows: 0, 1e-5, 1e-4, 1e-3, 1e-2, 1e-1, 1
pub const LEGEND_ROWS: usize = 7;

/// Vertical centre of each legend row, top to bottom
pub fn label_positions(track_height: f64, variant_height: f64) -> Vec<f64> {
    let dist = track_height / LEGEND_ROWS as f64;
    (0..LEGEND_ROWS)
        .map(|k| dist * k as f64 + variant_height / 2.0)
        .collect()
}

/// Affine x transform mapping geometry drawn under `drawn_at` onto `current`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RescaleTransform {
    pub scale_x: f64,
    pub position_x: f64,
}

impl RescaleTransform {
    pub fn apply(&self, x: f64) -> f64 {
        x * self.scale_x + self.position_x
    }
}

pub fn rescale_transform(current: &LinearScale, drawn_at: &LinearScale) -> RescaleTransform {
    let k = drawn_at.domain_width() / current.domain_width();
    let offset = drawn_at.apply(current.domain[0]);
    RescaleTransform {
        scale_x: k,
        position_x: -offset * k,
    }
}

/// Zoom level for a viewport showing `domain` across `range` pixels,
/// clamped to the tileset's `max_zoom`.
pub fn zoom_level(info: &TilesetInfo, domain: [f64; 2], range: [f64; 2]) -> ZoomLevel {
    if let Some(resolutions) = &info.resolutions {
        return resolution_zoom_level(resolutions, domain, range);
    }

    let span = domain[1] - domain[0];
    let range_width = (range[1] - range[0]).abs();
    if span <= 0.0 || range_width <= 0.0 {
        return 0;
    }

    let zoom_scale = ((info.max_pos - info.min_pos) / span).max(1.0);
    let added = (range_width / VIEW_RESOLUTION).log2().ceil().max(0.0);
    let bins_correction = (8.0 - (info.bins_per_dimension.max(1) as f64).log2()).floor();

    let zoom = zoom_scale.log2().round() + added + bins_correction;
    zoom.clamp(0.0, info.max_zoom as f64) as ZoomLevel
}

/// Finest resolution whose bins are still at least one pixel wide
fn resolution_zoom_level(resolutions: &[f64], domain: [f64; 2], range: [f64; 2]) -> ZoomLevel {
    let track_width = (range[1] - range[0]).abs();
    let span = domain[1] - domain[0];

    resolutions
        .iter()
        .rposition(|res| (span / res) / track_width < 1.0)
        .unwrap_or(0) as ZoomLevel
}

/// Tiles at `zoom` intersecting `domain`, left to right
pub fn visible_tiles(info: &TilesetInfo, zoom: ZoomLevel, domain: [f64; 2]) -> Vec<TileId> {
    let width = info.tile_width(zoom);
    if width <= 0.0 {
        return Vec::new();
    }

    let (first, last) = if info.resolutions.is_some() {
        let first = (domain[0] / width).floor().max(0.0);
        let last = (domain[1] / width).ceil();
        (first, last)
    } else {
        let first = ((domain[0] - info.min_pos) / width).floor().max(0.0);
        let last = ((domain[1] - info.min_pos - 1e-7) / width)
            .ceil()
            .min(2f64.powi(zoom as i32));
        (first, last)
    };

    (first as u64..last.max(first) as u64)
        .map(|x| TileId::new(zoom, x))
        .collect()
}
