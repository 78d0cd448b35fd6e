//! Render command implementation - encode a region into raw render buffers

use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};

use super::{open_dataset, DATASET};
use crate::config::Config;
use gnomad_core::{ChromosomeTable, TilesetInfo, ZoomLevel};
use gnomad_gpu::{label_positions, visible_tiles, zoom_level, EncodeOptions, Palette, RenderOutput};
use gnomad_track::EncodeRequest;

#[derive(Debug, Clone, PartialEq)]
struct GenomicRegion {
    contig: String,
    start: u64,
    end: u64,
}

/// What was rendered, written next to the buffers
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RenderSummary<'a> {
    region: String,
    zoom: u32,
    tiles: Vec<String>,
    too_wide: bool,
    x_scale_domain: [f64; 2],
    x_scale_range: [f64; 2],
    label_positions: &'a [f64],
    color_texture_size: u32,
    variants: usize,
    vertices: usize,
    triangles: usize,
}

pub async fn execute(
    config: &Config,
    region: &str,
    width: Option<u32>,
    height: Option<u32>,
    out: Option<PathBuf>,
) -> Result<()> {
    let region = parse_single_region(region)?;
    let width = width.unwrap_or(config.render.width);
    let height = height.unwrap_or(config.render.height);
    let out_dir = out.unwrap_or_else(|| config.render.out_dir.clone());

    log::info!("Starting render of {}:{}-{}", region.contig, region.start, region.end);
    log::info!("Output directory: {}", out_dir.display());

    let worker = open_dataset(config).await?;
    let table = worker
        .chromosomes(DATASET)
        .await
        .context("Failed to look up chromosome sizes")?;
    let domain = region_domain(&table, &region)?;
    let range = [0.0, width as f64];

    let info = worker.tileset_info(DATASET).await?;
    let (zoom, tiles) = tiles_for(&info, domain, width);
    let too_wide = info.is_too_wide(zoom, config.data.max_tile_width(&config.track));
    if too_wide {
        log::warn!(
            "Tiles at zoom {} are {:.0} wide; zoom in to see variants",
            zoom,
            info.tile_width(zoom)
        );
    }
    log::info!("Zoom level {}, {} visible tile(s)", zoom, tiles.len());

    let variant_height = config.track.variant_height;
    let labels = label_positions(height as f64, variant_height as f64);
    let request = EncodeRequest {
        tile_ids: tiles.clone(),
        domain,
        range,
        options: EncodeOptions { variant_height },
        label_positions: labels.clone(),
    };
    let output = worker
        .encode_visible_tiles(DATASET, request)
        .await
        .context("Failed to encode visible tiles")?;

    let palette = Palette::from_options(config.track.color_scale.as_ref());
    let texture = palette.color_texture();

    write_outputs(&out_dir, &output, texture.as_bytes())?;

    let summary = RenderSummary {
        region: format!("{}:{}-{}", region.contig, region.start, region.end),
        zoom,
        tiles,
        too_wide,
        x_scale_domain: output.x_scale_domain,
        x_scale_range: output.x_scale_range,
        label_positions: &labels,
        color_texture_size: texture.size,
        variants: output.variants.len(),
        vertices: output.vertex_count(),
        triangles: output.triangle_count(),
    };
    write_json(&out_dir.join("render.json"), &summary)?;

    log::info!(
        "Wrote {} variants ({} triangles) to {}",
        summary.variants,
        summary.triangles,
        out_dir.display()
    );
    Ok(())
}

fn write_outputs(out_dir: &Path, output: &RenderOutput, texture: &[u8]) -> Result<()> {
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create output directory: {}", out_dir.display()))?;

    for (name, bytes) in [
        ("positions.f32", output.positions_bytes()),
        ("colors.f32", output.colors_bytes()),
        ("indices.i32", output.indices_bytes()),
        ("palette.rgba32f", texture),
    ] {
        let path = out_dir.join(name);
        std::fs::write(&path, bytes).with_context(|| format!("Failed to write {}", path.display()))?;
    }

    write_json(&out_dir.join("variants.json"), &output.variants)
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    serde_json::to_writer_pretty(std::io::BufWriter::new(file), value)
        .with_context(|| format!("Failed to write {}", path.display()))
}

fn parse_single_region(region: &str) -> Result<GenomicRegion> {
    // Parse formats like "chr1:1M-2M" or "chr1:100000-200000"
    let (contig, range) = region
        .split_once(':')
        .ok_or_else(|| anyhow!("Invalid region format: {}. Expected 'contig:start-end'", region))?;

    let (start, end) = range
        .split_once('-')
        .ok_or_else(|| anyhow!("Invalid region range: {}. Expected 'start-end'", range))?;

    let start = parse_position(start)?;
    let end = parse_position(end)?;

    if contig.is_empty() {
        return Err(anyhow!("Region {} has no contig name", region));
    }
    if start >= end {
        return Err(anyhow!("Region start ({}) must be less than end ({})", start, end));
    }

    Ok(GenomicRegion {
        contig: contig.to_string(),
        start,
        end,
    })
}

fn parse_position(pos: &str) -> Result<u64> {
    let pos = pos.trim().replace(',', "").to_uppercase();

    let (number, scale) = if let Some(n) = pos.strip_suffix('K') {
        (n, 1_000.0)
    } else if let Some(n) = pos.strip_suffix('M') {
        (n, 1_000_000.0)
    } else if let Some(n) = pos.strip_suffix('G') {
        (n, 1_000_000_000.0)
    } else {
        return pos.parse::<u64>().context("Invalid number format");
    };

    let num: f64 = number.parse().context("Invalid number format")?;
    Ok((num * scale) as u64)
}

/// Absolute interval of `region` on the concatenated genome
fn region_domain(table: &ChromosomeTable, region: &GenomicRegion) -> Result<[f64; 2]> {
    Ok([
        table.chr_to_abs(&region.contig, region.start)? as f64,
        table.chr_to_abs(&region.contig, region.end)? as f64,
    ])
}

/// Zoom and tile ids covering an absolute interval for a viewport of
/// `width` pixels
fn tiles_for(info: &TilesetInfo, domain: [f64; 2], width: u32) -> (ZoomLevel, Vec<String>) {
    let zoom = zoom_level(info, domain, [0.0, width as f64]);
    let tiles = visible_tiles(info, zoom, domain)
        .iter()
        .map(|id| id.to_string())
        .collect();
    (zoom, tiles)
}
