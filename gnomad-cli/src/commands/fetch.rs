//! Fetch command implementation - decode tiles through the debounced coordinator

use anyhow::{anyhow, Context, Result};
use std::collections::BTreeMap;
use tokio::time::Duration;

use super::{open_dataset, DATASET};
use crate::config::Config;
use gnomad_core::{TileId, VariantEntry, ZoomLevel};
use gnomad_track::{parse_tile_ids, TileFetcher};

pub async fn execute(config: &Config, tiles: Vec<String>, json: bool) -> Result<()> {
    let ids = parse_tile_ids(&tiles);
    if ids.is_empty() {
        return Err(anyhow!("No valid tile ids in: {}", tiles.join(" ")));
    }

    let worker = open_dataset(config).await?;
    let (fetcher, mut batches) = TileFetcher::spawn(
        worker,
        DATASET,
        Duration::from_millis(config.track.debounce_ms),
    );

    // A zoom change discards whatever is pending, so each zoom level is
    // requested and awaited on its own.
    let mut fetched: BTreeMap<TileId, std::sync::Arc<Vec<VariantEntry>>> = BTreeMap::new();
    for (zoom, group) in group_by_zoom(&ids) {
        log::info!("Requesting {} tile(s) at zoom {}", group.len(), zoom);
        fetcher.request_ids(group);

        let batch = batches
            .recv()
            .await
            .ok_or_else(|| anyhow!("Tile fetcher stopped before answering"))?;
        let tiles = batch
            .tiles
            .with_context(|| format!("Failed to fetch tiles at zoom {}", zoom))?;
        fetched.extend(tiles);
    }

    if json {
        let out: BTreeMap<String, &[VariantEntry]> = fetched
            .iter()
            .map(|(id, entries)| (id.to_string(), entries.as_slice()))
            .collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        for (id, entries) in &fetched {
            println!("{}\t{}", id, entries.len());
        }
    }

    Ok(())
}

fn group_by_zoom(ids: &[TileId]) -> BTreeMap<ZoomLevel, Vec<TileId>> {
    let mut groups: BTreeMap<ZoomLevel, Vec<TileId>> = BTreeMap::new();
    for id in ids {
        groups.entry(id.zoom).or_default().push(*id);
    }
    groups
}
