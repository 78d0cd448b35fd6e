//! Info command implementation - print the tileset description

use anyhow::{Context, Result};

use super::{open_dataset, DATASET};
use crate::config::Config;

pub async fn execute(config: &Config) -> Result<()> {
    let worker = open_dataset(config).await?;
    let info = worker
        .tileset_info(DATASET)
        .await
        .context("Failed to resolve tileset info")?;

    log::info!(
        "Genome length {:.0}, {} zoom levels, tiles at max zoom are {:.0} wide",
        info.max_width,
        info.max_zoom + 1,
        info.tile_width(info.max_zoom)
    );
    println!("{}", serde_json::to_string_pretty(&info)?);
    Ok(())
}
