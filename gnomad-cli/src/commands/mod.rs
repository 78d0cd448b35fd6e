//! Command implementations for the gnomad CLI

pub mod config;
pub mod fetch;
pub mod info;
pub mod render;

use anyhow::{Context, Result};

use crate::config::Config;
use gnomad_track::{spawn_worker, DatasetId, WorkerHandle};

/// The CLI drives a single dataset
pub const DATASET: DatasetId = 0;

/// Start a worker and open the configured dataset in it
pub async fn open_dataset(config: &Config) -> Result<WorkerHandle> {
    let worker = spawn_worker(config.track.clone());
    worker
        .init(DATASET, config.data.clone())
        .await
        .with_context(|| format!("Failed to open dataset {}", config.data.vcf_url))?;
    Ok(worker)
}
