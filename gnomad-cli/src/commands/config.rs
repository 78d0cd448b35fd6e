//! Config command implementation - print or persist the effective configuration

use anyhow::Result;
use std::path::PathBuf;

use crate::config::Config;

pub fn execute(config: &Config, example: bool, write: Option<PathBuf>) -> Result<()> {
    if example {
        print!("{}", Config::example_toml()?);
        return Ok(());
    }

    match write {
        Some(path) => {
            config.save_to_file(&path)?;
            log::info!("Configuration written to {}", path.display());
        }
        None => {
            print!("{}", toml::to_string_pretty(config)?);
        }
    }

    Ok(())
}
