//! Configuration handling for the gnomad CLI
//!
//! Supports loading configuration from gnomad.toml files with CLI argument overrides.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use gnomad_core::{DataConfig, TrackOptions};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub data: DataConfig,

    #[serde(default)]
    pub track: TrackOptions,

    #[serde(default)]
    pub render: RenderConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Track width in pixels
    #[serde(default = "default_width")]
    pub width: u32,

    /// Track height in pixels
    #[serde(default = "default_height")]
    pub height: u32,

    /// Directory the encoded buffers are written to
    #[serde(default = "default_out_dir")]
    pub out_dir: PathBuf,
}

fn default_width() -> u32 { 1000 }
fn default_height() -> u32 { 140 }
fn default_out_dir() -> PathBuf { PathBuf::from("gnomad-render") }

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            out_dir: default_out_dir(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data: DataConfig::new("gnomad.genomes.sites.vcf.bgz", "hg38.chrom.sizes"),
            track: TrackOptions::default(),
            render: RenderConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file or use defaults
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let config = match config_path {
            Some(path) => {
                log::info!("Loading configuration from: {}", path.display());
                Self::load_from_file(path)?
            }
            None => {
                let default_path = PathBuf::from("gnomad.toml");
                if default_path.exists() {
                    log::info!("Loading configuration from: gnomad.toml");
                    Self::load_from_file(&default_path)?
                } else {
                    log::info!("Using default configuration");
                    Self::default()
                }
            }
        };

        Ok(config)
    }

    /// Load configuration from a specific TOML file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse configuration file: {}", path.display()))?;

        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write configuration file: {}", path.display()))?;

        Ok(())
    }

    /// Generate example configuration file content
    pub fn example_toml() -> Result<String> {
        toml::to_string_pretty(&Self::default()).context("Failed to serialize default configuration")
    }

    /// Apply data source overrides given on the command line
    pub fn with_overrides(
        mut self,
        vcf: Option<String>,
        tbi: Option<String>,
        chrom_sizes: Option<String>,
    ) -> Self {
        if let Some(vcf) = vcf {
            self.data.vcf_url = vcf;
        }
        if tbi.is_some() {
            self.data.tbi_url = tbi;
        }
        if let Some(chrom_sizes) = chrom_sizes {
            self.data.chrom_sizes_url = chrom_sizes;
        }
        self
    }
}
