use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "gnomad")]
#[command(about = "gnomAD variant track - tile fetch, decode and render encoding")]
#[command(version)]
#[command(long_about = "
Fetches tiles of a bgzipped, tabix-indexed gnomAD VCF laid out on absolute
genome coordinates, and encodes them into triangle buffers for rendering.

Examples:
  gnomad info --vcf gnomad.vcf.bgz --chrom-sizes hg38.chrom.sizes
  gnomad fetch 12.2048 12.2049 --json
  gnomad render --region chr1:100000-150000 --width 1000 --out render/
  gnomad config --example > gnomad.toml
")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Bgzipped VCF (URL or path), overrides [data].vcf_url
    #[arg(long, global = true)]
    pub vcf: Option<String>,

    /// Tabix index, overrides [data].tbi_url
    #[arg(long, global = true)]
    pub tbi: Option<String>,

    /// Chromosome sizes file, overrides [data].chrom_sizes_url
    #[arg(long, global = true)]
    pub chrom_sizes: Option<String>,

    /// Verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the tileset description of the dataset
    Info,

    /// Fetch tiles by "zoom.x" id through the debounced coordinator
    Fetch {
        /// Tile ids, e.g. 12.2048
        #[arg(required = true)]
        tiles: Vec<String>,

        /// Print the decoded variants as JSON instead of counts
        #[arg(long)]
        json: bool,
    },

    /// Encode the variants of a region into render buffers
    Render {
        /// Region to render, e.g. 'chr1:100K-150K'
        #[arg(long, required = true)]
        region: String,

        /// Track width in pixels
        #[arg(long)]
        width: Option<u32>,

        /// Track height in pixels
        #[arg(long)]
        height: Option<u32>,

        /// Output directory
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Print or write a configuration file
    Config {
        /// Print an example gnomad.toml
        #[arg(long)]
        example: bool,

        /// Write the effective configuration to this path
        #[arg(long)]
        write: Option<PathBuf>,
    },
}

fn setup_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let config = Config::load(cli.config.as_deref())?.with_overrides(cli.vcf, cli.tbi, cli.chrom_sizes);

    match cli.command {
        Commands::Info => {
            commands::info::execute(&config).await?;
        }

        Commands::Fetch { tiles, json } => {
            commands::fetch::execute(&config, tiles, json).await?;
        }

        Commands::Render { region, width, height, out } => {
            commands::render::execute(&config, &region, width, height, out).await?;
        }

        Commands::Config { example, write } => {
            commands::config::execute(&config, example, write)?;
        }
    }

    Ok(())
}
