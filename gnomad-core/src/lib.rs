//! gnomAD track core library
//!
//! Absolute genome coordinates, tileset math, indexed VCF access and the
//! decoded-tile cache.

pub mod config;
pub mod coords;
pub mod error;
pub mod io;
pub mod tiles;
pub mod tileset;
pub mod types;

// Re-export commonly used types and functions
pub use config::{ColorScale, DataConfig, TrackOptions};
pub use coords::{ChrPosition, ChromInfo, ChromosomeTable, CoordinateMapper};
pub use error::{Result, TrackError};
pub use io::{TabixVcf, VariantSource};
pub use tiles::{TileCache, TileData, TileSource};
pub use tileset::{TilesetInfo, TilesetResolver, TILE_SIZE};
pub use types::{GenomicPos, TileId, VariantCategory, VariantEntry, VariantType, ZoomLevel};

/// Version information for the gnomAD track core library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
