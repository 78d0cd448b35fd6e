//! gnomAD track runtime
//!
//! The background worker that owns every dataset session, and the debounced
//! coordinator that batches tile requests from a moving viewport.

pub mod coordinator;
pub mod worker;

// Re-export commonly used types and functions
pub use coordinator::{Batch, Coordinator, CoordinatorState, FetchedBatch, TileFetcher};
pub use worker::{parse_tile_ids, spawn_worker, DatasetId, EncodeRequest, Worker, WorkerHandle};

/// Version information for the gnomAD track runtime
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
