//! Indexed variant file access

pub mod bgzf;
pub mod source;
pub mod tabix;
pub mod vcf;

use futures::future::BoxFuture;
use std::sync::Arc;

use crate::error::Result;

pub use source::{open_byte_source, ByteSource, HttpFile, LocalFile, MemoryFile};
pub use tabix::TabixIndex;
pub use vcf::{parse_header, TabixVcf, VcfHeader, VcfRecord};

/// Range-queryable source of VCF data lines.
pub trait VariantSource: Send + Sync {
    fn header(&self) -> BoxFuture<'_, Result<Arc<VcfHeader>>>;

    /// Raw data lines on `chr` overlapping the 0-based half-open
    /// `[start, end)`, in file order.
    fn fetch_lines<'a>(&'a self, chr: &'a str, start: u64, end: u64) -> BoxFuture<'a, Result<Vec<String>>>;
}
