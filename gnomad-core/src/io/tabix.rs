//! Tabix (`.tbi`) index loading and region queries

use noodles::core::{region::Interval, Position};
use noodles::csi::binning_index::index::reference_sequence::bin::Chunk;
use noodles::csi::BinningIndex;
use noodles::tabix;

use crate::error::{Result, TrackError};
use crate::io::source::ByteSource;

/// A parsed tabix index plus its reference names, in index order.
#[derive(Debug)]
pub struct TabixIndex {
    index: tabix::Index,
    names: Vec<String>,
}

impl TabixIndex {
    /// Parse an index from its (BGZF-compressed) file bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let index = tabix::io::Reader::new(bytes)
            .read_index()
            .map_err(|e| TrackError::invalid_index(e.to_string()))?;

        let header = index
            .header()
            .ok_or_else(|| TrackError::invalid_index("missing tabix header"))?;

        let names = header
            .reference_sequence_names()
            .iter()
            .map(|name| {
                let bytes: &[u8] = name.as_ref();
                String::from_utf8_lossy(bytes).into_owned()
            })
            .collect();

        Ok(Self { index, names })
    }

    pub async fn load(source: &dyn ByteSource) -> Result<Self> {
        let bytes = source.read_all().await?;
        let index = Self::from_bytes(&bytes)?;
        log::info!(
            "Loaded tabix index {} ({} references)",
            source.url(),
            index.names.len()
        );
        Ok(index)
    }

    pub fn reference_names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Chunks that may hold records overlapping the 0-based half-open
    /// `[start, end)` on `name`. Unknown references and empty ranges yield
    /// no chunks.
    pub fn query(&self, name: &str, start: u64, end: u64) -> Result<Vec<Chunk>> {
        let Some(reference_sequence_id) = self.names.iter().position(|n| n == name) else {
            return Ok(Vec::new());
        };
        if end <= start {
            return Ok(Vec::new());
        }

        // 1-based inclusive
        let (Some(from), Some(to)) = (Position::new(start as usize + 1), Position::new(end as usize)) else {
            return Ok(Vec::new());
        };

        self.index
            .query(reference_sequence_id, Interval::from(from..=to))
            .map_err(|e| TrackError::invalid_index(format!("query {}:{}-{}: {}", name, start, end, e)))
    }
}
