use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{Result, TrackError};
use crate::io::source::read_text;
use crate::types::GenomicPos;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChromInfo {
    pub id: usize,
    pub name: String,
    pub length: GenomicPos,
    pub offset: GenomicPos, // Absolute coordinate of the chromosome start
}

impl ChromInfo {
    pub fn end(&self) -> GenomicPos {
        self.offset + self.length
    }
}

/// Result of resolving an absolute position back onto a chromosome.
#[derive(Debug, Clone, PartialEq)]
pub struct ChrPosition {
    pub name: String,
    pub position: i64,
    /// Distance by which the absolute position fell outside the genome
    pub overflow: i64,
    pub index: usize,
}

/// Part of an absolute interval that falls on one chromosome, in that
/// chromosome's local coordinates (half-open).
#[derive(Debug, Clone, PartialEq)]
pub struct LocalInterval {
    pub index: usize,
    pub name: String,
    pub offset: GenomicPos,
    pub start: GenomicPos,
    pub end: GenomicPos,
}

/// Ordered chromosome lengths laid end to end on one absolute axis.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChromosomeTable {
    chromosomes: Vec<ChromInfo>,
    total_length: GenomicPos,
    by_name: HashMap<String, usize>,
}

impl ChromosomeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_chromosome(&mut self, name: String, length: GenomicPos) -> Result<usize> {
        if length == 0 {
            return Err(TrackError::invalid_chrom_sizes(
                self.chromosomes.len() + 1,
                format!("chromosome {} has zero length", name),
            ));
        }
        if self.by_name.contains_key(&name) {
            return Err(TrackError::invalid_chrom_sizes(
                self.chromosomes.len() + 1,
                format!("duplicate chromosome name {}", name),
            ));
        }

        let id = self.chromosomes.len();
        let offset = self.total_length;

        self.chromosomes.push(ChromInfo {
            id,
            name: name.clone(),
            length,
            offset,
        });
        self.by_name.insert(name, id);
        self.total_length += length;
        Ok(id)
    }

    pub fn from_lengths<I, S>(lengths: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, GenomicPos)>,
        S: Into<String>,
    {
        let mut table = Self::new();
        for (name, length) in lengths {
            table.add_chromosome(name.into(), length)?;
        }
        Ok(table)
    }

    /// Parse a chromosome sizes file: `name<TAB>length` per row, row order
    /// defines the absolute layout.
    pub fn parse(text: &str) -> Result<Self> {
        let mut table = Self::new();

        for (line_num, line) in text.lines().enumerate() {
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }

            let mut fields = line.split('\t');
            let name = fields.next().unwrap_or_default().trim();
            let length = fields.next().map(str::trim).ok_or_else(|| {
                TrackError::invalid_chrom_sizes(line_num + 1, "expected name<TAB>length")
            })?;

            if name.is_empty() {
                return Err(TrackError::invalid_chrom_sizes(line_num + 1, "empty chromosome name"));
            }

            let length = length.parse::<GenomicPos>().map_err(|_| {
                TrackError::invalid_chrom_sizes(line_num + 1, format!("invalid length: {}", length))
            })?;

            table
                .add_chromosome(name.to_string(), length)
                .map_err(|e| match e {
                    TrackError::InvalidChromSizes { message, .. } => {
                        TrackError::invalid_chrom_sizes(line_num + 1, message)
                    }
                    other => other,
                })?;
        }

        Ok(table)
    }

    /// Load a chromosome sizes file from a URL or local path.
    pub async fn load(url: &str) -> Result<Self> {
        let text = read_text(url).await?;
        let table = Self::parse(&text)?;
        log::info!(
            "Loaded {} chromosomes ({} bp) from {}",
            table.len(),
            table.total_length(),
            url
        );
        Ok(table)
    }

    pub fn chromosomes(&self) -> &[ChromInfo] {
        &self.chromosomes
    }

    pub fn get(&self, name: &str) -> Option<&ChromInfo> {
        self.by_name.get(name).map(|&id| &self.chromosomes[id])
    }

    pub fn total_length(&self) -> GenomicPos {
        self.total_length
    }

    pub fn len(&self) -> usize {
        self.chromosomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chromosomes.is_empty()
    }

    pub fn chr_to_abs(&self, name: &str, position: GenomicPos) -> Result<GenomicPos> {
        self.get(name)
            .map(|chrom| chrom.offset + position)
            .ok_or_else(|| TrackError::unknown_chromosome(name))
    }

    /// Resolve an absolute position. Positions are 1-based, so an offset
    /// exactly on a chromosome start belongs to the previous chromosome's
    /// last base. Returns `None` only for an empty table.
    pub fn abs_to_chr(&self, abs_pos: f64) -> Option<ChrPosition> {
        let last = self.chromosomes.last()?;

        let insert_point = self
            .chromosomes
            .partition_point(|chrom| (chrom.offset as f64) < abs_pos);
        let index = insert_point.saturating_sub(1);
        let chrom = &self.chromosomes[index];

        let mut position = (abs_pos - chrom.offset as f64).floor() as i64;
        let mut overflow = 0;

        if position < 0 {
            // before the start of the genome
            overflow = position - 1;
            position = 1;
        }

        if index == self.chromosomes.len() - 1 && position > last.length as i64 {
            // beyond the last chromosome
            overflow = position - last.length as i64;
            position = last.length as i64;
        }

        Some(ChrPosition {
            name: chrom.name.clone(),
            position,
            overflow,
            index,
        })
    }

    /// Split the absolute interval `[min_x, max_x)` into per-chromosome local
    /// ranges, in table order.
    pub fn overlapping(&self, min_x: f64, max_x: f64) -> Vec<LocalInterval> {
        let mut intervals = Vec::new();

        for chrom in &self.chromosomes {
            let chrom_start = chrom.offset as f64;
            let chrom_end = chrom.end() as f64;

            if chrom_end <= min_x || chrom_start >= max_x {
                continue;
            }

            let start = (min_x.max(chrom_start) - chrom_start).floor().max(0.0) as GenomicPos;
            let end = (max_x.min(chrom_end) - chrom_start).ceil() as GenomicPos;

            if end > start {
                intervals.push(LocalInterval {
                    index: chrom.id,
                    name: chrom.name.clone(),
                    offset: chrom.offset,
                    start,
                    end,
                });
            }
        }

        intervals
    }
}

/// Coordinate lookups against a chromosome table that may still be loading.
///
/// Every lookup answers `None` until a table is attached, so callers can
/// treat that as "not ready" rather than a failure.
#[derive(Debug, Clone, Default)]
pub struct CoordinateMapper {
    table: Option<Arc<ChromosomeTable>>,
}

impl CoordinateMapper {
    pub fn unresolved() -> Self {
        Self { table: None }
    }

    pub fn with_table(table: Arc<ChromosomeTable>) -> Self {
        Self { table: Some(table) }
    }

    pub fn attach(&mut self, table: Arc<ChromosomeTable>) {
        self.table = Some(table);
    }

    pub fn is_ready(&self) -> bool {
        self.table.is_some()
    }

    pub fn table(&self) -> Option<&Arc<ChromosomeTable>> {
        self.table.as_ref()
    }

    pub fn abs_to_chr(&self, abs_pos: f64) -> Option<ChrPosition> {
        self.table.as_ref().and_then(|t| t.abs_to_chr(abs_pos))
    }

    pub fn chr_to_abs(&self, name: &str, position: GenomicPos) -> Option<Result<GenomicPos>> {
        self.table.as_ref().map(|t| t.chr_to_abs(name, position))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn two_chroms() -> ChromosomeTable {
        ChromosomeTable::from_lengths([("chr1", 1000), ("chr2", 500)]).unwrap()
    }

    #[test]
    fn test_offsets_and_total() {
        let table = two_chroms();
        assert_eq!(table.total_length(), 1500);
        assert_eq!(table.get("chr2").unwrap().offset, 1000);
        assert_eq!(table.chr_to_abs("chr2", 10).unwrap(), 1010);
    }

    #[test]
    fn test_unknown_chromosome() {
        let table = two_chroms();
        assert_eq!(
            table.chr_to_abs("chrX", 1),
            Err(TrackError::unknown_chromosome("chrX"))
        );
    }

    #[test]
    fn test_abs_to_chr_overflow() {
        let table = two_chroms();

        let before = table.abs_to_chr(-5.0).unwrap();
        assert_eq!((before.name.as_str(), before.position, before.overflow), ("chr1", 1, -6));

        let after = table.abs_to_chr(1600.0).unwrap();
        assert_eq!((after.name.as_str(), after.position, after.overflow), ("chr2", 500, 100));
    }

    #[test]
    fn test_boundary_belongs_to_previous_chromosome() {
        let table = two_chroms();
        let pos = table.abs_to_chr(1000.0).unwrap();
        assert_eq!((pos.name.as_str(), pos.position, pos.overflow), ("chr1", 1000, 0));
    }

    #[test]
    fn test_parse_chrom_sizes() {
        let table = ChromosomeTable::parse("chr1\t1000\n\n# comment\nchr2\t500\r\n").unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.total_length(), 1500);
    }

    #[test]
    fn test_parse_rejects_bad_rows() {
        assert!(matches!(
            ChromosomeTable::parse("chr1\t1000\nchr2\tabc\n"),
            Err(TrackError::InvalidChromSizes { line: 2, .. })
        ));
        assert!(matches!(
            ChromosomeTable::parse("chr1\t1000\nchr1\t20\n"),
            Err(TrackError::InvalidChromSizes { line: 2, .. })
        ));
        assert!(ChromosomeTable::parse("chr1\t0\n").is_err());
        assert!(ChromosomeTable::parse("chr1\n").is_err());
    }

    #[test]
    fn test_overlapping_spans_both_chromosomes() {
        let table = two_chroms();
        let ranges = table.overlapping(0.0, 1500.0);
        assert_eq!(ranges.len(), 2);
        assert_eq!((ranges[0].name.as_str(), ranges[0].start, ranges[0].end), ("chr1", 0, 1000));
        assert_eq!((ranges[1].name.as_str(), ranges[1].start, ranges[1].end), ("chr2", 0, 500));
    }

    #[test]
    fn test_overlapping_partial() {
        let table = two_chroms();
        let ranges = table.overlapping(750.5, 1125.25);
        assert_eq!(ranges.len(), 2);
        assert_eq!((ranges[0].start, ranges[0].end), (750, 1000));
        assert_eq!((ranges[1].start, ranges[1].end), (0, 126));

        assert!(table.overlapping(1500.0, 3000.0).is_empty());
    }

    #[test]
    fn test_mapper_unresolved_until_attached() {
        let mut mapper = CoordinateMapper::unresolved();
        assert!(mapper.abs_to_chr(10.0).is_none());
        assert!(mapper.chr_to_abs("chr1", 10).is_none());

        mapper.attach(Arc::new(two_chroms()));
        assert!(mapper.is_ready());
        assert_eq!(mapper.chr_to_abs("chr2", 1), Some(Ok(1001)));
    }

    fn arb_table() -> impl Strategy<Value = ChromosomeTable> {
        prop::collection::vec(1u64..5_000_000, 1..24).prop_map(|lengths| {
            ChromosomeTable::from_lengths(
                lengths
                    .into_iter()
                    .enumerate()
                    .map(|(i, len)| (format!("chr{}", i + 1), len)),
            )
            .unwrap()
        })
    }

    proptest! {
        #[test]
        fn prop_abs_chr_round_trip(table in arb_table(), pick in any::<prop::sample::Index>(), frac in 0.0f64..1.0) {
            let chrom = &table.chromosomes()[pick.index(table.len())];
            let position = 1 + ((chrom.length - 1) as f64 * frac) as u64;

            let abs = table.chr_to_abs(&chrom.name, position).unwrap();
            let back = table.abs_to_chr(abs as f64).unwrap();

            prop_assert_eq!(back.name, chrom.name.clone());
            prop_assert_eq!(back.position, position as i64);
            prop_assert_eq!(back.overflow, 0);
            prop_assert_eq!(back.index, chrom.id);
        }
    }
}
