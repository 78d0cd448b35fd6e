//! VCF records and the tabix-indexed VCF reader
//!
//! Header and record parsing is done by `noodles::vcf`. This module turns
//! parsed records into per-ALT [`VariantEntry`] values and decides which
//! raw lines of an indexed chunk belong to a query.

use futures::future::BoxFuture;
use noodles::vcf;
use noodles::vcf::variant::record_buf::info::field::{value::Array, Value};
use noodles::vcf::variant::RecordBuf;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::error::{Result, TrackError};
use crate::io::bgzf;
use crate::io::source::{open_byte_source, ByteSource};
use crate::io::tabix::TabixIndex;
use crate::io::VariantSource;
use crate::types::{VariantCategory, VariantEntry, VariantType};

pub use noodles::vcf::Header as VcfHeader;

/// Parse the `#` lines at the top of a VCF.
pub fn parse_header(text: &str) -> Result<VcfHeader> {
    vcf::io::Reader::new(text.as_bytes())
        .read_header()
        .map_err(|e| TrackError::invalid_header(e.to_string()))
}

/// Cardinality of an INFO field, from its `Number=` declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfoNumber {
    Fixed(usize),
    /// `A`: one value per ALT allele
    PerAlt,
    /// `R`: one value per allele, REF first
    PerAllele,
    /// `G`: one value per genotype
    PerGenotype,
    Unbounded,
}

impl InfoNumber {
    fn parse(value: &str) -> Self {
        match value {
            "A" => InfoNumber::PerAlt,
            "R" => InfoNumber::PerAllele,
            "G" => InfoNumber::PerGenotype,
            n => n.parse().map(InfoNumber::Fixed).unwrap_or(InfoNumber::Unbounded),
        }
    }

    /// Declared cardinality of an INFO key. Allele counts and frequencies
    /// are per ALT even when the header omits them.
    pub fn of(header: &VcfHeader, key: &str) -> Self {
        if let Some(info) = header.infos().get(key) {
            use noodles::vcf::header::record::value::map::info::Number;
            let number = match info.number() {
                Number::Count(n) => n.to_string(),
                Number::AlternateBases => "A".to_string(),
                Number::ReferenceAlternateBases => "R".to_string(),
                Number::Samples => "G".to_string(),
                Number::Unknown => ".".to_string(),
            };
            return Self::parse(&number);
        }
        match key {
            "AC" | "AF" => InfoNumber::PerAlt,
            "AN" | "END" | "SVTYPE" | "SVLEN" => InfoNumber::Fixed(1),
            _ => InfoNumber::Unbounded,
        }
    }
}

/// One data line of a VCF.
#[derive(Debug, Clone, PartialEq)]
pub struct VcfRecord {
    pub chrom: String,
    /// 1-based position of the first REF base
    pub pos: u64,
    pub ids: Vec<String>,
    pub reference: String,
    pub alts: Vec<String>,
    pub qual: Option<f64>,
    pub filters: Vec<String>,
    /// INFO values as text, one per list element; flags map to an empty list
    pub info: BTreeMap<String, Vec<String>>,
}

impl VcfRecord {
    /// Parse one data line against `header`, which supplies the INFO types.
    pub fn parse(header: &VcfHeader, line: &str) -> Result<Self> {
        let line = line.trim_end_matches(['\r', '\n']);
        let mut reader = vcf::io::Reader::new(line.as_bytes());
        let mut record = RecordBuf::default();

        match reader.read_record_buf(header, &mut record) {
            Ok(0) => Err(TrackError::record_parse("empty line")),
            Ok(_) => Self::from_record_buf(&record),
            Err(e) => Err(TrackError::record_parse(e.to_string())),
        }
    }

    fn from_record_buf(record: &RecordBuf) -> Result<Self> {
        let chrom = record.reference_sequence_name();
        let pos = record
            .variant_start()
            .map(|p| usize::from(p) as u64)
            .ok_or_else(|| TrackError::record_parse(format!("missing POS on {}", chrom)))?;

        let reference = record.reference_bases();
        if reference.is_empty() || reference == "." {
            return Err(TrackError::record_parse(format!("missing REF at {}:{}", chrom, pos)));
        }

        let info = record
            .info()
            .as_ref()
            .iter()
            .map(|(key, value)| (key.clone(), info_values(value.as_ref())))
            .collect();

        Ok(Self {
            chrom: chrom.to_string(),
            pos,
            ids: record.ids().as_ref().iter().cloned().collect(),
            reference: reference.to_string(),
            alts: record.alternate_bases().as_ref().to_vec(),
            qual: record.quality_score().map(f64::from),
            filters: record.filters().as_ref().iter().cloned().collect(),
            info,
        })
    }

    pub fn info_value(&self, key: &str) -> Option<&str> {
        self.info
            .get(key)
            .and_then(|values| values.first())
            .map(String::as_str)
            .filter(|v| *v != ".")
    }

    pub fn sv_type(&self) -> Option<&str> {
        self.info_value("SVTYPE")
    }

    /// 0-based inclusive start
    pub fn start(&self) -> u64 {
        self.pos - 1
    }

    /// 0-based exclusive end: `INFO.END` when present, else the REF span
    pub fn end(&self) -> u64 {
        self.info_value("END")
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|&end| end >= self.pos)
            .unwrap_or(self.start() + self.reference.len() as u64)
    }

    pub fn overlaps(&self, start: u64, end: u64) -> bool {
        self.start() < end && self.end() > start
    }

    /// Expand into one entry per ALT allele, placed on absolute coordinates.
    pub fn to_entries(&self, header: &VcfHeader, chr_name: &str, chr_offset: u64) -> Vec<VariantEntry> {
        let sv_type = self.sv_type();
        let from = self.pos + chr_offset;
        let to = match sv_type {
            Some(_) => self.end() + chr_offset,
            None => from + self.reference.len() as u64,
        };

        let allele_numbers = self.info.get("AN").map(Vec::as_slice).unwrap_or(&[]);

        self.alts
            .iter()
            .enumerate()
            .map(|(index, alt)| {
                let allele_number = if allele_numbers.len() == self.alts.len() {
                    allele_numbers.get(index)
                } else {
                    allele_numbers.first()
                };

                let (variant_type, category) = match sv_type {
                    Some(sv) => (VariantType::from_sv_type(sv), VariantCategory::Structural),
                    None => (
                        VariantType::from_alleles(&self.reference, alt),
                        VariantCategory::Snv,
                    ),
                };

                VariantEntry {
                    id: VariantEntry::make_id(chr_name, self.pos, &self.reference, alt),
                    reference: self.reference.clone(),
                    alt: alt.clone(),
                    from,
                    to,
                    chr_name: chr_name.to_string(),
                    chr_offset,
                    allele_count: self.per_alt("AC", index).and_then(|v| v.parse().ok()),
                    allele_frequency: self.per_alt("AF", index).and_then(|v| v.parse().ok()),
                    allele_number: allele_number.and_then(|v| v.parse().ok()),
                    variant_type,
                    category,
                    info: self.info_for_alt(header, index),
                }
            })
            .collect()
    }

    fn per_alt(&self, key: &str, index: usize) -> Option<&str> {
        self.info
            .get(key)
            .and_then(|values| values.get(index))
            .map(String::as_str)
            .filter(|v| *v != ".")
    }

    /// INFO restricted to the values that belong to ALT `index`.
    fn info_for_alt(&self, header: &VcfHeader, index: usize) -> BTreeMap<String, String> {
        self.info
            .iter()
            .map(|(key, values)| {
                let value = if values.is_empty() {
                    "true".to_string()
                } else {
                    match InfoNumber::of(header, key) {
                        InfoNumber::PerAlt => values.get(index).cloned().unwrap_or_default(),
                        InfoNumber::PerAllele => {
                            let own = values.get(index + 1).map(String::as_str).unwrap_or(".");
                            format!("{},{}", values[0], own)
                        }
                        _ => values.join(","),
                    }
                };
                (key.clone(), value)
            })
            .collect()
    }
}

/// Text form of a parsed INFO value; missing values and missing list
/// elements become `.`.
fn info_values(value: Option<&Value>) -> Vec<String> {
    fn list<T: ToString>(values: &[Option<T>]) -> Vec<String> {
        values
            .iter()
            .map(|v| v.as_ref().map_or_else(|| ".".to_string(), T::to_string))
            .collect()
    }

    match value {
        None => vec![".".to_string()],
        Some(Value::Flag) => Vec::new(),
        Some(Value::Integer(n)) => vec![n.to_string()],
        Some(Value::Float(x)) => vec![x.to_string()],
        Some(Value::Character(c)) => vec![c.to_string()],
        Some(Value::String(s)) => s.split(',').map(str::to_string).collect(),
        Some(Value::Array(Array::Integer(values))) => list(values),
        Some(Value::Array(Array::Float(values))) => list(values),
        Some(Value::Array(Array::Character(values))) => list(values),
        Some(Value::Array(Array::String(values))) => list(values),
    }
}

/// Cheap span check used while scanning decompressed chunks. Returns
/// `None` for lines too broken to place; those are handed to the record
/// parser so the failure is reported there.
fn line_span(line: &str) -> Option<(&str, u64, u64)> {
    let mut fields = line.splitn(9, '\t');
    let chrom = fields.next()?;
    let pos = fields.next()?.parse::<u64>().ok().filter(|&p| p > 0)?;
    let reference = fields.nth(1)?;
    let info = fields.nth(3).unwrap_or("");

    let start = pos - 1;
    let end = info
        .split(';')
        .find_map(|kv| kv.strip_prefix("END="))
        .and_then(|v| v.parse::<u64>().ok())
        .filter(|&end| end >= pos)
        .unwrap_or(start + reference.len() as u64);

    Some((chrom, start, end))
}

/// Bgzipped VCF with a tabix index. Header and index are read lazily on
/// first use and kept for the life of the reader.
pub struct TabixVcf {
    vcf: Arc<dyn ByteSource>,
    tbi: Arc<dyn ByteSource>,
    index: OnceCell<Arc<TabixIndex>>,
    header: OnceCell<Arc<VcfHeader>>,
}

impl TabixVcf {
    pub fn new(vcf: Arc<dyn ByteSource>, tbi: Arc<dyn ByteSource>) -> Self {
        Self {
            vcf,
            tbi,
            index: OnceCell::new(),
            header: OnceCell::new(),
        }
    }

    pub fn open(vcf_url: &str, tbi_url: &str) -> Self {
        Self::new(open_byte_source(vcf_url), open_byte_source(tbi_url))
    }

    pub fn vcf_url(&self) -> &str {
        self.vcf.url()
    }

    pub async fn index(&self) -> Result<Arc<TabixIndex>> {
        self.index
            .get_or_try_init(|| async { TabixIndex::load(self.tbi.as_ref()).await.map(Arc::new) })
            .await
            .cloned()
    }

    async fn read_header(&self) -> Result<Arc<VcfHeader>> {
        let text = bgzf::read_header_text(self.vcf.as_ref()).await?;
        let header = parse_header(&text)?;
        log::debug!(
            "Read VCF header from {} ({} INFO fields, {} samples)",
            self.vcf.url(),
            header.infos().len(),
            header.sample_names().len()
        );
        Ok(Arc::new(header))
    }

    async fn lines_in(&self, chr: &str, start: u64, end: u64) -> Result<Vec<String>> {
        let index = self.index().await?;
        let chunks = index.query(chr, start, end)?;
        let mut lines = Vec::new();

        'chunks: for chunk in &chunks {
            for line in bgzf::read_chunk_lines(self.vcf.as_ref(), chunk).await? {
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }

                let keep = match line_span(&line) {
                    Some((chrom, _, _)) if chrom != chr => false,
                    Some((_, line_start, _)) if line_start >= end => break 'chunks,
                    Some((_, _, line_end)) => line_end > start,
                    None => true,
                };
                if keep {
                    lines.push(line);
                }
            }
        }

        Ok(lines)
    }
}

impl VariantSource for TabixVcf {
    fn header(&self) -> BoxFuture<'_, Result<Arc<VcfHeader>>> {
        Box::pin(async move {
            self.header
                .get_or_try_init(|| self.read_header())
                .await
                .cloned()
        })
    }

    fn fetch_lines<'a>(&'a self, chr: &'a str, start: u64, end: u64) -> BoxFuture<'a, Result<Vec<String>>> {
        Box::pin(self.lines_in(chr, start, end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "##fileformat=VCFv4.2\n\
        ##INFO=<ID=AC,Number=A,Type=Integer,Description=\"Allele count, per ALT\">\n\
        ##INFO=<ID=AN,Number=1,Type=Integer,Description=\"Total alleles\">\n\
        ##INFO=<ID=AF,Number=A,Type=Float,Description=\"Allele frequency\">\n\
        ##INFO=<ID=DP_R,Number=R,Type=Integer,Description=\"Depth per allele\">\n\
        ##INFO=<ID=DB,Number=0,Type=Flag,Description=\"dbSNP membership\">\n\
        ##INFO=<ID=SVTYPE,Number=1,Type=String,Description=\"Structural variant type\">\n\
        ##INFO=<ID=END,Number=1,Type=Integer,Description=\"End position\">\n\
        #CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n";

    fn header() -> VcfHeader {
        parse_header(HEADER).unwrap()
    }

    #[test]
    fn test_header_info_numbers() {
        let header = header();
        assert_eq!(header.infos().len(), 7);
        assert_eq!(InfoNumber::of(&header, "AC"), InfoNumber::PerAlt);
        assert_eq!(InfoNumber::of(&header, "AN"), InfoNumber::Fixed(1));
        assert_eq!(InfoNumber::of(&header, "DP_R"), InfoNumber::PerAllele);
        assert_eq!(InfoNumber::of(&header, "XYZ"), InfoNumber::Unbounded);
        assert!(header.sample_names().is_empty());

        // Undeclared allele counts stay per ALT
        assert_eq!(InfoNumber::of(&VcfHeader::default(), "AF"), InfoNumber::PerAlt);
    }

    #[test]
    fn test_header_requires_file_format() {
        let err = parse_header("#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n").unwrap_err();
        assert!(matches!(err, TrackError::InvalidHeader { .. }));
    }

    #[test]
    fn test_record_parse() {
        let record = VcfRecord::parse(
            &header(),
            "chr1\t100\trs1\tA\tG,AT\t50\tPASS\tAC=3,1;AF=0.25,0.01;AN=12;DB",
        )
        .unwrap();
        assert_eq!(record.pos, 100);
        assert_eq!(record.ids, vec!["rs1"]);
        assert_eq!(record.alts, vec!["G", "AT"]);
        assert_eq!(record.qual, Some(50.0));
        assert_eq!(record.filters, vec!["PASS"]);
        assert_eq!(record.info["AC"], vec!["3", "1"]);
        assert!(record.info["DB"].is_empty());
        assert_eq!((record.start(), record.end()), (99, 100));
    }

    #[test]
    fn test_record_parse_errors() {
        let header = header();
        assert!(VcfRecord::parse(&header, "chr1\t100\t.\tA").is_err());
        assert!(VcfRecord::parse(&header, "chr1\tabc\t.\tA\tG\t.\t.\t.").is_err());
        assert!(VcfRecord::parse(&header, "chr1\t0\t.\tA\tG\t.\t.\t.").is_err());
        assert!(VcfRecord::parse(&header, "chr1\t5\t.\t.\tG\t.\t.\t.").is_err());
        assert!(VcfRecord::parse(&header, "").is_err());
    }

    #[test]
    fn test_entries_per_alt() {
        let header = header();
        let record = VcfRecord::parse(
            &header,
            "chr2\t10\t.\tAC\tA,ACC,GT\t.\tPASS\tAC=1,2,.;AF=0.1,0.2,.;AN=40;DP_R=9,8,7,6",
        )
        .unwrap();
        let entries = record.to_entries(&header, "chr2", 1000);

        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].variant_type, VariantType::Deletion);
        assert_eq!(entries[1].variant_type, VariantType::Insertion);
        assert_eq!(entries[2].variant_type, VariantType::Variant);

        assert_eq!((entries[0].from, entries[0].to), (1010, 1012));
        assert_eq!(entries[1].allele_count, Some(2));
        assert_eq!(entries[1].allele_frequency, Some(0.2));
        assert_eq!(entries[2].allele_frequency, None);
        assert!(entries.iter().all(|e| e.allele_number == Some(40)));

        assert_eq!(entries[1].info["AF"], "0.2");
        assert_eq!(entries[1].info["DP_R"], "9,7");
        assert_eq!(entries[0].id, "chr2:10:AC:A");
    }

    #[test]
    fn test_allele_number_per_alt_when_aligned() {
        let header = parse_header(
            "##fileformat=VCFv4.2\n\
             ##INFO=<ID=AN,Number=A,Type=Integer,Description=\"Alleles called, per ALT\">\n\
             #CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n",
        )
        .unwrap();
        let record = VcfRecord::parse(&header, "1\t5\t.\tA\tG,T\t.\t.\tAN=10,20").unwrap();
        let entries = record.to_entries(&header, "1", 0);
        assert_eq!(entries[0].allele_number, Some(10));
        assert_eq!(entries[1].allele_number, Some(20));
    }

    #[test]
    fn test_structural_variant() {
        let header = header();
        let record = VcfRecord::parse(
            &header,
            "chr1\t1000\tsv1\tN\t<DEL>\t.\tPASS\tSVTYPE=DEL;END=5000;AF=0.002",
        )
        .unwrap();
        let entries = record.to_entries(&header, "chr1", 0);

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].variant_type, VariantType::Deletion);
        assert_eq!(entries[0].category, VariantCategory::Structural);
        assert_eq!((entries[0].from, entries[0].to), (1000, 5000));
        assert_eq!(entries[0].allele_frequency, Some(0.002));
        assert!(record.overlaps(4000, 4001));
    }

    #[test]
    fn test_line_span() {
        assert_eq!(line_span("chr1\t100\t.\tACG\tA\t.\t.\tAF=1"), Some(("chr1", 99, 102)));
        assert_eq!(line_span("chr1\t100\t.\tN\t<DEL>\t.\t.\tSVTYPE=DEL;END=400"), Some(("chr1", 99, 400)));
        assert_eq!(line_span("garbage"), None);
    }
}
