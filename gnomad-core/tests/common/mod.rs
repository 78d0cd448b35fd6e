//! On-disk bgzipped VCF + tabix fixtures

#![allow(dead_code)]

use noodles::core::Position;
use noodles::csi::binning_index::index::reference_sequence::bin::Chunk;
use noodles::{bgzf, csi, tabix};
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use tempfile::TempDir;

pub const HEADER: &str = "##fileformat=VCFv4.2\n\
##INFO=<ID=AC,Number=A,Type=Integer,Description=\"Alternate allele count\">\n\
##INFO=<ID=AN,Number=1,Type=Integer,Description=\"Total number of alleles\">\n\
##INFO=<ID=AF,Number=A,Type=Float,Description=\"Alternate allele frequency\">\n\
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n";

pub struct Fixture {
    pub dir: TempDir,
    pub vcf: PathBuf,
    pub tbi: PathBuf,
    pub sizes: PathBuf,
}

impl Fixture {
    pub fn vcf_url(&self) -> String {
        self.vcf.display().to_string()
    }

    pub fn tbi_url(&self) -> String {
        self.tbi.display().to_string()
    }

    pub fn sizes_url(&self) -> String {
        self.sizes.display().to_string()
    }
}

/// `(chrom, start, end)` of a data line, 1-based inclusive. Lines too
/// broken to carry a REF are placed on their POS alone.
fn record_span(record: &str) -> (&str, Position, Position) {
    let fields: Vec<&str> = record.split('\t').collect();
    let pos: usize = fields[1].parse().unwrap();
    let ref_len = fields.get(3).map_or(1, |r| r.len().max(1));
    (
        fields[0],
        Position::new(pos).unwrap(),
        Position::new(pos + ref_len - 1).unwrap(),
    )
}

/// Write a bgzipped VCF (two records per block), its tabix index and a
/// chromosome sizes file. Records must be sorted and grouped by chromosome.
pub fn write_fixture(records: &[&str], sizes: &[(&str, u64)]) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let vcf_path = dir.path().join("variants.vcf.gz");
    let tbi_path = dir.path().join("variants.vcf.gz.tbi");
    let sizes_path = dir.path().join("genome.chrom.sizes");

    let mut writer = bgzf::Writer::new(File::create(&vcf_path).unwrap());
    writer.write_all(HEADER.as_bytes()).unwrap();
    writer.flush().unwrap();

    let mut indexer = tabix::index::Indexer::default();
    indexer.set_header(csi::binning_index::index::header::Builder::vcf().build());

    for pair in records.chunks(2) {
        for record in pair {
            let start = writer.virtual_position();
            writeln!(writer, "{}", record).unwrap();
            let end = writer.virtual_position();

            let (chrom, from, to) = record_span(record);
            indexer.add_record(chrom, from, to, Chunk::new(start, end)).unwrap();
        }
        writer.flush().unwrap();
    }
    writer.finish().unwrap();
    tabix::write(&tbi_path, &indexer.build()).unwrap();

    let sizes_text: String = sizes
        .iter()
        .map(|(name, len)| format!("{}\t{}\n", name, len))
        .collect();
    std::fs::write(&sizes_path, sizes_text).unwrap();

    Fixture {
        dir,
        vcf: vcf_path,
        tbi: tbi_path,
        sizes: sizes_path,
    }
}

pub const RECORDS: &[&str] = &[
    "chr1\t10\t.\tA\tG\t.\tPASS\tAC=1;AN=100;AF=0.01",
    "chr1\t100\t.\tAT\tA\t.\tPASS\tAC=5;AN=100;AF=0.05",
    "chr1\t600\t.\tC\tCTT,T\t.\tPASS\tAC=1,2;AN=1000;AF=0.001,0.002",
    "chr1\t650\t.\tbroken",
    "chr2\t5\t.\tG\tA\t.\tPASS\tAC=1;AN=10;AF=0.1",
];

pub const SIZES: &[(&str, u64)] = &[("chr1", 1000), ("chr2", 500)];
