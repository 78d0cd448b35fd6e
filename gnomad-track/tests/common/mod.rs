//! Bgzipped VCF + tabix fixtures, in memory or on disk

#![allow(dead_code)]

use std::io::Write;
use std::sync::Arc;

use gnomad_core::io::MemoryFile;
use gnomad_core::{DataConfig, TabixVcf};
use noodles::core::Position;
use noodles::csi::binning_index::index::reference_sequence::bin::Chunk;
use noodles::{bgzf, csi, tabix};
use tempfile::TempDir;

pub const HEADER: &str = "##fileformat=VCFv4.2\n\
##INFO=<ID=AC,Number=A,Type=Integer,Description=\"Alternate allele count\">\n\
##INFO=<ID=AN,Number=1,Type=Integer,Description=\"Total number of alleles\">\n\
##INFO=<ID=AF,Number=A,Type=Float,Description=\"Alternate allele frequency\">\n\
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n";

/// `(vcf.gz, vcf.gz.tbi)` bytes with one record per block. Records must
/// be sorted and grouped by chromosome.
pub fn build_vcf(records: &[String]) -> (Vec<u8>, Vec<u8>) {
    let mut writer = bgzf::Writer::new(Vec::new());
    writer.write_all(HEADER.as_bytes()).unwrap();
    writer.flush().unwrap();

    let mut indexer = tabix::index::Indexer::default();
    indexer.set_header(csi::binning_index::index::header::Builder::vcf().build());

    for record in records {
        let start = writer.virtual_position();
        writeln!(writer, "{}", record).unwrap();
        let end = writer.virtual_position();
        writer.flush().unwrap();

        let fields: Vec<&str> = record.split('\t').collect();
        let pos: usize = fields[1].parse().unwrap();
        let last = pos + fields[3].len() - 1;
        indexer
            .add_record(
                fields[0],
                Position::new(pos).unwrap(),
                Position::new(last).unwrap(),
                Chunk::new(start, end),
            )
            .unwrap();
    }
    let vcf = writer.finish().unwrap();

    let dir = tempfile::tempdir().unwrap();
    let tbi_path = dir.path().join("variants.vcf.gz.tbi");
    tabix::write(&tbi_path, &indexer.build()).unwrap();
    let tbi = std::fs::read(&tbi_path).unwrap();

    (vcf, tbi)
}

pub fn memory_vcf(records: &[String]) -> Arc<TabixVcf> {
    let (vcf, tbi) = build_vcf(records);
    Arc::new(TabixVcf::new(
        Arc::new(MemoryFile::new("mem://variants.vcf.gz", vcf)),
        Arc::new(MemoryFile::new("mem://variants.vcf.gz.tbi", tbi)),
    ))
}

/// One SNV every `step` bases on `chrom`, allele frequency cycling through
/// a few decades
pub fn records_every(chrom: &str, length: u64, step: u64) -> Vec<String> {
    let afs = ["0.5", "0.01", "0.0001", "0.000001"];
    (1..=length / step)
        .map(|i| {
            let pos = i * step;
            format!(
                "{}\t{}\t.\tA\tG\t.\tPASS\tAC=1;AN=1000;AF={}",
                chrom,
                pos,
                afs[(i as usize) % afs.len()]
            )
        })
        .collect()
}

pub struct Dataset {
    pub dir: TempDir,
    pub config: DataConfig,
}

/// Write the files for a dataset to disk and describe them
pub fn write_dataset(records: &[String], sizes: &[(&str, u64)]) -> Dataset {
    let dir = tempfile::tempdir().unwrap();
    let (vcf, tbi) = build_vcf(records);

    let vcf_path = dir.path().join("variants.vcf.gz");
    let sizes_path = dir.path().join("genome.chrom.sizes");
    std::fs::write(&vcf_path, vcf).unwrap();
    std::fs::write(dir.path().join("variants.vcf.gz.tbi"), tbi).unwrap();

    let sizes_text: String = sizes
        .iter()
        .map(|(name, len)| format!("{}\t{}\n", name, len))
        .collect();
    std::fs::write(&sizes_path, sizes_text).unwrap();

    let config = DataConfig::new(
        vcf_path.display().to_string(),
        sizes_path.display().to_string(),
    );
    Dataset { dir, config }
}
