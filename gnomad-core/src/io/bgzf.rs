//! Ranged BGZF reads over a [`ByteSource`]
//!
//! Only the compressed bytes a read touches are fetched. Inflating blocks
//! and tracking virtual positions is left to `noodles::bgzf`.

use noodles::bgzf::{self, VirtualPosition};
use noodles::csi::binning_index::index::reference_sequence::bin::Chunk;
use std::io::{self, BufRead, Cursor};

use crate::error::{Result, TrackError};
use crate::io::source::ByteSource;

/// Upper bound on the compressed size of one block
pub const MAX_BLOCK_SIZE: u64 = 65536;

/// Bytes requested for the first attempt at reading the header
const HEADER_READ_SIZE: u64 = 4 * MAX_BLOCK_SIZE;

/// Shift `pos` so that compressed offset `base` becomes zero.
fn rebase(pos: VirtualPosition, base: u64) -> VirtualPosition {
    let compressed = pos.compressed().saturating_sub(base);
    VirtualPosition::from((compressed << 16) | u64::from(pos.uncompressed()))
}

/// Inflated lines of `chunk`, without line terminators.
pub async fn read_chunk_lines(source: &dyn ByteSource, chunk: &Chunk) -> Result<Vec<String>> {
    let base = chunk.start().compressed();
    // The block holding the end position may run a full block past it
    let len = chunk.end().compressed().saturating_sub(base) + MAX_BLOCK_SIZE;
    let data = source.read_range(base, len).await?;

    chunk_lines(&data, rebase(chunk.start(), base), rebase(chunk.end(), base))
        .map_err(|e| TrackError::invalid_block(base, e.to_string()))
}

fn chunk_lines(data: &[u8], start: VirtualPosition, end: VirtualPosition) -> io::Result<Vec<String>> {
    let mut reader = bgzf::Reader::new(Cursor::new(data));
    reader.seek(start)?;

    let mut lines = Vec::new();
    let mut buf = Vec::new();
    while reader.virtual_position() < end {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        let line = String::from_utf8_lossy(&buf);
        lines.push(line.trim_end_matches(['\n', '\r']).to_string());
    }

    Ok(lines)
}

/// Leading `#` lines of a BGZF text file. Prefixes of growing size are
/// fetched until a data line or the end of the file is reached.
pub async fn read_header_text(source: &dyn ByteSource) -> Result<String> {
    let mut len = HEADER_READ_SIZE;

    loop {
        let data = source.read_range(0, len).await?;
        let whole_file = (data.len() as u64) < len;

        match header_prefix(&data) {
            Ok((text, true)) => return Ok(text),
            Ok((text, false)) if whole_file => return Ok(text),
            Err(e) if whole_file => return Err(TrackError::invalid_block(0, e.to_string())),
            // Cut off mid-block or mid-header
            _ => len *= 2,
        }
    }
}

/// `#` lines at the start of `data`, and whether a data line follows them.
fn header_prefix(data: &[u8]) -> io::Result<(String, bool)> {
    let mut reader = bgzf::Reader::new(data);
    let mut text = String::new();
    let mut line = Vec::new();

    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            return Ok((text, false));
        }
        if line.first() != Some(&b'#') {
            return Ok((text, true));
        }
        text.push_str(&String::from_utf8_lossy(&line));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::source::MemoryFile;
    use std::io::Write;

    /// Compress `blocks` one BGZF block each, returning the file and the
    /// virtual position at the start of every block plus the end.
    fn compress(blocks: &[&str]) -> (Vec<u8>, Vec<VirtualPosition>) {
        let mut writer = bgzf::Writer::new(Vec::new());
        let mut positions = Vec::new();
        for block in blocks {
            positions.push(writer.virtual_position());
            writer.write_all(block.as_bytes()).unwrap();
            writer.flush().unwrap();
        }
        positions.push(writer.virtual_position());
        (writer.finish().unwrap(), positions)
    }

    #[test]
    fn test_rebase_keeps_in_block_offset() {
        let pos = VirtualPosition::from((1000 << 16) | 7);
        let moved = rebase(pos, 400);
        assert_eq!(moved.compressed(), 600);
        assert_eq!(moved.uncompressed(), 7);
    }

    #[tokio::test]
    async fn test_chunk_lines_across_blocks() {
        let (file, positions) = compress(&["#h\na\tb\n", "c\td\ne\tf\n", "g\n"]);
        let source = MemoryFile::new("mem://x.gz", file);

        // From "a" through the end of the second block
        let start = VirtualPosition::from((positions[0].compressed() << 16) | 3);
        let chunk = Chunk::new(start, positions[2]);
        let lines = read_chunk_lines(&source, &chunk).await.unwrap();
        assert_eq!(lines, vec!["a\tb", "c\td", "e\tf"]);
    }

    #[tokio::test]
    async fn test_header_text_stops_at_first_record() {
        let (file, _) = compress(&["##fileformat=VCFv4.2\n", "#CHROM\tPOS\nchr1\t5\n"]);
        let source = MemoryFile::new("mem://x.gz", file);

        let text = read_header_text(&source).await.unwrap();
        assert_eq!(text, "##fileformat=VCFv4.2\n#CHROM\tPOS\n");
    }

    #[tokio::test]
    async fn test_header_larger_than_first_read() {
        // Hex noise so the compressed header outgrows the first request
        let mut state = 0x2545_f491_4f6c_dd1d_u64;
        let meta: String = (0..60_000)
            .map(|_| {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                format!("##x={:016x}\n", state)
            })
            .collect();
        let (file, _) = compress(&[&meta, "#CHROM\nchr1\n"]);
        assert!(file.len() as u64 > HEADER_READ_SIZE);
        let source = MemoryFile::new("mem://big.gz", file);

        let text = read_header_text(&source).await.unwrap();
        assert_eq!(text.lines().count(), 60_001);
    }

    #[tokio::test]
    async fn test_plain_bytes_are_rejected() {
        let source = MemoryFile::new("mem://plain", &b"chr1\t5\t.\tA\tG\t.\tPASS\tAC=1;AF=0.5\n"[..]);
        let err = read_header_text(&source).await.unwrap_err();
        assert!(matches!(err, TrackError::InvalidBlock { .. }));
    }
}
