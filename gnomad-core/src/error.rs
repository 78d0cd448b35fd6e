//! Error handling for the gnomAD tile pipeline

use thiserror::Error;

/// Errors raised while resolving coordinates, reading the indexed variant
/// file, or talking to the background worker.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrackError {
    #[error("Unknown chromosome: {name}")]
    UnknownChromosome { name: String },

    #[error("Source unavailable: {url} - {message}")]
    SourceUnavailable { url: String, message: String },

    #[error("Malformed VCF record: {message}")]
    RecordParse { message: String },

    #[error("Invalid tile id: {id}")]
    InvalidTileId { id: String },

    #[error("Invalid chromosome sizes at line {line}: {message}")]
    InvalidChromSizes { line: usize, message: String },

    #[error("Invalid tabix index: {message}")]
    InvalidIndex { message: String },

    #[error("Invalid VCF header: {message}")]
    InvalidHeader { message: String },

    #[error("Invalid BGZF block at offset {offset}: {message}")]
    InvalidBlock { offset: u64, message: String },

    #[error("Unknown dataset: {id}")]
    UnknownDataset { id: u64 },

    #[error("Tile worker is no longer running")]
    WorkerClosed,
}

impl TrackError {
    pub fn unknown_chromosome<S: Into<String>>(name: S) -> Self {
        Self::UnknownChromosome { name: name.into() }
    }

    pub fn source_unavailable<U: Into<String>, M: Into<String>>(url: U, message: M) -> Self {
        Self::SourceUnavailable {
            url: url.into(),
            message: message.into(),
        }
    }

    pub fn record_parse<S: Into<String>>(message: S) -> Self {
        Self::RecordParse { message: message.into() }
    }

    pub fn invalid_tile_id<S: Into<String>>(id: S) -> Self {
        Self::InvalidTileId { id: id.into() }
    }

    pub fn invalid_chrom_sizes<S: Into<String>>(line: usize, message: S) -> Self {
        Self::InvalidChromSizes {
            line,
            message: message.into(),
        }
    }

    pub fn invalid_index<S: Into<String>>(message: S) -> Self {
        Self::InvalidIndex { message: message.into() }
    }

    pub fn invalid_header<S: Into<String>>(message: S) -> Self {
        Self::InvalidHeader { message: message.into() }
    }

    pub fn invalid_block<S: Into<String>>(offset: u64, message: S) -> Self {
        Self::InvalidBlock {
            offset,
            message: message.into(),
        }
    }

    /// Whether the failure means the data could not be reached at all, as
    /// opposed to a problem with the data itself.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::SourceUnavailable { .. } | Self::WorkerClosed)
    }
}

/// Result type for tile pipeline operations
pub type Result<T> = std::result::Result<T, TrackError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = TrackError::unknown_chromosome("chrZ");
        assert!(matches!(err, TrackError::UnknownChromosome { .. }));
        assert_eq!(err.to_string(), "Unknown chromosome: chrZ");
    }

    #[test]
    fn test_unavailable_classification() {
        assert!(TrackError::source_unavailable("http://x/a.vcf.gz", "404").is_unavailable());
        assert!(TrackError::WorkerClosed.is_unavailable());
        assert!(!TrackError::record_parse("bad POS").is_unavailable());
    }

    #[test]
    fn test_chrom_sizes_message() {
        let err = TrackError::invalid_chrom_sizes(3, "length is not a number");
        assert_eq!(
            err.to_string(),
            "Invalid chromosome sizes at line 3: length is not a number"
        );
    }
}
