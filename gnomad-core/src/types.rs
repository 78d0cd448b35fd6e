use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::TrackError;

/// Absolute position on the concatenated genome
pub type GenomicPos = u64;
pub type ZoomLevel = u32;

/// Tile identifier, serialized as `"zoom.x"`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TileId {
    pub zoom: ZoomLevel,
    pub x: u64,
}

impl TileId {
    pub fn new(zoom: ZoomLevel, x: u64) -> Self {
        Self { zoom, x }
    }
}

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.zoom, self.x)
    }
}

impl FromStr for TileId {
    type Err = TrackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('.');
        let zoom = parts.next().and_then(|p| p.trim().parse::<ZoomLevel>().ok());
        let x = parts.next().and_then(|p| p.trim().parse::<u64>().ok());

        match (zoom, x, parts.next()) {
            (Some(zoom), Some(x), None) => Ok(TileId { zoom, x }),
            _ => Err(TrackError::invalid_tile_id(s)),
        }
    }
}

impl TryFrom<String> for TileId {
    type Error = TrackError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TileId> for String {
    fn from(id: TileId) -> Self {
        id.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariantType {
    Variant,
    Insertion,
    Deletion,
    Inversion,
    Duplication,
}

impl VariantType {
    /// Classify a small variant by comparing allele lengths.
    pub fn from_alleles(reference: &str, alt: &str) -> Self {
        if alt.len() > reference.len() {
            VariantType::Insertion
        } else if alt.len() < reference.len() {
            VariantType::Deletion
        } else {
            VariantType::Variant
        }
    }

    /// Classify a structural variant from its `SVTYPE` INFO value.
    pub fn from_sv_type(sv_type: &str) -> Self {
        match sv_type.to_ascii_uppercase().as_str() {
            "DEL" => VariantType::Deletion,
            "INS" => VariantType::Insertion,
            "INV" => VariantType::Inversion,
            "DUP" | "CNV" => VariantType::Duplication,
            _ => VariantType::Variant,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VariantType::Variant => "variant",
            VariantType::Insertion => "insertion",
            VariantType::Deletion => "deletion",
            VariantType::Inversion => "inversion",
            VariantType::Duplication => "duplication",
        }
    }
}

/// Whether an entry came from a short-variant record or a structural one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VariantCategory {
    Snv,
    Structural,
}

/// One ALT allele of a decoded VCF record, placed on absolute coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantEntry {
    pub id: String,
    #[serde(rename = "ref")]
    pub reference: String,
    pub alt: String,
    pub from: GenomicPos,
    pub to: GenomicPos,
    pub chr_name: String,
    pub chr_offset: GenomicPos,
    pub allele_count: Option<u64>,
    pub allele_frequency: Option<f64>,
    pub allele_number: Option<u64>,
    #[serde(rename = "type")]
    pub variant_type: VariantType,
    pub category: VariantCategory,
    pub info: BTreeMap<String, String>,
}

impl VariantEntry {
    /// Stable identifier for an allele; re-decoding the same record yields
    /// the same id.
    pub fn make_id(chr_name: &str, pos: u64, reference: &str, alt: &str) -> String {
        format!("{}:{}:{}:{}", chr_name, pos, reference, alt)
    }

    /// Position local to the chromosome (1-based, as in the VCF)
    pub fn local_from(&self) -> GenomicPos {
        self.from.saturating_sub(self.chr_offset)
    }

    pub fn local_to(&self) -> GenomicPos {
        self.to.saturating_sub(self.chr_offset)
    }

    /// Same underlying allele, regardless of id
    pub fn same_allele(&self, other: &VariantEntry) -> bool {
        self.from == other.from && self.reference == other.reference && self.alt == other.alt
    }
}
