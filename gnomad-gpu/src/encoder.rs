/*!
# Render Encoder

Turns the decoded entries of the visible tiles into triangle geometry:

- one axis-aligned rectangle per unique allele
- 4 vertices (x, y pairs), 4 palette indices, 2 triangles per rectangle
- vertical placement from allele frequency on a two-band log scale

The three output buffers live across passes; each pass resets their length
and hands back a copy of exactly the written prefix.
*/

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use gnomad_core::VariantEntry;

use crate::buffers::{
    GrowableBuffer, STARTING_COLORS_LENGTH, STARTING_INDICES_LENGTH, STARTING_POSITIONS_LENGTH,
};
use crate::palette::PaletteIndex;
use crate::scale::{FrequencyScale, LinearScale};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodeOptions {
    pub variant_height: f32,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self { variant_height: 12.0 }
    }
}

/// A variant together with the top edge it was drawn at
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacedVariant {
    #[serde(flatten)]
    pub entry: VariantEntry,
    pub y_top: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderOutput {
    pub positions: Vec<f32>,
    pub colors: Vec<f32>,
    pub indices: Vec<i32>,
    pub variants: Vec<PlacedVariant>,
    pub x_scale_domain: [f64; 2],
    pub x_scale_range: [f64; 2],
}

impl RenderOutput {
    pub fn positions_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.positions)
    }

    pub fn colors_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.colors)
    }

    pub fn indices_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 2
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// The x scale the geometry was drawn with
    pub fn x_scale(&self) -> LinearScale {
        LinearScale::new(self.x_scale_domain, self.x_scale_range)
    }

    /// Variants whose rectangle covers the screen point `(x, y)` under
    /// `scale`, which may differ from the scale the geometry was drawn at.
    pub fn hit_test(&self, x: f64, y: f64, scale: &LinearScale, variant_height: f64) -> Vec<&PlacedVariant> {
        self.variants
            .iter()
            .filter(|v| {
                scale.apply(v.entry.from as f64) <= x
                    && x <= scale.apply(v.entry.to as f64)
                    && v.y_top <= y
                    && y <= v.y_top + variant_height
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct RenderEncoder {
    positions: GrowableBuffer<f32>,
    colors: GrowableBuffer<f32>,
    indices: GrowableBuffer<i32>,
}

impl Default for RenderEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderEncoder {
    pub fn new() -> Self {
        Self::with_capacity(
            STARTING_POSITIONS_LENGTH,
            STARTING_COLORS_LENGTH,
            STARTING_INDICES_LENGTH,
        )
    }

    /// Smaller starting buffers, mostly for tests
    pub fn with_capacity(positions: usize, colors: usize, indices: usize) -> Self {
        Self {
            positions: GrowableBuffer::with_capacity(positions),
            colors: GrowableBuffer::with_capacity(colors),
            indices: GrowableBuffer::with_capacity(indices),
        }
    }

    /// Total number of times any of the buffers has doubled
    pub fn grow_events(&self) -> usize {
        self.positions.grow_events() + self.colors.grow_events() + self.indices.grow_events()
    }

    pub fn encode<'a, I>(
        &mut self,
        tiles: I,
        domain: [f64; 2],
        range: [f64; 2],
        options: &EncodeOptions,
        label_positions: &[f64],
    ) -> RenderOutput
    where
        I: IntoIterator<Item = &'a [VariantEntry]>,
    {
        self.positions.clear();
        self.colors.clear();
        self.indices.clear();

        let unique = dedup_entries(tiles);

        let x_scale = LinearScale::new(domain, range);
        let y_scale = FrequencyScale::from_label_positions(label_positions);
        let height = options.variant_height as f64;

        let mut variants = Vec::with_capacity(unique.len());
        for entry in unique {
            let from = x_scale.apply(entry.from as f64);
            let to = x_scale.apply(entry.to as f64);
            let y_top = y_scale.y_top(entry.allele_frequency, height);

            let padding = (0.01 * (to - from)).min(0.5);
            self.add_rect(
                from + padding,
                to - padding,
                y_top,
                y_top + height,
                PaletteIndex::for_type(entry.variant_type),
            );

            variants.push(PlacedVariant {
                entry: entry.clone(),
                y_top,
            });
        }

        log::debug!(
            "Encoded {} variants into {} vertices",
            variants.len(),
            self.positions.len() / 2
        );

        RenderOutput {
            positions: self.positions.to_vec(),
            colors: self.colors.to_vec(),
            indices: self.indices.to_vec(),
            variants,
            x_scale_domain: domain,
            x_scale_range: range,
        }
    }

    fn add_vertex(&mut self, x: f64, y: f64) -> i32 {
        self.positions.extend_from_slice(&[x as f32, y as f32]);
        (self.positions.len() / 2 - 1) as i32
    }

    fn add_rect(&mut self, left: f64, right: f64, top: f64, bottom: f64, color: PaletteIndex) {
        let ul = self.add_vertex(left, top);
        let ur = self.add_vertex(right, top);
        let ll = self.add_vertex(left, bottom);
        let lr = self.add_vertex(right, bottom);

        self.colors.extend_from_slice(&[color.as_f32(); 4]);
        self.indices.extend_from_slice(&[ul, ur, ll, ll, lr, ur]);
    }
}

/// Merge tiles by id (later tiles win), order by position, then drop
/// neighbours that describe the same allele under a different id.
fn dedup_entries<'a, I>(tiles: I) -> Vec<&'a VariantEntry>
where
    I: IntoIterator<Item = &'a [VariantEntry]>,
{
    let mut by_id: BTreeMap<&str, &VariantEntry> = BTreeMap::new();
    for tile in tiles {
        for entry in tile {
            by_id.insert(entry.id.as_str(), entry);
        }
    }

    let mut entries: Vec<&VariantEntry> = by_id.into_values().collect();
    entries.sort_by(|a, b| {
        a.from
            .cmp(&b.from)
            .then_with(|| a.reference.cmp(&b.reference))
            .then_with(|| a.alt.cmp(&b.alt))
            .then_with(|| a.to.cmp(&b.to))
            .then_with(|| a.id.cmp(&b.id))
    });
    entries.dedup_by(|current, previous| previous.same_allele(current));
    entries
}
