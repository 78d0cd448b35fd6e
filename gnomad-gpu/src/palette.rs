/*!
# Variant Palette

Per-vertex colors are palette indices; the shader looks the RGBA value up in
a small square float texture built from the palette.
*/

use bytemuck::{Pod, Zeroable};
use gnomad_core::{ColorScale, VariantType};

pub type Rgba = [f32; 4];

#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaletteIndex {
    Variant = 0,
    Line = 1,
    Insertion = 2,
    Deletion = 3,
    Inversion = 4,
    Duplication = 5,
    Black = 6,
    Black05 = 7,
    White = 8,
}

impl PaletteIndex {
    pub const ALL: [PaletteIndex; 9] = [
        PaletteIndex::Variant,
        PaletteIndex::Line,
        PaletteIndex::Insertion,
        PaletteIndex::Deletion,
        PaletteIndex::Inversion,
        PaletteIndex::Duplication,
        PaletteIndex::Black,
        PaletteIndex::Black05,
        PaletteIndex::White,
    ];

    /// Value written into the color buffer
    pub fn as_f32(self) -> f32 {
        self as u32 as f32
    }

    /// Slot used for a variant rectangle. Structural types share the
    /// generic variant slot.
    pub fn for_type(variant_type: VariantType) -> Self {
        match variant_type {
            VariantType::Insertion => PaletteIndex::Insertion,
            VariantType::Deletion => PaletteIndex::Deletion,
            _ => PaletteIndex::Variant,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    colors: [Rgba; 9],
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            colors: [
                [0.3, 0.3, 0.3, 0.6],
                [0.9, 0.9, 0.9, 1.0],
                [0.6, 0.6, 0.0, 0.7],
                [1.0, 0.0, 0.0, 0.55],
                [0.68, 0.23, 0.87, 0.8],
                [0.27, 0.64, 0.09, 0.8],
                [0.0, 0.0, 0.0, 1.0],
                [0.0, 0.0, 0.0, 0.5],
                [1.0, 1.0, 1.0, 1.0],
            ],
        }
    }
}

/// Row-major RGBA float texture, `size` × `size` texels
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct Texel {
    pub rgba: Rgba,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColorTexture {
    pub size: u32,
    pub texels: Vec<Texel>,
}

impl ColorTexture {
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.texels)
    }
}

impl Palette {
    /// Default palette with the five semantic slots overridden
    pub fn with_color_scale(scale: &ColorScale) -> Self {
        let mut palette = Self::default();
        palette.set(PaletteIndex::Variant, scale.variant);
        palette.set(PaletteIndex::Insertion, scale.insertion);
        palette.set(PaletteIndex::Deletion, scale.deletion);
        palette.set(PaletteIndex::Inversion, scale.inversion);
        palette.set(PaletteIndex::Duplication, scale.duplication);
        palette
    }

    pub fn from_options(scale: Option<&ColorScale>) -> Self {
        scale.map(Self::with_color_scale).unwrap_or_default()
    }

    pub fn set(&mut self, index: PaletteIndex, color: Rgba) {
        self.colors[index as usize] = color;
    }

    pub fn color(&self, index: PaletteIndex) -> Rgba {
        self.colors[index as usize]
    }

    pub fn colors(&self) -> &[Rgba] {
        &self.colors
    }

    pub fn color_texture(&self) -> ColorTexture {
        let n = self.colors.len();
        let size = ((n as f64).sqrt().ceil() as u32).max(2);
        let mut texels = vec![Texel::zeroed(); (size * size) as usize];
        for (texel, color) in texels.iter_mut().zip(self.colors.iter()) {
            texel.rgba = *color;
        }
        ColorTexture { size, texels }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_slots() {
        assert_eq!(PaletteIndex::for_type(VariantType::Insertion).as_f32(), 2.0);
        assert_eq!(PaletteIndex::for_type(VariantType::Deletion).as_f32(), 3.0);
        assert_eq!(PaletteIndex::for_type(VariantType::Variant).as_f32(), 0.0);
        assert_eq!(PaletteIndex::for_type(VariantType::Inversion), PaletteIndex::Variant);
        assert_eq!(PaletteIndex::for_type(VariantType::Duplication), PaletteIndex::Variant);
    }

    #[test]
    fn test_texture_layout() {
        let texture = Palette::default().color_texture();
        assert_eq!(texture.size, 3);
        assert_eq!(texture.texels.len(), 9);
        assert_eq!(texture.texels[3].rgba, [1.0, 0.0, 0.0, 0.55]);
        assert_eq!(texture.as_bytes().len(), 9 * 16);
    }

    #[test]
    fn test_color_scale_override() {
        let scale = ColorScale {
            variant: [0.1, 0.1, 0.1, 1.0],
            insertion: [0.2, 0.2, 0.2, 1.0],
            deletion: [0.3, 0.3, 0.3, 1.0],
            inversion: [0.4, 0.4, 0.4, 1.0],
            duplication: [0.5, 0.5, 0.5, 1.0],
        };
        let palette = Palette::from_options(Some(&scale));
        assert_eq!(palette.color(PaletteIndex::Deletion), [0.3, 0.3, 0.3, 1.0]);
        assert_eq!(palette.color(PaletteIndex::Line), [0.9, 0.9, 0.9, 1.0]);
        assert_eq!(palette.color(PaletteIndex::White), [1.0; 4]);
    }
}
