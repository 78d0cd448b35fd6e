/*!
# gnomAD Render Encoder

CPU-side geometry encoding for the gnomAD variant track. The renderer that
uploads these buffers is external; this crate only produces them.

## Architecture

1. **Buffers**: growable `Pod` arrays that double on overflow
2. **Scales**: genome → screen x, allele frequency → screen y
3. **Encoder**: visible tiles → deduplicated rectangles → triangles
4. **Tiling**: viewport → zoom level, visible tiles, legend rows, rescaling
*/

pub mod buffers;
pub mod encoder;
pub mod palette;
pub mod scale;
pub mod tiling;

pub use buffers::GrowableBuffer;
pub use encoder::{EncodeOptions, PlacedVariant, RenderEncoder, RenderOutput};
pub use palette::{ColorTexture, Palette, PaletteIndex, Rgba};
pub use scale::{FrequencyScale, LinearScale, LogScale};
pub use tiling::{label_positions, rescale_transform, visible_tiles, zoom_level, RescaleTransform};

/// Version information for the gnomAD render encoder
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
