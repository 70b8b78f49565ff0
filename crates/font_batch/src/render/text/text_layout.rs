//! Quad generation for batched text
//!
//! Converts byte strings into interleaved vertex data (position xyz, color
//! rgba, texcoord uv) with four vertices per glyph, plus the static index
//! pattern shared by every batch.

use serde::{Deserialize, Serialize};

use super::font_atlas::{cell_coords, GlyphMetrics};
use crate::foundation::math::{Vec3, Vec4};

/// Number of addressable code points
pub const GLYPH_COUNT: usize = 256;

/// Cells per atlas row and column
pub const GRID_DIM: u32 = 16;

/// Glyphs drawn by one batch
pub const MAX_BATCH_GLYPHS: usize = 128;

/// Vertices emitted per glyph quad
pub const VERTICES_PER_GLYPH: usize = 4;

/// Indices consumed per glyph quad (two triangles)
pub const INDICES_PER_GLYPH: usize = 6;

/// Floats per interleaved vertex
pub const FLOATS_PER_VERTEX: usize = 9;

/// Byte stride of one interleaved vertex
pub const VERTEX_STRIDE: u32 = (FLOATS_PER_VERTEX * std::mem::size_of::<f32>()) as u32;

/// Byte offset of the color attribute
pub const COLOR_OFFSET: u32 = (3 * std::mem::size_of::<f32>()) as u32;

/// Byte offset of the texture coordinate attribute
pub const TEX_COORD_OFFSET: u32 = (7 * std::mem::size_of::<f32>()) as u32;

/// Texture-space side of one atlas cell
const CELL_UV: f32 = 1.0 / GRID_DIM as f32;

/// How the pen moves between glyphs while drawing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GlyphAdvance {
    /// Every glyph advances by the full character size
    #[default]
    FixedCell,
    /// Each glyph advances by its own measured width
    Proportional,
}

/// Which part of a glyph's atlas cell a quad samples
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellSampling {
    /// The whole square cell
    #[default]
    FullCell,
    /// Only the glyph's measured width; the quad narrows to match
    ClipToGlyph,
}

/// Layout options for the batch renderer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextRenderConfig {
    /// Pen advance rule
    #[serde(default)]
    pub advance: GlyphAdvance,
    /// Cell sampling rule
    #[serde(default)]
    pub sampling: CellSampling,
}

/// One interleaved vertex
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlyphVertex {
    /// Position
    pub position: [f32; 3],
    /// RGBA color
    pub color: [f32; 4],
    /// Atlas texture coordinate
    pub tex_coord: [f32; 2],
}

impl GlyphVertex {
    fn write_to(&self, out: &mut Vec<f32>) {
        out.extend_from_slice(&self.position);
        out.extend_from_slice(&self.color);
        out.extend_from_slice(&self.tex_coord);
    }
}

/// Reusable scratch buffer for one batch of glyph quads
#[derive(Debug, Clone)]
pub struct QuadBatch {
    floats: Vec<f32>,
    glyphs: usize,
}

impl QuadBatch {
    /// Scratch sized for [`MAX_BATCH_GLYPHS`] glyphs
    pub fn new() -> Self {
        Self {
            floats: Vec::with_capacity(MAX_BATCH_GLYPHS * VERTICES_PER_GLYPH * FLOATS_PER_VERTEX),
            glyphs: 0,
        }
    }

    /// Drop all queued quads, keeping the allocation
    pub fn clear(&mut self) {
        self.floats.clear();
        self.glyphs = 0;
    }

    /// Quads currently queued
    pub fn glyph_count(&self) -> usize {
        self.glyphs
    }

    /// Indices needed to draw the queued quads
    pub fn index_count(&self) -> u32 {
        (self.glyphs * INDICES_PER_GLYPH) as u32
    }

    /// Interleaved vertex floats
    pub fn floats(&self) -> &[f32] {
        &self.floats
    }

    /// Interleaved vertex data as bytes, ready for upload
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.floats)
    }

    /// Decoded vertices, mainly for inspection
    pub fn vertices(&self) -> impl Iterator<Item = GlyphVertex> + '_ {
        self.floats.chunks_exact(FLOATS_PER_VERTEX).map(|v| GlyphVertex {
            position: [v[0], v[1], v[2]],
            color: [v[3], v[4], v[5], v[6]],
            tex_coord: [v[7], v[8]],
        })
    }

    /// Append the quads for `text` starting at `start`
    ///
    /// Every byte produces a quad; cells of non-displayable code points are
    /// transparent in the atlas so they draw nothing visible. Returns the pen
    /// x position after the last glyph.
    pub fn push_text(
        &mut self,
        text: &[u8],
        start: &Vec3,
        color: &Vec4,
        char_size: f32,
        metrics: &GlyphMetrics,
        config: &TextRenderConfig,
    ) -> f32 {
        let color = [color.x, color.y, color.z, color.w];
        let (y, z) = (start.y, start.z);
        let mut x = start.x;

        for &code in text {
            let glyph = metrics.get(code);
            let (col, row) = cell_coords(code);
            let u = col as f32 / GRID_DIM as f32;
            let v = row as f32 / GRID_DIM as f32;

            let (quad_width, u_extent) = match config.sampling {
                CellSampling::FullCell => (char_size, CELL_UV),
                CellSampling::ClipToGlyph => (
                    char_size * glyph.tex_width * GRID_DIM as f32,
                    glyph.tex_width,
                ),
            };

            let corners = [
                ([x, y, z], [u, v]),
                ([x, y + char_size, z], [u, v + CELL_UV]),
                ([x + quad_width, y + char_size, z], [u + u_extent, v + CELL_UV]),
                ([x + quad_width, y, z], [u + u_extent, v]),
            ];
            for (position, tex_coord) in corners {
                GlyphVertex {
                    position,
                    color,
                    tex_coord,
                }
                .write_to(&mut self.floats);
            }
            self.glyphs += 1;

            x += match config.advance {
                GlyphAdvance::FixedCell => char_size,
                GlyphAdvance::Proportional => glyph.advance_width * char_size,
            };
        }
        x
    }
}

impl Default for QuadBatch {
    fn default() -> Self {
        Self::new()
    }
}

/// Index pattern for `glyphs` quads: `0,1,2, 2,3,0` offset by 4 per quad
pub fn quad_indices(glyphs: usize) -> Vec<u16> {
    (0..glyphs)
        .flat_map(|glyph| {
            let base = (glyph * VERTICES_PER_GLYPH) as u16;
            [base, base + 1, base + 2, base + 2, base + 3, base]
        })
        .collect()
}

/// Encode text as single-byte code points
///
/// Characters U+0000 to U+00FF map to their Latin-1 byte; anything else
/// becomes `substitute`.
pub fn encode_latin1(text: &str, substitute: u8) -> Vec<u8> {
    text.chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(substitute))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::text::font_atlas::GlyphInfo;
    use approx::assert_relative_eq;

    fn metrics_with(code: u8, advance_width: f32, tex_width: f32) -> GlyphMetrics {
        let mut metrics = GlyphMetrics::empty();
        metrics.set(
            code,
            GlyphInfo {
                displayable: true,
                advance_width,
                tex_width,
            },
        );
        metrics
    }

    #[test]
    fn test_vertex_layout_constants() {
        assert_eq!(VERTEX_STRIDE, 36);
        assert_eq!(COLOR_OFFSET, 12);
        assert_eq!(TEX_COORD_OFFSET, 28);
    }

    #[test]
    fn test_single_quad_matches_cell() {
        let metrics = metrics_with(b'A', 0.625, 10.0 / 256.0);
        let mut batch = QuadBatch::new();
        let color = Vec4::new(1.0, 0.5, 0.25, 1.0);

        let end = batch.push_text(
            b"A",
            &Vec3::new(2.0, 3.0, -1.0),
            &color,
            8.0,
            &metrics,
            &TextRenderConfig::default(),
        );

        assert_eq!(end, 10.0);
        assert_eq!(batch.glyph_count(), 1);
        assert_eq!(batch.index_count(), 6);
        assert_eq!(batch.floats().len(), 36);

        // 'A' = 65 -> column 1, row 4
        let vertices: Vec<_> = batch.vertices().collect();
        assert_eq!(vertices[0].position, [2.0, 3.0, -1.0]);
        assert_eq!(vertices[0].tex_coord, [0.0625, 0.25]);
        assert_eq!(vertices[1].position, [2.0, 11.0, -1.0]);
        assert_eq!(vertices[1].tex_coord, [0.0625, 0.3125]);
        assert_eq!(vertices[2].position, [10.0, 11.0, -1.0]);
        assert_eq!(vertices[2].tex_coord, [0.125, 0.3125]);
        assert_eq!(vertices[3].position, [10.0, 3.0, -1.0]);
        assert_eq!(vertices[3].tex_coord, [0.125, 0.25]);
        assert!(vertices.iter().all(|v| v.color == [1.0, 0.5, 0.25, 1.0]));
    }

    #[test]
    fn test_fixed_advance_ignores_metrics() {
        let metrics = metrics_with(b'i', 0.25, 4.0 / 256.0);
        let mut batch = QuadBatch::new();

        let end = batch.push_text(
            b"i\x00i",
            &Vec3::zeros(),
            &Vec4::new(1.0, 1.0, 1.0, 1.0),
            10.0,
            &metrics,
            &TextRenderConfig::default(),
        );

        // Non-displayable bytes still occupy a cell.
        assert_eq!(batch.glyph_count(), 3);
        assert_eq!(end, 30.0);
    }

    #[test]
    fn test_proportional_advance_and_clipped_sampling() {
        let metrics = metrics_with(b'i', 0.25, 4.0 / 256.0);
        let config = TextRenderConfig {
            advance: GlyphAdvance::Proportional,
            sampling: CellSampling::ClipToGlyph,
        };
        let mut batch = QuadBatch::new();

        let end = batch.push_text(
            b"ii",
            &Vec3::zeros(),
            &Vec4::new(1.0, 1.0, 1.0, 1.0),
            16.0,
            &metrics,
            &config,
        );

        assert_relative_eq!(end, 8.0);
        let vertices: Vec<_> = batch.vertices().collect();
        // Quad width = 16 * (4/256) * 16 = 4
        assert_relative_eq!(vertices[2].position[0], 4.0);
        assert_relative_eq!(vertices[2].tex_coord[0] - vertices[0].tex_coord[0], 4.0 / 256.0);
        assert_relative_eq!(vertices[4].position[0], 4.0);
    }

    #[test]
    fn test_clear_keeps_capacity() {
        let metrics = GlyphMetrics::empty();
        let mut batch = QuadBatch::new();
        let capacity = batch.floats.capacity();
        batch.push_text(
            &[b'x'; MAX_BATCH_GLYPHS],
            &Vec3::zeros(),
            &Vec4::zeros(),
            1.0,
            &metrics,
            &TextRenderConfig::default(),
        );
        assert_eq!(batch.floats.capacity(), capacity);

        batch.clear();
        assert_eq!(batch.glyph_count(), 0);
        assert!(batch.as_bytes().is_empty());
    }

    #[test]
    fn test_quad_indices_cover_full_batch() {
        let indices = quad_indices(MAX_BATCH_GLYPHS);
        assert_eq!(indices.len(), MAX_BATCH_GLYPHS * INDICES_PER_GLYPH);
        assert_eq!(&indices[..12], &[0, 1, 2, 2, 3, 0, 4, 5, 6, 6, 7, 4]);
        assert_eq!(indices.iter().copied().max(), Some(511));
    }

    #[test]
    fn test_encode_latin1() {
        assert_eq!(encode_latin1("Hi!", b'?'), b"Hi!".to_vec());
        assert_eq!(encode_latin1("caf\u{e9}", b'?'), vec![b'c', b'a', b'f', 0xE9]);
        assert_eq!(encode_latin1("\u{20ac}5", b'?'), b"?5".to_vec());
    }
}
