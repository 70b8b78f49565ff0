//! Stub rasterizer shared by the text module tests

use super::font_atlas::{GlyphBitmap, GlyphRasterizer};

/// Monospaced stub font: printable ASCII is displayable, every glyph is a
/// solid box standing on the baseline.
pub struct MonoRasterizer {
    advance: u32,
    glyph_size: Option<(u32, u32)>,
}

impl MonoRasterizer {
    pub fn new(advance: u32) -> Self {
        Self {
            advance,
            glyph_size: None,
        }
    }

    pub fn with_glyph_size(mut self, width: u32, height: u32) -> Self {
        self.glyph_size = Some((width, height));
        self
    }
}

impl GlyphRasterizer for MonoRasterizer {
    fn can_display(&self, code: u8) -> bool {
        (32..=126).contains(&code)
    }

    fn measure_width(&self, _code: u8, _pixel_size: u32) -> u32 {
        self.advance
    }

    fn descent(&self, pixel_size: u32) -> u32 {
        pixel_size / 4
    }

    fn rasterize(&self, _code: u8, pixel_size: u32) -> GlyphBitmap {
        let (width, height) = self
            .glyph_size
            .unwrap_or((self.advance.saturating_sub(2), pixel_size / 2));
        GlyphBitmap {
            width,
            height,
            xmin: 1,
            ymin: 0,
            coverage: vec![255; (width * height) as usize],
        }
    }
}
