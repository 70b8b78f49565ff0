//! Glyph rasterization backed by `fontdue`
//!
//! Loads TrueType/OpenType data and serves the [`GlyphRasterizer`] queries
//! the atlas builder needs. Code points are interpreted as Latin-1, so byte
//! `0xE9` is `é`.

use std::path::Path;

use fontdue::{Font, FontSettings};

use super::font_atlas::{FontError, FontResult, GlyphBitmap, GlyphRasterizer};

/// [`GlyphRasterizer`] over a parsed `fontdue` font
pub struct FontdueRasterizer {
    font: Font,
}

impl FontdueRasterizer {
    /// Parse font file bytes (TTF or OTF)
    pub fn from_bytes(font_data: &[u8]) -> FontResult<Self> {
        let font = Font::from_bytes(font_data, FontSettings::default())
            .map_err(|e| FontError::LoadError(format!("fontdue error: {}", e)))?;
        Ok(Self { font })
    }

    /// Read and parse a font file
    pub fn from_file(path: impl AsRef<Path>) -> FontResult<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path)
            .map_err(|e| FontError::LoadError(format!("{}: {}", path.display(), e)))?;
        log::info!("Loaded font file {}", path.display());
        Self::from_bytes(&data)
    }

    /// Underlying font
    pub fn font(&self) -> &Font {
        &self.font
    }
}

impl GlyphRasterizer for FontdueRasterizer {
    fn can_display(&self, code: u8) -> bool {
        self.font.lookup_glyph_index(char::from(code)) != 0
    }

    fn measure_width(&self, code: u8, pixel_size: u32) -> u32 {
        let metrics = self.font.metrics(char::from(code), pixel_size as f32);
        metrics.advance_width.round().max(0.0) as u32
    }

    fn descent(&self, pixel_size: u32) -> u32 {
        self.font
            .horizontal_line_metrics(pixel_size as f32)
            .map_or(0, |line| (-line.descent).ceil().max(0.0) as u32)
    }

    fn rasterize(&self, code: u8, pixel_size: u32) -> GlyphBitmap {
        let (metrics, coverage) = self.font.rasterize(char::from(code), pixel_size as f32);
        GlyphBitmap {
            width: metrics.width as u32,
            height: metrics.height as u32,
            xmin: metrics.xmin,
            ymin: metrics.ymin,
            coverage,
        }
    }
}
