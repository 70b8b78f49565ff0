//! Font atlas baking for text rendering
//!
//! This module rasterizes the 256 single-byte code points of a font into a
//! fixed 16x16 grid of square cells and records per-glyph metrics. The cell
//! side is the smallest power of two that fits the requested pixel size, so
//! the atlas is always `16 * cell_size` pixels square no matter how many
//! glyphs the font supports.
//!
//! Glyph pixels are opaque white with coverage in the alpha channel; tinting
//! happens at draw time through the vertex color.

use std::path::Path;

use image::{Rgba, RgbaImage};

use super::text_layout::{GLYPH_COUNT, GRID_DIM};
use crate::foundation::math::next_power_of_two;
use crate::render::gpu::GpuError;

/// Largest atlas side the builder will allocate, in pixels
pub const MAX_ATLAS_SIDE: u32 = 16384;

/// Result type for font operations
pub type FontResult<T> = Result<T, FontError>;

/// Errors that can occur during font operations
#[derive(Debug, thiserror::Error)]
pub enum FontError {
    /// Failed to load font from file or data
    #[error("Failed to load font: {0}")]
    LoadError(String),

    /// Pixel size must be at least one
    #[error("Invalid font pixel size: {0}")]
    InvalidPixelSize(u32),

    /// Requested pixel size needs a larger atlas than allowed
    #[error("Atlas for {pixel_size}px needs a side above the {max}px limit")]
    AtlasTooLarge {
        /// Requested pixel size
        pixel_size: u32,
        /// Largest allowed atlas side
        max: u32,
    },

    /// Failed to read a shader stage source
    #[error("Failed to read shader source {path}: {source}")]
    ShaderSource {
        /// Path that could not be read
        path: String,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// Failed to write the atlas image
    #[error("Failed to export atlas image: {0}")]
    AtlasExport(String),

    /// A GPU resource could not be created
    #[error(transparent)]
    Gpu(#[from] GpuError),
}

/// Antialiased coverage bitmap for one glyph
///
/// Offsets follow the usual baseline convention: `xmin` is the distance from
/// the pen position to the bitmap's left edge and `ymin` the distance from
/// the baseline up to the bitmap's bottom edge (negative for descenders).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlyphBitmap {
    /// Bitmap width in pixels
    pub width: u32,
    /// Bitmap height in pixels
    pub height: u32,
    /// Left edge relative to the pen position
    pub xmin: i32,
    /// Bottom edge relative to the baseline (y up)
    pub ymin: i32,
    /// Row-major coverage, top row first, one byte per pixel
    pub coverage: Vec<u8>,
}

/// Glyph rasterization service consumed by the atlas builder
///
/// Implementations must rasterize with antialiasing. Code points are the
/// single-byte range 0-255, interpreted as Latin-1.
pub trait GlyphRasterizer {
    /// Whether the font has a glyph for `code`
    fn can_display(&self, code: u8) -> bool;

    /// Horizontal advance of `code` at `pixel_size`, in whole pixels
    fn measure_width(&self, code: u8, pixel_size: u32) -> u32;

    /// Distance from the baseline down to the lowest descender, in pixels
    fn descent(&self, pixel_size: u32) -> u32;

    /// Rasterize `code` at `pixel_size`
    fn rasterize(&self, code: u8, pixel_size: u32) -> GlyphBitmap;
}

/// Metrics recorded for one code point
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GlyphInfo {
    /// Whether the font can render this code point
    pub displayable: bool,
    /// Advance normalized by the font pixel size
    pub advance_width: f32,
    /// Advance normalized by the atlas width
    pub tex_width: f32,
}

/// Metrics for all 256 code points, indexed by byte value
///
/// Non-displayable entries keep zero widths.
#[derive(Debug, Clone, PartialEq)]
pub struct GlyphMetrics {
    glyphs: Box<[GlyphInfo; GLYPH_COUNT]>,
}

impl GlyphMetrics {
    /// Metrics with every code point non-displayable
    pub fn empty() -> Self {
        Self {
            glyphs: Box::new([GlyphInfo::default(); GLYPH_COUNT]),
        }
    }

    /// Metrics for one code point
    pub fn get(&self, code: u8) -> &GlyphInfo {
        &self.glyphs[usize::from(code)]
    }

    /// Replace the metrics of one code point
    pub fn set(&mut self, code: u8, info: GlyphInfo) {
        self.glyphs[usize::from(code)] = info;
    }

    /// Number of displayable code points
    pub fn displayable_count(&self) -> usize {
        self.glyphs.iter().filter(|g| g.displayable).count()
    }

    /// Iterate over `(code, info)` pairs in code order
    pub fn iter(&self) -> impl Iterator<Item = (u8, &GlyphInfo)> {
        (0..=u8::MAX).zip(self.glyphs.iter())
    }

    /// Measured width of `text` rendered at `char_size`
    ///
    /// Sums `advance_width * char_size` per byte; non-displayable bytes add
    /// nothing.
    pub fn string_width(&self, text: &[u8], char_size: f32) -> f32 {
        text.iter()
            .fold(0.0, |width, &code| width + self.get(code).advance_width * char_size)
    }
}

impl Default for GlyphMetrics {
    fn default() -> Self {
        Self::empty()
    }
}

/// Baked atlas image plus the metrics needed to lay out text with it
#[derive(Debug, Clone)]
pub struct FontAtlas {
    image: RgbaImage,
    metrics: GlyphMetrics,
    pixel_size: u32,
    cell_size: u32,
    descent: u32,
}

impl FontAtlas {
    /// Atlas pixels, row 0 at the top
    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Per-glyph metrics
    pub fn metrics(&self) -> &GlyphMetrics {
        &self.metrics
    }

    /// Font pixel size the atlas was baked at
    pub fn pixel_size(&self) -> u32 {
        self.pixel_size
    }

    /// Side of one grid cell in pixels
    pub fn cell_size(&self) -> u32 {
        self.cell_size
    }

    /// Side of the square atlas in pixels
    pub fn side(&self) -> u32 {
        self.image.width()
    }

    /// Font descent used to place baselines, in pixels
    pub fn descent(&self) -> u32 {
        self.descent
    }

    /// Pixel rectangle `(x, y, side)` of the cell for `code`
    pub fn cell_rect(&self, code: u8) -> (u32, u32, u32) {
        let (col, row) = cell_coords(code);
        (col * self.cell_size, row * self.cell_size, self.cell_size)
    }

    /// Split into image and metrics, dropping the bookkeeping fields
    pub fn into_parts(self) -> (RgbaImage, GlyphMetrics) {
        (self.image, self.metrics)
    }

    /// Write the atlas to an image file for inspection
    pub fn save_png(&self, path: impl AsRef<Path>) -> FontResult<()> {
        let path = path.as_ref();
        self.image
            .save(path)
            .map_err(|e| FontError::AtlasExport(format!("{}: {}", path.display(), e)))?;
        log::info!("Font atlas written to {}", path.display());
        Ok(())
    }
}

/// Grid column and row of a code point
pub fn cell_coords(code: u8) -> (u32, u32) {
    let code = u32::from(code);
    (code % GRID_DIM, code / GRID_DIM)
}

/// Bakes a [`FontAtlas`] from a [`GlyphRasterizer`]
#[derive(Debug, Clone)]
pub struct AtlasBuilder {
    max_side: u32,
}

impl AtlasBuilder {
    /// Builder limited to [`MAX_ATLAS_SIDE`]
    pub fn new() -> Self {
        Self {
            max_side: MAX_ATLAS_SIDE,
        }
    }

    /// Override the largest allowed atlas side
    pub fn with_max_side(mut self, max_side: u32) -> Self {
        self.max_side = max_side;
        self
    }

    /// Rasterize code points 0-255 at `pixel_size` into a new atlas
    ///
    /// Code points the font cannot display are skipped: their cells stay
    /// transparent and their metrics stay zero.
    pub fn build<R: GlyphRasterizer + ?Sized>(
        &self,
        rasterizer: &R,
        pixel_size: u32,
    ) -> FontResult<FontAtlas> {
        if pixel_size == 0 {
            return Err(FontError::InvalidPixelSize(pixel_size));
        }
        let too_large = || FontError::AtlasTooLarge {
            pixel_size,
            max: self.max_side,
        };
        let cell_size = next_power_of_two(pixel_size).ok_or_else(too_large)?;
        let side = cell_size
            .checked_mul(GRID_DIM)
            .filter(|side| *side <= self.max_side)
            .ok_or_else(too_large)?;

        let mut image = RgbaImage::from_pixel(side, side, Rgba([255, 255, 255, 0]));
        let mut metrics = GlyphMetrics::empty();
        let descent = rasterizer.descent(pixel_size);

        for code in 0..=u8::MAX {
            if !rasterizer.can_display(code) {
                continue;
            }
            let width = rasterizer.measure_width(code, pixel_size) as f32;
            metrics.set(
                code,
                GlyphInfo {
                    displayable: true,
                    advance_width: width / pixel_size as f32,
                    tex_width: width / side as f32,
                },
            );

            let (col, row) = cell_coords(code);
            let cell_x = col * cell_size;
            let cell_y = row * cell_size;
            // Baseline sits `descent` pixels above the cell's bottom edge.
            let baseline = (cell_y + cell_size) as i32 - descent as i32;
            let bitmap = rasterizer.rasterize(code, pixel_size);
            blit_clipped(&mut image, &bitmap, cell_x as i32, baseline, (cell_x, cell_y, cell_size));
        }

        log::info!(
            "Baked font atlas: {}px font, {}px cells, {}x{} image, {} displayable glyphs",
            pixel_size,
            cell_size,
            side,
            side,
            metrics.displayable_count()
        );

        Ok(FontAtlas {
            image,
            metrics,
            pixel_size,
            cell_size,
            descent,
        })
    }
}

impl Default for AtlasBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Copy glyph coverage into the atlas as white-with-alpha, clipped to a cell
fn blit_clipped(
    image: &mut RgbaImage,
    bitmap: &GlyphBitmap,
    pen_x: i32,
    baseline: i32,
    (cell_x, cell_y, cell_size): (u32, u32, u32),
) {
    let left = pen_x + bitmap.xmin;
    let top = baseline - (bitmap.ymin + bitmap.height as i32);
    let x_range = cell_x as i32..(cell_x + cell_size) as i32;
    let y_range = cell_y as i32..(cell_y + cell_size) as i32;

    for (row, line) in bitmap
        .coverage
        .chunks(bitmap.width.max(1) as usize)
        .take(bitmap.height as usize)
        .enumerate()
    {
        let y = top + row as i32;
        if !y_range.contains(&y) {
            continue;
        }
        for (column, &alpha) in line.iter().enumerate() {
            let x = left + column as i32;
            if alpha == 0 || !x_range.contains(&x) {
                continue;
            }
            image.put_pixel(x as u32, y as u32, Rgba([255, 255, 255, alpha]));
        }
    }
}
