//! # Font Batch
//!
//! Bitmap font atlases and batched text rendering.
//!
//! ## Features
//!
//! - **Atlas Baking**: All 256 single-byte codes rendered into a 16x16 grid
//! - **Batched Drawing**: Strings drawn as textured quads, 128 glyphs per draw
//! - **Pluggable Devices**: Rendering goes through the [`render::GpuDevice`] trait
//! - **Headless Testing**: A recording device for running without a GPU
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use font_batch::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut device = HeadlessDevice::new();
//!     let font = FontdueRasterizer::from_file("resources/fonts/mono.ttf")?;
//!     let program = FontProgram::builtin(&mut device)?;
//!
//!     let mut text = TextBatchRenderer::new(
//!         &mut device,
//!         &font,
//!         16,
//!         program,
//!         TextRenderConfig::default(),
//!     )?;
//!     text.draw_str(&mut device, "Hello", &Vec3::new(0.0, 0.0, 0.0), &Vec4::new(1.0, 1.0, 1.0, 1.0), 16.0);
//!     text.dispose(&mut device);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod foundation;
pub mod render;

/// Common imports for crate users
pub mod prelude {
    pub use crate::{
        config::{Config, ConfigError, FontConfig, ShaderConfig},
        foundation::math::{Vec2, Vec3, Vec4},
        render::{
            text::{AttributeSlots, CellSampling, GlyphAdvance},
            AtlasBuilder, FontAtlas, FontError, FontProgram, FontdueRasterizer, GlyphMetrics,
            GlyphRasterizer, GpuDevice, HeadlessDevice, TextBatchRenderer, TextRenderConfig,
        },
    };
}
