//! Rendering module
//!
//! - [`gpu`]: the graphics capability trait and the headless device
//! - [`text`]: atlas baking and batched text drawing

pub mod gpu;
pub mod text;

pub use gpu::{GpuDevice, GpuError, GpuResult, HeadlessDevice};
pub use text::{
    AtlasBuilder, FontAtlas, FontError, FontProgram, FontResult, FontdueRasterizer, GlyphMetrics,
    GlyphRasterizer, TextBatchRenderer, TextRenderConfig,
};
