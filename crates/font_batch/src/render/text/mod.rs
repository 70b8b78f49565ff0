//! Text rendering system
//!
//! Atlas baking, quad layout, and the batched text renderer.

pub mod font_atlas;
pub mod font_program;
pub mod fontdue_rasterizer;
pub mod text_layout;
pub mod text_renderer;

#[cfg(test)]
mod batch_tests;
#[cfg(test)]
pub(crate) mod test_support;

pub use font_atlas::*;
pub use font_program::*;
pub use fontdue_rasterizer::*;
pub use text_layout::*;
pub use text_renderer::*;
