//! Shader program used to draw glyph quads
//!
//! A [`FontProgram`] is a program handle plus the attribute slots its
//! vertex stage reads position, color and texture coordinates from. One
//! default program is usually created per graphics context and handed to
//! every renderer; each renderer may swap in its own later.

use crate::config::ShaderConfig;
use crate::render::gpu::{AttributeBinding, GpuDevice, ProgramHandle};

use super::font_atlas::{FontError, FontResult};

/// Vertex stage source of the built-in font shader
pub const DEFAULT_VERTEX_SOURCE: &str = include_str!("../../../shaders/font.vert");

/// Fragment stage source of the built-in font shader
pub const DEFAULT_FRAGMENT_SOURCE: &str = include_str!("../../../shaders/font.frag");

/// Attribute names used by the built-in shader
pub const POSITION_ATTRIBUTE: &str = "in_position";
/// Color attribute name
pub const COLOR_ATTRIBUTE: &str = "in_color";
/// Texture coordinate attribute name
pub const TEX_COORD_ATTRIBUTE: &str = "in_tex_coord";

/// Shader attribute slots for the three vertex attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeSlots {
    /// Slot of the xyz position
    pub position: u32,
    /// Slot of the rgba color
    pub color: u32,
    /// Slot of the uv texture coordinate
    pub tex_coord: u32,
}

impl Default for AttributeSlots {
    fn default() -> Self {
        Self {
            position: 0,
            color: 1,
            tex_coord: 2,
        }
    }
}

/// Linked program plus the attribute slots it expects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FontProgram {
    /// Program handle
    pub handle: ProgramHandle,
    /// Attribute slots the vertex layout must target
    pub slots: AttributeSlots,
}

impl FontProgram {
    /// Wrap an existing program
    pub fn new(handle: ProgramHandle, slots: AttributeSlots) -> Self {
        Self { handle, slots }
    }

    /// Build the program from the shader files named in `config`
    pub fn load<D: GpuDevice + ?Sized>(device: &mut D, config: &ShaderConfig) -> FontResult<Self> {
        let vertex = read_source(&config.vertex_shader_path)?;
        let fragment = read_source(&config.fragment_shader_path)?;
        log::info!(
            "Loaded font shaders: {}, {}",
            config.vertex_shader_path,
            config.fragment_shader_path
        );
        Self::from_sources(device, &vertex, &fragment)
    }

    /// Build the program from the sources compiled into the crate
    pub fn builtin<D: GpuDevice + ?Sized>(device: &mut D) -> FontResult<Self> {
        Self::from_sources(device, DEFAULT_VERTEX_SOURCE, DEFAULT_FRAGMENT_SOURCE)
    }

    /// Build the program from in-memory sources with the default slots
    pub fn from_sources<D: GpuDevice + ?Sized>(
        device: &mut D,
        vertex_source: &str,
        fragment_source: &str,
    ) -> FontResult<Self> {
        let slots = AttributeSlots::default();
        let handle = device.create_program(
            vertex_source,
            fragment_source,
            &[
                AttributeBinding { slot: slots.position, name: POSITION_ATTRIBUTE },
                AttributeBinding { slot: slots.color, name: COLOR_ATTRIBUTE },
                AttributeBinding { slot: slots.tex_coord, name: TEX_COORD_ATTRIBUTE },
            ],
        )?;
        Ok(Self { handle, slots })
    }
}

fn read_source(path: &str) -> FontResult<String> {
    std::fs::read_to_string(path).map_err(|source| FontError::ShaderSource {
        path: path.to_string(),
        source,
    })
}
