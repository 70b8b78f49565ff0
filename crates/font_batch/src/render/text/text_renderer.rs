//! Batched text renderer
//!
//! [`TextBatchRenderer`] owns the atlas texture, a streaming vertex buffer,
//! a static index buffer and a vertex layout. Drawing a string lays it out
//! into at most [`MAX_BATCH_GLYPHS`] quads per batch, uploads the batch and
//! issues one indexed draw for it.
//!
//! # State binding
//!
//! Texture, program, vertex layout and index buffer are bound once per
//! `draw_string` call. Long strings are then drawn as consecutive 128-glyph
//! chunks that all reuse that state; each chunk starts where the measured
//! width of the previous one ends.
//!
//! # Coordinates
//!
//! Quads are laid out y-down: the vertex at the pen position samples the
//! top edge of the glyph's cell (the atlas stores row 0 at the top), and
//! `y + char_size` samples the bottom edge. Use a projection with y
//! increasing downward, such as a top-left origin orthographic matrix.

use crate::foundation::math::{Vec3, Vec4};
use crate::render::gpu::{
    AttributeType, BufferHandle, BufferTarget, BufferUsage, GpuDevice, GpuResult, IndexType,
    ProgramHandle, TextureHandle, VertexAttribute, VertexLayoutHandle,
};

use super::font_atlas::{AtlasBuilder, FontAtlas, FontResult, GlyphMetrics, GlyphRasterizer};
use super::font_program::{AttributeSlots, FontProgram};
use super::text_layout::{
    encode_latin1, quad_indices, QuadBatch, TextRenderConfig, COLOR_OFFSET, MAX_BATCH_GLYPHS,
    TEX_COORD_OFFSET, VERTEX_STRIDE,
};

/// Texture unit the atlas is bound to
pub const ATLAS_TEXTURE_UNIT: u32 = 0;

/// Byte substituted for characters outside Latin-1 by [`TextBatchRenderer::draw_str`]
pub const SUBSTITUTE_BYTE: u8 = b'?';

/// Renders byte strings as batches of textured quads from a baked atlas
#[derive(Debug)]
pub struct TextBatchRenderer {
    texture: TextureHandle,
    vertex_buffer: BufferHandle,
    index_buffer: BufferHandle,
    vertex_layout: VertexLayoutHandle,
    program: FontProgram,
    metrics: GlyphMetrics,
    pixel_size: u32,
    cell_size: u32,
    config: TextRenderConfig,
    batch: QuadBatch,
    released: bool,
}

/// Resources created so far during construction
#[derive(Default)]
struct PendingResources {
    texture: Option<TextureHandle>,
    vertex_buffer: Option<BufferHandle>,
    index_buffer: Option<BufferHandle>,
}

impl PendingResources {
    fn release<D: GpuDevice + ?Sized>(self, device: &mut D) {
        if let Some(texture) = self.texture {
            device.delete_texture(texture);
        }
        if let Some(buffer) = self.vertex_buffer {
            device.delete_buffer(buffer);
        }
        if let Some(buffer) = self.index_buffer {
            device.delete_buffer(buffer);
        }
    }
}

impl TextBatchRenderer {
    /// Bake an atlas from `rasterizer` and upload it
    ///
    /// # Arguments
    ///
    /// * `device` - Graphics device that will own the renderer's resources
    /// * `rasterizer` - Font to bake
    /// * `pixel_size` - Font size in pixels
    /// * `program` - Shader program, usually the shared default
    /// * `config` - Layout options
    pub fn new<D, R>(
        device: &mut D,
        rasterizer: &R,
        pixel_size: u32,
        program: FontProgram,
        config: TextRenderConfig,
    ) -> FontResult<Self>
    where
        D: GpuDevice + ?Sized,
        R: GlyphRasterizer + ?Sized,
    {
        let atlas = AtlasBuilder::new().build(rasterizer, pixel_size)?;
        Self::from_atlas(device, atlas, program, config)
    }

    /// Upload a prebuilt atlas
    ///
    /// The atlas image is consumed; only its metrics are kept on the CPU.
    /// If any GPU resource cannot be created, everything created up to that
    /// point is released before the error is returned.
    pub fn from_atlas<D: GpuDevice + ?Sized>(
        device: &mut D,
        atlas: FontAtlas,
        program: FontProgram,
        config: TextRenderConfig,
    ) -> FontResult<Self> {
        let pixel_size = atlas.pixel_size();
        let cell_size = atlas.cell_size();
        let side = atlas.side();

        let mut pending = PendingResources::default();
        let (texture, vertex_buffer, index_buffer, vertex_layout) =
            match Self::create_resources(device, &atlas, program.slots, &mut pending) {
                Ok(handles) => handles,
                Err(e) => {
                    log::error!("Text renderer construction failed: {}", e);
                    pending.release(device);
                    return Err(e.into());
                }
            };

        log::info!(
            "Text renderer ready: {}px font, {}x{} atlas ({:?})",
            pixel_size,
            side,
            side,
            texture
        );

        let (_, metrics) = atlas.into_parts();
        Ok(Self {
            texture,
            vertex_buffer,
            index_buffer,
            vertex_layout,
            program,
            metrics,
            pixel_size,
            cell_size,
            config,
            batch: QuadBatch::new(),
            released: false,
        })
    }

    fn create_resources<D: GpuDevice + ?Sized>(
        device: &mut D,
        atlas: &FontAtlas,
        slots: AttributeSlots,
        pending: &mut PendingResources,
    ) -> GpuResult<(TextureHandle, BufferHandle, BufferHandle, VertexLayoutHandle)> {
        let texture = device.create_texture(atlas.image())?;
        pending.texture = Some(texture);

        let vertex_buffer = device.create_buffer(BufferTarget::Array)?;
        pending.vertex_buffer = Some(vertex_buffer);

        let index_buffer = device.create_buffer(BufferTarget::ElementArray)?;
        pending.index_buffer = Some(index_buffer);
        let indices = quad_indices(MAX_BATCH_GLYPHS);
        device.upload_buffer(index_buffer, bytemuck::cast_slice(&indices), BufferUsage::Static);

        let vertex_layout = device.create_vertex_layout(&layout_attributes(vertex_buffer, slots))?;
        Ok((texture, vertex_buffer, index_buffer, vertex_layout))
    }

    /// Draw `text` with its first glyph's top-left corner at `start`
    ///
    /// Coordinates are y-down; see the module docs.
    /// Strings longer than [`MAX_BATCH_GLYPHS`] are drawn as several
    /// batches; each batch after the first starts where
    /// [`Self::string_width`] of the preceding chunk ends. An empty string
    /// is a no-op.
    pub fn draw_string<D: GpuDevice + ?Sized>(
        &mut self,
        device: &mut D,
        text: &[u8],
        start: &Vec3,
        color: &Vec4,
        char_size: f32,
    ) {
        if text.is_empty() {
            return;
        }
        self.draw_chunked(device, text, start, color, char_size);
    }

    /// Draw UTF-8 text, replacing characters above U+00FF with `?`
    pub fn draw_str<D: GpuDevice + ?Sized>(
        &mut self,
        device: &mut D,
        text: &str,
        start: &Vec3,
        color: &Vec4,
        char_size: f32,
    ) {
        let bytes = encode_latin1(text, SUBSTITUTE_BYTE);
        self.draw_string(device, &bytes, start, color, char_size);
    }

    fn draw_chunked<D: GpuDevice + ?Sized>(
        &mut self,
        device: &mut D,
        text: &[u8],
        start: &Vec3,
        color: &Vec4,
        char_size: f32,
    ) {
        self.bind_state(device);

        if text.len() > MAX_BATCH_GLYPHS {
            log::debug!(
                "Splitting {} glyphs into {} batches",
                text.len(),
                text.len().div_ceil(MAX_BATCH_GLYPHS)
            );
        }

        let mut pen = *start;
        for chunk in text.chunks(MAX_BATCH_GLYPHS) {
            self.draw_batch(device, chunk, &pen, color, char_size);
            pen.x += self.string_width(chunk, char_size);
        }
    }

    fn bind_state<D: GpuDevice + ?Sized>(&self, device: &mut D) {
        device.bind_texture(ATLAS_TEXTURE_UNIT, self.texture);
        device.use_program(self.program.handle);
        device.bind_vertex_layout(self.vertex_layout);
        device.bind_buffer(BufferTarget::ElementArray, self.index_buffer);
    }

    fn draw_batch<D: GpuDevice + ?Sized>(
        &mut self,
        device: &mut D,
        text: &[u8],
        start: &Vec3,
        color: &Vec4,
        char_size: f32,
    ) {
        self.batch.clear();
        self.batch
            .push_text(text, start, color, char_size, &self.metrics, &self.config);

        log::trace!(
            "Uploading batch of {} glyphs at ({}, {}, {})",
            self.batch.glyph_count(),
            start.x,
            start.y,
            start.z
        );
        device.upload_buffer(self.vertex_buffer, self.batch.as_bytes(), BufferUsage::Stream);
        device.draw_indexed_triangles(self.batch.index_count(), IndexType::U16);
    }

    /// Measured width of `text` at `char_size`, from per-glyph metrics
    pub fn string_width(&self, text: &[u8], char_size: f32) -> f32 {
        self.metrics.string_width(text, char_size)
    }

    /// Switch to another shader program
    ///
    /// Builds a vertex layout targeting `slots`, then releases the previous
    /// layout. On failure the renderer keeps its current program and layout.
    pub fn set_shader_program<D: GpuDevice + ?Sized>(
        &mut self,
        device: &mut D,
        program: ProgramHandle,
        slots: AttributeSlots,
    ) -> GpuResult<()> {
        let layout = device.create_vertex_layout(&layout_attributes(self.vertex_buffer, slots))?;
        device.delete_vertex_layout(self.vertex_layout);
        self.vertex_layout = layout;
        self.program = FontProgram::new(program, slots);
        log::debug!("Text renderer switched to program {:?} with {:?}", program, slots);
        Ok(())
    }

    /// Release the texture, buffers and vertex layout
    ///
    /// The shader program is shared and left alive.
    pub fn dispose<D: GpuDevice + ?Sized>(mut self, device: &mut D) {
        device.delete_texture(self.texture);
        device.delete_buffer(self.vertex_buffer);
        device.delete_buffer(self.index_buffer);
        device.delete_vertex_layout(self.vertex_layout);
        self.released = true;
        log::info!("Text renderer disposed");
    }

    /// Per-glyph metrics
    pub fn metrics(&self) -> &GlyphMetrics {
        &self.metrics
    }

    /// Font pixel size the atlas was baked at
    pub fn pixel_size(&self) -> u32 {
        self.pixel_size
    }

    /// Atlas cell side in pixels
    pub fn cell_size(&self) -> u32 {
        self.cell_size
    }

    /// Current shader program
    pub fn program(&self) -> FontProgram {
        self.program
    }

    /// Layout options
    pub fn config(&self) -> &TextRenderConfig {
        &self.config
    }

    /// Atlas texture handle
    pub fn texture(&self) -> TextureHandle {
        self.texture
    }

    /// Streaming vertex buffer handle
    pub fn vertex_buffer(&self) -> BufferHandle {
        self.vertex_buffer
    }

    /// Static index buffer handle
    pub fn index_buffer(&self) -> BufferHandle {
        self.index_buffer
    }

    /// Current vertex layout handle
    pub fn vertex_layout(&self) -> VertexLayoutHandle {
        self.vertex_layout
    }
}

impl Drop for TextBatchRenderer {
    fn drop(&mut self) {
        if !self.released {
            log::warn!("TextBatchRenderer dropped without dispose(); GPU resources leaked");
        }
    }
}

/// Attribute pointers for the interleaved glyph vertex
fn layout_attributes(buffer: BufferHandle, slots: AttributeSlots) -> [VertexAttribute; 3] {
    let attribute = |index, components, offset| VertexAttribute {
        buffer,
        index,
        components,
        kind: AttributeType::Float,
        normalized: false,
        stride: VERTEX_STRIDE,
        offset,
    };
    [
        attribute(slots.position, 3, 0),
        attribute(slots.color, 4, COLOR_OFFSET),
        attribute(slots.tex_coord, 2, TEX_COORD_OFFSET),
    ]
}
