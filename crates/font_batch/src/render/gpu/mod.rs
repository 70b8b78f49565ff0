//! GPU capability interface
//!
//! The text renderer never talks to a graphics API directly. It only needs a
//! handful of capabilities (allocate, bind, upload, draw, delete), which this
//! module defines as the [`GpuDevice`] trait. Backends for a concrete API
//! implement the trait; [`HeadlessDevice`] implements it in memory for tests
//! and tooling.

pub mod headless;

pub use headless::{DrawStats, GpuCommand, HeadlessDevice};

/// Result type for GPU resource creation
pub type GpuResult<T> = Result<T, GpuError>;

/// Errors raised while creating GPU resources
#[derive(Debug, thiserror::Error)]
pub enum GpuError {
    /// The backend could not allocate a resource
    #[error("Failed to allocate {kind}: {reason}")]
    AllocationFailed {
        /// Kind of resource that failed
        kind: ResourceKind,
        /// Backend-provided reason
        reason: String,
    },

    /// Shader compilation or program linking failed
    #[error("Shader program build failed: {0}")]
    ShaderBuild(String),
}

/// Kinds of GPU resources the renderer allocates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// Vertex or index buffer
    Buffer,
    /// 2D texture
    Texture,
    /// Linked shader program
    Program,
    /// Vertex-layout object (attribute pointers over buffers)
    VertexLayout,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Buffer => "buffer",
            Self::Texture => "texture",
            Self::Program => "shader program",
            Self::VertexLayout => "vertex layout",
        };
        f.write_str(name)
    }
}

/// Handle to a GPU buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub u64);

/// Handle to a GPU texture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u64);

/// Handle to a linked shader program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramHandle(pub u64);

/// Handle to a vertex-layout object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexLayoutHandle(pub u64);

/// Binding target of a buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferTarget {
    /// Per-vertex attribute data
    Array,
    /// Index data for indexed draws
    ElementArray,
}

/// Upload frequency hint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferUsage {
    /// Written once, drawn many times
    Static,
    /// Rewritten before nearly every draw
    Stream,
}

/// Component type of a vertex attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeType {
    /// 32-bit IEEE float
    Float,
}

/// Element type of an index buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexType {
    /// 16-bit unsigned indices
    U16,
}

/// One attribute pointer inside a vertex layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    /// Buffer the attribute reads from
    pub buffer: BufferHandle,
    /// Shader attribute slot
    pub index: u32,
    /// Number of components (1-4)
    pub components: u32,
    /// Component type
    pub kind: AttributeType,
    /// Whether integer data is normalized to [0, 1]
    pub normalized: bool,
    /// Distance in bytes between consecutive vertices
    pub stride: u32,
    /// Byte offset of the attribute inside a vertex
    pub offset: u32,
}

/// Shader attribute name bound to an explicit slot at link time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeBinding<'a> {
    /// Slot index
    pub slot: u32,
    /// Attribute name in the vertex shader
    pub name: &'a str,
}

/// Minimal graphics capability set consumed by the text renderer
///
/// Creation methods are fallible; binding, upload and draw submission are
/// fire-and-forget, matching how immediate-mode graphics APIs report errors.
/// All calls happen on the thread that owns the graphics context.
pub trait GpuDevice {
    /// Allocate an empty buffer
    fn create_buffer(&mut self, target: BufferTarget) -> GpuResult<BufferHandle>;

    /// Bind a buffer to its target
    fn bind_buffer(&mut self, target: BufferTarget, buffer: BufferHandle);

    /// Replace the whole contents of a buffer
    fn upload_buffer(&mut self, buffer: BufferHandle, data: &[u8], usage: BufferUsage);

    /// Release a buffer
    fn delete_buffer(&mut self, buffer: BufferHandle);

    /// Create an RGBA8 texture from an image
    fn create_texture(&mut self, image: &image::RgbaImage) -> GpuResult<TextureHandle>;

    /// Bind a texture to a texture unit
    fn bind_texture(&mut self, unit: u32, texture: TextureHandle);

    /// Release a texture
    fn delete_texture(&mut self, texture: TextureHandle);

    /// Compile and link a program from vertex and fragment stage sources
    fn create_program(
        &mut self,
        vertex_source: &str,
        fragment_source: &str,
        attributes: &[AttributeBinding<'_>],
    ) -> GpuResult<ProgramHandle>;

    /// Make a program current
    fn use_program(&mut self, program: ProgramHandle);

    /// Release a program
    fn delete_program(&mut self, program: ProgramHandle);

    /// Compose attribute pointers into a vertex-layout object
    fn create_vertex_layout(
        &mut self,
        attributes: &[VertexAttribute],
    ) -> GpuResult<VertexLayoutHandle>;

    /// Bind a vertex-layout object
    fn bind_vertex_layout(&mut self, layout: VertexLayoutHandle);

    /// Release a vertex-layout object
    fn delete_vertex_layout(&mut self, layout: VertexLayoutHandle);

    /// Issue an indexed triangle-list draw from the bound index buffer
    fn draw_indexed_triangles(&mut self, index_count: u32, index_type: IndexType);
}
