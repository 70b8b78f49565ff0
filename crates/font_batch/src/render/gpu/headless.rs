//! In-memory GPU device
//!
//! [`HeadlessDevice`] keeps every resource in a slot map and records each
//! state change and draw as a [`GpuCommand`]. It stands in for a real
//! graphics context in tests and in offline tools, and can be told to fail
//! allocations of a given [`ResourceKind`].

use std::collections::HashSet;

use slotmap::{new_key_type, Key, KeyData, SlotMap};

use super::{
    AttributeBinding, BufferHandle, BufferTarget, BufferUsage, GpuDevice, GpuError, GpuResult,
    IndexType, ProgramHandle, ResourceKind, TextureHandle, VertexAttribute, VertexLayoutHandle,
};

new_key_type! {
    struct ResourceKey;
}

/// Recorded state change or draw submission
#[derive(Debug, Clone, PartialEq)]
pub enum GpuCommand {
    /// A buffer was bound to a target
    BindBuffer {
        /// Binding target
        target: BufferTarget,
        /// Bound buffer
        buffer: BufferHandle,
    },
    /// A buffer's contents were replaced
    UploadBuffer {
        /// Destination buffer
        buffer: BufferHandle,
        /// Uploaded bytes, empty when payload recording is off
        data: Vec<u8>,
        /// Size of the upload in bytes
        len: usize,
        /// Usage hint supplied with the upload
        usage: BufferUsage,
    },
    /// A texture was bound to a unit
    BindTexture {
        /// Texture unit
        unit: u32,
        /// Bound texture
        texture: TextureHandle,
    },
    /// A program was made current
    UseProgram(ProgramHandle),
    /// A vertex layout was bound
    BindVertexLayout(VertexLayoutHandle),
    /// An indexed triangle draw was issued
    DrawIndexed {
        /// Number of indices consumed
        index_count: u32,
        /// Index element type
        index_type: IndexType,
    },
}

impl GpuCommand {
    /// Whether this command changes bound pipeline state
    pub fn is_state_bind(&self) -> bool {
        matches!(
            self,
            Self::BindBuffer { .. }
                | Self::BindTexture { .. }
                | Self::UseProgram(_)
                | Self::BindVertexLayout(_)
        )
    }
}

/// Aggregate counters over the recorded command stream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrawStats {
    /// Indexed draws issued
    pub draw_calls: usize,
    /// Indices consumed across all draws
    pub indices: u64,
    /// Bytes uploaded through `upload_buffer`
    pub bytes_uploaded: u64,
    /// State bind commands (buffers, textures, programs, layouts)
    pub state_binds: usize,
    /// Draws that read past the end of the bound index buffer
    pub out_of_range_draws: usize,
}

#[derive(Debug)]
enum Resource {
    Buffer {
        target: BufferTarget,
        data: Vec<u8>,
    },
    Texture {
        width: u32,
        height: u32,
    },
    Program {
        attributes: Vec<(u32, String)>,
    },
    VertexLayout {
        attributes: Vec<VertexAttribute>,
    },
}

impl Resource {
    const fn kind(&self) -> ResourceKind {
        match self {
            Self::Buffer { .. } => ResourceKind::Buffer,
            Self::Texture { .. } => ResourceKind::Texture,
            Self::Program { .. } => ResourceKind::Program,
            Self::VertexLayout { .. } => ResourceKind::VertexLayout,
        }
    }
}

/// GPU device that lives entirely in CPU memory
#[derive(Debug, Default)]
pub struct HeadlessDevice {
    resources: SlotMap<ResourceKey, Resource>,
    commands: Vec<GpuCommand>,
    failing: HashSet<ResourceKind>,
    bound_index_buffer: Option<BufferHandle>,
    invalid_releases: usize,
    out_of_range_draws: usize,
    discard_payloads: bool,
}

impl HeadlessDevice {
    /// Create an empty device
    pub fn new() -> Self {
        Self::default()
    }

    /// Record uploads by size only
    ///
    /// Keeps the command log small when drawing very long strings. Buffer
    /// contents are still updated.
    pub fn without_upload_payloads(mut self) -> Self {
        self.discard_payloads = true;
        self
    }

    /// Make every later allocation of `kind` fail until cleared
    pub fn fail_on(&mut self, kind: ResourceKind) {
        self.failing.insert(kind);
    }

    /// Stop injecting allocation failures
    pub fn clear_failures(&mut self) {
        self.failing.clear();
    }

    /// Commands recorded since creation or the last [`Self::take_commands`]
    pub fn commands(&self) -> &[GpuCommand] {
        &self.commands
    }

    /// Drain the recorded commands
    pub fn take_commands(&mut self) -> Vec<GpuCommand> {
        std::mem::take(&mut self.commands)
    }

    /// Index counts of the recorded draws, in submission order
    pub fn draw_calls(&self) -> Vec<u32> {
        self.commands
            .iter()
            .filter_map(|command| match command {
                GpuCommand::DrawIndexed { index_count, .. } => Some(*index_count),
                _ => None,
            })
            .collect()
    }

    /// Payloads uploaded to `buffer`, in submission order
    pub fn uploads_to(&self, buffer: BufferHandle) -> Vec<&[u8]> {
        self.commands
            .iter()
            .filter_map(|command| match command {
                GpuCommand::UploadBuffer { buffer: b, data, .. } if *b == buffer => {
                    Some(data.as_slice())
                }
                _ => None,
            })
            .collect()
    }

    /// Counters over the recorded commands
    pub fn stats(&self) -> DrawStats {
        let mut stats = DrawStats {
            out_of_range_draws: self.out_of_range_draws,
            ..DrawStats::default()
        };
        for command in &self.commands {
            match command {
                GpuCommand::DrawIndexed { index_count, .. } => {
                    stats.draw_calls += 1;
                    stats.indices += u64::from(*index_count);
                }
                GpuCommand::UploadBuffer { len, .. } => {
                    stats.bytes_uploaded += *len as u64;
                }
                other if other.is_state_bind() => stats.state_binds += 1,
                _ => {}
            }
        }
        stats
    }

    /// Number of live resources of a kind
    pub fn live_resources(&self, kind: ResourceKind) -> usize {
        self.resources.values().filter(|r| r.kind() == kind).count()
    }

    /// Number of live resources of every kind
    pub fn total_live_resources(&self) -> usize {
        self.resources.len()
    }

    /// Deletes that named a resource which was not alive
    pub const fn invalid_releases(&self) -> usize {
        self.invalid_releases
    }

    /// Current contents of a buffer
    pub fn buffer_contents(&self, buffer: BufferHandle) -> Option<&[u8]> {
        match self.resources.get(key(buffer.0))? {
            Resource::Buffer { data, .. } => Some(data.as_slice()),
            _ => None,
        }
    }

    /// Dimensions of a texture
    pub fn texture_size(&self, texture: TextureHandle) -> Option<(u32, u32)> {
        match self.resources.get(key(texture.0))? {
            Resource::Texture { width, height } => Some((*width, *height)),
            _ => None,
        }
    }

    /// Attribute slots a program was linked with
    pub fn program_attributes(&self, program: ProgramHandle) -> Option<&[(u32, String)]> {
        match self.resources.get(key(program.0))? {
            Resource::Program { attributes } => Some(attributes.as_slice()),
            _ => None,
        }
    }

    /// Attribute pointers of a vertex layout
    pub fn vertex_layout_attributes(&self, layout: VertexLayoutHandle) -> Option<&[VertexAttribute]> {
        match self.resources.get(key(layout.0))? {
            Resource::VertexLayout { attributes } => Some(attributes.as_slice()),
            _ => None,
        }
    }

    fn allocate(&mut self, resource: Resource) -> GpuResult<u64> {
        let kind = resource.kind();
        if self.failing.contains(&kind) {
            return Err(GpuError::AllocationFailed {
                kind,
                reason: "injected failure".to_string(),
            });
        }
        Ok(self.resources.insert(resource).data().as_ffi())
    }

    fn release(&mut self, id: u64, kind: ResourceKind) {
        let k = key(id);
        match self.resources.get(k) {
            Some(resource) if resource.kind() == kind => {
                self.resources.remove(k);
            }
            _ => {
                log::warn!("Release of unknown {} handle {}", kind, id);
                self.invalid_releases += 1;
            }
        }
    }
}

fn key(id: u64) -> ResourceKey {
    KeyData::from_ffi(id).into()
}

impl GpuDevice for HeadlessDevice {
    fn create_buffer(&mut self, target: BufferTarget) -> GpuResult<BufferHandle> {
        self.allocate(Resource::Buffer {
            target,
            data: Vec::new(),
        })
        .map(BufferHandle)
    }

    fn bind_buffer(&mut self, target: BufferTarget, buffer: BufferHandle) {
        if target == BufferTarget::ElementArray {
            self.bound_index_buffer = Some(buffer);
        }
        self.commands.push(GpuCommand::BindBuffer { target, buffer });
    }

    fn upload_buffer(&mut self, buffer: BufferHandle, data: &[u8], usage: BufferUsage) {
        match self.resources.get_mut(key(buffer.0)) {
            Some(Resource::Buffer { data: contents, .. }) => {
                contents.clear();
                contents.extend_from_slice(data);
            }
            _ => log::warn!("Upload to unknown buffer handle {}", buffer.0),
        }
        let payload = if self.discard_payloads { Vec::new() } else { data.to_vec() };
        self.commands.push(GpuCommand::UploadBuffer {
            buffer,
            data: payload,
            len: data.len(),
            usage,
        });
    }

    fn delete_buffer(&mut self, buffer: BufferHandle) {
        if self.bound_index_buffer == Some(buffer) {
            self.bound_index_buffer = None;
        }
        self.release(buffer.0, ResourceKind::Buffer);
    }

    fn create_texture(&mut self, image: &image::RgbaImage) -> GpuResult<TextureHandle> {
        self.allocate(Resource::Texture {
            width: image.width(),
            height: image.height(),
        })
        .map(TextureHandle)
    }

    fn bind_texture(&mut self, unit: u32, texture: TextureHandle) {
        self.commands.push(GpuCommand::BindTexture { unit, texture });
    }

    fn delete_texture(&mut self, texture: TextureHandle) {
        self.release(texture.0, ResourceKind::Texture);
    }

    fn create_program(
        &mut self,
        vertex_source: &str,
        fragment_source: &str,
        attributes: &[AttributeBinding<'_>],
    ) -> GpuResult<ProgramHandle> {
        if vertex_source.trim().is_empty() || fragment_source.trim().is_empty() {
            return Err(GpuError::ShaderBuild("empty shader stage source".to_string()));
        }
        self.allocate(Resource::Program {
            attributes: attributes
                .iter()
                .map(|binding| (binding.slot, binding.name.to_string()))
                .collect(),
        })
        .map(ProgramHandle)
    }

    fn use_program(&mut self, program: ProgramHandle) {
        self.commands.push(GpuCommand::UseProgram(program));
    }

    fn delete_program(&mut self, program: ProgramHandle) {
        self.release(program.0, ResourceKind::Program);
    }

    fn create_vertex_layout(
        &mut self,
        attributes: &[VertexAttribute],
    ) -> GpuResult<VertexLayoutHandle> {
        self.allocate(Resource::VertexLayout {
            attributes: attributes.to_vec(),
        })
        .map(VertexLayoutHandle)
    }

    fn bind_vertex_layout(&mut self, layout: VertexLayoutHandle) {
        self.commands.push(GpuCommand::BindVertexLayout(layout));
    }

    fn delete_vertex_layout(&mut self, layout: VertexLayoutHandle) {
        self.release(layout.0, ResourceKind::VertexLayout);
    }

    fn draw_indexed_triangles(&mut self, index_count: u32, index_type: IndexType) {
        let capacity = self
            .bound_index_buffer
            .and_then(|buffer| match self.resources.get(key(buffer.0)) {
                Some(Resource::Buffer { target: BufferTarget::ElementArray, data }) => {
                    Some(data.len() / std::mem::size_of::<u16>())
                }
                _ => None,
            })
            .unwrap_or(0);
        if index_count as usize > capacity {
            log::warn!(
                "Draw of {} indices exceeds bound index buffer capacity {}",
                index_count,
                capacity
            );
            self.out_of_range_draws += 1;
        }
        self.commands.push(GpuCommand::DrawIndexed {
            index_count,
            index_type,
        });
    }
}
