//! Draw-path tests for [`TextBatchRenderer`] against the headless device

use approx::assert_relative_eq;

use super::test_support::MonoRasterizer;
use super::*;
use crate::foundation::math::{Vec3, Vec4};
use crate::render::gpu::{
    BufferTarget, BufferUsage, GpuCommand, GpuDevice, HeadlessDevice, IndexType, ResourceKind,
};

const WHITE: [f32; 4] = [1.0, 1.0, 1.0, 1.0];

fn white() -> Vec4 {
    Vec4::from(WHITE)
}

fn setup() -> (HeadlessDevice, TextBatchRenderer) {
    let mut device = HeadlessDevice::new();
    let program = FontProgram::builtin(&mut device).unwrap();
    let renderer = TextBatchRenderer::new(
        &mut device,
        &MonoRasterizer::new(10),
        16,
        program,
        TextRenderConfig::default(),
    )
    .unwrap();
    device.take_commands();
    (device, renderer)
}

fn floats(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|b| f32::from_ne_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}

fn mixed_text(len: usize) -> Vec<u8> {
    // Covers displayable and non-displayable bytes.
    (0..len).map(|i| (i * 7 % 256) as u8).collect()
}

#[test]
fn test_string_width_scenario() {
    let (mut device, renderer) = setup();

    assert_relative_eq!(renderer.string_width(b"AA", 16.0), 20.0);
    assert_eq!(renderer.string_width(b"", 16.0), 0.0);
    assert_eq!(renderer.cell_size(), 16);
    assert_eq!(renderer.pixel_size(), 16);

    renderer.dispose(&mut device);
}

#[test]
fn test_draw_count_is_ceil_of_length() {
    let (mut device, mut renderer) = setup();

    for len in [1usize, 5, 127, 128, 129, 256, 257, 300, 1000] {
        device.take_commands();
        renderer.draw_string(&mut device, &mixed_text(len), &Vec3::zeros(), &white(), 1.0);

        let draws = device.draw_calls();
        assert_eq!(draws.len(), len.div_ceil(MAX_BATCH_GLYPHS), "length {}", len);
        assert_eq!(draws.iter().map(|&n| n as usize).sum::<usize>(), len * INDICES_PER_GLYPH);
        assert!(draws.iter().all(|&n| n as usize <= MAX_BATCH_GLYPHS * INDICES_PER_GLYPH));
        assert_eq!(device.stats().out_of_range_draws, 0);
    }

    renderer.dispose(&mut device);
}

#[test]
fn test_empty_string_is_a_no_op() {
    let (mut device, mut renderer) = setup();

    renderer.draw_string(&mut device, b"", &Vec3::zeros(), &white(), 1.0);
    assert!(device.commands().is_empty());

    renderer.dispose(&mut device);
}

#[test]
fn test_state_bound_once_per_call() {
    let (mut device, mut renderer) = setup();

    renderer.draw_string(&mut device, &mixed_text(300), &Vec3::zeros(), &white(), 1.0);

    let commands = device.commands();
    assert_eq!(
        &commands[..4],
        &[
            GpuCommand::BindTexture { unit: ATLAS_TEXTURE_UNIT, texture: renderer.texture() },
            GpuCommand::UseProgram(renderer.program().handle),
            GpuCommand::BindVertexLayout(renderer.vertex_layout()),
            GpuCommand::BindBuffer {
                target: BufferTarget::ElementArray,
                buffer: renderer.index_buffer(),
            },
        ]
    );
    assert_eq!(device.stats().state_binds, 4);

    // The rest alternates upload, draw for each chunk.
    for pair in commands[4..].chunks(2) {
        assert!(matches!(
            pair[0],
            GpuCommand::UploadBuffer { usage: BufferUsage::Stream, .. }
        ));
        assert!(matches!(
            pair[1],
            GpuCommand::DrawIndexed { index_type: IndexType::U16, .. }
        ));
    }

    // A second call binds again.
    renderer.draw_string(&mut device, b"hi", &Vec3::zeros(), &white(), 1.0);
    assert_eq!(device.stats().state_binds, 8);

    renderer.dispose(&mut device);
}

#[test]
fn test_multi_megabyte_string_draws_every_batch() {
    let mut device = HeadlessDevice::new().without_upload_payloads();
    let program = FontProgram::builtin(&mut device).unwrap();
    let mut renderer = TextBatchRenderer::new(
        &mut device,
        &MonoRasterizer::new(10),
        16,
        program,
        TextRenderConfig::default(),
    )
    .unwrap();
    device.take_commands();

    let text = vec![b'A'; 4 * 1024 * 1024];
    renderer.draw_string(&mut device, &text, &Vec3::zeros(), &white(), 1.0);

    let stats = device.stats();
    assert_eq!(stats.draw_calls, text.len().div_ceil(MAX_BATCH_GLYPHS));
    assert_eq!(stats.indices, (text.len() * INDICES_PER_GLYPH) as u64);
    assert_eq!(stats.state_binds, 4);
    assert_eq!(stats.out_of_range_draws, 0);

    // The last batch starts after every preceding chunk's measured width.
    let last = floats(device.buffer_contents(renderer.vertex_buffer()).unwrap());
    let preceding = &text[..text.len() - MAX_BATCH_GLYPHS];
    assert_relative_eq!(last[0], renderer.string_width(preceding, 1.0), max_relative = 1e-4);

    renderer.dispose(&mut device);
}

#[test]
fn test_split_matches_independent_chunks() {
    let (mut device, mut renderer) = setup();
    let text = mixed_text(300);
    let start = Vec3::new(3.0, 4.0, 0.5);
    let color = Vec4::new(0.2, 0.4, 0.6, 0.8);
    let size = 12.5;

    renderer.draw_string(&mut device, &text, &start, &color, size);

    let uploads = device.uploads_to(renderer.vertex_buffer());
    assert_eq!(uploads.len(), 3);

    let mut x = start.x;
    for (chunk, uploaded) in text.chunks(MAX_BATCH_GLYPHS).zip(&uploads) {
        let mut expected = QuadBatch::new();
        expected.push_text(
            chunk,
            &Vec3::new(x, start.y, start.z),
            &color,
            size,
            renderer.metrics(),
            renderer.config(),
        );
        assert_eq!(expected.as_bytes(), *uploaded);
        x += renderer.string_width(chunk, size);
    }
    assert_eq!(text.chunks(MAX_BATCH_GLYPHS).map(<[u8]>::len).collect::<Vec<_>>(), [128, 128, 44]);

    renderer.dispose(&mut device);
}

#[test]
fn test_second_batch_starts_at_measured_width() {
    let (mut device, mut renderer) = setup();
    let text = [b'A'; 129];

    renderer.draw_string(&mut device, &text, &Vec3::zeros(), &white(), 1.0);

    assert_eq!(device.draw_calls(), vec![128 * 6, 6]);
    let uploads = device.uploads_to(renderer.vertex_buffer());
    let second = floats(uploads[1]);
    let expected_x = renderer.string_width(&text[..128], 1.0);

    assert_relative_eq!(expected_x, 80.0);
    assert_eq!(second[0], expected_x);
    assert_eq!(second[1], 0.0);
    assert_eq!(second[2], 0.0);

    // Within a batch the pen advances by the full character size.
    let first = floats(uploads[0]);
    let stride = VERTICES_PER_GLYPH * FLOATS_PER_VERTEX;
    assert_eq!(first[stride * 127], 127.0);

    renderer.dispose(&mut device);
}

#[test]
fn test_index_buffer_is_static_and_full_size() {
    let mut device = HeadlessDevice::new();
    let program = FontProgram::builtin(&mut device).unwrap();
    let renderer = TextBatchRenderer::new(
        &mut device,
        &MonoRasterizer::new(10),
        16,
        program,
        TextRenderConfig::default(),
    )
    .unwrap();

    let uploads = device.uploads_to(renderer.index_buffer());
    assert_eq!(uploads.len(), 1);
    let indices: Vec<u16> = uploads[0]
        .chunks_exact(2)
        .map(|b| u16::from_ne_bytes([b[0], b[1]]))
        .collect();
    assert_eq!(indices, quad_indices(MAX_BATCH_GLYPHS));
    assert!(matches!(
        device.commands()[0],
        GpuCommand::UploadBuffer { usage: BufferUsage::Static, .. }
    ));
    assert_eq!(device.texture_size(renderer.texture()), Some((256, 256)));

    renderer.dispose(&mut device);
}

#[test]
fn test_vertex_layout_uses_program_slots() {
    let (mut device, renderer) = setup();

    let attributes = device.vertex_layout_attributes(renderer.vertex_layout()).unwrap();
    let summary: Vec<_> = attributes
        .iter()
        .map(|a| (a.index, a.components, a.stride, a.offset, a.buffer))
        .collect();
    let vbo = renderer.vertex_buffer();
    assert_eq!(summary, vec![(0, 3, 36, 0, vbo), (1, 4, 36, 12, vbo), (2, 2, 36, 28, vbo)]);

    renderer.dispose(&mut device);
}

#[test]
fn test_set_shader_program_rebuilds_layout() {
    let (mut device, mut renderer) = setup();
    let old_layout = renderer.vertex_layout();
    let other = device
        .create_program(DEFAULT_VERTEX_SOURCE, DEFAULT_FRAGMENT_SOURCE, &[])
        .unwrap();
    let slots = AttributeSlots { position: 5, color: 3, tex_coord: 7 };

    renderer.set_shader_program(&mut device, other, slots).unwrap();

    assert_ne!(renderer.vertex_layout(), old_layout);
    assert!(device.vertex_layout_attributes(old_layout).is_none());
    assert_eq!(device.live_resources(ResourceKind::VertexLayout), 1);
    let indices: Vec<_> = device
        .vertex_layout_attributes(renderer.vertex_layout())
        .unwrap()
        .iter()
        .map(|a| a.index)
        .collect();
    assert_eq!(indices, vec![5, 3, 7]);

    renderer.draw_string(&mut device, b"x", &Vec3::zeros(), &white(), 1.0);
    assert!(device.commands().contains(&GpuCommand::UseProgram(other)));

    renderer.dispose(&mut device);
}

#[test]
fn test_failed_program_switch_keeps_current_state() {
    let (mut device, mut renderer) = setup();
    let before = (renderer.program(), renderer.vertex_layout());
    device.fail_on(ResourceKind::VertexLayout);

    let result = renderer.set_shader_program(&mut device, before.0.handle, AttributeSlots::default());

    assert!(result.is_err());
    assert_eq!((renderer.program(), renderer.vertex_layout()), before);
    assert!(device.vertex_layout_attributes(before.1).is_some());

    device.clear_failures();
    renderer.dispose(&mut device);
}

#[test]
fn test_construction_failure_releases_partial_resources() {
    for kind in [ResourceKind::Texture, ResourceKind::Buffer, ResourceKind::VertexLayout] {
        let mut device = HeadlessDevice::new();
        let program = FontProgram::builtin(&mut device).unwrap();
        device.fail_on(kind);

        let result = TextBatchRenderer::new(
            &mut device,
            &MonoRasterizer::new(10),
            16,
            program,
            TextRenderConfig::default(),
        );

        assert!(matches!(result, Err(FontError::Gpu(_))), "{:?}", kind);
        // Only the caller-owned program survives.
        assert_eq!(device.total_live_resources(), 1, "{:?}", kind);
        assert_eq!(device.invalid_releases(), 0);
    }
}

#[test]
fn test_dispose_releases_everything_once() {
    let (mut device, mut renderer) = setup();
    renderer.draw_string(&mut device, b"Hello", &Vec3::zeros(), &white(), 1.0);
    let program = renderer.program();

    renderer.dispose(&mut device);

    assert_eq!(device.total_live_resources(), 1);
    assert_eq!(device.live_resources(ResourceKind::Program), 1);
    assert!(device.program_attributes(program.handle).is_some());
    assert_eq!(device.invalid_releases(), 0);
}

#[test]
fn test_renderers_share_a_default_program() {
    let mut device = HeadlessDevice::new();
    let shared = FontProgram::builtin(&mut device).unwrap();
    let rasterizer = MonoRasterizer::new(10);
    let mut first =
        TextBatchRenderer::new(&mut device, &rasterizer, 16, shared, TextRenderConfig::default())
            .unwrap();
    let second =
        TextBatchRenderer::new(&mut device, &rasterizer, 24, shared, TextRenderConfig::default())
            .unwrap();

    let other = FontProgram::from_sources(&mut device, "void main() {}", "void main() {}").unwrap();
    first
        .set_shader_program(&mut device, other.handle, other.slots)
        .unwrap();

    assert_eq!(first.program(), other);
    assert_eq!(second.program(), shared);
    assert_eq!(second.cell_size(), 32);

    first.dispose(&mut device);
    second.dispose(&mut device);
}

#[test]
fn test_draw_str_substitutes_non_latin1() {
    let (mut device, mut renderer) = setup();

    renderer.draw_str(&mut device, "\u{2603}", &Vec3::zeros(), &white(), 1.0);

    let uploads = device.uploads_to(renderer.vertex_buffer());
    let vertex = floats(uploads[0]);
    // '?' = 63 -> column 15, row 3
    assert_eq!(&vertex[7..9], &[15.0 / 16.0, 3.0 / 16.0]);

    renderer.dispose(&mut device);
}

#[test]
fn test_proportional_config_still_splits_by_measured_width() {
    let mut device = HeadlessDevice::new();
    let program = FontProgram::builtin(&mut device).unwrap();
    let config = TextRenderConfig {
        advance: GlyphAdvance::Proportional,
        sampling: CellSampling::ClipToGlyph,
    };
    let mut renderer =
        TextBatchRenderer::new(&mut device, &MonoRasterizer::new(10), 16, program, config).unwrap();
    device.take_commands();

    let text = [b'B'; 200];
    renderer.draw_string(&mut device, &text, &Vec3::zeros(), &white(), 2.0);

    let uploads = device.uploads_to(renderer.vertex_buffer());
    let second = floats(uploads[1]);
    assert_relative_eq!(second[0], renderer.string_width(&text[..128], 2.0));
    assert_eq!(renderer.config(), &config);

    renderer.dispose(&mut device);
}
