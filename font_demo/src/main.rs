//! Font batch demo
//!
//! Bakes a font into an atlas, optionally writes it out as a PNG, and draws
//! a few strings against the headless device, logging what was submitted.
//!
//! Usage: `font_demo [config.toml|config.ron]`

use font_batch::prelude::*;
use font_batch::render::text::{encode_latin1, SUBSTITUTE_BYTE};

#[derive(thiserror::Error, Debug)]
enum DemoError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Font error: {0}")]
    Font(#[from] FontError),
}

const SAMPLE_LINES: [&str; 3] = [
    "The quick brown fox jumps over the lazy dog",
    "Latin-1: caf\u{e9}, na\u{ef}ve, \u{bf}qu\u{e9}?",
    "Outside Latin-1 \u{2192} substituted",
];

fn load_config() -> Result<FontConfig, DemoError> {
    let config = match std::env::args().nth(1) {
        Some(path) => {
            log::info!("Loading configuration from {}", path);
            FontConfig::load_from_file(&path)?
        }
        None => {
            log::info!("No configuration given, using defaults");
            FontConfig::default()
        }
    };
    config.validate()?;
    Ok(config)
}

fn load_program(device: &mut HeadlessDevice, shaders: &ShaderConfig) -> Result<FontProgram, DemoError> {
    match FontProgram::load(device, shaders) {
        Ok(program) => Ok(program),
        Err(e) => {
            log::warn!("Falling back to built-in font shaders: {}", e);
            Ok(FontProgram::builtin(device)?)
        }
    }
}

fn run() -> Result<(), DemoError> {
    let config = load_config()?;

    let font = FontdueRasterizer::from_file(&config.font_path)?;
    let atlas = AtlasBuilder::new().build(&font, config.pixel_size)?;
    if let Some(path) = &config.atlas_png {
        atlas.save_png(path)?;
    }

    let mut device = HeadlessDevice::new();
    let program = load_program(&mut device, &config.shaders)?;
    let mut text = TextBatchRenderer::from_atlas(&mut device, atlas, program, config.render)?;

    let char_size = config.pixel_size as f32;
    let white = Vec4::new(1.0, 1.0, 1.0, 1.0);
    for (line, sample) in SAMPLE_LINES.iter().enumerate() {
        let origin = Vec3::new(10.0, 10.0 + line as f32 * char_size, 0.0);
        text.draw_str(&mut device, sample, &origin, &white, char_size);
        let width = text.string_width(&encode_latin1(sample, SUBSTITUTE_BYTE), char_size);
        log::info!("{:?} is {} units wide", sample, width);
    }

    let long_line = "0123456789".repeat(30);
    let origin = Vec3::new(10.0, 10.0 + SAMPLE_LINES.len() as f32 * char_size, 0.0);
    text.draw_str(&mut device, &long_line, &origin, &Vec4::new(1.0, 0.8, 0.2, 1.0), char_size);

    let stats = device.stats();
    log::info!(
        "Submitted {} draws ({} indices), {} state binds, {} bytes uploaded",
        stats.draw_calls,
        stats.indices,
        stats.state_binds,
        stats.bytes_uploaded
    );
    if stats.out_of_range_draws > 0 {
        log::error!("{} draws read past the index buffer", stats.out_of_range_draws);
    }

    let shared_program = text.program().handle;
    text.dispose(&mut device);
    device.delete_program(shared_program);
    log::info!("{} GPU resources still live", device.total_live_resources());
    Ok(())
}

fn main() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();
    log::info!("Starting font batch demo");

    if let Err(e) = run() {
        log::error!("Demo failed: {}", e);
        std::process::exit(1);
    }
}
