//! Configuration system
//!
//! File-backed configuration for the font tooling. Files are TOML or RON,
//! chosen by extension.

use std::path::{Path, PathBuf};

pub use serde::{Deserialize, Serialize};

use crate::render::text::TextRenderConfig;

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(ConfigError::Io)?;

        match extension(path) {
            Some("toml") => toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string())),
            Some("ron") => ron::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string())),
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }

    /// Save configuration to file
    fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let contents = match extension(path) {
            Some("toml") => {
                toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?
            }
            Some("ron") => ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?,
            _ => return Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        };

        std::fs::write(path, contents).map_err(ConfigError::Io)
    }
}

fn extension(path: &Path) -> Option<&str> {
    path.extension().and_then(|ext| ext.to_str())
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Values that parse but cannot be used
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Paths of the font shader's two stage sources
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShaderConfig {
    /// Path to the vertex shader source
    pub vertex_shader_path: String,
    /// Path to the fragment shader source
    pub fragment_shader_path: String,
}

impl ShaderConfig {
    /// Create a new shader configuration
    pub fn new(vertex_path: impl Into<String>, fragment_path: impl Into<String>) -> Self {
        Self {
            vertex_shader_path: vertex_path.into(),
            fragment_shader_path: fragment_path.into(),
        }
    }

    /// Create shader config with automatic path resolution
    ///
    /// Tries the usual shader locations so tools work from the workspace
    /// root, the crate directory or a subdirectory.
    pub fn with_path_resolution(base_vertex: &str, base_fragment: &str) -> Self {
        Self {
            vertex_shader_path: resolve_shader_path(base_vertex),
            fragment_shader_path: resolve_shader_path(base_fragment),
        }
    }

    /// Check that both files exist
    pub fn validate(&self) -> Result<(), ConfigError> {
        for path in [&self.vertex_shader_path, &self.fragment_shader_path] {
            if !Path::new(path).exists() {
                return Err(ConfigError::Invalid(format!("Shader not found: {}", path)));
            }
        }
        Ok(())
    }
}

impl Default for ShaderConfig {
    fn default() -> Self {
        Self::with_path_resolution("font.vert", "font.frag")
    }
}

fn resolve_shader_path(file_name: &str) -> String {
    const SHADER_DIRS: [&str; 5] = [
        "shaders/",
        "resources/shaders/",
        "crates/font_batch/shaders/",
        "../shaders/",
        "../crates/font_batch/shaders/",
    ];

    SHADER_DIRS
        .iter()
        .map(|dir| format!("{}{}", dir, file_name))
        .find(|candidate| Path::new(candidate).exists())
        .unwrap_or_else(|| format!("shaders/{}", file_name))
}

/// Settings for baking a font and drawing with it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontConfig {
    /// TrueType/OpenType file to bake
    pub font_path: PathBuf,
    /// Font size in pixels
    pub pixel_size: u32,
    /// Shader sources for the default font program
    #[serde(default)]
    pub shaders: ShaderConfig,
    /// Layout options
    #[serde(default)]
    pub render: TextRenderConfig,
    /// Where to write the baked atlas, if anywhere
    #[serde(default)]
    pub atlas_png: Option<PathBuf>,
}

impl FontConfig {
    /// Configuration for `font_path` at `pixel_size` with defaults elsewhere
    pub fn new(font_path: impl Into<PathBuf>, pixel_size: u32) -> Self {
        Self {
            font_path: font_path.into(),
            pixel_size,
            ..Self::default()
        }
    }

    /// Write the baked atlas to `path`
    pub fn with_atlas_png(mut self, path: impl Into<PathBuf>) -> Self {
        self.atlas_png = Some(path.into());
        self
    }

    /// Use different layout options
    pub fn with_render(mut self, render: TextRenderConfig) -> Self {
        self.render = render;
        self
    }

    /// Validate the values that do not touch the filesystem
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.font_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("font_path cannot be empty".to_string()));
        }
        if self.pixel_size == 0 {
            return Err(ConfigError::Invalid("pixel_size must be at least 1".to_string()));
        }
        Ok(())
    }
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            font_path: PathBuf::from("resources/fonts/default.ttf"),
            pixel_size: 16,
            shaders: ShaderConfig::default(),
            render: TextRenderConfig::default(),
            atlas_png: None,
        }
    }
}

impl Config for FontConfig {}
