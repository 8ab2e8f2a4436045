//! # Engine Configuration
//!
//! All tunable engine settings live here: window parameters, clear values,
//! validation toggles, shader resource names and the vertex staging capacity.
//! Configuration is plain serializable data with sensible defaults, loaded
//! from a TOML file when one is present.
//!
//! ## Design Goals
//!
//! - **Centralized**: every knob in one discoverable place
//! - **Serializable**: TOML on disk, `serde` in memory
//! - **Forgiving**: a missing or malformed file falls back to defaults

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Window creation parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    /// Window title
    pub title: String,
    /// Initial window width in screen coordinates
    pub width: u32,
    /// Initial window height in screen coordinates
    pub height: u32,
    /// Whether the window can be resized by the user
    pub resizable: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "render_engine".to_string(),
            width: 1600,
            height: 900,
            resizable: true,
        }
    }
}

/// Shader resource names resolved through the resource loader
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShaderConfig {
    /// Logical resource name of the vertex shader GLSL source
    pub vertex_shader: String,
    /// Logical resource name of the fragment shader GLSL source
    pub fragment_shader: String,
}

impl Default for ShaderConfig {
    fn default() -> Self {
        Self {
            vertex_shader: "triangle.vert".to_string(),
            fragment_shader: "triangle.frag".to_string(),
        }
    }
}

/// Top-level engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Window creation parameters
    pub window: WindowConfig,
    /// Shader resource names
    pub shaders: ShaderConfig,
    /// RGBA color the color attachment is cleared to each frame
    pub clear_color: [f32; 4],
    /// Depth value the depth attachment is cleared to each frame
    pub clear_depth: f32,
    /// Stencil value the depth attachment is cleared to each frame
    pub clear_stencil: u32,
    /// Request Vulkan validation layers when they are available
    pub validation: bool,
    /// Capacity of the persistently mapped vertex staging buffer, in MiB
    pub vertex_buffer_mb: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            shaders: ShaderConfig::default(),
            clear_color: [0.0, 0.0, 0.0, 1.0],
            clear_depth: 1.0,
            clear_stencil: 0,
            validation: true,
            vertex_buffer_mb: 64,
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file, falling back to defaults
    ///
    /// A missing file is normal (first run, packaged demo); a malformed file
    /// is logged and ignored so a bad edit never prevents startup.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(text) => match toml::from_str(&text) {
                Ok(config) => {
                    log::info!("Loaded engine configuration from {}", path.display());
                    config
                }
                Err(e) => {
                    log::warn!(
                        "Ignoring malformed config {}: {}; using defaults",
                        path.display(),
                        e
                    );
                    Self::default()
                }
            },
            Err(_) => {
                log::debug!("No config file at {}; using defaults", path.display());
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_constants() {
        let config = EngineConfig::default();
        assert_eq!(config.window.width, 1600);
        assert_eq!(config.window.height, 900);
        assert_eq!(config.clear_color, [0.0, 0.0, 0.0, 1.0]);
        assert_eq!(config.clear_depth, 1.0);
        assert_eq!(config.clear_stencil, 0);
        assert_eq!(config.vertex_buffer_mb, 64);
    }

    #[test]
    fn test_partial_toml_fills_remaining_fields_from_defaults() {
        let config: EngineConfig = toml::from_str(
            r#"
            clear_color = [0.2, 0.3, 0.8, 1.0]

            [window]
            title = "demo"
            width = 800
            height = 600
            resizable = false
            "#,
        )
        .unwrap();
        assert_eq!(config.window.title, "demo");
        assert_eq!(config.window.width, 800);
        assert_eq!(config.clear_color, [0.2, 0.3, 0.8, 1.0]);
        // Untouched sections keep their defaults
        assert_eq!(config.shaders.vertex_shader, "triangle.vert");
        assert_eq!(config.vertex_buffer_mb, 64);
    }

    #[test]
    fn test_load_or_default_on_missing_file() {
        let config = EngineConfig::load_or_default("definitely/not/a/real/path.toml");
        assert_eq!(config.window.width, 1600);
    }
}
