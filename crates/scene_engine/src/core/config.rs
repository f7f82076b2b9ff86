//! # Unified Configuration System
//!
//! All settings the engine reads at start-up, grouped by subsystem:
//!
//! - **Engine Config**: logging, render rate, debug features
//! - **Renderer Config**: clear colour, viewport size, transparency ordering
//! - **Camera**: projection parameters and view placement
//!
//! [`ApplicationConfig`] bundles them and can be loaded from TOML or RON
//! through the [`Config`] trait.

use serde::{Serialize, Deserialize};

pub use crate::config::{Config, ConfigError};
use crate::render::camera::Camera;
use crate::render::colour::Colour4;

/// # Engine Configuration
///
/// Core engine behavior configuration including logging and the frame rate
/// the host drives animation and rendering at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Log filter passed to the logger (e.g. `"info"`, `"scene_engine=trace"`)
    pub log_level: String,
    /// Frames per second the host should render at
    pub render_rate_hz: u32,
    /// Whether to enable debug features
    pub debug_mode: bool,
}

impl EngineConfig {
    /// Create a new engine configuration
    pub fn new() -> Self {
        Self {
            log_level: "info".to_string(),
            render_rate_hz: 60,
            debug_mode: cfg!(debug_assertions),
        }
    }

    /// Set log level
    #[must_use]
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Set the render rate
    #[must_use]
    pub fn with_render_rate(mut self, rate_hz: u32) -> Self {
        self.render_rate_hz = rate_hz;
        self
    }

    /// Enable debug mode
    #[must_use]
    pub fn with_debug(mut self, enabled: bool) -> Self {
        self.debug_mode = enabled;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.render_rate_hz == 0 {
            return Err(ConfigError::Validation("render rate must be at least 1 Hz".to_string()));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// # Renderer Configuration
///
/// Render target and draw ordering settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Colour the frame is cleared to
    pub clear_colour: Colour4,
    /// Render target width in pixels
    pub viewport_width: u32,
    /// Render target height in pixels
    pub viewport_height: u32,
    /// Draw transparent objects after opaque ones, back to front
    pub sort_transparent: bool,
}

impl RendererConfig {
    /// Create a new renderer configuration
    pub fn new() -> Self {
        Self {
            clear_colour: Colour4::BLACK,
            viewport_width: 1280,
            viewport_height: 720,
            sort_transparent: true,
        }
    }

    /// Set the viewport size
    #[must_use]
    pub fn with_viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport_width = width;
        self.viewport_height = height;
        self
    }

    /// Set the clear colour
    #[must_use]
    pub fn with_clear_colour(mut self, colour: Colour4) -> Self {
        self.clear_colour = colour;
        self
    }

    /// Enable or disable back-to-front sorting of transparent objects
    #[must_use]
    pub fn with_transparent_sorting(mut self, enabled: bool) -> Self {
        self.sort_transparent = enabled;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.viewport_width == 0 || self.viewport_height == 0 {
            return Err(ConfigError::Validation(format!(
                "viewport must be non-empty, got {}x{}",
                self.viewport_width, self.viewport_height
            )));
        }
        Ok(())
    }
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// # Complete Application Configuration
///
/// Top-level configuration that encompasses all engine subsystems.
/// This is the main configuration structure applications should use.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationConfig {
    /// Engine core configuration
    pub engine: EngineConfig,
    /// Rendering system configuration
    pub renderer: RendererConfig,
    /// Initial camera
    pub camera: Camera,
}

impl ApplicationConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.engine.validate()?;
        self.renderer.validate()
    }
}

impl Config for ApplicationConfig {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vector3;

    #[test]
    fn test_defaults_validate() {
        assert!(ApplicationConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_empty_viewport_and_zero_rate() {
        let renderer = RendererConfig::new().with_viewport(0, 720);
        assert!(matches!(renderer.validate(), Err(ConfigError::Validation(_))));

        let engine = EngineConfig::new().with_render_rate(0);
        assert!(matches!(engine.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let text = r#"
            [engine]
            log_level = "debug"

            [renderer]
            viewport_width = 800
            viewport_height = 600

            [camera]
            position = [0.0, 2.0, 10.0]
        "#;
        let config: ApplicationConfig = toml::from_str(text).unwrap();
        assert_eq!(config.engine.log_level, "debug");
        assert_eq!(config.engine.render_rate_hz, 60);
        assert_eq!(config.renderer.viewport_width, 800);
        assert!(config.renderer.sort_transparent);
        assert_eq!(config.camera.position, Vector3::new(0.0, 2.0, 10.0));
    }

    #[test]
    fn test_save_and_load_ron() {
        let path = std::env::temp_dir().join(format!("scene_engine_config_{}.ron", std::process::id()));
        let config = ApplicationConfig {
            engine: EngineConfig::new().with_render_rate(30),
            ..ApplicationConfig::default()
        };

        config.save_to_file(&path).unwrap();
        let loaded = ApplicationConfig::load_from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded, config);
    }
}
