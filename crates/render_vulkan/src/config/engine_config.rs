//! Engine, window and renderer configuration
//!
//! Replaces a string-keyed settings store with explicit fields. Values that
//! used to be shared through the store at runtime (device, queues, command
//! pool) are reached through the renderer's context instead.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::{Config, ConfigError};

/// Top-level configuration consumed by [`crate::Engine::run`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Asset namespace used when a shader is loaded without an explicit domain
    pub default_domain: String,
    /// Directory that contains the `<domain>/...` asset trees
    pub asset_root: PathBuf,
    /// Window configuration
    pub window: WindowConfig,
    /// Renderer configuration
    pub renderer: RendererConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_domain: "RenderVulkan".to_string(),
            asset_root: PathBuf::from("Assets"),
            window: WindowConfig::default(),
            renderer: RendererConfig::default(),
        }
    }
}

impl Config for EngineConfig {}

impl EngineConfig {
    /// Set the default asset domain
    pub fn with_default_domain(mut self, domain: impl Into<String>) -> Self {
        self.default_domain = domain.into();
        self
    }

    /// Set the asset root directory
    pub fn with_asset_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.asset_root = root.into();
        self
    }

    /// Set the window configuration
    pub fn with_window(mut self, window: WindowConfig) -> Self {
        self.window = window;
        self
    }

    /// Set the renderer configuration
    pub fn with_renderer(mut self, renderer: RendererConfig) -> Self {
        self.renderer = renderer;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_domain.is_empty() {
            return Err(ConfigError::Invalid("Default domain cannot be empty".to_string()));
        }

        self.window.validate()?;
        self.renderer.validate()
    }
}

/// Window configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Window title
    pub title: String,
    /// Initial window width in screen coordinates
    pub width: u32,
    /// Initial window height in screen coordinates
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "RenderVulkan* 0.1.3".to_string(),
            width: 750,
            height: 450,
        }
    }
}

impl Config for WindowConfig {}

impl WindowConfig {
    /// Create a window configuration
    pub fn new(title: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            title: title.into(),
            width,
            height,
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "Window dimensions must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        Ok(())
    }
}

/// Configuration for the Vulkan renderer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Application name for Vulkan instance creation
    pub application_name: String,
    /// Maximum frames in flight
    pub max_frames_in_flight: usize,
    /// Background clear color [R, G, B, A] (0.0-1.0 range)
    pub clear_color: [f32; 4],
    /// Whether to enable Vulkan validation layers; `None` enables them in debug builds only
    pub enable_validation: Option<bool>,
    /// Instance layers requested when validation is enabled; missing ones are skipped
    pub validation_layers: Vec<String>,
    /// Device extensions required on top of swapchain presentation
    pub device_extensions: Vec<String>,
}

impl RendererConfig {
    /// Largest accepted frames-in-flight count
    pub const MAX_FRAMES_IN_FLIGHT_LIMIT: usize = 8;

    /// Layer requested by default when validation is enabled
    pub const DEFAULT_VALIDATION_LAYER: &'static str = "VK_LAYER_KHRONOS_validation";

    /// Create a new renderer configuration
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            application_name: app_name.into(),
            max_frames_in_flight: crate::render::frame::MAX_FRAMES_IN_FLIGHT,
            clear_color: [0.0, 0.45, 0.75, 1.0],
            enable_validation: None,
            validation_layers: vec![Self::DEFAULT_VALIDATION_LAYER.to_string()],
            device_extensions: Vec::new(),
        }
    }

    /// Set maximum frames in flight
    pub fn with_max_frames_in_flight(mut self, max_frames: usize) -> Self {
        self.max_frames_in_flight = max_frames;
        self
    }

    /// Set background clear color [R, G, B, A] (0.0-1.0 range)
    pub fn with_clear_color(mut self, color: [f32; 4]) -> Self {
        self.clear_color = color;
        self
    }

    /// Enable or disable Vulkan validation layers
    pub fn with_validation(mut self, enable: bool) -> Self {
        self.enable_validation = Some(enable);
        self
    }

    /// Request another instance layer when validation is enabled
    pub fn with_validation_layer(mut self, layer: impl Into<String>) -> Self {
        let layer = layer.into();
        if !self.validation_layers.contains(&layer) {
            self.validation_layers.push(layer);
        }
        self
    }

    /// Require another device extension; devices without it are rejected
    pub fn with_device_extension(mut self, extension: impl Into<String>) -> Self {
        let extension = extension.into();
        if !self.device_extensions.contains(&extension) {
            self.device_extensions.push(extension);
        }
        self
    }

    /// Whether validation should be requested for this build
    pub fn validation_enabled(&self) -> bool {
        self.enable_validation.unwrap_or(cfg!(debug_assertions))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.application_name.is_empty() {
            return Err(ConfigError::Invalid("Application name cannot be empty".to_string()));
        }

        if self.max_frames_in_flight == 0 || self.max_frames_in_flight > Self::MAX_FRAMES_IN_FLIGHT_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "Max frames in flight must be between 1 and {}, got {}",
                Self::MAX_FRAMES_IN_FLIGHT_LIMIT,
                self.max_frames_in_flight
            )));
        }

        let mut names = self.validation_layers.iter().chain(&self.device_extensions);
        if let Some(name) = names.find(|name| name.is_empty() || name.contains('\0')) {
            return Err(ConfigError::Invalid(format!(
                "Layer and extension names must be non-empty and NUL-free, got {name:?}"
            )));
        }

        Ok(())
    }
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self::new("RenderVulkan")
    }
}

impl Config for RendererConfig {}
