//! Engine configuration sections

use serde::{Deserialize, Serialize};

use super::Config;
use crate::lighting::ShadowSettings;
use crate::physics::PhysicsConfig;

/// Engine configuration
///
/// Every section has defaults, so a config file only needs the values it
/// changes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Window configuration
    pub window: WindowSettings,

    /// Renderer configuration
    pub renderer: RendererSettings,

    /// Physics world configuration
    pub physics: PhysicsConfig,

    /// Shadow map configuration
    pub shadows: ShadowSettings,

    /// Asset locations
    pub assets: AssetSettings,

    /// Frame pacing
    pub frame: FrameSettings,
}

impl Config for EngineConfig {}

/// Window configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowSettings {
    /// Window title
    pub title: String,

    /// Window width
    pub width: u32,

    /// Window height
    pub height: u32,

    /// Whether window is resizable
    pub resizable: bool,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            title: "Scene Engine".to_string(),
            width: 1280,
            height: 720,
            resizable: true,
        }
    }
}

/// Renderer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererSettings {
    /// Path of the shader manifest (TOML or RON)
    pub shader_manifest: String,

    /// Build every manifest entry at startup so compile errors abort init
    pub preload_shaders: bool,

    /// Upper bound on lights uploaded per draw
    pub max_lights: usize,

    /// Clear color of the main framebuffer
    pub clear_color: [f32; 4],
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self {
            shader_manifest: String::new(),
            preload_shaders: true,
            max_lights: 128,
            clear_color: [0.1, 0.1, 0.12, 1.0],
        }
    }
}

/// Asset locations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetSettings {
    /// Directory textures are resolved against
    pub texture_dir: String,
}

impl Default for AssetSettings {
    fn default() -> Self {
        Self {
            texture_dir: "assets/textures".to_string(),
        }
    }
}

/// Frame pacing
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameSettings {
    /// Use a constant delta time instead of the wall clock
    pub fixed_delta_time: Option<f32>,

    /// Stop the main loop after this many frames
    pub max_frames: Option<u64>,
}
