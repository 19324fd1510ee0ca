//! Settings loaded from a JSON file at startup.
//!
//! Every field has a default, so a file only needs to name what it changes.

use std::{
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::Context;
use log::LevelFilter;
use serde::{Deserialize, Serialize};

/// File read when no path is given on the command line.
pub const DEFAULT_CONFIG_FILE: &str = "glsandbox.json";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub window: WindowConfig,
    pub shaders: ShaderConfig,
    pub camera: CameraConfig,
    pub render: RenderConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Reads the config at `path`.
    ///
    /// Returns `Ok(None)` if the file does not exist. A file that exists but
    /// cannot be read or parsed is an error.
    pub fn load(path: &Path) -> anyhow::Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::parse(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
            .map(Some)
    }

    pub fn parse(text: &str) -> anyhow::Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.window.width > 0 && self.window.height > 0,
            "window size must be positive, got {}x{}",
            self.window.width,
            self.window.height
        );
        anyhow::ensure!(
            self.camera.near > 0.0 && self.camera.far > self.camera.near,
            "camera clip planes must satisfy 0 < near < far, got near {} far {}",
            self.camera.near,
            self.camera.far
        );
        self.logging.level_filter()?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub fullscreen: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "glsandbox".to_string(),
            width: 1300,
            height: 900,
            fullscreen: false,
        }
    }
}

/// Paths of the scene shader sources. Missing files fall back to the
/// embedded copies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShaderConfig {
    pub vertex: PathBuf,
    pub fragment: PathBuf,
}

impl Default for ShaderConfig {
    fn default() -> Self {
        Self {
            vertex: PathBuf::from("shaders/default.vert"),
            fragment: PathBuf::from("shaders/default.frag"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Vertical field of view in degrees.
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    /// World units per second.
    pub speed: f32,
    pub sensitivity: f32,
    pub position: [f32; 3],
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov: 45.0,
            near: 0.1,
            far: 100.0,
            speed: 6.0,
            sensitivity: 100.0,
            position: [0.0, 0.0, 2.0],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub clear_color: [f32; 3],
    /// Draw the scene into an offscreen target shown in a UI window.
    pub offscreen: bool,
    pub depth_test: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            clear_color: [0.2, 0.3, 0.3],
            offscreen: false,
            depth_test: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub directory: PathBuf,
}

impl LoggingConfig {
    pub fn level_filter(&self) -> anyhow::Result<LevelFilter> {
        parse_level(&self.level)
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: PathBuf::from("logs"),
        }
    }
}

/// Parses a level name such as `debug` or `WARN`.
pub fn parse_level(level: &str) -> anyhow::Result<LevelFilter> {
    LevelFilter::from_str(level.trim()).map_err(|_| anyhow::anyhow!("Unknown log level '{level}'"))
}
