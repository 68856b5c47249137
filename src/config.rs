//! Viewer configuration, loaded from JSON. Every field has a default so a
//! partial file (or no file at all) is valid.

use crate::assets::TexturePaths;
use crate::controls::InitialControls;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error reading config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("JSON error in config: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Allowed latitude span for a latitude slider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LatitudeBound {
    /// [-90, 90]
    #[default]
    Hemisphere,
    /// [-180, 180], wrapping over the poles.
    Full,
}

impl LatitudeBound {
    pub fn range(self) -> (f64, f64) {
        match self {
            LatitudeBound::Hemisphere => (-90.0, 90.0),
            LatitudeBound::Full => (-180.0, 180.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ControlBounds {
    pub light_latitude: LatitudeBound,
    pub camera_latitude: LatitudeBound,
}

/// Scene viewport: a fixed square canvas or the whole window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ViewportMode {
    Fixed { size: u32 },
    Window,
}

impl Default for ViewportMode {
    fn default() -> Self {
        ViewportMode::Fixed { size: 1024 }
    }
}

impl ViewportMode {
    pub fn initial_size(self) -> (u32, u32) {
        match self {
            ViewportMode::Fixed { size } => (size.max(1), size.max(1)),
            ViewportMode::Window => (1280, 720),
        }
    }

    /// Scene resolution for a window of the given physical size.
    pub fn scene_size(self, window_width: u32, window_height: u32) -> (u32, u32) {
        match self {
            ViewportMode::Fixed { size } => (size.max(1), size.max(1)),
            ViewportMode::Window => (window_width.max(1), window_height.max(1)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    pub fov_deg: f64,
    pub near: f64,
    pub far: f64,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            fov_deg: 45.0,
            near: 0.1,
            far: 10_000.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToneMapping {
    None,
    #[default]
    AcesFilmic,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub title: String,
    pub viewport: ViewportMode,
    pub textures: TexturePaths,
    pub sphere_radius: f64,
    pub camera: CameraSettings,
    pub latitude: ControlBounds,
    pub initial: InitialControls,
    pub tone_mapping: ToneMapping,
    pub exposure: f32,
    /// Fraction of the viewport resolution used while interacting.
    pub preview_scale: f32,
    pub screenshot_dir: PathBuf,
    /// Ask for a destination with a native dialog instead of writing to `screenshot_dir`.
    pub ask_save_path: bool,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            title: "Moon Viewer".to_string(),
            viewport: ViewportMode::default(),
            textures: TexturePaths::default(),
            sphere_radius: 1728.28,
            camera: CameraSettings::default(),
            latitude: ControlBounds::default(),
            initial: InitialControls::default(),
            tone_mapping: ToneMapping::default(),
            exposure: 1.0,
            preview_scale: 0.5,
            screenshot_dir: PathBuf::from("screenshots"),
            ask_save_path: true,
        }
    }
}

impl ViewerConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config: ViewerConfig = serde_json::from_str(&json)?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Defaults when no path is given.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(())
    }
}
