//! JSON / YAML configuration and calibration loading.

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use marker_overlay_core::{CalibratedCamera, CameraError, DEFAULT_ORIENTATION_CORRECTION_DEG};
use nalgebra::Vector3;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::capability::DetectorConfig;
use crate::pipeline::PipelineSettings;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
    #[error("unsupported config format for {0} (expected .json, .yaml or .yml)")]
    UnsupportedFormat(PathBuf),
    #[error("invalid calibration: {0}")]
    Camera(#[from] CameraError),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Format {
    Json,
    Yaml,
}

fn format_of(path: &Path) -> Result<Format, ConfigError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("json") => Ok(Format::Json),
        Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
            Ok(Format::Yaml)
        }
        _ => Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
    }
}

/// Read and parse a JSON or YAML document, picked by file extension.
pub fn load_document<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T, ConfigError> {
    let path = path.as_ref();
    let format = format_of(path)?;
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(match format {
        Format::Json => serde_json::from_str(&raw)?,
        Format::Yaml => serde_yaml::from_str(&raw)?,
    })
}

/// Load and validate a camera calibration document.
pub fn load_calibration(path: impl AsRef<Path>) -> Result<CalibratedCamera, ConfigError> {
    let camera: CalibratedCamera = load_document(path)?;
    camera.validate()?;
    Ok(camera)
}

fn default_max_frame_delta_s() -> f32 {
    0.25
}

fn default_hidden_position() -> [f32; 3] {
    [1000.0, 0.0, 0.0]
}

fn default_orientation_correction_deg() -> f32 {
    DEFAULT_ORIENTATION_CORRECTION_DEG
}

/// Startup configuration of an overlay session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlayConfig {
    /// Calibration document; relative paths resolve against the config file.
    pub calibration_path: PathBuf,
    #[serde(default)]
    pub detector: DetectorConfig,
    #[serde(default = "default_max_frame_delta_s")]
    pub max_frame_delta_s: f32,
    #[serde(default = "default_hidden_position")]
    pub hidden_position: [f32; 3],
    #[serde(default = "default_orientation_correction_deg")]
    pub orientation_correction_deg: f32,
}

impl OverlayConfig {
    pub fn new(calibration_path: impl Into<PathBuf>) -> Self {
        Self {
            calibration_path: calibration_path.into(),
            detector: DetectorConfig::default(),
            max_frame_delta_s: default_max_frame_delta_s(),
            hidden_position: default_hidden_position(),
            orientation_correction_deg: default_orientation_correction_deg(),
        }
    }

    /// Load a JSON or YAML config from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut cfg: Self = load_document(path)?;
        if cfg.calibration_path.is_relative() {
            if let Some(dir) = path.parent() {
                cfg.calibration_path = dir.join(&cfg.calibration_path);
            }
        }
        Ok(cfg)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load_calibration(&self) -> Result<CalibratedCamera, ConfigError> {
        load_calibration(&self.calibration_path)
    }

    /// Pipeline settings derived from this config.
    ///
    /// A delta clamp that is zero, negative, not finite or too large for a
    /// `Duration` falls back to the default.
    pub fn settings(&self) -> PipelineSettings {
        let max_delta = Duration::try_from_secs_f32(self.max_frame_delta_s)
            .ok()
            .filter(|d| !d.is_zero())
            .unwrap_or_else(|| {
                log::warn!(
                    "max_frame_delta_s = {} is unusable, keeping the default",
                    self.max_frame_delta_s
                );
                PipelineSettings::default().max_frame_delta
            });
        PipelineSettings {
            detector: self.detector,
            max_frame_delta: max_delta,
            hidden_position: Vector3::from(self.hidden_position),
            orientation_correction_deg: self.orientation_correction_deg,
        }
    }
}
