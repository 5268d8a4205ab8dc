//! Headless replay of recorded frames and detections.
//!
//! Swaps the camera for a list of image files, the detector for a JSON script
//! of per-frame detections, and the renderer for recorders. The pipeline in
//! between is the real one, so a replay reproduces exactly what the live loop
//! would have done with the model's root node.

use std::{
    fs,
    path::{Path, PathBuf},
};

use log::{debug, info};
use marker_overlay_core::{
    CalibratedCamera, ColorFrame, LuminanceImage, MarkerPose, SceneNode, TransformNode,
};
use serde::{Deserialize, Serialize};

use crate::capability::{
    CaptureError, ClearMask, DetectorConfig, FrameSource, MarkerDetector, RenderTarget,
    Resolution, Scene,
};
use crate::config::{ConfigError, OverlayConfig};
use crate::pipeline::{OverlayPipeline, StartupError, TickError, TickReport};

/// Fixed animation step used by replays, in seconds.
pub const REPLAY_FRAME_DELTA_S: f32 = 1.0 / 30.0;

#[derive(thiserror::Error, Debug)]
pub enum ReplayError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error(transparent)]
    Tick(#[from] TickError),
    #[error(transparent)]
    Capture(#[from] CaptureError),
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Frame source over image files, one frame per file.
///
/// The session resolution is the size of the first file.
#[derive(Debug)]
pub struct ImageSequenceSource {
    paths: Vec<PathBuf>,
    next: usize,
    size: Option<Resolution>,
    opened: bool,
}

impl ImageSequenceSource {
    /// Probe the first file for the session size.
    ///
    /// An empty list yields a source with no supported resolution; an
    /// unreadable first file is a device error naming the file.
    pub fn new(paths: Vec<PathBuf>) -> Result<Self, CaptureError> {
        let size = match paths.first() {
            Some(first) => {
                let (w, h) = image::image_dimensions(first).map_err(|e| device_error(first, e))?;
                Some(Resolution::new(w, h))
            }
            None => None,
        };
        Ok(Self {
            paths,
            next: 0,
            size,
            opened: false,
        })
    }
}

fn device_error(path: &Path, err: impl std::fmt::Display) -> CaptureError {
    CaptureError::Device(format!("{}: {err}", path.display()))
}

impl FrameSource for ImageSequenceSource {
    fn supported_resolutions(&self) -> Vec<Resolution> {
        self.size.into_iter().collect()
    }

    fn open(&mut self, resolution: Resolution) -> Result<(), CaptureError> {
        if self.size != Some(resolution) {
            return Err(CaptureError::UnsupportedResolution(resolution));
        }
        self.opened = true;
        self.next = 0;
        Ok(())
    }

    fn has_new_frame(&self) -> bool {
        self.opened && self.next < self.paths.len()
    }

    fn read_frame(&mut self, frame: &mut ColorFrame) -> Result<(), CaptureError> {
        let Some(path) = self.paths.get(self.next) else {
            return Ok(());
        };
        let rgb = image::open(path)
            .map_err(|e| device_error(path, e))?
            .to_rgb8();
        if rgb.width() as usize != frame.width() || rgb.height() as usize != frame.height() {
            return Err(device_error(
                path,
                format!(
                    "frame is {}x{}, session is {}x{}",
                    rgb.width(),
                    rgb.height(),
                    frame.width(),
                    frame.height()
                ),
            ));
        }
        frame.copy_from_slice(rgb.as_raw())?;
        debug!("replayed frame {} from {}", self.next, path.display());
        self.next += 1;
        Ok(())
    }

    fn close(&mut self) {
        self.opened = false;
    }
}

fn default_three_d() -> bool {
    true
}

/// One recorded marker.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScriptedMarker {
    #[serde(default = "default_three_d")]
    pub three_d: bool,
    /// Row-major rotation.
    pub rotation: [[f64; 3]; 3],
    pub translation: [f64; 3],
}

impl ScriptedMarker {
    pub fn pose(&self) -> MarkerPose {
        MarkerPose::from_rows(self.rotation, self.translation)
    }
}

/// Detections recorded for one frame.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ScriptedFrame {
    #[serde(default)]
    pub markers: Vec<ScriptedMarker>,
}

/// Detector replaying one [`ScriptedFrame`] per `detect` call.
///
/// Calls past the end of the script find nothing.
#[derive(Clone, Debug, Default)]
pub struct ScriptedDetector {
    script: Vec<ScriptedFrame>,
    calls: usize,
    current: Vec<ScriptedMarker>,
    config: Option<DetectorConfig>,
    lens: Option<(u32, u32)>,
}

impl ScriptedDetector {
    pub fn new(script: Vec<ScriptedFrame>) -> Self {
        Self {
            script,
            ..Self::default()
        }
    }

    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ReplayError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ReplayError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(serde_json::from_str(&raw)?))
    }

    pub fn config(&self) -> Option<&DetectorConfig> {
        self.config.as_ref()
    }

    /// Image size passed with the lens model.
    pub fn lens_size(&self) -> Option<(u32, u32)> {
        self.lens
    }

    pub fn calls(&self) -> usize {
        self.calls
    }
}

impl MarkerDetector for ScriptedDetector {
    fn configure(&mut self, config: &DetectorConfig) {
        self.config = Some(*config);
    }

    fn set_lens_distortion(&mut self, _camera: &CalibratedCamera, width: u32, height: u32) {
        self.lens = Some((width, height));
    }

    fn detect(&mut self, _image: &LuminanceImage) -> usize {
        self.current = self
            .script
            .get(self.calls)
            .map(|f| f.markers.clone())
            .unwrap_or_default();
        self.calls += 1;
        self.current.len()
    }

    fn is_3d(&self, index: usize) -> bool {
        self.current.get(index).is_some_and(|m| m.three_d)
    }

    fn marker_to_camera(&self, index: usize) -> Option<MarkerPose> {
        self.current.get(index).map(ScriptedMarker::pose)
    }
}

/// Render target that only records what it was asked to do.
#[derive(Clone, Debug, Default)]
pub struct HeadlessTarget {
    pub clears: Vec<ClearMask>,
    pub uploads: usize,
    pub background_draws: usize,
    /// Quad geometry of the last background draw.
    pub last_quad: Option<[[f32; 4]; 4]>,
}

impl RenderTarget for HeadlessTarget {
    fn clear(&mut self, mask: ClearMask) {
        self.clears.push(mask);
    }

    fn upload_background(&mut self, _frame: &ColorFrame) {
        self.uploads += 1;
    }

    fn draw_background(&mut self) {
        self.background_draws += 1;
        self.last_quad = Some(self.background_quad());
    }
}

/// Scene with a single root node and an animation clock.
#[derive(Clone, Debug, Default)]
pub struct RecordingScene {
    root: SceneNode,
    pub elapsed_s: f32,
    pub renders: usize,
}

impl Scene for RecordingScene {
    type Root = SceneNode;

    fn root(&self) -> &SceneNode {
        &self.root
    }

    fn root_mut(&mut self) -> &mut SceneNode {
        &mut self.root
    }

    fn advance(&mut self, dt: f32) {
        self.elapsed_s += dt;
    }

    fn render(&mut self) {
        self.renders += 1;
    }
}

/// Per-tick outcome in a replay report.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReplayTick {
    #[serde(flatten)]
    pub report: TickReport,
    /// Root world matrix after the tick, row-major.
    pub root_world: [[f32; 4]; 4],
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ReplayReport {
    pub ticks: Vec<ReplayTick>,
    pub poses_applied: u64,
}

impl ReplayReport {
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ReplayError> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(|source| ReplayError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ReplayError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ReplayError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&raw)?)
    }
}

/// Run every frame through the pipeline and record the root after each tick.
pub fn run_replay(
    config: &OverlayConfig,
    frames: Vec<PathBuf>,
    detector: ScriptedDetector,
) -> Result<ReplayReport, ReplayError> {
    let camera = config.load_calibration()?;
    let mut pipeline = OverlayPipeline::start(
        ImageSequenceSource::new(frames)?,
        detector,
        HeadlessTarget::default(),
        RecordingScene::default(),
        &camera,
        config.settings(),
    )?;

    let mut report = ReplayReport::default();
    while pipeline.source().has_new_frame() {
        let tick = pipeline.tick_with_delta(REPLAY_FRAME_DELTA_S)?;
        report.ticks.push(ReplayTick {
            report: tick,
            root_world: pipeline.scene().root().world_transform().to_rows(),
        });
    }
    report.poses_applied = pipeline.state().poses_applied();
    info!(
        "replayed {} frame(s), {} pose(s) applied",
        report.ticks.len(),
        report.poses_applied
    );
    pipeline.shutdown();
    Ok(report)
}
