use log::{debug, info, trace, warn};
use marker_overlay_core::{
    convert_to_luminance, CalibratedCamera, MappedPose, PoseMapper, TransformComponents,
    TransformNode,
};

use super::{PipelineSettings, PipelineState, StartupError, TickError, TickReport};
use crate::capability::{
    ClearMask, FrameSource, MarkerDetector, RenderTarget, Resolution, Scene,
};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Largest resolution by pixel count; the later entry wins a tie.
pub fn select_resolution(resolutions: &[Resolution]) -> Option<Resolution> {
    resolutions.iter().copied().max_by_key(Resolution::pixel_count)
}

/// Frame-synchronized AR overlay.
///
/// Each tick draws the current background, feeds a new camera frame (if any)
/// through luminance conversion and detection, places the model on the first
/// marker, advances the scene and draws it over the video after a depth-only
/// clear.
pub struct OverlayPipeline<F, D, R, S> {
    source: F,
    detector: D,
    target: R,
    scene: S,
    mapper: PoseMapper,
    state: PipelineState,
}

impl<F, D, R, S> OverlayPipeline<F, D, R, S>
where
    F: FrameSource,
    D: MarkerDetector,
    R: RenderTarget,
    S: Scene,
{
    /// Open the camera, configure the detector and park the model out of view.
    ///
    /// Any failure here is fatal; there is no degraded mode without a camera.
    pub fn start(
        mut source: F,
        mut detector: D,
        mut target: R,
        mut scene: S,
        camera: &CalibratedCamera,
        settings: PipelineSettings,
    ) -> Result<Self, StartupError> {
        let resolution = select_resolution(&source.supported_resolutions())
            .ok_or(StartupError::NoCaptureDevice)?;
        source.open(resolution)?;
        info!("capture opened at {}x{}", resolution.width, resolution.height);

        if resolution.width != camera.width || resolution.height != camera.height {
            warn!(
                "calibration is for {}x{}, capture is {}x{}",
                camera.width, camera.height, resolution.width, resolution.height
            );
        }

        let state = PipelineState::new(
            resolution.width as usize,
            resolution.height as usize,
            settings.hidden_position,
            settings.max_frame_delta,
        )?;

        // Allocates texture storage at the session size before any frame arrives.
        target.upload_background(&state.frame);

        detector.configure(&settings.detector);
        detector.set_lens_distortion(camera, camera.width, camera.height);

        let root = scene.root_mut();
        root.set_components(TransformComponents::at(settings.hidden_position));
        root.update_transform();

        Ok(Self {
            source,
            detector,
            target,
            scene,
            mapper: PoseMapper::with_correction_deg(settings.orientation_correction_deg),
            state,
        })
    }

    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    pub fn scene(&self) -> &S {
        &self.scene
    }

    pub fn target(&self) -> &R {
        &self.target
    }

    pub fn detector(&self) -> &D {
        &self.detector
    }

    pub fn source(&self) -> &F {
        &self.source
    }

    /// Run one tick using the wall-clock delta since the previous tick.
    pub fn tick(&mut self) -> Result<TickReport, TickError> {
        let dt = self.state.clock.tick();
        self.run_tick(dt)
    }

    /// Run one tick with an explicit animation delta (clamped like the clock).
    pub fn tick_with_delta(&mut self, dt: f32) -> Result<TickReport, TickError> {
        let dt = self.state.clock.clamp(dt);
        self.run_tick(dt)
    }

    /// Close the capture device and hand the collaborators back.
    pub fn shutdown(mut self) -> (F, D, R, S) {
        self.source.close();
        info!(
            "shutdown after {} ticks, {} frames, {} poses",
            self.state.ticks, self.state.frames_processed, self.state.poses_applied
        );
        (self.source, self.detector, self.target, self.scene)
    }

    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    fn run_tick(&mut self, dt: f32) -> Result<TickReport, TickError> {
        self.state.ticks += 1;
        let mut report = TickReport {
            tick: self.state.ticks,
            delta_s: dt,
            ..TickReport::default()
        };

        self.target.clear(ClearMask::ColorAndDepth);
        self.target.draw_background();

        if self.source.has_new_frame() {
            self.source.read_frame(&mut self.state.frame)?;
            self.target.upload_background(&self.state.frame);
            convert_to_luminance(&self.state.frame.view(), &mut self.state.luminance)?;
            self.state.frames_processed += 1;

            report.frame_updated = true;
            report.markers_found = self.detector.detect(&self.state.luminance);
            trace!(
                "tick {}: {} marker(s) found",
                report.tick,
                report.markers_found
            );
            report.pose_applied = self.apply_first_marker(report.markers_found);
        }

        self.scene.advance(dt);
        self.scene.root_mut().update_transform();

        self.target.clear(ClearMask::DepthOnly);
        self.scene.render();

        Ok(report)
    }

    /// Place the root on detection 0. Other detections are ignored.
    fn apply_first_marker(&mut self, found: usize) -> bool {
        if found == 0 {
            trace!("no marker, keeping previous pose");
            return false;
        }
        if !self.detector.is_3d(0) {
            trace!("marker 0 has no 3D pose, keeping previous pose");
            return false;
        }
        let Some(pose) = self.detector.marker_to_camera(0) else {
            return false;
        };
        let Some(MappedPose { world, components }) = self.mapper.map(&pose) else {
            warn!("marker pose is not finite in scene space, ignored");
            return false;
        };

        let root = self.scene.root_mut();
        root.set_components(components);
        root.update_transform();

        self.state.world = world;
        self.state.poses_applied += 1;
        debug!(
            "pose applied at ({:.3}, {:.3}, {:.3})",
            world.matrix[(0, 3)],
            world.matrix[(1, 3)],
            world.matrix[(2, 3)]
        );
        true
    }
}
