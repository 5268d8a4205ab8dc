use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use approx::assert_relative_eq;
use marker_overlay::{
    CalibratedCamera, CaptureError, ClearMask, ColorFrame, DetectorConfig, FrameSource,
    LuminanceImage, MarkerDetector, MarkerPose, OverlayPipeline, PipelineSettings, PoseMapper,
    RenderTarget, Resolution, Scene, SceneNode, StartupError, ThresholdStrategy, TickError,
    TransformNode, WorldTransform,
};
use marker_overlay::core::{PinholeIntrinsics, RadialTangential};
use nalgebra::{Matrix4, Rotation3, Vector3};

#[derive(Clone, Debug, PartialEq)]
enum Event {
    Clear(ClearMask),
    DrawBackground,
    Upload,
    ReadFrame,
    Detect,
    Advance(f32),
    Render,
}

type Log = Rc<RefCell<Vec<Event>>>;

struct MockSource {
    resolutions: Vec<Resolution>,
    opened: Option<Resolution>,
    frames: Rc<RefCell<VecDeque<[u8; 3]>>>,
    fail_read: bool,
    log: Log,
}

impl FrameSource for MockSource {
    fn supported_resolutions(&self) -> Vec<Resolution> {
        self.resolutions.clone()
    }

    fn open(&mut self, resolution: Resolution) -> Result<(), CaptureError> {
        self.opened = Some(resolution);
        Ok(())
    }

    fn has_new_frame(&self) -> bool {
        !self.frames.borrow().is_empty()
    }

    fn read_frame(&mut self, frame: &mut ColorFrame) -> Result<(), CaptureError> {
        if self.fail_read {
            return Err(CaptureError::Device("unplugged".into()));
        }
        self.log.borrow_mut().push(Event::ReadFrame);
        if let Some(rgb) = self.frames.borrow_mut().pop_front() {
            for px in frame.data_mut().chunks_exact_mut(3) {
                px.copy_from_slice(&rgb);
            }
        }
        Ok(())
    }
}

type Detections = Vec<(bool, MarkerPose)>;

#[derive(Default)]
struct MockDetector {
    script: Rc<RefCell<VecDeque<Detections>>>,
    current: Detections,
    config: Option<DetectorConfig>,
    lens: Option<(u32, u32)>,
    last_mean: Option<f32>,
    log: Log,
}

impl MarkerDetector for MockDetector {
    fn configure(&mut self, config: &DetectorConfig) {
        self.config = Some(*config);
    }

    fn set_lens_distortion(&mut self, _camera: &CalibratedCamera, width: u32, height: u32) {
        self.lens = Some((width, height));
    }

    fn detect(&mut self, image: &LuminanceImage) -> usize {
        self.log.borrow_mut().push(Event::Detect);
        let sum: f32 = image.data().iter().sum();
        self.last_mean = Some(sum / image.data().len() as f32);
        self.current = self.script.borrow_mut().pop_front().unwrap_or_default();
        self.current.len()
    }

    fn is_3d(&self, index: usize) -> bool {
        self.current.get(index).is_some_and(|(three_d, _)| *three_d)
    }

    fn marker_to_camera(&self, index: usize) -> Option<MarkerPose> {
        self.current.get(index).map(|(_, pose)| *pose)
    }
}

struct MockTarget {
    log: Log,
}

impl RenderTarget for MockTarget {
    fn clear(&mut self, mask: ClearMask) {
        self.log.borrow_mut().push(Event::Clear(mask));
    }

    fn upload_background(&mut self, _frame: &ColorFrame) {
        self.log.borrow_mut().push(Event::Upload);
    }

    fn draw_background(&mut self) {
        self.log.borrow_mut().push(Event::DrawBackground);
    }
}

struct MockScene {
    root: SceneNode,
    log: Log,
}

impl Scene for MockScene {
    type Root = SceneNode;

    fn root(&self) -> &SceneNode {
        &self.root
    }

    fn root_mut(&mut self) -> &mut SceneNode {
        &mut self.root
    }

    fn advance(&mut self, dt: f32) {
        self.log.borrow_mut().push(Event::Advance(dt));
    }

    fn render(&mut self) {
        self.log.borrow_mut().push(Event::Render);
    }
}

struct Harness {
    pipeline: OverlayPipeline<MockSource, MockDetector, MockTarget, MockScene>,
    frames: Rc<RefCell<VecDeque<[u8; 3]>>>,
    detections: Rc<RefCell<VecDeque<Detections>>>,
    log: Log,
}

impl Harness {
    fn push_frame(&self, rgb: [u8; 3], markers: Detections) {
        self.frames.borrow_mut().push_back(rgb);
        self.detections.borrow_mut().push_back(markers);
    }

    fn root_world(&self) -> WorldTransform {
        self.pipeline.scene().root().world_transform()
    }

    fn take_events(&self) -> Vec<Event> {
        std::mem::take(&mut *self.log.borrow_mut())
    }
}

fn camera() -> CalibratedCamera {
    CalibratedCamera::new(
        64,
        48,
        PinholeIntrinsics {
            fx: 60.0,
            fy: 60.0,
            cx: 32.0,
            cy: 24.0,
            skew: 0.0,
        },
        RadialTangential::default(),
    )
    .expect("camera")
}

fn build_source(resolutions: Vec<Resolution>, log: &Log) -> MockSource {
    MockSource {
        resolutions,
        opened: None,
        frames: Rc::default(),
        fail_read: false,
        log: log.clone(),
    }
}

fn start_with(source: MockSource, settings: PipelineSettings) -> Result<Harness, StartupError> {
    let log = source.log.clone();
    let frames = source.frames.clone();
    let detector = MockDetector {
        log: log.clone(),
        ..MockDetector::default()
    };
    let detections = detector.script.clone();
    let pipeline = OverlayPipeline::start(
        source,
        detector,
        MockTarget { log: log.clone() },
        MockScene {
            root: SceneNode::default(),
            log: log.clone(),
        },
        &camera(),
        settings,
    )?;
    let harness = Harness {
        pipeline,
        frames,
        detections,
        log,
    };
    harness.take_events();
    Ok(harness)
}

fn start() -> Harness {
    let log = Log::default();
    let source = build_source(vec![Resolution::new(16, 12), Resolution::new(64, 48)], &log);
    start_with(source, PipelineSettings::default()).expect("start")
}

fn hidden_world() -> Matrix4<f32> {
    WorldTransform::from_translation(Vector3::new(1000.0, 0.0, 0.0)).matrix
}

fn pose_at(z: f64) -> MarkerPose {
    let rot = Rotation3::from_euler_angles(0.1, -0.2, 0.3);
    MarkerPose::new(*rot.matrix(), Vector3::new(0.05, -0.02, z))
}

fn mapped(pose: &MarkerPose) -> Matrix4<f32> {
    PoseMapper::default().world_transform(pose).matrix
}

#[test]
fn startup_opens_largest_resolution_and_configures_detector() {
    let log = Log::default();
    let source = build_source(
        vec![
            Resolution::new(160, 120),
            Resolution::new(64, 48),
            Resolution::new(320, 240),
        ],
        &log,
    );
    let settings = PipelineSettings {
        detector: DetectorConfig {
            marker_size: 0.08,
            threshold: ThresholdStrategy::Fixed { value: 100.0 },
        },
        ..PipelineSettings::default()
    };
    let h = start_with(source, settings.clone()).expect("start");

    assert_eq!(h.pipeline.source().opened, Some(Resolution::new(320, 240)));
    assert_eq!(h.pipeline.state().frame().width(), 320);
    assert_eq!(h.pipeline.state().luminance().height(), 240);
    assert_eq!(h.pipeline.detector().config, Some(settings.detector));
    // The lens model keeps the calibration's own image size.
    assert_eq!(h.pipeline.detector().lens, Some((64, 48)));
    assert_relative_eq!(h.root_world().matrix, hidden_world());
}

#[test]
fn startup_without_camera_is_fatal() {
    let log = Log::default();
    let source = build_source(Vec::new(), &log);
    let err = start_with(source, PipelineSettings::default())
        .err()
        .expect("must fail");
    assert!(matches!(err, StartupError::NoCaptureDevice));
}

#[test]
fn startup_seeds_background_texture() {
    let log = Log::default();
    let source = build_source(vec![Resolution::new(8, 8)], &log);
    let frames = source.frames.clone();
    let detector = MockDetector::default();
    let _pipeline = OverlayPipeline::start(
        source,
        detector,
        MockTarget { log: log.clone() },
        MockScene {
            root: SceneNode::default(),
            log: log.clone(),
        },
        &camera(),
        PipelineSettings::default(),
    )
    .expect("start");
    assert_eq!(*log.borrow(), vec![Event::Upload]);
    assert!(frames.borrow().is_empty());
}

#[test]
fn tick_renders_two_passes_in_order() {
    let mut h = start();
    h.push_frame([10, 20, 30], Vec::new());
    h.pipeline.tick_with_delta(0.02).expect("tick");
    assert_eq!(
        h.take_events(),
        vec![
            Event::Clear(ClearMask::ColorAndDepth),
            Event::DrawBackground,
            Event::ReadFrame,
            Event::Upload,
            Event::Detect,
            Event::Advance(0.02),
            Event::Clear(ClearMask::DepthOnly),
            Event::Render,
        ]
    );
}

#[test]
fn frame_gap_skips_conversion_and_detection() {
    let mut h = start();
    h.push_frame([30, 60, 90], Vec::new());
    let first = h.pipeline.tick_with_delta(0.016).expect("tick");
    assert!(first.frame_updated);
    assert_eq!(h.pipeline.detector().last_mean, Some(60.0));
    let luma_before = h.pipeline.state().luminance().data().to_vec();
    h.take_events();

    let gap = h.pipeline.tick_with_delta(0.016).expect("tick");
    assert!(!gap.frame_updated);
    assert_eq!(gap.markers_found, 0);
    assert_eq!(h.pipeline.state().luminance().data(), luma_before.as_slice());
    assert_eq!(h.pipeline.state().frames_processed(), 1);

    let events = h.take_events();
    assert!(!events.contains(&Event::Detect));
    assert!(!events.contains(&Event::Upload));
    // The stale texture is still drawn and the model still renders.
    assert!(events.contains(&Event::DrawBackground));
    assert!(events.contains(&Event::Render));
}

#[test]
fn luminance_is_channel_mean_of_latest_frame() {
    let mut h = start();
    h.push_frame([30, 60, 90], Vec::new());
    h.pipeline.tick_with_delta(0.0).expect("tick");
    assert!(h
        .pipeline
        .state()
        .luminance()
        .data()
        .iter()
        .all(|&v| v == 60.0));
    assert_eq!(h.pipeline.state().frame().pixel(5, 5), [30, 60, 90]);
}

#[test]
fn marker_appears_then_pose_is_held() {
    let mut h = start();
    let pose = pose_at(0.6);

    for _ in 0..3 {
        h.push_frame([50, 50, 50], Vec::new());
        let r = h.pipeline.tick_with_delta(0.033).expect("tick");
        assert!(r.frame_updated && !r.pose_applied);
        assert_relative_eq!(h.root_world().matrix, hidden_world());
    }

    h.push_frame([50, 50, 50], vec![(true, pose)]);
    let r = h.pipeline.tick_with_delta(0.033).expect("tick");
    assert!(r.pose_applied);
    assert_eq!(r.markers_found, 1);
    let at_detection = h.root_world();
    assert_relative_eq!(at_detection.matrix, mapped(&pose), epsilon = 1e-5);
    assert_relative_eq!(h.pipeline.state().world().matrix, mapped(&pose), epsilon = 1e-6);

    h.push_frame([50, 50, 50], Vec::new());
    let r = h.pipeline.tick_with_delta(0.033).expect("tick");
    assert!(r.frame_updated && !r.pose_applied);
    assert_eq!(h.root_world(), at_detection);
    assert_eq!(h.pipeline.state().poses_applied(), 1);
}

#[test]
fn only_first_marker_is_applied() {
    let mut h = start();
    let first = pose_at(0.5);
    let second = pose_at(2.5);
    h.push_frame([0, 0, 0], vec![(true, first), (true, second)]);
    let r = h.pipeline.tick_with_delta(0.01).expect("tick");
    assert_eq!(r.markers_found, 2);
    assert!(r.pose_applied);
    assert_relative_eq!(h.root_world().matrix, mapped(&first), epsilon = 1e-5);
}

#[test]
fn non_3d_detection_is_ignored() {
    let mut h = start();
    h.push_frame([0, 0, 0], vec![(false, pose_at(1.0))]);
    let r = h.pipeline.tick_with_delta(0.01).expect("tick");
    assert_eq!(r.markers_found, 1);
    assert!(!r.pose_applied);
    assert_relative_eq!(h.root_world().matrix, hidden_world());
}

#[test]
fn non_finite_pose_is_ignored() {
    let mut h = start();
    let good = pose_at(1.0);
    h.push_frame([0, 0, 0], vec![(true, good)]);
    h.pipeline.tick_with_delta(0.01).expect("tick");

    let bad = MarkerPose::identity_at([f64::NAN, 0.0, 1.0]);
    h.push_frame([0, 0, 0], vec![(true, bad)]);
    let r = h.pipeline.tick_with_delta(0.01).expect("tick");
    assert!(!r.pose_applied);
    assert_relative_eq!(h.root_world().matrix, mapped(&good), epsilon = 1e-5);
}

#[test]
fn pose_overflowing_f32_is_ignored() {
    let mut h = start();
    let good = pose_at(1.0);
    h.push_frame([0, 0, 0], vec![(true, good)]);
    h.pipeline.tick_with_delta(0.01).expect("tick");

    // Finite as f64, infinite once narrowed for the scene.
    let far = MarkerPose::identity_at([1e300, 0.0, 1.0]);
    assert!(far.is_finite());
    h.push_frame([0, 0, 0], vec![(true, far)]);
    let r = h.pipeline.tick_with_delta(0.01).expect("tick");
    assert!(!r.pose_applied);
    assert_eq!(h.pipeline.state().poses_applied(), 1);
    assert!(h.root_world().is_finite());
    assert_relative_eq!(h.root_world().matrix, mapped(&good), epsilon = 1e-5);
    assert_relative_eq!(h.pipeline.state().world().matrix, mapped(&good), epsilon = 1e-5);
}

#[test]
fn identical_poses_give_identical_transforms() {
    let mut h = start();
    let pose = pose_at(0.8);
    h.push_frame([0, 0, 0], vec![(true, pose)]);
    h.pipeline.tick_with_delta(0.01).expect("tick");
    let a = h.root_world();
    h.push_frame([9, 9, 9], vec![(true, pose)]);
    h.pipeline.tick_with_delta(0.01).expect("tick");
    assert_eq!(h.root_world(), a);
}

#[test]
fn animation_delta_is_clamped() {
    let mut h = start();
    let r = h.pipeline.tick_with_delta(5.0).expect("tick");
    assert_relative_eq!(r.delta_s, 0.25);
    let r = h.pipeline.tick_with_delta(-1.0).expect("tick");
    assert_eq!(r.delta_s, 0.0);
    assert_eq!(h.pipeline.state().ticks(), 2);
}

#[test]
fn capture_failure_propagates() {
    let log = Log::default();
    let mut source = build_source(vec![Resolution::new(4, 4)], &log);
    source.fail_read = true;
    let mut h = start_with(source, PipelineSettings::default()).expect("start");
    h.frames.borrow_mut().push_back([1, 2, 3]);
    let err = h.pipeline.tick().unwrap_err();
    assert!(matches!(err, TickError::Capture(CaptureError::Device(_))));
}
