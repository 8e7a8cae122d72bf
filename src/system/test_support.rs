//! Recording test doubles for the session's collaborators.
//!
//! Every double writes into one shared [`Log`], which also carries the knobs
//! tests turn (placement validity, scripted tracker readings, sensor
//! availability).

use std::collections::VecDeque;
use std::sync::Arc;

use anyhow::Result;
use crossbeam_channel::{Receiver, unbounded};
use nalgebra::{UnitQuaternion, Vector3};
use parking_lot::Mutex;

use crate::colorize::{
    ColorizeError, ColorizeEvent, ColorizeListener, ColorizeOutcome, ColorizePhase,
    ColorizeRequest, Colorizer, TaskId,
};
use crate::config::{DynamicOptions, ScannerOptions};
use crate::geometry::SE3;
use crate::imu::MotionUpdate;
use crate::keyframes::{Keyframe, KeyframeManager, KeyframeManagerOptions};
use crate::mapping::{MapperConfig, Mesh, MeshColoring, SceneStore, VolumeMapper, VolumeSpec};
use crate::sensor::{
    CalibrationType, ColorFrame, DepthFrame, FrameBundle, SensorControl, SensorError,
    StreamConfig,
};
use crate::tracking::{
    PoseAccuracy, PoseInitializer, PoseTracker, TrackerError, TrackerHints, TrackerReading,
};

use super::backend::{Collaborators, PlacementPreview, SlamComponents, SlamFactory};
use super::messages::SessionEvent;
use super::session::ScanSession;
use super::shared_state::SharedState;

pub type SharedLog = Arc<Mutex<Log>>;

#[derive(Debug, Clone)]
pub struct Log {
    // Knobs.
    pub valid_pose: bool,
    pub placement_pose: SE3,
    pub has_support_plane: bool,
    /// Readings returned by the tracker, front first. When empty the tracker
    /// reports its last pose at high accuracy.
    pub script: VecDeque<Result<TrackerReading, TrackerError>>,
    pub scene_mesh: Mesh,
    pub sensor_available: bool,
    pub calibration: CalibrationType,
    pub fail_colorize_start: bool,
    pub depth_correction_supported: bool,

    // Records.
    pub builds: usize,
    pub tracker_updates: usize,
    pub tracked_with_color: usize,
    pub tracker_resets: usize,
    pub initial_poses: Vec<SE3>,
    pub motion_updates: usize,
    pub gravity_updates: usize,
    pub initializer_volumes: Vec<VolumeSpec>,
    pub mapper_prepared: Vec<MapperConfig>,
    pub integrations: usize,
    pub mapper_resets: usize,
    pub finalized: usize,
    pub mesh_locks: usize,
    pub mesh_unlocks: usize,
    pub scene_clears: usize,
    /// Timestamps of admitted keyframes.
    pub admitted: Vec<f64>,
    pub preview_volumes: Vec<VolumeSpec>,
    pub preview_depth_frames: usize,
    pub streaming_starts: Vec<StreamConfig>,
    pub streaming_stops: usize,
    pub exposure_locks: Vec<bool>,
    pub depth_corrections: usize,
    pub colorize_requests: Vec<ColorizeRequest>,
}

impl Default for Log {
    fn default() -> Self {
        Self {
            valid_pose: true,
            placement_pose: SE3::identity(),
            has_support_plane: true,
            script: VecDeque::new(),
            scene_mesh: Mesh::new(
                vec![
                    Vector3::new(0.1, 0.1, 0.1),
                    Vector3::new(0.3, 0.1, 0.1),
                    Vector3::new(0.2, 0.3, 0.2),
                ],
                vec![[0, 1, 2]],
            ),
            sensor_available: true,
            calibration: CalibrationType::DeviceSpecific,
            fail_colorize_start: false,
            depth_correction_supported: true,
            builds: 0,
            tracker_updates: 0,
            tracked_with_color: 0,
            tracker_resets: 0,
            initial_poses: Vec::new(),
            motion_updates: 0,
            gravity_updates: 0,
            initializer_volumes: Vec::new(),
            mapper_prepared: Vec::new(),
            integrations: 0,
            mapper_resets: 0,
            finalized: 0,
            mesh_locks: 0,
            mesh_unlocks: 0,
            scene_clears: 0,
            admitted: Vec::new(),
            preview_volumes: Vec::new(),
            preview_depth_frames: 0,
            streaming_starts: Vec::new(),
            streaming_stops: 0,
            exposure_locks: Vec::new(),
            depth_corrections: 0,
            colorize_requests: Vec::new(),
        }
    }
}

struct ScriptedTracker {
    log: SharedLog,
    pose: SE3,
}

impl PoseTracker for ScriptedTracker {
    fn update_pose(
        &mut self,
        _depth: &DepthFrame,
        color: Option<&ColorFrame>,
    ) -> Result<TrackerReading, TrackerError> {
        let mut log = self.log.lock();
        log.tracker_updates += 1;
        if color.is_some() {
            log.tracked_with_color += 1;
        }
        let result = log.script.pop_front().unwrap_or(Ok(TrackerReading {
            pose: self.pose,
            accuracy: PoseAccuracy::High,
            hints: TrackerHints::default(),
        }));
        if let Ok(reading) = &result {
            self.pose = reading.pose;
        }
        result
    }

    fn update_with_motion(&mut self, _motion: &MotionUpdate) {
        self.log.lock().motion_updates += 1;
    }

    fn set_initial_pose(&mut self, pose: SE3) {
        self.pose = pose;
        self.log.lock().initial_poses.push(pose);
    }

    fn last_pose(&self) -> SE3 {
        self.pose
    }

    fn reset(&mut self) {
        self.pose = SE3::identity();
        self.log.lock().tracker_resets += 1;
    }
}

struct RecordingInitializer(SharedLog);

impl PoseInitializer for RecordingInitializer {
    fn update_with_gravity(
        &mut self,
        _gravity: &Vector3<f64>,
        _depth: &DepthFrame,
    ) -> Result<(), TrackerError> {
        self.0.lock().gravity_updates += 1;
        Ok(())
    }

    fn has_valid_pose(&self) -> bool {
        self.0.lock().valid_pose
    }

    fn camera_pose(&self) -> SE3 {
        self.0.lock().placement_pose
    }

    fn has_support_plane(&self) -> bool {
        self.0.lock().has_support_plane
    }

    fn set_volume_size(&mut self, volume: &VolumeSpec) {
        self.0.lock().initializer_volumes.push(*volume);
    }
}

struct RecordingMapper(SharedLog);

impl VolumeMapper for RecordingMapper {
    fn prepare(&mut self, config: &MapperConfig) {
        self.0.lock().mapper_prepared.push(*config);
    }

    fn integrate(&mut self, _depth: &DepthFrame, _pose: &SE3) {
        self.0.lock().integrations += 1;
    }

    fn reset(&mut self) {
        self.0.lock().mapper_resets += 1;
    }

    fn finalize_mesh(&mut self) {
        self.0.lock().finalized += 1;
    }
}

struct RecordingScene(SharedLog);

impl SceneStore for RecordingScene {
    fn lock_mesh(&mut self) -> Mesh {
        let mut log = self.0.lock();
        log.mesh_locks += 1;
        log.scene_mesh.clone()
    }

    fn unlock_mesh(&mut self) {
        self.0.lock().mesh_unlocks += 1;
    }

    fn clear(&mut self) {
        self.0.lock().scene_clears += 1;
    }
}

/// Admits every viewpoint.
struct PermissiveKeyframes {
    log: SharedLog,
    keyframes: Vec<Keyframe>,
}

impl KeyframeManager for PermissiveKeyframes {
    fn would_admit(&self, _color_camera_pose: &SE3) -> bool {
        true
    }

    fn admit(&mut self, keyframe: Keyframe) {
        self.log.lock().admitted.push(keyframe.timestamp_s);
        self.keyframes.push(keyframe);
    }

    fn keyframes(&self) -> Vec<Keyframe> {
        self.keyframes.clone()
    }

    fn clear(&mut self) {
        self.keyframes.clear();
    }

    fn len(&self) -> usize {
        self.keyframes.len()
    }
}

pub struct RecordingFactory(pub SharedLog);

impl SlamFactory for RecordingFactory {
    fn build(
        &mut self,
        _dynamic: &DynamicOptions,
        _volume: &VolumeSpec,
        _keyframes: &KeyframeManagerOptions,
    ) -> Result<SlamComponents> {
        self.0.lock().builds += 1;
        Ok(SlamComponents {
            tracker: Box::new(ScriptedTracker {
                log: Arc::clone(&self.0),
                pose: SE3::identity(),
            }),
            initializer: Box::new(RecordingInitializer(Arc::clone(&self.0))),
            mapper: Box::new(RecordingMapper(Arc::clone(&self.0))),
            scene: Box::new(RecordingScene(Arc::clone(&self.0))),
            keyframes: Box::new(PermissiveKeyframes {
                log: Arc::clone(&self.0),
                keyframes: Vec::new(),
            }),
        })
    }
}

pub struct RecordingSensor(pub SharedLog);

impl SensorControl for RecordingSensor {
    fn initialize_connection(&mut self) -> Result<CalibrationType, SensorError> {
        let log = self.0.lock();
        if log.sensor_available {
            Ok(log.calibration)
        } else {
            Err(SensorError::NotFound)
        }
    }

    fn is_connected_and_charged(&self) -> bool {
        self.0.lock().sensor_available
    }

    fn supports_high_res_color(&self) -> bool {
        true
    }

    fn start_streaming(&mut self, config: StreamConfig) -> Result<(), SensorError> {
        self.0.lock().streaming_starts.push(config);
        Ok(())
    }

    fn stop_streaming(&mut self) {
        self.0.lock().streaming_stops += 1;
    }

    fn set_color_exposure_locked(&mut self, locked: bool) {
        self.0.lock().exposure_locks.push(locked);
    }

    fn apply_depth_correction(&mut self, _depth: &mut DepthFrame) -> bool {
        let mut log = self.0.lock();
        log.depth_corrections += 1;
        log.depth_correction_supported
    }
}

pub struct RecordingColorizer(pub SharedLog);

impl Colorizer for RecordingColorizer {
    fn start(
        &mut self,
        request: ColorizeRequest,
        _listener: Arc<dyn ColorizeListener>,
    ) -> Result<(), ColorizeError> {
        let mut log = self.0.lock();
        if log.fail_colorize_start {
            return Err(ColorizeError::Failed("colorizer unavailable".into()));
        }
        log.colorize_requests.push(request);
        Ok(())
    }
}

pub struct RecordingPreview(pub SharedLog);

impl PlacementPreview for RecordingPreview {
    fn set_volume_size(&mut self, volume: &VolumeSpec) {
        self.0.lock().preview_volumes.push(*volume);
    }

    fn set_depth_frame(&mut self, _depth: &DepthFrame) {
        self.0.lock().preview_depth_frames += 1;
    }

    fn set_has_support_plane(&mut self, _has_support_plane: bool) {}
}

/// Tests deliver colorize reports by hand.
pub struct IgnoringListener;

impl ColorizeListener for IgnoringListener {
    fn on_progress(&self, _: TaskId, _: ColorizePhase, _: f64) {}
    fn on_finished(&self, _: TaskId, _: ColorizePhase, _: ColorizeOutcome) {}
}

pub fn collaborators(log: &SharedLog) -> Collaborators {
    Collaborators {
        factory: Box::new(RecordingFactory(Arc::clone(log))),
        sensor: Box::new(RecordingSensor(Arc::clone(log))),
        colorizer: Box::new(RecordingColorizer(Arc::clone(log))),
        preview: Box::new(RecordingPreview(Arc::clone(log))),
    }
}

/// A session wired to recording doubles.
pub struct Harness {
    pub log: SharedLog,
    pub session: ScanSession,
    pub shared: Arc<SharedState>,
    pub events: Receiver<SessionEvent>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_options(ScannerOptions::default())
    }

    pub fn with_options(options: ScannerOptions) -> Self {
        let log: SharedLog = Arc::new(Mutex::new(Log::default()));
        let shared = SharedState::new();
        let (events_tx, events) = unbounded();
        let session = ScanSession::new(
            options,
            DynamicOptions::default(),
            collaborators(&log),
            Arc::new(IgnoringListener),
            Arc::clone(&shared),
            events_tx,
        );
        Self {
            log,
            session,
            shared,
            events,
        }
    }

    /// Session in `Viewing` after a one-keyframe scan.
    pub fn scanned_with_keyframes() -> Self {
        let mut h = Self::new();
        assert!(h.session.start_scanning());
        h.log
            .lock()
            .script
            .push_back(Ok(reading(SE3::identity(), PoseAccuracy::High)));
        h.session.process_frame(frame(0.0, true));
        assert!(h.session.finish_scanning());
        assert!(h.session.keyframe_count() > 0);
        h
    }

    pub fn drain_events(&self) -> Vec<SessionEvent> {
        self.events.try_iter().collect()
    }

    /// The scanned mesh with a different colouring.
    pub fn colored(&self, coloring: MeshColoring) -> Mesh {
        self.log.lock().scene_mesh.with_coloring(coloring)
    }

    pub fn progress_colorize(&mut self, request: usize, progress: f64) {
        let (task, phase) = self.request_ids(request);
        self.session.handle_colorize_event(ColorizeEvent::Progress {
            task,
            phase,
            progress,
        });
    }

    pub fn finish_colorize(&mut self, request: usize, outcome: ColorizeOutcome) {
        let (task, phase) = self.request_ids(request);
        self.session.handle_colorize_event(ColorizeEvent::Finished {
            task,
            phase,
            outcome,
        });
    }

    fn request_ids(&self, request: usize) -> (TaskId, ColorizePhase) {
        let log = self.log.lock();
        let r = &log.colorize_requests[request];
        (r.task, r.phase)
    }
}

pub fn frame(timestamp_s: f64, with_color: bool) -> FrameBundle {
    FrameBundle {
        depth: DepthFrame {
            timestamp_s,
            width: 2,
            height: 2,
            depth_m: Arc::from(vec![0.5f32; 4]),
            color_camera_pose_in_depth: SE3::identity(),
        },
        color: with_color.then(|| ColorFrame {
            timestamp_s,
            width: 2,
            height: 2,
            rgb: Arc::from(vec![128u8; 12]),
        }),
    }
}

pub fn reading(pose: SE3, accuracy: PoseAccuracy) -> TrackerReading {
    TrackerReading {
        pose,
        accuracy,
        hints: TrackerHints::default(),
    }
}

/// Rotation about the vertical axis, in degrees.
pub fn yaw(deg: f64) -> SE3 {
    SE3::new(
        UnitQuaternion::from_euler_angles(0.0, deg.to_radians(), 0.0),
        Vector3::zeros(),
    )
}

pub fn motion(gravity: Vector3<f64>) -> MotionUpdate {
    MotionUpdate {
        timestamp_s: 0.0,
        gravity,
        rotation_rate: Vector3::zeros(),
        delta_rotation: UnitQuaternion::identity(),
        attitude: UnitQuaternion::identity(),
    }
}
