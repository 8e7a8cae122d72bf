//! Scanning session state machine.
//!
//! `ScanSession` is owned by exactly one thread. Frames, IMU updates, sensor
//! events, gestures and colorize reports all arrive as `SessionCommand`s and
//! are applied here one at a time, so no state is ever touched concurrently.
//!
//! State cascade:
//! ```text
//! CubePlacement --start_scanning--> Scanning --finish_scanning--> Viewing
//!       ^                              |  (memory pressure)          |
//!       +---------- reset / sensor lost +<------- dismiss_viewer -----+
//! ```

use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use nalgebra::Vector3;
use tracing::{debug, error, info, warn};

use crate::colorize::{
    ColorizeEvent, ColorizeListener, ColorizePhase, ColorizePipeline, ColorizeSettings,
    Colorizer, PipelineEffect,
};
use crate::config::{DynamicOptions, ScannerOptions};
use crate::imu::MotionUpdate;
use crate::mapping::{MapperConfig, Mesh, PinchScale, VolumeSpec};
use crate::sensor::{FrameBundle, SensorControl, SensorEvent, StreamConfig};
use crate::tracking::{
    Advisory, KeyframeCandidate, KeyframeSelector, KeyframeSelectorConfig, PoseAccuracy,
};

use super::backend::{Collaborators, PlacementPreview, SlamComponents, SlamFactory};
use super::messages::{SessionCommand, SessionEvent};
use super::shared_state::{SessionSnapshot, SessionStats, SharedState};
use super::state::SessionState;
use super::status::{AppStatus, SensorStatus};

/// Timeout for receiving commands. Allows periodic shutdown checks.
const RECV_TIMEOUT: Duration = Duration::from_millis(100);

/// Gravity shorter than this is treated as "not measured yet".
const MIN_GRAVITY_NORM: f64 = 1e-5;

const SCANNING_STOPPED_WARNING: &str = "Scanning will be stopped to avoid loss.";
const COLORIZING_CANCELED_WARNING: &str = "Colorizing was canceled.";

pub struct ScanSession {
    options: ScannerOptions,
    dynamic: DynamicOptions,
    state: SessionState,

    /// `None` until the SLAM components are built.
    slam: Option<SlamComponents>,
    factory: Box<dyn SlamFactory>,
    sensor: Box<dyn SensorControl>,
    colorizer: Box<dyn Colorizer>,
    preview: Box<dyn PlacementPreview>,
    colorize_listener: Arc<dyn ColorizeListener>,

    selector: KeyframeSelector,
    pipeline: ColorizePipeline,

    /// Volume the pinch gesture scales from.
    init_volume: VolumeSpec,
    volume: VolumeSpec,
    pinch: PinchScale,
    last_gravity: Vector3<f64>,
    use_color_camera: bool,
    /// The correction failure is only reported once per session.
    depth_correction_warned: bool,

    status: AppStatus,
    scan_available: bool,
    memory_warning_active: bool,
    /// Finalized, uncoloured mesh of the last scan.
    scan_mesh: Option<Mesh>,
    /// Mesh currently displayed.
    mesh: Option<Mesh>,
    mesh_center: Vector3<f64>,
    mesh_alpha: f32,
    advisory: Option<Advisory>,
    colorize_percent: Option<u8>,
    stats: SessionStats,

    shared: Arc<SharedState>,
    events: Sender<SessionEvent>,
}

impl ScanSession {
    /// Create a session in `CubePlacement` and try to build the SLAM
    /// components.
    pub fn new(
        options: ScannerOptions,
        dynamic: DynamicOptions,
        collaborators: Collaborators,
        colorize_listener: Arc<dyn ColorizeListener>,
        shared: Arc<SharedState>,
        events: Sender<SessionEvent>,
    ) -> Self {
        let volume = VolumeSpec::new(options.init_volume_size_m);
        let selector = KeyframeSelector::new(KeyframeSelectorConfig::from(&options));
        let Collaborators {
            factory,
            sensor,
            colorizer,
            preview,
        } = collaborators;

        let mut session = Self {
            options,
            dynamic,
            state: SessionState::CubePlacement,
            slam: None,
            factory,
            sensor,
            colorizer,
            preview,
            colorize_listener,
            selector,
            pipeline: ColorizePipeline::new(),
            init_volume: volume,
            volume,
            pinch: PinchScale::default(),
            last_gravity: Vector3::zeros(),
            use_color_camera: true,
            depth_correction_warned: false,
            status: AppStatus::default(),
            scan_available: false,
            memory_warning_active: false,
            scan_mesh: None,
            mesh: None,
            mesh_center: volume.center(),
            mesh_alpha: PoseAccuracy::High.mesh_alpha(),
            advisory: None,
            colorize_percent: None,
            stats: SessionStats::default(),
            shared,
            events,
        };
        session.setup_slam();
        session.adjust_volume_size(volume);
        session.update_scan_available();
        session.publish_snapshot();
        session
    }

    /// Session loop: apply commands until shutdown.
    pub fn run(&mut self, commands: Receiver<SessionCommand>) {
        info!("session thread started");
        loop {
            if self.shared.is_shutdown_requested() {
                break;
            }
            match commands.recv_timeout(RECV_TIMEOUT) {
                Ok(command) => {
                    if !self.handle(command) {
                        break;
                    }
                }
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        self.pipeline.cancel_all();
        info!(
            "session thread exiting: {} frames, {} tracked, {} keyframes",
            self.stats.frames_received, self.stats.frames_tracked, self.stats.keyframes_admitted
        );
    }

    /// Apply one command. Returns `false` when the loop should stop.
    pub fn handle(&mut self, command: SessionCommand) -> bool {
        match command {
            SessionCommand::Frame(frame) => self.process_frame(frame),
            SessionCommand::Motion(update) => self.process_motion(&update),
            SessionCommand::Sensor(event) => self.handle_sensor_event(event),
            SessionCommand::Colorize(event) => self.handle_colorize_event(event),
            SessionCommand::StartScanning => {
                self.start_scanning();
            }
            SessionCommand::FinishScanning => {
                self.finish_scanning();
            }
            SessionCommand::Reset => self.reset(),
            SessionCommand::PinchBegan(scale) => self.pinch_began(scale),
            SessionCommand::PinchChanged(scale) => self.pinch_changed(scale),
            SessionCommand::ApplyOptions(dynamic) => {
                self.apply_dynamic_options(dynamic);
            }
            SessionCommand::MemoryPressure => self.respond_to_memory_warning(),
            SessionCommand::AcknowledgeMemoryWarning => self.acknowledge_memory_warning(),
            SessionCommand::AppBecameActive => self.app_became_active(),
            SessionCommand::RequestColorize { reply } => {
                let started = self.request_colorize();
                if let Some(reply) = reply {
                    if reply.send(started).is_err() && started {
                        warn!("colorize requester stopped waiting, canceling preview");
                        self.pipeline.cancel(ColorizePhase::Preview);
                        self.hide_colorize_progress();
                    }
                }
            }
            SessionCommand::DismissViewer => {
                self.dismiss_viewer();
            }
            SessionCommand::Shutdown => return false,
        }
        self.publish_snapshot();
        true
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Current workflow state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Current scanning volume.
    pub fn volume(&self) -> VolumeSpec {
        self.volume
    }

    /// Whether the SLAM components exist.
    pub fn is_slam_initialized(&self) -> bool {
        self.slam.is_some()
    }

    /// Mesh shown in the viewer, if any.
    pub fn mesh(&self) -> Option<&Mesh> {
        self.mesh.as_ref()
    }

    /// Advisory currently shown over the live view.
    pub fn advisory(&self) -> Option<&Advisory> {
        self.advisory.as_ref()
    }

    /// Opacity of the live mesh overlay.
    pub fn mesh_alpha(&self) -> f32 {
        self.mesh_alpha
    }

    /// Whether a memory warning is waiting for acknowledgement.
    pub fn memory_warning_active(&self) -> bool {
        self.memory_warning_active
    }

    /// Overall colorize progress, `None` when hidden.
    pub fn colorize_percent(&self) -> Option<u8> {
        self.colorize_percent
    }

    /// Dynamic options in effect.
    pub fn dynamic_options(&self) -> &DynamicOptions {
        &self.dynamic
    }

    /// Sensor status and message visibility.
    pub fn app_status(&self) -> &AppStatus {
        &self.status
    }

    /// Frame and keyframe counters.
    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// Number of keyframes currently retained.
    pub fn keyframe_count(&self) -> usize {
        self.slam.as_ref().map_or(0, |s| s.keyframes.len())
    }

    // ------------------------------------------------------------------
    // SLAM lifecycle
    // ------------------------------------------------------------------

    /// Build the SLAM components if they do not exist yet.
    pub fn setup_slam(&mut self) -> bool {
        if self.slam.is_some() {
            return true;
        }
        let keyframe_options = self.options.keyframe_manager_options();
        match self
            .factory
            .build(&self.dynamic, &self.volume, &keyframe_options)
        {
            Ok(mut slam) => {
                slam.initializer.set_volume_size(&self.volume);
                self.slam = Some(slam);
                self.selector.reset();
                info!("SLAM components built");
                true
            }
            Err(e) => {
                error!("failed to build SLAM components: {:#}", e);
                false
            }
        }
    }

    /// Reset every SLAM component and go back to cube placement.
    pub fn reset_slam(&mut self) {
        self.selector.reset();
        if let Some(slam) = self.slam.as_mut() {
            slam.mapper.reset();
            slam.tracker.reset();
            slam.scene.clear();
            slam.keyframes.clear();
        }
        self.enter_cube_placement();
    }

    /// Drop the SLAM components.
    pub fn clear_slam(&mut self) {
        if self.slam.take().is_some() {
            debug!("SLAM components released");
        }
    }

    /// Tear down and rebuild the SLAM components, keeping the volume size.
    pub fn rebuild_slam(&mut self) {
        self.reset_slam();
        self.clear_slam();
        self.setup_slam();
        self.adjust_volume_size(self.volume);
        self.update_scan_available();
    }

    // ------------------------------------------------------------------
    // State transitions
    // ------------------------------------------------------------------

    /// Unlock exposure, clear the advisory and go back to placement.
    pub fn enter_cube_placement(&mut self) {
        self.sensor.set_color_exposure_locked(false);
        self.publish_advisory(None);
        self.mesh_alpha = PoseAccuracy::High.mesh_alpha();
        self.set_state(SessionState::CubePlacement);
        self.update_scan_available();
    }

    /// Leave cube placement and start tracking. Rejected unless the SLAM
    /// components exist and the placement has a valid pose.
    pub fn start_scanning(&mut self) -> bool {
        if self.state != SessionState::CubePlacement {
            warn!("cannot start scanning in {:?}", self.state);
            return false;
        }
        let Some(slam) = self.slam.as_mut() else {
            warn!("cannot start scanning: SLAM not initialized");
            return false;
        };
        if !slam.initializer.has_valid_pose() {
            warn!("cannot start scanning: no valid placement pose");
            return false;
        }

        let config = MapperConfig::new(
            self.volume,
            &self.dynamic,
            slam.initializer.has_support_plane(),
        );
        slam.mapper.prepare(&config);
        slam.tracker.set_initial_pose(slam.initializer.camera_pose());
        debug!(
            "mapper prepared: voxel {:.4} m, bounds {:?}",
            config.voxel_size_m, config.bounds_voxels
        );

        self.selector.reset();
        if self.use_color_camera {
            self.sensor.set_color_exposure_locked(true);
        }
        self.set_state(SessionState::Scanning);
        true
    }

    /// Finalize the mesh and switch to viewing.
    pub fn finish_scanning(&mut self) -> bool {
        if self.state != SessionState::Scanning {
            warn!("cannot finish scanning in {:?}", self.state);
            return false;
        }
        self.enter_viewing();
        true
    }

    fn enter_viewing(&mut self) {
        self.status.status_messages_disabled = true;
        self.emit(SessionEvent::StatusMessage(None));
        self.publish_advisory(None);
        self.sensor.stop_streaming();
        self.sensor.set_color_exposure_locked(false);

        let mesh = match self.slam.as_mut() {
            Some(slam) => {
                slam.mapper.finalize_mesh();
                let mesh = slam.scene.lock_mesh();
                slam.scene.unlock_mesh();
                mesh
            }
            None => Mesh::empty(),
        };
        info!("scan finished with {} vertices", mesh.num_vertices());

        self.stats.scans_completed += 1;
        self.scan_mesh = Some(mesh.clone());
        self.set_mesh(Some(mesh));
        self.set_state(SessionState::Viewing);
    }

    /// Abort the current activity and return to cube placement.
    pub fn reset(&mut self) {
        match self.state {
            SessionState::Viewing => {
                self.dismiss_viewer();
            }
            SessionState::CubePlacement | SessionState::Scanning => self.reset_slam(),
        }
    }

    /// Leave the mesh viewer: cancel colorizing, drop the mesh and
    /// reconnect the sensor. Rejected outside `Viewing`.
    pub fn dismiss_viewer(&mut self) -> bool {
        if self.state != SessionState::Viewing {
            warn!("cannot dismiss the viewer in {:?}", self.state);
            return false;
        }
        self.pipeline.reset();
        self.hide_colorize_progress();
        self.scan_mesh = None;
        self.set_mesh(None);
        self.status.status_messages_disabled = false;

        // Reconnecting rebuilds SLAM on its own; enter placement first so
        // streaming restarts.
        self.enter_cube_placement();
        if !self.connect_and_start_streaming() {
            self.rebuild_slam();
        }
        self.emit_status();
        true
    }

    // ------------------------------------------------------------------
    // Volume
    // ------------------------------------------------------------------

    /// Set the volume and push it to the preview and the pose initializer.
    pub fn adjust_volume_size(&mut self, volume: VolumeSpec) {
        self.volume = volume;
        self.preview.set_volume_size(&volume);
        if let Some(slam) = self.slam.as_mut() {
            slam.initializer.set_volume_size(&volume);
        }
        if self.mesh.is_none() {
            self.mesh_center = volume.center();
        }
        self.emit(SessionEvent::VolumeChanged(volume));
    }

    /// Start a pinch gesture. Only honoured during cube placement.
    pub fn pinch_began(&mut self, gesture_scale: f64) {
        if self.state != SessionState::CubePlacement {
            return;
        }
        self.pinch.began(gesture_scale);
    }

    /// Rescale the volume from the initial one. Only honoured during cube
    /// placement.
    pub fn pinch_changed(&mut self, gesture_scale: f64) {
        if self.state != SessionState::CubePlacement {
            return;
        }
        match self.pinch.changed(gesture_scale) {
            Some(scale) => self.adjust_volume_size(self.init_volume.scaled(scale)),
            None => debug!("ignoring pinch from degenerate scale"),
        }
    }

    // ------------------------------------------------------------------
    // Frames and motion
    // ------------------------------------------------------------------

    /// Route a sensor frame by state. Frames are ignored while viewing.
    pub fn process_frame(&mut self, mut frame: FrameBundle) {
        self.stats.frames_received += 1;
        if self.options.apply_expensive_correction_to_depth
            && !self.sensor.apply_depth_correction(&mut frame.depth)
            && !self.depth_correction_warned
        {
            warn!("could not improve depth map accuracy, is the sensor firmware too old?");
            self.depth_correction_warned = true;
        }
        match self.state {
            SessionState::CubePlacement => self.place_cube(&frame),
            SessionState::Scanning => self.track_frame(&frame),
            SessionState::Viewing => {}
        }
    }

    fn place_cube(&mut self, frame: &FrameBundle) {
        self.preview.set_depth_frame(&frame.depth);
        let Some(slam) = self.slam.as_mut() else {
            return;
        };
        if self.last_gravity.norm() > MIN_GRAVITY_NORM {
            if let Err(e) = slam
                .initializer
                .update_with_gravity(&self.last_gravity, &frame.depth)
            {
                warn!("placement update failed: {}", e);
            }
        }
        self.preview
            .set_has_support_plane(slam.initializer.has_support_plane());
        self.update_scan_available();
    }

    /// Track one scanning frame, fuse it and consider it as a keyframe.
    pub fn track_frame(&mut self, frame: &FrameBundle) {
        let timestamp = frame.timestamp_s();
        let Some(slam) = self.slam.as_mut() else {
            self.selector.record_processed_frame(timestamp);
            return;
        };

        let pose_before = slam.tracker.last_pose();
        let color = frame.color.as_ref().filter(|_| self.use_color_camera);

        let advisory = match slam.tracker.update_pose(&frame.depth, color) {
            Err(e) => {
                warn!("tracking failed at {:.3}s: {}", timestamp, e);
                self.stats.tracking_errors += 1;
                Some(Advisory::TrackingError(e.to_string()))
            }
            Ok(reading) => {
                self.stats.frames_tracked += 1;
                self.mesh_alpha = reading.accuracy.mesh_alpha();
                if reading.accuracy >= PoseAccuracy::High {
                    slam.mapper.integrate(&frame.depth, &reading.pose);
                }

                let candidate = KeyframeCandidate {
                    pose_before,
                    reading: &reading,
                    depth: &frame.depth,
                    color,
                };
                let decision = self.selector.evaluate(&candidate, slam.keyframes.as_mut());
                if decision.is_admitted() {
                    self.stats.keyframes_admitted += 1;
                }

                let tracking = reading.hints.message().map(Advisory::TrackerHint);
                Advisory::by_priority(tracking, decision.advisory())
            }
        };

        self.publish_advisory(advisory);
        self.selector.record_processed_frame(timestamp);
    }

    /// Keep gravity for placement and feed motion to the tracker.
    pub fn process_motion(&mut self, update: &MotionUpdate) {
        if self.state == SessionState::CubePlacement {
            self.last_gravity = update.gravity;
        }
        if self.state.needs_sensor() {
            if let Some(slam) = self.slam.as_mut() {
                slam.tracker.update_with_motion(update);
            }
        }
    }

    // ------------------------------------------------------------------
    // Sensor
    // ------------------------------------------------------------------

    /// React to a sensor lifecycle event.
    pub fn handle_sensor_event(&mut self, event: SensorEvent) {
        info!("sensor event: {:?}", event);
        match event {
            SensorEvent::Connected => {
                if self.state.needs_sensor() {
                    self.connect_and_start_streaming();
                }
            }
            SensorEvent::Disconnected => {
                if self.state == SessionState::Scanning {
                    self.reset();
                }
                self.set_sensor_status(SensorStatus::NeedsUserToConnect);
            }
            SensorEvent::BatteryNeedsCharging => {
                self.set_sensor_status(SensorStatus::NeedsUserToCharge);
            }
            SensorEvent::LeftLowPowerMode => {
                self.set_sensor_status(SensorStatus::NeedsUserToConnect);
            }
            SensorEvent::StreamingStopped(reason) => {
                info!("sensor stopped streaming: {:?}", reason);
            }
        }
    }

    /// Connect the sensor, adapt the options to it, rebuild SLAM and start
    /// streaming if the current state needs the sensor.
    pub fn connect_and_start_streaming(&mut self) -> bool {
        let calibration = match self.sensor.initialize_connection() {
            Ok(calibration) => calibration,
            Err(e) => {
                warn!("sensor connection failed: {}", e);
                self.set_sensor_status(SensorStatus::NeedsUserToConnect);
                return false;
            }
        };

        self.use_color_camera = calibration.supports_color();
        if !self.use_color_camera {
            info!("sensor has no colour calibration, using depth only");
        }
        self.dynamic
            .adapt_to_sensor(self.use_color_camera, self.sensor.supports_high_res_color());
        self.rebuild_slam();
        self.set_sensor_status(SensorStatus::Ok);

        if self.state.needs_sensor() {
            return self.start_streaming();
        }
        true
    }

    /// Start streaming with the current colour setup, then make sure SLAM
    /// is built.
    pub fn start_streaming(&mut self) -> bool {
        let config = StreamConfig {
            sync_color: self.use_color_camera,
            registered_depth: self.use_color_camera && self.options.use_hardware_registered_depth,
            high_res_color: self.use_color_camera && self.dynamic.high_res_coloring,
        };
        if let Err(e) = self.sensor.start_streaming(config) {
            error!("failed to start streaming: {}", e);
            return false;
        }
        info!("streaming started: {:?}", config);
        self.setup_slam()
    }

    /// Abort a running scan and reconnect the sensor when it is needed.
    pub fn app_became_active(&mut self) {
        if self.state == SessionState::Scanning {
            info!("aborting scan after app became active");
            self.reset();
        }
        if self.state.needs_sensor() {
            self.connect_and_start_streaming();
        }
    }

    // ------------------------------------------------------------------
    // Options
    // ------------------------------------------------------------------

    /// Store new dynamic options and rebuild SLAM with them. Only accepted
    /// during cube placement.
    pub fn apply_dynamic_options(&mut self, dynamic: DynamicOptions) -> bool {
        if self.state != SessionState::CubePlacement {
            warn!("dynamic options can only change during cube placement");
            return false;
        }
        self.dynamic = dynamic;
        self.rebuild_slam();
        true
    }

    // ------------------------------------------------------------------
    // Memory pressure
    // ------------------------------------------------------------------

    /// Shed work under memory pressure, depending on the state.
    pub fn respond_to_memory_warning(&mut self) {
        match self.state {
            SessionState::Scanning => {
                warn!("memory pressure while scanning, finishing scan");
                self.enter_viewing();
                self.raise_memory_warning(SCANNING_STOPPED_WARNING);
            }
            SessionState::Viewing => {
                if self.pipeline.cancel(ColorizePhase::Enhanced) {
                    warn!("memory pressure while colorizing, enhanced colorizing canceled");
                    self.hide_colorize_progress();
                    self.raise_memory_warning(COLORIZING_CANCELED_WARNING);
                }
            }
            SessionState::CubePlacement => {
                info!("memory pressure during cube placement");
            }
        }
    }

    /// Re-arm the one-shot memory warning.
    pub fn acknowledge_memory_warning(&mut self) {
        self.memory_warning_active = false;
    }

    fn raise_memory_warning(&mut self, text: &'static str) {
        if self.memory_warning_active {
            return;
        }
        self.memory_warning_active = true;
        self.emit(SessionEvent::MemoryWarning(text));
    }

    // ------------------------------------------------------------------
    // Colorizing
    // ------------------------------------------------------------------

    /// Start colorizing the viewed mesh with the preview phase.
    pub fn request_colorize(&mut self) -> bool {
        if self.state != SessionState::Viewing {
            warn!("colorizing is only available while viewing");
            return false;
        }
        if !self.use_color_camera {
            warn!("cannot colorize without a colour camera");
            return false;
        }
        if self.mesh.as_ref().is_some_and(Mesh::is_colorized) {
            debug!("mesh is already colorized");
            return false;
        }
        self.start_colorize_phase(ColorizePhase::Preview)
    }

    /// The preview colours the finalized scan; the enhanced phase refines
    /// the preview result.
    fn start_colorize_phase(&mut self, phase: ColorizePhase) -> bool {
        let input = match phase {
            ColorizePhase::Preview => self.scan_mesh.clone(),
            ColorizePhase::Enhanced => self.mesh.clone(),
        };
        let (Some(mesh), Some(slam)) = (input, self.slam.as_ref()) else {
            warn!("nothing to colorize");
            return false;
        };
        let keyframes = slam.keyframes.keyframes();
        let settings = self.colorize_settings();

        match self.pipeline.start(
            phase,
            mesh,
            keyframes,
            settings,
            self.colorizer.as_mut(),
            Arc::clone(&self.colorize_listener),
        ) {
            Ok(_) => {
                self.set_colorize_percent(phase.overall_percent(0.0));
                true
            }
            Err(e) => {
                warn!("{:?} colorizing not started: {}", phase, e);
                false
            }
        }
    }

    fn colorize_settings(&self) -> ColorizeSettings {
        ColorizeSettings {
            quality: self.options.colorizer_quality,
            target_num_faces: self.options.colorizer_target_num_faces,
            prioritize_first_frame_color: self.options.prioritize_first_frame_color,
            high_res_color: self.dynamic.high_res_coloring,
        }
    }

    /// Apply progress or completion reported by a colorize task.
    pub fn handle_colorize_event(&mut self, event: ColorizeEvent) {
        match event {
            ColorizeEvent::Progress {
                task,
                phase,
                progress,
            } => {
                if let Some(percent) = self.pipeline.on_progress(task, phase, progress) {
                    self.set_colorize_percent(percent);
                }
            }
            ColorizeEvent::Finished {
                task,
                phase,
                outcome,
            } => match self.pipeline.on_finished(task, phase, outcome) {
                PipelineEffect::PreviewReady(mesh) => {
                    // The scan cannot be resumed from here on.
                    if let Some(slam) = self.slam.as_mut() {
                        slam.tracker.reset();
                        slam.mapper.reset();
                    }
                    self.set_mesh(Some(mesh));
                    if !self.start_colorize_phase(ColorizePhase::Enhanced) {
                        self.hide_colorize_progress();
                    }
                }
                PipelineEffect::FinalReady(mesh) => {
                    if let Some(slam) = self.slam.as_mut() {
                        slam.keyframes.clear();
                    }
                    self.set_mesh(Some(mesh));
                    self.hide_colorize_progress();
                }
                PipelineEffect::Failed(..) => self.hide_colorize_progress(),
                PipelineEffect::Ignored => {}
            },
        }
    }

    // ------------------------------------------------------------------
    // Publishing
    // ------------------------------------------------------------------

    fn set_state(&mut self, state: SessionState) {
        if self.state != state {
            info!("session state {:?} -> {:?}", self.state, state);
        }
        self.state = state;
        self.emit(SessionEvent::StateChanged(state));
    }

    fn publish_advisory(&mut self, advisory: Option<Advisory>) {
        if self.advisory == advisory {
            return;
        }
        self.emit(SessionEvent::Advisory(
            advisory.as_ref().map(|a| a.text().to_string()),
        ));
        self.advisory = advisory;
    }

    fn set_mesh(&mut self, mesh: Option<Mesh>) {
        let fallback = self.volume.center();
        self.mesh_center = mesh
            .as_ref()
            .map_or(fallback, |m| m.estimate_center(fallback));
        self.mesh = mesh.clone();
        self.emit(SessionEvent::MeshChanged {
            mesh,
            center: self.mesh_center,
        });
    }

    fn set_colorize_percent(&mut self, percent: u8) {
        self.colorize_percent = Some(percent);
        self.emit(SessionEvent::ColorizeProgress(percent));
    }

    fn hide_colorize_progress(&mut self) {
        if self.colorize_percent.take().is_some() {
            self.emit(SessionEvent::ColorizeProgressHidden);
        }
    }

    fn set_sensor_status(&mut self, status: SensorStatus) {
        if self.status.sensor_status != status {
            self.status.sensor_status = status;
            self.emit_status();
        }
    }

    fn emit_status(&self) {
        self.emit(SessionEvent::StatusMessage(self.status.message()));
    }

    fn update_scan_available(&mut self) {
        let available = self
            .slam
            .as_ref()
            .is_some_and(|s| s.initializer.has_valid_pose());
        if available != self.scan_available {
            self.scan_available = available;
            self.emit(SessionEvent::ScanAvailable(available));
        }
    }

    fn emit(&self, event: SessionEvent) {
        // Nobody listening is fine; the snapshot still has everything.
        let _ = self.events.send(event);
    }

    fn publish_snapshot(&self) {
        self.shared.publish(SessionSnapshot {
            state: self.state,
            volume: self.volume,
            mesh: self.mesh.clone(),
            mesh_center: self.mesh_center,
            mesh_alpha: self.mesh_alpha,
            advisory: self.advisory.as_ref().map(|a| a.text().to_string()),
            colorize_percent: self.colorize_percent,
            scan_available: self.scan_available,
            status_message: self.status.message(),
            keep_awake: self.state.needs_sensor() && self.sensor.is_connected_and_charged(),
            memory_warning_active: self.memory_warning_active,
            keyframe_count: self.keyframe_count(),
            stats: self.stats,
        });
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use nalgebra::{UnitQuaternion, Vector3};

    use super::*;
    use crate::colorize::{ColorizeError, ColorizeMode, ColorizeOutcome};
    use crate::geometry::SE3;
    use crate::mapping::MeshColoring;
    use crate::sensor::CalibrationType;
    use crate::system::test_support::{Harness, frame, motion, reading, yaw};
    use crate::tracking::{TrackerError, TrackerHints};

    #[test]
    fn test_starts_in_cube_placement_with_slam() {
        let h = Harness::new();
        assert_eq!(h.session.state(), SessionState::CubePlacement);
        assert!(h.session.is_slam_initialized());
        assert_eq!(h.log.lock().builds, 1);
    }

    #[test]
    fn test_start_scanning_without_pose_has_no_side_effects() {
        let mut h = Harness::new();
        h.log.lock().valid_pose = false;
        let before = h.log.lock().clone();

        assert!(!h.session.start_scanning());
        assert_eq!(h.session.state(), SessionState::CubePlacement);

        let after = h.log.lock().clone();
        assert_eq!(after.mapper_prepared.len(), before.mapper_prepared.len());
        assert_eq!(after.initial_poses.len(), before.initial_poses.len());
        assert_eq!(after.exposure_locks, before.exposure_locks);
        assert!(h.drain_events().iter().all(|e| !matches!(e, SessionEvent::StateChanged(_))));
    }

    #[test]
    fn test_start_scanning_without_slam_is_rejected() {
        let mut h = Harness::new();
        h.session.clear_slam();
        assert!(!h.session.start_scanning());
        assert_eq!(h.session.state(), SessionState::CubePlacement);
    }

    #[test]
    fn test_start_scanning_prepares_mapper_and_seeds_tracker() {
        let mut h = Harness::new();
        let placement = SE3::new(UnitQuaternion::identity(), Vector3::new(0.0, 0.0, -0.4));
        h.log.lock().placement_pose = placement;

        assert!(h.session.start_scanning());
        assert_eq!(h.session.state(), SessionState::Scanning);

        let log = h.log.lock();
        assert_eq!(log.mapper_prepared.len(), 1);
        assert_eq!(log.mapper_prepared[0].volume, VolumeSpec::cube(0.5));
        assert_eq!(log.initial_poses, vec![placement]);
        assert_eq!(log.exposure_locks.last(), Some(&true));
    }

    #[test]
    fn test_pinch_scales_volume_for_preview_and_initializer() {
        let mut h = Harness::new();
        h.session.pinch_began(1.0);
        h.session.pinch_changed(2.0);

        let expected = VolumeSpec::cube(1.0);
        assert_relative_eq!(h.session.volume().size(), expected.size());
        let log = h.log.lock();
        assert_eq!(log.preview_volumes.last(), Some(&expected));
        assert_eq!(log.initializer_volumes.last(), Some(&expected));
    }

    #[test]
    fn test_pinch_is_ignored_outside_cube_placement() {
        let mut h = Harness::new();
        h.session.start_scanning();
        h.session.pinch_began(1.0);
        h.session.pinch_changed(4.0);
        assert_eq!(h.session.volume(), VolumeSpec::cube(0.5));
    }

    #[test]
    fn test_huge_pinch_is_clamped() {
        let mut h = Harness::new();
        h.session.pinch_began(1.0);
        h.session.pinch_changed(100.0);
        assert_eq!(h.session.volume(), VolumeSpec::cube(3.0));
    }

    #[test]
    fn test_cube_placement_uses_gravity_and_publishes_availability() {
        let mut h = Harness::new();
        h.log.lock().valid_pose = false;
        h.session.reset();
        h.drain_events();

        // No gravity yet: initializer untouched.
        h.session.process_frame(frame(0.0, true));
        assert_eq!(h.log.lock().gravity_updates, 0);

        h.session.process_motion(&motion(Vector3::new(0.0, -1.0, 0.0)));
        h.log.lock().valid_pose = true;
        h.session.process_frame(frame(0.033, true));

        let log = h.log.lock().clone();
        assert_eq!(log.gravity_updates, 1);
        assert_eq!(log.preview_depth_frames, 2);
        assert_eq!(log.tracker_updates, 0);
        let events = h.drain_events();
        assert!(events.iter().any(|e| matches!(e, SessionEvent::ScanAvailable(true))));
    }

    #[test]
    fn test_accuracy_sequence_gates_mapping_and_keyframes() {
        let mut h = Harness::new();
        h.session.start_scanning();

        let accuracies = [
            PoseAccuracy::Low,
            PoseAccuracy::Low,
            PoseAccuracy::High,
            PoseAccuracy::High,
            PoseAccuracy::High,
            PoseAccuracy::High,
            PoseAccuracy::High,
            PoseAccuracy::High,
            PoseAccuracy::High,
            PoseAccuracy::High,
        ];
        let mut pose = SE3::identity();
        for (i, accuracy) in accuracies.into_iter().enumerate() {
            // Frame 6 turns fast (30 deg/s), others slowly (0.3 deg/s).
            let step = if i == 6 { 1.0 } else { 0.01 };
            pose = pose.compose(&yaw(step));
            h.log.lock().script.push_back(Ok(reading(pose, accuracy)));
            h.session.process_frame(frame(i as f64 / 30.0, true));
            if i == 6 {
                assert_eq!(h.session.advisory(), Some(&Advisory::HoldStill));
            }
        }

        let log = h.log.lock();
        assert_eq!(log.integrations, 8);
        assert_eq!(log.admitted.len(), 7);
        assert_relative_eq!(log.admitted[0], 2.0 / 30.0);
        assert!(!log.admitted.iter().any(|t| (*t - 6.0 / 30.0).abs() < 1e-9));
        assert_eq!(h.session.stats().keyframes_admitted, 7);
    }

    #[test]
    fn test_tracking_error_sets_advisory_and_keeps_scanning() {
        let mut h = Harness::new();
        h.session.start_scanning();
        h.log
            .lock()
            .script
            .push_back(Err(TrackerError::Failed("not enough depth".into())));
        h.session.process_frame(frame(0.0, true));

        assert_eq!(h.session.state(), SessionState::Scanning);
        assert_eq!(
            h.session.advisory().map(|a| a.text().to_string()),
            Some("tracking failed: not enough depth".to_string())
        );
        assert_eq!(h.log.lock().integrations, 0);
        assert_eq!(h.session.stats().tracking_errors, 1);
    }

    #[test]
    fn test_tracker_hint_wins_over_hold_still() {
        let mut h = Harness::new();
        h.session.start_scanning();
        // First keyframe, then a fast one that is also out of view.
        h.log
            .lock()
            .script
            .push_back(Ok(reading(SE3::identity(), PoseAccuracy::High)));
        h.session.process_frame(frame(0.0, true));

        let mut fast = reading(yaw(5.0), PoseAccuracy::High);
        fast.hints = TrackerHints {
            model_out_of_view: true,
            ..Default::default()
        };
        h.log.lock().script.push_back(Ok(fast));
        h.session.process_frame(frame(1.0 / 30.0, true));

        assert_eq!(
            h.session.advisory(),
            Some(&Advisory::TrackerHint("Please put the model back in view."))
        );
        assert_relative_eq!(h.session.mesh_alpha(), 0.8);
    }

    #[test]
    fn test_low_accuracy_fades_mesh() {
        let mut h = Harness::new();
        h.session.start_scanning();
        h.log
            .lock()
            .script
            .push_back(Ok(reading(SE3::identity(), PoseAccuracy::Low)));
        h.session.process_frame(frame(0.0, true));
        assert_relative_eq!(h.session.mesh_alpha(), 0.4);
    }

    #[test]
    fn test_finish_scanning_finalizes_mesh() {
        let mut h = Harness::new();
        h.session.start_scanning();
        assert!(h.session.finish_scanning());

        assert_eq!(h.session.state(), SessionState::Viewing);
        let log = h.log.lock().clone();
        assert_eq!(log.finalized, 1);
        assert_eq!(log.mesh_locks, 1);
        assert_eq!(log.mesh_unlocks, 1);
        assert_eq!(log.streaming_stops, 1);
        assert!(h.session.mesh().is_some_and(|m| m.same_as(&log.scene_mesh)));
        assert!(h.session.app_status().status_messages_disabled);
        assert!(!h.session.finish_scanning());
    }

    #[test]
    fn test_memory_pressure_while_scanning() {
        let mut h = Harness::new();
        h.session.start_scanning();
        h.drain_events();

        h.session.respond_to_memory_warning();
        assert_eq!(h.session.state(), SessionState::Viewing);
        assert!(h.session.memory_warning_active());

        // A second event before acknowledging produces no new alert.
        h.session.respond_to_memory_warning();
        let warnings: Vec<_> = h
            .drain_events()
            .into_iter()
            .filter_map(|e| match e {
                SessionEvent::MemoryWarning(text) => Some(text),
                _ => None,
            })
            .collect();
        assert_eq!(warnings, vec!["Scanning will be stopped to avoid loss."]);

        h.session.acknowledge_memory_warning();
        assert!(!h.session.memory_warning_active());
    }

    #[test]
    fn test_memory_pressure_cancels_enhanced_colorizing() {
        let mut h = Harness::scanned_with_keyframes();
        assert!(h.session.request_colorize());
        let preview = h.colored(MeshColoring::PerVertex);
        h.finish_colorize(0, ColorizeOutcome::Completed(preview));
        assert_eq!(h.log.lock().colorize_requests.len(), 2);
        let enhanced_cancel = h.log.lock().colorize_requests[1].cancel.clone();
        h.drain_events();

        h.session.respond_to_memory_warning();
        assert!(enhanced_cancel.is_cancelled());
        assert!(h.session.memory_warning_active());
        assert_eq!(h.session.colorize_percent(), None);
        let events = h.drain_events();
        assert!(events
            .iter()
            .any(|e| matches!(e, SessionEvent::MemoryWarning("Colorizing was canceled."))));

        // Late completion of the cancelled task changes nothing.
        let keyframes_before = h.session.keyframe_count();
        let mesh_before = h.session.mesh().cloned();
        let textured = h.colored(MeshColoring::Textured);
        h.finish_colorize(1, ColorizeOutcome::Completed(textured));
        assert_eq!(h.session.keyframe_count(), keyframes_before);
        assert!(h
            .session
            .mesh()
            .zip(mesh_before.as_ref())
            .is_some_and(|(a, b)| a.same_as(b)));
    }

    #[test]
    fn test_colorize_runs_preview_then_enhanced() {
        let mut h = Harness::scanned_with_keyframes();
        let resets_before = h.log.lock().tracker_resets;

        assert!(h.session.request_colorize());
        assert!(!h.session.request_colorize());
        {
            let log = h.log.lock();
            assert_eq!(log.colorize_requests.len(), 1);
            assert_eq!(log.colorize_requests[0].mode(), ColorizeMode::PerVertex);
            assert!(!log.colorize_requests[0].keyframes.is_empty());
        }

        h.progress_colorize(0, 0.5);
        assert_eq!(h.session.colorize_percent(), Some(10));

        let preview = h.colored(MeshColoring::PerVertex);
        h.finish_colorize(0, ColorizeOutcome::Completed(preview.clone()));
        assert!(h.session.mesh().is_some_and(|m| m.same_as(&preview)));
        assert_eq!(h.log.lock().tracker_resets, resets_before + 1);
        {
            let log = h.log.lock();
            assert_eq!(log.colorize_requests[1].mode(), ColorizeMode::TextureMap);
            assert!(log.colorize_requests[1].mesh.same_as(&preview));
            assert!(log.colorize_requests[1].mesh.is_colorized());
        }
        assert!(h.session.keyframe_count() > 0);

        h.progress_colorize(1, 0.5);
        assert_eq!(h.session.colorize_percent(), Some(60));

        let textured = h.colored(MeshColoring::Textured);
        h.finish_colorize(1, ColorizeOutcome::Completed(textured.clone()));
        assert!(h.session.mesh().is_some_and(|m| m.same_as(&textured)));
        assert_eq!(h.session.keyframe_count(), 0);
        assert_eq!(h.session.colorize_percent(), None);

        // Already colorized.
        assert!(!h.session.request_colorize());
    }

    #[test]
    fn test_colorize_request_without_listener_is_canceled() {
        let mut h = Harness::scanned_with_keyframes();
        let (reply, answer) = crossbeam_channel::bounded(1);
        drop(answer);

        assert!(h.session.handle(SessionCommand::RequestColorize { reply: Some(reply) }));
        let cancel = h.log.lock().colorize_requests[0].cancel.clone();
        assert!(cancel.is_cancelled());
        assert_eq!(h.session.colorize_percent(), None);

        // The pipeline is free again for an answered request.
        let (reply, answer) = crossbeam_channel::bounded(1);
        assert!(h.session.handle(SessionCommand::RequestColorize { reply: Some(reply) }));
        assert_eq!(answer.try_recv(), Ok(true));
        assert!(!h.log.lock().colorize_requests[1].cancel.is_cancelled());
    }

    #[test]
    fn test_preview_failure_leaves_mesh_uncolored() {
        let mut h = Harness::scanned_with_keyframes();
        let scanned = h.session.mesh().cloned();
        assert!(h.session.request_colorize());
        h.finish_colorize(
            0,
            ColorizeOutcome::Failed(ColorizeError::Failed("no texture memory".into())),
        );

        assert_eq!(h.log.lock().colorize_requests.len(), 1);
        assert!(h
            .session
            .mesh()
            .zip(scanned.as_ref())
            .is_some_and(|(a, b)| a.same_as(b)));
        assert_eq!(h.session.colorize_percent(), None);
        assert!(h.session.keyframe_count() > 0);
    }

    #[test]
    fn test_colorize_rejected_outside_viewing() {
        let mut h = Harness::new();
        assert!(!h.session.request_colorize());
        h.session.start_scanning();
        assert!(!h.session.request_colorize());
        assert!(h.log.lock().colorize_requests.is_empty());
    }

    #[test]
    fn test_dismiss_viewer_rebuilds_and_cancels() {
        let mut h = Harness::scanned_with_keyframes();
        assert!(h.session.request_colorize());
        let preview_cancel = h.log.lock().colorize_requests[0].cancel.clone();
        let builds_before = h.log.lock().builds;

        h.session.dismiss_viewer();

        assert!(preview_cancel.is_cancelled());
        assert_eq!(h.session.state(), SessionState::CubePlacement);
        assert!(h.session.mesh().is_none());
        assert!(h.session.is_slam_initialized());
        assert_eq!(h.log.lock().builds, builds_before + 1);
        assert!(!h.session.app_status().status_messages_disabled);
        assert_eq!(h.log.lock().streaming_starts.len(), 1);
    }

    #[test]
    fn test_dismiss_viewer_rejected_outside_viewing() {
        let mut h = Harness::new();
        let (builds_before, clears_before) = {
            let log = h.log.lock();
            (log.builds, log.scene_clears)
        };
        assert!(!h.session.dismiss_viewer());
        assert_eq!(h.session.state(), SessionState::CubePlacement);

        assert!(h.session.start_scanning());
        h.log
            .lock()
            .script
            .push_back(Ok(reading(SE3::identity(), PoseAccuracy::High)));
        h.session.process_frame(frame(0.0, true));
        assert_eq!(h.session.keyframe_count(), 1);

        assert!(h.session.handle(SessionCommand::DismissViewer));
        assert_eq!(h.session.state(), SessionState::Scanning);
        assert_eq!(h.session.keyframe_count(), 1);
        let log = h.log.lock();
        assert_eq!(log.builds, builds_before);
        assert_eq!(log.scene_clears, clears_before);
        assert_eq!(log.streaming_stops, 0);
    }

    #[test]
    fn test_dismiss_viewer_without_sensor_still_rebuilds() {
        let mut h = Harness::scanned_with_keyframes();
        h.log.lock().sensor_available = false;
        let builds_before = h.log.lock().builds;

        h.session.dismiss_viewer();
        assert_eq!(h.session.state(), SessionState::CubePlacement);
        assert_eq!(h.log.lock().builds, builds_before + 1);
        assert_eq!(
            h.session.app_status().sensor_status,
            SensorStatus::NeedsUserToConnect
        );
    }

    #[test]
    fn test_reset_from_viewing_is_full_rebuild() {
        let mut h = Harness::scanned_with_keyframes();
        let builds_before = h.log.lock().builds;
        h.session.reset();
        assert_eq!(h.session.state(), SessionState::CubePlacement);
        assert_eq!(h.log.lock().builds, builds_before + 1);
    }

    #[test]
    fn test_reset_while_scanning_clears_everything() {
        let mut h = Harness::new();
        h.session.start_scanning();
        h.log
            .lock()
            .script
            .push_back(Ok(reading(SE3::identity(), PoseAccuracy::High)));
        h.session.process_frame(frame(0.0, true));
        assert_eq!(h.session.keyframe_count(), 1);

        h.session.reset();
        assert_eq!(h.session.state(), SessionState::CubePlacement);
        assert_eq!(h.session.keyframe_count(), 0);
        let log = h.log.lock();
        assert_eq!(log.scene_clears, 1);
        assert_eq!(log.mapper_resets, 1);
        assert_eq!(log.builds, 1);
    }

    #[test]
    fn test_sensor_loss_while_scanning_returns_to_placement() {
        let mut h = Harness::new();
        h.session.start_scanning();
        h.session.handle_sensor_event(SensorEvent::Disconnected);
        assert_eq!(h.session.state(), SessionState::CubePlacement);
        assert_eq!(
            h.session.app_status().message(),
            Some("Please connect Structure Sensor.")
        );
    }

    #[test]
    fn test_sensor_loss_while_viewing_is_recorded() {
        let mut h = Harness::scanned_with_keyframes();
        h.session.handle_sensor_event(SensorEvent::Disconnected);
        assert_eq!(h.session.state(), SessionState::Viewing);
        assert_eq!(
            h.session.app_status().sensor_status,
            SensorStatus::NeedsUserToConnect
        );
        // Hidden while viewing.
        assert_eq!(h.session.app_status().message(), None);
    }

    #[test]
    fn test_battery_status() {
        let mut h = Harness::new();
        h.session.handle_sensor_event(SensorEvent::BatteryNeedsCharging);
        assert_eq!(
            h.session.app_status().message(),
            Some("Please charge Structure Sensor.")
        );
    }

    #[test]
    fn test_connect_depth_only_sensor_adapts_options() {
        let mut h = Harness::new();
        h.log.lock().calibration = CalibrationType::None;
        assert!(h.session.connect_and_start_streaming());

        let dynamic = h.session.dynamic_options();
        assert!(!dynamic.new_tracker_is_on);
        assert!(!dynamic.new_tracker_switch_enabled);
        let log = h.log.lock();
        let config = log.streaming_starts.last().copied().unwrap();
        assert!(!config.sync_color);
        assert!(!config.registered_depth);
        assert_eq!(log.builds, 2);
    }

    #[test]
    fn test_depth_only_sensor_takes_no_keyframes() {
        let mut h = Harness::new();
        h.log.lock().calibration = CalibrationType::None;
        h.session.connect_and_start_streaming();
        h.session.start_scanning();
        h.log
            .lock()
            .script
            .push_back(Ok(reading(SE3::identity(), PoseAccuracy::High)));
        h.session.process_frame(frame(0.0, true));
        assert_eq!(h.session.keyframe_count(), 0);
        assert_eq!(h.log.lock().tracked_with_color, 0);
    }

    #[test]
    fn test_apply_dynamic_options_only_in_placement() {
        let mut h = Harness::new();
        h.session.pinch_began(1.0);
        h.session.pinch_changed(1.5);
        let options = DynamicOptions {
            high_res_mapping: false,
            ..Default::default()
        };
        assert!(h.session.apply_dynamic_options(options));
        assert_eq!(h.log.lock().builds, 2);
        assert_eq!(h.session.volume(), VolumeSpec::cube(0.75));
        assert!(!h.session.dynamic_options().high_res_mapping);

        h.session.start_scanning();
        assert!(!h.session.apply_dynamic_options(DynamicOptions::default()));
        assert_eq!(h.log.lock().builds, 2);
    }

    #[test]
    fn test_app_became_active_aborts_scan() {
        let mut h = Harness::new();
        h.session.start_scanning();
        h.session.app_became_active();
        assert_eq!(h.session.state(), SessionState::CubePlacement);
        assert_eq!(h.log.lock().streaming_starts.len(), 1);
    }

    #[test]
    fn test_motion_reaches_tracker_only_with_sensor_states() {
        let mut h = Harness::new();
        h.session.process_motion(&motion(Vector3::new(0.0, -1.0, 0.0)));
        assert_eq!(h.log.lock().motion_updates, 1);

        h.session.start_scanning();
        h.session.finish_scanning();
        h.session.process_motion(&motion(Vector3::new(0.0, -1.0, 0.0)));
        assert_eq!(h.log.lock().motion_updates, 1);
    }

    #[test]
    fn test_depth_correction_runs_on_every_frame() {
        let mut h = Harness::new();
        h.log.lock().depth_correction_supported = false;
        h.session.process_frame(frame(0.0, true));
        assert!(h.session.start_scanning());
        h.session.process_frame(frame(0.1, true));

        let log = h.log.lock();
        assert_eq!(log.depth_corrections, 2);
        assert_eq!(log.tracker_updates, 1);
        assert_eq!(log.preview_depth_frames, 1);
    }

    #[test]
    fn test_depth_correction_disabled() {
        let mut h = Harness::with_options(ScannerOptions {
            apply_expensive_correction_to_depth: false,
            ..Default::default()
        });
        h.session.process_frame(frame(0.0, true));
        assert_eq!(h.log.lock().depth_corrections, 0);
        assert_eq!(h.log.lock().preview_depth_frames, 1);
    }

    #[test]
    fn test_handle_publishes_snapshot() {
        let mut h = Harness::new();
        assert!(h.session.handle(SessionCommand::StartScanning));
        let snapshot = h.shared.snapshot();
        assert_eq!(snapshot.state, SessionState::Scanning);
        assert!(snapshot.keep_awake);
        assert!(!h.session.handle(SessionCommand::Shutdown));
    }
}
