//! Scan System - main entry point and thread orchestration.
//!
//! The `ScanSystem` owns the shared snapshot, spawns the session thread and
//! the IMU worker, and hands out `SessionHandle`s. Producers (sensor driver,
//! IMU worker, colorizer, UI) only ever talk to the session through a handle.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, Sender, bounded, unbounded};
use tracing::{info, warn};

use crate::colorize::{ColorizeEvent, ColorizeListener, ColorizeOutcome, ColorizePhase, TaskId};
use crate::config::{DynamicOptions, ScannerOptions};
use crate::imu::{ImuQueue, ImuSample, MotionSink, MotionUpdate};
use crate::sensor::{FrameBundle, FrameSourceListener, SensorEvent};

use super::backend::Collaborators;
use super::messages::{SessionCommand, SessionEvent};
use super::session::ScanSession;
use super::shared_state::{SessionSnapshot, SharedState};

/// Frames are dropped once this many commands are waiting.
const MAX_PENDING_COMMANDS: usize = 8;

/// How long `request_colorize` waits for the session to answer.
const REPLY_TIMEOUT: Duration = Duration::from_secs(2);

/// Cheap, cloneable entry point into the session thread.
#[derive(Clone)]
pub struct SessionHandle {
    sender: Sender<SessionCommand>,
}

impl SessionHandle {
    pub fn new(sender: Sender<SessionCommand>) -> Self {
        Self { sender }
    }

    /// Enqueue a command. Returns `false` if the session is gone.
    pub fn send(&self, command: SessionCommand) -> bool {
        self.sender.send(command).is_ok()
    }

    /// Number of commands waiting for the session thread.
    pub fn pending(&self) -> usize {
        self.sender.len()
    }

    pub fn start_scanning(&self) -> bool {
        self.send(SessionCommand::StartScanning)
    }

    pub fn finish_scanning(&self) -> bool {
        self.send(SessionCommand::FinishScanning)
    }

    pub fn reset(&self) -> bool {
        self.send(SessionCommand::Reset)
    }

    pub fn pinch_began(&self, scale: f64) -> bool {
        self.send(SessionCommand::PinchBegan(scale))
    }

    pub fn pinch_changed(&self, scale: f64) -> bool {
        self.send(SessionCommand::PinchChanged(scale))
    }

    pub fn apply_options(&self, dynamic: DynamicOptions) -> bool {
        self.send(SessionCommand::ApplyOptions(dynamic))
    }

    pub fn memory_pressure(&self) -> bool {
        self.send(SessionCommand::MemoryPressure)
    }

    pub fn acknowledge_memory_warning(&self) -> bool {
        self.send(SessionCommand::AcknowledgeMemoryWarning)
    }

    pub fn app_became_active(&self) -> bool {
        self.send(SessionCommand::AppBecameActive)
    }

    pub fn dismiss_viewer(&self) -> bool {
        self.send(SessionCommand::DismissViewer)
    }

    /// Ask the session to start colorizing and wait for its answer.
    ///
    /// On timeout this returns `false`; if the session gets to the request
    /// later it finds nobody listening and cancels the task it started.
    pub fn request_colorize(&self) -> bool {
        let (reply, answer) = bounded(1);
        if !self.send(SessionCommand::RequestColorize { reply: Some(reply) }) {
            return false;
        }
        answer.recv_timeout(REPLY_TIMEOUT).unwrap_or(false)
    }
}

impl FrameSourceListener for SessionHandle {
    fn on_frame(&self, frame: FrameBundle) {
        if self.pending() >= MAX_PENDING_COMMANDS {
            warn!("session backlog full, dropping frame at {:.3}s", frame.timestamp_s());
            return;
        }
        self.send(SessionCommand::Frame(frame));
    }

    fn on_sensor_event(&self, event: SensorEvent) {
        self.send(SessionCommand::Sensor(event));
    }
}

impl ColorizeListener for SessionHandle {
    fn on_progress(&self, task: TaskId, phase: ColorizePhase, progress: f64) {
        self.send(SessionCommand::Colorize(ColorizeEvent::Progress {
            task,
            phase,
            progress,
        }));
    }

    fn on_finished(&self, task: TaskId, phase: ColorizePhase, outcome: ColorizeOutcome) {
        self.send(SessionCommand::Colorize(ColorizeEvent::Finished {
            task,
            phase,
            outcome,
        }));
    }
}

impl MotionSink for SessionHandle {
    fn on_motion(&self, update: MotionUpdate) {
        self.send(SessionCommand::Motion(update));
    }
}

/// Main scanning system.
pub struct ScanSystem {
    shared: Arc<SharedState>,
    handle: SessionHandle,
    events: Receiver<SessionEvent>,
    imu: ImuQueue,
    session_thread: Option<JoinHandle<()>>,
}

impl ScanSystem {
    /// Validate the options, spawn the session thread and the IMU worker.
    pub fn new(
        options: ScannerOptions,
        dynamic: DynamicOptions,
        collaborators: Collaborators,
    ) -> Result<Self> {
        options.validate().context("invalid scanner options")?;

        let shared = SharedState::new();
        let (command_tx, command_rx) = unbounded::<SessionCommand>();
        let (event_tx, events) = unbounded::<SessionEvent>();
        let handle = SessionHandle::new(command_tx);

        let imu = ImuQueue::spawn(handle.clone(), options.imu_queue_capacity)
            .context("failed to spawn IMU worker")?;

        let listener: Arc<dyn ColorizeListener> = Arc::new(handle.clone());
        let session_shared = Arc::clone(&shared);
        let session_thread = thread::Builder::new()
            .name("scan-session".into())
            .spawn(move || {
                let mut session =
                    ScanSession::new(options, dynamic, collaborators, listener, session_shared, event_tx);
                session.run(command_rx);
            })
            .context("failed to spawn session thread")?;

        info!("scan system started");
        Ok(Self {
            shared,
            handle,
            events,
            imu,
            session_thread: Some(session_thread),
        })
    }

    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    /// Session notifications, in publication order.
    pub fn events(&self) -> &Receiver<SessionEvent> {
        &self.events
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.shared.snapshot()
    }

    pub fn shared_state(&self) -> &Arc<SharedState> {
        &self.shared
    }

    /// Queue a raw IMU sample for integration.
    pub fn submit_imu(&self, sample: ImuSample) -> bool {
        self.imu.submit(sample)
    }

    /// Stop the IMU worker and the session thread and wait for both.
    pub fn shutdown(&mut self) {
        self.imu.shutdown();
        self.shared.request_shutdown();
        self.handle.send(SessionCommand::Shutdown);
        if let Some(thread) = self.session_thread.take() {
            if thread.join().is_err() {
                warn!("session thread panicked");
            }
            info!("scan system stopped");
        }
    }
}

impl Drop for ScanSystem {
    fn drop(&mut self) {
        self.shutdown();
    }
}
