//! Serial IMU queue.
//!
//! Device-motion samples arrive at high rate from the motion driver. They are
//! pushed into a bounded channel and consumed by exactly one worker thread,
//! so motion updates reach the tracker strictly in order and never race each
//! other.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError, bounded};
use tracing::{debug, info, warn};

use super::preintegration::GyroIntegrator;
use super::sample::{ImuSample, MotionUpdate};

/// Timeout for receiving samples. Allows periodic shutdown checks.
const RECV_TIMEOUT: Duration = Duration::from_millis(100);

/// Consumer of integrated motion updates.
pub trait MotionSink: Send + 'static {
    fn on_motion(&self, update: MotionUpdate);
}

/// Handle to the IMU worker thread.
pub struct ImuQueue {
    sender: Option<Sender<ImuSample>>,
    shutdown: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl ImuQueue {
    /// Spawn the worker. `capacity` bounds the number of pending samples.
    pub fn spawn<S: MotionSink>(sink: S, capacity: usize) -> io::Result<Self> {
        let (sender, receiver) = bounded::<ImuSample>(capacity.max(1));
        let shutdown = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&shutdown);

        let worker = thread::Builder::new()
            .name("imu-worker".into())
            .spawn(move || run(receiver, sink, flag))?;

        Ok(Self {
            sender: Some(sender),
            shutdown,
            worker: Some(worker),
        })
    }

    /// Queue a sample. When the queue is full the sample is dropped: the next
    /// one carries fresher gravity and rate anyway.
    pub fn submit(&self, sample: ImuSample) -> bool {
        let Some(sender) = self.sender.as_ref() else {
            return false;
        };
        match sender.try_send(sample) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                debug!("IMU queue full, dropping sample at {:.3}s", sample.timestamp_s);
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    /// Number of samples waiting to be integrated.
    pub fn pending(&self) -> usize {
        self.sender.as_ref().map_or(0, |s| s.len())
    }

    /// Stop the worker and wait for it.
    pub fn shutdown(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        self.sender = None;
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("IMU worker panicked");
            }
        }
    }
}

impl Drop for ImuQueue {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run<S: MotionSink>(receiver: Receiver<ImuSample>, sink: S, shutdown: Arc<AtomicBool>) {
    info!("IMU worker started");
    let mut integrator = GyroIntegrator::default();
    let mut processed = 0usize;

    loop {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }
        match receiver.recv_timeout(RECV_TIMEOUT) {
            Ok(sample) => {
                sink.on_motion(integrator.integrate(sample));
                processed += 1;
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    info!("IMU worker exiting after {} samples", processed);
}
