use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Result, bail};
use nalgebra::Vector3;
use tracing::info;
use tracing_subscriber::EnvFilter;

use rgbd_scanner::config::{DynamicOptions, ScannerOptions};
use rgbd_scanner::imu::ImuSample;
use rgbd_scanner::io::ReplayDataset;
use rgbd_scanner::mapping::MeshColoring;
use rgbd_scanner::playback::{
    LoggingPreview, PlaybackFactory, PlaybackSensor, SimulatedColorizer, synthetic_frame,
};
use rgbd_scanner::sensor::FrameSourceListener;
use rgbd_scanner::system::{
    Collaborators, ScanSystem, SessionEvent, SessionSnapshot, SessionState,
};

const FRAME_WIDTH: u32 = 64;
const FRAME_HEIGHT: u32 = 48;

/// Synthetic orbit used when no replay file is given.
const ORBIT_FRAMES: usize = 300;
const ORBIT_FPS: f64 = 30.0;
const ORBIT_DEG_PER_S: f64 = 0.6;
const ORBIT_RADIUS_M: f64 = 0.5;

fn wait_for(
    system: &ScanSystem,
    timeout: Duration,
    pred: impl Fn(&SessionSnapshot) -> bool,
) -> Option<SessionSnapshot> {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        let snapshot = system.snapshot();
        if pred(&snapshot) {
            return Some(snapshot);
        }
        thread::sleep(Duration::from_millis(5));
    }
    None
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut args = std::env::args().skip(1);
    let replay_path = args.next();
    let options = match args.next() {
        Some(path) => ScannerOptions::from_json_file(&path)?,
        None => ScannerOptions::default(),
    };

    let dataset = match &replay_path {
        Some(path) => {
            println!("Loading replay from: {}", path);
            ReplayDataset::load(path)?
        }
        None => ReplayDataset::orbit(
            ORBIT_FRAMES,
            ORBIT_FPS,
            ORBIT_DEG_PER_S,
            ORBIT_RADIUS_M,
            options.init_volume_size_m * 0.5,
        ),
    };
    if dataset.is_empty() {
        bail!("replay has no frames");
    }
    println!(
        "Replaying {} frames over {:.1} s",
        dataset.len(),
        dataset.duration_s()
    );
    let dataset = Arc::new(dataset);

    let collaborators = Collaborators {
        factory: Box::new(PlaybackFactory::new(Arc::clone(&dataset))),
        sensor: Box::new(PlaybackSensor::new()),
        colorizer: Box::new(SimulatedColorizer::new(Duration::from_millis(20))),
        preview: Box::new(LoggingPreview::default()),
    };
    let mut system = ScanSystem::new(options, DynamicOptions::default(), collaborators)?;
    let handle = system.handle();

    handle.app_became_active();

    // Gravity first, then a placement frame.
    for i in 0..10 {
        system.submit_imu(ImuSample {
            timestamp_s: i as f64 / 100.0,
            gyro: Vector3::zeros(),
            accel: Vector3::zeros(),
            gravity: Vector3::new(0.0, -1.0, 0.0),
        });
    }
    thread::sleep(Duration::from_millis(50));
    let first = &dataset.entries[0];
    let placed = (0..20).any(|_| {
        handle.on_frame(synthetic_frame(first, FRAME_WIDTH, FRAME_HEIGHT));
        wait_for(&system, Duration::from_millis(100), |s| s.scan_available).is_some()
    });
    if !placed {
        bail!("placement never became valid");
    }

    handle.start_scanning();
    if wait_for(&system, Duration::from_secs(2), |s| s.state == SessionState::Scanning).is_none() {
        bail!("scanning did not start");
    }

    for entry in dataset.entries.iter() {
        while handle.pending() > 4 {
            thread::sleep(Duration::from_millis(1));
        }
        handle.on_frame(synthetic_frame(entry, FRAME_WIDTH, FRAME_HEIGHT));
    }

    handle.finish_scanning();
    let viewing = wait_for(&system, Duration::from_secs(5), |s| s.state == SessionState::Viewing);
    let Some(viewing) = viewing else {
        bail!("scan did not finish");
    };
    println!(
        "Scan finished: {} vertices, {} keyframes",
        viewing.mesh.as_ref().map_or(0, |m| m.num_vertices()),
        viewing.keyframe_count
    );

    if handle.request_colorize() {
        let done = wait_for(&system, Duration::from_secs(30), |s| {
            s.mesh
                .as_ref()
                .is_some_and(|m| m.coloring() == MeshColoring::Textured)
        });
        match done {
            Some(_) => println!("Colorizing finished"),
            None => println!("Colorizing did not finish in time"),
        }
    } else {
        println!("Colorizing was not started");
    }

    let snapshot = system.snapshot();
    let stats = snapshot.stats;
    println!("\n=== Session Summary ===");
    println!("Frames received:   {}", stats.frames_received);
    println!("Frames tracked:    {}", stats.frames_tracked);
    println!("Tracking errors:   {}", stats.tracking_errors);
    println!("Keyframes taken:   {}", stats.keyframes_admitted);
    println!("Scans completed:   {}", stats.scans_completed);
    println!(
        "Mesh centre:       [{:.3}, {:.3}, {:.3}]",
        snapshot.mesh_center.x, snapshot.mesh_center.y, snapshot.mesh_center.z
    );

    let warnings = system
        .events()
        .try_iter()
        .filter(|e| matches!(e, SessionEvent::MemoryWarning(_)))
        .count();
    info!("{} memory warnings during session", warnings);

    system.shutdown();
    Ok(())
}
