//! Recorded scan sessions.
//!
//! A replay file is a CSV with a header row and one line per depth frame:
//!
//! ```text
//! timestamp_s,qx,qy,qz,qw,tx,ty,tz,accuracy,lost,out_of_view,too_close
//! 0.000,0,0,0,1,0,0,-0.4,High,false,false,false
//! ```
//!
//! `accuracy` is one of `NotAvailable`, `VeryLow`, `Low`, `Approximate`,
//! `High`. The pose is the depth camera pose in the volume frame.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result, bail};
use csv::ReaderBuilder;
use nalgebra::{UnitQuaternion, Vector3};
use serde::Deserialize;

use crate::geometry::SE3;
use crate::tracking::{PoseAccuracy, TrackerHints, TrackerReading};

#[derive(Debug, Deserialize)]
struct ReplayRow {
    timestamp_s: f64,
    qx: f64,
    qy: f64,
    qz: f64,
    qw: f64,
    tx: f64,
    ty: f64,
    tz: f64,
    accuracy: String,
    lost: bool,
    out_of_view: bool,
    too_close: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct ReplayEntry {
    pub timestamp_s: f64,
    pub reading: TrackerReading,
}

#[derive(Debug, Clone, Default)]
pub struct ReplayDataset {
    pub entries: Vec<ReplayEntry>,
}

impl ReplayDataset {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file =
            File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
        Self::from_reader(file).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .comment(Some(b'#'))
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut entries = Vec::new();
        let mut last_ts = f64::NEG_INFINITY;
        for (i, row) in rdr.deserialize::<ReplayRow>().enumerate() {
            let row = row.with_context(|| format!("bad replay row {}", i + 1))?;
            if row.timestamp_s <= last_ts {
                bail!(
                    "replay row {}: timestamp {} is not after {}",
                    i + 1,
                    row.timestamp_s,
                    last_ts
                );
            }
            last_ts = row.timestamp_s;

            let pose = SE3::from_quaternion(
                row.qw,
                row.qx,
                row.qy,
                row.qz,
                Vector3::new(row.tx, row.ty, row.tz),
            );
            if !pose.is_finite() {
                bail!("replay row {}: pose is not finite", i + 1);
            }
            entries.push(ReplayEntry {
                timestamp_s: row.timestamp_s,
                reading: TrackerReading {
                    pose,
                    accuracy: parse_accuracy(&row.accuracy)
                        .with_context(|| format!("replay row {}", i + 1))?,
                    hints: TrackerHints {
                        tracker_is_lost: row.lost,
                        model_out_of_view: row.out_of_view,
                        scene_is_too_close: row.too_close,
                    },
                },
            });
        }
        Ok(Self { entries })
    }

    /// Camera circling the volume centre at `radius_m`, looking inwards,
    /// turning `deg_per_s` at `fps`.
    pub fn orbit(num_frames: usize, fps: f64, deg_per_s: f64, radius_m: f64, center: Vector3<f64>) -> Self {
        let entries = (0..num_frames)
            .map(|i| {
                let t = i as f64 / fps;
                let angle = (deg_per_s * t).to_radians();
                let rotation = UnitQuaternion::from_euler_angles(0.0, angle, 0.0);
                let translation = center + rotation * Vector3::new(0.0, 0.0, -radius_m);
                ReplayEntry {
                    timestamp_s: t,
                    reading: TrackerReading {
                        pose: SE3::new(rotation, translation),
                        accuracy: PoseAccuracy::High,
                        hints: TrackerHints::default(),
                    },
                }
            })
            .collect();
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn duration_s(&self) -> f64 {
        match (self.entries.first(), self.entries.last()) {
            (Some(first), Some(last)) => last.timestamp_s - first.timestamp_s,
            _ => 0.0,
        }
    }
}

fn parse_accuracy(label: &str) -> Result<PoseAccuracy> {
    Ok(match label {
        "NotAvailable" => PoseAccuracy::NotAvailable,
        "VeryLow" => PoseAccuracy::VeryLow,
        "Low" => PoseAccuracy::Low,
        "Approximate" => PoseAccuracy::Approximate,
        "High" => PoseAccuracy::High,
        other => bail!("unknown accuracy {:?}", other),
    })
}
