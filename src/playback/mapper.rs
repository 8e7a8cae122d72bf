//! Point-cloud mapper and scene.
//!
//! Depth pixels are back-projected with a nominal pinhole model, moved into
//! the volume frame and deduplicated per voxel. The "mesh" is the resulting
//! vertex set without faces.

use std::collections::HashSet;
use std::sync::Arc;

use nalgebra::{Point3, Vector3};
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::geometry::SE3;
use crate::mapping::{MapperConfig, Mesh, SceneStore, VolumeMapper};
use crate::sensor::DepthFrame;

/// Pixel stride used when back-projecting.
const PIXEL_STRIDE: usize = 2;

/// Horizontal field of view of the nominal depth camera.
const NOMINAL_HFOV_DEG: f64 = 60.0;

#[derive(Default)]
struct SceneSlot {
    mesh: Option<Mesh>,
    locked: bool,
}

/// Mesh slot shared by the mapper (writer) and the scene (reader).
#[derive(Clone, Default)]
pub struct SharedScene(Arc<Mutex<SceneSlot>>);

impl SharedScene {
    pub fn new() -> Self {
        Self::default()
    }
}

pub struct PointCloudMapper {
    scene: SharedScene,
    config: Option<MapperConfig>,
    voxels: HashSet<(i64, i64, i64)>,
    integrated_frames: usize,
}

impl PointCloudMapper {
    pub fn new(scene: SharedScene) -> Self {
        Self {
            scene,
            config: None,
            voxels: HashSet::new(),
            integrated_frames: 0,
        }
    }

    pub fn num_voxels(&self) -> usize {
        self.voxels.len()
    }
}

impl VolumeMapper for PointCloudMapper {
    fn prepare(&mut self, config: &MapperConfig) {
        self.config = Some(*config);
        self.voxels.clear();
        self.integrated_frames = 0;
    }

    fn integrate(&mut self, depth: &DepthFrame, pose: &SE3) {
        let Some(config) = self.config else {
            return;
        };
        let width = depth.width as usize;
        if width == 0 {
            return;
        }
        let height = depth.height as usize;
        let focal = (depth.width as f64 / 2.0) / (NOMINAL_HFOV_DEG.to_radians() / 2.0).tan();
        let (cx, cy) = (depth.width as f64 / 2.0, depth.height as f64 / 2.0);
        let size = config.volume.size();

        for v in (0..height).step_by(PIXEL_STRIDE) {
            for u in (0..width).step_by(PIXEL_STRIDE) {
                let Some(&d) = depth.depth_m.get(v * width + u) else {
                    continue;
                };
                if !d.is_finite() || d <= 0.0 {
                    continue;
                }
                let z = d as f64;
                let p_cam = Point3::new((u as f64 - cx) * z / focal, (v as f64 - cy) * z / focal, z);
                let p = pose.transform_point(&p_cam);
                let inside = (0..3).all(|i| p[i] >= 0.0 && p[i] <= size[i]);
                if !inside {
                    continue;
                }
                let key = (
                    (p.x / config.voxel_size_m).floor() as i64,
                    (p.y / config.voxel_size_m).floor() as i64,
                    (p.z / config.voxel_size_m).floor() as i64,
                );
                self.voxels.insert(key);
            }
        }
        self.integrated_frames += 1;
    }

    fn reset(&mut self) {
        self.config = None;
        self.voxels.clear();
        self.integrated_frames = 0;
    }

    fn finalize_mesh(&mut self) {
        let voxel = self.config.map_or(0.0, |c| c.voxel_size_m);
        let vertices = self
            .voxels
            .iter()
            .map(|&(x, y, z)| (Vector3::new(x as f64, y as f64, z as f64) + Vector3::repeat(0.5)) * voxel)
            .collect::<Vec<_>>();
        info!(
            "finalized {} vertices from {} frames",
            vertices.len(),
            self.integrated_frames
        );
        self.scene.0.lock().mesh = Some(Mesh::new(vertices, Vec::new()));
    }
}

pub struct PlaybackScene {
    scene: SharedScene,
}

impl PlaybackScene {
    pub fn new(scene: SharedScene) -> Self {
        Self { scene }
    }
}

impl SceneStore for PlaybackScene {
    fn lock_mesh(&mut self) -> Mesh {
        let mut slot = self.scene.0.lock();
        slot.locked = true;
        slot.mesh.clone().unwrap_or_else(Mesh::empty)
    }

    fn unlock_mesh(&mut self) {
        self.scene.0.lock().locked = false;
    }

    fn clear(&mut self) {
        let mut slot = self.scene.0.lock();
        if slot.locked {
            debug!("clearing scene while its mesh is locked");
        }
        slot.mesh = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DynamicOptions;
    use crate::io::ReplayDataset;
    use crate::mapping::VolumeSpec;
    use crate::playback::device::synthetic_frame;

    #[test]
    fn test_points_land_in_volume() {
        let volume = VolumeSpec::cube(1.0);
        let center = volume.center();
        let dataset = ReplayDataset::orbit(5, 30.0, 10.0, 0.5, center);
        let shared = SharedScene::new();
        let mut mapper = PointCloudMapper::new(shared.clone());
        let mut scene = PlaybackScene::new(shared);

        mapper.prepare(&MapperConfig::new(volume, &DynamicOptions::default(), true));
        for entry in &dataset.entries {
            let frame = synthetic_frame(entry, 16, 12);
            mapper.integrate(&frame.depth, &entry.reading.pose);
        }
        assert!(mapper.num_voxels() > 0);

        mapper.finalize_mesh();
        let mesh = scene.lock_mesh();
        scene.unlock_mesh();
        assert_eq!(mesh.num_vertices(), mapper.num_voxels());
        let size = volume.size();
        for v in &mesh.data().vertices {
            assert!((0..3).all(|i| v[i] >= 0.0 && v[i] <= size[i] + 0.01));
        }

        scene.clear();
        assert_eq!(scene.lock_mesh().num_vertices(), 0);
    }

    #[test]
    fn test_unprepared_mapper_ignores_frames() {
        let dataset = ReplayDataset::orbit(1, 30.0, 0.0, 0.5, Vector3::repeat(0.5));
        let mut mapper = PointCloudMapper::new(SharedScene::new());
        let frame = synthetic_frame(&dataset.entries[0], 8, 6);
        mapper.integrate(&frame.depth, &dataset.entries[0].reading.pose);
        assert_eq!(mapper.num_voxels(), 0);
    }
}
