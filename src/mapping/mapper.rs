//! Contracts of the external volumetric mapper and scene.

use nalgebra::Vector3;

use crate::config::DynamicOptions;
use crate::geometry::SE3;
use crate::sensor::DepthFrame;

use super::mesh::Mesh;
use super::volume::VolumeSpec;

const MIN_VOXEL_SIZE_M: f64 = 0.003;
const MAX_VOXEL_SIZE_M: f64 = 0.2;

/// Voxels along X for high and normal resolution mapping.
const HIGH_RES_VOXELS_X: f64 = 200.0;
const LOW_RES_VOXELS_X: f64 = 125.0;

/// Mapper parameters derived from the volume and dynamic options.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapperConfig {
    pub volume: VolumeSpec,
    pub voxel_size_m: f64,
    /// Volume size in voxels, per axis.
    pub bounds_voxels: Vector3<u32>,
    pub legacy: bool,
    pub has_support_plane: bool,
}

impl MapperConfig {
    pub fn new(volume: VolumeSpec, dynamic: &DynamicOptions, has_support_plane: bool) -> Self {
        let size = volume.size();
        let voxels_x = if dynamic.high_res_mapping {
            HIGH_RES_VOXELS_X
        } else {
            LOW_RES_VOXELS_X
        };
        let voxel_size_m = (size.x / voxels_x).clamp(MIN_VOXEL_SIZE_M, MAX_VOXEL_SIZE_M);
        let bounds_voxels = size.map(|c| (c / voxel_size_m).round() as u32);

        Self {
            volume,
            voxel_size_m,
            bounds_voxels,
            legacy: !dynamic.new_mapper_is_on,
            has_support_plane,
        }
    }
}

/// Volumetric fusion engine.
pub trait VolumeMapper: Send {
    /// Configure for a new scan. Called once before the first integration.
    fn prepare(&mut self, config: &MapperConfig);

    /// Fuse a depth frame taken from `pose` into the volume.
    fn integrate(&mut self, depth: &DepthFrame, pose: &SE3);

    fn reset(&mut self);

    /// Extract the final mesh into the scene.
    fn finalize_mesh(&mut self);
}

/// Holds the reconstructed mesh.
pub trait SceneStore: Send {
    /// Current mesh. Must be followed by [`SceneStore::unlock_mesh`].
    fn lock_mesh(&mut self) -> Mesh;

    fn unlock_mesh(&mut self);

    fn clear(&mut self);
}
