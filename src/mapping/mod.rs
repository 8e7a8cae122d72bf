//! Volumetric mapping: scanning volume, mapper/scene contracts and meshes.

pub mod mapper;
pub mod mesh;
pub mod volume;

pub use mapper::{MapperConfig, SceneStore, VolumeMapper};
pub use mesh::{Mesh, MeshColoring, MeshData};
pub use volume::{MAX_VOLUME_SIZE_M, MIN_VOLUME_SIZE_M, PinchScale, VolumeSpec, keep_in_range};
