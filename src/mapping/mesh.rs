//! Reconstructed mesh handle.
//!
//! A `Mesh` is an immutable, reference-counted snapshot. Colorizing produces a
//! new `Mesh`; swapping the displayed mesh is a pointer swap.

use std::sync::Arc;

use nalgebra::Vector3;

/// Upper bound on the number of vertices sampled for the centre estimate.
const CENTER_SAMPLE_TARGET: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshColoring {
    Uncolored,
    PerVertex,
    Textured,
}

#[derive(Debug)]
pub struct MeshData {
    pub vertices: Vec<Vector3<f64>>,
    pub faces: Vec<[u32; 3]>,
    pub coloring: MeshColoring,
}

#[derive(Debug, Clone)]
pub struct Mesh(Arc<MeshData>);

impl Mesh {
    pub fn new(vertices: Vec<Vector3<f64>>, faces: Vec<[u32; 3]>) -> Self {
        Self(Arc::new(MeshData {
            vertices,
            faces,
            coloring: MeshColoring::Uncolored,
        }))
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), Vec::new())
    }

    /// Same geometry, different colouring. Copies the geometry.
    pub fn with_coloring(&self, coloring: MeshColoring) -> Self {
        Self(Arc::new(MeshData {
            vertices: self.0.vertices.clone(),
            faces: self.0.faces.clone(),
            coloring,
        }))
    }

    pub fn data(&self) -> &MeshData {
        &self.0
    }

    pub fn coloring(&self) -> MeshColoring {
        self.0.coloring
    }

    pub fn is_colorized(&self) -> bool {
        self.0.coloring != MeshColoring::Uncolored
    }

    /// True when both handles point at the same snapshot.
    pub fn same_as(&self, other: &Mesh) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub fn num_vertices(&self) -> usize {
        self.0.vertices.len()
    }

    /// Approximate centre of the mesh, averaging a subsample of at most
    /// about a thousand vertices. Empty meshes return `fallback`.
    pub fn estimate_center(&self, fallback: Vector3<f64>) -> Vector3<f64> {
        let vertices = &self.0.vertices;
        if vertices.is_empty() {
            return fallback;
        }
        let step = (vertices.len() / CENTER_SAMPLE_TARGET).max(1);
        let (sum, count) = vertices
            .iter()
            .step_by(step)
            .fold((Vector3::zeros(), 0usize), |(sum, n), v| (sum + v, n + 1));
        sum / count as f64
    }
}
