//! Mesh geometry as seen by the batching layer
//!
//! Meshes are owned by whatever storage the application uses. Batches only
//! need read access once, at construction, to fit their bounding sphere, so
//! the storage is reached through the [`MeshSource`] trait instead of a global
//! registry. [`MeshLibrary`] is a ready-made slot-map backed implementation.

use bytemuck::{Pod, Zeroable};
use slotmap::{new_key_type, SlotMap};

use crate::foundation::math::Vec3;

new_key_type! {
    /// Stable handle to a mesh owned by a [`MeshSource`]
    pub struct MeshId;
}

/// 3D vertex data structure
///
/// `#[repr(C)]` keeps the layout stable for direct upload to vertex buffers.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    /// Vertex position in 3D space
    pub position: [f32; 3],
    /// Vertex normal vector for lighting
    pub normal: [f32; 3],
    /// Texture coordinates
    pub tex_coord: [f32; 2],
}

impl Vertex {
    /// Create a vertex with a position and texture coordinate, normal left zeroed
    pub fn new(position: [f32; 3], tex_coord: [f32; 2]) -> Self {
        Self { position, normal: [0.0; 3], tex_coord }
    }

    /// Position as a math vector
    pub fn position(&self) -> Vec3 {
        Vec3::from(self.position)
    }
}

/// Immutable vertex/index list for one mesh
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    /// Vertex data
    pub vertices: Vec<Vertex>,
    /// Triangle indices into `vertices`
    pub indices: Vec<u32>,
}

impl Mesh {
    /// Create a mesh from vertex and index data
    pub fn new(vertices: Vec<Vertex>, indices: Vec<u32>) -> Self {
        Self { vertices, indices }
    }

    /// Axis-aligned cube of side 1 centered on the origin (8 shared corners)
    pub fn unit_cube() -> Self {
        let corners = [
            ([-0.5, -0.5, 0.5], [0.0, 0.0]),
            ([0.5, -0.5, 0.5], [1.0, 0.0]),
            ([0.5, 0.5, 0.5], [1.0, 1.0]),
            ([-0.5, 0.5, 0.5], [0.0, 1.0]),
            ([-0.5, -0.5, -0.5], [1.0, 0.0]),
            ([0.5, -0.5, -0.5], [0.0, 0.0]),
            ([0.5, 0.5, -0.5], [0.0, 1.0]),
            ([-0.5, 0.5, -0.5], [1.0, 1.0]),
        ];
        let vertices = corners
            .iter()
            .map(|&(position, tex_coord)| Vertex::new(position, tex_coord))
            .collect();

        #[rustfmt::skip]
        let indices = vec![
            0, 1, 2, 2, 3, 0, // front
            5, 4, 7, 7, 6, 5, // back
            4, 0, 3, 3, 7, 4, // left
            1, 5, 6, 6, 2, 1, // right
            3, 2, 6, 6, 7, 3, // top
            4, 5, 1, 1, 0, 4, // bottom
        ];

        Self { vertices, indices }
    }

    /// Vertex positions as math vectors
    pub fn positions(&self) -> Vec<Vec3> {
        self.vertices.iter().map(Vertex::position).collect()
    }

    /// Number of vertices
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Check if the mesh has no vertices
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }
}

/// Read-only access to externally owned mesh storage
pub trait MeshSource {
    /// Look up the geometry for `id`
    fn mesh(&self, id: MeshId) -> Option<&Mesh>;
}

/// Slot-map backed mesh storage
#[derive(Debug, Default)]
pub struct MeshLibrary {
    meshes: SlotMap<MeshId, Mesh>,
}

impl MeshLibrary {
    /// Create an empty library
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a mesh and return its handle
    pub fn insert(&mut self, mesh: Mesh) -> MeshId {
        self.meshes.insert(mesh)
    }

    /// Remove a mesh, returning it if the handle was live
    pub fn remove(&mut self, id: MeshId) -> Option<Mesh> {
        self.meshes.remove(id)
    }

    /// Number of stored meshes
    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    /// Check if the library is empty
    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }
}

impl MeshSource for MeshLibrary {
    fn mesh(&self, id: MeshId) -> Option<&Mesh> {
        self.meshes.get(id)
    }
}
