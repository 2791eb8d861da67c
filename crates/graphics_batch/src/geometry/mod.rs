//! Geometry shared by batches
//!
//! Mesh data is owned outside of the batches; the only geometric work done
//! here is fitting one bounding sphere per mesh when its batch is created.

pub mod bounding;
pub mod mesh;

pub use bounding::{BoundingSphere, compute_bounding_sphere};
pub use mesh::{Mesh, MeshId, MeshLibrary, MeshSource, Vertex};
