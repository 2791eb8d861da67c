//! # Graphics Batch
//!
//! Batched, growable, entity-indexed per-instance storage for instanced
//! rendering.
//!
//! ## Features
//!
//! - **Per-mesh batches**: every entity drawn with one mesh shares a batch
//! - **Dense slots**: swap-remove keeps attribute arrays hole-free
//! - **Need-exact growth**: attribute arrays grow only to the slots required
//! - **Texture arrays**: dense layer assignment with geometric growth
//! - **Bounding spheres**: one Ritter sphere per mesh, fitted at creation
//!
//! ## Quick Start
//!
//! ```rust
//! use graphics_batch::prelude::*;
//!
//! fn main() -> Result<(), BatchError> {
//!     let mut meshes = MeshLibrary::new();
//!     let cube = meshes.insert(Mesh::unit_cube());
//!
//!     let mut batch = GraphicsBatch::new(cube, &meshes, &BatchConfig::default())?;
//!     let entity = EntityId::new(1).expect("non-zero id");
//!     let slot = batch.add_entity(
//!         entity,
//!         InstanceTransform::IDENTITY,
//!         MaterialData::default(),
//!         &MaterialTextures::none(),
//!     )?;
//!     assert_eq!(slot, 0);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod foundation;
pub mod geometry;
pub mod batch;
pub mod config;
pub mod error;

#[cfg(test)]
mod tests;

pub use error::{BatchError, BatchResult};

/// Common imports for batch users
pub mod prelude {
    pub use crate::{
        batch::{
            BatchDirty, BatchRegistry, BatchStats, EntityId, GraphicsBatch, InstanceTransform,
            MaterialData, MaterialTextures, ShadingModel, TextureFormat, TextureId, TextureImage,
            TextureKind, TextureSource,
        },
        config::{BatchConfig, Config, ConfigError},
        error::{BatchError, BatchResult},
        foundation::math::{Mat4, Vec3, Vec4},
        geometry::{BoundingSphere, Mesh, MeshId, MeshLibrary, MeshSource},
    };
}
