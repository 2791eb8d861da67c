//! Batched per-instance storage
//!
//! - `slot_table`: entity id ↔ dense slot mapping with swap-remove
//! - `attributes`: parallel transform / bounding volume / material arrays
//! - `textures`: layer assignment and pixel storage for texture arrays
//! - `graphics_batch`: everything one mesh needs for an instanced draw
//! - `registry`: one batch per mesh

pub mod attributes;
pub mod graphics_batch;
pub mod registry;
pub mod slot_table;
pub mod textures;

pub use attributes::{
    AttributeStore, BoundingVolumeData, InstanceAttributes, InstanceTransform, MaterialData, ShadingModel,
};
pub use graphics_batch::{BatchDirty, BatchStats, GraphicsBatch, MaterialTextures, TextureKind};
pub use registry::BatchRegistry;
pub use slot_table::{EntityId, EntitySlotTable, MovedEntity, SlotRemoval};
pub use textures::{
    next_texture_capacity, TextureFormat, TextureId, TextureImage, TextureLayerAllocator, TextureSource,
};
