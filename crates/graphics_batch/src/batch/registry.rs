//! One batch per mesh
//!
//! The registry routes entities to the batch of their mesh, creating batches
//! on first use and tearing them down when the mesh goes away.

use std::collections::HashMap;

use crate::batch::attributes::{InstanceTransform, MaterialData};
use crate::batch::graphics_batch::{BatchStats, GraphicsBatch, MaterialTextures};
use crate::batch::slot_table::{EntityId, SlotRemoval};
use crate::config::BatchConfig;
use crate::error::{BatchError, BatchResult};
use crate::geometry::{MeshId, MeshSource};

/// Owner of every batch, keyed by mesh
#[derive(Debug, Default)]
pub struct BatchRegistry {
    config: BatchConfig,
    batches: HashMap<MeshId, GraphicsBatch>,
    entity_meshes: HashMap<EntityId, MeshId>,
}

impl BatchRegistry {
    /// Create an empty registry whose batches use `config`
    pub fn new(config: BatchConfig) -> Self {
        Self {
            config,
            batches: HashMap::new(),
            entity_meshes: HashMap::new(),
        }
    }

    /// Settings applied to newly created batches
    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Add `entity` to the batch of `mesh_id`, creating the batch if needed
    ///
    /// An entity may live in one batch only. A batch created for a failed add
    /// is discarded again.
    pub fn add_entity(
        &mut self,
        meshes: &dyn MeshSource,
        mesh_id: MeshId,
        entity: EntityId,
        transform: InstanceTransform,
        material: MaterialData,
        textures: &MaterialTextures,
    ) -> BatchResult<u32> {
        if self.entity_meshes.contains_key(&entity) {
            return Err(BatchError::DuplicateEntity(entity));
        }

        let created = !self.batches.contains_key(&mesh_id);
        if created {
            let batch = GraphicsBatch::new(mesh_id, meshes, &self.config)?;
            log::info!("Created batch for mesh {:?}", mesh_id);
            self.batches.insert(mesh_id, batch);
        }

        let Some(batch) = self.batches.get_mut(&mesh_id) else {
            return Err(BatchError::UnknownMesh(mesh_id));
        };
        match batch.add_entity(entity, transform, material, textures) {
            Ok(slot) => {
                self.entity_meshes.insert(entity, mesh_id);
                Ok(slot)
            }
            Err(err) => {
                if created {
                    self.batches.remove(&mesh_id);
                }
                Err(err)
            }
        }
    }

    /// Remove `entity` from whichever batch holds it
    ///
    /// Empty batches are kept; their storage is reused by later adds.
    pub fn remove_entity(&mut self, entity: EntityId) -> BatchResult<SlotRemoval> {
        let batch = self.batch_of_mut(entity)?;
        let removal = batch.remove_entity(entity)?;
        self.entity_meshes.remove(&entity);
        Ok(removal)
    }

    /// Replace the model matrix of `entity`
    pub fn update_transform(&mut self, entity: EntityId, transform: InstanceTransform) -> BatchResult<()> {
        self.batch_of_mut(entity)?.update_transform(entity, transform)
    }

    /// Replace the material of `entity`
    pub fn update_material(
        &mut self,
        entity: EntityId,
        material: MaterialData,
        textures: &MaterialTextures,
    ) -> BatchResult<()> {
        self.batch_of_mut(entity)?.update_material(entity, material, textures)
    }

    /// Mesh whose batch holds `entity`
    pub fn mesh_of(&self, entity: EntityId) -> Option<MeshId> {
        self.entity_meshes.get(&entity).copied()
    }

    /// Batch for `mesh_id`
    pub fn batch(&self, mesh_id: MeshId) -> Option<&GraphicsBatch> {
        self.batches.get(&mesh_id)
    }

    /// Mutable batch for `mesh_id`
    pub fn batch_mut(&mut self, mesh_id: MeshId) -> Option<&mut GraphicsBatch> {
        self.batches.get_mut(&mesh_id)
    }

    /// Tear down the batch of `mesh_id`, forgetting all of its entities
    pub fn remove_batch(&mut self, mesh_id: MeshId) -> Option<BatchStats> {
        let batch = self.batches.remove(&mesh_id)?;
        for entity in batch.entities() {
            self.entity_meshes.remove(entity);
        }
        log::info!("Removed batch for mesh {:?}", mesh_id);
        Some(batch.release())
    }

    /// Tear down every batch
    pub fn clear(&mut self) {
        let count = self.batches.len();
        for (_, batch) in self.batches.drain() {
            batch.release();
        }
        self.entity_meshes.clear();
        log::info!("Cleared {} batches", count);
    }

    /// Iterate over batches and their meshes
    pub fn iter(&self) -> impl Iterator<Item = (MeshId, &GraphicsBatch)> {
        self.batches.iter().map(|(&mesh_id, batch)| (mesh_id, batch))
    }

    /// Number of batches
    pub fn len(&self) -> usize {
        self.batches.len()
    }

    /// Check if there are no batches
    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    /// Number of entities across all batches
    pub fn entity_count(&self) -> usize {
        self.entity_meshes.len()
    }

    /// Summed occupancy of every batch
    pub fn stats(&self) -> BatchStats {
        self.batches.values().map(GraphicsBatch::stats).fold(BatchStats::default(), |acc, s| BatchStats {
            active_count: acc.active_count + s.active_count,
            capacity: acc.capacity + s.capacity,
            texture_count: acc.texture_count + s.texture_count,
            texture_capacity: acc.texture_capacity + s.texture_capacity,
            reallocations: acc.reallocations + s.reallocations,
            byte_size: acc.byte_size + s.byte_size,
        })
    }

    fn batch_of_mut(&mut self, entity: EntityId) -> BatchResult<&mut GraphicsBatch> {
        let mesh_id = self.mesh_of(entity).ok_or(BatchError::UnknownEntity(entity))?;
        self.batches.get_mut(&mesh_id).ok_or(BatchError::UnknownEntity(entity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Mesh, MeshLibrary, Vertex};

    fn id(raw: u32) -> EntityId {
        EntityId::new(raw).expect("test ids are non-zero")
    }

    fn two_meshes() -> (MeshLibrary, MeshId, MeshId) {
        let mut meshes = MeshLibrary::new();
        let cube = meshes.insert(Mesh::unit_cube());
        let point = meshes.insert(Mesh::new(vec![Vertex::new([1.0, 2.0, 3.0], [0.0, 0.0])], vec![0]));
        (meshes, cube, point)
    }

    fn add(registry: &mut BatchRegistry, meshes: &MeshLibrary, mesh: MeshId, raw: u32) -> BatchResult<u32> {
        registry.add_entity(
            meshes,
            mesh,
            id(raw),
            InstanceTransform::IDENTITY,
            MaterialData::default(),
            &MaterialTextures::none(),
        )
    }

    #[test]
    fn test_entities_are_routed_by_mesh() {
        let (meshes, cube, point) = two_meshes();
        let mut registry = BatchRegistry::default();

        assert_eq!(add(&mut registry, &meshes, cube, 1).unwrap(), 0);
        assert_eq!(add(&mut registry, &meshes, point, 2).unwrap(), 0);
        assert_eq!(add(&mut registry, &meshes, cube, 3).unwrap(), 1);

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.entity_count(), 3);
        assert_eq!(registry.mesh_of(id(2)), Some(point));
        assert_eq!(registry.batch(cube).map(GraphicsBatch::active_count), Some(2));
        assert_eq!(registry.stats().active_count, 3);
    }

    #[test]
    fn test_entity_lives_in_one_batch() {
        let (meshes, cube, point) = two_meshes();
        let mut registry = BatchRegistry::default();
        add(&mut registry, &meshes, cube, 1).unwrap();

        let err = add(&mut registry, &meshes, point, 1).unwrap_err();
        assert!(matches!(err, BatchError::DuplicateEntity(_)));
        assert!(registry.batch(point).is_none());
    }

    #[test]
    fn test_unknown_mesh_creates_no_batch() {
        let (mut meshes, cube, _) = two_meshes();
        meshes.remove(cube);
        let mut registry = BatchRegistry::default();

        assert!(matches!(add(&mut registry, &meshes, cube, 1), Err(BatchError::UnknownMesh(_))));
        assert!(registry.is_empty());
        assert_eq!(registry.entity_count(), 0);
    }

    #[test]
    fn test_remove_and_update() {
        let (meshes, cube, _) = two_meshes();
        let mut registry = BatchRegistry::default();
        add(&mut registry, &meshes, cube, 1).unwrap();
        add(&mut registry, &meshes, cube, 2).unwrap();

        let removal = registry.remove_entity(id(1)).unwrap();
        assert_eq!(removal.moved.map(|m| m.entity), Some(id(2)));
        assert_eq!(registry.mesh_of(id(1)), None);

        let moved = InstanceTransform::from(nalgebra::Matrix4::new_scaling(2.0));
        registry.update_transform(id(2), moved).unwrap();
        assert_eq!(registry.batch(cube).unwrap().transforms(), &[moved]);

        assert!(matches!(registry.update_transform(id(1), moved), Err(BatchError::UnknownEntity(_))));
        assert!(matches!(registry.remove_entity(id(1)), Err(BatchError::UnknownEntity(_))));
    }

    #[test]
    fn test_remove_batch_forgets_entities() {
        let (meshes, cube, point) = two_meshes();
        let mut registry = BatchRegistry::default();
        add(&mut registry, &meshes, cube, 1).unwrap();
        add(&mut registry, &meshes, cube, 2).unwrap();
        add(&mut registry, &meshes, point, 3).unwrap();

        let stats = registry.remove_batch(cube).unwrap();
        assert_eq!(stats.active_count, 2);
        assert_eq!(registry.entity_count(), 1);
        assert!(registry.remove_batch(cube).is_none());

        // The id is free again
        add(&mut registry, &meshes, point, 1).unwrap();

        registry.clear();
        assert!(registry.is_empty());
        assert_eq!(registry.entity_count(), 0);
    }
}
