//! # Graphics Batch
//!
//! All instances of one mesh, stored so the rendering pipeline can draw them
//! with a single instanced call.
//!
//! ## Architecture
//!
//! ```text
//! GraphicsBatch (one per mesh)
//!         ├── EntitySlotTable      entity id ↔ dense slot
//!         ├── AttributeStore       transform / bounding volume / material per slot
//!         ├── TextureLayerAllocator × TextureKind
//!         └── BoundingSphere       fitted once from the mesh
//! ```
//!
//! Every mutation happens through `&mut self` and every read view borrows
//! `&self`, so the borrow checker enforces that growth never overlaps a render
//! pass reading the arrays. No internal locking is used.

use bitflags::bitflags;

use crate::batch::attributes::{
    AttributeStore, BoundingVolumeData, InstanceAttributes, InstanceTransform, MaterialData,
};
use crate::batch::slot_table::{EntityId, EntitySlotTable, SlotRemoval};
use crate::batch::textures::{TextureId, TextureImage, TextureLayerAllocator, TextureSource};
use crate::config::BatchConfig;
use crate::error::{BatchError, BatchResult};
use crate::geometry::{compute_bounding_sphere, BoundingSphere, MeshId, MeshSource};

bitflags! {
    /// Storage touched since the pipeline last called [`GraphicsBatch::take_dirty`]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct BatchDirty: u32 {
        /// Transform array changed
        const TRANSFORMS = 1 << 0;
        /// Bounding volume array changed
        const BOUNDING_VOLUMES = 1 << 1;
        /// Material array changed
        const MATERIALS = 1 << 2;
        /// A texture layer was assigned or uploaded
        const TEXTURES = 1 << 3;
        /// Attribute arrays were reallocated; GPU copies must be recreated
        const REALLOCATED = 1 << 4;
    }
}

/// Texture arrays kept per batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureKind {
    /// Base color
    Diffuse,
    /// Metallic in B, roughness in G
    MetallicRoughness,
    /// Tangent-space normal map
    TangentNormal,
    /// Emission map
    Emissive,
}

impl TextureKind {
    /// Every kind, in array order
    pub const ALL: [Self; 4] = [
        Self::Diffuse,
        Self::MetallicRoughness,
        Self::TangentNormal,
        Self::Emissive,
    ];

    const fn index(self) -> usize {
        self as usize
    }
}

/// Textures referenced by one instance's material
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MaterialTextures {
    /// Base color texture
    pub diffuse: Option<TextureId>,
    /// Metallic-roughness texture
    pub metallic_roughness: Option<TextureId>,
    /// Normal map texture
    pub tangent_normal: Option<TextureId>,
    /// Emission texture
    pub emissive: Option<TextureId>,
}

impl MaterialTextures {
    /// No textures
    pub fn none() -> Self {
        Self::default()
    }

    /// Set base color texture
    #[must_use]
    pub fn with_diffuse(mut self, texture: TextureId) -> Self {
        self.diffuse = Some(texture);
        self
    }

    /// Set metallic-roughness texture
    #[must_use]
    pub fn with_metallic_roughness(mut self, texture: TextureId) -> Self {
        self.metallic_roughness = Some(texture);
        self
    }

    /// Set normal map texture
    #[must_use]
    pub fn with_tangent_normal(mut self, texture: TextureId) -> Self {
        self.tangent_normal = Some(texture);
        self
    }

    /// Set emission texture
    #[must_use]
    pub fn with_emissive(mut self, texture: TextureId) -> Self {
        self.emissive = Some(texture);
        self
    }

    /// Bound textures with their kind
    pub fn iter(&self) -> impl Iterator<Item = (TextureKind, TextureId)> + '_ {
        TextureKind::ALL
            .into_iter()
            .filter_map(move |kind| self.get(kind).map(|id| (kind, id)))
    }

    /// Texture bound for `kind`
    pub fn get(&self, kind: TextureKind) -> Option<TextureId> {
        match kind {
            TextureKind::Diffuse => self.diffuse,
            TextureKind::MetallicRoughness => self.metallic_roughness,
            TextureKind::TangentNormal => self.tangent_normal,
            TextureKind::Emissive => self.emissive,
        }
    }
}

/// Snapshot of batch occupancy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchStats {
    /// Resident entities
    pub active_count: u32,
    /// Reserved attribute slots
    pub capacity: u32,
    /// Diffuse layers in use
    pub texture_count: u32,
    /// Diffuse layers reserved
    pub texture_capacity: u32,
    /// Attribute reallocations since creation
    pub reallocations: u32,
    /// Bytes held by attribute arrays and texture arenas
    pub byte_size: usize,
}

/// Instances of one mesh with their per-instance attributes and textures
#[derive(Debug)]
pub struct GraphicsBatch {
    mesh_id: MeshId,
    bounding_volume: BoundingSphere,
    slots: EntitySlotTable,
    attributes: AttributeStore,
    texture_arrays: [TextureLayerAllocator; 4],
    dirty: BatchDirty,
}

impl GraphicsBatch {
    /// Create the batch for `mesh_id`, fitting its bounding sphere once
    pub fn new(mesh_id: MeshId, meshes: &dyn MeshSource, config: &BatchConfig) -> BatchResult<Self> {
        let mesh = meshes.mesh(mesh_id).ok_or(BatchError::UnknownMesh(mesh_id))?;
        if mesh.is_empty() {
            log::warn!("Mesh {:?} has no vertices, batch bounding volume is degenerate", mesh_id);
        }
        let bounding_volume = compute_bounding_sphere(&mesh.positions());
        Self::with_bounding_volume(mesh_id, bounding_volume, config)
    }

    /// Create a batch around an already computed mesh bound
    pub fn with_bounding_volume(
        mesh_id: MeshId,
        bounding_volume: BoundingSphere,
        config: &BatchConfig,
    ) -> BatchResult<Self> {
        let attributes = AttributeStore::with_capacity(config.initial_entity_capacity)?;
        let texture_arrays = std::array::from_fn(|_| {
            TextureLayerAllocator::new(config.initial_texture_capacity, config.texture_growth_factor)
        });

        log::debug!(
            "Created batch for mesh {:?}: radius {:.3}, {} slots reserved",
            mesh_id,
            bounding_volume.radius,
            attributes.capacity()
        );

        Ok(Self {
            mesh_id,
            bounding_volume,
            slots: EntitySlotTable::with_capacity(config.initial_entity_capacity as usize),
            attributes,
            texture_arrays,
            dirty: BatchDirty::all(),
        })
    }

    /// Add an instance and return its slot
    ///
    /// The diffuse texture's layer is written into the material record. The
    /// slot's bounding volume starts as the mesh-level sphere. On error the
    /// batch is left as it was.
    pub fn add_entity(
        &mut self,
        entity: EntityId,
        transform: InstanceTransform,
        material: MaterialData,
        textures: &MaterialTextures,
    ) -> BatchResult<u32> {
        if self.slots.contains(entity) {
            return Err(BatchError::DuplicateEntity(entity));
        }

        let slot = self.active_count();
        if self.attributes.ensure_capacity(slot + 1)? {
            self.dirty |= BatchDirty::REALLOCATED;
        }

        let material = self.bind_textures(material, textures)?;
        let inserted = self.slots.insert(entity)?;
        debug_assert_eq!(inserted, slot);

        self.attributes
            .write(slot, transform, BoundingVolumeData::from(self.bounding_volume), material)?;
        self.dirty |= BatchDirty::TRANSFORMS | BatchDirty::BOUNDING_VOLUMES | BatchDirty::MATERIALS;

        log::debug!("Added entity {} to batch {:?} at slot {}", entity, self.mesh_id, slot);
        Ok(slot)
    }

    /// Remove an instance, moving the last instance into its slot
    ///
    /// Capacity is never reduced. The returned removal names the entity whose
    /// slot changed, if any.
    pub fn remove_entity(&mut self, entity: EntityId) -> BatchResult<SlotRemoval> {
        let removal = self.slots.remove(entity)?;
        debug_assert!(removal.slot < self.attributes.capacity());

        let vacated = match removal.moved {
            Some(moved) => {
                self.attributes.copy_slot(moved.from, moved.to)?;
                moved.from
            }
            None => removal.slot,
        };
        self.attributes.clear_slot(vacated)?;
        self.dirty |= BatchDirty::TRANSFORMS | BatchDirty::BOUNDING_VOLUMES | BatchDirty::MATERIALS;

        log::debug!(
            "Removed entity {} from batch {:?} (slot {}, moved {:?})",
            entity,
            self.mesh_id,
            removal.slot,
            removal.moved.map(|m| m.entity)
        );
        Ok(removal)
    }

    /// Replace the model matrix of an instance
    pub fn update_transform(&mut self, entity: EntityId, transform: InstanceTransform) -> BatchResult<()> {
        let slot = self.slot_of(entity)?;
        self.attributes.write_transform(slot, transform)?;
        self.dirty |= BatchDirty::TRANSFORMS;
        Ok(())
    }

    /// Replace the material of an instance, resolving its textures
    pub fn update_material(
        &mut self,
        entity: EntityId,
        material: MaterialData,
        textures: &MaterialTextures,
    ) -> BatchResult<()> {
        let slot = self.slot_of(entity)?;
        let material = self.bind_textures(material, textures)?;
        self.attributes.write_material(slot, material)?;
        self.dirty |= BatchDirty::MATERIALS;
        Ok(())
    }

    /// Copy an image into the `kind` array, assigning a layer if needed
    pub fn upload_texture(&mut self, kind: TextureKind, image: &TextureImage) -> BatchResult<u32> {
        let layer = self.texture_arrays[kind.index()].upload(image)?;
        self.dirty |= BatchDirty::TEXTURES;
        Ok(layer)
    }

    /// Upload every texture of `textures` that `source` can provide
    ///
    /// Returns how many images were copied. Missing images are skipped; their
    /// layers can still be assigned and filled later.
    pub fn upload_textures(
        &mut self,
        textures: &MaterialTextures,
        source: &dyn TextureSource,
    ) -> BatchResult<usize> {
        let mut uploaded = 0;
        for (kind, id) in textures.iter() {
            match source.texture(id) {
                Some(image) => {
                    self.upload_texture(kind, image)?;
                    uploaded += 1;
                }
                None => log::warn!("Texture {:?} not available for batch {:?}", id, self.mesh_id),
            }
        }
        Ok(uploaded)
    }

    /// Slot currently held by `entity`
    pub fn lookup(&self, entity: EntityId) -> Option<u32> {
        self.slots.lookup(entity)
    }

    /// Check if `entity` is resident
    pub fn contains(&self, entity: EntityId) -> bool {
        self.slots.contains(entity)
    }

    /// Attributes of a resident entity
    pub fn read(&self, entity: EntityId) -> BatchResult<InstanceAttributes> {
        let slot = self.slot_of(entity)?;
        self.attributes.read(slot)
    }

    /// Attributes stored in `slot`
    pub fn read_slot(&self, slot: u32) -> BatchResult<InstanceAttributes> {
        self.attributes.read(slot)
    }

    /// Mesh drawn by this batch
    pub fn mesh_id(&self) -> MeshId {
        self.mesh_id
    }

    /// Mesh-level bound, in mesh space
    ///
    /// The pipeline transforms this per instance; the batch never does.
    pub fn bounding_volume(&self) -> BoundingSphere {
        self.bounding_volume
    }

    /// Number of resident entities
    pub fn active_count(&self) -> u32 {
        self.slots.len() as u32
    }

    /// Check if no entity is resident
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Reserved attribute slots
    pub fn capacity(&self) -> u32 {
        self.attributes.capacity()
    }

    /// Diffuse layers in use
    pub fn texture_count(&self) -> u32 {
        self.texture_array(TextureKind::Diffuse).count()
    }

    /// Diffuse layers reserved
    pub fn texture_capacity(&self) -> u32 {
        self.texture_array(TextureKind::Diffuse).capacity()
    }

    /// Layer of `texture` in the `kind` array
    pub fn texture_layer(&self, kind: TextureKind, texture: TextureId) -> Option<u32> {
        self.texture_array(kind).layer_of(texture)
    }

    /// Texture array for `kind`
    pub fn texture_array(&self, kind: TextureKind) -> &TextureLayerAllocator {
        &self.texture_arrays[kind.index()]
    }

    /// Resident entities in slot order
    pub fn entities(&self) -> &[EntityId] {
        self.slots.entities()
    }

    /// Live transforms, `[0, active_count)`
    pub fn transforms(&self) -> &[InstanceTransform] {
        &self.attributes.transforms()[..self.slots.len()]
    }

    /// Live per-instance bounding volumes, `[0, active_count)`
    pub fn bounding_volumes(&self) -> &[BoundingVolumeData] {
        &self.attributes.bounding_volumes()[..self.slots.len()]
    }

    /// Live materials, `[0, active_count)`
    pub fn materials(&self) -> &[MaterialData] {
        &self.attributes.materials()[..self.slots.len()]
    }

    /// Live transforms as raw bytes for upload
    pub fn transform_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(self.transforms())
    }

    /// Live bounding volumes as raw bytes for upload
    pub fn bounding_volume_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(self.bounding_volumes())
    }

    /// Live materials as raw bytes for upload
    pub fn material_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(self.materials())
    }

    /// Storage touched since the last [`Self::take_dirty`]
    pub fn dirty(&self) -> BatchDirty {
        self.dirty
    }

    /// Return and reset the dirty set
    pub fn take_dirty(&mut self) -> BatchDirty {
        std::mem::take(&mut self.dirty)
    }

    /// Occupancy snapshot
    pub fn stats(&self) -> BatchStats {
        BatchStats {
            active_count: self.active_count(),
            capacity: self.capacity(),
            texture_count: self.texture_count(),
            texture_capacity: self.texture_capacity(),
            reallocations: self.attributes.reallocations(),
            byte_size: self.attributes.byte_size()
                + self.texture_arrays.iter().map(TextureLayerAllocator::byte_size).sum::<usize>(),
        }
    }

    /// Tear the batch down, freeing every attribute array and texture arena
    ///
    /// Returns the final occupancy. Releasing a batch that still holds
    /// entities is allowed but logged, since their ids become dangling.
    pub fn release(self) -> BatchStats {
        let stats = self.stats();
        if stats.active_count > 0 {
            log::warn!(
                "Releasing batch for mesh {:?} with {} resident entities",
                self.mesh_id,
                stats.active_count
            );
        }
        stats
    }

    fn slot_of(&self, entity: EntityId) -> BatchResult<u32> {
        self.slots.lookup(entity).ok_or(BatchError::UnknownEntity(entity))
    }

    fn bind_textures(&mut self, mut material: MaterialData, textures: &MaterialTextures) -> BatchResult<MaterialData> {
        for (kind, id) in textures.iter() {
            let array = &mut self.texture_arrays[kind.index()];
            let known = array.layer_of(id).is_some();
            let layer = array.resolve_or_create(id)?;
            if !known {
                self.dirty |= BatchDirty::TEXTURES;
            }
            if kind == TextureKind::Diffuse {
                material.diffuse_layer_idx = layer;
            }
        }
        Ok(material)
    }
}

impl Drop for GraphicsBatch {
    fn drop(&mut self) {
        log::debug!(
            "Dropping batch for mesh {:?}: {} slots, {} bytes freed",
            self.mesh_id,
            self.attributes.capacity(),
            self.stats().byte_size
        );
    }
}
