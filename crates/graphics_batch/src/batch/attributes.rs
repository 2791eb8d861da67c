//! Per-instance attribute storage
//!
//! Three parallel arrays (transform, bounding volume, material) indexed by
//! slot. All element types are `#[repr(C)]` plain-old-data so the live range
//! can be handed to a GPU upload as raw bytes.
//!
//! Growth is need-exact: batch insertions know how many slots they need, so
//! the arrays are reallocated to exactly that size. The three new arrays are
//! all allocated before any of them replaces the old ones, so a failed
//! allocation leaves the store untouched.

use bytemuck::{Pod, Zeroable};

use crate::error::{BatchError, BatchResult};
use crate::foundation::math::{mat4_from_cols, mat4_to_cols, vec3_to_array, Mat4, Vec2, Vec3, Vec4};
use crate::geometry::BoundingSphere;

/// Model matrix of one instance, column-major
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct InstanceTransform {
    /// Model transformation matrix (4×4 column-major)
    pub model: [[f32; 4]; 4],
}

impl InstanceTransform {
    /// Identity transform
    pub const IDENTITY: Self = Self {
        model: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ],
    };

    /// Build from a math matrix
    pub fn from_matrix(matrix: &Mat4) -> Self {
        Self { model: mat4_to_cols(matrix) }
    }

    /// Convert back to a math matrix
    pub fn to_matrix(&self) -> Mat4 {
        mat4_from_cols(&self.model)
    }

    /// Translation component
    pub fn translation(&self) -> Vec3 {
        let [x, y, z, _] = self.model[3];
        Vec3::new(x, y, z)
    }
}

impl Default for InstanceTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl From<Mat4> for InstanceTransform {
    fn from(matrix: Mat4) -> Self {
        Self::from_matrix(&matrix)
    }
}

/// Sphere as stored in the bounding volume array
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct BoundingVolumeData {
    /// Sphere center
    pub center: [f32; 3],
    /// Sphere radius
    pub radius: f32,
}

impl From<BoundingSphere> for BoundingVolumeData {
    fn from(sphere: BoundingSphere) -> Self {
        Self { center: vec3_to_array(&sphere.center), radius: sphere.radius }
    }
}

impl From<BoundingVolumeData> for BoundingSphere {
    fn from(data: BoundingVolumeData) -> Self {
        Self::new(Vec3::from(data.center), data.radius)
    }
}

/// Shading model selected per instance by the material record
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ShadingModel {
    /// Flat diffuse color or texture, no lighting
    #[default]
    Unlit = 0,
    /// Physically based shading driven by texture maps
    PhysicallyBased = 1,
    /// Physically based shading driven by the scalar parameters only
    PhysicallyBasedScalars = 2,
}

impl TryFrom<u32> for ShadingModel {
    type Error = u32;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Unlit),
            1 => Ok(Self::PhysicallyBased),
            2 => Ok(Self::PhysicallyBasedScalars),
            other => Err(other),
        }
    }
}

/// Material record, mirrored by the shader-side struct
///
/// 48 bytes with no implicit padding; every vector member starts on a
/// 16-byte boundary except `pbr_scalars`, which packs behind the two words.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct MaterialData {
    /// Layer of the diffuse texture in the batch's diffuse array
    pub diffuse_layer_idx: u32,
    /// [`ShadingModel`] discriminant
    pub shading_model: u32,
    /// (roughness, metallic)
    pub pbr_scalars: [f32; 2],
    /// Emissive color used when no emissive map is bound (rgb, padding)
    pub emissive_scalars: [f32; 4],
    /// Diffuse color used when no diffuse map is bound (rgb, padding)
    pub diffuse_scalars: [f32; 4],
}

impl MaterialData {
    /// Unlit material with a flat diffuse color
    pub fn unlit(diffuse: Vec4) -> Self {
        Self {
            shading_model: ShadingModel::Unlit as u32,
            diffuse_scalars: diffuse.into(),
            ..Self::default()
        }
    }

    /// Scalar-driven PBR material
    pub fn pbr_scalars(diffuse: Vec4, roughness: f32, metallic: f32) -> Self {
        Self {
            shading_model: ShadingModel::PhysicallyBasedScalars as u32,
            pbr_scalars: [roughness, metallic],
            diffuse_scalars: diffuse.into(),
            ..Self::default()
        }
    }

    /// Set the emissive color
    #[must_use]
    pub fn with_emissive(mut self, emissive: Vec4) -> Self {
        self.emissive_scalars = emissive.into();
        self
    }

    /// Select a shading model
    #[must_use]
    pub fn with_shading_model(mut self, model: ShadingModel) -> Self {
        self.shading_model = model as u32;
        self
    }

    /// Typed shading model, `None` if the stored discriminant is unknown
    pub fn shading_model(&self) -> Option<ShadingModel> {
        ShadingModel::try_from(self.shading_model).ok()
    }

    /// (roughness, metallic) as a vector
    pub fn pbr(&self) -> Vec2 {
        Vec2::from(self.pbr_scalars)
    }
}

/// Attributes of one slot, read back as a unit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InstanceAttributes {
    /// Model matrix
    pub transform: InstanceTransform,
    /// Per-instance bounding volume
    pub bounding_volume: BoundingVolumeData,
    /// Material record
    pub material: MaterialData,
}

/// Parallel, slot-indexed attribute arrays with need-exact growth
#[derive(Debug, Default)]
pub struct AttributeStore {
    transforms: Vec<InstanceTransform>,
    bounding_volumes: Vec<BoundingVolumeData>,
    materials: Vec<MaterialData>,
    reallocations: u32,
}

impl AttributeStore {
    /// Create a store with `capacity` reserved slots
    pub fn with_capacity(capacity: u32) -> BatchResult<Self> {
        let mut store = Self::default();
        store.ensure_capacity(capacity)?;
        store.reallocations = 0;
        Ok(store)
    }

    /// Number of slots every array can hold
    pub fn capacity(&self) -> u32 {
        self.transforms.len() as u32
    }

    /// Number of times the arrays were reallocated after construction
    pub fn reallocations(&self) -> u32 {
        self.reallocations
    }

    /// Grow every array to exactly `required` slots if they are smaller
    ///
    /// Existing slots keep their data; new slots are zeroed. Returns `true`
    /// if a reallocation happened.
    pub fn ensure_capacity(&mut self, required: u32) -> BatchResult<bool> {
        let capacity = self.capacity();
        if required <= capacity {
            return Ok(false);
        }

        let transforms = grow_exact(&self.transforms, required, "transform buffer")?;
        let bounding_volumes = grow_exact(&self.bounding_volumes, required, "bounding volume buffer")?;
        let materials = grow_exact(&self.materials, required, "material buffer")?;

        log::info!("Growing attribute buffers: {} -> {}", capacity, required);

        self.transforms = transforms;
        self.bounding_volumes = bounding_volumes;
        self.materials = materials;
        self.reallocations += 1;
        Ok(true)
    }

    /// Write all attributes of `slot`
    pub fn write(
        &mut self,
        slot: u32,
        transform: InstanceTransform,
        bounding_volume: BoundingVolumeData,
        material: MaterialData,
    ) -> BatchResult<()> {
        let index = self.check_slot(slot)?;
        self.transforms[index] = transform;
        self.bounding_volumes[index] = bounding_volume;
        self.materials[index] = material;
        Ok(())
    }

    /// Read all attributes of `slot`
    pub fn read(&self, slot: u32) -> BatchResult<InstanceAttributes> {
        let index = self.check_slot(slot)?;
        Ok(InstanceAttributes {
            transform: self.transforms[index],
            bounding_volume: self.bounding_volumes[index],
            material: self.materials[index],
        })
    }

    /// Overwrite the transform of `slot`
    pub fn write_transform(&mut self, slot: u32, transform: InstanceTransform) -> BatchResult<()> {
        let index = self.check_slot(slot)?;
        self.transforms[index] = transform;
        Ok(())
    }

    /// Overwrite the bounding volume of `slot`
    pub fn write_bounding_volume(&mut self, slot: u32, bounding_volume: BoundingVolumeData) -> BatchResult<()> {
        let index = self.check_slot(slot)?;
        self.bounding_volumes[index] = bounding_volume;
        Ok(())
    }

    /// Overwrite the material of `slot`
    pub fn write_material(&mut self, slot: u32, material: MaterialData) -> BatchResult<()> {
        let index = self.check_slot(slot)?;
        self.materials[index] = material;
        Ok(())
    }

    /// Copy every attribute from slot `from` into slot `to`
    pub fn copy_slot(&mut self, from: u32, to: u32) -> BatchResult<()> {
        let attributes = self.read(from)?;
        self.write(to, attributes.transform, attributes.bounding_volume, attributes.material)
    }

    /// Zero every attribute of `slot`
    pub fn clear_slot(&mut self, slot: u32) -> BatchResult<()> {
        self.write(slot, InstanceTransform::zeroed(), BoundingVolumeData::zeroed(), MaterialData::zeroed())
    }

    /// Transform array, full capacity
    pub fn transforms(&self) -> &[InstanceTransform] {
        &self.transforms
    }

    /// Bounding volume array, full capacity
    pub fn bounding_volumes(&self) -> &[BoundingVolumeData] {
        &self.bounding_volumes
    }

    /// Material array, full capacity
    pub fn materials(&self) -> &[MaterialData] {
        &self.materials
    }

    /// Bytes held by the three arrays
    pub fn byte_size(&self) -> usize {
        self.transforms.len() * std::mem::size_of::<InstanceTransform>()
            + self.bounding_volumes.len() * std::mem::size_of::<BoundingVolumeData>()
            + self.materials.len() * std::mem::size_of::<MaterialData>()
    }

    fn check_slot(&self, slot: u32) -> BatchResult<usize> {
        let capacity = self.capacity();
        if slot >= capacity {
            return Err(BatchError::SlotOutOfRange { slot, capacity });
        }
        Ok(slot as usize)
    }
}

/// Allocate exactly `required` elements, copy `old` in front, zero the rest
fn grow_exact<T: Pod>(old: &[T], required: u32, what: &'static str) -> BatchResult<Vec<T>> {
    let requested = required as usize;
    let mut grown = Vec::new();
    grown
        .try_reserve_exact(requested)
        .map_err(|source| BatchError::AllocationFailure { what, requested, source })?;
    grown.extend_from_slice(old);
    grown.resize(requested, T::zeroed());
    Ok(grown)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn translated(x: f32) -> InstanceTransform {
        InstanceTransform::from(Mat4::new_translation(&Vec3::new(x, 0.0, 0.0)))
    }

    #[test]
    fn test_pod_layouts() {
        assert_eq!(std::mem::size_of::<InstanceTransform>(), 64);
        assert_eq!(std::mem::size_of::<BoundingVolumeData>(), 16);
        assert_eq!(std::mem::size_of::<MaterialData>(), 48);
    }

    #[test]
    fn test_initial_capacity_is_exact() {
        let store = AttributeStore::with_capacity(5).unwrap();
        assert_eq!(store.capacity(), 5);
        assert_eq!(store.transforms().len(), 5);
        assert_eq!(store.bounding_volumes().len(), 5);
        assert_eq!(store.materials().len(), 5);
        assert_eq!(store.reallocations(), 0);
    }

    #[test]
    fn test_ensure_capacity_is_need_exact_and_never_shrinks() {
        let mut store = AttributeStore::with_capacity(2).unwrap();
        assert!(!store.ensure_capacity(1).unwrap());
        assert_eq!(store.capacity(), 2);

        assert!(store.ensure_capacity(7).unwrap());
        assert_eq!(store.capacity(), 7);
        assert_eq!(store.materials().len(), 7);
        assert_eq!(store.reallocations(), 1);
    }

    #[test]
    fn test_growth_preserves_existing_slots() {
        let mut store = AttributeStore::with_capacity(2).unwrap();
        let material = MaterialData::unlit(Vec4::new(1.0, 0.0, 0.0, 1.0));
        let bounds = BoundingVolumeData { center: [1.0, 2.0, 3.0], radius: 4.0 };
        store.write(1, translated(3.0), bounds, material).unwrap();

        store.ensure_capacity(10).unwrap();

        let read = store.read(1).unwrap();
        assert_eq!(read.transform, translated(3.0));
        assert_eq!(read.bounding_volume, bounds);
        assert_eq!(read.material, material);
        // Newly reserved slots are zeroed
        assert_eq!(store.read(9).unwrap().material, MaterialData::zeroed());
    }

    #[test]
    fn test_out_of_range_slots_are_rejected() {
        let mut store = AttributeStore::with_capacity(3).unwrap();
        let err = store.write_transform(3, InstanceTransform::IDENTITY).unwrap_err();
        assert!(matches!(err, BatchError::SlotOutOfRange { slot: 3, capacity: 3 }));
        assert!(store.read(42).is_err());
    }

    #[test]
    fn test_copy_slot() {
        let mut store = AttributeStore::with_capacity(3).unwrap();
        store.write(2, translated(5.0), BoundingVolumeData::default(), MaterialData::default()).unwrap();
        store.copy_slot(2, 0).unwrap();
        assert_eq!(store.read(0).unwrap().transform.translation(), Vec3::new(5.0, 0.0, 0.0));
    }

    #[test]
    fn test_shading_model_round_trip() {
        let material = MaterialData::pbr_scalars(Vec4::new(1.0, 1.0, 1.0, 1.0), 0.4, 0.9);
        assert_eq!(material.shading_model(), Some(ShadingModel::PhysicallyBasedScalars));
        assert_eq!(material.pbr(), Vec2::new(0.4, 0.9));

        let corrupt = MaterialData { shading_model: 99, ..MaterialData::default() };
        assert_eq!(corrupt.shading_model(), None);
    }

    #[test]
    fn test_bounding_volume_conversion() {
        let sphere = BoundingSphere::new(Vec3::new(1.0, -2.0, 0.5), 3.0);
        let data = BoundingVolumeData::from(sphere);
        assert_eq!(data.center, [1.0, -2.0, 0.5]);
        assert_eq!(BoundingSphere::from(data), sphere);
    }
}
