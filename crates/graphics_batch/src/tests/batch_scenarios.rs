//! End-to-end batch scenarios
//!
//! Drives `GraphicsBatch` the way a scene would: entities streaming in and
//! out while the attribute arrays must stay consistent with the slot table.

use std::collections::HashMap;

use crate::batch::{EntityId, GraphicsBatch, InstanceTransform, MaterialData, MaterialTextures};
use crate::config::BatchConfig;
use crate::foundation::logging;
use crate::foundation::math::{Mat4, Vec3, Vec4};
use crate::geometry::{Mesh, MeshLibrary};
use approx::assert_relative_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: u32) -> EntityId {
        EntityId::new(raw).expect("test ids are non-zero")
    }

    fn cube_batch(config: &BatchConfig) -> GraphicsBatch {
        let mut meshes = MeshLibrary::new();
        let cube = meshes.insert(Mesh::unit_cube());
        GraphicsBatch::new(cube, &meshes, config).expect("cube batch")
    }

    /// Transform and material unique to `raw`, so slots can be traced back
    fn signature(raw: u32) -> (InstanceTransform, MaterialData) {
        let x = raw as f32;
        let transform = InstanceTransform::from(Mat4::new_translation(&Vec3::new(x, -x, 0.5 * x)));
        let material = MaterialData::pbr_scalars(Vec4::new(x, 0.0, 0.0, 1.0), 0.25, 0.75);
        (transform, material)
    }

    fn add(batch: &mut GraphicsBatch, raw: u32) -> u32 {
        let (transform, material) = signature(raw);
        batch
            .add_entity(id(raw), transform, material, &MaterialTextures::none())
            .expect("add")
    }

    fn assert_consistent(batch: &GraphicsBatch, expected: &HashMap<u32, ()>) {
        assert_eq!(batch.active_count() as usize, expected.len());
        assert!(batch.active_count() <= batch.capacity());

        let mut seen = vec![false; expected.len()];
        for &raw in expected.keys() {
            let slot = batch.lookup(id(raw)).expect("resident entity has a slot");
            assert!(!seen[slot as usize], "slot {} assigned twice", slot);
            seen[slot as usize] = true;
            assert_eq!(batch.entities()[slot as usize], id(raw));

            let (transform, material) = signature(raw);
            assert_eq!(batch.transforms()[slot as usize], transform);
            assert_eq!(batch.materials()[slot as usize], material);
        }
        assert!(seen.into_iter().all(|s| s));
    }

    #[test]
    fn test_cube_batch_add_remove() {
        let mut batch = cube_batch(&BatchConfig::default());
        let bound = batch.bounding_volume();
        assert_relative_eq!(bound.center.norm(), 0.0, epsilon = 1e-6);
        assert_relative_eq!(bound.radius, 0.866_025_4, epsilon = 1e-5);

        assert_eq!(add(&mut batch, 1), 0);
        assert_eq!(add(&mut batch, 2), 1);
        batch.remove_entity(id(1)).expect("remove");

        assert_eq!(batch.active_count(), 1);
        assert_eq!(batch.lookup(id(2)), Some(0));
        assert_eq!(batch.transforms()[0], signature(2).0);
    }

    #[test]
    fn test_growth_preserves_resident_attributes() {
        let config = BatchConfig { initial_entity_capacity: 5, ..Default::default() };
        let mut batch = cube_batch(&config);
        for raw in 1..=5 {
            add(&mut batch, raw);
        }
        assert_eq!(batch.capacity(), 5);

        add(&mut batch, 6);
        assert_eq!(batch.capacity(), 6);
        for raw in 1..=6 {
            let attributes = batch.read(id(raw)).expect("read");
            assert_eq!(attributes.transform, signature(raw).0);
            assert_eq!(attributes.material, signature(raw).1);
        }
    }

    #[test]
    fn test_swap_remove_middle_of_three() {
        let mut batch = cube_batch(&BatchConfig::default());
        for raw in [10, 20, 30] {
            add(&mut batch, raw);
        }

        let removal = batch.remove_entity(id(20)).expect("remove");
        assert_eq!(removal.slot, 1);
        assert_eq!(removal.moved.map(|m| (m.entity, m.from, m.to)), Some((id(30), 2, 1)));

        assert_eq!(batch.lookup(id(10)), Some(0));
        assert_eq!(batch.lookup(id(30)), Some(1));
        assert_eq!(batch.transforms(), &[signature(10).0, signature(30).0]);
        assert_eq!(batch.materials(), &[signature(10).1, signature(30).1]);
    }

    #[test]
    fn test_duplicate_add_is_rejected_without_side_effects() {
        let mut batch = cube_batch(&BatchConfig::default());
        add(&mut batch, 7);
        let before = batch.stats();

        let (transform, material) = signature(99);
        assert!(batch.add_entity(id(7), transform, material, &MaterialTextures::none()).is_err());
        assert_eq!(batch.stats(), before);
        assert_eq!(batch.transforms(), &[signature(7).0]);
    }

    #[test]
    fn test_random_streaming_keeps_slots_consistent() {
        logging::init_for_tests();
        let mut rng = StdRng::seed_from_u64(0x0BA7_C4ED);
        let config = BatchConfig { initial_entity_capacity: 1, ..Default::default() };
        let mut batch = cube_batch(&config);
        let mut resident: HashMap<u32, ()> = HashMap::new();
        let mut peak = 0;

        for _ in 0..1500 {
            let raw = rng.gen_range(1..=64);
            if resident.contains_key(&raw) {
                batch.remove_entity(id(raw)).expect("remove resident");
                resident.remove(&raw);
            } else {
                add(&mut batch, raw);
                resident.insert(raw, ());
            }
            peak = peak.max(resident.len() as u32);
            assert_consistent(&batch, &resident);
        }

        // Need-exact growth never overshoots the high-water mark
        assert_eq!(batch.capacity(), peak.max(1));
    }
}
