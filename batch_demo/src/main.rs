//! Batch streaming demo
//!
//! Streams entities in and out of per-mesh batches the way a scene would,
//! logging growth events and final occupancy.
//!
//! Usage: `batch_demo [config.toml | config.ron]`

mod config;

use std::collections::HashMap;

use graphics_batch::foundation::logging;
use graphics_batch::geometry::Vertex;
use graphics_batch::prelude::*;
use nalgebra::{Translation3, UnitQuaternion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::DemoConfig;

/// Errors that end a demo run
#[derive(Debug, thiserror::Error)]
enum DemoError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Batch error: {0}")]
    Batch(#[from] BatchError),
}

struct Scene {
    config: DemoConfig,
    meshes: MeshLibrary,
    mesh_ids: Vec<MeshId>,
    images: HashMap<TextureId, TextureImage>,
    registry: BatchRegistry,
    rng: StdRng,
}

impl Scene {
    fn new(config: DemoConfig) -> Self {
        let mut meshes = MeshLibrary::new();
        let mesh_ids = (1..=config.mesh_count)
            .map(|scale| meshes.insert(scaled_cube(scale as f32)))
            .collect();

        let format = TextureFormat::rgba8(4, 4);
        let images = (0..config.texture_count)
            .map(|raw| {
                let id = TextureId(raw);
                let shade = (raw * 255 / config.texture_count.max(1)) as u8;
                (id, TextureImage::solid(id, format, &[shade, shade, 255 - shade, 255]))
            })
            .collect();

        Self {
            registry: BatchRegistry::new(config.batch.clone()),
            rng: StdRng::seed_from_u64(config.seed),
            config,
            meshes,
            mesh_ids,
            images,
        }
    }

    fn run(&mut self) -> Result<(), DemoError> {
        for frame in 0..self.config.frames {
            for _ in 0..self.config.operations_per_frame {
                self.step()?;
            }

            for (mesh_id, batch) in self.registry.iter() {
                let dirty = batch.dirty();
                if dirty.contains(BatchDirty::REALLOCATED) {
                    log::debug!("Frame {}: batch {:?} needs new GPU buffers", frame, mesh_id);
                }
            }
            for mesh_id in &self.mesh_ids {
                if let Some(batch) = self.registry.batch_mut(*mesh_id) {
                    batch.take_dirty();
                }
            }
        }

        for (mesh_id, batch) in self.registry.iter() {
            let stats = batch.stats();
            log::info!(
                "Mesh {:?}: {}/{} slots, {}/{} diffuse layers, {} reallocations, {} bytes",
                mesh_id,
                stats.active_count,
                stats.capacity,
                stats.texture_count,
                stats.texture_capacity,
                stats.reallocations,
                stats.byte_size
            );
        }
        Ok(())
    }

    fn step(&mut self) -> Result<(), DemoError> {
        let Some(entity) = EntityId::new(self.rng.gen_range(1..=self.config.entity_pool)) else {
            return Ok(());
        };

        if self.registry.mesh_of(entity).is_none() {
            let mesh_id = self.mesh_ids[self.rng.gen_range(0..self.mesh_ids.len())];
            let texture = TextureId(self.rng.gen_range(0..self.config.texture_count));
            let textures = MaterialTextures::none().with_diffuse(texture);
            let material = MaterialData::pbr_scalars(
                Vec4::new(self.rng.gen(), self.rng.gen(), self.rng.gen(), 1.0),
                self.rng.gen_range(0.1..1.0),
                self.rng.gen_range(0.0..1.0),
            );
            let transform = self.random_transform();

            self.registry
                .add_entity(&self.meshes, mesh_id, entity, transform, material, &textures)?;
            if let Some(batch) = self.registry.batch_mut(mesh_id) {
                batch.upload_textures(&textures, &self.images)?;
            }
        } else if self.rng.gen_bool(0.5) {
            self.registry.remove_entity(entity)?;
        } else {
            let transform = self.random_transform();
            self.registry.update_transform(entity, transform)?;
        }
        Ok(())
    }

    fn random_transform(&mut self) -> InstanceTransform {
        let translation = Translation3::new(
            self.rng.gen_range(-50.0..50.0),
            self.rng.gen_range(-50.0..50.0),
            self.rng.gen_range(-50.0..50.0),
        );
        let rotation = UnitQuaternion::from_euler_angles(
            0.0,
            self.rng.gen_range(0.0..std::f32::consts::TAU),
            0.0,
        );
        InstanceTransform::from((translation * rotation).to_homogeneous())
    }
}

fn scaled_cube(scale: f32) -> Mesh {
    let cube = Mesh::unit_cube();
    let vertices = cube
        .vertices
        .iter()
        .map(|v| Vertex {
            position: v.position.map(|c| c * scale),
            ..*v
        })
        .collect();
    Mesh::new(vertices, cube.indices)
}

fn load_config() -> Result<DemoConfig, DemoError> {
    let config = match std::env::args().nth(1) {
        Some(path) => DemoConfig::load_from_file(&path)?,
        None => DemoConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    logging::init_with_filter(&config.log_filter);

    log::info!("Starting batch demo (seed {})", config.seed);
    let mut scene = Scene::new(config);
    scene.run()?;

    let totals = scene.registry.stats();
    log::info!(
        "Finished with {} entities in {} batches",
        totals.active_count,
        scene.registry.len()
    );
    scene.registry.clear();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_run_is_consistent() {
        let config = DemoConfig { frames: 20, ..Default::default() };
        let mut scene = Scene::new(config);
        scene.run().expect("demo run");

        let stats = scene.registry.stats();
        assert_eq!(stats.active_count as usize, scene.registry.entity_count());
        assert!(stats.active_count <= stats.capacity);
        assert!(scene.registry.len() <= 3);
    }

    #[test]
    fn test_scaled_cube_bound_scales() {
        let mut meshes = MeshLibrary::new();
        let mesh_id = meshes.insert(scaled_cube(2.0));
        let batch = GraphicsBatch::new(mesh_id, &meshes, &BatchConfig::default()).expect("batch");
        assert!((batch.bounding_volume().radius - 3.0_f32.sqrt()).abs() < 1e-5);
    }

    #[test]
    fn test_config_round_trip() {
        let path = std::env::temp_dir().join("batch_demo_config_test.ron");
        let path = path.to_string_lossy().to_string();
        let config = DemoConfig { seed: 99, ..Default::default() };
        config.save_to_file(&path).expect("save");
        assert_eq!(DemoConfig::load_from_file(&path).expect("load"), config);
        let _ = std::fs::remove_file(&path);
    }
}
