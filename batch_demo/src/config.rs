//! Demo settings

use graphics_batch::config::{BatchConfig, Config, ConfigError};
use serde::{Deserialize, Serialize};

/// Settings for a streaming run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DemoConfig {
    /// Settings applied to every batch
    pub batch: BatchConfig,
    /// Distinct meshes, one batch each
    pub mesh_count: u32,
    /// Largest entity id the stream draws from
    pub entity_pool: u32,
    /// Distinct diffuse textures
    pub texture_count: u32,
    /// Simulated frames
    pub frames: u32,
    /// Spawn/despawn/update operations per frame
    pub operations_per_frame: u32,
    /// RNG seed, so runs are repeatable
    pub seed: u64,
    /// Default `env_logger` filter when `RUST_LOG` is unset
    pub log_filter: String,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            batch: BatchConfig::default(),
            mesh_count: 3,
            entity_pool: 256,
            texture_count: 24,
            frames: 120,
            operations_per_frame: 16,
            seed: 7,
            log_filter: "info".to_string(),
        }
    }
}

impl Config for DemoConfig {}

impl DemoConfig {
    /// Check that the run can make progress
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.batch.validate()?;
        if self.mesh_count == 0 || self.entity_pool == 0 || self.texture_count == 0 {
            return Err(ConfigError::Invalid(
                "mesh_count, entity_pool and texture_count must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}
