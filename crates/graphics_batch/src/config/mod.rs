//! Configuration system
//!
//! Batch tuning knobs plus the file loading shared with applications.

pub use serde::{Serialize, Deserialize};

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;

        if path.ends_with(".toml") {
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else if path.ends_with(".ron") {
            ron::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else {
            Err(ConfigError::UnsupportedFormat(path.to_string()))
        }
    }

    /// Save configuration to file
    fn save_to_file(&self, path: &str) -> Result<(), ConfigError> {
        let contents = if path.ends_with(".toml") {
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else if path.ends_with(".ron") {
            ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else {
            return Err(ConfigError::UnsupportedFormat(path.to_string()));
        };

        std::fs::write(path, contents).map_err(ConfigError::Io)
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Values parsed but are not usable
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Sizing policy for new batches
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BatchConfig {
    /// Attribute slots reserved when a batch is created
    pub initial_entity_capacity: u32,
    /// Layers reserved in each texture array when a batch is created
    pub initial_texture_capacity: u32,
    /// Multiplier applied to texture capacity whenever an array is full
    pub texture_growth_factor: f32,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            initial_entity_capacity: 5,
            initial_texture_capacity: 5,
            texture_growth_factor: 1.5,
        }
    }
}

impl BatchConfig {
    /// Reject values that would stall or shrink growth
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.texture_growth_factor.is_finite() || self.texture_growth_factor <= 1.0 {
            return Err(ConfigError::Invalid(format!(
                "texture_growth_factor must be a finite value above 1.0, got {}",
                self.texture_growth_factor
            )));
        }
        if self.initial_texture_capacity == 0 {
            return Err(ConfigError::Invalid(
                "initial_texture_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Config for BatchConfig {}
