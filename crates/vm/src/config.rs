//! Engine configuration.
//!
//! ```toml
//! [limits]
//! max_stack_size = 2048
//! max_invocation_stack_size = 1024
//!
//! [prices]
//! version = 2
//! default_price = 1
//!
//! [prices.overrides]
//! SHA256 = 10
//! ```

use crate::execution_engine::ExecutionEngineLimits;
use crate::price_table::PriceTable;
use thiserror::Error;

/// Errors raised while loading an [`EngineConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "serde-types")]
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Limits and gas prices an engine is built with.
#[derive(Debug, Clone, Default)]
#[cfg_attr(
    feature = "serde-types",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct EngineConfig {
    pub limits: ExecutionEngineLimits,
    pub prices: PriceTable,
}

impl EngineConfig {
    /// Checks the configuration for values no engine can run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let limits = &self.limits;
        if limits.max_stack_size == 0 || limits.max_invocation_stack_size == 0 {
            return Err(ConfigError::Invalid(
                "stack limits must be greater than zero".to_string(),
            ));
        }
        if limits.max_integer_size == 0 {
            return Err(ConfigError::Invalid(
                "max_integer_size must be greater than zero".to_string(),
            ));
        }
        self.prices
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    /// Parses and validates a TOML document.
    #[cfg(feature = "serde-types")]
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    #[cfg(feature = "serde-types")]
    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)?;
        log::debug!("loading engine config from {}", path.display());
        Self::from_toml_str(&source)
    }
}
