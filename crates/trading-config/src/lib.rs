//! Configuration management.

mod settings;

pub use settings::{AppConfig, AppSettings, LoggingConfig};

use config::{Config, Environment, File};
use std::path::Path;
use thiserror::Error;
use trading_core::error::GraphError;
use trading_indicators::IndicatorRegistry;

/// Configuration loading and validation errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid graph: {0}")]
    Graph(#[from] GraphError),
}

/// Load configuration from file and environment.
///
/// Environment variables prefixed with `TRADING__` override file values,
/// e.g. `TRADING__LOGGING__LEVEL=debug`.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let config = Config::builder()
        .add_source(File::from(path).required(true))
        .add_source(
            Environment::with_prefix("TRADING")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    Ok(config.try_deserialize()?)
}

/// Parse configuration from TOML text.
pub fn parse_config_str(text: &str) -> Result<AppConfig, ConfigError> {
    Ok(toml::from_str(text)?)
}

impl AppConfig {
    /// Check the graph section against the indicator registry.
    pub fn validate(&self, registry: &IndicatorRegistry) -> Result<(), ConfigError> {
        self.graph.validate(registry)?;
        Ok(())
    }
}
