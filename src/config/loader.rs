//! Configuration Loader
//!
//! Loads [`MediatorConfig`] from a file (format chosen by extension) and overlays
//! the `MEDIATOR_` environment variables using the `config` crate.

use super::error::{ConfigResult, ConfigurationError};
use super::MediatorConfig;
use config::{Config, Environment, File};
use std::path::Path;
use tracing::debug;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from `path` with the environment overlay applied
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<MediatorConfig> {
        Self::load_with_env_prefix(path, "MEDIATOR")
    }

    /// Load configuration from `path`, overlaying variables that start with `prefix_`.
    ///
    /// Useful in tests to avoid picking up the process environment.
    pub fn load_with_env_prefix(
        path: impl AsRef<Path>,
        prefix: &str,
    ) -> ConfigResult<MediatorConfig> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ConfigurationError::config_file_not_found(path));
        }

        let settings = Config::builder()
            .add_source(File::from(path))
            .add_source(Environment::with_prefix(prefix).try_parsing(false))
            .build()
            .map_err(|e| ConfigurationError::parse_error(path.display().to_string(), e))?;

        let config: MediatorConfig = settings
            .try_deserialize()
            .map_err(|e| ConfigurationError::parse_error(path.display().to_string(), e))?;

        debug!(
            file = %path.display(),
            default_strategy = %config.default_strategy,
            exception_action_strategy = %config.exception_action_strategy,
            "Mediator configuration loaded"
        );
        Ok(config)
    }
}
