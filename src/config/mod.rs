//! # Mediator Configuration
//!
//! Runtime settings for the mediator: the default notification fan-out strategy and
//! where exception actions sit relative to exception recovery.
//!
//! ## Sources
//!
//! - [`MediatorConfig::default`] - sequential publishing, actions for unhandled failures
//! - [`MediatorConfig::from_env`] - `MEDIATOR_DEFAULT_STRATEGY`,
//!   `MEDIATOR_EXCEPTION_ACTION_STRATEGY`
//! - [`ConfigLoader::load`] - a configuration file with the `MEDIATOR_` environment
//!   overlay applied on top
//!
//! ## Usage
//!
//! ```rust,no_run
//! use mediator_core::config::ConfigLoader;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConfigLoader::load("config/mediator.yaml")?;
//! println!("publishing with {}", config.default_strategy);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use crate::notifications::PublishStrategy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigLoader;

/// Environment variable selecting the default fan-out strategy.
///
/// Named after the `default_strategy` field so the loader's `MEDIATOR_` overlay
/// and [`MediatorConfig::from_env`] read the same variable.
pub const DEFAULT_STRATEGY_ENV: &str = "MEDIATOR_DEFAULT_STRATEGY";

/// Environment variable selecting the exception action placement
pub const EXCEPTION_ACTION_STRATEGY_ENV: &str = "MEDIATOR_EXCEPTION_ACTION_STRATEGY";

/// Where exception actions run relative to exception recovery
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExceptionActionStrategy {
    /// Actions only see failures no recovery handler recovered from
    #[default]
    ApplyForUnhandled,
    /// Actions see every failure, recovered or not
    ApplyForAll,
}

impl ExceptionActionStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            ExceptionActionStrategy::ApplyForUnhandled => "apply_for_unhandled",
            ExceptionActionStrategy::ApplyForAll => "apply_for_all",
        }
    }
}

impl fmt::Display for ExceptionActionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExceptionActionStrategy {
    type Err = ConfigurationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "apply_for_unhandled" => Ok(ExceptionActionStrategy::ApplyForUnhandled),
            "apply_for_all" => Ok(ExceptionActionStrategy::ApplyForAll),
            _ => Err(ConfigurationError::invalid_value(
                "exception_action_strategy",
                value,
                "expected apply_for_unhandled or apply_for_all",
            )),
        }
    }
}

/// Mediator settings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediatorConfig {
    /// Fan-out strategy used by `Mediator::publish`
    pub default_strategy: PublishStrategy,
    /// Placement used by `HandlerRegistry::add_exception_behaviors`
    pub exception_action_strategy: ExceptionActionStrategy,
}

impl MediatorConfig {
    /// Defaults overridden by the `MEDIATOR_*` environment variables
    pub fn from_env() -> ConfigResult<Self> {
        let mut config = Self::default();
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load from a configuration file with the `MEDIATOR_` environment overlay
    pub fn load(path: impl AsRef<std::path::Path>) -> ConfigResult<Self> {
        ConfigLoader::load(path)
    }

    pub fn with_default_strategy(mut self, strategy: PublishStrategy) -> Self {
        self.default_strategy = strategy;
        self
    }

    pub fn with_exception_action_strategy(mut self, strategy: ExceptionActionStrategy) -> Self {
        self.exception_action_strategy = strategy;
        self
    }

    /// Apply overrides read through `lookup`, keyed by environment variable name
    pub fn apply_overrides<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(strategy) = lookup(DEFAULT_STRATEGY_ENV) {
            self.default_strategy = strategy
                .parse()
                .map_err(|e| ConfigurationError::environment_override_error(DEFAULT_STRATEGY_ENV, e))?;
        }

        if let Some(strategy) = lookup(EXCEPTION_ACTION_STRATEGY_ENV) {
            self.exception_action_strategy = strategy.parse().map_err(|e| {
                ConfigurationError::environment_override_error(EXCEPTION_ACTION_STRATEGY_ENV, e)
            })?;
        }

        Ok(())
    }
}
