//! TOML Configuration File Support
//!
//! Loads the split catalog, legacy routes, and initial option values from
//! `~/.config/splitq/splitq.toml`.
//!
//! # Configuration Priority
//!
//! Configuration values are loaded with the following priority (highest first):
//! 1. CLI arguments (when applicable)
//! 2. Environment variables
//! 3. TOML configuration file
//! 4. Default values
//!
//! # Example Configuration
//!
//! ```toml
//! [broker]
//! queues = ["events.save_event_transaction", "post_process_transactions"]
//!
//! [queues.post_process_transactions]
//! total = 5
//! in_use = 3
//!
//! [tasks."sentry.tasks.store.save_event_transaction"]
//! default_queue = "events.save_event_transaction"
//! queues_config = { total = 5, in_use = 2 }
//!
//! [legacy.post_process_errors]
//! strategy = "cycle"
//! destinations = ["post_process_errors_1", "post_process_errors_2"]
//!
//! [options]
//! rollout_policy = "stable_hash"
//! rollout = { post_process_transactions = 1.0 }
//! task_rollout = { "sentry.tasks.store.save_event_transaction" = 1.0 }
//! legacy_disabled = []
//! ```

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::routing::config::{CatalogError, SplitCatalog, SplitConfig, TaskSplitConfig};
use crate::routing::legacy::{LegacyError, LegacyRegistry, LegacyStrategy};
use crate::routing::options::{InMemoryOptions, RolloutScope};
use crate::routing::rollout::{RolloutGate, RolloutPolicy};
use crate::routing::router::RouterSet;
use crate::topology::KnownQueues;

/// Environment variable selecting the rollout policy
pub const ENV_ROLLOUT_POLICY: &str = "SPLITQ_ROLLOUT_POLICY";

/// Environment variable listing queues whose legacy routes are disabled
pub const ENV_LEGACY_DISABLED: &str = "SPLITQ_LEGACY_DISABLED";

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid split catalog
    #[error("Invalid split catalog: {0}")]
    Catalog(#[from] CatalogError),

    /// Invalid legacy route
    #[error("Invalid legacy route: {0}")]
    Legacy(#[from] LegacyError),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

// =============================================================================
// Configuration Source Tracking
// =============================================================================

/// Tracks where a configuration value came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Value from command-line argument
    Cli,
    /// Value from environment variable
    Env,
    /// Value from TOML configuration file
    File,
    /// Default value
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI"),
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// Broker section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerToml {
    /// Statically declared queues; when set, task default queues must be
    /// among them
    pub queues: Option<Vec<String>>,
}

/// Options section of the TOML configuration (initial dynamic values)
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OptionsToml {
    /// Policy for fractional rollouts
    pub rollout_policy: Option<RolloutPolicy>,

    /// Queue rollout fractions
    pub rollout: HashMap<String, f64>,

    /// Task rollout fractions
    pub task_rollout: HashMap<String, f64>,

    /// Queues whose legacy routes start disabled
    pub legacy_disabled: Vec<String>,
}

/// Root TOML configuration structure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitQueueToml {
    /// Broker declarations
    pub broker: BrokerToml,

    /// Logical queue -> split
    pub queues: HashMap<String, SplitConfig>,

    /// Task -> split
    pub tasks: HashMap<String, TaskSplitConfig>,

    /// Queue -> legacy route
    pub legacy: HashMap<String, LegacyStrategy>,

    /// Initial option values
    pub options: OptionsToml,
}

// =============================================================================
// Resolved Configuration
// =============================================================================

/// Fully validated configuration, ready to build routers from
#[derive(Clone, Debug)]
pub struct SplitQueueConfig {
    /// Split catalog
    pub catalog: Arc<SplitCatalog>,

    /// Legacy routes
    pub legacy: LegacyRegistry,

    /// Policy for fractional rollouts
    pub rollout_policy: RolloutPolicy,

    /// Initial queue rollout fractions
    pub rollout: HashMap<String, f64>,

    /// Initial task rollout fractions
    pub task_rollout: HashMap<String, f64>,

    /// Initial legacy disable list
    pub legacy_disabled: Vec<String>,

    /// Statically declared broker queues, if any were configured
    pub declared_queues: Option<Vec<String>>,

    /// Path of the loaded file, if any
    pub config_file_path: Option<PathBuf>,

    source: ConfigSource,
}

impl Default for SplitQueueConfig {
    fn default() -> Self {
        Self {
            catalog: Arc::new(SplitCatalog::default()),
            legacy: LegacyRegistry::new(),
            rollout_policy: RolloutPolicy::default(),
            rollout: HashMap::new(),
            task_rollout: HashMap::new(),
            legacy_disabled: Vec::new(),
            declared_queues: None,
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl SplitQueueConfig {
    /// Validate and resolve a parsed TOML document
    ///
    /// # Errors
    ///
    /// Returns an error for malformed splits, empty legacy cycles, or task
    /// default queues missing from `[broker] queues`.
    pub fn from_toml(toml: SplitQueueToml) -> Result<Self, ConfigError> {
        let catalog = SplitCatalog::new(toml.queues, toml.tasks)?;
        let legacy = LegacyRegistry::from_strategies(&toml.legacy)?;

        if let Some(declared) = &toml.broker.queues {
            let known = KnownQueues::with_split_topology(declared.iter().cloned(), &catalog);
            catalog.validate_destinations(&known)?;
        }

        for (scope, table) in [
            ("rollout", &toml.options.rollout),
            ("task_rollout", &toml.options.task_rollout),
        ] {
            if let Some((name, fraction)) = table.iter().find(|(_, f)| f.is_nan()) {
                return Err(ConfigError::ValidationError(format!(
                    "{scope} for {name} is not a number: {fraction}"
                )));
            }
        }

        Ok(Self {
            catalog: Arc::new(catalog),
            legacy,
            rollout_policy: toml.options.rollout_policy.unwrap_or_default(),
            rollout: toml.options.rollout,
            task_rollout: toml.options.task_rollout,
            legacy_disabled: toml.options.legacy_disabled,
            declared_queues: toml.broker.queues,
            config_file_path: None,
            source: ConfigSource::File,
        })
    }

    /// Where the configuration came from
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.source
    }

    /// Set the configuration source
    pub fn set_source(&mut self, source: ConfigSource) {
        self.source = source;
    }

    /// Option store seeded with the configured initial values
    #[must_use]
    pub fn build_options(&self) -> InMemoryOptions {
        let options = InMemoryOptions::new();
        options.replace_rollout(RolloutScope::Queue, self.rollout.clone());
        options.replace_rollout(RolloutScope::Task, self.task_rollout.clone());
        options.replace_legacy_disabled(self.legacy_disabled.iter().cloned());
        options
    }

    /// Queue and task routers over this configuration
    #[must_use]
    pub fn build_routers(&self) -> RouterSet {
        RouterSet::new(
            Arc::clone(&self.catalog),
            self.legacy.clone(),
            Arc::new(self.build_options()),
            RolloutGate::new(self.rollout_policy),
        )
    }
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Get the default configuration file path
///
/// Returns `$XDG_CONFIG_HOME/splitq/splitq.toml` or
/// `~/.config/splitq/splitq.toml` if `XDG_CONFIG_HOME` is not set.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("splitq").join("splitq.toml"))
}

/// Load configuration from all sources with proper priority
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be parsed or
/// validated. A missing config file is not an error (nothing is split).
pub fn load_config() -> Result<SplitQueueConfig, ConfigError> {
    load_config_from_path(default_config_path())
}

/// Load configuration from a specific path
///
/// # Arguments
///
/// * `path` - Optional path to the configuration file. If `None`, only defaults
///   and environment variables are used.
///
/// # Errors
///
/// Returns an error if the specified config file cannot be read, parsed, or
/// validated.
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<SplitQueueConfig, ConfigError> {
    let mut config = read_config_file(path)?;
    apply_env_config(&mut config, |key| std::env::var(key).ok())?;
    Ok(config)
}

/// Load and validate the TOML file only, without environment overrides
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read, parsed, or
/// validated.
pub fn read_config_file(path: Option<PathBuf>) -> Result<SplitQueueConfig, ConfigError> {
    let Some(config_path) = path else {
        return Ok(SplitQueueConfig::default());
    };

    if !config_path.exists() {
        tracing::debug!(
            path = %config_path.display(),
            "Config file not found, using defaults"
        );
        return Ok(SplitQueueConfig::default());
    }

    let toml_content =
        std::fs::read_to_string(&config_path).map_err(|e| ConfigError::ReadError {
            path: config_path.clone(),
            source: e,
        })?;

    let toml_config: SplitQueueToml = toml::from_str(&toml_content)?;
    let mut config = SplitQueueConfig::from_toml(toml_config)?;
    config.config_file_path = Some(config_path.clone());

    tracing::info!(
        path = %config_path.display(),
        legacy_routes = config.legacy.len(),
        "Loaded split queue configuration"
    );

    Ok(config)
}

/// Apply environment variable overrides using `lookup` to read variables
///
/// # Errors
///
/// Returns [`ConfigError::ValidationError`] for an unknown rollout policy.
pub fn apply_env_config<F>(config: &mut SplitQueueConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(policy) = lookup(ENV_ROLLOUT_POLICY) {
        config.rollout_policy = policy.parse().map_err(ConfigError::ValidationError)?;
        config.source = ConfigSource::Env;
    }

    if let Some(disabled) = lookup(ENV_LEGACY_DISABLED) {
        config.legacy_disabled = disabled
            .split(',')
            .map(str::trim)
            .filter(|queue| !queue.is_empty())
            .map(String::from)
            .collect();
        config.source = ConfigSource::Env;
    }

    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
