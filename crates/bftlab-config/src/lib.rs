//! Configuration management for bftlab simulations
//!
//! Provides hierarchical configuration loading from multiple sources:
//! 1. Environment variables (BFTLAB__* prefix, highest precedence)
//! 2. bftlab.local.toml (gitignored, local overrides)
//! 3. bftlab.toml (git-tracked, experiment config)
//! 4. ~/.config/bftlab/config.toml (user defaults)
//! 5. Built-in defaults (lowest precedence)
//!
//! The merged tree is exposed through the narrow [`ConfigAccessor`] trait.
//! Everything that reads configuration at runtime (plugin resolution, fault
//! policies) depends only on that trait, so tests can substitute an
//! in-memory [`Settings`] and the simulation driver can switch the active
//! protocol mid-run.
//!
//! # Protocol layers
//!
//! Files may carry per-protocol overrides under a top-level `protocols`
//! table. While a protocol is active, its layer shadows the base values:
//!
//! ```
//! use bftlab_config::{ConfigAccessor, Settings, keys};
//!
//! let settings = Settings::from_toml_str(r#"
//! [protocol]
//! fault-override = ["timeout"]
//!
//! [protocols.zyzzyva.protocol]
//! fault-override = ["in-dark"]
//! "#).unwrap();
//!
//! settings.set_current_protocol("zyzzyva");
//! assert_eq!(
//!     settings.string_list(keys::PROTOCOL_FAULT_OVERRIDE),
//!     Some(vec!["in-dark".to_string()])
//! );
//! ```

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

mod error;
pub mod keys;
mod loader;
mod paths;
mod settings;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use paths::{EXPERIMENT_FILE, LOCAL_FILE, Paths};
pub use settings::{ConfigValue, Settings};

/// Read access to configuration plus the active-protocol selector.
///
/// Reads are live: implementations must reflect the active protocol at the
/// time of each call. A key that is absent, or whose value has the wrong
/// type, reads as `None`.
pub trait ConfigAccessor: Send + Sync {
    fn string(&self, key: &str) -> Option<String>;

    fn bool(&self, key: &str) -> Option<bool>;

    fn string_list(&self, key: &str) -> Option<Vec<String>>;

    fn int_list(&self, key: &str) -> Option<Vec<i64>>;

    /// The protocol whose layer is currently active, if any.
    fn current_protocol(&self) -> Option<String>;

    /// Switches the active protocol. Subsequent reads observe its layer.
    fn set_current_protocol(&self, protocol: &str);

    /// Returns `true` if the boolean flag at `key` is set. Absent means `false`.
    fn flag(&self, key: &str) -> bool {
        self.bool(key).unwrap_or(false)
    }

    /// Returns `true` if the string list at `key` contains `item`.
    fn list_contains(&self, key: &str, item: &str) -> bool {
        self.string_list(key)
            .is_some_and(|list| list.iter().any(|entry| entry == item))
    }
}

impl<T: ConfigAccessor + ?Sized> ConfigAccessor for Arc<T> {
    fn string(&self, key: &str) -> Option<String> {
        (**self).string(key)
    }

    fn bool(&self, key: &str) -> Option<bool> {
        (**self).bool(key)
    }

    fn string_list(&self, key: &str) -> Option<Vec<String>> {
        (**self).string_list(key)
    }

    fn int_list(&self, key: &str) -> Option<Vec<i64>> {
        (**self).int_list(key)
    }

    fn current_protocol(&self) -> Option<String> {
        (**self).current_protocol()
    }

    fn set_current_protocol(&self, protocol: &str) {
        (**self).set_current_protocol(protocol);
    }
}

/// Built-in defaults, the lowest-precedence configuration source.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BftlabConfig {
    pub general: GeneralConfig,
    pub plugins: PluginsConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub learning: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginsConfig {
    pub role: String,
    pub message: Vec<String>,
    pub pipeline: String,
    pub transition: Vec<String>,
}

impl Default for PluginsConfig {
    fn default() -> Self {
        Self {
            role: "primary".to_string(),
            message: Vec::new(),
            pipeline: "direct".to_string(),
            transition: Vec::new(),
        }
    }
}

impl BftlabConfig {
    /// Load settings from default locations
    pub fn load() -> Result<Settings> {
        ConfigLoader::new().load()
    }

    /// Load settings from a specific experiment directory
    pub fn load_from_dir(experiment_dir: impl AsRef<Path>) -> Result<Settings> {
        ConfigLoader::new().with_experiment_dir(experiment_dir).load()
    }

    /// Defaults for adaptive learning runs
    pub fn learning() -> Self {
        Self {
            general: GeneralConfig { learning: true },
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BftlabConfig::default();
        assert!(!config.general.learning);
        assert_eq!(config.plugins.role, "primary");
        assert_eq!(config.plugins.pipeline, "direct");
        assert!(config.plugins.message.is_empty());
        assert!(config.plugins.transition.is_empty());
    }

    #[test]
    fn test_learning_config() {
        let config = BftlabConfig::learning();
        assert!(config.general.learning);
        assert_eq!(config.plugins.role, "primary");
    }

    #[test]
    fn test_accessor_helpers() {
        let settings = Settings::new()
            .with(keys::GENERAL_LEARNING, true)
            .with(keys::SWITCHING_DEBUG_SEQUENCE, vec!["pbft", "zyzzyva"]);

        assert!(settings.flag(keys::GENERAL_LEARNING));
        assert!(!settings.flag("general.missing"));
        assert!(settings.list_contains(keys::SWITCHING_DEBUG_SEQUENCE, "zyzzyva"));
        assert!(!settings.list_contains(keys::SWITCHING_DEBUG_SEQUENCE, "cheapbft"));
        assert!(!settings.list_contains("switching.missing", "pbft"));
    }

    #[test]
    fn test_arc_accessor_shares_protocol_selector() {
        let settings = Arc::new(Settings::new());
        let shared: Arc<dyn ConfigAccessor> = settings.clone();

        shared.set_current_protocol("hotstuff");
        assert_eq!(settings.current_protocol().as_deref(), Some("hotstuff"));
    }
}
