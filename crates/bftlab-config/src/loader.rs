//! Layered loading of experiment configuration

use crate::{BftlabConfig, ConfigValue, Paths, Settings, keys};
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};

/// Merges every configuration source for one experiment into [`Settings`].
///
/// Precedence, highest first: `BFTLAB__*` environment variables, the local
/// file, the experiment file, the user file, then [`BftlabConfig`] defaults.
pub struct ConfigLoader {
    experiment_dir: PathBuf,
    env_prefix: String,
    env_vars: Option<config::Map<String, String>>,
    include_user_config: bool,
}

impl ConfigLoader {
    /// Loader for the current directory
    pub fn new() -> Self {
        Self {
            experiment_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            env_prefix: "BFTLAB".to_string(),
            env_vars: None,
            include_user_config: true,
        }
    }

    pub fn with_experiment_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.experiment_dir = dir.as_ref().to_path_buf();
        self
    }

    /// Set the environment variable prefix (default: "BFTLAB")
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Read environment overrides from `vars` instead of the process
    /// environment
    pub fn with_env_vars<K, V>(mut self, vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.env_vars = Some(
            vars.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        );
        self
    }

    /// Skip the user config file, for hermetic runs
    pub fn without_user_config(mut self) -> Self {
        self.include_user_config = false;
        self
    }

    /// Merges all sources and splits the result into protocol layers.
    pub fn load(self) -> Result<Settings> {
        let defaults = config::Config::try_from(&BftlabConfig::default())?;
        let mut builder = config::Config::builder().add_source(defaults);

        let sources = Paths::new().sources(&self.experiment_dir, self.include_user_config);
        for path in &sources {
            builder = builder.add_source(
                config::File::from(path.as_path())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // BFTLAB__GENERAL__LEARNING=true
        let environment = keys::LIST_KEYS.into_iter().fold(
            config::Environment::with_prefix(&self.env_prefix)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true)
                .list_separator(","),
            config::Environment::with_list_parse_key,
        );
        builder = builder.add_source(environment.source(self.env_vars.clone()));

        let tree: BTreeMap<String, ConfigValue> = builder
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        let settings = Settings::from_tree(tree).context("Failed to assemble protocol layers")?;

        tracing::debug!(
            experiment_dir = %self.experiment_dir.display(),
            sources = ?sources,
            protocols = ?settings.protocols(),
            "configuration loaded"
        );

        Ok(settings)
    }

    /// Load configuration or fall back to built-in defaults if not found
    pub fn load_or_default(self) -> Settings {
        match self.load() {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!(error = %e, "failed to load configuration, using defaults");
                default_settings()
            }
        }
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn default_settings() -> Settings {
    let defaults = BftlabConfig::default();
    Settings::new()
        .with(keys::GENERAL_LEARNING, defaults.general.learning)
        .with(keys::PLUGINS_ROLE, defaults.plugins.role)
        .with(keys::PLUGINS_MESSAGE, defaults.plugins.message)
        .with(keys::PLUGINS_PIPELINE, defaults.plugins.pipeline)
        .with(keys::PLUGINS_TRANSITION, defaults.plugins.transition)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ConfigAccessor;
    use std::fs;
    use tempfile::tempdir;

    fn loader(dir: &Path) -> ConfigLoader {
        ConfigLoader::new()
            .with_experiment_dir(dir)
            .with_env_prefix("BFTLAB_LOADER_TEST")
            .without_user_config()
    }

    #[test]
    fn test_load_defaults() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let settings = loader(temp_dir.path()).load().expect("Failed to load config");

        assert_eq!(settings.string(keys::PLUGINS_ROLE).as_deref(), Some("primary"));
        assert_eq!(settings.string(keys::PLUGINS_PIPELINE).as_deref(), Some("direct"));
        assert_eq!(settings.bool(keys::GENERAL_LEARNING), Some(false));
        assert_eq!(settings.string_list(keys::PROTOCOL_FAULT_OVERRIDE), None);
    }

    #[test]
    fn test_load_experiment_file() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let experiment_dir = temp_dir.path();

        let config_content = r#"
[general]
learning = true

[plugins]
role = "qc-primary"
message = ["checkpoint", "digest"]
pipeline = "qc-pipeline"

[switching]
debug-sequence = ["pbft", "zyzzyva", "cheapbft"]

[fault.slow-proposal]
affected-entities = [0, 3]

[protocols.zyzzyva.protocol]
fault-override = ["slow-proposal", "timeout"]
"#;
        fs::write(experiment_dir.join("bftlab.toml"), config_content)
            .expect("Failed to write config");

        let settings = loader(experiment_dir).load().expect("Failed to load config");

        assert_eq!(settings.bool(keys::GENERAL_LEARNING), Some(true));
        assert_eq!(settings.string(keys::PLUGINS_ROLE).as_deref(), Some("qc-primary"));
        assert_eq!(
            settings.string_list(keys::PLUGINS_MESSAGE),
            Some(vec!["checkpoint".to_string(), "digest".to_string()])
        );
        assert!(settings.list_contains(keys::SWITCHING_DEBUG_SEQUENCE, "cheapbft"));
        assert_eq!(
            settings.int_list("fault.slow-proposal.affected-entities"),
            Some(vec![0, 3])
        );

        settings.set_current_protocol("zyzzyva");
        assert!(settings.list_contains(keys::PROTOCOL_FAULT_OVERRIDE, "timeout"));
    }

    #[test]
    fn test_local_overrides() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let experiment_dir = temp_dir.path();

        fs::write(
            experiment_dir.join("bftlab.toml"),
            r#"
[plugins]
role = "primary"
"#,
        )
        .expect("Failed to write experiment config");

        fs::write(
            experiment_dir.join("bftlab.local.toml"),
            r#"
[plugins]
role = "passive"
"#,
        )
        .expect("Failed to write local config");

        let settings = loader(experiment_dir).load().expect("Failed to load config");

        // Local file wins over the experiment file
        assert_eq!(settings.string(keys::PLUGINS_ROLE).as_deref(), Some("passive"));
    }

    #[test]
    fn test_env_overrides_split_list_keys() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        fs::write(
            temp_dir.path().join("bftlab.toml"),
            r#"
[plugins]
message = ["mac"]
"#,
        )
        .expect("Failed to write config");

        let settings = loader(temp_dir.path())
            .with_env_vars([
                ("BFTLAB_LOADER_TEST__PLUGINS__MESSAGE", "checkpoint,digest"),
                ("BFTLAB_LOADER_TEST__PLUGINS__ROLE", "qc-primary"),
                ("BFTLAB_LOADER_TEST__GENERAL__LEARNING", "true"),
            ])
            .load()
            .expect("Failed to load config");

        assert_eq!(
            settings.string_list(keys::PLUGINS_MESSAGE),
            Some(vec!["checkpoint".to_string(), "digest".to_string()])
        );
        assert_eq!(settings.string(keys::PLUGINS_ROLE).as_deref(), Some("qc-primary"));
        assert_eq!(settings.bool(keys::GENERAL_LEARNING), Some(true));
    }

    #[test]
    fn test_load_or_default_on_malformed_file() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let experiment_dir = temp_dir.path();
        fs::write(experiment_dir.join("bftlab.toml"), "[plugins\nrole = ")
            .expect("Failed to write config");

        let settings = loader(experiment_dir).load_or_default();
        assert_eq!(settings.string(keys::PLUGINS_ROLE).as_deref(), Some("primary"));
        assert_eq!(settings.string_list(keys::PLUGINS_MESSAGE), Some(Vec::new()));
    }
}
