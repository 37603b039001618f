//! Where experiment configuration lives on disk

use crate::ConfigError;
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

/// Experiment file name, checked into the experiment directory
pub const EXPERIMENT_FILE: &str = "bftlab.toml";

/// Per-machine overrides next to the experiment file, gitignored
pub const LOCAL_FILE: &str = "bftlab.local.toml";

/// Locates the TOML files that make up an experiment's configuration.
///
/// Precedence, lowest first: the user file under the XDG config directory
/// (`~/.config/bftlab/config.toml` on Linux), the experiment file, then the
/// local override file.
#[derive(Debug, Clone)]
pub struct Paths {
    user_config_dir: Option<PathBuf>,
}

impl Paths {
    /// Discovers the user config directory for this platform
    pub fn new() -> Self {
        Self {
            user_config_dir: ProjectDirs::from("dev", "bftlab", "bftlab")
                .map(|dirs| dirs.config_dir().to_path_buf()),
        }
    }

    pub fn user_config_file(&self) -> Result<PathBuf, ConfigError> {
        self.user_config_dir
            .as_ref()
            .map(|dir| dir.join("config.toml"))
            .ok_or(ConfigError::NoUserConfigDir)
    }

    pub fn experiment_file(experiment_dir: impl AsRef<Path>) -> PathBuf {
        experiment_dir.as_ref().join(EXPERIMENT_FILE)
    }

    pub fn local_file(experiment_dir: impl AsRef<Path>) -> PathBuf {
        experiment_dir.as_ref().join(LOCAL_FILE)
    }

    /// An experiment directory is one holding an experiment file.
    pub fn is_experiment_dir(experiment_dir: impl AsRef<Path>) -> bool {
        Self::experiment_file(experiment_dir).is_file()
    }

    /// Existing configuration files for `experiment_dir`, lowest precedence
    /// first. Missing files are left out.
    pub fn sources(&self, experiment_dir: impl AsRef<Path>, include_user: bool) -> Vec<PathBuf> {
        let experiment_dir = experiment_dir.as_ref();
        let user = include_user
            .then(|| self.user_config_file().ok())
            .flatten();

        user.into_iter()
            .chain([
                Self::experiment_file(experiment_dir),
                Self::local_file(experiment_dir),
            ])
            .filter(|path| path.is_file())
            .collect()
    }
}

impl Default for Paths {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_user_config_under_bftlab() {
        // Platform dependent; must not panic
        if let Ok(file) = Paths::new().user_config_file() {
            assert!(file.to_string_lossy().contains("bftlab"));
            assert!(file.ends_with("config.toml"));
        }

        let homeless = Paths {
            user_config_dir: None,
        };
        assert!(matches!(
            homeless.user_config_file(),
            Err(ConfigError::NoUserConfigDir)
        ));
    }

    #[test]
    fn test_sources_in_precedence_order() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let experiment_dir = temp_dir.path();
        let paths = Paths {
            user_config_dir: None,
        };

        assert!(!Paths::is_experiment_dir(experiment_dir));
        assert!(paths.sources(experiment_dir, true).is_empty());

        fs::write(experiment_dir.join(LOCAL_FILE), "[plugins]\nrole = \"passive\"\n")
            .expect("Failed to write local config");
        fs::write(experiment_dir.join(EXPERIMENT_FILE), "[plugins]\nrole = \"primary\"\n")
            .expect("Failed to write experiment config");

        assert!(Paths::is_experiment_dir(experiment_dir));
        assert_eq!(
            paths.sources(experiment_dir, true),
            vec![
                experiment_dir.join(EXPERIMENT_FILE),
                experiment_dir.join(LOCAL_FILE),
            ]
        );
    }
}
