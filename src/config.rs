//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/kastle/kastle.toml`
//! 3. Local config: `<dir>/.kastle.toml`
//! 4. Environment variables: `KASTLE_*` prefix

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::ApplicationError;

/// Raw settings for intermediate parsing (fields are Option to detect "not specified").
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub data_dir: Option<PathBuf>,
    pub journal_file: Option<String>,
    pub sync_writes: Option<bool>,
    pub default_tree: Option<String>,
}

/// Unified configuration for kastle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Directory holding the journal (default: ~/.kastle)
    pub data_dir: PathBuf,
    /// Journal file name inside `data_dir`
    pub journal_file: String,
    /// fsync after every committed batch
    pub sync_writes: bool,
    /// Tree used by commands when none is given
    pub default_tree: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: dirs_default_data_dir(),
            journal_file: "kastle.jsonl".into(),
            sync_writes: true,
            default_tree: None,
        }
    }
}

/// Get the default data directory (~/.kastle).
fn dirs_default_data_dir() -> PathBuf {
    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().join(".kastle"))
        .unwrap_or_else(|| PathBuf::from("~/.kastle"))
}

/// Get the XDG config directory for kastle.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "kastle").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("kastle.toml"))
}

/// Get the path to the local config file in a directory.
pub fn local_config_path(dir: &Path) -> PathBuf {
    dir.join(".kastle.toml")
}

/// Expand `~`, `$VAR` and `${VAR}` in a path string.
pub fn expand_env_vars(path: &str) -> String {
    shellexpand::full(path)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| path.to_string())
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

impl Settings {
    /// Full path of the journal file.
    pub fn journal_path(&self) -> PathBuf {
        self.data_dir.join(&self.journal_file)
    }

    /// Expand shell variables and tilde in path-like fields.
    fn expand_paths(&mut self) {
        let expanded = expand_env_vars(self.data_dir.to_string_lossy().as_ref());
        self.data_dir = PathBuf::from(expanded);
    }

    /// Overlay wins for every field it specifies.
    pub fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            data_dir: overlay
                .data_dir
                .clone()
                .unwrap_or_else(|| self.data_dir.clone()),
            journal_file: overlay
                .journal_file
                .clone()
                .unwrap_or_else(|| self.journal_file.clone()),
            sync_writes: overlay.sync_writes.unwrap_or(self.sync_writes),
            default_tree: overlay
                .default_tree
                .clone()
                .or_else(|| self.default_tree.clone()),
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `local_dir` - Optional directory containing a `.kastle.toml`
    pub fn load(local_dir: Option<&Path>) -> Result<Self, ApplicationError> {
        // 1. Start with defaults
        let mut current = Self::default();

        // 2. Global config
        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                let raw = load_raw_settings(&global_path)?;
                current = current.merge_with(&raw);
            }
        }

        // 3. Local config
        if let Some(dir) = local_dir {
            let local_path = local_config_path(dir);
            if local_path.exists() {
                let raw = load_raw_settings(&local_path)?;
                current = current.merge_with(&raw);
            }
        }

        // 4. Environment variables
        current = Self::apply_env_overrides(current)?;

        current.expand_paths();

        Ok(current)
    }

    /// Apply KASTLE_* environment variables as explicit overrides.
    ///
    /// `KASTLE_JOURNAL_FILE` maps to `journal_file`.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let config = Config::builder()
            .add_source(
                Environment::with_prefix("KASTLE")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_string("data_dir") {
            settings.data_dir = PathBuf::from(val);
        }
        if let Ok(val) = config.get_string("journal_file") {
            settings.journal_file = val;
        }
        if let Ok(val) = config.get_bool("sync_writes") {
            settings.sync_writes = val;
        }
        if let Ok(val) = config.get_string("default_tree") {
            settings.default_tree = Some(val);
        }

        Ok(settings)
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# kastle configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/kastle/kastle.toml
#   Local:  ./.kastle.toml
#   Env:    KASTLE_* environment variables

# Directory holding the journal
# data_dir = "~/.kastle"

# Journal file name inside data_dir
# journal_file = "kastle.jsonl"

# fsync after every committed batch
# sync_writes = true

# Tree used when a command does not name one
# default_tree = "Root Configuration"
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}
