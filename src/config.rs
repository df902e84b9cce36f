//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/mediatree/mediatree.toml`
//! 3. Explicit config file (`--config`)
//! 4. Environment variables: `MEDIATREE_*` prefix

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::application::ApplicationError;

const APP_NAME: &str = "mediatree";

/// Raw settings for intermediate parsing.
///
/// Every field is optional so a layer only overrides what it names.
#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct RawSettings {
    pub store_filters: Option<bool>,
    pub filter_state_file: Option<PathBuf>,
    pub auto_select_first: Option<bool>,
    pub search_metadata: Option<bool>,
}

/// Unified configuration for mediatree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Persist active filters across sessions
    pub store_filters: bool,
    /// Where persisted filters live
    pub filter_state_file: PathBuf,
    /// Select the first visible node when nothing is selected
    pub auto_select_first: bool,
    /// Text filter also matches plot and original name
    pub search_metadata: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            store_filters: false,
            filter_state_file: default_filter_state_file(),
            auto_select_first: false,
            search_metadata: false,
        }
    }
}

fn default_filter_state_file() -> PathBuf {
    ProjectDirs::from("", "", APP_NAME)
        .map(|dirs| dirs.data_dir().join("filters.toml"))
        .unwrap_or_else(|| PathBuf::from("~/.local/share/mediatree/filters.toml"))
}

/// Get the XDG config directory for mediatree.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("mediatree.toml"))
}

/// Expand `~`, `$VAR` and `${VAR}`; unresolvable input is returned unchanged.
pub fn expand_path(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    shellexpand::full(raw.as_ref())
        .map(|s| PathBuf::from(s.into_owned()))
        .unwrap_or_else(|_| path.to_path_buf())
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
    /// Overlay wins where it specifies a value.
    pub fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            store_filters: overlay.store_filters.unwrap_or(self.store_filters),
            filter_state_file: overlay
                .filter_state_file
                .clone()
                .unwrap_or_else(|| self.filter_state_file.clone()),
            auto_select_first: overlay.auto_select_first.unwrap_or(self.auto_select_first),
            search_metadata: overlay.search_metadata.unwrap_or(self.search_metadata),
        }
    }

    fn expand_paths(&mut self) {
        self.filter_state_file = expand_path(&self.filter_state_file);
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `explicit` - Optional config file given on the command line; it must exist
    pub fn load(explicit: Option<&Path>) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                debug!("Settings::load: global {}", global_path.display());
                current = current.merge_with(&load_raw_settings(&global_path)?);
            }
        }

        if let Some(path) = explicit {
            let path = expand_path(path);
            debug!("Settings::load: explicit {}", path.display());
            current = current.merge_with(&load_raw_settings(&path)?);
        }

        current = Self::apply_env_overrides(current)?;
        current.expand_paths();
        Ok(current)
    }

    /// Apply MEDIATREE_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let config = Config::builder()
            .add_source(Environment::with_prefix("MEDIATREE").separator("__"))
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_bool("store_filters") {
            settings.store_filters = val;
        }
        if let Ok(val) = config.get_string("filter_state_file") {
            settings.filter_state_file = PathBuf::from(val);
        }
        if let Ok(val) = config.get_bool("auto_select_first") {
            settings.auto_select_first = val;
        }
        if let Ok(val) = config.get_bool("search_metadata") {
            settings.search_metadata = val;
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
        r#"# mediatree configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/mediatree/mediatree.toml
#   File:   mediatree --config <file>
#   Env:    MEDIATREE_* environment variables (explicit overrides)

# Remember active filters between sessions
# store_filters = false

# Where remembered filters are kept
# filter_state_file = "~/.local/share/mediatree/filters.toml"

# Select the first visible node when the selection is empty
# auto_select_first = false

# Let the text filter also search original names and plots
# search_metadata = false
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}
