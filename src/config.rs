//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/dataform/dataform.toml`
//! 3. Environment variables: `DATAFORM_*` prefix
//! 4. CLI flags (applied by the caller)

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::ApplicationError;
use crate::domain::DataType;

/// Unified configuration for dataform.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Definition document the CLI works on (default: ./dataform.json)
    pub definition_file: PathBuf,
    /// Type for nodes created by add-subnode / add-sibling
    pub default_node_type: DataType,
    /// Separator for node paths given on the command line
    pub path_separator: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            definition_file: PathBuf::from("dataform.json"),
            default_node_type: DataType::Text,
            path_separator: "/".into(),
        }
    }
}

/// Raw settings for intermediate parsing: `None` means "not specified, inherit".
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawSettings {
    pub definition_file: Option<PathBuf>,
    pub default_node_type: Option<DataType>,
    pub path_separator: Option<String>,
}

/// Get the XDG config directory for dataform.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "dataform").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("dataform.toml"))
}

/// Expand `~`, `$VAR` and `${VAR}`; leaves the input alone if a variable is unset.
pub fn expand_env_vars(path: &str) -> String {
    shellexpand::full(path)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| path.to_string())
}

fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

impl Settings {
    fn expand_paths(&mut self) {
        let expanded = expand_env_vars(self.definition_file.to_string_lossy().as_ref());
        self.definition_file = PathBuf::from(expanded);
    }

    /// Overlay wins wherever it specifies a value.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            definition_file: overlay
                .definition_file
                .clone()
                .unwrap_or_else(|| self.definition_file.clone()),
            default_node_type: overlay
                .default_node_type
                .unwrap_or(self.default_node_type),
            path_separator: overlay
                .path_separator
                .clone()
                .unwrap_or_else(|| self.path_separator.clone()),
        }
    }

    /// Load settings from defaults, the global config file and `DATAFORM_*` variables.
    pub fn load() -> Result<Self, ApplicationError> {
        Self::load_from(global_config_path().as_deref())
    }

    /// Like [`Settings::load`] with an explicit config file (skipped if missing).
    pub fn load_from(config_file: Option<&Path>) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        if let Some(path) = config_file {
            if path.exists() {
                let raw = load_raw_settings(path)?;
                current = current.merge_with(&raw);
            }
        }

        current = Self::apply_env_overrides(current)?;
        current.validate()?;
        current.expand_paths();

        Ok(current)
    }

    /// Apply DATAFORM_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let config = Config::builder()
            .add_source(Environment::with_prefix("DATAFORM").separator("__"))
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_string("definition_file") {
            settings.definition_file = PathBuf::from(val);
        }
        if let Ok(val) = config.get_string("default_node_type") {
            settings.default_node_type = val.parse().map_err(|e| ApplicationError::Config {
                message: format!("DATAFORM_DEFAULT_NODE_TYPE: {e}"),
            })?;
        }
        if let Ok(val) = config.get_string("path_separator") {
            settings.path_separator = val;
        }

        Ok(settings)
    }

    fn validate(&self) -> Result<(), ApplicationError> {
        if self.path_separator.is_empty() {
            return Err(ApplicationError::Config {
                message: "path_separator must not be empty".into(),
            });
        }
        Ok(())
    }

    /// Split a command-line node path into names.
    pub fn split_path<'a>(&self, path: &'a str) -> Vec<&'a str> {
        path.split(self.path_separator.as_str())
            .filter(|segment| !segment.is_empty())
            .collect()
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# dataform configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/dataform/dataform.toml
#   Env:    DATAFORM_* environment variables
#   CLI:    --file

# Definition document used when --file is not given
# definition_file = "dataform.json"

# Type of nodes created by `dataform add` without --type
# default_node_type = "text"

# Separator for node paths on the command line
# path_separator = "/"
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}
