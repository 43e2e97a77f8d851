//! Configuration loading and root folder resolution
//!
//! Root folder priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`BIRDCAST_ROOT_FOLDER`)
//! 3. `root_folder` key in the TOML config file
//! 4. OS-dependent compiled default (fallback)
//!
//! A missing config file is never fatal: callers get defaults and a warning.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "BIRDCAST_ROOT_FOLDER";

/// Environment variable overriding the config file location
pub const CONFIG_FILE_ENV: &str = "BIRDCAST_CONFIG";

/// Keys shared by every Birdcast binary
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    /// Root folder holding assets and generated output
    pub root_folder: Option<PathBuf>,
    /// Tracing filter directive (e.g. "info", "birdcast_daily=debug")
    pub log_level: Option<String>,
}

impl TomlConfig {
    /// Load from an explicit path
    pub fn load(path: &Path) -> Result<Self> {
        load_toml_file(path)
    }

    /// Load from the default config location, falling back to defaults
    pub fn load_default() -> Self {
        match default_config_path() {
            Some(path) => match Self::load(&path) {
                Ok(config) => config,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to load config file, using defaults");
                    Self::default()
                }
            },
            None => {
                debug!("No config file found, using defaults");
                Self::default()
            }
        }
    }
}

/// Read and deserialize a TOML file into any config type
pub fn load_toml_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Locate the config file for the platform
///
/// Checks `BIRDCAST_CONFIG` first, then `~/.config/birdcast/config.toml`,
/// then (Linux only) `/etc/birdcast/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_FILE_ENV) {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
        warn!(path = %path.display(), "{} points to a missing file", CONFIG_FILE_ENV);
    }

    let user_config = dirs::config_dir().map(|d| d.join("birdcast").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/birdcast/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Resolves the root folder from CLI, environment, TOML and compiled defaults
#[derive(Debug, Clone)]
pub struct RootFolderResolver {
    module_name: String,
    cli_arg: Option<PathBuf>,
    toml_root: Option<PathBuf>,
}

impl RootFolderResolver {
    pub fn new(module_name: impl Into<String>) -> Self {
        Self {
            module_name: module_name.into(),
            cli_arg: None,
            toml_root: None,
        }
    }

    /// Supply the command-line override
    pub fn with_cli_arg(mut self, path: Option<PathBuf>) -> Self {
        self.cli_arg = path;
        self
    }

    /// Supply the TOML-configured root folder
    pub fn with_toml(mut self, config: &TomlConfig) -> Self {
        self.toml_root = config.root_folder.clone();
        self
    }

    /// Resolve the root folder following the priority order
    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = &self.cli_arg {
            debug!(module = %self.module_name, "Root folder from command line");
            return path.clone();
        }

        if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
            if !path.trim().is_empty() {
                debug!(module = %self.module_name, "Root folder from environment");
                return PathBuf::from(path);
            }
        }

        if let Some(path) = &self.toml_root {
            debug!(module = %self.module_name, "Root folder from TOML config");
            return path.clone();
        }

        default_root_folder()
    }
}

/// Ensure a directory exists, creating it (and parents) if missing
pub fn ensure_directory(path: &Path) -> Result<()> {
    if path.is_dir() {
        return Ok(());
    }
    std::fs::create_dir_all(path)
        .map_err(|e| Error::Config(format!("Cannot create {}: {}", path.display(), e)))
}

/// OS-dependent default root folder
pub fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        dirs::data_local_dir()
            .map(|d| d.join("birdcast"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/birdcast"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("birdcast"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/birdcast"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("birdcast"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\birdcast"))
    } else {
        PathBuf::from("./birdcast_data")
    }
}
