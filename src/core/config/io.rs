use crate::core::config::data::{path_display, Config};
use directories::ProjectDirs;
use std::error::Error as StdError;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Errors that can occur when loading configuration from disk.
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    Read {
        /// Path to the configuration file that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse the configuration file as valid TOML.
    Parse {
        /// Path to the configuration file with invalid TOML.
        path: PathBuf,
        /// The TOML deserialization error.
        source: toml::de::Error,
    },
}

impl ConfigError {
    fn display_path(path: &Path) -> String {
        path_display(path)
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Read { path, source } => {
                write!(
                    f,
                    "Failed to read config at {}: {}",
                    Self::display_path(path),
                    source
                )
            }
            ConfigError::Parse { path, source } => {
                write!(
                    f,
                    "Failed to parse config at {}: {}",
                    Self::display_path(path),
                    source
                )
            }
        }
    }
}

impl StdError for ConfigError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            ConfigError::Read { source, .. } => Some(source),
            ConfigError::Parse { source, .. } => Some(source),
        }
    }
}

impl Config {
    /// Load the config file at `config_path`, or the platform default
    /// location when none is given, then apply environment overrides.
    /// A missing file yields the default configuration.
    pub fn load(config_path: Option<&Path>) -> Result<Config, ConfigError> {
        let path = match config_path {
            Some(path) => Some(path.to_path_buf()),
            None => Self::get_config_path(),
        };

        let mut config = match path {
            Some(path) => Self::load_from_path(&path)?,
            None => {
                tracing::debug!("no config directory available; using defaults");
                Config::default()
            }
        };
        config
            .routing
            .apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn load_from_path(config_path: &Path) -> Result<Config, ConfigError> {
        if !config_path.exists() {
            tracing::debug!(
                path = %path_display(config_path),
                "config file not found; using defaults"
            );
            return Ok(Config::default());
        }

        let contents = fs::read_to_string(config_path).map_err(|source| ConfigError::Read {
            path: config_path.to_path_buf(),
            source,
        })?;
        let config: Config = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: config_path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path_display(config_path), "loaded config");
        Ok(config)
    }

    pub fn get_config_path() -> Option<PathBuf> {
        ProjectDirs::from("org", "aihub", "aihub")
            .map(|proj_dirs| proj_dirs.config_dir().join("config.toml"))
    }
}
