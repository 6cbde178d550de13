pub mod config;
pub mod energy;
pub mod plan;

use std::path::{Path, PathBuf};

use studyplan_core::{Config, ConfigError};

/// Load the config from `path`, or from the default location.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    match path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
}

/// Save the config to `path`, or to the default location.
pub fn save_config(config: &Config, path: Option<&Path>) -> Result<(), ConfigError> {
    match path {
        Some(path) => config.save_to(path),
        None => config.save(),
    }
}

/// Resolved config file location.
pub fn config_location(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    match path {
        Some(path) => Ok(path.to_path_buf()),
        None => Config::path(),
    }
}
