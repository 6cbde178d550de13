//! TOML-based planner configuration.
//!
//! Stores:
//! - Scheduler settings (sleep window, sessions, buffers, capacity, preferences)
//! - Personal energy overrides per hour of day
//! - Default tie-break seed
//!
//! Configuration is stored at `~/.config/studyplan/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::energy::{EnergyModel, EnergyOverride};
use crate::error::ConfigError;
use crate::scheduler::SchedulerConfig;

/// Planner configuration.
///
/// Serialized to/from TOML at `~/.config/studyplan/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Seed used when a run does not supply one.
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    /// Pinned energy levels, replacing the curve at those hours.
    #[serde(default)]
    pub energy_overrides: Vec<EnergyOverride>,
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };
        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() || key.is_empty() {
            return Err(invalid("config key is empty".to_string()));
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current
                    .as_object_mut()
                    .ok_or_else(|| invalid("unknown config key".to_string()))?;
                let existing = obj
                    .get(part)
                    .ok_or_else(|| invalid("unknown config key".to_string()))?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value
                            .parse::<bool>()
                            .map_err(|e| invalid(format!("cannot parse '{value}' as bool: {e}")))?,
                    ),
                    serde_json::Value::Number(_) => {
                        if let Ok(n) = value.parse::<u64>() {
                            serde_json::Value::Number(n.into())
                        } else if let Ok(n) = value.parse::<f64>() {
                            serde_json::Number::from_f64(n)
                                .map(serde_json::Value::Number)
                                .ok_or_else(|| invalid(format!("cannot parse '{value}' as number")))?
                        } else {
                            return Err(invalid(format!("cannot parse '{value}' as number")));
                        }
                    }
                    // Unset optional values take whatever JSON the input parses as.
                    serde_json::Value::Null
                    | serde_json::Value::Object(_)
                    | serde_json::Value::Array(_) => serde_json::from_str(value)
                        .map_err(|e| invalid(format!("cannot parse '{value}': {e}")))?,
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current
                .get_mut(part)
                .ok_or_else(|| invalid("unknown config key".to_string()))?;
        }

        Err(invalid("unknown config key".to_string()))
    }

    /// Default config file location.
    ///
    /// # Errors
    ///
    /// Returns an error if the data directory cannot be created.
    pub fn path() -> Result<PathBuf, ConfigError> {
        let dir = data_dir().map_err(|e| ConfigError::LoadFailed {
            path: PathBuf::from("~/.config/studyplan"),
            message: e.to_string(),
        })?;
        Ok(dir.join("config.toml"))
    }

    /// Load from the default location, writing defaults if the file is absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        if !path.exists() {
            let cfg = Self::default();
            cfg.save_to(&path)?;
            return Ok(cfg);
        }
        Self::load_from(&path)
    }

    /// Load from `path`; a missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => Ok(toml::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    /// Persist to `path`, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| save_failed(e.to_string()))?;
        }
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by dot-separated key. Does not persist.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value does not fit the
    /// field's type.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self)
            .map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        *self = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// Energy model built from the stored overrides.
    pub fn energy_model(&self) -> EnergyModel {
        EnergyModel::from_overrides(&self.energy_overrides)
    }

    /// Pin the energy level at `hour`, replacing any earlier override.
    ///
    /// # Errors
    ///
    /// Returns an error if the hour or level is out of range.
    pub fn set_energy_override(&mut self, hour: u8, energy_level: f64) -> Result<(), ConfigError> {
        let mut model = self.energy_model();
        if !(0.0..=100.0).contains(&energy_level) || !model.set_override(hour, energy_level) {
            return Err(ConfigError::InvalidValue {
                key: format!("energy_overrides.{hour}"),
                message: format!("hour must be 0-23 and level 0-100, got {hour} / {energy_level}"),
            });
        }
        self.energy_overrides = model.overrides();
        Ok(())
    }

    /// Remove the override at `hour`. Returns whether one existed.
    pub fn clear_energy_override(&mut self, hour: u8) -> bool {
        let mut model = self.energy_model();
        let removed = model.clear_override(hour);
        self.energy_overrides = model.overrides();
        removed
    }
}
