use clap::Subcommand;
use std::path::Path;

use super::{config_location, load_config, save_config};
use studyplan_core::Config;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Get a config value
    Get {
        /// Dot-separated key (e.g. "scheduler.buffer_minutes")
        key: String,
    },
    /// Set a config value
    Set {
        /// Dot-separated key
        key: String,
        /// New value
        value: String,
    },
    /// Show the whole config as TOML
    Show,
    /// Print the config file location
    Path,
    /// Reset config to defaults
    Reset,
}

pub fn run(action: ConfigAction, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigAction::Get { key } => {
            let config = load_config(path)?;
            let value = config
                .get(&key)
                .ok_or_else(|| format!("unknown key: {key}"))?;
            println!("{value}");
        }
        ConfigAction::Set { key, value } => {
            let mut config = load_config(path)?;
            config.set(&key, &value)?;
            save_config(&config, path)?;
            println!("ok");
        }
        ConfigAction::Show => {
            let config = load_config(path)?;
            print!("{}", toml::to_string_pretty(&config)?);
        }
        ConfigAction::Path => {
            println!("{}", config_location(path)?.display());
        }
        ConfigAction::Reset => {
            save_config(&Config::default(), path)?;
            println!("config reset to defaults");
        }
    }
    Ok(())
}
