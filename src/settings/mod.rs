use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use derivative::Derivative;
use directories::ProjectDirs;
use fs_err::{self as fs};
use serde::{Deserialize, Serialize};
use serde_inline_default::serde_inline_default;
use tracing::level_filters::LevelFilter;
use tracing::*;

use crate::errors::{AppResult, SwitcherError};

pub const CONFIG_FILE_NAME: &str = "audio-switcher.toml";

// Both of these are needed for the defaults to hold:
// - #[serde_inline_default] for when a _field_ is missing,
//   - Since #[serde(default)] gets the default for the field's _type_, and *not* the parent struct's `Default::default()` value for it
// - #[derivative(Default)] for properly setting up `Default::default()` for when a _struct_ is missing.

#[serde_inline_default]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Derivative)]
#[derivative(Default)]
pub struct MiscSettings {
    /// Used when `RUST_LOG` isn't set
    #[serde_inline_default(String::from("debug"))]
    #[derivative(Default(value = "String::from(\"debug\")"))]
    pub log_level: String,
    /// The Stream Deck app discards the plugin's stderr, so this is the only
    /// way to see what happened after the fact.
    #[serde_inline_default(true)]
    #[derivative(Default(value = "true"))]
    pub log_to_file: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub misc: MiscSettings,
}

impl Settings {
    /// Reads the config at `path`, writing out defaults first if there isn't one.
    ///
    /// Re-saves after reading so newly added keys show up in older files.
    pub fn load(path: &Path) -> AppResult<Self> {
        if !path.exists() {
            let default = Settings::default();
            default.save(path)?;
            return Ok(default);
        }
        let mut file = fs::File::open(path)?;
        let mut buffer = String::new();
        file.read_to_string(&mut buffer)?;
        drop(file);
        let config: Settings = toml::from_str(&buffer)?;
        config.save(path)?;
        Ok(config)
    }
    pub fn save(&self, config_path: &Path) -> AppResult<()> {
        let toml_config = toml::to_string(self)?;
        debug!("Serialized config length: {}", toml_config.len());
        let mut file = fs::File::create(config_path)?;
        file.write_all(toml_config.as_bytes())?;
        file.flush()?;
        file.sync_all()?;
        Ok(())
    }
    pub fn get_log_level(&self) -> LevelFilter {
        LevelFilter::from_str(&self.misc.log_level).unwrap_or(LevelFilter::DEBUG)
    }
}

pub fn is_portable() -> bool {
    cfg!(feature = "portable")
}

/// Where the config file and logs live, created if needed.
pub fn config_dir() -> AppResult<PathBuf> {
    let dir = if is_portable() {
        std::env::current_dir()?
    } else {
        ProjectDirs::from("com", "fredemmott", "audio-switcher")
            .ok_or(SwitcherError::ConfigDir)?
            .config_dir()
            .to_path_buf()
    };
    fs::create_dir_all(&dir)?;
    Ok(dir)
}
