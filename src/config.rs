use crate::model::DEFAULT_DOSAGE_PRESETS;
use crate::paths::AppPaths;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

fn default_presets() -> Vec<String> {
    DEFAULT_DOSAGE_PRESETS.iter().map(|s| s.to_string()).collect()
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub dark_mode: bool,

    #[serde(default = "default_presets")]
    pub dosage_presets: Vec<String>,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dark_mode: false,
            dosage_presets: default_presets(),
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// Loads `config.toml`; a missing file yields the defaults.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::get_config_file_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)?;
            let mut config: Config = toml::from_str(&contents)?;
            if config.dosage_presets.is_empty() {
                config.dosage_presets = default_presets();
            }
            return Ok(config);
        }
        Ok(Self::default())
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::get_config_file_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let toml_str = toml::to_string_pretty(self)?;
        fs::write(path, toml_str)?;
        Ok(())
    }

    /// Read-modify-write of the saved file. An unreadable file is reported
    /// and left untouched rather than replaced by defaults.
    pub fn update(f: impl FnOnce(&mut Config)) -> Result<Config> {
        Self::update_at(&AppPaths::get_config_file_path()?, f)
    }

    pub fn update_at(path: &Path, f: impl FnOnce(&mut Config)) -> Result<Config> {
        let mut config = Self::load_from(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        f(&mut config);
        config.save_to(path)?;
        Ok(config)
    }

    pub fn get_path_string() -> Result<String> {
        let path = AppPaths::get_config_file_path()?;
        Ok(path.to_string_lossy().to_string())
    }
}
