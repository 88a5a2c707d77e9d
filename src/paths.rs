use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::env;
use std::fs;
use std::path::PathBuf;
use std::sync::OnceLock;

// Set from the Android `Context.filesDir` before anything touches the disk
static ANDROID_DATA_DIR: OnceLock<PathBuf> = OnceLock::new();

const TEST_DIR_VAR: &str = "MEDIALERT_TEST_DIR";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Dir {
    Data,
    Config,
}

impl Dir {
    fn name(self) -> &'static str {
        match self {
            Dir::Data => "data",
            Dir::Config => "config",
        }
    }

    /// Root override: the Android files dir, else `MEDIALERT_TEST_DIR`.
    /// Both get a `data/` and a `config/` child.
    fn overridden(self) -> Option<PathBuf> {
        ANDROID_DATA_DIR
            .get()
            .cloned()
            .or_else(|| env::var_os(TEST_DIR_VAR).map(PathBuf::from))
            .map(|root| root.join(self.name()))
    }

    fn platform_default(self) -> Option<PathBuf> {
        let proj = ProjectDirs::from("com", "hdw", "medialert")?;
        Some(match self {
            Dir::Data => proj.data_dir().to_path_buf(),
            Dir::Config => proj.config_dir().to_path_buf(),
        })
    }

    fn locate(self) -> Option<PathBuf> {
        self.overridden().or_else(|| self.platform_default())
    }

    /// Resolved directory, created on demand.
    fn create(self) -> Result<PathBuf> {
        let dir = self
            .locate()
            .with_context(|| format!("No {} directory on this platform", self.name()))?;
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        Ok(dir)
    }
}

pub struct AppPaths;

impl AppPaths {
    /// Must be called once at startup on Android.
    pub fn init_android_path(path: String) {
        let _ = ANDROID_DATA_DIR.set(PathBuf::from(path));
    }

    pub fn get_data_dir() -> Result<PathBuf> {
        Dir::Data.create()
    }

    pub fn get_config_dir() -> Result<PathBuf> {
        Dir::Config.create()
    }

    pub fn get_config_file_path() -> Result<PathBuf> {
        Ok(Self::get_config_dir()?.join("config.toml"))
    }

    /// Backing file of a preferences namespace, e.g. `Reminders.json`.
    pub fn get_prefs_path(namespace: &str) -> Result<PathBuf> {
        Ok(Self::get_data_dir()?.join(format!("{}.json", namespace)))
    }

    pub fn get_log_path() -> Result<PathBuf> {
        Ok(Self::get_data_dir()?.join("medialert.log"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // The only test touching the process environment.
    #[test]
    fn test_test_dir_override_lays_out_data_and_config() {
        let dir = tempfile::tempdir().unwrap();
        // SAFETY: no other test reads or writes MEDIALERT_TEST_DIR.
        unsafe { env::set_var(TEST_DIR_VAR, dir.path()) };

        let prefs = AppPaths::get_prefs_path("Reminders").unwrap();
        let config = AppPaths::get_config_file_path().unwrap();
        unsafe { env::remove_var(TEST_DIR_VAR) };

        assert_eq!(prefs, dir.path().join("data").join("Reminders.json"));
        assert_eq!(config, dir.path().join("config").join("config.toml"));
        assert!(dir.path().join("data").is_dir());
        assert!(dir.path().join("config").is_dir());
    }
}
