// Distributed under the GNU Affero General Public License v3.0 or later.
// See accompanying file LICENSE or https://www.gnu.org/licenses/agpl-3.0.html for details.

use dirs_next::config_dir;
use engine::ScriptSettings;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

const APP_DIR: &str = "TexScript";

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct LoggingSettings {
    /// Maximum log level (`error`, `warn`, `info`, `debug`, `trace` or `off`).
    /// Ignored when `RUST_LOG` is set.
    pub level: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    pub scripting: ScriptSettings,
    pub logging: LoggingSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            scripting: ScriptSettings {
                asset_root: PathBuf::from("resources"),
            },
            logging: LoggingSettings {
                level: String::from("info"),
            },
        }
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Deserialization Error: {0}")]
    Serde(#[from] toml::de::Error),

    #[error("Serialization Error: {0}")]
    SerdeSer(#[from] toml::ser::Error),

    #[error("Configuration Directory Not Found")]
    ConfigDirNotFound,
}

impl Settings {
    fn settings_dir() -> Result<PathBuf, SettingsError> {
        let config_dir = config_dir().ok_or(SettingsError::ConfigDirNotFound)?;
        Ok(config_dir.join(APP_DIR).join("settings"))
    }

    /// Retrieves the path to the user settings file.
    pub fn user_settings_path() -> Result<PathBuf, SettingsError> {
        Ok(Self::settings_dir()?.join("user_settings.toml"))
    }

    /// Retrieves the path to the default settings file.
    pub fn default_settings_path() -> Result<PathBuf, SettingsError> {
        Ok(Self::settings_dir()?.join("default_settings.toml"))
    }

    pub fn load_from_file(path: &Path) -> Result<Self, SettingsError> {
        let content = fs::read_to_string(path)?;
        let settings: Settings = toml::from_str(&content)?;
        Ok(settings)
    }

    /// Saves settings to a specified file path, ensuring the directory exists.
    pub fn save_to_file(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Loads user settings, falling back to hardcoded defaults on any error.
    pub fn load_user_settings() -> Self {
        match Self::user_settings_path().and_then(|user_path| {
            let default_path = Self::default_settings_path()?;
            Self::initialize(&user_path, &default_path)
        }) {
            Ok(settings) => settings,
            Err(e) => {
                warn!("Error initializing settings: {}. Using hardcoded defaults.", e);
                Self::default()
            }
        }
    }

    /// Loads the user settings file, or the default file when the user file
    /// is missing or unreadable. Whatever gets loaded is written back as the
    /// user settings.
    pub fn initialize(user_path: &Path, default_path: &Path) -> Result<Self, SettingsError> {
        if user_path.exists() {
            match Self::load_from_file(user_path) {
                Ok(settings) => return Ok(settings),
                Err(e) => warn!(
                    "Failed to load user settings: {}. Attempting to load defaults.",
                    e
                ),
            }
        } else {
            info!("User settings not found. Loading default settings.");
        }
        Self::load_defaults(user_path, default_path)
    }

    fn load_defaults(user_path: &Path, default_path: &Path) -> Result<Self, SettingsError> {
        if default_path.exists() {
            let settings = Self::load_from_file(default_path)?;
            settings.save_to_file(user_path)?;
            info!("Default settings loaded and saved as user settings.");
            Ok(settings)
        } else {
            warn!("Default settings file not found. Using hardcoded defaults.");
            let settings = Self::default();
            settings.save_to_file(default_path)?;
            settings.save_to_file(user_path)?;
            Ok(settings)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;
    use tempfile::tempdir;

    fn paths(dir: &Path) -> (PathBuf, PathBuf) {
        (
            dir.join("settings").join("user_settings.toml"),
            dir.join("settings").join("default_settings.toml"),
        )
    }

    #[test]
    #[serial]
    fn test_settings_paths_follow_config_dir() {
        let temp_dir = tempdir().expect("Failed to create temporary directory");
        let original_xdg_config_home = env::var("XDG_CONFIG_HOME").ok();
        // SAFETY: serialized with every other test touching the environment.
        unsafe { env::set_var("XDG_CONFIG_HOME", temp_dir.path()) };

        let user = Settings::user_settings_path();
        let default = Settings::default_settings_path();

        // SAFETY: as above.
        unsafe {
            match original_xdg_config_home {
                Some(val) => env::set_var("XDG_CONFIG_HOME", val),
                None => env::remove_var("XDG_CONFIG_HOME"),
            }
        }

        if cfg!(target_os = "linux") {
            let settings_dir = temp_dir.path().join(APP_DIR).join("settings");
            assert_eq!(user.unwrap(), settings_dir.join("user_settings.toml"));
            assert_eq!(default.unwrap(), settings_dir.join("default_settings.toml"));
        } else {
            assert!(user.unwrap().ends_with("user_settings.toml"));
        }
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("nested").join("settings.toml");

        let settings = Settings {
            scripting: ScriptSettings {
                asset_root: PathBuf::from("/srv/assets"),
            },
            logging: LoggingSettings {
                level: String::from("debug"),
            },
        };
        settings.save_to_file(&path).unwrap();

        let loaded = Settings::load_from_file(&path).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_initialize_writes_hardcoded_defaults() {
        let temp_dir = tempdir().unwrap();
        let (user_path, default_path) = paths(temp_dir.path());

        let settings = Settings::initialize(&user_path, &default_path).unwrap();

        assert_eq!(settings, Settings::default());
        assert!(user_path.exists());
        assert!(default_path.exists());
    }

    #[test]
    fn test_initialize_prefers_default_file_over_hardcoded() {
        let temp_dir = tempdir().unwrap();
        let (user_path, default_path) = paths(temp_dir.path());
        fs::create_dir_all(default_path.parent().unwrap()).unwrap();
        fs::write(
            &default_path,
            "[scripting]\nasset_root = \"textures\"\n\n[logging]\nlevel = \"warn\"\n",
        )
        .unwrap();

        let settings = Settings::initialize(&user_path, &default_path).unwrap();

        assert_eq!(settings.scripting.asset_root, PathBuf::from("textures"));
        assert_eq!(settings.logging.level, "warn");
        assert_eq!(Settings::load_from_file(&user_path).unwrap(), settings);
    }

    #[test]
    fn test_initialize_recovers_from_corrupt_user_file() {
        let temp_dir = tempdir().unwrap();
        let (user_path, default_path) = paths(temp_dir.path());
        fs::create_dir_all(user_path.parent().unwrap()).unwrap();
        fs::write(&user_path, "this is = not [valid toml").unwrap();

        let settings = Settings::initialize(&user_path, &default_path).unwrap();

        assert_eq!(settings, Settings::default());
        // The corrupt file was replaced.
        assert_eq!(Settings::load_from_file(&user_path).unwrap(), settings);
    }

    #[test]
    fn test_load_from_file_rejects_missing_section() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("partial.toml");
        fs::write(&path, "[logging]\nlevel = \"info\"\n").unwrap();

        let result = Settings::load_from_file(&path);
        assert!(matches!(result, Err(SettingsError::Serde(_))));
    }
}
