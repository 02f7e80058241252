//! Application settings
//!
//! Stored as `settings.json` in the platform config directory:
//! ```text
//! <config_dir>/XStudio/settings.json
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Maximum number of entries kept in the recent projects list
const MAX_RECENT_PROJECTS: usize = 10;

/// Errors that can occur while loading or saving settings
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Underlying file operation failed
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The settings file is not valid JSON for [`StudioConfig`]
    #[error("Invalid settings file: {0}")]
    Json(#[from] serde_json::Error),

    /// The platform has no configuration directory
    #[error("Could not determine the user configuration directory")]
    NoConfigDir,
}

/// Top-level application settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudioConfig {
    /// Game data location used to build the virtual filesystem
    pub game: GameDataConfig,

    /// Revision backup behaviour
    pub backup: BackupSettings,

    /// Recently opened project files, most recent first
    pub recent_projects: Vec<PathBuf>,
}

/// Which game release the data folder belongs to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameVersion {
    /// X2: The Threat
    Threat,
    /// X3: Reunion
    Reunion,
    /// X3: Terran Conflict
    #[default]
    TerranConflict,
    /// X3: Albion Prelude
    AlbionPrelude,
}

impl GameVersion {
    /// Data folders to scan, relative to the game folder, in load order
    pub fn data_folders(&self) -> &'static [&'static str] {
        match self {
            GameVersion::Threat | GameVersion::Reunion => &[""],
            GameVersion::TerranConflict | GameVersion::AlbionPrelude => &["", "addon"],
        }
    }

    /// Human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            GameVersion::Threat => "X2: The Threat",
            GameVersion::Reunion => "X3: Reunion",
            GameVersion::TerranConflict => "X3: Terran Conflict",
            GameVersion::AlbionPrelude => "X3: Albion Prelude",
        }
    }
}

/// Game data settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameDataConfig {
    /// Folder containing the game executable and `NN.cat` catalogs
    pub game_folder: PathBuf,

    /// Game release
    pub version: GameVersion,

    /// Let loose files in `t`, `scripts`, `director` and `types` override catalogs
    pub load_loose_files: bool,
}

impl Default for GameDataConfig {
    fn default() -> Self {
        Self {
            game_folder: PathBuf::new(),
            version: GameVersion::default(),
            load_loose_files: true,
        }
    }
}

/// How backup files are written to disk
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum WriteMode {
    /// Truncate and rewrite the backup file in place
    #[default]
    Overwrite,
    /// Write a temporary file next to the backup and rename it over the target
    Atomic,
}

/// Backup (revision history) settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupSettings {
    /// Folder name, relative to the project file's folder
    pub folder_name: String,

    /// Backup file extension (without dot)
    pub extension: String,

    /// Write strategy
    pub write_mode: WriteMode,
}

impl Default for BackupSettings {
    fn default() -> Self {
        Self {
            folder_name: "Backup".to_string(),
            extension: "xbak".to_string(),
            write_mode: WriteMode::default(),
        }
    }
}

impl StudioConfig {
    /// Get the default settings file location
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let base = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(base.join("XStudio").join("settings.json"))
    }

    /// Load settings, returning defaults if the file does not exist
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!("No settings at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Load settings from the default location
    pub fn load_default() -> Result<Self, ConfigError> {
        Self::load(Self::default_path()?)
    }

    /// Save settings as pretty JSON, creating parent folders as needed
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Move a project to the front of the recent list
    pub fn touch_recent_project(&mut self, project: impl Into<PathBuf>) {
        let project = project.into();
        self.recent_projects.retain(|p| p != &project);
        self.recent_projects.insert(0, project);
        self.recent_projects.truncate(MAX_RECENT_PROJECTS);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let temp = TempDir::new().unwrap();
        let config = StudioConfig::load(temp.path().join("nope.json")).unwrap();
        assert_eq!(config, StudioConfig::default());
        assert_eq!(config.backup.folder_name, "Backup");
        assert_eq!(config.backup.write_mode, WriteMode::Overwrite);
    }

    #[test]
    fn test_save_and_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("settings.json");

        let mut config = StudioConfig::default();
        config.game.game_folder = PathBuf::from("/games/x3tc");
        config.game.version = GameVersion::AlbionPrelude;
        config.backup.write_mode = WriteMode::Atomic;
        config.save(&path).unwrap();

        let loaded = StudioConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_uses_field_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("settings.json");
        fs::write(&path, r#"{ "game": { "version": "Reunion" } }"#).unwrap();

        let config = StudioConfig::load(&path).unwrap();
        assert_eq!(config.game.version, GameVersion::Reunion);
        assert!(config.game.load_loose_files);
        assert_eq!(config.backup.extension, "xbak");
    }

    #[test]
    fn test_recent_projects_dedup_and_cap() {
        let mut config = StudioConfig::default();
        for i in 0..12 {
            config.touch_recent_project(format!("p{i}.xprj"));
        }
        config.touch_recent_project("p5.xprj");
        assert_eq!(config.recent_projects.len(), MAX_RECENT_PROJECTS);
        assert_eq!(config.recent_projects[0], PathBuf::from("p5.xprj"));
        assert_eq!(
            config
                .recent_projects
                .iter()
                .filter(|p| **p == PathBuf::from("p5.xprj"))
                .count(),
            1
        );
    }

    #[test]
    fn test_addon_folders() {
        assert_eq!(GameVersion::Reunion.data_folders(), &[""]);
        assert_eq!(GameVersion::TerranConflict.data_folders(), &["", "addon"]);
    }
}
