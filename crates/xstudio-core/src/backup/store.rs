//! Backup folder management
//!
//! Maps backup names to files inside the project's backup folder and takes care
//! of opening, writing and closing the underlying streams.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use super::error::BackupError;
use super::file::BackupFile;
use super::reader::read_backup;
use super::writer::write_backup_to;
use crate::config::{BackupSettings, WriteMode};
use crate::path::FilePath;

/// The backup folder of one project
#[derive(Debug, Clone, PartialEq)]
pub struct BackupStore {
    folder: PathBuf,
    settings: BackupSettings,
}

impl BackupStore {
    /// Store for the project saved at `project_path`
    pub fn for_project(project_path: &FilePath, settings: BackupSettings) -> Self {
        let folder = project_path
            .as_path()
            .parent()
            .unwrap_or_else(|| Path::new(""))
            .join(&settings.folder_name);
        Self { folder, settings }
    }

    /// Store rooted at an explicit folder
    pub fn new(folder: impl Into<PathBuf>, settings: BackupSettings) -> Self {
        Self {
            folder: folder.into(),
            settings,
        }
    }

    /// Backup folder
    pub fn folder(&self) -> &Path {
        &self.folder
    }

    /// Full path of a backup file
    pub fn path_of(&self, name: &str) -> PathBuf {
        self.folder.join(name)
    }

    /// Whether a backup file with this name exists
    pub fn exists(&self, name: &str) -> bool {
        self.path_of(name).exists()
    }

    /// Pick an unused backup name derived from a project item name
    ///
    /// `plugin.foo.xml` becomes `plugin.foo.xbak`, then `plugin.foo (2).xbak`, ...
    pub fn generate_name(&self, item_name: &str) -> String {
        let stem = sanitize(&FilePath::new(item_name).stem());
        let stem = if stem.is_empty() { "backup".to_string() } else { stem };
        let ext = self.settings.extension.trim_start_matches('.');

        let mut candidate = format!("{}.{}", stem, ext);
        let mut counter = 2;
        while self.exists(&candidate) {
            candidate = format!("{} ({}).{}", stem, counter, ext);
            counter += 1;
        }
        candidate
    }

    /// Load the backup file called `name`
    pub fn load(&self, name: &str) -> Result<BackupFile, BackupError> {
        read_backup(self.path_of(name))
    }

    /// Write `backup` under `name`, replacing any previous content
    pub fn save(&self, name: &str, backup: &BackupFile) -> Result<(), BackupError> {
        fs::create_dir_all(&self.folder)?;
        let target = self.path_of(name);

        match self.settings.write_mode {
            WriteMode::Overwrite => write_to_path(&target, backup)?,
            WriteMode::Atomic => {
                let temp = self
                    .folder
                    .join(format!("{}.{}.tmp", name, uuid::Uuid::new_v4().simple()));
                if let Err(e) = write_to_path(&temp, backup).and_then(|_| {
                    fs::rename(&temp, &target).map_err(BackupError::from)
                }) {
                    let _ = fs::remove_file(&temp);
                    return Err(e);
                }
            }
        }

        tracing::debug!(
            "Wrote {} revision(s) to {}",
            backup.len(),
            target.display()
        );
        Ok(())
    }
}

/// Write a backup file; the stream is flushed and closed on every path
fn write_to_path(path: &Path, backup: &BackupFile) -> Result<(), BackupError> {
    let file = File::create(path)?;
    let mut stream = BufWriter::new(file);
    write_backup_to(backup, &mut stream)?;
    stream.flush()?;
    stream.get_ref().sync_all()?;
    Ok(())
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect::<String>()
        .trim()
        .to_string()
}
