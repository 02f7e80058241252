//! Revision history of one tracked file

use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::BackupError;
use super::revision::ScriptRevision;

/// Flavour of script a backup file holds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackupType {
    /// MSCI script
    #[default]
    Msci,
    /// Mission director script
    MissionDirector,
}

impl BackupType {
    /// Identifier used in backup files
    pub fn as_str(&self) -> &'static str {
        match self {
            BackupType::Msci => "MSCI",
            BackupType::MissionDirector => "MD",
        }
    }

    /// Parse a backup file identifier (case-insensitive)
    pub fn parse(value: &str) -> Result<Self, BackupError> {
        match value.trim().to_ascii_uppercase().as_str() {
            "MSCI" => Ok(BackupType::Msci),
            "MD" => Ok(BackupType::MissionDirector),
            _ => Err(BackupError::InvalidValue {
                field: "type".to_string(),
                value: value.to_string(),
            }),
        }
    }
}

impl fmt::Display for BackupType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Append-only list of revisions, oldest first
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupFile {
    backup_type: BackupType,
    revisions: Vec<ScriptRevision>,
}

impl BackupFile {
    /// Create an empty history
    pub fn new(backup_type: BackupType) -> Self {
        Self {
            backup_type,
            revisions: Vec::new(),
        }
    }

    /// Script flavour
    pub fn backup_type(&self) -> BackupType {
        self.backup_type
    }

    /// Append a revision
    pub fn commit(&mut self, revision: ScriptRevision) {
        tracing::debug!(
            "Commit '{}' for {} (revision {})",
            revision.title(),
            revision.path(),
            self.revisions.len() + 1
        );
        self.revisions.push(revision);
    }

    /// Append a revision read back from disk
    pub(super) fn restore(&mut self, revision: ScriptRevision) {
        self.revisions.push(revision);
    }

    /// All revisions, oldest first
    pub fn revisions(&self) -> &[ScriptRevision] {
        &self.revisions
    }

    /// Revision by index (0 = oldest)
    pub fn get(&self, index: usize) -> Option<&ScriptRevision> {
        self.revisions.get(index)
    }

    /// Most recent revision
    pub fn latest(&self) -> Option<&ScriptRevision> {
        self.revisions.last()
    }

    /// Number of revisions
    pub fn len(&self) -> usize {
        self.revisions.len()
    }

    /// Whether the history is empty
    pub fn is_empty(&self) -> bool {
        self.revisions.is_empty()
    }

    /// Iterate oldest first
    pub fn iter(&self) -> std::slice::Iter<'_, ScriptRevision> {
        self.revisions.iter()
    }
}

impl<'a> IntoIterator for &'a BackupFile {
    type Item = &'a ScriptRevision;
    type IntoIter = std::slice::Iter<'a, ScriptRevision>;

    fn into_iter(self) -> Self::IntoIter {
        self.revisions.iter()
    }
}
