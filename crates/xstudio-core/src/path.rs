//! File path value type
//!
//! Scripts, language files and backups are addressed by path throughout the
//! project tree. Paths coming from project files were usually written on Windows,
//! so comparison ignores ASCII case and treats `\` and `/` as the same separator.
//! The stored text itself is never rewritten.

use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

/// A filesystem path with case-insensitive comparison
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilePath(PathBuf);

impl FilePath {
    /// Create a path from anything path-like
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    /// Borrow as a standard path
    pub fn as_path(&self) -> &Path {
        &self.0
    }

    /// File name including extension, or an empty string for a bare root
    pub fn file_name(&self) -> String {
        self.name_component().unwrap_or_default()
    }

    /// File name without its extension
    pub fn stem(&self) -> String {
        let name = self.file_name();
        match name.rfind('.') {
            Some(pos) if pos > 0 => name[..pos].to_string(),
            _ => name,
        }
    }

    /// Extension without the leading dot
    pub fn extension(&self) -> Option<String> {
        let name = self.file_name();
        match name.rfind('.') {
            Some(pos) if pos > 0 && pos + 1 < name.len() => Some(name[pos + 1..].to_string()),
            _ => None,
        }
    }

    /// Whether the extension matches `ext` (with or without dot, any case)
    pub fn has_extension(&self, ext: &str) -> bool {
        let wanted = ext.trim_start_matches('.');
        self.extension()
            .map_or(false, |e| e.eq_ignore_ascii_case(wanted))
    }

    /// Containing folder
    pub fn folder(&self) -> FilePath {
        let text = self.text();
        match text.rfind(['\\', '/']) {
            Some(pos) => FilePath::new(&text[..pos]),
            None => FilePath::default(),
        }
    }

    /// Same path with the extension replaced
    pub fn with_extension(&self, ext: &str) -> FilePath {
        let ext = ext.trim_start_matches('.');
        let folder = self.folder();
        let name = if ext.is_empty() {
            self.stem()
        } else {
            format!("{}.{}", self.stem(), ext)
        };
        if folder.is_empty() {
            FilePath::new(name)
        } else {
            folder.join(name)
        }
    }

    /// Append a component
    pub fn join(&self, component: impl AsRef<Path>) -> FilePath {
        FilePath(self.0.join(component))
    }

    /// Whether the path is empty
    pub fn is_empty(&self) -> bool {
        self.0.as_os_str().is_empty()
    }

    /// Whether something exists at this path
    pub fn exists(&self) -> bool {
        self.0.exists()
    }

    /// Whether this path names an existing folder
    pub fn is_folder(&self) -> bool {
        self.0.is_dir()
    }

    /// Path as (lossy) text
    pub fn text(&self) -> String {
        self.0.to_string_lossy().into_owned()
    }

    /// Displayable form
    pub fn display(&self) -> std::path::Display<'_> {
        self.0.display()
    }

    fn name_component(&self) -> Option<String> {
        // Split manually so Windows separators work on every host
        let text = self.text();
        let trimmed = text.trim_end_matches(['\\', '/']);
        let name = match trimmed.rfind(['\\', '/']) {
            Some(pos) => &trimmed[pos + 1..],
            None => trimmed,
        };
        (!name.is_empty()).then(|| name.to_string())
    }

    fn comparison_key(&self) -> String {
        self.text()
            .chars()
            .map(|c| if c == '\\' { '/' } else { c.to_ascii_lowercase() })
            .collect()
    }
}

impl PartialEq for FilePath {
    fn eq(&self, other: &Self) -> bool {
        self.comparison_key() == other.comparison_key()
    }
}

impl Eq for FilePath {}

impl Hash for FilePath {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.comparison_key().hash(state);
    }
}

impl fmt::Display for FilePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

impl AsRef<Path> for FilePath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl AsRef<OsStr> for FilePath {
    fn as_ref(&self) -> &OsStr {
        self.0.as_os_str()
    }
}

impl From<&str> for FilePath {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for FilePath {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<PathBuf> for FilePath {
    fn from(value: PathBuf) -> Self {
        Self(value)
    }
}

impl From<&Path> for FilePath {
    fn from(value: &Path) -> Self {
        Self(value.to_path_buf())
    }
}
