//! A single committed revision of a script

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::path::FilePath;
use crate::script::ScriptProperties;

/// Immutable snapshot of a script at commit time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptRevision {
    title: String,
    path: FilePath,
    text: String,
    properties: ScriptProperties,
    timestamp: DateTime<Utc>,
}

impl ScriptRevision {
    /// Create a revision stamped with the current time
    ///
    /// `text` is stored as given; soft line breaks must already be converted.
    pub fn new(
        title: impl Into<String>,
        path: impl Into<FilePath>,
        text: impl Into<String>,
        properties: ScriptProperties,
    ) -> Self {
        // Whole seconds, so the stamp survives an RFC 3339 round trip unchanged
        Self::with_timestamp(title, path, text, properties, Utc::now().trunc_subsecs(0))
    }

    /// Create a revision with an explicit timestamp (used when loading)
    pub fn with_timestamp(
        title: impl Into<String>,
        path: impl Into<FilePath>,
        text: impl Into<String>,
        properties: ScriptProperties,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            title: title.into(),
            path: path.into(),
            text: text.into(),
            properties,
            timestamp,
        }
    }

    /// Commit title
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Path of the script when it was committed
    pub fn path(&self) -> &FilePath {
        &self.path
    }

    /// Full script text
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Compiled header at commit time
    pub fn properties(&self) -> &ScriptProperties {
        &self.properties
    }

    /// Commit time
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}
