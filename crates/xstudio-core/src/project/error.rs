//! Error types for project handling

use thiserror::Error;

use crate::backup::BackupError;

/// Errors that can occur while working with a project
#[derive(Error, Debug)]
pub enum ProjectError {
    /// The caller passed something the operation cannot accept
    #[error("Invalid argument: {0}")]
    Argument(String),

    /// The operation is not allowed in the current state
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// The project file does not have the expected structure
    #[error("Invalid project file at position {position}: {message}")]
    FileFormat {
        /// Byte position in the input
        position: usize,
        /// What was wrong
        message: String,
    },

    /// An attribute holds a value outside its allowed set
    #[error("Invalid value '{value}' for '{field}'")]
    InvalidValue {
        /// Attribute name
        field: String,
        /// Value found in the file
        value: String,
    },

    /// Malformed XML
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Underlying file operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Reading or writing a file's revision history failed
    #[error("Backup error: {0}")]
    Backup(#[from] BackupError),
}

impl ProjectError {
    pub(crate) fn format(position: u64, message: impl Into<String>) -> Self {
        ProjectError::FileFormat {
            position: position as usize,
            message: message.into(),
        }
    }
}

impl From<quick_xml::events::attributes::AttrError> for ProjectError {
    fn from(e: quick_xml::events::attributes::AttrError) -> Self {
        ProjectError::Xml(quick_xml::Error::InvalidAttr(e))
    }
}
