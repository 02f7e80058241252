//! Error types for backup (revision history) files

use thiserror::Error;

/// Errors that can occur while reading or writing a backup file
#[derive(Error, Debug)]
pub enum BackupError {
    /// Missing or unexpected element, attribute or date
    #[error("Invalid backup file: {0}")]
    FileFormat(String),

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
}

impl From<quick_xml::events::attributes::AttrError> for BackupError {
    fn from(e: quick_xml::events::attributes::AttrError) -> Self {
        BackupError::Xml(quick_xml::Error::InvalidAttr(e))
    }
}
