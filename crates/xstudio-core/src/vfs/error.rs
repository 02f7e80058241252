//! Error types for catalog and game data access

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading catalogs or building the virtual filesystem
#[derive(Error, Debug)]
pub enum CatalogError {
    /// Another handle already holds the catalog's exclusive lock
    #[error("Catalog is already locked: {0}")]
    Locked(PathBuf),

    /// A catalog record, or the data range it describes, is invalid
    #[error("Invalid catalog data at offset {offset}: {message}")]
    FileFormat {
        /// Catalog byte offset of the record, or data file offset of the entry
        offset: u64,
        /// What was wrong
        message: String,
    },

    /// No file with this virtual path
    #[error("File not found in game data: {0}")]
    NotFound(String),

    /// Loading stopped because it was cancelled
    #[error("Game data loading was cancelled")]
    Cancelled,

    /// A packed entry is not a valid PCK stream
    #[error("Failed to decompress '{path}': {message}")]
    Decompress {
        /// Virtual path of the entry
        path: String,
        /// Decoder error
        message: String,
    },

    /// Underlying file operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
