//! Game data access
//!
//! Reads the game's packed `.cat`/`.dat` archives and merges them, together with
//! loose files, into one virtual filesystem.

pub mod crypto;

mod catalog;
mod error;
mod filesystem;
mod loader;
mod reader;

pub use catalog::{catalog_index, XCatalog};
pub use error::CatalogError;
pub use filesystem::{
    FeedbackKind, FileSource, LoadFeedback, LoadOperation, XFileInfo, XFileSystem, LOOSE_FOLDERS,
};
pub use loader::{GameDataLoader, LoadEvent};
pub use reader::{CatalogEntry, CatalogReader};
