//! # XStudio Core Library
//!
//! Core functionality for the XStudio script development environment.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//!
//! This library provides:
//! - The project tree (folders, tracked script files and project variables)
//! - Project file reading/writing, including import of the old project format
//! - Per-file revision history ("backups") with commit and retrieval
//! - Read access to the game's packed `.cat`/`.dat` virtual filesystem
//! - Background loading of game data with progress feedback
//!
//! ## Example
//!
//! ```rust,ignore
//! use xstudio_core::prelude::*;
//!
//! let mut doc = ProjectDocument::open("MyMod.xprj", BackupSettings::default())?;
//! doc.add_file("scripts/plugin.mymod.main.xml")?;
//!
//! let script = ScriptDocument::load(&XmlScriptReader, "scripts/plugin.mymod.main.xml")?;
//! doc.commit(&script, "Fix wing command")?;
//! doc.save()?;
//! ```

pub mod backup;
pub mod config;
pub mod path;
pub mod project;
pub mod script;
pub mod vfs;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::backup::{BackupFile, BackupStore, BackupType, ScriptRevision};
    pub use crate::config::{BackupSettings, GameDataConfig, GameVersion, StudioConfig};
    pub use crate::path::FilePath;
    pub use crate::project::{
        FileType, ItemKey, ProjectDocument, ProjectError, ProjectEvent, ProjectFile,
        ProjectItem,
    };
    pub use crate::script::{ScriptDocument, ScriptProperties, ScriptReader, XmlScriptReader};
    pub use crate::vfs::{CatalogReader, GameDataLoader, LoadEvent, XCatalog, XFileSystem};
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
