//! Project management
//!
//! Handles the project tree, project files on disk (current and old format) and
//! the open-project session that drives revision commits.

mod document;
mod error;
mod events;
mod file;
mod item;
mod legacy;
mod reader;
mod writer;

pub use document::{ProjectDocument, INITIAL_COMMIT_TITLE};
pub use error::ProjectError;
pub use events::{EventHub, ProjectEvent, SubscriptionId};
pub use file::{ProjectFile, WellKnownFolder};
pub use item::{FileType, ItemKey, ItemKind, ProjectItem};
pub use legacy::{import_legacy_project, parse_legacy_project};
pub use reader::{parse_project, read_project, read_project_from, PROJECT_FORMAT_VERSION};
pub use writer::{save_project, write_project, write_project_to};
