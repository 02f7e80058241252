//! Script revision history
//!
//! Every tracked file has its own backup file holding the full list of committed
//! revisions, oldest first. Backup files live in the project's backup folder and
//! are named by the item's `backup_name`.
//!
//! ```text
//! [Project folder]/
//! ├── MyMod.xprj
//! └── Backup/
//!     ├── plugin.mymod.main.xbak
//!     └── plugin.mymod.main (2).xbak
//! ```

mod error;
mod file;
mod reader;
mod revision;
mod store;
mod writer;

pub use error::BackupError;
pub use file::{BackupFile, BackupType};
pub use reader::{parse_backup, read_backup, read_backup_from};
pub use revision::ScriptRevision;
pub use store::BackupStore;
pub use writer::{write_backup, write_backup_to};

pub use crate::script::{ScriptArgument, ScriptProperties};
