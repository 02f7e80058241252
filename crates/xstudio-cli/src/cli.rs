//! CLI argument definitions.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use xstudio_core::config::GameVersion;

#[derive(Parser)]
#[command(
    name = "xstudio",
    version,
    about = "XStudio - script projects, revision history and game data",
    long_about = "Manage X-series script projects and their revision history,\n\
                  and inspect the game's packed catalog files."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// More log output (-v debug, -vv trace).
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Less log output (-q warnings only, -qq errors only).
    #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true, conflicts_with = "verbose")]
    pub quiet: u8,

    /// Settings file (default: the platform config directory).
    #[arg(long = "config", value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Inspect and edit project files.
    #[command(subcommand)]
    Project(ProjectCommand),

    /// Show the revision history of a tracked file.
    History(HistoryArgs),

    /// Commit the current content of a tracked file.
    Commit(CommitArgs),

    /// Inspect a single catalog.
    #[command(subcommand)]
    Catalog(CatalogCommand),

    /// Load the game's virtual filesystem.
    #[command(subcommand)]
    Vfs(VfsCommand),
}

#[derive(Subcommand)]
pub enum ProjectCommand {
    /// Print the project tree.
    Show {
        /// Project file.
        #[arg(value_name = "FILE")]
        project: PathBuf,
    },

    /// Convert an old-format project into the current format.
    Import {
        /// Old-format project file.
        #[arg(value_name = "LEGACY")]
        legacy: PathBuf,

        /// Where to write the converted project.
        #[arg(value_name = "OUT")]
        output: PathBuf,
    },

    /// Add files to a project (creates their initial revision).
    Add {
        /// Project file; created if it does not exist.
        #[arg(value_name = "PROJECT")]
        project: PathBuf,

        /// Files to add.
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,
    },
}

#[derive(Args)]
pub struct HistoryArgs {
    /// Project file.
    #[arg(value_name = "PROJECT")]
    pub project: PathBuf,

    /// Tracked file.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Print the text of this revision (1 = oldest).
    #[arg(long = "show", value_name = "N")]
    pub show: Option<usize>,
}

#[derive(Args)]
pub struct CommitArgs {
    /// Project file.
    #[arg(value_name = "PROJECT")]
    pub project: PathBuf,

    /// Tracked file.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Revision title.
    #[arg(short = 'm', long = "message", value_name = "TITLE")]
    pub title: String,
}

#[derive(Subcommand)]
pub enum CatalogCommand {
    /// List the entries of a `.cat` file.
    List {
        /// Catalog file.
        #[arg(value_name = "CAT")]
        catalog: PathBuf,
    },
}

#[derive(Args, Clone)]
pub struct GameArgs {
    /// Game folder (default: from settings).
    #[arg(long = "game", value_name = "DIR")]
    pub game: Option<PathBuf>,

    /// Game release (default: from settings).
    #[arg(long = "game-version", value_enum)]
    pub version: Option<GameVersionArg>,

    /// Ignore loose files in the game folder.
    #[arg(long = "no-loose-files")]
    pub no_loose_files: bool,
}

#[derive(Subcommand)]
pub enum VfsCommand {
    /// Build the virtual filesystem in the background and report progress.
    Load {
        #[command(flatten)]
        game: GameArgs,
    },

    /// Write a virtual file to stdout.
    Cat {
        /// Virtual path, e.g. `t/0001-L044.xml`.
        #[arg(value_name = "VPATH")]
        path: String,

        #[command(flatten)]
        game: GameArgs,
    },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum GameVersionArg {
    Threat,
    Reunion,
    Tc,
    Ap,
}

impl From<GameVersionArg> for GameVersion {
    fn from(value: GameVersionArg) -> Self {
        match value {
            GameVersionArg::Threat => GameVersion::Threat,
            GameVersionArg::Reunion => GameVersion::Reunion,
            GameVersionArg::Tc => GameVersion::TerranConflict,
            GameVersionArg::Ap => GameVersion::AlbionPrelude,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_commit() {
        let cli = Cli::try_parse_from(["xstudio", "-v", "commit", "Mod.xprj", "a.xml", "-m", "Fix"]).unwrap();
        assert_eq!(cli.verbose, 1);
        match cli.command {
            Command::Commit(args) => assert_eq!(args.title, "Fix"),
            _ => panic!("expected commit"),
        }
    }
}
