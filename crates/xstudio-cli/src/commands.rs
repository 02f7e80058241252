//! Subcommand implementations.

use std::io::{self, Write};
use std::path::Path;
use std::sync::atomic::AtomicBool;

use anyhow::{anyhow, bail, Context, Result};
use tracing::{info, warn};

use xstudio_core::config::{GameDataConfig, StudioConfig};
use xstudio_core::path::FilePath;
use xstudio_core::project::{ItemKind, ProjectDocument, ProjectItem};
use xstudio_core::script::{ScriptDocument, XmlScriptReader};
use xstudio_core::vfs::{FeedbackKind, GameDataLoader, LoadEvent, XCatalog, XFileSystem};

use crate::cli::GameArgs;

/// Load settings from `--config` or the default location
pub fn load_config(path: Option<&Path>) -> Result<StudioConfig> {
    match path {
        Some(path) => StudioConfig::load(path)
            .with_context(|| format!("load settings from {}", path.display())),
        None => match StudioConfig::load_default() {
            Ok(config) => Ok(config),
            Err(e) => {
                warn!("Using default settings: {}", e);
                Ok(StudioConfig::default())
            }
        },
    }
}

/// Put a project at the front of the recent list; settings that cannot be saved are not fatal
pub fn remember_project(config_path: Option<&Path>, config: &mut StudioConfig, project: &Path) {
    let project = std::path::absolute(project).unwrap_or_else(|_| project.to_path_buf());
    config.touch_recent_project(project);

    let target = match config_path {
        Some(path) => Ok(path.to_path_buf()),
        None => StudioConfig::default_path(),
    };
    if let Err(e) = target.and_then(|path| config.save(path)) {
        warn!("Could not update recent projects: {}", e);
    }
}

pub fn run_project_show(config: &StudioConfig, project: &Path) -> Result<()> {
    let doc = ProjectDocument::open(project, config.backup.clone())
        .with_context(|| format!("open project {}", project.display()))?;

    let mut out = io::stdout().lock();
    print_item(&mut out, doc.project().root(), 0)?;
    Ok(())
}

fn print_item(out: &mut impl Write, item: &ProjectItem, depth: usize) -> io::Result<()> {
    let indent = "  ".repeat(depth);
    match &item.kind {
        ItemKind::Folder => {
            let marker = if item.fixed { " [fixed]" } else { "" };
            writeln!(out, "{}{}/{}", indent, item.name, marker)?;
        }
        ItemKind::File {
            path,
            file_type,
            backup_name,
        } => {
            let backup = backup_name.as_deref().unwrap_or("no history");
            writeln!(out, "{}{} ({}, {}) {}", indent, item.name, file_type.as_str(), backup, path)?;
        }
        ItemKind::Variable { value } => {
            writeln!(out, "{}{} = {}", indent, item.name, value)?;
        }
    }
    for child in &item.children {
        print_item(out, child, depth + 1)?;
    }
    Ok(())
}

pub fn run_project_import(config: &StudioConfig, legacy: &Path, output: &Path) -> Result<()> {
    if output.exists() {
        bail!("{} already exists", output.display());
    }
    let mut doc = ProjectDocument::import_legacy(legacy, output, config.backup.clone())
        .with_context(|| format!("import {}", legacy.display()))?;
    doc.save().with_context(|| format!("write {}", output.display()))?;

    info!(
        "Imported '{}' with {} files",
        doc.project().name(),
        doc.project().files().len()
    );
    Ok(())
}

pub fn run_project_add(config: &StudioConfig, project: &Path, files: &[std::path::PathBuf]) -> Result<()> {
    let mut doc = if project.exists() {
        ProjectDocument::open(project, config.backup.clone())
            .with_context(|| format!("open project {}", project.display()))?
    } else {
        info!("Creating new project {}", project.display());
        ProjectDocument::new(project, config.backup.clone())
    };

    for file in files {
        let path = std::path::absolute(file).unwrap_or_else(|_| file.clone());
        if doc.add_file(path.clone())? {
            info!("Added {}", path.display());
        } else {
            warn!("{} is already part of the project", path.display());
        }
    }

    if doc.is_modified() {
        doc.save().context("save project")?;
    }
    Ok(())
}

pub fn run_history(config: &StudioConfig, project: &Path, file: &Path, show: Option<usize>) -> Result<()> {
    let doc = ProjectDocument::open(project, config.backup.clone())
        .with_context(|| format!("open project {}", project.display()))?;
    let path = tracked_path(&doc, file);
    let history = doc.revisions(&path)?;

    let mut out = io::stdout().lock();
    if let Some(n) = show {
        let revision = n
            .checked_sub(1)
            .and_then(|i| history.get(i))
            .ok_or_else(|| anyhow!("revision {} does not exist ({} revisions)", n, history.len()))?;
        out.write_all(revision.text().as_bytes())?;
        return Ok(());
    }

    if history.is_empty() {
        writeln!(out, "{} has no revisions", path)?;
        return Ok(());
    }
    for (i, revision) in history.iter().enumerate() {
        writeln!(
            out,
            "{:>4}  {}  {}",
            i + 1,
            revision.timestamp().format("%Y-%m-%d %H:%M:%S"),
            revision.title()
        )?;
    }
    Ok(())
}

pub fn run_commit(config: &StudioConfig, project: &Path, file: &Path, title: &str) -> Result<()> {
    let mut doc = ProjectDocument::open(project, config.backup.clone())
        .with_context(|| format!("open project {}", project.display()))?;
    let path = tracked_path(&doc, file);

    let script = ScriptDocument::load(&XmlScriptReader, path.clone())
        .with_context(|| format!("read {}", path))?;
    let count = doc.commit(&script, title)?;
    if doc.is_modified() {
        doc.save().context("save project")?;
    }

    info!("Committed '{}' ({} revisions)", title, count);
    Ok(())
}

/// Tracked files are stored with absolute paths; accept relative input too
fn tracked_path(doc: &ProjectDocument, file: &Path) -> FilePath {
    let given = FilePath::new(file);
    if doc.project().contains(&given) {
        return given;
    }
    std::path::absolute(file).map(FilePath::new).unwrap_or(given)
}

pub fn run_catalog_list(catalog: &Path) -> Result<()> {
    let catalog = XCatalog::open(catalog).with_context(|| format!("open {}", catalog.display()))?;

    let mut out = io::stdout().lock();
    writeln!(out, "# {} (data file {})", catalog.path().display(), catalog.data_file())?;
    for entry in catalog.get_reader()? {
        let entry = entry?;
        let flag = if entry.compressed { "pck" } else { "   " };
        writeln!(out, "{:>10} {:>10} {} {}", entry.offset, entry.length, flag, entry.path)?;
    }
    Ok(())
}

fn game_config(config: &StudioConfig, args: &GameArgs) -> Result<GameDataConfig> {
    let mut game = config.game.clone();
    if let Some(folder) = &args.game {
        game.game_folder = folder.clone();
    }
    if let Some(version) = args.version {
        game.version = version.into();
    }
    if args.no_loose_files {
        game.load_loose_files = false;
    }
    if game.game_folder.as_os_str().is_empty() {
        bail!("no game folder configured; pass --game <DIR>");
    }
    Ok(game)
}

pub fn run_vfs_load(config: &StudioConfig, args: &GameArgs) -> Result<()> {
    let game = game_config(config, args)?;
    let loader = GameDataLoader::start(game)?;

    let event = loader.wait(|feedback| {
        let tag = match feedback.kind {
            FeedbackKind::Info => "info",
            FeedbackKind::Success => " ok ",
            FeedbackKind::Failure => "FAIL",
        };
        eprintln!("[{:>3}%] {} {}", feedback.progress, tag, feedback.message);
    });

    match event {
        LoadEvent::Completed(vfs) => {
            println!("{} files in {} catalogs", vfs.len(), vfs.catalogs().len());
            Ok(())
        }
        LoadEvent::Failed(message) => Err(anyhow!("game data loading failed: {}", message)),
        LoadEvent::Cancelled => Err(anyhow!("game data loading was cancelled")),
        LoadEvent::Progress(_) => Err(anyhow!("unexpected progress event")),
    }
}

pub fn run_vfs_cat(config: &StudioConfig, path: &str, args: &GameArgs) -> Result<()> {
    let game = game_config(config, args)?;
    let vfs = XFileSystem::build(&game, &AtomicBool::new(false), |_| {}).context("load game data")?;
    let bytes = vfs.read(path)?;
    io::stdout().lock().write_all(&bytes)?;
    Ok(())
}
