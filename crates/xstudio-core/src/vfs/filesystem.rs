//! The game's virtual filesystem
//!
//! Merges every catalog in load order (later catalogs override earlier ones),
//! then lets loose files in the game folder override catalog entries. All
//! catalogs stay open, and locked, for as long as the filesystem exists.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use super::catalog::{catalog_index, XCatalog};
use super::error::CatalogError;
use crate::config::GameDataConfig;

/// Folders that may hold loose files overriding catalog content
pub const LOOSE_FOLDERS: [&str; 4] = ["t", "scripts", "director", "types"];

/// Where a virtual file's bytes live
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileSource {
    /// Stored in a data file
    Catalog {
        /// Position of the catalog in [`XFileSystem::catalogs`]
        catalog: usize,
        /// Byte offset in the data file
        offset: u64,
        /// Stored size
        length: u64,
        /// PCK payload
        compressed: bool,
    },
    /// A plain file on disk
    Physical(PathBuf),
}

/// A file in the virtual filesystem
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XFileInfo {
    /// Virtual path, `/` separated, as first seen
    pub virtual_path: String,
    /// Backing storage
    pub source: FileSource,
}

impl XFileInfo {
    /// Whether the bytes are a PCK stream
    pub fn is_compressed(&self) -> bool {
        match &self.source {
            FileSource::Catalog { compressed, .. } => *compressed,
            FileSource::Physical(path) => path
                .extension()
                .is_some_and(|e| e.eq_ignore_ascii_case("pck")),
        }
    }

    /// Whether the file is a loose file rather than a catalog entry
    pub fn is_physical(&self) -> bool {
        matches!(self.source, FileSource::Physical(_))
    }

    /// File name part of the virtual path
    pub fn file_name(&self) -> &str {
        self.virtual_path
            .rsplit('/')
            .next()
            .unwrap_or(&self.virtual_path)
    }
}

/// What a progress report is about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOperation {
    /// Looking for catalogs in the data folders
    FindCatalogs,
    /// Reading one catalog's entry table
    LoadCatalog,
    /// Scanning loose files
    LoadLooseFiles,
    /// Finished building
    Complete,
}

/// Outcome class of a progress report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackKind {
    /// Informational step
    Info,
    /// A step completed
    Success,
    /// Loading failed
    Failure,
}

/// Progress report produced while building an [`XFileSystem`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadFeedback {
    /// Step being reported
    pub operation: LoadOperation,
    /// Percentage, 0 to 100
    pub progress: u8,
    /// Outcome class
    pub kind: FeedbackKind,
    /// Human-readable text
    pub message: String,
}

impl LoadFeedback {
    pub(crate) fn new(operation: LoadOperation, progress: u8, kind: FeedbackKind, message: impl Into<String>) -> Self {
        Self {
            operation,
            progress: progress.min(100),
            kind,
            message: message.into(),
        }
    }
}

/// Read-only view of the game data
#[derive(Debug)]
pub struct XFileSystem {
    game_folder: PathBuf,
    catalogs: Vec<XCatalog>,
    files: BTreeMap<String, XFileInfo>,
}

impl XFileSystem {
    /// Open every catalog of the configured game and index their entries
    ///
    /// `cancel` is polled between catalog entries. On any error the catalogs
    /// opened so far are released and nothing is returned.
    pub fn build<F>(config: &GameDataConfig, cancel: &AtomicBool, mut progress: F) -> Result<Self, CatalogError>
    where
        F: FnMut(LoadFeedback),
    {
        if !config.game_folder.is_dir() {
            return Err(CatalogError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("game folder not found: {}", config.game_folder.display()),
            )));
        }

        progress(LoadFeedback::new(
            LoadOperation::FindCatalogs,
            0,
            FeedbackKind::Info,
            format!("Searching {} data in {}", config.version.name(), config.game_folder.display()),
        ));

        let mut catalog_paths = Vec::new();
        for folder in config.version.data_folders() {
            catalog_paths.extend(find_catalogs(&config.game_folder.join(folder))?);
        }

        let mut vfs = Self {
            game_folder: config.game_folder.clone(),
            catalogs: Vec::with_capacity(catalog_paths.len()),
            files: BTreeMap::new(),
        };

        let total = catalog_paths.len().max(1);
        for (n, path) in catalog_paths.iter().enumerate() {
            check_cancel(cancel)?;
            let catalog = XCatalog::open(path)?;
            let position = vfs.catalogs.len();

            let mut count = 0usize;
            for entry in catalog.get_reader()? {
                check_cancel(cancel)?;
                let entry = entry?;
                vfs.insert(
                    &entry.path,
                    FileSource::Catalog {
                        catalog: position,
                        offset: entry.offset,
                        length: entry.length,
                        compressed: entry.compressed,
                    },
                );
                count += 1;
            }
            vfs.catalogs.push(catalog);

            progress(LoadFeedback::new(
                LoadOperation::LoadCatalog,
                ((n + 1) * 90 / total) as u8,
                FeedbackKind::Success,
                format!("Loaded {} ({} files)", path.display(), count),
            ));
        }

        if config.load_loose_files {
            check_cancel(cancel)?;
            let loose = vfs.add_loose_files(cancel)?;
            progress(LoadFeedback::new(
                LoadOperation::LoadLooseFiles,
                95,
                FeedbackKind::Info,
                format!("Found {} loose files", loose),
            ));
        }

        tracing::info!(
            "Game data ready: {} catalogs, {} files",
            vfs.catalogs.len(),
            vfs.files.len()
        );
        progress(LoadFeedback::new(
            LoadOperation::Complete,
            100,
            FeedbackKind::Success,
            format!("Loaded {} files from {} catalogs", vfs.files.len(), vfs.catalogs.len()),
        ));
        Ok(vfs)
    }

    fn insert(&mut self, virtual_path: &str, source: FileSource) {
        let key = normalize(virtual_path);
        let virtual_path = key_display(virtual_path);
        self.files.insert(key, XFileInfo { virtual_path, source });
    }

    fn add_loose_files(&mut self, cancel: &AtomicBool) -> Result<usize, CatalogError> {
        let mut found = Vec::new();
        for folder in LOOSE_FOLDERS {
            let dir = self.game_folder.join(folder);
            if dir.is_dir() {
                collect_files(&dir, &mut found);
            }
        }

        let mut count = 0;
        for path in found {
            check_cancel(cancel)?;
            let Ok(relative) = path.strip_prefix(&self.game_folder) else {
                continue;
            };
            let Some(relative) = relative.to_str() else {
                tracing::warn!("Skipping loose file with non UTF-8 name: {}", path.display());
                continue;
            };
            let relative = relative.to_string();
            self.insert(&relative, FileSource::Physical(path));
            count += 1;
        }
        Ok(count)
    }

    /// Game folder the filesystem was built from
    pub fn game_folder(&self) -> &Path {
        &self.game_folder
    }

    /// Whether a virtual path exists
    pub fn contains(&self, virtual_path: &str) -> bool {
        self.find(virtual_path).is_some()
    }

    /// Look up a virtual path
    ///
    /// A `.xml` or `.txt` path also matches its packed `.pck` twin.
    pub fn find(&self, virtual_path: &str) -> Option<&XFileInfo> {
        let key = normalize(virtual_path);
        self.files.get(&key).or_else(|| {
            let (stem, ext) = key.rsplit_once('.')?;
            if ext == "pck" {
                return None;
            }
            self.files.get(&format!("{}.pck", stem))
        })
    }

    /// Read a file's content, decrypted and unpacked
    pub fn read(&self, virtual_path: &str) -> Result<Vec<u8>, CatalogError> {
        let info = self
            .find(virtual_path)
            .ok_or_else(|| CatalogError::NotFound(virtual_path.to_string()))?;

        match &info.source {
            FileSource::Catalog {
                catalog,
                offset,
                length,
                compressed,
            } => {
                let catalog = self
                    .catalogs
                    .get(*catalog)
                    .ok_or_else(|| CatalogError::NotFound(virtual_path.to_string()))?;
                catalog.read_range(&info.virtual_path, *offset, *length, *compressed)
            }
            FileSource::Physical(path) => {
                let bytes = fs::read(path)?;
                if !info.is_compressed() {
                    return Ok(bytes);
                }
                super::crypto::decode_pck(&bytes).map_err(|e| CatalogError::Decompress {
                    path: info.virtual_path.clone(),
                    message: e.to_string(),
                })
            }
        }
    }

    /// Read a text file; non UTF-8 content is treated as ISO-8859-1
    pub fn read_to_string(&self, virtual_path: &str) -> Result<String, CatalogError> {
        let bytes = self.read(virtual_path)?;
        Ok(match String::from_utf8(bytes) {
            Ok(s) => s,
            Err(e) => e.into_bytes().iter().map(|&b| b as char).collect(),
        })
    }

    /// Files directly inside a virtual folder, in path order
    pub fn files_in(&self, folder: &str) -> Vec<&XFileInfo> {
        let mut prefix = normalize(folder);
        if !prefix.is_empty() && !prefix.ends_with('/') {
            prefix.push('/');
        }
        self.files
            .range(prefix.clone()..)
            .take_while(|(key, _)| key.starts_with(&prefix))
            .filter(|(key, _)| !key[prefix.len()..].contains('/'))
            .map(|(_, info)| info)
            .collect()
    }

    /// Every file, in path order
    pub fn iter(&self) -> impl Iterator<Item = &XFileInfo> {
        self.files.values()
    }

    /// Open catalogs in load order
    pub fn catalogs(&self) -> &[XCatalog] {
        &self.catalogs
    }

    /// Number of files
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether no files were found
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

fn check_cancel(cancel: &AtomicBool) -> Result<(), CatalogError> {
    if cancel.load(Ordering::SeqCst) {
        return Err(CatalogError::Cancelled);
    }
    Ok(())
}

/// `NN.cat` files of one folder in ascending numeric order; a missing folder has none
fn find_catalogs(folder: &Path) -> Result<Vec<PathBuf>, CatalogError> {
    if !folder.is_dir() {
        return Ok(Vec::new());
    }
    let mut catalogs: Vec<(u32, PathBuf)> = fs::read_dir(folder)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file()
                && path.extension().is_some_and(|e| e.eq_ignore_ascii_case("cat"))
                && path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .is_some_and(|s| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()))
        })
        .map(|path| (catalog_index(&path), path))
        .collect();
    catalogs.sort();
    Ok(catalogs.into_iter().map(|(_, path)| path).collect())
}

fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!("Cannot read {}: {}", dir.display(), e);
            return;
        }
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_files(&path, out);
        } else {
            out.push(path);
        }
    }
}

/// Lookup key: lower case, `/` separated, no leading separator
fn normalize(path: &str) -> String {
    key_display(path).to_lowercase()
}

fn key_display(path: &str) -> String {
    path.replace('\\', "/").trim_start_matches('/').to_string()
}
