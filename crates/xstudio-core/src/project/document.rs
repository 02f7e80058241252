//! Open project session
//!
//! [`ProjectDocument`] ties a [`ProjectFile`] to its backup folder and drives the
//! revision workflow: the first time a file is tracked it gets an initial commit,
//! later commits read the history back, append and overwrite it.

use std::path::Path;

use super::error::ProjectError;
use super::events::{EventHub, ProjectEvent, SubscriptionId};
use super::file::{ProjectFile, WellKnownFolder};
use super::item::{FileType, ItemKey, ItemKind, ProjectItem};
use super::legacy::import_legacy_project;
use super::reader::read_project;
use super::writer::save_project;
use crate::backup::{BackupFile, BackupStore, BackupType, ScriptRevision};
use crate::config::BackupSettings;
use crate::path::FilePath;
use crate::script::{ScriptDocument, ScriptReader, XmlScriptReader};

/// Title of the revision created when a file is first tracked
pub const INITIAL_COMMIT_TITLE: &str = "Initial Commit";

/// A project open for editing
pub struct ProjectDocument {
    project: ProjectFile,
    backups: BackupStore,
    reader: Box<dyn ScriptReader>,
    modified: bool,
    events: EventHub,
}

impl ProjectDocument {
    /// Start a new, unsaved project at `path`
    pub fn new(path: impl Into<FilePath>, settings: BackupSettings) -> Self {
        let project = ProjectFile::new(path);
        let mut doc = Self::from_project(project, settings);
        doc.modified = true;
        doc
    }

    /// Open a project file
    pub fn open(path: impl Into<FilePath>, settings: BackupSettings) -> Result<Self, ProjectError> {
        let path = path.into();
        let project = read_project(&path)?;
        tracing::info!(
            "Opened project '{}' ({} files)",
            project.name(),
            project.files().len()
        );
        Ok(Self::from_project(project, settings))
    }

    /// Import a project in the old format; the result is saved to `target` by [`save`](Self::save)
    pub fn import_legacy<P: AsRef<Path>>(
        legacy: P,
        target: impl Into<FilePath>,
        settings: BackupSettings,
    ) -> Result<Self, ProjectError> {
        let project = import_legacy_project(legacy, target.into())?;
        let mut doc = Self::from_project(project, settings);
        doc.modified = true;
        Ok(doc)
    }

    /// Wrap an already-built project tree
    pub fn from_project(project: ProjectFile, settings: BackupSettings) -> Self {
        let backups = BackupStore::for_project(&project.full_path, settings);
        Self {
            project,
            backups,
            reader: Box::new(XmlScriptReader),
            modified: false,
            events: EventHub::new(),
        }
    }

    /// Replace the script reader used for commits
    pub fn with_reader<R: ScriptReader + 'static>(mut self, reader: R) -> Self {
        self.reader = Box::new(reader);
        self
    }

    /// The project tree
    pub fn project(&self) -> &ProjectFile {
        &self.project
    }

    /// Project file location
    pub fn path(&self) -> &FilePath {
        &self.project.full_path
    }

    /// Backup folder of this project
    pub fn backups(&self) -> &BackupStore {
        &self.backups
    }

    /// Whether there are unsaved changes to the tree
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Register a change listener
    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: Fn(&ProjectEvent) + Send + 'static,
    {
        self.events.subscribe(listener)
    }

    /// Remove a change listener
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    /// Write the project file in the current format
    pub fn save(&mut self) -> Result<(), ProjectError> {
        save_project(&self.project, &self.project.full_path)?;
        self.modified = false;
        tracing::info!("Saved project to {}", self.project.full_path);
        self.events.emit(ProjectEvent::Saved {
            path: self.project.full_path.clone(),
        });
        Ok(())
    }

    /// Re-read the project file from disk, discarding unsaved tree changes
    ///
    /// Listeners stay registered and receive [`ProjectEvent::Loaded`].
    pub fn reload(&mut self) -> Result<(), ProjectError> {
        self.project = read_project(&self.project.full_path)?;
        self.modified = false;
        tracing::info!(
            "Reloaded project '{}' ({} files)",
            self.project.name(),
            self.project.files().len()
        );
        self.events.emit(ProjectEvent::Loaded {
            path: self.project.full_path.clone(),
        });
        Ok(())
    }

    /// Track a file in the well-known folder for its type
    ///
    /// Returns `false` if the file is already tracked. A failed initial commit is
    /// logged; the file stays in the project without history.
    pub fn add_file(&mut self, path: impl Into<FilePath>) -> Result<bool, ProjectError> {
        let path = path.into();
        if self.project.contains(&path) {
            return Ok(false);
        }

        let file_type = FileType::identify(&path);
        self.project.add_file(path.clone(), file_type)?;
        self.modified = true;

        let parent = ItemKey::Folder(WellKnownFolder::for_file_type(file_type).name().to_string());
        self.emit_snapshot(&ItemKey::File(path.clone()), parent, false);

        if let Err(e) = self.initial_commit(&path) {
            tracing::warn!("Initial commit of {} failed: {}", path, e);
        }
        Ok(true)
    }

    /// Add a sub-folder to the folder named `parent`
    pub fn add_folder(&mut self, parent: &str, name: &str) -> Result<(), ProjectError> {
        let item = self.project.add_folder(parent, name)?.clone();
        self.modified = true;
        self.events.emit(ProjectEvent::ItemAdded {
            item,
            parent: ItemKey::Folder(parent.to_string()),
        });
        Ok(())
    }

    /// Create or update a project variable
    pub fn set_variable(&mut self, name: &str, value: i32) -> Result<(), ProjectError> {
        let created = self.project.set_variable(name, value)?;
        self.modified = true;
        let root = self.project.root().key();
        self.emit_snapshot(&ItemKey::Variable(name.to_string()), root, !created);
        Ok(())
    }

    /// Remove a node and its subtree
    ///
    /// Backup files of removed items are left on disk.
    pub fn remove(&mut self, key: &ItemKey) -> Result<ProjectItem, ProjectError> {
        let parent = self.project.find_parent(key).map(ProjectItem::key);
        let item = self.project.remove(key)?;
        self.modified = true;
        if let Some(parent) = parent {
            self.events.emit(ProjectEvent::ItemRemoved {
                item: item.clone(),
                parent,
            });
        }
        Ok(item)
    }

    /// Rename a node
    pub fn rename(&mut self, key: &ItemKey, new_name: &str) -> Result<(), ProjectError> {
        let parent = self
            .project
            .find_parent(key)
            .map(ProjectItem::key)
            .ok_or_else(|| ProjectError::Argument(format!("{} is not in the project", key)))?;
        self.project.rename(key, new_name)?;
        self.modified = true;

        let renamed = match key {
            ItemKey::Folder(_) => ItemKey::Folder(new_name.trim().to_string()),
            ItemKey::Variable(_) => ItemKey::Variable(new_name.trim().to_string()),
            ItemKey::File(path) => ItemKey::File(path.clone()),
        };
        self.emit_snapshot(&renamed, parent, true);
        Ok(())
    }

    /// Create the history of a tracked file with its current on-disk content
    ///
    /// Fails with `InvalidOperation` if the file already has a history.
    pub fn initial_commit(&mut self, path: &FilePath) -> Result<(), ProjectError> {
        let item = self.tracked(path)?;
        if let Some(existing) = item.backup_name() {
            return Err(ProjectError::InvalidOperation(format!(
                "'{}' already has a history in {}",
                path, existing
            )));
        }
        let (item_name, file_type) = (item.name.clone(), item.file_type().unwrap_or_default());

        let content = self.reader.read(path)?;
        let text = content.text.replace('\u{b}', "\n");
        let revision = ScriptRevision::new(INITIAL_COMMIT_TITLE, path.clone(), text, content.properties);

        self.start_history(path, &item_name, file_type, revision)?;
        Ok(())
    }

    /// Commit the current state of an open script
    ///
    /// Returns the number of revisions in the file's history afterwards.
    pub fn commit(&mut self, script: &ScriptDocument, title: &str) -> Result<usize, ProjectError> {
        let item = self.tracked(&script.path)?;
        let (item_name, file_type) = (item.name.clone(), item.file_type().unwrap_or_default());
        let backup_name = item.backup_name().map(str::to_string);

        let revision = ScriptRevision::new(
            title,
            script.path.clone(),
            script.revision_text(),
            script.properties.clone(),
        );

        let count = match backup_name {
            Some(name) => {
                let mut history = self.backups.load(&name)?;
                history.commit(revision);
                self.backups.save(&name, &history)?;
                history.len()
            }
            None => self.start_history(&script.path, &item_name, file_type, revision)?,
        };

        self.events.emit(ProjectEvent::Committed {
            path: script.path.clone(),
            title: title.to_string(),
            revisions: count,
        });
        Ok(count)
    }

    /// Revision history of a tracked file; empty if it was never committed
    pub fn revisions(&self, path: &FilePath) -> Result<BackupFile, ProjectError> {
        let item = self.tracked(path)?;
        match item.backup_name() {
            Some(name) => Ok(self.backups.load(name)?),
            None => Ok(BackupFile::new(backup_type_for(item.file_type().unwrap_or_default()))),
        }
    }

    fn tracked(&self, path: &FilePath) -> Result<&ProjectItem, ProjectError> {
        self.project
            .find(path)
            .ok_or_else(|| ProjectError::Argument(format!("'{}' is not part of the project", path)))
    }

    /// Write a fresh history and assign its backup name to the item
    fn start_history(
        &mut self,
        path: &FilePath,
        item_name: &str,
        file_type: FileType,
        revision: ScriptRevision,
    ) -> Result<usize, ProjectError> {
        let name = self.backups.generate_name(item_name);
        let mut history = BackupFile::new(backup_type_for(file_type));
        history.commit(revision);
        self.backups.save(&name, &history)?;

        if let Some(item) = self.project.find_mut(path) {
            if let ItemKind::File { backup_name, .. } = &mut item.kind {
                *backup_name = Some(name.clone());
            }
        }
        self.modified = true;
        tracing::debug!("Started history {} for {}", name, path);

        if let Some(parent) = self.project.find_parent(&ItemKey::File(path.clone())).map(ProjectItem::key) {
            self.emit_snapshot(&ItemKey::File(path.clone()), parent, true);
        }
        Ok(history.len())
    }

    fn emit_snapshot(&self, key: &ItemKey, parent: ItemKey, changed: bool) {
        let Some(item) = self.project.find_key(key).cloned() else {
            return;
        };
        let event = if changed {
            ProjectEvent::ItemChanged { item, parent }
        } else {
            ProjectEvent::ItemAdded { item, parent }
        };
        self.events.emit(event);
    }
}

impl std::fmt::Debug for ProjectDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectDocument")
            .field("project", &self.project.full_path)
            .field("backups", &self.backups.folder())
            .field("modified", &self.modified)
            .field("events", &self.events)
            .finish()
    }
}

fn backup_type_for(file_type: FileType) -> BackupType {
    match file_type {
        FileType::Mission => BackupType::MissionDirector,
        _ => BackupType::Msci,
    }
}
