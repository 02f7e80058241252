//! Project file model
//!
//! A [`ProjectFile`] owns the root folder of the tree. The root is always a fixed
//! folder and always holds the four well-known folders that files are sorted into
//! by type.

use serde::{Deserialize, Serialize};

use super::error::ProjectError;
use super::item::{FileType, ItemKey, ProjectItem};
use crate::path::FilePath;

/// The built-in top-level folders, in display order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WellKnownFolder {
    /// MSCI scripts
    Scripts,
    /// Language files
    Language,
    /// Mission director scripts
    Mission,
    /// Everything else
    Other,
}

impl WellKnownFolder {
    /// All well-known folders in display order
    pub const ALL: [WellKnownFolder; 4] = [
        WellKnownFolder::Scripts,
        WellKnownFolder::Language,
        WellKnownFolder::Mission,
        WellKnownFolder::Other,
    ];

    /// Folder name as shown in the tree
    pub fn name(&self) -> &'static str {
        match self {
            WellKnownFolder::Scripts => "MSCI Scripts",
            WellKnownFolder::Language => "Language Files",
            WellKnownFolder::Mission => "Mission Scripts",
            WellKnownFolder::Other => "Other Files",
        }
    }

    /// Folder that files of `file_type` are placed in
    pub fn for_file_type(file_type: FileType) -> Self {
        match file_type {
            FileType::Script => WellKnownFolder::Scripts,
            FileType::Language => WellKnownFolder::Language,
            FileType::Mission => WellKnownFolder::Mission,
            FileType::Unknown => WellKnownFolder::Other,
        }
    }

    /// Whether `name` is one of the well-known folder names
    pub fn is_well_known(name: &str) -> bool {
        Self::ALL.iter().any(|f| f.name() == name)
    }
}

/// A project: its location and its item tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectFile {
    /// Where the project file lives
    pub full_path: FilePath,
    root: ProjectItem,
}

impl ProjectFile {
    /// Create an empty project with the well-known folders
    pub fn new(full_path: impl Into<FilePath>) -> Self {
        let full_path = full_path.into();
        let root = ProjectItem::folder(full_path.stem(), true);
        Self::with_root(full_path, root)
    }

    /// Wrap an existing root, adding any missing well-known folders
    pub fn with_root(full_path: impl Into<FilePath>, mut root: ProjectItem) -> Self {
        root.fixed = true;
        let mut project = Self {
            full_path: full_path.into(),
            root,
        };
        project.ensure_well_known_folders();
        project
    }

    /// Project display name (the root folder's name)
    pub fn name(&self) -> &str {
        &self.root.name
    }

    /// Root folder
    pub fn root(&self) -> &ProjectItem {
        &self.root
    }

    /// Mutable root folder
    pub fn root_mut(&mut self) -> &mut ProjectItem {
        &mut self.root
    }

    /// Make sure every well-known folder exists directly under the root and is fixed
    pub fn ensure_well_known_folders(&mut self) {
        for folder in WellKnownFolder::ALL {
            match self
                .root
                .children
                .iter_mut()
                .find(|c| c.is_folder() && c.name == folder.name())
            {
                Some(existing) => existing.fixed = true,
                None => self.root.children.push(ProjectItem::folder(folder.name(), true)),
            }
        }
    }

    /// The well-known folder for a file type
    pub fn folder_for(&self, file_type: FileType) -> Option<&ProjectItem> {
        let name = WellKnownFolder::for_file_type(file_type).name();
        self.root
            .children
            .iter()
            .find(|c| c.is_folder() && c.name == name)
    }

    fn folder_for_mut(&mut self, file_type: FileType) -> &mut ProjectItem {
        self.ensure_well_known_folders();
        let name = WellKnownFolder::for_file_type(file_type).name();
        let index = self
            .root
            .children
            .iter()
            .position(|c| c.is_folder() && c.name == name)
            .unwrap_or(0);
        &mut self.root.children[index]
    }

    /// Add a file to the well-known folder for its type
    ///
    /// Returns `false` without changing anything if the path is already tracked.
    pub fn add_file(&mut self, path: impl Into<FilePath>, file_type: FileType) -> Result<bool, ProjectError> {
        let path = path.into();
        if path.is_empty() {
            return Err(ProjectError::Argument("file path cannot be empty".to_string()));
        }
        if self.contains(&path) {
            return Ok(false);
        }
        self.folder_for_mut(file_type)
            .add(ProjectItem::file(path, file_type))?;
        Ok(true)
    }

    /// Add a file below a specific folder
    ///
    /// Returns `false` without changing anything if the path is already tracked.
    pub fn add_file_to(&mut self, folder: &str, path: impl Into<FilePath>, file_type: FileType) -> Result<bool, ProjectError> {
        let path = path.into();
        if self.contains(&path) {
            return Ok(false);
        }
        let parent = self
            .root
            .find_folder_mut(folder)
            .ok_or_else(|| ProjectError::Argument(format!("no folder named '{}'", folder)))?;
        parent.add(ProjectItem::file(path, file_type))?;
        Ok(true)
    }

    /// Add a sub-folder to the folder named `parent`
    ///
    /// Folder names are unique across the whole project, so a [`ItemKey::Folder`]
    /// always names one node and well-known folders cannot be shadowed.
    pub fn add_folder(&mut self, parent: &str, name: &str) -> Result<&mut ProjectItem, ProjectError> {
        let name = name.trim();
        self.check_folder_name(name)?;
        let parent = self
            .root
            .find_folder_mut(parent)
            .ok_or_else(|| ProjectError::Argument(format!("no folder named '{}'", parent)))?;
        parent.add(ProjectItem::folder(name, false))
    }

    fn check_folder_name(&self, name: &str) -> Result<(), ProjectError> {
        if name.is_empty() {
            return Err(ProjectError::Argument("folder name cannot be empty".to_string()));
        }
        if WellKnownFolder::is_well_known(name) || self.root.find_folder(name).is_some() {
            return Err(ProjectError::Argument(format!(
                "the project already has a folder named '{}'",
                name
            )));
        }
        Ok(())
    }

    /// Add or update a project variable under the root
    ///
    /// Returns `true` if a new variable was created.
    pub fn set_variable(&mut self, name: &str, value: i32) -> Result<bool, ProjectError> {
        let key = ItemKey::Variable(name.to_string());
        if let Some(existing) = self.root.find_key_mut(&key) {
            existing.kind = super::item::ItemKind::Variable { value };
            return Ok(false);
        }
        if name.trim().is_empty() {
            return Err(ProjectError::Argument("variable name cannot be empty".to_string()));
        }
        self.root.add(ProjectItem::variable(name, value))?;
        Ok(true)
    }

    /// All variables in the project, in tree order
    pub fn variables(&self) -> Vec<(&str, i32)> {
        self.root
            .to_list()
            .into_iter()
            .filter_map(|item| item.value().map(|v| (item.name.as_str(), v)))
            .collect()
    }

    /// Remove the node matching `key`
    pub fn remove(&mut self, key: &ItemKey) -> Result<ProjectItem, ProjectError> {
        self.root.remove(key)
    }

    /// Find a file item by full path
    pub fn find(&self, path: &FilePath) -> Option<&ProjectItem> {
        self.root.find(path)
    }

    /// Mutable variant of [`find`](Self::find)
    pub fn find_mut(&mut self, path: &FilePath) -> Option<&mut ProjectItem> {
        self.root.find_mut(path)
    }

    /// Find a folder by exact name
    pub fn find_folder(&self, name: &str) -> Option<&ProjectItem> {
        self.root.find_folder(name)
    }

    /// Find any node by key
    pub fn find_key(&self, key: &ItemKey) -> Option<&ProjectItem> {
        self.root.find_key(key)
    }

    /// Parent of the node matching `key`
    pub fn find_parent(&self, key: &ItemKey) -> Option<&ProjectItem> {
        self.root.find_parent(key)
    }

    /// Whether a file is tracked
    pub fn contains(&self, path: &FilePath) -> bool {
        self.root.contains(path)
    }

    /// Every node, depth-first pre-order, starting with the root
    pub fn to_list(&self) -> Vec<&ProjectItem> {
        self.root.to_list()
    }

    /// Every tracked file, in tree order
    pub fn files(&self) -> Vec<&ProjectItem> {
        self.root.files()
    }

    /// Rename the node matching `key`
    pub fn rename(&mut self, key: &ItemKey, new_name: &str) -> Result<(), ProjectError> {
        if self.root.matches(key) {
            return Err(ProjectError::InvalidOperation(
                "the project root cannot be renamed".to_string(),
            ));
        }
        if let ItemKey::Folder(current) = key {
            let new_name = new_name.trim();
            if new_name != current {
                self.check_folder_name(new_name)?;
            }
        }
        let parent_key = self
            .root
            .find_parent(key)
            .map(ProjectItem::key)
            .ok_or_else(|| ProjectError::Argument(format!("{} is not in the project", key)))?;
        let parent = self
            .root
            .find_key_mut(&parent_key)
            .ok_or_else(|| ProjectError::Argument(format!("{} is not in the project", key)))?;
        parent.rename_child(key, new_name)
    }
}
