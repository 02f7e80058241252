//! Project tree nodes
//!
//! A project is a rooted tree of folders, tracked files and integer variables.
//! Every node shares the same navigation fields (`name`, `fixed`, `children`) and
//! carries a per-kind payload in [`ItemKind`].
//!
//! Trees are small (tens to a few hundred items), so lookups are plain
//! depth-first searches in display order.

use quick_xml::events::Event;
use quick_xml::Reader;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};

use super::error::ProjectError;
use crate::path::FilePath;

/// Kind of content held by a tracked file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileType {
    /// MSCI script
    Script,
    /// Language (text page) file
    Language,
    /// Mission director file
    Mission,
    /// Anything else
    #[default]
    Unknown,
}

impl FileType {
    /// Identifier used in project files
    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Script => "script",
            FileType::Language => "language",
            FileType::Mission => "mission",
            FileType::Unknown => "unknown",
        }
    }

    /// Parse a project file identifier
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "script" => Some(FileType::Script),
            "language" => Some(FileType::Language),
            "mission" => Some(FileType::Mission),
            "unknown" => Some(FileType::Unknown),
            _ => None,
        }
    }

    /// Identify a file by the root element of its XML content
    ///
    /// Unreadable and non-XML files are [`FileType::Unknown`].
    pub fn identify(path: &FilePath) -> Self {
        let Ok(file) = File::open(path) else {
            return FileType::Unknown;
        };
        // The root element is always near the top; don't read huge scripts
        let mut head = Vec::new();
        if BufReader::new(file).take(4096).read_to_end(&mut head).is_err() {
            return FileType::Unknown;
        }
        Self::from_root_element(&String::from_utf8_lossy(&head))
    }

    fn from_root_element(xml: &str) -> Self {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);
        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                    return match e.name().as_ref() {
                        b"script" => FileType::Script,
                        b"language" => FileType::Language,
                        b"director" => FileType::Mission,
                        _ => FileType::Unknown,
                    };
                }
                Ok(Event::Eof) | Err(_) => return FileType::Unknown,
                _ => {}
            }
        }
    }
}

/// Per-kind payload of a project item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemKind {
    /// A folder; the only kind that holds children
    Folder,
    /// A tracked file
    File {
        /// Full path of the file on disk
        path: FilePath,
        /// Content type
        file_type: FileType,
        /// Backup file name, assigned by the first commit
        backup_name: Option<String>,
    },
    /// An integer project variable
    Variable {
        /// Current value
        value: i32,
    },
}

/// Identifies a node without holding a reference into the tree
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemKey {
    /// Folder by name; [`ProjectFile`](super::ProjectFile) keeps folder names unique
    Folder(String),
    /// File by full path
    File(FilePath),
    /// Variable by name
    Variable(String),
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemKey::Folder(name) => write!(f, "folder '{}'", name),
            ItemKey::File(path) => write!(f, "file '{}'", path),
            ItemKey::Variable(name) => write!(f, "variable '{}'", name),
        }
    }
}

/// A node in the project tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectItem {
    /// Display name
    pub name: String,
    /// Built-in node that cannot be removed or renamed
    pub fixed: bool,
    /// Child nodes, in display order
    pub children: Vec<ProjectItem>,
    /// Kind-specific data
    pub kind: ItemKind,
}

impl ProjectItem {
    /// Create a folder
    pub fn folder(name: impl Into<String>, fixed: bool) -> Self {
        Self {
            name: name.into(),
            fixed,
            children: Vec::new(),
            kind: ItemKind::Folder,
        }
    }

    /// Create a file item named after the file
    pub fn file(path: impl Into<FilePath>, file_type: FileType) -> Self {
        let path = path.into();
        Self {
            name: path.file_name(),
            fixed: false,
            children: Vec::new(),
            kind: ItemKind::File {
                path,
                file_type,
                backup_name: None,
            },
        }
    }

    /// Create a variable
    pub fn variable(name: impl Into<String>, value: i32) -> Self {
        Self {
            name: name.into(),
            fixed: false,
            children: Vec::new(),
            kind: ItemKind::Variable { value },
        }
    }

    /// Whether this is a folder
    pub fn is_folder(&self) -> bool {
        matches!(self.kind, ItemKind::Folder)
    }

    /// Full path, for file items
    pub fn full_path(&self) -> Option<&FilePath> {
        match &self.kind {
            ItemKind::File { path, .. } => Some(path),
            _ => None,
        }
    }

    /// File type, for file items
    pub fn file_type(&self) -> Option<FileType> {
        match &self.kind {
            ItemKind::File { file_type, .. } => Some(*file_type),
            _ => None,
        }
    }

    /// Backup file name, for file items that have been committed
    pub fn backup_name(&self) -> Option<&str> {
        match &self.kind {
            ItemKind::File { backup_name, .. } => backup_name.as_deref(),
            _ => None,
        }
    }

    /// Value, for variables
    pub fn value(&self) -> Option<i32> {
        match self.kind {
            ItemKind::Variable { value } => Some(value),
            _ => None,
        }
    }

    /// Key identifying this node
    pub fn key(&self) -> ItemKey {
        match &self.kind {
            ItemKind::Folder => ItemKey::Folder(self.name.clone()),
            ItemKind::File { path, .. } => ItemKey::File(path.clone()),
            ItemKind::Variable { .. } => ItemKey::Variable(self.name.clone()),
        }
    }

    /// Whether this node is identified by `key`
    pub fn matches(&self, key: &ItemKey) -> bool {
        match (&self.kind, key) {
            (ItemKind::Folder, ItemKey::Folder(name)) => &self.name == name,
            (ItemKind::File { path, .. }, ItemKey::File(wanted)) => path == wanted,
            (ItemKind::Variable { .. }, ItemKey::Variable(name)) => &self.name == name,
            _ => false,
        }
    }

    /// Add a copy of `item` as the last child and return the stored copy
    ///
    /// No uniqueness check is made; callers check [`contains`](Self::contains) first.
    pub fn add(&mut self, item: ProjectItem) -> Result<&mut ProjectItem, ProjectError> {
        if !self.is_folder() {
            return Err(ProjectError::InvalidOperation(format!(
                "cannot add children to {}",
                self.key()
            )));
        }
        self.children.push(item);
        let last = self.children.len() - 1;
        Ok(&mut self.children[last])
    }

    /// Detach the first node matching `key` from this subtree and return it
    ///
    /// Fixed nodes (including `self`) cannot be removed; the tree is left unchanged.
    pub fn remove(&mut self, key: &ItemKey) -> Result<ProjectItem, ProjectError> {
        if self.matches(key) {
            return Err(fixed_or_root(self));
        }
        match self.remove_descendant(key) {
            Some(result) => result,
            None => Err(ProjectError::Argument(format!("{} is not in the project", key))),
        }
    }

    fn remove_descendant(&mut self, key: &ItemKey) -> Option<Result<ProjectItem, ProjectError>> {
        if let Some(index) = self.children.iter().position(|c| c.matches(key)) {
            if self.children[index].fixed {
                return Some(Err(fixed_or_root(&self.children[index])));
            }
            return Some(Ok(self.children.remove(index)));
        }
        self.children
            .iter_mut()
            .find_map(|child| child.remove_descendant(key))
    }

    /// Find the first file item with the given full path
    pub fn find(&self, path: &FilePath) -> Option<&ProjectItem> {
        if self.full_path() == Some(path) {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(path))
    }

    /// Mutable variant of [`find`](Self::find)
    pub fn find_mut(&mut self, path: &FilePath) -> Option<&mut ProjectItem> {
        if self.full_path() == Some(path) {
            return Some(self);
        }
        self.children.iter_mut().find_map(|c| c.find_mut(path))
    }

    /// Find the first folder with exactly this name
    pub fn find_folder(&self, name: &str) -> Option<&ProjectItem> {
        if self.is_folder() && self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find_folder(name))
    }

    /// Mutable variant of [`find_folder`](Self::find_folder)
    pub fn find_folder_mut(&mut self, name: &str) -> Option<&mut ProjectItem> {
        if self.is_folder() && self.name == name {
            return Some(self);
        }
        self.children
            .iter_mut()
            .find_map(|c| c.find_folder_mut(name))
    }

    /// Find the first node matching `key`
    pub fn find_key(&self, key: &ItemKey) -> Option<&ProjectItem> {
        if self.matches(key) {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find_key(key))
    }

    /// Mutable variant of [`find_key`](Self::find_key)
    pub fn find_key_mut(&mut self, key: &ItemKey) -> Option<&mut ProjectItem> {
        if self.matches(key) {
            return Some(self);
        }
        self.children.iter_mut().find_map(|c| c.find_key_mut(key))
    }

    /// Find the parent of the first node matching `key`
    pub fn find_parent(&self, key: &ItemKey) -> Option<&ProjectItem> {
        if self.children.iter().any(|c| c.matches(key)) {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find_parent(key))
    }

    /// Whether a file with this full path exists anywhere in the subtree
    pub fn contains(&self, path: &FilePath) -> bool {
        self.find(path).is_some()
    }

    /// All nodes of the subtree, depth-first pre-order, starting with `self`
    pub fn to_list(&self) -> Vec<&ProjectItem> {
        let mut list = Vec::new();
        self.collect_into(&mut list);
        list
    }

    fn collect_into<'a>(&'a self, list: &mut Vec<&'a ProjectItem>) {
        list.push(self);
        for child in &self.children {
            child.collect_into(list);
        }
    }

    /// All file items of the subtree, in pre-order
    pub fn files(&self) -> Vec<&ProjectItem> {
        self.to_list()
            .into_iter()
            .filter(|item| item.full_path().is_some())
            .collect()
    }

    /// Rename the direct child matching `key`
    ///
    /// Fixed children cannot be renamed, and the new name must not collide with a
    /// sibling of the same kind.
    pub fn rename_child(&mut self, key: &ItemKey, new_name: &str) -> Result<(), ProjectError> {
        let new_name = new_name.trim();
        if new_name.is_empty() {
            return Err(ProjectError::Argument("name cannot be empty".to_string()));
        }
        let index = self
            .children
            .iter()
            .position(|c| c.matches(key))
            .ok_or_else(|| ProjectError::Argument(format!("{} is not a child of '{}'", key, self.name)))?;

        if self.children[index].fixed {
            return Err(ProjectError::InvalidOperation(format!(
                "'{}' is a built-in item and cannot be renamed",
                self.children[index].name
            )));
        }

        let same_kind = std::mem::discriminant(&self.children[index].kind);
        let collides = self.children.iter().enumerate().any(|(i, c)| {
            i != index && std::mem::discriminant(&c.kind) == same_kind && c.name == new_name
        });
        if collides {
            return Err(ProjectError::Argument(format!(
                "'{}' already contains an item named '{}'",
                self.name, new_name
            )));
        }

        self.children[index].name = new_name.to_string();
        Ok(())
    }
}

fn fixed_or_root(item: &ProjectItem) -> ProjectError {
    ProjectError::InvalidOperation(format!(
        "'{}' is a built-in item and cannot be removed",
        item.name
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tree() -> ProjectItem {
        let mut root = ProjectItem::folder("Project", true);
        let scripts = root.add(ProjectItem::folder("MSCI Scripts", true)).unwrap();
        scripts
            .add(ProjectItem::file("scripts/foo.xml", FileType::Script))
            .unwrap();
        let sub = scripts.add(ProjectItem::folder("Ships", false)).unwrap();
        sub.add(ProjectItem::file("scripts/bar.xml", FileType::Script))
            .unwrap();
        root.add(ProjectItem::folder("Other Files", true)).unwrap();
        root.add(ProjectItem::variable("Counter", 5)).unwrap();
        root
    }

    #[test]
    fn test_find_and_contains() {
        let root = sample_tree();
        let bar = root.find(&FilePath::new("scripts/bar.xml")).unwrap();
        assert_eq!(bar.name, "bar.xml");
        assert!(root.contains(bar.full_path().unwrap()));
        assert!(root.contains(&FilePath::new("SCRIPTS\\FOO.XML")));
        assert!(root.find(&FilePath::new("scripts/missing.xml")).is_none());
    }

    #[test]
    fn test_to_list_is_preorder() {
        let root = sample_tree();
        let names: Vec<&str> = root.to_list().iter().map(|i| i.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Project", "MSCI Scripts", "foo.xml", "Ships", "bar.xml", "Other Files", "Counter"]
        );
        assert_eq!(root.files().len(), 2);
    }

    #[test]
    fn test_remove_fixed_fails_and_leaves_tree() {
        let mut root = sample_tree();
        let before = root.clone();

        assert!(matches!(
            root.remove(&ItemKey::Folder("MSCI Scripts".into())),
            Err(ProjectError::InvalidOperation(_))
        ));
        assert!(matches!(
            root.remove(&ItemKey::Folder("Project".into())),
            Err(ProjectError::InvalidOperation(_))
        ));
        assert_eq!(root, before);
    }

    #[test]
    fn test_remove_detaches_subtree() {
        let mut root = sample_tree();
        let removed = root.remove(&ItemKey::Folder("Ships".into())).unwrap();
        assert_eq!(removed.children.len(), 1);
        assert!(!root.contains(&FilePath::new("scripts/bar.xml")));
        assert!(root.contains(&FilePath::new("scripts/foo.xml")));
    }

    #[test]
    fn test_remove_missing_is_argument_error() {
        let mut root = sample_tree();
        assert!(matches!(
            root.remove(&ItemKey::File(FilePath::new("nope.xml"))),
            Err(ProjectError::Argument(_))
        ));
    }

    #[test]
    fn test_add_to_file_fails() {
        let mut file = ProjectItem::file("a.xml", FileType::Script);
        assert!(matches!(
            file.add(ProjectItem::folder("x", false)),
            Err(ProjectError::InvalidOperation(_))
        ));
    }

    #[test]
    fn test_find_folder_and_parent() {
        let root = sample_tree();
        assert!(root.find_folder("Ships").is_some());
        assert!(root.find_folder("bar.xml").is_none());

        let parent = root
            .find_parent(&ItemKey::File(FilePath::new("scripts/bar.xml")))
            .unwrap();
        assert_eq!(parent.name, "Ships");
    }

    #[test]
    fn test_rename_rules() {
        let mut root = sample_tree();
        assert!(matches!(
            root.rename_child(&ItemKey::Folder("Other Files".into()), "Misc"),
            Err(ProjectError::InvalidOperation(_))
        ));

        let scripts = root.find_folder_mut("MSCI Scripts").unwrap();
        scripts.add(ProjectItem::folder("Stations", false)).unwrap();
        assert!(matches!(
            scripts.rename_child(&ItemKey::Folder("Stations".into()), "Ships"),
            Err(ProjectError::Argument(_))
        ));
        scripts
            .rename_child(&ItemKey::Folder("Stations".into()), "Docks")
            .unwrap();
        assert!(root.find_folder("Docks").is_some());
    }

    #[test]
    fn test_identify_by_root_element() {
        assert_eq!(FileType::from_root_element("<?xml version=\"1.0\"?><script/>"), FileType::Script);
        assert_eq!(FileType::from_root_element("<language id=\"44\">"), FileType::Language);
        assert_eq!(FileType::from_root_element("<director name=\"x\">"), FileType::Mission);
        assert_eq!(FileType::from_root_element("<other/>"), FileType::Unknown);
        assert_eq!(FileType::from_root_element("plain text"), FileType::Unknown);
    }
}
