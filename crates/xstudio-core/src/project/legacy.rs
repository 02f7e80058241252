//! Legacy project importer
//!
//! Version 1 projects had no folders of their own:
//! ```text
//! <xstudio version="1">
//!   <project name="MyMod">
//!     <files>
//!       <file type="script">C:\X3\scripts\plugin.mymod.xml</file>
//!     </files>
//!     <variables>
//!       <variable name="Debug">1</variable>
//!     </variables>
//!   </project>
//! </xstudio>
//! ```
//! Files are sorted into the well-known folder for their type. When the `type`
//! attribute is missing the file itself is inspected. Import is one-way; projects
//! are always saved in the current format.

use quick_xml::events::Event;
use quick_xml::Reader;
use std::path::Path;

use super::error::ProjectError;
use super::file::ProjectFile;
use super::item::FileType;
use super::reader::attributes;
use crate::path::FilePath;
use crate::script::read_text;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Document,
    Project,
    Files,
    Variables,
}

#[derive(Debug)]
enum Pending {
    File { file_type: Option<FileType> },
    Variable { name: String },
}

/// Import a legacy project file. The result is associated with `target`.
pub fn import_legacy_project<P: AsRef<Path>>(legacy: P, target: FilePath) -> Result<ProjectFile, ProjectError> {
    let content = read_text(legacy.as_ref())?;
    parse_legacy_project(&content, target)
}

/// Parse legacy project XML
pub fn parse_legacy_project(xml: &str, target: FilePath) -> Result<ProjectFile, ProjectError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut project = ProjectFile::new(target);
    let mut sections: Vec<Section> = Vec::new();
    let mut pending: Option<Pending> = None;
    let mut text_buf = String::new();
    let mut seen_root = false;

    loop {
        let position = reader.buffer_position() as u64;
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                let attrs = attributes(e)?;
                text_buf.clear();
                match (sections.last().copied(), name.as_str()) {
                    (None, "xstudio") if !seen_root => {
                        seen_root = true;
                        sections.push(Section::Document);
                    }
                    (Some(Section::Document), "project") => {
                        if let Some(project_name) = attrs.get("name") {
                            project.root_mut().name = project_name.clone();
                        }
                        sections.push(Section::Project);
                    }
                    (Some(Section::Project), "files") => sections.push(Section::Files),
                    (Some(Section::Project), "variables") => sections.push(Section::Variables),
                    (Some(Section::Files), "file") if pending.is_none() => {
                        let file_type = match attrs.get("type") {
                            Some(v) => Some(legacy_file_type(v).ok_or_else(|| {
                                ProjectError::InvalidValue {
                                    field: "type".to_string(),
                                    value: v.clone(),
                                }
                            })?),
                            None => None,
                        };
                        pending = Some(Pending::File { file_type });
                    }
                    (Some(Section::Variables), "variable") if pending.is_none() => {
                        let name = attrs.get("name").cloned().ok_or_else(|| {
                            ProjectError::format(position, "<variable> is missing the 'name' attribute")
                        })?;
                        pending = Some(Pending::Variable { name });
                    }
                    (_, other) => {
                        return Err(ProjectError::format(
                            position,
                            format!("unexpected element <{}> in legacy project", other),
                        ))
                    }
                }
            }
            Ok(Event::Empty(ref e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                match (sections.last().copied(), name.as_str()) {
                    (Some(Section::Project), "files" | "variables") => {}
                    (Some(Section::Document), "project") => {}
                    (Some(Section::Files), "file") => {
                        return Err(ProjectError::format(position, "<file> without a path"));
                    }
                    (_, other) => {
                        return Err(ProjectError::format(
                            position,
                            format!("unexpected element <{}> in legacy project", other),
                        ))
                    }
                }
            }
            Ok(Event::Text(ref e)) => {
                text_buf = e.unescape().unwrap_or_default().to_string();
            }
            Ok(Event::End(_)) => {
                if let Some(item) = pending.take() {
                    finish_pending(&mut project, item, &text_buf, position)?;
                } else if sections.pop().is_none() {
                    return Err(ProjectError::format(position, "unbalanced closing element"));
                }
                text_buf.clear();
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ProjectError::format(position, e.to_string())),
            _ => {}
        }
    }

    if !seen_root || !sections.is_empty() {
        return Err(ProjectError::format(
            reader.buffer_position() as u64,
            "missing or unterminated xstudio element",
        ));
    }

    tracing::info!(
        "Imported legacy project '{}' ({} files)",
        project.name(),
        project.files().len()
    );
    Ok(project)
}

fn finish_pending(project: &mut ProjectFile, item: Pending, text: &str, position: u64) -> Result<(), ProjectError> {
    match item {
        Pending::File { file_type } => {
            let path = text.trim();
            if path.is_empty() {
                return Err(ProjectError::format(position, "<file> without a path"));
            }
            let path = FilePath::new(path);
            let file_type = file_type.unwrap_or_else(|| FileType::identify(&path));
            if !project.add_file(path.clone(), file_type)? {
                tracing::warn!("Legacy project lists {} twice, keeping the first", path);
            }
        }
        Pending::Variable { name } => {
            let value: i32 = text.trim().parse().map_err(|_| ProjectError::InvalidValue {
                field: name.clone(),
                value: text.to_string(),
            })?;
            project.set_variable(&name, value)?;
        }
    }
    Ok(())
}

fn legacy_file_type(value: &str) -> Option<FileType> {
    match value.to_ascii_lowercase().as_str() {
        "script" | "msci" => Some(FileType::Script),
        "language" | "lang" => Some(FileType::Language),
        "mission" | "md" | "director" => Some(FileType::Mission),
        "unknown" | "other" => Some(FileType::Unknown),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const LEGACY: &str = r#"<?xml version="1.0"?>
<xstudio version="1">
  <project name="Old Mod">
    <files>
      <file type="script">C:\X3\scripts\plugin.old.xml</file>
      <file type="language">C:\X3\t\447001.xml</file>
      <file type="md">C:\X3\director\old.xml</file>
      <file type="other">C:\X3\readme.txt</file>
    </files>
    <variables>
      <variable name="Debug">1</variable>
    </variables>
  </project>
</xstudio>
"#;

    #[test]
    fn test_files_sorted_by_type() {
        let project = parse_legacy_project(LEGACY, FilePath::new("Old Mod.xprj")).unwrap();
        assert_eq!(project.name(), "Old Mod");
        assert_eq!(project.files().len(), 4);

        let parent_of = |path: &str| {
            project
                .find_parent(&crate::project::ItemKey::File(FilePath::new(path)))
                .map(|p| p.name.clone())
        };
        assert_eq!(parent_of(r"C:\X3\scripts\plugin.old.xml").as_deref(), Some("MSCI Scripts"));
        assert_eq!(parent_of(r"C:\X3\t\447001.xml").as_deref(), Some("Language Files"));
        assert_eq!(parent_of(r"C:\X3\director\old.xml").as_deref(), Some("Mission Scripts"));
        assert_eq!(parent_of(r"C:\X3\readme.txt").as_deref(), Some("Other Files"));
        assert_eq!(project.variables(), vec![("Debug", 1)]);
    }

    #[test]
    fn test_type_inferred_from_content() {
        let temp = TempDir::new().unwrap();
        let script = temp.path().join("plugin.x.xml");
        std::fs::write(&script, "<?xml version=\"1.0\"?><script><name>x</name></script>").unwrap();

        let xml = format!(
            "<xstudio><project name=\"p\"><files><file>{}</file></files></project></xstudio>",
            script.display()
        );
        let project = parse_legacy_project(&xml, FilePath::new("p.xprj")).unwrap();
        let item = project.find(&FilePath::new(&script)).unwrap();
        assert_eq!(item.file_type(), Some(FileType::Script));
    }

    #[test]
    fn test_rejects_current_format() {
        let err = parse_legacy_project("<project version=\"2\"/>", FilePath::new("p.xprj")).unwrap_err();
        assert!(matches!(err, ProjectError::FileFormat { .. }));
    }

    #[test]
    fn test_bad_variable_value() {
        let xml = "<xstudio><project><variables><variable name=\"a\">x</variable></variables></project></xstudio>";
        assert!(matches!(
            parse_legacy_project(xml, FilePath::new("p.xprj")),
            Err(ProjectError::InvalidValue { .. })
        ));
    }
}
