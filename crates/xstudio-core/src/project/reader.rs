//! Project file reader
//!
//! Parses the current (version 2) project format:
//! ```text
//! <?xml version="1.0" encoding="UTF-8"?>
//! <project version="2" name="MyMod">
//!     <folder name="MSCI Scripts" fixed="true">
//!         <file path="C:\X3\scripts\plugin.mymod.xml" type="script" backup="plugin.mymod.xbak"/>
//!         <file path="C:\X3\scripts\setup.mymod.xml" type="script" name="Setup"/>
//!         <folder name="Ships">...</folder>
//!     </folder>
//!     ...
//!     <variable name="Debug" value="1"/>
//! </project>
//! ```

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use super::error::ProjectError;
use super::file::ProjectFile;
use super::item::{FileType, ItemKind, ProjectItem};
use crate::path::FilePath;
use crate::script::read_text;

/// Newest project format version this reader understands
pub const PROJECT_FORMAT_VERSION: u32 = 2;

/// Load a project file from disk
pub fn read_project<P: AsRef<Path>>(path: P) -> Result<ProjectFile, ProjectError> {
    let path = path.as_ref();
    let content = read_text(path)?;
    parse_project(&content, FilePath::from(path))
}

/// Read a project from any stream
pub fn read_project_from<R: Read>(mut stream: R, full_path: FilePath) -> Result<ProjectFile, ProjectError> {
    let mut content = String::new();
    stream.read_to_string(&mut content)?;
    parse_project(&content, full_path)
}

/// Parse project XML. `full_path` names the file the XML came from.
pub fn parse_project(xml: &str, full_path: FilePath) -> Result<ProjectFile, ProjectError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    // Open elements; the bottom entry is the root once <project> has been seen
    let mut stack: Vec<ProjectItem> = Vec::new();
    let mut root: Option<ProjectItem> = None;

    loop {
        let position = reader.buffer_position() as u64;
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                if root.is_some() {
                    return Err(ProjectError::format(position, "content after the project element"));
                }
                let item = if stack.is_empty() {
                    parse_root(e, &full_path, position)?
                } else {
                    parse_item(e, position)?
                };
                stack.push(item);
            }
            Ok(Event::Empty(ref e)) => {
                if root.is_some() {
                    return Err(ProjectError::format(position, "content after the project element"));
                }
                if stack.is_empty() {
                    // <project/> with nothing in it
                    root = Some(parse_root(e, &full_path, position)?);
                    continue;
                }
                let item = parse_item(e, position)?;
                attach(&mut stack, item, position)?;
            }
            Ok(Event::End(_)) => {
                let Some(item) = stack.pop() else {
                    return Err(ProjectError::format(position, "unbalanced closing element"));
                };
                if stack.is_empty() {
                    root = Some(item);
                } else {
                    attach(&mut stack, item, position)?;
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ProjectError::format(position, e.to_string())),
            _ => {}
        }
    }

    let root = root.ok_or_else(|| {
        ProjectError::format(reader.buffer_position() as u64, "missing or unterminated project element")
    })?;
    let project = ProjectFile::with_root(full_path, root);
    tracing::debug!(
        "Parsed project '{}' ({} items)",
        project.name(),
        project.to_list().len()
    );
    Ok(project)
}

fn attach(stack: &mut [ProjectItem], item: ProjectItem, position: u64) -> Result<(), ProjectError> {
    let Some(parent) = stack.last_mut() else {
        return Err(ProjectError::format(position, "item outside the project element"));
    };
    parent
        .add(item)
        .map_err(|e| ProjectError::format(position, e.to_string()))?;
    Ok(())
}

fn parse_root(e: &BytesStart, full_path: &FilePath, position: u64) -> Result<ProjectItem, ProjectError> {
    let name = element_name(e);
    if name != "project" {
        return Err(ProjectError::format(
            position,
            format!("expected <project> root element, found <{}>", name),
        ));
    }
    let attrs = attributes(e)?;
    if let Some(version) = attrs.get("version") {
        let parsed: u32 = version.trim().parse().map_err(|_| invalid("version", version))?;
        if parsed > PROJECT_FORMAT_VERSION {
            return Err(invalid("version", version));
        }
    }
    let name = attrs
        .get("name")
        .cloned()
        .unwrap_or_else(|| full_path.stem());
    Ok(ProjectItem::folder(name, true))
}

fn parse_item(e: &BytesStart, position: u64) -> Result<ProjectItem, ProjectError> {
    let element = element_name(e);
    let attrs = attributes(e)?;
    let required = |field: &str| {
        attrs.get(field).cloned().ok_or_else(|| {
            ProjectError::format(position, format!("<{}> is missing the '{}' attribute", element, field))
        })
    };

    match element.as_str() {
        "folder" => {
            let fixed = match attrs.get("fixed") {
                Some(v) => parse_bool(v).ok_or_else(|| invalid("fixed", v))?,
                None => false,
            };
            Ok(ProjectItem::folder(required("name")?, fixed))
        }
        "file" => {
            let path = required("path")?;
            if path.trim().is_empty() {
                return Err(ProjectError::format(position, "<file> has an empty path"));
            }
            let file_type = match attrs.get("type") {
                Some(v) => FileType::parse(v).ok_or_else(|| invalid("type", v))?,
                None => FileType::Unknown,
            };
            let mut item = ProjectItem::file(path.as_str(), file_type);
            if let Some(name) = attrs.get("name").map(|n| n.trim()).filter(|n| !n.is_empty()) {
                item.name = name.to_string();
            }
            if let ItemKind::File { backup_name, .. } = &mut item.kind {
                *backup_name = attrs.get("backup").filter(|b| !b.is_empty()).cloned();
            }
            Ok(item)
        }
        "variable" => {
            let name = required("name")?;
            let raw = required("value")?;
            let value: i32 = raw.trim().parse().map_err(|_| invalid("value", &raw))?;
            Ok(ProjectItem::variable(name, value))
        }
        other => Err(ProjectError::format(
            position,
            format!("unknown element <{}>", other),
        )),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

fn invalid(field: &str, value: &str) -> ProjectError {
    ProjectError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
    }
}

fn element_name(e: &BytesStart) -> String {
    String::from_utf8_lossy(e.name().as_ref()).to_string()
}

pub(crate) fn attributes(e: &BytesStart) -> Result<HashMap<String, String>, ProjectError> {
    let mut map = HashMap::new();
    for attr in e.attributes() {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
        let value = attr.unescape_value()?.to_string();
        map.insert(key, value);
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<project version="2" name="Test Mod">
    <folder name="MSCI Scripts" fixed="true">
        <file path="C:\X3\scripts\plugin.test.xml" type="script" backup="plugin.test.xbak"/>
        <folder name="Ships">
            <file path="C:\X3\scripts\plugin.test.ship.xml" type="script"/>
        </folder>
    </folder>
    <folder name="Language Files" fixed="true"/>
    <folder name="Mission Scripts" fixed="true"/>
    <folder name="Other Files" fixed="true"/>
    <variable name="Debug" value="-1"/>
</project>
"#;

    fn parse(xml: &str) -> Result<ProjectFile, ProjectError> {
        parse_project(xml, FilePath::new("test.xprj"))
    }

    #[test]
    fn test_parse_sample() {
        let project = parse(SAMPLE).unwrap();
        assert_eq!(project.name(), "Test Mod");
        assert_eq!(project.files().len(), 2);

        let item = project
            .find(&FilePath::new(r"C:\X3\scripts\plugin.test.xml"))
            .unwrap();
        assert_eq!(item.file_type(), Some(FileType::Script));
        assert_eq!(item.backup_name(), Some("plugin.test.xbak"));

        let nested = project
            .find(&FilePath::new(r"C:\X3\scripts\plugin.test.ship.xml"))
            .unwrap();
        assert_eq!(nested.backup_name(), None);
        assert_eq!(project.variables(), vec![("Debug", -1)]);
    }

    #[test]
    fn test_missing_fixed_folders_are_restored() {
        let project = parse(r#"<project name="Tiny"/>"#).unwrap();
        assert_eq!(project.name(), "Tiny");
        assert_eq!(project.root().children.len(), 4);
    }

    #[test]
    fn test_unknown_element_fails() {
        let err = parse(r#"<project><widget name="x"/></project>"#).unwrap_err();
        assert!(matches!(err, ProjectError::FileFormat { .. }));
    }

    #[test]
    fn test_file_without_path_fails() {
        let err = parse(r#"<project><folder name="A"><file type="script"/></folder></project>"#)
            .unwrap_err();
        assert!(matches!(err, ProjectError::FileFormat { .. }));
    }

    #[test]
    fn test_bad_values() {
        assert!(matches!(
            parse(r#"<project><file path="a.xml" type="banana"/></project>"#),
            Err(ProjectError::InvalidValue { .. })
        ));
        assert!(matches!(
            parse(r#"<project><variable name="x" value="lots"/></project>"#),
            Err(ProjectError::InvalidValue { .. })
        ));
        assert!(matches!(
            parse(r#"<project version="9"/>"#),
            Err(ProjectError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_wrong_root_and_truncation() {
        assert!(matches!(
            parse("<xstudio/>"),
            Err(ProjectError::FileFormat { .. })
        ));
        assert!(matches!(
            parse(r#"<project><folder name="A">"#),
            Err(ProjectError::FileFormat { .. })
        ));
        assert!(matches!(parse(""), Err(ProjectError::FileFormat { .. })));
    }

    #[test]
    fn test_children_inside_file_fail() {
        let err = parse(r#"<project><file path="a.xml"><folder name="b"/></file></project>"#)
            .unwrap_err();
        assert!(matches!(err, ProjectError::FileFormat { .. }));
    }
}
