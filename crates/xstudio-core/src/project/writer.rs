//! Project file writer
//!
//! Writes projects in the current (version 2) format. The four well-known
//! folders are always written, even when empty or missing from the tree.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::Writer;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use super::error::ProjectError;
use super::file::{ProjectFile, WellKnownFolder};
use super::item::{ItemKind, ProjectItem};
use super::reader::PROJECT_FORMAT_VERSION;

/// Serialize a project to XML text
pub fn write_project(project: &ProjectFile) -> Result<String, ProjectError> {
    let mut buffer = Vec::new();
    write_project_to(project, &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).to_string())
}

/// Save a project to disk
pub fn save_project<P: AsRef<Path>>(project: &ProjectFile, path: P) -> Result<(), ProjectError> {
    let file = File::create(path.as_ref())?;
    let mut stream = BufWriter::new(file);
    write_project_to(project, &mut stream)?;
    stream.flush()?;
    Ok(())
}

/// Serialize a project into any stream
pub fn write_project_to<W: Write>(project: &ProjectFile, stream: W) -> Result<(), ProjectError> {
    let mut writer = Writer::new_with_indent(stream, b' ', 4);

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let version = PROJECT_FORMAT_VERSION.to_string();
    let mut root = BytesStart::new("project");
    root.push_attribute(("version", version.as_str()));
    root.push_attribute(("name", project.name()));
    writer.write_event(Event::Start(root))?;

    for child in &project.root().children {
        write_item(&mut writer, child)?;
    }

    // A tree built by hand may be missing built-in folders
    for folder in WellKnownFolder::ALL {
        let present = project
            .root()
            .children
            .iter()
            .any(|c| c.is_folder() && c.name == folder.name());
        if !present {
            write_item(&mut writer, &ProjectItem::folder(folder.name(), true))?;
        }
    }

    writer.write_event(Event::End(BytesEnd::new("project")))?;
    writer.get_mut().write_all(b"\n")?;
    Ok(())
}

fn write_item<W: Write>(writer: &mut Writer<W>, item: &ProjectItem) -> Result<(), ProjectError> {
    match &item.kind {
        ItemKind::Folder => {
            let mut elem = BytesStart::new("folder");
            elem.push_attribute(("name", item.name.as_str()));
            if item.fixed {
                elem.push_attribute(("fixed", "true"));
            }
            if item.children.is_empty() {
                writer.write_event(Event::Empty(elem))?;
            } else {
                writer.write_event(Event::Start(elem))?;
                for child in &item.children {
                    write_item(writer, child)?;
                }
                writer.write_event(Event::End(BytesEnd::new("folder")))?;
            }
        }
        ItemKind::File {
            path,
            file_type,
            backup_name,
        } => {
            let text = path.text();
            let mut elem = BytesStart::new("file");
            elem.push_attribute(("path", text.as_str()));
            elem.push_attribute(("type", file_type.as_str()));
            // Only renamed files carry a name; the default comes from the path
            if item.name != path.file_name() {
                elem.push_attribute(("name", item.name.as_str()));
            }
            if let Some(backup) = backup_name {
                elem.push_attribute(("backup", backup.as_str()));
            }
            writer.write_event(Event::Empty(elem))?;
        }
        ItemKind::Variable { value } => {
            let value = value.to_string();
            let mut elem = BytesStart::new("variable");
            elem.push_attribute(("name", item.name.as_str()));
            elem.push_attribute(("value", value.as_str()));
            writer.write_event(Event::Empty(elem))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::FilePath;
    use crate::project::item::{FileType, ItemKey};
    use crate::project::reader::parse_project;
    use pretty_assertions::assert_eq;

    fn sample() -> ProjectFile {
        let mut project = ProjectFile::new("/mods/Sample.xprj");
        project
            .add_file(r"C:\X3\scripts\plugin.a & b.xml", FileType::Script)
            .unwrap();
        project.add_folder("MSCI Scripts", "Nested").unwrap();
        project
            .add_file_to("Nested", "/x3/t/447001.xml", FileType::Language)
            .unwrap();
        project.set_variable("Debug", 3).unwrap();
        if let Some(item) = project.find_mut(&FilePath::new(r"C:\X3\scripts\plugin.a & b.xml")) {
            if let ItemKind::File { backup_name, .. } = &mut item.kind {
                *backup_name = Some("plugin.a & b.xbak".to_string());
            }
        }
        project
    }

    #[test]
    fn test_file_name_written_only_when_renamed() {
        let mut project = ProjectFile::new("/mods/Sample.xprj");
        project.add_file("/x3/scripts/plugin.a.xml", FileType::Script).unwrap();
        project.add_file("/x3/scripts/plugin.b.xml", FileType::Script).unwrap();
        project
            .rename(&ItemKey::File(FilePath::new("/x3/scripts/plugin.b.xml")), "Main loop")
            .unwrap();

        let xml = write_project(&project).unwrap();
        assert_eq!(xml.matches("name=\"Main loop\"").count(), 1);
        assert!(!xml.contains("name=\"plugin.a.xml\""));

        let reread = parse_project(&xml, project.full_path.clone()).unwrap();
        assert_eq!(reread, project);
    }

    #[test]
    fn test_round_trip() {
        let project = sample();
        let xml = write_project(&project).unwrap();
        let reread = parse_project(&xml, project.full_path.clone()).unwrap();
        assert_eq!(reread, project);

        // and the output is stable
        assert_eq!(write_project(&reread).unwrap(), xml);
    }

    #[test]
    fn test_output_shape() {
        let xml = write_project(&ProjectFile::new("Empty.xprj")).unwrap();
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains("<project version=\"2\" name=\"Empty\">"));
        assert!(xml.contains("<folder name=\"MSCI Scripts\" fixed=\"true\"/>"));
        assert!(xml.contains("<folder name=\"Other Files\" fixed=\"true\"/>"));
    }

    #[test]
    fn test_missing_well_known_folders_still_written() {
        let mut project = ProjectFile::new("p.xprj");
        project.root_mut().children.clear();
        let xml = write_project(&project).unwrap();
        for folder in WellKnownFolder::ALL {
            assert!(xml.contains(&format!("<folder name=\"{}\" fixed=\"true\"/>", folder.name())));
        }
    }
}
