//! Backup file reader
//!
//! Backup file format:
//! ```text
//! <?xml version="1.0" encoding="UTF-8"?>
//! <revisions type="MSCI" version="1">
//!     <revision title="Initial Commit" date="2024-05-01T10:00:00Z" path="C:\X3\scripts\plugin.foo.xml">
//!         <script name="plugin.foo" version="3" engineversion="44" commandid="">
//!             <description>Does foo</description>
//!             <argument name="ship" type="Var/Ship" description="Target"/>
//!         </script>
//!         <content>...full script text...</content>
//!     </revision>
//! </revisions>
//! ```

use chrono::{DateTime, Utc};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use super::error::BackupError;
use super::file::{BackupFile, BackupType};
use super::revision::ScriptRevision;
use crate::script::{ScriptArgument, ScriptProperties};

/// Newest backup format version this reader understands
pub const BACKUP_FORMAT_VERSION: u32 = 1;

/// Where the reader currently is in the document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Element {
    Revisions,
    Revision,
    Script,
    Description,
    Content,
}

/// Fields of the revision being read
#[derive(Debug, Default)]
struct PendingRevision {
    title: String,
    date: Option<DateTime<Utc>>,
    path: String,
    properties: ScriptProperties,
    content: Option<String>,
}

/// Load a backup file from disk
pub fn read_backup<P: AsRef<Path>>(path: P) -> Result<BackupFile, BackupError> {
    let file = File::open(path.as_ref())?;
    read_backup_from(BufReader::new(file))
}

/// Read a backup file from any stream
pub fn read_backup_from<R: Read>(mut stream: R) -> Result<BackupFile, BackupError> {
    let mut content = String::new();
    stream.read_to_string(&mut content)?;
    parse_backup(&content)
}

/// Parse backup XML
pub fn parse_backup(xml: &str) -> Result<BackupFile, BackupError> {
    let mut reader = Reader::from_str(xml);
    // Script text must come back exactly as written
    reader.config_mut().trim_text(false);

    let mut backup: Option<BackupFile> = None;
    let mut finished = false;
    let mut stack: Vec<Element> = Vec::new();
    let mut pending: Option<PendingRevision> = None;
    let mut text_buf = String::new();

    loop {
        let position = reader.buffer_position() as u64;
        let event = reader
            .read_event()
            .map_err(|e| format_error(position, e.to_string()))?;

        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let is_empty = matches!(event, Event::Empty(_));
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                if finished {
                    return Err(format_error(position, "content after the revisions element"));
                }
                text_buf.clear();

                let entered = match (stack.last().copied(), name.as_str()) {
                    (None, "revisions") => {
                        backup = Some(BackupFile::new(parse_backup_type(e)?));
                        Element::Revisions
                    }
                    (Some(Element::Revisions), "revision") => {
                        pending = Some(parse_revision_start(e, position)?);
                        Element::Revision
                    }
                    (Some(Element::Revision), "script") => {
                        if let Some(rev) = pending.as_mut() {
                            apply_script_attributes(&mut rev.properties, e)?;
                        }
                        Element::Script
                    }
                    (Some(Element::Script), "description") => Element::Description,
                    (Some(Element::Script), "argument") => {
                        if let Some(rev) = pending.as_mut() {
                            rev.properties.arguments.push(parse_argument(e)?);
                        }
                        // arguments have no content; treat <argument></argument> the same
                        Element::Script
                    }
                    (Some(Element::Revision), "content") => Element::Content,
                    (_, other) => {
                        return Err(format_error(position, format!("unexpected element <{}>", other)))
                    }
                };

                if is_empty {
                    // <description/>, <content/> and <revisions/> close immediately
                    close_element(entered, &name, &mut pending, &mut backup, "", position)?;
                    if entered == Element::Revisions {
                        finished = true;
                    }
                } else if name != "argument" {
                    stack.push(entered);
                }
            }
            Event::Text(ref e) => {
                if matches!(stack.last(), Some(Element::Content | Element::Description)) {
                    let text = e
                        .unescape()
                        .map_err(|err| format_error(position, err.to_string()))?;
                    text_buf.push_str(&text);
                }
            }
            Event::CData(ref e) => {
                if matches!(stack.last(), Some(Element::Content | Element::Description)) {
                    text_buf.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Event::End(ref e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                if name == "argument" {
                    continue;
                }
                let Some(element) = stack.pop() else {
                    return Err(format_error(position, "unbalanced closing element"));
                };
                close_element(element, &name, &mut pending, &mut backup, &text_buf, position)?;
                text_buf.clear();
                if stack.is_empty() {
                    finished = true;
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    match backup {
        Some(backup) if finished => Ok(backup),
        _ => Err(format_error(
            reader.buffer_position() as u64,
            "missing or unterminated revisions element",
        )),
    }
}

fn close_element(
    element: Element,
    name: &str,
    pending: &mut Option<PendingRevision>,
    backup: &mut Option<BackupFile>,
    text: &str,
    position: u64,
) -> Result<(), BackupError> {
    match element {
        Element::Description => {
            if let Some(rev) = pending.as_mut() {
                rev.properties.description = text.to_string();
            }
        }
        Element::Content => {
            if let Some(rev) = pending.as_mut() {
                rev.content = Some(text.to_string());
            }
        }
        Element::Revision => {
            let rev = pending.take().ok_or_else(|| {
                format_error(position, format!("unexpected </{}>", name))
            })?;
            let Some(content) = rev.content else {
                return Err(format_error(
                    position,
                    format!("revision '{}' has no <content>", rev.title),
                ));
            };
            let Some(date) = rev.date else {
                return Err(format_error(position, "revision without a date"));
            };
            let revision =
                ScriptRevision::with_timestamp(rev.title, rev.path, content, rev.properties, date);
            if let Some(backup) = backup.as_mut() {
                backup.restore(revision);
            }
        }
        Element::Script | Element::Revisions => {}
    }
    Ok(())
}

fn parse_backup_type(e: &BytesStart) -> Result<BackupType, BackupError> {
    let attrs = attributes(e)?;
    if let Some(version) = attrs.get("version") {
        match version.trim().parse::<u32>() {
            Ok(v) if v <= BACKUP_FORMAT_VERSION => {}
            _ => {
                return Err(BackupError::InvalidValue {
                    field: "version".to_string(),
                    value: version.clone(),
                })
            }
        }
    }
    let backup_type = attrs
        .get("type")
        .ok_or_else(|| BackupError::FileFormat("<revisions> is missing the 'type' attribute".to_string()))?;
    BackupType::parse(backup_type)
}

fn parse_revision_start(e: &BytesStart, position: u64) -> Result<PendingRevision, BackupError> {
    let attrs = attributes(e)?;
    let required = |field: &str| {
        attrs.get(field).cloned().ok_or_else(|| {
            format_error(position, format!("<revision> is missing the '{}' attribute", field))
        })
    };
    let title = required("title")?;
    let path = required("path")?;
    let raw_date = required("date")?;
    let date = DateTime::parse_from_rfc3339(raw_date.trim())
        .map_err(|err| format_error(position, format!("bad revision date '{}': {}", raw_date, err)))?
        .with_timezone(&Utc);

    Ok(PendingRevision {
        title,
        date: Some(date),
        path,
        ..PendingRevision::default()
    })
}

fn apply_script_attributes(props: &mut ScriptProperties, e: &BytesStart) -> Result<(), BackupError> {
    for (key, value) in attributes(e)? {
        match key.as_str() {
            "name" => props.name = value,
            "version" => props.version = parse_number("version", &value)?,
            "engineversion" => props.engine_version = parse_number("engineversion", &value)?,
            "commandid" => props.command_id = value,
            _ => {}
        }
    }
    Ok(())
}

fn parse_argument(e: &BytesStart) -> Result<ScriptArgument, BackupError> {
    let mut attrs = attributes(e)?;
    Ok(ScriptArgument {
        name: attrs.remove("name").unwrap_or_default(),
        param_type: attrs.remove("type").unwrap_or_default(),
        description: attrs.remove("description").unwrap_or_default(),
    })
}

fn parse_number(field: &str, value: &str) -> Result<u32, BackupError> {
    if value.trim().is_empty() {
        return Ok(0);
    }
    value.trim().parse().map_err(|_| BackupError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
    })
}

fn attributes(e: &BytesStart) -> Result<HashMap<String, String>, BackupError> {
    let mut map = HashMap::new();
    for attr in e.attributes() {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
        let value = attr.unescape_value()?.to_string();
        map.insert(key, value);
    }
    Ok(map)
}

fn format_error(position: u64, message: impl Into<String>) -> BackupError {
    BackupError::FileFormat(format!("at position {}: {}", position, message.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::writer::write_backup;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn sample() -> BackupFile {
        let mut backup = BackupFile::new(BackupType::Msci);
        let props = ScriptProperties {
            name: "plugin.test".to_string(),
            version: 2,
            engine_version: 44,
            description: "Tests <things> & more".to_string(),
            command_id: "COMMAND_TYPE_SHIP_42".to_string(),
            arguments: vec![ScriptArgument {
                name: "ship".to_string(),
                param_type: "Var/Ship".to_string(),
                description: "The \"ship\"".to_string(),
            }],
        };
        let first = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        backup.commit(ScriptRevision::with_timestamp(
            "Initial Commit",
            r"C:\X3\scripts\plugin.test.xml",
            "  * leading spaces\n$ship = null\n\nreturn null\n",
            props.clone(),
            first,
        ));
        backup.commit(ScriptRevision::with_timestamp(
            "Second",
            r"C:\X3\scripts\plugin.test.xml",
            "",
            ScriptProperties::default(),
            first + chrono::Duration::minutes(5),
        ));
        backup
    }

    #[test]
    fn test_write_then_read() {
        let backup = sample();
        let xml = write_backup(&backup).unwrap();
        let reread = parse_backup(&xml).unwrap();
        assert_eq!(reread, backup);
        assert_eq!(reread.get(0).unwrap().text(), "  * leading spaces\n$ship = null\n\nreturn null\n");
        assert_eq!(reread.get(1).unwrap().text(), "");
    }

    #[test]
    fn test_unknown_backup_type() {
        let err = parse_backup(r#"<revisions type="LUA" version="1"></revisions>"#).unwrap_err();
        assert!(matches!(err, BackupError::InvalidValue { .. }));
    }

    #[test]
    fn test_missing_type_is_format_error() {
        let err = parse_backup(r#"<revisions version="1"/>"#).unwrap_err();
        assert!(matches!(err, BackupError::FileFormat(_)));
    }

    #[test]
    fn test_empty_history() {
        let backup = parse_backup(r#"<revisions type="md"/>"#).unwrap();
        assert_eq!(backup.backup_type(), BackupType::MissionDirector);
        assert!(backup.is_empty());
    }

    #[test]
    fn test_structural_corruption() {
        // no content
        let xml = r#"<revisions type="MSCI"><revision title="a" date="2024-05-01T10:00:00Z" path="a.xml"></revision></revisions>"#;
        assert!(matches!(parse_backup(xml), Err(BackupError::FileFormat(_))));

        // bad date
        let xml = r#"<revisions type="MSCI"><revision title="a" date="yesterday" path="a.xml"><content/></revision></revisions>"#;
        assert!(matches!(parse_backup(xml), Err(BackupError::FileFormat(_))));

        // truncated
        let xml = r#"<revisions type="MSCI"><revision title="a" date="2024-05-01T10:00:00Z" path="a.xml"><content>abc"#;
        assert!(matches!(parse_backup(xml), Err(BackupError::FileFormat(_))));

        // stray element
        let xml = r#"<revisions type="MSCI"><banana/></revisions>"#;
        assert!(matches!(parse_backup(xml), Err(BackupError::FileFormat(_))));
    }
}
