//! Backup file writer
//!
//! Always writes the whole history; there is no incremental append on disk.

use chrono::SecondsFormat;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Write;

use super::error::BackupError;
use super::file::BackupFile;
use super::reader::BACKUP_FORMAT_VERSION;
use super::revision::ScriptRevision;

/// Serialize a backup file to XML text
pub fn write_backup(backup: &BackupFile) -> Result<String, BackupError> {
    let mut buffer = Vec::new();
    write_backup_to(backup, &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).to_string())
}

/// Serialize a backup file into a stream
///
/// The caller owns the stream and decides where it points.
pub fn write_backup_to<W: Write>(backup: &BackupFile, stream: W) -> Result<(), BackupError> {
    let mut writer = Writer::new_with_indent(stream, b' ', 4);

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let version = BACKUP_FORMAT_VERSION.to_string();
    let mut root = BytesStart::new("revisions");
    root.push_attribute(("type", backup.backup_type().as_str()));
    root.push_attribute(("version", version.as_str()));
    writer.write_event(Event::Start(root))?;

    for revision in backup {
        write_revision(&mut writer, revision)?;
    }

    writer.write_event(Event::End(BytesEnd::new("revisions")))?;
    writer.get_mut().write_all(b"\n")?;
    Ok(())
}

fn write_revision<W: Write>(writer: &mut Writer<W>, revision: &ScriptRevision) -> Result<(), BackupError> {
    let date = revision
        .timestamp()
        .to_rfc3339_opts(SecondsFormat::AutoSi, true);
    let path = revision.path().text();

    let mut elem = BytesStart::new("revision");
    elem.push_attribute(("title", revision.title()));
    elem.push_attribute(("date", date.as_str()));
    elem.push_attribute(("path", path.as_str()));
    writer.write_event(Event::Start(elem))?;

    let props = revision.properties();
    let version = props.version.to_string();
    let engine_version = props.engine_version.to_string();
    let mut script = BytesStart::new("script");
    script.push_attribute(("name", props.name.as_str()));
    script.push_attribute(("version", version.as_str()));
    script.push_attribute(("engineversion", engine_version.as_str()));
    script.push_attribute(("commandid", props.command_id.as_str()));
    writer.write_event(Event::Start(script))?;

    writer.write_event(Event::Start(BytesStart::new("description")))?;
    writer.write_event(Event::Text(BytesText::new(&props.description)))?;
    writer.write_event(Event::End(BytesEnd::new("description")))?;

    for arg in &props.arguments {
        let mut elem = BytesStart::new("argument");
        elem.push_attribute(("name", arg.name.as_str()));
        elem.push_attribute(("type", arg.param_type.as_str()));
        elem.push_attribute(("description", arg.description.as_str()));
        writer.write_event(Event::Empty(elem))?;
    }
    writer.write_event(Event::End(BytesEnd::new("script")))?;

    // Text goes straight after the start tag so whitespace survives untouched
    writer.write_event(Event::Start(BytesStart::new("content")))?;
    writer.write_event(Event::Text(BytesText::new(revision.text())))?;
    writer.write_event(Event::End(BytesEnd::new("content")))?;

    writer.write_event(Event::End(BytesEnd::new("revision")))?;
    Ok(())
}
