//! Script file reading
//!
//! The script compiler lives outside this crate. What the revision engine needs
//! from a script file is its text plus the compiled header properties, which is
//! what a [`ScriptReader`] provides.
//!
//! MSCI scripts are XML files with a header like:
//! ```text
//! <script>
//!   <name>plugin.mymod.main</name>
//!   <version>3</version>
//!   <engineversion>44</engineversion>
//!   <description>Main loop</description>
//!   <arguments>
//!     <argument index="1" name="ship" type="Var/Ship" desc="Target ship"/>
//!   </arguments>
//!   ...
//! </script>
//! ```

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::path::FilePath;
use crate::project::ProjectError;

/// Compiled header properties of a script
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptProperties {
    /// Script name as the game knows it
    pub name: String,
    /// Script version
    pub version: u32,
    /// Engine version the script was compiled for
    pub engine_version: u32,
    /// Free-form description
    pub description: String,
    /// Command ID for command scripts, empty otherwise
    pub command_id: String,
    /// Declared arguments in order
    pub arguments: Vec<ScriptArgument>,
}

/// A declared script argument
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptArgument {
    /// Argument name
    pub name: String,
    /// Parameter type, e.g. `Var/Ship`
    pub param_type: String,
    /// Description shown to the player
    pub description: String,
}

/// Text and compiled form of a script file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptContent {
    /// Full script text
    pub text: String,
    /// Compiled header
    pub properties: ScriptProperties,
}

/// Reads a script file into text and compiled form
pub trait ScriptReader: Send {
    /// Read the script at `path`
    fn read(&self, path: &FilePath) -> Result<ScriptContent, ProjectError>;
}

/// Reads script files straight from disk, parsing the MSCI header if present
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlScriptReader;

impl ScriptReader for XmlScriptReader {
    fn read(&self, path: &FilePath) -> Result<ScriptContent, ProjectError> {
        let text = read_text(path.as_path())?;
        let properties = parse_properties(&text)?;
        Ok(ScriptContent { text, properties })
    }
}

/// A script open in an editor
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptDocument {
    /// Where the script lives
    pub path: FilePath,
    /// Current editor text
    pub text: String,
    /// Current compiled header
    pub properties: ScriptProperties,
}

impl ScriptDocument {
    /// Create a document from already-loaded content
    pub fn new(path: impl Into<FilePath>, text: impl Into<String>, properties: ScriptProperties) -> Self {
        Self {
            path: path.into(),
            text: text.into(),
            properties,
        }
    }

    /// Load a document from disk through `reader`
    pub fn load(reader: &dyn ScriptReader, path: impl Into<FilePath>) -> Result<Self, ProjectError> {
        let path = path.into();
        let content = reader.read(&path)?;
        Ok(Self {
            path,
            text: content.text,
            properties: content.properties,
        })
    }

    /// Text as stored in a revision
    ///
    /// Editor controls use `\v` for soft line breaks; revisions store plain `\n`.
    pub fn revision_text(&self) -> String {
        self.text.replace('\u{b}', "\n")
    }
}

/// Read a text file, falling back to ISO-8859-1 when it is not valid UTF-8
pub(crate) fn read_text(path: &Path) -> Result<String, ProjectError> {
    let bytes = fs::read(path)?;
    Ok(match String::from_utf8(bytes) {
        Ok(s) => s,
        // ISO-8859-1 is a direct byte-to-codepoint mapping
        Err(e) => e.into_bytes().iter().map(|&b| b as char).collect(),
    })
}

/// Parse the `<script>` header. Non-script documents give default properties.
pub fn parse_properties(xml: &str) -> Result<ScriptProperties, ProjectError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut props = ScriptProperties::default();
    let mut stack: Vec<String> = Vec::new();
    let mut is_script = false;
    let mut text_buf = String::new();

    loop {
        let event = match reader.read_event() {
            Ok(event) => event,
            // Only complain about malformed XML once we know it is a script
            Err(e) if is_script => {
                return Err(ProjectError::FileFormat {
                    position: reader.buffer_position() as usize,
                    message: e.to_string(),
                })
            }
            Err(_) => return Ok(ScriptProperties::default()),
        };

        match event {
            Event::Start(ref e) => {
                let name = element_name(e);
                if stack.is_empty() {
                    if name != "script" {
                        return Ok(ScriptProperties::default());
                    }
                    is_script = true;
                }
                stack.push(name);
                text_buf.clear();
            }
            Event::Empty(ref e) => {
                let name = element_name(e);
                if stack.is_empty() {
                    return Ok(ScriptProperties::default());
                }
                if name == "argument" && stack.last().map(String::as_str) == Some("arguments") {
                    props.arguments.push(parse_argument(e));
                }
            }
            Event::Text(ref e) => {
                text_buf = e.unescape().unwrap_or_default().to_string();
            }
            Event::CData(ref e) => {
                text_buf = String::from_utf8_lossy(e.as_ref()).to_string();
            }
            Event::End(_) => {
                let name = stack.pop().unwrap_or_default();
                if stack.len() == 1 {
                    apply_header_field(&mut props, &name, &text_buf);
                }
                text_buf.clear();
                if stack.is_empty() {
                    break;
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(props)
}

fn apply_header_field(props: &mut ScriptProperties, field: &str, value: &str) {
    match field {
        "name" => props.name = value.to_string(),
        "version" => props.version = value.trim().parse().unwrap_or(0),
        "engineversion" => props.engine_version = value.trim().parse().unwrap_or(0),
        "description" => props.description = value.to_string(),
        "commandid" => props.command_id = value.to_string(),
        _ => {}
    }
}

fn parse_argument(e: &BytesStart) -> ScriptArgument {
    let mut arg = ScriptArgument::default();
    for attr in e.attributes().flatten() {
        let value = attr
            .unescape_value()
            .map(|v| v.to_string())
            .unwrap_or_default();
        match attr.key.as_ref() {
            b"name" => arg.name = value,
            b"type" => arg.param_type = value,
            b"desc" => arg.description = value,
            _ => {}
        }
    }
    arg
}

fn element_name(e: &BytesStart) -> String {
    String::from_utf8_lossy(e.name().as_ref()).to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SCRIPT: &str = r#"<?xml version="1.0" standalone="yes"?>
<?xml-stylesheet href="x2script.xsl" type="text/xsl" ?>
<script>
<name>plugin.test.main</name>
<version>3</version>
<engineversion>44</engineversion>
<description>Test &amp; demo</description>
<arguments>
<argument index="1" name="ship" type="Var/Ship" desc="Target ship"/>
<argument index="2" name="count" type="Number" desc="How many"/>
</arguments>
<sourcetext><line linenr="001" indent=""><text>return null</text></line></sourcetext>
</script>
"#;

    #[test]
    fn test_parse_script_header() {
        let props = parse_properties(SCRIPT).unwrap();
        assert_eq!(props.name, "plugin.test.main");
        assert_eq!(props.version, 3);
        assert_eq!(props.engine_version, 44);
        assert_eq!(props.description, "Test & demo");
        assert_eq!(props.arguments.len(), 2);
        assert_eq!(props.arguments[0].name, "ship");
        assert_eq!(props.arguments[0].param_type, "Var/Ship");
        assert_eq!(props.arguments[1].description, "How many");
    }

    #[test]
    fn test_non_script_gives_defaults() {
        let props = parse_properties("<language id=\"44\"><page id=\"1\"/></language>").unwrap();
        assert_eq!(props, ScriptProperties::default());

        let props = parse_properties("just some text, not xml at all").unwrap();
        assert_eq!(props, ScriptProperties::default());
    }

    #[test]
    fn test_reader_keeps_exact_text() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("plugin.test.main.xml");
        fs::write(&path, SCRIPT).unwrap();

        let content = XmlScriptReader.read(&FilePath::new(&path)).unwrap();
        assert_eq!(content.text, SCRIPT);
        assert_eq!(content.properties.name, "plugin.test.main");
    }

    #[test]
    fn test_latin1_fallback() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("notes.txt");
        fs::write(&path, [b'M', 0xFC, b'n']).unwrap();

        let content = XmlScriptReader.read(&FilePath::new(&path)).unwrap();
        assert_eq!(content.text, "M\u{fc}n");
    }

    #[test]
    fn test_revision_text_normalises_soft_breaks() {
        let doc = ScriptDocument::new("a.xml", "line1\u{b}line2\nline3", ScriptProperties::default());
        assert_eq!(doc.revision_text(), "line1\nline2\nline3");
    }
}
