//! Tests for revision history (backup) handling

use pretty_assertions::assert_eq;
use std::fs;
use tempfile::TempDir;
use xstudio_core::backup::{read_backup, BackupError, BackupFile, BackupType, ScriptRevision};
use xstudio_core::config::{BackupSettings, WriteMode};
use xstudio_core::path::FilePath;
use xstudio_core::project::{ProjectDocument, ProjectError, INITIAL_COMMIT_TITLE};
use xstudio_core::script::{ScriptDocument, ScriptProperties, XmlScriptReader};

const MAIN_SCRIPT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<script>
  <name>plugin.mymod.main</name>
  <version>3</version>
  <engineversion>44</engineversion>
  <description>Main loop &amp; setup</description>
  <arguments>
    <argument index="1" name="ship" type="Var/Ship" desc="Target ship"/>
  </arguments>
  <sourcetext>  indented
	tabbed</sourcetext>
</script>
"#;

fn project_with_script(settings: BackupSettings) -> (TempDir, ProjectDocument, FilePath) {
    let temp = TempDir::new().unwrap();
    let script = FilePath::new(temp.path().join("plugin.mymod.main.xml"));
    fs::write(&script, MAIN_SCRIPT).unwrap();

    let mut doc = ProjectDocument::new(temp.path().join("MyMod.xprj"), settings);
    assert!(doc.add_file(script.clone()).unwrap());
    (temp, doc, script)
}

#[test]
fn test_initial_commit_reads_back_one_revision() {
    let (_temp, doc, script) = project_with_script(BackupSettings::default());

    let name = doc.project().find(&script).unwrap().backup_name().unwrap().to_string();
    let history = read_backup(doc.backups().path_of(&name)).unwrap();

    assert_eq!(history.len(), 1);
    assert_eq!(history.backup_type(), BackupType::Msci);
    let first = history.get(0).unwrap();
    assert_eq!(first.title(), INITIAL_COMMIT_TITLE);
    assert_eq!(first.text(), MAIN_SCRIPT);
    assert_eq!(first.path(), &script);

    let props = first.properties();
    assert_eq!(props.name, "plugin.mymod.main");
    assert_eq!(props.version, 3);
    assert_eq!(props.engine_version, 44);
    assert_eq!(props.description, "Main loop & setup");
    assert_eq!(props.arguments.len(), 1);
    assert_eq!(props.arguments[0].param_type, "Var/Ship");
}

#[test]
fn test_commits_append_and_keep_order() {
    for mode in [WriteMode::Overwrite, WriteMode::Atomic] {
        let settings = BackupSettings {
            write_mode: mode,
            ..BackupSettings::default()
        };
        let (_temp, mut doc, script) = project_with_script(settings);

        let mut editor = ScriptDocument::load(&XmlScriptReader, script.clone()).unwrap();
        editor.text.push_str("<!-- one -->\u{b}");
        assert_eq!(doc.commit(&editor, "First change").unwrap(), 2);
        editor.text.push_str("<!-- two -->");
        assert_eq!(doc.commit(&editor, "Second change").unwrap(), 3);

        let history = doc.revisions(&script).unwrap();
        let titles: Vec<&str> = history.iter().map(|r| r.title()).collect();
        assert_eq!(titles, vec![INITIAL_COMMIT_TITLE, "First change", "Second change"]);
        assert_eq!(
            history.latest().unwrap().text(),
            format!("{}<!-- one -->\n<!-- two -->", MAIN_SCRIPT)
        );
    }
}

#[test]
fn test_commit_untracked_file_is_rejected() {
    let (temp, mut doc, script) = project_with_script(BackupSettings::default());
    let before = doc.revisions(&script).unwrap();

    let stray = ScriptDocument::new(
        temp.path().join("stray.xml"),
        "<script/>",
        ScriptProperties::default(),
    );
    assert!(matches!(
        doc.commit(&stray, "Nope"),
        Err(ProjectError::Argument(_))
    ));
    assert_eq!(doc.revisions(&script).unwrap(), before);
}

#[test]
fn test_same_named_files_get_distinct_backups() {
    let temp = TempDir::new().unwrap();
    fs::create_dir_all(temp.path().join("a")).unwrap();
    fs::create_dir_all(temp.path().join("b")).unwrap();
    let first = FilePath::new(temp.path().join("a").join("setup.xml"));
    let second = FilePath::new(temp.path().join("b").join("setup.xml"));
    fs::write(&first, "<script><name>a</name></script>").unwrap();
    fs::write(&second, "<script><name>b</name></script>").unwrap();

    let mut doc = ProjectDocument::new(temp.path().join("Mod.xprj"), BackupSettings::default());
    doc.add_file(first.clone()).unwrap();
    doc.add_file(second.clone()).unwrap();

    let names: Vec<&str> = [&first, &second]
        .iter()
        .map(|p| doc.project().find(p).unwrap().backup_name().unwrap())
        .collect();
    assert_eq!(names, vec!["setup.xbak", "setup (2).xbak"]);
    assert_eq!(doc.revisions(&second).unwrap().get(0).unwrap().properties().name, "b");
}

#[test]
fn test_mission_files_use_md_backups() {
    let temp = TempDir::new().unwrap();
    let md = FilePath::new(temp.path().join("director.xml"));
    fs::write(&md, "<director name=\"test\"/>").unwrap();

    let mut doc = ProjectDocument::new(temp.path().join("Mod.xprj"), BackupSettings::default());
    doc.add_file(md.clone()).unwrap();
    assert_eq!(
        doc.revisions(&md).unwrap().backup_type(),
        BackupType::MissionDirector
    );
}

#[test]
fn test_corrupt_backup_is_reported() {
    let (_temp, mut doc, script) = project_with_script(BackupSettings::default());
    let name = doc.project().find(&script).unwrap().backup_name().unwrap().to_string();
    fs::write(doc.backups().path_of(&name), "<revisions type=\"MSCI\" version=\"1\"><revision").unwrap();

    let editor = ScriptDocument::load(&XmlScriptReader, script.clone()).unwrap();
    assert!(matches!(
        doc.commit(&editor, "After corruption"),
        Err(ProjectError::Backup(_))
    ));
}

#[test]
fn test_unknown_backup_type_is_invalid_value() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("x.xbak");
    fs::write(&path, "<?xml version=\"1.0\"?>\n<revisions type=\"LUA\" version=\"1\"></revisions>\n").unwrap();
    assert!(matches!(
        read_backup(&path),
        Err(BackupError::InvalidValue { .. })
    ));
}

#[test]
fn test_history_is_append_only() {
    let mut history = BackupFile::new(BackupType::Msci);
    for title in ["a", "b", "c"] {
        let before = history.revisions().to_vec();
        history.commit(ScriptRevision::new(title, "x.xml", title, ScriptProperties::default()));
        assert_eq!(history.len(), before.len() + 1);
        assert_eq!(&history.revisions()[..before.len()], &before[..]);
    }
}
