use docmodel_model::{load_dir, load_named, parse_definition, CompileError, FieldDefinition};
use pretty_assertions::assert_eq;
use std::fs;
use tempfile::TempDir;

const WORD: &str = r#"{
  "name": "word",
  "fields": [
    { "name": "text", "type": "text" },
    { "name": "group", "type": "submodel.group" },
    { "name": "meta", "type": "map", "children": [ { "name": "lang", "type": "text" } ] }
  ],
  "submodels": [
    { "name": "group", "fields": [ { "name": "title", "type": "text" } ] }
  ]
}"#;

const USER: &str = r#"{
  "name": "user",
  "fields": [
    { "name": "account", "type": "text" },
    { "name": "password", "type": "password" }
  ]
}"#;

fn write(dir: &TempDir, file: &str, body: &str) {
    fs::write(dir.path().join(file), body).unwrap();
}

// ── parse_definition ─────────────────────────────────────────────

#[test]
fn parses_fields_children_and_submodels() {
    let def = parse_definition(WORD).unwrap();
    assert_eq!(def.name, "word");
    assert_eq!(def.fields.len(), 3);
    assert_eq!(def.fields[1], FieldDefinition::new("group", "submodel.group"));
    assert_eq!(
        def.fields[2],
        FieldDefinition::map("meta", vec![FieldDefinition::new("lang", "text")])
    );
    assert_eq!(def.submodels.len(), 1);
    assert_eq!(def.submodels[0].name, "group");
}

#[test]
fn submodels_are_optional() {
    let def = parse_definition(USER).unwrap();
    assert!(def.submodels.is_empty());
}

#[test]
fn missing_fields_section_is_a_read_error() {
    let err = parse_definition(r#"{ "name": "broken" }"#).unwrap_err();
    match err {
        CompileError::DefinitionRead { reason, .. } => assert!(reason.contains("fields")),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn missing_name_is_a_read_error() {
    let err = parse_definition(r#"{ "fields": [] }"#).unwrap_err();
    assert!(matches!(err, CompileError::DefinitionRead { .. }));
}

#[test]
fn empty_name_is_a_read_error() {
    let err = parse_definition(r#"{ "name": " ", "fields": [] }"#).unwrap_err();
    assert!(matches!(err, CompileError::DefinitionRead { .. }));
}

#[test]
fn map_without_children_is_a_read_error() {
    let err = parse_definition(
        r#"{ "name": "m", "fields": [ { "name": "meta", "type": "map" } ] }"#,
    )
    .unwrap_err();
    assert!(err.to_string().contains("meta"));
}

#[test]
fn duplicate_field_is_a_read_error() {
    let err = parse_definition(
        r#"{ "name": "m", "fields": [
            { "name": "a", "type": "text" },
            { "name": "a", "type": "number" } ] }"#,
    )
    .unwrap_err();
    assert!(err.to_string().contains("`a` twice"));
}

#[test]
fn unknown_type_tokens_pass_parsing() {
    // Reported by the compiler, which knows the model and field.
    let def = parse_definition(
        r#"{ "name": "m", "fields": [ { "name": "a", "type": "decimal" } ] }"#,
    )
    .unwrap();
    assert_eq!(def.fields[0].type_token, "decimal");
}

// ── load_dir / load_named ────────────────────────────────────────

#[test]
fn load_dir_reads_json_files_in_name_order() {
    let dir = TempDir::new().unwrap();
    write(&dir, "word.json", WORD);
    write(&dir, "user.json", USER);
    write(&dir, "README.md", "not a definition");

    let defs = load_dir(dir.path()).unwrap();
    let names: Vec<&str> = defs.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["user", "word"]);
}

#[test]
fn load_dir_reports_the_bad_file() {
    let dir = TempDir::new().unwrap();
    write(&dir, "user.json", USER);
    write(&dir, "zzz.json", "{ not json");

    let err = load_dir(dir.path()).unwrap_err();
    match err {
        CompileError::DefinitionRead { path, .. } => assert!(path.ends_with("zzz.json")),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn load_dir_missing_directory() {
    let dir = TempDir::new().unwrap();
    let err = load_dir(&dir.path().join("absent")).unwrap_err();
    assert!(matches!(err, CompileError::DefinitionRead { .. }));
}

#[test]
fn load_named_appends_extension() {
    let dir = TempDir::new().unwrap();
    write(&dir, "user.json", USER);

    assert_eq!(load_named(dir.path(), "user").unwrap().name, "user");
    assert_eq!(load_named(dir.path(), "user.json").unwrap().name, "user");
    assert!(load_named(dir.path(), "nobody").is_err());
}
