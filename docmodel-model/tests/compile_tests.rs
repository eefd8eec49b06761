use docmodel_model::{
    compile, compile_all, compile_definition, expand, parse_definition, resolve, CompileError,
    CompileOptions, CompiledSchema, FieldDefinition, ModelDefinition, PrimitiveType,
    ResolvedKind, StorageType,
};
use pretty_assertions::assert_eq;
use std::collections::BTreeMap;

fn def(json: &str) -> ModelDefinition {
    parse_definition(json).unwrap()
}

fn by_name(schemas: Vec<CompiledSchema>) -> BTreeMap<String, CompiledSchema> {
    schemas.into_iter().map(|s| (s.name.clone(), s)).collect()
}

fn opts() -> CompileOptions {
    CompileOptions::default()
}

// ── Type resolution ──────────────────────────────────────────────

#[test]
fn primitive_tokens() {
    for (token, primitive) in [
        ("text", PrimitiveType::Text),
        ("textarea", PrimitiveType::Textarea),
        ("number", PrimitiveType::Number),
        ("boolean", PrimitiveType::Boolean),
        ("date", PrimitiveType::Date),
        ("array", PrimitiveType::Array),
    ] {
        assert_eq!(resolve(token), ResolvedKind::Primitive(primitive));
        assert_eq!(primitive.token(), token);
    }
}

#[test]
fn extended_tokens() {
    assert_eq!(resolve("model.user"), ResolvedKind::ModelRef("user"));
    assert_eq!(resolve("submodel.group"), ResolvedKind::SubmodelRef("group"));
    assert_eq!(resolve("map"), ResolvedKind::Map);
    assert_eq!(resolve("password"), ResolvedKind::Password);
}

#[test]
fn references_need_a_name() {
    assert_eq!(resolve("model"), ResolvedKind::Unknown);
    assert_eq!(resolve("submodel."), ResolvedKind::Unknown);
    assert_eq!(resolve("Text"), ResolvedKind::Unknown);
    assert_eq!(resolve(""), ResolvedKind::Unknown);
}

// ── Flat models ──────────────────────────────────────────────────

#[test]
fn flat_model_maps_fields_one_to_one() {
    let user = def(r#"{ "name": "user", "fields": [
        { "name": "name", "type": "text" },
        { "name": "bio", "type": "textarea" },
        { "name": "age", "type": "number" },
        { "name": "active", "type": "boolean" },
        { "name": "born", "type": "date" },
        { "name": "tags", "type": "array" } ] }"#);

    let schemas = compile_definition(&user, &opts()).unwrap();
    assert_eq!(schemas.len(), 1);
    let schema = &schemas[0];
    assert_eq!(schema.name, "user");

    let expected: BTreeMap<String, StorageType> = [
        ("name", StorageType::String),
        ("bio", StorageType::String),
        ("age", StorageType::Number),
        ("active", StorageType::Boolean),
        ("born", StorageType::Date),
        ("tags", StorageType::Array),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect();
    assert_eq!(schema.storage_fields, expected);
    assert!(schema.behaviors.auto_timestamp);
    assert_eq!(schema.behaviors.password_field, None);
    assert!(schema.behaviors.auto_populate_refs.is_empty());
}

#[test]
fn unknown_type_names_field_and_token() {
    let bad = def(r#"{ "name": "user", "fields": [ { "name": "salary", "type": "decimal" } ] }"#);
    match compile_definition(&bad, &opts()).unwrap_err() {
        CompileError::UnknownType { model, field, token } => {
            assert_eq!(model, "user");
            assert_eq!(field, "salary");
            assert_eq!(token, "decimal");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn unknown_type_inside_map_reports_dotted_path() {
    let bad = def(r#"{ "name": "user", "fields": [
        { "name": "meta", "type": "map", "children": [ { "name": "x", "type": "blob" } ] } ] }"#);
    let err = compile_definition(&bad, &opts()).unwrap_err();
    assert!(matches!(err, CompileError::UnknownType { ref field, .. } if field == "meta.x"));
}

// ── Maps ─────────────────────────────────────────────────────────

#[test]
fn map_compiles_to_nested_object() {
    let profile = def(r#"{ "name": "profile", "fields": [
        { "name": "address", "type": "map", "children": [
            { "name": "city", "type": "text" },
            { "name": "geo", "type": "map", "children": [ { "name": "lat", "type": "number" } ] } ] } ] }"#);

    let schema = compile_definition(&profile, &opts()).unwrap().remove(0);
    assert_eq!(schema.field_type("address.city"), Some(&StorageType::String));
    assert_eq!(schema.field_type("address.geo.lat"), Some(&StorageType::Number));
    assert_eq!(schema.field_type("address.zip"), None);
    assert_eq!(schema.field_type("address.city.x"), None);
}

#[test]
fn reference_inside_map_is_populated_by_dotted_path() {
    let defs = vec![
        def(r#"{ "name": "user", "fields": [ { "name": "name", "type": "text" } ] }"#),
        def(r#"{ "name": "post", "fields": [
            { "name": "meta", "type": "map", "children": [ { "name": "author", "type": "model.user" } ] } ] }"#),
    ];
    let schemas = by_name(compile_all(&defs, &opts()).unwrap());
    assert_eq!(schemas["post"].behaviors.auto_populate_refs, vec!["meta.author"]);
    assert_eq!(schemas["post"].references(), vec![("meta.author", "user")]);
}

// ── Submodels ────────────────────────────────────────────────────

const WORD: &str = r#"{
  "name": "word",
  "fields": [
    { "name": "text", "type": "text" },
    { "name": "group", "type": "submodel.group" },
    { "name": "list", "type": "submodel.list" }
  ],
  "submodels": [
    { "name": "group", "fields": [ { "name": "title", "type": "text" } ] },
    { "name": "list", "fields": [ { "name": "title", "type": "text" } ] }
  ]
}"#;

#[test]
fn submodels_are_promoted_with_derived_names() {
    let schemas = by_name(compile_definition(&def(WORD), &opts()).unwrap());
    let names: Vec<&str> = schemas.keys().map(String::as_str).collect();
    assert_eq!(names, vec!["word", "word_group", "word_list"]);

    let word = &schemas["word"];
    assert_eq!(
        word.field_type("group"),
        Some(&StorageType::ObjectRef { target: "word_group".into() })
    );
    assert_eq!(word.behaviors.auto_populate_refs, vec!["group", "list"]);
    assert_eq!(schemas["word_group"].field_type("title"), Some(&StorageType::String));
}

#[test]
fn expansion_rewrites_submodel_fields() {
    let expansion = expand(&def(WORD)).unwrap();
    assert_eq!(
        expansion["word"][1],
        FieldDefinition::new("group", "model.word_group")
    );
    assert_eq!(expansion["word_list"], vec![FieldDefinition::new("title", "text")]);
}

#[test]
fn nested_submodels_prefix_with_their_parent_schema() {
    let doc = def(r#"{
      "name": "book",
      "fields": [ { "name": "chapter", "type": "submodel.chapter" } ],
      "submodels": [
        { "name": "chapter",
          "fields": [ { "name": "page", "type": "submodel.page" } ],
          "submodels": [ { "name": "page", "fields": [ { "name": "n", "type": "number" } ] } ] }
      ]
    }"#);
    let schemas = by_name(compile_definition(&doc, &opts()).unwrap());
    assert!(schemas.contains_key("book_chapter_page"));
    assert_eq!(
        schemas["book_chapter"].field_type("page"),
        Some(&StorageType::ObjectRef { target: "book_chapter_page".into() })
    );
}

#[test]
fn submodel_may_reference_a_sibling_declared_at_document_root() {
    let doc = def(r#"{
      "name": "shop",
      "fields": [ { "name": "order", "type": "submodel.order" } ],
      "submodels": [
        { "name": "order", "fields": [ { "name": "item", "type": "submodel.item" } ] },
        { "name": "item", "fields": [ { "name": "sku", "type": "text" } ] }
      ]
    }"#);
    let schemas = by_name(compile_all(&[doc], &opts()).unwrap());
    assert!(schemas.contains_key("shop_order_item"));
    // Declared but only reachable through `order`.
    assert!(!schemas.contains_key("shop_item"));
}

#[test]
fn submodel_referenced_twice_is_emitted_once() {
    let doc = def(r#"{
      "name": "match",
      "fields": [ { "name": "home", "type": "submodel.team" }, { "name": "away", "type": "submodel.team" } ],
      "submodels": [ { "name": "team", "fields": [ { "name": "name", "type": "text" } ] } ]
    }"#);
    let schemas = compile_definition(&doc, &opts()).unwrap();
    assert_eq!(schemas.len(), 2);
}

#[test]
fn submodel_inside_map_is_promoted() {
    let doc = def(r#"{
      "name": "event",
      "fields": [ { "name": "where", "type": "map", "children": [ { "name": "venue", "type": "submodel.venue" } ] } ],
      "submodels": [ { "name": "venue", "fields": [ { "name": "name", "type": "text" } ] } ]
    }"#);
    let schemas = by_name(compile_all(&[doc], &opts()).unwrap());
    assert_eq!(
        schemas["event"].field_type("where.venue"),
        Some(&StorageType::ObjectRef { target: "event_venue".into() })
    );
}

#[test]
fn undeclared_submodel_fails() {
    let doc = def(r#"{ "name": "word", "fields": [ { "name": "group", "type": "submodel.group" } ] }"#);
    match compile_all(&[doc], &opts()).unwrap_err() {
        CompileError::MissingSubmodel { model, field, submodel } => {
            assert_eq!(model, "word");
            assert_eq!(field, "group");
            assert_eq!(submodel, "group");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn self_referencing_submodel_is_a_cycle() {
    let doc = def(r#"{
      "name": "tree",
      "fields": [ { "name": "root", "type": "submodel.node" } ],
      "submodels": [ { "name": "node", "fields": [ { "name": "child", "type": "submodel.node" } ] } ]
    }"#);
    match compile_all(&[doc], &opts()).unwrap_err() {
        CompileError::CyclicSubmodel { model, chain } => {
            assert_eq!(model, "tree");
            assert_eq!(chain, "node -> node");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn mutual_submodel_references_are_a_cycle() {
    let doc = def(r#"{
      "name": "graph",
      "fields": [ { "name": "a", "type": "submodel.a" } ],
      "submodels": [
        { "name": "a", "fields": [ { "name": "b", "type": "submodel.b" } ] },
        { "name": "b", "fields": [ { "name": "a", "type": "submodel.a" } ] }
      ]
    }"#);
    let err = compile_all(&[doc], &opts()).unwrap_err();
    assert!(matches!(err, CompileError::CyclicSubmodel { ref chain, .. } if chain == "a -> b -> a"));
}

#[test]
fn inner_submodel_may_reuse_an_ancestor_name() {
    let doc = def(r#"{
      "name": "x",
      "fields": [ { "name": "a", "type": "submodel.a" } ],
      "submodels": [
        { "name": "a",
          "fields": [ { "name": "inner", "type": "submodel.a" } ],
          "submodels": [ { "name": "a", "fields": [ { "name": "leaf", "type": "text" } ] } ] }
      ]
    }"#);
    let schemas = by_name(compile_all(&[doc], &opts()).unwrap());
    let names: Vec<&str> = schemas.keys().map(String::as_str).collect();
    assert_eq!(names, vec!["x", "x_a", "x_a_a"]);
    assert_eq!(
        schemas["x_a"].field_type("inner"),
        Some(&StorageType::ObjectRef { target: "x_a_a".into() })
    );
    assert_eq!(schemas["x_a_a"].field_type("leaf"), Some(&StorageType::String));
}

#[test]
fn inner_declaration_referencing_itself_is_still_a_cycle() {
    let doc = def(r#"{
      "name": "x",
      "fields": [ { "name": "a", "type": "submodel.a" } ],
      "submodels": [
        { "name": "a",
          "fields": [ { "name": "inner", "type": "submodel.a" } ],
          "submodels": [ { "name": "a", "fields": [ { "name": "again", "type": "submodel.a" } ] } ] }
      ]
    }"#);
    let err = compile_all(&[doc], &opts()).unwrap_err();
    assert!(matches!(err, CompileError::CyclicSubmodel { ref chain, .. } if chain == "a -> a -> a"), "{err}");
}

#[test]
fn unexpanded_submodel_given_to_compile_is_missing() {
    let fields = vec![FieldDefinition::new("group", "submodel.group")];
    let err = compile("word", &fields, &opts()).unwrap_err();
    assert!(matches!(err, CompileError::MissingSubmodel { .. }));
}

// ── References across documents ──────────────────────────────────

#[test]
fn cross_document_references_resolve() {
    let defs = vec![
        def(r#"{ "name": "review", "fields": [ { "name": "author", "type": "model.user" } ] }"#),
        def(r#"{ "name": "user", "fields": [ { "name": "name", "type": "text" } ] }"#),
    ];
    let schemas = by_name(compile_all(&defs, &opts()).unwrap());
    assert_eq!(schemas["review"].references(), vec![("author", "user")]);
}

#[test]
fn dangling_reference_fails() {
    let defs = vec![def(
        r#"{ "name": "review", "fields": [ { "name": "author", "type": "model.person" } ] }"#,
    )];
    match compile_all(&defs, &opts()).unwrap_err() {
        CompileError::DanglingReference { model, field, target } => {
            assert_eq!((model.as_str(), field.as_str(), target.as_str()), ("review", "author", "person"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn promoted_submodel_can_be_referenced_from_another_document() {
    let defs = vec![
        def(WORD),
        def(r#"{ "name": "quiz", "fields": [ { "name": "group", "type": "model.word_group" } ] }"#),
    ];
    assert!(compile_all(&defs, &opts()).is_ok());
}

#[test]
fn duplicate_model_names_fail() {
    let defs = vec![
        def(r#"{ "name": "user", "fields": [ { "name": "a", "type": "text" } ] }"#),
        def(r#"{ "name": "user", "fields": [ { "name": "b", "type": "text" } ] }"#),
    ];
    let err = compile_all(&defs, &opts()).unwrap_err();
    assert!(matches!(err, CompileError::DuplicateModel { ref name } if name == "user"));
}

#[test]
fn top_level_model_colliding_with_promoted_submodel_fails() {
    let defs = vec![def(WORD), def(r#"{ "name": "word_group", "fields": [] }"#)];
    let err = compile_all(&defs, &opts()).unwrap_err();
    assert!(matches!(err, CompileError::DuplicateModel { ref name } if name == "word_group"));
}

// ── Passwords ────────────────────────────────────────────────────

#[test]
fn password_field_is_stored_as_string() {
    let user = def(r#"{ "name": "user", "fields": [
        { "name": "account", "type": "text" }, { "name": "password", "type": "password" } ] }"#);
    let schema = compile_definition(&user, &opts()).unwrap().remove(0);
    assert_eq!(schema.field_type("password"), Some(&StorageType::String));
    assert_eq!(schema.behaviors.password_field.as_deref(), Some("password"));
    assert!(schema.is_password_path("password"));
    assert!(!schema.is_password_path("account"));
}

const TWO_PASSWORDS: &str = r#"{ "name": "user", "fields": [
    { "name": "pin", "type": "password" }, { "name": "secret", "type": "password" } ] }"#;

#[test]
fn multiple_password_fields_last_wins_by_default() {
    let schema = compile_definition(&def(TWO_PASSWORDS), &opts()).unwrap().remove(0);
    assert_eq!(schema.behaviors.password_field.as_deref(), Some("secret"));
}

#[test]
fn multiple_password_fields_rejected_in_strict_mode() {
    let strict = CompileOptions {
        strict_password_fields: true,
    };
    match compile_definition(&def(TWO_PASSWORDS), &strict).unwrap_err() {
        CompileError::AmbiguousPasswordField { model, fields } => {
            assert_eq!(model, "user");
            assert_eq!(fields, vec!["pin", "secret"]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

// ── Determinism ──────────────────────────────────────────────────

#[test]
fn recompiling_yields_identical_schemas() {
    let defs = vec![
        def(WORD),
        def(r#"{ "name": "user", "fields": [ { "name": "z", "type": "text" }, { "name": "a", "type": "model.word" } ] }"#),
    ];
    let first = compile_all(&defs, &opts()).unwrap();
    let second = compile_all(&defs, &opts()).unwrap();
    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

mod props {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn promoted_name_joins_parent_and_submodel(
            parent in "[a-z][a-z0-9]{0,8}",
            sub in "[a-z][a-z0-9]{0,8}",
        ) {
            let json = format!(
                r#"{{ "name": "{parent}",
                     "fields": [ {{ "name": "f", "type": "submodel.{sub}" }} ],
                     "submodels": [ {{ "name": "{sub}", "fields": [ {{ "name": "x", "type": "number" }} ] }} ] }}"#
            );
            let expansion = expand(&def(&json)).unwrap();
            let derived = format!("{parent}_{sub}");
            prop_assert!(expansion.contains_key(&derived));
            prop_assert_eq!(&expansion[&parent][0].type_token, &format!("model.{derived}"));
        }
    }
}
