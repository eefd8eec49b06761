mod common;

use common::{add, hasher, registry, PLAYER, TEAM};
use docmodel_engine::{EngineError, EntityRepository, ModelRegistry, UserAccounts};
use docmodel_model::{parse_definition, CompileOptions};
use docmodel_storage::DocumentStore;
use docmodel_types::EntityId;
use serde_json::json;
use std::sync::Arc;

fn setup() -> (EntityRepository, UserAccounts) {
    let registry = registry();
    let accounts = UserAccounts::from_registry(Arc::clone(&registry)).unwrap();
    (EntityRepository::new(registry), accounts)
}

#[test]
fn find_by_id_is_sanitized() {
    let (repo, accounts) = setup();
    let id = add(&repo, "user", json!({ "account": "wade", "password": "flash3" }));
    let user = accounts.find_by_id(&id).unwrap().unwrap();
    assert_eq!(user["account"], json!("wade"));
    assert!(user.get("password").is_none());

    assert!(accounts.find_by_id(&EntityId::new().to_string()).unwrap().is_none());
    assert!(matches!(
        accounts.find_by_id("nope").unwrap_err(),
        EngineError::InvalidId { .. }
    ));
}

#[test]
fn verify_password_by_id() {
    let (repo, accounts) = setup();
    let id = add(&repo, "user", json!({ "account": "wade", "password": "flash3" }));
    assert!(accounts.verify_password(&id, "flash3").unwrap());
    assert!(!accounts.verify_password(&id, "flash4").unwrap());
    assert!(!accounts.verify_password(&EntityId::new().to_string(), "flash3").unwrap());
}

#[test]
fn authenticate_by_login_field() {
    let (repo, accounts) = setup();
    add(&repo, "user", json!({ "account": "bosh", "password": "cb1" }));
    let wade = add(&repo, "user", json!({ "account": "wade", "password": "flash3" }));

    let user = accounts.authenticate("account", "wade", "flash3").unwrap().unwrap();
    assert_eq!(user["_id"], json!(wade));
    assert!(user.get("password").is_none());

    assert!(accounts.authenticate("account", "wade", "cb1").unwrap().is_none());
    assert!(accounts.authenticate("account", "shaq", "flash3").unwrap().is_none());
}

#[test]
fn user_without_password_never_authenticates() {
    let (repo, accounts) = setup();
    add(&repo, "user", json!({ "account": "guest" }));
    assert!(accounts.authenticate("account", "guest", "").unwrap().is_none());
}

#[test]
fn registry_without_user_model() {
    let defs = vec![
        parse_definition(TEAM).unwrap(),
        parse_definition(PLAYER).unwrap(),
    ];
    let registry = ModelRegistry::build(
        &defs,
        DocumentStore::open_in_memory().unwrap(),
        hasher(),
        &CompileOptions::default(),
    )
    .unwrap();
    let err = UserAccounts::from_registry(Arc::new(registry)).unwrap_err();
    assert!(matches!(err, EngineError::ModelNotFound(ref n) if n == "user"));
}
