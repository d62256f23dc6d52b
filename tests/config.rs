//! Store configuration loading

use std::io::Write;

use boardroles::*;
use tempfile::{NamedTempFile, TempDir};

#[test]
fn missing_fields_take_defaults() {
    let c = StoreConfig::from_json_str(r#"{"path": "/tmp/roles", "cache_masks": false}"#).unwrap();
    assert_eq!(c.path.to_str(), Some("/tmp/roles"));
    assert!(!c.cache_masks);
    assert_eq!(c.map_size, StoreConfig::default().map_size);
    assert_eq!(c.cache_capacity, 4096);
}

#[test]
fn invalid_values_are_rejected() {
    assert!(matches!(StoreConfig::from_json_str(r#"{"map_size": 10}"#), Err(Error::Config(_))));
    assert!(matches!(StoreConfig::from_json_str(r#"{"max_readers": 0}"#), Err(Error::Config(_))));
    assert!(matches!(StoreConfig::from_json_str(r#"{"path": ""}"#), Err(Error::Config(_))));
    assert!(matches!(StoreConfig::from_json_str("{"), Err(Error::Config(_))));
}

#[test]
fn load_from_file_and_open() {
    let dir = TempDir::new().unwrap();
    let mut f = NamedTempFile::new().unwrap();
    let db = dir.path().join("roles");
    write!(f, r#"{{"path": {:?}, "cache_capacity": 8}}"#, db.to_str().unwrap()).unwrap();

    let c = StoreConfig::from_json_file(f.path()).unwrap();
    assert_eq!(c.cache_capacity, 8);
    let store = Store::open_seeded(c.clone(), Registry::with_defaults()).unwrap();
    assert_eq!(store.config(), &c);
    assert!(db.exists());
}

#[test]
fn missing_file_is_a_config_error() {
    let dir = TempDir::new().unwrap();
    let e = StoreConfig::from_json_file(dir.path().join("absent.json")).unwrap_err();
    assert!(matches!(e, Error::Config(_)));
}

/// A smaller catalog still seeds; unknown default keys are skipped
#[test]
fn custom_registry() {
    let dir = TempDir::new().unwrap();
    let mut reg = Registry::new();
    reg.register("board.post.create.thread").unwrap();
    reg.register("board.post.sticky").unwrap();
    let store = Store::open_seeded(StoreConfig::new(dir.path()), reg).unwrap();

    assert!(store.overrides(SystemRole::Janitor.id()).unwrap().is_empty());
    assert!(store.compile_for(None, None).unwrap().allows("board.post.create.thread").unwrap());
    // no sys.config in this catalog, so nobody has authority
    store.assign_role(1, SystemRole::Absolute.id()).unwrap();
    assert_eq!(Actor::Authenticated(1).authority(&store, None).unwrap(), Authority::NONE);
}

#[test]
fn registry_rejects_malformed_keys() {
    let mut reg = Registry::new();
    assert!(matches!(reg.register("Board.Post"), Err(Error::InvalidInput(_))));
    assert!(matches!(reg.register("board..post"), Err(Error::InvalidInput(_))));
    let a = reg.register("board.post").unwrap();
    assert_eq!(reg.register("board.post").unwrap(), a);
}
