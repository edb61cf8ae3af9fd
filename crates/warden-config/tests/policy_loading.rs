use std::fs;
use std::path::{Path, PathBuf};

use warden_acl::{AccessError, Acl};
use warden_config::{ConfigError, WardenConfig, build_registry, load_policy_file};

const BASE: &str = r#"
[[declarations]]
resource = "Book"
action = "read,write"

[[declarations]]
resource = "Letter"
action = ["write", "send"]

[[declarations]]
role = "Reader"
access = [{ resource = "Book,Letter", action = "read" }]

[[declarations]]
role = "Writer"
access = [
    { role = "Author", access = { resource = "Book", action = "read,write,edit" } },
    { resource = "Letter", action = "send" },
]
"#;

const EXTRA: &str = r#"{
    "declarations": [
        { "resource": "Music", "action": "listen" },
        { "role": "Everyone", "access": { "role": "*" } },
        { "role": "Reviewer", "access": "Reader.Book.edit.or.Author" }
    ]
}"#;

fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
}

fn config_with(files: Vec<PathBuf>) -> WardenConfig {
    let mut config = WardenConfig::default();
    config.policy.files = files;
    config
}

#[test]
fn test_build_registry_from_files() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_with(vec![
        write(dir.path(), "base.toml", BASE),
        write(dir.path(), "extra.json", EXTRA),
    ]);

    let registry = build_registry(&config).unwrap();
    assert!(registry.is_locked());
    for role in ["Reader", "Writer", "Author", "Everyone", "Reviewer"] {
        assert!(registry.is_role(role), "{role}");
    }
    assert_eq!(
        registry.actions_of("Book").collect::<Vec<_>>(),
        vec!["read", "write", "edit"]
    );

    let required = registry.parse("Reviewer.or.Letter.send").unwrap();
    assert!(required.is_granted_to(&registry.parse("Writer").unwrap()));
    assert!(!required.is_granted_to(&registry.parse("Reader").unwrap()));

    let everyone = Acl::from_role(&registry, "Everyone").unwrap();
    assert!(registry.parse("Reviewer.Writer").unwrap().is_granted_to(&everyone));
}

#[test]
fn test_unlocked_when_configured() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config_with(vec![write(dir.path(), "base.toml", BASE)]);
    config.access.lock_after_load = false;

    let mut registry = build_registry(&config).unwrap();
    assert!(!registry.is_locked());
    registry.define_resource("Music", "listen").unwrap();
}

#[test]
fn test_policy_errors_name_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let broken = write(
        dir.path(),
        "broken.json",
        r#"{ "declarations": [ { "role": "Critic", "access": "Ghost.Book.read" } ] }"#,
    );
    let config = config_with(vec![write(dir.path(), "base.toml", BASE), broken]);

    let err = build_registry(&config).unwrap_err();
    let ConfigError::Policy { file, source } = err else {
        panic!("expected a policy error");
    };
    assert!(file.ends_with("broken.json"));
    assert_eq!(source, AccessError::unknown_token("Ghost"));
}

#[test]
fn test_missing_policy_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_with(vec![dir.path().join("missing.toml")]);
    assert!(matches!(build_registry(&config), Err(ConfigError::Io(_))));
}

#[test]
fn test_unsupported_extension() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "policy.yaml", "declarations: []");
    assert!(matches!(load_policy_file(&path), Err(ConfigError::Validation(_))));
}

#[test]
fn test_loaded_registry_guards_requests() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config_with(vec![write(dir.path(), "base.toml", BASE)]);
    config.access.error_status = 404;
    config.validate().unwrap();
    let registry = build_registry(&config).unwrap().into_shared();

    let required = registry.parse("Book.read").unwrap();
    let err = required
        .ensure_granted_in(&config.access.deny_all(), &())
        .unwrap_err();
    assert_eq!(err.status_code(), 404);
}
