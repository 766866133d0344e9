//! Integration tests for Settings loading.
//!
//! These tests run without a global config (temp directories only), so they
//! exercise compiled defaults layered with an explicit file.

use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

use corefile::application::ApplicationError;
use corefile::config::Settings;

#[test]
fn given_explicit_config_when_load_then_overrides_defaults() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("corefile.toml");
    fs::write(
        &path,
        r#"
corefile_path = "/srv/coredns/Corefile"
script_file = "/srv/coredns/actions.txt"

[workload]
start_command = ["systemctl", "start", "coredns"]
"#,
    )
    .unwrap();

    let settings = Settings::load(Some(&path)).expect("load settings");

    assert_eq!(settings.corefile_path, PathBuf::from("/srv/coredns/Corefile"));
    assert_eq!(
        settings.script_file,
        Some(PathBuf::from("/srv/coredns/actions.txt"))
    );
    assert_eq!(
        settings.workload.start_command,
        vec!["systemctl", "start", "coredns"]
    );
    assert!(settings.state_file.ends_with("state.toml"));
}

#[test]
fn given_tilde_in_config_when_load_then_expanded() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("corefile.toml");
    fs::write(&path, "state_file = \"~/corefile-state.toml\"\n").unwrap();

    let settings = Settings::load(Some(&path)).expect("load settings");

    let home = std::env::var("HOME").expect("HOME should be set");
    assert_eq!(
        settings.state_file,
        PathBuf::from(home).join("corefile-state.toml")
    );
}

#[test]
fn given_missing_explicit_config_when_load_then_config_error() {
    let temp = TempDir::new().unwrap();

    let err = Settings::load(Some(&temp.path().join("absent.toml"))).unwrap_err();

    assert!(matches!(err, ApplicationError::Config { .. }));
}

#[test]
fn given_invalid_toml_when_load_then_config_error() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("corefile.toml");
    fs::write(&path, "corefile_path = [unterminated\n").unwrap();

    assert!(matches!(
        Settings::load(Some(&path)),
        Err(ApplicationError::Config { .. })
    ));
}

#[test]
fn given_settings_when_to_toml_then_loadable_again() {
    let temp = TempDir::new().unwrap();
    let original = Settings {
        corefile_path: PathBuf::from("/tmp/Corefile"),
        zonefile_dir: Some(PathBuf::from("/tmp/zones")),
        ..Settings::default()
    };
    let path = temp.path().join("corefile.toml");
    fs::write(&path, original.to_toml().unwrap()).unwrap();

    let loaded = Settings::load(Some(&path)).unwrap();

    assert_eq!(loaded.corefile_path, original.corefile_path);
    assert_eq!(loaded.zonefile_dir, original.zonefile_dir);
}
