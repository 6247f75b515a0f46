//! Integration tests for layered settings loading.
//!
//! These tests use explicit config files in temp directories and never touch
//! the user's global config.

use std::fs;
use std::path::PathBuf;

use dataform::config::Settings;
use dataform::domain::DataType;
use tempfile::TempDir;

#[test]
fn given_no_config_file_when_loading_then_uses_defaults() {
    let dir = TempDir::new().unwrap();
    let settings = Settings::load_from(Some(&dir.path().join("missing.toml"))).unwrap();
    assert_eq!(settings.default_node_type, DataType::Text);
    assert_eq!(settings.path_separator, "/");
}

#[test]
fn given_config_file_when_loading_then_values_override_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("dataform.toml");
    fs::write(
        &path,
        r#"
definition_file = "/srv/forms/main.json"
default_node_type = "number"
path_separator = "."
"#,
    )
    .unwrap();

    let settings = Settings::load_from(Some(&path)).unwrap();

    assert_eq!(settings.definition_file, PathBuf::from("/srv/forms/main.json"));
    assert_eq!(settings.default_node_type, DataType::Number);
    assert_eq!(settings.split_path("orders.amount"), ["orders", "amount"]);
}

#[test]
fn given_invalid_type_in_config_when_loading_then_config_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("dataform.toml");
    fs::write(&path, "default_node_type = \"matrix\"\n").unwrap();

    let err = Settings::load_from(Some(&path)).unwrap_err();

    assert!(err.to_string().contains("config error"));
}

#[test]
fn given_effective_settings_when_serialized_then_round_trip_through_toml() {
    let settings = Settings::default();
    let toml_text = settings.to_toml().unwrap();
    let parsed: Settings = toml::from_str(&toml_text).unwrap();
    assert_eq!(parsed, settings);
}
