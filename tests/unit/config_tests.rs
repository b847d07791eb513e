// Configuration module unit tests

use photomark::config::Config;
use photomark::settings::WatermarkSettings;
use photomark::store::{LoadStatus, TemplateStore};

#[test]
fn test_can_deserialize_minimal_valid_yaml_config() {
    let config: Config = serde_yaml::from_str("{}").expect("Failed to deserialize YAML");
    assert_eq!(config, Config::default());
    assert!(config.validate().is_ok());
}

#[test]
fn test_store_dir_override_is_used_by_the_store() {
    let dir = tempfile::tempdir().unwrap();
    let yaml = format!("store:\n  dir: \"{}\"\n", dir.path().join("marks").display());
    let config = Config::from_yaml_with_env(&yaml).unwrap();

    let store = TemplateStore::open_dir(config.store_dir());
    assert_eq!(store.load_status(), LoadStatus::Fresh);
    store.save("t", &WatermarkSettings::default()).unwrap();
    assert!(dir.path().join("marks").join("templates.json").is_file());
}

#[test]
fn test_config_serializes_back_to_yaml() {
    let mut config = Config::default();
    config.export.threads = Some(3);
    config.logging.json = true;

    let yaml = serde_yaml::to_string(&config).unwrap();
    let parsed = Config::from_yaml_with_env(&yaml).unwrap();
    assert_eq!(parsed, config);
}
