use super::data::{
    Config, PersonaEntry, RoutingConfig, ENV_BASE_URL, ENV_PROJECT_GROUP_ID, ENV_PROJECT_ID,
};
use super::io::ConfigError;
use crate::core::usage::AccessTier;
use std::collections::HashMap;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_load_nonexistent_config() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("nonexistent_config.toml");

    let config = Config::load_from_path(&config_path).expect("Failed to load config");

    assert_eq!(config.default_model, None);
    assert_eq!(config.default_model_id(), "gpt-4");
    assert!(config.personas.is_empty());
}

#[test]
fn test_load_full_config() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("config.toml");
    fs::write(
        &config_path,
        r#"
default_model = "gemini-1.5-flash"
default_persona = "Study Buddy"
tier = "premium"
premium_budget = 2
builtin_personas = false

[[personas]]
name = "Haiku Poet"
personality = "Speaks only in haiku"

[routing]
base_url = "http://localhost:8080"
project_id = "proj"
"#,
    )
    .unwrap();

    let config = Config::load_from_path(&config_path).expect("config parses");

    assert_eq!(config.default_model_id(), "gemini-1.5-flash");
    assert_eq!(config.default_persona.as_deref(), Some("Study Buddy"));
    assert_eq!(config.builtin_personas, Some(false));
    assert_eq!(
        config.personas,
        vec![PersonaEntry {
            name: "Haiku Poet".to_string(),
            personality: "Speaks only in haiku".to_string(),
            instructions: String::new(),
        }]
    );
    assert_eq!(
        config.routing.base_url.as_deref(),
        Some("http://localhost:8080")
    );
    assert_eq!(config.routing.project_group_id, None);

    let meter = config.usage_meter();
    assert_eq!(meter.tier(), AccessTier::Premium);
    assert_eq!(meter.remaining(), 2);
}

#[test]
fn test_default_usage_meter() {
    let meter = Config::default().usage_meter();
    assert_eq!(meter.tier(), AccessTier::Free);
    assert_eq!(meter.remaining(), 5);
}

#[test]
fn test_parse_error_names_the_file() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("broken.toml");
    fs::write(&config_path, "default_model = [").unwrap();

    let err = Config::load_from_path(&config_path).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
    assert!(err.to_string().contains("broken.toml"));
}

#[test]
fn test_load_with_explicit_path() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("explicit.toml");
    fs::write(&config_path, "premium_budget = 9\n").unwrap();

    let config = Config::load(Some(&config_path)).expect("config loads");
    assert_eq!(config.premium_budget, Some(9));
}

#[test]
fn test_env_overrides_replace_routing_values() {
    let mut routing = RoutingConfig {
        base_url: Some("https://from-file.example".to_string()),
        path_prefix: None,
        project_id: Some("file-project".to_string()),
        project_group_id: None,
    };

    let env: HashMap<&str, &str> = [
        (ENV_BASE_URL, "http://127.0.0.1:9000"),
        (ENV_PROJECT_GROUP_ID, "group-7"),
        (ENV_PROJECT_ID, "  "),
    ]
    .into_iter()
    .collect();

    routing.apply_env_overrides(|key| env.get(key).map(|v| v.to_string()));

    assert_eq!(routing.base_url.as_deref(), Some("http://127.0.0.1:9000"));
    // Blank values do not clobber the file.
    assert_eq!(routing.project_id.as_deref(), Some("file-project"));
    assert_eq!(routing.project_group_id.as_deref(), Some("group-7"));
}
