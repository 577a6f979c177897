use super::*;

#[test]
fn test_parse_empty_config_uses_defaults() {
    let config: Config = serde_yaml::from_str("{}").unwrap();
    assert_eq!(config.projects_dir, PathBuf::from("dbt_projects"));
    assert_eq!(
        config.output_path,
        PathBuf::from("exports/uni_metadata.json")
    );
    assert_eq!(config.manifest_path, PathBuf::from("target/manifest.json"));
    assert_eq!(config.watch.interval_secs, 60);
    assert_eq!(config.server.port, 8000);
    assert!(config.bridge_sources_to_models);
    assert!(config.overrides.is_empty());
}

#[test]
fn test_parse_full_config() {
    let yaml = r#"
projects_dir: ./projects
output_path: out/meta.json
descriptor_files: [dbt_project.yml]
source_extensions: [sql, jinja]
bridge_sources_to_models: false
overrides:
  - source: customer_project_dim_customer
    target: claims_project_raw_customer
watch:
  enabled: true
  interval_secs: 5
  debounce_ms: 100
enrichment:
  enabled: true
  timeout_secs: 3
server:
  host: 0.0.0.0
  port: 9000
"#;
    let config: Config = serde_yaml::from_str(yaml).unwrap();
    config.validate().unwrap();
    assert_eq!(config.projects_dir, PathBuf::from("./projects"));
    assert_eq!(config.source_extensions, vec!["sql", "jinja"]);
    assert!(!config.bridge_sources_to_models);
    assert_eq!(config.overrides.len(), 1);
    assert_eq!(config.overrides[0].target, "claims_project_raw_customer");
    assert!(config.watch.enabled);
    assert_eq!(config.watch.patterns, vec!["manifest.json", "catalog.json"]);
    assert_eq!(config.enrichment.timeout_secs, 3);
    assert_eq!(config.server.host, "0.0.0.0");
}

#[test]
fn test_unknown_field_rejected() {
    let result: Result<Config, _> = serde_yaml::from_str("projects_directory: x");
    assert!(result.is_err());
}

#[test]
fn test_validate_rejects_zero_interval() {
    let mut config = Config::default();
    config.watch.interval_secs = 0;
    assert!(matches!(
        config.validate(),
        Err(CoreError::ConfigInvalid { .. })
    ));
}

#[test]
fn test_validate_rejects_empty_override_endpoint() {
    let mut config = Config::default();
    config.overrides.push(LineageOverride {
        source: "a_b".to_string(),
        target: " ".to_string(),
    });
    assert!(config.validate().is_err());
}

#[test]
fn test_load_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = Config::load(&dir.path().join("unimeta.yml")).unwrap_err();
    assert!(matches!(err, CoreError::ConfigNotFound { .. }));
}

#[test]
fn test_load_or_default_without_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::load_or_default(dir.path()).unwrap();
    assert_eq!(config.descriptor_files.len(), 2);
}

#[test]
fn test_load_reports_parse_error_with_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("unimeta.yml");
    std::fs::write(&path, "watch: [not, a, map]").unwrap();
    let err = Config::load(&path).unwrap_err();
    assert!(err.to_string().contains("[E002]"));
}
