use super::*;
use std::fs;

fn descriptors() -> Vec<String> {
    vec!["dbt_project.yml".to_string(), "dbt_project.yaml".to_string()]
}

fn write_project(root: &Path, dir: &str, descriptor: &str) {
    let path = root.join(dir);
    fs::create_dir_all(&path).unwrap();
    fs::write(path.join("dbt_project.yml"), descriptor).unwrap();
}

#[test]
fn test_slugify() {
    assert_eq!(slugify("Customer Project"), "customer_project");
    assert_eq!(slugify("claims_project"), "claims_project");
}

#[test]
fn test_discover_missing_root_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let projects = discover(&dir.path().join("nope"), &descriptors()).unwrap();
    assert!(projects.is_empty());
}

#[test]
fn test_discover_uses_declared_name() {
    let dir = tempfile::tempdir().unwrap();
    write_project(dir.path(), "customers", "name: 'Customer Project'\n");

    let projects = discover(dir.path(), &descriptors()).unwrap();
    assert_eq!(projects.len(), 1);
    assert_eq!(projects[0].id, "customer_project");
    assert_eq!(projects[0].display_name, "Customer Project");
    assert_eq!(projects[0].model_paths, vec!["models"]);
}

#[test]
fn test_discover_skips_hidden_and_plain_dirs() {
    let dir = tempfile::tempdir().unwrap();
    write_project(dir.path(), ".cache", "name: hidden\n");
    fs::create_dir_all(dir.path().join("not_a_project")).unwrap();
    write_project(dir.path(), "claims", "name: claims_project\n");

    let projects = discover(dir.path(), &descriptors()).unwrap();
    let ids: Vec<&str> = projects.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["claims_project"]);
}

#[test]
fn test_discover_accepts_yaml_extension() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("alt");
    fs::create_dir_all(&path).unwrap();
    fs::write(path.join("dbt_project.yaml"), "name: alt\n").unwrap();

    let projects = discover(dir.path(), &descriptors()).unwrap();
    assert_eq!(projects.len(), 1);
}

#[test]
fn test_descriptor_model_paths() {
    let dir = tempfile::tempdir().unwrap();
    write_project(
        dir.path(),
        "p",
        "name: p\nmodel-paths: [\"transform\", \"marts\"]\n",
    );
    let projects = discover(dir.path(), &descriptors()).unwrap();
    assert_eq!(projects[0].model_paths, vec!["transform", "marts"]);
    assert_eq!(
        projects[0].model_paths_absolute()[0],
        dir.path().join("p").join("transform")
    );
}

#[test]
fn test_malformed_descriptor_falls_back_to_dir_name() {
    let dir = tempfile::tempdir().unwrap();
    write_project(dir.path(), "Fallback Dir", "name: [unterminated\n");
    let projects = discover(dir.path(), &descriptors()).unwrap();
    assert_eq!(projects[0].id, "fallback_dir");
    assert_eq!(projects[0].display_name, "Fallback Dir");
}

#[test]
fn test_unreadable_descriptor_skips_only_that_project() {
    let dir = tempfile::tempdir().unwrap();
    let broken = dir.path().join("broken");
    fs::create_dir_all(&broken).unwrap();
    fs::write(broken.join("dbt_project.yml"), [0xff, 0xfe, 0x00, 0xc3]).unwrap();
    write_project(dir.path(), "claims", "name: claims_project\n");

    let projects = discover(dir.path(), &descriptors()).unwrap();
    let ids: Vec<&str> = projects.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["claims_project"]);
}

#[test]
fn test_duplicate_project_id_fails() {
    let dir = tempfile::tempdir().unwrap();
    write_project(dir.path(), "a", "name: Shared Name\n");
    write_project(dir.path(), "b", "name: shared_name\n");

    let err = discover(dir.path(), &descriptors()).unwrap_err();
    assert!(matches!(err, CoreError::DuplicateProject { ref id, .. } if id == "shared_name"));
}
