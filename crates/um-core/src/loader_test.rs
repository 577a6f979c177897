use super::*;
use crate::artifacts::FsArtifacts;
use std::path::Path;

fn project(root: &Path) -> Project {
    Project {
        id: ProjectId::new("claims_project"),
        display_name: "claims_project".to_string(),
        root_path: root.to_path_buf(),
        model_paths: vec!["models".to_string()],
    }
}

const MANIFEST: &str = r#"{
    "metadata": {"project_name": "claims_project"},
    "nodes": {
        "model.claims_project.stg_claims": {
            "resource_type": "model",
            "name": "stg_claims",
            "package_name": "claims_project",
            "schema": "staging",
            "config": {"materialized": "table", "schema": "claims_staging"},
            "description": "Staged claims",
            "raw_code": "select claim_id, customer_id, amount from {{ source('raw', 'claims') }}",
            "original_file_path": "models/stg_claims.sql",
            "tags": ["claims"],
            "depends_on": {"nodes": ["source.claims_project.raw.claims"]},
            "columns": {
                "claim_id": {"name": "claim_id", "description": "Claim key"}
            }
        },
        "model.claims_project.fct_claims": {
            "resource_type": "model",
            "name": "fct_claims",
            "package_name": "claims_project",
            "raw_sql": "select c.claim_id, sum(c.amount) as total from {{ ref('stg_claims') }} c group by 1",
            "depends_on": {"nodes": ["model.claims_project.stg_claims", "model.customer_project.dim_customer"]}
        },
        "model.dbt_utils.helper": {
            "resource_type": "model",
            "name": "helper",
            "package_name": "dbt_utils"
        },
        "test.claims_project.not_null": {
            "resource_type": "test",
            "name": "not_null"
        }
    },
    "sources": {
        "source.claims_project.raw.claims": {
            "name": "claims",
            "source_name": "raw",
            "package_name": "claims_project",
            "schema": "raw",
            "identifier": "claims_v2"
        }
    }
}"#;

const CATALOG: &str = r#"{
    "nodes": {
        "model.claims_project.stg_claims": {
            "columns": {
                "AMOUNT": {"name": "AMOUNT", "type": "DECIMAL", "index": 3},
                "CLAIM_ID": {"name": "CLAIM_ID", "type": "INTEGER", "index": 1},
                "CUSTOMER_ID": {"name": "CUSTOMER_ID", "type": "INTEGER", "index": 2, "comment": "Owner"}
            }
        }
    }
}"#;

fn table(catalog: Option<&str>) -> NodeTable {
    let manifest: RawManifest = serde_json::from_str(MANIFEST).unwrap();
    let catalog: Option<RawCatalog> = catalog.map(|c| serde_json::from_str(c).unwrap());
    build_table(&project(Path::new("/tmp/claims")), manifest, catalog.as_ref())
}

#[test]
fn test_models_then_sources_owned_only() {
    let table = table(None);
    let names: Vec<(&str, NodeKind)> = table
        .nodes
        .iter()
        .map(|n| (n.local_name.as_str(), n.kind))
        .collect();
    assert_eq!(
        names,
        vec![
            ("fct_claims", NodeKind::Model),
            ("stg_claims", NodeKind::Model),
            ("claims", NodeKind::Source),
        ]
    );
    assert_eq!(table.package_name, "claims_project");
}

#[test]
fn test_dependencies_are_raw_ids() {
    let table = table(None);
    assert_eq!(table.dependencies.len(), 3);
    assert!(table.dependencies.contains(&ManifestDependency {
        referencing: "fct_claims".to_string(),
        dependency_id: "model.customer_project.dim_customer".to_string(),
    }));
}

#[test]
fn test_model_fields() {
    let table = table(None);
    let stg = table.by_unique_id("model.claims_project.stg_claims").unwrap();
    assert_eq!(stg.schema.as_deref(), Some("claims_staging"));
    assert_eq!(stg.materialized.as_deref(), Some("table"));
    assert_eq!(stg.description.as_deref(), Some("Staged claims"));
    assert_eq!(stg.file_path.as_deref(), Some("models/stg_claims.sql"));
    assert_eq!(stg.tags, vec!["claims"]);
    assert!(stg.raw_text.as_deref().unwrap().contains("source('raw', 'claims')"));

    let fct = table.by_unique_id("model.claims_project.fct_claims").unwrap();
    assert_eq!(fct.materialized.as_deref(), Some("view"));
    assert!(fct.raw_text.as_deref().unwrap().contains("ref('stg_claims')"));
}

#[test]
fn test_source_fields() {
    let table = table(None);
    let src = table.by_unique_id("source.claims_project.raw.claims").unwrap();
    assert_eq!(src.source_name.as_deref(), Some("raw"));
    assert_eq!(src.identifier.as_deref(), Some("claims_v2"));
    assert_eq!(src.materialized, None);
}

#[test]
fn test_declared_columns_without_catalog() {
    let table = table(None);
    let stg = table.by_unique_id("model.claims_project.stg_claims").unwrap();
    assert_eq!(stg.columns.len(), 1);
    assert_eq!(stg.columns[0].name, "claim_id");
    assert_eq!(stg.columns[0].description.as_deref(), Some("Claim key"));
}

#[test]
fn test_projection_fallback_without_declared_columns() {
    let table = table(None);
    let fct = table.by_unique_id("model.claims_project.fct_claims").unwrap();
    let names: Vec<&str> = fct.columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["claim_id", "total"]);
    assert!(fct.columns[0].is_foreign_key);
}

#[test]
fn test_catalog_columns_ordered_and_merged() {
    let table = table(Some(CATALOG));
    let stg = table.by_unique_id("model.claims_project.stg_claims").unwrap();
    let names: Vec<&str> = stg.columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["CLAIM_ID", "CUSTOMER_ID", "AMOUNT"]);
    assert_eq!(stg.columns[0].data_type.as_deref(), Some("INTEGER"));
    // Description borrowed from the manifest by case-insensitive name
    assert_eq!(stg.columns[0].description.as_deref(), Some("Claim key"));
    assert_eq!(stg.columns[1].description.as_deref(), Some("Owner"));
    assert!(stg.columns[1].is_foreign_key);
}

#[test]
fn test_into_node_assigns_identity() {
    let table = table(None);
    let local = table.nodes[0].clone();
    let project_id = table.project.id.clone();
    let node = local.into_node(GlobalId::compose(&project_id, "fct_claims"), project_id);
    assert_eq!(node.global_id, "claims_project_fct_claims");
    assert!(!node.user_edited);
}

#[test]
fn test_load_missing_manifest() {
    let dir = tempfile::tempdir().unwrap();
    let outcome = load(&project(dir.path()), &FsArtifacts::default()).unwrap();
    assert!(matches!(outcome, LoadOutcome::ManifestMissing));
}

#[test]
fn test_load_malformed_manifest_is_error() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("target")).unwrap();
    std::fs::write(dir.path().join("target/manifest.json"), "[1, 2").unwrap();
    let result = load(&project(dir.path()), &FsArtifacts::default());
    assert!(matches!(result, Err(CoreError::ManifestParseError { .. })));
}

#[test]
fn test_load_ignores_malformed_catalog() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("target")).unwrap();
    std::fs::write(dir.path().join("target/manifest.json"), MANIFEST).unwrap();
    std::fs::write(dir.path().join("target/catalog.json"), "nope").unwrap();

    match load(&project(dir.path()), &FsArtifacts::default()).unwrap() {
        LoadOutcome::Loaded(table) => assert_eq!(table.nodes.len(), 3),
        LoadOutcome::ManifestMissing => panic!("manifest was written"),
    }
}
