//! Refresh service, persistence and poller tests over temp project trees.

use async_trait::async_trait;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use um_core::artifacts::{RawCatalog, RawManifest};
use um_core::{ArtifactSource, Config, CoreResult, FsArtifacts, Project};
use um_meta::{
    DescriptionEnricher, EnrichTarget, EntityType, MetaError, MetaResult, MetadataStore, Poller,
    RefreshService, RefreshTrigger, SnapshotDocument,
};

fn write(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

fn add_project(root: &Path, dir: &str, name: &str, models: &[(&str, &str)]) {
    let base = root.join(dir);
    write(&base.join("dbt_project.yml"), &format!("name: {}\n", name));
    let mut nodes = serde_json::Map::new();
    for (model, sql) in models {
        nodes.insert(
            format!("model.{}.{}", name, model),
            serde_json::json!({
                "resource_type": "model",
                "name": model,
                "package_name": name,
                "raw_code": sql,
                "columns": {"id": {"name": "id"}},
            }),
        );
        write(&base.join(format!("models/{}.sql", model)), sql);
    }
    let manifest = serde_json::json!({
        "metadata": {"project_name": name},
        "nodes": nodes,
        "sources": {},
    });
    write(&base.join("target/manifest.json"), &manifest.to_string());
}

fn seed(root: &Path) {
    add_project(
        root,
        "customer",
        "customer_project",
        &[("dim_customer", "select id from raw.customers")],
    );
    add_project(
        root,
        "claims",
        "claims_project",
        &[(
            "stg_claims",
            "select id from {{ ref('dim_customer', 'customer_project') }}",
        )],
    );
}

fn config(root: &Path) -> Config {
    let mut config = Config {
        projects_dir: root.join("projects"),
        output_path: root.join("exports").join("uni_metadata.json"),
        ..Config::default()
    };
    config.watch.debounce_ms = 10;
    config
}

fn service(config: Config) -> RefreshService {
    RefreshService::new(Arc::new(config), Arc::new(MetadataStore::new()))
}

#[tokio::test]
async fn test_refresh_publishes_and_persists() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    seed(&config.projects_dir);
    let output_path = config.output_path.clone();
    let service = service(config);

    let report = service.refresh(RefreshTrigger::Manual).await.unwrap();
    assert!(report.success, "{}", report.message);
    assert_eq!(report.project_count, 2);
    assert_eq!(report.node_count, 2);
    assert_eq!(report.edge_count, 1);

    let upstream = service.store().get_upstream("claims_project_stg_claims");
    assert_eq!(upstream.len(), 1);
    assert_eq!(upstream[0].global_id, "customer_project_dim_customer");

    let document = SnapshotDocument::load(&output_path).unwrap().unwrap();
    assert_eq!(document.models.len(), 2);
    assert_eq!(document.lineage.len(), 1);
    assert_eq!(document.projects.len(), 2);

    let status = service.status();
    assert!(!status.in_progress);
    assert_eq!(status.last.unwrap().run_id, report.run_id);
}

#[tokio::test]
async fn test_refresh_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    seed(&config.projects_dir);
    let service = service(config);

    service.refresh(RefreshTrigger::Manual).await.unwrap();
    let first = service.store().snapshot();
    service.refresh(RefreshTrigger::Manual).await.unwrap();
    let second = service.store().snapshot();

    assert_eq!(first.graph.nodes(), second.graph.nodes());
    assert_eq!(first.graph.edges(), second.graph.edges());
    assert_eq!(first.projects, second.projects);
}

#[tokio::test]
async fn test_user_edits_survive_refresh() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    seed(&config.projects_dir);
    let service = service(config);

    service.refresh(RefreshTrigger::Manual).await.unwrap();
    service
        .store()
        .update_description(
            EntityType::Model,
            "customer_project_dim_customer",
            "Curated customers",
        )
        .unwrap();
    service.refresh(RefreshTrigger::Manual).await.unwrap();

    let node = service
        .store()
        .get_node("customer_project_dim_customer")
        .unwrap();
    assert_eq!(node.description.as_deref(), Some("Curated customers"));
    assert!(node.user_edited);
}

#[tokio::test]
async fn test_failed_refresh_keeps_previous_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    seed(&config.projects_dir);
    let projects_dir = config.projects_dir.clone();
    let service = service(config);
    service.refresh(RefreshTrigger::Manual).await.unwrap();

    // Second directory declaring the same project name
    add_project(
        &projects_dir,
        "customer_copy",
        "customer_project",
        &[("other", "select 1 as id")],
    );
    let report = service.refresh(RefreshTrigger::Manual).await.unwrap();
    assert!(!report.success);
    assert!(report.message.contains("E005"), "{}", report.message);
    assert_eq!(service.store().snapshot().graph.node_count(), 2);
    assert!(service
        .store()
        .get_node("customer_project_dim_customer")
        .is_some());
}

/// Artifact source that stalls before reading the manifest
struct SlowArtifacts {
    inner: FsArtifacts,
    delay: Duration,
}

impl ArtifactSource for SlowArtifacts {
    fn manifest(&self, project: &Project) -> CoreResult<Option<RawManifest>> {
        std::thread::sleep(self.delay);
        self.inner.manifest(project)
    }

    fn catalog(&self, project: &Project) -> CoreResult<Option<RawCatalog>> {
        self.inner.catalog(project)
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_refresh_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    seed(&config.projects_dir);
    let artifacts = SlowArtifacts {
        inner: FsArtifacts::from_config(&config),
        delay: Duration::from_millis(300),
    };
    let service = Arc::new(service(config).with_artifacts(Arc::new(artifacts)));

    let background = {
        let service = Arc::clone(&service);
        tokio::spawn(async move { service.refresh(RefreshTrigger::Manual).await })
    };
    while !service.status().in_progress {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let err = service.refresh(RefreshTrigger::Manual).await.unwrap_err();
    assert!(matches!(err, MetaError::RefreshInProgress));

    let report = background.await.unwrap().unwrap();
    assert!(report.success);
    assert!(!service.is_refreshing());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cancelled_refresh_clears_in_progress() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    seed(&config.projects_dir);
    let artifacts = SlowArtifacts {
        inner: FsArtifacts::from_config(&config),
        delay: Duration::from_millis(300),
    };
    let service = service(config).with_artifacts(Arc::new(artifacts));

    let outcome = tokio::time::timeout(
        Duration::from_millis(50),
        service.refresh(RefreshTrigger::Manual),
    )
    .await;
    assert!(outcome.is_err());

    assert!(!service.is_refreshing());
    let status = service.status();
    assert!(!status.in_progress);
    assert!(status.last.is_none());

    // blocking loads from the dropped run finish on their own
    tokio::time::sleep(Duration::from_millis(400)).await;
    let report = service.refresh(RefreshTrigger::Manual).await.unwrap();
    assert!(report.success);
}

struct Describer;

#[async_trait]
impl DescriptionEnricher for Describer {
    async fn describe(&self, target: EnrichTarget<'_>) -> MetaResult<Option<String>> {
        Ok(match target {
            EnrichTarget::Node(node) => Some(format!("Generated for {}", node.local_name)),
            EnrichTarget::Column { .. } => None,
        })
    }
}

#[tokio::test]
async fn test_enrichment_runs_after_publish() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(dir.path());
    config.enrichment.enabled = true;
    seed(&config.projects_dir);
    let service = service(config).with_enricher(Arc::new(Describer));

    service.refresh(RefreshTrigger::Manual).await.unwrap();

    let mut description = None;
    for _ in 0..100 {
        description = service
            .store()
            .get_node("claims_project_stg_claims")
            .and_then(|n| n.description);
        if description.is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(description.as_deref(), Some("Generated for stg_claims"));
}

#[tokio::test]
async fn test_poller_refreshes_on_artifact_change() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    seed(&config.projects_dir);
    let projects_dir = config.projects_dir.clone();
    let service = Arc::new(service(config));
    service.refresh(RefreshTrigger::Startup).await.unwrap();

    let poller = Poller::new(Arc::clone(&service));
    poller.baseline().await.unwrap();
    assert!(!poller.check().await.unwrap());
    assert_eq!(poller.status().watched_files, 2);

    add_project(
        &projects_dir,
        "billing",
        "billing_project",
        &[("invoices", "select id from {{ ref('stg_claims') }}")],
    );
    assert!(poller.check().await.unwrap());
    assert!(poller.status().last_refresh_at.is_some());
    assert_eq!(service.store().list_projects().len(), 3);
    assert_eq!(
        service.store().get_upstream("billing_project_invoices")[0].global_id,
        "claims_project_stg_claims"
    );

    assert!(!poller.check().await.unwrap());
}

#[tokio::test]
async fn test_poller_spawn_and_stop() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    let service = Arc::new(service(config));
    let handle = Arc::new(Poller::new(service)).spawn();
    for _ in 0..100 {
        if handle.poller().status().active {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(handle.poller().status().active);
    let poller = Arc::clone(handle.poller());
    handle.stop().await;
    assert!(!poller.status().active);
}
