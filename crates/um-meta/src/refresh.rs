//! Refresh service: rebuild the graph in the background and swap it in.
//!
//! At most one refresh runs at a time. A second request while one is in
//! flight is rejected with [`MetaError::RefreshInProgress`] rather than
//! queued. Per-project loading fans out over the blocking pool, bounded
//! by a semaphore; resolution runs once all projects are in.

use crate::document::SnapshotDocument;
use crate::enrich::{enrich, DescriptionEnricher, NoopEnricher};
use crate::error::{MetaError, MetaResult};
use crate::store::MetadataStore;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::{Mutex, Semaphore};
use um_core::{discover, ArtifactSource, Config, FsArtifacts, ProjectId};
use um_lineage::{assemble, load_project, BuildOutput, DiagnosticCounts, ResolveOptions};
use um_refs::{FsWalker, TextFileWalker};

/// What asked for a refresh
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RefreshTrigger {
    Startup,
    Manual,
    Poller,
}

/// Summary of one completed refresh attempt
#[derive(Debug, Clone, Serialize)]
pub struct RefreshReport {
    pub run_id: String,
    pub trigger: RefreshTrigger,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub success: bool,
    pub message: String,
    pub project_count: usize,
    pub node_count: usize,
    pub edge_count: usize,
    pub diagnostics: DiagnosticCounts,
}

/// Refresh state exposed to status endpoints
#[derive(Debug, Clone, Default, Serialize)]
pub struct RefreshStatus {
    pub in_progress: bool,
    pub last: Option<RefreshReport>,
}

/// Owns the build lock and the collaborators a rebuild needs
pub struct RefreshService {
    config: Arc<Config>,
    store: Arc<MetadataStore>,
    artifacts: Arc<dyn ArtifactSource>,
    walker: Arc<dyn TextFileWalker>,
    enricher: Arc<dyn DescriptionEnricher>,
    max_parallel: usize,
    lock: Mutex<()>,
    save_lock: Mutex<()>,
    status: RwLock<RefreshStatus>,
}

impl RefreshService {
    /// Service reading artifacts and source files from disk.
    pub fn new(config: Arc<Config>, store: Arc<MetadataStore>) -> Self {
        let artifacts = Arc::new(FsArtifacts::from_config(&config));
        let walker = Arc::new(FsWalker::new(config.source_extensions.clone()));
        let max_parallel = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        Self {
            config,
            store,
            artifacts,
            walker,
            enricher: Arc::new(NoopEnricher),
            max_parallel,
            lock: Mutex::new(()),
            save_lock: Mutex::new(()),
            status: RwLock::new(RefreshStatus::default()),
        }
    }

    pub fn with_artifacts(mut self, artifacts: Arc<dyn ArtifactSource>) -> Self {
        self.artifacts = artifacts;
        self
    }

    pub fn with_walker(mut self, walker: Arc<dyn TextFileWalker>) -> Self {
        self.walker = walker;
        self
    }

    pub fn with_enricher(mut self, enricher: Arc<dyn DescriptionEnricher>) -> Self {
        self.enricher = enricher;
        self
    }

    pub fn store(&self) -> &Arc<MetadataStore> {
        &self.store
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// `in_progress` follows the build lock, so a cancelled refresh
    /// never leaves it set.
    pub fn status(&self) -> RefreshStatus {
        let mut status = self.status.read().unwrap_or_else(|e| e.into_inner()).clone();
        status.in_progress = self.is_refreshing();
        status
    }

    pub fn is_refreshing(&self) -> bool {
        self.lock.try_lock().is_err()
    }

    /// Rebuild, publish and persist.
    ///
    /// On failure the previously published snapshot stays in place and the
    /// returned report says why.
    pub async fn refresh(&self, trigger: RefreshTrigger) -> MetaResult<RefreshReport> {
        let _guard = self.lock.try_lock().map_err(|_| MetaError::RefreshInProgress)?;

        let run_id = uuid::Uuid::new_v4().to_string();
        let started_at = Utc::now();
        log::info!("Refresh {} started ({:?})", run_id, trigger);

        let report = match self.rebuild().await {
            Ok(output) => {
                let project_count = output.projects.len();
                let node_count = output.graph.node_count();
                let edge_count = output.graph.edge_count();
                let diagnostics = output.diagnostics.counts();
                self.store.publish(output);

                let (success, message) = match self.persist().await {
                    Ok(()) => (true, "ok".to_string()),
                    Err(e) => {
                        log::error!("Snapshot published but not saved: {}", e);
                        (false, format!("snapshot published but not saved: {}", e))
                    }
                };
                if self.config.enrichment.enabled {
                    self.spawn_enrichment();
                }
                RefreshReport {
                    run_id,
                    trigger,
                    started_at,
                    finished_at: Utc::now(),
                    success,
                    message,
                    project_count,
                    node_count,
                    edge_count,
                    diagnostics,
                }
            }
            Err(e) => {
                log::error!("Refresh {} failed: {}", run_id, e);
                RefreshReport {
                    run_id,
                    trigger,
                    started_at,
                    finished_at: Utc::now(),
                    success: false,
                    message: e.to_string(),
                    project_count: 0,
                    node_count: 0,
                    edge_count: 0,
                    diagnostics: DiagnosticCounts::default(),
                }
            }
        };

        log::info!(
            "Refresh {} finished: {} nodes, {} edges",
            report.run_id,
            report.node_count,
            report.edge_count
        );
        self.status.write().unwrap_or_else(|e| e.into_inner()).last = Some(report.clone());
        Ok(report)
    }

    async fn rebuild(&self) -> MetaResult<BuildOutput> {
        let root = self.config.projects_dir.clone();
        let descriptors = self.config.descriptor_files.clone();
        let projects = tokio::task::spawn_blocking(move || discover(&root, &descriptors)).await??;
        let known: Arc<BTreeSet<ProjectId>> =
            Arc::new(projects.iter().map(|p| p.id.clone()).collect());

        let semaphore = Arc::new(Semaphore::new(self.max_parallel.max(1)));
        let mut handles = Vec::with_capacity(projects.len());
        for project in projects {
            let permit = Arc::clone(&semaphore)
                .acquire_owned()
                .await
                .map_err(|e| MetaError::Task {
                    message: e.to_string(),
                })?;
            let known = Arc::clone(&known);
            let artifacts = Arc::clone(&self.artifacts);
            let walker = Arc::clone(&self.walker);
            handles.push(tokio::task::spawn_blocking(move || {
                let step = load_project(&project, &known, artifacts.as_ref(), walker.as_ref());
                drop(permit);
                step
            }));
        }

        let mut steps = Vec::with_capacity(handles.len());
        for handle in handles {
            steps.push(handle.await?);
        }

        let options = ResolveOptions::from_config(&self.config);
        Ok(tokio::task::spawn_blocking(move || assemble(steps, &options)).await?)
    }

    /// Save the current snapshot to the configured output path.
    ///
    /// Saves are serialized and capture the snapshot under the save lock,
    /// so the file on disk never goes back to an older publish.
    pub async fn persist(&self) -> MetaResult<()> {
        let _guard = self.save_lock.lock().await;
        let document = SnapshotDocument::from_snapshot(&self.store.snapshot());
        let path = self.config.output_path.clone();
        tokio::task::spawn_blocking(move || document.save(&path)).await?
    }

    fn spawn_enrichment(&self) {
        let store = Arc::clone(&self.store);
        let enricher = Arc::clone(&self.enricher);
        let timeout = Duration::from_secs(self.config.enrichment.timeout_secs);
        tokio::spawn(async move {
            enrich(&store, enricher.as_ref(), timeout).await;
        });
    }
}
