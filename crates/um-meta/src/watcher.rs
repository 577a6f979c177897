//! Polling change detector for the projects directory.
//!
//! Every interval the poller fingerprints the watched artifact files
//! (sorted path, size and modification time, hashed with SHA-256). A
//! changed fingerprint must stay stable for the debounce period before a
//! refresh fires. Refreshes go through the same [`RefreshService`] lock as
//! manual ones; when the lock is busy the change is retried next tick.

use crate::error::{MetaError, MetaResult};
use crate::refresh::{RefreshService, RefreshTrigger};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::{Duration, UNIX_EPOCH};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use um_core::{checksum_lines, WatchConfig};

/// Poller state exposed to status endpoints
#[derive(Debug, Clone, Serialize)]
pub struct PollerStatus {
    pub active: bool,
    pub directory: PathBuf,
    pub patterns: Vec<String>,
    pub interval_secs: u64,
    pub watched_files: usize,
    pub last_change_at: Option<DateTime<Utc>>,
    pub last_refresh_at: Option<DateTime<Utc>>,
}

/// Fingerprint of the watched files at one point in time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    pub checksum: String,
    pub files: usize,
}

/// Periodic change detector driving [`RefreshService::refresh`]
pub struct Poller {
    service: Arc<RefreshService>,
    directory: PathBuf,
    config: WatchConfig,
    applied: tokio::sync::Mutex<Option<Fingerprint>>,
    status: RwLock<PollerStatus>,
}

/// Handle to a running poller task
pub struct PollerHandle {
    poller: Arc<Poller>,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl PollerHandle {
    pub fn poller(&self) -> &Arc<Poller> {
        &self.poller
    }

    /// Stop polling and wait for the task to finish.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            log::warn!("Poller task ended abnormally: {}", e);
        }
        self.poller.set_active(false);
    }
}

impl Poller {
    pub fn new(service: Arc<RefreshService>) -> Self {
        let directory = service.config().projects_dir.clone();
        let config = service.config().watch.clone();
        let status = PollerStatus {
            active: false,
            directory: directory.clone(),
            patterns: config.patterns.clone(),
            interval_secs: config.interval_secs,
            watched_files: 0,
            last_change_at: None,
            last_refresh_at: None,
        };
        Self {
            service,
            directory,
            config,
            applied: tokio::sync::Mutex::new(None),
            status: RwLock::new(status),
        }
    }

    pub fn status(&self) -> PollerStatus {
        self.status.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn update_status(&self, f: impl FnOnce(&mut PollerStatus)) {
        f(&mut self.status.write().unwrap_or_else(|e| e.into_inner()));
    }

    fn set_active(&self, active: bool) {
        self.update_status(|s| s.active = active);
    }

    /// Record the current file state as already reflected in the store.
    pub async fn baseline(&self) -> MetaResult<()> {
        let current = self.fingerprint().await?;
        self.update_status(|s| s.watched_files = current.files);
        *self.applied.lock().await = Some(current);
        Ok(())
    }

    async fn fingerprint(&self) -> MetaResult<Fingerprint> {
        let directory = self.directory.clone();
        let patterns = self.config.patterns.clone();
        Ok(tokio::task::spawn_blocking(move || fingerprint(&directory, &patterns)).await?)
    }

    /// Check once for changes; returns `true` when a refresh ran.
    pub async fn check(&self) -> MetaResult<bool> {
        let current = self.fingerprint().await?;
        self.update_status(|s| s.watched_files = current.files);
        if self.applied.lock().await.as_ref() == Some(&current) {
            return Ok(false);
        }

        log::debug!("Change detected under {}", self.directory.display());
        self.update_status(|s| s.last_change_at = Some(Utc::now()));
        tokio::time::sleep(Duration::from_millis(self.config.debounce_ms)).await;
        let settled = self.fingerprint().await?;
        if settled != current {
            log::debug!("Files still changing, waiting for next poll");
            return Ok(false);
        }

        match self.service.refresh(RefreshTrigger::Poller).await {
            Ok(report) => {
                if !report.success {
                    log::warn!("Triggered refresh failed: {}", report.message);
                }
                *self.applied.lock().await = Some(settled);
                self.update_status(|s| s.last_refresh_at = Some(report.finished_at));
                Ok(true)
            }
            Err(MetaError::RefreshInProgress) => {
                log::info!("Refresh already running, retrying on next poll");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Spawn the polling loop. The current file state is taken as the
    /// baseline, so only later changes trigger refreshes.
    pub fn spawn(self: Arc<Self>) -> PollerHandle {
        let (shutdown, mut stop) = watch::channel(false);
        let poller = Arc::clone(&self);
        let task = tokio::spawn(async move {
            if let Err(e) = poller.baseline().await {
                log::warn!("Could not fingerprint {}: {}", poller.directory.display(), e);
            }
            poller.set_active(true);
            log::info!(
                "Watching {} every {}s",
                poller.directory.display(),
                poller.config.interval_secs
            );

            let period = Duration::from_secs(poller.config.interval_secs.max(1));
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if let Err(e) = poller.check().await {
                            log::warn!("Poll failed: {}", e);
                        }
                    }
                    _ = stop.changed() => break,
                }
            }
            poller.set_active(false);
            log::info!("Stopped watching {}", poller.directory.display());
        });
        PollerHandle {
            poller: self,
            shutdown,
            task,
        }
    }
}

/// Hash the sorted (path, size, mtime) of every file under `root` whose
/// name matches one of `patterns`. A missing root hashes as empty.
pub fn fingerprint(root: &Path, patterns: &[String]) -> Fingerprint {
    let mut entries = Vec::new();
    collect(root, patterns, &mut entries);
    entries.sort();
    Fingerprint {
        checksum: checksum_lines(&entries),
        files: entries.len(),
    }
}

fn collect(dir: &Path, patterns: &[String], out: &mut Vec<String>) {
    let Ok(read) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in read.filter_map(|e| e.ok()) {
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with('.') {
            continue;
        }
        let Ok(meta) = entry.metadata() else {
            continue;
        };
        if meta.is_dir() {
            collect(&path, patterns, out);
        } else if patterns.iter().any(|p| matches_pattern(&name, p)) {
            let mtime = meta
                .modified()
                .ok()
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map(|d| d.as_nanos())
                .unwrap_or(0);
            out.push(format!("{}|{}|{}", path.display(), meta.len(), mtime));
        }
    }
}

/// `*.ext` matches by extension, anything else by exact file name.
fn matches_pattern(name: &str, pattern: &str) -> bool {
    match pattern.strip_prefix("*.") {
        Some(ext) => name
            .rsplit_once('.')
            .is_some_and(|(_, e)| e.eq_ignore_ascii_case(ext)),
        None => name == pattern,
    }
}
