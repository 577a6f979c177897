//! Best-effort description enrichment.
//!
//! Runs after a snapshot is published and never blocks it. Each request
//! is bounded by a timeout; failures are logged and skipped.

use crate::error::MetaResult;
use crate::store::{Enrichment, MetadataStore};
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use um_core::{Column, Node};

/// What the enricher is asked to describe
#[derive(Debug, Clone, Copy)]
pub enum EnrichTarget<'a> {
    Node(&'a Node),
    Column { node: &'a Node, column: &'a Column },
}

/// Source of generated descriptions.
///
/// Implementations may call out to slow or unreliable services; the caller
/// applies a timeout to every request.
#[async_trait]
pub trait DescriptionEnricher: Send + Sync {
    /// Describe the target, or `Ok(None)` when there is nothing to say.
    async fn describe(&self, target: EnrichTarget<'_>) -> MetaResult<Option<String>>;
}

/// Enricher that never produces a description
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEnricher;

#[async_trait]
impl DescriptionEnricher for NoopEnricher {
    async fn describe(&self, _target: EnrichTarget<'_>) -> MetaResult<Option<String>> {
        Ok(None)
    }
}

/// Outcome of one enrichment pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EnrichReport {
    pub requested: usize,
    pub filled: usize,
    pub failed: usize,
    pub timed_out: usize,
}

/// Ask `enricher` for every node and column whose description is empty and
/// not edited by a person, then apply the answers to `store`.
pub async fn enrich(
    store: &MetadataStore,
    enricher: &dyn DescriptionEnricher,
    timeout: Duration,
) -> EnrichReport {
    let snapshot = store.snapshot();
    let mut report = EnrichReport::default();
    let mut results = Vec::new();

    for node in snapshot.graph.nodes() {
        if !node.user_edited && node.description.is_none() {
            report.requested += 1;
            if let Some(text) = request(enricher, EnrichTarget::Node(node), timeout, &mut report).await
            {
                results.push(Enrichment {
                    node: node.global_id.to_string(),
                    column: None,
                    text,
                });
            }
        }
        for column in &node.columns {
            if column.user_edited || column.description.is_some() {
                continue;
            }
            report.requested += 1;
            let target = EnrichTarget::Column { node, column };
            if let Some(text) = request(enricher, target, timeout, &mut report).await {
                results.push(Enrichment {
                    node: node.global_id.to_string(),
                    column: Some(column.name.clone()),
                    text,
                });
            }
        }
    }

    report.filled = store.apply_enrichment(results);
    log::info!(
        "Enrichment: {} requested, {} filled, {} failed, {} timed out",
        report.requested,
        report.filled,
        report.failed,
        report.timed_out
    );
    report
}

async fn request(
    enricher: &dyn DescriptionEnricher,
    target: EnrichTarget<'_>,
    timeout: Duration,
    report: &mut EnrichReport,
) -> Option<String> {
    match tokio::time::timeout(timeout, enricher.describe(target)).await {
        Ok(Ok(Some(text))) if !text.trim().is_empty() => Some(text.trim().to_string()),
        Ok(Ok(_)) => None,
        Ok(Err(e)) => {
            log::warn!("{}", e);
            report.failed += 1;
            None
        }
        Err(_) => {
            report.timed_out += 1;
            None
        }
    }
}
