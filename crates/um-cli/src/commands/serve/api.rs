//! HTTP JSON API using axum

use anyhow::{Context, Result};
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use um_core::{GlobalId, NodeKind};
use um_lineage::{BuildDiagnostics, DiagnosticCounts};
use um_meta::{
    EntityType, MetaError, MetadataStore, NodeFilter, Poller, PollerStatus, RefreshService,
    RefreshTrigger, SnapshotDocument,
};

use crate::cli::{GlobalArgs, ServeArgs};
use crate::commands::common::{load_config, restore_snapshot};

/// State shared across all handlers
pub(crate) struct AppState {
    service: Arc<RefreshService>,
    poller: Option<Arc<Poller>>,
}

/// Query string of `GET /api/models`
#[derive(Debug, Default, Deserialize)]
struct ModelQuery {
    project_id: Option<String>,
    name: Option<String>,
    search: Option<String>,
    kind: Option<String>,
}

/// Body of the description endpoints
#[derive(Debug, Deserialize)]
struct DescriptionBody {
    description: String,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Serialize)]
struct HealthBody {
    status: &'static str,
    nodes: usize,
    edges: usize,
    refreshing: bool,
}

#[derive(Debug, Serialize)]
struct DiagnosticsBody {
    counts: DiagnosticCounts,
    #[serde(flatten)]
    diagnostics: BuildDiagnostics,
}

#[derive(Debug, Serialize)]
struct CyclesBody {
    count: usize,
    cycles: Vec<Vec<GlobalId>>,
}

/// Execute the serve command
pub async fn execute(args: &ServeArgs, global: &GlobalArgs) -> Result<()> {
    let config = load_config(global)?;
    let host = args.host.clone().unwrap_or_else(|| config.server.host.clone());
    let port = args.port.unwrap_or(config.server.port);
    let watch = args.watch || config.watch.enabled;
    let config = Arc::new(config);

    let store = Arc::new(MetadataStore::new());
    match restore_snapshot(&config, &store) {
        Ok(true) => log::info!(
            "Serving saved snapshot ({} nodes) until the first refresh completes",
            store.snapshot().graph.node_count()
        ),
        Ok(false) => {}
        Err(e) => log::warn!("Ignoring saved snapshot: {:#}", e),
    }

    let service = Arc::new(RefreshService::new(Arc::clone(&config), store));
    {
        let service = Arc::clone(&service);
        tokio::spawn(async move {
            if let Err(e) = service.refresh(RefreshTrigger::Startup).await {
                log::warn!("Startup refresh not run: {}", e);
            }
        });
    }

    let poller = watch.then(|| Arc::new(Poller::new(Arc::clone(&service))).spawn());
    let state = Arc::new(AppState {
        service,
        poller: poller.as_ref().map(|h| Arc::clone(h.poller())),
    });
    let app = router(state);

    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .context("Invalid host:port")?;
    println!("Serving metadata API at http://{}", addr);
    println!("Press Ctrl+C to stop.\n");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    if let Some(handle) = poller {
        handle.stop().await;
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::warn!("Could not listen for Ctrl+C: {}", e);
    }
}

pub(crate) fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/projects", get(list_projects))
        .route("/api/models", get(list_models))
        .route("/api/models/{id}", get(get_model))
        .route("/api/models/{id}/lineage", get(get_lineage))
        .route("/api/models/{id}/description", post(update_model_description))
        .route(
            "/api/columns/{model_id}/{column}/description",
            post(update_column_description),
        )
        .route("/api/lineage", get(list_lineage))
        .route("/api/refresh", post(refresh))
        .route("/api/refresh/status", get(refresh_status))
        .route("/api/diagnostics", get(diagnostics))
        .route("/api/cycles", get(cycles))
        .route("/api/watcher/status", get(watcher_status))
        .route("/api/export/json", get(export_json))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn json<T: Serialize>(status: StatusCode, value: &T) -> Response {
    match serde_json::to_string(value) {
        Ok(body) => (status, [(header::CONTENT_TYPE, "application/json")], body).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

fn error_status(err: &MetaError) -> StatusCode {
    match err {
        MetaError::NodeNotFound { .. } | MetaError::ColumnNotFound { .. } => StatusCode::NOT_FOUND,
        MetaError::Validation { .. } => StatusCode::BAD_REQUEST,
        MetaError::RefreshInProgress => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error(err: MetaError) -> Response {
    json(
        error_status(&err),
        &ErrorBody {
            error: err.to_string(),
        },
    )
}

impl AppState {
    fn store(&self) -> &MetadataStore {
        self.service.store()
    }

    /// Save after an edit; the edit stays published even when saving fails.
    async fn persist(&self) {
        if let Err(e) = self.service.persist().await {
            log::warn!("Edit not saved: {}", e);
        }
    }
}

async fn health(State(state): State<Arc<AppState>>) -> Response {
    let snapshot = state.store().snapshot();
    json(
        StatusCode::OK,
        &HealthBody {
            status: "ok",
            nodes: snapshot.graph.node_count(),
            edges: snapshot.graph.edge_count(),
            refreshing: state.service.is_refreshing(),
        },
    )
}

async fn list_projects(State(state): State<Arc<AppState>>) -> Response {
    json(StatusCode::OK, &state.store().list_projects())
}

async fn list_models(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ModelQuery>,
) -> Response {
    let kind = match query.kind.as_deref() {
        None | Some("") => None,
        Some("model") => Some(NodeKind::Model),
        Some("source") => Some(NodeKind::Source),
        Some(other) => {
            return error(MetaError::Validation {
                message: format!("unknown kind '{}', expected model or source", other),
            })
        }
    };
    let filter = NodeFilter {
        project: query.project_id,
        name: query.name,
        description_contains: query.search,
        kind,
    };
    json(StatusCode::OK, &state.store().list_nodes(&filter))
}

async fn get_model(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    match state.store().get_node(&id) {
        Some(node) => json(StatusCode::OK, &node),
        None => error(MetaError::NodeNotFound { id }),
    }
}

async fn get_lineage(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    match state.store().get_lineage(&id) {
        Some(lineage) => json(StatusCode::OK, &lineage),
        None => error(MetaError::NodeNotFound { id }),
    }
}

async fn list_lineage(State(state): State<Arc<AppState>>) -> Response {
    json(StatusCode::OK, &state.store().list_edges())
}

async fn update_model_description(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<DescriptionBody>,
) -> Response {
    match state
        .store()
        .update_description(EntityType::Model, &id, &body.description)
    {
        Ok(node) => {
            state.persist().await;
            json(StatusCode::OK, &node)
        }
        Err(e) => error(e),
    }
}

async fn update_column_description(
    State(state): State<Arc<AppState>>,
    Path((model_id, column)): Path<(String, String)>,
    Json(body): Json<DescriptionBody>,
) -> Response {
    let id = format!("{}:{}", model_id, column);
    match state
        .store()
        .update_description(EntityType::Column, &id, &body.description)
    {
        Ok(node) => {
            state.persist().await;
            json(StatusCode::OK, &node)
        }
        Err(e) => error(e),
    }
}

async fn refresh(State(state): State<Arc<AppState>>) -> Response {
    match state.service.refresh(RefreshTrigger::Manual).await {
        Ok(report) if report.success => json(StatusCode::OK, &report),
        Ok(report) => json(StatusCode::INTERNAL_SERVER_ERROR, &report),
        Err(e) => error(e),
    }
}

async fn refresh_status(State(state): State<Arc<AppState>>) -> Response {
    json(StatusCode::OK, &state.service.status())
}

async fn diagnostics(State(state): State<Arc<AppState>>) -> Response {
    let diagnostics = state.store().diagnostics();
    json(
        StatusCode::OK,
        &DiagnosticsBody {
            counts: diagnostics.counts(),
            diagnostics,
        },
    )
}

async fn cycles(State(state): State<Arc<AppState>>) -> Response {
    let cycles = state.store().snapshot().graph.cycles();
    json(
        StatusCode::OK,
        &CyclesBody {
            count: cycles.len(),
            cycles,
        },
    )
}

async fn watcher_status(State(state): State<Arc<AppState>>) -> Response {
    let status = match &state.poller {
        Some(poller) => poller.status(),
        None => {
            let config = state.service.config();
            PollerStatus {
                active: false,
                directory: config.projects_dir.clone(),
                patterns: config.watch.patterns.clone(),
                interval_secs: config.watch.interval_secs,
                watched_files: 0,
                last_change_at: None,
                last_refresh_at: None,
            }
        }
    };
    json(StatusCode::OK, &status)
}

async fn export_json(State(state): State<Arc<AppState>>) -> Response {
    let document = SnapshotDocument::from_snapshot(&state.store().snapshot());
    json(StatusCode::OK, &document)
}

#[cfg(test)]
#[path = "api_test.rs"]
mod tests;
