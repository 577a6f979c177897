use super::*;
use um_core::{Column, Config, Edge, EdgeOrigin, Node, Project, ProjectId};

fn node(project: &str, name: &str) -> Node {
    let project_id = ProjectId::new(project);
    Node {
        global_id: GlobalId::compose(&project_id, name),
        local_name: name.to_string(),
        owning_project: project_id,
        kind: NodeKind::Model,
        schema: None,
        database: None,
        materialized: Some("view".to_string()),
        description: Some(format!("{} model", name)),
        columns: vec![Column::new(name, "id", None, None)],
        raw_text: None,
        source_name: None,
        identifier: None,
        file_path: None,
        tags: Vec::new(),
        user_edited: false,
        ai_description: None,
    }
}

fn state(dir: &std::path::Path) -> Arc<AppState> {
    let config = Config {
        projects_dir: dir.join("projects"),
        output_path: dir.join("snapshot.json"),
        ..Config::default()
    };
    let store = Arc::new(MetadataStore::new());
    store.replace_all(
        vec![Project {
            id: ProjectId::new("sales"),
            display_name: "sales".to_string(),
            root_path: dir.join("projects").join("sales"),
            model_paths: vec!["models".to_string()],
        }],
        vec![node("sales", "orders"), node("sales", "revenue")],
        vec![Edge::new(
            GlobalId::new("sales_orders"),
            GlobalId::new("sales_revenue"),
            EdgeOrigin::ManifestDependency,
        )],
    );
    Arc::new(AppState {
        service: Arc::new(RefreshService::new(Arc::new(config), store)),
        poller: None,
    })
}

async fn body(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn description(text: &str) -> Json<DescriptionBody> {
    Json(DescriptionBody {
        description: text.to_string(),
    })
}

#[test]
fn test_error_status_mapping() {
    assert_eq!(
        error_status(&MetaError::NodeNotFound { id: "x".into() }),
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        error_status(&MetaError::ColumnNotFound {
            node: "x".into(),
            column: "y".into()
        }),
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        error_status(&MetaError::Validation {
            message: "bad".into()
        }),
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        error_status(&MetaError::RefreshInProgress),
        StatusCode::CONFLICT
    );
}

#[tokio::test]
async fn test_get_model_and_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let state = state(dir.path());

    let response = get_model(State(Arc::clone(&state)), Path("sales_orders".to_string())).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body(response).await["local_name"], "orders");

    let response = get_model(State(state), Path("sales_missing".to_string())).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(body(response).await["error"]
        .as_str()
        .unwrap()
        .contains("X002"));
}

#[tokio::test]
async fn test_list_models_filters_and_rejects_bad_kind() {
    let dir = tempfile::tempdir().unwrap();
    let state = state(dir.path());

    let query = ModelQuery {
        search: Some("REVENUE".to_string()),
        ..Default::default()
    };
    let response = list_models(State(Arc::clone(&state)), Query(query)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let models = body(response).await;
    assert_eq!(models.as_array().unwrap().len(), 1);
    assert_eq!(models[0]["global_id"], "sales_revenue");

    let query = ModelQuery {
        kind: Some("table".to_string()),
        ..Default::default()
    };
    let response = list_models(State(state), Query(query)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_lineage_endpoint() {
    let dir = tempfile::tempdir().unwrap();
    let state = state(dir.path());

    let response = get_lineage(State(state), Path("sales_revenue".to_string())).await;
    assert_eq!(response.status(), StatusCode::OK);
    let lineage = body(response).await;
    assert_eq!(lineage["upstream"][0]["id"], "sales_orders");
    assert_eq!(lineage["upstream"][0]["origin"], "manifest_dependency");
    assert_eq!(lineage["downstream"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_description_updates_are_saved() {
    let dir = tempfile::tempdir().unwrap();
    let state = state(dir.path());

    let response = update_model_description(
        State(Arc::clone(&state)),
        Path("sales_orders".to_string()),
        description("Order facts"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body(response).await["user_edited"], true);

    let response = update_column_description(
        State(Arc::clone(&state)),
        Path(("sales_orders".to_string(), "id".to_string())),
        description("Order key"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let saved = SnapshotDocument::load(&dir.path().join("snapshot.json"))
        .unwrap()
        .unwrap();
    let orders = saved
        .models
        .iter()
        .find(|n| n.global_id == "sales_orders")
        .unwrap();
    assert_eq!(orders.description.as_deref(), Some("Order facts"));
    assert_eq!(
        orders.column("id").unwrap().description.as_deref(),
        Some("Order key")
    );
}

#[tokio::test]
async fn test_description_errors() {
    let dir = tempfile::tempdir().unwrap();
    let state = state(dir.path());

    let response = update_column_description(
        State(Arc::clone(&state)),
        Path(("sales_orders".to_string(), "nope".to_string())),
        description("text"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = update_model_description(
        State(state),
        Path("sales_orders".to_string()),
        description("  "),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_refresh_replaces_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let state = state(dir.path());

    let response = refresh(State(Arc::clone(&state))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body(response).await["success"], true);

    // projects dir does not exist, so the rebuilt graph is empty
    let response = health(State(Arc::clone(&state))).await;
    let health = body(response).await;
    assert_eq!(health["nodes"], 0);
    assert_eq!(health["refreshing"], false);

    let response = refresh_status(State(state)).await;
    let status = body(response).await;
    assert_eq!(status["in_progress"], false);
    assert_eq!(status["last"]["trigger"], "manual");
}

#[tokio::test]
async fn test_watcher_status_without_poller() {
    let dir = tempfile::tempdir().unwrap();
    let state = state(dir.path());
    let response = watcher_status(State(state)).await;
    let status = body(response).await;
    assert_eq!(status["active"], false);
    assert_eq!(status["interval_secs"], 60);
}

#[tokio::test]
async fn test_export_and_cycles() {
    let dir = tempfile::tempdir().unwrap();
    let state = state(dir.path());

    let export = body(export_json(State(Arc::clone(&state))).await).await;
    assert_eq!(export["models"].as_array().unwrap().len(), 2);
    assert_eq!(export["lineage"][0]["target"], "sales_revenue");
    assert_eq!(export["projects"][0]["id"], "sales");

    let found = body(cycles(State(state)).await).await;
    assert_eq!(found["count"], 0);
}
