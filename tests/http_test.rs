//! HTTP contract of the intake router, driven in-process.

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use graph_intake::backend::{GraphStore, InsertOutcome, MemoryGraphStore, MemoryWorkQueue, WorkQueue};
use graph_intake::error::{Error, Result};
use graph_intake::http::router;
use graph_intake::intake::IntakeHandler;
use graph_intake::model::{GraphName, GraphRecord, GraphStatus, WorkMessage};
use serde_json::{Value, json};
use tower::ServiceExt;

struct TestApp {
    router: Router,
    store: Arc<MemoryGraphStore>,
    queue: Arc<MemoryWorkQueue>,
}

fn app() -> TestApp {
    let store = Arc::new(MemoryGraphStore::new());
    let queue = Arc::new(MemoryWorkQueue::new());
    let handler = IntakeHandler::new(store.clone(), queue.clone());
    TestApp {
        router: router(handler),
        store,
        queue,
    }
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn post_graph(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/graphs")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn create_returns_201_and_queues_work() {
    let app = app();

    let (status, body) = send(
        &app.router,
        post_graph(r#"{"graphName":"Alpha1","schema":{"k":1}}"#),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(
        body,
        json!({"graphName": "alpha1", "currentState": "DEPLOYMENT_QUEUED"})
    );
    assert_eq!(app.store.records().len(), 1);
    assert_eq!(app.queue.messages().len(), 1);
    assert_eq!(app.queue.messages()[0].schema, json!({"k": 1}));
}

#[tokio::test]
async fn duplicate_create_returns_400_already_exists() {
    let app = app();
    let body = r#"{"graphName":"Alpha1","schema":{"k":1}}"#;

    let (first, _) = send(&app.router, post_graph(body)).await;
    let (second, error) = send(&app.router, post_graph(body)).await;

    assert_eq!(first, StatusCode::CREATED);
    assert_eq!(second, StatusCode::BAD_REQUEST);
    assert!(
        error["error"]
            .as_str()
            .is_some_and(|msg| msg.contains("already exists")),
        "unexpected body: {error}"
    );
    assert_eq!(app.queue.messages().len(), 1);
}

#[tokio::test]
async fn invalid_name_returns_400_without_side_effects() {
    let app = app();

    let (status, body) = send(
        &app.router,
        post_graph(r#"{"graphName":"bad name!","schema":{}}"#),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        "graphName is a required field which must made up of alphanumeric characters"
    );
    assert!(app.store.records().is_empty());
    assert!(app.queue.messages().is_empty());
}

#[tokio::test]
async fn malformed_json_returns_400() {
    let app = app();

    let (status, body) = send(&app.router, post_graph("{not json")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn missing_content_type_is_still_parsed() {
    let app = app();
    let request = Request::builder()
        .method("POST")
        .uri("/graphs")
        .body(Body::from(r#"{"graphName":"plain","schema":{}}"#))
        .unwrap();

    let (status, _) = send(&app.router, request).await;

    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn get_graph_returns_record_or_404() {
    let app = app();
    send(
        &app.router,
        post_graph(r#"{"graphName":"Alpha1","schema":{}}"#),
    )
    .await;

    let (status, body) = send(&app.router, get("/graphs/ALPHA1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["releaseName"], "alpha1");
    assert_eq!(body["currentState"], "DEPLOYMENT_QUEUED");

    let (status, _) = send(&app.router, get("/graphs/nothere")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn health_reports_ok() {
    let app = app();

    let (status, body) = send(&app.router, get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

/// Store whose every call fails, as if the database were down.
struct DownStore;

#[async_trait]
impl GraphStore for DownStore {
    async fn insert_if_absent(&self, _record: &GraphRecord) -> Result<InsertOutcome> {
        Err(Error::Other("graph table unreachable".to_string()))
    }

    async fn get(&self, _name: &GraphName) -> Result<Option<GraphRecord>> {
        Err(Error::Other("graph table unreachable".to_string()))
    }

    async fn remove_if_status(&self, _name: &GraphName, _status: GraphStatus) -> Result<bool> {
        Err(Error::Other("graph table unreachable".to_string()))
    }

    async fn ping(&self) -> Result<()> {
        Err(Error::Other("graph table unreachable".to_string()))
    }
}

struct DownQueue;

#[async_trait]
impl WorkQueue for DownQueue {
    async fn publish(&self, _message: &WorkMessage) -> Result<i64> {
        Err(Error::Other("work queue unreachable".to_string()))
    }
}

#[tokio::test]
async fn store_fault_returns_500_with_error_body() {
    let queue = Arc::new(MemoryWorkQueue::new());
    let router = router(IntakeHandler::new(Arc::new(DownStore), queue.clone()));

    let (status, body) = send(&router, post_graph(r#"{"graphName":"alpha","schema":{}}"#)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"error": "graph table unreachable"}));
    assert!(queue.messages().is_empty());
}

#[tokio::test]
async fn queue_fault_returns_500_and_leaves_no_record() {
    let store = Arc::new(MemoryGraphStore::new());
    let router = router(IntakeHandler::new(store.clone(), Arc::new(DownQueue)));

    let (status, body) = send(&router, post_graph(r#"{"graphName":"alpha","schema":{}}"#)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"error": "work queue unreachable"}));
    assert!(store.records().is_empty());
}

#[tokio::test]
async fn get_graph_store_fault_returns_500() {
    let router = router(IntakeHandler::new(
        Arc::new(DownStore),
        Arc::new(MemoryWorkQueue::new()),
    ));

    let (status, body) = send(&router, get("/graphs/alpha")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn health_reports_503_when_store_is_down() {
    let router = router(IntakeHandler::new(
        Arc::new(DownStore),
        Arc::new(MemoryWorkQueue::new()),
    ));

    let (status, body) = send(&router, get("/health")).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "unavailable");
}
