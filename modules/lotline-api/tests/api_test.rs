// Import API contract tests against the in-memory store, with the mock
// dispatcher standing in for the continuation callback.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use lotline_api::{build_router, AppState};
use lotline_common::dataset::SourceDataset;
use lotline_common::types::RawListing;
use lotline_import::{BatchCoordinator, MockContinuation};
use lotline_store::MemoryStore;

struct TestApp {
    router: axum::Router,
    state: Arc<AppState>,
    store: Arc<MemoryStore>,
    dispatcher: Arc<MockContinuation>,
}

fn listing(id: &str) -> RawListing {
    serde_json::from_value(json!({"id": id, "propertyType": "house"})).unwrap()
}

fn test_app(total_items: usize, batch_size: i64, shared_secret: Option<&str>) -> TestApp {
    let listings = (0..total_items)
        .map(|i| listing(&format!("p-{i}")))
        .collect();
    let dataset = Arc::new(SourceDataset::from_listings("unused.json", listings));
    let store = Arc::new(MemoryStore::new());
    let coordinator = Arc::new(BatchCoordinator::new(
        dataset,
        store.clone(),
        store.clone(),
    ));
    let dispatcher = Arc::new(MockContinuation::new());

    let state = Arc::new(AppState {
        coordinator,
        dispatcher: Some(dispatcher.clone() as Arc<dyn lotline_import::ContinuationDispatcher>),
        shared_secret: shared_secret.map(String::from),
        batch_size,
    });

    TestApp {
        router: build_router(state.clone()),
        state,
        store,
        dispatcher,
    }
}

async fn send(router: &axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn post_json_with_bearer(uri: &str, body: Value, token: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn small_import_completes_in_the_first_batch() {
    let app = test_app(5, 10, None);

    let (status, body) = send(
        &app.router,
        post_json("/api/import-data", json!({})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    let job_id: Uuid = body["importId"].as_str().unwrap().parse().unwrap();

    assert_eq!(app.store.listing_count(), 5);
    let job = app.store.job(job_id).unwrap();
    assert_eq!(job.current_offset, 5);
    assert!(app.dispatcher.calls().is_empty());
}

#[tokio::test]
async fn unfinished_import_dispatches_a_continuation() {
    let app = test_app(25, 10, None);

    let (status, body) = send(
        &app.router,
        post_json("/api/import-data", json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let job_id: Uuid = body["importId"].as_str().unwrap().parse().unwrap();

    // The dispatch happens on a spawned task.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(app.dispatcher.calls(), vec![job_id]);

    let job = app.store.job(job_id).unwrap();
    assert_eq!(job.current_offset, 10);
}

#[tokio::test]
async fn trigger_walks_the_job_to_completion_batch_by_batch() {
    let app = test_app(25, 10, None);

    let (_, body) = send(&app.router, post_json("/api/import-data", json!({}))).await;
    let job_id = body["importId"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app.router,
        post_json("/api/trigger-import", json!({"importId": job_id})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], json!("Next batch triggered"));

    let (status, body) = send(
        &app.router,
        post_json("/api/trigger-import", json!({"importId": job_id})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], json!("Import completed"));

    let (status, body) = send(
        &app.router,
        post_json("/api/trigger-import", json!({"importId": job_id})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], json!("Import already completed"));

    assert_eq!(app.store.listing_count(), 25);
}

#[tokio::test]
async fn unknown_import_id_is_404() {
    let app = test_app(5, 10, None);

    let (status, body) = send(
        &app.router,
        post_json("/api/trigger-import", json!({"importId": Uuid::new_v4()})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], json!("Import not found"));
}

#[tokio::test]
async fn previously_failed_import_is_400() {
    let app = test_app(25, 10, None);

    let (_, body) = send(&app.router, post_json("/api/import-data", json!({}))).await;
    let job_id: Uuid = body["importId"].as_str().unwrap().parse().unwrap();
    app.state
        .coordinator
        .fail_job(job_id, "operator reset")
        .await
        .unwrap();

    let (status, body) = send(
        &app.router,
        post_json("/api/trigger-import", json!({"importId": job_id})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("Import previously failed"));
}

#[tokio::test]
async fn trigger_requires_the_shared_secret_when_configured() {
    let app = test_app(25, 10, Some("s3cret"));

    let (status, _) = send(
        &app.router,
        post_json("/api/trigger-import", json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(
        &app.router,
        post_json_with_bearer("/api/trigger-import", json!({}), "s3cret"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
}

#[tokio::test]
async fn progress_reflects_the_last_committed_state() {
    let app = test_app(25, 10, None);

    let (_, body) = send(&app.router, post_json("/api/import-data", json!({}))).await;
    let job_id = body["importId"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app.router,
        get(&format!("/api/import-progress?importId={job_id}")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["progress"]["currentOffset"], json!(10));
    assert_eq!(body["progress"]["totalItems"], json!(25));
    assert_eq!(body["progress"]["status"], json!("in_progress"));
    assert_eq!(body["progress"]["error"], Value::Null);
}

#[tokio::test]
async fn progress_without_an_id_is_400_and_unknown_is_404() {
    let app = test_app(5, 10, None);

    let (status, body) = send(&app.router, get("/api/import-progress")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("Import ID is required"));

    let (status, _) = send(
        &app.router,
        get(&format!("/api/import-progress?importId={}", Uuid::new_v4())),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn full_import_reports_a_job_and_finishes() {
    let app = test_app(5, 10, None);

    let (status, body) = send(&app.router, post_json("/api/import", json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));

    let job_id: Uuid = body["importId"].as_str().unwrap().parse().unwrap();
    let job = app.store.job(job_id).unwrap();
    assert_eq!(job.current_offset, 5);
    assert_eq!(app.store.listing_count(), 5);
}
