//! API tests against the fully assembled router
//!
//! Most tests use the in-memory store. The last group drives the router
//! against a mocked Elasticsearch to check the requests a submission makes.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    response::Response,
    Router,
};
use serde_json::{json, Value};
use spark_common::store::{ElasticsearchStore, InMemoryStore};
use spark_common::RetryPolicy;
use spark_server::{api::create_router, config::Config, features::JobsContext};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use wiremock::{
    matchers::{method, path, path_regex},
    Mock, MockServer, ResponseTemplate,
};

fn app_with(store: Arc<InMemoryStore>) -> Router {
    let ctx = JobsContext::new(store, "spark-jobs").with_retry(RetryPolicy::none());
    create_router(ctx, &Config::default())
}

async fn json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_ping() {
    let response = app_with(Arc::new(InMemoryStore::new()))
        .oneshot(request("GET", "/"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("ping").unwrap(), "pong");
    assert_eq!(json_body(response).await, json!({}));
}

#[tokio::test]
async fn test_health_reports_store() {
    let response = app_with(Arc::new(InMemoryStore::new()))
        .oneshot(request("GET", "/health"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["jobs_index_exists"], false);
}

#[tokio::test]
async fn test_health_with_store_down() {
    let store = Arc::new(InMemoryStore::new());
    store.set_offline(true);

    let response = app_with(store)
        .oneshot(request("GET", "/health"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_legacy_and_versioned_submission_share_index() {
    let store = Arc::new(InMemoryStore::new());
    let app = app_with(store.clone());

    let legacy = app.clone().oneshot(request("POST", "/submit")).await.unwrap();
    assert_eq!(legacy.status(), StatusCode::ACCEPTED);
    let legacy = json_body(legacy).await;

    let versioned = app
        .clone()
        .oneshot(request("POST", "/api/v1/jobs"))
        .await
        .unwrap();
    assert_eq!(versioned.status(), StatusCode::ACCEPTED);

    assert_eq!(store.document_count("spark-jobs").await, 2);

    let uri = format!("/api/v1/jobs/{}", legacy["id"].as_str().unwrap());
    let fetched = app.oneshot(request("GET", &uri)).await.unwrap();
    assert_eq!(fetched.status(), StatusCode::OK);
    assert_eq!(json_body(fetched).await, legacy);
}

#[tokio::test]
async fn test_unknown_route() {
    let response = app_with(Arc::new(InMemoryStore::new()))
        .oneshot(request("GET", "/api/v2/jobs"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_submission_against_elasticsearch() {
    let server = MockServer::start().await;

    Mock::given(method("HEAD"))
        .and(path("/spark-jobs"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/spark-jobs"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"acknowledged": true, "index": "spark-jobs"})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path_regex(r"^/spark-jobs/_doc/\d+-\d+-\d+-\d+$"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"result": "created"})))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(ElasticsearchStore::new(&server.uri(), Duration::from_secs(5)).unwrap());
    let ctx = JobsContext::new(store, "spark-jobs").with_retry(RetryPolicy::none());
    let app = create_router(ctx, &Config::default());

    let response = app.oneshot(request("POST", "/submit")).await.unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let body = json_body(response).await;
    let received = server.received_requests().await.unwrap();
    let write = received
        .iter()
        .find(|r| r.url.path().contains("/_doc/"))
        .unwrap();
    let stored: Value = serde_json::from_slice(&write.body).unwrap();

    assert_eq!(write.url.path(), format!("/spark-jobs/_doc/{}", body["id"].as_str().unwrap()));
    assert_eq!(stored["status"], "Spark job pending..");
    assert_eq!(stored["current"], 0);
    assert_eq!(stored["total"], 100);
    assert!(stored.get("id").is_none());
}

#[tokio::test]
async fn test_store_rejection_is_server_error() {
    let server = MockServer::start().await;

    Mock::given(method("HEAD"))
        .and(path("/spark-jobs"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path_regex(r"^/spark-jobs/_doc/.+$"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": {
                "type": "cluster_block_exception",
                "reason": "index [spark-jobs] blocked by: [FORBIDDEN/8/index write (api)]"
            },
            "status": 403
        })))
        .mount(&server)
        .await;

    let store = Arc::new(ElasticsearchStore::new(&server.uri(), Duration::from_secs(5)).unwrap());
    let ctx = JobsContext::new(store, "spark-jobs").with_retry(RetryPolicy::none());

    let response = create_router(ctx, &Config::default())
        .oneshot(request("POST", "/submit"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json_body(response).await["error"]["status"], 500);
}
