//! The platform client against a stub task API: create, paginated list,
//! and the refresh-and-retry behaviour on a stale token.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::post;
use axum::Router;
use serde_json::{json, Value};

use planwatch::platform::{PlatformClient, UaaTokenFetcher};
use planwatch::scheduler::TaskCreator;

use planwatch_test_utils::init_tracing;

#[derive(Default)]
struct Stub {
    base_url: Mutex<String>,
    token_requests: AtomicUsize,
    created: Mutex<Vec<Value>>,
    auth_headers: Mutex<Vec<String>>,
    reject_next_create: AtomicBool,
    always_reject_create: AtomicBool,
}

async fn token_endpoint(State(stub): State<Arc<Stub>>) -> Json<Value> {
    let n = stub.token_requests.fetch_add(1, Ordering::SeqCst) + 1;
    Json(json!({
        "access_token": format!("token-{n}"),
        "refresh_token": format!("refresh-{n}"),
        "token_type": "bearer",
    }))
}

async fn create_task(
    State(stub): State<Arc<Stub>>,
    headers: axum::http::HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    if let Some(auth) = headers.get("authorization") {
        stub.auth_headers
            .lock()
            .unwrap()
            .push(auth.to_str().unwrap_or_default().to_string());
    }

    if stub.always_reject_create.load(Ordering::SeqCst)
        || stub.reject_next_create.swap(false, Ordering::SeqCst)
    {
        return (StatusCode::UNAUTHORIZED, Json(json!({"error": "stale"})));
    }

    stub.created.lock().unwrap().push(body);
    (StatusCode::ACCEPTED, Json(json!({"state": "PENDING"})))
}

async fn list_tasks(
    State(stub): State<Arc<Stub>>,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    let base = stub.base_url.lock().unwrap().clone();

    if query.get("page").map(String::as_str) == Some("2") {
        Json(json!({
            "pagination": { "next": null },
            "resources": [ { "name": "three" } ],
        }))
    } else {
        Json(json!({
            "pagination": {
                "next": { "href": format!("{base}/v3/apps/guid/tasks?page=2") }
            },
            "resources": [ { "name": "one" }, { "name": "two" } ],
        }))
    }
}

async fn start_stub() -> (Arc<Stub>, PlatformClient) {
    init_tracing();

    let stub = Arc::new(Stub::default());

    let router = Router::new()
        .route("/oauth/token", post(token_endpoint))
        .route("/v3/apps/{guid}/tasks", post(create_task).get(list_tasks))
        .with_state(Arc::clone(&stub));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let base = format!("http://{addr}");
    *stub.base_url.lock().unwrap() = base.clone();

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    let tokens = Arc::new(UaaTokenFetcher::new(
        base.clone(),
        "client-id".to_string(),
        "initial-refresh".to_string(),
        reqwest::Client::new(),
    ));
    let client = PlatformClient::new(base, tokens, false).unwrap();

    (stub, client)
}

#[tokio::test]
async fn create_task_posts_command_and_name() {
    let (stub, client) = start_stub().await;

    client
        .create_task("echo hi", "blob", "guid")
        .await
        .unwrap();

    let created = stub.created.lock().unwrap().clone();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0]["command"], "echo hi");
    assert_eq!(created[0]["name"], "blob");

    let auth = stub.auth_headers.lock().unwrap().clone();
    assert_eq!(auth, vec!["bearer token-1"]);
}

#[tokio::test]
async fn stale_token_is_refreshed_and_retried_once() {
    let (stub, client) = start_stub().await;
    stub.reject_next_create.store(true, Ordering::SeqCst);

    client
        .create_task("echo hi", "blob", "guid")
        .await
        .unwrap();

    // One exchange for the initial token, one after the 401.
    assert_eq!(stub.token_requests.load(Ordering::SeqCst), 2);

    let auth = stub.auth_headers.lock().unwrap().clone();
    assert_eq!(auth, vec!["bearer token-1", "bearer token-2"]);
}

#[tokio::test]
async fn persistent_rejection_surfaces_an_error() {
    let (stub, client) = start_stub().await;
    stub.always_reject_create.store(true, Ordering::SeqCst);

    let result = client.create_task("echo hi", "blob", "guid").await;
    assert!(result.is_err());
    assert!(stub.created.lock().unwrap().is_empty());
}

#[tokio::test]
async fn list_tasks_follows_pagination() {
    let (_stub, client) = start_stub().await;

    let names = client.list_tasks("guid").await.unwrap();
    assert_eq!(names, vec!["one", "two", "three"]);
}

#[tokio::test]
async fn cached_token_is_reused_across_calls() {
    let (stub, client) = start_stub().await;

    client.create_task("a", "n1", "guid").await.unwrap();
    client.create_task("b", "n2", "guid").await.unwrap();

    assert_eq!(stub.token_requests.load(Ordering::SeqCst), 1);
}
