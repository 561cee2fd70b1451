//! Shared test utilities: an in-process fake of the ARM node configuration endpoint.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use autodsc_arm::{ArmClientConfig, HttpNodeConfigurationClient};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::put;
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::Mutex;

pub const SUBSCRIPTION: &str = "00000000-0000-0000-0000-000000000001";
pub const TOKEN: &str = "test-token";

/// Resource group that makes the fake answer 500 with an ARM error envelope.
pub const BROKEN_GROUP: &str = "broken-rg";
/// Resource group that makes the fake answer 502 with a plain-text body.
pub const GARBLED_GROUP: &str = "garbled-rg";
/// Node configuration name whose GET never completes in time.
pub const SLOW_NAME: &str = "cfg.slow";
/// Node configuration name whose GET answers 200 with a body that is not JSON.
pub const HTML_NAME: &str = "cfg.html";
/// Resource group whose DELETEs are accepted for asynchronous completion (202).
pub const ASYNC_DELETE_GROUP: &str = "async-rg";
/// Resource group whose DELETEs answer 204 without a body.
pub const NO_CONTENT_GROUP: &str = "empty-rg";

/// A request as seen by the fake.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: &'static str,
    pub path: (String, String, String, String),
    pub api_version: Option<String>,
    pub authorization: Option<String>,
    pub body: Option<Value>,
}

#[derive(Default)]
pub struct FakeState {
    pub nodes: Mutex<HashMap<(String, String, String), Value>>,
    pub requests: Mutex<Vec<Recorded>>,
}

type Segments = (String, String, String, String);

fn key(p: &Segments) -> (String, String, String) {
    (
        p.1.to_ascii_lowercase(),
        p.2.to_ascii_lowercase(),
        p.3.to_ascii_lowercase(),
    )
}

fn resource_id(p: &Segments) -> String {
    format!(
        "/subscriptions/{}/resourceGroups/{}/providers/Microsoft.Automation/automationAccounts/{}/nodeConfigurations/{}",
        p.0, p.1, p.2, p.3
    )
}

fn arm_error(status: StatusCode, code: &str, message: &str) -> Response {
    (
        status,
        Json(json!({ "error": { "code": code, "message": message } })),
    )
        .into_response()
}

/// Common failure switches, keyed off the resource group.
fn injected(p: &Segments) -> Option<Response> {
    match p.1.as_str() {
        BROKEN_GROUP => Some(arm_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "InternalServerError",
            "something broke",
        )),
        GARBLED_GROUP => Some((StatusCode::BAD_GATEWAY, "upstream hiccup").into_response()),
        _ => None,
    }
}

async fn record(
    state: &FakeState,
    method: &'static str,
    path: &Segments,
    query: &HashMap<String, String>,
    headers: &HeaderMap,
    body: Option<Value>,
) {
    state.requests.lock().await.push(Recorded {
        method,
        path: path.clone(),
        api_version: query.get("api-version").cloned(),
        authorization: headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body,
    });
}

async fn put_node(
    State(state): State<Arc<FakeState>>,
    Path(path): Path<Segments>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    record(&state, "PUT", &path, &query, &headers, Some(body.clone())).await;
    if let Some(resp) = injected(&path) {
        return resp;
    }

    let node = json!({
        "id": resource_id(&path),
        "name": body["name"],
        "type": "Microsoft.Automation/AutomationAccounts/nodeConfigurations",
        "creationTime": "2018-03-01T10:00:00+00:00",
        "lastModifiedTime": "2018-03-01T10:05:00+00:00",
        "configuration": body["configuration"],
    });
    let mut nodes = state.nodes.lock().await;
    let created = nodes.insert(key(&path), node.clone()).is_none();
    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    (status, Json(node)).into_response()
}

async fn get_node(
    State(state): State<Arc<FakeState>>,
    Path(path): Path<Segments>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    record(&state, "GET", &path, &query, &headers, None).await;
    if let Some(resp) = injected(&path) {
        return resp;
    }
    if path.3 == SLOW_NAME {
        tokio::time::sleep(Duration::from_secs(10)).await;
    }
    if path.3 == HTML_NAME {
        return (StatusCode::OK, "<html>maintenance</html>").into_response();
    }

    match state.nodes.lock().await.get(&key(&path)) {
        Some(node) => Json(node.clone()).into_response(),
        None => arm_error(
            StatusCode::NOT_FOUND,
            "NotFound",
            &format!("Node configuration '{}' not found", path.3),
        ),
    }
}

async fn delete_node(
    State(state): State<Arc<FakeState>>,
    Path(path): Path<Segments>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    record(&state, "DELETE", &path, &query, &headers, None).await;
    if let Some(resp) = injected(&path) {
        return resp;
    }

    match (path.1.as_str(), state.nodes.lock().await.remove(&key(&path))) {
        (ASYNC_DELETE_GROUP, _) => StatusCode::ACCEPTED.into_response(),
        (NO_CONTENT_GROUP, _) => StatusCode::NO_CONTENT.into_response(),
        (_, Some(_)) => StatusCode::OK.into_response(),
        (_, None) => arm_error(StatusCode::NOT_FOUND, "NotFound", "gone"),
    }
}

/// A raw HTTP endpoint that sends response headers promising a body, writes
/// part of it and then stalls with the connection open.
pub async fn spawn_stalled_body() -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let _ = socket
                    .write_all(
                        b"HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: 100\r\n\r\n{\"id\":",
                    )
                    .await;
                let _ = socket.flush().await;
                tokio::time::sleep(Duration::from_secs(60)).await;
            });
        }
    });

    format!("http://{}", addr)
}

/// Fake ARM server bound to an ephemeral port.
pub struct FakeArm {
    pub addr: SocketAddr,
    pub state: Arc<FakeState>,
    shutdown_tx: tokio::sync::oneshot::Sender<()>,
}

impl FakeArm {
    pub async fn spawn() -> Self {
        let state = Arc::new(FakeState::default());

        let router = Router::new()
            .route(
                "/subscriptions/{sub}/resourceGroups/{rg}/providers/Microsoft.Automation/automationAccounts/{account}/nodeConfigurations/{name}",
                put(put_node).get(get_node).delete(delete_node),
            )
            .with_state(Arc::clone(&state));

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .expect("Server error");
        });

        Self {
            addr,
            state,
            shutdown_tx,
        }
    }

    pub fn endpoint(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// HTTP client pointed at this fake.
    pub fn client(&self) -> HttpNodeConfigurationClient {
        let mut config = ArmClientConfig::new(SUBSCRIPTION);
        config.endpoint = self.endpoint();
        config.access_token = Some(TOKEN.to_string());
        HttpNodeConfigurationClient::new(config).expect("Failed to build client")
    }

    pub async fn requests(&self) -> Vec<Recorded> {
        self.state.requests.lock().await.clone()
    }

    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
    }
}
