//! Shared helpers for the integration scenarios: a stub provider token
//! endpoint with a call counter, and oneshot helpers for driving the router.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, Request};
use axum::response::Response;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::Value;
use tower::util::ServiceExt;

pub struct StubTokenEndpoint {
    pub url: String,
    pub calls: Arc<AtomicUsize>,
}

impl StubTokenEndpoint {
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[derive(Clone)]
struct StubState {
    body: Value,
    calls: Arc<AtomicUsize>,
}

async fn token_handler(State(stub): State<StubState>) -> Json<Value> {
    stub.calls.fetch_add(1, Ordering::SeqCst);
    Json(stub.body.clone())
}

/// Spawn a one-route token endpoint on an ephemeral port that answers every
/// POST with `body` and counts the calls.
pub async fn spawn_token_endpoint(body: Value) -> StubTokenEndpoint {
    let calls = Arc::new(AtomicUsize::new(0));
    let app = Router::new()
        .route("/token", post(token_handler))
        .with_state(StubState {
            body,
            calls: calls.clone(),
        });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind stub endpoint");
    let addr = listener.local_addr().expect("stub addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("stub serve");
    });

    StubTokenEndpoint {
        url: format!("http://{addr}/token"),
        calls,
    }
}

pub async fn get(router: &Router, uri: &str) -> Response {
    router
        .clone()
        .oneshot(
            Request::builder()
                .uri(uri)
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response")
}

pub async fn post_form(router: &Router, uri: &str, body: &str) -> Response {
    router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(body.to_string()))
                .expect("request"),
        )
        .await
        .expect("response")
}

/// Arbitrary method/header request, used for the 405 and `X-AuthID` cases.
pub async fn request(
    router: &Router,
    method: &str,
    uri: &str,
    headers: &[(&str, &str)],
    body: &str,
) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    router
        .clone()
        .oneshot(builder.body(Body::from(body.to_string())).expect("request"))
        .await
        .expect("response")
}

pub async fn body_string(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    String::from_utf8(bytes.to_vec()).expect("utf8 body")
}

pub async fn body_json(response: Response) -> Value {
    serde_json::from_str(&body_string(response).await).expect("json body")
}

pub fn location_header(response: &Response) -> String {
    response
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .expect("location header")
        .to_string()
}

pub fn extract_query_param(url: &str, name: &str) -> Option<String> {
    let url = reqwest::Url::parse(url).ok()?;
    url.query_pairs()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.to_string())
}

/// Pull the AuthId out of the rendered logged-in page.
pub fn extract_authid(html: &str) -> Option<String> {
    let marker = "id=\"authid\">";
    let start = html.find(marker)? + marker.len();
    let rest = &html[start..];
    let end = rest.find('<')?;
    Some(rest[..end].to_string())
}
