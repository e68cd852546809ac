//! Fetch endpoint scenarios: body shapes, JSONP wrapping and token
//! pre-registration rules.

mod support;

use oauth_hub::server::routes::build_router;
use oauth_hub::test_support;
use serde_json::json;

#[tokio::test]
async fn missing_token_is_reported_in_the_body_not_the_status() {
    let stub = support::spawn_token_endpoint(json!({})).await;
    let router = build_router(test_support::state_without_storage(&stub.url));

    let response = support::get(&router, "/fetch").await;
    assert_eq!(response.status(), 200);
    assert_eq!(
        response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok()),
        Some("application/json")
    );
    assert_eq!(
        support::body_json(response).await,
        json!({"error": "Missing token"})
    );
}

#[tokio::test]
async fn unknown_token_is_no_such_entry() {
    let stub = support::spawn_token_endpoint(json!({})).await;
    let router = build_router(test_support::state_without_storage(&stub.url));

    let response = support::get(&router, "/fetch?token=abcdefghij").await;
    assert_eq!(
        support::body_json(response).await,
        json!({"error": "No such entry"})
    );
}

#[tokio::test]
async fn preregistered_token_waits_until_completion() {
    let stub = support::spawn_token_endpoint(json!({})).await;
    let router = build_router(test_support::state_without_storage(&stub.url));

    support::get(&router, "/?token=abcdefghij").await;

    let response = support::get(&router, "/fetch?token=abcdefghij").await;
    assert_eq!(
        support::body_json(response).await,
        json!({"wait": "Not ready"})
    );
}

#[tokio::test]
async fn too_short_index_tokens_are_not_registered() {
    let stub = support::spawn_token_endpoint(json!({})).await;
    let router = build_router(test_support::state_without_storage(&stub.url));

    // Eight characters: exactly at the limit, still rejected.
    support::get(&router, "/?token=12345678").await;

    let response = support::get(&router, "/fetch?token=12345678").await;
    assert_eq!(
        support::body_json(response).await,
        json!({"error": "No such entry"})
    );
}

#[tokio::test]
async fn jsonp_wraps_the_payload_and_switches_content_type() {
    let stub = support::spawn_token_endpoint(json!({})).await;
    let router = build_router(test_support::state_without_storage(&stub.url));

    for query in [
        "/fetch?token=abcdefghij&callback=cb",
        "/fetch?token=abcdefghij&jsonp=cb",
    ] {
        let response = support::get(&router, query).await;
        assert_eq!(
            response
                .headers()
                .get("content-type")
                .and_then(|v| v.to_str().ok()),
            Some("application/javascript")
        );
        let body = support::body_string(response).await;
        assert!(body.starts_with("cb("));
        assert!(body.ends_with(')'));
        assert!(body.contains("No such entry"));
    }
}
