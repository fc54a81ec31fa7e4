// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
mod common;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use common::record;
use parley_kernel::digest;
use parley_node::chain::LocalLedger;
use parley_node::server::{build_router, AppState};
use serde_json::{json, Value};
use tower::ServiceExt;

fn router(ledger: &Arc<LocalLedger>, token: Option<&str>) -> Router {
    build_router(AppState::new(ledger.clone(), 4), token.map(str::to_string))
}

async fn call(app: Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value, sender: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(sender) = sender {
        builder = builder.header("x-ledger-sender", sender);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

#[tokio::test]
async fn test_count_and_entries() {
    let ledger = Arc::new(LocalLedger::new(16));
    record(&ledger, "alice", "q", "a").await;

    let (status, body) = call(router(&ledger, None), get("/v1/logs/alice/count")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"owner": "alice", "count": 1}));

    let (status, body) = call(router(&ledger, None), get("/v1/logs/alice/entries/0")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["entry"]["prompt_digest"], json!(digest("q").to_hex()));
    assert_eq!(body["entry"]["recorded_at"], json!(1));

    let (status, body) = call(router(&ledger, None), get("/v1/logs/alice/entries/1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"entry": null}));
}

#[tokio::test]
async fn test_invalid_owner_is_bad_request() {
    let ledger = Arc::new(LocalLedger::new(16));
    let (status, body) = call(router(&ledger, None), get("/v1/logs/a%20b/count")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("invalid_input"));
}

#[tokio::test]
async fn test_append_then_include() {
    let ledger = Arc::new(LocalLedger::new(16));
    let body = json!({
        "prompt_digest": digest("hello").to_hex(),
        "response_digest": digest("world").to_hex(),
    });

    let (status, accepted) = call(
        router(&ledger, None),
        post_json("/v1/logs/alice/append", body, Some("alice")),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let tx_id = accepted["tx_id"].as_str().unwrap().to_string();

    let (_, pending) = call(router(&ledger, None), get(&format!("/v1/tx/{tx_id}"))).await;
    assert_eq!(pending["status"], json!("pending"));

    ledger.produce_block().await.unwrap();

    let (status, included) = call(router(&ledger, None), get(&format!("/v1/tx/{tx_id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(included["status"], json!("included"));
    assert_eq!(included["index"], json!(0));
    assert_eq!(included["height"], json!(1));

    let (_, history) = call(router(&ledger, None), get("/v1/logs/alice")).await;
    assert_eq!(history["entries"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_append_rules() {
    let ledger = Arc::new(LocalLedger::new(16));
    let body = json!({
        "prompt_digest": digest("hello").to_hex(),
        "response_digest": digest("world").to_hex(),
    });

    let (status, err) = call(
        router(&ledger, None),
        post_json("/v1/logs/alice/append", body.clone(), Some("mallory")),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(err["error"], json!("unauthorized"));

    let (status, err) = call(
        router(&ledger, None),
        post_json("/v1/logs/alice/append", body, None),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(err["error"], json!("unauthenticated"));

    let bad = json!({"prompt_digest": "ABCD", "response_digest": digest("x").to_hex()});
    let (status, _) = call(
        router(&ledger, None),
        post_json("/v1/logs/alice/append", bad, Some("alice")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_tx_is_not_found() {
    let ledger = Arc::new(LocalLedger::new(16));
    let (status, body) = call(router(&ledger, None), get(&format!("/v1/tx/{}", "0".repeat(64)))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], json!("unknown_tx"));
}

#[tokio::test]
async fn test_verify_endpoint() {
    let ledger = Arc::new(LocalLedger::new(16));
    record(&ledger, "alice", "q", "a").await;

    let (status, body) = call(
        router(&ledger, None),
        post_json("/v1/verify", json!({"owner": "alice", "prompt": "q", "response": "a"}), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["recorded"], json!(true));
    assert_eq!(body["entry"]["index"], json!(0));

    let (_, body) = call(
        router(&ledger, None),
        post_json("/v1/verify", json!({"owner": "alice", "prompt": "q", "response": "b"}), None),
    )
    .await;
    assert_eq!(body, json!({"recorded": false, "entry": null}));

    let (status, body) = call(
        router(&ledger, None),
        post_json("/v1/verify", json!({"owner": null, "prompt": "q", "response": "a"}), None),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], json!("unauthenticated"));
}

#[tokio::test]
async fn test_proofs_and_height() {
    let ledger = Arc::new(LocalLedger::new(16));
    record(&ledger, "alice", "q", "a").await;
    record(&ledger, "bob", "q", "a").await;

    let (_, height) = call(router(&ledger, None), get("/v1/chain/height")).await;
    assert_eq!(height, json!({"height": 2}));

    let (status, proof) = call(router(&ledger, None), get("/v1/proof/alice")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(proof["owner"], json!("alice"));
    assert_eq!(proof["entry_count"], json!(1));

    let (status, proof) = call(router(&ledger, None), get("/v1/proof/state")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(proof["ledger"]["owner_count"], json!(2));
    assert_eq!(proof["ledger"]["total_entries"], json!(2));
}

#[tokio::test]
async fn test_auth_guard() {
    let ledger = Arc::new(LocalLedger::new(16));

    let (status, _) = call(router(&ledger, Some("s3cret")), get("/v1/chain/height")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let req = Request::builder()
        .uri("/v1/chain/height")
        .header("authorization", "Bearer s3cret")
        .body(Body::empty())
        .unwrap();
    let (status, _) = call(router(&ledger, Some("s3cret")), req).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_bearer_token_does_not_bind_sender() {
    let ledger = Arc::new(LocalLedger::new(16));
    let body = json!({
        "prompt_digest": digest("hello").to_hex(),
        "response_digest": digest("world").to_hex(),
    });

    // One shared token; the sender header alone decides the caller.
    for sender in ["alice", "bob"] {
        let mut req = post_json(&format!("/v1/logs/{sender}/append"), body.clone(), Some(sender));
        req.headers_mut()
            .insert("authorization", "Bearer s3cret".parse().unwrap());
        let (status, _) = call(router(&ledger, Some("s3cret")), req).await;
        assert_eq!(status, StatusCode::ACCEPTED);
    }

    let (status, _) = call(
        router(&ledger, Some("s3cret")),
        post_json("/v1/logs/alice/append", body, Some("alice")),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(ledger.pending_count().await, 2);
}
