//! The HTTP contract exercised through the axum application.

use crate::mock_infrastructure::{call, gateway, RpcMockBuilder};
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    response::Response,
};
use mockito::Matcher;
use serde_json::{json, Value};
use tower::ServiceExt;

fn request(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .header("cf-connecting-ip", "192.0.2.10")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_chain_id_over_http() {
    let mut node = RpcMockBuilder::new().await;
    node.expect_no_calls().await;
    let app = gateway(&node.url(), 100).app();

    let body = json!({"id": 1, "jsonrpc": "2.0", "method": "eth_chainId", "params": []});
    let response = app.oneshot(request("POST", "/1", &body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-cache-status"], "FULL");
    assert!(response.headers().contains_key("x-request-id"));
    assert_eq!(json_body(response).await, json!({"id": 1, "jsonrpc": "2.0", "result": "0x1"}));
    node.assert_all().await;
}

#[tokio::test]
async fn test_non_numeric_network_is_unsupported() {
    let app = gateway("http://127.0.0.1:1", 100).app();

    let response = app.oneshot(request("POST", "/invalid", &json!({}))).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let message = json_body(response).await["message"].as_str().unwrap().to_string();
    assert!(message.contains("Unsupported network ID"));
}

#[tokio::test]
async fn test_get_is_not_supported() {
    let app = gateway("http://127.0.0.1:1", 100).app();

    let response = app
        .oneshot(Request::builder().method("GET").uri("/1").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let message = json_body(response).await["message"].as_str().unwrap().to_string();
    assert!(message.contains("Method GET not supported"));
}

#[tokio::test]
async fn test_method_is_checked_before_network() {
    let app = gateway("http://127.0.0.1:1", 100).app();

    let response = app.oneshot(request("PUT", "/424242", &json!({}))).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await, json!({"message": "Method PUT not supported"}));
}

#[tokio::test]
async fn test_malformed_bodies() {
    let gw = gateway("http://127.0.0.1:1", 100);

    let bodies = [
        json!([]),
        json!("eth_chainId"),
        json!([{"jsonrpc": "1.0", "id": 1, "method": "eth_blockNumber"}]),
    ];
    for body in bodies {
        let response = gw.app().oneshot(request("POST", "/1", &body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body {body} was accepted");
        assert!(json_body(response).await["message"].is_string());
    }
}

#[tokio::test]
async fn test_partial_batch_reports_partial() {
    let mut node = RpcMockBuilder::new().await;
    node.mock_reply(
        Matcher::Any,
        &json!({"jsonrpc": "2.0", "id": "b", "result": "0x5"}),
        1,
    )
    .await;
    let app = gateway(&node.url(), 100).app();

    let body = json!([
        {"jsonrpc": "2.0", "id": "a", "method": "eth_chainId"},
        {"jsonrpc": "2.0", "id": "b", "method": "eth_gasPrice", "params": []}
    ]);
    let response = app.oneshot(request("POST", "/1", &body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-cache-status"], "PARTIAL");
    assert_eq!(
        json_body(response).await,
        json!([
            {"jsonrpc": "2.0", "id": "a", "result": "0x1"},
            {"jsonrpc": "2.0", "id": "b", "result": "0x5"}
        ])
    );
    node.assert_all().await;
}

#[tokio::test]
async fn test_upstream_down_is_still_200() {
    let mut node = RpcMockBuilder::new().await;
    node.mock_http_error(503, 1).await;
    let app = gateway(&node.url(), 100).app();

    let response =
        app.oneshot(request("POST", "/1", &call(3, "eth_blockNumber", &json!([])))).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-cache-status"], "MISS");
    assert_eq!(json_body(response).await["error"]["code"], json!(-32603));
    node.assert_all().await;
}
