//! End-to-end behaviour of the gateway pipeline against a mock node.

use crate::mock_infrastructure::{
    addr_lookup, call, eth_call, gateway, gateway_with, resolver_gated_config, RpcMockBuilder,
    ADDR_SELECTOR, CHAIN_ID, PLAIN_ADDRESS, RESOLVER_ADDRESS,
};
use gateway_core::{
    cache::{cache_key, CacheStore},
    types::{CacheStatus, RequestId, RpcReply, INTERNAL_ERROR_CODE},
};
use mockito::Matcher;
use serde_json::json;
use std::time::Duration;

#[tokio::test]
async fn test_chain_id_single_call_is_local() {
    let mut node = RpcMockBuilder::new().await;
    node.expect_no_calls().await;
    let gw = gateway(&node.url(), 100);

    let reply = gw.post(&call(1, "eth_chainId", &json!([]))).await;

    assert_eq!(reply.cache_status, CacheStatus::Full);
    assert_eq!(reply.reply.to_value(), json!({"id": 1, "jsonrpc": "2.0", "result": "0x1"}));
    node.assert_all().await;
}

#[tokio::test]
async fn test_mixed_batch_forwards_only_what_needs_the_node() {
    let mut node = RpcMockBuilder::new().await;
    let forwarded_only = Matcher::AllOf(vec![
        Matcher::Regex(r#""to":"0x123""#.to_string()),
        Matcher::Regex(r"^\{".to_string()),
    ]);
    node.mock_reply(forwarded_only, &json!({"jsonrpc": "2.0", "id": 2, "result": "0xbeef"}), 1)
        .await;
    let gw = gateway(&node.url(), 100);

    let body = json!([
        call(1, "eth_chainId", &json!([])),
        call(2, "eth_call", &json!([{"to": "0x123"}, "latest"]))
    ]);
    let reply = gw.post(&body).await;

    assert_eq!(reply.cache_status, CacheStatus::Partial);
    assert_eq!(
        reply.reply.to_value(),
        json!([
            {"jsonrpc": "2.0", "id": 1, "result": "0x1"},
            {"jsonrpc": "2.0", "id": 2, "result": "0xbeef"}
        ])
    );
    node.assert_all().await;
}

#[tokio::test]
async fn test_repeated_call_is_served_from_cache() {
    let mut node = RpcMockBuilder::new().await;
    node.mock_reply(
        Matcher::Regex("0xfeedface".to_string()),
        &json!({"jsonrpc": "2.0", "id": 1, "result": "0x2a"}),
        1,
    )
    .await;
    let gw = gateway(&node.url(), 100);

    let first = gw.post(&eth_call(1, "0x123")).await;
    let second = gw.post(&eth_call(2, "0x123")).await;

    assert_eq!(first.cache_status, CacheStatus::Miss);
    assert_eq!(second.cache_status, CacheStatus::Full);
    assert_eq!(second.reply.to_value(), json!({"jsonrpc": "2.0", "id": 2, "result": "0x2a"}));
    node.assert_all().await;
}

#[tokio::test]
async fn test_name_lookups_are_cached_when_gated() {
    let mut node = RpcMockBuilder::new().await;
    node.mock_version_calls(RESOLVER_ADDRESS, None, 1).await;
    node.mock_reply(
        Matcher::Regex(ADDR_SELECTOR.to_string()),
        &json!({"jsonrpc": "2.0", "id": 1, "result": "0x00000000000000000000000000000000000000aa"}),
        1,
    )
    .await;
    let gw = gateway_with(resolver_gated_config(&node.url(), 100));

    let first = gw.post(&addr_lookup(1, RESOLVER_ADDRESS)).await;
    let second = gw.post(&addr_lookup(2, RESOLVER_ADDRESS)).await;

    assert_eq!(first.cache_status, CacheStatus::Miss);
    assert_eq!(second.cache_status, CacheStatus::Full);
    assert_eq!(second.reply.responses()[0].id, Some(RequestId::Number(2)));
    node.assert_all().await;
}

#[tokio::test]
async fn test_other_eth_calls_are_always_forwarded_when_gated() {
    let mut node = RpcMockBuilder::new().await;
    node.mock_version_calls(PLAIN_ADDRESS, None, 1).await;
    node.mock_reply(
        Matcher::Regex("0xfeedface".to_string()),
        &json!({"jsonrpc": "2.0", "id": 1, "result": "0x2a"}),
        2,
    )
    .await;
    // Resolver selector sent to a contract that is not a resolver.
    node.mock_reply(
        Matcher::Regex(ADDR_SELECTOR.to_string()),
        &json!({"jsonrpc": "2.0", "id": 1, "result": "0x00"}),
        2,
    )
    .await;
    let gw = gateway_with(resolver_gated_config(&node.url(), 100));

    for id in 1..=2 {
        let reply = gw.post(&eth_call(id, PLAIN_ADDRESS)).await;
        assert_eq!(reply.cache_status, CacheStatus::Miss);
        let reply = gw.post(&addr_lookup(id, PLAIN_ADDRESS)).await;
        assert_eq!(reply.cache_status, CacheStatus::Miss);
    }

    let params = [json!({"to": PLAIN_ADDRESS, "data": "0xfeedface"}), json!("latest")];
    let key = cache_key(CHAIN_ID, "eth_call", &params);
    assert_eq!(gw.store.get(&key).await.unwrap(), None);
    node.assert_all().await;
}

#[tokio::test]
async fn test_large_batch_makes_exactly_one_upstream_call() {
    let mut node = RpcMockBuilder::new().await;
    let answers: Vec<_> =
        (1..=20).rev().map(|id| json!({"jsonrpc": "2.0", "id": id, "result": "0x1"})).collect();
    node.mock_reply(Matcher::Any, &json!(answers), 1).await;
    let gw = gateway(&node.url(), 1000);

    let body: Vec<_> = (1..=20).map(|id| call(id, "eth_blockNumber", &json!([]))).collect();
    let reply = gw.post(&json!(body)).await;

    let ids: Vec<_> = reply.reply.responses().iter().filter_map(|r| r.id.clone()).collect();
    let expected: Vec<_> = (1..=20).map(RequestId::Number).collect();
    assert_eq!(ids, expected);
    node.assert_all().await;
}

#[tokio::test]
async fn test_missing_upstream_answer_becomes_internal_error() {
    let mut node = RpcMockBuilder::new().await;
    node.mock_reply(
        Matcher::Any,
        &json!([{"jsonrpc": "2.0", "id": 1, "result": "0x10"}]),
        1,
    )
    .await;
    let gw = gateway(&node.url(), 100);

    let body = json!([call(1, "eth_blockNumber", &json!([])), call(2, "eth_gasPrice", &json!([]))]);
    let reply = gw.post(&body).await;

    assert_eq!(
        reply.reply.to_value()[1],
        json!({"jsonrpc": "2.0", "id": 2, "error": {"code": -32603, "message": "Internal error"}})
    );
    node.assert_all().await;
}

#[tokio::test]
async fn test_upstream_outage_degrades_per_call() {
    let mut node = RpcMockBuilder::new().await;
    node.mock_http_error(502, 1).await;
    let gw = gateway(&node.url(), 100);

    let body = json!([
        call(1, "eth_chainId", &json!([])),
        call(2, "eth_blockNumber", &json!([])),
        call(3, "eth_gasPrice", &json!([]))
    ]);
    let reply = gw.post(&body).await;

    let responses = reply.reply.responses();
    assert_eq!(responses[0].result, Some(json!("0x1")));
    for response in &responses[1..] {
        assert_eq!(response.error.as_ref().map(|e| e.code), Some(INTERNAL_ERROR_CODE));
    }
    node.assert_all().await;
}

#[tokio::test]
async fn test_node_error_in_error_status_reaches_the_caller() {
    let mut node = RpcMockBuilder::new().await;
    let quota = json!({"code": -32005, "message": "daily request limit reached"});
    node.mock_http_error_reply(
        429,
        &json!([
            {"jsonrpc": "2.0", "id": 2, "error": quota},
            {"jsonrpc": "2.0", "id": 3, "error": quota}
        ]),
        1,
    )
    .await;
    let gw = gateway(&node.url(), 100);

    let body = json!([
        call(1, "eth_chainId", &json!([])),
        call(2, "eth_blockNumber", &json!([])),
        call(3, "eth_gasPrice", &json!([]))
    ]);
    let reply = gw.post(&body).await;

    let responses = reply.reply.responses();
    assert_eq!(responses[0].result, Some(json!("0x1")));
    for response in &responses[1..] {
        let error = response.error.as_ref().unwrap();
        assert_eq!(error.code, -32005);
        assert_eq!(error.message, "daily request limit reached");
    }
    node.assert_all().await;
}

#[tokio::test]
async fn test_single_body_gets_single_reply_even_on_error() {
    let mut node = RpcMockBuilder::new().await;
    node.mock_http_error(500, 1).await;
    let gw = gateway(&node.url(), 100);

    let reply = gw.post(&call(7, "eth_blockNumber", &json!([]))).await;

    assert!(matches!(reply.reply, RpcReply::Single(_)));
    assert_eq!(reply.reply.to_value()["error"]["code"], json!(-32603));
}

#[tokio::test]
async fn test_corrupted_entry_is_purged_and_refetched() {
    let mut node = RpcMockBuilder::new().await;
    node.mock_reply(
        Matcher::Regex("0xfeedface".to_string()),
        &json!({"jsonrpc": "2.0", "id": 1, "result": "0x2a"}),
        1,
    )
    .await;
    let gw = gateway(&node.url(), 100);

    let params = [json!({"to": "0x123", "data": "0xfeedface"}), json!("latest")];
    let key = cache_key(CHAIN_ID, "eth_call", &params);
    gw.store.put(&key, "{broken".to_string(), Duration::from_secs(60)).await.unwrap();

    let reply = gw.post(&eth_call(1, "0x123")).await;

    assert_eq!(reply.cache_status, CacheStatus::Miss);
    assert_eq!(reply.reply.responses()[0].result, Some(json!("0x2a")));
    let healed = gw.store.get(&key).await.unwrap().unwrap();
    assert!(healed.contains("0x2a"));
    node.assert_all().await;
}

#[tokio::test]
async fn test_corrupted_entry_stays_purged_when_node_fails() {
    let mut node = RpcMockBuilder::new().await;
    node.mock_http_error(503, 1).await;
    let gw = gateway(&node.url(), 100);

    let params = [json!({"to": "0x123", "data": "0xfeedface"}), json!("latest")];
    let key = cache_key(CHAIN_ID, "eth_call", &params);
    gw.store.put(&key, "[1,2,3]".to_string(), Duration::from_secs(60)).await.unwrap();

    gw.post(&eth_call(1, "0x123")).await;

    assert_eq!(gw.store.get(&key).await.unwrap(), None);
}

#[tokio::test]
async fn test_errors_and_volatile_methods_are_not_cached() {
    let mut node = RpcMockBuilder::new().await;
    node.mock_reply(
        Matcher::Regex("0xfeedface".to_string()),
        &json!({"jsonrpc": "2.0", "id": 1, "error": {"code": 3, "message": "execution reverted"}}),
        2,
    )
    .await;
    node.mock_method("eth_blockNumber", 1, &json!("0x10"), 2).await;
    let gw = gateway(&node.url(), 100);

    for _ in 0..2 {
        let reverted = gw.post(&eth_call(1, "0x123")).await;
        assert_eq!(reverted.reply.to_value()["error"]["code"], json!(3));

        let head = gw.post(&call(1, "eth_blockNumber", &json!([]))).await;
        assert_eq!(head.cache_status, CacheStatus::Miss);
    }
    node.assert_all().await;
}
