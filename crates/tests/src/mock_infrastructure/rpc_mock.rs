//! Mock upstream node for JSON-RPC gateway tests.
//!
//! Wraps mockito; every helper registers a mock with an exact hit expectation so that
//! [`RpcMockBuilder::assert_all`] proves how many upstream requests the gateway made.

use mockito::{Matcher, Mock, Server, ServerGuard};
use serde_json::{json, Value};

use gateway_core::classifier::inspector::{PUBLIC_LOCK_VERSION_SELECTOR, UNLOCK_VERSION_SELECTOR};

pub struct RpcMockBuilder {
    server: ServerGuard,
    mocks: Vec<Mock>,
}

fn method_matcher(method: &str) -> Matcher {
    Matcher::Regex(format!(r#""method"\s*:\s*"{method}""#))
}

impl RpcMockBuilder {
    pub async fn new() -> Self {
        Self { server: Server::new_async().await, mocks: Vec::new() }
    }

    #[must_use]
    pub fn url(&self) -> String {
        self.server.url()
    }

    /// Replies with `reply` (an object or an array) to requests matching `matcher`.
    pub async fn mock_reply(&mut self, matcher: Matcher, reply: &Value, hits: usize) -> &mut Self {
        let mock = self
            .server
            .mock("POST", "/")
            .match_body(matcher)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(reply.to_string())
            .expect(hits)
            .create_async()
            .await;

        self.mocks.push(mock);
        self
    }

    /// Replies to a single forwarded call of `method` with `result` under `id`.
    pub async fn mock_method(
        &mut self,
        method: &str,
        id: u64,
        result: &Value,
        hits: usize,
    ) -> &mut Self {
        let reply = json!({"jsonrpc": "2.0", "id": id, "result": result});
        self.mock_reply(method_matcher(method), &reply, hits).await
    }

    /// Answers the classifier's version calls for `address`. When `version` is `None` both
    /// calls revert, making the contract a non-protocol contract.
    pub async fn mock_version_calls(
        &mut self,
        address: &str,
        version: Option<u64>,
        hits: usize,
    ) -> &mut Self {
        let reply = match version {
            Some(v) => json!([
                {"jsonrpc": "2.0", "id": 1, "result": format!("0x{v:064x}")},
                {"jsonrpc": "2.0", "id": 2, "error": {"code": 3, "message": "execution reverted"}}
            ]),
            None => json!([
                {"jsonrpc": "2.0", "id": 1, "error": {"code": 3, "message": "execution reverted"}},
                {"jsonrpc": "2.0", "id": 2, "error": {"code": 3, "message": "execution reverted"}}
            ]),
        };

        let matcher = Matcher::AllOf(vec![
            Matcher::Regex(PUBLIC_LOCK_VERSION_SELECTOR.to_string()),
            Matcher::Regex(UNLOCK_VERSION_SELECTOR.to_string()),
            Matcher::Regex(address.to_string()),
        ]);
        self.mock_reply(matcher, &reply, hits).await
    }

    /// Responds with an HTTP error status to every request.
    pub async fn mock_http_error(&mut self, status: usize, hits: usize) -> &mut Self {
        let mock = self
            .server
            .mock("POST", "/")
            .with_status(status)
            .with_body("upstream unavailable")
            .expect(hits)
            .create_async()
            .await;

        self.mocks.push(mock);
        self
    }

    /// Responds with an HTTP error status whose body is a JSON-RPC `reply`, the way hosted
    /// nodes report quota and rate-limit errors.
    pub async fn mock_http_error_reply(
        &mut self,
        status: usize,
        reply: &Value,
        hits: usize,
    ) -> &mut Self {
        let mock = self
            .server
            .mock("POST", "/")
            .with_status(status)
            .with_header("content-type", "application/json")
            .with_body(reply.to_string())
            .expect(hits)
            .create_async()
            .await;

        self.mocks.push(mock);
        self
    }

    /// Fails the test in [`Self::assert_all`] if any request reaches the node.
    pub async fn expect_no_calls(&mut self) -> &mut Self {
        let mock = self.server.mock("POST", Matcher::Any).expect(0).create_async().await;
        self.mocks.push(mock);
        self
    }

    /// Checks every registered hit expectation.
    pub async fn assert_all(&self) {
        for mock in &self.mocks {
            mock.assert_async().await;
        }
    }
}
