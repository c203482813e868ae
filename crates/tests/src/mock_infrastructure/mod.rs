//! Mock infrastructure for gateway tests.
//!
//! - `RpcMockBuilder`: mockito-backed upstream node with hit expectations
//! - Test helpers: gateway fixtures and JSON-RPC call builders
//!
//! ```ignore
//! use tests::mock_infrastructure::{gateway, call, RpcMockBuilder};
//!
//! let mut node = RpcMockBuilder::new().await;
//! node.mock_method("eth_blockNumber", 1, &json!("0x10"), 1).await;
//! let reply = gateway(&node.url(), 100).post(&call(1, "eth_blockNumber", &json!([]))).await;
//! node.assert_all().await;
//! ```

pub mod rpc_mock;
pub mod test_helpers;

pub use rpc_mock::RpcMockBuilder;
pub use test_helpers::*;
