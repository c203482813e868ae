//! Key/value storage and the JSON-RPC response cache built on it.
//!
//! - [`CacheStore`]: async store abstraction with per-entry TTL, shared by the response cache
//!   and the contract classifier.
//! - [`MemoryStore`]: bounded in-process implementation.
//! - [`ResponseCache`]: allow-listed, self-healing response cache keyed by [`cache_key`].
//! - [`NameResolverGate`]: narrows `eth_call` caching to name-resolution reads.

pub mod key;
pub mod resolver;
pub mod response_cache;
pub mod store;

pub use key::{cache_key, RESPONSE_KEY_PREFIX};
pub use resolver::NameResolverGate;
pub use response_cache::ResponseCache;
pub use store::{CacheStore, CacheStoreError, MemoryStore};
