//! Request pipeline for one inbound HTTP request.
//!
//! # Main Components
//!
//! - [`GatewayEngine`]: validates method, network and body, then drives the stages below
//! - [`RequestProcessor`]: per-call decision (local answer, cache hit, or forward)
//! - [`BatchProcessor`]: runs the processor over every call concurrently
//! - [`UpstreamForwarder`]: one HTTP call to the node for everything that needs it
//! - [`ResponseCombiner`]: restores input order and writes cacheable answers back
//!
//! # Processing Flow
//!
//! ```text
//! POST /{chainId}
//!       │
//!       ▼
//! ┌──────────────┐   not POST / unknown chain / bad body
//! │ GatewayEngine│ ─────────────────────────────────────► 400 / 404 {"message": ...}
//! └──────┬───────┘
//!        ▼
//! ┌──────────────┐
//! │BatchProcessor│ ── per call ──► local │ cached │ forward
//! └──────┬───────┘
//!        ▼
//! ┌─────────────────┐
//! │UpstreamForwarder│  skipped when nothing needs the node
//! └──────┬──────────┘
//!        ▼
//! ┌────────────────┐
//! │ResponseCombiner│ ──► ordered responses (+ -32603 for unanswered ids)
//! └────────────────┘
//! ```

pub mod batch;
pub mod combiner;
pub mod engine;
pub mod errors;
pub mod forwarder;
pub mod processor;

pub use batch::{BatchOutcome, BatchProcessor};
pub use combiner::ResponseCombiner;
pub use engine::{Caller, EngineComponents, GatewayEngine, GatewayReply};
pub use errors::GatewayError;
pub use forwarder::UpstreamForwarder;
pub use processor::{RequestContext, RequestProcessor};
