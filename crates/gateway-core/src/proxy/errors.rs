use crate::types::BodyError;

/// Request-level failures. Each maps to a 4xx reply with a `{"message": ...}` body;
/// per-call failures never surface here and are answered as JSON-RPC error objects instead.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Method {0} not supported")]
    MethodNotSupported(String),

    #[error("Unsupported network ID: {0}")]
    UnsupportedNetwork(String),

    #[error("{0}")]
    InvalidBody(#[from] BodyError),
}

impl GatewayError {
    /// HTTP status code for the reply.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::MethodNotSupported(_) | Self::InvalidBody(_) => 400,
            Self::UnsupportedNetwork(_) => 404,
        }
    }

    /// JSON body for the reply.
    #[must_use]
    pub fn to_body(&self) -> serde_json::Value {
        serde_json::json!({ "message": self.to_string() })
    }
}
