//! Error types for the RPC client.

use thiserror::Error;

/// Everything that can go wrong talking to a wiki.
#[derive(Debug, Error)]
pub enum RpcError {
    /// The configured base URL is not usable.
    #[error("invalid base url: {0}")]
    InvalidUrl(String),

    /// The request could not be assembled.
    #[error("could not assemble request: {0}")]
    InvalidRequest(String),

    /// The request timed out.
    #[error("request timed out")]
    Timeout,

    /// The connection failed before a response arrived.
    #[error("connection failed: {0}")]
    Connection(String),

    /// Any other transport-level failure.
    #[error("transport error: {0}")]
    Transport(#[source] Box<ureq::Error>),

    /// The server answered outside the 2xx range.
    #[error("server returned http {status}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, for diagnostics.
        body: String,
    },

    /// The server answered with a JSON-RPC error object.
    #[error("rpc fault {code}: {message}")]
    Rpc {
        /// Wiki-defined fault code.
        code: i64,
        /// Human-readable fault message.
        message: String,
    },

    /// The response carried neither a result nor an error.
    #[error("rpc response carried neither result nor error")]
    EmptyResponse,

    /// The response body was not the JSON we expected.
    #[error("json decode error: {0}")]
    Json(#[from] serde_json::Error),

    /// A media payload was not valid base64.
    #[error("media payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
}

impl RpcError {
    /// True for transport hiccups worth retrying at a higher layer.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout | Self::Connection(_))
    }
}
