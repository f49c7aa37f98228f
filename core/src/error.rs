//! Error types for the Knocker client.
//!
//! # Design
//! Each stage of a knock fails with its own variant, so callers can tell a
//! request that never reached the server (`Transport`) from one that did but
//! came back with a payload of the wrong shape (`Decode`). A non-2xx status is
//! not an error at all; it is returned as an ordinary `HttpResponse`.

use crate::http::HttpResponse;

/// Errors returned by `Knocker` operations.
#[derive(Debug, thiserror::Error)]
pub enum KnockError {
    /// The method, URL, or a header value could not form a valid request.
    #[error("invalid request: {0}")]
    InvalidRequest(#[from] ureq::http::Error),

    /// The request payload could not be serialized to JSON.
    #[error("failed to encode request body: {0}")]
    Encode(#[source] serde_json::Error),

    /// Connection, DNS, or protocol failure before a response arrived.
    #[error("transport error: {0}")]
    Transport(#[source] ureq::Error),

    /// The response started but its body could not be read to the end.
    #[error("failed to read response body: {0}")]
    BodyRead(#[source] ureq::Error),

    /// The exchange completed but the body did not decode into the target
    /// type. The undecoded response is kept for inspection.
    #[error("failed to decode response body (status {}): {source}", .response.status)]
    Decode {
        response: Box<HttpResponse>,
        #[source]
        source: serde_json::Error,
    },
}

impl KnockError {
    /// The response that was received before the failure, if any.
    pub fn response(&self) -> Option<&HttpResponse> {
        match self {
            KnockError::Decode { response, .. } => Some(response.as_ref()),
            _ => None,
        }
    }

    /// True when no response was received from the server.
    pub fn is_transport(&self) -> bool {
        matches!(self, KnockError::Transport(_))
    }
}

/// Result alias for `Knocker` operations.
pub type KnockResult<T> = Result<T, KnockError>;
