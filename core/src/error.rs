//! Error types for the ssh.cx client.
//!
//! # Design
//! `MissingCredential` is raised while building a request, so it always means
//! no network traffic happened. `Remote` carries the server's payload
//! untouched; the client does not interpret service-specific error codes.
//! An empty response body is not an error at all (see `Reply::NoContent`).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// No usable token is held. Raised before any I/O.
    #[error("no API token configured")]
    MissingCredential,

    /// Connection, TLS or timeout failure while talking to the service.
    #[error("transport failed: {0}")]
    Transport(String),

    /// The response had a body that is not valid JSON.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The service answered with an error payload or a non-2xx status.
    #[error("remote error (HTTP {status}): {payload}")]
    Remote {
        status: u16,
        payload: serde_json::Value,
    },

    /// Request parameters could not be encoded.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// A local file could not be read for upload.
    #[error("I/O error: {0}")]
    Io(String),

    /// Invalid client configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl From<std::io::Error> for ApiError {
    fn from(e: std::io::Error) -> Self {
        ApiError::Io(e.to_string())
    }
}
