//! Error types for the waste reporting API client.
//!
//! # Design
//! Every operation either returns a fully normalized value or one of these
//! variants. Nothing is recovered inside the client: retries, alerts and
//! fallbacks belong to the caller. Variants that follow an HTTP exchange
//! carry the status code so callers can branch on it without re-parsing.

use std::time::Duration;

use thiserror::Error;

/// Errors returned by `RemoteServiceClient` operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The transport succeeded but the body is not JSON-shaped text.
    #[error("malformed response (HTTP {status}): {body}")]
    MalformedResponse { status: u16, body: String },

    /// The server answered with a status outside 200..=299.
    #[error("{message}")]
    Api { status: u16, message: String },

    /// The analysis request did not settle before its deadline.
    #[error("request timed out after {}s", .0.as_secs_f64())]
    Timeout(Duration),

    /// A precondition failed before any network activity.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The transport itself failed (DNS, refused connection, offline) or a
    /// local image file could not be read.
    #[error("network error: {0}")]
    Network(String),

    /// A request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),
}

impl ClientError {
    /// HTTP status of the exchange that produced this error, when one exists.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::MalformedResponse { status, .. } | ClientError::Api { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }

    /// Human-readable message suitable for surfacing to a user.
    pub fn message(&self) -> String {
        match self {
            ClientError::Api { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

/// Errors raised by persistent token stores.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("token store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("token store is corrupt: {0}")]
    Format(#[from] serde_json::Error),
}

/// Errors raised while reading `ClientConfig` overrides.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} has invalid value {value:?}")]
    Invalid { name: String, value: String },
}
