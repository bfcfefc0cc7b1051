//! Error taxonomy for the relay pipeline.
//!
//! Errors split into two severities: construction-time and subscription
//! failures are fatal and terminate the process (supervision restarts it),
//! while per-message failures are logged, the message is acknowledged, and
//! the loop moves on.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelayError {
    /// Client credential files missing, unreadable, or malformed.
    /// Fatal at provider construction.
    #[error("certificate error: {0}")]
    Certificate(String),

    /// Network-level failure: HTTP/2 setup at construction (fatal) or a
    /// connection/TLS/timeout failure at send time (per-message).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Payload cannot be serialized or deserialized. Per-message.
    #[error("encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    /// APNs returned a non-200 status. Carries the response body so the
    /// remote rejection reason stays inspectable. Per-message.
    #[error("invalid HTTP response ({status}): {body}")]
    Http { status: u16, body: String },

    /// Queue transport operation failed.
    #[error("queue error: {0}")]
    Queue(#[from] redis::RedisError),

    /// The inbound subscription is gone or unusable. Fatal; recovering a
    /// broken subscription is an operational action outside this process.
    #[error("subscription lost: {0}")]
    SubscriptionLost(String),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

pub type Result<T> = std::result::Result<T, RelayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_error_display() {
        let err = RelayError::Http {
            status: 400,
            body: r#"{"reason":"BadDeviceToken"}"#.to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("400"));
        assert!(msg.contains("BadDeviceToken"));
    }
}
