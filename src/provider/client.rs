//! Mutually-authenticated HTTP/2 client for the APNs endpoint.
//!
//! The client is constructed once per process: certificate parsing and TLS
//! setup are amortized over the process lifetime, and the underlying
//! connection pool is safe for concurrent reuse.

use std::time::Duration;

use reqwest::header::{HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Identity, StatusCode};

use crate::error::{RelayError, Result};

use super::request::OutboundRequest;

/// The one-and-only success status defined by the APNs contract. Other 2xx
/// values are treated as failures.
const APNS_SUCCESS: StatusCode = StatusCode::OK;

/// Response from a successful APNs round trip.
#[derive(Debug, Clone)]
pub struct ApnsResponse {
    pub status: u16,
    pub body: String,
}

/// HTTP/2 client holding the mutual-TLS transport toward APNs.
pub struct ApnsClient {
    client: Client,
}

impl ApnsClient {
    /// Build the client from a PEM certificate/key pair.
    ///
    /// Fails with [`RelayError::Certificate`] if either file is unreadable
    /// or the identity is malformed, and with [`RelayError::Transport`] if
    /// the HTTP/2-only transport cannot be configured. APNs requires
    /// multiplexed HTTP/2; falling back to HTTP/1.1 is not supported.
    pub fn new(cert_path: &str, key_path: &str, timeout: Duration) -> Result<Self> {
        let identity = load_identity(cert_path, key_path)?;

        let client = Client::builder()
            .identity(identity)
            .http2_prior_knowledge()
            .timeout(timeout)
            .build()
            .map_err(RelayError::Transport)?;

        Ok(Self { client })
    }

    /// Perform the outbound call and classify the result.
    ///
    /// Network-level failures come back as [`RelayError::Transport`]; a
    /// round trip with any status other than 200 becomes
    /// [`RelayError::Http`] carrying the status and full body.
    pub async fn send(&self, request: OutboundRequest) -> Result<ApnsResponse> {
        let response = self
            .client
            .post(&request.url)
            .header(
                CONTENT_TYPE,
                HeaderValue::from_static("application/json; charset=utf-8"),
            )
            .header("apns-push-type", request.push_type.as_str())
            .header("apns-priority", request.push_type.priority())
            .header("apns-expiration", request.expiration.to_string())
            .header("apns-collapse-id", &request.collapse_id)
            .header("apns-topic", &request.topic)
            .body(request.body)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        classify_status(status, body)
    }
}

/// Map a completed round trip to an outcome. Exactly 200 is success; any
/// other status — other 2xx values included — is a delivery failure
/// carrying the response for inspection.
fn classify_status(status: StatusCode, body: String) -> Result<ApnsResponse> {
    if status != APNS_SUCCESS {
        return Err(RelayError::Http {
            status: status.as_u16(),
            body,
        });
    }

    Ok(ApnsResponse {
        status: status.as_u16(),
        body,
    })
}

/// Load the client identity from separate certificate and key PEM files.
fn load_identity(cert_path: &str, key_path: &str) -> Result<Identity> {
    let cert = std::fs::read(cert_path)
        .map_err(|e| RelayError::Certificate(format!("reading {}: {}", cert_path, e)))?;
    let key = std::fs::read(key_path)
        .map_err(|e| RelayError::Certificate(format!("reading {}: {}", key_path, e)))?;

    // rustls wants certificate and key in a single PEM bundle.
    let mut pem = cert;
    pem.push(b'\n');
    pem.extend_from_slice(&key);

    Identity::from_pem(&pem)
        .map_err(|e| RelayError::Certificate(format!("parsing client identity: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_200_is_success() {
        let response = classify_status(StatusCode::OK, String::new()).unwrap();
        assert_eq!(response.status, 200);
    }

    #[test]
    fn test_other_2xx_is_failure() {
        for status in [StatusCode::ACCEPTED, StatusCode::NO_CONTENT] {
            match classify_status(status, String::new()) {
                Err(RelayError::Http { status: code, .. }) => {
                    assert_eq!(code, status.as_u16());
                }
                other => panic!("expected HTTP error for {}, got {:?}", status, other.err()),
            }
        }
    }

    #[test]
    fn test_rejection_carries_status_and_body() {
        let body = r#"{"reason":"BadDeviceToken"}"#.to_string();
        match classify_status(StatusCode::BAD_REQUEST, body.clone()) {
            Err(RelayError::Http { status, body: got }) => {
                assert_eq!(status, 400);
                assert_eq!(got, body);
            }
            other => panic!("expected HTTP error, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_missing_certificate_is_certificate_error() {
        let result = ApnsClient::new(
            "/nonexistent/cert.pem",
            "/nonexistent/key.pem",
            Duration::from_secs(5),
        );
        match result {
            Err(RelayError::Certificate(msg)) => assert!(msg.contains("cert.pem")),
            other => panic!("expected certificate error, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_malformed_pem_is_certificate_error() {
        let dir = std::env::temp_dir();
        let cert_path = dir.join("apns-relay-test-cert.pem");
        let key_path = dir.join("apns-relay-test-key.pem");
        std::fs::write(&cert_path, "not a certificate").unwrap();
        std::fs::write(&key_path, "not a key").unwrap();

        let result = ApnsClient::new(
            cert_path.to_str().unwrap(),
            key_path.to_str().unwrap(),
            Duration::from_secs(5),
        );
        assert!(matches!(result, Err(RelayError::Certificate(_))));

        let _ = std::fs::remove_file(cert_path);
        let _ = std::fs::remove_file(key_path);
    }
}
