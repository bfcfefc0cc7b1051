//! Outbound request construction.
//!
//! Builds the transient request value sent to APNs: URL derivation, header
//! set, collapse-id normalization, expiry handling, and the alert/background
//! classification. Pure — no I/O — so every header rule is unit-testable
//! without a network.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use crate::error::Result;
use crate::payload::{self, NotificationPayload};

/// Collapse identifiers longer than this are replaced by their SHA-256 hex
/// digest. APNs rejects `apns-collapse-id` values over 64 bytes.
const MAX_COLLAPSE_ID_LEN: usize = 64;

/// Push delivery class, driven solely by the `content-available` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushType {
    /// User-visible push, immediate delivery.
    Alert,
    /// Silent data update, throttled delivery class.
    Background,
}

impl PushType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PushType::Alert => "alert",
            PushType::Background => "background",
        }
    }

    /// The `apns-priority` value paired with this push type.
    pub fn priority(&self) -> &'static str {
        match self {
            PushType::Alert => "10",
            PushType::Background => "5",
        }
    }
}

/// A fully-formed outbound request. Exists only for the duration of one
/// send; never persisted.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub url: String,
    pub push_type: PushType,
    /// Unix epoch seconds, or `0` for "no re-delivery window".
    pub expiration: i64,
    pub collapse_id: String,
    pub topic: String,
    pub body: Vec<u8>,
}

/// Builds outbound requests for one provider instance.
///
/// The server host and the application bundle id (`apns-topic`) are fixed at
/// construction; everything else varies per call.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    server: String,
    topic: String,
}

impl RequestBuilder {
    pub fn new(server: impl Into<String>, topic: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            topic: topic.into(),
        }
    }

    /// Construct the outbound request for one notification.
    ///
    /// The token is an opaque device handle and is forwarded byte-for-byte.
    /// An unset expiration maps to header value `0`; the caller is
    /// responsible for any delivery-window arithmetic before passing a
    /// timestamp in.
    pub fn build<P: NotificationPayload>(
        &self,
        payload: &P,
        token: &str,
        identifier: &str,
        expiration: Option<DateTime<Utc>>,
    ) -> Result<OutboundRequest> {
        let body = payload::encode(payload)?;

        let push_type = if payload.notification().is_background() {
            PushType::Background
        } else {
            PushType::Alert
        };

        Ok(OutboundRequest {
            url: format!("https://{}/3/device/{}", self.server, token),
            push_type,
            expiration: expiration.map(|t| t.timestamp()).unwrap_or(0),
            collapse_id: normalize_collapse_id(identifier),
            topic: self.topic.clone(),
            body,
        })
    }
}

/// Normalize a de-duplication identifier to fit the collapse-id limit.
///
/// Oversized identifiers are replaced by the lowercase hex SHA-256 digest of
/// their bytes rather than truncated: truncation would silently collide
/// unrelated identifiers, which is unacceptable for a coalescing key.
fn normalize_collapse_id(identifier: &str) -> String {
    if identifier.len() <= MAX_COLLAPSE_ID_LEN {
        identifier.to_string()
    } else {
        hex::encode(Sha256::digest(identifier.as_bytes()))
    }
}
