//! Inbound queue transport.
//!
//! The relay pulls notification requests from a durable queue; this module
//! defines the transport abstraction plus the message type that crosses it.
//! Backends: Redis Streams (persistent, consumer groups) and an in-memory
//! channel used by tests.

mod factory;
mod memory_backend;
mod redis_backend;

pub use factory::create_queue_transport;
pub use memory_backend::MemoryQueueTransport;
pub use redis_backend::RedisQueueTransport;

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;

/// Attribute carrying the destination device token.
pub const ATTR_TOKEN: &str = "to";

/// Attribute carrying the de-duplication (collapse) identifier.
pub const ATTR_IDENTIFIER: &str = "identifier";

/// One unit pulled from the queue.
///
/// Created by the transport on delivery, consumed exactly once by the
/// delivery loop, terminated by positive acknowledgement.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    /// Opaque handle passed back to [`QueueTransport::ack`].
    pub ack_id: String,

    /// Opaque payload bytes (JSON-encoded notification).
    pub data: Vec<u8>,

    /// String attributes; `to` and `identifier` are required for dispatch.
    pub attributes: HashMap<String, String>,

    /// When the message entered the inbound queue.
    pub publish_time: DateTime<Utc>,
}

impl InboundMessage {
    pub fn token(&self) -> Option<&str> {
        self.attributes.get(ATTR_TOKEN).map(String::as_str)
    }

    pub fn identifier(&self) -> Option<&str> {
        self.attributes.get(ATTR_IDENTIFIER).map(String::as_str)
    }
}

/// Pull-based queue transport.
///
/// Implementations must be `Send + Sync`; the transport handle is shared
/// between the delivery loop and the liveness probe for the process
/// lifetime.
#[async_trait]
pub trait QueueTransport: Send + Sync {
    /// Suspend until the next message is available.
    ///
    /// Returns [`RelayError::SubscriptionLost`] when the subscription is
    /// judged unusable — a hard condition that terminates the delivery
    /// loop, not a per-message failure.
    ///
    /// [`RelayError::SubscriptionLost`]: crate::error::RelayError::SubscriptionLost
    async fn pull(&self) -> Result<InboundMessage>;

    /// Positively acknowledge a message. Called exactly once per message,
    /// on every outcome.
    async fn ack(&self, ack_id: &str) -> Result<()>;

    /// Whether the inbound subscription still exists. Backs the liveness
    /// probe used by process orchestration.
    async fn subscription_exists(&self) -> Result<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_accessors() {
        let mut attributes = HashMap::new();
        attributes.insert(ATTR_TOKEN.to_string(), "abc123".to_string());
        attributes.insert(ATTR_IDENTIFIER.to_string(), "msg-1".to_string());

        let message = InboundMessage {
            ack_id: "1-0".to_string(),
            data: b"{}".to_vec(),
            attributes,
            publish_time: Utc::now(),
        };

        assert_eq!(message.token(), Some("abc123"));
        assert_eq!(message.identifier(), Some("msg-1"));
    }

    #[test]
    fn test_missing_attributes() {
        let message = InboundMessage {
            ack_id: "1-0".to_string(),
            data: Vec::new(),
            attributes: HashMap::new(),
            publish_time: Utc::now(),
        };

        assert_eq!(message.token(), None);
        assert_eq!(message.identifier(), None);
    }
}
