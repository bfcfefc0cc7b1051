//! In-memory queue transport.
//!
//! Channel-backed transport used by tests and local development. Messages
//! do not survive a restart; acknowledged ids are recorded so tests can
//! assert the ack-exactly-once contract.

use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::mpsc::{self, UnboundedSender};

use crate::error::{RelayError, Result};

use super::{InboundMessage, QueueTransport};

/// Queue transport backed by an in-process channel.
pub struct MemoryQueueTransport {
    tx: Mutex<Option<UnboundedSender<InboundMessage>>>,
    rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<InboundMessage>>,
    acked: Mutex<Vec<String>>,
}

impl MemoryQueueTransport {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx: Mutex::new(Some(tx)),
            rx: tokio::sync::Mutex::new(rx),
            acked: Mutex::new(Vec::new()),
        }
    }

    /// Handle for publishing messages into the transport.
    pub fn sender(&self) -> Option<UnboundedSender<InboundMessage>> {
        self.tx.lock().unwrap().clone()
    }

    /// Drop the internal sender. Once every external sender is gone too,
    /// the next `pull` reports the subscription as lost.
    pub fn close(&self) {
        self.tx.lock().unwrap().take();
    }

    /// Acknowledged message ids, in acknowledgement order.
    pub fn acked_ids(&self) -> Vec<String> {
        self.acked.lock().unwrap().clone()
    }
}

impl Default for MemoryQueueTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QueueTransport for MemoryQueueTransport {
    async fn pull(&self) -> Result<InboundMessage> {
        let mut rx = self.rx.lock().await;
        rx.recv()
            .await
            .ok_or_else(|| RelayError::SubscriptionLost("inbound channel closed".to_string()))
    }

    async fn ack(&self, ack_id: &str) -> Result<()> {
        self.acked.lock().unwrap().push(ack_id.to_string());
        Ok(())
    }

    async fn subscription_exists(&self) -> Result<bool> {
        Ok(self.tx.lock().unwrap().is_some())
    }
}
