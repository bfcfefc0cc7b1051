//! The delivery loop: consume, filter, transform, send, acknowledge.
//!
//! One message is fully processed before the next is pulled. Delivery is
//! best-effort and at-most-one-attempt: every message is positively
//! acknowledged exactly once whatever the outcome, so no retry state exists
//! anywhere. A push that failed is indistinguishable, from the remote API's
//! point of view, from one that was delivered to an unreachable device, so
//! local retrying would not materially improve delivery.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tokio::sync::broadcast;

use crate::config::RelayConfig;
use crate::error::Result;
use crate::metrics::{
    DECODE_FAILURES_TOTAL, DELIVERED_TOTAL, SEND_DURATION_SECONDS, SEND_FAILURES_TOTAL,
    STALE_SKIPPED_TOTAL,
};
use crate::payload::Notification;
use crate::provider::PushProvider;
use crate::queue::{InboundMessage, QueueTransport};

/// Runs the consume-filter-transform-send loop.
///
/// Owns the queue subscription and the push provider for the process
/// lifetime; no state persists between iterations.
pub struct DeliveryRelay {
    transport: Arc<dyn QueueTransport>,
    provider: Arc<dyn PushProvider>,
    /// Messages older than this are dropped; the outbound expiry tracks the
    /// same window from publish time.
    ttl: Duration,
    shutdown: broadcast::Sender<()>,
}

impl DeliveryRelay {
    pub fn new(
        transport: Arc<dyn QueueTransport>,
        provider: Arc<dyn PushProvider>,
        config: &RelayConfig,
    ) -> Self {
        let (shutdown, _) = broadcast::channel(1);
        Self {
            transport,
            provider,
            ttl: Duration::seconds(config.message_ttl_seconds as i64),
            shutdown,
        }
    }

    /// Get a shutdown signal sender
    pub fn shutdown_signal(&self) -> broadcast::Sender<()> {
        self.shutdown.clone()
    }

    /// Run until shutdown is signalled or the subscription becomes
    /// unusable. Pull errors are fatal and propagate to the caller;
    /// per-message failures are absorbed here.
    pub async fn run(&self) -> Result<()> {
        let mut shutdown_rx = self.shutdown.subscribe();
        tracing::info!("listening for messages");

        loop {
            let message = tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::info!("Received shutdown signal, stopping delivery loop");
                    return Ok(());
                }
                pulled = self.transport.pull() => pulled?,
            };

            self.process(message).await;
        }
    }

    /// Process one message end to end, finishing with a positive ack.
    async fn process(&self, message: InboundMessage) {
        let notification: Notification = match serde_json::from_slice(&message.data) {
            Ok(n) => n,
            Err(e) => {
                // No amount of redelivery fixes a structurally invalid
                // payload.
                tracing::error!(
                    error = %e,
                    ack_id = %message.ack_id,
                    "Dropping undecodable message"
                );
                DECODE_FAILURES_TOTAL.inc();
                self.ack(&message).await;
                return;
            }
        };

        let (Some(token), Some(identifier)) = (message.token(), message.identifier()) else {
            tracing::error!(
                ack_id = %message.ack_id,
                attributes = ?message.attributes,
                "Dropping message without required to/identifier attributes"
            );
            DECODE_FAILURES_TOTAL.inc();
            self.ack(&message).await;
            return;
        };

        // Filter messages that have become too old on the inbound queue.
        if Utc::now().signed_duration_since(message.publish_time) > self.ttl {
            tracing::debug!(
                ack_id = %message.ack_id,
                publish_time = %message.publish_time,
                "Skipping message that expired before processing"
            );
            STALE_SKIPPED_TOTAL.inc();
            self.ack(&message).await;
            return;
        }

        // The outbound expiry tracks a fixed window from when the message
        // entered the queue, independent of how long it waited here.
        let expiration = Some(message.publish_time + self.ttl);

        let timer = SEND_DURATION_SECONDS.start_timer();
        let outcome = self
            .provider
            .push(&notification, token, identifier, expiration)
            .await;
        timer.observe_duration();

        match outcome {
            Ok(_) => {
                DELIVERED_TOTAL.inc();
                tracing::debug!(
                    token = %token,
                    identifier = %identifier,
                    payload = ?notification,
                    attributes = ?message.attributes,
                    "notification sent"
                );
            }
            Err(e) => {
                SEND_FAILURES_TOTAL.inc();
                tracing::error!(
                    error = %e,
                    token = %token,
                    identifier = %identifier,
                    "Failed to send notification"
                );
            }
        }

        self.ack(&message).await;
    }

    async fn ack(&self, message: &InboundMessage) {
        if let Err(e) = self.transport.ack(&message.ack_id).await {
            tracing::error!(
                error = %e,
                ack_id = %message.ack_id,
                "Failed to acknowledge message"
            );
        }
    }
}
