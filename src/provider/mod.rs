//! Notification provider: request construction plus the secure client.
//!
//! [`ApnsProvider`] is the concrete provider the process runs with;
//! [`PushProvider`] is the seam the delivery loop consumes, so the loop can
//! be exercised in tests without a real APNs endpoint.

mod client;
mod request;

pub use client::{ApnsClient, ApnsResponse};
pub use request::{OutboundRequest, PushType, RequestBuilder};

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::config::ApnsConfig;
use crate::error::Result;
use crate::payload::{Notification, NotificationPayload};

/// Seam between the delivery loop and the outbound transport.
#[async_trait]
pub trait PushProvider: Send + Sync {
    /// Send one notification. The expiration is forwarded as-is; an unset
    /// value means "no re-delivery window".
    async fn push(
        &self,
        notification: &Notification,
        token: &str,
        identifier: &str,
        expiration: Option<DateTime<Utc>>,
    ) -> Result<ApnsResponse>;
}

/// APNs provider holding the request builder and the mutual-TLS client.
pub struct ApnsProvider {
    builder: RequestBuilder,
    client: ApnsClient,
}

impl ApnsProvider {
    /// Prepare a provider for sending push notifications.
    ///
    /// Certificate loading and HTTP/2 setup happen here and are fatal on
    /// failure; the process cannot start without valid credentials.
    pub fn new(config: &ApnsConfig) -> Result<Self> {
        let client = ApnsClient::new(
            &config.cert_path,
            &config.key_path,
            Duration::from_secs(config.timeout_seconds),
        )?;

        Ok(Self {
            builder: RequestBuilder::new(&config.server, &config.topic),
            client,
        })
    }

    /// Send a caller-defined payload that embeds the canonical notification.
    pub async fn push_payload<P: NotificationPayload + Sync>(
        &self,
        payload: &P,
        token: &str,
        identifier: &str,
        expiration: Option<DateTime<Utc>>,
    ) -> Result<ApnsResponse> {
        let request = self.builder.build(payload, token, identifier, expiration)?;
        self.client.send(request).await
    }
}

#[async_trait]
impl PushProvider for ApnsProvider {
    async fn push(
        &self,
        notification: &Notification,
        token: &str,
        identifier: &str,
        expiration: Option<DateTime<Utc>>,
    ) -> Result<ApnsResponse> {
        self.push_payload(notification, token, identifier, expiration)
            .await
    }
}
