//! Redis Streams queue transport.
//!
//! Messages are consumed through a consumer group (`XREADGROUP`) and
//! acknowledged with `XACK`, so undelivered entries survive a process
//! restart. The publish timestamp is taken from the stream entry id, which
//! Redis derives from its clock at `XADD` time.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use redis::streams::{StreamReadOptions, StreamReadReply};
use redis::AsyncCommands;

use crate::config::QueueConfig;
use crate::error::{RelayError, Result};

use super::{InboundMessage, QueueTransport};

/// Field holding the notification payload; every other field on a stream
/// entry is treated as a message attribute.
const DATA_FIELD: &str = "data";

/// How long one XREADGROUP call blocks before the pull loop re-issues it.
const BLOCK_MS: usize = 5_000;

/// Queue transport backed by a Redis Stream consumer group.
pub struct RedisQueueTransport {
    conn: ConnectionManager,
    stream: String,
    group: String,
    consumer: String,
}

impl RedisQueueTransport {
    /// Connect and make sure the consumer group exists.
    ///
    /// Group creation uses `MKSTREAM` so the relay can start before any
    /// publisher has written to the stream; an already-existing group is
    /// fine.
    pub async fn new(config: &QueueConfig) -> Result<Self> {
        let client = redis::Client::open(config.url.as_str())?;
        let conn = ConnectionManager::new(client).await?;

        let transport = Self {
            conn,
            stream: config.stream.clone(),
            group: config.group.clone(),
            consumer: config.consumer_name(),
        };
        transport.ensure_group().await?;

        tracing::info!(
            stream = %transport.stream,
            group = %transport.group,
            consumer = %transport.consumer,
            "Redis queue transport ready"
        );

        Ok(transport)
    }

    async fn ensure_group(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        let created: std::result::Result<(), redis::RedisError> = conn
            .xgroup_create_mkstream(&self.stream, &self.group, "$")
            .await;

        match created {
            Ok(()) => Ok(()),
            // BUSYGROUP means the group already exists.
            Err(e) if e.code() == Some("BUSYGROUP") => Ok(()),
            Err(e) => Err(RelayError::Queue(e)),
        }
    }

    fn parse_entry(&self, entry: &redis::streams::StreamId) -> InboundMessage {
        let mut data = Vec::new();
        let mut attributes = HashMap::new();

        for (field, value) in &entry.map {
            let Ok(text) = redis::from_redis_value::<String>(value) else {
                tracing::warn!(
                    stream_id = %entry.id,
                    field = %field,
                    "Skipping non-string field on stream entry"
                );
                continue;
            };
            if field == DATA_FIELD {
                data = text.into_bytes();
            } else {
                attributes.insert(field.clone(), text);
            }
        }

        InboundMessage {
            ack_id: entry.id.clone(),
            data,
            attributes,
            publish_time: publish_time_from_id(&entry.id),
        }
    }
}

#[async_trait]
impl QueueTransport for RedisQueueTransport {
    async fn pull(&self) -> Result<InboundMessage> {
        let options = StreamReadOptions::default()
            .group(&self.group, &self.consumer)
            .count(1)
            .block(BLOCK_MS);

        let mut conn = self.conn.clone();
        loop {
            let reply: StreamReadReply = conn
                .xread_options(&[&self.stream], &[">"], &options)
                .await
                .map_err(|e| {
                    if e.code() == Some("NOGROUP") {
                        RelayError::SubscriptionLost(format!(
                            "consumer group {} on stream {} is gone",
                            self.group, self.stream
                        ))
                    } else {
                        RelayError::Queue(e)
                    }
                })?;

            // An empty reply just means the block window elapsed.
            if let Some(entry) = reply.keys.first().and_then(|k| k.ids.first()) {
                return Ok(self.parse_entry(entry));
            }
        }
    }

    async fn ack(&self, ack_id: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: i64 = conn.xack(&self.stream, &self.group, &[ack_id]).await?;
        Ok(())
    }

    async fn subscription_exists(&self) -> Result<bool> {
        let mut conn = self.conn.clone();
        let reply: std::result::Result<Vec<HashMap<String, redis::Value>>, redis::RedisError> =
            redis::cmd("XINFO")
                .arg("GROUPS")
                .arg(&self.stream)
                .query_async(&mut conn)
                .await;

        let groups = match reply {
            Ok(groups) => groups,
            // Stream deleted out from under us.
            Err(e) if e.kind() == redis::ErrorKind::ResponseError => return Ok(false),
            Err(e) => return Err(RelayError::Queue(e)),
        };

        for group in &groups {
            if let Some(value) = group.get("name") {
                if let Ok(name) = redis::from_redis_value::<String>(value) {
                    if name == self.group {
                        return Ok(true);
                    }
                }
            }
        }
        Ok(false)
    }
}

/// Derive the publish timestamp from a stream entry id
/// (`{unix-ms}-{sequence}`). Falls back to "now" on an unparseable id
/// rather than failing the message.
fn publish_time_from_id(id: &str) -> DateTime<Utc> {
    id.split('-')
        .next()
        .and_then(|ms| ms.parse::<i64>().ok())
        .and_then(DateTime::from_timestamp_millis)
        .unwrap_or_else(Utc::now)
}
