//! Factory for creating queue transports from configuration.

use std::sync::Arc;

use crate::config::QueueConfig;
use crate::error::{RelayError, Result};

use super::{MemoryQueueTransport, QueueTransport, RedisQueueTransport};

/// Create a queue transport based on the configured backend type.
///
/// Unknown backend names are a configuration error and fatal at startup.
pub async fn create_queue_transport(config: &QueueConfig) -> Result<Arc<dyn QueueTransport>> {
    match config.backend.as_str() {
        "redis" => {
            let transport = RedisQueueTransport::new(config).await?;
            Ok(Arc::new(transport))
        }
        "memory" => {
            tracing::warn!("Using in-memory queue transport; messages will not survive restarts");
            Ok(Arc::new(MemoryQueueTransport::new()))
        }
        other => Err(RelayError::Config(config::ConfigError::Message(format!(
            "unknown queue backend: {}",
            other
        )))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_backend_selected() {
        let config = QueueConfig {
            backend: "memory".to_string(),
            ..Default::default()
        };
        let transport = create_queue_transport(&config).await.unwrap();
        assert!(transport.subscription_exists().await.unwrap());
    }

    #[tokio::test]
    async fn test_unknown_backend_rejected() {
        let config = QueueConfig {
            backend: "kafka".to_string(),
            ..Default::default()
        };
        let result = create_queue_transport(&config).await;
        assert!(matches!(result, Err(RelayError::Config(_))));
    }
}
