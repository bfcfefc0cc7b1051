use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerConfig,
    pub apns: ApnsConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub relay: RelayConfig,
}

/// Listener for the health/metrics surface.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Outbound APNs provider settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ApnsConfig {
    /// Public client certificate used for APNs auth (PEM).
    #[serde(default = "default_cert_path")]
    pub cert_path: String,
    /// Private client key used for APNs auth (PEM).
    #[serde(default = "default_key_path")]
    pub key_path: String,
    /// Bundle id of the APNs application, sent as `apns-topic`.
    pub topic: String,
    /// Which APNs server to use.
    #[serde(default = "default_apns_server")]
    pub server: String,
    /// Per-request send timeout in seconds.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

/// Inbound queue transport settings.
#[derive(Debug, Clone, Deserialize)]
pub struct QueueConfig {
    /// Backend type: "redis" or "memory".
    #[serde(default = "default_queue_backend")]
    pub backend: String,
    #[serde(default = "default_redis_url")]
    pub url: String,
    /// Stream to consume notifications from.
    #[serde(default = "default_stream")]
    pub stream: String,
    /// Consumer group name.
    #[serde(default = "default_group")]
    pub group: String,
    /// Consumer name within the group; generated when unset.
    #[serde(default)]
    pub consumer: Option<String>,
}

/// Delivery loop settings.
#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    /// Threshold beyond which an inbound message is considered too old to
    /// deliver; the outbound expiry tracks the same window.
    #[serde(default = "default_message_ttl")]
    pub message_ttl_seconds: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_cert_path() -> String {
    "/secrets/cert.pem".to_string()
}

fn default_key_path() -> String {
    "/secrets/key.pem".to_string()
}

fn default_apns_server() -> String {
    "api.development.push.apple.com".to_string()
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_queue_backend() -> String {
    "redis".to_string()
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_stream() -> String {
    "notifications".to_string()
}

fn default_group() -> String {
    "notifications-apn".to_string()
}

fn default_message_ttl() -> u64 {
    600 // 10 minutes
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        // Load .env file if exists
        let _ = dotenvy::dotenv();

        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Config::builder()
            // Start with default values
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("queue.backend", "redis")?
            .set_default("queue.url", "redis://localhost:6379")?
            .set_default("relay.message_ttl_seconds", 600)?
            // Load config file if exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Load from environment variables
            // SERVER_PORT, APNS_TOPIC, APNS_CERT_PATH, QUEUE_URL, etc.
            .add_source(
                Environment::default()
                    .separator("_")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl QueueConfig {
    /// Consumer name within the group; a generated name keeps multiple
    /// relay replicas from stealing each other's pending entries.
    pub fn consumer_name(&self) -> String {
        self.consumer
            .clone()
            .unwrap_or_else(|| format!("apns-relay-{}", uuid::Uuid::new_v4()))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            backend: default_queue_backend(),
            url: default_redis_url(),
            stream: default_stream(),
            group: default_group(),
            consumer: None,
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            message_ttl_seconds: default_message_ttl(),
        }
    }
}
