mod settings;

pub use settings::{ApnsConfig, QueueConfig, RelayConfig, ServerConfig, Settings};
