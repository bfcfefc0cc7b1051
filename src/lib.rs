// Infrastructure layer (shared components)
pub mod config;
pub mod error;
pub mod metrics;

// Domain layer (delivery pipeline)
pub mod payload;
pub mod provider;
pub mod queue;
pub mod relay;

// Application layer
pub mod api;
