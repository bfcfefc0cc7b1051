use std::sync::Arc;

use anyhow::Result;
use tokio::net::TcpListener;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use apns_relay::api::{create_router, AppState};
use apns_relay::config::Settings;
use apns_relay::provider::ApnsProvider;
use apns_relay::queue::create_queue_transport;
use apns_relay::relay::DeliveryRelay;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    init_tracing();

    // Load configuration
    let settings = Settings::new()?;
    tracing::info!("Configuration loaded");

    // Credentials and HTTP/2 setup are fatal here; the process cannot
    // start without a working provider.
    let provider = Arc::new(ApnsProvider::new(&settings.apns)?);
    tracing::info!(server = %settings.apns.server, topic = %settings.apns.topic, "APNs provider ready");

    let transport = create_queue_transport(&settings.queue).await?;

    let relay = Arc::new(DeliveryRelay::new(
        transport.clone(),
        provider,
        &settings.relay,
    ));
    let shutdown_signal = relay.shutdown_signal();

    // Liveness/metrics endpoint, used for triggering a restart upon queue
    // subscription errors.
    let app = create_router(AppState::new(transport));
    let addr = settings.server_addr();
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Health server listening on {}", addr);
    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "Health server failed");
        }
    });

    tokio::spawn(shutdown_signal_handler(shutdown_signal));

    // Run the delivery loop in the foreground; a fatal queue error
    // propagates out and ends the process for supervision to restart.
    let result = relay.run().await;
    server_handle.abort();
    result?;

    tracing::info!("Relay shutdown complete");
    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn shutdown_signal_handler(shutdown_tx: tokio::sync::broadcast::Sender<()>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        }
    }

    // Stop the delivery loop at its next suspension point
    let _ = shutdown_tx.send(());
}
