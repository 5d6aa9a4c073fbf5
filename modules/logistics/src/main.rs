use anyhow::Context;
use event_bus::{EventBus, InMemoryBus, NatsBus};
use logistics_rs::config::{BusType, Config};
use logistics_rs::contracts::{ALL_TOPICS, LOGISTICS_STREAM};
use logistics_rs::handlers::LoggingHandler;
use logistics_rs::routes::{logistics_router, AppState};
use logistics_rs::{Dispatcher, SubscriptionSet};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env().map_err(anyhow::Error::msg)?;
    tracing::info!(
        version = %config.app_version,
        bus_type = ?config.bus_type,
        "Configuration loaded"
    );

    let bus: Arc<dyn EventBus> = match config.bus_type {
        BusType::Nats => {
            let nats_url = config
                .nats_url
                .as_deref()
                .context("NATS_URL required for NATS bus")?;
            tracing::info!("Connecting to NATS at {}", nats_url);
            let nats = NatsBus::connect(nats_url).await?;
            nats.ensure_stream(LOGISTICS_STREAM, &ALL_TOPICS).await?;
            Arc::new(nats)
        }
        BusType::InMemory => {
            tracing::info!("Using in-memory event bus");
            Arc::new(InMemoryBus::new())
        }
    };

    let subscriptions = SubscriptionSet::start(bus.clone(), Arc::new(LoggingHandler));
    subscriptions.log_summary();

    let state = AppState::new(Dispatcher::new(bus), config.app_version.clone());
    let app = logistics_router(state).layer(
        CorsLayer::new()
            .allow_origin(tower_http::cors::Any)
            .allow_methods(tower_http::cors::Any)
            .allow_headers(tower_http::cors::Any),
    );

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("HOST and PORT must form a socket address")?;
    tracing::info!("Logistics module listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind")?;

    // Dropping `subscriptions` on an error return cancels them as well
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server failed")?;

    subscriptions.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
