//! Bizpulse - periodic business-health monitor for an admin/seller dashboard.
//!
//! # API Endpoints
//!
//! - `POST /check-stock` - Run the stock monitor once
//! - `POST /check-visits` - Run the visit recency monitor once
//! - `GET /health` - Health check
//!
//! Both jobs are meant to be triggered once per day by an external scheduler.

use std::net::SocketAddr;

use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use bizpulse::api::{AppState, router};
use bizpulse::config::{BackendConfig, Config};
use bizpulse::data_sources::RestClient;
use bizpulse::storage::Storage;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing with environment filter
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("bizpulse=info".parse()?))
        .init();

    // Missing or inconsistent configuration is fatal at startup
    let config = Config::from_env()?;

    let state = match &config.backend {
        BackendConfig::Sqlite { database_url } => {
            info!(db_url = %database_url, "Using SQLite backend");
            let storage = Storage::new(database_url).await?;
            AppState::from_backend(storage, config.policy)
        }
        BackendConfig::Rest {
            base_url,
            service_key,
        } => {
            // The service key is a secret; only the host is logged
            info!(base_url = %base_url, "Using REST backend");
            AppState::from_backend(RestClient::new(base_url, service_key), config.policy)
        }
    };

    info!(
        seller_interval_days = config.policy.seller_interval_days,
        admin_interval_days = config.policy.admin_interval_days,
        "Staleness policy loaded"
    );

    let app = router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;

    info!(%addr, "Bizpulse is listening");

    axum::serve(listener, app).await?;

    Ok(())
}
