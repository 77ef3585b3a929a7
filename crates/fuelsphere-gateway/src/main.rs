mod handlers;

use std::net::SocketAddr;

use anyhow::{Context, Result as AnyResult};
use fuelsphere_ops::OperationsService;
use fuelsphere_platform::{PgStore, RedisBus, ServiceConfig, connect_database, ensure_schema};
use tracing::info;

use crate::handlers::{AppState, router};

#[tokio::main]
async fn main() -> AnyResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "fuelsphere_gateway=info,fuelsphere_ops=info".to_string()),
        )
        .init();

    let config = ServiceConfig::from_env("0.0.0.0:8080")?;
    let pool = connect_database(&config.database_url, config.max_connections).await?;
    ensure_schema(&pool).await?;
    let events = config
        .redis_url
        .as_deref()
        .map(RedisBus::connect)
        .transpose()?;
    if events.is_none() {
        info!("REDIS_URL not set, domain events will not be published");
    }

    let state = AppState {
        ops: OperationsService::new(PgStore::new(pool)),
        events,
    };

    let addr: SocketAddr = config
        .http_addr
        .parse()
        .with_context(|| format!("invalid HTTP_ADDR {}", config.http_addr))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("fuelsphere-gateway listening on {}", addr);
    axum::serve(listener, router(state)).await?;

    Ok(())
}
