use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use crate::cli::config::resolve_config;
use crate::cli::ServeArgs;
use crate::native::build_router;
use crate::sink::InfluxClient;

pub async fn execute_serve(args: ServeArgs) -> Result<()> {
    let influx = args.influx;
    let config = resolve_config(influx.config.as_deref(), influx.url, influx.database, influx.token)?;
    let listen = args.listen.unwrap_or_else(|| config.listen.clone());

    let client = InfluxClient::new(config.influx_target(), config.retry_config())
        .map_err(anyhow::Error::msg)?;
    let app = build_router(Arc::new(client));

    let listener = TcpListener::bind(&listen)
        .await
        .with_context(|| format!("Failed to bind {}", listen))?;
    info!(
        listen = %listen,
        influx = %config.influx.url,
        database = %config.influx.database,
        "accepting build events"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
        })
        .await?;

    Ok(())
}
