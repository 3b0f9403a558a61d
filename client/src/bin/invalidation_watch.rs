use anyhow::{Context, Result};
use clap::Parser;
use ringtone_client::{Client, Listener, ListenerConfig};
use ringtone_types::events::CacheKey;
use std::time::Duration;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about = "Follow the realtime channel and log invalidated views")]
struct Args {
    /// Service base URL; the push channel is served at `<url>/ws`.
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    /// Delay before redialing a dropped connection.
    #[arg(long, default_value = "3000")]
    reconnect_delay_ms: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let client = Client::new(&args.url).context("invalid service URL")?;
    let ws_url = client.ws_url()?;
    let config = ListenerConfig::new(ws_url.clone())
        .with_reconnect_delay(Duration::from_millis(args.reconnect_delay_ms));

    info!(url = %ws_url, reconnect_delay_ms = args.reconnect_delay_ms, "watching invalidations");
    let handle = Listener::spawn(config, |key: CacheKey| {
        info!(key = key.as_str(), "view invalidated");
    });

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;
    info!(
        attempts = handle.connection_attempts(),
        "shutting down listener"
    );
    handle.shutdown().await;

    Ok(())
}
