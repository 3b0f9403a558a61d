use anyhow::{Context, Result};
use clap::Parser;
use ringtone_simulator::{Api, Simulator, SimulatorConfig};
use ringtone_types::draw::ZeroCapPolicy;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

const SEED_ENV: &str = "RINGTONE_SEED";
const ZERO_CAP_POLICY_ENV: &str = "RINGTONE_ZERO_CAP_POLICY";
const BROADCAST_CAPACITY_ENV: &str = "RINGTONE_BROADCAST_CAPACITY";
const DEMO_COMPETITION_ID: &str = "demo";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Host interface to bind (default: localhost).
    #[arg(long, default_value = "127.0.0.1")]
    host: IpAddr,

    #[arg(short, long, default_value_t = 8080)]
    port: u16,

    /// Seed for deterministic award resolution (falls back to RINGTONE_SEED).
    #[arg(long)]
    seed: Option<u64>,

    /// How a supply cap of zero is read: disabled or unlimited.
    #[arg(long)]
    zero_cap_policy: Option<ZeroCapPolicy>,

    /// Buffered events per push-channel subscriber (must be > 0 when set).
    #[arg(long)]
    broadcast_capacity: Option<usize>,

    /// Seed a "demo" competition with instant prizes and a wheel.
    #[arg(long)]
    demo: bool,
}

fn parse_env<T: FromStr>(var: &str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(var) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|err| anyhow::anyhow!("invalid {var}: {err}")),
        _ => Ok(None),
    }
}

fn build_config(args: &Args) -> Result<SimulatorConfig> {
    let seed = match args.seed {
        Some(seed) => Some(seed),
        None => parse_env(SEED_ENV)?,
    };
    let zero_cap_policy = match args.zero_cap_policy {
        Some(policy) => policy,
        None => parse_env(ZERO_CAP_POLICY_ENV)?.unwrap_or_default(),
    };
    let broadcast_capacity = match args.broadcast_capacity {
        Some(capacity) => Some(capacity),
        None => parse_env(BROADCAST_CAPACITY_ENV)?,
    };
    if let Some(0) = broadcast_capacity {
        anyhow::bail!("broadcast_capacity must be > 0 when set");
    }

    Ok(SimulatorConfig {
        seed,
        zero_cap_policy,
        broadcast_capacity,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let config = build_config(&args)?;
    info!(
        seed = ?config.seed,
        zero_cap_policy = %config.zero_cap_policy,
        broadcast_capacity = config.broadcast_capacity(),
        "simulator configured"
    );
    let simulator = Arc::new(Simulator::new(config));
    if args.demo {
        simulator
            .seed_demo(DEMO_COMPETITION_ID)
            .await
            .context("failed to seed demo competition")?;
        info!(competition_id = DEMO_COMPETITION_ID, "demo competition seeded");
    }

    let app = Api::new(simulator).router();
    let addr = SocketAddr::new(args.host, args.port);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Listening on {}", addr);
    axum::serve(listener, app)
        .await
        .context("axum server error")?;

    Ok(())
}
