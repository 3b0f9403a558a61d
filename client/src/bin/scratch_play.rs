use anyhow::{Context, Result};
use clap::Parser;
use ringtone_client::Client;
use ringtone_types::session::{CompleteSessionRequest, CreateOrderRequest};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about = "Play scratch cards against the award-resolution service")]
struct Args {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    /// Paid order to play. Without it, a fresh order is created (development backends only).
    #[arg(short, long)]
    order_id: Option<String>,

    #[arg(long, default_value = "demo")]
    competition_id: String,

    #[arg(long, default_value = "player-1")]
    user_id: String,

    /// Cards to play from the order.
    #[arg(short, long, default_value = "1")]
    cards: u32,
}

async fn play(client: &Client, order_id: &str, cards: u32) -> Result<()> {
    for card in 1..=cards {
        let start = client
            .start_session(order_id)
            .await
            .with_context(|| format!("failed to start card {card}"))?;
        info!(
            card,
            session_id = %start.session_id,
            tiles = ?start.tile_layout,
            "card revealed"
        );

        let request = CompleteSessionRequest::for_start(order_id, &start);
        let complete = client
            .complete_session(&start.session_id, request)
            .await
            .with_context(|| format!("failed to complete card {card}"))?;
        if start.is_winner {
            info!(
                card,
                prize = complete.prize_label.as_deref().unwrap_or_default(),
                reward_type = %complete.prize.reward_type,
                value = %complete.prize.value,
                remaining_cards = complete.remaining_cards,
                "winner"
            );
        } else {
            info!(card, remaining_cards = complete.remaining_cards, "no win");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let client = Client::new(&args.url).context("invalid service URL")?;
    let order_id = match args.order_id.clone() {
        Some(order_id) => order_id,
        None => {
            client
                .create_order(&CreateOrderRequest {
                    competition_id: args.competition_id.clone(),
                    user_id: args.user_id.clone(),
                    cards: args.cards,
                })
                .await
                .context("failed to create order")?
                .order_id
        }
    };
    info!(order_id = %order_id, cards = args.cards, "playing");

    tokio::select! {
        result = play(&client, &order_id, args.cards) => result?,
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to listen for ctrl-c")?;
            if client.warn_if_pending("ctrl-c") {
                client.wait_for_pending_completions().await;
                info!("pending completions settled");
            } else {
                warn!("interrupted");
            }
        }
    }

    Ok(())
}
