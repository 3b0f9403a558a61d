use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State as AxumState,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::Simulator;

pub(super) async fn events_ws(
    ws: WebSocketUpgrade,
    AxumState(simulator): AxumState<Arc<Simulator>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_events_ws(socket, simulator))
}

/// Forwards every published event as one JSON text frame until either side goes away.
async fn handle_events_ws(socket: WebSocket, simulator: Arc<Simulator>) {
    let mut events = simulator.subscribe();
    let (mut sender, mut receiver) = socket.split();
    tracing::info!(
        subscribers = simulator.subscriber_count(),
        "event subscriber connected"
    );

    loop {
        tokio::select! {
            event = events.recv() => {
                let event = match event {
                    Ok(event) => event,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "event subscriber lagged");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                };
                let text = match serde_json::to_string(&event) {
                    Ok(text) => text,
                    Err(err) => {
                        tracing::warn!(?err, tag = event.tag(), "failed to encode event");
                        continue;
                    }
                };
                if sender.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
            message = receiver.next() => match message {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    let _ = sender.close().await;
    tracing::info!("event subscriber disconnected");
}
