// WebSocket subscriber endpoint

use async_trait::async_trait;
use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use bytes::Bytes;

use super::AppState;
use crate::broadcaster::{self, DEFAULT_SEND_TIMEOUT, SubscriberSink};

struct WsSink(WebSocket);

#[async_trait]
impl SubscriberSink for WsSink {
    async fn send_text(&mut self, text: String) -> anyhow::Result<()> {
        self.0.send(Message::Text(text.into())).await?;
        Ok(())
    }

    async fn send_ping(&mut self) -> anyhow::Result<()> {
        self.0.send(Message::Ping(Bytes::new())).await?;
        Ok(())
    }
}

pub(super) async fn ws_telemetry(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let rx = state.stream_tx.subscribe();
    let latest = state.latest.clone();
    let subscriber_count = state.subscriber_count.clone();
    ws.on_upgrade(move |socket| async move {
        if let Err(e) = broadcaster::serve_subscriber(
            WsSink(socket),
            rx,
            latest,
            subscriber_count,
            DEFAULT_SEND_TIMEOUT,
        )
        .await
        {
            tracing::info!("Telemetry stream error: {}", e);
        }
    })
}
