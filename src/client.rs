// Reconnecting telemetry subscriber: exponential backoff, last-known
// snapshot cache, and a stale-connection watchdog. The state machine is
// explicit (enum + timers); cancellation stops the timer and transitions
// to a terminal state.

use std::time::Duration;

use futures_util::StreamExt;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use crate::models::{StreamMessage, TelemetrySnapshot};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    Disconnected,
    Connecting,
    Connected,
    /// Reconnect attempts exhausted. Terminal until `restart()`.
    ConnectionLost,
}

#[derive(Debug, Clone, Copy)]
pub struct ReconnectConfig {
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub max_attempts: u32,
    /// Watchdog: force a reconnect cycle when no frame (including
    /// keepalives) arrives within this window while claiming Connected.
    pub stale_after: Duration,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            max_attempts: 10,
            stale_after: Duration::from_secs(30),
        }
    }
}

/// `base * 2^(attempt-1)`, capped.
pub fn backoff_delay(base: Duration, cap: Duration, attempt: u32) -> Duration {
    let exp = attempt.saturating_sub(1).min(31);
    base.saturating_mul(2u32.saturating_pow(exp)).min(cap)
}

/// Maintains a live connection to the telemetry broadcaster. Consumers
/// read the most recent snapshot through a watch channel, so the last
/// known value stays available across reconnect gaps, and watch the
/// connection state to show a disconnected indicator instead of blanking.
pub struct ReconnectingClient {
    snapshot_rx: watch::Receiver<Option<TelemetrySnapshot>>,
    state_rx: watch::Receiver<ClientState>,
    restart_tx: mpsc::UnboundedSender<()>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: tokio::task::JoinHandle<()>,
}

impl ReconnectingClient {
    pub fn connect(url: String, config: ReconnectConfig) -> Self {
        let (snapshot_tx, snapshot_rx) = watch::channel(None);
        let (state_tx, state_rx) = watch::channel(ClientState::Disconnected);
        let (restart_tx, restart_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let handle = tokio::spawn(run(
            url,
            config,
            snapshot_tx,
            state_tx,
            restart_rx,
            shutdown_rx,
        ));
        Self {
            snapshot_rx,
            state_rx,
            restart_tx,
            shutdown_tx: Some(shutdown_tx),
            handle,
        }
    }

    /// Last known snapshot, surviving reconnect gaps.
    pub fn latest(&self) -> Option<TelemetrySnapshot> {
        self.snapshot_rx.borrow().clone()
    }

    pub fn state(&self) -> ClientState {
        *self.state_rx.borrow()
    }

    pub fn watch_snapshots(&self) -> watch::Receiver<Option<TelemetrySnapshot>> {
        self.snapshot_rx.clone()
    }

    pub fn watch_state(&self) -> watch::Receiver<ClientState> {
        self.state_rx.clone()
    }

    /// Leaves the terminal `ConnectionLost` state and starts a fresh
    /// attempt cycle. A no-op while the client is still retrying.
    pub fn restart(&self) {
        let _ = self.restart_tx.send(());
    }

    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        let _ = self.handle.await;
    }
}

async fn run(
    url: String,
    config: ReconnectConfig,
    snapshot_tx: watch::Sender<Option<TelemetrySnapshot>>,
    state_tx: watch::Sender<ClientState>,
    mut restart_rx: mpsc::UnboundedReceiver<()>,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    'session: loop {
        let mut attempt: u32 = 0;
        loop {
            state_tx.send_replace(ClientState::Connecting);
            let connected = tokio::select! {
                r = timeout(config.stale_after, connect_async(url.as_str())) => r,
                _ = &mut shutdown_rx => return,
            };
            match connected {
                Ok(Ok((ws, _))) => {
                    attempt = 0;
                    state_tx.send_replace(ClientState::Connected);
                    tracing::info!(url = %url, "Connected to telemetry stream");
                    let shutting_down =
                        read_frames(ws, &config, &snapshot_tx, &mut shutdown_rx).await;
                    state_tx.send_replace(ClientState::Disconnected);
                    if shutting_down {
                        return;
                    }
                }
                Ok(Err(e)) => {
                    tracing::warn!(error = %e, url = %url, "telemetry connect failed");
                }
                Err(_) => {
                    tracing::warn!(url = %url, "telemetry connect timed out");
                }
            }

            attempt += 1;
            if attempt > config.max_attempts {
                state_tx.send_replace(ClientState::ConnectionLost);
                tracing::warn!(
                    attempts = config.max_attempts,
                    "reconnect attempts exhausted; stopping until restarted"
                );
                tokio::select! {
                    cmd = restart_rx.recv() => match cmd {
                        Some(()) => continue 'session,
                        None => return,
                    },
                    _ = &mut shutdown_rx => return,
                }
            }
            let delay = backoff_delay(config.base_delay, config.max_delay, attempt);
            tracing::debug!(
                attempt,
                delay_ms = delay.as_millis() as u64,
                "reconnecting after backoff"
            );
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = &mut shutdown_rx => return,
            }
        }
    }
}

/// Reads frames until the connection drops, goes stale, or shutdown is
/// requested. Returns true when shutting down for good.
async fn read_frames(
    mut ws: Socket,
    config: &ReconnectConfig,
    snapshot_tx: &watch::Sender<Option<TelemetrySnapshot>>,
    shutdown_rx: &mut oneshot::Receiver<()>,
) -> bool {
    loop {
        let frame = tokio::select! {
            f = timeout(config.stale_after, ws.next()) => f,
            _ = &mut *shutdown_rx => {
                let _ = ws.close(None).await;
                return true;
            }
        };
        match frame {
            // Watchdog: no frame within the window, force a reconnect
            // cycle rather than waiting indefinitely.
            Err(_) => {
                tracing::warn!(
                    stale_after_secs = config.stale_after.as_secs(),
                    "no message within the stale window; forcing reconnect"
                );
                let _ = ws.close(None).await;
                return false;
            }
            Ok(None) => return false,
            Ok(Some(Err(e))) => {
                tracing::warn!(error = %e, "telemetry stream read failed");
                return false;
            }
            Ok(Some(Ok(Message::Text(text)))) => match StreamMessage::from_json(text.as_str()) {
                Ok(StreamMessage::Snapshot(snapshot)) => {
                    snapshot_tx.send_replace(Some(snapshot));
                }
                Ok(StreamMessage::Alert(alert)) => {
                    tracing::info!(metric = %alert.metric, "stream alert: {}", alert.title);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "malformed stream message; skipping");
                }
            },
            Ok(Some(Ok(Message::Close(_)))) => return false,
            // Ping/pong/binary frames still reset the watchdog.
            Ok(Some(Ok(_))) => {}
        }
    }
}
