// Telemetry broadcaster: one collection tick process-wide, a single
// "latest" slot, and fan-out to all subscribers. A slow subscriber is
// dropped, never the message, and never at the expense of other
// subscribers (each connection runs its own serving task).

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::broadcast;
use tokio::time::{Duration, Instant, interval, timeout};

use crate::models::{AlertState, AlertThresholds, StreamMessage, TelemetrySnapshot};
use crate::telemetry::Collector;

pub const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Rate limit for the "no receivers" log line (avoid one per tick when no
/// subscriber is connected).
const NO_RECEIVERS_WARN_INTERVAL: Duration = Duration::from_secs(60);

static NEXT_SUBSCRIPTION_ID: AtomicU64 = AtomicU64::new(1);

/// Per-connection bookkeeping, owned by the connection task for its whole
/// lifetime and destroyed on disconnect.
#[derive(Debug)]
pub struct Subscription {
    pub id: u64,
    pub created_at: Instant,
    /// Timestamp of the last snapshot delivered to this subscriber.
    pub last_delivered: Option<u64>,
}

impl Subscription {
    pub fn new() -> Self {
        Self {
            id: NEXT_SUBSCRIPTION_ID.fetch_add(1, Ordering::Relaxed),
            created_at: Instant::now(),
            last_delivered: None,
        }
    }
}

impl Default for Subscription {
    fn default() -> Self {
        Self::new()
    }
}

/// Decrements the subscriber count on drop (connect = +1, drop = -1).
struct SubscriberGuard(Arc<AtomicUsize>);

impl Drop for SubscriberGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

pub struct BroadcasterDeps {
    pub collector: Arc<dyn Collector>,
    pub tx: broadcast::Sender<StreamMessage>,
    /// Single latest-snapshot slot, overwritten each tick. No history.
    pub latest: Arc<RwLock<Option<TelemetrySnapshot>>>,
    pub subscriber_count: Arc<AtomicUsize>,
    pub shutdown_rx: tokio::sync::oneshot::Receiver<()>,
}

pub struct BroadcasterConfig {
    pub sample_interval_ms: u64,
    /// How often to log app stats (real seconds).
    pub stats_log_interval_secs: u64,
    pub thresholds: AlertThresholds,
}

/// Spawns the collection worker: exactly one collection per tick, fanned
/// out to every subscriber through the broadcast channel.
pub fn spawn(deps: BroadcasterDeps, config: BroadcasterConfig) -> tokio::task::JoinHandle<()> {
    let BroadcasterDeps {
        collector,
        tx,
        latest,
        subscriber_count,
        mut shutdown_rx,
    } = deps;
    let BroadcasterConfig {
        sample_interval_ms,
        stats_log_interval_secs,
        thresholds,
    } = config;

    tokio::spawn(async move {
        let mut tick = interval(Duration::from_millis(sample_interval_ms));
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut stats_log_tick = interval(Duration::from_secs(stats_log_interval_secs));
        stats_log_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        let mut alert_state = AlertState::new();
        let mut snapshots_published: u64 = 0;
        let mut last_no_receivers_warn: Option<Instant> = None;

        let worker_span = tracing::span!(tracing::Level::DEBUG, "broadcaster", sample_interval_ms);
        let _guard = worker_span.enter();

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    let snapshot = collector.collect().await;
                    let alerts = alert_state.evaluate(&snapshot, &thresholds);
                    *latest.write() = Some(snapshot.clone());

                    if tx.send(StreamMessage::Snapshot(snapshot)).is_err() {
                        let should_warn = last_no_receivers_warn
                            .is_none_or(|t| t.elapsed() >= NO_RECEIVERS_WARN_INTERVAL);
                        if should_warn {
                            tracing::debug!(
                                operation = "broadcast_snapshot",
                                "No active subscribers; broadcast channel has no receivers"
                            );
                            last_no_receivers_warn = Some(Instant::now());
                        }
                    } else {
                        snapshots_published += 1;
                    }

                    for alert in alerts {
                        tracing::info!(
                            metric = %alert.metric,
                            value = alert.value,
                            "threshold alert: {}",
                            alert.title
                        );
                        let _ = tx.send(StreamMessage::Alert(alert));
                    }
                }
                _ = &mut shutdown_rx => {
                    tracing::debug!("Broadcaster shutting down");
                    break;
                }
                _ = stats_log_tick.tick() => {
                    tracing::info!(
                        subscribers = subscriber_count.load(Ordering::Relaxed),
                        snapshots_published,
                        "app stats"
                    );
                }
            }
        }
    })
}

/// Delivery seam between the serving loop and the transport, so tests can
/// inject a slow consumer without a real socket.
#[async_trait]
pub trait SubscriberSink: Send {
    async fn send_text(&mut self, text: String) -> anyhow::Result<()>;
    async fn send_ping(&mut self) -> anyhow::Result<()>;
}

/// Serves one subscriber connection: the cached latest snapshot first so
/// late joiners wait zero ticks, then one message per broadcast, with
/// keepalive pings in between. Every send is bounded; a connection that
/// cannot accept within the bound is dropped.
pub async fn serve_subscriber<S: SubscriberSink>(
    mut sink: S,
    mut rx: broadcast::Receiver<StreamMessage>,
    latest: Arc<RwLock<Option<TelemetrySnapshot>>>,
    subscriber_count: Arc<AtomicUsize>,
    send_timeout: Duration,
) -> anyhow::Result<()> {
    subscriber_count.fetch_add(1, Ordering::Relaxed);
    let _guard = SubscriberGuard(subscriber_count);
    let mut subscription = Subscription::new();
    tracing::info!(
        subscription_id = subscription.id,
        "Subscriber connected to telemetry stream"
    );

    let cached = latest.read().clone();
    if let Some(snapshot) = cached {
        let delivered = snapshot.timestamp;
        let json = StreamMessage::Snapshot(snapshot).to_json()?;
        if !bounded_send(&mut sink, json, send_timeout).await {
            return Ok(());
        }
        subscription.last_delivered = Some(delivered);
    }

    let mut ping_interval = interval(KEEPALIVE_INTERVAL);
    ping_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            result = rx.recv() => {
                match result {
                    Ok(message) => {
                        let delivered = match &message {
                            StreamMessage::Snapshot(s) => Some(s.timestamp),
                            StreamMessage::Alert(_) => None,
                        };
                        let json = message.to_json()?;
                        if !bounded_send(&mut sink, json, send_timeout).await {
                            tracing::info!(
                                subscription_id = subscription.id,
                                "Subscriber cannot keep up; dropping connection"
                            );
                            break;
                        }
                        if let Some(ts) = delivered {
                            subscription.last_delivered = Some(ts);
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(
                            subscription_id = subscription.id,
                            "Telemetry subscriber lagged, skipped {} messages",
                            n
                        );
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            _ = ping_interval.tick() => {
                let r = timeout(send_timeout, sink.send_ping()).await;
                if r.is_err() || r.unwrap_or(Ok(())).is_err() {
                    break;
                }
            }
        }
    }

    tracing::debug!(
        subscription_id = subscription.id,
        last_delivered = subscription.last_delivered,
        "Subscriber disconnected"
    );
    Ok(())
}

async fn bounded_send<S: SubscriberSink>(sink: &mut S, text: String, bound: Duration) -> bool {
    let r = timeout(bound, sink.send_text(text)).await;
    !(r.is_err() || r.unwrap_or(Ok(())).is_err())
}
