//! Live price feed client.
//!
//! Features:
//! - One-shot historical backfill before streaming (soft-fail)
//! - Automatic reconnection with a fixed backoff ladder
//! - Connectivity flag exposed as a watch channel

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use futures::StreamExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

use super::types::{parse_kline_rows, PriceHistory, SharedPrice, TradeEvent};
use crate::config::Config;
use crate::error::FeedError;
use crate::metrics;

/// Feed endpoints and buffer sizing, injected so tests can point the
/// adapter at a fake server.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Full websocket URL of the trade stream.
    pub stream_url: String,
    /// Kline REST endpoint for backfill.
    pub kline_url: String,
    /// Symbol in upstream (uppercase) form.
    pub symbol: String,
    /// Points to backfill before streaming.
    pub backfill_points: usize,
    /// History ring-buffer capacity.
    pub history_capacity: usize,
}

impl FeedConfig {
    /// Derive feed settings from the application config.
    pub fn from_config(config: &Config) -> Self {
        Self {
            stream_url: config.trade_stream_url(),
            kline_url: config.kline_url(),
            symbol: config.feed_symbol.to_uppercase(),
            backfill_points: config.backfill_points,
            history_capacity: config.history_capacity,
        }
    }
}

/// Reconnection delay ladder. Fixed steps, capped at the last entry;
/// the attempt counter resets to zero on any successful connection.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    ladder: Vec<Duration>,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            ladder: [1, 2, 4, 8, 16]
                .into_iter()
                .map(Duration::from_secs)
                .collect(),
        }
    }
}

impl ReconnectPolicy {
    /// Delay before the given (zero-based) reconnect attempt.
    pub fn delay(&self, attempt: u32) -> Duration {
        let idx = (attempt as usize).min(self.ladder.len() - 1);
        self.ladder[idx]
    }
}

/// Owns the upstream stream connection and publishes normalized prices.
///
/// The "current price" slot and the history buffer are written only here;
/// consumers read them through the cloned handles.
pub struct PriceFeed {
    config: FeedConfig,
    http: reqwest::Client,
    price: SharedPrice,
    history: PriceHistory,
    connected_tx: Arc<watch::Sender<bool>>,
    reconnect_policy: ReconnectPolicy,
    reconnect_attempts: Arc<AtomicU64>,
    stream_task: Mutex<Option<JoinHandle<()>>>,
}

impl PriceFeed {
    /// Create a feed client. No connection is made until [`connect`].
    ///
    /// [`connect`]: PriceFeed::connect
    pub fn new(config: FeedConfig) -> Self {
        let history = PriceHistory::new(config.history_capacity);
        let (connected_tx, _) = watch::channel(false);

        Self {
            config,
            http: reqwest::Client::new(),
            price: SharedPrice::new(),
            history,
            connected_tx: Arc::new(connected_tx),
            reconnect_policy: ReconnectPolicy::default(),
            reconnect_attempts: Arc::new(AtomicU64::new(0)),
            stream_task: Mutex::new(None),
        }
    }

    /// Handle to the current-price slot.
    pub fn price(&self) -> SharedPrice {
        self.price.clone()
    }

    /// Handle to the price history buffer.
    pub fn history(&self) -> PriceHistory {
        self.history.clone()
    }

    /// Subscribe to the connectivity flag.
    pub fn connectivity(&self) -> watch::Receiver<bool> {
        self.connected_tx.subscribe()
    }

    /// Whether the stream is currently connected.
    pub fn is_connected(&self) -> bool {
        *self.connected_tx.borrow()
    }

    /// Number of reconnection attempts since the last explicit connect.
    pub fn reconnect_attempts(&self) -> u64 {
        self.reconnect_attempts.load(Ordering::SeqCst)
    }

    /// Backfill history, then start the streaming task.
    ///
    /// Backfill failure is logged and ignored; the stream connects either
    /// way. Reconnection after an unexpected close is automatic and
    /// unlimited until [`disconnect`] is called, and never clears the
    /// buffer or the current price.
    ///
    /// [`disconnect`]: PriceFeed::disconnect
    pub async fn connect(&self) -> Result<(), FeedError> {
        {
            let task = self.stream_task.lock().expect("stream task lock");
            if task.as_ref().is_some_and(|t| !t.is_finished()) {
                return Err(FeedError::AlreadyConnected);
            }
        }

        match self.backfill().await {
            Ok(count) => info!(points = count, "Backfilled price history"),
            Err(e) => {
                metrics::inc_backfill_failures();
                warn!(error = %e, "Backfill failed, starting stream with empty history");
            }
        }

        let handle = self.spawn_stream_task();
        *self.stream_task.lock().expect("stream task lock") = Some(handle);

        Ok(())
    }

    /// Close the stream and stop reconnecting.
    ///
    /// Price and history are retained; a later [`connect`] resumes with
    /// the old buffer still in place.
    ///
    /// [`connect`]: PriceFeed::connect
    pub fn disconnect(&self) {
        if let Some(task) = self.stream_task.lock().expect("stream task lock").take() {
            task.abort();
        }
        self.reconnect_attempts.store(0, Ordering::SeqCst);
        self.connected_tx.send_replace(false);
        info!("Price feed disconnected");
    }

    /// One-shot kline request to pre-populate the chart buffer.
    async fn backfill(&self) -> Result<usize, FeedError> {
        let limit = self.config.backfill_points.to_string();
        let response = self
            .http
            .get(&self.config.kline_url)
            .query(&[
                ("symbol", self.config.symbol.as_str()),
                ("interval", "1s"),
                ("limit", limit.as_str()),
            ])
            .send()
            .await
            .map_err(|e| FeedError::BackfillFailed(e.to_string()))?;

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| FeedError::BackfillFailed(e.to_string()))?;

        let points = parse_kline_rows(&body);
        let count = points.len();
        self.history.extend(points);

        Ok(count)
    }

    /// Spawn the connect/read/reconnect loop.
    fn spawn_stream_task(&self) -> JoinHandle<()> {
        let url = self.config.stream_url.clone();
        let price = self.price.clone();
        let history = self.history.clone();
        let connected_tx = self.connected_tx.clone();
        let policy = self.reconnect_policy.clone();
        let attempts = self.reconnect_attempts.clone();

        tokio::spawn(async move {
            let mut attempt = 0u32;

            loop {
                info!(url = %url, attempt = attempt, "Connecting to price stream");

                match connect_async(&url).await {
                    Ok((ws_stream, _)) => {
                        attempt = 0;
                        attempts.store(0, Ordering::SeqCst);
                        connected_tx.send_replace(true);
                        info!("Price stream connected");

                        let (_, mut read) = ws_stream.split();

                        while let Some(msg) = read.next().await {
                            match msg {
                                Ok(Message::Text(text)) => {
                                    process_message(&text, &price, &history);
                                }
                                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {
                                    // tungstenite answers pings itself
                                }
                                Ok(Message::Close(frame)) => {
                                    warn!(frame = ?frame, "Price stream closed by server");
                                    break;
                                }
                                Ok(_) => {}
                                Err(e) => {
                                    warn!(error = %e, "Price stream error");
                                    break;
                                }
                            }
                        }

                        connected_tx.send_replace(false);
                        warn!("Price stream ended, will reconnect");
                    }
                    Err(e) => {
                        warn!(error = %e, attempt = attempt, "Price stream connection failed");
                    }
                }

                let delay = policy.delay(attempt);
                attempts.fetch_add(1, Ordering::SeqCst);
                metrics::inc_feed_reconnects();

                info!(delay_ms = delay.as_millis(), "Reconnecting after delay");
                tokio::time::sleep(delay).await;

                attempt = attempt.saturating_add(1);
            }
        })
    }
}

impl Drop for PriceFeed {
    fn drop(&mut self) {
        if let Ok(mut task) = self.stream_task.lock() {
            if let Some(task) = task.take() {
                task.abort();
            }
        }
    }
}

/// Apply a single stream message. Malformed messages are dropped without
/// aborting the connection.
fn process_message(text: &str, price: &SharedPrice, history: &PriceHistory) {
    let start = Instant::now();

    let event = match TradeEvent::parse(text) {
        Ok(event) => event,
        Err(e) => {
            metrics::inc_messages_dropped();
            debug!(error = %e, "Dropped malformed feed message");
            return;
        }
    };

    let point = match event.to_price_point() {
        Ok(point) => point,
        Err(e) => {
            metrics::inc_messages_dropped();
            debug!(error = %e, "Dropped trade with unparsable price");
            return;
        }
    };

    price.publish(point.clone());
    history.push(point);

    metrics::inc_ticks_received();
    metrics::record_tick_latency(start);
}
