//! Mock price feed for unit testing.
//!
//! Exposes the same handles as the live adapter so the wager manager and
//! API can be driven deterministically without a network connection.

use rust_decimal::Decimal;
use tokio::sync::watch;

use super::types::{PriceHistory, PricePoint, SharedPrice};

/// Scripted price feed. Tests push ticks and flip connectivity directly.
#[derive(Debug)]
pub struct MockFeed {
    price: SharedPrice,
    history: PriceHistory,
    connected_tx: watch::Sender<bool>,
}

impl MockFeed {
    /// Create a disconnected mock feed with the given history capacity.
    pub fn new(history_capacity: usize) -> Self {
        let (connected_tx, _) = watch::channel(false);
        Self {
            price: SharedPrice::new(),
            history: PriceHistory::new(history_capacity),
            connected_tx,
        }
    }

    /// Create a connected mock feed, the common test fixture.
    pub fn connected(history_capacity: usize) -> Self {
        let feed = Self::new(history_capacity);
        feed.set_connected(true);
        feed
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

    /// Whether the mock is "connected".
    pub fn is_connected(&self) -> bool {
        *self.connected_tx.borrow()
    }

    /// Flip the connectivity flag, notifying subscribers.
    pub fn set_connected(&self, connected: bool) {
        self.connected_tx.send_replace(connected);
    }

    /// Deliver a tick at the given timestamp.
    pub fn push_price_at(&self, price: Decimal, timestamp_ms: i64) {
        let point = PricePoint::new(price, timestamp_ms);
        self.price.publish(point.clone());
        self.history.push(point);
    }

    /// Deliver a tick stamped with the current wall clock.
    pub fn push_price(&self, price: Decimal) {
        self.push_price_at(price, crate::utils::now_ms());
    }
}

impl Default for MockFeed {
    fn default() -> Self {
        Self::new(1000)
    }
}
