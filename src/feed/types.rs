//! Price feed types and wire-format parsing.

use std::collections::VecDeque;
use std::sync::{Arc, RwLock};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::FeedError;
use crate::utils::format_clock;

/// A single normalized price observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricePoint {
    /// HH:MM:SS display string for chart axes.
    pub time: String,
    /// Event time in epoch milliseconds.
    pub timestamp: i64,
    /// Trade price.
    pub price: Decimal,
}

impl PricePoint {
    /// Create a point from a price and its epoch-millisecond timestamp.
    pub fn new(price: Decimal, timestamp: i64) -> Self {
        Self {
            time: format_clock(timestamp),
            timestamp,
            price,
        }
    }
}

/// Inbound trade event from the upstream stream.
///
/// Only `price` and `trade_time` are consumed; the rest is carried for
/// message validation.
#[derive(Debug, Clone, Deserialize)]
pub struct TradeEvent {
    /// Event type, "trade" for this stream.
    #[serde(rename = "e")]
    pub event_type: String,
    /// Event time in epoch milliseconds.
    #[serde(rename = "E")]
    pub event_time: i64,
    /// Symbol, e.g. "BTCUSDT".
    #[serde(rename = "s")]
    pub symbol: String,
    /// Trade price as a string.
    #[serde(rename = "p")]
    pub price: String,
    /// Trade quantity as a string.
    #[serde(rename = "q")]
    pub quantity: String,
    /// Trade time in epoch milliseconds.
    #[serde(rename = "T")]
    pub trade_time: i64,
    /// Whether the buyer was the maker.
    #[serde(rename = "m")]
    pub is_buyer_maker: bool,
}

impl TradeEvent {
    /// Parse a raw stream message into a trade event.
    pub fn parse(text: &str) -> Result<Self, FeedError> {
        let event: TradeEvent =
            serde_json::from_str(text).map_err(|e| FeedError::ParseError(e.to_string()))?;

        if event.event_type != "trade" {
            return Err(FeedError::ParseError(format!(
                "unexpected event type: {}",
                event.event_type
            )));
        }

        Ok(event)
    }

    /// Normalize into a price point.
    pub fn to_price_point(&self) -> Result<PricePoint, FeedError> {
        let price: Decimal = self
            .price
            .parse()
            .map_err(|_| FeedError::ParseError(format!("bad price: {}", self.price)))?;

        Ok(PricePoint::new(price, self.trade_time))
    }
}

/// Parse a kline response body into price points, oldest first.
///
/// Klines arrive as positional arrays; the close price sits at index 4
/// (string) and the close time at index 6 (epoch ms). Rows that fail to
/// parse are skipped.
pub fn parse_kline_rows(body: &serde_json::Value) -> Vec<PricePoint> {
    let Some(rows) = body.as_array() else {
        return Vec::new();
    };

    rows.iter()
        .filter_map(|row| {
            let cells = row.as_array()?;
            let close: Decimal = cells.get(4)?.as_str()?.parse().ok()?;
            let close_time = cells.get(6)?.as_i64()?;
            Some(PricePoint::new(close, close_time))
        })
        .collect()
}

/// The single mutable "current price" slot.
///
/// Written in place by the feed adapter per tick and read synchronously by
/// the settlement routine and renderers, so a delayed callback always
/// observes the freshest value rather than one captured at schedule time.
#[derive(Debug, Clone, Default)]
pub struct SharedPrice {
    slot: Arc<RwLock<Option<PricePoint>>>,
}

impl SharedPrice {
    /// Create an empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current price.
    pub fn publish(&self, point: PricePoint) {
        if let Ok(mut slot) = self.slot.write() {
            *slot = Some(point);
        }
    }

    /// Read the latest price, if any tick has arrived.
    pub fn latest(&self) -> Option<PricePoint> {
        self.slot.read().ok().and_then(|slot| slot.clone())
    }
}

/// Bounded recent-price buffer with ring semantics: oldest evicted first.
#[derive(Debug, Clone)]
pub struct PriceHistory {
    buf: Arc<RwLock<VecDeque<PricePoint>>>,
    capacity: usize,
}

impl PriceHistory {
    /// Create a buffer with the given capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: Arc::new(RwLock::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    /// Append a point, evicting the oldest past capacity.
    pub fn push(&self, point: PricePoint) {
        if let Ok(mut buf) = self.buf.write() {
            buf.push_back(point);
            while buf.len() > self.capacity {
                buf.pop_front();
            }
        }
    }

    /// Append many points, oldest first.
    pub fn extend(&self, points: impl IntoIterator<Item = PricePoint>) {
        for point in points {
            self.push(point);
        }
    }

    /// Copy out the buffer contents, oldest first.
    pub fn snapshot(&self) -> Vec<PricePoint> {
        self.buf
            .read()
            .map(|buf| buf.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of retained points.
    pub fn len(&self) -> usize {
        self.buf.read().map(|buf| buf.len()).unwrap_or(0)
    }

    /// Whether the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Configured capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const TRADE_JSON: &str = r#"{
        "e": "trade", "E": 1700000000100, "s": "BTCUSDT",
        "p": "60000.50", "q": "0.012", "T": 1700000000099, "m": false
    }"#;

    #[test]
    fn trade_event_parses_and_normalizes() {
        let event = TradeEvent::parse(TRADE_JSON).unwrap();
        assert_eq!(event.symbol, "BTCUSDT");

        let point = event.to_price_point().unwrap();
        assert_eq!(point.price, dec!(60000.50));
        assert_eq!(point.timestamp, 1700000000099);
    }

    #[test]
    fn trade_event_rejects_wrong_event_type() {
        let json = TRADE_JSON.replace("\"trade\"", "\"kline\"");
        assert!(TradeEvent::parse(&json).is_err());
    }

    #[test]
    fn trade_event_rejects_malformed_json() {
        assert!(TradeEvent::parse("{not json").is_err());
    }

    #[test]
    fn trade_event_rejects_unparsable_price() {
        let json = TRADE_JSON.replace("60000.50", "sixty-thousand");
        let event = TradeEvent::parse(&json).unwrap();
        assert!(event.to_price_point().is_err());
    }

    #[test]
    fn kline_rows_parse_close_price_and_time() {
        let body: serde_json::Value = serde_json::json!([
            [1700000000000i64, "59990.0", "60010.0", "59980.0", "60000.00", "12.5",
             1700000000999i64, "750000.0", 100, "6.2", "372000.0", "0"],
            [1700000001000i64, "60000.0", "60020.0", "59995.0", "60010.00", "11.0",
             1700000001999i64, "660000.0", 90, "5.5", "330000.0", "0"]
        ]);

        let points = parse_kline_rows(&body);
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].price, dec!(60000.00));
        assert_eq!(points[0].timestamp, 1700000000999);
        assert_eq!(points[1].price, dec!(60010.00));
    }

    #[test]
    fn kline_rows_skip_malformed_entries() {
        let body: serde_json::Value = serde_json::json!([
            ["bad row"],
            [1700000001000i64, "60000.0", "60020.0", "59995.0", "60010.00", "11.0",
             1700000001999i64, "660000.0", 90, "5.5", "330000.0", "0"]
        ]);

        let points = parse_kline_rows(&body);
        assert_eq!(points.len(), 1);
    }

    #[test]
    fn shared_price_publishes_latest() {
        let shared = SharedPrice::new();
        assert!(shared.latest().is_none());

        shared.publish(PricePoint::new(dec!(60000), 1));
        shared.publish(PricePoint::new(dec!(60050), 2));

        let latest = shared.latest().unwrap();
        assert_eq!(latest.price, dec!(60050));
    }

    #[test]
    fn history_evicts_oldest_at_capacity() {
        let history = PriceHistory::new(3);
        for i in 0..5 {
            history.push(PricePoint::new(Decimal::from(i), i));
        }

        let snapshot = history.snapshot();
        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot[0].timestamp, 2);
        assert_eq!(snapshot[2].timestamp, 4);
    }

    #[test]
    fn price_point_carries_display_time() {
        let point = PricePoint::new(dec!(1), 1_704_112_496_000);
        assert_eq!(point.time, "12:34:56");
    }
}
