//! Application configuration loaded from environment variables.

use rust_decimal::Decimal;
use serde::Deserialize;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // === Price Feed ===
    /// WebSocket base URL for the trade stream.
    #[serde(default = "default_feed_ws_url")]
    pub feed_ws_url: String,

    /// REST base URL for historical backfill.
    #[serde(default = "default_feed_rest_url")]
    pub feed_rest_url: String,

    /// Trading symbol (lowercase, e.g. btcusdt).
    #[serde(default = "default_symbol")]
    pub feed_symbol: String,

    /// Number of historical points to backfill before streaming.
    #[serde(default = "default_backfill_points")]
    pub backfill_points: usize,

    /// Price history ring-buffer capacity.
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,

    // === Wager Parameters ===
    /// Delay between placement and settlement, in milliseconds.
    #[serde(default = "default_settlement_delay_ms")]
    pub settlement_delay_ms: u64,

    /// Countdown ticker period for UI display, in milliseconds.
    #[serde(default = "default_countdown_tick_ms")]
    pub countdown_tick_ms: u64,

    /// Payout multiplier on a winning wager (> 1).
    #[serde(default = "default_win_multiplier")]
    pub win_multiplier: Decimal,

    /// Refund multiplier on a tied wager (0 < x < 1).
    #[serde(default = "default_tie_multiplier")]
    pub tie_multiplier: Decimal,

    /// Price delta below which a settlement is scored as a tie.
    #[serde(default = "default_price_tolerance")]
    pub price_tolerance: Decimal,

    /// Starting balance for a fresh session.
    #[serde(default = "default_starting_balance")]
    pub starting_balance: Decimal,

    // === Session Persistence ===
    /// Directory for the JSON session store.
    #[serde(default = "default_store_dir")]
    pub session_store_dir: String,

    /// Days before a stored session expires.
    #[serde(default = "default_retention_days")]
    pub session_retention_days: u64,

    // === Server Configuration ===
    /// HTTP server port for the engine API.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub rust_log: String,
}

fn default_feed_ws_url() -> String {
    "wss://stream.binance.com:9443/ws".to_string()
}

fn default_feed_rest_url() -> String {
    "https://api.binance.com".to_string()
}

fn default_symbol() -> String {
    "btcusdt".to_string()
}

fn default_backfill_points() -> usize {
    60
}

fn default_history_capacity() -> usize {
    1000
}

fn default_settlement_delay_ms() -> u64 {
    3000
}

fn default_countdown_tick_ms() -> u64 {
    100
}

fn default_win_multiplier() -> Decimal {
    Decimal::new(19, 1) // 1.9
}

fn default_tie_multiplier() -> Decimal {
    Decimal::new(9, 1) // 0.9
}

fn default_price_tolerance() -> Decimal {
    Decimal::new(1, 2) // 0.01
}

fn default_starting_balance() -> Decimal {
    Decimal::new(1000, 0)
}

fn default_store_dir() -> String {
    ".pulsebet".to_string()
}

fn default_retention_days() -> u64 {
    7
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from environment, reading .env file first.
    pub fn load() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    /// Check if the configuration is valid.
    pub fn validate(&self) -> Result<(), String> {
        if url::Url::parse(&self.feed_ws_url).is_err() {
            return Err(format!("FEED_WS_URL is not a valid URL: {}", self.feed_ws_url));
        }

        if url::Url::parse(&self.feed_rest_url).is_err() {
            return Err(format!(
                "FEED_REST_URL is not a valid URL: {}",
                self.feed_rest_url
            ));
        }

        if self.feed_symbol.is_empty() {
            return Err("FEED_SYMBOL must not be empty".to_string());
        }

        if self.win_multiplier <= Decimal::ONE {
            return Err("WIN_MULTIPLIER must be greater than 1.0".to_string());
        }

        if self.tie_multiplier <= Decimal::ZERO || self.tie_multiplier >= Decimal::ONE {
            return Err("TIE_MULTIPLIER must be between 0 and 1".to_string());
        }

        if self.price_tolerance < Decimal::ZERO {
            return Err("PRICE_TOLERANCE must be non-negative".to_string());
        }

        if self.starting_balance <= Decimal::ZERO {
            return Err("STARTING_BALANCE must be positive".to_string());
        }

        if self.backfill_points > self.history_capacity {
            return Err("BACKFILL_POINTS must not exceed HISTORY_CAPACITY".to_string());
        }

        if self.settlement_delay_ms <= self.countdown_tick_ms {
            return Err("SETTLEMENT_DELAY_MS must exceed COUNTDOWN_TICK_MS".to_string());
        }

        Ok(())
    }

    /// Stream endpoint for the configured symbol.
    pub fn trade_stream_url(&self) -> String {
        format!(
            "{}/{}@trade",
            self.feed_ws_url.trim_end_matches('/'),
            self.feed_symbol
        )
    }

    /// Kline endpoint used for backfill.
    pub fn kline_url(&self) -> String {
        format!("{}/api/v3/klines", self.feed_rest_url.trim_end_matches('/'))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            feed_ws_url: default_feed_ws_url(),
            feed_rest_url: default_feed_rest_url(),
            feed_symbol: default_symbol(),
            backfill_points: default_backfill_points(),
            history_capacity: default_history_capacity(),
            settlement_delay_ms: default_settlement_delay_ms(),
            countdown_tick_ms: default_countdown_tick_ms(),
            win_multiplier: default_win_multiplier(),
            tie_multiplier: default_tie_multiplier(),
            price_tolerance: default_price_tolerance(),
            starting_balance: default_starting_balance(),
            session_store_dir: default_store_dir(),
            session_retention_days: default_retention_days(),
            port: default_port(),
            rust_log: default_log_level(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values_are_sensible() {
        assert_eq!(default_win_multiplier(), Decimal::new(19, 1));
        assert_eq!(default_tie_multiplier(), Decimal::new(9, 1));
        assert_eq!(default_price_tolerance(), Decimal::new(1, 2));
        assert_eq!(default_settlement_delay_ms(), 3000);
        assert_eq!(default_backfill_points(), 60);
    }

    #[test]
    fn default_config_validates() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_win_multiplier_at_or_below_one() {
        let config = Config {
            win_multiplier: Decimal::ONE,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_tie_multiplier_outside_unit_interval() {
        let config = Config {
            tie_multiplier: Decimal::new(11, 1), // 1.1
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_backfill_beyond_capacity() {
        let config = Config {
            backfill_points: 2000,
            history_capacity: 1000,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_malformed_feed_url() {
        let config = Config {
            feed_ws_url: "not a url".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn trade_stream_url_appends_symbol() {
        let config = Config::default();
        assert_eq!(
            config.trade_stream_url(),
            "wss://stream.binance.com:9443/ws/btcusdt@trade"
        );
    }
}
