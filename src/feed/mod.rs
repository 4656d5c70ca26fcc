//! Price feed: live adapter, shared handles, and test mock.

pub mod adapter;
pub mod mock;
pub mod types;

pub use adapter::{FeedConfig, PriceFeed, ReconnectPolicy};
pub use mock::MockFeed;
pub use types::{PriceHistory, PricePoint, SharedPrice, TradeEvent};
