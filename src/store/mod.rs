//! Durable session persistence: key-value seam plus the ledger gateway.

pub mod gateway;
pub mod kv;

pub use gateway::{SessionGateway, SCHEMA_VERSION, SESSION_KEY};
pub use kv::{FileStore, MemoryStore, StateStore};
