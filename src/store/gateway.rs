//! Session persistence gateway.
//!
//! Mirrors the ledger into durable storage behind a versioned envelope.
//! Persistence is best-effort in both directions: saves never propagate
//! failures, and any unreadable, expired, invalid, or version-mismatched
//! record degrades to "no saved state" with the storage cleared.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::kv::StateStore;
use crate::utils::now_ms;
use crate::wager::SessionLedger;

/// Envelope schema version. Bump on breaking ledger changes; old records
/// are discarded rather than migrated.
pub const SCHEMA_VERSION: u32 = 1;

/// Storage key for the session record.
pub const SESSION_KEY: &str = "session";

/// Stored wrapper around a ledger snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredSession {
    state: SessionLedger,
    timestamp: i64,
    version: u32,
}

/// Reads and writes ledger snapshots; never mutates a live ledger.
pub struct SessionGateway {
    store: Box<dyn StateStore>,
    retention_ms: i64,
}

impl SessionGateway {
    /// Create a gateway over the given store with a retention window.
    pub fn new(store: Box<dyn StateStore>, retention_days: u64) -> Self {
        Self {
            store,
            retention_ms: retention_days as i64 * 24 * 60 * 60 * 1000,
        }
    }

    /// Persist a ledger snapshot. Best-effort: failures are logged and
    /// swallowed, a fresh session is always a valid fallback.
    pub fn save(&self, ledger: &SessionLedger) {
        let record = StoredSession {
            state: ledger.clone(),
            timestamp: now_ms(),
            version: SCHEMA_VERSION,
        };

        let payload = match serde_json::to_string(&record) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "Failed to serialize session record");
                return;
            }
        };

        if let Err(e) = self.store.set(SESSION_KEY, &payload) {
            warn!(error = %e, "Failed to persist session record");
        }
    }

    /// Load the stored ledger, or `None` when absent, expired, corrupt,
    /// or from a different schema version. Every rejection clears the
    /// store. A resumed ledger never carries an active wager: its
    /// settlement price context no longer exists.
    pub fn load(&self) -> Option<SessionLedger> {
        self.load_at(now_ms())
    }

    /// Delete the stored record. Called once a session's lifecycle ends,
    /// e.g. after its stats are attached to a signup payload.
    pub fn clear(&self) {
        if let Err(e) = self.store.remove(SESSION_KEY) {
            warn!(error = %e, "Failed to clear session record");
        }
    }

    fn load_at(&self, now: i64) -> Option<SessionLedger> {
        let payload = match self.store.get(SESSION_KEY) {
            Ok(Some(payload)) => payload,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, "Failed to read session record");
                return None;
            }
        };

        let record: StoredSession = match serde_json::from_str(&payload) {
            Ok(record) => record,
            Err(e) => {
                warn!(error = %e, "Discarding corrupt session record");
                self.clear();
                return None;
            }
        };

        if record.version != SCHEMA_VERSION {
            info!(
                stored = record.version,
                current = SCHEMA_VERSION,
                "Discarding session record from different schema version"
            );
            self.clear();
            return None;
        }

        if now.saturating_sub(record.timestamp) > self.retention_ms {
            info!("Discarding expired session record");
            self.clear();
            return None;
        }

        let mut ledger = record.state;
        if !ledger.is_structurally_valid() {
            warn!("Discarding structurally invalid session record");
            self.clear();
            return None;
        }

        if let Some(stale) = ledger.active_wager.take() {
            info!(wager_id = %stale.id, "Dropping in-flight wager from previous session");
        }

        Some(ledger)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::kv::MemoryStore;
    use crate::wager::{Direction, Outcome, Stake, Wager};
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    const DAY_MS: i64 = 24 * 60 * 60 * 1000;

    fn gateway() -> SessionGateway {
        SessionGateway::new(Box::new(MemoryStore::new()), 7)
    }

    fn sample_ledger() -> SessionLedger {
        let mut ledger = SessionLedger::new(dec!(1000), 0);
        let mut wager = Wager::new(Direction::Up, Stake::Hundred, dec!(60000), 1);
        wager.settle(dec!(60050), 3001, Outcome::Win, dec!(90));
        ledger.balance = dec!(1090);
        ledger.record_settlement(wager);
        ledger
    }

    #[test]
    fn load_on_empty_store_is_none() {
        assert!(gateway().load().is_none());
    }

    #[test]
    fn round_trip_preserves_ledger() {
        let gw = gateway();
        let ledger = sample_ledger();

        gw.save(&ledger);
        let loaded = gw.load().unwrap();

        assert_eq!(loaded, ledger);
    }

    #[test]
    fn round_trip_strips_active_wager() {
        let gw = gateway();
        let mut ledger = sample_ledger();
        ledger.balance = dec!(1040);
        ledger.active_wager = Some(Wager::new(Direction::Down, Stake::Fifty, dec!(60100), 5));

        gw.save(&ledger);
        let loaded = gw.load().unwrap();

        assert!(loaded.active_wager.is_none());
        // Everything else is untouched, including the escrowed balance.
        let mut expected = ledger.clone();
        expected.active_wager = None;
        assert_eq!(loaded, expected);
    }

    #[test]
    fn expired_record_is_discarded_and_cleared() {
        let store = MemoryStore::new();
        let record = StoredSession {
            state: sample_ledger(),
            timestamp: 1_000,
            version: SCHEMA_VERSION,
        };
        store
            .set(SESSION_KEY, &serde_json::to_string(&record).unwrap())
            .unwrap();

        let gw = SessionGateway::new(Box::new(store), 7);
        assert!(gw.load_at(1_000 + 8 * DAY_MS).is_none());
        // A second load sees nothing: the record was proactively deleted.
        assert!(gw.load_at(1_000 + 8 * DAY_MS).is_none());
    }

    #[test]
    fn record_within_retention_survives() {
        let store = MemoryStore::new();
        let record = StoredSession {
            state: sample_ledger(),
            timestamp: 1_000,
            version: SCHEMA_VERSION,
        };
        store
            .set(SESSION_KEY, &serde_json::to_string(&record).unwrap())
            .unwrap();

        let gw = SessionGateway::new(Box::new(store), 7);
        assert!(gw.load_at(1_000 + 6 * DAY_MS).is_some());
    }

    #[test]
    fn corrupt_payload_is_discarded_and_cleared() {
        let store = MemoryStore::new();
        store.set(SESSION_KEY, "{not valid json").unwrap();

        let gw = SessionGateway::new(Box::new(store), 7);
        assert!(gw.load().is_none());
        assert!(gw.load().is_none());
    }

    #[test]
    fn wrong_schema_version_is_discarded() {
        let store = MemoryStore::new();
        let record = StoredSession {
            state: sample_ledger(),
            timestamp: now_ms(),
            version: SCHEMA_VERSION + 1,
        };
        store
            .set(SESSION_KEY, &serde_json::to_string(&record).unwrap())
            .unwrap();

        let gw = SessionGateway::new(Box::new(store), 7);
        assert!(gw.load().is_none());
    }

    #[test]
    fn structurally_invalid_ledger_is_discarded() {
        let store = MemoryStore::new();
        let mut bad = sample_ledger();
        bad.wins = 10; // wins > total_wagers
        let record = StoredSession {
            state: bad,
            timestamp: now_ms(),
            version: SCHEMA_VERSION,
        };
        store
            .set(SESSION_KEY, &serde_json::to_string(&record).unwrap())
            .unwrap();

        let gw = SessionGateway::new(Box::new(store), 7);
        assert!(gw.load().is_none());
    }

    #[test]
    fn clear_removes_the_record() {
        let gw = gateway();
        gw.save(&sample_ledger());
        assert!(gw.load().is_some());

        gw.clear();
        assert!(gw.load().is_none());
    }
}
