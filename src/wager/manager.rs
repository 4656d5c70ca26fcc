//! Wager lifecycle manager.
//!
//! Owns the single active-bet state machine and the session ledger.
//! Placement escrows the stake, arms a settlement timer plus a UI-only
//! countdown ticker, and settlement scores against whatever price is in
//! the shared slot *when the timer fires* — never a value captured at
//! placement. A feed disconnect while a wager is pending aborts and
//! refunds instead of settling.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant as StdInstant;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant};
use tracing::{info, warn};

use crate::config::Config;
use crate::error::WagerError;
use crate::feed::SharedPrice;
use crate::metrics;
use crate::settlement::{self, SettlementParams};
use crate::store::SessionGateway;
use crate::utils::now_ms;
use crate::wager::types::{Direction, SessionLedger, Stake, Wager};

/// Timing and payout parameters for the lifecycle manager.
#[derive(Debug, Clone)]
pub struct WagerConfig {
    /// Delay between placement and settlement.
    pub settlement_delay: Duration,
    /// Countdown ticker period. Display only; it never settles.
    pub countdown_tick: Duration,
    /// Outcome and payout parameters.
    pub params: SettlementParams,
}

impl WagerConfig {
    /// Derive wager settings from the application config.
    pub fn from_config(config: &Config) -> Self {
        Self {
            settlement_delay: Duration::from_millis(config.settlement_delay_ms),
            countdown_tick: Duration::from_millis(config.countdown_tick_ms),
            params: SettlementParams {
                win_multiplier: config.win_multiplier,
                tie_multiplier: config.tie_multiplier,
                price_tolerance: config.price_tolerance,
            },
        }
    }
}

impl Default for WagerConfig {
    fn default() -> Self {
        Self {
            settlement_delay: Duration::from_millis(3000),
            countdown_tick: Duration::from_millis(100),
            params: SettlementParams::default(),
        }
    }
}

/// Handles for the two tasks armed per wager.
struct BetTimers {
    settle: JoinHandle<()>,
    countdown: JoinHandle<()>,
}

struct ManagerInner {
    config: WagerConfig,
    ledger: Mutex<SessionLedger>,
    price: SharedPrice,
    connectivity: watch::Receiver<bool>,
    timers: Mutex<Option<BetTimers>>,
    remaining_ms: AtomicU64,
    snapshots: watch::Sender<SessionLedger>,
    gateway: Arc<SessionGateway>,
}

/// The single owner of the session ledger.
pub struct WagerManager {
    inner: Arc<ManagerInner>,
}

impl WagerManager {
    /// Create a manager over an initial ledger (fresh or resumed) and the
    /// feed's shared handles.
    pub fn new(
        config: WagerConfig,
        ledger: SessionLedger,
        price: SharedPrice,
        connectivity: watch::Receiver<bool>,
        gateway: Arc<SessionGateway>,
    ) -> Self {
        let (snapshots, _) = watch::channel(ledger.clone());

        Self {
            inner: Arc::new(ManagerInner {
                config,
                ledger: Mutex::new(ledger),
                price,
                connectivity,
                timers: Mutex::new(None),
                remaining_ms: AtomicU64::new(0),
                snapshots,
                gateway,
            }),
        }
    }

    /// Current ledger snapshot.
    pub fn snapshot(&self) -> SessionLedger {
        self.inner.ledger.lock().expect("ledger lock").clone()
    }

    /// Subscribe to ledger snapshots, sent after every mutation.
    pub fn subscribe(&self) -> watch::Receiver<SessionLedger> {
        self.inner.snapshots.subscribe()
    }

    /// Milliseconds until settlement of the active wager, if any.
    pub fn time_remaining_ms(&self) -> Option<u64> {
        let pending = self
            .inner
            .ledger
            .lock()
            .expect("ledger lock")
            .active_wager
            .is_some();
        pending.then(|| self.inner.remaining_ms.load(Ordering::SeqCst))
    }

    /// Place a directional bet against the current price.
    ///
    /// Rejections are synchronous and leave the ledger untouched: no
    /// price yet, feed disconnected, a wager already pending, or an
    /// insufficient balance. On success the stake is escrowed
    /// immediately, which is what makes rapid double-clicks safe.
    pub fn place_bet(&self, direction: Direction, stake: Stake) -> Result<Wager, WagerError> {
        let Some(point) = self.inner.price.latest() else {
            return Self::reject(WagerError::NoPrice);
        };

        if !*self.inner.connectivity.borrow() {
            return Self::reject(WagerError::FeedDisconnected);
        }

        let now = now_ms();
        let wager;
        let snapshot;
        {
            let mut ledger = self.inner.ledger.lock().expect("ledger lock");

            if ledger.active_wager.is_some() {
                return Self::reject(WagerError::WagerPending);
            }

            let required = stake.amount();
            if ledger.balance < required {
                return Self::reject(WagerError::InsufficientBalance {
                    required,
                    available: ledger.balance,
                });
            }

            ledger.balance -= required;
            wager = Wager::new(direction, stake, point.price, now);
            ledger.active_wager = Some(wager.clone());
            ledger.last_activity_ms = now;
            snapshot = ledger.clone();
        }

        self.inner.publish(snapshot);
        self.arm_timers(wager.id.clone());
        metrics::inc_wagers_placed();
        info!(
            wager_id = %wager.id,
            direction = %direction,
            stake = %stake.amount(),
            entry_price = %point.price,
            "Wager placed"
        );

        Ok(wager)
    }

    /// Release both timers. Idempotent; safe with no active wager. The
    /// pending wager, if any, stays in the persisted ledger and is
    /// stripped by the gateway on the next load.
    pub fn shutdown(&self) {
        self.inner.clear_timers();
        self.inner.remaining_ms.store(0, Ordering::SeqCst);
        let snapshot = self.snapshot();
        self.inner.gateway.save(&snapshot);
        info!("Wager manager shut down");
    }

    /// Final snapshot for the signup payload; ends the stored session.
    pub fn complete_session(&self) -> SessionLedger {
        let snapshot = self.snapshot();
        self.inner.gateway.clear();
        info!(
            balance = %snapshot.balance,
            win_rate = snapshot.win_rate,
            total_wagers = snapshot.total_wagers,
            "Session completed"
        );
        snapshot
    }

    fn reject(error: WagerError) -> Result<Wager, WagerError> {
        metrics::inc_placements_rejected();
        warn!(reason = %error, "Wager placement rejected");
        Err(error)
    }

    /// Arm the settlement timer and the countdown ticker for the active
    /// wager. The ticker only feeds the remaining-time readout; the
    /// `select!` in the settlement task is the single place a wager
    /// leaves the pending phase.
    fn arm_timers(&self, wager_id: String) {
        let deadline = Instant::now() + self.inner.config.settlement_delay;
        self.inner.remaining_ms.store(
            self.inner.config.settlement_delay.as_millis() as u64,
            Ordering::SeqCst,
        );

        let countdown = {
            let inner = self.inner.clone();
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(inner.config.countdown_tick);
                ticker.tick().await; // first tick is immediate
                loop {
                    ticker.tick().await;
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    inner
                        .remaining_ms
                        .store(remaining.as_millis() as u64, Ordering::SeqCst);
                    if remaining.is_zero() {
                        break;
                    }
                }
            })
        };

        let settle = {
            let inner = self.inner.clone();
            let mut connectivity = self.inner.connectivity.clone();
            tokio::spawn(async move {
                tokio::select! {
                    _ = tokio::time::sleep_until(deadline) => {
                        inner.settle_active();
                    }
                    // A closed channel means the feed itself is gone;
                    // treat it the same as a disconnect.
                    _ = connectivity.wait_for(|connected| !*connected) => {
                        inner.abort_active(&wager_id);
                    }
                }
            })
        };

        *self.inner.timers.lock().expect("timers lock") = Some(BetTimers { settle, countdown });
    }
}

impl ManagerInner {
    /// Broadcast a snapshot and mirror it to durable storage.
    fn publish(&self, snapshot: SessionLedger) {
        self.gateway.save(&snapshot);
        self.snapshots.send_replace(snapshot);
    }

    fn clear_timers(&self) {
        if let Some(timers) = self.timers.lock().expect("timers lock").take() {
            timers.settle.abort();
            timers.countdown.abort();
        }
    }

    /// Settlement routine. Reads the freshest price through the shared
    /// slot, applies the evaluator, and folds the result into the ledger
    /// as one read-modify-write transform.
    fn settle_active(&self) {
        let start = StdInstant::now();
        let now = now_ms();

        let snapshot = {
            let mut ledger = self.ledger.lock().expect("ledger lock");
            let Some(mut wager) = ledger.active_wager.take() else {
                return;
            };

            let Some(exit) = self.price.latest() else {
                // The slot is never cleared once set, so this only occurs
                // if settlement raced a teardown. Refund rather than
                // score against nothing.
                warn!(wager_id = %wager.id, "No price at settlement, refunding stake");
                ledger.balance += wager.stake.amount();
                ledger.last_activity_ms = now;
                let snapshot = ledger.clone();
                drop(ledger);
                self.finish_cycle(snapshot);
                return;
            };

            let stake_amount = wager.stake.amount();
            let outcome = settlement::evaluate(
                wager.direction,
                wager.entry_price,
                exit.price,
                self.config.params.price_tolerance,
            );
            let paid = settlement::payout(stake_amount, outcome, &self.config.params);

            wager.settle(exit.price, now, outcome, paid - stake_amount);
            ledger.balance += paid;
            ledger.record_settlement(wager.clone());
            ledger.last_activity_ms = now;

            info!(
                wager_id = %wager.id,
                outcome = %outcome,
                entry_price = %wager.entry_price,
                exit_price = %exit.price,
                payout = %paid,
                balance = %ledger.balance,
                "Wager settled"
            );

            ledger.clone()
        };

        self.finish_cycle(snapshot);
        metrics::inc_wagers_settled();
        metrics::record_settlement_latency(start);
    }

    /// Forced abort on disconnect: full refund, nothing recorded. The
    /// client can no longer trust the price it would settle against.
    fn abort_active(&self, wager_id: &str) {
        let now = now_ms();

        let snapshot = {
            let mut ledger = self.ledger.lock().expect("ledger lock");
            let Some(wager) = ledger.active_wager.take() else {
                return;
            };

            ledger.balance += wager.stake.amount();
            ledger.last_activity_ms = now;

            warn!(
                wager_id = %wager_id,
                refunded = %wager.stake.amount(),
                "Feed disconnected during wager, stake refunded"
            );

            ledger.clone()
        };

        self.finish_cycle(snapshot);
        metrics::inc_wagers_aborted();
    }

    /// Common tail of settlement and abort: timers down, countdown
    /// zeroed, snapshot out.
    fn finish_cycle(&self, snapshot: SessionLedger) {
        self.clear_timers();
        self.remaining_ms.store(0, Ordering::SeqCst);
        self.publish(snapshot);
    }
}

impl Drop for WagerManager {
    fn drop(&mut self) {
        self.inner.clear_timers();
    }
}
