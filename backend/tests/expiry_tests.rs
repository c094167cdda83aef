//! Expiry sweeper and low-stock watcher tests
//!
//! Covers the two daily passes and the read-side watcher:
//! - the write-off sweep zeroes expired batches exactly once and records
//!   one `expired` movement per batch; re-running is a no-op
//! - one failing batch never blocks the rest of the sweep
//! - the warning pass selects batches inside the horizon without touching
//!   the ledger
//! - the low-stock check fires at the threshold and only for positive
//!   thresholds

use chrono::{Duration, NaiveDate};
use proptest::prelude::*;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;
use uuid::Uuid;

use shared::models::{BatchKey, MovementType};

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Simulated stock store with the sweep and warning passes
#[derive(Debug, Clone, Default)]
struct SweepSim {
    stocks: HashMap<BatchKey, Decimal>,
    movements: Vec<(BatchKey, Decimal, MovementType)>,
    /// Batch keys whose write-off fails (simulated storage error)
    failing: Vec<BatchKey>,
}

/// Outcome of one sweep
#[derive(Debug, PartialEq, Eq)]
struct SweepOutcome {
    processed: u32,
    failed: u32,
}

impl SweepSim {
    fn new() -> Self {
        Self::default()
    }

    fn seed(&mut self, key: BatchKey, quantity: Decimal) {
        self.stocks.insert(key, quantity);
        self.movements
            .push((key, quantity, MovementType::OpeningStock));
    }

    /// Write-off pass: zero every expired batch through the ledger, one
    /// batch per atomic unit; failures skip to the next batch
    fn process_expired(&mut self, today: NaiveDate) -> SweepOutcome {
        let expired: Vec<(BatchKey, Decimal)> = self
            .stocks
            .iter()
            .filter(|(key, quantity)| {
                key.expiry_date.is_some_and(|d| d < today) && **quantity > Decimal::ZERO
            })
            .map(|(key, quantity)| (*key, *quantity))
            .collect();

        let mut outcome = SweepOutcome {
            processed: 0,
            failed: 0,
        };
        for (key, quantity) in expired {
            if self.failing.contains(&key) {
                // Log-and-continue: this batch stays for the next sweep
                outcome.failed += 1;
                continue;
            }
            self.stocks.insert(key, Decimal::ZERO);
            self.movements.push((key, -quantity, MovementType::Expired));
            outcome.processed += 1;
        }
        outcome
    }

    /// Warning pass: batches expiring within the horizon, stock on hand,
    /// not yet expired. Read-only.
    fn expiring_within(&self, today: NaiveDate, horizon_days: i64) -> Vec<BatchKey> {
        let limit = today + Duration::days(horizon_days);
        self.stocks
            .iter()
            .filter(|(key, quantity)| {
                key.expiry_date
                    .is_some_and(|d| d >= today && d <= limit)
                    && **quantity > Decimal::ZERO
            })
            .map(|(key, _)| *key)
            .collect()
    }

    fn invariant_holds(&self) -> bool {
        let mut sums: HashMap<BatchKey, Decimal> = HashMap::new();
        for (key, quantity, _) in &self.movements {
            *sums.entry(*key).or_insert(Decimal::ZERO) += *quantity;
        }
        self.stocks
            .iter()
            .all(|(key, stock)| sums.get(key).copied().unwrap_or(Decimal::ZERO) == *stock)
    }
}

/// The low-stock watcher predicate: fires at or below a positive threshold
fn low_stock_triggered(total: Decimal, min_stock: Decimal) -> bool {
    min_stock > Decimal::ZERO && total <= min_stock
}

fn dated_batch(expiry: NaiveDate) -> BatchKey {
    BatchKey::new(Uuid::new_v4(), Uuid::new_v4(), Some(expiry))
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Sweep scenario: a batch expired yesterday with quantity 5 is zeroed
    /// with one -5 `expired` movement; the immediate re-run is a no-op
    #[test]
    fn test_sweep_zeroes_once_and_rerun_is_noop() {
        let today = date(2026, 8, 7);
        let key = dated_batch(today - Duration::days(1));

        let mut sim = SweepSim::new();
        sim.seed(key, dec("5"));

        let first = sim.process_expired(today);
        assert_eq!(first.processed, 1);
        assert_eq!(sim.stocks[&key], Decimal::ZERO);

        let expired_movements: Vec<_> = sim
            .movements
            .iter()
            .filter(|(_, _, t)| *t == MovementType::Expired)
            .collect();
        assert_eq!(expired_movements.len(), 1);
        assert_eq!(expired_movements[0].1, dec("-5"));

        // Quantity is now 0, so the scan excludes the batch
        let second = sim.process_expired(today);
        assert_eq!(second.processed, 0);
        assert_eq!(
            sim.movements
                .iter()
                .filter(|(_, _, t)| *t == MovementType::Expired)
                .count(),
            1
        );
        assert!(sim.invariant_holds());
    }

    /// Batches expiring today are not yet expired; only strictly-past
    /// dates are written off
    #[test]
    fn test_today_is_not_expired() {
        let today = date(2026, 8, 7);
        let key = dated_batch(today);

        let mut sim = SweepSim::new();
        sim.seed(key, dec("3"));

        let outcome = sim.process_expired(today);
        assert_eq!(outcome.processed, 0);
        assert_eq!(sim.stocks[&key], dec("3"));
    }

    /// Non-expiring batches are never swept
    #[test]
    fn test_undated_batches_never_swept() {
        let today = date(2026, 8, 7);
        let key = BatchKey::new(Uuid::new_v4(), Uuid::new_v4(), None);

        let mut sim = SweepSim::new();
        sim.seed(key, dec("9"));

        let outcome = sim.process_expired(today);
        assert_eq!(outcome.processed, 0);
        assert_eq!(sim.stocks[&key], dec("9"));
    }

    /// One failing batch is skipped; the rest are still processed
    #[test]
    fn test_failing_batch_does_not_block_others() {
        let today = date(2026, 8, 7);
        let yesterday = today - Duration::days(1);
        let keys = [
            dated_batch(yesterday),
            dated_batch(yesterday),
            dated_batch(yesterday),
        ];

        let mut sim = SweepSim::new();
        for key in &keys {
            sim.seed(*key, dec("4"));
        }
        sim.failing.push(keys[1]);

        let outcome = sim.process_expired(today);
        assert_eq!(outcome.processed, 2);
        assert_eq!(outcome.failed, 1);

        assert_eq!(sim.stocks[&keys[0]], Decimal::ZERO);
        assert_eq!(sim.stocks[&keys[1]], dec("4"));
        assert_eq!(sim.stocks[&keys[2]], Decimal::ZERO);

        // The failed batch is picked up by a later sweep
        sim.failing.clear();
        let retry = sim.process_expired(today);
        assert_eq!(retry.processed, 1);
        assert_eq!(sim.stocks[&keys[1]], Decimal::ZERO);
        assert!(sim.invariant_holds());
    }

    /// Warning horizon: inside the window in, outside out, empty batches
    /// ignored, ledger untouched
    #[test]
    fn test_warning_pass_selection() {
        let today = date(2026, 8, 7);
        let in_window = dated_batch(today + Duration::days(10));
        let at_edge = dated_batch(today + Duration::days(30));
        let beyond = dated_batch(today + Duration::days(31));
        let empty = dated_batch(today + Duration::days(5));
        let already_expired = dated_batch(today - Duration::days(1));

        let mut sim = SweepSim::new();
        sim.seed(in_window, dec("5"));
        sim.seed(at_edge, dec("5"));
        sim.seed(beyond, dec("5"));
        sim.seed(empty, Decimal::ZERO);
        sim.seed(already_expired, dec("5"));

        let movements_before = sim.movements.len();
        let selected = sim.expiring_within(today, 30);

        assert!(selected.contains(&in_window));
        assert!(selected.contains(&at_edge));
        assert!(!selected.contains(&beyond));
        assert!(!selected.contains(&empty));
        // Already-expired batches belong to the write-off pass instead
        assert!(!selected.contains(&already_expired));

        // Read-only: no movements were appended
        assert_eq!(sim.movements.len(), movements_before);
    }

    /// Low-stock check fires at the threshold, not only below it
    #[test]
    fn test_low_stock_at_threshold() {
        assert!(low_stock_triggered(dec("5"), dec("5")));
        assert!(low_stock_triggered(dec("4.99"), dec("5")));
        assert!(!low_stock_triggered(dec("5.01"), dec("5")));
    }

    /// A zero threshold disables the alert entirely
    #[test]
    fn test_zero_threshold_disables_alert() {
        assert!(!low_stock_triggered(dec("0"), dec("0")));
        assert!(!low_stock_triggered(dec("100"), dec("0")));
    }

    /// The check is a pure read: calling it repeatedly gives the same
    /// answer for the same stock level
    #[test]
    fn test_low_stock_check_is_idempotent() {
        let total = dec("3");
        let threshold = dec("5");
        let first = low_stock_triggered(total, threshold);
        for _ in 0..10 {
            assert_eq!(low_stock_triggered(total, threshold), first);
        }
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn quantity_strategy() -> impl Strategy<Value = Decimal> {
        (1i64..=10000i64).prop_map(|n| Decimal::new(n, 2))
    }

    /// Offsets in days relative to today, spanning past and future
    fn offset_strategy() -> impl Strategy<Value = i64> {
        -60i64..60
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// After a sweep, no batch with a past expiry date has stock left,
        /// and the invariant holds
        #[test]
        fn prop_sweep_clears_all_expired(
            batches in prop::collection::vec((offset_strategy(), quantity_strategy()), 1..20)
        ) {
            let today = date(2026, 8, 7);
            let mut sim = SweepSim::new();
            for (offset, quantity) in &batches {
                sim.seed(dated_batch(today + Duration::days(*offset)), *quantity);
            }

            sim.process_expired(today);

            for (key, quantity) in &sim.stocks {
                if key.expiry_date.is_some_and(|d| d < today) {
                    prop_assert_eq!(*quantity, Decimal::ZERO);
                }
            }
            prop_assert!(sim.invariant_holds());
        }

        /// Sweeping twice is the same as sweeping once
        #[test]
        fn prop_sweep_is_idempotent(
            batches in prop::collection::vec((offset_strategy(), quantity_strategy()), 1..20)
        ) {
            let today = date(2026, 8, 7);
            let mut sim = SweepSim::new();
            for (offset, quantity) in &batches {
                sim.seed(dated_batch(today + Duration::days(*offset)), *quantity);
            }

            sim.process_expired(today);
            let stocks_after_first = sim.stocks.clone();
            let movements_after_first = sim.movements.len();

            let second = sim.process_expired(today);

            prop_assert_eq!(second.processed, 0);
            prop_assert_eq!(&sim.stocks, &stocks_after_first);
            prop_assert_eq!(sim.movements.len(), movements_after_first);
        }

        /// The warning pass and the write-off pass never select the same
        /// batch
        #[test]
        fn prop_warning_and_writeoff_are_disjoint(
            batches in prop::collection::vec((offset_strategy(), quantity_strategy()), 1..20),
            horizon in 1i64..60
        ) {
            let today = date(2026, 8, 7);
            let mut sim = SweepSim::new();
            for (offset, quantity) in &batches {
                sim.seed(dated_batch(today + Duration::days(*offset)), *quantity);
            }

            let warned = sim.expiring_within(today, horizon);
            let mut write_off_sim = sim.clone();
            let outcome = write_off_sim.process_expired(today);

            // Every warned batch still has its stock after the write-off
            for key in &warned {
                prop_assert_eq!(write_off_sim.stocks[key], sim.stocks[key]);
            }
            // Processed batches are exactly the expired non-empty ones
            let expired_count = sim
                .stocks
                .iter()
                .filter(|(key, quantity)| {
                    key.expiry_date.is_some_and(|d| d < today) && **quantity > Decimal::ZERO
                })
                .count() as u32;
            prop_assert_eq!(outcome.processed, expired_count);
        }
    }
}
