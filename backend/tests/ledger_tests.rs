//! Stock ledger engine tests
//!
//! Covers the core ledger semantics:
//! - stock always equals the signed sum of its movements
//! - no sequence of movements drives a batch negative
//! - running balances are deterministic even with colliding timestamps
//! - batch keys treat "no expiry" as its own distinct batch

use chrono::NaiveDate;
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

/// One recorded movement in the simulated ledger
#[derive(Debug, Clone)]
struct SimMovement {
    key: BatchKey,
    quantity: Decimal,
    movement_type: MovementType,
    /// Coarse timestamp; several movements may share one
    timestamp: i64,
    /// Monotonic insertion order, the tie-break
    seq: u64,
}

/// In-memory model of the ledger engine: lock-check-write per batch,
/// append-only movement log
#[derive(Debug, Clone, Default)]
struct LedgerSim {
    stocks: HashMap<BatchKey, Decimal>,
    movements: Vec<SimMovement>,
    next_seq: u64,
    clock: i64,
}

impl LedgerSim {
    fn new() -> Self {
        Self::default()
    }

    /// Advance the coarse clock; movements applied at the same tick share
    /// a timestamp
    fn tick(&mut self) {
        self.clock += 1;
    }

    /// Apply one signed movement, enforcing the engine's rules
    fn apply(
        &mut self,
        key: BatchKey,
        quantity: Decimal,
        movement_type: MovementType,
    ) -> Result<Decimal, String> {
        if quantity.is_zero() {
            return Err("quantity must be non-zero".to_string());
        }

        // A missing record is only created for inbound deltas
        if quantity < Decimal::ZERO && !self.stocks.contains_key(&key) {
            return Err(format!("insufficient stock: requested {}, available 0", -quantity));
        }

        let current = *self.stocks.get(&key).unwrap_or(&Decimal::ZERO);
        let candidate = current + quantity;
        if candidate < Decimal::ZERO {
            return Err(format!(
                "insufficient stock: requested {}, available {}",
                -quantity, current
            ));
        }

        self.stocks.insert(key, candidate);
        self.next_seq += 1;
        self.movements.push(SimMovement {
            key,
            quantity,
            movement_type,
            timestamp: self.clock,
            seq: self.next_seq,
        });
        Ok(candidate)
    }

    /// Running balance for a product scope as of one movement, ordered by
    /// (timestamp, seq)
    fn balance_at(&self, product_id: Uuid, cutoff: &SimMovement) -> Decimal {
        self.movements
            .iter()
            .filter(|m| m.key.product_id == product_id)
            .filter(|m| {
                m.timestamp < cutoff.timestamp
                    || (m.timestamp == cutoff.timestamp && m.seq <= cutoff.seq)
            })
            .map(|m| m.quantity)
            .sum()
    }

    /// The central invariant: every batch's stock equals the signed sum of
    /// its movements
    fn invariant_holds(&self) -> bool {
        let mut sums: HashMap<BatchKey, Decimal> = HashMap::new();
        for m in &self.movements {
            *sums.entry(m.key).or_insert(Decimal::ZERO) += m.quantity;
        }
        for (key, stock) in &self.stocks {
            if sums.get(key).copied().unwrap_or(Decimal::ZERO) != *stock {
                return false;
            }
        }
        // No movement against a key with no stock record
        sums.keys().all(|key| self.stocks.contains_key(key))
    }

    fn no_negative_stock(&self) -> bool {
        self.stocks.values().all(|q| *q >= Decimal::ZERO)
    }
}

fn batch(product: Uuid, warehouse: Uuid) -> BatchKey {
    BatchKey::new(product, warehouse, None)
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// The concrete scenario from the ledger contract: 10 on hand, sell 4,
    /// buy 20, then an oversell of 30 must fail and change nothing.
    #[test]
    fn test_sale_purchase_oversell_scenario() {
        let mut sim = LedgerSim::new();
        let key = batch(Uuid::new_v4(), Uuid::new_v4());

        sim.apply(key, dec("10"), MovementType::OpeningStock).unwrap();

        let after_sale = sim.apply(key, dec("-4"), MovementType::Sale).unwrap();
        assert_eq!(after_sale, dec("6"));

        let after_purchase = sim.apply(key, dec("20"), MovementType::Purchase).unwrap();
        assert_eq!(after_purchase, dec("26"));

        let movements_before = sim.movements.len();
        let result = sim.apply(key, dec("-30"), MovementType::Sale);
        assert!(result.is_err());

        // Nothing changed: no new movement, quantity still 26
        assert_eq!(sim.movements.len(), movements_before);
        assert_eq!(sim.stocks[&key], dec("26"));
        assert!(sim.invariant_holds());
    }

    /// Outbound against a key with no record fails with zero availability
    #[test]
    fn test_outbound_on_missing_record_fails() {
        let mut sim = LedgerSim::new();
        let key = batch(Uuid::new_v4(), Uuid::new_v4());

        let err = sim.apply(key, dec("-1"), MovementType::Sale).unwrap_err();
        assert!(err.contains("available 0"));
        assert!(sim.movements.is_empty());
    }

    /// Inbound against a missing record creates it
    #[test]
    fn test_inbound_creates_record() {
        let mut sim = LedgerSim::new();
        let key = batch(Uuid::new_v4(), Uuid::new_v4());

        sim.apply(key, dec("7.5"), MovementType::Found).unwrap();
        assert_eq!(sim.stocks[&key], dec("7.5"));
        assert!(sim.invariant_holds());
    }

    /// Zero deltas are rejected before anything is written
    #[test]
    fn test_zero_delta_rejected() {
        let mut sim = LedgerSim::new();
        let key = batch(Uuid::new_v4(), Uuid::new_v4());
        sim.apply(key, dec("5"), MovementType::OpeningStock).unwrap();

        assert!(sim.apply(key, Decimal::ZERO, MovementType::Adjustment).is_err());
        assert_eq!(sim.movements.len(), 1);
    }

    /// Draining a batch to exactly zero is legal
    #[test]
    fn test_drain_to_zero_is_legal() {
        let mut sim = LedgerSim::new();
        let key = batch(Uuid::new_v4(), Uuid::new_v4());
        sim.apply(key, dec("5"), MovementType::Purchase).unwrap();

        let after = sim.apply(key, dec("-5"), MovementType::Sale).unwrap();
        assert_eq!(after, Decimal::ZERO);
        assert!(sim.invariant_holds());
    }

    /// A product's dated batch and its non-expiring batch are independent
    /// stock lines
    #[test]
    fn test_dated_and_undated_batches_are_distinct() {
        let mut sim = LedgerSim::new();
        let product = Uuid::new_v4();
        let warehouse = Uuid::new_v4();
        let dated = BatchKey::new(
            product,
            warehouse,
            NaiveDate::from_ymd_opt(2026, 12, 31),
        );
        let undated = BatchKey::new(product, warehouse, None);

        sim.apply(dated, dec("10"), MovementType::Purchase).unwrap();

        // The non-expiring batch has no record; selling from it must fail
        // even though the dated batch holds 10
        assert!(sim.apply(undated, dec("-1"), MovementType::Sale).is_err());

        sim.apply(undated, dec("3"), MovementType::OpeningStock).unwrap();
        assert_eq!(sim.stocks[&dated], dec("10"));
        assert_eq!(sim.stocks[&undated], dec("3"));
        assert!(sim.invariant_holds());
    }

    /// Running balance at each movement is reproducible when timestamps
    /// collide, because seq breaks the tie
    #[test]
    fn test_running_balance_deterministic_with_equal_timestamps() {
        let mut sim = LedgerSim::new();
        let product = Uuid::new_v4();
        let key = batch(product, Uuid::new_v4());

        // Three movements share one clock tick
        sim.apply(key, dec("10"), MovementType::OpeningStock).unwrap();
        sim.apply(key, dec("-2"), MovementType::Sale).unwrap();
        sim.apply(key, dec("-3"), MovementType::Sale).unwrap();
        sim.tick();
        sim.apply(key, dec("4"), MovementType::Purchase).unwrap();

        let expected = [dec("10"), dec("8"), dec("5"), dec("9")];
        for _ in 0..10 {
            let balances: Vec<Decimal> = sim
                .movements
                .iter()
                .map(|m| sim.balance_at(product, m))
                .collect();
            assert_eq!(balances, expected);
        }
    }

    /// Balances computed per (timestamp, seq) are strictly increasing in
    /// insertion order for inbound-only histories
    #[test]
    fn test_balance_order_is_total() {
        let mut sim = LedgerSim::new();
        let product = Uuid::new_v4();
        let key = batch(product, Uuid::new_v4());

        for _ in 0..5 {
            sim.apply(key, dec("1"), MovementType::Purchase).unwrap();
        }

        let balances: Vec<Decimal> = sim
            .movements
            .iter()
            .map(|m| sim.balance_at(product, m))
            .collect();
        assert_eq!(
            balances,
            vec![dec("1"), dec("2"), dec("3"), dec("4"), dec("5")]
        );
    }

    /// Fractional quantities accumulate exactly
    #[test]
    fn test_fractional_quantities() {
        let mut sim = LedgerSim::new();
        let key = batch(Uuid::new_v4(), Uuid::new_v4());

        sim.apply(key, dec("0.75"), MovementType::Purchase).unwrap();
        sim.apply(key, dec("0.50"), MovementType::Purchase).unwrap();
        let after = sim.apply(key, dec("-1.25"), MovementType::Sale).unwrap();
        assert_eq!(after, Decimal::ZERO);
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    /// Strategy for signed movement deltas (never zero)
    fn delta_strategy() -> impl Strategy<Value = Decimal> {
        (1i64..=10000i64, prop::bool::ANY).prop_map(|(n, negative)| {
            let d = Decimal::new(n, 2); // 0.01 to 100.00
            if negative {
                -d
            } else {
                d
            }
        })
    }

    /// Strategy picking one of a small set of batch keys, so sequences
    /// actually collide on the same batch
    fn key_index_strategy() -> impl Strategy<Value = usize> {
        0usize..3
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Invariant: after any sequence of applies (some rejected), every
        /// batch equals the sum of its movements and is never negative
        #[test]
        fn prop_invariant_after_any_sequence(
            ops in prop::collection::vec((key_index_strategy(), delta_strategy()), 1..60)
        ) {
            let keys = [
                batch(Uuid::new_v4(), Uuid::new_v4()),
                batch(Uuid::new_v4(), Uuid::new_v4()),
                batch(Uuid::new_v4(), Uuid::new_v4()),
            ];
            let mut sim = LedgerSim::new();

            for (idx, delta) in ops {
                let movement_type = if delta > Decimal::ZERO {
                    MovementType::Purchase
                } else {
                    MovementType::Sale
                };
                // Rejected applies must leave no trace; that is part of
                // what the invariant checks below
                let _ = sim.apply(keys[idx], delta, movement_type);
                prop_assert!(sim.invariant_holds());
                prop_assert!(sim.no_negative_stock());
            }
        }

        /// The movement log never shrinks and rejected applies append
        /// nothing
        #[test]
        fn prop_log_is_append_only(
            ops in prop::collection::vec((key_index_strategy(), delta_strategy()), 1..40)
        ) {
            let keys = [
                batch(Uuid::new_v4(), Uuid::new_v4()),
                batch(Uuid::new_v4(), Uuid::new_v4()),
                batch(Uuid::new_v4(), Uuid::new_v4()),
            ];
            let mut sim = LedgerSim::new();
            let mut last_len = 0;

            for (idx, delta) in ops {
                let before = sim.movements.len();
                let result = sim.apply(keys[idx], delta, MovementType::Adjustment);
                let after = sim.movements.len();

                match result {
                    Ok(_) => prop_assert_eq!(after, before + 1),
                    Err(_) => prop_assert_eq!(after, before),
                }
                prop_assert!(after >= last_len);
                last_len = after;
            }
        }

        /// Running balance at the latest movement equals current total
        /// on-hand for the product
        #[test]
        fn prop_final_balance_matches_stock(
            deltas in prop::collection::vec(delta_strategy(), 1..40)
        ) {
            let product = Uuid::new_v4();
            let key = batch(product, Uuid::new_v4());
            let mut sim = LedgerSim::new();

            for delta in deltas {
                let _ = sim.apply(key, delta, MovementType::Adjustment);
            }

            if let Some(last) = sim.movements.last() {
                let total = sim.stocks.get(&key).copied().unwrap_or(Decimal::ZERO);
                prop_assert_eq!(sim.balance_at(product, last), total);
            }
        }

        /// Balance-at-movement is stable across repeated computation, with
        /// timestamps forced to collide
        #[test]
        fn prop_balance_deterministic_under_timestamp_collisions(
            deltas in prop::collection::vec(delta_strategy(), 2..30),
            tick_every in 2usize..5
        ) {
            let product = Uuid::new_v4();
            let key = batch(product, Uuid::new_v4());
            let mut sim = LedgerSim::new();

            for (i, delta) in deltas.into_iter().enumerate() {
                if i % tick_every == 0 {
                    sim.tick();
                }
                let _ = sim.apply(key, delta, MovementType::Adjustment);
            }

            let first: Vec<Decimal> = sim
                .movements
                .iter()
                .map(|m| sim.balance_at(product, m))
                .collect();
            for _ in 0..5 {
                let again: Vec<Decimal> = sim
                    .movements
                    .iter()
                    .map(|m| sim.balance_at(product, m))
                    .collect();
                prop_assert_eq!(&again, &first);
            }
        }
    }
}
