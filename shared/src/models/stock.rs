//! Stock ledger models: batch keys, stock records, and movement entries

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Sentinel date standing in for "no expiry" wherever a batch key is
/// compared or indexed. Models keep `Option<NaiveDate>`; the sentinel only
/// exists so key equality never depends on SQL NULL semantics.
pub fn no_expiry_sentinel() -> NaiveDate {
    NaiveDate::from_ymd_opt(9999, 12, 31).expect("sentinel date is valid")
}

/// Identity of one stock line: a product in a warehouse, optionally bound
/// to an expiry batch. `None` is the distinct non-expiring batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BatchKey {
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    pub expiry_date: Option<NaiveDate>,
}

impl BatchKey {
    pub fn new(product_id: Uuid, warehouse_id: Uuid, expiry_date: Option<NaiveDate>) -> Self {
        Self {
            product_id,
            warehouse_id,
            expiry_date,
        }
    }
}

impl std::fmt::Display for BatchKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.expiry_date {
            Some(date) => write!(
                f,
                "{}/{} (expires {})",
                self.product_id, self.warehouse_id, date
            ),
            None => write!(f, "{}/{} (no expiry)", self.product_id, self.warehouse_id),
        }
    }
}

/// On-hand quantity for one batch key
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockRecord {
    pub id: Uuid,
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    pub expiry_date: Option<NaiveDate>,
    /// Never negative; equals the signed sum of all movements for this key
    pub quantity: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StockRecord {
    pub fn batch_key(&self) -> BatchKey {
        BatchKey::new(self.product_id, self.warehouse_id, self.expiry_date)
    }
}

/// Cause of a stock movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementType {
    Purchase,
    Sale,
    /// Either sign; also used for reversal/compensation of documents
    Adjustment,
    Damage,
    Lost,
    Found,
    OpeningStock,
    Expired,
}

/// Sign a movement type is allowed to carry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovementSign {
    Inbound,
    Outbound,
    Either,
}

impl MovementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::Purchase => "purchase",
            MovementType::Sale => "sale",
            MovementType::Adjustment => "adjustment",
            MovementType::Damage => "damage",
            MovementType::Lost => "lost",
            MovementType::Found => "found",
            MovementType::OpeningStock => "opening_stock",
            MovementType::Expired => "expired",
        }
    }

    /// Sign convention fixed by the type
    pub fn expected_sign(&self) -> MovementSign {
        match self {
            MovementType::Purchase | MovementType::Found | MovementType::OpeningStock => {
                MovementSign::Inbound
            }
            MovementType::Sale
            | MovementType::Damage
            | MovementType::Lost
            | MovementType::Expired => MovementSign::Outbound,
            MovementType::Adjustment => MovementSign::Either,
        }
    }

    /// Types a caller may record through the manual-movement endpoint
    pub fn is_manual(&self) -> bool {
        matches!(
            self,
            MovementType::Damage
                | MovementType::Lost
                | MovementType::Found
                | MovementType::Adjustment
                | MovementType::OpeningStock
        )
    }
}

impl std::str::FromStr for MovementType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "purchase" => Ok(MovementType::Purchase),
            "sale" => Ok(MovementType::Sale),
            "adjustment" => Ok(MovementType::Adjustment),
            "damage" => Ok(MovementType::Damage),
            "lost" => Ok(MovementType::Lost),
            "found" => Ok(MovementType::Found),
            "opening_stock" => Ok(MovementType::OpeningStock),
            "expired" => Ok(MovementType::Expired),
            other => Err(format!("unknown movement type: {}", other)),
        }
    }
}

impl std::fmt::Display for MovementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable audit record of one ledger mutation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockMovement {
    pub id: Uuid,
    /// Monotonic insertion-order number; tie-breaks identical timestamps in
    /// running-balance computations
    pub seq: i64,
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    pub expiry_date: Option<NaiveDate>,
    /// Signed: positive inbound, negative outbound
    pub quantity: Decimal,
    pub movement_type: MovementType,
    pub reference_type: Option<String>,
    pub reference_id: Option<Uuid>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl StockMovement {
    pub fn batch_key(&self) -> BatchKey {
        BatchKey::new(self.product_id, self.warehouse_id, self.expiry_date)
    }
}

/// One row of a product's movement history with the running balance at
/// that entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovementHistoryEntry {
    pub id: Uuid,
    pub seq: i64,
    pub date: DateTime<Utc>,
    pub movement_type: MovementType,
    pub warehouse_id: Uuid,
    pub warehouse_name: String,
    pub reference_type: Option<String>,
    pub reference_id: Option<Uuid>,
    pub inbound: Decimal,
    pub outbound: Decimal,
    pub balance: Decimal,
    pub notes: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn movement_type_round_trips_through_str() {
        let types = [
            MovementType::Purchase,
            MovementType::Sale,
            MovementType::Adjustment,
            MovementType::Damage,
            MovementType::Lost,
            MovementType::Found,
            MovementType::OpeningStock,
            MovementType::Expired,
        ];
        for t in types {
            assert_eq!(t.as_str().parse::<MovementType>().unwrap(), t);
        }
    }

    #[test]
    fn sign_conventions_match_type() {
        assert_eq!(
            MovementType::Purchase.expected_sign(),
            MovementSign::Inbound
        );
        assert_eq!(MovementType::Sale.expected_sign(), MovementSign::Outbound);
        assert_eq!(
            MovementType::Expired.expected_sign(),
            MovementSign::Outbound
        );
        assert_eq!(
            MovementType::Adjustment.expected_sign(),
            MovementSign::Either
        );
    }

    #[test]
    fn purchase_and_sale_are_not_manual_types() {
        assert!(!MovementType::Purchase.is_manual());
        assert!(!MovementType::Sale.is_manual());
        assert!(!MovementType::Expired.is_manual());
        assert!(MovementType::Damage.is_manual());
        assert!(MovementType::OpeningStock.is_manual());
    }

    #[test]
    fn no_expiry_is_a_distinct_batch_key() {
        let product = Uuid::new_v4();
        let warehouse = Uuid::new_v4();
        let dated = BatchKey::new(
            product,
            warehouse,
            NaiveDate::from_ymd_opt(2026, 1, 1),
        );
        let undated = BatchKey::new(product, warehouse, None);
        assert_ne!(dated, undated);
        assert_ne!(undated.expiry_date, Some(no_expiry_sentinel()));
    }
}
