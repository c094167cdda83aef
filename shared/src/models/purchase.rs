//! Purchase document models

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of a purchase document.
///
/// Only the `pending -> received` transition posts stock movements;
/// `received` and `cancelled` are both terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseStatus {
    Pending,
    Received,
    Cancelled,
}

impl PurchaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PurchaseStatus::Pending => "pending",
            PurchaseStatus::Received => "received",
            PurchaseStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PurchaseStatus::Received | PurchaseStatus::Cancelled)
    }

    pub fn can_transition_to(&self, next: PurchaseStatus) -> bool {
        matches!(
            (self, next),
            (
                PurchaseStatus::Pending,
                PurchaseStatus::Received | PurchaseStatus::Cancelled
            )
        )
    }
}

impl std::str::FromStr for PurchaseStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PurchaseStatus::Pending),
            "received" => Ok(PurchaseStatus::Received),
            "cancelled" => Ok(PurchaseStatus::Cancelled),
            other => Err(format!("unknown purchase status: {}", other)),
        }
    }
}

impl std::fmt::Display for PurchaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A purchase from a supplier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Purchase {
    pub id: Uuid,
    pub invoice_number: String,
    pub supplier_id: Option<Uuid>,
    /// Free-text supplier for walk-in purchases without a supplier record
    pub supplier_name: Option<String>,
    pub purchase_date: NaiveDate,
    pub status: PurchaseStatus,
    pub total_amount: Decimal,
    pub tax_amount: Decimal,
    pub grand_total: Decimal,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One line of a purchase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseItem {
    pub id: Uuid,
    pub purchase_id: Uuid,
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub total_price: Decimal,
    /// Expiry batch the received stock lands in; `None` is the
    /// non-expiring batch
    pub expiry_date: Option<NaiveDate>,
}

/// A purchase with its lines attached
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseWithItems {
    #[serde(flatten)]
    pub purchase: Purchase,
    pub items: Vec<PurchaseItem>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_transitions_to_received_or_cancelled() {
        assert!(PurchaseStatus::Pending.can_transition_to(PurchaseStatus::Received));
        assert!(PurchaseStatus::Pending.can_transition_to(PurchaseStatus::Cancelled));
    }

    #[test]
    fn terminal_states_do_not_transition() {
        for from in [PurchaseStatus::Received, PurchaseStatus::Cancelled] {
            for to in [
                PurchaseStatus::Pending,
                PurchaseStatus::Received,
                PurchaseStatus::Cancelled,
            ] {
                assert!(!from.can_transition_to(to));
            }
        }
    }

    #[test]
    fn pending_is_not_terminal() {
        assert!(!PurchaseStatus::Pending.is_terminal());
        assert!(PurchaseStatus::Received.is_terminal());
        assert!(PurchaseStatus::Cancelled.is_terminal());
    }
}
