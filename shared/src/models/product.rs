//! Product catalog models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A sellable/stockable product
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    /// Short unique product code (e.g., "PRD-0001")
    pub code: String,
    pub category_id: Option<Uuid>,
    /// Unit of measure (e.g., "pcs", "kg", "ltr")
    pub unit: String,
    pub barcode: Option<String>,
    pub purchase_price: Decimal,
    pub selling_price: Decimal,
    /// Low-stock threshold across all warehouses; 0 disables the alert
    pub min_stock: Decimal,
    pub has_expiry: bool,
    pub is_active: bool,
    pub is_vatable: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A product category
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
