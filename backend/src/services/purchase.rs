//! Purchase document service
//!
//! Translates supplier purchases into stock movements. Only the
//! `pending -> received` transition posts to the ledger; a received
//! purchase can no longer be edited, and deleting one issues compensating
//! movements instead of touching the originals.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{
    MovementType, Purchase, PurchaseItem, PurchaseStatus, PurchaseWithItems,
};
use shared::{Pagination, PaginatedResponse, PaginationMeta};
use crate::services::ledger::{LedgerService, MovementInput};
use shared::validation;

/// VAT applied to vatable products
const VAT_RATE: Decimal = Decimal::from_parts(15, 0, 0, false, 2);

/// Purchase service for managing supplier purchases
#[derive(Clone)]
pub struct PurchaseService {
    db: PgPool,
}

/// One requested purchase line
#[derive(Debug, Clone, Deserialize)]
pub struct PurchaseItemInput {
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    pub quantity: Decimal,
    /// Defaults to the product's purchase price
    pub unit_price: Option<Decimal>,
    pub expiry_date: Option<NaiveDate>,
}

/// Input for creating a purchase
#[derive(Debug, Deserialize)]
pub struct CreatePurchaseInput {
    pub invoice_number: String,
    pub supplier_id: Option<Uuid>,
    pub supplier_name: Option<String>,
    pub purchase_date: NaiveDate,
    pub items: Vec<PurchaseItemInput>,
    pub notes: Option<String>,
}

/// Input for updating a pending purchase
#[derive(Debug, Deserialize)]
pub struct UpdatePurchaseInput {
    pub invoice_number: Option<String>,
    pub supplier_id: Option<Uuid>,
    pub supplier_name: Option<String>,
    pub purchase_date: Option<NaiveDate>,
    pub items: Option<Vec<PurchaseItemInput>>,
    pub notes: Option<String>,
}

/// Filters for purchase listings
#[derive(Debug, Default, Deserialize)]
pub struct PurchaseFilter {
    pub status: Option<PurchaseStatus>,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
    pub invoice_number: Option<String>,
}

/// A line with its resolved price and tax
struct PricedItem {
    product_id: Uuid,
    warehouse_id: Uuid,
    quantity: Decimal,
    unit_price: Decimal,
    total_price: Decimal,
    tax_amount: Decimal,
    expiry_date: Option<NaiveDate>,
}

/// Row for purchase queries; status arrives as text and is parsed
#[derive(Debug, FromRow)]
struct PurchaseRow {
    id: Uuid,
    invoice_number: String,
    supplier_id: Option<Uuid>,
    supplier_name: Option<String>,
    purchase_date: NaiveDate,
    status: String,
    total_amount: Decimal,
    tax_amount: Decimal,
    grand_total: Decimal,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PurchaseRow> for Purchase {
    type Error = AppError;

    fn try_from(row: PurchaseRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<PurchaseStatus>()
            .map_err(AppError::Internal)?;
        Ok(Purchase {
            id: row.id,
            invoice_number: row.invoice_number,
            supplier_id: row.supplier_id,
            supplier_name: row.supplier_name,
            purchase_date: row.purchase_date,
            status,
            total_amount: row.total_amount,
            tax_amount: row.tax_amount,
            grand_total: row.grand_total,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct PurchaseItemRow {
    id: Uuid,
    purchase_id: Uuid,
    product_id: Uuid,
    warehouse_id: Uuid,
    quantity: Decimal,
    unit_price: Decimal,
    total_price: Decimal,
    expiry_date: Option<NaiveDate>,
}

impl From<PurchaseItemRow> for PurchaseItem {
    fn from(row: PurchaseItemRow) -> Self {
        PurchaseItem {
            id: row.id,
            purchase_id: row.purchase_id,
            product_id: row.product_id,
            warehouse_id: row.warehouse_id,
            quantity: row.quantity,
            unit_price: row.unit_price,
            total_price: row.total_price,
            expiry_date: row.expiry_date,
        }
    }
}

impl PurchaseService {
    /// Create a new PurchaseService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Record a purchase. Purchases with a supplier start `pending`;
    /// walk-in purchases without one are received immediately and post
    /// their movements in the same transaction.
    pub async fn create_purchase(&self, input: CreatePurchaseInput) -> AppResult<PurchaseWithItems> {
        validate_invoice(&input.invoice_number)?;
        validate_items(&input.items)?;

        let invoice_taken = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM purchases WHERE invoice_number = $1)",
        )
        .bind(input.invoice_number.trim())
        .fetch_one(&self.db)
        .await?;
        if invoice_taken {
            return Err(AppError::DuplicateEntry("invoice_number".to_string()));
        }

        let status = if input.supplier_id.is_some() {
            PurchaseStatus::Pending
        } else {
            PurchaseStatus::Received
        };

        let mut tx = self.db.begin().await?;

        if let Some(supplier_id) = input.supplier_id {
            ensure_supplier_exists(&mut tx, supplier_id).await?;
        }
        let priced = price_items(&mut tx, &input.items, PriceSource::PurchasePrice).await?;
        let (total, tax_total) = sum_totals(&priced);

        let purchase = sqlx::query_as::<_, PurchaseRow>(
            r#"
            INSERT INTO purchases (
                invoice_number, supplier_id, supplier_name, purchase_date,
                status, total_amount, tax_amount, grand_total, notes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, invoice_number, supplier_id, supplier_name, purchase_date,
                      status, total_amount, tax_amount, grand_total, notes,
                      created_at, updated_at
            "#,
        )
        .bind(input.invoice_number.trim())
        .bind(input.supplier_id)
        .bind(&input.supplier_name)
        .bind(input.purchase_date)
        .bind(status.as_str())
        .bind(total)
        .bind(tax_total)
        .bind(total + tax_total)
        .bind(&input.notes)
        .fetch_one(&mut *tx)
        .await?;

        let items = insert_items(&mut tx, purchase.id, &priced).await?;

        if status == PurchaseStatus::Received {
            post_receipt_movements(&mut tx, purchase.id, &purchase.invoice_number, &items).await?;
        }

        tx.commit().await?;

        Ok(PurchaseWithItems {
            purchase: purchase.try_into()?,
            items,
        })
    }

    /// Mark a pending purchase as received and post its stock movements
    pub async fn receive_purchase(&self, purchase_id: Uuid) -> AppResult<PurchaseWithItems> {
        let mut tx = self.db.begin().await?;

        let row = lock_purchase(&mut tx, purchase_id).await?;
        let status = parse_status(&row)?;
        if !status.can_transition_to(PurchaseStatus::Received) {
            return Err(AppError::InvalidStateTransition {
                purchase_id,
                from: status.to_string(),
                to: PurchaseStatus::Received.to_string(),
            });
        }

        let purchase = sqlx::query_as::<_, PurchaseRow>(
            r#"
            UPDATE purchases
            SET status = $1, updated_at = NOW()
            WHERE id = $2
            RETURNING id, invoice_number, supplier_id, supplier_name, purchase_date,
                      status, total_amount, tax_amount, grand_total, notes,
                      created_at, updated_at
            "#,
        )
        .bind(PurchaseStatus::Received.as_str())
        .bind(purchase_id)
        .fetch_one(&mut *tx)
        .await?;

        let items = load_items(&mut tx, purchase_id).await?;
        post_receipt_movements(&mut tx, purchase.id, &purchase.invoice_number, &items).await?;

        tx.commit().await?;

        Ok(PurchaseWithItems {
            purchase: purchase.try_into()?,
            items,
        })
    }

    /// Cancel a pending purchase. Never touches the ledger.
    pub async fn cancel_purchase(&self, purchase_id: Uuid) -> AppResult<Purchase> {
        let mut tx = self.db.begin().await?;

        let row = lock_purchase(&mut tx, purchase_id).await?;
        let status = parse_status(&row)?;
        if !status.can_transition_to(PurchaseStatus::Cancelled) {
            return Err(AppError::InvalidStateTransition {
                purchase_id,
                from: status.to_string(),
                to: PurchaseStatus::Cancelled.to_string(),
            });
        }

        let purchase = sqlx::query_as::<_, PurchaseRow>(
            r#"
            UPDATE purchases
            SET status = $1, updated_at = NOW()
            WHERE id = $2
            RETURNING id, invoice_number, supplier_id, supplier_name, purchase_date,
                      status, total_amount, tax_amount, grand_total, notes,
                      created_at, updated_at
            "#,
        )
        .bind(PurchaseStatus::Cancelled.as_str())
        .bind(purchase_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        purchase.try_into()
    }

    /// Update a purchase. Only legal while pending; nothing was posted yet,
    /// so replacing the lines never touches the ledger.
    pub async fn update_purchase(
        &self,
        purchase_id: Uuid,
        input: UpdatePurchaseInput,
    ) -> AppResult<PurchaseWithItems> {
        if let Some(invoice) = &input.invoice_number {
            validate_invoice(invoice)?;
        }
        if let Some(items) = &input.items {
            validate_items(items)?;
        }

        let mut tx = self.db.begin().await?;

        let row = lock_purchase(&mut tx, purchase_id).await?;
        let status = parse_status(&row)?;
        if status != PurchaseStatus::Pending {
            return Err(AppError::Conflict {
                resource: "purchase".to_string(),
                message: format!("Cannot update a purchase that is already {}", status),
                message_th: format!("ไม่สามารถแก้ไขใบสั่งซื้อที่{}แล้ว", status_th(status)),
            });
        }

        if let Some(invoice) = &input.invoice_number {
            let invoice_taken = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM purchases WHERE invoice_number = $1 AND id <> $2)",
            )
            .bind(invoice.trim())
            .bind(purchase_id)
            .fetch_one(&mut *tx)
            .await?;
            if invoice_taken {
                return Err(AppError::DuplicateEntry("invoice_number".to_string()));
            }
        }
        if let Some(supplier_id) = input.supplier_id {
            ensure_supplier_exists(&mut tx, supplier_id).await?;
        }

        let (items, totals) = match &input.items {
            Some(new_items) => {
                // Pending: no stock was ever posted, so no reversal needed
                sqlx::query("DELETE FROM purchase_items WHERE purchase_id = $1")
                    .bind(purchase_id)
                    .execute(&mut *tx)
                    .await?;

                let priced = price_items(&mut tx, new_items, PriceSource::PurchasePrice).await?;
                let totals = sum_totals(&priced);
                let items = insert_items(&mut tx, purchase_id, &priced).await?;
                (items, Some(totals))
            }
            None => (load_items(&mut tx, purchase_id).await?, None),
        };

        let purchase = sqlx::query_as::<_, PurchaseRow>(
            r#"
            UPDATE purchases
            SET invoice_number = COALESCE($1, invoice_number),
                supplier_id = COALESCE($2, supplier_id),
                supplier_name = COALESCE($3, supplier_name),
                purchase_date = COALESCE($4, purchase_date),
                notes = COALESCE($5, notes),
                total_amount = COALESCE($6, total_amount),
                tax_amount = COALESCE($7, tax_amount),
                grand_total = COALESCE($8, grand_total),
                updated_at = NOW()
            WHERE id = $9
            RETURNING id, invoice_number, supplier_id, supplier_name, purchase_date,
                      status, total_amount, tax_amount, grand_total, notes,
                      created_at, updated_at
            "#,
        )
        .bind(input.invoice_number.as_deref().map(str::trim))
        .bind(input.supplier_id)
        .bind(&input.supplier_name)
        .bind(input.purchase_date)
        .bind(&input.notes)
        .bind(totals.map(|(total, _)| total))
        .bind(totals.map(|(_, tax)| tax))
        .bind(totals.map(|(total, tax)| total + tax))
        .bind(purchase_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(PurchaseWithItems {
            purchase: purchase.try_into()?,
            items,
        })
    }

    /// Delete a purchase. A received purchase is reversed through the
    /// ledger first (compensating `adjustment` movements against the same
    /// batch keys); the originals stay in the ledger. Returns the product
    /// ids whose stock was reduced so the caller can run the low-stock
    /// watcher after commit.
    pub async fn delete_purchase(&self, purchase_id: Uuid) -> AppResult<Vec<Uuid>> {
        let mut tx = self.db.begin().await?;

        let row = lock_purchase(&mut tx, purchase_id).await?;
        let status = parse_status(&row)?;
        let items = load_items(&mut tx, purchase_id).await?;

        let mut reduced_products = Vec::new();
        if status == PurchaseStatus::Received {
            for item in &items {
                LedgerService::apply_movement_in(
                    &mut tx,
                    &MovementInput {
                        product_id: item.product_id,
                        warehouse_id: item.warehouse_id,
                        expiry_date: item.expiry_date,
                        quantity: -item.quantity,
                        movement_type: MovementType::Adjustment,
                        reference_type: Some("Purchase".to_string()),
                        reference_id: Some(purchase_id),
                        notes: Some(format!(
                            "Stock adjustment due to purchase deletion: {}",
                            row.invoice_number
                        )),
                    },
                )
                .await?;
                reduced_products.push(item.product_id);
            }
        }

        sqlx::query("DELETE FROM purchases WHERE id = $1")
            .bind(purchase_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        reduced_products.sort();
        reduced_products.dedup();
        Ok(reduced_products)
    }

    /// Get a purchase with its items
    pub async fn get_purchase(&self, purchase_id: Uuid) -> AppResult<PurchaseWithItems> {
        let row = sqlx::query_as::<_, PurchaseRow>(
            r#"
            SELECT id, invoice_number, supplier_id, supplier_name, purchase_date,
                   status, total_amount, tax_amount, grand_total, notes,
                   created_at, updated_at
            FROM purchases
            WHERE id = $1
            "#,
        )
        .bind(purchase_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Purchase".to_string()))?;

        let items = sqlx::query_as::<_, PurchaseItemRow>(
            r#"
            SELECT id, purchase_id, product_id, warehouse_id, quantity,
                   unit_price, total_price, expiry_date
            FROM purchase_items
            WHERE purchase_id = $1
            "#,
        )
        .bind(purchase_id)
        .fetch_all(&self.db)
        .await?;

        Ok(PurchaseWithItems {
            purchase: row.try_into()?,
            items: items.into_iter().map(PurchaseItem::from).collect(),
        })
    }

    /// List purchases, newest first, with filters and pagination
    pub async fn list_purchases(
        &self,
        filter: &PurchaseFilter,
        pagination: &Pagination,
    ) -> AppResult<PaginatedResponse<PurchaseWithItems>> {
        let status = filter.status.map(|s| s.as_str().to_string());
        let invoice_like = filter
            .invoice_number
            .as_ref()
            .map(|inv| format!("%{}%", inv));

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM purchases
            WHERE ($1::varchar IS NULL OR status = $1)
              AND ($2::date IS NULL OR purchase_date >= $2)
              AND ($3::date IS NULL OR purchase_date <= $3)
              AND ($4::varchar IS NULL OR invoice_number ILIKE $4)
            "#,
        )
        .bind(&status)
        .bind(filter.from_date)
        .bind(filter.to_date)
        .bind(&invoice_like)
        .fetch_one(&self.db)
        .await?;

        let rows = sqlx::query_as::<_, PurchaseRow>(
            r#"
            SELECT id, invoice_number, supplier_id, supplier_name, purchase_date,
                   status, total_amount, tax_amount, grand_total, notes,
                   created_at, updated_at
            FROM purchases
            WHERE ($1::varchar IS NULL OR status = $1)
              AND ($2::date IS NULL OR purchase_date >= $2)
              AND ($3::date IS NULL OR purchase_date <= $3)
              AND ($4::varchar IS NULL OR invoice_number ILIKE $4)
            ORDER BY created_at DESC
            LIMIT $5 OFFSET $6
            "#,
        )
        .bind(&status)
        .bind(filter.from_date)
        .bind(filter.to_date)
        .bind(&invoice_like)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let item_rows = sqlx::query_as::<_, PurchaseItemRow>(
            r#"
            SELECT id, purchase_id, product_id, warehouse_id, quantity,
                   unit_price, total_price, expiry_date
            FROM purchase_items
            WHERE purchase_id = ANY($1)
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.db)
        .await?;

        let mut items_by_purchase: std::collections::HashMap<Uuid, Vec<PurchaseItem>> =
            std::collections::HashMap::new();
        for item in item_rows {
            items_by_purchase
                .entry(item.purchase_id)
                .or_default()
                .push(item.into());
        }

        let data = rows
            .into_iter()
            .map(|row| {
                let items = items_by_purchase.remove(&row.id).unwrap_or_default();
                Ok(PurchaseWithItems {
                    purchase: row.try_into()?,
                    items,
                })
            })
            .collect::<AppResult<Vec<_>>>()?;

        Ok(PaginatedResponse {
            data,
            pagination: PaginationMeta::new(pagination, total as u64),
        })
    }
}

// ============================================================================
// Shared helpers (also used by the sale service)
// ============================================================================

/// Which product price a document line defaults to
pub(crate) enum PriceSource {
    PurchasePrice,
    SellingPrice,
}

pub(crate) struct ProductPricing {
    pub default_price: Decimal,
    pub is_vatable: bool,
}

/// Look up a product's pricing fields; fails for unknown or inactive ids
pub(crate) async fn product_pricing(
    tx: &mut PgConnection,
    product_id: Uuid,
    source: &PriceSource,
) -> AppResult<ProductPricing> {
    let row = sqlx::query_as::<_, (Decimal, Decimal, bool)>(
        "SELECT purchase_price, selling_price, is_vatable FROM products WHERE id = $1",
    )
    .bind(product_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

    let default_price = match source {
        PriceSource::PurchasePrice => row.0,
        PriceSource::SellingPrice => row.1,
    };
    Ok(ProductPricing {
        default_price,
        is_vatable: row.2,
    })
}

pub(crate) async fn ensure_supplier_exists(
    tx: &mut PgConnection,
    supplier_id: Uuid,
) -> AppResult<()> {
    let exists =
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM suppliers WHERE id = $1)")
            .bind(supplier_id)
            .fetch_one(&mut *tx)
            .await?;
    if !exists {
        return Err(AppError::NotFound("Supplier".to_string()));
    }
    Ok(())
}

pub(crate) async fn ensure_warehouse_exists(
    tx: &mut PgConnection,
    warehouse_id: Uuid,
) -> AppResult<()> {
    let exists =
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM warehouses WHERE id = $1)")
            .bind(warehouse_id)
            .fetch_one(&mut *tx)
            .await?;
    if !exists {
        return Err(AppError::NotFound("Warehouse".to_string()));
    }
    Ok(())
}

fn validate_invoice(invoice: &str) -> AppResult<()> {
    validation::validate_invoice_number(invoice).map_err(|msg| AppError::Validation {
        field: "invoice_number".to_string(),
        message: msg.to_string(),
        message_th: "เลขที่ใบกำกับไม่ถูกต้อง".to_string(),
    })
}

fn validate_items(items: &[PurchaseItemInput]) -> AppResult<()> {
    validation::validate_has_items(items).map_err(|msg| AppError::Validation {
        field: "items".to_string(),
        message: msg.to_string(),
        message_th: "ต้องมีรายการสินค้าอย่างน้อยหนึ่งรายการ".to_string(),
    })?;
    for item in items {
        validation::validate_quantity(item.quantity).map_err(|msg| AppError::Validation {
            field: "items.quantity".to_string(),
            message: msg.to_string(),
            message_th: "ปริมาณต้องเป็นค่าบวก".to_string(),
        })?;
        if let Some(price) = item.unit_price {
            validation::validate_unit_price(price).map_err(|msg| AppError::Validation {
                field: "items.unit_price".to_string(),
                message: msg.to_string(),
                message_th: "ราคาต่อหน่วยต้องไม่ติดลบ".to_string(),
            })?;
        }
    }
    Ok(())
}

/// Resolve prices and VAT for every line
async fn price_items(
    tx: &mut PgConnection,
    items: &[PurchaseItemInput],
    source: PriceSource,
) -> AppResult<Vec<PricedItem>> {
    let mut priced = Vec::with_capacity(items.len());
    for item in items {
        ensure_warehouse_exists(tx, item.warehouse_id).await?;
        let pricing = product_pricing(tx, item.product_id, &source).await?;
        let unit_price = item.unit_price.unwrap_or(pricing.default_price);
        let total_price = item.quantity * unit_price;
        let tax_amount = if pricing.is_vatable {
            total_price * VAT_RATE
        } else {
            Decimal::ZERO
        };
        priced.push(PricedItem {
            product_id: item.product_id,
            warehouse_id: item.warehouse_id,
            quantity: item.quantity,
            unit_price,
            total_price,
            tax_amount,
            expiry_date: item.expiry_date,
        });
    }
    Ok(priced)
}

fn sum_totals(priced: &[PricedItem]) -> (Decimal, Decimal) {
    let total = priced.iter().map(|p| p.total_price).sum();
    let tax = priced.iter().map(|p| p.tax_amount).sum();
    (total, tax)
}

async fn insert_items(
    tx: &mut PgConnection,
    purchase_id: Uuid,
    priced: &[PricedItem],
) -> AppResult<Vec<PurchaseItem>> {
    let mut items = Vec::with_capacity(priced.len());
    for item in priced {
        let row = sqlx::query_as::<_, PurchaseItemRow>(
            r#"
            INSERT INTO purchase_items (
                purchase_id, product_id, warehouse_id, quantity,
                unit_price, total_price, expiry_date
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, purchase_id, product_id, warehouse_id, quantity,
                      unit_price, total_price, expiry_date
            "#,
        )
        .bind(purchase_id)
        .bind(item.product_id)
        .bind(item.warehouse_id)
        .bind(item.quantity)
        .bind(item.unit_price)
        .bind(item.total_price)
        .bind(item.expiry_date)
        .fetch_one(&mut *tx)
        .await?;
        items.push(row.into());
    }
    Ok(items)
}

/// Post one inbound `purchase` movement per received line
async fn post_receipt_movements(
    tx: &mut PgConnection,
    purchase_id: Uuid,
    invoice_number: &str,
    items: &[PurchaseItem],
) -> AppResult<()> {
    for item in items {
        LedgerService::apply_movement_in(
            tx,
            &MovementInput {
                product_id: item.product_id,
                warehouse_id: item.warehouse_id,
                expiry_date: item.expiry_date,
                quantity: item.quantity,
                movement_type: MovementType::Purchase,
                reference_type: Some("Purchase".to_string()),
                reference_id: Some(purchase_id),
                notes: Some(format!("Stock received via invoice: {}", invoice_number)),
            },
        )
        .await?;
    }
    Ok(())
}

async fn lock_purchase(tx: &mut PgConnection, purchase_id: Uuid) -> AppResult<PurchaseRow> {
    sqlx::query_as::<_, PurchaseRow>(
        r#"
        SELECT id, invoice_number, supplier_id, supplier_name, purchase_date,
               status, total_amount, tax_amount, grand_total, notes,
               created_at, updated_at
        FROM purchases
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(purchase_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::NotFound("Purchase".to_string()))
}

async fn load_items(tx: &mut PgConnection, purchase_id: Uuid) -> AppResult<Vec<PurchaseItem>> {
    let rows = sqlx::query_as::<_, PurchaseItemRow>(
        r#"
        SELECT id, purchase_id, product_id, warehouse_id, quantity,
               unit_price, total_price, expiry_date
        FROM purchase_items
        WHERE purchase_id = $1
        "#,
    )
    .bind(purchase_id)
    .fetch_all(&mut *tx)
    .await?;
    Ok(rows.into_iter().map(PurchaseItem::from).collect())
}

fn parse_status(row: &PurchaseRow) -> AppResult<PurchaseStatus> {
    row.status
        .parse::<PurchaseStatus>()
        .map_err(AppError::Internal)
}

fn status_th(status: PurchaseStatus) -> &'static str {
    match status {
        PurchaseStatus::Pending => "รอดำเนินการ",
        PurchaseStatus::Received => "รับสินค้า",
        PurchaseStatus::Cancelled => "ยกเลิก",
    }
}
