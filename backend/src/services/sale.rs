//! Sale document service
//!
//! POS-style sales: stock is reduced when the sale is recorded. A sale
//! either posts every line or none of them; editing reverses the previous
//! movements with compensating adjustments before posting the new lines,
//! and deleting reverses without re-posting. Original movements are never
//! deleted or mutated.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{MovementType, PaymentMethod, Sale, SaleItem, SaleWithItems};
use shared::{Pagination, PaginatedResponse, PaginationMeta};
use crate::services::ledger::{LedgerService, MovementInput};
use crate::services::purchase::{ensure_warehouse_exists, product_pricing, PriceSource};
use shared::validation;

/// VAT applied to vatable products
const VAT_RATE: Decimal = Decimal::from_parts(15, 0, 0, false, 2);

/// Sale service for recording POS sales
#[derive(Clone)]
pub struct SaleService {
    db: PgPool,
}

/// One requested sale line
#[derive(Debug, Clone, Deserialize)]
pub struct SaleItemInput {
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    /// Expiry batch to draw from; `None` is the non-expiring batch
    pub expiry_date: Option<NaiveDate>,
    pub quantity: Decimal,
    /// Defaults to the product's selling price
    pub unit_price: Option<Decimal>,
}

/// Input for recording a sale
#[derive(Debug, Deserialize)]
pub struct CreateSaleInput {
    pub invoice_number: String,
    pub sale_date: NaiveDate,
    pub payment_method: PaymentMethod,
    pub items: Vec<SaleItemInput>,
    pub notes: Option<String>,
}

/// Input for updating a sale
#[derive(Debug, Deserialize)]
pub struct UpdateSaleInput {
    pub invoice_number: Option<String>,
    pub sale_date: Option<NaiveDate>,
    pub payment_method: Option<PaymentMethod>,
    pub items: Option<Vec<SaleItemInput>>,
    pub notes: Option<String>,
}

/// Filters for sale listings
#[derive(Debug, Default, Deserialize)]
pub struct SaleFilter {
    pub payment_method: Option<PaymentMethod>,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
    pub invoice_number: Option<String>,
}

/// Outcome of a sale mutation: the document plus the products whose stock
/// went down, for the post-commit low-stock check
#[derive(Debug)]
pub struct SaleOutcome {
    pub sale: SaleWithItems,
    pub reduced_products: Vec<Uuid>,
}

struct PricedItem {
    product_id: Uuid,
    warehouse_id: Uuid,
    expiry_date: Option<NaiveDate>,
    quantity: Decimal,
    unit_price: Decimal,
    total_price: Decimal,
    tax_amount: Decimal,
}

#[derive(Debug, FromRow)]
struct SaleRow {
    id: Uuid,
    invoice_number: String,
    sale_date: NaiveDate,
    payment_method: String,
    total_amount: Decimal,
    tax_amount: Decimal,
    grand_total: Decimal,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SaleRow> for Sale {
    type Error = AppError;

    fn try_from(row: SaleRow) -> Result<Self, Self::Error> {
        let payment_method = row
            .payment_method
            .parse::<PaymentMethod>()
            .map_err(AppError::Internal)?;
        Ok(Sale {
            id: row.id,
            invoice_number: row.invoice_number,
            sale_date: row.sale_date,
            payment_method,
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
struct SaleItemRow {
    id: Uuid,
    sale_id: Uuid,
    product_id: Uuid,
    warehouse_id: Uuid,
    expiry_date: Option<NaiveDate>,
    quantity: Decimal,
    unit_price: Decimal,
    total_price: Decimal,
}

impl From<SaleItemRow> for SaleItem {
    fn from(row: SaleItemRow) -> Self {
        SaleItem {
            id: row.id,
            sale_id: row.sale_id,
            product_id: row.product_id,
            warehouse_id: row.warehouse_id,
            expiry_date: row.expiry_date,
            quantity: row.quantity,
            unit_price: row.unit_price,
            total_price: row.total_price,
        }
    }
}

impl SaleService {
    /// Create a new SaleService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Record a sale and reduce stock. All lines post in one transaction;
    /// if any line would oversell, nothing commits.
    pub async fn create_sale(&self, input: CreateSaleInput) -> AppResult<SaleOutcome> {
        validate_invoice(&input.invoice_number)?;
        validate_items(&input.items)?;

        let invoice_taken = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM sales WHERE invoice_number = $1)",
        )
        .bind(input.invoice_number.trim())
        .fetch_one(&self.db)
        .await?;
        if invoice_taken {
            return Err(AppError::DuplicateEntry("invoice_number".to_string()));
        }

        let mut tx = self.db.begin().await?;

        let priced = price_items(&mut tx, &input.items).await?;
        let (total, tax_total) = sum_totals(&priced);

        let sale = sqlx::query_as::<_, SaleRow>(
            r#"
            INSERT INTO sales (
                invoice_number, sale_date, payment_method,
                total_amount, tax_amount, grand_total, notes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, invoice_number, sale_date, payment_method,
                      total_amount, tax_amount, grand_total, notes,
                      created_at, updated_at
            "#,
        )
        .bind(input.invoice_number.trim())
        .bind(input.sale_date)
        .bind(input.payment_method.as_str())
        .bind(total)
        .bind(tax_total)
        .bind(total + tax_total)
        .bind(&input.notes)
        .fetch_one(&mut *tx)
        .await?;

        let items = insert_items(&mut tx, sale.id, &priced).await?;
        post_sale_movements(&mut tx, sale.id, &sale.invoice_number, &items).await?;

        tx.commit().await?;

        let reduced_products = product_ids(&items);
        Ok(SaleOutcome {
            sale: SaleWithItems {
                sale: sale.try_into()?,
                items,
            },
            reduced_products,
        })
    }

    /// Update a sale. When the line set changes, the previous movements are
    /// reversed with compensating adjustments before the new lines post —
    /// all inside one transaction.
    pub async fn update_sale(
        &self,
        sale_id: Uuid,
        input: UpdateSaleInput,
    ) -> AppResult<SaleOutcome> {
        if let Some(invoice) = &input.invoice_number {
            validate_invoice(invoice)?;
        }
        if let Some(items) = &input.items {
            validate_items(items)?;
        }

        let mut tx = self.db.begin().await?;

        let existing = sqlx::query_as::<_, SaleRow>(
            r#"
            SELECT id, invoice_number, sale_date, payment_method,
                   total_amount, tax_amount, grand_total, notes,
                   created_at, updated_at
            FROM sales
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(sale_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Sale".to_string()))?;

        if let Some(invoice) = &input.invoice_number {
            let invoice_taken = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM sales WHERE invoice_number = $1 AND id <> $2)",
            )
            .bind(invoice.trim())
            .bind(sale_id)
            .fetch_one(&mut *tx)
            .await?;
            if invoice_taken {
                return Err(AppError::DuplicateEntry("invoice_number".to_string()));
            }
        }

        let mut reduced_products = Vec::new();
        let (items, totals) = match &input.items {
            Some(new_items) => {
                let old_items = load_items(&mut tx, sale_id).await?;
                reverse_sale_movements(
                    &mut tx,
                    sale_id,
                    &existing.invoice_number,
                    &old_items,
                    "Stock reverted due to sale update",
                )
                .await?;

                sqlx::query("DELETE FROM sale_items WHERE sale_id = $1")
                    .bind(sale_id)
                    .execute(&mut *tx)
                    .await?;

                let priced = price_items(&mut tx, new_items).await?;
                let totals = sum_totals(&priced);
                let items = insert_items(&mut tx, sale_id, &priced).await?;
                post_sale_movements(&mut tx, sale_id, &existing.invoice_number, &items).await?;
                reduced_products = product_ids(&items);
                (items, Some(totals))
            }
            None => (load_items(&mut tx, sale_id).await?, None),
        };

        let sale = sqlx::query_as::<_, SaleRow>(
            r#"
            UPDATE sales
            SET invoice_number = COALESCE($1, invoice_number),
                sale_date = COALESCE($2, sale_date),
                payment_method = COALESCE($3, payment_method),
                notes = COALESCE($4, notes),
                total_amount = COALESCE($5, total_amount),
                tax_amount = COALESCE($6, tax_amount),
                grand_total = COALESCE($7, grand_total),
                updated_at = NOW()
            WHERE id = $8
            RETURNING id, invoice_number, sale_date, payment_method,
                      total_amount, tax_amount, grand_total, notes,
                      created_at, updated_at
            "#,
        )
        .bind(input.invoice_number.as_deref().map(str::trim))
        .bind(input.sale_date)
        .bind(input.payment_method.map(|m| m.as_str()))
        .bind(&input.notes)
        .bind(totals.map(|(total, _)| total))
        .bind(totals.map(|(_, tax)| tax))
        .bind(totals.map(|(total, tax)| total + tax))
        .bind(sale_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(SaleOutcome {
            sale: SaleWithItems {
                sale: sale.try_into()?,
                items,
            },
            reduced_products,
        })
    }

    /// Delete a sale, reverting its stock with compensating adjustments
    pub async fn delete_sale(&self, sale_id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        let existing = sqlx::query_as::<_, SaleRow>(
            r#"
            SELECT id, invoice_number, sale_date, payment_method,
                   total_amount, tax_amount, grand_total, notes,
                   created_at, updated_at
            FROM sales
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(sale_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Sale".to_string()))?;

        let items = load_items(&mut tx, sale_id).await?;
        reverse_sale_movements(
            &mut tx,
            sale_id,
            &existing.invoice_number,
            &items,
            "Stock reverted due to sale deletion",
        )
        .await?;

        sqlx::query("DELETE FROM sales WHERE id = $1")
            .bind(sale_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(())
    }

    /// Get a sale with its items
    pub async fn get_sale(&self, sale_id: Uuid) -> AppResult<SaleWithItems> {
        let row = sqlx::query_as::<_, SaleRow>(
            r#"
            SELECT id, invoice_number, sale_date, payment_method,
                   total_amount, tax_amount, grand_total, notes,
                   created_at, updated_at
            FROM sales
            WHERE id = $1
            "#,
        )
        .bind(sale_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Sale".to_string()))?;

        let items = sqlx::query_as::<_, SaleItemRow>(
            r#"
            SELECT id, sale_id, product_id, warehouse_id, expiry_date,
                   quantity, unit_price, total_price
            FROM sale_items
            WHERE sale_id = $1
            "#,
        )
        .bind(sale_id)
        .fetch_all(&self.db)
        .await?;

        Ok(SaleWithItems {
            sale: row.try_into()?,
            items: items.into_iter().map(SaleItem::from).collect(),
        })
    }

    /// List sales, newest first, with filters and pagination
    pub async fn list_sales(
        &self,
        filter: &SaleFilter,
        pagination: &Pagination,
    ) -> AppResult<PaginatedResponse<SaleWithItems>> {
        let payment_method = filter.payment_method.map(|m| m.as_str().to_string());
        let invoice_like = filter
            .invoice_number
            .as_ref()
            .map(|inv| format!("%{}%", inv));

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM sales
            WHERE ($1::varchar IS NULL OR payment_method = $1)
              AND ($2::date IS NULL OR sale_date >= $2)
              AND ($3::date IS NULL OR sale_date <= $3)
              AND ($4::varchar IS NULL OR invoice_number ILIKE $4)
            "#,
        )
        .bind(&payment_method)
        .bind(filter.from_date)
        .bind(filter.to_date)
        .bind(&invoice_like)
        .fetch_one(&self.db)
        .await?;

        let rows = sqlx::query_as::<_, SaleRow>(
            r#"
            SELECT id, invoice_number, sale_date, payment_method,
                   total_amount, tax_amount, grand_total, notes,
                   created_at, updated_at
            FROM sales
            WHERE ($1::varchar IS NULL OR payment_method = $1)
              AND ($2::date IS NULL OR sale_date >= $2)
              AND ($3::date IS NULL OR sale_date <= $3)
              AND ($4::varchar IS NULL OR invoice_number ILIKE $4)
            ORDER BY created_at DESC
            LIMIT $5 OFFSET $6
            "#,
        )
        .bind(&payment_method)
        .bind(filter.from_date)
        .bind(filter.to_date)
        .bind(&invoice_like)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let item_rows = sqlx::query_as::<_, SaleItemRow>(
            r#"
            SELECT id, sale_id, product_id, warehouse_id, expiry_date,
                   quantity, unit_price, total_price
            FROM sale_items
            WHERE sale_id = ANY($1)
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.db)
        .await?;

        let mut items_by_sale: std::collections::HashMap<Uuid, Vec<SaleItem>> =
            std::collections::HashMap::new();
        for item in item_rows {
            items_by_sale
                .entry(item.sale_id)
                .or_default()
                .push(item.into());
        }

        let data = rows
            .into_iter()
            .map(|row| {
                let items = items_by_sale.remove(&row.id).unwrap_or_default();
                Ok(SaleWithItems {
                    sale: row.try_into()?,
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

fn validate_invoice(invoice: &str) -> AppResult<()> {
    validation::validate_invoice_number(invoice).map_err(|msg| AppError::Validation {
        field: "invoice_number".to_string(),
        message: msg.to_string(),
        message_th: "เลขที่ใบกำกับไม่ถูกต้อง".to_string(),
    })
}

fn validate_items(items: &[SaleItemInput]) -> AppResult<()> {
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

async fn price_items(
    tx: &mut PgConnection,
    items: &[SaleItemInput],
) -> AppResult<Vec<PricedItem>> {
    let mut priced = Vec::with_capacity(items.len());
    for item in items {
        ensure_warehouse_exists(tx, item.warehouse_id).await?;
        let pricing = product_pricing(tx, item.product_id, &PriceSource::SellingPrice).await?;
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
            expiry_date: item.expiry_date,
            quantity: item.quantity,
            unit_price,
            total_price,
            tax_amount,
        });
    }
    Ok(priced)
}

fn sum_totals(priced: &[PricedItem]) -> (Decimal, Decimal) {
    let total = priced.iter().map(|p| p.total_price).sum();
    let tax = priced.iter().map(|p| p.tax_amount).sum();
    (total, tax)
}

async fn load_items(tx: &mut PgConnection, sale_id: Uuid) -> AppResult<Vec<SaleItem>> {
    let rows = sqlx::query_as::<_, SaleItemRow>(
        r#"
        SELECT id, sale_id, product_id, warehouse_id, expiry_date,
               quantity, unit_price, total_price
        FROM sale_items
        WHERE sale_id = $1
        "#,
    )
    .bind(sale_id)
    .fetch_all(&mut *tx)
    .await?;
    Ok(rows.into_iter().map(SaleItem::from).collect())
}

async fn insert_items(
    tx: &mut PgConnection,
    sale_id: Uuid,
    priced: &[PricedItem],
) -> AppResult<Vec<SaleItem>> {
    let mut items = Vec::with_capacity(priced.len());
    for item in priced {
        let row = sqlx::query_as::<_, SaleItemRow>(
            r#"
            INSERT INTO sale_items (
                sale_id, product_id, warehouse_id, expiry_date,
                quantity, unit_price, total_price
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, sale_id, product_id, warehouse_id, expiry_date,
                      quantity, unit_price, total_price
            "#,
        )
        .bind(sale_id)
        .bind(item.product_id)
        .bind(item.warehouse_id)
        .bind(item.expiry_date)
        .bind(item.quantity)
        .bind(item.unit_price)
        .bind(item.total_price)
        .fetch_one(&mut *tx)
        .await?;
        items.push(row.into());
    }
    Ok(items)
}

/// Post one outbound `sale` movement per line
async fn post_sale_movements(
    tx: &mut PgConnection,
    sale_id: Uuid,
    invoice_number: &str,
    items: &[SaleItem],
) -> AppResult<()> {
    for item in items {
        LedgerService::apply_movement_in(
            tx,
            &MovementInput {
                product_id: item.product_id,
                warehouse_id: item.warehouse_id,
                expiry_date: item.expiry_date,
                quantity: -item.quantity,
                movement_type: MovementType::Sale,
                reference_type: Some("Sale".to_string()),
                reference_id: Some(sale_id),
                notes: Some(format!("Stock sold via invoice: {}", invoice_number)),
            },
        )
        .await?;
    }
    Ok(())
}

/// Compensate every posted line with an opposite-signed adjustment against
/// the same batch key
async fn reverse_sale_movements(
    tx: &mut PgConnection,
    sale_id: Uuid,
    invoice_number: &str,
    items: &[SaleItem],
    reason: &str,
) -> AppResult<()> {
    for item in items {
        LedgerService::apply_movement_in(
            tx,
            &MovementInput {
                product_id: item.product_id,
                warehouse_id: item.warehouse_id,
                expiry_date: item.expiry_date,
                quantity: item.quantity,
                movement_type: MovementType::Adjustment,
                reference_type: Some("Sale".to_string()),
                reference_id: Some(sale_id),
                notes: Some(format!("{}: {}", reason, invoice_number)),
            },
        )
        .await?;
    }
    Ok(())
}

fn product_ids(items: &[SaleItem]) -> Vec<Uuid> {
    let mut ids: Vec<Uuid> = items.iter().map(|i| i.product_id).collect();
    ids.sort();
    ids.dedup();
    ids
}
