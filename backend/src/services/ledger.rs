//! Stock ledger engine
//!
//! The single owner of the invariant linking stock records to movement
//! entries: a record's quantity always equals the signed sum of its
//! movements. Every mutation locks the batch row, validates the resulting
//! balance, and writes the record update and the movement entry in one
//! transaction.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{BatchKey, MovementHistoryEntry, MovementType, StockMovement, StockRecord};
use shared::{Pagination, PaginatedResponse, PaginationMeta};

/// Ledger service owning all stock-record mutations
#[derive(Clone)]
pub struct LedgerService {
    db: PgPool,
}

/// Intent for one ledger mutation
#[derive(Debug, Clone, Deserialize)]
pub struct MovementInput {
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    /// `None` targets the non-expiring batch
    pub expiry_date: Option<NaiveDate>,
    /// Signed delta: positive inbound, negative outbound. Never zero.
    pub quantity: Decimal,
    pub movement_type: MovementType,
    pub reference_type: Option<String>,
    pub reference_id: Option<Uuid>,
    pub notes: Option<String>,
}

/// Result of one applied movement
#[derive(Debug, Clone, Serialize)]
pub struct AppliedMovement {
    pub stock: StockRecord,
    pub movement: StockMovement,
}

/// Input for a manual stock movement (damage, loss, found, adjustment,
/// opening stock). Quantity is a positive magnitude; the sign is derived
/// from the type.
#[derive(Debug, Deserialize)]
pub struct RecordAdjustmentInput {
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    pub expiry_date: Option<NaiveDate>,
    pub quantity: Decimal,
    #[serde(rename = "type")]
    pub movement_type: MovementType,
    pub notes: Option<String>,
}

/// Filters for movement listings
#[derive(Debug, Default, Deserialize)]
pub struct MovementFilter {
    pub product_id: Option<Uuid>,
    pub warehouse_id: Option<Uuid>,
    pub movement_type: Option<MovementType>,
}

/// A dated batch close to (or past) its expiry date
#[derive(Debug, Clone, Serialize)]
pub struct ExpiringBatch {
    pub stock_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub warehouse_id: Uuid,
    pub warehouse_name: String,
    pub expiry_date: NaiveDate,
    pub quantity: Decimal,
    pub days_until_expiry: i32,
}

/// Row for stock record queries
#[derive(Debug, FromRow)]
struct StockRow {
    id: Uuid,
    product_id: Uuid,
    warehouse_id: Uuid,
    expiry_date: Option<NaiveDate>,
    quantity: Decimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<StockRow> for StockRecord {
    fn from(row: StockRow) -> Self {
        StockRecord {
            id: row.id,
            product_id: row.product_id,
            warehouse_id: row.warehouse_id,
            expiry_date: row.expiry_date,
            quantity: row.quantity,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Row for movement queries; `movement_type` arrives as text and is parsed
#[derive(Debug, FromRow)]
struct MovementRow {
    id: Uuid,
    seq: i64,
    product_id: Uuid,
    warehouse_id: Uuid,
    expiry_date: Option<NaiveDate>,
    quantity: Decimal,
    movement_type: String,
    reference_type: Option<String>,
    reference_id: Option<Uuid>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<MovementRow> for StockMovement {
    type Error = AppError;

    fn try_from(row: MovementRow) -> Result<Self, Self::Error> {
        let movement_type = row
            .movement_type
            .parse::<MovementType>()
            .map_err(AppError::Internal)?;
        Ok(StockMovement {
            id: row.id,
            seq: row.seq,
            product_id: row.product_id,
            warehouse_id: row.warehouse_id,
            expiry_date: row.expiry_date,
            quantity: row.quantity,
            movement_type,
            reference_type: row.reference_type,
            reference_id: row.reference_id,
            notes: row.notes,
            created_at: row.created_at,
        })
    }
}

/// Row for history queries with the correlated running balance
#[derive(Debug, FromRow)]
struct HistoryRow {
    id: Uuid,
    seq: i64,
    created_at: DateTime<Utc>,
    movement_type: String,
    warehouse_id: Uuid,
    warehouse_name: String,
    reference_type: Option<String>,
    reference_id: Option<Uuid>,
    quantity: Decimal,
    notes: Option<String>,
    balance: Decimal,
}

impl LedgerService {
    /// Create a new LedgerService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Apply one movement in its own transaction
    pub async fn apply_movement(&self, input: MovementInput) -> AppResult<AppliedMovement> {
        let mut tx = self.db.begin().await?;
        let applied = Self::apply_movement_in(&mut tx, &input).await?;
        tx.commit().await?;
        Ok(applied)
    }

    /// Apply one movement inside the caller's transaction.
    ///
    /// Locks the batch row for the duration of the read-check-write
    /// sequence. A missing record is created with quantity 0 first, but
    /// only for inbound deltas; an outbound delta against a missing record
    /// fails with zero availability. Both writes commit with the caller's
    /// transaction or not at all.
    pub async fn apply_movement_in(
        tx: &mut PgConnection,
        input: &MovementInput,
    ) -> AppResult<AppliedMovement> {
        if input.quantity.is_zero() {
            return Err(AppError::ValidationError(
                "Movement quantity must be non-zero".to_string(),
            ));
        }

        if input.quantity > Decimal::ZERO {
            // Serialize concurrent first-writers on the batch-key index
            sqlx::query(
                r#"
                INSERT INTO stocks (product_id, warehouse_id, expiry_date, quantity)
                VALUES ($1, $2, $3, 0)
                ON CONFLICT (product_id, warehouse_id, COALESCE(expiry_date, '9999-12-31'::date))
                DO NOTHING
                "#,
            )
            .bind(input.product_id)
            .bind(input.warehouse_id)
            .bind(input.expiry_date)
            .execute(&mut *tx)
            .await?;
        }

        let locked = sqlx::query_as::<_, StockRow>(
            r#"
            SELECT id, product_id, warehouse_id, expiry_date, quantity, created_at, updated_at
            FROM stocks
            WHERE product_id = $1
              AND warehouse_id = $2
              AND COALESCE(expiry_date, '9999-12-31'::date) = COALESCE($3::date, '9999-12-31'::date)
            FOR UPDATE
            "#,
        )
        .bind(input.product_id)
        .bind(input.warehouse_id)
        .bind(input.expiry_date)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(locked) = locked else {
            // Only reachable for outbound deltas; inbound created the row above
            return Err(AppError::InsufficientStock {
                product_id: input.product_id,
                warehouse_id: input.warehouse_id,
                expiry_date: input.expiry_date,
                requested: -input.quantity,
                available: Decimal::ZERO,
            });
        };

        let new_quantity = locked.quantity + input.quantity;
        if new_quantity < Decimal::ZERO {
            return Err(AppError::InsufficientStock {
                product_id: input.product_id,
                warehouse_id: input.warehouse_id,
                expiry_date: input.expiry_date,
                requested: -input.quantity,
                available: locked.quantity,
            });
        }

        let stock = sqlx::query_as::<_, StockRow>(
            r#"
            UPDATE stocks
            SET quantity = $1, updated_at = NOW()
            WHERE id = $2
            RETURNING id, product_id, warehouse_id, expiry_date, quantity, created_at, updated_at
            "#,
        )
        .bind(new_quantity)
        .bind(locked.id)
        .fetch_one(&mut *tx)
        .await?;

        let movement = sqlx::query_as::<_, MovementRow>(
            r#"
            INSERT INTO stock_movements (
                product_id, warehouse_id, expiry_date, quantity, type,
                reference_type, reference_id, notes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, seq, product_id, warehouse_id, expiry_date, quantity,
                      type AS movement_type, reference_type, reference_id, notes, created_at
            "#,
        )
        .bind(input.product_id)
        .bind(input.warehouse_id)
        .bind(input.expiry_date)
        .bind(input.quantity)
        .bind(input.movement_type.as_str())
        .bind(&input.reference_type)
        .bind(input.reference_id)
        .bind(&input.notes)
        .fetch_one(&mut *tx)
        .await?;

        Ok(AppliedMovement {
            stock: stock.into(),
            movement: movement.try_into()?,
        })
    }

    /// Record a manual stock movement (damage, loss, found, adjustment,
    /// opening stock). The caller supplies a positive magnitude; the sign
    /// comes from the type.
    pub async fn record_adjustment(
        &self,
        input: RecordAdjustmentInput,
    ) -> AppResult<AppliedMovement> {
        if !input.movement_type.is_manual() {
            return Err(AppError::Validation {
                field: "movement_type".to_string(),
                message: format!(
                    "Type {} cannot be recorded manually",
                    input.movement_type
                ),
                message_th: format!(
                    "ไม่สามารถบันทึกประเภท {} ด้วยตนเองได้",
                    input.movement_type
                ),
            });
        }

        if input.quantity <= Decimal::ZERO {
            return Err(AppError::Validation {
                field: "quantity".to_string(),
                message: "Quantity must be positive".to_string(),
                message_th: "ปริมาณต้องเป็นค่าบวก".to_string(),
            });
        }

        // Damage and loss reduce stock; the other manual types add to it
        let delta = match input.movement_type {
            MovementType::Damage | MovementType::Lost => -input.quantity,
            _ => input.quantity,
        };

        self.apply_movement(MovementInput {
            product_id: input.product_id,
            warehouse_id: input.warehouse_id,
            expiry_date: input.expiry_date,
            quantity: delta,
            movement_type: input.movement_type,
            reference_type: Some("Manual Adjustment".to_string()),
            reference_id: None,
            notes: input.notes,
        })
        .await
    }

    /// Zero out one expired batch, re-reading the quantity under the row
    /// lock. Returns `None` when the batch was already empty or gone.
    pub async fn expire_batch(&self, stock_id: Uuid) -> AppResult<Option<AppliedMovement>> {
        let mut tx = self.db.begin().await?;

        let locked = sqlx::query_as::<_, StockRow>(
            r#"
            SELECT id, product_id, warehouse_id, expiry_date, quantity, created_at, updated_at
            FROM stocks
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(stock_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(locked) = locked else {
            return Ok(None);
        };
        if locked.quantity <= Decimal::ZERO {
            return Ok(None);
        }
        let Some(expiry_date) = locked.expiry_date else {
            return Ok(None);
        };

        let input = MovementInput {
            product_id: locked.product_id,
            warehouse_id: locked.warehouse_id,
            expiry_date: Some(expiry_date),
            quantity: -locked.quantity,
            movement_type: MovementType::Expired,
            reference_type: Some("Stock Expiry".to_string()),
            reference_id: None,
            notes: Some(format!("Stock expired on {}. Auto-removed.", expiry_date)),
        };
        let applied = Self::apply_movement_in(&mut tx, &input).await?;
        tx.commit().await?;

        Ok(Some(applied))
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Current quantity for one batch key; a missing record reads as zero
    pub async fn stock_level(&self, key: &BatchKey) -> AppResult<Decimal> {
        let quantity = sqlx::query_scalar::<_, Decimal>(
            r#"
            SELECT quantity
            FROM stocks
            WHERE product_id = $1
              AND warehouse_id = $2
              AND COALESCE(expiry_date, '9999-12-31'::date) = COALESCE($3::date, '9999-12-31'::date)
            "#,
        )
        .bind(key.product_id)
        .bind(key.warehouse_id)
        .bind(key.expiry_date)
        .fetch_optional(&self.db)
        .await?;

        Ok(quantity.unwrap_or(Decimal::ZERO))
    }

    /// Total on-hand quantity for a product, summed across batches and,
    /// unless narrowed, across warehouses
    pub async fn product_total(
        &self,
        product_id: Uuid,
        warehouse_id: Option<Uuid>,
    ) -> AppResult<Decimal> {
        let quantity = sqlx::query_scalar::<_, Option<Decimal>>(
            r#"
            SELECT SUM(quantity)
            FROM stocks
            WHERE product_id = $1
              AND ($2::uuid IS NULL OR warehouse_id = $2)
            "#,
        )
        .bind(product_id)
        .bind(warehouse_id)
        .fetch_one(&self.db)
        .await?;

        Ok(quantity.unwrap_or(Decimal::ZERO))
    }

    /// All stock records for a product (one per batch key)
    pub async fn stock_levels_for_product(
        &self,
        product_id: Uuid,
    ) -> AppResult<Vec<StockRecord>> {
        let rows = sqlx::query_as::<_, StockRow>(
            r#"
            SELECT id, product_id, warehouse_id, expiry_date, quantity, created_at, updated_at
            FROM stocks
            WHERE product_id = $1
            ORDER BY warehouse_id, COALESCE(expiry_date, '9999-12-31'::date)
            "#,
        )
        .bind(product_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(StockRecord::from).collect())
    }

    /// List movements, newest first, with optional filters
    pub async fn list_movements(
        &self,
        filter: &MovementFilter,
        pagination: &Pagination,
    ) -> AppResult<PaginatedResponse<StockMovement>> {
        let movement_type = filter.movement_type.map(|t| t.as_str().to_string());

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM stock_movements
            WHERE ($1::uuid IS NULL OR product_id = $1)
              AND ($2::uuid IS NULL OR warehouse_id = $2)
              AND ($3::varchar IS NULL OR type = $3)
            "#,
        )
        .bind(filter.product_id)
        .bind(filter.warehouse_id)
        .bind(&movement_type)
        .fetch_one(&self.db)
        .await?;

        let rows = sqlx::query_as::<_, MovementRow>(
            r#"
            SELECT id, seq, product_id, warehouse_id, expiry_date, quantity,
                   type AS movement_type, reference_type, reference_id, notes, created_at
            FROM stock_movements
            WHERE ($1::uuid IS NULL OR product_id = $1)
              AND ($2::uuid IS NULL OR warehouse_id = $2)
              AND ($3::varchar IS NULL OR type = $3)
            ORDER BY created_at DESC, seq DESC
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(filter.product_id)
        .bind(filter.warehouse_id)
        .bind(&movement_type)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        let data = rows
            .into_iter()
            .map(StockMovement::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(PaginatedResponse {
            data,
            pagination: PaginationMeta::new(pagination, total as u64),
        })
    }

    /// Paginated movement history for a product with a running balance per
    /// row.
    ///
    /// The balance at entry M sums every movement in the same scope up to
    /// and including M, ordered by (created_at, seq) — the seq column makes
    /// the order a strict total order even when timestamps collide. The
    /// type filter narrows the listing but never the balance scope.
    pub async fn movement_history(
        &self,
        product_id: Uuid,
        warehouse_id: Option<Uuid>,
        movement_type: Option<MovementType>,
        pagination: &Pagination,
    ) -> AppResult<PaginatedResponse<MovementHistoryEntry>> {
        let type_str = movement_type.map(|t| t.as_str().to_string());

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM stock_movements
            WHERE product_id = $1
              AND ($2::uuid IS NULL OR warehouse_id = $2)
              AND ($3::varchar IS NULL OR type = $3)
            "#,
        )
        .bind(product_id)
        .bind(warehouse_id)
        .bind(&type_str)
        .fetch_one(&self.db)
        .await?;

        let rows = sqlx::query_as::<_, HistoryRow>(
            r#"
            SELECT m.id, m.seq, m.created_at, m.type AS movement_type,
                   m.warehouse_id, w.name AS warehouse_name,
                   m.reference_type, m.reference_id, m.quantity, m.notes,
                   (
                       SELECT COALESCE(SUM(b.quantity), 0)
                       FROM stock_movements b
                       WHERE b.product_id = m.product_id
                         AND ($2::uuid IS NULL OR b.warehouse_id = $2)
                         AND (b.created_at < m.created_at
                              OR (b.created_at = m.created_at AND b.seq <= m.seq))
                   ) AS balance
            FROM stock_movements m
            JOIN warehouses w ON w.id = m.warehouse_id
            WHERE m.product_id = $1
              AND ($2::uuid IS NULL OR m.warehouse_id = $2)
              AND ($3::varchar IS NULL OR m.type = $3)
            ORDER BY m.created_at DESC, m.seq DESC
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(product_id)
        .bind(warehouse_id)
        .bind(&type_str)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        let data = rows
            .into_iter()
            .map(|row| {
                let movement_type = row
                    .movement_type
                    .parse::<MovementType>()
                    .map_err(AppError::Internal)?;
                let (inbound, outbound) = if row.quantity > Decimal::ZERO {
                    (row.quantity, Decimal::ZERO)
                } else {
                    (Decimal::ZERO, -row.quantity)
                };
                Ok(MovementHistoryEntry {
                    id: row.id,
                    seq: row.seq,
                    date: row.created_at,
                    movement_type,
                    warehouse_id: row.warehouse_id,
                    warehouse_name: row.warehouse_name,
                    reference_type: row.reference_type,
                    reference_id: row.reference_id,
                    inbound,
                    outbound,
                    balance: row.balance,
                    notes: row.notes,
                })
            })
            .collect::<AppResult<Vec<_>>>()?;

        Ok(PaginatedResponse {
            data,
            pagination: PaginationMeta::new(pagination, total as u64),
        })
    }

    /// Batches with stock on hand expiring within `horizon_days` from today
    pub async fn expiring_batches(&self, horizon_days: i64) -> AppResult<Vec<ExpiringBatch>> {
        let rows = sqlx::query_as::<_, (Uuid, Uuid, String, Uuid, String, NaiveDate, Decimal, i32)>(
            r#"
            SELECT s.id, s.product_id, p.name, s.warehouse_id, w.name,
                   s.expiry_date, s.quantity,
                   (s.expiry_date - CURRENT_DATE)::int AS days_until_expiry
            FROM stocks s
            JOIN products p ON p.id = s.product_id
            JOIN warehouses w ON w.id = s.warehouse_id
            WHERE s.expiry_date IS NOT NULL
              AND s.expiry_date >= CURRENT_DATE
              AND s.expiry_date <= CURRENT_DATE + $1::int
              AND s.quantity > 0
            ORDER BY s.expiry_date, p.name
            "#,
        )
        .bind(horizon_days as i32)
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(
                |(stock_id, product_id, product_name, warehouse_id, warehouse_name, expiry_date, quantity, days)| {
                    ExpiringBatch {
                        stock_id,
                        product_id,
                        product_name,
                        warehouse_id,
                        warehouse_name,
                        expiry_date,
                        quantity,
                        days_until_expiry: days,
                    }
                },
            )
            .collect())
    }

    /// Batches already past their expiry date with stock still on hand
    pub async fn expired_batches(&self) -> AppResult<Vec<ExpiringBatch>> {
        let rows = sqlx::query_as::<_, (Uuid, Uuid, String, Uuid, String, NaiveDate, Decimal, i32)>(
            r#"
            SELECT s.id, s.product_id, p.name, s.warehouse_id, w.name,
                   s.expiry_date, s.quantity,
                   (s.expiry_date - CURRENT_DATE)::int AS days_until_expiry
            FROM stocks s
            JOIN products p ON p.id = s.product_id
            JOIN warehouses w ON w.id = s.warehouse_id
            WHERE s.expiry_date IS NOT NULL
              AND s.expiry_date < CURRENT_DATE
              AND s.quantity > 0
            ORDER BY s.expiry_date
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(
                |(stock_id, product_id, product_name, warehouse_id, warehouse_name, expiry_date, quantity, days)| {
                    ExpiringBatch {
                        stock_id,
                        product_id,
                        product_name,
                        warehouse_id,
                        warehouse_name,
                        expiry_date,
                        quantity,
                        days_until_expiry: days,
                    }
                },
            )
            .collect())
    }
}
