//! Low-stock and expiry watcher
//!
//! Pure read-side checks over committed stock levels. Emission is a row in
//! the alert queue written after the mutation committed; draining the
//! queue and delivering notifications belongs to an external notifier, so
//! calling the watcher redundantly is harmless.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::ledger::ExpiringBatch;

/// Alert service: watcher checks plus the outgoing alert queue
#[derive(Clone)]
pub struct AlertService {
    db: PgPool,
}

/// A product at or below its configured minimum stock
#[derive(Debug, Clone, Serialize)]
pub struct LowStockAlert {
    pub product_id: Uuid,
    pub product_name: String,
    pub current_total: Decimal,
    pub min_stock: Decimal,
}

/// A queued alert event awaiting external delivery
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct QueuedAlert {
    pub id: Uuid,
    pub alert_type: String,
    pub product_id: Uuid,
    pub warehouse_id: Option<Uuid>,
    pub expiry_date: Option<NaiveDate>,
    pub current_quantity: Decimal,
    pub threshold: Option<Decimal>,
    pub title: String,
    pub title_th: String,
    pub message: String,
    pub message_th: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl AlertService {
    /// Create a new AlertService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Recompute one product's total on-hand quantity across all batches
    /// and warehouses; `Some` when it sits at or below a positive
    /// threshold. Read-only.
    pub async fn check_product(&self, product_id: Uuid) -> AppResult<Option<LowStockAlert>> {
        let row = sqlx::query_as::<_, (Uuid, String, Decimal, Decimal)>(
            r#"
            SELECT p.id, p.name, p.min_stock, COALESCE(SUM(s.quantity), 0)
            FROM products p
            LEFT JOIN stocks s ON s.product_id = p.id
            WHERE p.id = $1
            GROUP BY p.id, p.name, p.min_stock
            "#,
        )
        .bind(product_id)
        .fetch_optional(&self.db)
        .await?;

        let Some((product_id, product_name, min_stock, current_total)) = row else {
            return Ok(None);
        };

        if min_stock > Decimal::ZERO && current_total <= min_stock {
            Ok(Some(LowStockAlert {
                product_id,
                product_name,
                current_total,
                min_stock,
            }))
        } else {
            Ok(None)
        }
    }

    /// Run the low-stock check for every product a committed mutation
    /// reduced, queueing one alert event per product below threshold.
    /// Returns the number of events queued.
    pub async fn notify_reduced_products(&self, product_ids: &[Uuid]) -> AppResult<u32> {
        let mut queued = 0;
        for &product_id in product_ids {
            if let Some(alert) = self.check_product(product_id).await? {
                tracing::warn!(
                    product_id = %alert.product_id,
                    current_total = %alert.current_total,
                    min_stock = %alert.min_stock,
                    "low stock threshold crossed"
                );
                self.queue_low_stock(&alert).await?;
                queued += 1;
            }
        }
        Ok(queued)
    }

    /// Queue a low-stock alert event
    pub async fn queue_low_stock(&self, alert: &LowStockAlert) -> AppResult<Uuid> {
        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO alert_queue (
                alert_type, product_id, current_quantity, threshold,
                title, title_th, message, message_th
            )
            VALUES ('low_stock', $1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(alert.product_id)
        .bind(alert.current_total)
        .bind(alert.min_stock)
        .bind("Low Stock Alert")
        .bind("แจ้งเตือนสินค้าใกล้หมด")
        .bind(format!(
            "Product '{}' is running low. Current stock: {}",
            alert.product_name, alert.current_total
        ))
        .bind(format!(
            "สินค้า '{}' ใกล้หมด คงเหลือ: {}",
            alert.product_name, alert.current_total
        ))
        .fetch_one(&self.db)
        .await?;

        Ok(id)
    }

    /// Queue an expiry-warning alert event for a batch inside the warning
    /// horizon. The ledger is not touched.
    pub async fn queue_expiry_warning(&self, batch: &ExpiringBatch) -> AppResult<Uuid> {
        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO alert_queue (
                alert_type, product_id, warehouse_id, expiry_date,
                current_quantity, title, title_th, message, message_th
            )
            VALUES ('expiry_warning', $1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(batch.product_id)
        .bind(batch.warehouse_id)
        .bind(batch.expiry_date)
        .bind(batch.quantity)
        .bind("Stock Expiry Alert")
        .bind("แจ้งเตือนสินค้าใกล้หมดอายุ")
        .bind(format!(
            "Batch of '{}' in '{}' is expiring on {}. Quantity: {}",
            batch.product_name, batch.warehouse_name, batch.expiry_date, batch.quantity
        ))
        .bind(format!(
            "สินค้า '{}' ในคลัง '{}' จะหมดอายุวันที่ {} จำนวน {}",
            batch.product_name, batch.warehouse_name, batch.expiry_date, batch.quantity
        ))
        .fetch_one(&self.db)
        .await?;

        Ok(id)
    }

    /// Every product currently at or below its positive minimum threshold
    pub async fn low_stock_products(&self) -> AppResult<Vec<LowStockAlert>> {
        let rows = sqlx::query_as::<_, (Uuid, String, Decimal, Decimal)>(
            r#"
            SELECT p.id, p.name, p.min_stock, COALESCE(SUM(s.quantity), 0) AS total
            FROM products p
            LEFT JOIN stocks s ON s.product_id = p.id
            WHERE p.min_stock > 0 AND p.is_active = TRUE
            GROUP BY p.id, p.name, p.min_stock
            HAVING COALESCE(SUM(s.quantity), 0) <= p.min_stock
            ORDER BY p.name
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(
                |(product_id, product_name, min_stock, current_total)| LowStockAlert {
                    product_id,
                    product_name,
                    current_total,
                    min_stock,
                },
            )
            .collect())
    }

    /// Pending alert events, oldest first, for the external notifier
    pub async fn pending_alerts(&self, limit: i64) -> AppResult<Vec<QueuedAlert>> {
        let alerts = sqlx::query_as::<_, QueuedAlert>(
            r#"
            SELECT id, alert_type, product_id, warehouse_id, expiry_date,
                   current_quantity, threshold, title, title_th,
                   message, message_th, status, created_at
            FROM alert_queue
            WHERE status = 'pending'
            ORDER BY created_at
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.db)
        .await?;

        Ok(alerts)
    }
}
