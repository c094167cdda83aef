//! Expiry sweeper
//!
//! Two daily passes driven by an external scheduler hitting the trigger
//! endpoints: a warning pass that hands soon-to-expire batches to the
//! watcher, and a write-off pass that zeroes expired batches through the
//! ledger engine. The write-off processes each batch as its own atomic
//! unit; one failing batch never blocks the rest.

use serde::Serialize;
use sqlx::PgPool;

use crate::error::{AppError, AppResult};
use crate::services::alerts::AlertService;
use crate::services::ledger::LedgerService;
use shared::validation;

/// Expiry service running the sweep and warning passes
#[derive(Clone)]
pub struct ExpiryService {
    ledger: LedgerService,
    alerts: AlertService,
}

/// Outcome of one write-off sweep
#[derive(Debug, Clone, Serialize)]
pub struct ExpirySweepSummary {
    /// Batches matched by the scan (expired, quantity > 0)
    pub found: usize,
    /// Batches zeroed out with an `expired` movement recorded
    pub processed: u32,
    /// Batches already empty by the time their row lock was taken
    pub skipped: u32,
    /// Batches whose write-off failed; logged and left for the next sweep
    pub failed: u32,
}

impl ExpiryService {
    /// Create a new ExpiryService instance
    pub fn new(db: PgPool) -> Self {
        Self {
            ledger: LedgerService::new(db.clone()),
            alerts: AlertService::new(db),
        }
    }

    /// Zero out every expired batch that still has stock on hand. Each
    /// batch commits on its own; the quantity is re-read under the row
    /// lock so a concurrent sale between scan and sweep cannot be
    /// double-removed.
    pub async fn process_expired(&self) -> AppResult<ExpirySweepSummary> {
        let batches = self.ledger.expired_batches().await?;
        let mut summary = ExpirySweepSummary {
            found: batches.len(),
            processed: 0,
            skipped: 0,
            failed: 0,
        };

        if batches.is_empty() {
            tracing::info!("No expired stock found");
            return Ok(summary);
        }

        tracing::info!("Found {} expired stock batches. Processing...", batches.len());

        for batch in &batches {
            match self.ledger.expire_batch(batch.stock_id).await {
                Ok(Some(applied)) => {
                    summary.processed += 1;
                    tracing::info!(
                        product_id = %batch.product_id,
                        warehouse_id = %batch.warehouse_id,
                        expiry_date = %batch.expiry_date,
                        quantity = %applied.movement.quantity,
                        "expired batch written off"
                    );
                }
                Ok(None) => {
                    summary.skipped += 1;
                }
                Err(err) => {
                    summary.failed += 1;
                    tracing::error!(
                        product_id = %batch.product_id,
                        warehouse_id = %batch.warehouse_id,
                        expiry_date = %batch.expiry_date,
                        error = %err,
                        "failed to write off expired batch"
                    );
                }
            }
        }

        tracing::info!(
            processed = summary.processed,
            skipped = summary.skipped,
            failed = summary.failed,
            "Expired stock processing completed"
        );
        Ok(summary)
    }

    /// Warning pass: queue an expiry alert for every batch expiring within
    /// the horizon. Read-only with respect to the ledger. Returns the
    /// number of alerts queued.
    pub async fn check_expiring(&self, horizon_days: i64) -> AppResult<u32> {
        validation::validate_expiry_horizon(horizon_days).map_err(|msg| {
            AppError::Validation {
                field: "days".to_string(),
                message: msg.to_string(),
                message_th: "จำนวนวันแจ้งเตือนล่วงหน้าไม่ถูกต้อง".to_string(),
            }
        })?;

        let batches = self.ledger.expiring_batches(horizon_days).await?;
        if batches.is_empty() {
            tracing::info!("No expiring stock found");
            return Ok(0);
        }

        let mut queued = 0;
        for batch in &batches {
            self.alerts.queue_expiry_warning(batch).await?;
            queued += 1;
        }

        tracing::info!("Queued expiry warnings for {} batches", queued);
        Ok(queued)
    }
}
