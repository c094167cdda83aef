//! HTTP handlers for alert and scheduled-trigger endpoints
//!
//! The trigger endpoints are hit by an external scheduler (daily); they
//! run the expiry warning pass and the expired-stock write-off.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::error::AppResult;
use crate::services::alerts::{LowStockAlert, QueuedAlert};
use crate::services::expiry::ExpirySweepSummary;
use crate::services::{AlertService, ExpiryService};
use crate::AppState;

/// Query parameters for the expiry-check trigger
#[derive(Debug, Deserialize)]
pub struct ExpiryCheckQuery {
    pub days: Option<i64>,
}

/// Query parameters for the pending-alert listing
#[derive(Debug, Deserialize)]
pub struct PendingAlertsQuery {
    pub limit: Option<i64>,
}

/// Products currently at or below their minimum stock
pub async fn list_low_stock(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<LowStockAlert>>> {
    let service = AlertService::new(state.db);
    let alerts = service.low_stock_products().await?;
    Ok(Json(alerts))
}

/// Pending alert events awaiting external delivery
pub async fn list_pending_alerts(
    State(state): State<AppState>,
    Query(query): Query<PendingAlertsQuery>,
) -> AppResult<Json<Vec<QueuedAlert>>> {
    let service = AlertService::new(state.db);
    let alerts = service.pending_alerts(query.limit.unwrap_or(50)).await?;
    Ok(Json(alerts))
}

/// Trigger the expiry warning pass; queues an alert per expiring batch
pub async fn trigger_expiry_check(
    State(state): State<AppState>,
    Query(query): Query<ExpiryCheckQuery>,
) -> AppResult<Json<u32>> {
    let service = ExpiryService::new(state.db);
    let days = query.days.unwrap_or(state.config.stock.expiry_warning_days);
    let queued = service.check_expiring(days).await?;
    Ok(Json(queued))
}

/// Trigger the expired-stock write-off sweep
pub async fn trigger_process_expired(
    State(state): State<AppState>,
) -> AppResult<Json<ExpirySweepSummary>> {
    let service = ExpiryService::new(state.db);
    let summary = service.process_expired().await?;
    Ok(Json(summary))
}
