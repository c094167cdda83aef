//! HTTP handlers for stock ledger endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{BatchKey, MovementHistoryEntry, MovementType, StockMovement, StockRecord};
use shared::{Pagination, PaginatedResponse};
use crate::services::ledger::{
    AppliedMovement, ExpiringBatch, LedgerService, MovementFilter, RecordAdjustmentInput,
};
use crate::services::AlertService;
use crate::AppState;

/// Query parameters for movement listings
#[derive(Debug, Deserialize)]
pub struct MovementListQuery {
    pub product_id: Option<Uuid>,
    pub warehouse_id: Option<Uuid>,
    #[serde(rename = "type")]
    pub movement_type: Option<MovementType>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// Query parameters for product stock lookups
#[derive(Debug, Deserialize)]
pub struct ProductStockQuery {
    pub warehouse_id: Option<Uuid>,
}

/// Query parameters for single-batch lookups
#[derive(Debug, Deserialize)]
pub struct BatchLevelQuery {
    pub expiry_date: Option<NaiveDate>,
}

/// Query parameters for movement history
#[derive(Debug, Deserialize)]
pub struct MovementHistoryQuery {
    pub warehouse_id: Option<Uuid>,
    #[serde(rename = "type")]
    pub movement_type: Option<MovementType>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// Query parameters for the expiring-batch listing
#[derive(Debug, Deserialize)]
pub struct ExpiringQuery {
    pub days: Option<i64>,
}

/// Per-batch stock for a product plus the cross-warehouse total
#[derive(Debug, serde::Serialize)]
pub struct ProductStockResponse {
    pub product_id: Uuid,
    pub total: Decimal,
    pub records: Vec<StockRecord>,
}

/// List stock movements with optional filters
pub async fn list_movements(
    State(state): State<AppState>,
    Query(query): Query<MovementListQuery>,
) -> AppResult<Json<PaginatedResponse<StockMovement>>> {
    let service = LedgerService::new(state.db);
    let pagination = pagination_from(query.page, query.per_page, &state.config);
    let filter = MovementFilter {
        product_id: query.product_id,
        warehouse_id: query.warehouse_id,
        movement_type: query.movement_type,
    };
    let movements = service.list_movements(&filter, &pagination).await?;
    Ok(Json(movements))
}

/// Record a manual stock movement (damage, loss, found, adjustment,
/// opening stock)
pub async fn record_adjustment(
    State(state): State<AppState>,
    Json(input): Json<RecordAdjustmentInput>,
) -> AppResult<Json<AppliedMovement>> {
    let service = LedgerService::new(state.db.clone());
    let applied = service.record_adjustment(input).await?;

    // Watcher runs after the mutation committed, and only for reductions
    if applied.movement.quantity < Decimal::ZERO {
        let alerts = AlertService::new(state.db);
        alerts
            .notify_reduced_products(&[applied.movement.product_id])
            .await?;
    }

    Ok(Json(applied))
}

/// Current stock for a product: one record per batch plus the total
pub async fn get_product_stock(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
    Query(query): Query<ProductStockQuery>,
) -> AppResult<Json<ProductStockResponse>> {
    let service = LedgerService::new(state.db);
    let total = service.product_total(product_id, query.warehouse_id).await?;
    let records = service.stock_levels_for_product(product_id).await?;
    Ok(Json(ProductStockResponse {
        product_id,
        total,
        records,
    }))
}

/// Current quantity for one exact batch key; missing records read as zero
pub async fn get_batch_level(
    State(state): State<AppState>,
    Path((product_id, warehouse_id)): Path<(Uuid, Uuid)>,
    Query(query): Query<BatchLevelQuery>,
) -> AppResult<Json<Decimal>> {
    let service = LedgerService::new(state.db);
    let key = BatchKey::new(product_id, warehouse_id, query.expiry_date);
    let quantity = service.stock_level(&key).await?;
    Ok(Json(quantity))
}

/// Paginated movement history for a product with running balances
pub async fn get_movement_history(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
    Query(query): Query<MovementHistoryQuery>,
) -> AppResult<Json<PaginatedResponse<MovementHistoryEntry>>> {
    let service = LedgerService::new(state.db);
    let pagination = pagination_from(query.page, query.per_page, &state.config);
    let history = service
        .movement_history(product_id, query.warehouse_id, query.movement_type, &pagination)
        .await?;
    Ok(Json(history))
}

/// Batches expiring within the horizon (default from configuration)
pub async fn list_expiring_batches(
    State(state): State<AppState>,
    Query(query): Query<ExpiringQuery>,
) -> AppResult<Json<Vec<ExpiringBatch>>> {
    let service = LedgerService::new(state.db);
    let days = query.days.unwrap_or(state.config.stock.expiry_warning_days);
    let batches = service.expiring_batches(days).await?;
    Ok(Json(batches))
}

fn pagination_from(
    page: Option<u32>,
    per_page: Option<u32>,
    config: &crate::Config,
) -> Pagination {
    Pagination {
        page: page.unwrap_or(1),
        per_page: per_page.unwrap_or(config.stock.default_page_size),
    }
}
