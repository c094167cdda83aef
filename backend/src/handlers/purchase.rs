//! HTTP handlers for purchase endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{Purchase, PurchaseStatus, PurchaseWithItems};
use shared::{Pagination, PaginatedResponse};
use crate::services::purchase::{
    CreatePurchaseInput, PurchaseFilter, PurchaseService, UpdatePurchaseInput,
};
use crate::services::AlertService;
use crate::AppState;

/// Query parameters for purchase listings
#[derive(Debug, Deserialize)]
pub struct PurchaseListQuery {
    pub status: Option<PurchaseStatus>,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
    pub invoice_number: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// List purchases with filters and pagination
pub async fn list_purchases(
    State(state): State<AppState>,
    Query(query): Query<PurchaseListQuery>,
) -> AppResult<Json<PaginatedResponse<PurchaseWithItems>>> {
    let service = PurchaseService::new(state.db);
    let pagination = Pagination {
        page: query.page.unwrap_or(1),
        per_page: query
            .per_page
            .unwrap_or(state.config.stock.default_page_size),
    };
    let filter = PurchaseFilter {
        status: query.status,
        from_date: query.from_date,
        to_date: query.to_date,
        invoice_number: query.invoice_number,
    };
    let purchases = service.list_purchases(&filter, &pagination).await?;
    Ok(Json(purchases))
}

/// Record a purchase; posts stock when received immediately
pub async fn create_purchase(
    State(state): State<AppState>,
    Json(input): Json<CreatePurchaseInput>,
) -> AppResult<Json<PurchaseWithItems>> {
    let service = PurchaseService::new(state.db);
    let purchase = service.create_purchase(input).await?;
    Ok(Json(purchase))
}

/// Get a purchase with its items
pub async fn get_purchase(
    State(state): State<AppState>,
    Path(purchase_id): Path<Uuid>,
) -> AppResult<Json<PurchaseWithItems>> {
    let service = PurchaseService::new(state.db);
    let purchase = service.get_purchase(purchase_id).await?;
    Ok(Json(purchase))
}

/// Update a pending purchase
pub async fn update_purchase(
    State(state): State<AppState>,
    Path(purchase_id): Path<Uuid>,
    Json(input): Json<UpdatePurchaseInput>,
) -> AppResult<Json<PurchaseWithItems>> {
    let service = PurchaseService::new(state.db);
    let purchase = service.update_purchase(purchase_id, input).await?;
    Ok(Json(purchase))
}

/// Delete a purchase, reversing its stock if it was received
pub async fn delete_purchase(
    State(state): State<AppState>,
    Path(purchase_id): Path<Uuid>,
) -> AppResult<Json<()>> {
    let service = PurchaseService::new(state.db.clone());
    let reduced_products = service.delete_purchase(purchase_id).await?;

    // Watcher runs after the reversal committed
    if !reduced_products.is_empty() {
        let alerts = AlertService::new(state.db);
        alerts.notify_reduced_products(&reduced_products).await?;
    }

    Ok(Json(()))
}

/// Mark a pending purchase as received and post its stock
pub async fn receive_purchase(
    State(state): State<AppState>,
    Path(purchase_id): Path<Uuid>,
) -> AppResult<Json<PurchaseWithItems>> {
    let service = PurchaseService::new(state.db);
    let purchase = service.receive_purchase(purchase_id).await?;
    Ok(Json(purchase))
}

/// Cancel a pending purchase
pub async fn cancel_purchase(
    State(state): State<AppState>,
    Path(purchase_id): Path<Uuid>,
) -> AppResult<Json<Purchase>> {
    let service = PurchaseService::new(state.db);
    let purchase = service.cancel_purchase(purchase_id).await?;
    Ok(Json(purchase))
}
