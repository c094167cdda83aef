//! HTTP handlers for sale endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{PaymentMethod, SaleWithItems};
use shared::{Pagination, PaginatedResponse};
use crate::services::sale::{CreateSaleInput, SaleFilter, SaleService, UpdateSaleInput};
use crate::services::AlertService;
use crate::AppState;

/// Query parameters for sale listings
#[derive(Debug, Deserialize)]
pub struct SaleListQuery {
    pub payment_method: Option<PaymentMethod>,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
    pub invoice_number: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// List sales with filters and pagination
pub async fn list_sales(
    State(state): State<AppState>,
    Query(query): Query<SaleListQuery>,
) -> AppResult<Json<PaginatedResponse<SaleWithItems>>> {
    let service = SaleService::new(state.db);
    let pagination = Pagination {
        page: query.page.unwrap_or(1),
        per_page: query
            .per_page
            .unwrap_or(state.config.stock.default_page_size),
    };
    let filter = SaleFilter {
        payment_method: query.payment_method,
        from_date: query.from_date,
        to_date: query.to_date,
        invoice_number: query.invoice_number,
    };
    let sales = service.list_sales(&filter, &pagination).await?;
    Ok(Json(sales))
}

/// Record a sale and reduce stock; all lines post or none do
pub async fn create_sale(
    State(state): State<AppState>,
    Json(input): Json<CreateSaleInput>,
) -> AppResult<Json<SaleWithItems>> {
    let service = SaleService::new(state.db.clone());
    let outcome = service.create_sale(input).await?;

    // Watcher runs after the sale committed
    let alerts = AlertService::new(state.db);
    alerts
        .notify_reduced_products(&outcome.reduced_products)
        .await?;

    Ok(Json(outcome.sale))
}

/// Get a sale with its items
pub async fn get_sale(
    State(state): State<AppState>,
    Path(sale_id): Path<Uuid>,
) -> AppResult<Json<SaleWithItems>> {
    let service = SaleService::new(state.db);
    let sale = service.get_sale(sale_id).await?;
    Ok(Json(sale))
}

/// Update a sale, reversing and re-posting its stock when lines change
pub async fn update_sale(
    State(state): State<AppState>,
    Path(sale_id): Path<Uuid>,
    Json(input): Json<UpdateSaleInput>,
) -> AppResult<Json<SaleWithItems>> {
    let service = SaleService::new(state.db.clone());
    let outcome = service.update_sale(sale_id, input).await?;

    if !outcome.reduced_products.is_empty() {
        let alerts = AlertService::new(state.db);
        alerts
            .notify_reduced_products(&outcome.reduced_products)
            .await?;
    }

    Ok(Json(outcome.sale))
}

/// Delete a sale, reverting its stock
pub async fn delete_sale(
    State(state): State<AppState>,
    Path(sale_id): Path<Uuid>,
) -> AppResult<Json<()>> {
    let service = SaleService::new(state.db);
    service.delete_sale(sale_id).await?;
    Ok(Json(()))
}
