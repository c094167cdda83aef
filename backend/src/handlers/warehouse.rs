//! HTTP handlers for warehouse endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::Warehouse;
use shared::{Pagination, PaginatedResponse};
use crate::services::warehouse::{
    CreateWarehouseInput, UpdateWarehouseInput, WarehouseFilter, WarehouseService,
};
use crate::AppState;

/// Query parameters for warehouse listings
#[derive(Debug, Deserialize)]
pub struct WarehouseListQuery {
    pub is_active: Option<bool>,
    pub search: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// List warehouses
pub async fn list_warehouses(
    State(state): State<AppState>,
    Query(query): Query<WarehouseListQuery>,
) -> AppResult<Json<PaginatedResponse<Warehouse>>> {
    let service = WarehouseService::new(state.db);
    let pagination = Pagination {
        page: query.page.unwrap_or(1),
        per_page: query
            .per_page
            .unwrap_or(state.config.stock.default_page_size),
    };
    let filter = WarehouseFilter {
        is_active: query.is_active,
        search: query.search,
    };
    let warehouses = service.list_warehouses(&filter, &pagination).await?;
    Ok(Json(warehouses))
}

/// Create a warehouse
pub async fn create_warehouse(
    State(state): State<AppState>,
    Json(input): Json<CreateWarehouseInput>,
) -> AppResult<Json<Warehouse>> {
    let service = WarehouseService::new(state.db);
    let warehouse = service.create_warehouse(input).await?;
    Ok(Json(warehouse))
}

/// Get a warehouse
pub async fn get_warehouse(
    State(state): State<AppState>,
    Path(warehouse_id): Path<Uuid>,
) -> AppResult<Json<Warehouse>> {
    let service = WarehouseService::new(state.db);
    let warehouse = service.get_warehouse(warehouse_id).await?;
    Ok(Json(warehouse))
}

/// Update a warehouse
pub async fn update_warehouse(
    State(state): State<AppState>,
    Path(warehouse_id): Path<Uuid>,
    Json(input): Json<UpdateWarehouseInput>,
) -> AppResult<Json<Warehouse>> {
    let service = WarehouseService::new(state.db);
    let warehouse = service.update_warehouse(warehouse_id, input).await?;
    Ok(Json(warehouse))
}

/// Deactivate a warehouse
pub async fn delete_warehouse(
    State(state): State<AppState>,
    Path(warehouse_id): Path<Uuid>,
) -> AppResult<Json<()>> {
    let service = WarehouseService::new(state.db);
    service.deactivate_warehouse(warehouse_id).await?;
    Ok(Json(()))
}
