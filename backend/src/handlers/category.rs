//! HTTP handlers for category endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::Category;
use shared::{Pagination, PaginatedResponse};
use crate::services::category::{
    CategoryFilter, CategoryService, CreateCategoryInput, UpdateCategoryInput,
};
use crate::AppState;

/// Query parameters for category listings
#[derive(Debug, Deserialize)]
pub struct CategoryListQuery {
    pub is_active: Option<bool>,
    pub search: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// List categories
pub async fn list_categories(
    State(state): State<AppState>,
    Query(query): Query<CategoryListQuery>,
) -> AppResult<Json<PaginatedResponse<Category>>> {
    let service = CategoryService::new(state.db);
    let pagination = Pagination {
        page: query.page.unwrap_or(1),
        per_page: query
            .per_page
            .unwrap_or(state.config.stock.default_page_size),
    };
    let filter = CategoryFilter {
        is_active: query.is_active,
        search: query.search,
    };
    let categories = service.list_categories(&filter, &pagination).await?;
    Ok(Json(categories))
}

/// Create a category
pub async fn create_category(
    State(state): State<AppState>,
    Json(input): Json<CreateCategoryInput>,
) -> AppResult<Json<Category>> {
    let service = CategoryService::new(state.db);
    let category = service.create_category(input).await?;
    Ok(Json(category))
}

/// Get a category
pub async fn get_category(
    State(state): State<AppState>,
    Path(category_id): Path<Uuid>,
) -> AppResult<Json<Category>> {
    let service = CategoryService::new(state.db);
    let category = service.get_category(category_id).await?;
    Ok(Json(category))
}

/// Update a category
pub async fn update_category(
    State(state): State<AppState>,
    Path(category_id): Path<Uuid>,
    Json(input): Json<UpdateCategoryInput>,
) -> AppResult<Json<Category>> {
    let service = CategoryService::new(state.db);
    let category = service.update_category(category_id, input).await?;
    Ok(Json(category))
}

/// Delete a category
pub async fn delete_category(
    State(state): State<AppState>,
    Path(category_id): Path<Uuid>,
) -> AppResult<Json<()>> {
    let service = CategoryService::new(state.db);
    service.delete_category(category_id).await?;
    Ok(Json(()))
}
