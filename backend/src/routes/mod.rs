//! Route definitions for the Inventory Management Platform

use axum::{
    routing::{get, post},
    Router,
};

use crate::{handlers, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Category management
        .nest("/categories", category_routes())
        // Supplier management
        .nest("/suppliers", supplier_routes())
        // Warehouse management
        .nest("/warehouses", warehouse_routes())
        // Product catalog
        .nest("/products", product_routes())
        // Stock ledger
        .nest("/stock", stock_routes())
        // Purchase documents
        .nest("/purchases", purchase_routes())
        // Sale documents
        .nest("/sales", sale_routes())
        // Alerts and scheduled triggers
        .nest("/alerts", alert_routes())
}

/// Category management routes
fn category_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_categories).post(handlers::create_category),
        )
        .route(
            "/:category_id",
            get(handlers::get_category)
                .put(handlers::update_category)
                .delete(handlers::delete_category),
        )
}

/// Supplier management routes
fn supplier_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_suppliers).post(handlers::create_supplier),
        )
        .route(
            "/:supplier_id",
            get(handlers::get_supplier)
                .put(handlers::update_supplier)
                .delete(handlers::delete_supplier),
        )
}

/// Warehouse management routes
fn warehouse_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_warehouses).post(handlers::create_warehouse),
        )
        .route(
            "/:warehouse_id",
            get(handlers::get_warehouse)
                .put(handlers::update_warehouse)
                .delete(handlers::delete_warehouse),
        )
}

/// Product catalog routes
fn product_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_products).post(handlers::create_product),
        )
        .route(
            "/:product_id",
            get(handlers::get_product)
                .put(handlers::update_product)
                .delete(handlers::delete_product),
        )
}

/// Stock ledger routes
fn stock_routes() -> Router<AppState> {
    Router::new()
        // Movements
        .route(
            "/movements",
            get(handlers::list_movements).post(handlers::record_adjustment),
        )
        // Per-product stock and history
        .route("/products/:product_id", get(handlers::get_product_stock))
        .route(
            "/products/:product_id/movements",
            get(handlers::get_movement_history),
        )
        .route(
            "/products/:product_id/warehouses/:warehouse_id",
            get(handlers::get_batch_level),
        )
        // Expiry
        .route("/expiring", get(handlers::list_expiring_batches))
}

/// Purchase document routes
fn purchase_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_purchases).post(handlers::create_purchase),
        )
        .route(
            "/:purchase_id",
            get(handlers::get_purchase)
                .put(handlers::update_purchase)
                .delete(handlers::delete_purchase),
        )
        .route("/:purchase_id/receive", post(handlers::receive_purchase))
        .route("/:purchase_id/cancel", post(handlers::cancel_purchase))
}

/// Sale document routes
fn sale_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_sales).post(handlers::create_sale))
        .route(
            "/:sale_id",
            get(handlers::get_sale)
                .put(handlers::update_sale)
                .delete(handlers::delete_sale),
        )
}

/// Alert and scheduled-trigger routes
fn alert_routes() -> Router<AppState> {
    Router::new()
        .route("/low-stock", get(handlers::list_low_stock))
        .route("/pending", get(handlers::list_pending_alerts))
        // Hit daily by the external scheduler
        .route("/triggers/check-expiry", post(handlers::trigger_expiry_check))
        .route(
            "/triggers/process-expired",
            post(handlers::trigger_process_expired),
        )
}
