//! Product catalog service

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::Product;
use shared::{Pagination, PaginatedResponse, PaginationMeta};
use shared::validation;

/// Product service
#[derive(Clone)]
pub struct ProductService {
    db: PgPool,
}

/// Input for creating a product
#[derive(Debug, Deserialize)]
pub struct CreateProductInput {
    pub name: String,
    pub code: String,
    pub category_id: Option<Uuid>,
    pub unit: Option<String>,
    pub barcode: Option<String>,
    pub purchase_price: Option<Decimal>,
    pub selling_price: Option<Decimal>,
    pub min_stock: Option<Decimal>,
    pub has_expiry: Option<bool>,
    pub is_vatable: Option<bool>,
}

/// Input for updating a product
#[derive(Debug, Deserialize)]
pub struct UpdateProductInput {
    pub name: Option<String>,
    pub code: Option<String>,
    pub category_id: Option<Uuid>,
    pub unit: Option<String>,
    pub barcode: Option<String>,
    pub purchase_price: Option<Decimal>,
    pub selling_price: Option<Decimal>,
    pub min_stock: Option<Decimal>,
    pub has_expiry: Option<bool>,
    pub is_active: Option<bool>,
    pub is_vatable: Option<bool>,
}

/// Filters for product listings
#[derive(Debug, Default, Deserialize)]
pub struct ProductFilter {
    pub category_id: Option<Uuid>,
    pub is_active: Option<bool>,
    /// Matches name, code or barcode
    pub search: Option<String>,
}

#[derive(Debug, FromRow)]
struct ProductRow {
    id: Uuid,
    name: String,
    code: String,
    category_id: Option<Uuid>,
    unit: String,
    barcode: Option<String>,
    purchase_price: Decimal,
    selling_price: Decimal,
    min_stock: Decimal,
    has_expiry: bool,
    is_active: bool,
    is_vatable: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            name: row.name,
            code: row.code,
            category_id: row.category_id,
            unit: row.unit,
            barcode: row.barcode,
            purchase_price: row.purchase_price,
            selling_price: row.selling_price,
            min_stock: row.min_stock,
            has_expiry: row.has_expiry,
            is_active: row.is_active,
            is_vatable: row.is_vatable,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl ProductService {
    /// Create a new ProductService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create a product
    pub async fn create_product(&self, input: CreateProductInput) -> AppResult<Product> {
        validate_code(&input.code)?;
        validate_prices(
            input.purchase_price,
            input.selling_price,
            input.min_stock,
        )?;
        self.ensure_code_free(&input.code, None).await?;
        if let Some(category_id) = input.category_id {
            self.ensure_category_exists(category_id).await?;
        }

        let row = sqlx::query_as::<_, ProductRow>(
            r#"
            INSERT INTO products (
                name, code, category_id, unit, barcode,
                purchase_price, selling_price, min_stock, has_expiry, is_vatable
            )
            VALUES ($1, $2, $3, COALESCE($4, 'pcs'), $5,
                    COALESCE($6, 0), COALESCE($7, 0), COALESCE($8, 0),
                    COALESCE($9, FALSE), COALESCE($10, FALSE))
            RETURNING id, name, code, category_id, unit, barcode,
                      purchase_price, selling_price, min_stock, has_expiry,
                      is_active, is_vatable, created_at, updated_at
            "#,
        )
        .bind(input.name.trim())
        .bind(input.code.trim())
        .bind(input.category_id)
        .bind(&input.unit)
        .bind(&input.barcode)
        .bind(input.purchase_price)
        .bind(input.selling_price)
        .bind(input.min_stock)
        .bind(input.has_expiry)
        .bind(input.is_vatable)
        .fetch_one(&self.db)
        .await?;

        Ok(row.into())
    }

    /// Update a product
    pub async fn update_product(
        &self,
        product_id: Uuid,
        input: UpdateProductInput,
    ) -> AppResult<Product> {
        if let Some(code) = &input.code {
            validate_code(code)?;
            self.ensure_code_free(code, Some(product_id)).await?;
        }
        validate_prices(
            input.purchase_price,
            input.selling_price,
            input.min_stock,
        )?;
        if let Some(category_id) = input.category_id {
            self.ensure_category_exists(category_id).await?;
        }

        let row = sqlx::query_as::<_, ProductRow>(
            r#"
            UPDATE products
            SET name = COALESCE($1, name),
                code = COALESCE($2, code),
                category_id = COALESCE($3, category_id),
                unit = COALESCE($4, unit),
                barcode = COALESCE($5, barcode),
                purchase_price = COALESCE($6, purchase_price),
                selling_price = COALESCE($7, selling_price),
                min_stock = COALESCE($8, min_stock),
                has_expiry = COALESCE($9, has_expiry),
                is_active = COALESCE($10, is_active),
                is_vatable = COALESCE($11, is_vatable),
                updated_at = NOW()
            WHERE id = $12
            RETURNING id, name, code, category_id, unit, barcode,
                      purchase_price, selling_price, min_stock, has_expiry,
                      is_active, is_vatable, created_at, updated_at
            "#,
        )
        .bind(input.name.as_deref().map(str::trim))
        .bind(input.code.as_deref().map(str::trim))
        .bind(input.category_id)
        .bind(&input.unit)
        .bind(&input.barcode)
        .bind(input.purchase_price)
        .bind(input.selling_price)
        .bind(input.min_stock)
        .bind(input.has_expiry)
        .bind(input.is_active)
        .bind(input.is_vatable)
        .bind(product_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

        Ok(row.into())
    }

    /// Get a product by ID
    pub async fn get_product(&self, product_id: Uuid) -> AppResult<Product> {
        let row = sqlx::query_as::<_, ProductRow>(
            r#"
            SELECT id, name, code, category_id, unit, barcode,
                   purchase_price, selling_price, min_stock, has_expiry,
                   is_active, is_vatable, created_at, updated_at
            FROM products
            WHERE id = $1
            "#,
        )
        .bind(product_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

        Ok(row.into())
    }

    /// List products with filters and pagination
    pub async fn list_products(
        &self,
        filter: &ProductFilter,
        pagination: &Pagination,
    ) -> AppResult<PaginatedResponse<Product>> {
        let search_like = filter.search.as_ref().map(|s| format!("%{}%", s));

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM products
            WHERE ($1::uuid IS NULL OR category_id = $1)
              AND ($2::boolean IS NULL OR is_active = $2)
              AND ($3::varchar IS NULL OR name ILIKE $3 OR code ILIKE $3 OR barcode ILIKE $3)
            "#,
        )
        .bind(filter.category_id)
        .bind(filter.is_active)
        .bind(&search_like)
        .fetch_one(&self.db)
        .await?;

        let rows = sqlx::query_as::<_, ProductRow>(
            r#"
            SELECT id, name, code, category_id, unit, barcode,
                   purchase_price, selling_price, min_stock, has_expiry,
                   is_active, is_vatable, created_at, updated_at
            FROM products
            WHERE ($1::uuid IS NULL OR category_id = $1)
              AND ($2::boolean IS NULL OR is_active = $2)
              AND ($3::varchar IS NULL OR name ILIKE $3 OR code ILIKE $3 OR barcode ILIKE $3)
            ORDER BY name
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(filter.category_id)
        .bind(filter.is_active)
        .bind(&search_like)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse {
            data: rows.into_iter().map(Product::from).collect(),
            pagination: PaginationMeta::new(pagination, total as u64),
        })
    }

    /// Deactivate a product. Its stock records and movement history remain
    /// untouched; it just stops appearing in active listings.
    pub async fn deactivate_product(&self, product_id: Uuid) -> AppResult<()> {
        let result =
            sqlx::query("UPDATE products SET is_active = FALSE, updated_at = NOW() WHERE id = $1")
                .bind(product_id)
                .execute(&self.db)
                .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Product".to_string()));
        }
        Ok(())
    }

    async fn ensure_code_free(&self, code: &str, exclude: Option<Uuid>) -> AppResult<()> {
        let taken = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM products WHERE code = $1 AND ($2::uuid IS NULL OR id <> $2))",
        )
        .bind(code.trim())
        .bind(exclude)
        .fetch_one(&self.db)
        .await?;
        if taken {
            return Err(AppError::DuplicateEntry("code".to_string()));
        }
        Ok(())
    }

    async fn ensure_category_exists(&self, category_id: Uuid) -> AppResult<()> {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM categories WHERE id = $1)")
                .bind(category_id)
                .fetch_one(&self.db)
                .await?;
        if !exists {
            return Err(AppError::NotFound("Category".to_string()));
        }
        Ok(())
    }
}

fn validate_code(code: &str) -> AppResult<()> {
    validation::validate_entity_code(code.trim()).map_err(|msg| AppError::Validation {
        field: "code".to_string(),
        message: msg.to_string(),
        message_th: "รหัสสินค้าไม่ถูกต้อง".to_string(),
    })
}

fn validate_prices(
    purchase_price: Option<Decimal>,
    selling_price: Option<Decimal>,
    min_stock: Option<Decimal>,
) -> AppResult<()> {
    for (field, price) in [
        ("purchase_price", purchase_price),
        ("selling_price", selling_price),
    ] {
        if let Some(price) = price {
            validation::validate_unit_price(price).map_err(|msg| AppError::Validation {
                field: field.to_string(),
                message: msg.to_string(),
                message_th: "ราคาต้องไม่ติดลบ".to_string(),
            })?;
        }
    }
    if let Some(threshold) = min_stock {
        validation::validate_min_stock(threshold).map_err(|msg| AppError::Validation {
            field: "min_stock".to_string(),
            message: msg.to_string(),
            message_th: "จำนวนขั้นต่ำต้องไม่ติดลบ".to_string(),
        })?;
    }
    Ok(())
}
