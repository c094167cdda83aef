//! Warehouse management service

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::Warehouse;
use shared::{Pagination, PaginatedResponse, PaginationMeta};
use shared::validation;

/// Warehouse service
#[derive(Clone)]
pub struct WarehouseService {
    db: PgPool,
}

/// Input for creating a warehouse
#[derive(Debug, Deserialize)]
pub struct CreateWarehouseInput {
    pub name: String,
    pub code: String,
    pub address: Option<String>,
    pub phone: Option<String>,
}

/// Input for updating a warehouse
#[derive(Debug, Deserialize)]
pub struct UpdateWarehouseInput {
    pub name: Option<String>,
    pub code: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub is_active: Option<bool>,
}

/// Filters for warehouse listings
#[derive(Debug, Default, Deserialize)]
pub struct WarehouseFilter {
    pub is_active: Option<bool>,
    pub search: Option<String>,
}

#[derive(Debug, FromRow)]
struct WarehouseRow {
    id: Uuid,
    name: String,
    code: String,
    address: Option<String>,
    phone: Option<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<WarehouseRow> for Warehouse {
    fn from(row: WarehouseRow) -> Self {
        Warehouse {
            id: row.id,
            name: row.name,
            code: row.code,
            address: row.address,
            phone: row.phone,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl WarehouseService {
    /// Create a new WarehouseService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create a warehouse
    pub async fn create_warehouse(&self, input: CreateWarehouseInput) -> AppResult<Warehouse> {
        validate_code(&input.code)?;
        self.ensure_code_free(&input.code, None).await?;

        let row = sqlx::query_as::<_, WarehouseRow>(
            r#"
            INSERT INTO warehouses (name, code, address, phone)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, code, address, phone, is_active,
                      created_at, updated_at
            "#,
        )
        .bind(input.name.trim())
        .bind(input.code.trim())
        .bind(&input.address)
        .bind(&input.phone)
        .fetch_one(&self.db)
        .await?;

        Ok(row.into())
    }

    /// Update a warehouse
    pub async fn update_warehouse(
        &self,
        warehouse_id: Uuid,
        input: UpdateWarehouseInput,
    ) -> AppResult<Warehouse> {
        if let Some(code) = &input.code {
            validate_code(code)?;
            self.ensure_code_free(code, Some(warehouse_id)).await?;
        }

        let row = sqlx::query_as::<_, WarehouseRow>(
            r#"
            UPDATE warehouses
            SET name = COALESCE($1, name),
                code = COALESCE($2, code),
                address = COALESCE($3, address),
                phone = COALESCE($4, phone),
                is_active = COALESCE($5, is_active),
                updated_at = NOW()
            WHERE id = $6
            RETURNING id, name, code, address, phone, is_active,
                      created_at, updated_at
            "#,
        )
        .bind(input.name.as_deref().map(str::trim))
        .bind(input.code.as_deref().map(str::trim))
        .bind(&input.address)
        .bind(&input.phone)
        .bind(input.is_active)
        .bind(warehouse_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Warehouse".to_string()))?;

        Ok(row.into())
    }

    /// Get a warehouse by ID
    pub async fn get_warehouse(&self, warehouse_id: Uuid) -> AppResult<Warehouse> {
        let row = sqlx::query_as::<_, WarehouseRow>(
            r#"
            SELECT id, name, code, address, phone, is_active,
                   created_at, updated_at
            FROM warehouses
            WHERE id = $1
            "#,
        )
        .bind(warehouse_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Warehouse".to_string()))?;

        Ok(row.into())
    }

    /// List warehouses with filters and pagination
    pub async fn list_warehouses(
        &self,
        filter: &WarehouseFilter,
        pagination: &Pagination,
    ) -> AppResult<PaginatedResponse<Warehouse>> {
        let search_like = filter.search.as_ref().map(|s| format!("%{}%", s));

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM warehouses
            WHERE ($1::boolean IS NULL OR is_active = $1)
              AND ($2::varchar IS NULL OR name ILIKE $2 OR code ILIKE $2)
            "#,
        )
        .bind(filter.is_active)
        .bind(&search_like)
        .fetch_one(&self.db)
        .await?;

        let rows = sqlx::query_as::<_, WarehouseRow>(
            r#"
            SELECT id, name, code, address, phone, is_active,
                   created_at, updated_at
            FROM warehouses
            WHERE ($1::boolean IS NULL OR is_active = $1)
              AND ($2::varchar IS NULL OR name ILIKE $2 OR code ILIKE $2)
            ORDER BY name
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(filter.is_active)
        .bind(&search_like)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse {
            data: rows.into_iter().map(Warehouse::from).collect(),
            pagination: PaginationMeta::new(pagination, total as u64),
        })
    }

    /// Deactivate a warehouse. Stock records keep referencing it; it just
    /// disappears from active listings.
    pub async fn deactivate_warehouse(&self, warehouse_id: Uuid) -> AppResult<()> {
        let result =
            sqlx::query("UPDATE warehouses SET is_active = FALSE, updated_at = NOW() WHERE id = $1")
                .bind(warehouse_id)
                .execute(&self.db)
                .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Warehouse".to_string()));
        }
        Ok(())
    }

    async fn ensure_code_free(&self, code: &str, exclude: Option<Uuid>) -> AppResult<()> {
        let taken = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM warehouses WHERE code = $1 AND ($2::uuid IS NULL OR id <> $2))",
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
}

fn validate_code(code: &str) -> AppResult<()> {
    validation::validate_entity_code(code.trim()).map_err(|msg| AppError::Validation {
        field: "code".to_string(),
        message: msg.to_string(),
        message_th: "รหัสไม่ถูกต้อง".to_string(),
    })
}
