//! Supplier management service

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::Supplier;
use shared::{Pagination, PaginatedResponse, PaginationMeta};
use shared::validation;

/// Supplier service
#[derive(Clone)]
pub struct SupplierService {
    db: PgPool,
}

/// Input for creating a supplier
#[derive(Debug, Deserialize)]
pub struct CreateSupplierInput {
    pub name: String,
    pub code: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
}

/// Input for updating a supplier
#[derive(Debug, Deserialize)]
pub struct UpdateSupplierInput {
    pub name: Option<String>,
    pub code: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub is_active: Option<bool>,
}

/// Filters for supplier listings
#[derive(Debug, Default, Deserialize)]
pub struct SupplierFilter {
    pub is_active: Option<bool>,
    pub search: Option<String>,
}

#[derive(Debug, FromRow)]
struct SupplierRow {
    id: Uuid,
    name: String,
    code: String,
    phone: Option<String>,
    email: Option<String>,
    address: Option<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<SupplierRow> for Supplier {
    fn from(row: SupplierRow) -> Self {
        Supplier {
            id: row.id,
            name: row.name,
            code: row.code,
            phone: row.phone,
            email: row.email,
            address: row.address,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl SupplierService {
    /// Create a new SupplierService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create a supplier
    pub async fn create_supplier(&self, input: CreateSupplierInput) -> AppResult<Supplier> {
        validate_code(&input.code)?;
        self.ensure_code_free(&input.code, None).await?;

        let row = sqlx::query_as::<_, SupplierRow>(
            r#"
            INSERT INTO suppliers (name, code, phone, email, address)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, name, code, phone, email, address, is_active,
                      created_at, updated_at
            "#,
        )
        .bind(input.name.trim())
        .bind(input.code.trim())
        .bind(&input.phone)
        .bind(&input.email)
        .bind(&input.address)
        .fetch_one(&self.db)
        .await?;

        Ok(row.into())
    }

    /// Update a supplier
    pub async fn update_supplier(
        &self,
        supplier_id: Uuid,
        input: UpdateSupplierInput,
    ) -> AppResult<Supplier> {
        if let Some(code) = &input.code {
            validate_code(code)?;
            self.ensure_code_free(code, Some(supplier_id)).await?;
        }

        let row = sqlx::query_as::<_, SupplierRow>(
            r#"
            UPDATE suppliers
            SET name = COALESCE($1, name),
                code = COALESCE($2, code),
                phone = COALESCE($3, phone),
                email = COALESCE($4, email),
                address = COALESCE($5, address),
                is_active = COALESCE($6, is_active),
                updated_at = NOW()
            WHERE id = $7
            RETURNING id, name, code, phone, email, address, is_active,
                      created_at, updated_at
            "#,
        )
        .bind(input.name.as_deref().map(str::trim))
        .bind(input.code.as_deref().map(str::trim))
        .bind(&input.phone)
        .bind(&input.email)
        .bind(&input.address)
        .bind(input.is_active)
        .bind(supplier_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Supplier".to_string()))?;

        Ok(row.into())
    }

    /// Get a supplier by ID
    pub async fn get_supplier(&self, supplier_id: Uuid) -> AppResult<Supplier> {
        let row = sqlx::query_as::<_, SupplierRow>(
            r#"
            SELECT id, name, code, phone, email, address, is_active,
                   created_at, updated_at
            FROM suppliers
            WHERE id = $1
            "#,
        )
        .bind(supplier_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Supplier".to_string()))?;

        Ok(row.into())
    }

    /// List suppliers with filters and pagination
    pub async fn list_suppliers(
        &self,
        filter: &SupplierFilter,
        pagination: &Pagination,
    ) -> AppResult<PaginatedResponse<Supplier>> {
        let search_like = filter.search.as_ref().map(|s| format!("%{}%", s));

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM suppliers
            WHERE ($1::boolean IS NULL OR is_active = $1)
              AND ($2::varchar IS NULL OR name ILIKE $2 OR code ILIKE $2)
            "#,
        )
        .bind(filter.is_active)
        .bind(&search_like)
        .fetch_one(&self.db)
        .await?;

        let rows = sqlx::query_as::<_, SupplierRow>(
            r#"
            SELECT id, name, code, phone, email, address, is_active,
                   created_at, updated_at
            FROM suppliers
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
            data: rows.into_iter().map(Supplier::from).collect(),
            pagination: PaginationMeta::new(pagination, total as u64),
        })
    }

    /// Deactivate a supplier. Purchases keep referencing it, so the row
    /// stays; it just disappears from active listings.
    pub async fn deactivate_supplier(&self, supplier_id: Uuid) -> AppResult<()> {
        let result =
            sqlx::query("UPDATE suppliers SET is_active = FALSE, updated_at = NOW() WHERE id = $1")
                .bind(supplier_id)
                .execute(&self.db)
                .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Supplier".to_string()));
        }
        Ok(())
    }

    async fn ensure_code_free(&self, code: &str, exclude: Option<Uuid>) -> AppResult<()> {
        let taken = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM suppliers WHERE code = $1 AND ($2::uuid IS NULL OR id <> $2))",
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
