//! Category management service

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::Category;
use shared::{Pagination, PaginatedResponse, PaginationMeta};
use shared::validation;

/// Category service for product grouping
#[derive(Clone)]
pub struct CategoryService {
    db: PgPool,
}

/// Input for creating a category
#[derive(Debug, Deserialize)]
pub struct CreateCategoryInput {
    pub name: String,
    pub code: String,
    pub description: Option<String>,
}

/// Input for updating a category
#[derive(Debug, Deserialize)]
pub struct UpdateCategoryInput {
    pub name: Option<String>,
    pub code: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

/// Filters for category listings
#[derive(Debug, Default, Deserialize)]
pub struct CategoryFilter {
    pub is_active: Option<bool>,
    pub search: Option<String>,
}

#[derive(Debug, FromRow)]
struct CategoryRow {
    id: Uuid,
    name: String,
    code: String,
    description: Option<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Category {
            id: row.id,
            name: row.name,
            code: row.code,
            description: row.description,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl CategoryService {
    /// Create a new CategoryService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create a category
    pub async fn create_category(&self, input: CreateCategoryInput) -> AppResult<Category> {
        validate_code(&input.code)?;
        self.ensure_code_free(&input.code, None).await?;

        let row = sqlx::query_as::<_, CategoryRow>(
            r#"
            INSERT INTO categories (name, code, description)
            VALUES ($1, $2, $3)
            RETURNING id, name, code, description, is_active, created_at, updated_at
            "#,
        )
        .bind(input.name.trim())
        .bind(input.code.trim())
        .bind(&input.description)
        .fetch_one(&self.db)
        .await?;

        Ok(row.into())
    }

    /// Update a category
    pub async fn update_category(
        &self,
        category_id: Uuid,
        input: UpdateCategoryInput,
    ) -> AppResult<Category> {
        if let Some(code) = &input.code {
            validate_code(code)?;
            self.ensure_code_free(code, Some(category_id)).await?;
        }

        let row = sqlx::query_as::<_, CategoryRow>(
            r#"
            UPDATE categories
            SET name = COALESCE($1, name),
                code = COALESCE($2, code),
                description = COALESCE($3, description),
                is_active = COALESCE($4, is_active),
                updated_at = NOW()
            WHERE id = $5
            RETURNING id, name, code, description, is_active, created_at, updated_at
            "#,
        )
        .bind(input.name.as_deref().map(str::trim))
        .bind(input.code.as_deref().map(str::trim))
        .bind(&input.description)
        .bind(input.is_active)
        .bind(category_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Category".to_string()))?;

        Ok(row.into())
    }

    /// Get a category by ID
    pub async fn get_category(&self, category_id: Uuid) -> AppResult<Category> {
        let row = sqlx::query_as::<_, CategoryRow>(
            r#"
            SELECT id, name, code, description, is_active, created_at, updated_at
            FROM categories
            WHERE id = $1
            "#,
        )
        .bind(category_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Category".to_string()))?;

        Ok(row.into())
    }

    /// List categories with filters and pagination
    pub async fn list_categories(
        &self,
        filter: &CategoryFilter,
        pagination: &Pagination,
    ) -> AppResult<PaginatedResponse<Category>> {
        let search_like = filter.search.as_ref().map(|s| format!("%{}%", s));

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM categories
            WHERE ($1::boolean IS NULL OR is_active = $1)
              AND ($2::varchar IS NULL OR name ILIKE $2 OR code ILIKE $2)
            "#,
        )
        .bind(filter.is_active)
        .bind(&search_like)
        .fetch_one(&self.db)
        .await?;

        let rows = sqlx::query_as::<_, CategoryRow>(
            r#"
            SELECT id, name, code, description, is_active, created_at, updated_at
            FROM categories
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
            data: rows.into_iter().map(Category::from).collect(),
            pagination: PaginationMeta::new(pagination, total as u64),
        })
    }

    /// Delete a category; products keep existing but lose the grouping
    pub async fn delete_category(&self, category_id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(category_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Category".to_string()));
        }
        Ok(())
    }

    async fn ensure_code_free(&self, code: &str, exclude: Option<Uuid>) -> AppResult<()> {
        let taken = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM categories WHERE code = $1 AND ($2::uuid IS NULL OR id <> $2))",
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
