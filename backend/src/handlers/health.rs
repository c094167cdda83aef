//! Health check handler

use axum::extract::State;

use crate::error::AppResult;
use crate::AppState;

/// Health check that also verifies database connectivity
pub async fn health_check(State(state): State<AppState>) -> AppResult<&'static str> {
    sqlx::query("SELECT 1").execute(&state.db).await?;
    Ok("OK")
}
