use axum::{
    extract::{Path, State},
    Json,
};
use sqlx::SqlitePool;
use utoipa::OpenApi;

use super::errors::AppError;
use crate::{
    db::models::Table,
    report::{self, ColumnSummary, LabeledTable, Summary},
};

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// All stored rows of a table, ordered by `time_stamp` ascending, with
/// unit-bearing column labels.
#[utoipa::path(
    get,
    path = "/readings/{table}",
    params(
        ("table" = Table, Path, description = "`greenhouse` or `doom`"),
    ),
    responses(
        (status = 200, description = "Labeled readings", body = LabeledTable),
        (status = 400, description = "Unknown table"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "readings"
)]
pub async fn get_readings(
    State(pool): State<SqlitePool>,
    Path(table): Path<Table>,
) -> Result<Json<LabeledTable>, AppError> {
    Ok(Json(report::read_all(&pool, table).await?))
}

/// Per-column descriptive statistics of a table.
#[utoipa::path(
    get,
    path = "/readings/{table}/summary",
    params(
        ("table" = Table, Path, description = "`greenhouse` or `doom`"),
    ),
    responses(
        (status = 200, description = "Column statistics", body = Summary),
        (status = 400, description = "Unknown table"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "readings"
)]
pub async fn get_summary(
    State(pool): State<SqlitePool>,
    Path(table): Path<Table>,
) -> Result<Json<Summary>, AppError> {
    let table = report::read_all(&pool, table).await?;
    Ok(Json(table.describe()))
}

// ---------------------------------------------------------------------------
// Health check
// ---------------------------------------------------------------------------

/// Returns `200 OK` with `{"status":"ok"}` when the server is running.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy"),
    ),
    tag = "system"
)]
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

// ---------------------------------------------------------------------------
// OpenAPI spec
// ---------------------------------------------------------------------------

#[derive(OpenApi)]
#[openapi(
    paths(get_readings, get_summary, health),
    components(schemas(LabeledTable, Summary, ColumnSummary, Table)),
    tags(
        (name = "readings", description = "Stored greenhouse and home sensor readings"),
        (name = "system",   description = "System endpoints"),
    ),
    info(
        title = "Greenhouse Sync API",
        version = "0.1.0",
        description = "Read-only access to ThingSpeak readings mirrored into SQLite"
    )
)]
pub struct ApiDoc;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
