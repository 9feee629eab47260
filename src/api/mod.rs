//! Read-only HTTP surface over the reporting path.

pub mod errors;
pub mod handlers;

use axum::{routing::get, Router};
use sqlx::SqlitePool;
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;

use handlers::ApiDoc;

pub fn router(pool: SqlitePool) -> Router {
    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .route("/readings/{table}", get(handlers::get_readings))
        .route("/readings/{table}/summary", get(handlers::get_summary))
        .with_state(pool)
        .split_for_parts();

    router
        .route("/health", get(handlers::health))
        .route(
            "/api-docs/openapi.json",
            get(move || async move { axum::Json(api) }),
        )
}
