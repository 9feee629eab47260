pub mod models;
pub mod upsert;

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

pub async fn create_pool(path: &str) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(4)
        .connect_with(options)
        .await
        .with_context(|| format!("failed to open SQLite database at {path}"))?;
    Ok(pool)
}

/// Apply `./migrations`. Both tables are created with `IF NOT EXISTS`, so a
/// database created before migrations were tracked keeps its rows.
pub async fn ensure_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("failed to apply schema migrations")?;
    Ok(())
}

/// Single-connection in-memory database with the schema applied. One
/// connection, never recycled, because each connection to `:memory:` is its
/// own database.
#[cfg(test)]
pub(crate) async fn memory_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    ensure_schema(&pool).await.unwrap();
    pool
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn row_count(pool: &SqlitePool, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn ensure_schema_is_idempotent_and_keeps_rows() {
        let pool = memory_pool().await;
        sqlx::query("INSERT INTO doom_src_data (time_stamp, entry_id) VALUES (?, ?)")
            .bind("2023-04-01 12:30:45 UTC")
            .bind(1_i64)
            .execute(&pool)
            .await
            .unwrap();

        ensure_schema(&pool).await.unwrap();
        ensure_schema(&pool).await.unwrap();

        assert_eq!(row_count(&pool, "doom_src_data").await, 1);
        assert_eq!(row_count(&pool, "greenhouse_src_data").await, 0);
    }

    #[tokio::test]
    async fn ensure_schema_adopts_untracked_tables() {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::query(
            "CREATE TABLE doom_src_data (time_stamp TEXT PRIMARY KEY, time_stamp_unix INTEGER, \
             entry_id INTEGER, temp_livingroom REAL, temp_heater_inlet REAL, \
             temp_heater_outlet REAL, well_emergency_discharge REAL)",
        )
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query("INSERT INTO doom_src_data (time_stamp, entry_id) VALUES ('2023-04-01 12:30:45 UTC', 7)")
            .execute(&pool)
            .await
            .unwrap();

        ensure_schema(&pool).await.unwrap();

        assert_eq!(row_count(&pool, "doom_src_data").await, 1);
        assert_eq!(row_count(&pool, "greenhouse_src_data").await, 0);
    }
}
