//! Prints descriptive statistics of every stored table.
//!
//! Usage:
//!   cargo run --bin report
//!   cargo run --bin report -- doom

use anyhow::Result;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use greenhouse_sync::{config, db, db::models::Table, report};

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    // Optional positional table names; all tables when none given.
    let tables = std::env::args()
        .skip(1)
        .map(|arg| arg.parse::<Table>())
        .collect::<Result<Vec<_>>>()?;
    let tables = if tables.is_empty() { Table::ALL.to_vec() } else { tables };

    let pool = db::create_pool(&config::database_path_from_env()).await?;
    db::ensure_schema(&pool).await?;

    for table in tables {
        let data = report::read_all(&pool, table).await?;
        if data.is_empty() {
            println!("{table}: no rows stored\n");
            continue;
        }
        println!("{}", data.describe());
    }

    Ok(())
}
