use anyhow::{bail, Result};
use std::time::Duration;
use tokio::{net::TcpListener, signal, time};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use greenhouse_sync::{
    api,
    config::Config,
    db,
    sensors::{SyncOptions, SyncService},
    thingspeak::ThingSpeakClient,
};

#[tokio::main]
async fn main() -> Result<()> {
    // .env is optional; variables may come from the environment.
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;

    let pool = db::create_pool(&config.database_path).await?;
    db::ensure_schema(&pool).await?;
    info!(path = %config.database_path, "Database ready");

    let source = ThingSpeakClient::from_config(&config)?;
    let service = SyncService::new(pool.clone(), source, SyncOptions::from(&config));

    // Single pass for cron-style scheduling.
    if config.poll_interval_secs == 0 {
        let report = service.sync_all().await;
        if !report.is_success() {
            bail!("{} feed(s) failed to sync", report.failures().count());
        }
        return Ok(());
    }

    {
        let interval = Duration::from_secs(config.poll_interval_secs);
        tokio::spawn(async move {
            let mut ticker = time::interval(interval);
            ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
            info!(interval_secs = interval.as_secs(), "Sync loop started");

            loop {
                ticker.tick().await;
                // Per-feed results are logged inside the service.
                service.sync_all().await;
            }
        });
    }

    let addr = format!("{}:{}", config.server_host, config.server_port);
    let listener = TcpListener::bind(&addr).await?;
    info!(addr = %addr, "Reporting API listening");

    axum::serve(listener, api::router(pool))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
