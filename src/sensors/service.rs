use sqlx::{SqliteConnection, SqlitePool};
use tracing::{error, info, warn};

use crate::{
    config::Config,
    db::{
        models::{GreenhouseReading, HomeReading, Table},
        upsert::{upsert_greenhouse, upsert_home},
    },
    error::SyncError,
    sensors::coerce::{coerce_greenhouse, coerce_home},
    thingspeak::{
        models::{FeedCredentials, RawRow},
        FeedSource,
    },
};

/// The slice of `Config` the sync pass needs.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub greenhouse_feed: Option<FeedCredentials>,
    pub doom_feed: Option<FeedCredentials>,
    pub max_records: u32,
    pub include_unix_timestamp: bool,
    pub verbose: bool,
}

impl From<&Config> for SyncOptions {
    fn from(config: &Config) -> Self {
        Self {
            greenhouse_feed: config.greenhouse_feed.clone(),
            doom_feed: config.doom_feed.clone(),
            max_records: config.max_records,
            include_unix_timestamp: config.include_unix_timestamp,
            verbose: config.verbose,
        }
    }
}

/// Row counts of one feed pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchStats {
    /// Data rows returned by the provider.
    pub fetched: usize,
    /// Rows written (inserted or replaced).
    pub stored: usize,
    /// Greenhouse rows dropped because a required field did not parse.
    pub rejected: usize,
    /// Rows whose write failed at the storage layer.
    pub failed_writes: usize,
}

#[derive(Debug)]
pub struct FeedOutcome {
    pub table: Table,
    pub result: Result<BatchStats, SyncError>,
}

#[derive(Debug, Default)]
pub struct SyncReport {
    pub outcomes: Vec<FeedOutcome>,
}

impl SyncReport {
    /// Feeds whose pass failed as a whole (transport or transaction error).
    pub fn failures(&self) -> impl Iterator<Item = (Table, &SyncError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (o.table, e)))
    }

    pub fn stats(&self, table: Table) -> Option<&BatchStats> {
        self.outcomes
            .iter()
            .find(|o| o.table == table)
            .and_then(|o| o.result.as_ref().ok())
    }

    /// True when every configured feed completed; row-level rejections and
    /// write failures do not count against it.
    pub fn is_success(&self) -> bool {
        self.failures().next().is_none()
    }
}

/// Fetches each configured feed and upserts its rows. Feeds are processed one
/// after the other; each feed is one transaction committed after its last row.
pub struct SyncService<F> {
    pool: SqlitePool,
    source: F,
    options: SyncOptions,
}

impl<F: FeedSource> SyncService<F> {
    pub fn new(pool: SqlitePool, source: F, options: SyncOptions) -> Self {
        Self { pool, source, options }
    }

    fn feed(&self, table: Table) -> Option<&FeedCredentials> {
        match table {
            Table::Greenhouse => self.options.greenhouse_feed.as_ref(),
            Table::Doom => self.options.doom_feed.as_ref(),
        }
    }

    /// Syncs every configured feed, greenhouse first. A failed feed is
    /// recorded in the report and does not stop the next one.
    pub async fn sync_all(&self) -> SyncReport {
        let mut report = SyncReport::default();

        for table in Table::ALL {
            let Some(feed) = self.feed(table) else {
                continue;
            };
            let result = self.sync_feed(table, feed).await;
            if let Err(e) = &result {
                error!(
                    table = %table,
                    channel_id = %feed.channel_id,
                    error = %e,
                    "Feed sync failed"
                );
            }
            report.outcomes.push(FeedOutcome { table, result });
        }

        report
    }

    /// Syncs a single table from its feed.
    pub async fn sync_table(&self, table: Table) -> Result<BatchStats, SyncError> {
        let feed = self.feed(table).ok_or(SyncError::NotConfigured(table))?;
        self.sync_feed(table, feed).await
    }

    async fn sync_feed(
        &self,
        table: Table,
        feed: &FeedCredentials,
    ) -> Result<BatchStats, SyncError> {
        info!(table = %table, channel_id = %feed.channel_id, "Syncing feed");

        let rows = self.source.fetch(feed, self.options.max_records).await?;
        let mut stats = BatchStats {
            fetched: rows.len(),
            ..BatchStats::default()
        };

        let mut tx = self.pool.begin().await?;
        for row in &rows {
            match table {
                Table::Greenhouse => self.store_greenhouse(&mut tx, row, &mut stats).await,
                Table::Doom => self.store_home(&mut tx, row, &mut stats).await,
            }
        }
        tx.commit().await?;

        info!(
            table = %table,
            fetched = stats.fetched,
            stored = stats.stored,
            rejected = stats.rejected,
            failed_writes = stats.failed_writes,
            "Feed synced"
        );
        Ok(stats)
    }

    async fn store_greenhouse(
        &self,
        conn: &mut SqliteConnection,
        row: &RawRow,
        stats: &mut BatchStats,
    ) {
        let reading = match coerce_greenhouse(row, self.options.include_unix_timestamp) {
            Ok(r) => r,
            Err(e) => {
                warn!(time_stamp = %row.time_stamp(), error = %e, "Rejected greenhouse row");
                stats.rejected += 1;
                return;
            }
        };

        match upsert_greenhouse(conn, &reading).await {
            Ok(()) => {
                stats.stored += 1;
                if self.options.verbose {
                    log_greenhouse(&reading);
                }
            }
            Err(e) => {
                error!(error = %e, "Greenhouse write failed");
                stats.failed_writes += 1;
            }
        }
    }

    async fn store_home(
        &self,
        conn: &mut SqliteConnection,
        row: &RawRow,
        stats: &mut BatchStats,
    ) {
        let coerced = coerce_home(row, self.options.include_unix_timestamp);

        if self.options.verbose {
            for fallback in &coerced.null_fallbacks {
                info!(
                    time_stamp = %coerced.reading.time_stamp,
                    field = fallback.field,
                    value = %fallback.value,
                    "Stored NULL for unparseable home field"
                );
            }
        }

        match upsert_home(conn, &coerced.reading).await {
            Ok(()) => {
                stats.stored += 1;
                if self.options.verbose {
                    log_home(&coerced.reading);
                }
            }
            Err(e) => {
                error!(error = %e, "Home sensors write failed");
                stats.failed_writes += 1;
            }
        }
    }
}

fn log_greenhouse(r: &GreenhouseReading) {
    info!(
        entry_id = r.entry_id,
        time_stamp = %r.time_stamp,
        temp_inside_c = r.temp_inside,
        humidity_inside_pct = r.humidity_inside,
        dew_point_inside_c = r.dew_point_inside,
        temp_outside_c = r.temp_outside,
        air_pressure_hpa = r.air_pressure,
        light_intensity_lux = r.light_intensity,
        battery_voltage_v = r.battery_voltage,
        battery_current_ma = r.battery_current,
        battery_power_mw = %format!("{:.0}", r.battery_power),
        "Greenhouse entry recorded"
    );
}

fn log_home(r: &HomeReading) {
    info!(
        entry_id = ?r.entry_id,
        time_stamp = %r.time_stamp,
        temp_livingroom_c = ?r.temp_livingroom,
        temp_heater_inlet_c = ?r.temp_heater_inlet,
        temp_heater_outlet_c = ?r.temp_heater_outlet,
        well_discharge_l = ?r.well_emergency_discharge,
        "Home sensors entry recorded"
    );
}
