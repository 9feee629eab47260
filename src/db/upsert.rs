//! Insert-or-replace writers keyed by `time_stamp`.
//!
//! A conflicting row is replaced as a whole, never merged column by column.
//! Every value is a bound parameter.

use sqlx::SqliteConnection;

use crate::{
    db::models::{GreenhouseReading, HomeReading, Table},
    error::WriteError,
};

const UPSERT_GREENHOUSE: &str = r#"
INSERT OR REPLACE INTO greenhouse_src_data (
    time_stamp, time_stamp_unix, entry_id,
    temp_inside, temp_outside, humidity_inside, dew_point_inside,
    battery_voltage, battery_current, air_pressure, light_intensity,
    battery_power
)
VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
"#;

const UPSERT_DOOM: &str = r#"
INSERT OR REPLACE INTO doom_src_data (
    time_stamp, time_stamp_unix, entry_id,
    temp_livingroom, temp_heater_inlet, temp_heater_outlet,
    well_emergency_discharge
)
VALUES (?, ?, ?, ?, ?, ?, ?)
"#;

pub async fn upsert_greenhouse(
    conn: &mut SqliteConnection,
    r: &GreenhouseReading,
) -> Result<(), WriteError> {
    sqlx::query(UPSERT_GREENHOUSE)
        .bind(r.time_stamp.as_str())
        .bind(r.time_stamp_unix)
        .bind(r.entry_id)
        .bind(r.temp_inside)
        .bind(r.temp_outside)
        .bind(r.humidity_inside)
        .bind(r.dew_point_inside)
        .bind(r.battery_voltage)
        .bind(r.battery_current)
        .bind(r.air_pressure)
        .bind(r.light_intensity)
        .bind(r.battery_power)
        .execute(&mut *conn)
        .await
        .map_err(|source| WriteError {
            table: Table::Greenhouse,
            time_stamp: r.time_stamp.clone(),
            source,
        })?;
    Ok(())
}

pub async fn upsert_home(conn: &mut SqliteConnection, r: &HomeReading) -> Result<(), WriteError> {
    sqlx::query(UPSERT_DOOM)
        .bind(r.time_stamp.as_str())
        .bind(r.time_stamp_unix)
        .bind(r.entry_id)
        .bind(r.temp_livingroom)
        .bind(r.temp_heater_inlet)
        .bind(r.temp_heater_outlet)
        .bind(r.well_emergency_discharge)
        .execute(&mut *conn)
        .await
        .map_err(|source| WriteError {
            table: Table::Doom,
            time_stamp: r.time_stamp.clone(),
            source,
        })?;
    Ok(())
}
