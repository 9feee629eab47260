//! Read path for reporting: stored rows as a labeled, time-ordered table.
//! Labels carry units and exist only here, never in the database.

pub mod summary;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};
use utoipa::ToSchema;

use crate::db::models::Table;

pub use summary::{ColumnSummary, Summary};

pub const GREENHOUSE_COLUMNS: [&str; 9] = [
    "Temperature in [°C]",
    "Temperature out [°C]",
    "Humidity in [%]",
    "Dew point in [°C]",
    "Air pressure [hPa]",
    "Light intensity [lux]",
    "Battery voltage [V]",
    "Battery current [mA]",
    "Battery power [mW]",
];

pub const DOOM_COLUMNS: [&str; 4] = [
    "Temperature living room [°C]",
    "Heater inlet temperature [°C]",
    "Heater outlet temperature [°C]",
    "Well emergency discharge [l]",
];

// Same column order as the label arrays above. Everything is read as REAL so
// INTEGER columns come back through the same decoder.
const GREENHOUSE_QUERY: &str = r#"
SELECT time_stamp,
       CAST(temp_inside      AS REAL),
       CAST(temp_outside     AS REAL),
       CAST(humidity_inside  AS REAL),
       CAST(dew_point_inside AS REAL),
       CAST(air_pressure     AS REAL),
       CAST(light_intensity  AS REAL),
       CAST(battery_voltage  AS REAL),
       CAST(battery_current  AS REAL),
       CAST(battery_power    AS REAL)
FROM greenhouse_src_data
ORDER BY time_stamp ASC
"#;

const DOOM_QUERY: &str = r#"
SELECT time_stamp,
       CAST(temp_livingroom          AS REAL),
       CAST(temp_heater_inlet        AS REAL),
       CAST(temp_heater_outlet       AS REAL),
       CAST(well_emergency_discharge AS REAL)
FROM doom_src_data
ORDER BY time_stamp ASC
"#;

/// Column-labeled readings indexed by `time_stamp`, ascending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LabeledTable {
    pub table: Table,
    /// Human-readable column labels including units.
    pub columns: Vec<String>,
    /// Row index: the provider time stamp of each row.
    pub index: Vec<String>,
    /// One entry per index value, one cell per column. `null` for NULL.
    pub rows: Vec<Vec<Option<f64>>>,
}

impl LabeledTable {
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Non-null values of one column, in row order.
    pub fn column_values(&self, column: usize) -> impl Iterator<Item = f64> + '_ {
        self.rows.iter().filter_map(move |row| row.get(column).copied().flatten())
    }
}

pub fn column_labels(table: Table) -> &'static [&'static str] {
    match table {
        Table::Greenhouse => &GREENHOUSE_COLUMNS,
        Table::Doom => &DOOM_COLUMNS,
    }
}

/// Every stored row of `table`, ordered by `time_stamp`. Read-only.
pub async fn read_all(pool: &SqlitePool, table: Table) -> Result<LabeledTable> {
    let (query, labels) = match table {
        Table::Greenhouse => (GREENHOUSE_QUERY, column_labels(table)),
        Table::Doom => (DOOM_QUERY, column_labels(table)),
    };

    let records = sqlx::query(query)
        .fetch_all(pool)
        .await
        .with_context(|| format!("failed to read {}", table.sql_name()))?;

    let mut index = Vec::with_capacity(records.len());
    let mut rows = Vec::with_capacity(records.len());
    for record in &records {
        index.push(record.try_get::<String, _>(0)?);
        let cells = (1..=labels.len())
            .map(|i| record.try_get::<Option<f64>, _>(i))
            .collect::<Result<Vec<_>, _>>()?;
        rows.push(cells);
    }

    Ok(LabeledTable {
        table,
        columns: labels.iter().map(|s| (*s).to_owned()).collect(),
        index,
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::{
            memory_pool,
            models::{GreenhouseReading, HomeReading},
            upsert::{upsert_greenhouse, upsert_home},
        },
        sensors::coerce::coerce_greenhouse,
        thingspeak::models::RawRow,
    };

    async fn insert_greenhouse(pool: &SqlitePool, line: &str) -> GreenhouseReading {
        let reading = coerce_greenhouse(&RawRow::from_line(line), true).unwrap();
        let mut conn = pool.acquire().await.unwrap();
        upsert_greenhouse(&mut conn, &reading).await.unwrap();
        reading
    }

    #[tokio::test]
    async fn empty_table_reads_as_empty() {
        let pool = memory_pool().await;
        let t = read_all(&pool, Table::Greenhouse).await.unwrap();
        assert!(t.is_empty());
        assert_eq!(t.columns.len(), 9);
    }

    #[tokio::test]
    async fn rows_come_back_sorted_by_time_stamp() {
        let pool = memory_pool().await;
        insert_greenhouse(&pool, "2023-04-02 08:00:00 UTC,3,20,10,50,9,12.5,100,1000,5").await;
        insert_greenhouse(&pool, "2023-04-01 08:00:00 UTC,1,21,11,51,9,12.5,100,1000,5").await;
        insert_greenhouse(&pool, "2023-04-01 20:00:00 UTC,2,22,12,52,9,12.5,100,1000,5").await;

        let t = read_all(&pool, Table::Greenhouse).await.unwrap();
        assert_eq!(
            t.index,
            vec![
                "2023-04-01 08:00:00 UTC",
                "2023-04-01 20:00:00 UTC",
                "2023-04-02 08:00:00 UTC",
            ]
        );
        let temps: Vec<f64> = t.column_values(0).collect();
        assert_eq!(temps, vec![21.0, 22.0, 20.0]);
    }

    #[tokio::test]
    async fn greenhouse_columns_are_labeled_in_order() {
        let pool = memory_pool().await;
        let r = insert_greenhouse(
            &pool,
            "2023-04-01  12:30:45UTC,101,21.5,15.2,55,12.1,13.2,500,1013,320",
        )
        .await;

        let t = read_all(&pool, Table::Greenhouse).await.unwrap();
        assert_eq!(t.columns, GREENHOUSE_COLUMNS.to_vec());
        assert_eq!(
            t.rows[0],
            vec![
                Some(r.temp_inside),
                Some(r.temp_outside),
                Some(55.0),
                Some(r.dew_point_inside),
                Some(1013.0),
                Some(320.0),
                Some(r.battery_voltage),
                Some(500.0),
                Some(r.battery_power),
            ]
        );
    }

    #[tokio::test]
    async fn doom_nulls_read_as_none() {
        let pool = memory_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        upsert_home(
            &mut conn,
            &HomeReading {
                time_stamp: "2023-04-01 12:30:45 UTC".to_owned(),
                time_stamp_unix: None,
                entry_id: Some(1),
                temp_livingroom: Some(20.5),
                temp_heater_inlet: None,
                temp_heater_outlet: Some(30.0),
                well_emergency_discharge: None,
            },
        )
        .await
        .unwrap();
        drop(conn);

        let t = read_all(&pool, Table::Doom).await.unwrap();
        assert_eq!(t.columns, DOOM_COLUMNS.to_vec());
        assert_eq!(t.rows, vec![vec![Some(20.5), None, Some(30.0), None]]);
    }
}
