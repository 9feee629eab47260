use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// The two persisted tables, one per feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    /// Greenhouse weather station, `greenhouse_src_data`.
    Greenhouse,
    /// Home sensors, `doom_src_data`.
    Doom,
}

impl Table {
    /// Sync order: greenhouse first, then home sensors.
    pub const ALL: [Table; 2] = [Table::Greenhouse, Table::Doom];

    pub fn sql_name(self) -> &'static str {
        match self {
            Table::Greenhouse => "greenhouse_src_data",
            Table::Doom => "doom_src_data",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Table::Greenhouse => "greenhouse",
            Table::Doom => "doom",
        };
        f.write_str(s)
    }
}

impl FromStr for Table {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "greenhouse" => Ok(Self::Greenhouse),
            "doom" => Ok(Self::Doom),
            other => Err(anyhow::anyhow!("unknown table: {other:?}")),
        }
    }
}

/// One row of `greenhouse_src_data`. Every measurement is required.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct GreenhouseReading {
    /// Provider time stamp, verbatim. Primary key.
    pub time_stamp: String,
    /// Local-time epoch seconds; `None` when the deployment disables it.
    pub time_stamp_unix: Option<i64>,
    pub entry_id: i64,
    /// °C
    pub temp_inside: f64,
    /// °C
    pub temp_outside: f64,
    /// %
    pub humidity_inside: i64,
    /// °C
    pub dew_point_inside: f64,
    /// V
    pub battery_voltage: f64,
    /// mA. Integral on the wire, stored in a REAL column.
    pub battery_current: f64,
    /// hPa
    pub air_pressure: i64,
    /// lux
    pub light_intensity: i64,
    /// mW, always `battery_voltage * battery_current`.
    pub battery_power: f64,
}

/// One row of `doom_src_data`. Measurements that fail to parse are NULL.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct HomeReading {
    pub time_stamp: String,
    pub time_stamp_unix: Option<i64>,
    pub entry_id: Option<i64>,
    /// °C
    pub temp_livingroom: Option<f64>,
    /// °C
    pub temp_heater_inlet: Option<f64>,
    /// °C
    pub temp_heater_outlet: Option<f64>,
    /// Litres
    pub well_emergency_discharge: Option<f64>,
}
