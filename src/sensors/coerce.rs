//! Raw feed row → typed reading.
//!
//! Greenhouse rows are all-or-nothing: the first field that fails to parse
//! rejects the row. Home rows never fail; each measurement falls back to NULL
//! on its own.

use std::str::FromStr;

use chrono::{Local, NaiveDateTime, TimeZone};

use crate::{
    db::models::{GreenhouseReading, HomeReading},
    error::CoercionError,
    thingspeak::models::RawRow,
};

const TIME_STAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

// Greenhouse channel field positions.
const GH_ENTRY_ID: usize = 1;
const GH_TEMP_INSIDE: usize = 2;
const GH_TEMP_OUTSIDE: usize = 3;
const GH_HUMIDITY_INSIDE: usize = 4;
const GH_DEW_POINT_INSIDE: usize = 5;
const GH_BATTERY_VOLTAGE: usize = 6;
const GH_BATTERY_CURRENT: usize = 7;
const GH_AIR_PRESSURE: usize = 8;
const GH_LIGHT_INTENSITY: usize = 9;

// Home ("doom") channel field positions.
const HOME_ENTRY_ID: usize = 1;
const HOME_TEMP_LIVINGROOM: usize = 2;
const HOME_TEMP_HEATER_INLET: usize = 3;
const HOME_TEMP_HEATER_OUTLET: usize = 4;
const HOME_WELL_DISCHARGE: usize = 5;

/// A home measurement that was stored as NULL, with the text that was
/// rejected (empty when the field was absent).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NullFallback {
    pub field: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HomeCoercion {
    pub reading: HomeReading,
    pub null_fallbacks: Vec<NullFallback>,
}

/// Convert a provider time stamp such as `2023-04-01 12:30:45 UTC` to epoch
/// seconds, reading the wall-clock part as local time.
///
/// The trailing zone marker (`UTC`, ` UTC`, ...) is stripped and any run of
/// whitespace between date and time is accepted. A fractional-second marker
/// such as `.123` is accepted and truncated to whole seconds. An ambiguous local time
/// resolves to its earliest instant; a nonexistent one is an error.
pub fn parse_time_stamp(raw: &str) -> Result<i64, CoercionError> {
    let invalid = |reason: String| CoercionError::InvalidTimeStamp {
        value: raw.to_owned(),
        reason,
    };

    let without_suffix = raw.trim_end_matches(|c: char| !c.is_ascii_digit());
    let normalized = without_suffix.split_whitespace().collect::<Vec<_>>().join(" ");

    let naive = NaiveDateTime::parse_from_str(&normalized, TIME_STAMP_FORMAT)
        .map_err(|e| invalid(e.to_string()))?;

    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.timestamp())
        .ok_or_else(|| invalid("local time does not exist".to_owned()))
}

pub fn coerce_greenhouse(
    row: &RawRow,
    include_unix_timestamp: bool,
) -> Result<GreenhouseReading, CoercionError> {
    let time_stamp = field(row, 0, "time_stamp")?.to_owned();
    let time_stamp_unix = if include_unix_timestamp {
        Some(parse_time_stamp(&time_stamp)?)
    } else {
        None
    };

    let battery_voltage = required_float(row, GH_BATTERY_VOLTAGE, "battery_voltage")?;
    let battery_current = required::<i64>(row, GH_BATTERY_CURRENT, "battery_current")? as f64;

    Ok(GreenhouseReading {
        time_stamp,
        time_stamp_unix,
        entry_id: required(row, GH_ENTRY_ID, "entry_id")?,
        temp_inside: required_float(row, GH_TEMP_INSIDE, "temp_inside")?,
        temp_outside: required_float(row, GH_TEMP_OUTSIDE, "temp_outside")?,
        humidity_inside: required(row, GH_HUMIDITY_INSIDE, "humidity_inside")?,
        dew_point_inside: required_float(row, GH_DEW_POINT_INSIDE, "dew_point_inside")?,
        battery_voltage,
        battery_current,
        air_pressure: required(row, GH_AIR_PRESSURE, "air_pressure")?,
        light_intensity: required(row, GH_LIGHT_INTENSITY, "light_intensity")?,
        battery_power: battery_voltage * battery_current,
    })
}

pub fn coerce_home(row: &RawRow, include_unix_timestamp: bool) -> HomeCoercion {
    let mut null_fallbacks = Vec::new();
    let time_stamp = row.time_stamp().to_owned();

    let time_stamp_unix = if include_unix_timestamp {
        match parse_time_stamp(&time_stamp) {
            Ok(ts) => Some(ts),
            Err(_) => {
                null_fallbacks.push(NullFallback {
                    field: "time_stamp_unix",
                    value: time_stamp.clone(),
                });
                None
            }
        }
    } else {
        None
    };

    let entry_id = optional::<i64>(row, HOME_ENTRY_ID, "entry_id", &mut null_fallbacks);
    let temp_livingroom =
        optional_float(row, HOME_TEMP_LIVINGROOM, "temp_livingroom", &mut null_fallbacks);
    let temp_heater_inlet =
        optional_float(row, HOME_TEMP_HEATER_INLET, "temp_heater_inlet", &mut null_fallbacks);
    let temp_heater_outlet =
        optional_float(row, HOME_TEMP_HEATER_OUTLET, "temp_heater_outlet", &mut null_fallbacks);
    let well_emergency_discharge = optional_float(
        row,
        HOME_WELL_DISCHARGE,
        "well_emergency_discharge",
        &mut null_fallbacks,
    );

    HomeCoercion {
        reading: HomeReading {
            time_stamp,
            time_stamp_unix,
            entry_id,
            temp_livingroom,
            temp_heater_inlet,
            temp_heater_outlet,
            well_emergency_discharge,
        },
        null_fallbacks,
    }
}

fn field<'a>(row: &'a RawRow, index: usize, name: &'static str) -> Result<&'a str, CoercionError> {
    row.get(index).ok_or(CoercionError::MissingField { index, name })
}

fn required<T: FromStr>(row: &RawRow, index: usize, name: &'static str) -> Result<T, CoercionError> {
    let raw = field(row, index, name)?;
    raw.trim().parse().map_err(|_| CoercionError::InvalidNumber {
        name,
        value: raw.to_owned(),
    })
}

/// Like `required`, but NaN and infinities are rejected too.
fn required_float(row: &RawRow, index: usize, name: &'static str) -> Result<f64, CoercionError> {
    let v: f64 = required(row, index, name)?;
    if v.is_finite() {
        Ok(v)
    } else {
        Err(CoercionError::InvalidNumber {
            name,
            value: field(row, index, name)?.to_owned(),
        })
    }
}

fn optional_float(
    row: &RawRow,
    index: usize,
    name: &'static str,
    fallbacks: &mut Vec<NullFallback>,
) -> Option<f64> {
    match optional::<f64>(row, index, name, fallbacks) {
        Some(v) if !v.is_finite() => {
            fallbacks.push(NullFallback {
                field: name,
                value: row.get(index).unwrap_or_default().to_owned(),
            });
            None
        }
        other => other,
    }
}

fn optional<T: FromStr>(
    row: &RawRow,
    index: usize,
    name: &'static str,
    fallbacks: &mut Vec<NullFallback>,
) -> Option<T> {
    let raw = row.get(index).unwrap_or_default();
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            fallbacks.push(NullFallback {
                field: name,
                value: raw.to_owned(),
            });
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local_epoch(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> i64 {
        Local
            .with_ymd_and_hms(y, mo, d, h, mi, s)
            .earliest()
            .unwrap()
            .timestamp()
    }

    const SCENARIO: &str = "2023-04-01  12:30:45UTC,101,21.5,15.2,55,12.1,13.2,500,1013,320";

    // -----------------------------------------------------------------------
    // Time stamps
    // -----------------------------------------------------------------------

    #[test]
    fn time_stamp_with_three_char_suffix_and_double_space() {
        assert_eq!(
            parse_time_stamp("2023-04-01  12:30:45UTC").unwrap(),
            local_epoch(2023, 4, 1, 12, 30, 45)
        );
    }

    #[test]
    fn time_stamp_with_provider_suffix() {
        assert_eq!(
            parse_time_stamp("2023-04-01 12:30:45 UTC").unwrap(),
            local_epoch(2023, 4, 1, 12, 30, 45)
        );
    }

    #[test]
    fn time_stamp_with_millis_suffix() {
        let expected = local_epoch(2023, 4, 1, 12, 30, 45);
        assert_eq!(parse_time_stamp("2023-04-01  12:30:45.123").unwrap(), expected);
        assert_eq!(parse_time_stamp("2023-04-01 12:30:45.999 UTC").unwrap(), expected);
    }

    #[test]
    fn time_stamp_garbage_is_error() {
        let err = parse_time_stamp("yesterday UTC").unwrap_err();
        assert!(matches!(err, CoercionError::InvalidTimeStamp { .. }));
        assert!(parse_time_stamp("2023-13-01 12:30:45 UTC").is_err());
        assert!(parse_time_stamp("").is_err());
    }

    // -----------------------------------------------------------------------
    // Greenhouse
    // -----------------------------------------------------------------------

    #[test]
    fn greenhouse_scenario_row() {
        let r = coerce_greenhouse(&RawRow::from_line(SCENARIO), true).unwrap();

        assert_eq!(r.time_stamp, "2023-04-01  12:30:45UTC");
        assert_eq!(r.time_stamp_unix, Some(local_epoch(2023, 4, 1, 12, 30, 45)));
        assert_eq!(r.entry_id, 101);
        assert_eq!(r.temp_inside, 21.5);
        assert_eq!(r.temp_outside, 15.2);
        assert_eq!(r.humidity_inside, 55);
        assert_eq!(r.dew_point_inside, 12.1);
        assert_eq!(r.battery_voltage, 13.2);
        assert_eq!(r.battery_current, 500.0);
        assert_eq!(r.battery_power, 6600.0);
        assert_eq!(r.air_pressure, 1013);
        assert_eq!(r.light_intensity, 320);
    }

    #[test]
    fn greenhouse_power_is_voltage_times_current() {
        for (v, i) in [(12.6, 150), (0.0, 999), (3.3, -20), (14.15, 1)] {
            let line = format!("2023-04-01 12:30:45 UTC,1,20,10,50,9,{v},{i},1000,0");
            let r = coerce_greenhouse(&RawRow::from_line(&line), false).unwrap();
            assert_eq!(r.battery_power, v * i as f64);
        }
    }

    #[test]
    fn greenhouse_without_unix_column_skips_time_stamp_parsing() {
        let line = "not a date,101,21.5,15.2,55,12.1,13.2,500,1013,320";
        let r = coerce_greenhouse(&RawRow::from_line(line), false).unwrap();
        assert_eq!(r.time_stamp_unix, None);

        let err = coerce_greenhouse(&RawRow::from_line(line), true).unwrap_err();
        assert!(matches!(err, CoercionError::InvalidTimeStamp { .. }));
    }

    #[test]
    fn greenhouse_rejects_any_bad_required_field() {
        let fields: Vec<&str> = SCENARIO.split(',').collect();
        let names = [
            "entry_id",
            "temp_inside",
            "temp_outside",
            "humidity_inside",
            "dew_point_inside",
            "battery_voltage",
            "battery_current",
            "air_pressure",
            "light_intensity",
        ];
        for (offset, name) in names.into_iter().enumerate() {
            let mut bad = fields.clone();
            bad[offset + 1] = "n/a";
            let err = coerce_greenhouse(&RawRow::from_line(&bad.join(",")), true).unwrap_err();
            assert_eq!(
                err,
                CoercionError::InvalidNumber { name, value: "n/a".to_owned() },
                "field {name}"
            );
        }
    }

    #[test]
    fn greenhouse_integer_fields_reject_decimals() {
        let line = "2023-04-01 12:30:45 UTC,101,21.5,15.2,55.5,12.1,13.2,500,1013,320";
        let err = coerce_greenhouse(&RawRow::from_line(line), true).unwrap_err();
        assert!(matches!(err, CoercionError::InvalidNumber { name: "humidity_inside", .. }));
    }

    #[test]
    fn greenhouse_rejects_nan_and_empty() {
        let line = "2023-04-01 12:30:45 UTC,101,nan,15.2,55,12.1,13.2,500,1013,320";
        assert!(coerce_greenhouse(&RawRow::from_line(line), true).is_err());

        let line = "2023-04-01 12:30:45 UTC,101,,15.2,55,12.1,13.2,500,1013,320";
        assert!(coerce_greenhouse(&RawRow::from_line(line), true).is_err());
    }

    #[test]
    fn greenhouse_short_row_reports_missing_field() {
        let line = "2023-04-01 12:30:45 UTC,101,21.5,15.2,55,12.1,13.2,500";
        let err = coerce_greenhouse(&RawRow::from_line(line), true).unwrap_err();
        assert_eq!(
            err,
            CoercionError::MissingField { index: 8, name: "air_pressure" }
        );
    }

    #[test]
    fn greenhouse_tolerates_whitespace_around_numbers() {
        let line = "2023-04-01 12:30:45 UTC, 101 ,21.5,15.2,55,12.1,13.2,500,1013,320\t";
        let r = coerce_greenhouse(&RawRow::from_line(line), true).unwrap();
        assert_eq!(r.entry_id, 101);
        assert_eq!(r.light_intensity, 320);
    }

    // -----------------------------------------------------------------------
    // Home
    // -----------------------------------------------------------------------

    #[test]
    fn home_all_fields_parse() {
        let c = coerce_home(&RawRow::from_line("2023-04-01 12:30:45 UTC,7,21.4,45.0,38.5,120.25"), true);
        assert!(c.null_fallbacks.is_empty());
        assert_eq!(c.reading.entry_id, Some(7));
        assert_eq!(c.reading.time_stamp_unix, Some(local_epoch(2023, 4, 1, 12, 30, 45)));
        assert_eq!(c.reading.temp_livingroom, Some(21.4));
        assert_eq!(c.reading.temp_heater_inlet, Some(45.0));
        assert_eq!(c.reading.temp_heater_outlet, Some(38.5));
        assert_eq!(c.reading.well_emergency_discharge, Some(120.25));
    }

    #[test]
    fn home_bad_field_falls_back_to_null_alone() {
        let c = coerce_home(&RawRow::from_line("2023-04-01 12:30:45 UTC,7,21.4,ERR,38.5,120.25"), true);
        assert_eq!(c.reading.temp_livingroom, Some(21.4));
        assert_eq!(c.reading.temp_heater_inlet, None);
        assert_eq!(c.reading.temp_heater_outlet, Some(38.5));
        assert_eq!(c.reading.well_emergency_discharge, Some(120.25));
        assert_eq!(
            c.null_fallbacks,
            vec![NullFallback { field: "temp_heater_inlet", value: "ERR".to_owned() }]
        );
    }

    #[test]
    fn home_missing_trailing_fields_are_null() {
        let c = coerce_home(&RawRow::from_line("2023-04-01 12:30:45 UTC,7,21.4"), false);
        assert_eq!(c.reading.time_stamp_unix, None);
        assert_eq!(c.reading.temp_livingroom, Some(21.4));
        assert_eq!(c.reading.temp_heater_inlet, None);
        assert_eq!(c.reading.temp_heater_outlet, None);
        assert_eq!(c.reading.well_emergency_discharge, None);
        assert_eq!(c.null_fallbacks.len(), 3);
    }

    #[test]
    fn home_never_rejects() {
        let c = coerce_home(&RawRow::from_line("garbage,x,y"), true);
        assert_eq!(c.reading.time_stamp, "garbage");
        assert_eq!(c.reading.time_stamp_unix, None);
        assert_eq!(c.reading.entry_id, None);
        assert_eq!(c.reading.temp_livingroom, None);
    }
}
