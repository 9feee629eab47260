use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::LabeledTable;
use crate::db::models::Table;

/// Descriptive statistics of one column. NULL cells are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ColumnSummary {
    pub column: String,
    pub count: usize,
    pub mean: Option<f64>,
    /// Sample standard deviation (n − 1); needs at least two values.
    pub std: Option<f64>,
    pub min: Option<f64>,
    #[serde(rename = "25%")]
    pub q25: Option<f64>,
    #[serde(rename = "50%")]
    pub median: Option<f64>,
    #[serde(rename = "75%")]
    pub q75: Option<f64>,
    pub max: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Summary {
    pub table: Table,
    pub rows: usize,
    pub columns: Vec<ColumnSummary>,
}

impl LabeledTable {
    /// count / mean / std / min / quartiles / max for every column.
    pub fn describe(&self) -> Summary {
        let columns = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, name)| summarize(name, self.column_values(i).collect()))
            .collect();
        Summary {
            table: self.table,
            rows: self.index.len(),
            columns,
        }
    }
}

fn summarize(name: &str, mut values: Vec<f64>) -> ColumnSummary {
    values.sort_by(f64::total_cmp);
    let count = values.len();

    if count == 0 {
        return ColumnSummary {
            column: name.to_owned(),
            count,
            mean: None,
            std: None,
            min: None,
            q25: None,
            median: None,
            q75: None,
            max: None,
        };
    }

    let n = count as f64;
    let mean = values.iter().sum::<f64>() / n;
    let std = (count > 1).then(|| {
        let ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
        (ss / (n - 1.0)).sqrt()
    });

    ColumnSummary {
        column: name.to_owned(),
        count,
        mean: Some(mean),
        std,
        min: values.first().copied(),
        q25: Some(quantile(&values, 0.25)),
        median: Some(quantile(&values, 0.5)),
        q75: Some(quantile(&values, 0.75)),
        max: values.last().copied(),
    }
}

/// Linear interpolation between the two closest ranks. `sorted` must be
/// non-empty and ascending.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .columns
            .iter()
            .map(|c| c.column.chars().count())
            .max()
            .unwrap_or(0)
            .max(6);

        writeln!(f, "{} ({} rows)", self.table, self.rows)?;
        write!(f, "{:<width$}", "column")?;
        for head in ["count", "mean", "std", "min", "25%", "50%", "75%", "max"] {
            write!(f, " {head:>10}")?;
        }
        writeln!(f)?;

        for c in &self.columns {
            // `{:<width$}` pads by chars, which keeps the °-labels aligned.
            write!(f, "{:<width$} {:>10}", c.column, c.count)?;
            for v in [c.mean, c.std, c.min, c.q25, c.median, c.q75, c.max] {
                match v {
                    Some(v) => write!(f, " {v:>10.3}")?,
                    None => write!(f, " {:>10}", "NaN")?,
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
