//! CSV persistence for clean and alert tables.
//!
//! Every writer replaces the target file and always emits the header row,
//! so a table with zero rows is still a valid, self-describing CSV.

use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;
use csv::WriterBuilder;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::normalize::{Measurement, Pollutant};

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    Ok(())
}

/// Writes `rows` under an explicit header, replacing any existing file.
///
/// `columns` must list the serialized fields of `T` in declaration order.
pub fn write_table<T: Serialize>(path: &Path, columns: &[&str], rows: &[T]) -> Result<()> {
    ensure_parent(path)?;
    debug!(path = %path.display(), rows = rows.len(), "Writing CSV table");

    let mut writer = WriterBuilder::new()
        .has_headers(false) // header is written explicitly, even for empty tables
        .from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    writer.write_record(columns)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    Ok(())
}

/// Writes a clean measurement table with the pollutant-specific value column.
pub fn write_measurements(path: &Path, pollutant: Pollutant, rows: &[Measurement]) -> Result<()> {
    ensure_parent(path)?;
    debug!(path = %path.display(), rows = rows.len(), "Writing measurement table");

    let mut writer = WriterBuilder::new()
        .from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    writer.write_record(pollutant.columns())?;
    for row in rows {
        writer.write_record(row.to_record())?;
    }
    writer.flush()?;

    Ok(())
}

/// Reads a clean measurement table back, locating columns by name.
pub fn read_measurements(path: &Path, pollutant: Pollutant) -> Result<Vec<Measurement>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    let headers = reader.headers()?.clone();
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| anyhow!("{}: missing column '{}'", path.display(), name))
    };

    let commune_col = column("commune")?;
    let station_col = column("station")?;
    let value_col = column(pollutant.value_column())?;
    let date_col = column("date_local")?;

    let mut rows = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record?;
        let field = |index: usize| record.get(index).unwrap_or_default();

        let value: f64 = field(value_col)
            .parse()
            .with_context(|| format!("{}: bad value on row {}", path.display(), line + 1))?;
        let date_local: NaiveDate = field(date_col)
            .parse()
            .with_context(|| format!("{}: bad date on row {}", path.display(), line + 1))?;

        rows.push(Measurement::new(
            pollutant,
            field(commune_col),
            field(station_col),
            value,
            date_local,
        ));
    }

    Ok(rows)
}

/// Deserializes every row of a CSV file with headers.
pub fn read_table<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    let mut rows = Vec::new();
    for result in reader.deserialize() {
        let row: T = result?;
        rows.push(row);
    }
    Ok(rows)
}
