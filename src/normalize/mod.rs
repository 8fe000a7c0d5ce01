//! Raw JSON to clean CSV tables.
//!
//! Each dataset is flattened, renamed to its canonical columns, type-coerced
//! and filtered, then written to the clean data directory. A run always
//! replaces the previous clean file.

mod flatten;
pub mod pollution;
pub mod registry;
pub mod stats;
pub mod types;

pub use flatten::{coerce_number, flatten_record, parse_local_date};
pub use pollution::normalize_pollution;
pub use registry::{normalize_enterprise, normalize_population};
pub use stats::NormalizeStats;
pub use types::{EnterpriseRecord, Measurement, PopulationRecord, Pollutant};

use anyhow::{Context, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

use crate::config::Config;
use crate::fetch::sources::{RAW_ENTERPRISE_FILE, RAW_POPULATION_FILE};
use crate::output::{write_measurements, write_table};

pub const CLEAN_POPULATION_FILE: &str = "population_data.csv";
pub const CLEAN_ENTERPRISE_FILE: &str = "enterprise_data.csv";

#[derive(Error, Debug, PartialEq)]
pub enum NormalizeError {
    #[error("{dataset}: record {index} has no field '{field}'")]
    MissingField {
        dataset: String,
        index: usize,
        field: &'static str,
    },

    #[error("{dataset}: record {index} has an unparseable timestamp '{value}'")]
    InvalidDate {
        dataset: String,
        index: usize,
        value: String,
    },

    #[error("{dataset}: '{key}' is not an array of records")]
    InvalidShape { dataset: String, key: &'static str },
}

/// Returns the records listed under `key`. A missing key means no records.
pub(crate) fn records_under<'a>(
    raw: &'a Value,
    key: &'static str,
    dataset: &str,
) -> Result<&'a [Value], NormalizeError> {
    match raw.get(key) {
        None | Some(Value::Null) => Ok(&[]),
        Some(Value::Array(records)) => Ok(records.as_slice()),
        Some(_) => Err(NormalizeError::InvalidShape {
            dataset: dataset.to_string(),
            key,
        }),
    }
}

/// Reads a raw JSON file written by the fetch stage.
pub fn load_raw(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read raw file {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("invalid JSON in {}", path.display()))
}

/// Normalizes the raw measurements of `pollutant` into its clean CSV.
#[tracing::instrument(skip(config), fields(pollutant = %pollutant))]
pub fn process_pollution(config: &Config, pollutant: Pollutant) -> Result<NormalizeStats> {
    info!("Processing {} data", pollutant);
    let raw = load_raw(&config.raw_path(pollutant.raw_file()))?;

    let mut stats = NormalizeStats::new(pollutant.label());
    let rows = normalize_pollution(&raw, pollutant, &mut stats)?;

    let path = config.clean_path(pollutant.clean_file());
    write_measurements(&path, pollutant, &rows)?;
    stats.log_summary();
    info!(path = %path.display(), "{} data saved", pollutant);
    Ok(stats)
}

#[tracing::instrument(skip(config))]
pub fn process_population(config: &Config) -> Result<NormalizeStats> {
    info!("Processing population data");
    let raw = load_raw(&config.raw_path(RAW_POPULATION_FILE))?;

    let mut stats = NormalizeStats::new(registry::POPULATION_DATASET);
    let rows = normalize_population(&raw, &mut stats)?;

    let path = config.clean_path(CLEAN_POPULATION_FILE);
    write_table(&path, &PopulationRecord::COLUMNS, &rows)?;
    stats.log_summary();
    info!(path = %path.display(), "Population data saved");
    Ok(stats)
}

#[tracing::instrument(skip(config))]
pub fn process_enterprise(config: &Config) -> Result<NormalizeStats> {
    info!("Processing enterprise data");
    let raw = load_raw(&config.raw_path(RAW_ENTERPRISE_FILE))?;

    let mut stats = NormalizeStats::new(registry::ENTERPRISE_DATASET);
    let rows = normalize_enterprise(&raw, &mut stats)?;

    let path = config.clean_path(CLEAN_ENTERPRISE_FILE);
    write_table(&path, &EnterpriseRecord::COLUMNS, &rows)?;
    stats.log_summary();
    info!(path = %path.display(), "Enterprise data saved");
    Ok(stats)
}

/// Clean CSV path of every normalized dataset, in processing order.
pub fn clean_outputs(config: &Config) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = Pollutant::ALL
        .iter()
        .map(|p| config.clean_path(p.clean_file()))
        .collect();
    paths.push(config.clean_path(CLEAN_POPULATION_FILE));
    paths.push(config.clean_path(CLEAN_ENTERPRISE_FILE));
    paths
}
