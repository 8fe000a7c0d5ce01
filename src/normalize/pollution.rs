//! Daily pollutant measurements from the `results` array of the measurement API.

use serde_json::{Map, Value};
use std::collections::BTreeSet;
use tracing::debug;

use super::flatten::{coerce_number, flatten_record, parse_local_date, text_value};
use super::stats::NormalizeStats;
use super::types::{Measurement, Pollutant};
use super::{NormalizeError, records_under};

/// Largest plausible reading; anything at or above it is a sensor error.
pub const VALUE_CEILING: f64 = 1000.0;

const FIELD_COMMUNE: &str = "nom_commune";
const FIELD_STATION: &str = "nom_station";
const FIELD_VALUE: &str = "valeur";
const FIELD_TIMESTAMP: &str = "date_heure_local";

/// Extracts validated measurements for `pollutant` from a raw API response.
///
/// Every record must carry the four source fields. Rows whose value is
/// missing, non-numeric or outside `[0, 1000)` are dropped and counted in
/// `stats`; an unparseable timestamp fails the whole dataset.
pub fn normalize_pollution(
    raw: &Value,
    pollutant: Pollutant,
    stats: &mut NormalizeStats,
) -> Result<Vec<Measurement>, NormalizeError> {
    let dataset = pollutant.label();
    let records = records_under(raw, "results", dataset)?;
    let flattened: Vec<Map<String, Value>> = records.iter().map(flatten_record).collect();

    let columns: BTreeSet<&str> = flattened
        .iter()
        .flat_map(|r| r.keys().map(String::as_str))
        .collect();
    debug!(dataset, ?columns, "Available source columns");

    let mut measurements = Vec::with_capacity(flattened.len());

    for (index, record) in flattened.iter().enumerate() {
        stats.records += 1;

        let field = |name: &'static str| {
            record.get(name).ok_or_else(|| NormalizeError::MissingField {
                dataset: dataset.to_string(),
                index,
                field: name,
            })
        };

        let commune = text_value(field(FIELD_COMMUNE)?);
        let station = text_value(field(FIELD_STATION)?);
        let value = field(FIELD_VALUE)?;
        let timestamp = text_value(field(FIELD_TIMESTAMP)?);

        let date_local =
            parse_local_date(&timestamp).ok_or_else(|| NormalizeError::InvalidDate {
                dataset: dataset.to_string(),
                index,
                value: timestamp.clone(),
            })?;

        let Some(value) = coerce_number(value) else {
            stats.dropped_missing += 1;
            continue;
        };
        if !(0.0..VALUE_CEILING).contains(&value) {
            debug!(dataset, index, value, "Dropping out-of-range reading");
            stats.dropped_out_of_range += 1;
            continue;
        }

        measurements.push(Measurement::new(pollutant, commune, station, value, date_local));
        stats.kept += 1;
    }

    Ok(measurements)
}
