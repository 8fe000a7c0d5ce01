//! Data types used by the alert engine.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Mean of all readings of one station on one calendar day.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyAggregate {
    pub commune: String,
    pub station: String,
    pub date: NaiveDate,
    pub mean_value: f64,
    pub exceeds_threshold: bool,
}

/// A daily aggregate with its trailing-window exceedance count.
///
/// `rolling_count` is `None` until the partition holds a full window of terms.
#[derive(Debug, Clone, PartialEq)]
pub struct RollingTerm {
    pub aggregate: DailyAggregate,
    pub rolling_count: Option<usize>,
}

/// One emitted alert row, as written to the alert CSV.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub commune: String,
    pub station: String,
    pub date_local: NaiveDate,
    /// Daily mean for windowed rules, the raw reading otherwise.
    pub value: f64,
    pub threshold: f64,
    /// Exceeding terms behind this alert (the window size, or 1).
    pub exceeding_terms: usize,
}

impl Alert {
    pub const COLUMNS: [&'static str; 6] = [
        "commune",
        "station",
        "date_local",
        "value",
        "threshold",
        "exceeding_terms",
    ];
}

/// Outcome of one alert stage.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertSummary {
    pub rule: String,
    pub alerts: usize,
    pub per_commune: BTreeMap<String, usize>,
}
