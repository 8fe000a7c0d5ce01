//! Stage orchestration: fetch, normalize, alert, report.

use anyhow::Result;
use chrono::{Days, NaiveDate};
use std::fmt;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::alerts::{AlertSummary, run_alerts};
use crate::config::Config;
use crate::fetch::{FetchError, HttpClient, fetch_enterprise, fetch_pollution, fetch_population};
use crate::normalize::{NormalizeStats, Pollutant, process_enterprise, process_pollution, process_population};
use crate::report::export;

#[derive(Error, Debug, PartialEq)]
pub enum DateWindowError {
    #[error("invalid date '{0}': expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("start date {start} is after end date {end}")]
    Reversed { start: NaiveDate, end: NaiveDate },

    #[error("cannot go back {days} days from {end}")]
    OutOfRange { end: NaiveDate, days: u64 },
}

/// Inclusive range of measurement dates requested from the pollution API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, DateWindowError> {
        if start > end {
            return Err(DateWindowError::Reversed { start, end });
        }
        Ok(DateWindow { start, end })
    }

    /// The `days` days ending on `end`.
    pub fn lookback(end: NaiveDate, days: u64) -> Result<Self, DateWindowError> {
        let start = end
            .checked_sub_days(Days::new(days))
            .ok_or(DateWindowError::OutOfRange { end, days })?;
        Ok(DateWindow { start, end })
    }

    /// Parses two `YYYY-MM-DD` dates as typed by a user.
    pub fn parse(start: &str, end: &str) -> Result<Self, DateWindowError> {
        let date = |s: &str| {
            NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
                .map_err(|_| DateWindowError::InvalidDate(s.trim().to_string()))
        };
        Self::new(date(start)?, date(end)?)
    }

    /// `start,end` as the API range filter expects it.
    pub fn range_param(&self) -> String {
        format!("{},{}", self.start, self.end)
    }
}

impl fmt::Display for DateWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOptions {
    pub window: DateWindow,
    /// Run alerting and the report after normalization.
    pub run_analysis: bool,
}

/// Outcome of one pipeline run.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub fetch_failures: usize,
    pub normalized: Vec<NormalizeStats>,
    pub alerts: Vec<AlertSummary>,
}

fn log_fetch_error(source: &str, err: &FetchError) {
    if err.is_decode() {
        error!(source, error = %err, "Error decoding JSON");
    } else {
        error!(source, error = %err, "Error fetching data");
    }
}

/// Fetches every source. Failures are logged and skipped; returns how many failed.
#[tracing::instrument(skip(config, client), fields(window = %window))]
pub fn fetch_all<C: HttpClient>(config: &Config, client: &C, window: &DateWindow) -> usize {
    let mut failures = 0;

    for pollutant in Pollutant::ALL {
        info!("Fetching {} data", pollutant);
        if let Err(e) = fetch_pollution(client, config, pollutant, window) {
            log_fetch_error(pollutant.label(), &e);
            failures += 1;
        }
    }

    info!("Fetching population data");
    if let Err(e) = fetch_population(client, config) {
        log_fetch_error("population", &e);
        failures += 1;
    }

    info!("Fetching enterprise data");
    if let Err(e) = fetch_enterprise(client, config) {
        log_fetch_error("enterprise", &e);
        failures += 1;
    }

    if failures > 0 {
        warn!(failures, "Some sources could not be fetched");
    }
    failures
}

/// Normalizes NO2, PM10, population then enterprise data. Stops at the first error.
#[tracing::instrument(skip(config))]
pub fn normalize_all(config: &Config) -> Result<Vec<NormalizeStats>> {
    let mut stats = Vec::with_capacity(4);
    for pollutant in Pollutant::ALL {
        stats.push(process_pollution(config, pollutant)?);
    }
    stats.push(process_population(config)?);
    stats.push(process_enterprise(config)?);
    info!("Extraction and processing completed successfully");
    Ok(stats)
}

/// Runs the alert rules for both pollutants.
#[tracing::instrument(skip(config))]
pub fn analyse_all(config: &Config) -> Result<Vec<AlertSummary>> {
    let mut summaries = Vec::with_capacity(Pollutant::ALL.len());
    for pollutant in Pollutant::ALL {
        summaries.push(run_alerts(config, pollutant)?);
    }
    Ok(summaries)
}

/// Full run over `options.window`.
pub fn run<C: HttpClient>(config: &Config, client: &C, options: &PipelineOptions) -> Result<RunSummary> {
    info!("Fetching data from {} to {}", options.window.start, options.window.end);

    let fetch_failures = fetch_all(config, client, &options.window);
    let normalized = normalize_all(config)?;

    let mut alerts = Vec::new();
    if options.run_analysis {
        alerts = analyse_all(config)?;
        export(config)?;
    } else {
        info!("Analysis skipped");
    }

    Ok(RunSummary {
        fetch_failures,
        normalized,
        alerts,
    })
}
