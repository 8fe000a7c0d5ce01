//! Regulatory threshold alerting.
//!
//! Reads a clean measurement table, applies the configured [`AlertRule`]
//! and writes the alerting rows to the clean data directory. Finding no
//! alert is a normal outcome.

pub mod daily;
pub mod rules;
pub mod types;

pub use daily::{daily_aggregates, rolling_terms};
pub use rules::{AlertRule, RollingDailyMeanRule, SingleReadingRule};
pub use types::{Alert, AlertSummary, DailyAggregate, RollingTerm};

use anyhow::{Result, anyhow};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use tracing::info;

use crate::config::Config;
use crate::normalize::Pollutant;
use crate::output::{read_measurements, read_table, write_table};

/// Which rule a pollutant is judged with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertStrategy {
    /// Daily means above threshold on `window` consecutive present days.
    RollingDailyMean { window: usize },
    /// Any single reading above threshold.
    SingleReading,
}

impl AlertStrategy {
    /// Parses `rolling` or `single`; `window` applies to the rolling rule.
    pub fn parse(name: &str, window: usize) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "rolling" | "rolling-daily-mean" => Ok(AlertStrategy::RollingDailyMean { window }),
            "single" | "single-reading" => Ok(AlertStrategy::SingleReading),
            other => Err(anyhow!(
                "unknown alert rule '{}': expected 'rolling' or 'single'",
                other
            )),
        }
    }

    /// Builds the rule for `pollutant` at its alert trigger level.
    pub fn rule_for(&self, pollutant: Pollutant) -> Box<dyn AlertRule> {
        let threshold = pollutant.alert_trigger();
        match *self {
            AlertStrategy::RollingDailyMean { window } => {
                Box::new(RollingDailyMeanRule { threshold, window })
            }
            AlertStrategy::SingleReading => Box::new(SingleReadingRule { threshold }),
        }
    }
}

impl fmt::Display for AlertStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertStrategy::RollingDailyMean { window } => write!(f, "rolling (window {})", window),
            AlertStrategy::SingleReading => write!(f, "single"),
        }
    }
}

pub fn strategy_for(config: &Config, pollutant: Pollutant) -> AlertStrategy {
    match pollutant {
        Pollutant::No2 => config.no2_rule,
        Pollutant::Pm10 => config.pm10_rule,
    }
}

/// Number of alerts per commune, keyed in commune order.
pub fn alerts_per_commune(alerts: &[Alert]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for alert in alerts {
        *counts.entry(alert.commune.clone()).or_insert(0) += 1;
    }
    counts
}

pub fn read_alerts(path: &Path) -> Result<Vec<Alert>> {
    read_table(path)
}

/// Runs the configured alert rule for `pollutant` over its clean table.
///
/// The clean table must exist; a missing file is an error that halts the
/// calling stage.
#[tracing::instrument(skip(config), fields(pollutant = %pollutant))]
pub fn run_alerts(config: &Config, pollutant: Pollutant) -> Result<AlertSummary> {
    let measurements = read_measurements(&config.clean_path(pollutant.clean_file()), pollutant)?;
    let rule = strategy_for(config, pollutant).rule_for(pollutant);

    let alerts = rule.evaluate(&measurements);
    let per_commune = alerts_per_commune(&alerts);

    info!(
        rule = %rule.name(),
        measurements = measurements.len(),
        alerts = alerts.len(),
        "{} alert count: {}",
        pollutant,
        alerts.len()
    );
    for (commune, count) in &per_commune {
        info!(commune = %commune, count, "{} alerts for commune", pollutant);
    }

    let path = config.clean_path(pollutant.alert_file());
    write_table(&path, &Alert::COLUMNS, &alerts)?;
    info!(path = %path.display(), "{} alerts saved", pollutant);

    Ok(AlertSummary {
        rule: rule.name(),
        alerts: alerts.len(),
        per_commune,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::Measurement;
    use crate::output::write_measurements;
    use chrono::NaiveDate;

    fn config_in(dir: &Path) -> Config {
        Config {
            raw_dir: dir.join("raw"),
            clean_dir: dir.join("clean"),
            report_path: dir.join("report.xlsx"),
            ..Config::default()
        }
    }

    fn reading(pollutant: Pollutant, commune: &str, value: f64, d: u32) -> Measurement {
        Measurement::new(
            pollutant,
            commune,
            "Station",
            value,
            NaiveDate::from_ymd_opt(2024, 5, d).unwrap(),
        )
    }

    #[test]
    fn test_parse_strategy() {
        assert_eq!(
            AlertStrategy::parse("Rolling", 3).unwrap(),
            AlertStrategy::RollingDailyMean { window: 3 }
        );
        assert_eq!(AlertStrategy::parse("single", 3).unwrap(), AlertStrategy::SingleReading);
        assert!(AlertStrategy::parse("hourly", 3).is_err());
    }

    #[test]
    fn test_rule_for_uses_pollutant_trigger() {
        let rows = vec![reading(Pollutant::Pm10, "Angers", 85.0, 1)];

        let pm10 = AlertStrategy::SingleReading.rule_for(Pollutant::Pm10);
        let no2 = AlertStrategy::SingleReading.rule_for(Pollutant::No2);

        assert_eq!(pm10.evaluate(&rows).len(), 1);
        assert!(no2.evaluate(&rows).is_empty());
    }

    #[test]
    fn test_alerts_per_commune() {
        let alert = |commune: &str| Alert {
            commune: commune.to_string(),
            station: "S".to_string(),
            date_local: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            value: 90.0,
            threshold: 80.0,
            exceeding_terms: 1,
        };

        let counts = alerts_per_commune(&[alert("Nantes"), alert("Angers"), alert("Nantes")]);

        assert_eq!(counts.get("Nantes"), Some(&2));
        assert_eq!(counts.get("Angers"), Some(&1));
        assert_eq!(counts.keys().collect::<Vec<_>>(), vec!["Angers", "Nantes"]);
    }

    #[test]
    fn test_run_alerts_writes_alert_table() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let rows = vec![
            reading(Pollutant::Pm10, "Angers", 80.0, 1),
            reading(Pollutant::Pm10, "Angers", 80.01, 2),
            reading(Pollutant::Pm10, "Cholet", 120.0, 2),
        ];
        write_measurements(&config.clean_path(Pollutant::Pm10.clean_file()), Pollutant::Pm10, &rows)
            .unwrap();

        let summary = run_alerts(&config, Pollutant::Pm10).unwrap();

        assert_eq!(summary.alerts, 2);
        let written = read_alerts(&config.clean_path(Pollutant::Pm10.alert_file())).unwrap();
        assert_eq!(written.len(), 2);
        assert_eq!(written[0].value, 80.01);
        assert_eq!(written[1].commune, "Cholet");
    }

    #[test]
    fn test_run_alerts_on_empty_table_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        write_measurements(&config.clean_path(Pollutant::No2.clean_file()), Pollutant::No2, &[])
            .unwrap();

        let summary = run_alerts(&config, Pollutant::No2).unwrap();

        assert_eq!(summary.alerts, 0);
        assert!(summary.per_commune.is_empty());
        assert!(config.clean_path(Pollutant::No2.alert_file()).exists());
    }

    #[test]
    fn test_run_alerts_without_clean_table_fails() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());

        assert!(run_alerts(&config, Pollutant::No2).is_err());
    }

    #[test]
    fn test_pm10_can_be_switched_to_rolling_rule() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_in(dir.path());
        config.pm10_rule = AlertStrategy::RollingDailyMean { window: 3 };
        let rows: Vec<Measurement> = vec![
            reading(Pollutant::Pm10, "Angers", 95.0, 1),
            reading(Pollutant::Pm10, "Angers", 95.0, 2),
            reading(Pollutant::Pm10, "Angers", 95.0, 3),
        ];
        write_measurements(&config.clean_path(Pollutant::Pm10.clean_file()), Pollutant::Pm10, &rows)
            .unwrap();

        let summary = run_alerts(&config, Pollutant::Pm10).unwrap();
        assert_eq!(summary.alerts, 1);
    }
}
