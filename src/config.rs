//! Runtime configuration for the report pipeline.
//!
//! A single [`Config`] is built once at start-up and passed by reference into
//! every stage. Values come from environment variables (the binary loads a
//! `.env` file first) with defaults matching the Pays de la Loire open-data
//! endpoints.

use anyhow::{Result, anyhow};
use std::path::PathBuf;

use crate::alerts::AlertStrategy;

/// Parse an optional numeric variable through `lookup`, falling back to a default.
macro_rules! parse_var {
    ($lookup:expr, $name:expr, $ty:ty, $default:expr) => {
        $lookup($name)
            .map(|v| v.trim().parse::<$ty>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $name, e))?
            .unwrap_or($default)
    };
}

pub const DEFAULT_POLLUTION_API_URL: &str = "https://data.airpl.org/api/v1/mesure/journaliere/";
pub const DEFAULT_REGISTRY_API_URL: &str = "https://data.paysdelaloire.fr/api/records/1.0/search/";
pub const DEFAULT_POPULATION_DATASET: &str =
    "12002701600563_population_pays_de_la_loire_2019_communes_epci";
pub const DEFAULT_ENTERPRISE_DATASET: &str = "120027016_base-sirene-v3-ss";

/// Strongly typed pipeline configuration. Immutable once loaded.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding raw JSON responses.
    pub raw_dir: PathBuf,
    /// Directory holding normalized and alert CSV tables.
    pub clean_dir: PathBuf,
    /// Output path of the spreadsheet report.
    pub report_path: PathBuf,

    pub pollution_api_url: String,
    pub registry_api_url: String,
    /// Department codes sent as a comma separated filter.
    pub departements: Vec<String>,
    /// Row limit for registry queries (the API caps it at 10000).
    pub registry_rows: u32,
    pub population_dataset: String,
    pub enterprise_dataset: String,
    /// Lower bound on establishment creation date for the enterprise query.
    pub enterprise_created_after: String,

    /// Default date window length when no explicit dates are given.
    pub lookback_days: i64,
    pub no2_rule: AlertStrategy,
    pub pm10_rule: AlertStrategy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            raw_dir: PathBuf::from("datas"),
            clean_dir: PathBuf::from("data_clean"),
            report_path: PathBuf::from("export_auto/export_analyse_air.xlsx"),
            pollution_api_url: DEFAULT_POLLUTION_API_URL.to_string(),
            registry_api_url: DEFAULT_REGISTRY_API_URL.to_string(),
            departements: ["44", "49", "53", "72", "85"]
                .iter()
                .map(|d| d.to_string())
                .collect(),
            registry_rows: 10_000,
            population_dataset: DEFAULT_POPULATION_DATASET.to_string(),
            enterprise_dataset: DEFAULT_ENTERPRISE_DATASET.to_string(),
            enterprise_created_after: "2024-01-01".to_string(),
            lookback_days: 90,
            no2_rule: AlertStrategy::RollingDailyMean { window: 3 },
            pm10_rule: AlertStrategy::SingleReading,
        }
    }
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// Optional variables (all have defaults):
    /// - `AIRQ_RAW_DIR`, `AIRQ_CLEAN_DIR`, `AIRQ_REPORT_PATH`
    /// - `AIRQ_POLLUTION_API_URL`, `AIRQ_REGISTRY_API_URL`
    /// - `AIRQ_DEPARTEMENTS` – comma separated codes (default `44,49,53,72,85`)
    /// - `AIRQ_REGISTRY_ROWS` (default 10000)
    /// - `AIRQ_POPULATION_DATASET`, `AIRQ_ENTERPRISE_DATASET`
    /// - `AIRQ_ENTERPRISE_CREATED_AFTER` (default `2024-01-01`)
    /// - `AIRQ_LOOKBACK_DAYS` (default 90)
    /// - `AIRQ_NO2_RULE` / `AIRQ_PM10_RULE` – `rolling` or `single`
    /// - `AIRQ_ROLLING_WINDOW` (default 3)
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let path_or = |name: &str, default: PathBuf| lookup(name).map(PathBuf::from).unwrap_or(default);
        let string_or = |name: &str, default: String| lookup(name).unwrap_or(default);

        let departements = match lookup("AIRQ_DEPARTEMENTS") {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(String::from)
                .collect(),
            None => defaults.departements,
        };

        let registry_rows = parse_var!(lookup, "AIRQ_REGISTRY_ROWS", u32, defaults.registry_rows);
        let lookback_days = parse_var!(lookup, "AIRQ_LOOKBACK_DAYS", i64, defaults.lookback_days);
        if lookback_days < 0 {
            return Err(anyhow!("Invalid AIRQ_LOOKBACK_DAYS: must not be negative"));
        }
        let window = parse_var!(lookup, "AIRQ_ROLLING_WINDOW", usize, 3);
        if window == 0 {
            return Err(anyhow!("Invalid AIRQ_ROLLING_WINDOW: must be at least 1"));
        }

        let no2_rule = match lookup("AIRQ_NO2_RULE") {
            Some(name) => AlertStrategy::parse(&name, window)?,
            None => AlertStrategy::RollingDailyMean { window },
        };
        let pm10_rule = match lookup("AIRQ_PM10_RULE") {
            Some(name) => AlertStrategy::parse(&name, window)?,
            None => defaults.pm10_rule,
        };

        Ok(Config {
            raw_dir: path_or("AIRQ_RAW_DIR", defaults.raw_dir),
            clean_dir: path_or("AIRQ_CLEAN_DIR", defaults.clean_dir),
            report_path: path_or("AIRQ_REPORT_PATH", defaults.report_path),
            pollution_api_url: string_or("AIRQ_POLLUTION_API_URL", defaults.pollution_api_url),
            registry_api_url: string_or("AIRQ_REGISTRY_API_URL", defaults.registry_api_url),
            departements,
            registry_rows,
            population_dataset: string_or("AIRQ_POPULATION_DATASET", defaults.population_dataset),
            enterprise_dataset: string_or("AIRQ_ENTERPRISE_DATASET", defaults.enterprise_dataset),
            enterprise_created_after: string_or(
                "AIRQ_ENTERPRISE_CREATED_AFTER",
                defaults.enterprise_created_after,
            ),
            lookback_days,
            no2_rule,
            pm10_rule,
        })
    }

    /// Department filter as sent to the pollution API.
    ///
    /// The upstream query has always carried a trailing comma; it is kept.
    pub fn departement_filter(&self) -> String {
        let mut filter = self.departements.join(",");
        filter.push(',');
        filter
    }

    pub fn raw_path(&self, file_name: &str) -> PathBuf {
        self.raw_dir.join(file_name)
    }

    pub fn clean_path(&self, file_name: &str) -> PathBuf {
        self.clean_dir.join(file_name)
    }

    /// Log the loaded configuration.
    pub fn log_config(&self) {
        tracing::info!("Configuration loaded:");
        tracing::info!("  AIRQ_RAW_DIR           : {}", self.raw_dir.display());
        tracing::info!("  AIRQ_CLEAN_DIR         : {}", self.clean_dir.display());
        tracing::info!("  AIRQ_REPORT_PATH       : {}", self.report_path.display());
        tracing::info!("  AIRQ_POLLUTION_API_URL : {}", self.pollution_api_url);
        tracing::info!("  AIRQ_REGISTRY_API_URL  : {}", self.registry_api_url);
        tracing::info!("  AIRQ_DEPARTEMENTS      : {}", self.departements.join(","));
        tracing::info!("  AIRQ_LOOKBACK_DAYS     : {}", self.lookback_days);
        tracing::info!("  AIRQ_NO2_RULE          : {}", self.no2_rule);
        tracing::info!("  AIRQ_PM10_RULE         : {}", self.pm10_rule);
    }
}
