//! Spreadsheet report over the clean tables and alert files.

pub mod charts;
pub mod dashboard;
pub mod sheets;
pub mod table;

pub use dashboard::{DashboardRow, merge_alert_counts};
pub use table::Table;

use anyhow::{Context, Result};
use rust_xlsxwriter::Workbook;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info};

use crate::config::Config;
use crate::normalize::{CLEAN_ENTERPRISE_FILE, CLEAN_POPULATION_FILE, Pollutant};

/// Assembles every sheet in report order.
///
/// All four clean tables must exist. Missing alert files only degrade the
/// dashboard sheet.
pub fn build_workbook(config: &Config) -> Result<Workbook> {
    let no2 = Table::read_csv(&config.clean_path(Pollutant::No2.clean_file()))?;
    let pm10 = Table::read_csv(&config.clean_path(Pollutant::Pm10.clean_file()))?;
    let population = Table::read_csv(&config.clean_path(CLEAN_POPULATION_FILE))?;
    let enterprise = Table::read_csv(&config.clean_path(CLEAN_ENTERPRISE_FILE))?;

    let sheets = [
        sheets::pollutant_sheet(&no2, Pollutant::No2)?,
        sheets::pollutant_sheet(&pm10, Pollutant::Pm10)?,
        sheets::population_sheet(&population)?,
        sheets::enterprise_sheet(&enterprise)?,
        sheets::dashboard_sheet(
            &config.clean_path(Pollutant::No2.alert_file()),
            &config.clean_path(Pollutant::Pm10.alert_file()),
        )?,
        sheets::normes_sheet()?,
    ];

    let mut workbook = Workbook::new();
    for sheet in sheets {
        debug!(sheet = %sheet.name(), charts = sheet.charts, "sheet built");
        workbook.push_worksheet(sheet.worksheet);
    }
    Ok(workbook)
}

/// Builds the report workbook at `config.report_path`.
#[tracing::instrument(skip(config))]
pub fn export(config: &Config) -> Result<PathBuf> {
    let mut workbook = build_workbook(config)?;

    let path = config.report_path.clone();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }
    workbook
        .save(&path)
        .with_context(|| format!("failed to save report {}", path.display()))?;

    info!(path = %path.display(), "Rapport Excel généré : {}", path.display());
    Ok(path)
}
