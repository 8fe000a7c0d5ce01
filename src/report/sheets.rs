//! One builder per workbook sheet.

use anyhow::Result;
use rust_xlsxwriter::{ColNum, Color, RowNum, Worksheet};
use std::path::Path;
use tracing::{debug, warn};

use super::charts::{SeriesRange, ThresholdLine, bar_chart, threshold_chart, trend_chart};
use super::dashboard::{DASHBOARD_COLUMNS, merge_alert_counts, ranked_counts};
use super::table::Table;
use crate::alerts::{alerts_per_commune, read_alerts};
use crate::normalize::Pollutant;

pub const PREVIEW_ROWS: usize = 100;
pub const TOP_ACTIVITIES: usize = 10;

/// Column `Z`, where chart source series start.
const SERIES_COL: ColNum = 25;

// Zero-based (row, col) anchors.
const TREND_ANCHOR: (RowNum, ColNum) = (1, 7); // H2
const THRESHOLD_ANCHOR: (RowNum, ColNum) = (19, 7); // H20
const ACTIVITY_ANCHOR: (RowNum, ColNum) = (1, 4); // E2
const NO2_ALERTS_ANCHOR: (RowNum, ColNum) = (1, 6); // G2
const PM10_ALERTS_ANCHOR: (RowNum, ColNum) = (29, 6); // G30

const NORMES: [[&str; 5]; 11] = [
    ["Polluant", "Type de norme", "Valeur", "Unité", "Origine"],
    ["NO2", "Objectif de qualité (annuel)", "40", "μg/m³", "FR"],
    ["NO2", "Valeur limite horaire (18h/an)", "200", "μg/m³", "UE"],
    ["NO2", "Seuil d’information", "200", "μg/m³", "FR"],
    ["NO2", "Seuil d’alerte", "400", "μg/m³", "UE/FR"],
    ["PM10", "Objectif de qualité (annuel)", "30", "μg/m³", "FR"],
    ["PM10", "Valeur limite journalière (35j/an)", "50", "μg/m³", "UE"],
    ["PM10", "Seuil d’information", "50", "μg/m³", "FR"],
    ["PM10", "Seuil d’alerte", "80", "μg/m³", "FR"],
    ["O3", "Seuil d’alerte", "240", "μg/m³", "FR"],
    ["SO2", "Seuil d’alerte", "500", "μg/m³", "FR"],
];

const DEFINITIONS: [&str; 4] = [
    "Objectif de qualité : niveau souhaité à long terme",
    "Valeur limite : niveau à ne pas dépasser",
    "Seuil d’information : niveau avec risque pour groupes sensibles",
    "Seuil d’alerte : niveau nécessitant des mesures d’urgence",
];

/// A built worksheet and the number of charts placed on it.
pub struct Sheet {
    pub worksheet: Worksheet,
    pub charts: usize,
}

impl Sheet {
    fn plain(worksheet: Worksheet) -> Self {
        Sheet { worksheet, charts: 0 }
    }

    pub fn name(&self) -> String {
        self.worksheet.name()
    }
}

/// Text left in `A1` of the dashboard when an alert file is absent.
pub fn missing_alerts_notice(path: &Path) -> String {
    format!("Fichiers d'alerte non trouvés : {}", path.display())
}

fn named(name: &str) -> Result<Worksheet> {
    let mut worksheet = Worksheet::new();
    worksheet.set_name(name)?;
    Ok(worksheet)
}

/// Writes a cell, as a number when the text parses to a finite float.
pub fn write_cell(worksheet: &mut Worksheet, row: RowNum, col: ColNum, value: &str) -> Result<()> {
    match value.trim().parse::<f64>() {
        Ok(number) if number.is_finite() => {
            worksheet.write_number(row, col, number)?;
        }
        _ => {
            worksheet.write_string(row, col, value)?;
        }
    }
    Ok(())
}

/// Header on row 0, then `rows` below it.
pub fn write_rows(worksheet: &mut Worksheet, headers: &[String], rows: &[Vec<String>]) -> Result<()> {
    for (col, header) in headers.iter().enumerate() {
        worksheet.write_string(0, col as ColNum, header.as_str())?;
    }
    for (i, row) in rows.iter().enumerate() {
        for (col, value) in row.iter().enumerate() {
            write_cell(worksheet, i as RowNum + 1, col as ColNum, value)?;
        }
    }
    Ok(())
}

pub fn threshold_lines(pollutant: Pollutant) -> Vec<ThresholdLine> {
    let info = pollutant.info_threshold();
    let alert = pollutant.alert_threshold();
    let mut lines = Vec::new();
    if pollutant == Pollutant::No2 {
        lines.push(ThresholdLine {
            value: 40.0,
            label: "Valeur limite annuelle (40)".to_string(),
            color: Color::Blue,
        });
    }
    lines.push(ThresholdLine {
        value: info,
        label: format!("Seuil info ({})", info),
        color: Color::Orange,
    });
    lines.push(ThresholdLine {
        value: alert,
        label: format!("Seuil alerte ({})", alert),
        color: Color::Red,
    });
    lines
}

/// Preview of the clean measurements with a trend and a threshold chart.
pub fn pollutant_sheet(table: &Table, pollutant: Pollutant) -> Result<Sheet> {
    let name = pollutant.label();
    let value_col = pollutant.value_column();
    let mut worksheet = named(name)?;
    write_rows(&mut worksheet, &table.headers, table.head(PREVIEW_ROWS))?;

    let Some(points) = table.mean_by("date_local", value_col) else {
        warn!(sheet = name, "Colonnes 'date_local' ou '{}' non trouvées. Ignoré.", value_col);
        return Ok(Sheet::plain(worksheet));
    };

    let range = SeriesRange::write(
        &mut worksheet,
        name,
        SERIES_COL,
        ("date_local", value_col),
        &points,
    )?;
    let Some(range) = range else {
        warn!(sheet = name, "Données vides pour : Évolution {}", name);
        return Ok(Sheet::plain(worksheet));
    };

    let trend = trend_chart(&range, &format!("Évolution {}", name), value_col);
    worksheet.insert_chart(TREND_ANCHOR.0, TREND_ANCHOR.1, &trend)?;

    let overlay = threshold_chart(
        &mut worksheet,
        &range,
        &format!("{} avec seuils", name),
        value_col,
        &threshold_lines(pollutant),
    )?;
    worksheet.insert_chart(THRESHOLD_ANCHOR.0, THRESHOLD_ANCHOR.1, &overlay)?;

    debug!(sheet = name, days = points.len(), "charts inserted");
    Ok(Sheet { worksheet, charts: 2 })
}

pub fn population_sheet(table: &Table) -> Result<Sheet> {
    let mut worksheet = named("Population")?;
    write_rows(&mut worksheet, &table.headers, &table.rows)?;
    Ok(Sheet::plain(worksheet))
}

/// Most frequent main activities and their bar chart.
pub fn enterprise_sheet(table: &Table) -> Result<Sheet> {
    let name = "Entreprises";
    let headers = ("activite_principale", "count");
    let mut worksheet = named(name)?;

    let Some(top) = table.value_counts(headers.0, TOP_ACTIVITIES) else {
        warn!(sheet = name, "Colonne '{}' non trouvée. Ignoré.", headers.0);
        return Ok(Sheet::plain(worksheet));
    };
    let points: Vec<(String, f64)> = top
        .into_iter()
        .map(|(activity, count)| (activity, count as f64))
        .collect();

    let charts = match SeriesRange::write(&mut worksheet, name, 0, headers, &points)? {
        Some(range) => {
            let chart = bar_chart(&range, "Top activités entreprises");
            worksheet.insert_chart(ACTIVITY_ANCHOR.0, ACTIVITY_ANCHOR.1, &chart)?;
            1
        }
        None => {
            worksheet.write_string(0, 0, headers.0)?;
            worksheet.write_string(0, 1, headers.1)?;
            warn!(sheet = name, "Données vides pour : Top activités entreprises");
            0
        }
    };
    Ok(Sheet { worksheet, charts })
}

/// Alert counts per commune for both pollutants.
///
/// When an alert file is missing the sheet only carries a notice in `A1`.
pub fn dashboard_sheet(no2_alerts: &Path, pm10_alerts: &Path) -> Result<Sheet> {
    let name = "Dashboard";
    let mut worksheet = named(name)?;

    if let Some(missing) = [no2_alerts, pm10_alerts].into_iter().find(|p| !p.exists()) {
        warn!(path = %missing.display(), "alert file not found");
        worksheet.write_string(0, 0, missing_alerts_notice(missing))?;
        return Ok(Sheet::plain(worksheet));
    }

    let no2 = alerts_per_commune(&read_alerts(no2_alerts)?);
    let pm10 = alerts_per_commune(&read_alerts(pm10_alerts)?);

    for (col, header) in DASHBOARD_COLUMNS.iter().enumerate() {
        worksheet.write_string(0, col as ColNum, *header)?;
    }
    for (i, row) in merge_alert_counts(&no2, &pm10).iter().enumerate() {
        let r = i as RowNum + 1;
        worksheet.write_string(r, 0, row.commune.as_str())?;
        worksheet.write_number(r, 1, row.nb_alertes_no2 as f64)?;
        worksheet.write_number(r, 2, row.nb_alertes_pm10 as f64)?;
    }

    let sets = [
        (&no2, "nb_alertes_no2", "Alertes NO2", SERIES_COL, NO2_ALERTS_ANCHOR),
        (&pm10, "nb_alertes_pm10", "Alertes PM10", SERIES_COL + 3, PM10_ALERTS_ANCHOR),
    ];
    let mut charts = 0;
    for (counts, column, title, col, anchor) in sets {
        let points = ranked_counts(counts);
        match SeriesRange::write(&mut worksheet, name, col, ("commune", column), &points)? {
            Some(range) => {
                worksheet.insert_chart(anchor.0, anchor.1, &bar_chart(&range, title))?;
                charts += 1;
            }
            None => warn!("Données vides pour : {}", title),
        }
    }

    Ok(Sheet { worksheet, charts })
}

/// Static table of regulatory thresholds.
pub fn normes_sheet() -> Result<Sheet> {
    let mut worksheet = named("Normes")?;
    for (r, row) in NORMES.iter().enumerate() {
        for (c, value) in row.iter().enumerate() {
            worksheet.write_string(r as RowNum, c as ColNum, *value)?;
        }
    }

    // One blank row between the table and the definitions.
    let mut r = NORMES.len() as RowNum + 1;
    worksheet.write_string(r, 0, "Définitions :")?;
    for definition in DEFINITIONS {
        r += 1;
        worksheet.write_string(r, 0, definition)?;
    }
    Ok(Sheet::plain(worksheet))
}
