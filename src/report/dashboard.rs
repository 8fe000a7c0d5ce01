//! Cross-pollutant alert summary.

use std::collections::{BTreeMap, BTreeSet};

/// Alert counts of one commune across both pollutants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardRow {
    pub commune: String,
    pub nb_alertes_no2: usize,
    pub nb_alertes_pm10: usize,
}

pub const DASHBOARD_COLUMNS: [&str; 3] = ["commune", "nb_alertes_no2", "nb_alertes_pm10"];

/// Full outer join of the two per-commune counts on commune.
///
/// A commune missing from one side gets a count of zero there.
pub fn merge_alert_counts(
    no2: &BTreeMap<String, usize>,
    pm10: &BTreeMap<String, usize>,
) -> Vec<DashboardRow> {
    let communes: BTreeSet<&String> = no2.keys().chain(pm10.keys()).collect();

    communes
        .into_iter()
        .map(|commune| DashboardRow {
            commune: commune.clone(),
            nb_alertes_no2: no2.get(commune).copied().unwrap_or(0),
            nb_alertes_pm10: pm10.get(commune).copied().unwrap_or(0),
        })
        .collect()
}

/// Counts as a chart series, most alerts first.
pub fn ranked_counts(counts: &BTreeMap<String, usize>) -> Vec<(String, f64)> {
    let mut ranked: Vec<(&String, &usize)> = counts.iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(a.1));
    ranked
        .into_iter()
        .map(|(commune, count)| (commune.clone(), *count as f64))
        .collect()
}
