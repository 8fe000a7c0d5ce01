//! Row types produced by normalization.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Pollutants measured by the regional network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Pollutant {
    No2,
    Pm10,
}

impl Pollutant {
    pub const ALL: [Pollutant; 2] = [Pollutant::No2, Pollutant::Pm10];

    pub fn label(&self) -> &'static str {
        match self {
            Pollutant::No2 => "NO2",
            Pollutant::Pm10 => "PM10",
        }
    }

    /// Pollutant code used by the measurement API.
    pub fn api_code(&self) -> &'static str {
        match self {
            Pollutant::No2 => "03",
            Pollutant::Pm10 => "24",
        }
    }

    /// Name of the value column in clean tables.
    pub fn value_column(&self) -> &'static str {
        match self {
            Pollutant::No2 => "no2_value",
            Pollutant::Pm10 => "pm10_value",
        }
    }

    /// Seuil d'information et de recommandation, in µg/m³.
    pub fn info_threshold(&self) -> f64 {
        match self {
            Pollutant::No2 => 200.0,
            Pollutant::Pm10 => 50.0,
        }
    }

    /// Seuil d'alerte, in µg/m³.
    pub fn alert_threshold(&self) -> f64 {
        match self {
            Pollutant::No2 => 400.0,
            Pollutant::Pm10 => 80.0,
        }
    }

    /// Level above which the alert engine flags a day or reading.
    ///
    /// NO2 is monitored against the information threshold, PM10 against
    /// the alert threshold.
    pub fn alert_trigger(&self) -> f64 {
        match self {
            Pollutant::No2 => self.info_threshold(),
            Pollutant::Pm10 => self.alert_threshold(),
        }
    }

    pub fn raw_file(&self) -> &'static str {
        match self {
            Pollutant::No2 => "NO2_Data.json",
            Pollutant::Pm10 => "PM10_Data.json",
        }
    }

    pub fn clean_file(&self) -> &'static str {
        match self {
            Pollutant::No2 => "NO2_data.csv",
            Pollutant::Pm10 => "PM10_data.csv",
        }
    }

    pub fn alert_file(&self) -> &'static str {
        match self {
            Pollutant::No2 => "NO2_alert_200_3days.csv",
            Pollutant::Pm10 => "PM10_alerts.csv",
        }
    }

    /// Header of the clean measurement table.
    pub fn columns(&self) -> [&'static str; 6] {
        [
            "commune",
            "station",
            self.value_column(),
            "date_local",
            "seuil_info_recommandation",
            "seuil_alerte",
        ]
    }
}

impl fmt::Display for Pollutant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One validated pollutant reading.
///
/// `value` is always in `[0, 1000)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    pub commune: String,
    pub station: String,
    pub value: f64,
    pub date_local: NaiveDate,
    pub info_threshold: f64,
    pub alert_threshold: f64,
}

impl Measurement {
    pub fn new(
        pollutant: Pollutant,
        commune: impl Into<String>,
        station: impl Into<String>,
        value: f64,
        date_local: NaiveDate,
    ) -> Self {
        Self {
            commune: commune.into(),
            station: station.into(),
            value,
            date_local,
            info_threshold: pollutant.info_threshold(),
            alert_threshold: pollutant.alert_threshold(),
        }
    }

    /// CSV fields in the order of [`Pollutant::columns`].
    pub fn to_record(&self) -> [String; 6] {
        [
            self.commune.clone(),
            self.station.clone(),
            self.value.to_string(),
            self.date_local.to_string(),
            self.info_threshold.to_string(),
            self.alert_threshold.to_string(),
        ]
    }
}

/// Commune population from the regional census extract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationRecord {
    pub commune: String,
    pub population_totale: f64,
    pub tranche_population: String,
}

impl PopulationRecord {
    pub const COLUMNS: [&'static str; 3] = ["commune", "population_totale", "tranche_population"];
}

/// Establishment from the SIRENE registry extract.
///
/// `date_fermeture` is `None` for establishments that are still open.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnterpriseRecord {
    pub commune: String,
    pub etat: String,
    pub activite_principale: String,
    pub soussection: String,
    pub section: String,
    pub date_creation: String,
    pub date_fermeture: Option<NaiveDate>,
}

impl EnterpriseRecord {
    pub const COLUMNS: [&'static str; 7] = [
        "commune",
        "etat",
        "activite_principale",
        "soussection",
        "section",
        "date_creation",
        "date_fermeture",
    ];
}
