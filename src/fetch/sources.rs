//! Query definitions for the upstream open-data APIs.

use std::path::PathBuf;
use tracing::info;

use super::{FetchError, HttpClient, fetch_json, save_raw};
use crate::config::Config;
use crate::normalize::Pollutant;
use crate::pipeline::DateWindow;

pub const RAW_POPULATION_FILE: &str = "population_data.json";
pub const RAW_ENTERPRISE_FILE: &str = "enterprise_data.json";

const POLLUTANT_PARAM: &str = "code_configuration_de_mesure__code_point_de_prelevement__code_polluant";
const DEPARTEMENT_PARAM: &str = "code_configuration_de_mesure__code_point_de_prelevement__code_station__code_commune__code_departement__in";

/// Query parameters for daily measurements of `pollutant` over `window`.
pub fn pollution_params(
    config: &Config,
    pollutant: Pollutant,
    window: &DateWindow,
) -> Vec<(&'static str, String)> {
    vec![
        (POLLUTANT_PARAM, pollutant.api_code().to_string()),
        (DEPARTEMENT_PARAM, config.departement_filter()),
        ("date_heure_tu__range", window.range_param()),
        ("export", "json".to_string()),
        ("format", "json".to_string()),
    ]
}

pub fn population_params(config: &Config) -> Vec<(&'static str, String)> {
    vec![
        ("dataset", config.population_dataset.clone()),
        ("rows", config.registry_rows.to_string()),
        ("format", "json".to_string()),
    ]
}

pub fn enterprise_params(config: &Config) -> Vec<(&'static str, String)> {
    vec![
        ("dataset", config.enterprise_dataset.clone()),
        ("rows", config.registry_rows.to_string()),
        ("format", "json".to_string()),
        (
            "where",
            format!(
                "datecreationetablissement > \"{}\"",
                config.enterprise_created_after
            ),
        ),
    ]
}

/// Fetches daily measurements for one pollutant and stores the raw response.
#[tracing::instrument(skip(client, config), fields(pollutant = %pollutant, range = %window.range_param()))]
pub fn fetch_pollution<C: HttpClient>(
    client: &C,
    config: &Config,
    pollutant: Pollutant,
    window: &DateWindow,
) -> Result<PathBuf, FetchError> {
    let params = pollution_params(config, pollutant, window);
    let data = fetch_json(client, &config.pollution_api_url, &params)?;

    let path = config.raw_path(pollutant.raw_file());
    save_raw(&path, &data)?;
    info!(path = %path.display(), "{} data saved", pollutant);
    Ok(path)
}

#[tracing::instrument(skip(client, config))]
pub fn fetch_population<C: HttpClient>(client: &C, config: &Config) -> Result<PathBuf, FetchError> {
    let data = fetch_json(client, &config.registry_api_url, &population_params(config))?;

    let path = config.raw_path(RAW_POPULATION_FILE);
    save_raw(&path, &data)?;
    info!(path = %path.display(), "Population data saved");
    Ok(path)
}

#[tracing::instrument(skip(client, config))]
pub fn fetch_enterprise<C: HttpClient>(client: &C, config: &Config) -> Result<PathBuf, FetchError> {
    let data = fetch_json(client, &config.registry_api_url, &enterprise_params(config))?;

    let path = config.raw_path(RAW_ENTERPRISE_FILE);
    save_raw(&path, &data)?;
    info!(path = %path.display(), "Enterprise data saved");
    Ok(path)
}
