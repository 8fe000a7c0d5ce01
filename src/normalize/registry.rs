//! Population and enterprise reference tables from the regional records API.
//!
//! Both datasets wrap each row as `{"fields": {...}}` under a `records` array.

use serde_json::{Map, Value};
use tracing::debug;

use super::flatten::{coerce_number, parse_local_date, text_value};
use super::stats::NormalizeStats;
use super::types::{EnterpriseRecord, PopulationRecord};
use super::{NormalizeError, records_under};

pub const POPULATION_DATASET: &str = "population";
pub const ENTERPRISE_DATASET: &str = "enterprise";

fn fields_of<'a>(
    record: &'a Value,
    dataset: &str,
    index: usize,
) -> Result<&'a Map<String, Value>, NormalizeError> {
    record
        .get("fields")
        .and_then(Value::as_object)
        .ok_or_else(|| NormalizeError::MissingField {
            dataset: dataset.to_string(),
            index,
            field: "fields",
        })
}

fn required<'a>(
    fields: &'a Map<String, Value>,
    name: &'static str,
    dataset: &str,
    index: usize,
) -> Result<&'a Value, NormalizeError> {
    fields.get(name).ok_or_else(|| NormalizeError::MissingField {
        dataset: dataset.to_string(),
        index,
        field: name,
    })
}

/// Extracts commune populations. Rows whose total is not numeric are dropped.
pub fn normalize_population(
    raw: &Value,
    stats: &mut NormalizeStats,
) -> Result<Vec<PopulationRecord>, NormalizeError> {
    let records = records_under(raw, "records", POPULATION_DATASET)?;
    let mut rows = Vec::with_capacity(records.len());

    for (index, record) in records.iter().enumerate() {
        stats.records += 1;
        let fields = fields_of(record, POPULATION_DATASET, index)?;
        if index == 0 {
            debug!(dataset = POPULATION_DATASET, columns = ?fields.keys().collect::<Vec<_>>(), "Available source columns");
        }

        let commune = text_value(required(fields, "nom_de_la_commune", POPULATION_DATASET, index)?);
        let total = required(fields, "population_totale", POPULATION_DATASET, index)?;
        let tranche = text_value(required(fields, "tranche_population", POPULATION_DATASET, index)?);

        let Some(population_totale) = coerce_number(total) else {
            stats.dropped_missing += 1;
            continue;
        };

        rows.push(PopulationRecord {
            commune,
            population_totale,
            tranche_population: tranche,
        });
        stats.kept += 1;
    }

    Ok(rows)
}

/// Extracts establishments.
///
/// `datefermetureetablissement` is open-ended: when absent, null or not a
/// date the establishment is kept with no closure date.
pub fn normalize_enterprise(
    raw: &Value,
    stats: &mut NormalizeStats,
) -> Result<Vec<EnterpriseRecord>, NormalizeError> {
    let records = records_under(raw, "records", ENTERPRISE_DATASET)?;
    let mut rows = Vec::with_capacity(records.len());

    for (index, record) in records.iter().enumerate() {
        stats.records += 1;
        let fields = fields_of(record, ENTERPRISE_DATASET, index)?;
        let text = |name: &'static str| {
            required(fields, name, ENTERPRISE_DATASET, index).map(text_value)
        };

        let date_fermeture = fields
            .get("datefermetureetablissement")
            .map(text_value)
            .and_then(|raw| parse_local_date(&raw));

        rows.push(EnterpriseRecord {
            commune: text("libellecommuneetablissement")?,
            etat: text("etatadministratifetablissement")?,
            activite_principale: text("activiteprincipaleetablissement")?,
            soussection: text("soussectionetablissement")?,
            section: text("sectionetablissement")?,
            date_creation: text("datecreationetablissement")?,
            date_fermeture,
        });
        stats.kept += 1;
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    fn establishment(closure: Option<Value>) -> Value {
        let mut fields = json!({
            "libellecommuneetablissement": "LA ROCHE-SUR-YON",
            "etatadministratifetablissement": "Actif",
            "activiteprincipaleetablissement": "56.10A",
            "soussectionetablissement": "Hébergement et restauration",
            "sectionetablissement": "I",
            "datecreationetablissement": "2024-03-04",
        });
        if let Some(value) = closure {
            fields["datefermetureetablissement"] = value;
        }
        json!({ "recordid": "abc", "fields": fields })
    }

    #[test]
    fn test_population_rows() {
        let raw = json!({ "records": [
            { "fields": { "nom_de_la_commune": "Nantes", "population_totale": 320732, "tranche_population": "Plus de 100 000", "code_insee": "44109" } },
            { "fields": { "nom_de_la_commune": "Oudon", "population_totale": "4004", "tranche_population": "2 000 à 5 000" } },
            { "fields": { "nom_de_la_commune": "Inconnue", "population_totale": null, "tranche_population": "" } },
        ]});
        let mut stats = NormalizeStats::new(POPULATION_DATASET);

        let rows = normalize_population(&raw, &mut stats).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].commune, "Nantes");
        assert_eq!(rows[0].population_totale, 320732.0);
        assert_eq!(rows[1].population_totale, 4004.0);
        assert_eq!(stats.dropped_missing, 1);
    }

    #[test]
    fn test_population_without_fields_fails() {
        let raw = json!({ "records": [{ "recordid": "x" }] });
        let mut stats = NormalizeStats::new(POPULATION_DATASET);

        let err = normalize_population(&raw, &mut stats).unwrap_err();
        assert!(matches!(err, NormalizeError::MissingField { field: "fields", .. }));
    }

    #[test]
    fn test_enterprise_closure_date_is_open_ended() {
        let raw = json!({ "records": [
            establishment(None),
            establishment(Some(json!(null))),
            establishment(Some(json!("pas encore"))),
            establishment(Some(json!("2024-06-30"))),
        ]});
        let mut stats = NormalizeStats::new(ENTERPRISE_DATASET);

        let rows = normalize_enterprise(&raw, &mut stats).unwrap();

        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].date_fermeture, None);
        assert_eq!(rows[1].date_fermeture, None);
        assert_eq!(rows[2].date_fermeture, None);
        assert_eq!(rows[3].date_fermeture, NaiveDate::from_ymd_opt(2024, 6, 30));
        assert_eq!(rows[0].activite_principale, "56.10A");
        assert_eq!(rows[0].soussection, "Hébergement et restauration");
    }

    #[test]
    fn test_enterprise_missing_required_field_fails() {
        let raw = json!({ "records": [{ "fields": { "libellecommuneetablissement": "NANTES" } }] });
        let mut stats = NormalizeStats::new(ENTERPRISE_DATASET);

        let err = normalize_enterprise(&raw, &mut stats).unwrap_err();
        assert!(matches!(
            err,
            NormalizeError::MissingField { field: "etatadministratifetablissement", .. }
        ));
    }
}
