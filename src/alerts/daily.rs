//! Daily aggregation and trailing-window exceedance counting.

use chrono::NaiveDate;
use std::collections::{BTreeMap, VecDeque};

use super::types::{DailyAggregate, RollingTerm};
use crate::normalize::Measurement;

/// Averages measurements per (commune, station, date).
///
/// Output is ordered by commune, station, then date. Days without readings
/// produce no aggregate.
pub fn daily_aggregates(measurements: &[Measurement], threshold: f64) -> Vec<DailyAggregate> {
    // (sum, count) per group; a group exists only once it has a reading.
    let mut groups: BTreeMap<(&str, &str, NaiveDate), (f64, usize)> = BTreeMap::new();

    for m in measurements {
        let entry = groups
            .entry((m.commune.as_str(), m.station.as_str(), m.date_local))
            .or_insert((0.0, 0));
        entry.0 += m.value;
        entry.1 += 1;
    }

    groups
        .into_iter()
        .map(|((commune, station, date), (sum, count))| {
            let mean_value = sum / count as f64;
            DailyAggregate {
                commune: commune.to_string(),
                station: station.to_string(),
                date,
                mean_value,
                exceeds_threshold: mean_value > threshold,
            }
        })
        .collect()
}

/// Counts exceeding days over the last `window` present aggregates of each
/// (commune, station) partition.
///
/// The window slides over existing rows: a missing calendar day does not
/// break a sequence, the aggregates on either side are treated as adjacent.
pub fn rolling_terms(mut aggregates: Vec<DailyAggregate>, window: usize) -> Vec<RollingTerm> {
    aggregates.sort_by(|a, b| {
        (&a.commune, &a.station, a.date).cmp(&(&b.commune, &b.station, b.date))
    });

    let mut terms = Vec::with_capacity(aggregates.len());
    let mut recent: VecDeque<bool> = VecDeque::with_capacity(window + 1);
    let mut partition: Option<(String, String)> = None;

    for aggregate in aggregates {
        let same_partition = partition
            .as_ref()
            .is_some_and(|(c, s)| *c == aggregate.commune && *s == aggregate.station);
        if !same_partition {
            recent.clear();
            partition = Some((aggregate.commune.clone(), aggregate.station.clone()));
        }

        recent.push_back(aggregate.exceeds_threshold);
        if recent.len() > window {
            recent.pop_front();
        }

        let rolling_count =
            (window > 0 && recent.len() == window).then(|| recent.iter().filter(|e| **e).count());
        terms.push(RollingTerm {
            aggregate,
            rolling_count,
        });
    }

    terms
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::Pollutant;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    fn m(commune: &str, station: &str, value: f64, d: u32) -> Measurement {
        Measurement::new(Pollutant::No2, commune, station, value, day(d))
    }

    fn agg(commune: &str, station: &str, d: u32, mean_value: f64) -> DailyAggregate {
        DailyAggregate {
            commune: commune.to_string(),
            station: station.to_string(),
            date: day(d),
            mean_value,
            exceeds_threshold: mean_value > 200.0,
        }
    }

    #[test]
    fn test_sub_daily_readings_are_averaged() {
        let rows = vec![
            m("Nantes", "A", 190.0, 1),
            m("Nantes", "A", 230.0, 1),
            m("Nantes", "A", 150.0, 2),
        ];

        let daily = daily_aggregates(&rows, 200.0);

        assert_eq!(daily.len(), 2);
        assert_eq!(daily[0].mean_value, 210.0);
        assert!(daily[0].exceeds_threshold);
        assert_eq!(daily[1].mean_value, 150.0);
        assert!(!daily[1].exceeds_threshold);
    }

    #[test]
    fn test_threshold_is_strict() {
        let daily = daily_aggregates(&[m("Nantes", "A", 200.0, 1)], 200.0);
        assert!(!daily[0].exceeds_threshold);
    }

    #[test]
    fn test_groups_are_ordered_and_separated() {
        let rows = vec![
            m("Nantes", "B", 10.0, 2),
            m("Angers", "A", 10.0, 3),
            m("Nantes", "A", 10.0, 1),
            m("Nantes", "B", 10.0, 1),
        ];

        let daily = daily_aggregates(&rows, 200.0);
        let keys: Vec<(&str, &str, NaiveDate)> = daily
            .iter()
            .map(|d| (d.commune.as_str(), d.station.as_str(), d.date))
            .collect();

        assert_eq!(
            keys,
            vec![
                ("Angers", "A", day(3)),
                ("Nantes", "A", day(1)),
                ("Nantes", "B", day(1)),
                ("Nantes", "B", day(2)),
            ]
        );
    }

    #[test]
    fn test_window_needs_full_terms() {
        let terms = rolling_terms(vec![agg("Nantes", "A", 1, 250.0), agg("Nantes", "A", 2, 250.0)], 3);

        assert!(terms.iter().all(|t| t.rolling_count.is_none()));
    }

    #[test]
    fn test_window_counts_recent_exceedances() {
        let terms = rolling_terms(
            vec![
                agg("Nantes", "A", 1, 210.0),
                agg("Nantes", "A", 2, 210.0),
                agg("Nantes", "A", 3, 210.0),
                agg("Nantes", "A", 4, 190.0),
            ],
            3,
        );

        let counts: Vec<Option<usize>> = terms.iter().map(|t| t.rolling_count).collect();
        assert_eq!(counts, vec![None, None, Some(3), Some(2)]);
    }

    #[test]
    fn test_window_rolls_over_missing_day() {
        // 2024-05-03 has no aggregate; days 2 and 4 are adjacent terms.
        let terms = rolling_terms(
            vec![
                agg("Nantes", "A", 1, 250.0),
                agg("Nantes", "A", 2, 250.0),
                agg("Nantes", "A", 4, 250.0),
            ],
            3,
        );

        assert_eq!(terms[2].aggregate.date, day(4));
        assert_eq!(terms[2].rolling_count, Some(3));
    }

    #[test]
    fn test_window_resets_between_partitions() {
        let terms = rolling_terms(
            vec![
                agg("Nantes", "A", 1, 250.0),
                agg("Nantes", "A", 2, 250.0),
                agg("Nantes", "B", 3, 250.0),
                agg("Nantes", "B", 4, 250.0),
            ],
            3,
        );

        assert!(terms.iter().all(|t| t.rolling_count.is_none()));
    }

    #[test]
    fn test_unsorted_input_is_ordered_by_date() {
        let terms = rolling_terms(
            vec![
                agg("Nantes", "A", 3, 250.0),
                agg("Nantes", "A", 1, 250.0),
                agg("Nantes", "A", 2, 100.0),
            ],
            2,
        );

        let dates: Vec<NaiveDate> = terms.iter().map(|t| t.aggregate.date).collect();
        assert_eq!(dates, vec![day(1), day(2), day(3)]);
        assert_eq!(terms[2].rolling_count, Some(1));
    }
}
