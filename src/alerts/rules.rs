//! Alert strategies.
//!
//! The two rules are deliberately not unified: NO2 is judged on sustained
//! daily means, PM10 on individual readings. Which rule applies to which
//! pollutant is a configuration choice.

use super::daily::{daily_aggregates, rolling_terms};
use super::types::Alert;
use crate::normalize::Measurement;

/// Turns a normalized measurement table into alert rows.
pub trait AlertRule {
    fn name(&self) -> String;
    fn evaluate(&self, measurements: &[Measurement]) -> Vec<Alert>;
}

/// Alerts when the last `window` daily means of a station all exceed `threshold`.
#[derive(Debug, Clone, PartialEq)]
pub struct RollingDailyMeanRule {
    pub threshold: f64,
    pub window: usize,
}

impl AlertRule for RollingDailyMeanRule {
    fn name(&self) -> String {
        format!("daily mean > {} on {} consecutive terms", self.threshold, self.window)
    }

    fn evaluate(&self, measurements: &[Measurement]) -> Vec<Alert> {
        let daily = daily_aggregates(measurements, self.threshold);

        rolling_terms(daily, self.window)
            .into_iter()
            .filter(|t| t.rolling_count == Some(self.window))
            .map(|t| Alert {
                commune: t.aggregate.commune,
                station: t.aggregate.station,
                date_local: t.aggregate.date,
                value: t.aggregate.mean_value,
                threshold: self.threshold,
                exceeding_terms: self.window,
            })
            .collect()
    }
}

/// Alerts on every reading strictly above `threshold`; no aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct SingleReadingRule {
    pub threshold: f64,
}

impl AlertRule for SingleReadingRule {
    fn name(&self) -> String {
        format!("reading > {}", self.threshold)
    }

    fn evaluate(&self, measurements: &[Measurement]) -> Vec<Alert> {
        measurements
            .iter()
            .filter(|m| m.value > self.threshold)
            .map(|m| Alert {
                commune: m.commune.clone(),
                station: m.station.clone(),
                date_local: m.date_local,
                value: m.value,
                threshold: self.threshold,
                exceeding_terms: 1,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::Pollutant;
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    fn no2(station: &str, value: f64, d: u32) -> Measurement {
        Measurement::new(Pollutant::No2, "Nantes", station, value, day(d))
    }

    fn pm10(value: f64, d: u32) -> Measurement {
        Measurement::new(Pollutant::Pm10, "Angers", "Appentis", value, day(d))
    }

    fn no2_rule() -> RollingDailyMeanRule {
        RollingDailyMeanRule {
            threshold: 200.0,
            window: 3,
        }
    }

    #[test]
    fn test_three_high_days_then_a_low_one() {
        let rows = vec![
            no2("A", 210.0, 1),
            no2("A", 210.0, 2),
            no2("A", 210.0, 3),
            no2("A", 190.0, 4),
        ];

        let alerts = no2_rule().evaluate(&rows);

        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].date_local, day(3));
        assert_eq!(alerts[0].value, 210.0);
        assert_eq!(alerts[0].exceeding_terms, 3);
    }

    #[test]
    fn test_sustained_exceedance_alerts_every_full_window() {
        let rows: Vec<Measurement> = (1..=5).map(|d| no2("A", 250.0, d)).collect();

        let dates: Vec<NaiveDate> = no2_rule().evaluate(&rows).iter().map(|a| a.date_local).collect();
        assert_eq!(dates, vec![day(3), day(4), day(5)]);
    }

    #[test]
    fn test_fewer_than_window_terms_never_alert() {
        let rows = vec![no2("A", 400.0, 1), no2("A", 400.0, 2)];
        assert!(no2_rule().evaluate(&rows).is_empty());
    }

    #[test]
    fn test_rolling_over_a_gap_still_alerts() {
        let rows = vec![no2("A", 220.0, 1), no2("A", 220.0, 2), no2("A", 220.0, 9)];

        let alerts = no2_rule().evaluate(&rows);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].date_local, day(9));
    }

    #[test]
    fn test_daily_mean_decides_not_single_readings() {
        // 300 and 100 average to exactly 200 on day 2: not an exceedance.
        let rows = vec![
            no2("A", 250.0, 1),
            no2("A", 300.0, 2),
            no2("A", 100.0, 2),
            no2("A", 250.0, 3),
        ];

        assert!(no2_rule().evaluate(&rows).is_empty());
    }

    #[test]
    fn test_empty_table_yields_no_alerts() {
        assert!(no2_rule().evaluate(&[]).is_empty());
        assert!(SingleReadingRule { threshold: 80.0 }.evaluate(&[]).is_empty());
    }

    #[test]
    fn test_single_reading_threshold_is_strict() {
        let rule = SingleReadingRule { threshold: 80.0 };
        let rows = vec![pm10(80.0, 1), pm10(80.01, 1), pm10(12.0, 2), pm10(95.0, 3)];

        let alerts = rule.evaluate(&rows);

        let values: Vec<f64> = alerts.iter().map(|a| a.value).collect();
        assert_eq!(values, vec![80.01, 95.0]);
        assert_eq!(alerts.len(), rows.iter().filter(|m| m.value > 80.0).count());
    }

    #[test]
    fn test_single_reading_keeps_same_day_duplicates() {
        let rule = SingleReadingRule { threshold: 80.0 };
        let rows = vec![pm10(90.0, 1), pm10(91.0, 1)];

        assert_eq!(rule.evaluate(&rows).len(), 2);
    }
}
