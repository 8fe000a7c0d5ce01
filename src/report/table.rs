//! Untyped view of a clean CSV table, as laid out in the report.

use anyhow::{Context, Result};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn read_csv(path: &Path) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path)
            .with_context(|| format!("failed to open {}", path.display()))?;

        let headers = reader.headers()?.iter().map(String::from).collect();
        let mut rows = Vec::new();
        for record in reader.records() {
            rows.push(record?.iter().map(String::from).collect());
        }

        Ok(Table { headers, rows })
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// First `n` rows (all of them if the table is shorter).
    pub fn head(&self, n: usize) -> &[Vec<String>] {
        &self.rows[..self.rows.len().min(n)]
    }

    /// Mean of numeric `y` per distinct `x`, ordered by `x`.
    ///
    /// `None` when either column is absent. Non-numeric `y` cells are ignored.
    pub fn mean_by(&self, x: &str, y: &str) -> Option<Vec<(String, f64)>> {
        let xi = self.column_index(x)?;
        let yi = self.column_index(y)?;

        let mut groups: BTreeMap<&str, (f64, usize)> = BTreeMap::new();
        for row in &self.rows {
            let (Some(key), Some(value)) = (row.get(xi), row.get(yi)) else {
                continue;
            };
            let Ok(value) = value.trim().parse::<f64>() else {
                continue;
            };
            let entry = groups.entry(key.as_str()).or_insert((0.0, 0));
            entry.0 += value;
            entry.1 += 1;
        }

        Some(
            groups
                .into_iter()
                .map(|(key, (sum, n))| (key.to_string(), sum / n as f64))
                .collect(),
        )
    }

    /// The `top` most frequent values of `column`, ties in first-seen order.
    ///
    /// `None` when the column is absent.
    pub fn value_counts(&self, column: &str, top: usize) -> Option<Vec<(String, usize)>> {
        let ci = self.column_index(column)?;

        let mut order: Vec<&str> = Vec::new();
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for row in &self.rows {
            let Some(value) = row.get(ci) else { continue };
            if value.is_empty() {
                continue;
            }
            let count = counts.entry(value.as_str()).or_insert(0);
            if *count == 0 {
                order.push(value.as_str());
            }
            *count += 1;
        }

        let mut ranked: Vec<(String, usize)> = order
            .into_iter()
            .map(|value| (value.to_string(), counts[value]))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked.truncate(top);
        Some(ranked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(headers: &[&str], rows: &[&[&str]]) -> Table {
        Table {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: rows
                .iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        }
    }

    #[test]
    fn test_head_is_bounded() {
        let t = table(&["a"], &[&["1"], &["2"], &["3"]]);
        assert_eq!(t.head(2).len(), 2);
        assert_eq!(t.head(100).len(), 3);
    }

    #[test]
    fn test_mean_by_groups_and_sorts() {
        let t = table(
            &["date_local", "no2_value"],
            &[
                &["2024-05-02", "10"],
                &["2024-05-01", "20"],
                &["2024-05-02", "30"],
                &["2024-05-01", "x"],
            ],
        );

        let series = t.mean_by("date_local", "no2_value").unwrap();
        assert_eq!(
            series,
            vec![("2024-05-01".to_string(), 20.0), ("2024-05-02".to_string(), 20.0)]
        );
    }

    #[test]
    fn test_mean_by_missing_column() {
        let t = table(&["date_local"], &[&["2024-05-01"]]);
        assert_eq!(t.mean_by("date_local", "no2_value"), None);
    }

    #[test]
    fn test_value_counts_ranks_with_stable_ties() {
        let t = table(
            &["activite_principale"],
            &[&["47.11F"], &["56.10A"], &["56.10A"], &["43.21A"], &["47.11F"], &[""]],
        );

        let counts = t.value_counts("activite_principale", 2).unwrap();
        assert_eq!(
            counts,
            vec![("47.11F".to_string(), 2), ("56.10A".to_string(), 2)]
        );
    }
}
