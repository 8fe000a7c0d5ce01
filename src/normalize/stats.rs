use serde::Serialize;
use tracing::info;

/// Row accounting for one normalization pass.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct NormalizeStats {
    pub dataset: String,
    pub records: usize,
    pub kept: usize,

    // dropped rows
    pub dropped_missing: usize,
    pub dropped_out_of_range: usize,
}

impl NormalizeStats {
    pub fn new(dataset: &str) -> Self {
        NormalizeStats {
            dataset: dataset.to_string(),
            ..Default::default()
        }
    }

    pub fn pct(part: usize, total: usize) -> f64 {
        if total == 0 {
            0.0
        } else {
            (part as f64 / total as f64) * 100.0
        }
    }

    pub fn kept_pct(&self) -> f64 {
        Self::pct(self.kept, self.records)
    }

    pub fn dropped(&self) -> usize {
        self.dropped_missing + self.dropped_out_of_range
    }

    pub fn log_summary(&self) {
        info!(
            dataset = %self.dataset,
            records = self.records,
            kept = self.kept,
            dropped = self.dropped(),
            dropped_missing = self.dropped_missing,
            dropped_out_of_range = self.dropped_out_of_range,
            "Normalization complete: {:.1}% of records kept",
            self.kept_pct()
        );
    }
}
