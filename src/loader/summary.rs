//! Per-table data summary: row counts, value statistics, missing values.

use crate::models::Observation;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Descriptive summary of one loaded table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSummary {
    pub name: String,
    /// Rows parsed into observations (before duplicate resolution).
    pub rows: usize,
    /// Rows dropped for lacking an area or a year.
    pub skipped_rows: usize,
    /// Rows merged away by the duplicate policy.
    pub duplicates: usize,
    /// Distinct area names.
    pub areas: usize,
    pub first_year: Option<i32>,
    pub last_year: Option<i32>,
    /// Observations whose value is missing (NaN).
    pub missing_values: usize,
    pub mean: Option<f64>,
    /// Sample standard deviation.
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl TableSummary {
    pub fn from_observations(
        name: &str,
        rows: &[Observation],
        skipped_rows: usize,
        duplicates: usize,
    ) -> Self {
        let areas: HashSet<&str> = rows.iter().map(|o| o.area.as_str()).collect();
        let values: Vec<f64> = rows
            .iter()
            .map(|o| o.value)
            .filter(|v| !v.is_nan())
            .collect();

        let n = values.len();
        let mean = (n > 0).then(|| values.iter().sum::<f64>() / n as f64);
        let std = match mean {
            Some(m) if n > 1 => {
                let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
                Some((ss / (n - 1) as f64).sqrt())
            }
            _ => None,
        };

        Self {
            name: name.to_string(),
            rows: rows.len(),
            skipped_rows,
            duplicates,
            areas: areas.len(),
            first_year: rows.iter().map(|o| o.year).min(),
            last_year: rows.iter().map(|o| o.year).max(),
            missing_values: rows.len() - n,
            mean,
            std,
            min: values.iter().copied().reduce(f64::min),
            max: values.iter().copied().reduce(f64::max),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_statistics() {
        let rows = vec![
            Observation::new("A", 2019, 70.0),
            Observation::new("A", 2020, 72.0),
            Observation::new("B", 2021, 74.0),
            Observation::new("B", 2022, f64::NAN),
        ];

        let summary = TableSummary::from_observations("t", &rows, 3, 1);
        assert_eq!(summary.rows, 4);
        assert_eq!(summary.skipped_rows, 3);
        assert_eq!(summary.duplicates, 1);
        assert_eq!(summary.areas, 2);
        assert_eq!(summary.first_year, Some(2019));
        assert_eq!(summary.last_year, Some(2022));
        assert_eq!(summary.missing_values, 1);
        assert_eq!(summary.mean, Some(72.0));
        assert_eq!(summary.std, Some(2.0));
        assert_eq!(summary.min, Some(70.0));
        assert_eq!(summary.max, Some(74.0));
    }

    #[test]
    fn test_empty_summary() {
        let summary = TableSummary::from_observations("empty", &[], 0, 0);
        assert_eq!(summary.rows, 0);
        assert_eq!(summary.mean, None);
        assert_eq!(summary.std, None);
        assert_eq!(summary.first_year, None);
    }
}
