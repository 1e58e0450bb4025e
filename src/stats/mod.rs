//! Significance tests over flat life expectancy records.
//!
//! Welch t-tests compare male and female values, per area and per period.
//! One-way ANOVA checks whether areas or years differ overall.

pub mod anova;
pub mod ttest;

pub use anova::{anova_by_area, anova_by_year, AnovaResult};
pub use ttest::{ttest_by_area, ttest_by_period, AreaTTest, PeriodTTest, TTestResult};

use crate::models::FlatRecord;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A named, inclusive span of years.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Period {
    pub name: String,
    pub start: i32,
    pub end: i32,
}

impl Period {
    pub fn new(name: &str, start: i32, end: i32) -> Self {
        Self {
            name: name.to_string(),
            start,
            end,
        }
    }

    pub fn contains(&self, year: i32) -> bool {
        year >= self.start && year <= self.end
    }
}

pub(crate) fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Variance with Bessel's correction. `None` below two values.
pub(crate) fn sample_variance(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    Some(ss / (values.len() - 1) as f64)
}

/// All test results for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsSummary {
    pub alpha: f64,
    /// Sorted by ascending p-value, undefined results last.
    pub area_tests: Vec<AreaTTest>,
    pub period_tests: Vec<PeriodTTest>,
    pub anova_by_area: AnovaResult,
    pub anova_by_year: AnovaResult,
}

impl StatsSummary {
    pub fn compute(records: &[FlatRecord], periods: &[Period], alpha: f64) -> Self {
        let mut area_tests = ttest_by_area(records);
        area_tests.sort_by(|a, b| compare_p(a.result.p_value, b.result.p_value));

        let period_tests = periods
            .iter()
            .map(|period| ttest_by_period(records, period))
            .collect();

        Self {
            alpha,
            area_tests,
            period_tests,
            anova_by_area: anova_by_area(records),
            anova_by_year: anova_by_year(records),
        }
    }

    pub fn is_significant(&self, p_value: Option<f64>) -> bool {
        p_value.map_or(false, |p| p < self.alpha)
    }

    /// Areas whose male/female difference is significant.
    pub fn significant_areas(&self) -> Vec<&str> {
        self.area_tests
            .iter()
            .filter(|t| self.is_significant(t.result.p_value))
            .map(|t| t.area.as_str())
            .collect()
    }
}

fn compare_p(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
