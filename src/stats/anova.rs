//! One-way analysis of variance over life expectancy groups.

use crate::models::FlatRecord;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, FisherSnedecor};
use std::collections::BTreeMap;

/// Outcome of a one-way ANOVA. Undefined parts are `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnovaResult {
    pub f_statistic: Option<f64>,
    pub p_value: Option<f64>,
    /// Non-empty groups that took part.
    pub groups: usize,
    pub observations: usize,
}

/// One-way ANOVA across `groups`. NaN values and empty groups are dropped.
pub fn one_way_anova(groups: &[Vec<f64>]) -> AnovaResult {
    let groups: Vec<Vec<f64>> = groups
        .iter()
        .map(|g| g.iter().copied().filter(|v| !v.is_nan()).collect::<Vec<_>>())
        .filter(|g| !g.is_empty())
        .collect();

    let k = groups.len();
    let n: usize = groups.iter().map(Vec::len).sum();
    let undefined = AnovaResult {
        f_statistic: None,
        p_value: None,
        groups: k,
        observations: n,
    };

    if k < 2 || n <= k {
        return undefined;
    }

    let grand_mean = groups.iter().flatten().sum::<f64>() / n as f64;
    let mut ss_between = 0.0;
    let mut ss_within = 0.0;
    for group in &groups {
        let m = group.iter().sum::<f64>() / group.len() as f64;
        ss_between += group.len() as f64 * (m - grand_mean).powi(2);
        ss_within += group.iter().map(|v| (v - m).powi(2)).sum::<f64>();
    }

    if ss_within <= 0.0 {
        return undefined;
    }

    let df_between = (k - 1) as f64;
    let df_within = (n - k) as f64;
    let f = (ss_between / df_between) / (ss_within / df_within);

    let p_value = FisherSnedecor::new(df_between, df_within)
        .ok()
        .map(|dist| dist.sf(f));

    AnovaResult {
        f_statistic: Some(f),
        p_value,
        groups: k,
        observations: n,
    }
}

/// ANOVA with one group per area, in first-seen order.
pub fn anova_by_area(records: &[FlatRecord]) -> AnovaResult {
    let mut order: Vec<&str> = Vec::new();
    let mut groups: Vec<Vec<f64>> = Vec::new();
    for record in records {
        let idx = match order.iter().position(|a| *a == record.area) {
            Some(idx) => idx,
            None => {
                order.push(&record.area);
                groups.push(Vec::new());
                order.len() - 1
            }
        };
        groups[idx].push(record.life_expectancy);
    }
    one_way_anova(&groups)
}

/// ANOVA with one group per year.
pub fn anova_by_year(records: &[FlatRecord]) -> AnovaResult {
    let mut groups: BTreeMap<i32, Vec<f64>> = BTreeMap::new();
    for record in records {
        groups
            .entry(record.year)
            .or_default()
            .push(record.life_expectancy);
    }
    one_way_anova(&groups.into_values().collect::<Vec<_>>())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Gender;

    #[test]
    fn test_anova_reference_values() {
        let result = one_way_anova(&[
            vec![1.0, 2.0, 3.0],
            vec![4.0, 5.0, 6.0],
            vec![7.0, 8.0, 9.0],
        ]);
        assert!((result.f_statistic.unwrap() - 27.0).abs() < 1e-9);
        assert!((result.p_value.unwrap() - 0.001).abs() < 1e-6);
        assert_eq!(result.groups, 3);
        assert_eq!(result.observations, 9);
    }

    #[test]
    fn test_anova_undefined_cases() {
        assert_eq!(one_way_anova(&[vec![1.0, 2.0]]).p_value, None);
        assert_eq!(one_way_anova(&[vec![1.0], vec![2.0]]).p_value, None);
        assert_eq!(
            one_way_anova(&[vec![1.0, 1.0], vec![2.0, 2.0]]).f_statistic,
            None
        );
    }

    #[test]
    fn test_anova_drops_empty_and_nan() {
        let result = one_way_anova(&[
            vec![1.0, 2.0, 3.0, f64::NAN],
            vec![],
            vec![4.0, 5.0, 6.0],
            vec![7.0, 8.0, 9.0],
        ]);
        assert_eq!(result.groups, 3);
        assert!((result.f_statistic.unwrap() - 27.0).abs() < 1e-9);
    }

    #[test]
    fn test_grouping() {
        let mut records = Vec::new();
        for (area, base) in [("A", 60.0), ("B", 70.0), ("C", 80.0)] {
            for (i, year) in (2019..=2021).enumerate() {
                records.push(FlatRecord {
                    area: area.to_string(),
                    year,
                    gender: Gender::Both,
                    life_expectancy: base + i as f64,
                });
            }
        }

        let by_area = anova_by_area(&records);
        assert_eq!(by_area.groups, 3);
        assert!(by_area.p_value.unwrap() < 0.001);

        let by_year = anova_by_year(&records);
        assert_eq!(by_year.groups, 3);
        assert!(by_year.p_value.unwrap() > 0.5);
    }
}
