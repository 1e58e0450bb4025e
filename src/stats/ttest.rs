//! Welch two-sample t-tests between male and female life expectancy.

use super::{mean, sample_variance, Period};
use crate::models::{FlatRecord, Gender};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, StudentsT};

/// Outcome of a two-sample test. Undefined parts are `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TTestResult {
    pub statistic: Option<f64>,
    pub p_value: Option<f64>,
    /// Welch-Satterthwaite degrees of freedom.
    pub df: Option<f64>,
    pub n1: usize,
    pub n2: usize,
}

/// Male vs female test for one area across all years.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaTTest {
    pub area: String,
    pub result: TTestResult,
}

/// Male vs female test over every area within a period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodTTest {
    pub period: Period,
    pub result: TTestResult,
}

/// Welch's unequal-variance t-test (two-sided). NaN samples are dropped.
pub fn welch_t_test(a: &[f64], b: &[f64]) -> TTestResult {
    let a: Vec<f64> = a.iter().copied().filter(|v| !v.is_nan()).collect();
    let b: Vec<f64> = b.iter().copied().filter(|v| !v.is_nan()).collect();
    let (n1, n2) = (a.len(), b.len());

    let undefined = TTestResult {
        statistic: None,
        p_value: None,
        df: None,
        n1,
        n2,
    };

    let (Some(m1), Some(m2), Some(v1), Some(v2)) =
        (mean(&a), mean(&b), sample_variance(&a), sample_variance(&b))
    else {
        return undefined;
    };

    let q1 = v1 / n1 as f64;
    let q2 = v2 / n2 as f64;
    let se2 = q1 + q2;
    if se2 <= 0.0 {
        return undefined;
    }

    let t = (m1 - m2) / se2.sqrt();
    let df = se2 * se2 / (q1 * q1 / (n1 - 1) as f64 + q2 * q2 / (n2 - 1) as f64);

    let p_value = StudentsT::new(0.0, 1.0, df)
        .ok()
        .map(|dist| (2.0 * dist.sf(t.abs())).min(1.0));

    TTestResult {
        statistic: Some(t),
        p_value,
        df: Some(df),
        n1,
        n2,
    }
}

/// Male and female values, in record order.
fn split_by_gender<'a, I>(records: I) -> (Vec<f64>, Vec<f64>)
where
    I: IntoIterator<Item = &'a FlatRecord>,
{
    let mut male = Vec::new();
    let mut female = Vec::new();
    for record in records {
        match record.gender {
            Gender::Male => male.push(record.life_expectancy),
            Gender::Female => female.push(record.life_expectancy),
            Gender::Both => {}
        }
    }
    (male, female)
}

/// One male vs female test per area, in first-seen area order.
pub fn ttest_by_area(records: &[FlatRecord]) -> Vec<AreaTTest> {
    let mut areas: Vec<&str> = Vec::new();
    for record in records {
        if !areas.contains(&record.area.as_str()) {
            areas.push(&record.area);
        }
    }

    areas
        .into_iter()
        .map(|area| {
            let (male, female) = split_by_gender(records.iter().filter(|r| r.area == area));
            AreaTTest {
                area: area.to_string(),
                result: welch_t_test(&male, &female),
            }
        })
        .collect()
}

/// Male vs female test over all areas for the years in `period`.
pub fn ttest_by_period(records: &[FlatRecord], period: &Period) -> PeriodTTest {
    let (male, female) = split_by_gender(records.iter().filter(|r| period.contains(r.year)));

    PeriodTTest {
        period: period.clone(),
        result: welch_t_test(&male, &female),
    }
}
