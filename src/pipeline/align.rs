//! Reconciliation of the life expectancy and population maps.
//!
//! The two maps come from independent tables. Any (area, gender, year)
//! present in one but not the other is reported here instead of being
//! dropped silently by the combiner.

use crate::error::PipelineError;
use crate::models::{AreaGenderYearMap, ObservationKey};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// What to do with keys present in only one of the maps.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum AlignmentPolicy {
    /// Log and list mismatches, keep going (default)
    #[default]
    Report,
    /// Abort the run on any mismatch
    Strict,
}

/// Keys found in only one of the two maps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlignmentReport {
    /// Life expectancy present, population absent. These areas carry no weight.
    pub missing_population: Vec<ObservationKey>,
    /// Population present, life expectancy absent.
    pub missing_life_expectancy: Vec<ObservationKey>,
}

impl AlignmentReport {
    pub fn is_aligned(&self) -> bool {
        self.missing_population.is_empty() && self.missing_life_expectancy.is_empty()
    }

    /// Total number of mismatched keys.
    pub fn len(&self) -> usize {
        self.missing_population.len() + self.missing_life_expectancy.len()
    }
}

/// Compare the key sets of the two maps.
pub fn reconcile(life: &AreaGenderYearMap, population: &AreaGenderYearMap) -> AlignmentReport {
    let missing_population = life
        .iter()
        .filter(|(k, _)| population.get(&k.area, k.gender, k.year).is_none())
        .map(|(k, _)| k.clone())
        .collect();

    let missing_life_expectancy = population
        .iter()
        .filter(|(k, _)| life.get(&k.area, k.gender, k.year).is_none())
        .map(|(k, _)| k.clone())
        .collect();

    AlignmentReport {
        missing_population,
        missing_life_expectancy,
    }
}

/// Log every mismatch and fail under the strict policy.
pub fn enforce(report: &AlignmentReport, policy: AlignmentPolicy) -> Result<(), PipelineError> {
    for key in &report.missing_population {
        warn!("Life expectancy without population: {}", key);
    }
    for key in &report.missing_life_expectancy {
        warn!("Population without life expectancy: {}", key);
    }

    match policy {
        AlignmentPolicy::Strict if !report.is_aligned() => Err(PipelineError::Misaligned {
            count: report.len(),
        }),
        _ => Ok(()),
    }
}
