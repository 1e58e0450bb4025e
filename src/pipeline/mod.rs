//! Reshaping and weighted aggregation pipeline.
//!
//! Tables flow through extraction and aggregation into two sparse maps
//! (life expectancy and population). The maps are reconciled, combined
//! into the weighted global series, and flattened into records for the
//! statistics and the renderers.

pub mod aggregate;
pub mod align;
pub mod combine;
pub mod extract;
pub mod flatten;

pub use aggregate::aggregate;
pub use align::{enforce, reconcile, AlignmentPolicy, AlignmentReport};
pub use combine::{combine, combine_filtered};
pub use flatten::{filter_by_gender, flatten, regroup};

use crate::error::PipelineError;
use crate::models::{AreaRegistry, FlatRecord, GenderTables, GlobalSeries, Source, YearRange};
use tracing::info;

/// Knobs that change how the pipeline treats its inputs.
#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineOptions {
    pub years: YearRange,
    pub alignment: AlignmentPolicy,
    /// Leave aggregate areas out of the weighted global mean.
    pub exclude_aggregates: bool,
}

/// Everything derived from the source tables.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub global: GlobalSeries,
    /// Flat life expectancy records, unfiltered.
    pub records: Vec<FlatRecord>,
    pub alignment: AlignmentReport,
}

/// Run the full pipeline over both sources.
pub fn run(
    life_tables: &GenderTables,
    population_tables: &GenderTables,
    registry: &AreaRegistry,
    options: PipelineOptions,
) -> Result<PipelineOutput, PipelineError> {
    let life = aggregate(Source::LifeExpectancy, life_tables, registry, options.years);
    let population = aggregate(Source::Population, population_tables, registry, options.years);
    for map in [&life, &population] {
        info!(
            "Aggregated {} {} observations across {} areas",
            map.len(),
            map.source(),
            registry.len()
        );
    }

    let alignment = reconcile(&life, &population);
    enforce(&alignment, options.alignment)?;

    let global = if options.exclude_aggregates {
        combine_filtered(&life, &population, options.years, |area| {
            registry.get(area).map_or(true, |a| !a.aggregate)
        })
    } else {
        combine(&life, &population, options.years)
    };

    let records = flatten(&life);

    Ok(PipelineOutput {
        global,
        records,
        alignment,
    })
}
