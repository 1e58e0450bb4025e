//! Population-weighted global life expectancy.

use crate::models::{AreaGenderYearMap, Gender, GlobalPoint, GlobalSeries, YearRange};
use tracing::debug;

/// Weighted global series over every area of the life expectancy map.
pub fn combine(
    life: &AreaGenderYearMap,
    population: &AreaGenderYearMap,
    years: YearRange,
) -> GlobalSeries {
    combine_filtered(life, population, years, |_| true)
}

/// Weighted global series over the areas accepted by `include`.
///
/// For each (gender, year) an area contributes when its life expectancy map
/// has that year. Its weight is the population for the same (gender, year);
/// an area without one is left out of both sums. A NaN population counts as
/// zero. A NaN life expectancy zeroes only its numerator term, so its
/// population still counts toward the total. No contributors, or a zero
/// total population, give `None`.
pub fn combine_filtered<F>(
    life: &AreaGenderYearMap,
    population: &AreaGenderYearMap,
    years: YearRange,
    include: F,
) -> GlobalSeries
where
    F: Fn(&str) -> bool,
{
    let mut series = GlobalSeries::new();

    for gender in Gender::ALL {
        let points = years
            .iter()
            .map(|year| combine_point(life, population, gender, year, &include))
            .collect();
        series.insert(gender, points);
    }

    series
}

fn combine_point<F>(
    life: &AreaGenderYearMap,
    population: &AreaGenderYearMap,
    gender: Gender,
    year: i32,
    include: &F,
) -> GlobalPoint
where
    F: Fn(&str) -> bool,
{
    let mut weighted_sum = 0.0;
    let mut total_population = 0.0;
    let mut life_sum = 0.0;
    let mut life_count = 0usize;
    let mut contributing = 0usize;

    for area in life.areas().iter().filter(|a| include(a.as_str())) {
        let Some(expectancy) = life.get(area, gender, year) else {
            continue;
        };
        contributing += 1;

        if !expectancy.is_nan() {
            life_sum += expectancy;
            life_count += 1;
        }

        match population.get(area, gender, year) {
            Some(pop) if !pop.is_nan() => {
                if !expectancy.is_nan() {
                    weighted_sum += expectancy * pop;
                }
                total_population += pop;
            }
            Some(_) => {}
            None => debug!(
                "No population for {} / {} / {}; left out of the weighted mean",
                area, gender, year
            ),
        }
    }

    let value = if contributing == 0 || total_population == 0.0 {
        None
    } else {
        Some(weighted_sum / total_population)
    };

    GlobalPoint {
        year,
        value,
        unweighted: (life_count > 0).then(|| life_sum / life_count as f64),
        contributing_areas: contributing,
    }
}
