//! Aggregation of gender-partitioned tables into one area/gender/year map.

use super::extract::extract;
use crate::models::{
    AreaGenderYearMap, AreaRegistry, GenderTables, ObservationKey, Source, YearRange,
};
use tracing::debug;

/// Build the sparse map for one source across every registry area and gender.
///
/// Every registry area is a member of the result, including areas with no
/// rows at all. Rows naming areas outside the registry are never looked at.
pub fn aggregate(
    source: Source,
    tables: &GenderTables,
    registry: &AreaRegistry,
    years: YearRange,
) -> AreaGenderYearMap {
    let mut map = AreaGenderYearMap::new(source, registry.names());

    for area in registry.iter() {
        for (gender, table) in tables.iter() {
            let values = extract(table, &area.name, years);
            if values.is_empty() {
                debug!("No {} data for {} ({})", source, area.name, gender);
            }
            for (year, value) in values {
                map.insert(ObservationKey::new(&area.name, gender, year), value);
            }
        }
    }

    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Area, Gender, Observation, ObservationTable};

    fn registry() -> AreaRegistry {
        AreaRegistry::new(vec![
            Area::new("A", 0.0, 0.0),
            Area::new("B", 10.0, 10.0),
            Area::new("Empty", 20.0, 20.0),
        ])
        .unwrap()
    }

    fn tables() -> GenderTables {
        GenderTables {
            both: ObservationTable::new(
                "both",
                vec![
                    Observation::new("A", 2019, 70.0),
                    Observation::new("B", 2020, 80.0),
                    Observation::new("Unknown", 2020, 50.0),
                ],
            ),
            male: ObservationTable::new("male", vec![Observation::new("A", 2019, 68.0)]),
            female: ObservationTable::new("female", vec![]),
        }
    }

    #[test]
    fn test_every_area_is_a_member() {
        let map = aggregate(Source::LifeExpectancy, &tables(), &registry(), YearRange::default());
        for area in registry().iter() {
            assert!(map.contains_area(&area.name));
            for gender in Gender::ALL {
                // Lookup always succeeds; empty when the source had nothing.
                let _ = map.year_map(&area.name, gender);
            }
        }
        assert_eq!(map.areas().len(), 3);
    }

    #[test]
    fn test_area_without_rows_is_empty() {
        let map = aggregate(Source::LifeExpectancy, &tables(), &registry(), YearRange::default());
        for gender in Gender::ALL {
            assert!(map.year_map("Empty", gender).is_empty());
        }
        assert!(map.year_map("B", Gender::Female).is_empty());
    }

    #[test]
    fn test_values_land_in_place() {
        let map = aggregate(Source::Population, &tables(), &registry(), YearRange::default());
        assert_eq!(map.source(), Source::Population);
        assert_eq!(map.get("A", Gender::Both, 2019), Some(70.0));
        assert_eq!(map.get("A", Gender::Male, 2019), Some(68.0));
        assert_eq!(map.get("B", Gender::Both, 2020), Some(80.0));
        assert_eq!(map.len(), 3);
    }

    #[test]
    fn test_unknown_area_ignored() {
        let map = aggregate(Source::LifeExpectancy, &tables(), &registry(), YearRange::default());
        assert!(!map.contains_area("Unknown"));
        assert!(map.iter().all(|(k, _)| k.area != "Unknown"));
    }
}
