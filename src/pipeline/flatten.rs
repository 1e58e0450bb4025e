//! Conversion between the sparse map and flat records.

use crate::models::{AreaGenderYearMap, FlatRecord, Gender, ObservationKey, Source};

/// One record per present (area, gender, year) entry.
///
/// Rows follow the map's area order, then gender order, then year.
pub fn flatten(map: &AreaGenderYearMap) -> Vec<FlatRecord> {
    let mut records = Vec::with_capacity(map.len());

    for area in map.areas() {
        for gender in Gender::ALL {
            for (year, value) in map.year_map(area, gender) {
                records.push(FlatRecord {
                    area: area.clone(),
                    year,
                    gender,
                    life_expectancy: value,
                });
            }
        }
    }

    records
}

/// Rebuild a map from flat records. Inverse of [`flatten`].
pub fn regroup(source: Source, records: &[FlatRecord], areas: Vec<String>) -> AreaGenderYearMap {
    let mut map = AreaGenderYearMap::new(source, areas);
    for record in records {
        map.insert(
            ObservationKey::new(&record.area, record.gender, record.year),
            record.life_expectancy,
        );
    }
    map
}

/// Records visible under a gender filter.
///
/// `Both` keeps every partition. `Male` or `Female` keep only that one.
pub fn filter_by_gender(records: &[FlatRecord], gender: Gender) -> Vec<FlatRecord> {
    match gender {
        Gender::Both => records.to_vec(),
        other => records
            .iter()
            .filter(|r| r.gender == other)
            .cloned()
            .collect(),
    }
}
