//! Per-area extraction from a single observation table.

use crate::models::{ObservationTable, YearRange};
use std::collections::BTreeMap;

/// Year -> value for one area, restricted to `years`.
///
/// Years without a matching row are absent from the result. When several
/// rows match, the first one in table order wins. An unknown area simply
/// yields an empty map.
pub fn extract(table: &ObservationTable, area: &str, years: YearRange) -> BTreeMap<i32, f64> {
    years
        .iter()
        .filter_map(|year| table.first_match(area, year).map(|obs| (year, obs.value)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Observation;

    fn table() -> ObservationTable {
        ObservationTable::new(
            "life_both",
            vec![
                Observation::new("A", 2018, 69.0),
                Observation::new("A", 2019, 70.0),
                Observation::new("A", 2021, 71.0),
                Observation::new("A", 2025, 72.0),
                Observation::new("B", 2019, 80.0),
                Observation::new("A", 2019, 99.0),
            ],
        )
    }

    #[test]
    fn test_extract_skips_absent_years() {
        let values = extract(&table(), "A", YearRange::default());
        assert_eq!(values.len(), 2);
        assert_eq!(values.get(&2019), Some(&70.0));
        assert_eq!(values.get(&2021), Some(&71.0));
        assert!(!values.contains_key(&2020));
    }

    #[test]
    fn test_extract_never_leaves_range() {
        let values = extract(&table(), "A", YearRange::default());
        assert!(values.keys().all(|y| (2019..=2024).contains(y)));
        assert!(!values.contains_key(&2018));
        assert!(!values.contains_key(&2025));
    }

    #[test]
    fn test_extract_first_match_wins() {
        let values = extract(&table(), "A", YearRange::default());
        assert_eq!(values[&2019], 70.0);
    }

    #[test]
    fn test_extract_unknown_area() {
        assert!(extract(&table(), "Nowhere", YearRange::default()).is_empty());
    }

    #[test]
    fn test_extract_custom_range() {
        let years = YearRange::new(2018, 2019).unwrap();
        let values = extract(&table(), "A", years);
        assert_eq!(values.keys().copied().collect::<Vec<_>>(), vec![2018, 2019]);
    }
}
