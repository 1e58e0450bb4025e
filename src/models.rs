//! Data models for the life expectancy pipeline.
//!
//! This module contains the core data structures shared by the loader,
//! the pipeline stages, the significance tests and the renderers.

use crate::error::PipelineError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::ops::RangeInclusive;

/// Gender partition of a source table.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    /// Both sexes combined
    Both,
    Male,
    Female,
}

impl Gender {
    /// Every partition, in canonical order.
    pub const ALL: [Gender; 3] = [Gender::Both, Gender::Male, Gender::Female];

    /// Capitalized label used in chart legends.
    pub fn label(&self) -> &'static str {
        match self {
            Gender::Both => "Both",
            Gender::Male => "Male",
            Gender::Female => "Female",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gender::Both => write!(f, "both"),
            Gender::Male => write!(f, "male"),
            Gender::Female => write!(f, "female"),
        }
    }
}

/// Which quantity an observation table or map holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    LifeExpectancy,
    Population,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::LifeExpectancy => write!(f, "life expectancy"),
            Source::Population => write!(f, "population"),
        }
    }
}

/// A named geographic area with map coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Area {
    /// Display name, matched exactly against the source tables.
    pub name: String,
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
    /// True for synthetic aggregates such as "World" that are not regions.
    #[serde(default)]
    pub aggregate: bool,
}

impl Area {
    pub fn new(name: &str, lat: f64, lon: f64) -> Self {
        Self {
            name: name.to_string(),
            lat,
            lon,
            aggregate: false,
        }
    }

    /// Short label: the text in the last parentheses, or the whole name.
    pub fn abbreviation(&self) -> &str {
        match (self.name.rfind('('), self.name.rfind(')')) {
            (Some(open), Some(close)) if open < close => self.name[open + 1..close].trim(),
            _ => &self.name,
        }
    }
}

/// The six WHO regions plus the "World" aggregate.
pub fn default_areas() -> Vec<Area> {
    vec![
        Area::new("WHO: African region (AFRO)", 1.0, 20.0),
        Area::new("WHO: Americas (AMRO)", 15.0, -60.0),
        Area::new("WHO: Eastern Mediterranean Region (EMRO)", 24.0, 45.0),
        Area::new("WHO: European Region (EURO)", 50.0, 10.0),
        Area::new("WHO: South-East Asia region (SEARO)", 10.0, 90.0),
        Area::new("WHO: Western Pacific region (WPRO)", 25.0, 130.0),
        Area {
            aggregate: true,
            ..Area::new("World", 20.0, 0.0)
        },
    ]
}

/// Immutable, ordered set of known areas.
#[derive(Debug, Clone, PartialEq)]
pub struct AreaRegistry {
    areas: Vec<Area>,
}

impl AreaRegistry {
    /// Build a registry, rejecting empty or duplicate names.
    pub fn new(areas: Vec<Area>) -> Result<Self, PipelineError> {
        let mut seen = HashSet::new();
        for area in &areas {
            if area.name.trim().is_empty() {
                return Err(PipelineError::InvalidRegistry(
                    "area names must not be empty".to_string(),
                ));
            }
            if !seen.insert(area.name.as_str()) {
                return Err(PipelineError::InvalidRegistry(format!(
                    "area '{}' is listed twice",
                    area.name
                )));
            }
        }
        Ok(Self { areas })
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Area> {
        self.areas.iter()
    }

    pub fn get(&self, name: &str) -> Option<&Area> {
        self.areas.iter().find(|a| a.name == name)
    }

    /// Area names in registry order.
    pub fn names(&self) -> Vec<String> {
        self.areas.iter().map(|a| a.name.clone()).collect()
    }

    /// Areas that can be placed on a map (aggregates excluded).
    pub fn regions(&self) -> impl Iterator<Item = &Area> {
        self.areas.iter().filter(|a| !a.aggregate)
    }

    pub fn len(&self) -> usize {
        self.areas.len()
    }
}

impl Default for AreaRegistry {
    fn default() -> Self {
        Self {
            areas: default_areas(),
        }
    }
}

/// Inclusive range of observation years.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearRange {
    pub start: i32,
    pub end: i32,
}

impl YearRange {
    pub fn new(start: i32, end: i32) -> Result<Self, PipelineError> {
        if start > end {
            return Err(PipelineError::InvalidYearRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, year: i32) -> bool {
        (self.start..=self.end).contains(&year)
    }

    pub fn iter(&self) -> RangeInclusive<i32> {
        self.start..=self.end
    }

    pub fn len(&self) -> usize {
        (i64::from(self.end) - i64::from(self.start) + 1).max(0) as usize
    }
}

impl Default for YearRange {
    fn default() -> Self {
        Self {
            start: 2019,
            end: 2024,
        }
    }
}

impl fmt::Display for YearRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// One row of a source table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub area: String,
    pub year: i32,
    /// Life expectancy in years or a population count. NaN when the cell was empty.
    pub value: f64,
}

impl Observation {
    pub fn new(area: &str, year: i32, value: f64) -> Self {
        Self {
            area: area.to_string(),
            year,
            value,
        }
    }
}

/// A loaded source table.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObservationTable {
    pub name: String,
    pub observations: Vec<Observation>,
}

impl ObservationTable {
    pub fn new(name: &str, observations: Vec<Observation>) -> Self {
        Self {
            name: name.to_string(),
            observations,
        }
    }

    /// First row matching (area, year), in table order.
    pub fn first_match(&self, area: &str, year: i32) -> Option<&Observation> {
        self.observations
            .iter()
            .find(|o| o.year == year && o.area == area)
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }
}

/// One table per gender partition for a single source.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GenderTables {
    pub both: ObservationTable,
    pub male: ObservationTable,
    pub female: ObservationTable,
}

impl GenderTables {
    pub fn get(&self, gender: Gender) -> &ObservationTable {
        match gender {
            Gender::Both => &self.both,
            Gender::Male => &self.male,
            Gender::Female => &self.female,
        }
    }

    /// Tables paired with their gender, in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (Gender, &ObservationTable)> {
        Gender::ALL.into_iter().map(move |g| (g, self.get(g)))
    }
}

/// Composite key of an area/gender/year observation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObservationKey {
    pub area: String,
    pub gender: Gender,
    pub year: i32,
}

impl ObservationKey {
    pub fn new(area: &str, gender: Gender, year: i32) -> Self {
        Self {
            area: area.to_string(),
            gender,
            year,
        }
    }
}

impl fmt::Display for ObservationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {} / {}", self.area, self.gender, self.year)
    }
}

/// Sparse area x gender x year values for one source.
///
/// Every area it was built for is a member even when it holds no values,
/// so `year_map` on a known area always succeeds (possibly empty).
#[derive(Debug, Clone, PartialEq)]
pub struct AreaGenderYearMap {
    source: Source,
    areas: Vec<String>,
    values: BTreeMap<ObservationKey, f64>,
}

impl AreaGenderYearMap {
    pub fn new(source: Source, areas: Vec<String>) -> Self {
        Self {
            source,
            areas,
            values: BTreeMap::new(),
        }
    }

    /// Record a value. Keys for areas outside the membership list are ignored.
    pub fn insert(&mut self, key: ObservationKey, value: f64) {
        if self.contains_area(&key.area) {
            self.values.insert(key, value);
        }
    }

    pub fn source(&self) -> Source {
        self.source
    }

    pub fn areas(&self) -> &[String] {
        &self.areas
    }

    pub fn contains_area(&self, area: &str) -> bool {
        self.areas.iter().any(|a| a == area)
    }

    pub fn get(&self, area: &str, gender: Gender, year: i32) -> Option<f64> {
        self.values
            .get(&ObservationKey::new(area, gender, year))
            .copied()
    }

    /// Ordered year -> value view for one (area, gender).
    pub fn year_map(&self, area: &str, gender: Gender) -> BTreeMap<i32, f64> {
        let lo = ObservationKey::new(area, gender, i32::MIN);
        let hi = ObservationKey::new(area, gender, i32::MAX);
        self.values
            .range(lo..=hi)
            .map(|(k, v)| (k.year, *v))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ObservationKey, f64)> {
        self.values.iter().map(|(k, v)| (k, *v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }
}

/// One year of the global series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalPoint {
    pub year: i32,
    /// Population-weighted mean; `None` when undefined.
    pub value: Option<f64>,
    /// Plain mean of the contributing areas.
    pub unweighted: Option<f64>,
    /// Number of areas with life expectancy data for this year.
    pub contributing_areas: usize,
}

impl GlobalPoint {
    /// Weighted minus unweighted, when both exist.
    pub fn difference(&self) -> Option<f64> {
        Some(self.value? - self.unweighted?)
    }
}

/// Global weighted life expectancy per gender, one point per year.
pub type GlobalSeries = BTreeMap<Gender, Vec<GlobalPoint>>;

/// Row-oriented projection of the life expectancy map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatRecord {
    pub area: String,
    pub year: i32,
    pub gender: Gender,
    pub life_expectancy: f64,
}

/// Metadata about an analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub analysis_date: DateTime<Utc>,
    pub years: YearRange,
    /// Gender filter applied to area-level outputs.
    pub gender: Gender,
    pub data_dir: String,
    pub areas: usize,
    pub records: usize,
    pub duration_seconds: f64,
}

/// Everything the report generator needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub metadata: ReportMetadata,
    pub data_summary: Vec<crate::loader::TableSummary>,
    pub global: GlobalSeries,
    pub alignment: crate::pipeline::AlignmentReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<crate::stats::StatsSummary>,
    /// Files written by the renderers.
    pub artifacts: Vec<String>,
}
