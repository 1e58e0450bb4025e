//! Source table loading.
//!
//! This module reads the six UN data exports (life expectancy and
//! population, one file per gender) into observation tables, resolving
//! repeated (area, year) rows with an explicit policy.

pub mod summary;

pub use summary::TableSummary;

use crate::config::DataConfig;
use crate::error::PipelineError;
use crate::models::{Gender, GenderTables, Observation, ObservationTable, Source};
use anyhow::{Context, Result};
use csv::{ReaderBuilder, StringRecord, Trim};
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

/// How to resolve several rows for the same (area, year) in one table.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Keep the first row in file order (default)
    #[default]
    First,
    /// Keep the last row in file order
    Last,
    /// Average the non-missing values
    Mean,
    /// Abort the run
    Error,
}

/// Column layout and filtering for one table.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub area_column: String,
    pub year_column: String,
    pub value_column: String,
    pub variant_column: String,
    pub variant: Option<String>,
    pub duplicates: DuplicatePolicy,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self::new(&DataConfig::default(), DuplicatePolicy::default())
    }
}

impl LoadOptions {
    pub fn new(data: &DataConfig, duplicates: DuplicatePolicy) -> Self {
        Self {
            area_column: data.area_column.clone(),
            year_column: data.year_column.clone(),
            value_column: data.value_column.clone(),
            variant_column: data.variant_column.clone(),
            variant: data.variant.clone(),
            duplicates,
        }
    }
}

/// Both sources, ready for the pipeline.
#[derive(Debug, Clone)]
pub struct LoadedData {
    pub life: GenderTables,
    pub population: GenderTables,
    pub summaries: Vec<TableSummary>,
}

/// Table name used in logs and the data summary.
pub fn table_name(source: Source, gender: Gender) -> String {
    let prefix = match source {
        Source::LifeExpectancy => "life_expectancy",
        Source::Population => "population",
    };
    format!("{}_{}", prefix, gender)
}

/// Loads every source table described by a [`DataConfig`].
pub struct TableLoader {
    data: DataConfig,
    options: LoadOptions,
}

impl TableLoader {
    /// Create a new loader.
    pub fn new(data: DataConfig, duplicates: DuplicatePolicy) -> Self {
        let options = LoadOptions::new(&data, duplicates);
        Self { data, options }
    }

    /// Load all six tables.
    pub fn load_all(&self, show_progress: bool) -> Result<LoadedData> {
        let progress = if show_progress {
            let pb = ProgressBar::new(6);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("#>-"),
            );
            pb
        } else {
            ProgressBar::hidden()
        };

        let mut summaries = Vec::with_capacity(6);
        let life = self.load_source(Source::LifeExpectancy, &progress, &mut summaries)?;
        let population = self.load_source(Source::Population, &progress, &mut summaries)?;
        progress.finish_and_clear();

        Ok(LoadedData {
            life,
            population,
            summaries,
        })
    }

    fn load_source(
        &self,
        source: Source,
        progress: &ProgressBar,
        summaries: &mut Vec<TableSummary>,
    ) -> Result<GenderTables> {
        let mut tables = GenderTables::default();

        for gender in Gender::ALL {
            let name = table_name(source, gender);
            progress.set_message(name.clone());

            let path = self.data.path(source, gender);
            let (table, summary) = load_table(&path, &name, &self.options)?;
            info!(
                "Loaded {} ({} observations, {} skipped rows)",
                name,
                table.len(),
                summary.skipped_rows
            );

            summaries.push(summary);
            match gender {
                Gender::Both => tables.both = table,
                Gender::Male => tables.male = table,
                Gender::Female => tables.female = table,
            }
            progress.inc(1);
        }

        Ok(tables)
    }
}

/// Load one table from a CSV file.
pub fn load_table(
    path: &Path,
    name: &str,
    options: &LoadOptions,
) -> Result<(ObservationTable, TableSummary)> {
    debug!("Reading {} from {}", name, path.display());
    let file = File::open(path)
        .with_context(|| format!("Failed to open source table: {}", path.display()))?;
    read_table(name, file, options)
        .with_context(|| format!("Failed to load source table: {}", path.display()))
}

/// Parse a table from any CSV reader.
///
/// Rows with an empty area or a non-integer year are skipped; UN exports
/// append footnote rows that fall in this category. An empty value cell
/// becomes NaN and the row is kept.
pub fn read_table<R: Read>(
    name: &str,
    reader: R,
    options: &LoadOptions,
) -> Result<(ObservationTable, TableSummary)> {
    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);
    let headers = rdr.headers()?.clone();

    let area_idx = column_index(&headers, name, &options.area_column)?;
    let year_idx = column_index(&headers, name, &options.year_column)?;
    let value_idx = column_index(&headers, name, &options.value_column)?;
    let variant_idx = match options.variant {
        Some(_) => Some(column_index(&headers, name, &options.variant_column)?),
        None => None,
    };

    let mut rows = Vec::new();
    let mut skipped = 0usize;

    for result in rdr.records() {
        let record = result?;

        let area = record.get(area_idx).unwrap_or("");
        let year = record.get(year_idx).and_then(parse_year);
        let (area, year) = match (area, year) {
            ("", _) | (_, None) => {
                skipped += 1;
                continue;
            }
            (area, Some(year)) => (area, year),
        };

        if let (Some(idx), Some(wanted)) = (variant_idx, options.variant.as_deref()) {
            if record.get(idx).unwrap_or("") != wanted {
                continue;
            }
        }

        let value = parse_value(record.get(value_idx).unwrap_or(""));
        rows.push(Observation::new(area, year, value));
    }

    if skipped > 0 {
        debug!("{}: skipped {} rows without area or year", name, skipped);
    }

    let parsed = rows.len();
    let summary_rows = rows.clone();
    let observations = resolve_duplicates(name, rows, options.duplicates)?;
    let duplicates = parsed - observations.len();

    let summary = TableSummary::from_observations(name, &summary_rows, skipped, duplicates);
    Ok((ObservationTable::new(name, observations), summary))
}

fn column_index(headers: &StringRecord, table: &str, column: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h.trim_start_matches('\u{feff}') == column)
        .ok_or_else(|| {
            PipelineError::MissingColumn {
                table: table.to_string(),
                column: column.to_string(),
            }
            .into()
        })
}

fn parse_year(raw: &str) -> Option<i32> {
    if let Ok(year) = raw.parse::<i32>() {
        return Some(year);
    }
    // Some exports write years as floats ("2019.0").
    raw.parse::<f64>()
        .ok()
        .filter(|y| y.fract() == 0.0 && y.abs() < i32::MAX as f64)
        .map(|y| y as i32)
}

fn parse_value(raw: &str) -> f64 {
    raw.replace(',', "").parse::<f64>().unwrap_or(f64::NAN)
}

/// Collapse repeated (area, year) rows according to `policy`.
///
/// The surviving rows keep the position of their first occurrence.
pub fn resolve_duplicates(
    table: &str,
    rows: Vec<Observation>,
    policy: DuplicatePolicy,
) -> Result<Vec<Observation>, PipelineError> {
    let mut index: HashMap<(String, i32), usize> = HashMap::new();
    let mut out: Vec<Observation> = Vec::with_capacity(rows.len());
    // Per output row: (sum, count) of non-missing values, used by `Mean`.
    let mut sums: Vec<(f64, usize)> = Vec::with_capacity(rows.len());

    for row in rows {
        let key = (row.area.clone(), row.year);
        let pos = match index.get(&key) {
            Some(&pos) => pos,
            None => {
                index.insert(key, out.len());
                sums.push(if row.value.is_nan() { (0.0, 0) } else { (row.value, 1) });
                out.push(row);
                continue;
            }
        };

        warn!(
            "Duplicate observation in {}: {} / {} (policy: {:?})",
            table, row.area, row.year, policy
        );

        match policy {
            DuplicatePolicy::First => {}
            DuplicatePolicy::Last => out[pos].value = row.value,
            DuplicatePolicy::Mean => {
                if !row.value.is_nan() {
                    sums[pos].0 += row.value;
                    sums[pos].1 += 1;
                }
            }
            DuplicatePolicy::Error => {
                return Err(PipelineError::DuplicateObservation {
                    table: table.to_string(),
                    area: row.area,
                    year: row.year,
                });
            }
        }
    }

    if policy == DuplicatePolicy::Mean {
        for (obs, (sum, count)) in out.iter_mut().zip(sums) {
            obs.value = if count == 0 { f64::NAN } else { sum / count as f64 };
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const LIFE_BOTH: &str = include_str!("../../fixtures/life_expectancy_both.csv");

    fn rows(values: &[(&str, i32, f64)]) -> Vec<Observation> {
        values
            .iter()
            .map(|(a, y, v)| Observation::new(a, *y, *v))
            .collect()
    }

    #[test]
    fn test_read_un_export() {
        let (table, summary) =
            read_table("life_both", LIFE_BOTH.as_bytes(), &LoadOptions::default()).unwrap();

        assert!(table.len() > 0);
        let afro_2019 = table.first_match("WHO: African region (AFRO)", 2019);
        assert_eq!(afro_2019.map(|o| o.value), Some(64.5));

        // Footnote rows at the end of the export are skipped, not parsed.
        assert!(summary.skipped_rows >= 2);
        assert!(table.observations.iter().all(|o| o.year >= 1900));
    }

    #[test]
    fn test_missing_column() {
        let csv = "Area,Year,Value\nA,2019,70\n";
        let err = read_table("t", csv.as_bytes(), &LoadOptions::default()).unwrap_err();
        let pipeline_err = err.downcast_ref::<PipelineError>();
        assert!(matches!(
            pipeline_err,
            Some(PipelineError::MissingColumn { column, .. }) if column == "Country or Area"
        ));
    }

    #[test]
    fn test_empty_value_is_nan() {
        let csv = "Country or Area,Year(s),Value\nA,2019,\nA,2020,71.5\n";
        let (table, summary) = read_table("t", csv.as_bytes(), &LoadOptions::default()).unwrap();
        assert_eq!(table.len(), 2);
        assert!(table.first_match("A", 2019).unwrap().value.is_nan());
        assert_eq!(summary.missing_values, 1);
    }

    #[test]
    fn test_variant_filter() {
        let csv = "Country or Area,Year(s),Variant,Value\n\
                   A,2024,Medium,70\n\
                   A,2024,High,75\n";
        let options = LoadOptions {
            variant: Some("Medium".to_string()),
            ..LoadOptions::default()
        };
        let (table, _) = read_table("t", csv.as_bytes(), &options).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.observations[0].value, 70.0);
    }

    #[test]
    fn test_duplicate_policies() {
        let input = rows(&[("A", 2020, 70.0), ("B", 2020, 60.0), ("A", 2020, 72.0)]);

        let first = resolve_duplicates("t", input.clone(), DuplicatePolicy::First).unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].value, 70.0);
        assert_eq!(first[1].area, "B");

        let last = resolve_duplicates("t", input.clone(), DuplicatePolicy::Last).unwrap();
        assert_eq!(last[0].value, 72.0);

        let mean = resolve_duplicates("t", input.clone(), DuplicatePolicy::Mean).unwrap();
        assert_eq!(mean[0].value, 71.0);
        assert_eq!(mean[1].value, 60.0);

        let err = resolve_duplicates("t", input, DuplicatePolicy::Error).unwrap_err();
        assert_eq!(
            err,
            PipelineError::DuplicateObservation {
                table: "t".to_string(),
                area: "A".to_string(),
                year: 2020,
            }
        );
    }

    #[test]
    fn test_mean_ignores_missing() {
        let input = rows(&[("A", 2020, f64::NAN), ("A", 2020, 80.0)]);
        let mean = resolve_duplicates("t", input, DuplicatePolicy::Mean).unwrap();
        assert_eq!(mean[0].value, 80.0);
    }

    #[test]
    fn test_load_all_from_directory() {
        let dir = TempDir::new().unwrap();
        let mut data = DataConfig {
            dir: dir.path().to_string_lossy().to_string(),
            ..DataConfig::default()
        };
        data.life_both = "lb.csv".into();
        data.life_male = "lm.csv".into();
        data.life_female = "lf.csv".into();
        data.population_both = "pb.csv".into();
        data.population_male = "pm.csv".into();
        data.population_female = "pf.csv".into();

        let header = "Country or Area,Year(s),Value\n";
        for (file, body) in [
            ("lb.csv", "A,2020,70\n"),
            ("lm.csv", "A,2020,68\n"),
            ("lf.csv", "A,2020,72\n"),
            ("pb.csv", "A,2020,100\n"),
            ("pm.csv", "A,2020,50\n"),
            ("pf.csv", "A,2020,50\n"),
        ] {
            fs::write(dir.path().join(file), format!("{}{}", header, body)).unwrap();
        }

        let loaded = TableLoader::new(data, DuplicatePolicy::First)
            .load_all(false)
            .unwrap();
        assert_eq!(loaded.summaries.len(), 6);
        assert_eq!(loaded.life.male.observations[0].value, 68.0);
        assert_eq!(loaded.population.get(Gender::Both).name, "population_both");
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = load_table(
            Path::new("/no/such/table.csv"),
            "t",
            &LoadOptions::default(),
        );
        assert!(result.is_err());
    }
}
