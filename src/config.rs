//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.lifetrend.toml` files. The area registry, colour palette, year range
//! and ingestion policies all live here and are passed explicitly to the
//! components that need them.

use crate::loader::DuplicatePolicy;
use crate::models::{default_areas, Area, AreaRegistry, Gender, Source, YearRange};
use crate::pipeline::AlignmentPolicy;
use crate::stats::Period;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE: &str = ".lifetrend.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Source file settings.
    #[serde(default)]
    pub data: DataConfig,

    /// Pipeline and statistics settings.
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Chart settings.
    #[serde(default)]
    pub render: RenderConfig,

    /// Known areas with their map coordinates.
    #[serde(default = "default_areas")]
    pub areas: Vec<Area>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            data: DataConfig::default(),
            analysis: AnalysisConfig::default(),
            render: RenderConfig::default(),
            areas: default_areas(),
        }
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Directory that receives charts and the report.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Report file path. Defaults to a file inside `output_dir`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report: Option<String>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            report: None,
        }
    }
}

fn default_output_dir() -> String {
    "data/output".to_string()
}

/// Where the six source tables live and how their columns are named.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Directory containing the source CSV files.
    #[serde(default = "default_data_dir")]
    pub dir: String,

    #[serde(default = "default_life_both")]
    pub life_both: String,
    #[serde(default = "default_life_male")]
    pub life_male: String,
    #[serde(default = "default_life_female")]
    pub life_female: String,

    #[serde(default = "default_population_both")]
    pub population_both: String,
    #[serde(default = "default_population_male")]
    pub population_male: String,
    #[serde(default = "default_population_female")]
    pub population_female: String,

    /// Column holding the area name.
    #[serde(default = "default_area_column")]
    pub area_column: String,

    /// Column holding the year.
    #[serde(default = "default_year_column")]
    pub year_column: String,

    /// Column holding the value.
    #[serde(default = "default_value_column")]
    pub value_column: String,

    /// Column holding the projection variant.
    #[serde(default = "default_variant_column")]
    pub variant_column: String,

    /// Keep only rows with this variant (e.g. "Medium"). No filtering when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            dir: default_data_dir(),
            life_both: default_life_both(),
            life_male: default_life_male(),
            life_female: default_life_female(),
            population_both: default_population_both(),
            population_male: default_population_male(),
            population_female: default_population_female(),
            area_column: default_area_column(),
            year_column: default_year_column(),
            value_column: default_value_column(),
            variant_column: default_variant_column(),
            variant: None,
        }
    }
}

fn default_data_dir() -> String {
    "data/raw".to_string()
}

fn default_life_both() -> String {
    "UNdata_Export_20250106_135531463.csv".to_string()
}

fn default_life_male() -> String {
    "UNdata_Export_20250106_135951253.csv".to_string()
}

fn default_life_female() -> String {
    "UNdata_Export_20250106_140234264.csv".to_string()
}

fn default_population_both() -> String {
    "UNdata_Export_20250217_214426488.csv".to_string()
}

fn default_population_male() -> String {
    "UNdata_Export_20250217_214612681.csv".to_string()
}

fn default_population_female() -> String {
    "UNdata_Export_20250217_214748417.csv".to_string()
}

fn default_area_column() -> String {
    "Country or Area".to_string()
}

fn default_year_column() -> String {
    "Year(s)".to_string()
}

fn default_value_column() -> String {
    "Value".to_string()
}

fn default_variant_column() -> String {
    "Variant".to_string()
}

impl DataConfig {
    /// Full path of the table for a source and gender.
    pub fn path(&self, source: Source, gender: Gender) -> PathBuf {
        let file = match (source, gender) {
            (Source::LifeExpectancy, Gender::Both) => &self.life_both,
            (Source::LifeExpectancy, Gender::Male) => &self.life_male,
            (Source::LifeExpectancy, Gender::Female) => &self.life_female,
            (Source::Population, Gender::Both) => &self.population_both,
            (Source::Population, Gender::Male) => &self.population_male,
            (Source::Population, Gender::Female) => &self.population_female,
        };
        Path::new(&self.dir).join(file)
    }
}

/// Pipeline and statistics settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// First year of the analysed range (inclusive).
    #[serde(default = "default_start_year")]
    pub start_year: i32,

    /// Last year of the analysed range (inclusive).
    #[serde(default = "default_end_year")]
    pub end_year: i32,

    /// How to resolve several rows for the same (area, year).
    #[serde(default)]
    pub duplicates: DuplicatePolicy,

    /// What to do when life expectancy and population data disagree.
    #[serde(default)]
    pub alignment: AlignmentPolicy,

    /// Leave aggregate areas (e.g. "World") out of the weighted global mean.
    #[serde(default)]
    pub exclude_aggregates_from_global: bool,

    /// Significance threshold.
    #[serde(default = "default_alpha")]
    pub alpha: f64,

    /// Year periods compared with male vs female t-tests.
    #[serde(default = "default_periods")]
    pub periods: Vec<Period>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            start_year: default_start_year(),
            end_year: default_end_year(),
            duplicates: DuplicatePolicy::default(),
            alignment: AlignmentPolicy::default(),
            exclude_aggregates_from_global: false,
            alpha: default_alpha(),
            periods: default_periods(),
        }
    }
}

fn default_start_year() -> i32 {
    2019
}

fn default_end_year() -> i32 {
    2024
}

fn default_alpha() -> f64 {
    0.05
}

fn default_periods() -> Vec<Period> {
    vec![
        Period::new("Pre-COVID", 2019, 2019),
        Period::new("Post-COVID", 2024, 2024),
    ]
}

/// Chart settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Colours for both, male and female, in that order.
    #[serde(default = "default_colours")]
    pub colours: Vec<String>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            colours: default_colours(),
        }
    }
}

fn default_colours() -> Vec<String> {
    vec!["#F4D0A2", "#A6C9F2", "#D3AED6"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl RenderConfig {
    /// Colour for a gender, cycling if fewer than three are configured.
    pub fn colour(&self, gender: Gender) -> &str {
        let idx = Gender::ALL.iter().position(|g| *g == gender).unwrap_or(0);
        if self.colours.is_empty() {
            return "#888888";
        }
        &self.colours[idx % self.colours.len()]
    }
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// Only explicitly provided values override the config.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref dir) = args.data_dir {
            self.data.dir = dir.to_string_lossy().to_string();
        }
        if let Some(ref dir) = args.output_dir {
            self.general.output_dir = dir.to_string_lossy().to_string();
        }
        if let Some(ref report) = args.report {
            self.general.report = Some(report.to_string_lossy().to_string());
        }

        if let Some(alpha) = args.alpha {
            self.analysis.alpha = alpha;
        }
        if let Some(policy) = args.duplicates {
            self.analysis.duplicates = policy;
        }
        if args.strict_alignment {
            self.analysis.alignment = AlignmentPolicy::Strict;
        }
    }

    /// The configured year range.
    pub fn year_range(&self) -> Result<YearRange> {
        YearRange::new(self.analysis.start_year, self.analysis.end_year)
            .context("Invalid [analysis] year range")
    }

    /// The significance level, checked to lie strictly between 0 and 1.
    pub fn alpha(&self) -> Result<f64> {
        let alpha = self.analysis.alpha;
        if !(alpha > 0.0 && alpha < 1.0) {
            anyhow::bail!("Invalid [analysis] alpha {}: must be between 0 and 1", alpha);
        }
        Ok(alpha)
    }

    /// The configured area registry.
    pub fn registry(&self) -> Result<AreaRegistry> {
        AreaRegistry::new(self.areas.clone()).context("Invalid [[areas]] configuration")
    }

    /// Where the analysis report is written.
    pub fn report_path(&self, json: bool) -> PathBuf {
        match self.general.report {
            Some(ref path) => PathBuf::from(path),
            None => {
                let file = if json {
                    "life_expectancy_report.json"
                } else {
                    "life_expectancy_report.md"
                };
                Path::new(&self.general.output_dir).join(file)
            }
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.analysis.start_year, 2019);
        assert_eq!(config.analysis.end_year, 2024);
        assert_eq!(config.areas.len(), 7);
        assert_eq!(config.render.colours.len(), 3);
        assert_eq!(config.analysis.duplicates, DuplicatePolicy::First);
        assert_eq!(config.analysis.alignment, AlignmentPolicy::Report);
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
output_dir = "out"

[data]
dir = "inputs"
variant = "Medium"

[analysis]
start_year = 2020
end_year = 2022
duplicates = "mean"
alignment = "strict"

[[areas]]
name = "North (N)"
lat = 60.0
lon = 0.0

[[areas]]
name = "Everywhere"
lat = 0.0
lon = 0.0
aggregate = true
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.general.output_dir, "out");
        assert_eq!(config.data.dir, "inputs");
        assert_eq!(config.data.variant.as_deref(), Some("Medium"));
        assert_eq!(config.data.area_column, "Country or Area");
        assert_eq!(config.analysis.duplicates, DuplicatePolicy::Mean);
        assert_eq!(config.analysis.alignment, AlignmentPolicy::Strict);
        assert_eq!(config.year_range().unwrap().len(), 3);

        let registry = config.registry().unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.regions().count(), 1);
    }

    #[test]
    fn test_merge_with_args() {
        use clap::Parser;

        let args = crate::cli::Args::try_parse_from([
            "lifetrend",
            "--alpha",
            "0.01",
            "--duplicates",
            "last",
            "--strict-alignment",
            "--output-dir",
            "out",
        ])
        .unwrap();

        let mut config = Config::default();
        config.merge_with_args(&args);
        assert_eq!(config.analysis.alpha, 0.01);
        assert_eq!(config.analysis.duplicates, DuplicatePolicy::Last);
        assert_eq!(config.analysis.alignment, AlignmentPolicy::Strict);
        assert_eq!(config.general.output_dir, "out");
        assert_eq!(config.data.dir, "data/raw");
    }

    #[test]
    fn test_alpha_out_of_range() {
        for alpha in ["0.0", "1.0", "2.0", "-0.5", "nan"] {
            let toml_content = format!("[analysis]\nalpha = {}\n", alpha);
            let config: Config = toml::from_str(&toml_content).unwrap();
            assert!(config.alpha().is_err(), "alpha {} accepted", alpha);
        }

        let config: Config = toml::from_str("[analysis]\nalpha = 0.1\n").unwrap();
        assert_eq!(config.alpha().unwrap(), 0.1);
    }

    #[test]
    fn test_invalid_year_range() {
        let mut config = Config::default();
        config.analysis.start_year = 2025;
        assert!(config.year_range().is_err());
    }

    #[test]
    fn test_data_paths() {
        let config = Config::default();
        let path = config.data.path(Source::Population, Gender::Male);
        assert_eq!(
            path,
            Path::new("data/raw").join("UNdata_Export_20250217_214612681.csv")
        );
    }

    #[test]
    fn test_report_path() {
        let mut config = Config::default();
        assert_eq!(
            config.report_path(false),
            Path::new("data/output").join("life_expectancy_report.md")
        );
        assert!(config
            .report_path(true)
            .to_string_lossy()
            .ends_with(".json"));

        config.general.report = Some("summary.md".to_string());
        assert_eq!(config.report_path(true), PathBuf::from("summary.md"));
    }

    #[test]
    fn test_colour_lookup() {
        let render = RenderConfig::default();
        assert_eq!(render.colour(Gender::Both), "#F4D0A2");
        assert_eq!(render.colour(Gender::Female), "#D3AED6");
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[data]"));
        assert!(toml_str.contains("[analysis]"));
        assert!(toml_str.contains("[[areas]]"));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.areas, default_areas());
    }
}
