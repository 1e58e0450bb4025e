//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::loader::DuplicatePolicy;
use crate::models::Gender;
use clap::Parser;
use std::path::PathBuf;

/// Lifetrend - population-weighted life expectancy trends
///
/// Reads UN life expectancy and population exports by WHO region,
/// computes the population-weighted global average per gender, renders
/// charts and prints significance tests.
///
/// Examples:
///   lifetrend
///   lifetrend --plot area --gender female
///   lifetrend --plot all --data-dir ./data/raw --output-dir ./out
///   lifetrend --plot animated --no-stats
///   lifetrend --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Which chart to render
    #[arg(long, default_value = "global", value_name = "TYPE")]
    pub plot: PlotType,

    /// Gender used for area-level charts and statistics
    #[arg(long, default_value = "both", value_name = "GENDER")]
    pub gender: Gender,

    /// Skip statistical analysis and only generate visual outputs
    #[arg(long)]
    pub no_stats: bool,

    /// Path to configuration file
    ///
    /// If not specified, looks for .lifetrend.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory containing the six source CSV files
    #[arg(long, value_name = "DIR", env = "LIFETREND_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Directory that receives charts and the report
    #[arg(short, long, value_name = "DIR", env = "LIFETREND_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Output file path for the analysis report
    #[arg(short, long, value_name = "FILE")]
    pub report: Option<PathBuf>,

    /// Report format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Significance threshold for the statistical tests (0.0 - 1.0)
    #[arg(long, value_name = "ALPHA")]
    pub alpha: Option<f64>,

    /// How to resolve several rows for the same area and year
    ///
    /// Values: first, last, mean, error
    #[arg(long, value_name = "POLICY")]
    pub duplicates: Option<DuplicatePolicy>,

    /// Fail when life expectancy and population data are not aligned
    #[arg(long)]
    pub strict_alignment: bool,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .lifetrend.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Chart selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum PlotType {
    /// Global weighted average line chart (default)
    #[default]
    Global,
    /// Grouped bar charts by area, one panel per year
    Area,
    /// Animated bubble map by region
    Animated,
    /// Area x year heatmap
    Heatmap,
    /// Every chart
    All,
}

impl PlotType {
    /// Whether this selection includes `other`.
    pub fn includes(&self, other: PlotType) -> bool {
        *self == PlotType::All || *self == other
    }
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(alpha) = self.alpha {
            if !(alpha > 0.0 && alpha < 1.0) {
                return Err("Alpha must be between 0.0 and 1.0 (exclusive)".to_string());
            }
        }

        // Validate data directory if provided
        if let Some(ref dir) = self.data_dir {
            if !dir.exists() {
                return Err(format!("Data directory does not exist: {}", dir.display()));
            }
            if !dir.is_dir() {
                return Err(format!("Data path is not a directory: {}", dir.display()));
            }
        }

        if let Some(ref dir) = self.output_dir {
            if dir.exists() && !dir.is_dir() {
                return Err(format!("Output path is not a directory: {}", dir.display()));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args() -> Args {
        Args {
            plot: PlotType::Global,
            gender: Gender::Both,
            no_stats: false,
            config: None,
            data_dir: None,
            output_dir: None,
            report: None,
            format: OutputFormat::Markdown,
            alpha: None,
            duplicates: None,
            strict_alignment: false,
            verbose: false,
            quiet: false,
            init_config: false,
        }
    }

    #[test]
    fn test_parse_flags() {
        let args = Args::try_parse_from([
            "lifetrend",
            "--plot",
            "animated",
            "--gender",
            "female",
            "--no-stats",
            "--duplicates",
            "mean",
        ])
        .unwrap();
        assert_eq!(args.plot, PlotType::Animated);
        assert_eq!(args.gender, Gender::Female);
        assert!(args.no_stats);
        assert_eq!(args.duplicates, Some(DuplicatePolicy::Mean));
        assert_eq!(args.format, OutputFormat::Markdown);
    }

    #[test]
    fn test_rejects_unknown_plot() {
        assert!(Args::try_parse_from(["lifetrend", "--plot", "pie"]).is_err());
    }

    #[test]
    fn test_plot_includes() {
        assert!(PlotType::All.includes(PlotType::Heatmap));
        assert!(PlotType::Area.includes(PlotType::Area));
        assert!(!PlotType::Area.includes(PlotType::Global));
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_alpha() {
        let mut args = make_args();
        args.alpha = Some(1.5);
        assert!(args.validate().is_err());
        args.alpha = Some(0.01);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_missing_data_dir() {
        let mut args = make_args();
        args.data_dir = Some(PathBuf::from("/definitely/not/here"));
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }
}
