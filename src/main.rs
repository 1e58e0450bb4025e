//! lifetrend - Global and regional life expectancy trends
//!
//! A CLI tool that reshapes UN demographic exports into an area x gender x
//! year dataset, derives a population-weighted global average, renders
//! charts and runs male/female significance tests.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (unreadable table, missing column, duplicate rows
//!       under the `error` policy, misaligned sources under `--strict-alignment`)

mod cli;
mod config;
mod error;
mod loader;
mod models;
mod pipeline;
mod render;
mod report;
mod stats;

use anyhow::{Context, Result};
use chrono::Utc;
use cli::{Args, OutputFormat, PlotType};
use config::{Config, CONFIG_FILE};
use loader::TableLoader;
use models::{AnalysisReport, Gender, ReportMetadata};
use pipeline::PipelineOptions;
use stats::StatsSummary;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("lifetrend v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run_analysis(args) {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Analysis failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .lifetrend.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE);
    println!("   Edit it to customize input files, areas, years, and colours.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Run the complete analysis workflow. Returns the exit code.
fn run_analysis(args: Args) -> Result<i32> {
    let start_time = Instant::now();

    // Load configuration
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    let years = config.year_range()?;
    let registry = config.registry()?;
    let alpha = config.alpha()?;
    let output_dir = Path::new(&config.general.output_dir).to_path_buf();

    // Step 1: Load the source tables
    println!("📥 Loading tables from: {}", config.data.dir);
    let table_loader = TableLoader::new(config.data.clone(), config.analysis.duplicates);
    let data = table_loader.load_all(!args.quiet)?;

    // Step 2: Reshape and combine
    println!("🔧 Aggregating {} areas over {}...", registry.len(), years);
    let options = PipelineOptions {
        years,
        alignment: config.analysis.alignment,
        exclude_aggregates: config.analysis.exclude_aggregates_from_global,
    };
    let output = pipeline::run(&data.life, &data.population, &registry, options)?;

    if !output.alignment.is_aligned() {
        warn!(
            "{} observation(s) present in only one source",
            output.alignment.len()
        );
    }
    let records = pipeline::filter_by_gender(&output.records, args.gender);
    debug!(
        "{} of {} flat records pass the {} filter",
        records.len(),
        output.records.len(),
        args.gender
    );

    // Step 3: Statistics
    let summary = if args.no_stats {
        None
    } else {
        let summary = StatsSummary::compute(&records, &config.analysis.periods, alpha);
        report::print_stats_summary(&summary);
        Some(summary)
    };

    // Step 4: Render the selected charts
    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;

    println!("\n🎨 Rendering charts...");
    let mut artifacts = Vec::new();

    if args.plot.includes(PlotType::Global) {
        let svg = render::line_chart(&output.global, &config.render, years);
        artifacts.push(render::write_artifact(&output_dir, render::GLOBAL_CHART_FILE, &svg)?);
    }
    if args.plot.includes(PlotType::Area) {
        let svg = render::bar_chart(&records, &registry, &config.render, years);
        artifacts.push(render::write_artifact(&output_dir, render::AREA_CHART_FILE, &svg)?);
    }
    if args.plot.includes(PlotType::Animated) {
        // The map shows one gender; `both` stays the combined partition.
        let html = render::bubble_map(&records, &registry, years, args.gender)?;
        artifacts.push(render::write_artifact(&output_dir, render::ANIMATION_FILE, &html)?);
    }
    if args.plot.includes(PlotType::Heatmap) {
        let svg = render::heatmap(&records, &registry, years, summary.as_ref());
        artifacts.push(render::write_artifact(&output_dir, render::HEATMAP_FILE, &svg)?);
    }

    for path in &artifacts {
        println!("   🖼️  {}", path.display());
    }

    // Step 5: Build and save the report
    println!("\n📝 Generating report...");

    let duration = start_time.elapsed().as_secs_f64();
    let metadata = ReportMetadata {
        analysis_date: Utc::now(),
        years,
        gender: args.gender,
        data_dir: config.data.dir.clone(),
        areas: registry.len(),
        records: records.len(),
        duration_seconds: duration,
    };

    let analysis = AnalysisReport {
        metadata,
        data_summary: data.summaries,
        global: output.global.clone(),
        alignment: output.alignment.clone(),
        stats: summary,
        artifacts: artifacts
            .iter()
            .map(|p| p.display().to_string())
            .collect(),
    };

    let json = args.format == OutputFormat::Json;
    let content = if json {
        report::generate_json_report(&analysis)?
    } else {
        report::generate_markdown_report(&analysis)
    };

    let report_path = config.report_path(json);
    if let Some(parent) = report_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(&report_path, &content)
        .with_context(|| format!("Failed to write report to {}", report_path.display()))?;

    // Print summary
    println!("\n📊 Analysis Summary:");
    println!("   Areas: {} | Years: {}", registry.len(), years);
    for gender in Gender::ALL {
        let latest = output
            .global
            .get(&gender)
            .and_then(|points| points.iter().rev().find_map(|p| p.value.map(|v| (p.year, v))));
        match latest {
            Some((year, value)) => {
                println!("   {} ({}): {:.2} years", gender.label(), year, value)
            }
            None => println!("   {}: no weighted value", gender.label()),
        }
    }
    if !output.alignment.is_aligned() {
        println!(
            "   ⚠️  {} unmatched observation(s), see the report",
            output.alignment.len()
        );
    }
    println!("   Duration: {:.1}s", duration);
    println!(
        "\n✅ Analysis complete! Report saved to: {}",
        report_path.display()
    );

    Ok(0)
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {:#}", e);
            Ok(Config::default())
        }
    }
}
