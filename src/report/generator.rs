//! Markdown report generation.
//!
//! This module generates the analysis report from the pipeline outputs,
//! the table summaries and the significance tests.

use crate::loader::TableSummary;
use crate::models::{AnalysisReport, GlobalSeries, ReportMetadata};
use crate::pipeline::AlignmentReport;
use crate::stats::{AnovaResult, StatsSummary, TTestResult};
use anyhow::Result;

/// Mismatched keys listed before the rest is summarised.
const MAX_LISTED_KEYS: usize = 20;

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &AnalysisReport) -> String {
    let mut output = String::new();

    // Title
    output.push_str("# Life Expectancy Report\n\n");

    // Metadata section
    output.push_str(&generate_metadata_section(&report.metadata));

    // Table of contents
    output.push_str(&generate_table_of_contents(report));

    // Input tables
    output.push_str(&generate_data_summary_section(&report.data_summary));

    // Weighted global series
    output.push_str(&generate_global_section(&report.global));

    // Population / life expectancy mismatches
    output.push_str(&generate_alignment_section(&report.alignment));

    // Significance tests
    if let Some(ref stats) = report.stats {
        output.push_str(&generate_statistics_section(stats));
    }

    // Rendered charts
    output.push_str(&generate_artifacts_section(&report.artifacts));

    // Footer
    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!(
        "- **Analysis Date:** {}\n",
        metadata.analysis_date.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Years:** {}\n", metadata.years));
    section.push_str(&format!("- **Gender Filter:** {}\n", metadata.gender));
    section.push_str(&format!("- **Data Directory:** `{}`\n", metadata.data_dir));
    section.push_str(&format!("- **Areas:** {}\n", metadata.areas));
    section.push_str(&format!("- **Flat Records:** {}\n", metadata.records));
    section.push_str(&format!(
        "- **Analysis Duration:** {:.1}s\n",
        metadata.duration_seconds
    ));
    section.push('\n');

    section
}

/// Generate the table of contents.
fn generate_table_of_contents(report: &AnalysisReport) -> String {
    let mut toc = String::new();

    toc.push_str("## Table of Contents\n\n");
    toc.push_str("- [Metadata](#metadata)\n");
    toc.push_str("- [Data Summary](#data-summary)\n");
    toc.push_str("- [Global Average Life Expectancy](#global-average-life-expectancy)\n");
    toc.push_str("- [Alignment](#alignment)\n");

    if report.stats.is_some() {
        toc.push_str("- [Statistics](#statistics)\n");
    }

    if !report.artifacts.is_empty() {
        toc.push_str("- [Charts](#charts)\n");
    }

    toc.push('\n');

    toc
}

/// Generate the data summary section.
fn generate_data_summary_section(summaries: &[TableSummary]) -> String {
    let mut section = String::new();

    section.push_str("## Data Summary\n\n");

    if summaries.is_empty() {
        section.push_str("No tables were loaded.\n\n");
        return section;
    }

    section.push_str(
        "| Table | Rows | Skipped | Duplicates | Areas | Years | Missing | Mean | Std | Min | Max |\n",
    );
    section.push_str("|:---|---:|---:|---:|---:|:---:|---:|---:|---:|---:|---:|\n");

    for s in summaries {
        let years = match (s.first_year, s.last_year) {
            (Some(first), Some(last)) => format!("{}-{}", first, last),
            _ => "-".to_string(),
        };
        section.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} | {} | {} | {} | {} | {} |\n",
            s.name,
            s.rows,
            s.skipped_rows,
            s.duplicates,
            s.areas,
            years,
            s.missing_values,
            format_value(s.mean, 2),
            format_value(s.std, 2),
            format_value(s.min, 2),
            format_value(s.max, 2),
        ));
    }
    section.push('\n');

    section
}

/// Generate the global series section.
fn generate_global_section(global: &GlobalSeries) -> String {
    let mut section = String::new();

    section.push_str("## Global Average Life Expectancy\n\n");
    section.push_str(
        "Population-weighted mean across areas, with the unweighted mean for comparison.\n\n",
    );

    for (gender, points) in global {
        section.push_str(&format!("### {}\n\n", gender.label()));
        section.push_str("| Year | Weighted | Unweighted | Difference | Areas |\n");
        section.push_str("|:---:|---:|---:|---:|:---:|\n");

        for point in points {
            section.push_str(&format!(
                "| {} | {} | {} | {} | {} |\n",
                point.year,
                format_value(point.value, 2),
                format_value(point.unweighted, 2),
                format_value(point.difference(), 3),
                point.contributing_areas,
            ));
        }
        section.push('\n');
    }

    section
}

/// Generate the alignment section.
fn generate_alignment_section(alignment: &AlignmentReport) -> String {
    let mut section = String::new();

    section.push_str("## Alignment\n\n");

    if alignment.is_aligned() {
        section.push_str(
            "Every life expectancy observation has a matching population observation. ✅\n\n",
        );
        return section;
    }

    section.push_str(&format!(
        "⚠️ {} observation(s) appear in only one source.\n\n",
        alignment.len()
    ));

    let groups = [
        (
            "Life expectancy without population (excluded from the weighted mean)",
            &alignment.missing_population,
        ),
        (
            "Population without life expectancy",
            &alignment.missing_life_expectancy,
        ),
    ];

    for (heading, keys) in groups {
        if keys.is_empty() {
            continue;
        }
        section.push_str(&format!("### {}\n\n", heading));
        for key in keys.iter().take(MAX_LISTED_KEYS) {
            section.push_str(&format!("- {}\n", key));
        }
        if keys.len() > MAX_LISTED_KEYS {
            section.push_str(&format!("- ... and {} more\n", keys.len() - MAX_LISTED_KEYS));
        }
        section.push('\n');
    }

    section
}

/// Generate the statistics section.
fn generate_statistics_section(stats: &StatsSummary) -> String {
    let mut section = String::new();

    section.push_str("## Statistics\n\n");
    section.push_str(&format!("Significance level: α = {}\n\n", stats.alpha));

    // ANOVA
    section.push_str("### One-way ANOVA\n\n");
    section.push_str("| Grouping | Groups | N | F | p-value | Significant |\n");
    section.push_str("|:---|:---:|:---:|---:|---:|:---:|\n");
    for (name, result) in [
        ("Area", &stats.anova_by_area),
        ("Year", &stats.anova_by_year),
    ] {
        section.push_str(&anova_row(name, result, stats));
    }
    section.push('\n');

    // Period t-tests
    if !stats.period_tests.is_empty() {
        section.push_str("### Male vs Female by Period\n\n");
        section.push_str("| Period | Years | t | df | p-value | Significant |\n");
        section.push_str("|:---|:---:|---:|---:|---:|:---:|\n");
        for test in &stats.period_tests {
            let years = if test.period.start == test.period.end {
                test.period.start.to_string()
            } else {
                format!("{}-{}", test.period.start, test.period.end)
            };
            section.push_str(&format!(
                "| {} | {} | {} |\n",
                test.period.name,
                years,
                ttest_cells(&test.result, stats)
            ));
        }
        section.push('\n');
    }

    // Area t-tests
    section.push_str("### Male vs Female by Area\n\n");
    if stats.area_tests.is_empty() {
        section.push_str("No area had both male and female values.\n\n");
        return section;
    }
    section.push_str("| Area | t | df | p-value | Significant |\n");
    section.push_str("|:---|---:|---:|---:|:---:|\n");
    for test in &stats.area_tests {
        section.push_str(&format!(
            "| {} | {} |\n",
            test.area,
            ttest_cells(&test.result, stats)
        ));
    }
    section.push('\n');

    let significant = stats.significant_areas();
    if significant.is_empty() {
        section.push_str("No area shows a significant male/female difference.\n\n");
    } else {
        section.push_str(&format!(
            "Significant male/female difference in {} area(s): {}.\n\n",
            significant.len(),
            significant.join(", ")
        ));
    }

    section
}

fn anova_row(name: &str, result: &AnovaResult, stats: &StatsSummary) -> String {
    format!(
        "| {} | {} | {} | {} | {} | {} |\n",
        name,
        result.groups,
        result.observations,
        format_value(result.f_statistic, 3),
        format_p(result.p_value),
        significance_mark(stats.is_significant(result.p_value)),
    )
}

fn ttest_cells(result: &TTestResult, stats: &StatsSummary) -> String {
    format!(
        "{} | {} | {} | {}",
        format_value(result.statistic, 3),
        format_value(result.df, 1),
        format_p(result.p_value),
        significance_mark(stats.is_significant(result.p_value)),
    )
}

fn significance_mark(significant: bool) -> &'static str {
    if significant {
        "✅ Yes"
    } else {
        "No"
    }
}

/// Generate the chart list.
fn generate_artifacts_section(artifacts: &[String]) -> String {
    if artifacts.is_empty() {
        return String::new();
    }

    let mut section = String::new();

    section.push_str("## Charts\n\n");
    for artifact in artifacts {
        section.push_str(&format!("- `{}`\n", artifact));
    }
    section.push('\n');

    section
}

/// Generate the report footer.
fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str(&format!(
        "*Report generated by lifetrend v{}*\n",
        env!("CARGO_PKG_VERSION")
    ));

    footer
}

/// Fixed-precision value, or `n/a` when undefined.
pub(crate) fn format_value(value: Option<f64>, precision: usize) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{:.*}", precision, v),
        _ => "n/a".to_string(),
    }
}

/// p-value in scientific notation, or `n/a` when undefined.
pub(crate) fn format_p(p: Option<f64>) -> String {
    match p {
        Some(p) if p.is_finite() => format!("{:.3e}", p),
        _ => "n/a".to_string(),
    }
}

/// Generate a JSON report.
pub fn generate_json_report(report: &AnalysisReport) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

/// Print the significance results to stdout.
pub fn print_stats_summary(stats: &StatsSummary) {
    println!("\n📈 Statistical Summary (α = {}):", stats.alpha);

    for (name, result) in [
        ("Area", &stats.anova_by_area),
        ("Year", &stats.anova_by_year),
    ] {
        println!(
            "   ANOVA by {}: F = {}, p = {}",
            name,
            format_value(result.f_statistic, 3),
            format_p(result.p_value)
        );
    }
    if stats.is_significant(stats.anova_by_area.p_value) {
        println!("   Life expectancy differs significantly between areas.");
    } else {
        println!("   No significant difference between areas.");
    }

    for test in &stats.period_tests {
        let verdict = if stats.is_significant(test.result.p_value) {
            "significant"
        } else {
            "not significant"
        };
        println!(
            "   {} male vs female: t = {}, p = {} ({})",
            test.period.name,
            format_value(test.result.statistic, 2),
            format_p(test.result.p_value),
            verdict
        );
    }

    if stats.area_tests.is_empty() {
        return;
    }

    println!("\n   Male vs female by area (sorted by p-value):");
    let width = stats
        .area_tests
        .iter()
        .map(|t| t.area.chars().count())
        .max()
        .unwrap_or(4)
        .max(4);
    println!("   {:<width$}  {:>9}  {:>10}", "Area", "t", "p-value", width = width);
    for test in &stats.area_tests {
        let marker = if stats.is_significant(test.result.p_value) {
            " *"
        } else {
            ""
        };
        println!(
            "   {:<width$}  {:>9}  {:>10}{}",
            test.area,
            format_value(test.result.statistic, 3),
            format_p(test.result.p_value),
            marker,
            width = width
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FlatRecord, Gender, GlobalPoint, ObservationKey, YearRange};
    use crate::stats::Period;
    use chrono::Utc;

    fn create_test_metadata() -> ReportMetadata {
        ReportMetadata {
            analysis_date: Utc::now(),
            years: YearRange::default(),
            gender: Gender::Both,
            data_dir: "data/raw".to_string(),
            areas: 7,
            records: 126,
            duration_seconds: 0.4,
        }
    }

    fn create_test_stats() -> StatsSummary {
        let mut records = Vec::new();
        for (i, year) in (2019..=2024).enumerate() {
            let jitter = i as f64 * 0.2;
            for (area, base) in [("AFRO", 63.0), ("EURO", 77.0)] {
                records.push(FlatRecord {
                    area: area.to_string(),
                    year,
                    gender: Gender::Male,
                    life_expectancy: base + jitter,
                });
                records.push(FlatRecord {
                    area: area.to_string(),
                    year,
                    gender: Gender::Female,
                    life_expectancy: base + 5.0 - jitter,
                });
            }
        }
        StatsSummary::compute(&records, &[Period::new("Pre-COVID", 2019, 2019)], 0.05)
    }

    fn create_test_report() -> AnalysisReport {
        let mut global = GlobalSeries::new();
        global.insert(
            Gender::Both,
            vec![
                GlobalPoint {
                    year: 2019,
                    value: Some(72.81),
                    unweighted: Some(71.9),
                    contributing_areas: 7,
                },
                GlobalPoint {
                    year: 2020,
                    value: None,
                    unweighted: None,
                    contributing_areas: 0,
                },
            ],
        );

        AnalysisReport {
            metadata: create_test_metadata(),
            data_summary: vec![TableSummary {
                name: "life_expectancy_both".to_string(),
                rows: 42,
                skipped_rows: 2,
                duplicates: 0,
                areas: 7,
                first_year: Some(2018),
                last_year: Some(2024),
                missing_values: 0,
                mean: Some(70.1),
                std: Some(4.2),
                min: Some(61.0),
                max: Some(79.3),
            }],
            global,
            alignment: AlignmentReport {
                missing_population: vec![ObservationKey::new("World", Gender::Male, 2021)],
                missing_life_expectancy: vec![],
            },
            stats: Some(create_test_stats()),
            artifacts: vec!["data/output/heatmap.svg".to_string()],
        }
    }

    #[test]
    fn test_generate_markdown_report() {
        let report = create_test_report();
        let markdown = generate_markdown_report(&report);

        assert!(markdown.contains("# Life Expectancy Report"));
        assert!(markdown.contains("## Metadata"));
        assert!(markdown.contains("## Data Summary"));
        assert!(markdown.contains("## Global Average Life Expectancy"));
        assert!(markdown.contains("## Statistics"));
        assert!(markdown.contains("| 2019 | 72.81 | 71.90 | 0.910 | 7 |"));
        assert!(markdown.contains("| 2020 | n/a | n/a | n/a | 0 |"));
        assert!(markdown.contains("World / male / 2021"));
        assert!(markdown.contains("`data/output/heatmap.svg`"));
    }

    #[test]
    fn test_generate_metadata_section() {
        let section = generate_metadata_section(&create_test_metadata());

        assert!(section.contains("2019-2024"));
        assert!(section.contains("both"));
        assert!(section.contains("`data/raw`"));
        assert!(section.contains("126"));
    }

    #[test]
    fn test_alignment_section_when_aligned() {
        let section = generate_alignment_section(&AlignmentReport::default());
        assert!(section.contains("✅"));
        assert!(!section.contains("###"));
    }

    #[test]
    fn test_alignment_section_truncates() {
        let keys = (0..25)
            .map(|i| ObservationKey::new("A", Gender::Both, 2000 + i))
            .collect();
        let section = generate_alignment_section(&AlignmentReport {
            missing_population: vec![],
            missing_life_expectancy: keys,
        });
        assert!(section.contains("25 observation(s)"));
        assert!(section.contains("... and 5 more"));
        assert!(!section.contains("without population"));
    }

    #[test]
    fn test_statistics_section() {
        let section = generate_statistics_section(&create_test_stats());

        assert!(section.contains("### One-way ANOVA"));
        assert!(section.contains("| Pre-COVID | 2019 |"));
        assert!(section.contains("| AFRO |"));
        assert!(section.contains("Significant male/female difference in 2 area(s)"));
    }

    #[test]
    fn test_format_helpers() {
        assert_eq!(format_value(Some(72.456), 2), "72.46");
        assert_eq!(format_value(None, 2), "n/a");
        assert_eq!(format_value(Some(f64::NAN), 2), "n/a");
        assert_eq!(format_p(Some(0.00123)), "1.230e-3");
        assert_eq!(format_p(None), "n/a");
    }

    #[test]
    fn test_generate_json_report() {
        let report = create_test_report();
        let json = generate_json_report(&report).unwrap();

        assert!(json.contains("\"metadata\""));
        assert!(json.contains("\"global\""));
        assert!(json.contains("\"missing_population\""));
        assert!(json.contains("\"area_tests\""));

        let parsed: AnalysisReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.global[&Gender::Both].len(), 2);
    }
}
