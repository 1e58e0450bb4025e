//! Area by year heatmap of mean life expectancy.

use super::{interpolate, luminance, svg_close, svg_open, text, vertical_text, YL_GN_BU};
use crate::models::{AreaRegistry, FlatRecord, YearRange};
use crate::stats::StatsSummary;
use std::fmt::Write as _;

const CELL_WIDTH: f64 = 80.0;
const CELL_HEIGHT: f64 = 40.0;
const LEFT: f64 = 110.0;
const TOP: f64 = 80.0;
const BOTTOM: f64 = 60.0;
const RIGHT: f64 = 90.0;

/// Mean life expectancy per (area, year) over every gender present.
///
/// Rows follow registry order; areas with no finite values are dropped.
fn cell_means(
    records: &[FlatRecord],
    registry: &AreaRegistry,
    years: YearRange,
) -> Vec<(String, Vec<Option<f64>>)> {
    registry
        .iter()
        .filter_map(|area| {
            let row: Vec<Option<f64>> = years
                .iter()
                .map(|year| {
                    let values: Vec<f64> = records
                        .iter()
                        .filter(|r| r.area == area.name && r.year == year)
                        .map(|r| r.life_expectancy)
                        .filter(|v| v.is_finite())
                        .collect();
                    crate::stats::mean(&values)
                })
                .collect();
            row.iter()
                .any(Option::is_some)
                .then(|| (area.abbreviation().to_string(), row))
        })
        .collect()
}

/// Render the heatmap, titling it with the ANOVA p-values when available.
pub fn heatmap(
    records: &[FlatRecord],
    registry: &AreaRegistry,
    years: YearRange,
    stats: Option<&StatsSummary>,
) -> String {
    let rows = cell_means(records, registry, years);
    let columns = years.len();

    let values = rows.iter().flat_map(|(_, row)| row.iter().flatten().copied());
    let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    let shade = |v: f64| {
        let t = if max > min { (v - min) / (max - min) } else { 0.5 };
        interpolate(&YL_GN_BU, t)
    };

    let width = LEFT + CELL_WIDTH * columns as f64 + RIGHT;
    let height = TOP + CELL_HEIGHT * rows.len().max(1) as f64 + BOTTOM;
    let grid_right = LEFT + CELL_WIDTH * columns as f64;
    let grid_bottom = TOP + CELL_HEIGHT * rows.len() as f64;

    let mut out = String::new();
    svg_open(&mut out, width, height);
    text(&mut out, width / 2.0, 26.0, 16, "middle", "Life Expectancy by Area and Year");
    if let Some(stats) = stats {
        text(
            &mut out,
            width / 2.0,
            48.0,
            13,
            "middle",
            &format!(
                "(ANOVA by Area: p = {}, ANOVA by Year: p = {})",
                format_p(stats.anova_by_area.p_value),
                format_p(stats.anova_by_year.p_value)
            ),
        );
    }

    for (r, (abbreviation, row)) in rows.iter().enumerate() {
        let cy = TOP + CELL_HEIGHT * r as f64;
        text(&mut out, LEFT - 10.0, cy + CELL_HEIGHT / 2.0 + 4.0, 12, "end", abbreviation);

        for (c, value) in row.iter().enumerate() {
            let cx = LEFT + CELL_WIDTH * c as f64;
            let Some(value) = value else {
                let _ = writeln!(
                    out,
                    r##"<rect x="{cx:.1}" y="{cy:.1}" width="{CELL_WIDTH}" height="{CELL_HEIGHT}" fill="#f0f0f0" stroke="white" stroke-width="1"/>"##
                );
                continue;
            };
            let fill = shade(*value);
            let ink = if luminance(&fill) < 0.5 { "white" } else { "black" };
            let _ = writeln!(
                out,
                r#"<rect x="{cx:.1}" y="{cy:.1}" width="{CELL_WIDTH}" height="{CELL_HEIGHT}" fill="{fill}" stroke="white" stroke-width="1"/>"#
            );
            let _ = writeln!(
                out,
                r#"<text x="{:.1}" y="{:.1}" font-size="12" text-anchor="middle" fill="{ink}">{value:.1}</text>"#,
                cx + CELL_WIDTH / 2.0,
                cy + CELL_HEIGHT / 2.0 + 4.0
            );
        }
    }

    for (c, year) in years.iter().enumerate() {
        let cx = LEFT + CELL_WIDTH * (c as f64 + 0.5);
        text(&mut out, cx, grid_bottom + 18.0, 12, "middle", &year.to_string());
    }
    text(&mut out, (LEFT + grid_right) / 2.0, grid_bottom + 45.0, 12, "middle", "Year");
    vertical_text(&mut out, 20.0, (TOP + grid_bottom) / 2.0, 12, "Area");

    // Colour bar
    if min.is_finite() {
        let bar_x = grid_right + 25.0;
        let steps = 20;
        let step_h = (grid_bottom - TOP) / steps as f64;
        for i in 0..steps {
            let t = 1.0 - i as f64 / (steps - 1) as f64;
            let _ = writeln!(
                out,
                r#"<rect x="{bar_x:.1}" y="{:.1}" width="16" height="{:.1}" fill="{}"/>"#,
                TOP + step_h * i as f64,
                step_h + 0.5,
                interpolate(&YL_GN_BU, t)
            );
        }
        text(&mut out, bar_x + 20.0, TOP + 10.0, 10, "start", &format!("{max:.1}"));
        text(&mut out, bar_x + 20.0, grid_bottom, 10, "start", &format!("{min:.1}"));
    }

    svg_close(&mut out);
    out
}

fn format_p(p: Option<f64>) -> String {
    match p {
        Some(p) => format!("{p:.3}"),
        None => "n/a".to_string(),
    }
}
