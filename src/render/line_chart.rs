//! Global weighted life expectancy over time, one line per gender.

use super::{line, nice_ticks, svg_close, svg_open, text, vertical_text, LinearScale};
use crate::config::RenderConfig;
use crate::models::{GlobalPoint, GlobalSeries, YearRange};
use std::fmt::Write as _;

const WIDTH: f64 = 800.0;
const HEIGHT: f64 = 480.0;
const LEFT: f64 = 70.0;
const RIGHT: f64 = 130.0;
const TOP: f64 = 50.0;
const BOTTOM: f64 = 60.0;

/// Render the global series as an SVG line chart.
///
/// Undefined points break the line instead of being drawn as zero.
pub fn line_chart(global: &GlobalSeries, render: &RenderConfig, years: YearRange) -> String {
    let mut out = String::new();
    svg_open(&mut out, WIDTH, HEIGHT);

    text(
        &mut out,
        WIDTH / 2.0,
        TOP / 2.0 + 5.0,
        16,
        "middle",
        &format!("Global Average Life Expectancy ({years})"),
    );

    let defined: Vec<f64> = global
        .values()
        .flatten()
        .filter_map(|p| p.value)
        .filter(|v| v.is_finite())
        .collect();
    let (lo, hi) = match (
        defined.iter().copied().reduce(f64::min),
        defined.iter().copied().reduce(f64::max),
    ) {
        (Some(lo), Some(hi)) => (lo - 1.0, hi + 1.0),
        _ => (0.0, 100.0),
    };
    let ticks = nice_ticks(lo, hi, 5);
    let y_min = ticks.first().copied().unwrap_or(lo);
    let y_max = ticks.last().copied().unwrap_or(hi);

    let x = LinearScale::new(
        (years.start as f64, years.end as f64),
        (LEFT, WIDTH - RIGHT),
    );
    let y = LinearScale::new((y_min, y_max), (HEIGHT - BOTTOM, TOP));

    // Grid and axes.
    for tick in &ticks {
        let ty = y.map(*tick);
        line(&mut out, LEFT, ty, WIDTH - RIGHT, ty, r##"stroke="#dddddd""##);
        text(&mut out, LEFT - 8.0, ty + 4.0, 11, "end", &format!("{tick:.0}"));
    }
    for year in years.iter() {
        let tx = x.map(year as f64);
        line(&mut out, tx, TOP, tx, HEIGHT - BOTTOM, r##"stroke="#dddddd""##);
        text(&mut out, tx, HEIGHT - BOTTOM + 18.0, 11, "middle", &year.to_string());
    }
    line(
        &mut out,
        LEFT,
        HEIGHT - BOTTOM,
        WIDTH - RIGHT,
        HEIGHT - BOTTOM,
        r#"stroke="black""#,
    );
    line(&mut out, LEFT, TOP, LEFT, HEIGHT - BOTTOM, r#"stroke="black""#);
    text(&mut out, (LEFT + WIDTH - RIGHT) / 2.0, HEIGHT - 15.0, 12, "middle", "Year");
    vertical_text(&mut out, 20.0, (TOP + HEIGHT - BOTTOM) / 2.0, 12, "Life Expectancy (years)");

    // One series per gender, legend on the right.
    for (i, (gender, points)) in global.iter().enumerate() {
        let colour = render.colour(*gender);
        for segment in segments(points, years) {
            let coords: Vec<String> = segment
                .iter()
                .map(|(year, v)| format!("{:.1},{:.1}", x.map(*year as f64), y.map(*v)))
                .collect();
            let _ = writeln!(
                out,
                r#"<polyline points="{}" fill="none" stroke="{colour}" stroke-width="2.5"/>"#,
                coords.join(" ")
            );
            for (year, v) in &segment {
                let _ = writeln!(
                    out,
                    r#"<circle cx="{:.1}" cy="{:.1}" r="4" fill="{colour}"><title>{} {year}: {v:.2}</title></circle>"#,
                    x.map(*year as f64),
                    y.map(*v),
                    gender.label()
                );
            }
        }

        let ly = TOP + 20.0 + i as f64 * 22.0;
        let lx = WIDTH - RIGHT + 20.0;
        line(
            &mut out,
            lx,
            ly,
            lx + 24.0,
            ly,
            &format!(r#"stroke="{colour}" stroke-width="2.5""#),
        );
        text(&mut out, lx + 30.0, ly + 4.0, 12, "start", gender.label());
    }

    svg_close(&mut out);
    out
}

/// Runs of consecutive defined points within the year range.
fn segments(points: &[GlobalPoint], years: YearRange) -> Vec<Vec<(i32, f64)>> {
    let mut runs = Vec::new();
    let mut current = Vec::new();

    for point in points.iter().filter(|p| years.contains(p.year)) {
        match point.value.filter(|v| v.is_finite()) {
            Some(v) => current.push((point.year, v)),
            None => {
                if !current.is_empty() {
                    runs.push(std::mem::take(&mut current));
                }
            }
        }
    }
    if !current.is_empty() {
        runs.push(current);
    }

    runs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Gender;

    fn point(year: i32, value: Option<f64>) -> GlobalPoint {
        GlobalPoint {
            year,
            value,
            unweighted: value,
            contributing_areas: 1,
        }
    }

    fn series() -> GlobalSeries {
        let mut global = GlobalSeries::new();
        global.insert(
            Gender::Both,
            vec![
                point(2019, Some(72.0)),
                point(2020, Some(71.5)),
                point(2021, None),
                point(2022, Some(71.9)),
            ],
        );
        global.insert(Gender::Male, vec![point(2019, Some(69.8))]);
        global
    }

    #[test]
    fn test_segments_break_at_missing() {
        let runs = segments(&series()[&Gender::Both], YearRange::new(2019, 2022).unwrap());
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].len(), 2);
        assert_eq!(runs[1], vec![(2022, 71.9)]);
    }

    #[test]
    fn test_line_chart_document() {
        let years = YearRange::new(2019, 2022).unwrap();
        let svg = line_chart(&series(), &RenderConfig::default(), years);

        assert!(svg.starts_with("<svg"));
        assert!(svg.trim_end().ends_with("</svg>"));
        assert!(svg.contains("Global Average Life Expectancy (2019-2022)"));
        // Two runs for both, one for male.
        assert_eq!(svg.matches("<polyline").count(), 3);
        assert_eq!(svg.matches("<circle").count(), 4);
        assert!(svg.contains("#F4D0A2"));
        assert!(svg.contains(">Male</text>"));
    }

    #[test]
    fn test_line_chart_empty_series() {
        let svg = line_chart(&GlobalSeries::new(), &RenderConfig::default(), YearRange::default());
        assert!(svg.contains("</svg>"));
        assert!(!svg.contains("<polyline"));
    }
}
