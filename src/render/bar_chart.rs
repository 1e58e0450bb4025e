//! Grouped bar charts of area life expectancy, one panel per year.

use super::{line, nice_ticks, svg_close, svg_open, text, vertical_text, LinearScale};
use crate::config::RenderConfig;
use crate::models::{AreaRegistry, FlatRecord, Gender, Source, YearRange};
use crate::pipeline::regroup;
use std::fmt::Write as _;

const COLUMNS: usize = 3;
const PANEL_WIDTH: f64 = 420.0;
const PANEL_HEIGHT: f64 = 330.0;
const HEADER: f64 = 60.0;
const PAD_LEFT: f64 = 60.0;
const PAD_RIGHT: f64 = 15.0;
const PAD_TOP: f64 = 35.0;
const PAD_BOTTOM: f64 = 70.0;
/// Bar width as a fraction of one area slot.
const BAR_WIDTH: f64 = 0.25;

/// Render one grouped bar panel per year in a three-column grid.
///
/// Panels share a y axis starting at zero. Genders absent from `records`
/// leave a gap rather than a zero-height bar.
pub fn bar_chart(
    records: &[FlatRecord],
    registry: &AreaRegistry,
    render: &RenderConfig,
    years: YearRange,
) -> String {
    let map = regroup(Source::LifeExpectancy, records, registry.names());
    let areas: Vec<_> = registry.iter().collect();
    let genders: Vec<Gender> = Gender::ALL
        .into_iter()
        .filter(|g| records.iter().any(|r| r.gender == *g))
        .collect();

    let max = records
        .iter()
        .filter(|r| years.contains(r.year) && r.life_expectancy.is_finite())
        .map(|r| r.life_expectancy)
        .fold(0.0, f64::max);
    let ticks = nice_ticks(0.0, if max > 0.0 { max } else { 100.0 }, 5);
    let y_max = ticks.last().copied().unwrap_or(100.0);

    let rows = years.len().div_ceil(COLUMNS).max(1);
    let width = PANEL_WIDTH * COLUMNS as f64;
    let height = HEADER + PANEL_HEIGHT * rows as f64;

    let mut out = String::new();
    svg_open(&mut out, width, height);
    text(&mut out, width / 2.0, 28.0, 18, "middle", &format!("Life Expectancy by Area ({years})"));

    // Legend
    for (i, gender) in genders.iter().enumerate() {
        let lx = width / 2.0 - 120.0 + i as f64 * 90.0;
        let _ = writeln!(
            out,
            r#"<rect x="{lx:.1}" y="40" width="14" height="14" fill="{}" fill-opacity="0.7"/>"#,
            render.colour(*gender)
        );
        text(&mut out, lx + 20.0, 52.0, 12, "start", gender.label());
    }

    for (panel, year) in years.iter().enumerate() {
        let ox = PANEL_WIDTH * (panel % COLUMNS) as f64;
        let oy = HEADER + PANEL_HEIGHT * (panel / COLUMNS) as f64;
        let left = ox + PAD_LEFT;
        let right = ox + PANEL_WIDTH - PAD_RIGHT;
        let top = oy + PAD_TOP;
        let bottom = oy + PANEL_HEIGHT - PAD_BOTTOM;

        let y = LinearScale::new((0.0, y_max), (bottom, top));
        let slot = (right - left) / areas.len().max(1) as f64;
        let bar = slot * BAR_WIDTH;

        text(
            &mut out,
            (left + right) / 2.0,
            oy + 22.0,
            13,
            "middle",
            &format!("Life Expectancy by Area ({year})"),
        );

        for tick in &ticks {
            let ty = y.map(*tick);
            line(
                &mut out,
                left,
                ty,
                right,
                ty,
                r##"stroke="#cccccc" stroke-dasharray="4 3""##,
            );
            text(&mut out, left - 6.0, ty + 4.0, 10, "end", &format!("{tick:.0}"));
        }
        line(&mut out, left, bottom, right, bottom, r#"stroke="black""#);
        line(&mut out, left, top, left, bottom, r#"stroke="black""#);
        vertical_text(&mut out, ox + 16.0, (top + bottom) / 2.0, 11, "Life Expectancy (years)");

        for (i, area) in areas.iter().enumerate() {
            let centre = left + slot * (i as f64 + 0.5);

            for (j, gender) in Gender::ALL.iter().enumerate() {
                let Some(value) = map
                    .get(&area.name, *gender, year)
                    .filter(|v| v.is_finite())
                else {
                    continue;
                };
                let bx = centre + (j as f64 - 1.0) * bar - bar / 2.0;
                let by = y.map(value.max(0.0));
                let _ = writeln!(
                    out,
                    r#"<rect x="{bx:.1}" y="{by:.1}" width="{bar:.1}" height="{:.1}" fill="{}" fill-opacity="0.7"><title>{} {} {year}: {value:.1}</title></rect>"#,
                    bottom - by,
                    render.colour(*gender),
                    super::escape(&area.name),
                    gender.label()
                );
            }

            let label = area.abbreviation();
            let _ = writeln!(
                out,
                r#"<text x="{centre:.1}" y="{:.1}" font-size="10" text-anchor="end" transform="rotate(-45 {centre:.1} {:.1})">{}</text>"#,
                bottom + 14.0,
                bottom + 14.0,
                super::escape(label)
            );
        }
    }

    svg_close(&mut out);
    out
}
