//! Chart rendering.
//!
//! Every renderer is a pure function from pipeline outputs to an SVG or
//! HTML document. Writing the documents to disk is left to the caller.

pub mod bar_chart;
pub mod bubble_map;
pub mod heatmap;
pub mod line_chart;

pub use bar_chart::bar_chart;
pub use bubble_map::bubble_map;
pub use heatmap::heatmap;
pub use line_chart::line_chart;

use anyhow::{Context, Result};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

pub const GLOBAL_CHART_FILE: &str = "global_average_life_expectancy.svg";
pub const AREA_CHART_FILE: &str = "area_average_life_expectancy.svg";
pub const ANIMATION_FILE: &str = "life_expectancy_animation.html";
pub const HEATMAP_FILE: &str = "heatmap.svg";

const FONT: &str = "Helvetica, Arial, sans-serif";

/// Yellow-orange-brown, light to dark.
pub const YL_OR_BR: [&str; 9] = [
    "#ffffe5", "#fff7bc", "#fee391", "#fec44f", "#fe9929", "#ec7014", "#cc4c02", "#993404",
    "#662506",
];

/// Yellow-green-blue, light to dark.
pub const YL_GN_BU: [&str; 9] = [
    "#ffffd9", "#edf8b1", "#c7e9b4", "#7fcdbb", "#41b6c4", "#1d91c0", "#225ea8", "#253494",
    "#081d58",
];

/// Write a rendered document into `dir`, returning its path.
pub fn write_artifact(dir: &Path, file_name: &str, content: &str) -> Result<PathBuf> {
    let path = dir.join(file_name);
    std::fs::write(&path, content)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

/// Linear map from a data interval onto a pixel interval.
#[derive(Debug, Clone, Copy)]
pub(crate) struct LinearScale {
    domain: (f64, f64),
    range: (f64, f64),
}

impl LinearScale {
    /// A zero-width domain is widened by one unit on each side.
    pub(crate) fn new(domain: (f64, f64), range: (f64, f64)) -> Self {
        let domain = if (domain.1 - domain.0).abs() < f64::EPSILON {
            (domain.0 - 1.0, domain.1 + 1.0)
        } else {
            domain
        };
        Self { domain, range }
    }

    pub(crate) fn map(&self, value: f64) -> f64 {
        let t = (value - self.domain.0) / (self.domain.1 - self.domain.0);
        self.range.0 + t * (self.range.1 - self.range.0)
    }
}

/// Round step size (1, 2 or 5 times a power of ten) giving about `count` ticks.
pub(crate) fn nice_step(min: f64, max: f64, count: usize) -> f64 {
    let span = (max - min).abs();
    if span == 0.0 || !span.is_finite() {
        return 1.0;
    }
    let raw = span / count.max(1) as f64;
    let magnitude = 10f64.powf(raw.log10().floor());
    let residual = raw / magnitude;
    let factor = if residual <= 1.0 {
        1.0
    } else if residual <= 2.0 {
        2.0
    } else if residual <= 5.0 {
        5.0
    } else {
        10.0
    };
    factor * magnitude
}

/// Expand `(min, max)` outward to multiples of a nice step, returning the ticks.
pub(crate) fn nice_ticks(min: f64, max: f64, count: usize) -> Vec<f64> {
    let step = nice_step(min, max, count);
    let start = (min / step).floor() * step;
    let end = (max / step).ceil() * step;
    let n = ((end - start) / step).round() as usize;
    (0..=n).map(|i| start + i as f64 * step).collect()
}

/// Colour at `t` in `[0, 1]` along a sequential palette.
pub(crate) fn interpolate(palette: &[&str], t: f64) -> String {
    let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
    let last = palette.len().saturating_sub(1);
    if last == 0 {
        return palette.first().copied().unwrap_or("#000000").to_string();
    }

    let pos = t * last as f64;
    let lo = (pos.floor() as usize).min(last);
    let hi = (lo + 1).min(last);
    let frac = pos - lo as f64;

    let (r1, g1, b1) = parse_hex(palette[lo]);
    let (r2, g2, b2) = parse_hex(palette[hi]);
    let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * frac).round() as u8;
    format!("#{:02x}{:02x}{:02x}", mix(r1, r2), mix(g1, g2), mix(b1, b2))
}

fn parse_hex(colour: &str) -> (u8, u8, u8) {
    let hex = colour.trim_start_matches('#');
    let channel = |i: usize| {
        hex.get(i..i + 2)
            .and_then(|c| u8::from_str_radix(c, 16).ok())
            .unwrap_or(0)
    };
    (channel(0), channel(2), channel(4))
}

/// Relative luminance in `[0, 1]`, for picking a readable label colour.
pub(crate) fn luminance(colour: &str) -> f64 {
    let (r, g, b) = parse_hex(colour);
    (0.299 * r as f64 + 0.587 * g as f64 + 0.114 * b as f64) / 255.0
}

pub(crate) fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

pub(crate) fn svg_open(out: &mut String, width: f64, height: f64) {
    let _ = writeln!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}" font-family="{FONT}">"#
    );
    let _ = writeln!(
        out,
        r#"<rect width="{width}" height="{height}" fill="white"/>"#
    );
}

pub(crate) fn svg_close(out: &mut String) {
    out.push_str("</svg>\n");
}

/// Text element; `anchor` is `start`, `middle` or `end`.
pub(crate) fn text(out: &mut String, x: f64, y: f64, size: u32, anchor: &str, content: &str) {
    let _ = writeln!(
        out,
        r#"<text x="{x:.1}" y="{y:.1}" font-size="{size}" text-anchor="{anchor}">{}</text>"#,
        escape(content)
    );
}

/// Text rotated -90 degrees around its anchor point.
pub(crate) fn vertical_text(out: &mut String, x: f64, y: f64, size: u32, content: &str) {
    let _ = writeln!(
        out,
        r#"<text x="{x:.1}" y="{y:.1}" font-size="{size}" text-anchor="middle" transform="rotate(-90 {x:.1} {y:.1})">{}</text>"#,
        escape(content)
    );
}

pub(crate) fn line(out: &mut String, x1: f64, y1: f64, x2: f64, y2: f64, style: &str) {
    let _ = writeln!(
        out,
        r#"<line x1="{x1:.1}" y1="{y1:.1}" x2="{x2:.1}" y2="{y2:.1}" {style}/>"#
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_linear_scale() {
        let scale = LinearScale::new((0.0, 10.0), (100.0, 0.0));
        assert_eq!(scale.map(0.0), 100.0);
        assert_eq!(scale.map(5.0), 50.0);

        // Degenerate domain still maps to a finite value.
        let flat = LinearScale::new((3.0, 3.0), (0.0, 10.0));
        assert_eq!(flat.map(3.0), 5.0);
    }

    #[test]
    fn test_nice_ticks() {
        assert_eq!(nice_ticks(0.0, 80.0, 4), vec![0.0, 20.0, 40.0, 60.0, 80.0]);

        let ticks = nice_ticks(61.3, 78.9, 5);
        assert_eq!(ticks.first(), Some(&60.0));
        assert_eq!(ticks.last(), Some(&80.0));
    }

    #[test]
    fn test_interpolate_endpoints() {
        assert_eq!(interpolate(&YL_OR_BR, 0.0), "#ffffe5");
        assert_eq!(interpolate(&YL_OR_BR, 1.0), "#662506");
        assert_eq!(interpolate(&YL_OR_BR, 2.0), "#662506");
        assert_eq!(interpolate(&["#000000", "#ffffff"], 0.5), "#808080");
    }

    #[test]
    fn test_luminance() {
        assert!(luminance("#ffffff") > 0.99);
        assert!(luminance("#081d58") < 0.2);
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape("A & <B>"), "A &amp; &lt;B&gt;");
    }

    #[test]
    fn test_write_artifact() {
        let dir = TempDir::new().unwrap();
        let path = write_artifact(dir.path(), HEATMAP_FILE, "<svg/>").unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "<svg/>");
    }
}
