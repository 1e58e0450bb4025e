//! Animated bubble map of regional life expectancy.
//!
//! Areas are placed with an equirectangular projection. Each year becomes
//! one animation frame; a play button and a slider step through them.

use super::{escape, interpolate, YL_OR_BR};
use crate::models::{AreaRegistry, FlatRecord, Gender, YearRange};
use anyhow::Result;
use serde::Serialize;

const MAP_WIDTH: f64 = 960.0;
const MAP_HEIGHT: f64 = 480.0;
/// Largest bubble diameter in pixels.
const SIZE_MAX: f64 = 40.0;

#[derive(Debug, Clone, Serialize)]
struct Bubble {
    area: String,
    abbreviation: String,
    x: f64,
    y: f64,
    radius: f64,
    colour: String,
    life_expectancy: f64,
    /// Min-max scaled life expectancy in `[0, 100]`.
    size: f64,
}

#[derive(Debug, Clone, Serialize)]
struct Frame {
    year: i32,
    bubbles: Vec<Bubble>,
}

fn project(lat: f64, lon: f64) -> (f64, f64) {
    let x = (lon + 180.0) / 360.0 * MAP_WIDTH;
    let y = (90.0 - lat) / 180.0 * MAP_HEIGHT;
    (x, y)
}

/// Min-max scaling onto `[0, 100]`. A flat range maps everything to 100.
fn scaled_size(value: f64, min: f64, max: f64) -> f64 {
    if max > min {
        (value - min) / (max - min) * 100.0
    } else {
        100.0
    }
}

fn frames(
    records: &[FlatRecord],
    registry: &AreaRegistry,
    years: YearRange,
    gender: Gender,
) -> Vec<Frame> {
    let rows: Vec<&FlatRecord> = records
        .iter()
        .filter(|r| r.gender == gender && years.contains(r.year))
        .filter(|r| r.life_expectancy.is_finite())
        .filter(|r| registry.get(&r.area).is_some_and(|a| !a.aggregate))
        .collect();

    let min = rows.iter().map(|r| r.life_expectancy).fold(f64::INFINITY, f64::min);
    let max = rows
        .iter()
        .map(|r| r.life_expectancy)
        .fold(f64::NEG_INFINITY, f64::max);

    years
        .iter()
        .map(|year| {
            let bubbles = registry
                .regions()
                .filter_map(|area| {
                    let row = rows.iter().find(|r| r.year == year && r.area == area.name)?;
                    let size = scaled_size(row.life_expectancy, min, max);
                    let (x, y) = project(area.lat, area.lon);
                    Some(Bubble {
                        area: area.name.clone(),
                        abbreviation: area.abbreviation().to_string(),
                        x,
                        y,
                        radius: (SIZE_MAX / 2.0 * (size / 100.0).sqrt()).max(2.0),
                        colour: interpolate(&YL_OR_BR, size / 100.0),
                        life_expectancy: row.life_expectancy,
                        size,
                    })
                })
                .collect();
            Frame { year, bubbles }
        })
        .collect()
}

/// Render a self-contained HTML page animating the selected gender's rows.
///
/// Aggregate areas are left off the map.
pub fn bubble_map(
    records: &[FlatRecord],
    registry: &AreaRegistry,
    years: YearRange,
    gender: Gender,
) -> Result<String> {
    let frames = frames(records, registry, years, gender);
    // Keep the payload from closing the script element early.
    let data = serde_json::to_string(&frames)?.replace("</", "<\\/");
    let title = format!(
        "Life Expectancy by WHO Region ({years}, {})",
        gender.label()
    );

    let mut graticule = String::new();
    for lon in (-150..=150).step_by(30) {
        let (x, _) = project(0.0, lon as f64);
        graticule.push_str(&format!(
            r##"<line x1="{x:.1}" y1="0" x2="{x:.1}" y2="{MAP_HEIGHT}" stroke="#d0dde6"/>"##
        ));
    }
    for lat in (-60..=60).step_by(30) {
        let (_, y) = project(lat as f64, 0.0);
        graticule.push_str(&format!(
            r##"<line x1="0" y1="{y:.1}" x2="{MAP_WIDTH}" y2="{y:.1}" stroke="#d0dde6"/>"##
        ));
    }

    let legend: Vec<String> = (0..=8)
        .map(|i| {
            format!(
                r#"<span style="background:{}"></span>"#,
                interpolate(&YL_OR_BR, i as f64 / 8.0)
            )
        })
        .collect();

    let last_frame = frames.len().saturating_sub(1);
    let title = escape(&title);
    let legend = legend.join("");

    Ok(format!(
        r##"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{title}</title>
<style>
body {{ font-family: Helvetica, Arial, sans-serif; margin: 24px; }}
#map {{ background: #eef4f8; border: 1px solid #c8d6e0; }}
#controls {{ margin-top: 12px; display: flex; align-items: center; gap: 12px; }}
#scale span {{ display: inline-block; width: 24px; height: 12px; }}
</style>
</head>
<body>
<h2>{title}</h2>
<svg id="map" xmlns="http://www.w3.org/2000/svg" width="{MAP_WIDTH}" height="{MAP_HEIGHT}" viewBox="0 0 {MAP_WIDTH} {MAP_HEIGHT}">
{graticule}
<g id="bubbles"></g>
</svg>
<div id="controls">
<button id="play">Play</button>
<input id="slider" type="range" min="0" max="{last_frame}" value="0" step="1">
<span id="year"></span>
</div>
<div id="scale">Life expectancy (low to high) {legend}</div>
<script>
const frames = {data};
const svgNs = "http://www.w3.org/2000/svg";
const layer = document.getElementById("bubbles");
const slider = document.getElementById("slider");
const label = document.getElementById("year");
const button = document.getElementById("play");
let timer = null;

function draw(index) {{
  const frame = frames[index];
  if (!frame) {{ return; }}
  layer.replaceChildren();
  for (const b of frame.bubbles) {{
    const circle = document.createElementNS(svgNs, "circle");
    circle.setAttribute("cx", b.x);
    circle.setAttribute("cy", b.y);
    circle.setAttribute("r", b.radius);
    circle.setAttribute("fill", b.colour);
    circle.setAttribute("fill-opacity", "0.85");
    circle.setAttribute("stroke", "#663300");
    const tip = document.createElementNS(svgNs, "title");
    tip.textContent = b.area + ": " + b.life_expectancy.toFixed(1);
    circle.appendChild(tip);
    layer.appendChild(circle);
    const text = document.createElementNS(svgNs, "text");
    text.setAttribute("x", b.x);
    text.setAttribute("y", b.y - b.radius - 4);
    text.setAttribute("text-anchor", "middle");
    text.setAttribute("font-size", "11");
    text.textContent = b.abbreviation;
    layer.appendChild(text);
  }}
  slider.value = index;
  label.textContent = frame.year;
}}

function stop() {{
  clearInterval(timer);
  timer = null;
  button.textContent = "Play";
}}

button.addEventListener("click", () => {{
  if (timer) {{ stop(); return; }}
  button.textContent = "Pause";
  timer = setInterval(() => {{
    const next = Number(slider.value) + 1;
    if (next >= frames.length) {{ stop(); return; }}
    draw(next);
  }}, 800);
}});
slider.addEventListener("input", () => {{ stop(); draw(Number(slider.value)); }});
draw(0);
</script>
</body>
</html>
"##
    ))
}
