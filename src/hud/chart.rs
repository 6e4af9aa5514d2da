//! Chart sections: option merging, deferred plotting and color parsing.
//!
//! Chart data uses the Chart.js shape (`labels` plus `datasets`). A chart node
//! starts pending; the window manager queues a [`PlotTicket`] for it and the
//! plot is computed on the next idle tick, once per node.

use std::collections::VecDeque;

use ratatui::style::Color;
use serde_json::{Map, Value, json};

use super::render::NodeKey;
use super::section::{ChartData, display_value};
use crate::window::{Liveness, WindowId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChartKind {
    Line,
    Bar,
    Scatter,
    /// A kind the terminal cannot draw natively (pie, radar, ...); drawn as bars.
    Other(String),
}

impl ChartKind {
    pub fn from_type(chart_type: Option<&str>) -> Self {
        match chart_type.map(str::trim) {
            None | Some("") | Some("line") => Self::Line,
            Some("bar") => Self::Bar,
            Some("scatter") => Self::Scatter,
            Some(other) => Self::Other(other.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Line => "line",
            Self::Bar => "bar",
            Self::Scatter => "scatter",
            Self::Other(name) => name,
        }
    }

    pub fn draws_as_bars(&self) -> bool {
        matches!(self, Self::Bar | Self::Other(_))
    }
}

/// Fixed styling every chart starts from.
pub fn default_chart_options() -> Map<String, Value> {
    let axis = json!({
        "ticks": { "color": "#0ff" },
        "grid": { "color": "rgba(0, 255, 255, 0.1)" }
    });
    let defaults = json!({
        "responsive": true,
        "maintainAspectRatio": true,
        "plugins": { "legend": { "labels": { "color": "#0ff" } } },
        "scales": { "x": axis.clone(), "y": axis }
    });
    match defaults {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Shallow merge: a caller key replaces the default key wholesale.
pub fn merge_options(
    mut defaults: Map<String, Value>,
    overrides: Option<&Map<String, Value>>,
) -> Map<String, Value> {
    if let Some(overrides) = overrides {
        for (key, value) in overrides {
            defaults.insert(key.clone(), value.clone());
        }
    }
    defaults
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub data: Value,
    pub options: Map<String, Value>,
}

impl ChartSpec {
    pub fn from_data(data: &ChartData) -> Self {
        let chart_data = match &data.chart_data {
            Value::Null => Value::Object(Map::new()),
            other => other.clone(),
        };
        Self {
            kind: ChartKind::from_type(data.chart_type.as_deref()),
            data: chart_data,
            options: merge_options(default_chart_options(), data.options.as_ref()),
        }
    }

    fn option_color(&self, path: &[&str]) -> Option<Color> {
        let mut cursor = self.options.get(*path.first()?)?;
        for segment in &path[1..] {
            cursor = cursor.get(segment)?;
        }
        cursor.as_str().and_then(parse_color)
    }

    fn legend_visible(&self) -> bool {
        let display = self
            .options
            .get("plugins")
            .and_then(|plugins| plugins.get("legend"))
            .and_then(|legend| legend.get("display"))
            .and_then(Value::as_bool);
        display.unwrap_or(true)
    }
}

/// A chart section's node: pending until plotted.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartNode {
    pub key: NodeKey,
    pub spec: ChartSpec,
    pub plot: Option<PlottedChart>,
}

impl ChartNode {
    pub fn pending(key: NodeKey, spec: ChartSpec) -> Self {
        Self {
            key,
            spec,
            plot: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.plot.is_none()
    }

    /// Plot the chart if it has not been plotted yet. Returns whether a plot
    /// happened.
    pub fn resolve(&mut self) -> bool {
        if self.plot.is_some() {
            return false;
        }
        self.plot = Some(plot(&self.spec));
        true
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub label: String,
    pub points: Vec<(f64, f64)>,
    pub color: Option<Color>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ChartStyle {
    pub show_legend: bool,
    pub legend: Option<Color>,
    pub x_ticks: Option<Color>,
    pub y_ticks: Option<Color>,
    pub grid: Option<Color>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlottedChart {
    pub kind: ChartKind,
    pub labels: Vec<String>,
    pub series: Vec<Series>,
    pub x_bounds: [f64; 2],
    pub y_bounds: [f64; 2],
    pub style: ChartStyle,
}

pub fn plot(spec: &ChartSpec) -> PlottedChart {
    let labels: Vec<String> = spec
        .data
        .get("labels")
        .and_then(Value::as_array)
        .map(|labels| labels.iter().map(display_value).collect())
        .unwrap_or_default();
    let series: Vec<Series> = spec
        .data
        .get("datasets")
        .and_then(Value::as_array)
        .map(|datasets| {
            datasets
                .iter()
                .enumerate()
                .map(|(index, dataset)| series_from_dataset(index, dataset))
                .collect()
        })
        .unwrap_or_default();

    let points = series.iter().flat_map(|series| series.points.iter());
    let (mut x_bounds, mut y_bounds) = bounds(points);
    if spec.kind.draws_as_bars() {
        y_bounds[0] = y_bounds[0].min(0.0);
    }
    if !labels.is_empty() {
        x_bounds[1] = x_bounds[1].max((labels.len() - 1) as f64);
    }

    PlottedChart {
        kind: spec.kind.clone(),
        labels,
        series,
        x_bounds: widen(x_bounds),
        y_bounds: widen(y_bounds),
        style: ChartStyle {
            show_legend: spec.legend_visible(),
            legend: spec.option_color(&["plugins", "legend", "labels", "color"]),
            x_ticks: spec.option_color(&["scales", "x", "ticks", "color"]),
            y_ticks: spec.option_color(&["scales", "y", "ticks", "color"]),
            grid: spec.option_color(&["scales", "y", "grid", "color"]),
        },
    }
}

fn series_from_dataset(index: usize, dataset: &Value) -> Series {
    let label = dataset
        .get("label")
        .map(display_value)
        .filter(|label| !label.is_empty())
        .unwrap_or_else(|| format!("Series {}", index + 1));
    let points = dataset
        .get("data")
        .and_then(Value::as_array)
        .map(|data| {
            data.iter()
                .enumerate()
                .filter_map(|(position, point)| match point {
                    Value::Number(number) => number.as_f64().map(|y| (position as f64, y)),
                    Value::Object(point) => {
                        let y = point.get("y").and_then(Value::as_f64)?;
                        let x = point
                            .get("x")
                            .and_then(Value::as_f64)
                            .unwrap_or(position as f64);
                        Some((x, y))
                    }
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default();
    let color = ["borderColor", "backgroundColor"]
        .iter()
        .filter_map(|key| dataset.get(*key))
        .filter_map(|value| match value {
            Value::String(color) => Some(color.as_str()),
            Value::Array(colors) => colors.first().and_then(Value::as_str),
            _ => None,
        })
        .find_map(parse_color);
    Series {
        label,
        points,
        color,
    }
}

fn bounds<'a>(points: impl Iterator<Item = &'a (f64, f64)>) -> ([f64; 2], [f64; 2]) {
    let mut x = [f64::INFINITY, f64::NEG_INFINITY];
    let mut y = [f64::INFINITY, f64::NEG_INFINITY];
    for &(px, py) in points {
        x = [x[0].min(px), x[1].max(px)];
        y = [y[0].min(py), y[1].max(py)];
    }
    if !x[0].is_finite() {
        return ([0.0, 1.0], [0.0, 1.0]);
    }
    (x, y)
}

fn widen(range: [f64; 2]) -> [f64; 2] {
    if range[1] > range[0] {
        range
    } else {
        [range[0] - 1.0, range[0] + 1.0]
    }
}

/// Parse a CSS-style color: `#rgb`, `#rrggbb`, `rgb(..)`, `rgba(..)` or a
/// common name. Alpha is applied against a black background.
pub fn parse_color(input: &str) -> Option<Color> {
    let input = input.trim();
    if let Some(hex) = input.strip_prefix('#') {
        return parse_hex(hex);
    }
    let lower = input.to_ascii_lowercase();
    if let Some(args) = lower
        .strip_prefix("rgba(")
        .or_else(|| lower.strip_prefix("rgb("))
        .and_then(|rest| rest.strip_suffix(')'))
    {
        let parts: Vec<&str> = args.split(',').map(str::trim).collect();
        if parts.len() < 3 {
            return None;
        }
        let channel = |part: &str| part.parse::<f64>().ok().map(|v| v.clamp(0.0, 255.0));
        let alpha = match parts.get(3) {
            Some(alpha) => alpha.parse::<f64>().ok()?.clamp(0.0, 1.0),
            None => 1.0,
        };
        let [r, g, b] = [channel(parts[0])?, channel(parts[1])?, channel(parts[2])?];
        let scale = |value: f64| (value * alpha).round() as u8;
        return Some(Color::Rgb(scale(r), scale(g), scale(b)));
    }
    let named = match lower.as_str() {
        "black" => Color::Black,
        "white" => Color::White,
        "red" => Color::Red,
        "green" => Color::Green,
        "blue" => Color::Blue,
        "cyan" | "aqua" => Color::Cyan,
        "magenta" | "fuchsia" => Color::Magenta,
        "yellow" => Color::Yellow,
        "gray" | "grey" => Color::Gray,
        "orange" => Color::Rgb(255, 165, 0),
        _ => return None,
    };
    Some(named)
}

fn parse_hex(hex: &str) -> Option<Color> {
    let digits: Vec<u8> = hex
        .chars()
        .map(|ch| ch.to_digit(16).map(|digit| digit as u8))
        .collect::<Option<_>>()?;
    match digits.as_slice() {
        [r, g, b] => Some(Color::Rgb(r * 17, g * 17, b * 17)),
        [r1, r2, g1, g2, b1, b2] | [r1, r2, g1, g2, b1, b2, _, _] => Some(Color::Rgb(
            r1 * 16 + r2,
            g1 * 16 + g2,
            b1 * 16 + b2,
        )),
        _ => None,
    }
}

/// A queued plot for one chart node in one window.
#[derive(Debug, Clone)]
pub struct PlotTicket {
    pub window: WindowId,
    pub node: NodeKey,
    pub liveness: Liveness,
}

#[derive(Debug, Default)]
pub struct PlotQueue {
    tickets: VecDeque<PlotTicket>,
}

impl PlotQueue {
    pub fn push(&mut self, ticket: PlotTicket) {
        self.tickets.push_back(ticket);
    }

    pub fn drain(&mut self) -> Vec<PlotTicket> {
        self.tickets.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.tickets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickets.is_empty()
    }
}
