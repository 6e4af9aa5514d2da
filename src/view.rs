//! Lays rendered sections out into terminal rows and paints window bodies.
//!
//! Layout is a pure function of the rendered sections and the body width, so
//! painting, natural sizing and link hit testing all agree on where things
//! land.

use std::ops::Range;
use std::sync::LazyLock;
use std::time::Instant;

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::symbols::Marker;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Axis, Bar, BarChart, BarGroup, Chart, Dataset, GraphType, LegendPosition};

use crate::hud::chart::{ChartKind, ChartNode, PlottedChart};
use crate::hud::render::{
    Placeholder, RenderNode, RenderedSection, TableNode, sanitize_text,
};
use crate::hud::section::PlaybackFlags;
use crate::linkifier::{Linkifier, link_style};
use crate::theme;
use crate::ui::{UiFrame, safe_set_string};
use crate::window::decorator::{ChromeState, WindowDecorator};
use crate::window::{Size, SizeBounds, Window};

/// Rows reserved for every chart, plotted or not.
pub const CHART_HEIGHT: u16 = 8;
pub const EMPTY_MESSAGE: &str = "No data to display";
const CHART_MIN_WIDTH: u16 = 30;
const CHART_LOADING: &str = "loading chart…";
const CHROME: u16 = 2;

static LINKIFIER: LazyLock<Linkifier> = LazyLock::new(Linkifier::new);

#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub text: String,
    pub style: Style,
    pub link: Option<String>,
}

impl Segment {
    fn new(text: impl Into<String>, style: Style) -> Self {
        Self {
            text: text.into(),
            style,
            link: None,
        }
    }

    fn link(text: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style: link_style(Style::default()),
            link: Some(url.into()),
        }
    }

    fn width(&self) -> usize {
        self.text.chars().count()
    }
}

enum Block<'a> {
    Line { segments: Vec<Segment>, wrap: bool },
    Chart(&'a ChartNode),
    Gap,
}

impl Block<'_> {
    fn wrapped(segments: Vec<Segment>) -> Self {
        Self::Line {
            segments,
            wrap: true,
        }
    }

    fn fixed(segments: Vec<Segment>) -> Self {
        Self::Line {
            segments,
            wrap: false,
        }
    }

    fn natural_width(&self) -> u16 {
        match self {
            Self::Line { segments, .. } => {
                let width: usize = segments.iter().map(Segment::width).sum();
                width.min(u16::MAX as usize) as u16
            }
            Self::Chart(_) => CHART_MIN_WIDTH,
            Self::Gap => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkHit {
    pub row: u16,
    pub columns: Range<u16>,
    pub url: String,
}

/// Rows of a window body at a fixed width.
#[derive(Debug, Default)]
pub struct BodyLayout<'a> {
    rows: Vec<Vec<Segment>>,
    charts: Vec<(u16, &'a ChartNode)>,
    links: Vec<LinkHit>,
}

impl<'a> BodyLayout<'a> {
    pub fn height(&self) -> u16 {
        self.rows.len().min(u16::MAX as usize) as u16
    }

    pub fn links(&self) -> &[LinkHit] {
        &self.links
    }

    /// Link under a body-relative cell, if any.
    pub fn link_at(&self, column: u16, row: u16) -> Option<&str> {
        self.links
            .iter()
            .find(|hit| hit.row == row && hit.columns.contains(&column))
            .map(|hit| hit.url.as_str())
    }

    /// Plain text of one row, for tests and the debug log.
    pub fn row_text(&self, row: usize) -> String {
        self.rows
            .get(row)
            .map(|segments| segments.iter().map(|s| s.text.as_str()).collect())
            .unwrap_or_default()
    }

    fn push_row(&mut self, segments: Vec<Segment>) {
        let row = self.height();
        let mut column = 0u16;
        for segment in &segments {
            let width = segment.width().min(u16::MAX as usize) as u16;
            if let Some(url) = &segment.link {
                self.links.push(LinkHit {
                    row,
                    columns: column..column.saturating_add(width),
                    url: url.clone(),
                });
            }
            column = column.saturating_add(width);
        }
        self.rows.push(segments);
    }

    fn paint(&self, frame: &mut UiFrame<'_>) {
        let area = frame.area();
        for (index, segments) in self.rows.iter().enumerate() {
            let y = area.y.saturating_add(index as u16);
            let mut x = area.x;
            let buffer = frame.buffer_mut();
            for segment in segments {
                safe_set_string(buffer, area, x, y, &segment.text, segment.style);
                x = x.saturating_add(segment.width() as u16);
            }
        }
        for (row, node) in &self.charts {
            let chart_area = Rect {
                x: area.x,
                y: area.y.saturating_add(*row),
                width: area.width,
                height: CHART_HEIGHT,
            };
            match &node.plot {
                Some(plot) => render_chart(frame, chart_area, plot),
                None => {
                    let style = Style::default().fg(theme::placeholder());
                    safe_set_string(
                        frame.buffer_mut(),
                        area,
                        chart_area.x,
                        chart_area.y,
                        CHART_LOADING,
                        style,
                    );
                }
            }
        }
    }
}

/// Lay sections out at `width` columns.
pub fn layout_body(sections: &[RenderedSection], width: u16) -> BodyLayout<'_> {
    let mut layout = BodyLayout::default();
    for block in blocks(sections) {
        match block {
            Block::Gap => layout.push_row(Vec::new()),
            Block::Chart(node) => {
                layout.charts.push((layout.height(), node));
                for _ in 0..CHART_HEIGHT {
                    layout.push_row(Vec::new());
                }
            }
            Block::Line { segments, wrap } => {
                if wrap {
                    for row in wrap_segments(segments, width) {
                        layout.push_row(row);
                    }
                } else {
                    layout.push_row(truncate_segments(segments, width));
                }
            }
        }
    }
    layout
}

/// Content-driven window size, chrome included, clamped into `bounds` and
/// never larger than `limit`.
pub fn natural_size(sections: &[RenderedSection], bounds: SizeBounds, limit: Size) -> Size {
    let content_width = blocks(sections)
        .iter()
        .map(Block::natural_width)
        .max()
        .unwrap_or(0);
    let width = bounds
        .clamp(Size {
            width: content_width.saturating_add(CHROME),
            height: 0,
        })
        .width
        .min(limit.width);
    let body_height = layout_body(sections, width.saturating_sub(CHROME)).height();
    let height = bounds
        .clamp(Size {
            width,
            height: body_height.saturating_add(CHROME),
        })
        .height
        .min(limit.height);
    Size { width, height }
}

/// Paint one window: chrome, scrolled body, then the fade-in dim.
pub fn paint_window(
    frame: &mut UiFrame<'_>,
    window: &Window,
    decorator: &dyn WindowDecorator,
    now: Instant,
) {
    let rect = window.rect();
    let body_style = Style::default()
        .bg(theme::window_bg())
        .fg(theme::window_fg());
    frame.fill(rect, body_style);
    decorator.render_window(
        frame,
        rect,
        window.title(),
        ChromeState {
            dragging: window.is_dragging(),
        },
    );
    let inner = decorator.inner(rect);
    if inner.width > 0 && inner.height > 0 {
        let layout = layout_body(window.rendered(), inner.width);
        let body_area = Rect {
            x: 0,
            y: 0,
            width: inner.width,
            height: layout.height().max(1),
        };
        let mut body = Buffer::empty(body_area);
        let mut body_frame = UiFrame::from_parts(body_area, &mut body);
        body_frame.fill(body_area, body_style);
        layout.paint(&mut body_frame);
        frame.blit_scrolled(&body, window.scroll(), inner);
    }
    if window.opacity(now) < 1.0 {
        frame.add_modifier(rect, Modifier::DIM);
    }
}

fn blocks(sections: &[RenderedSection]) -> Vec<Block<'_>> {
    let mut out = Vec::new();
    if sections.is_empty() {
        out.push(Block::wrapped(vec![Segment::new(
            EMPTY_MESSAGE,
            Style::default().fg(theme::placeholder()),
        )]));
        return out;
    }
    let title_style = Style::default()
        .fg(theme::section_title())
        .add_modifier(Modifier::BOLD);
    for (index, section) in sections.iter().enumerate() {
        if index > 0 {
            out.push(Block::Gap);
        }
        if let Some(title) = &section.title {
            out.push(Block::fixed(vec![Segment::new(title.clone(), title_style)]));
        }
        node_blocks(&section.node, &mut out);
    }
    out
}

fn node_blocks<'a>(node: &'a RenderNode, out: &mut Vec<Block<'a>>) {
    let body = Style::default();
    let label = Style::default().fg(theme::label());
    match node {
        RenderNode::Text(text) => {
            for line in text.split('\n') {
                let segments = LINKIFIER
                    .split(line)
                    .into_iter()
                    .map(|(text, url)| match url {
                        Some(url) => Segment::link(text, url),
                        None => Segment::new(text, body),
                    })
                    .collect();
                out.push(Block::wrapped(segments));
            }
        }
        RenderNode::KeyValue(rows) => {
            for row in rows {
                out.push(Block::wrapped(vec![
                    Segment::new(row.label.clone(), label),
                    Segment::new(" ", body),
                    Segment::new(row.value.clone(), body.add_modifier(Modifier::BOLD)),
                ]));
            }
        }
        RenderNode::Image {
            source,
            alt,
            caption,
        } => {
            out.push(Block::wrapped(vec![
                Segment::new("▣ ", label),
                Segment::new(alt.clone(), body),
            ]));
            out.push(Block::fixed(vec![Segment::link(source.clone(), source.clone())]));
            if let Some(caption) = caption {
                out.push(Block::wrapped(vec![Segment::new(
                    caption.clone(),
                    body.add_modifier(Modifier::ITALIC),
                )]));
            }
        }
        RenderNode::Video { source, flags } => {
            out.push(Block::wrapped(vec![
                Segment::new("▶ video ", label),
                Segment::new(flag_summary(*flags), Style::default().fg(theme::placeholder())),
            ]));
            out.push(Block::fixed(vec![Segment::link(source.clone(), source.clone())]));
        }
        RenderNode::Youtube {
            video_id,
            embed_url,
        } => {
            out.push(Block::wrapped(vec![
                Segment::new("▶ YouTube ", label),
                Segment::new(video_id.clone(), body.add_modifier(Modifier::BOLD)),
            ]));
            out.push(Block::fixed(vec![Segment::link(
                embed_url.clone(),
                embed_url.clone(),
            )]));
        }
        RenderNode::Chart(chart) => out.push(Block::Chart(chart)),
        RenderNode::List(items) => {
            for item in items {
                let mut segments = vec![Segment::new("• ", label)];
                if let Some(item_label) = &item.label {
                    segments.push(Segment::new(format!("{item_label}: "), label));
                }
                segments.push(Segment::new(item.value.clone(), body));
                if let Some(url) = &item.url {
                    segments.push(Segment::new(" ", body));
                    segments.push(Segment::link("[link]", url.clone()));
                }
                out.push(Block::wrapped(segments));
            }
        }
        RenderNode::Table(table) => table_blocks(table, out),
        RenderNode::Html(markup) => {
            for line in markup.lines() {
                out.push(Block::wrapped(vec![Segment::new(sanitize_text(line), body)]));
            }
        }
        RenderNode::Placeholder(placeholder) => {
            let color = match placeholder {
                Placeholder::InvalidYoutubeUrl
                | Placeholder::Malformed { .. }
                | Placeholder::LoadFailed { .. } => theme::error(),
                Placeholder::Unsupported { .. } | Placeholder::MissingSource { .. } => {
                    theme::placeholder()
                }
            };
            let style = Style::default().fg(color).add_modifier(Modifier::ITALIC);
            for line in placeholder.to_string().split('\n') {
                out.push(Block::wrapped(vec![Segment::new(line.to_string(), style)]));
            }
        }
    }
}

fn table_blocks(table: &TableNode, out: &mut Vec<Block<'_>>) {
    let columns = table
        .rows
        .iter()
        .map(|row| row.cells.len())
        .chain(std::iter::once(table.headers.len()))
        .max()
        .unwrap_or(0);
    if columns == 0 {
        return;
    }
    let mut widths = vec![0usize; columns];
    let all_rows = std::iter::once(&table.headers).chain(table.rows.iter().map(|row| &row.cells));
    for cells in all_rows {
        for (column, cell) in cells.iter().enumerate() {
            widths[column] = widths[column].max(cell.chars().count());
        }
    }
    let format_row = |cells: &[String]| -> String {
        widths
            .iter()
            .enumerate()
            .map(|(column, width)| {
                let cell = cells.get(column).map(String::as_str).unwrap_or("");
                format!("{cell:<width$}")
            })
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };
    if !table.headers.is_empty() {
        let header_style = Style::default()
            .fg(theme::table_header())
            .add_modifier(Modifier::BOLD);
        out.push(Block::fixed(vec![Segment::new(
            format_row(&table.headers),
            header_style,
        )]));
        let rule_width = widths.iter().sum::<usize>() + 2 * (columns - 1);
        out.push(Block::fixed(vec![Segment::new(
            "─".repeat(rule_width),
            Style::default().fg(theme::border()),
        )]));
    }
    for row in &table.rows {
        let style = if row.highlighted {
            Style::default()
                .bg(theme::table_highlight_bg())
                .fg(theme::table_highlight_fg())
        } else {
            Style::default()
        };
        out.push(Block::fixed(vec![Segment::new(format_row(&row.cells), style)]));
    }
}

fn flag_summary(flags: PlaybackFlags) -> String {
    let named = [
        (flags.controls, "controls"),
        (flags.autoplay, "autoplay"),
        (flags.looped, "loop"),
        (flags.muted, "muted"),
    ];
    let enabled: Vec<&str> = named
        .iter()
        .filter(|(on, _)| *on)
        .map(|(_, name)| *name)
        .collect();
    if enabled.is_empty() {
        String::new()
    } else {
        format!("[{}]", enabled.join(" "))
    }
}

fn wrap_segments(segments: Vec<Segment>, width: u16) -> Vec<Vec<Segment>> {
    let width = width.max(1) as usize;
    let mut rows = Vec::new();
    let mut current: Vec<Segment> = Vec::new();
    let mut used = 0usize;
    for segment in segments {
        let chars: Vec<char> = segment.text.chars().collect();
        let mut start = 0;
        while start < chars.len() {
            if used == width {
                rows.push(std::mem::take(&mut current));
                used = 0;
            }
            let take = (width - used).min(chars.len() - start);
            current.push(Segment {
                text: chars[start..start + take].iter().collect(),
                style: segment.style,
                link: segment.link.clone(),
            });
            used += take;
            start += take;
        }
    }
    rows.push(current);
    rows
}

fn truncate_segments(segments: Vec<Segment>, width: u16) -> Vec<Segment> {
    let mut remaining = width as usize;
    let mut row = Vec::new();
    for mut segment in segments {
        if remaining == 0 {
            break;
        }
        let count = segment.width();
        if count > remaining {
            segment.text = segment.text.chars().take(remaining).collect();
        }
        remaining -= count.min(remaining);
        row.push(segment);
    }
    row
}

fn render_chart(frame: &mut UiFrame<'_>, area: Rect, plot: &PlottedChart) {
    if plot.series.is_empty() {
        let style = Style::default().fg(theme::placeholder());
        safe_set_string(frame.buffer_mut(), area, area.x, area.y, "No chart data", style);
        return;
    }
    if plot.kind.draws_as_bars() {
        render_bars(frame, area, plot);
    } else {
        render_lines(frame, area, plot);
    }
}

fn render_lines(frame: &mut UiFrame<'_>, area: Rect, plot: &PlottedChart) {
    let graph_type = if plot.kind == ChartKind::Scatter {
        GraphType::Scatter
    } else {
        GraphType::Line
    };
    let datasets: Vec<Dataset<'_>> = plot
        .series
        .iter()
        .enumerate()
        .map(|(index, series)| {
            Dataset::default()
                .name(series.label.clone())
                .marker(Marker::Braille)
                .graph_type(graph_type)
                .style(Style::default().fg(series.color.unwrap_or_else(|| theme::series(index))))
                .data(&series.points)
        })
        .collect();
    let grid = Style::default().fg(plot.style.grid.unwrap_or_else(theme::accent_dim));
    let x_ticks = tick_style(plot.style.x_ticks);
    let y_ticks = tick_style(plot.style.y_ticks);
    let x_labels = match (plot.labels.first(), plot.labels.last()) {
        (Some(first), Some(last)) => vec![first.clone(), last.clone()],
        _ => vec![format_number(plot.x_bounds[0]), format_number(plot.x_bounds[1])],
    };
    let y_labels = vec![format_number(plot.y_bounds[0]), format_number(plot.y_bounds[1])];
    let legend = plot.style.show_legend.then_some(LegendPosition::TopRight);
    let chart = Chart::new(datasets)
        .style(Style::default().fg(plot.style.legend.unwrap_or_else(theme::accent)))
        .x_axis(
            Axis::default()
                .bounds(plot.x_bounds)
                .style(grid)
                .labels(x_labels.into_iter().map(|label| Span::styled(label, x_ticks))),
        )
        .y_axis(
            Axis::default()
                .bounds(plot.y_bounds)
                .style(grid)
                .labels(y_labels.into_iter().map(|label| Span::styled(label, y_ticks))),
        )
        .legend_position(legend);
    frame.render_widget(chart, area);
}

fn render_bars(frame: &mut UiFrame<'_>, area: Rect, plot: &PlottedChart) {
    let groups = plot
        .series
        .iter()
        .map(|series| series.points.len())
        .max()
        .unwrap_or(0);
    let per_group = plot.series.len().max(1);
    let slots = (groups * per_group).max(1) as u16;
    let bar_width = (area.width.saturating_sub(groups as u16) / slots).clamp(1, 6);
    let mut chart = BarChart::default()
        .bar_width(bar_width)
        .bar_gap(0)
        .group_gap(1)
        .label_style(tick_style(plot.style.x_ticks))
        .value_style(Style::default().fg(theme::window_bg()).bg(theme::accent()));
    for index in 0..groups {
        let bars: Vec<Bar<'_>> = plot
            .series
            .iter()
            .enumerate()
            .filter_map(|(series_index, series)| {
                let &(_, value) = series.points.get(index)?;
                let color = series
                    .color
                    .unwrap_or_else(|| theme::series(series_index));
                Some(
                    Bar::default()
                        .value((value.max(0.0) * 100.0).round() as u64)
                        .text_value(format_number(value))
                        .style(Style::default().fg(color)),
                )
            })
            .collect();
        let mut group = BarGroup::default().bars(&bars);
        if let Some(label) = plot.labels.get(index) {
            group = group.label(Line::from(label.clone()));
        }
        chart = chart.data(group);
    }
    frame.render_widget(chart, area);
}

fn tick_style(color: Option<Color>) -> Style {
    Style::default().fg(color.unwrap_or_else(theme::accent))
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value:.1}")
    }
}
