//! Text-mode chart plotting.
//!
//! Layout decides a chart's width; plotting happens afterwards through
//! [`ChartPlotter`], so a plotter never has to guess the space it gets.

use ratatui::style::Style;
use ratatui::text::{Line, Span};
use unicode_width::UnicodeWidthStr;

use crate::core::resolver::{ChartSeries, ChartSpec, SeriesKind};
use crate::core::router::RenderError;
use crate::ui::theme::Theme;
use crate::ui::wrap::pad_line;

pub const PRIMARY_COLOR: &str = "#4A5D4A";
pub const SECONDARY_COLOR: &str = "#8B7355";
pub const TERTIARY_COLOR: &str = "#5D6B7A";
pub const ACCENT_COLOR: &str = "#8B5A5A";

/// Overlay series rotate through these after the primary series.
const OVERLAY_PALETTE: [&str; 3] = [SECONDARY_COLOR, TERTIARY_COLOR, ACCENT_COLOR];

pub const CHART_HEIGHT: usize = 8;
const MIN_PLOT_WIDTH: usize = 4;

/// Draws a chart into exactly `width` cells per line.
pub trait ChartPlotter {
    fn plot(
        &self,
        spec: &ChartSpec,
        width: usize,
        theme: &Theme,
    ) -> Result<Vec<Line<'static>>, RenderError>;
}

/// Declared colour, else the palette entry for the series position.
pub fn series_color(series: &ChartSeries) -> &str {
    if let Some(color) = series.color.as_deref().filter(|c| !c.trim().is_empty()) {
        return color;
    }
    if series.index == 0 {
        PRIMARY_COLOR
    } else {
        OVERLAY_PALETTE[(series.index - 1) % OVERLAY_PALETTE.len()]
    }
}

/// First series as a filled area, later series as point overlays.
#[derive(Debug, Default, Clone, Copy)]
pub struct AreaPlotter;

impl ChartPlotter for AreaPlotter {
    fn plot(
        &self,
        spec: &ChartSpec,
        width: usize,
        theme: &Theme,
    ) -> Result<Vec<Line<'static>>, RenderError> {
        if spec.is_placeholder() {
            return Ok(vec![Line::from(Span::styled(
                "[Chart: not enough data]",
                theme.placeholder_style,
            ))]);
        }

        let (min, max) = value_range(spec)?;
        let max_label = format_value(max);
        let min_label = format_value(min);
        let gutter = max_label.width().max(min_label.width());
        // gutter + axis glyph + plot area
        let plot_width = width.saturating_sub(gutter + 1).max(MIN_PLOT_WIDTH);

        let mut grid: Vec<Vec<Option<(char, usize)>>> = vec![vec![None; plot_width]; CHART_HEIGHT];
        for (slot, series) in spec.series.iter().enumerate() {
            for column in 0..plot_width {
                let value = sample_at(series, column, plot_width);
                let level = level_for(value, min, max);
                let top = CHART_HEIGHT - 1 - level;
                match series.kind {
                    SeriesKind::Area => {
                        grid[top][column] = Some(('█', slot));
                        for row in grid.iter_mut().skip(top + 1) {
                            row[column] = Some(('░', slot));
                        }
                    }
                    SeriesKind::Line => grid[top][column] = Some(('●', slot)),
                }
            }
        }

        let styles: Vec<Style> = spec
            .series
            .iter()
            .map(|series| match theme.series_color(series_color(series)) {
                Some(color) => Style::default().fg(color),
                None => Style::default(),
            })
            .collect();

        let mut lines = Vec::with_capacity(CHART_HEIGHT + 2);
        for (row_index, row) in grid.iter().enumerate() {
            let label = match row_index {
                0 => max_label.as_str(),
                r if r == CHART_HEIGHT - 1 => min_label.as_str(),
                _ => "",
            };
            let mut spans = vec![
                Span::styled(
                    format!("{label:>gutter$}"),
                    theme.chart_axis_style,
                ),
                Span::styled("┤", theme.chart_axis_style),
            ];
            spans.extend(row_spans(row, &styles));
            lines.push(Line::from(spans));
        }

        lines.push(Line::from(vec![
            Span::raw(" ".repeat(gutter)),
            Span::styled("└", theme.chart_axis_style),
            Span::styled("─".repeat(plot_width), theme.chart_axis_style),
        ]));
        lines.push(footer(spec, gutter, plot_width, theme));
        Ok(lines
            .into_iter()
            .map(|line| pad_line(line, width))
            .collect())
    }
}

fn value_range(spec: &ChartSpec) -> Result<(f64, f64), RenderError> {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for series in &spec.series {
        for point in &series.points {
            if !point.value.is_finite() {
                return Err(RenderError::Chart {
                    message: format!("value at '{}' is not a finite number", point.label),
                });
            }
            min = min.min(point.value);
            max = max.max(point.value);
        }
    }
    Ok((min, max))
}

/// Nearest declared point for a plot column.
fn sample_at(series: &ChartSeries, column: usize, plot_width: usize) -> f64 {
    let last = series.points.len().saturating_sub(1);
    let index = if plot_width <= 1 {
        last
    } else {
        ((column as f64 * last as f64) / (plot_width - 1) as f64).round() as usize
    };
    series
        .points
        .get(index.min(last))
        .map(|p| p.value)
        .unwrap_or_default()
}

fn level_for(value: f64, min: f64, max: f64) -> usize {
    if max <= min {
        return CHART_HEIGHT / 2;
    }
    let ratio = (value - min) / (max - min);
    ((ratio * (CHART_HEIGHT - 1) as f64).round() as usize).min(CHART_HEIGHT - 1)
}

fn row_spans(row: &[Option<(char, usize)>], styles: &[Style]) -> Vec<Span<'static>> {
    let mut spans = Vec::new();
    let mut run = String::new();
    let mut run_style: Option<Style> = None;
    for cell in row {
        let (ch, style) = match cell {
            Some((ch, slot)) => (*ch, styles.get(*slot).copied().unwrap_or_default()),
            None => (' ', Style::default()),
        };
        if run_style.is_some_and(|s| s != style) {
            spans.push(Span::styled(std::mem::take(&mut run), run_style.unwrap_or_default()));
        }
        run_style = Some(style);
        run.push(ch);
    }
    if !run.is_empty() {
        spans.push(Span::styled(run, run_style.unwrap_or_default()));
    }
    spans
}

fn footer(spec: &ChartSpec, gutter: usize, plot_width: usize, theme: &Theme) -> Line<'static> {
    let points = spec
        .series
        .first()
        .map(|series| series.points.as_slice())
        .unwrap_or_default();
    let first = points.first().map(|p| p.label.as_str()).unwrap_or_default();
    let last = points.last().map(|p| p.label.as_str()).unwrap_or_default();
    let gap = plot_width.saturating_sub(first.width() + last.width());
    let text = if gap == 0 {
        truncate_to_width(first, plot_width)
    } else {
        format!("{first}{}{last}", " ".repeat(gap))
    };
    Line::from(vec![
        Span::raw(" ".repeat(gutter + 1)),
        Span::styled(text, theme.chart_axis_style),
    ])
}

fn truncate_to_width(text: &str, width: usize) -> String {
    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let w = ch.to_string().width();
        if used + w > width {
            break;
        }
        used += w;
        out.push(ch);
    }
    out
}

/// Integers without a fraction, everything else with up to two decimals.
pub fn format_value(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        let formatted = format!("{value:.2}");
        formatted
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string()
    }
}
