//! Draws a rendered [`Visual`] into a ratatui buffer.
use ratatui::buffer::Buffer;
use ratatui::layout::{Alignment, Constraint, Direction, Rect};
use ratatui::style::Style;
use ratatui::symbols::Marker;
use ratatui::text::{Line, Span};
use ratatui::widgets::{
    Axis, Bar, BarChart, BarGroup, Block, Cell, Chart, Dataset, GraphType, LegendPosition, Paragraph, Row,
    Table, Widget,
};

use crate::core::widget::ChartType;
use crate::render::{CartesianVisual, PieVisual, RenderError, TableVisual, Visual};
use crate::tui::theme::Theme;

/// Ratatui widget for any [`Visual`]
pub struct VisualWidget<'a> {
    visual: &'a Visual,
    theme: Theme,
}

impl<'a> VisualWidget<'a> {
    pub fn new(visual: &'a Visual) -> Self {
        Self { visual, theme: Theme::default() }
    }

    pub fn theme(mut self, theme: Theme) -> Self {
        self.theme = theme;
        self
    }

    fn block(&self, title: &str) -> Block<'a> {
        let block = Block::bordered().border_style(self.theme.border_style());
        if title.is_empty() {
            block
        } else {
            block.title(Line::styled(title.to_string(), self.theme.title_style()))
        }
    }
}

impl Widget for VisualWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        match self.visual {
            Visual::Empty => self.render_empty(area, buf),
            Visual::Table(table) => self.render_table(table, area, buf),
            Visual::Cartesian(chart) if chart.kind == ChartType::Bar => self.render_bars(chart, area, buf),
            Visual::Cartesian(chart) => self.render_chart(chart, area, buf),
            Visual::Pie(pie) => self.render_pie(pie, area, buf),
            Visual::Error(error) => self.render_error(error, area, buf),
        }
    }
}

impl VisualWidget<'_> {
    fn render_empty(&self, area: Rect, buf: &mut Buffer) {
        Paragraph::new(Line::styled("No data", self.theme.muted_style()))
            .alignment(Alignment::Center)
            .block(self.block(""))
            .render(area, buf);
    }

    fn render_table(&self, table: &TableVisual, area: Rect, buf: &mut Buffer) {
        let header = Row::new(table.columns.iter().map(|c| Cell::from(c.as_str()))).style(self.theme.header_style());
        let rows = table.rows.iter().enumerate().map(|(i, row)| {
            let style = if i % 2 == 1 { self.theme.alt_row_style() } else { self.theme.normal_style() };
            Row::new(row.iter().map(|v| Cell::from(v.as_str()))).style(style)
        });
        let widths = table.columns.iter().map(|_| Constraint::Fill(1));
        Table::new(rows, widths)
            .header(header)
            .column_spacing(1)
            .block(self.block(""))
            .render(area, buf);
    }

    fn render_bars(&self, chart: &CartesianVisual, area: Rect, buf: &mut Buffer) {
        // bar heights are integers; scale so fractional values keep their ratio
        let max = chart
            .series
            .iter()
            .flat_map(|s| s.points.iter().flatten())
            .fold(0.0_f64, |acc, v| acc.max(*v));
        let scale = if max > 0.0 && max < 100.0 { 100.0 / max } else { 1.0 };

        let mut bar_chart = BarChart::default()
            .block(self.block(&chart.title))
            .bar_width(if chart.horizontal { 1 } else { 5 })
            .bar_gap(0)
            .group_gap(2)
            .direction(if chart.horizontal { Direction::Horizontal } else { Direction::Vertical });

        for (row, category) in chart.categories.iter().enumerate() {
            let bars: Vec<Bar> = chart
                .series
                .iter()
                .enumerate()
                .map(|(i, series)| {
                    let value = series.points.get(row).copied().flatten().unwrap_or(0.0);
                    Bar::default()
                        .value((value.max(0.0) * scale).round() as u64)
                        .text_value(format_value(value))
                        .style(Style::default().fg(self.theme.series_color(i)))
                })
                .collect();
            bar_chart = bar_chart.data(BarGroup::default().label(Line::from(category.clone())).bars(&bars));
        }
        bar_chart.render(area, buf);
    }

    fn render_chart(&self, chart: &CartesianVisual, area: Rect, buf: &mut Buffer) {
        let points: Vec<Vec<(f64, f64)>> = chart
            .series
            .iter()
            .map(|s| {
                s.points
                    .iter()
                    .enumerate()
                    .filter_map(|(x, y)| y.map(|y| (x as f64, y)))
                    .collect()
            })
            .collect();
        let (low, high) = points
            .iter()
            .flatten()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), (_, y)| (lo.min(*y), hi.max(*y)));
        let (low, high) = if low.is_finite() { (low.min(0.0), high.max(low + 1.0)) } else { (0.0, 1.0) };

        let graph_type = match chart.kind {
            ChartType::Scatter => GraphType::Scatter,
            _ => GraphType::Line,
        };
        let datasets = chart
            .series
            .iter()
            .zip(points.iter())
            .enumerate()
            .map(|(i, (series, data))| {
                Dataset::default()
                    .name(series.key.clone())
                    .marker(Marker::Braille)
                    .graph_type(graph_type)
                    .style(Style::default().fg(self.theme.series_color(i)))
                    .data(data)
            })
            .collect();

        let last = chart.categories.len().saturating_sub(1);
        let x_labels: Vec<Span> = match chart.categories.as_slice() {
            [] => Vec::new(),
            [only] => vec![Span::raw(only.clone())],
            [first, .., end] => vec![Span::raw(first.clone()), Span::raw(end.clone())],
        };
        let y_labels = vec![Span::raw(format_value(low)), Span::raw(format_value(high))];

        let legend = chart.show_legend.then_some(LegendPosition::TopRight);
        Chart::new(datasets)
            .block(self.block(&chart.title))
            .legend_position(legend)
            .x_axis(
                Axis::default()
                    .title(chart.x_key.clone())
                    .style(self.theme.axis_style())
                    .bounds([0.0, last.max(1) as f64])
                    .labels(x_labels),
            )
            .y_axis(
                Axis::default()
                    .style(self.theme.axis_style())
                    .bounds([low, high])
                    .labels(y_labels),
            )
            .render(area, buf);
    }

    fn render_pie(&self, pie: &PieVisual, area: Rect, buf: &mut Buffer) {
        let total = pie.total();
        let bar_room = area.width.saturating_sub(4) as f64 / 2.0;
        let lines: Vec<Line> = pie
            .slices
            .iter()
            .enumerate()
            .map(|(i, slice)| {
                let share = match slice.value {
                    Some(v) if total > 0.0 => v.max(0.0) / total,
                    _ => 0.0,
                };
                let style = Style::default().fg(self.theme.series_color(i));
                Line::from(vec![
                    Span::styled("█".repeat((share * bar_room).round() as usize), style),
                    Span::raw(" "),
                    Span::styled(slice.label.clone(), style),
                    Span::styled(format!(" ({:.1}%)", share * 100.0), self.theme.muted_style()),
                ])
            })
            .collect();
        Paragraph::new(lines).block(self.block(&pie.title)).render(area, buf);
    }

    fn render_error(&self, error: &RenderError, area: Rect, buf: &mut Buffer) {
        let width = area.width.saturating_sub(2).max(1) as usize;
        let lines: Vec<Line> = textwrap::wrap(&error.to_string(), width)
            .into_iter()
            .map(|l| Line::styled(l.into_owned(), self.theme.error_style()))
            .collect();
        Paragraph::new(lines).block(self.block("Cannot render chart")).render(area, buf);
    }
}

fn format_value(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value:.2}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::ResultRow;
    use crate::core::widget::{ChartConfig, WidgetType};
    use crate::render::render;
    use serde_json::json;

    fn draw(visual: &Visual, width: u16, height: u16) -> String {
        let area = Rect::new(0, 0, width, height);
        let mut buf = Buffer::empty(area);
        VisualWidget::new(visual).render(area, &mut buf);
        buf.content().iter().map(|c| c.symbol()).collect()
    }

    fn rows(v: serde_json::Value) -> Vec<ResultRow> {
        v.as_array().unwrap().iter().map(|r| r.as_object().cloned().unwrap()).collect()
    }

    #[test]
    fn empty_shows_placeholder() {
        assert!(draw(&Visual::Empty, 30, 5).contains("No data"));
    }

    #[test]
    fn table_shows_header_and_cells() {
        let data = rows(json!([{"produto": "A", "total": 100}]));
        let out = draw(&render(WidgetType::Table, Some(data.as_slice()), &ChartConfig::default()), 40, 6);
        assert!(out.contains("produto"));
        assert!(out.contains("100"));
    }

    #[test]
    fn pie_shows_slice_labels() {
        let data = rows(json!([{"produto": "A", "total": 75}, {"produto": "B", "total": 25}]));
        let out = draw(&render(WidgetType::Pie, Some(data.as_slice()), &ChartConfig::default()), 60, 6);
        assert!(out.contains("A: R$75"));
        assert!(out.contains("25.0%"));
    }

    #[test]
    fn error_lists_available_columns() {
        let visual = Visual::Error(RenderError::InferenceFailed {
            attempted_name: "c".into(),
            attempted_value: "a".into(),
            available: vec!["a".into(), "b".into()],
        });
        let out = draw(&visual, 80, 8);
        assert!(out.contains("Cannot render chart"));
        assert!(out.contains("a, b"));
    }

    #[test]
    fn charts_draw_without_panicking() {
        let data = rows(json!([{"mes": "jan", "v": 1.5}, {"mes": "fev", "v": 3}, {"mes": "mar", "v": null}]));
        for kind in [ChartType::Bar, ChartType::Line, ChartType::Area, ChartType::Scatter] {
            let chart = ChartConfig { chart_type: Some(kind), title: "Vendas".into(), ..Default::default() };
            let out = draw(&render(WidgetType::Chart, Some(data.as_slice()), &chart), 60, 15);
            assert!(out.contains("Vendas"));
        }
    }

    #[test]
    fn format_value_trims_integers() {
        assert_eq!(format_value(3.0), "3");
        assert_eq!(format_value(2.5), "2.50");
    }
}
