//! Maps query result rows onto a visual encoding.
//!
//! [`render`] is total: zero rows give [`Visual::Empty`], pie inference misses give
//! [`Visual::Error`], everything else a drawable visual. Drawing happens in [`crate::tui`].
pub mod infer;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::core::types::{ResultRow, as_number, display_scalar};
use crate::core::widget::{ChartConfig, ChartType, WidgetConfig, WidgetType};

pub use infer::{PieKeys, infer_pie_keys};

/// Fixed series/slice palette, assigned by index modulo its length
pub const PALETTE: [&str; 8] = [
    "#8884d8", "#82ca9d", "#ffc658", "#ff7300", "#0088fe", "#00c49f", "#ffbb28", "#ff8042",
];

pub fn palette_color(index: usize) -> &'static str {
    PALETTE[index % PALETTE.len()]
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
pub enum RenderError {
    #[error(
        "could not resolve pie keys (name: {attempted_name:?}, value: {attempted_value:?}); available columns: {}",
        .available.join(", ")
    )]
    InferenceFailed {
        attempted_name: String,
        attempted_value: String,
        available: Vec<String>,
    },
}

/// What the host should draw
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Visual {
    Empty,
    Table(TableVisual),
    Cartesian(CartesianVisual),
    Pie(PieVisual),
    Error(RenderError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableVisual {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub key: String,
    pub color: &'static str,
    /// One point per row; `None` where the cell is missing or not numeric
    pub points: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CartesianVisual {
    pub kind: ChartType,
    pub title: String,
    pub x_key: String,
    pub categories: Vec<String>,
    pub series: Vec<Series>,
    pub show_legend: bool,
    pub show_grid: bool,
    pub stacked: bool,
    pub horizontal: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Slice {
    pub name: String,
    pub value: Option<f64>,
    pub label: String,
    pub color: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PieVisual {
    pub title: String,
    pub keys: PieKeys,
    pub slices: Vec<Slice>,
    pub show_legend: bool,
}

impl PieVisual {
    pub fn total(&self) -> f64 {
        self.slices.iter().filter_map(|s| s.value).sum()
    }
}

/// Which renderer a widget uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Table,
    Chart(ChartType),
}

/// Tables stay tables; otherwise an explicit chart type wins over the widget type
pub fn resolve_encoding(widget_type: WidgetType, chart: &ChartConfig) -> Encoding {
    match (widget_type, chart.chart_type) {
        (WidgetType::Table, _) => Encoding::Table,
        (_, Some(kind)) => Encoding::Chart(kind),
        (WidgetType::Line, None) => Encoding::Chart(ChartType::Line),
        (WidgetType::Pie, None) => Encoding::Chart(ChartType::Pie),
        (WidgetType::Bar | WidgetType::Graph | WidgetType::Chart, None) => Encoding::Chart(ChartType::Bar),
    }
}

/// Render a widget's rows, binding axes to the keys its query actually returns
pub fn render_widget(config: &WidgetConfig, rows: Option<&[ResultRow]>) -> Visual {
    render(config.widget_type, rows, &config.result_chart())
}

pub fn render(widget_type: WidgetType, rows: Option<&[ResultRow]>, chart: &ChartConfig) -> Visual {
    let Some(rows) = rows.filter(|r| !r.is_empty()) else {
        return Visual::Empty;
    };
    let encoding = resolve_encoding(widget_type, chart);
    debug!(?encoding, rows = rows.len(), "rendering widget");
    match encoding {
        Encoding::Table => Visual::Table(table(rows)),
        Encoding::Chart(ChartType::Pie) => match pie(rows, chart) {
            Ok(visual) => Visual::Pie(visual),
            Err(e) => {
                warn!(error = %e, "pie inference failed");
                Visual::Error(e)
            }
        },
        Encoding::Chart(kind) => Visual::Cartesian(cartesian(kind, rows, chart)),
    }
}

fn table(rows: &[ResultRow]) -> TableVisual {
    let columns: Vec<String> = rows[0].keys().cloned().collect();
    let rows = rows
        .iter()
        .map(|row| {
            columns
                .iter()
                .map(|c| row.get(c).map(display_scalar).unwrap_or_default())
                .collect()
        })
        .collect();
    TableVisual { columns, rows }
}

fn cartesian(kind: ChartType, rows: &[ResultRow], chart: &ChartConfig) -> CartesianVisual {
    let first = &rows[0];
    let x_key = chart
        .x_axis
        .clone()
        .or_else(|| first.keys().next().cloned())
        .unwrap_or_default();
    let y_keys: Vec<String> = if chart.y_axis.is_empty() {
        first.keys().filter(|k| **k != x_key).cloned().collect()
    } else {
        chart.y_axis.clone()
    };

    let categories = rows
        .iter()
        .map(|row| row.get(&x_key).map(display_scalar).unwrap_or_default())
        .collect();
    let series = y_keys
        .into_iter()
        .enumerate()
        .map(|(i, key)| Series {
            points: rows.iter().map(|row| row.get(&key).and_then(as_number)).collect(),
            color: palette_color(i),
            key,
        })
        .collect();

    CartesianVisual {
        kind,
        title: chart.title.clone(),
        x_key,
        categories,
        series,
        show_legend: chart.show_legend,
        show_grid: chart.show_grid,
        stacked: chart.stacked,
        horizontal: chart.horizontal,
    }
}

fn pie(rows: &[ResultRow], chart: &ChartConfig) -> Result<PieVisual, RenderError> {
    let keys = infer_pie_keys(&rows[0], chart)?;
    let slices = rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let name = row.get(&keys.name_key).map(display_scalar).unwrap_or_default();
            let raw = row.get(&keys.value_key);
            Slice {
                label: format!("{name}: R${}", raw.map(display_scalar).unwrap_or_default()),
                value: raw.and_then(as_number),
                color: palette_color(i),
                name,
            }
        })
        .collect();
    Ok(PieVisual { title: chart.title.clone(), keys, slices, show_legend: chart.show_legend })
}
