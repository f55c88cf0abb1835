//! Widget configuration model: the aggregate root a report is built from.
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

use crate::core::filter::Filter;

/// Aggregate function applied to one column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum AggregateFunction {
    Sum,
    Count,
    Avg,
    Min,
    Max,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aggregation {
    pub column: String,
    pub function: AggregateFunction,
}

impl Aggregation {
    /// Name of the result column produced by this aggregation, e.g. `sum_total`
    pub fn alias(&self) -> String {
        format!("{}_{}", self.function.to_string().to_lowercase(), self.column)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    pub column: String,
    pub direction: SortDirection,
}

/// Stored widget type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum WidgetType {
    #[default]
    Table,
    Bar,
    Pie,
    Line,
    Graph,
    Chart,
}

/// Visual encoding picked in the visualization stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ChartType {
    Bar,
    Line,
    Area,
    Pie,
    Scatter,
}

/// Chart sub-configuration. Axis bindings reference selected columns by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChartConfig {
    pub title: String,
    pub subtitle: String,
    pub x_axis: Option<String>,
    pub y_axis: Vec<String>,
    pub group_by: Option<String>,
    pub chart_type: Option<ChartType>,
    pub color_scheme: String,
    pub show_legend: bool,
    pub show_data_labels: bool,
    pub show_grid: bool,
    pub stacked: bool,
    pub horizontal: bool,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            title: String::new(),
            subtitle: String::new(),
            x_axis: None,
            y_axis: Vec::new(),
            group_by: None,
            chart_type: None,
            color_scheme: "default".to_string(),
            show_legend: true,
            show_data_labels: false,
            show_grid: true,
            stacked: false,
            horizontal: false,
        }
    }
}

/// One editable chart field, as addressed by the visualization stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "camelCase")]
pub enum ChartField {
    Title(String),
    Subtitle(String),
    XAxis(Option<String>),
    YAxis(Vec<String>),
    GroupBy(Option<String>),
    ChartType(Option<ChartType>),
    ColorScheme(String),
    ShowLegend(bool),
    ShowDataLabels(bool),
    ShowGrid(bool),
    Stacked(bool),
    Horizontal(bool),
}

impl ChartField {
    /// Axis and grouping edits change what the preview shows; the rest is cosmetic.
    pub fn affects_rendering(&self) -> bool {
        matches!(self, ChartField::XAxis(_) | ChartField::YAxis(_) | ChartField::GroupBy(_))
    }

    /// Column names this edit binds
    pub fn referenced_columns(&self) -> Vec<&str> {
        match self {
            ChartField::XAxis(Some(c)) | ChartField::GroupBy(Some(c)) => vec![c.as_str()],
            ChartField::YAxis(cols) => cols.iter().map(String::as_str).collect(),
            _ => Vec::new(),
        }
    }

    fn blank_to_none(value: &Option<String>) -> Option<String> {
        value.as_ref().filter(|s| !s.is_empty()).cloned()
    }
}

impl ChartConfig {
    /// Merge a single field into this config
    pub fn apply(&mut self, field: ChartField) {
        match field {
            ChartField::Title(v) => self.title = v,
            ChartField::Subtitle(v) => self.subtitle = v,
            ChartField::XAxis(ref v) => self.x_axis = ChartField::blank_to_none(v),
            ChartField::YAxis(v) => self.y_axis = v.into_iter().filter(|c| !c.is_empty()).collect(),
            ChartField::GroupBy(ref v) => self.group_by = ChartField::blank_to_none(v),
            ChartField::ChartType(v) => self.chart_type = v,
            ChartField::ColorScheme(v) => self.color_scheme = v,
            ChartField::ShowLegend(v) => self.show_legend = v,
            ChartField::ShowDataLabels(v) => self.show_data_labels = v,
            ChartField::ShowGrid(v) => self.show_grid = v,
            ChartField::Stacked(v) => self.stacked = v,
            ChartField::Horizontal(v) => self.horizontal = v,
        }
    }

    pub fn clear_bindings(&mut self) {
        self.x_axis = None;
        self.y_axis.clear();
        self.group_by = None;
    }
}

/// Full report definition
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WidgetConfig {
    pub name: String,
    pub view_name: String,
    pub selected_columns: Vec<String>,
    pub filters: Vec<Filter>,
    pub aggregations: Vec<Aggregation>,
    pub order_by: Option<OrderBy>,
    #[serde(rename = "type")]
    pub widget_type: WidgetType,
    pub chart_config: ChartConfig,
}

/// Why a configuration cannot be saved yet
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SaveError {
    #[error("Give the widget a name before saving")]
    MissingName,
    #[error("Choose a data view before saving")]
    MissingView,
    #[error("Select at least one column before saving")]
    MissingColumns,
}

impl WidgetConfig {
    pub fn has_view(&self) -> bool {
        !self.view_name.is_empty()
    }

    pub fn has_columns(&self) -> bool {
        self.has_view() && !self.selected_columns.is_empty()
    }

    pub fn is_selected(&self, column: &str) -> bool {
        self.selected_columns.iter().any(|c| c == column)
    }

    /// Add the column if absent, remove it if present. Removing a column also drops every
    /// binding, aggregation and sort that names it.
    pub fn toggle_column(&mut self, column: &str) {
        if let Some(pos) = self.selected_columns.iter().position(|c| c == column) {
            self.selected_columns.remove(pos);
            self.forget_column(column);
        } else {
            self.selected_columns.push(column.to_string());
        }
    }

    fn forget_column(&mut self, column: &str) {
        self.aggregations.retain(|a| a.column != column);
        if self.order_by.as_ref().is_some_and(|o| o.column == column) {
            self.order_by = None;
        }
        let chart = &mut self.chart_config;
        chart.y_axis.retain(|c| c != column);
        if chart.x_axis.as_deref() == Some(column) {
            chart.x_axis = None;
        }
        if chart.group_by.as_deref() == Some(column) {
            chart.group_by = None;
        }
    }

    /// Upsert by column, or remove when `function` is `None`
    pub fn set_aggregation(&mut self, column: &str, function: Option<AggregateFunction>) {
        match function {
            Some(function) => {
                match self.aggregations.iter_mut().find(|a| a.column == column) {
                    Some(existing) => existing.function = function,
                    None => self.aggregations.push(Aggregation { column: column.to_string(), function }),
                }
            }
            None => self.aggregations.retain(|a| a.column != column),
        }
    }

    pub fn aggregation_for(&self, column: &str) -> Option<&Aggregation> {
        self.aggregations.iter().find(|a| a.column == column)
    }

    /// Key under which `column` appears in result rows
    pub fn result_key(&self, column: &str) -> String {
        self.aggregation_for(column)
            .map(Aggregation::alias)
            .unwrap_or_else(|| column.to_string())
    }

    /// Chart config with axis bindings rewritten to result-row keys
    pub fn result_chart(&self) -> ChartConfig {
        let mut chart = self.chart_config.clone();
        chart.x_axis = chart.x_axis.map(|c| self.result_key(&c));
        chart.y_axis = chart.y_axis.iter().map(|c| self.result_key(c)).collect();
        chart.group_by = chart.group_by.map(|c| self.result_key(&c));
        chart
    }

    /// Switching views invalidates every column-bound field
    pub fn reset_for_view(&mut self, view_name: &str) {
        self.view_name = view_name.to_string();
        self.selected_columns.clear();
        self.filters.clear();
        self.aggregations.clear();
        self.order_by = None;
        self.chart_config.clear_bindings();
    }

    pub fn check_saveable(&self) -> Result<(), SaveError> {
        if self.name.trim().is_empty() {
            return Err(SaveError::MissingName);
        }
        if !self.has_view() {
            return Err(SaveError::MissingView);
        }
        if self.selected_columns.is_empty() {
            return Err(SaveError::MissingColumns);
        }
        Ok(())
    }

    /// Copy of this config holding only filters with both a column and an operator
    pub fn for_save(&self) -> Self {
        let mut config = self.clone();
        config.filters.retain(Filter::has_column_and_operator);
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::filter::Operator;
    use pretty_assertions::assert_eq;

    #[test]
    fn toggle_column_is_idempotent_pairwise() {
        let mut cfg = WidgetConfig { view_name: "v".into(), ..Default::default() };
        cfg.toggle_column("a");
        let before = cfg.selected_columns.clone();
        cfg.toggle_column("x");
        cfg.toggle_column("x");
        assert_eq!(cfg.selected_columns, before);
    }

    #[test]
    fn deselecting_a_column_drops_what_names_it() {
        let mut cfg = WidgetConfig { view_name: "v".into(), ..Default::default() };
        cfg.toggle_column("produto");
        cfg.toggle_column("total");
        cfg.set_aggregation("produto", Some(AggregateFunction::Count));
        cfg.order_by = Some(OrderBy { column: "produto".into(), direction: SortDirection::Desc });
        cfg.chart_config.apply(ChartField::XAxis(Some("produto".into())));
        cfg.chart_config.apply(ChartField::GroupBy(Some("produto".into())));
        cfg.chart_config.apply(ChartField::YAxis(vec!["produto".into(), "total".into()]));

        cfg.toggle_column("produto");
        assert_eq!(cfg.selected_columns, vec!["total".to_string()]);
        assert!(cfg.aggregations.is_empty());
        assert_eq!(cfg.order_by, None);
        assert_eq!(cfg.chart_config.x_axis, None);
        assert_eq!(cfg.chart_config.group_by, None);
        assert_eq!(cfg.chart_config.y_axis, vec!["total".to_string()]);
    }

    #[test]
    fn result_chart_binds_aggregated_columns_by_alias() {
        let mut cfg = WidgetConfig::default();
        cfg.set_aggregation("total", Some(AggregateFunction::Sum));
        cfg.chart_config.apply(ChartField::XAxis(Some("produto".into())));
        cfg.chart_config.apply(ChartField::YAxis(vec!["total".into()]));
        let chart = cfg.result_chart();
        assert_eq!(chart.x_axis.as_deref(), Some("produto"));
        assert_eq!(chart.y_axis, vec!["sum_total".to_string()]);
        assert_eq!(cfg.chart_config.y_axis, vec!["total".to_string()]);
    }

    #[test]
    fn aggregation_upserts_by_column() {
        let mut cfg = WidgetConfig::default();
        cfg.set_aggregation("total", Some(AggregateFunction::Sum));
        cfg.set_aggregation("total", Some(AggregateFunction::Avg));
        assert_eq!(cfg.aggregations.len(), 1);
        assert_eq!(cfg.aggregations[0].function, AggregateFunction::Avg);
        assert_eq!(cfg.aggregations[0].alias(), "avg_total");
        cfg.set_aggregation("total", None);
        assert!(cfg.aggregations.is_empty());
    }

    #[test]
    fn for_save_keeps_filters_with_column_and_operator() {
        let cfg = WidgetConfig {
            filters: vec![
                Filter { column: "x".into(), ..Default::default() },
                Filter { column: "y".into(), operator: Some(Operator::Equal), ..Default::default() },
                Filter::new("z", Operator::Equal).with_value("5"),
            ],
            ..Default::default()
        };
        let saved = cfg.for_save();
        let columns: Vec<&str> = saved.filters.iter().map(|f| f.column.as_str()).collect();
        assert_eq!(columns, vec!["y", "z"]);
    }

    #[test]
    fn chart_field_merge_normalizes_blank_bindings() {
        let mut chart = ChartConfig::default();
        chart.apply(ChartField::XAxis(Some("produto".into())));
        chart.apply(ChartField::YAxis(vec!["total".into(), String::new()]));
        assert_eq!(chart.x_axis.as_deref(), Some("produto"));
        assert_eq!(chart.y_axis, vec!["total".to_string()]);
        chart.apply(ChartField::XAxis(Some(String::new())));
        assert_eq!(chart.x_axis, None);
        assert!(ChartField::GroupBy(None).affects_rendering());
        assert!(!ChartField::ShowGrid(false).affects_rendering());
    }

    #[test]
    fn config_uses_camel_case_wire_names() {
        let json = serde_json::json!({
            "name": "Sales",
            "viewName": "vw_sales",
            "selectedColumns": ["produto", "total"],
            "type": "pie",
            "chartConfig": { "xAxis": "produto", "yAxis": ["total"], "chartType": "pie" }
        });
        let cfg: WidgetConfig = serde_json::from_value(json).unwrap();
        assert_eq!(cfg.widget_type, WidgetType::Pie);
        assert_eq!(cfg.chart_config.chart_type, Some(ChartType::Pie));
        assert!(cfg.chart_config.show_legend);
        assert_eq!(cfg.check_saveable(), Ok(()));
    }

    #[test]
    fn save_preconditions_in_order() {
        let mut cfg = WidgetConfig::default();
        assert_eq!(cfg.check_saveable(), Err(SaveError::MissingName));
        cfg.name = "n".into();
        assert_eq!(cfg.check_saveable(), Err(SaveError::MissingView));
        cfg.view_name = "v".into();
        assert_eq!(cfg.check_saveable(), Err(SaveError::MissingColumns));
    }
}
