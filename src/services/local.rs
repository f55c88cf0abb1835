//! In-process views backed by Polars lazy frames.
//!
//! Each view is a [`LazyFrame`] registered under a name. Requests compile to a lazy plan:
//! filters, then select or group-by/aggregate, then sort.
use polars::prelude::*;
use serde_json::{Number, Value};
use std::collections::BTreeMap;
use std::fs::File;
use tracing::{debug, info, warn};

use crate::config::{ViewDefinition, ViewFormat};
use crate::core::filter::{Filter, Operator, validate_filter};
use crate::core::types::ResultRow;
use crate::core::widget::{AggregateFunction, Aggregation};
use crate::error::{EngineError, EngineResult};
use crate::services::catalog::{Catalog, ColumnInfo, ViewInfo};
use crate::services::query::{QueryBackend, QueryRequest, QueryResponse, ValidationReport};

#[derive(Clone)]
struct LocalView {
    label: String,
    frame: LazyFrame,
}

/// Registry of named local views
#[derive(Clone, Default)]
pub struct LocalViews {
    views: BTreeMap<String, LocalView>,
}

impl LocalViews {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every configured view from disk
    pub fn from_definitions(definitions: &[ViewDefinition]) -> EngineResult<Self> {
        let mut views = Self::new();
        for def in definitions {
            let frame = load_frame(def)?;
            let label = if def.label.is_empty() { def.name.clone() } else { def.label.clone() };
            info!(view = %def.name, path = %def.path.display(), "registered view");
            views.register(&def.name, label, frame);
        }
        Ok(views)
    }

    pub fn register(&mut self, name: &str, label: impl Into<String>, frame: LazyFrame) {
        self.views.insert(name.to_string(), LocalView { label: label.into(), frame });
    }

    pub fn register_frame(&mut self, name: &str, label: impl Into<String>, df: DataFrame) {
        self.register(name, label, df.lazy());
    }

    fn view(&self, name: &str) -> EngineResult<&LocalView> {
        self.views.get(name).ok_or_else(|| EngineError::UnknownView(name.to_string()))
    }

    fn schema(&self, name: &str) -> EngineResult<SchemaRef> {
        let mut frame = self.view(name)?.frame.clone();
        Ok(frame.collect_schema()?)
    }

    /// Build and run the lazy plan for a request
    pub fn run(&self, request: &QueryRequest) -> EngineResult<Vec<ResultRow>> {
        let view = self.view(&request.view_name)?;
        let schema = self.schema(&request.view_name)?;
        if request.columns.is_empty() {
            return Err(EngineError::Validation("no columns selected".into()));
        }
        for column in &request.columns {
            require_column(&schema, column)?;
        }

        let mut lf = view.frame.clone();
        for filter in &request.filters {
            if let Err(e) = validate_filter(filter) {
                warn!(filter = %filter.summary(), error = %e, "skipping incomplete filter");
                continue;
            }
            let dtype = require_column(&schema, &filter.column)?;
            lf = lf.filter(filter_expr(filter, dtype)?);
        }

        lf = if request.aggregations.is_empty() {
            lf.select(request.columns.iter().map(|c| col(c.as_str())).collect::<Vec<_>>())
        } else {
            for agg in &request.aggregations {
                require_column(&schema, &agg.column)?;
            }
            aggregate(lf, &request.columns, &request.aggregations)
        };

        if let Some(order) = &request.order_by {
            let target = request
                .aggregations
                .iter()
                .find(|a| a.column == order.column)
                .map(Aggregation::alias)
                .unwrap_or_else(|| order.column.clone());
            let options = SortMultipleOptions::default()
                .with_order_descending(order.direction == crate::core::widget::SortDirection::Desc)
                .with_nulls_last(true);
            lf = lf.sort_by_exprs(vec![col(target.as_str())], options);
        }

        let df = lf.collect()?;
        debug!(view = %request.view_name, rows = df.height(), "local query collected");
        frame_to_rows(&df)
    }
}

fn load_frame(def: &ViewDefinition) -> EngineResult<LazyFrame> {
    let frame = match def.format {
        ViewFormat::Csv => LazyCsvReader::new(&def.path)
            .with_has_header(true)
            .with_infer_schema_length(Some(10_000))
            .finish()?,
        ViewFormat::Parquet => ParquetReader::new(File::open(&def.path)?).finish()?.lazy(),
        ViewFormat::Json => JsonReader::new(File::open(&def.path)?).finish()?.lazy(),
    };
    Ok(frame)
}

fn require_column<'a>(schema: &'a Schema, column: &str) -> EngineResult<&'a DataType> {
    schema
        .get(column)
        .ok_or_else(|| EngineError::Validation(format!("unknown column: {column}")))
}

/// Group by the non-aggregated selected columns and keep selection order in the output
fn aggregate(lf: LazyFrame, columns: &[String], aggregations: &[Aggregation]) -> LazyFrame {
    let keys: Vec<Expr> = columns
        .iter()
        .filter(|c| !aggregations.iter().any(|a| &a.column == *c))
        .map(|c| col(c.as_str()))
        .collect();
    let aggs: Vec<Expr> = aggregations.iter().map(aggregation_expr).collect();

    let grouped = if keys.is_empty() { lf.select(aggs) } else { lf.group_by_stable(keys).agg(aggs) };

    let mut output: Vec<Expr> = columns
        .iter()
        .map(|c| match aggregations.iter().find(|a| &a.column == c) {
            Some(agg) => col(agg.alias().as_str()),
            None => col(c.as_str()),
        })
        .collect();
    for agg in aggregations.iter().filter(|a| !columns.contains(&a.column)) {
        output.push(col(agg.alias().as_str()));
    }
    grouped.select(output)
}

fn aggregation_expr(agg: &Aggregation) -> Expr {
    let column = col(agg.column.as_str());
    let expr = match agg.function {
        AggregateFunction::Sum => column.sum(),
        AggregateFunction::Count => column.count(),
        AggregateFunction::Avg => column.mean(),
        AggregateFunction::Min => column.min(),
        AggregateFunction::Max => column.max(),
    };
    expr.alias(agg.alias().as_str())
}

/// Compile one validated filter into a predicate
pub(crate) fn filter_expr(filter: &Filter, dtype: &DataType) -> EngineResult<Expr> {
    validate_filter(filter).map_err(|e| EngineError::Validation(e.to_string()))?;
    let column = col(filter.column.as_str());
    let single = || literal(dtype, filter.value.as_ref());
    let Some(op) = filter.operator else {
        return Err(EngineError::Validation("filter without operator".into()));
    };
    let expr = match op {
        Operator::Equal => column.eq(single()?),
        Operator::NotEqual => column.neq(single()?),
        Operator::Greater => column.gt(single()?),
        Operator::GreaterEqual => column.gt_eq(single()?),
        Operator::Less => column.lt(single()?),
        Operator::LessEqual => column.lt_eq(single()?),
        Operator::Like => like_expr(column, filter.value.as_ref())?,
        Operator::NotLike => like_expr(column, filter.value.as_ref())?.not(),
        Operator::Between => {
            let low = literal(dtype, filter.value.as_ref())?;
            let high = literal(dtype, filter.value2.as_ref())?;
            column.clone().gt_eq(low).and(column.lt_eq(high))
        }
        Operator::In => {
            let mut any: Option<Expr> = None;
            for value in &filter.values {
                let eq = column.clone().eq(literal(dtype, Some(value))?);
                any = Some(match any {
                    Some(acc) => acc.or(eq),
                    None => eq,
                });
            }
            any.ok_or_else(|| EngineError::Validation("IN requires values".into()))?
        }
        Operator::IsNull => column.is_null(),
        Operator::IsNotNull => column.is_not_null(),
    };
    Ok(expr)
}

/// Literal for a comparison, coerced to the column's numeric dtype when the text parses
fn literal(dtype: &DataType, value: Option<&Value>) -> EngineResult<Expr> {
    let numeric_column = dtype.is_integer() || dtype.is_float();
    match value {
        Some(Value::Number(n)) => Ok(number_literal(dtype, n)),
        Some(Value::String(s)) if numeric_column => match s.trim().parse::<f64>() {
            Ok(f) if dtype.is_integer() && f.fract() == 0.0 => Ok(lit(f as i64)),
            Ok(f) => Ok(lit(f)),
            Err(_) => Ok(lit(s.clone())),
        },
        Some(Value::String(s)) => Ok(lit(s.clone())),
        Some(Value::Bool(b)) => Ok(lit(*b)),
        Some(other) => Err(EngineError::Validation(format!("unsupported filter value: {other}"))),
        None => Err(EngineError::Validation("missing filter value".into())),
    }
}

fn number_literal(dtype: &DataType, n: &Number) -> Expr {
    match (n.as_i64(), n.as_f64()) {
        (Some(i), _) if !dtype.is_float() => lit(i),
        (_, Some(f)) => lit(f),
        (Some(i), None) => lit(i),
        (None, None) => lit(NULL),
    }
}

/// SQL LIKE against the column's text form: `%` is any run, `_` any single character
fn like_expr(column: Expr, pattern: Option<&Value>) -> EngineResult<Expr> {
    let pattern = match pattern {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => return Err(EngineError::Validation("LIKE requires a text pattern".into())),
    };
    Ok(column.cast(DataType::String).str().contains(lit(like_to_regex(&pattern)), true))
}

pub(crate) fn like_to_regex(pattern: &str) -> String {
    let mut out = String::from("(?s)^");
    let mut literal = String::new();
    for ch in pattern.chars() {
        match ch {
            '%' | '_' => {
                out.push_str(&regex::escape(&literal));
                literal.clear();
                out.push_str(if ch == '%' { ".*" } else { "." });
            }
            other => literal.push(other),
        }
    }
    out.push_str(&regex::escape(&literal));
    out.push('$');
    out
}

fn anyvalue_to_json(value: &AnyValue) -> Value {
    match value {
        AnyValue::Null => Value::Null,
        AnyValue::Boolean(b) => Value::Bool(*b),
        AnyValue::String(s) => Value::String(s.to_string()),
        AnyValue::StringOwned(s) => Value::String(s.to_string()),
        AnyValue::UInt8(n) => Value::Number((*n).into()),
        AnyValue::UInt16(n) => Value::Number((*n).into()),
        AnyValue::UInt32(n) => Value::Number((*n).into()),
        AnyValue::UInt64(n) => Value::Number((*n).into()),
        AnyValue::Int8(n) => Value::Number((*n).into()),
        AnyValue::Int16(n) => Value::Number((*n).into()),
        AnyValue::Int32(n) => Value::Number((*n).into()),
        AnyValue::Int64(n) => Value::Number((*n).into()),
        AnyValue::Float32(n) => Number::from_f64(*n as f64).map(Value::Number).unwrap_or(Value::Null),
        AnyValue::Float64(n) => Number::from_f64(*n).map(Value::Number).unwrap_or(Value::Null),
        other => Value::String(other.to_string()),
    }
}

fn frame_to_rows(df: &DataFrame) -> EngineResult<Vec<ResultRow>> {
    let columns = df.get_columns();
    let mut rows = Vec::with_capacity(df.height());
    for idx in 0..df.height() {
        let mut row = ResultRow::new();
        for column in columns {
            row.insert(column.name().to_string(), anyvalue_to_json(&column.get(idx)?));
        }
        rows.push(row);
    }
    Ok(rows)
}

impl Catalog for LocalViews {
    async fn list_views(&self) -> EngineResult<Vec<ViewInfo>> {
        Ok(self
            .views
            .iter()
            .map(|(name, view)| ViewInfo { name: name.clone(), label: view.label.clone() })
            .collect())
    }

    async fn list_columns(&self, view_name: &str) -> EngineResult<Vec<ColumnInfo>> {
        let schema = self.schema(view_name)?;
        Ok(schema
            .iter()
            .map(|(name, dtype)| ColumnInfo { name: name.to_string(), data_type: Some(dtype.to_string()) })
            .collect())
    }
}

impl QueryBackend for LocalViews {
    async fn execute(&self, request: &QueryRequest) -> EngineResult<QueryResponse> {
        self.run(request).map(QueryResponse::ok)
    }

    async fn validate(&self, view_name: &str, columns: &[String]) -> EngineResult<ValidationReport> {
        let schema = match self.schema(view_name) {
            Ok(schema) => schema,
            Err(EngineError::UnknownView(v)) => {
                return Ok(ValidationReport { success: false, message: format!("unknown view: {v}") });
            }
            Err(e) => return Err(e),
        };
        let missing: Vec<&str> = columns
            .iter()
            .filter(|c| schema.get(c.as_str()).is_none())
            .map(String::as_str)
            .collect();
        let report = if columns.is_empty() {
            ValidationReport { success: false, message: "no columns selected".into() }
        } else if missing.is_empty() {
            ValidationReport { success: true, message: format!("{} columns available", columns.len()) }
        } else {
            ValidationReport { success: false, message: format!("unknown columns: {}", missing.join(", ")) }
        };
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::widget::{OrderBy, SortDirection};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn views() -> LocalViews {
        let df = df!(
            "produto" => ["A", "B", "A", "C"],
            "categoria" => ["x", "y", "x", "y"],
            "total" => [100i64, 50, 25, 10],
        )
        .unwrap();
        let mut views = LocalViews::new();
        views.register_frame("vw_sales", "Sales", df);
        views
    }

    fn request(columns: &[&str]) -> QueryRequest {
        QueryRequest {
            view_name: "vw_sales".into(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn like_translation_anchors_and_escapes() {
        assert_eq!(like_to_regex("a%"), "(?s)^a.*$");
        assert_eq!(like_to_regex("_.b"), "(?s)^.\\.b$");
    }

    #[test]
    fn incomplete_filters_are_skipped() {
        let mut req = request(&["produto"]);
        req.filters = vec![
            Filter { column: "total".into(), operator: Some(Operator::Equal), ..Default::default() },
            Filter::new("categoria", Operator::Equal).with_value("y"),
        ];
        let rows = views().run(&req).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["produto"], json!("B"));
    }

    #[test]
    fn selects_columns_in_order() {
        let rows = views().run(&request(&["total", "produto"])).unwrap();
        assert_eq!(rows.len(), 4);
        let keys: Vec<&String> = rows[0].keys().collect();
        assert_eq!(keys, vec!["total", "produto"]);
    }

    #[test]
    fn filters_coerce_text_to_numbers() {
        let mut req = request(&["produto", "total"]);
        req.filters = vec![Filter::new("total", Operator::GreaterEqual).with_value("50")];
        let rows = views().run(&req).unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn between_in_and_like() {
        let mut req = request(&["produto"]);
        req.filters = vec![Filter::new("total", Operator::Between).with_range(20, 100)];
        assert_eq!(views().run(&req).unwrap().len(), 3);

        req.filters = vec![Filter::new("produto", Operator::In).with_values(["A", "C"])];
        assert_eq!(views().run(&req).unwrap().len(), 3);

        req.filters = vec![Filter::new("categoria", Operator::NotLike).with_value("x%")];
        assert_eq!(views().run(&req).unwrap().len(), 2);
    }

    #[test]
    fn aggregates_group_by_remaining_columns() {
        let mut req = request(&["produto", "total"]);
        req.aggregations = vec![Aggregation { column: "total".into(), function: AggregateFunction::Sum }];
        req.order_by = Some(OrderBy { column: "total".into(), direction: SortDirection::Desc });
        let rows = views().run(&req).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0]["produto"], json!("A"));
        assert_eq!(rows[0]["sum_total"], json!(125));
        let keys: Vec<&String> = rows[0].keys().collect();
        assert_eq!(keys, vec!["produto", "sum_total"]);
    }

    #[test]
    fn unknown_view_and_column_are_errors() {
        let mut req = request(&["produto"]);
        req.view_name = "nope".into();
        assert!(matches!(views().run(&req), Err(EngineError::UnknownView(_))));
        assert!(matches!(views().run(&request(&["ghost"])), Err(EngineError::Validation(_))));
    }

    #[tokio::test]
    async fn catalog_lists_views_and_columns() {
        let views = views();
        let listed = views.list_views().await.unwrap();
        assert_eq!(listed, vec![ViewInfo { name: "vw_sales".into(), label: "Sales".into() }]);
        let columns = views.list_columns("vw_sales").await.unwrap();
        let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["produto", "categoria", "total"]);
        assert!(views.list_columns("nope").await.is_err());
    }

    #[tokio::test]
    async fn validate_reports_missing_columns() {
        let views = views();
        let ok = views.validate("vw_sales", &["total".into()]).await.unwrap();
        assert!(ok.success);
        let bad = views.validate("vw_sales", &["ghost".into()]).await.unwrap();
        assert!(!bad.success);
        assert!(bad.message.contains("ghost"));
        let unknown = views.validate("nope", &["total".into()]).await.unwrap();
        assert!(!unknown.success);
    }
}
