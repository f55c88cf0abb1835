//! Query execution adapter: turns a widget configuration into a backend request and
//! normalizes every outcome into a success/failure envelope.
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::filter::Filter;
use crate::core::types::ResultRow;
use crate::core::widget::{Aggregation, OrderBy, WidgetConfig};
use crate::error::EngineResult;

/// The query-relevant slice of a widget configuration. Chart settings never reach the backend.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    pub view_name: String,
    pub columns: Vec<String>,
    #[serde(default)]
    pub filters: Vec<Filter>,
    #[serde(default)]
    pub aggregations: Vec<Aggregation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_by: Option<OrderBy>,
}

impl From<&WidgetConfig> for QueryRequest {
    fn from(config: &WidgetConfig) -> Self {
        Self {
            view_name: config.view_name.clone(),
            columns: config.selected_columns.clone(),
            filters: config.filters.clone(),
            aggregations: config.aggregations.clone(),
            order_by: config.order_by.clone(),
        }
    }
}

/// Response envelope as produced by a backend
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QueryResponse {
    pub success: bool,
    #[serde(default)]
    pub data: Vec<ResultRow>,
    #[serde(default)]
    pub count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Outcome handed to callers. A failure always carries empty data.
pub type QueryResult = QueryResponse;

impl QueryResponse {
    pub fn ok(data: Vec<ResultRow>) -> Self {
        let count = data.len();
        Self { success: true, data, count, error: None }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self { success: false, data: Vec::new(), count: 0, error: Some(error.into()) }
    }
}

/// Outcome of a dry-run validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub success: bool,
    #[serde(default)]
    pub message: String,
}

/// Capability that actually runs queries
#[allow(async_fn_in_trait)]
pub trait QueryBackend {
    async fn execute(&self, request: &QueryRequest) -> EngineResult<QueryResponse>;

    async fn validate(&self, view_name: &str, columns: &[String]) -> EngineResult<ValidationReport>;
}

/// Adapter in front of a [`QueryBackend`]; never returns an error to its caller.
#[derive(Debug, Clone)]
pub struct QueryExecutor<B> {
    backend: B,
}

impl<B: QueryBackend> QueryExecutor<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub async fn execute_query(&self, request: &QueryRequest) -> QueryResult {
        debug!(view = %request.view_name, columns = request.columns.len(), "executing query");
        match self.backend.execute(request).await {
            Ok(response) if response.success => {
                let count = if response.count == 0 { response.data.len() } else { response.count };
                QueryResult { count, ..response }
            }
            Ok(response) => {
                let error = response.error.unwrap_or_else(|| "query failed".to_string());
                warn!(view = %request.view_name, %error, "backend reported failure");
                QueryResult::failure(error)
            }
            Err(e) => {
                warn!(view = %request.view_name, error = %e, "query transport failed");
                QueryResult::failure(e.to_string())
            }
        }
    }

    /// Run the configuration's query part; chart settings are dropped
    pub async fn execute_config(&self, config: &WidgetConfig) -> QueryResult {
        self.execute_query(&QueryRequest::from(config)).await
    }

    pub async fn validate_query(&self, view_name: &str, columns: &[String]) -> ValidationReport {
        match self.backend.validate(view_name, columns).await {
            Ok(report) => report,
            Err(e) => ValidationReport { success: false, message: e.to_string() },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::widget::{ChartConfig, ChartField};
    use crate::error::EngineError;
    use serde_json::json;

    enum Scripted {
        Rows(Vec<ResultRow>),
        Refuse,
        Break,
    }

    impl QueryBackend for Scripted {
        async fn execute(&self, _request: &QueryRequest) -> EngineResult<QueryResponse> {
            match self {
                Scripted::Rows(rows) => Ok(QueryResponse::ok(rows.clone())),
                Scripted::Refuse => Ok(QueryResponse { success: false, ..Default::default() }),
                Scripted::Break => Err(EngineError::Backend { status: 502, message: "bad gateway".into() }),
            }
        }

        async fn validate(&self, view_name: &str, _columns: &[String]) -> EngineResult<ValidationReport> {
            match self {
                Scripted::Break => Err(EngineError::UnknownView(view_name.to_string())),
                _ => Ok(ValidationReport { success: true, message: String::new() }),
            }
        }
    }

    fn row(v: serde_json::Value) -> ResultRow {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn request_strips_chart_config() {
        let mut chart = ChartConfig::default();
        chart.apply(ChartField::Title("Sales".into()));
        let config = WidgetConfig {
            view_name: "vw".into(),
            selected_columns: vec!["a".into()],
            chart_config: chart,
            ..Default::default()
        };
        let value = serde_json::to_value(QueryRequest::from(&config)).unwrap();
        assert!(value.get("chartConfig").is_none());
        assert_eq!(value["viewName"], json!("vw"));
    }

    #[tokio::test]
    async fn success_passes_rows_through() {
        let executor = QueryExecutor::new(Scripted::Rows(vec![row(json!({"a": 1}))]));
        let result = executor.execute_query(&QueryRequest::default()).await;
        assert!(result.success);
        assert_eq!(result.count, 1);
    }

    #[tokio::test]
    async fn transport_error_becomes_failure_envelope() {
        let executor = QueryExecutor::new(Scripted::Break);
        let result = executor.execute_query(&QueryRequest::default()).await;
        assert!(!result.success);
        assert!(result.data.is_empty());
        assert!(result.error.unwrap().contains("502"));
    }

    #[tokio::test]
    async fn non_success_response_becomes_failure_envelope() {
        let executor = QueryExecutor::new(Scripted::Refuse);
        let result = executor.execute_query(&QueryRequest::default()).await;
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("query failed"));
    }

    #[tokio::test]
    async fn validate_never_errors() {
        let executor = QueryExecutor::new(Scripted::Break);
        let report = executor.validate_query("nope", &[]).await;
        assert!(!report.success);
        assert!(report.message.contains("nope"));
    }
}
