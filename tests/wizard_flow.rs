//! End-to-end wizard flows against in-memory capabilities

use dashwidget::action::{Action, NoticeLevel};
use dashwidget::core::filter::{Filter, Operator};
use dashwidget::core::types::{DashboardId, ResultRow};
use dashwidget::core::widget::{AggregateFunction, ChartField, WidgetType};
use dashwidget::error::{EngineError, EngineResult};
use dashwidget::render::Visual;
use dashwidget::services::{
    Catalog, ColumnInfo, QueryBackend, QueryRequest, QueryResponse, SqliteStore, ValidationReport, ViewInfo,
    WidgetStore,
};
use dashwidget::wizard::{Stage, WidgetBuilder};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Clone, Default)]
struct FakeCatalog;

impl Catalog for FakeCatalog {
    async fn list_views(&self) -> EngineResult<Vec<ViewInfo>> {
        Ok(vec![
            ViewInfo { name: "vw_sales".into(), label: "Sales".into() },
            ViewInfo { name: "vw_broken".into(), label: "Broken".into() },
        ])
    }

    async fn list_columns(&self, view_name: &str) -> EngineResult<Vec<ColumnInfo>> {
        match view_name {
            "vw_sales" => Ok(vec![ColumnInfo::named("produto"), ColumnInfo::named("total")]),
            other => Err(EngineError::Backend { status: 503, message: format!("{other} unavailable") }),
        }
    }
}

/// Answers each call with `{produto, <total or its aggregate alias>, call}`; the first call is slow
#[derive(Clone, Default)]
struct CountingBackend {
    calls: Arc<AtomicUsize>,
    first_call_delay: Duration,
}

impl QueryBackend for CountingBackend {
    async fn execute(&self, request: &QueryRequest) -> EngineResult<QueryResponse> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = if call == 0 { self.first_call_delay } else { Duration::from_millis(10) };
        tokio::time::sleep(delay).await;
        let total_key = request
            .aggregations
            .iter()
            .find(|a| a.column == "total")
            .map(|a| a.alias())
            .unwrap_or_else(|| "total".into());
        let mut row = ResultRow::new();
        row.insert("produto".into(), json!("A"));
        row.insert(total_key, json!(100));
        row.insert("call".into(), json!(call));
        Ok(QueryResponse::ok(vec![row]))
    }

    async fn validate(&self, _view_name: &str, _columns: &[String]) -> EngineResult<ValidationReport> {
        Ok(ValidationReport { success: true, message: String::new() })
    }
}

async fn builder_with(
    backend: CountingBackend,
) -> (WidgetBuilder<FakeCatalog, CountingBackend, SqliteStore>, DashboardId) {
    let store = SqliteStore::open_in_memory().unwrap();
    let dashboard = store.create_dashboard("Finance", None).await.unwrap();
    let builder = WidgetBuilder::new(FakeCatalog, backend, store, dashboard.id, Duration::from_millis(300));
    (builder, dashboard.id)
}

async fn select_sales(builder: &WidgetBuilder<FakeCatalog, CountingBackend, SqliteStore>) {
    builder.dispatch(Action::LoadViews).await;
    builder.dispatch(Action::SelectView("vw_sales".into())).await;
    builder.dispatch(Action::ToggleColumn("produto".into())).await;
    builder.dispatch(Action::ToggleColumn("total".into())).await;
}

#[tokio::test]
async fn full_flow_saves_and_resets() {
    let (builder, dashboard) = builder_with(CountingBackend::default()).await;
    select_sales(&builder).await;

    let state = builder.state();
    assert_eq!(state.views.len(), 2);
    assert_eq!(state.columns.len(), 2);
    assert!(Stage::Filters.is_unlocked(&state.config));

    builder.dispatch(Action::SetName("Vendas por produto".into())).await;
    builder.dispatch(Action::SetWidgetType(WidgetType::Pie)).await;
    builder.dispatch(Action::EditFilterDraft(Filter::new("total", Operator::Greater).with_value(0))).await;
    builder.dispatch(Action::AddFilter).await;
    builder
        .dispatch(Action::SetAggregation { column: "total".into(), function: Some(AggregateFunction::Sum) })
        .await;
    builder.dispatch(Action::SetChartField(ChartField::XAxis(Some("produto".into())))).await;
    builder.dispatch(Action::SetChartField(ChartField::YAxis(vec!["total".into()]))).await;
    builder.dispatch(Action::GoToStage(Stage::PreviewAndSave)).await;
    builder.dispatch(Action::RequestPreview).await;

    let Visual::Pie(pie) = builder.preview_visual() else {
        panic!("expected a pie preview");
    };
    assert_eq!(pie.keys.name_key, "produto");
    assert_eq!(pie.keys.value_key, "sum_total");
    assert_eq!(pie.slices[0].label, "A: R$100");

    builder.dispatch(Action::Save).await;
    let state = builder.state();
    let id = state.last_saved.expect("widget id");
    assert_eq!(state.stage, Stage::ViewAndColumns);
    assert!(state.config.selected_columns.is_empty());
    assert_eq!(state.notice.as_ref().map(|n| n.level), Some(NoticeLevel::Info));

    let stored = builder.store().get(&id).await.unwrap();
    assert_eq!(stored.dashboard_id, dashboard);
    assert_eq!(stored.config.name, "Vendas por produto");
    assert_eq!(stored.config.filters.len(), 1);
    assert_eq!(stored.config.aggregations.len(), 1);
    assert_eq!(stored.config.chart_config.y_axis, vec!["total".to_string()]);
}

#[tokio::test]
async fn failed_column_fetch_is_recoverable() {
    let (builder, _) = builder_with(CountingBackend::default()).await;
    builder.dispatch(Action::SelectView("vw_broken".into())).await;
    let state = builder.state();
    assert!(state.columns.is_empty());
    assert!(!state.loading_columns);
    assert_eq!(state.notice.as_ref().map(|n| n.level), Some(NoticeLevel::Warning));

    builder.dispatch(Action::SelectView("vw_sales".into())).await;
    assert_eq!(builder.state().columns.len(), 2);
}

#[tokio::test]
async fn failed_save_keeps_the_draft() {
    let store = SqliteStore::open_in_memory().unwrap();
    // dashboard never created, so persisting fails
    let builder = WidgetBuilder::new(
        FakeCatalog,
        CountingBackend::default(),
        store,
        DashboardId::new(),
        Duration::from_millis(300),
    );
    select_sales(&builder).await;
    builder.dispatch(Action::SetName("Orphan".into())).await;
    builder.dispatch(Action::Save).await;

    let state = builder.state();
    assert!(!state.saving);
    assert_eq!(state.last_saved, None);
    assert_eq!(state.config.name, "Orphan");
    assert_eq!(state.config.selected_columns, vec!["produto".to_string(), "total".into()]);
    assert_eq!(state.notice.as_ref().map(|n| n.level), Some(NoticeLevel::Error));
}

#[tokio::test]
async fn editing_updates_in_place() {
    let (builder, dashboard) = builder_with(CountingBackend::default()).await;
    select_sales(&builder).await;
    builder.dispatch(Action::SetName("First".into())).await;
    builder.dispatch(Action::Save).await;
    let id = builder.state().last_saved.unwrap();

    builder.edit(&id).await.unwrap();
    let state = builder.state();
    assert_eq!(state.editing, Some(id));
    assert_eq!(state.columns.len(), 2);
    builder.dispatch(Action::SetName("Renamed".into())).await;
    builder.dispatch(Action::Save).await;

    assert_eq!(builder.state().last_saved, Some(id));
    let widgets = builder.store().list(&dashboard).await.unwrap();
    assert_eq!(widgets.len(), 1);
    assert_eq!(widgets[0].config.name, "Renamed");
}

#[tokio::test(start_paused = true)]
async fn last_issued_preview_wins() {
    let backend = CountingBackend { first_call_delay: Duration::from_millis(500), ..Default::default() };
    let (builder, _) = builder_with(backend).await;
    select_sales(&builder).await;

    tokio::join!(builder.dispatch(Action::RequestPreview), async {
        tokio::time::sleep(Duration::from_millis(5)).await;
        builder.dispatch(Action::RequestPreview).await;
    });

    let state = builder.state();
    assert_eq!(state.preview_token, 2);
    let preview = state.preview.expect("preview");
    // the slow first response resolved last and was discarded
    assert_eq!(preview.data[0]["call"], json!(1));
}

#[tokio::test(start_paused = true)]
async fn axis_edits_are_debounced() {
    let backend = CountingBackend::default();
    let calls = backend.calls.clone();
    let (builder, _) = builder_with(backend).await;
    select_sales(&builder).await;

    tokio::join!(builder.dispatch(Action::SetChartField(ChartField::XAxis(Some("produto".into())))), async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        builder.dispatch(Action::SetChartField(ChartField::YAxis(vec!["total".into()]))).await;
    });
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(builder.state().preview_token, 1);

    // cosmetic fields never trigger a preview
    builder.dispatch(Action::SetChartField(ChartField::ShowLegend(false))).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}
