use serde::{Deserialize, Serialize};
use strum::Display;

use crate::core::filter::Filter;
use crate::core::types::{DashboardId, FilterId, WidgetId};
use crate::core::widget::{AggregateFunction, ChartField, OrderBy, WidgetConfig, WidgetType};
use crate::services::catalog::{ColumnInfo, ViewInfo};
use crate::services::query::{QueryRequest, QueryResult};
use crate::wizard::state::Stage;

/// Everything the widget wizard reacts to: user edits and completions of async work.
#[derive(Debug, Clone, PartialEq, Display, Serialize, Deserialize)]
pub enum Action {
    /// Ask the catalog for the list of views
    LoadViews,
    ViewsLoaded(Vec<ViewInfo>),
    /// Open the wizard on a persisted widget
    EditWidget {
        id: WidgetId,
        dashboard: DashboardId,
        config: WidgetConfig,
    },
    GoToStage(Stage),
    NextStage,
    PrevStage,
    SetName(String),
    SetWidgetType(WidgetType),
    /// Choose the source view; downstream selections are reset
    SelectView(String),
    ColumnsLoaded {
        view: String,
        columns: Vec<ColumnInfo>,
    },
    ColumnsFailed {
        view: String,
        error: String,
    },
    ToggleColumn(String),
    /// Replace the filter being composed
    EditFilterDraft(Filter),
    /// Validate the draft filter and append it
    AddFilter,
    RemoveFilter(FilterId),
    SetAggregation {
        column: String,
        function: Option<AggregateFunction>,
    },
    SetOrderBy(OrderBy),
    ClearOrderBy,
    SetChartField(ChartField),
    RequestPreview,
    PreviewLoaded {
        token: u64,
        result: QueryResult,
    },
    Save,
    SaveSucceeded(WidgetId),
    SaveFailed(String),
    DismissNotice,
    Close,
}

/// Work the reducer asks its driver to perform
#[derive(Debug, Clone, PartialEq, Display, Serialize, Deserialize)]
pub enum Effect {
    FetchViews,
    FetchColumns { view: String },
    /// Debounced preview; superseded schedules are dropped
    SchedulePreview,
    RunPreview { token: u64, request: QueryRequest },
    Persist {
        editing: Option<WidgetId>,
        dashboard: DashboardId,
        config: WidgetConfig,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// User-facing message left on the wizard after an action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Info, message: message.into() }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Warning, message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Error, message: message.into() }
    }
}
