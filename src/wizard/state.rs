//! The widget wizard as an explicit state machine.
//!
//! [`reduce`] is the only place stage gating and reset rules live. It is pure: async work is
//! described as [`Effect`]s and fed back in as actions by [`crate::wizard::WidgetBuilder`].
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};
use tracing::debug;

use crate::action::{Action, Effect, Notice};
use crate::core::filter::{Filter, validate_filter};
use crate::core::types::{DashboardId, FilterId, WidgetId};
use crate::core::widget::{ChartField, WidgetConfig};
use crate::services::catalog::{ColumnInfo, ViewInfo};
use crate::services::query::{QueryRequest, QueryResult};

/// The five wizard stages, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Display, EnumIter, Serialize, Deserialize)]
pub enum Stage {
    #[default]
    #[strum(to_string = "1. View & columns")]
    ViewAndColumns,
    #[strum(to_string = "2. Filters")]
    Filters,
    #[strum(to_string = "3. Aggregations & order")]
    AggregationsAndOrder,
    #[strum(to_string = "4. Visualization")]
    Visualization,
    #[strum(to_string = "5. Preview & save")]
    PreviewAndSave,
}

impl Stage {
    pub fn number(self) -> u8 {
        match self {
            Stage::ViewAndColumns => 1,
            Stage::Filters => 2,
            Stage::AggregationsAndOrder => 3,
            Stage::Visualization => 4,
            Stage::PreviewAndSave => 5,
        }
    }

    pub fn from_number(n: u8) -> Option<Self> {
        match n {
            1 => Some(Stage::ViewAndColumns),
            2 => Some(Stage::Filters),
            3 => Some(Stage::AggregationsAndOrder),
            4 => Some(Stage::Visualization),
            5 => Some(Stage::PreviewAndSave),
            _ => None,
        }
    }

    /// Saturates at the last stage
    pub fn next(self) -> Self {
        Self::from_number(self.number() + 1).unwrap_or(self)
    }

    /// Saturates at the first stage
    pub fn prev(self) -> Self {
        Self::from_number(self.number().saturating_sub(1)).unwrap_or(self)
    }

    /// Whether this stage's affordances are usable for the given draft
    pub fn is_unlocked(self, config: &WidgetConfig) -> bool {
        match self {
            Stage::ViewAndColumns => true,
            _ => config.has_columns(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WizardState {
    pub stage: Stage,
    pub closed: bool,
    pub dashboard: DashboardId,
    /// Set when editing a persisted widget; saving then updates instead of creating
    pub editing: Option<WidgetId>,
    pub config: WidgetConfig,
    pub views: Vec<ViewInfo>,
    pub columns: Vec<ColumnInfo>,
    pub loading_columns: bool,
    pub draft: Filter,
    pub notice: Option<Notice>,
    pub saving: bool,
    pub preview_token: u64,
    pub previewing: bool,
    pub preview: Option<QueryResult>,
    pub last_saved: Option<WidgetId>,
}

impl WizardState {
    /// A fresh wizard creating a widget under `dashboard`
    pub fn new(dashboard: DashboardId) -> Self {
        Self {
            stage: Stage::ViewAndColumns,
            closed: false,
            dashboard,
            editing: None,
            config: WidgetConfig::default(),
            views: Vec::new(),
            columns: Vec::new(),
            loading_columns: false,
            draft: Filter::default(),
            notice: None,
            saving: false,
            preview_token: 0,
            previewing: false,
            preview: None,
            last_saved: None,
        }
    }

    pub fn open_existing(id: WidgetId, dashboard: DashboardId, config: WidgetConfig) -> Self {
        Self { editing: Some(id), config, ..Self::new(dashboard) }
    }

    /// Gate for edits that need a view and at least one selected column
    fn require_columns(&mut self, what: &str) -> bool {
        if !self.config.has_view() {
            self.notice = Some(Notice::warning(format!("Choose a data view before {what}")));
            false
        } else if self.config.selected_columns.is_empty() {
            self.notice = Some(Notice::warning(format!("Select at least one column before {what}")));
            false
        } else {
            true
        }
    }

    fn start_fetch_columns(&mut self, effects: &mut Vec<Effect>) {
        self.columns.clear();
        self.loading_columns = true;
        effects.push(Effect::FetchColumns { view: self.config.view_name.clone() });
    }

    fn apply(&mut self, action: Action) -> Vec<Effect> {
        let mut effects = Vec::new();
        match action {
            Action::LoadViews => effects.push(Effect::FetchViews),
            Action::ViewsLoaded(views) => self.views = views,
            Action::EditWidget { id, dashboard, config } => {
                *self = Self::open_existing(id, dashboard, config);
                if self.config.has_view() {
                    self.start_fetch_columns(&mut effects);
                }
            }
            Action::GoToStage(stage) => self.stage = stage,
            Action::NextStage => self.stage = self.stage.next(),
            Action::PrevStage => self.stage = self.stage.prev(),
            Action::SetName(name) => self.config.name = name,
            Action::SetWidgetType(widget_type) => self.config.widget_type = widget_type,
            Action::SelectView(view) => {
                self.config.reset_for_view(&view);
                self.draft = Filter::default();
                self.preview = None;
                self.start_fetch_columns(&mut effects);
            }
            Action::ColumnsLoaded { view, columns } => {
                if view == self.config.view_name {
                    self.columns = columns;
                    self.loading_columns = false;
                } else {
                    debug!(%view, current = %self.config.view_name, "ignoring stale column list");
                }
            }
            Action::ColumnsFailed { view, error } => {
                if view == self.config.view_name {
                    self.columns.clear();
                    self.loading_columns = false;
                    self.notice = Some(Notice::warning(format!(
                        "Could not load columns for {view}: {error}. Reselect the view to retry."
                    )));
                }
            }
            Action::ToggleColumn(column) => {
                if self.config.has_view() {
                    self.config.toggle_column(&column);
                } else {
                    self.notice = Some(Notice::warning("Choose a data view before selecting columns"));
                }
            }
            Action::EditFilterDraft(draft) => self.draft = draft,
            Action::AddFilter => {
                if self.require_columns("adding filters") {
                    match validate_filter(&self.draft) {
                        Ok(()) => {
                            let mut filter = std::mem::take(&mut self.draft);
                            filter.id = FilterId::new();
                            self.config.filters.push(filter);
                        }
                        Err(e) => self.notice = Some(Notice::error(e.to_string())),
                    }
                }
            }
            Action::RemoveFilter(id) => self.config.filters.retain(|f| f.id != id),
            Action::SetAggregation { column, function } => {
                if self.require_columns("adding aggregations") {
                    self.config.set_aggregation(&column, function);
                }
            }
            Action::SetOrderBy(order) => {
                if self.require_columns("sorting") {
                    self.config.order_by = Some(order);
                }
            }
            Action::ClearOrderBy => self.config.order_by = None,
            Action::SetChartField(field) => self.set_chart_field(field, &mut effects),
            Action::RequestPreview => {
                if self.require_columns("previewing") {
                    self.preview_token += 1;
                    self.previewing = true;
                    effects.push(Effect::RunPreview {
                        token: self.preview_token,
                        request: QueryRequest::from(&self.config),
                    });
                }
            }
            Action::PreviewLoaded { token, result } => {
                if token == self.preview_token {
                    if !result.success {
                        let message = result.error.clone().unwrap_or_else(|| "query failed".into());
                        self.notice = Some(Notice::error(format!("Preview failed: {message}")));
                    }
                    self.previewing = false;
                    self.preview = Some(result);
                } else {
                    debug!(token, latest = self.preview_token, "discarding stale preview");
                }
            }
            Action::Save => {
                if self.saving {
                    return effects;
                }
                match self.config.check_saveable() {
                    Ok(()) => {
                        self.saving = true;
                        effects.push(Effect::Persist {
                            editing: self.editing,
                            dashboard: self.dashboard,
                            config: self.config.for_save(),
                        });
                    }
                    Err(e) => self.notice = Some(Notice::error(e.to_string())),
                }
            }
            Action::SaveSucceeded(id) => {
                let views = std::mem::take(&mut self.views);
                *self = Self { views, last_saved: Some(id), ..Self::new(self.dashboard) };
                self.notice = Some(Notice::info("Widget saved"));
            }
            Action::SaveFailed(error) => {
                self.saving = false;
                self.notice = Some(Notice::error(format!("Save failed: {error}")));
            }
            Action::DismissNotice => self.notice = None,
            Action::Close => self.closed = true,
        }
        effects
    }

    fn set_chart_field(&mut self, field: ChartField, effects: &mut Vec<Effect>) {
        if !self.require_columns("configuring the chart") {
            return;
        }
        if let Some(missing) = field.referenced_columns().into_iter().find(|c| !self.config.is_selected(c)) {
            self.notice = Some(Notice::warning(format!("{missing} is not a selected column")));
            return;
        }
        let rerun = field.affects_rendering();
        self.config.chart_config.apply(field);
        if rerun {
            effects.push(Effect::SchedulePreview);
        }
    }
}

/// Apply one action. Returns the next state and the effects the driver should run.
pub fn reduce(mut state: WizardState, action: Action) -> (WizardState, Vec<Effect>) {
    if state.closed {
        debug!(%action, "wizard closed, ignoring action");
        return (state, Vec::new());
    }
    debug!(%action, stage = %state.stage, "wizard action");
    let effects = state.apply(action);
    (state, effects)
}
