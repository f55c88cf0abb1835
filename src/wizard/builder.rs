use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::action::{Action, Effect};
use crate::core::types::{DashboardId, WidgetId};
use crate::error::EngineResult;
use crate::render::{Visual, render_widget};
use crate::services::catalog::Catalog;
use crate::services::query::{QueryBackend, QueryExecutor};
use crate::services::store::WidgetStore;
use crate::wizard::state::{WizardState, reduce};

/// Drives a [`WizardState`] against real capabilities.
///
/// Each `dispatch` runs the reducer, performs the resulting effects and feeds their outcomes back
/// in as actions until nothing is left. Concurrent dispatches are allowed: the state lock is
/// never held across an await, so a slow preview cannot block edits.
pub struct WidgetBuilder<C, Q, S> {
    catalog: C,
    executor: QueryExecutor<Q>,
    store: S,
    state: Mutex<WizardState>,
    debounce: Duration,
    schedule_generation: AtomicU64,
}

impl<C: Catalog, Q: QueryBackend, S: WidgetStore> WidgetBuilder<C, Q, S> {
    pub fn new(catalog: C, backend: Q, store: S, dashboard: DashboardId, debounce: Duration) -> Self {
        Self {
            catalog,
            executor: QueryExecutor::new(backend),
            store,
            state: Mutex::new(WizardState::new(dashboard)),
            debounce,
            schedule_generation: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, WizardState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of the current wizard state
    pub fn state(&self) -> WizardState {
        self.lock().clone()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Load a persisted widget into the wizard for editing
    pub async fn edit(&self, id: &WidgetId) -> EngineResult<()> {
        let record = self.store.get(id).await?;
        self.dispatch(Action::EditWidget { id: record.id, dashboard: record.dashboard_id, config: record.config })
            .await;
        Ok(())
    }

    pub async fn dispatch(&self, action: Action) {
        let mut queue = VecDeque::from([action]);
        while let Some(action) = queue.pop_front() {
            let effects = {
                let mut guard = self.lock();
                let (next, effects) = reduce(guard.clone(), action);
                *guard = next;
                effects
            };
            for effect in effects {
                if let Some(follow_up) = self.run_effect(effect).await {
                    queue.push_back(follow_up);
                }
            }
        }
    }

    async fn run_effect(&self, effect: Effect) -> Option<Action> {
        match effect {
            Effect::FetchViews => match self.catalog.list_views().await {
                Ok(views) => Some(Action::ViewsLoaded(views)),
                Err(e) => {
                    warn!(error = %e, "view catalog unavailable");
                    Some(Action::ViewsLoaded(Vec::new()))
                }
            },
            Effect::FetchColumns { view } => match self.catalog.list_columns(&view).await {
                Ok(columns) => Some(Action::ColumnsLoaded { view, columns }),
                Err(e) => {
                    warn!(%view, error = %e, "column catalog unavailable");
                    Some(Action::ColumnsFailed { view, error: e.to_string() })
                }
            },
            Effect::SchedulePreview => {
                let generation = self.schedule_generation.fetch_add(1, Ordering::SeqCst) + 1;
                tokio::time::sleep(self.debounce).await;
                if self.schedule_generation.load(Ordering::SeqCst) == generation {
                    Some(Action::RequestPreview)
                } else {
                    debug!(generation, "preview schedule superseded");
                    None
                }
            }
            Effect::RunPreview { token, request } => {
                let result = self.executor.execute_query(&request).await;
                Some(Action::PreviewLoaded { token, result })
            }
            Effect::Persist { editing, dashboard, config } => {
                let outcome = match editing {
                    Some(id) => self.store.update(&id, config).await,
                    None => self.store.create(&dashboard, config).await,
                };
                match outcome {
                    Ok(record) => {
                        info!(widget = %record.id, "widget persisted");
                        Some(Action::SaveSucceeded(record.id))
                    }
                    Err(e) => {
                        error!(error = %e, "failed to persist widget");
                        Some(Action::SaveFailed(e.to_string()))
                    }
                }
            }
        }
    }

    /// Render the latest preview under the draft's chart settings
    pub fn preview_visual(&self) -> Visual {
        let state = self.lock();
        let rows = state.preview.as_ref().filter(|p| p.success).map(|p| p.data.as_slice());
        render_widget(&state.config, rows)
    }
}
