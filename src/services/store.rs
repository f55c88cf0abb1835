//! Widget persistence.
use rusqlite::Connection;
use std::path::Path;
use std::sync::Mutex;
use tracing::info;

use crate::core::models::{DashboardRecord, WidgetRecord};
use crate::core::schema::init_store_schema;
use crate::core::types::{DashboardId, WidgetId};
use crate::core::widget::WidgetConfig;
use crate::error::{EngineError, EngineResult};

/// Stores widget configurations grouped under dashboards
#[allow(async_fn_in_trait)]
pub trait WidgetStore {
    async fn create_dashboard(&self, name: &str, description: Option<&str>) -> EngineResult<DashboardRecord>;

    async fn list_dashboards(&self) -> EngineResult<Vec<DashboardRecord>>;

    /// Persist a new widget; its identity is assigned here and never changes
    async fn create(&self, dashboard_id: &DashboardId, config: WidgetConfig) -> EngineResult<WidgetRecord>;

    async fn update(&self, id: &WidgetId, config: WidgetConfig) -> EngineResult<WidgetRecord>;

    async fn get(&self, id: &WidgetId) -> EngineResult<WidgetRecord>;

    async fn soft_delete(&self, id: &WidgetId) -> EngineResult<()>;

    /// Active widgets only
    async fn list(&self, dashboard_id: &DashboardId) -> EngineResult<Vec<WidgetRecord>>;
}

/// SQLite-backed store
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: &Path) -> EngineResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Self::from_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> EngineResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> EngineResult<Self> {
        init_store_schema(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> EngineResult<T>) -> EngineResult<T> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| EngineError::Config("store connection poisoned".into()))?;
        f(&conn)
    }

    fn load_active(conn: &Connection, id: &WidgetId) -> EngineResult<WidgetRecord> {
        let record = WidgetRecord::load(conn, id)?;
        if !record.active {
            return Err(EngineError::not_found("widget", id));
        }
        Ok(record)
    }
}

impl WidgetStore for SqliteStore {
    async fn create_dashboard(&self, name: &str, description: Option<&str>) -> EngineResult<DashboardRecord> {
        if name.trim().is_empty() {
            return Err(EngineError::Validation("dashboard name is required".into()));
        }
        self.with_conn(|conn| {
            let record = DashboardRecord::new(name.trim().to_string(), description.map(str::to_string));
            record.insert(conn)?;
            info!(dashboard = %record.id, name = %record.name, "dashboard created");
            Ok(record)
        })
    }

    async fn list_dashboards(&self) -> EngineResult<Vec<DashboardRecord>> {
        self.with_conn(DashboardRecord::load_all)
    }

    async fn create(&self, dashboard_id: &DashboardId, config: WidgetConfig) -> EngineResult<WidgetRecord> {
        self.with_conn(|conn| {
            if !DashboardRecord::exists(conn, dashboard_id)? {
                return Err(EngineError::not_found("dashboard", dashboard_id));
            }
            let record = WidgetRecord::new(*dashboard_id, config);
            record.insert(conn)?;
            info!(widget = %record.id, dashboard = %dashboard_id, name = %record.config.name, "widget created");
            Ok(record)
        })
    }

    async fn update(&self, id: &WidgetId, config: WidgetConfig) -> EngineResult<WidgetRecord> {
        self.with_conn(|conn| {
            let mut record = Self::load_active(conn, id)?;
            record.update_config(conn, config)?;
            info!(widget = %id, "widget updated");
            Ok(record)
        })
    }

    async fn get(&self, id: &WidgetId) -> EngineResult<WidgetRecord> {
        self.with_conn(|conn| Self::load_active(conn, id))
    }

    async fn soft_delete(&self, id: &WidgetId) -> EngineResult<()> {
        self.with_conn(|conn| {
            let mut record = Self::load_active(conn, id)?;
            record.deactivate(conn)?;
            info!(widget = %id, "widget deactivated");
            Ok(())
        })
    }

    async fn list(&self, dashboard_id: &DashboardId) -> EngineResult<Vec<WidgetRecord>> {
        self.with_conn(|conn| WidgetRecord::load_for_dashboard(conn, dashboard_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn config(name: &str) -> WidgetConfig {
        WidgetConfig {
            name: name.into(),
            view_name: "vw_sales".into(),
            selected_columns: vec!["produto".into()],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn create_requires_existing_dashboard() {
        let store = SqliteStore::open_in_memory().unwrap();
        let err = store.create(&DashboardId::new(), config("w")).await.unwrap_err();
        assert!(matches!(err, EngineError::NotFound { kind: "dashboard", .. }));
    }

    #[tokio::test]
    async fn update_keeps_identity() {
        let store = SqliteStore::open_in_memory().unwrap();
        let dash = store.create_dashboard("Finance", None).await.unwrap();
        let created = store.create(&dash.id, config("first")).await.unwrap();
        let updated = store.update(&created.id, config("second")).await.unwrap();
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.dashboard_id, dash.id);
        assert_eq!(store.get(&created.id).await.unwrap().config.name, "second");
    }

    #[tokio::test]
    async fn soft_delete_hides_widget() {
        let store = SqliteStore::open_in_memory().unwrap();
        let dash = store.create_dashboard("Finance", Some("monthly")).await.unwrap();
        let a = store.create(&dash.id, config("a")).await.unwrap();
        store.create(&dash.id, config("b")).await.unwrap();
        store.soft_delete(&a.id).await.unwrap();

        let names: Vec<String> = store.list(&dash.id).await.unwrap().into_iter().map(|w| w.config.name).collect();
        assert_eq!(names, vec!["b".to_string()]);
        assert!(matches!(store.get(&a.id).await, Err(EngineError::NotFound { .. })));
        assert!(matches!(store.update(&a.id, config("again")).await, Err(EngineError::NotFound { .. })));
        assert!(matches!(store.soft_delete(&a.id).await, Err(EngineError::NotFound { .. })));
    }

    #[tokio::test]
    async fn blank_dashboard_name_is_rejected() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert!(matches!(store.create_dashboard("  ", None).await, Err(EngineError::Validation(_))));
        assert!(store.list_dashboards().await.unwrap().is_empty());
    }
}
