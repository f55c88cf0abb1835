use crate::core::types::{DashboardId, WidgetId};
use crate::core::widget::WidgetConfig;
use crate::error::{EngineError, EngineResult};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row, params};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// A dashboard: named grouping of widgets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardRecord {
    pub id: DashboardId,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A persisted widget and its configuration snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WidgetRecord {
    pub id: WidgetId,
    pub dashboard_id: DashboardId,
    pub config: WidgetConfig,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn conversion_error(idx: usize, e: impl std::fmt::Display) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        rusqlite::types::Type::Text,
        Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())),
    )
}

fn timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::from_timestamp(row.get(idx)?, 0)
        .ok_or_else(|| rusqlite::Error::IntegralValueOutOfRange(idx, 0))
}

impl DashboardRecord {
    pub fn new(name: String, description: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: DashboardId::new(),
            name,
            description,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn insert(&self, conn: &Connection) -> EngineResult<()> {
        conn.execute(
            "INSERT INTO dashboards (id, name, description, active, created_at, updated_at)
             VALUES (?, ?, ?, 1, ?, ?)",
            params![
                self.id.as_str(),
                &self.name,
                &self.description,
                self.created_at.timestamp(),
                self.updated_at.timestamp(),
            ],
        )?;
        Ok(())
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: DashboardId::from_str(&row.get::<_, String>(0)?).map_err(|e| conversion_error(0, e))?,
            name: row.get(1)?,
            description: row.get(2)?,
            created_at: timestamp(row, 3)?,
            updated_at: timestamp(row, 4)?,
        })
    }

    pub fn exists(conn: &Connection, id: &DashboardId) -> EngineResult<bool> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM dashboards WHERE id = ? AND active = 1",
            [id.as_str()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    pub fn load_all(conn: &Connection) -> EngineResult<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT id, name, description, created_at, updated_at
             FROM dashboards WHERE active = 1 ORDER BY created_at, name",
        )?;
        let records = stmt.query_map([], Self::from_row)?;
        records.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}

impl WidgetRecord {
    pub fn new(dashboard_id: DashboardId, config: WidgetConfig) -> Self {
        let now = Utc::now();
        Self {
            id: WidgetId::new(),
            dashboard_id,
            config,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn insert(&self, conn: &Connection) -> EngineResult<()> {
        conn.execute(
            "INSERT INTO widgets (id, dashboard_id, name, widget_type, config, active, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                self.id.as_str(),
                self.dashboard_id.as_str(),
                &self.config.name,
                self.config.widget_type.to_string(),
                serde_json::to_string(&self.config)?,
                self.active,
                self.created_at.timestamp(),
                self.updated_at.timestamp(),
            ],
        )?;
        Ok(())
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let config: String = row.get(2)?;
        Ok(Self {
            id: WidgetId::from_str(&row.get::<_, String>(0)?).map_err(|e| conversion_error(0, e))?,
            dashboard_id: DashboardId::from_str(&row.get::<_, String>(1)?)
                .map_err(|e| conversion_error(1, e))?,
            config: serde_json::from_str(&config).map_err(|e| conversion_error(2, e))?,
            active: row.get(3)?,
            created_at: timestamp(row, 4)?,
            updated_at: timestamp(row, 5)?,
        })
    }

    /// Load a widget by ID, including soft-deleted ones
    pub fn load(conn: &Connection, id: &WidgetId) -> EngineResult<Self> {
        let mut stmt = conn.prepare(
            "SELECT id, dashboard_id, config, active, created_at, updated_at
             FROM widgets WHERE id = ?",
        )?;
        match stmt.query_row([id.as_str()], Self::from_row) {
            Ok(record) => Ok(record),
            Err(rusqlite::Error::QueryReturnedNoRows) => Err(EngineError::not_found("widget", id)),
            Err(e) => Err(e.into()),
        }
    }

    /// Active widgets of one dashboard, oldest first
    pub fn load_for_dashboard(conn: &Connection, dashboard_id: &DashboardId) -> EngineResult<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT id, dashboard_id, config, active, created_at, updated_at
             FROM widgets WHERE dashboard_id = ? AND active = 1 ORDER BY created_at, name",
        )?;
        let records = stmt.query_map([dashboard_id.as_str()], Self::from_row)?;
        records.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Replace the stored configuration; identity and ownership stay untouched
    pub fn update_config(&mut self, conn: &Connection, config: WidgetConfig) -> EngineResult<()> {
        self.config = config;
        self.updated_at = Utc::now();
        conn.execute(
            "UPDATE widgets SET name = ?, widget_type = ?, config = ?, updated_at = ? WHERE id = ?",
            params![
                &self.config.name,
                self.config.widget_type.to_string(),
                serde_json::to_string(&self.config)?,
                self.updated_at.timestamp(),
                self.id.as_str(),
            ],
        )?;
        Ok(())
    }

    pub fn deactivate(&mut self, conn: &Connection) -> EngineResult<()> {
        self.active = false;
        self.updated_at = Utc::now();
        conn.execute(
            "UPDATE widgets SET active = 0, updated_at = ? WHERE id = ?",
            params![self.updated_at.timestamp(), self.id.as_str()],
        )?;
        Ok(())
    }
}
