use serde::{Deserialize, Serialize};

use crate::error::EngineResult;

/// A queryable view exposed by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewInfo {
    pub name: String,
    #[serde(default)]
    pub label: String,
}

/// Column metadata for one view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnInfo {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
}

impl ColumnInfo {
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into(), data_type: None }
    }
}

/// Lists views and their columns.
///
/// Callers treat any error as an empty list; a failing catalog never blocks editing.
#[allow(async_fn_in_trait)]
pub trait Catalog {
    async fn list_views(&self) -> EngineResult<Vec<ViewInfo>>;

    async fn list_columns(&self, view_name: &str) -> EngineResult<Vec<ColumnInfo>>;
}
