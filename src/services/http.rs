//! Remote views served over HTTP/JSON.
use reqwest::{Client, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

use crate::error::{EngineError, EngineResult};
use crate::services::catalog::{Catalog, ColumnInfo, ViewInfo};
use crate::services::query::{QueryBackend, QueryRequest, QueryResponse, ValidationReport};

/// Lists may come bare or wrapped in a `{ "data": [...] }` envelope
#[derive(Deserialize)]
#[serde(untagged)]
enum Listing<T> {
    Bare(Vec<T>),
    Wrapped { data: Vec<T> },
}

impl<T> Listing<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            Listing::Bare(items) | Listing::Wrapped { data: items } => items,
        }
    }
}

/// Views come back either as plain names or as objects
#[derive(Deserialize)]
#[serde(untagged)]
enum ViewEntry {
    Name(String),
    Info(ViewInfo),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ColumnEntry {
    Name(String),
    Info(ColumnInfo),
}

#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout: Duration) -> EngineResult<Self> {
        if base_url.trim().is_empty() {
            return Err(EngineError::Config("backend.base_url is empty".into()));
        }
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("dashwidget/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, base_url: base_url.trim_end_matches('/').to_string() })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> EngineResult<T> {
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(EngineError::Backend { status: status.as_u16(), message });
        }
        Ok(response.json().await?)
    }
}

impl Catalog for HttpBackend {
    async fn list_views(&self) -> EngineResult<Vec<ViewInfo>> {
        let response = self.client.get(self.url("views")).send().await?;
        let listing: Listing<ViewEntry> = Self::decode(response).await?;
        Ok(listing
            .into_vec()
            .into_iter()
            .map(|entry| match entry {
                ViewEntry::Name(name) => ViewInfo { label: name.clone(), name },
                ViewEntry::Info(info) => info,
            })
            .collect())
    }

    async fn list_columns(&self, view_name: &str) -> EngineResult<Vec<ColumnInfo>> {
        let response = self.client.get(self.url(&format!("views/{view_name}/columns"))).send().await?;
        let listing: Listing<ColumnEntry> = Self::decode(response).await?;
        Ok(listing
            .into_vec()
            .into_iter()
            .map(|entry| match entry {
                ColumnEntry::Name(name) => ColumnInfo::named(name),
                ColumnEntry::Info(info) => info,
            })
            .collect())
    }
}

impl QueryBackend for HttpBackend {
    async fn execute(&self, request: &QueryRequest) -> EngineResult<QueryResponse> {
        debug!(view = %request.view_name, "posting query");
        let response = self.client.post(self.url("query/execute")).json(request).send().await?;
        Self::decode(response).await
    }

    async fn validate(&self, view_name: &str, columns: &[String]) -> EngineResult<ValidationReport> {
        let body = json!({ "viewName": view_name, "columns": columns });
        let response = self.client.post(self.url("query/validate")).json(&body).send().await?;
        Self::decode(response).await
    }
}
