pub mod catalog;
pub mod http;
pub mod local;
pub mod query;
pub mod store;

pub use catalog::{Catalog, ColumnInfo, ViewInfo};
pub use http::HttpBackend;
pub use local::LocalViews;
pub use query::{QueryBackend, QueryExecutor, QueryRequest, QueryResponse, QueryResult, ValidationReport};
pub use store::{SqliteStore, WidgetStore};
