pub mod filter;
pub mod models;
pub mod schema;
pub mod types;
pub mod widget;

pub use filter::{Arity, Filter, FilterError, Operator, validate_filter};
pub use models::{DashboardRecord, WidgetRecord};
pub use types::*;
pub use widget::*;
