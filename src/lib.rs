#![allow(clippy::collapsible_if)]
#![allow(clippy::collapsible_match)]
#![allow(clippy::collapsible_else_if)]

pub mod action;
pub mod config;
pub mod core;
pub mod error;
pub mod logging;
pub mod render;
pub mod services;
pub mod tui;
pub mod wizard;

// Re-export commonly used types
pub use action::{Action, Effect, Notice};
pub use crate::core::{Filter, Operator, WidgetConfig, validate_filter};
pub use error::{EngineError, EngineResult};
pub use render::{Visual, render, render_widget};
pub use services::{LocalViews, QueryExecutor, SqliteStore};
pub use wizard::{Stage, WidgetBuilder, WizardState};
