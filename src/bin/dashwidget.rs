use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::Result;
use color_eyre::eyre::{WrapErr, eyre};
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{debug, info};

use dashwidget::action::Action;
use dashwidget::config::{BackendKind, Config};
use dashwidget::core::types::{DashboardId, WidgetId};
use dashwidget::error::EngineResult;
use dashwidget::render::render_widget;
use dashwidget::services::{
    Catalog, ColumnInfo, HttpBackend, LocalViews, QueryBackend, QueryExecutor, QueryRequest, QueryResponse,
    SqliteStore, ValidationReport, ViewInfo, WidgetStore,
};
use dashwidget::tui::{Theme, show};
use dashwidget::wizard::WidgetBuilder;

/// Define report widgets over tabular views and run them
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Enable file logging at the given level (overrides RUST_LOG)
    #[arg(long = "logging", value_enum)]
    logging: Option<LogLevel>,
    /// Path to a config file (overrides default config discovery)
    #[arg(long = "config", value_name = "PATH")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the views the backend exposes
    Views,
    /// List the columns of one view
    Columns { view: String },
    /// Dry-run a column selection against a view
    Check {
        view: String,
        #[arg(required = true)]
        columns: Vec<String>,
    },
    #[command(subcommand)]
    Dashboard(DashboardCommand),
    /// List the active widgets of a dashboard
    Widgets { dashboard: String },
    /// Drive the widget wizard with a JSON list of actions
    Build {
        dashboard: String,
        script: PathBuf,
        /// Edit an existing widget instead of creating one
        #[arg(long = "edit", value_name = "WIDGET")]
        edit: Option<String>,
    },
    /// Execute a saved widget and show it
    Run {
        widget: String,
        /// Print the rendered visual as JSON instead of drawing it
        #[arg(long)]
        json: bool,
    },
    /// Soft-delete a widget
    Delete { widget: String },
}

#[derive(Subcommand, Debug)]
enum DashboardCommand {
    Create {
        name: String,
        #[arg(long)]
        description: Option<String>,
    },
    List,
}

/// The configured backend, either in-process or remote
#[derive(Clone)]
enum Backend {
    Local(LocalViews),
    Http(HttpBackend),
}

impl Backend {
    fn from_config(cfg: &Config) -> Result<Self> {
        Ok(match cfg.backend.kind {
            BackendKind::Local => Backend::Local(LocalViews::from_definitions(&cfg.views)?),
            BackendKind::Http => Backend::Http(HttpBackend::new(&cfg.backend.base_url, cfg.timeout())?),
        })
    }
}

impl Catalog for Backend {
    async fn list_views(&self) -> EngineResult<Vec<ViewInfo>> {
        match self {
            Backend::Local(b) => b.list_views().await,
            Backend::Http(b) => b.list_views().await,
        }
    }

    async fn list_columns(&self, view_name: &str) -> EngineResult<Vec<ColumnInfo>> {
        match self {
            Backend::Local(b) => b.list_columns(view_name).await,
            Backend::Http(b) => b.list_columns(view_name).await,
        }
    }
}

impl QueryBackend for Backend {
    async fn execute(&self, request: &QueryRequest) -> EngineResult<QueryResponse> {
        match self {
            Backend::Local(b) => b.execute(request).await,
            Backend::Http(b) => b.execute(request).await,
        }
    }

    async fn validate(&self, view_name: &str, columns: &[String]) -> EngineResult<ValidationReport> {
        match self {
            Backend::Local(b) => b.validate(view_name, columns).await,
            Backend::Http(b) => b.validate(view_name, columns).await,
        }
    }
}

fn parse_id<T: FromStr<Err = String>>(kind: &str, raw: &str) -> Result<T> {
    T::from_str(raw).map_err(|e| eyre!("invalid {kind} id {raw:?}: {e}"))
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();

    let level = match args.logging {
        Some(LogLevel::Error) => Some(tracing::Level::ERROR),
        Some(LogLevel::Warn) => Some(tracing::Level::WARN),
        Some(LogLevel::Info) => Some(tracing::Level::INFO),
        Some(LogLevel::Debug) => Some(tracing::Level::DEBUG),
        Some(LogLevel::Trace) => Some(tracing::Level::TRACE),
        None => None,
    };
    dashwidget::logging::init_with(None, level)?;

    let cfg = Config::from_path(args.config.as_ref()).wrap_err("failed to load configuration")?;
    debug!(?cfg.backend, views = cfg.views.len(), "configuration loaded");

    match args.command {
        Command::Views => {
            for view in Backend::from_config(&cfg)?.list_views().await? {
                println!("{}\t{}", view.name, view.label);
            }
        }
        Command::Columns { view } => {
            for column in Backend::from_config(&cfg)?.list_columns(&view).await? {
                println!("{}\t{}", column.name, column.data_type.unwrap_or_default());
            }
        }
        Command::Check { view, columns } => {
            let executor = QueryExecutor::new(Backend::from_config(&cfg)?);
            let report = executor.validate_query(&view, &columns).await;
            println!("{}: {}", if report.success { "ok" } else { "invalid" }, report.message);
        }
        Command::Dashboard(DashboardCommand::Create { name, description }) => {
            let store = SqliteStore::open(&cfg.store_path())?;
            let dashboard = store.create_dashboard(&name, description.as_deref()).await?;
            println!("{}", dashboard.id);
        }
        Command::Dashboard(DashboardCommand::List) => {
            let store = SqliteStore::open(&cfg.store_path())?;
            for dashboard in store.list_dashboards().await? {
                println!("{}\t{}\t{}", dashboard.id, dashboard.name, dashboard.description.unwrap_or_default());
            }
        }
        Command::Widgets { dashboard } => {
            let store = SqliteStore::open(&cfg.store_path())?;
            let dashboard: DashboardId = parse_id("dashboard", &dashboard)?;
            for widget in store.list(&dashboard).await? {
                println!(
                    "{}\t{}\t{}\t{}",
                    widget.id, widget.config.name, widget.config.widget_type, widget.config.view_name
                );
            }
        }
        Command::Build { dashboard, script, edit } => {
            let dashboard: DashboardId = parse_id("dashboard", &dashboard)?;
            let raw = std::fs::read_to_string(&script)
                .wrap_err_with(|| format!("failed to read {}", script.display()))?;
            let actions: Vec<Action> = serde_json::from_str(&raw).wrap_err("invalid action script")?;

            let backend = Backend::from_config(&cfg)?;
            let store = SqliteStore::open(&cfg.store_path())?;
            let builder = WidgetBuilder::new(backend.clone(), backend, store, dashboard, cfg.debounce());
            if let Some(id) = edit {
                builder.edit(&parse_id::<WidgetId>("widget", &id)?).await?;
            }
            builder.dispatch(Action::LoadViews).await;
            for action in actions {
                info!(%action, "script action");
                builder.dispatch(action).await;
            }

            let state = builder.state();
            if let Some(notice) = &state.notice {
                eprintln!("[{}] {}", notice.level, notice.message);
            }
            match state.last_saved {
                Some(id) => println!("{id}"),
                None => println!("{}", serde_json::to_string_pretty(&builder.preview_visual())?),
            }
        }
        Command::Run { widget, json } => {
            let store = SqliteStore::open(&cfg.store_path())?;
            let record = store.get(&parse_id("widget", &widget)?).await?;
            let executor = QueryExecutor::new(Backend::from_config(&cfg)?);
            let result = executor.execute_config(&record.config).await;
            if let Some(error) = &result.error {
                eprintln!("query failed: {error}");
            }
            let rows = result.success.then_some(result.data.as_slice());
            let visual = render_widget(&record.config, rows);
            if json {
                println!("{}", serde_json::to_string_pretty(&visual)?);
            } else {
                let theme = Theme::named(&record.config.chart_config.color_scheme);
                show(&record.config.name, &visual, theme)?;
            }
        }
        Command::Delete { widget } => {
            let store = SqliteStore::open(&cfg.store_path())?;
            store.soft_delete(&parse_id("widget", &widget)?).await?;
            println!("deleted {widget}");
        }
    }
    Ok(())
}
