use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use equipviz::api::Credentials;
use equipviz::cli::{self, Context, OutputFormat, ReportTarget};
use equipviz::config;

#[derive(Debug, Parser)]
#[command(name = "equipviz")]
#[command(about = "Dashboard client for the Chemical Equipment Visualizer API")]
struct App {
    /// Backend base URL (overrides config and EQUIPVIZ_API_BASE_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,
    /// Username for basic auth
    #[arg(short, long, global = true)]
    username: Option<String>,
    /// Password for basic auth (or set EQUIPVIZ_PASSWORD)
    #[arg(short, long, global = true)]
    password: Option<String>,
    /// Output format: table (default), json, csv
    #[arg(long, global = true, default_value = "table")]
    format: String,
    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Fetch the latest dataset and upload history, then render the dashboard
    #[command(alias = "refresh")]
    Connect,
    /// Refresh and list the upload history
    History,
    /// Upload a CSV file (or the bundled sample) for analysis
    Upload {
        /// CSV file to upload
        #[arg(required_unless_present = "sample", conflicts_with = "sample")]
        file: Option<PathBuf>,
        /// Upload the sample CSV instead of a file
        #[arg(long)]
        sample: bool,
    },
    /// Download the PDF report for a dataset
    Report {
        /// Dataset id; defaults to the latest dataset
        id: Option<String>,
        /// Pick the dataset by history position (1 = most recent)
        #[arg(long, conflicts_with = "id")]
        index: Option<usize>,
        /// Directory to save the report into
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Check backend reachability, credentials, config and log status
    Health,
    /// Show recent activity log entries
    Log {
        /// Number of entries to show
        #[arg(long, default_value = "20")]
        limit: usize,
    },
    /// Interactive dashboard session
    Shell,
    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Write the default config to ~/.equipviz/config.toml
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Set a value, e.g. `config set api.base_url http://host:8000/api`
    Set { key: String, value: String },
}

fn main() -> Result<()> {
    let app = App::parse();
    let ctx = build_context(&app);

    colored::control::set_override(ctx.config.display.color);

    match app.command {
        Commands::Connect => cli::run_connect(&ctx),
        Commands::History => cli::run_history(&ctx),
        Commands::Upload { file, sample } => cli::run_upload(&ctx, file.as_deref(), sample),
        Commands::Report { id, index, out } => {
            let target = match (id, index) {
                (Some(id), _) => ReportTarget::Id(id),
                (None, Some(index)) => ReportTarget::HistoryIndex(index),
                (None, None) => ReportTarget::Latest,
            };
            cli::run_report(&ctx, target, out)
        }
        Commands::Health => cli::run_health(&ctx),
        Commands::Log { limit } => cli::run_log(&ctx, limit),
        Commands::Shell => cli::shell::run(&ctx),
        Commands::Config { action } => match action {
            ConfigAction::Show => cli::run_config_show(),
            ConfigAction::Init { force } => cli::run_config_init(force),
            ConfigAction::Set { key, value } => cli::run_config_set(&key, &value),
        },
    }
}

/// Resolve config layers, then apply command-line flags on top.
fn build_context(app: &App) -> Context {
    let mut config = config::load();

    if let Some(url) = &app.api_url {
        config.api.base_url = url.clone();
    }
    if app.no_color {
        config.display.color = false;
    }

    let username = app
        .username
        .clone()
        .unwrap_or_else(|| config.auth.username.clone());
    let password = app
        .password
        .clone()
        .or_else(|| std::env::var("EQUIPVIZ_PASSWORD").ok())
        .unwrap_or_default();

    Context {
        config,
        credentials: Credentials::new(username, password),
        format: OutputFormat::from_str_opt(Some(&app.format)),
    }
}
