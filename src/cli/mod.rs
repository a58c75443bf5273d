//! CLI command implementations.
//!
//! Provides subcommand handlers for:
//! - `equipviz connect`: fetch latest dataset + history, render dashboard
//! - `equipviz history`: history-only refresh
//! - `equipviz upload <FILE>|--sample`: upload a CSV and render the result
//! - `equipviz report [ID]`: download a PDF report
//! - `equipviz health`: backend reachability, config and log status
//! - `equipviz log`: recent activity log entries
//! - `equipviz config show|init|set`: configuration management
//! - `equipviz shell`: interactive session (see [`shell`])

pub mod shell;

use std::path::{Path, PathBuf};

use anyhow::Result;
use colored::Colorize;

use crate::activity::{ActivityLog, Outcome};
use crate::api::{Credentials, HttpConnector};
use crate::config::{self, EquipvizConfig};
use crate::dashboard::{Dashboard, DashboardState, MSG_HISTORY_FAILED, SampleSource};
use crate::render::{self, RenderOptions};

/// Output format for dashboard commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}

impl OutputFormat {
    pub fn from_str_opt(s: Option<&str>) -> Self {
        match s {
            Some("json") => Self::Json,
            Some("csv") => Self::Csv,
            _ => Self::Table,
        }
    }
}

/// Resolved settings shared by every command.
#[derive(Debug, Clone)]
pub struct Context {
    pub config: EquipvizConfig,
    pub credentials: Credentials,
    pub format: OutputFormat,
}

impl Context {
    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            max_table_rows: self.config.display.max_table_rows,
            chart_width: self.config.display.chart_width,
        }
    }

    pub fn connector(&self) -> HttpConnector {
        HttpConnector::from_config(&self.config.api)
    }

    pub fn sample_source(&self) -> SampleSource {
        SampleSource::from_config_path(&self.config.sample.path)
    }

    pub fn activity_log(&self) -> ActivityLog {
        ActivityLog::from_config(&self.config.logging)
    }

    /// A fresh dashboard session against the configured backend.
    pub fn dashboard(&self) -> Dashboard<HttpConnector> {
        Dashboard::new(self.connector(), self.credentials.clone())
            .with_output_dir(config::expand_home(&self.config.download.output_dir))
            .with_activity_log(self.activity_log())
    }
}

// ---------------------------------------------------------------------------
// equipviz connect
// ---------------------------------------------------------------------------

/// Connect, fetch both datasets, and print the dashboard.
pub fn run_connect(ctx: &Context) -> Result<()> {
    let mut dashboard = ctx.dashboard();
    dashboard.connect();

    if let Some(error) = &dashboard.state().error_message {
        anyhow::bail!("{error}");
    }

    print_state(ctx, dashboard.state())
}

// ---------------------------------------------------------------------------
// equipviz history
// ---------------------------------------------------------------------------

pub fn run_history(ctx: &Context) -> Result<()> {
    let mut dashboard = ctx.dashboard();
    if !dashboard.has_client() {
        anyhow::bail!("{}", crate::dashboard::MSG_MISSING_CREDENTIALS);
    }

    dashboard.refresh_history();
    if dashboard.state().status_message.as_deref() == Some(MSG_HISTORY_FAILED) {
        anyhow::bail!("{MSG_HISTORY_FAILED}");
    }

    let history = &dashboard.state().history;
    match ctx.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(history)?),
        OutputFormat::Csv => print!("{}", render::history_csv(history)?),
        OutputFormat::Table => print!("{}", render::history(history)),
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// equipviz upload
// ---------------------------------------------------------------------------

/// Upload a CSV (or the sample) and print the resulting dashboard.
pub fn run_upload(ctx: &Context, file: Option<&Path>, sample: bool) -> Result<()> {
    let mut dashboard = ctx.dashboard();

    match (file, sample) {
        (Some(path), _) => dashboard.select_path(path),
        (None, true) => dashboard.load_sample(&ctx.sample_source()),
        (None, false) => {}
    }

    // Staging failed: surface the read error instead of the upload guard.
    if dashboard.state().selected_file.is_none() {
        let message = dashboard
            .state()
            .status_message
            .clone()
            .unwrap_or_else(|| crate::dashboard::MSG_UPLOAD_GUARD.to_string());
        anyhow::bail!("{message}");
    }

    dashboard.upload();

    let state = dashboard.state();
    if state.selected_file.is_some() || state.latest.is_none() {
        let message = state
            .status_message
            .clone()
            .unwrap_or_else(|| crate::dashboard::MSG_UPLOAD_GUARD.to_string());
        anyhow::bail!("{message}");
    }

    print_state(ctx, state)
}

// ---------------------------------------------------------------------------
// equipviz report
// ---------------------------------------------------------------------------

/// Which dataset a `report` invocation targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportTarget {
    Id(String),
    /// 1-based position in the history list.
    HistoryIndex(usize),
    Latest,
}

pub fn run_report(ctx: &Context, target: ReportTarget, out: Option<PathBuf>) -> Result<()> {
    let mut dashboard = ctx.dashboard();
    if let Some(dir) = out {
        dashboard = dashboard.with_output_dir(dir);
    }
    if !dashboard.has_client() {
        anyhow::bail!("{}", crate::dashboard::MSG_MISSING_CREDENTIALS);
    }

    let dataset_id = match target {
        ReportTarget::Id(id) => id,
        ReportTarget::HistoryIndex(index) => {
            dashboard.refresh_history();
            history_id(dashboard.state(), index)?
        }
        ReportTarget::Latest => {
            dashboard.connect();
            if let Some(error) = &dashboard.state().error_message {
                anyhow::bail!("{error}");
            }
            dashboard
                .state()
                .latest
                .as_ref()
                .and_then(|d| d.id.clone())
                .ok_or_else(|| anyhow::anyhow!("No dataset available. Upload a CSV first."))?
        }
    };

    match dashboard.download_report(&dataset_id) {
        Some(path) => {
            println!("{} Report saved to {}", "✓".green().bold(), path.display());
            Ok(())
        }
        None => {
            let message = dashboard
                .state()
                .status_message
                .clone()
                .unwrap_or_else(|| crate::dashboard::MSG_DOWNLOAD_FAILED.to_string());
            anyhow::bail!("{message}")
        }
    }
}

/// Resolve a 1-based history position to a dataset id.
pub fn history_id(state: &DashboardState, index: usize) -> Result<String> {
    if index == 0 {
        anyhow::bail!("history positions start at 1");
    }
    state
        .history
        .get(index - 1)
        .map(|entry| entry.id.clone())
        .ok_or_else(|| {
            anyhow::anyhow!(
                "no history entry #{index} ({} uploads available)",
                state.history.len()
            )
        })
}

// ---------------------------------------------------------------------------
// equipviz health
// ---------------------------------------------------------------------------

/// Check backend reachability, credentials, config files and the log.
pub fn run_health(ctx: &Context) -> Result<()> {
    println!("{}", "equipviz Health Check".bold().cyan());
    println!("{}", "=".repeat(40));

    let connector = ctx.connector();
    match connector.health() {
        Ok(status) => print_health_item(
            "Backend",
            status == "ok",
            &format!("{} ({status})", connector.base_url()),
        ),
        Err(error) => print_health_item(
            "Backend",
            false,
            &format!("{} unreachable: {error}", connector.base_url()),
        ),
    }

    print_health_item(
        "Credentials",
        ctx.credentials.is_complete(),
        if ctx.credentials.is_complete() {
            "username and password set"
        } else {
            "missing (use --username/--password or EQUIPVIZ_PASSWORD)"
        },
    );

    let global_exists = config::global_config_path()
        .map(|p| p.exists())
        .unwrap_or(false);
    print_health_item(
        "Global config",
        global_exists,
        if global_exists {
            "~/.equipviz/config.toml found"
        } else {
            "not found (run `equipviz config init` to create)"
        },
    );

    let log = ctx.activity_log();
    match log.path() {
        Some(path) => print_health_item(
            "Activity log",
            path.exists(),
            &format!("{} ({} entries)", path.display(), log.read_all().len()),
        ),
        None => print_health_item("Activity log", true, "disabled"),
    }

    Ok(())
}

fn print_health_item(name: &str, ok: bool, detail: &str) {
    let status = if ok {
        "✓".green().bold()
    } else {
        "✗".red().bold()
    };
    println!("  {} {:<16} {}", status, name, detail.dimmed());
}

// ---------------------------------------------------------------------------
// equipviz log
// ---------------------------------------------------------------------------

pub fn run_log(ctx: &Context, limit: usize) -> Result<()> {
    let entries = ctx.activity_log().tail(limit);
    if entries.is_empty() {
        println!("{}", "No activity recorded yet.".yellow());
        return Ok(());
    }

    if ctx.format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    for entry in entries {
        let outcome = match entry.outcome {
            Outcome::Ok => entry.outcome.to_string().green(),
            Outcome::Skipped => entry.outcome.to_string().normal(),
            Outcome::SoftFailure => entry.outcome.to_string().yellow(),
            Outcome::Failed => entry.outcome.to_string().red(),
        };
        let latency = entry
            .latency_ms
            .map(|ms| format!(" {ms}ms"))
            .unwrap_or_default();
        println!(
            "  {} {:<8} {:<13} {}{}",
            render::format_timestamp(&entry.timestamp).dimmed(),
            entry.action,
            outcome,
            entry.message,
            latency.dimmed()
        );
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// equipviz config show | init | set
// ---------------------------------------------------------------------------

pub fn run_config_show() -> Result<()> {
    let toml_str = config::show_effective_config()?;
    println!("{}", "Effective equipviz Configuration".bold().cyan());
    println!("{}", "=".repeat(50));
    println!();
    println!("{toml_str}");
    println!("{}", "Sources (highest priority last):".dimmed());
    println!("  {} built-in defaults", "·".dimmed());
    for (label, path) in [
        ("~/.equipviz/config.toml", config::global_config_path()),
        (".equipviz.toml", config::project_config_path()),
    ] {
        if path.map(|p| p.exists()).unwrap_or(false) {
            println!("  {} {}", "✓".green(), label.dimmed());
        } else {
            println!("  {} {}", "·".dimmed(), format!("{label} (not found)").dimmed());
        }
    }
    println!("  {} {}", "·".dimmed(), "EQUIPVIZ_* environment variables".dimmed());
    println!("  {} {}", "·".dimmed(), "command-line flags".dimmed());
    Ok(())
}

pub fn run_config_init(force: bool) -> Result<()> {
    let path = config::init_config(force)?;
    println!("{} Config written to {}", "✓".green().bold(), path.display());
    Ok(())
}

pub fn run_config_set(key: &str, value: &str) -> Result<()> {
    config::set_config_value(key, value)?;
    println!("{} Set {} = {}", "✓".green().bold(), key.bold(), value);
    Ok(())
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Print dashboard state in the requested format.
pub fn print_state(ctx: &Context, state: &DashboardState) -> Result<()> {
    match ctx.format {
        OutputFormat::Json => println!("{}", state_json(state)?),
        OutputFormat::Csv => {
            let rows = state.latest.as_ref().map(|d| d.data.as_slice()).unwrap_or_default();
            match render::rows_csv(rows)? {
                Some(csv) => print!("{csv}"),
                None => eprintln!("{}", "No dataset rows to export.".yellow()),
            }
        }
        OutputFormat::Table => print!(
            "{}",
            render::dashboard(state, &ctx.config.api.base_url, ctx.render_options())
        ),
    }
    Ok(())
}

/// JSON snapshot of the dashboard state.
pub fn state_json(state: &DashboardState) -> Result<String> {
    let value = serde_json::json!({
        "connected": state.connected,
        "status": state.status_message,
        "error": state.error_message,
        "latest": state.latest,
        "history": state.history,
    });
    Ok(serde_json::to_string_pretty(&value)?)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
