//! Interactive dashboard session (`equipviz shell`).
//!
//! Keeps one [`Dashboard`] alive across commands, so credentials, the staged
//! file and the fetched data persist for the whole session and nowhere else.

use std::io::{BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context as _, Result};
use colored::Colorize;

use super::{Context, history_id};
use crate::api::Connector;
use crate::dashboard::{Dashboard, SampleSource};
use crate::render::{self, RenderOptions};

const HELP: &str = "\
Commands:
  user <name>          set the username (rebuilds the client)
  password             prompt for the password without echo (rebuilds the client)
  connect | refresh    fetch latest dataset and history
  history              refresh the upload history only
  select <path>        stage a CSV file for upload
  sample               stage the bundled sample CSV
  clear                drop the staged file
  upload               upload the staged file
  pdf <id> | pdf #<n>  download the report for a dataset id or history entry
  show                 print the dashboard
  status               print status messages
  help                 show this help
  quit | exit          leave the shell";

/// A parsed shell line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    User(String),
    /// `None` means prompt for it without echo.
    Password(Option<String>),
    Connect,
    History,
    Select(PathBuf),
    Sample,
    Clear,
    Upload,
    ReportId(String),
    ReportIndex(usize),
    Show,
    Status,
    Help,
    Quit,
    Empty,
}

impl ShellCommand {
    pub fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        let (word, rest) = line
            .split_once(char::is_whitespace)
            .map(|(w, r)| (w, r.trim()))
            .unwrap_or((line, ""));

        let cmd = match word.to_ascii_lowercase().as_str() {
            "" => Self::Empty,
            "user" | "username" => Self::User(rest.to_string()),
            "password" | "pass" => Self::Password((!rest.is_empty()).then(|| rest.to_string())),
            "connect" | "refresh" => Self::Connect,
            "history" => Self::History,
            "select" | "file" => {
                if rest.is_empty() {
                    return Err("usage: select <path>".to_string());
                }
                Self::Select(PathBuf::from(rest))
            }
            "sample" => Self::Sample,
            "clear" => Self::Clear,
            "upload" => Self::Upload,
            "pdf" | "report" => match rest.strip_prefix('#') {
                Some(n) => Self::ReportIndex(
                    n.parse()
                        .map_err(|_| format!("invalid history position: #{n}"))?,
                ),
                None if rest.is_empty() => return Err("usage: pdf <id> | pdf #<n>".to_string()),
                None => Self::ReportId(rest.to_string()),
            },
            "show" => Self::Show,
            "status" => Self::Status,
            "help" | "?" => Self::Help,
            "quit" | "exit" => Self::Quit,
            other => return Err(format!("unknown command: {other} (try `help`)")),
        };
        Ok(cmd)
    }
}

/// Whether the loop should keep reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Run one command against the session and write its output.
pub fn execute<C: Connector, W: Write>(
    dashboard: &mut Dashboard<C>,
    command: ShellCommand,
    sample: &SampleSource,
    base_url: &str,
    options: RenderOptions,
    out: &mut W,
) -> Result<Flow> {
    match command {
        ShellCommand::Empty => {}
        ShellCommand::User(name) => {
            dashboard.set_username(name);
            writeln!(out, "{}", client_line(dashboard.has_client()))?;
        }
        ShellCommand::Password(Some(secret)) => {
            dashboard.set_password(secret);
            writeln!(out, "{}", client_line(dashboard.has_client()))?;
        }
        ShellCommand::Password(None) => {
            writeln!(out, "{}", "no password entered; credentials unchanged".yellow())?;
        }
        ShellCommand::Connect => {
            dashboard.connect();
            write!(out, "{}", render::dashboard(dashboard.state(), base_url, options))?;
        }
        ShellCommand::History => {
            dashboard.refresh_history();
            write!(out, "{}", render::status_lines(dashboard.state()))?;
            write!(out, "{}", render::history(&dashboard.state().history))?;
        }
        ShellCommand::Select(path) => {
            dashboard.select_path(&path);
            write!(out, "{}", render::status_lines(dashboard.state()))?;
        }
        ShellCommand::Sample => {
            dashboard.load_sample(sample);
            write!(out, "{}", render::status_lines(dashboard.state()))?;
        }
        ShellCommand::Clear => {
            dashboard.clear_selection();
            writeln!(out, "Selection cleared.")?;
        }
        ShellCommand::Upload => {
            dashboard.upload();
            write!(out, "{}", render::dashboard(dashboard.state(), base_url, options))?;
        }
        ShellCommand::ReportId(id) => {
            dashboard.download_report(&id);
            write!(out, "{}", render::status_lines(dashboard.state()))?;
        }
        ShellCommand::ReportIndex(index) => match history_id(dashboard.state(), index) {
            Ok(id) => {
                dashboard.download_report(&id);
                write!(out, "{}", render::status_lines(dashboard.state()))?;
            }
            Err(error) => writeln!(out, "{}", error.to_string().yellow())?,
        },
        ShellCommand::Show => {
            write!(out, "{}", render::dashboard(dashboard.state(), base_url, options))?;
        }
        ShellCommand::Status => {
            write!(out, "{}", render::status_lines(dashboard.state()))?;
        }
        ShellCommand::Help => writeln!(out, "{HELP}")?,
        ShellCommand::Quit => return Ok(Flow::Exit),
    }
    Ok(Flow::Continue)
}

fn client_line(has_client: bool) -> String {
    if has_client {
        format!("{} credentials set", "✓".green().bold())
    } else {
        format!(
            "{} client unavailable until both username and password are set",
            "·".dimmed()
        )
    }
}

/// Read-eval-print loop over stdin.
pub fn run(ctx: &Context) -> Result<()> {
    let mut dashboard = ctx.dashboard();
    let sample = ctx.sample_source();
    let options = ctx.render_options();
    let base_url = ctx.config.api.base_url.clone();

    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();

    writeln!(
        stdout,
        "{} {}",
        "Chemical Equipment Visualizer".bold().cyan(),
        "(type `help` for commands)".dimmed()
    )?;

    for line in prompt_lines(stdin.lock(), &mut stdout)? {
        let line = line.context("failed reading from stdin")?;
        let flow = match ShellCommand::parse(&line).and_then(read_secret) {
            Ok(command) => execute(
                &mut dashboard,
                command,
                &sample,
                &base_url,
                options,
                &mut stdout,
            )?,
            Err(message) => {
                writeln!(stdout, "{}", message.yellow())?;
                Flow::Continue
            }
        };
        if flow == Flow::Exit {
            break;
        }
        write!(stdout, "{}", "equipviz> ".bold())?;
        stdout.flush()?;
    }

    Ok(())
}

/// Replace a bare `password` with one read from the terminal without echo.
fn read_secret(command: ShellCommand) -> Result<ShellCommand, String> {
    match command {
        ShellCommand::Password(None) => rpassword::prompt_password("password: ")
            .map(|secret| ShellCommand::Password(Some(secret)))
            .map_err(|e| format!("failed to read password: {e}")),
        other => Ok(other),
    }
}

fn prompt_lines<R: BufRead, W: Write>(input: R, out: &mut W) -> Result<std::io::Lines<R>> {
    write!(out, "{}", "equipviz> ".bold())?;
    out.flush()?;
    Ok(input.lines())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
