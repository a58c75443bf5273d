/// Configuration schema and defaults for equipviz.
///
/// Sections: `[api]`, `[auth]`, `[display]`, `[download]`, `[sample]`,
/// `[logging]`. Every field has a built-in default, so users only set what
/// they want to change. Passwords are deliberately absent from the schema.
use serde::{Deserialize, Serialize};

/// Default backend base URL (the Django dev server).
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000/api";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level configuration. Maps to `~/.equipviz/config.toml` and
/// `.equipviz.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EquipvizConfig {
    pub api: ApiConfig,
    pub auth: AuthConfig,
    pub display: DisplayConfig,
    pub download: DownloadConfig,
    pub sample: SampleConfig,
    pub logging: LoggingConfig,
}

// ---------------------------------------------------------------------------
// [api]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Backend base URL, including the `/api` prefix.
    pub base_url: String,
    /// Transport timeout per request (milliseconds).
    pub timeout_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_ms: 60_000,
        }
    }
}

// ---------------------------------------------------------------------------
// [auth]
// ---------------------------------------------------------------------------

/// Credential defaults. Only the username may live in a config file; the
/// password comes from `--password` or `EQUIPVIZ_PASSWORD`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub username: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            username: "demo".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// [display]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Colorize terminal output.
    pub color: bool,
    /// Maximum preview rows; `0` renders every row.
    pub max_table_rows: usize,
    /// Width of the longest chart bar, in cells.
    pub chart_width: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            color: true,
            max_table_rows: 0,
            chart_width: 40,
        }
    }
}

// ---------------------------------------------------------------------------
// [download]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    /// Directory PDF reports are saved into.
    pub output_dir: String,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            output_dir: ".".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// [sample]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SampleConfig {
    /// Sample CSV to stage with `sample`. Empty uses the bundled file.
    pub path: String,
}

// ---------------------------------------------------------------------------
// [logging]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Append handler outcomes to the activity log.
    pub enabled: bool,
    /// Activity log path. `~` is expanded to the home directory.
    pub path: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "~/.equipviz/activity.jsonl".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default TOML content
// ---------------------------------------------------------------------------

impl EquipvizConfig {
    /// Annotated default config, written by `equipviz config init`.
    pub fn default_toml() -> String {
        r#"# equipviz configuration
#
# Precedence (highest wins):
#   1. Command-line flags
#   2. Environment variables (EQUIPVIZ_*)
#   3. Project config (.equipviz.toml in current directory)
#   4. User global config (~/.equipviz/config.toml)
#   5. Built-in defaults

[api]
base_url = "http://127.0.0.1:8000/api"
timeout_ms = 60000

[auth]
username = "demo"         # password is never stored; use --password or EQUIPVIZ_PASSWORD

[display]
color = true
max_table_rows = 0        # 0 = render every row
chart_width = 40

[download]
output_dir = "."

[sample]
path = ""                 # empty = bundled sample_equipment_data.csv

[logging]
enabled = true
path = "~/.equipviz/activity.jsonl"
"#
        .to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
