/// Configuration system for equipviz.
///
/// Layered hierarchy, later layers win:
///
/// 1. **Built-in defaults**: [`schema::EquipvizConfig::default()`]
/// 2. **User global config**: `~/.equipviz/config.toml`
/// 3. **Project local config**: `.equipviz.toml` in the working directory
/// 4. **Environment variables**: `EQUIPVIZ_*`
///
/// Files merge key by key, so a project file that sets one key keeps every
/// other value from the global file. Command-line flags are applied on top by
/// the binary. Malformed files are ignored rather than aborting the dashboard.
pub mod schema;

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};

pub use schema::EquipvizConfig;

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Load the fully resolved configuration (files + environment).
pub fn load() -> EquipvizConfig {
    let mut config = load_layers([global_config_path(), project_config_path()]);
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    config
}

/// Merge config files key by key, later files winning. A file that does not
/// parse on its own is skipped.
fn load_layers<I>(paths: I) -> EquipvizConfig
where
    I: IntoIterator<Item = Option<PathBuf>>,
{
    let mut merged = toml::Value::Table(toml::Table::new());
    for layer in paths.into_iter().filter_map(read_layer) {
        merge_values(&mut merged, layer);
    }
    merged.try_into().unwrap_or_default()
}

fn read_layer(path: Option<PathBuf>) -> Option<toml::Value> {
    let content = fs::read_to_string(path?).ok()?;
    toml::from_str::<EquipvizConfig>(&content).ok()?;
    toml::from_str(&content).ok()
}

fn merge_values(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base), toml::Value::Table(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

// ---------------------------------------------------------------------------
// File paths
// ---------------------------------------------------------------------------

/// Path to the user global config: `~/.equipviz/config.toml`.
pub fn global_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".equipviz").join("config.toml"))
}

/// Path to the project local config: `.equipviz.toml`.
pub fn project_config_path() -> Option<PathBuf> {
    std::env::current_dir()
        .ok()
        .map(|cwd| cwd.join(".equipviz.toml"))
}

/// Expand a leading `~/` to the home directory.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    PathBuf::from(path)
}

// ---------------------------------------------------------------------------
// Environment variable overrides
// ---------------------------------------------------------------------------

/// Apply `EQUIPVIZ_*` overrides. `lookup` abstracts the environment so the
/// precedence rules can be tested without mutating process state.
///
/// Supported variables:
/// - `EQUIPVIZ_API_BASE_URL`: backend base URL
/// - `EQUIPVIZ_TIMEOUT_MS`: request timeout
/// - `EQUIPVIZ_USERNAME`: default username
/// - `EQUIPVIZ_OUTPUT_DIR`: report download directory
/// - `EQUIPVIZ_SAMPLE_PATH`: sample CSV path
/// - `EQUIPVIZ_NO_COLOR`: disable colors (`1`/`true`/`yes`/`on`)
/// - `EQUIPVIZ_LOG`: activity log on/off
///
/// `EQUIPVIZ_PASSWORD` is read by the binary directly and never lands in
/// the config struct.
pub fn apply_env_overrides<F>(config: &mut EquipvizConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(val) = lookup("EQUIPVIZ_API_BASE_URL")
        && !val.is_empty()
    {
        config.api.base_url = val;
    }
    if let Some(val) = lookup("EQUIPVIZ_TIMEOUT_MS")
        && let Ok(ms) = val.parse::<u64>()
    {
        config.api.timeout_ms = ms;
    }
    if let Some(val) = lookup("EQUIPVIZ_USERNAME") {
        config.auth.username = val;
    }
    if let Some(val) = lookup("EQUIPVIZ_OUTPUT_DIR")
        && !val.is_empty()
    {
        config.download.output_dir = val;
    }
    if let Some(val) = lookup("EQUIPVIZ_SAMPLE_PATH") {
        config.sample.path = val;
    }
    if let Some(val) = lookup("EQUIPVIZ_NO_COLOR") {
        config.display.color = !is_truthy(&val);
    }
    if let Some(val) = lookup("EQUIPVIZ_LOG") {
        config.logging.enabled = is_truthy(&val);
    }
}

/// Check if a string value represents a truthy boolean.
pub fn is_truthy(val: &str) -> bool {
    matches!(
        val.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

// ---------------------------------------------------------------------------
// Config init / set / show
// ---------------------------------------------------------------------------

/// Write the annotated default config to `~/.equipviz/config.toml`.
pub fn init_config(force: bool) -> Result<PathBuf> {
    let path = global_config_path().context("could not determine home directory")?;

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}. Use --force to overwrite.",
            path.display()
        );
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create ~/.equipviz/ directory")?;
    }
    fs::write(&path, EquipvizConfig::default_toml()).context("failed to write config file")?;

    Ok(path)
}

/// Set a dotted key (e.g. `api.base_url`) in the global config file.
pub fn set_config_value(key: &str, value: &str) -> Result<()> {
    let path = global_config_path().context("could not determine home directory")?;

    let content = if path.exists() {
        fs::read_to_string(&path).context("failed to read config file")?
    } else {
        toml::to_string_pretty(&EquipvizConfig::default())
            .context("failed to serialize default config")?
    };

    let mut root: toml::Value =
        toml::from_str(&content).context("failed to parse config as TOML value")?;
    set_toml_value(&mut root, key, value)?;

    // Reject edits that no longer deserialize into the schema.
    let rendered = toml::to_string_pretty(&root).context("failed to serialize config")?;
    toml::from_str::<EquipvizConfig>(&rendered)
        .with_context(|| format!("invalid value for '{key}': {value}"))?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create config directory")?;
    }
    fs::write(&path, rendered).context("failed to write config file")?;
    Ok(())
}

/// Set a value in a TOML tree using a dotted `section.key` path. The new
/// value takes the type of the value it replaces.
fn set_toml_value(root: &mut toml::Value, key: &str, raw_value: &str) -> Result<()> {
    let (section, leaf) = key
        .split_once('.')
        .with_context(|| format!("expected a 'section.key' name, got '{key}'"))?;

    let table = root
        .get_mut(section)
        .and_then(toml::Value::as_table_mut)
        .with_context(|| format!("config key not found: section '{section}' in '{key}'"))?;

    let new_value = match table.get(leaf) {
        Some(toml::Value::Boolean(_)) => toml::Value::Boolean(is_truthy(raw_value)),
        Some(toml::Value::Integer(_)) => {
            let n: i64 = raw_value
                .parse()
                .with_context(|| format!("expected integer for '{key}', got '{raw_value}'"))?;
            toml::Value::Integer(n)
        }
        Some(_) => toml::Value::String(raw_value.to_string()),
        None => anyhow::bail!("config key not found: '{key}'"),
    };

    table.insert(leaf.to_string(), new_value);
    Ok(())
}

/// The effective (fully resolved) config as TOML.
pub fn show_effective_config() -> Result<String> {
    toml::to_string_pretty(&load()).context("failed to serialize effective config")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
