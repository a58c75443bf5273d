//! Terminal rendering of the dashboard.
//!
//! Each section renderer returns `None` when it has nothing to show, so the
//! caller simply skips the section:
//!
//! - [`summary_cards`]: no summary
//! - [`chart`]: absent or empty type distribution
//! - [`table`]: empty row list
//!
//! Colors come from `colored` and honour its global override, which the
//! binary sets from `display.color`.

use anyhow::Result;
use chrono::{DateTime, Local};
use colored::Colorize;
use serde_json::Value;

use crate::api::{HistoryEntry, Row, Summary};
use crate::dashboard::DashboardState;

/// Rendered in place of a missing or null summary value.
pub const PLACEHOLDER: &str = "—";

/// Widest a preview column may grow before cells are truncated.
const MAX_COLUMN_WIDTH: usize = 24;

/// Width of one summary card column.
const CARD_WIDTH: usize = 18;

/// Rendering knobs taken from `[display]`.
#[derive(Debug, Clone, Copy)]
pub struct RenderOptions {
    /// `0` renders every row.
    pub max_table_rows: usize,
    pub chart_width: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            max_table_rows: 0,
            chart_width: 40,
        }
    }
}

// ---------------------------------------------------------------------------
// Summary cards
// ---------------------------------------------------------------------------

/// The four headline cards. Only a missing/null field shows the placeholder.
pub fn summary_cards(summary: Option<&Summary>) -> Option<String> {
    let summary = summary?;

    let cards = [
        ("Total Equipment", summary.total_equipment.map(|v| v.to_string())),
        ("Avg Flowrate", summary.avg_flowrate.map(format_float)),
        ("Avg Pressure", summary.avg_pressure.map(format_float)),
        ("Avg Temperature", summary.avg_temperature.map(format_float)),
    ];

    let mut labels = String::from(" ");
    let mut values = String::from(" ");
    for (label, value) in &cards {
        let value = value.as_deref().unwrap_or(PLACEHOLDER);
        labels.push_str(&format!(" {}", pad(label, CARD_WIDTH).dimmed()));
        values.push_str(&format!(" {}", pad(value, CARD_WIDTH).bold()));
    }

    Some(format!("{}\n{}\n", labels.trim_end(), values.trim_end()))
}

/// Display a float without trailing `.0` noise for whole numbers.
fn format_float(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        value.to_string()
    }
}

// ---------------------------------------------------------------------------
// Chart
// ---------------------------------------------------------------------------

/// Horizontal bar chart of equipment counts per category, in server order.
pub fn chart(summary: Option<&Summary>, width: usize) -> Option<String> {
    let counts = summary?.type_counts();
    if counts.is_empty() {
        return None;
    }

    let width = width.max(1);
    let max = counts.iter().map(|(_, c)| *c).max().unwrap_or(0);
    let label_width = counts
        .iter()
        .map(|(name, _)| name.chars().count())
        .max()
        .unwrap_or(0)
        .min(MAX_COLUMN_WIDTH);

    let mut out = format!(
        "{} {}\n",
        "Type Distribution".bold().cyan(),
        "(Equipment Count)".dimmed()
    );
    for (name, count) in counts {
        let bar = "█".repeat(bar_length(count, max, width));
        out.push_str(&format!(
            "  {} {} {}\n",
            pad(&truncate(name, label_width), label_width),
            bar.blue(),
            count
        ));
    }
    Some(out)
}

/// Scale `count` against `max`; non-zero counts always get one cell.
fn bar_length(count: u64, max: u64, width: usize) -> usize {
    if count == 0 || max == 0 {
        return 0;
    }
    let scaled = (count as f64 / max as f64 * width as f64).round() as usize;
    scaled.clamp(1, width)
}

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

/// Column headers: the keys of the first row, in order.
pub fn headers(rows: &[Row]) -> Vec<String> {
    rows.first()
        .map(|row| row.keys().cloned().collect())
        .unwrap_or_default()
}

/// Cell text for one value. Missing keys and nulls render empty.
pub fn cell_text(row: &Row, header: &str) -> String {
    match row.get(header) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Data preview table. Every row uses the first row's header order; keys a
/// later row adds are not shown.
pub fn table(rows: &[Row], max_rows: usize) -> Option<String> {
    if rows.is_empty() {
        return None;
    }

    let headers = headers(rows);
    let shown = if max_rows == 0 {
        rows.len()
    } else {
        rows.len().min(max_rows)
    };

    let cells: Vec<Vec<String>> = rows[..shown]
        .iter()
        .map(|row| headers.iter().map(|h| cell_text(row, h)).collect())
        .collect();

    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| {
            cells
                .iter()
                .map(|r| r[i].chars().count())
                .chain(std::iter::once(h.chars().count()))
                .max()
                .unwrap_or(0)
                .min(MAX_COLUMN_WIDTH)
        })
        .collect();

    let mut out = format!(
        "{} {}\n",
        "Data Preview".bold().cyan(),
        format!("({} rows)", rows.len()).dimmed()
    );

    let header_line = join_cells(headers.iter().map(String::as_str), &widths);
    out.push_str(&format!("  {}\n", header_line.bold()));
    let rule_width = widths.iter().sum::<usize>() + 2 * widths.len().saturating_sub(1);
    out.push_str(&format!("  {}\n", "-".repeat(rule_width)));

    for (i, row) in cells.iter().enumerate() {
        let line = join_cells(row.iter().map(String::as_str), &widths);
        if i % 2 == 0 {
            out.push_str(&format!("  {line}\n"));
        } else {
            out.push_str(&format!("  {}\n", line.dimmed()));
        }
    }

    if shown < rows.len() {
        out.push_str(&format!(
            "  {}\n",
            format!("… {} more rows", rows.len() - shown).dimmed()
        ));
    }

    Some(out)
}

fn join_cells<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    cells
        .zip(widths)
        .map(|(cell, &w)| pad(&truncate(cell, w), w))
        .collect::<Vec<_>>()
        .join("  ")
        .trim_end()
        .to_string()
}

/// Preview rows as CSV, using the same header rule as [`table`].
pub fn rows_csv(rows: &[Row]) -> Result<Option<String>> {
    if rows.is_empty() {
        return Ok(None);
    }

    let headers = headers(rows);
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&headers)?;
    for row in rows {
        writer.write_record(headers.iter().map(|h| cell_text(row, h)))?;
    }
    finish_csv(writer).map(Some)
}

/// The upload history as CSV: `id,file_name,uploaded_at,rows`.
pub fn history_csv(entries: &[HistoryEntry]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["id", "file_name", "uploaded_at", "rows"])?;
    for entry in entries {
        let rows = entry.row_count().to_string();
        writer.write_record([
            entry.id.as_str(),
            entry.file_name.as_str(),
            entry.uploaded_at.as_str(),
            rows.as_str(),
        ])?;
    }
    finish_csv(writer)
}

fn finish_csv(writer: csv::Writer<Vec<u8>>) -> Result<String> {
    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("failed to flush CSV: {}", e.error()))?;
    Ok(String::from_utf8(bytes)?)
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

/// The upload history list, numbered from 1 (most recent first).
pub fn history(entries: &[HistoryEntry]) -> String {
    let mut out = format!(
        "{} {}\n",
        "Upload History".bold().cyan(),
        "(last 5 uploads)".dimmed()
    );

    if entries.is_empty() {
        out.push_str(&format!("  {}\n", "No uploads yet.".yellow()));
        return out;
    }

    for (i, entry) in entries.iter().enumerate() {
        out.push_str(&format!(
            "  {:>2}. {}  {} {}  {} {} rows  {}\n",
            i + 1,
            entry.file_name.bold(),
            "•".dimmed(),
            format_timestamp(&entry.uploaded_at),
            "•".dimmed(),
            entry.row_count(),
            format!("id {}", entry.id).dimmed(),
        ));
    }
    out
}

/// Render an RFC 3339 timestamp in local time; unparsable input is shown
/// as-is.
pub fn format_timestamp(raw: &str) -> String {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|_| raw.to_string())
}

// ---------------------------------------------------------------------------
// Full dashboard
// ---------------------------------------------------------------------------

/// Compose every section that has something to show.
pub fn dashboard(state: &DashboardState, base_url: &str, options: RenderOptions) -> String {
    let mut out = format!(
        "{}  {}\n",
        "Chemical Equipment Visualizer".bold().cyan(),
        format!("backend: {base_url}").dimmed()
    );
    out.push_str(&format!("{}\n", "=".repeat(60)));
    out.push_str(&status_lines(state));

    let latest = state.latest.as_ref();
    let summary = latest.and_then(|d| d.summary.as_ref());

    if let Some(dataset) = latest
        && let Some(name) = &dataset.file_name
    {
        out.push_str(&format!("\n{} {}\n", "Latest dataset:".bold(), name));
    }

    for section in [
        summary_cards(summary),
        chart(summary, options.chart_width),
        Some(history(&state.history)),
        latest.and_then(|d| table(&d.data, options.max_table_rows)),
    ]
    .into_iter()
    .flatten()
    {
        out.push('\n');
        out.push_str(&section);
    }

    out
}

/// Error, status and staged-file lines.
pub fn status_lines(state: &DashboardState) -> String {
    let mut out = String::new();
    if let Some(error) = &state.error_message {
        out.push_str(&format!("{} {}\n", "✗".red().bold(), error.red()));
    }
    if let Some(status) = &state.status_message {
        let mark = if state.connected && state.error_message.is_none() {
            "✓".green().bold()
        } else {
            "·".dimmed()
        };
        out.push_str(&format!("{mark} {status}\n"));
    }
    if let Some(file) = &state.selected_file {
        out.push_str(&format!(
            "  {} {} ({} bytes)\n",
            "Selected file:".dimmed(),
            file.name,
            file.bytes.len()
        ));
    }
    out
}

// ---------------------------------------------------------------------------
// Formatting helpers
// ---------------------------------------------------------------------------

/// Left-align `s` in a field of `width` characters.
fn pad(s: &str, width: usize) -> String {
    let len = s.chars().count();
    if len >= width {
        s.to_string()
    } else {
        format!("{s}{}", " ".repeat(width - len))
    }
}

/// Truncate to `max_len` characters, appending "…" if truncated.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(1)).collect();
        format!("{kept}…")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(json: &str) -> Vec<Row> {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello world", 5), "hell…");
        assert_eq!(truncate("ab", 2), "ab");
        assert_eq!(truncate("ünïcödé", 4), "ünï…");
    }

    #[test]
    fn test_pad() {
        assert_eq!(pad("ab", 4), "ab  ");
        assert_eq!(pad("abcdef", 4), "abcdef");
    }

    #[test]
    fn bar_length_scales_and_floors() {
        assert_eq!(bar_length(10, 10, 40), 40);
        assert_eq!(bar_length(5, 10, 40), 20);
        assert_eq!(bar_length(1, 1000, 40), 1);
        assert_eq!(bar_length(0, 10, 40), 0);
    }

    #[test]
    fn float_formatting() {
        assert_eq!(format_float(113.33), "113.33");
        assert_eq!(format_float(300.0), "300");
    }

    #[test]
    fn cell_text_handles_missing_and_null() {
        let row = &rows(r#"[{"a": "x", "b": null, "c": 1.5}]"#)[0];
        assert_eq!(cell_text(row, "a"), "x");
        assert_eq!(cell_text(row, "b"), "");
        assert_eq!(cell_text(row, "c"), "1.5");
        assert_eq!(cell_text(row, "missing"), "");
    }

    #[test]
    fn csv_quotes_special_fields() {
        let data = rows(r#"[{"Name": "Pump, big", "Note": "say \"hi\""}]"#);
        let csv = rows_csv(&data).unwrap().unwrap();
        assert_eq!(csv, "Name,Note\n\"Pump, big\",\"say \"\"hi\"\"\"\n");
        assert!(rows_csv(&[]).unwrap().is_none());
    }

    #[test]
    fn history_csv_quotes_file_names() {
        let entries = vec![HistoryEntry {
            id: "a1".to_string(),
            file_name: "plant, \"A\".csv".to_string(),
            uploaded_at: "2024-05-01T10:00:00Z".to_string(),
            summary: Some(Summary {
                total_equipment: Some(3),
                ..Summary::default()
            }),
        }];

        let csv = history_csv(&entries).unwrap();

        assert_eq!(
            csv,
            "id,file_name,uploaded_at,rows\n\
             a1,\"plant, \"\"A\"\".csv\",2024-05-01T10:00:00Z,3\n"
        );
        assert_eq!(history_csv(&[]).unwrap(), "id,file_name,uploaded_at,rows\n");
    }

    #[test]
    fn timestamp_falls_back_to_raw() {
        assert_eq!(format_timestamp("yesterday"), "yesterday");
        assert_eq!(format_timestamp("2024-05-01T10:00:00Z").len(), 16);
    }
}
