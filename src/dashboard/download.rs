//! Report download helpers: filename derivation and saving to disk.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;

use crate::api::Report;

/// Name used when the server suggests none.
pub const DEFAULT_REPORT_NAME: &str = "equipment-report.pdf";

/// Captures the quoted value of a `filename="..."` disposition parameter.
static FILENAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"filename="(.+)""#).expect("filename regex must compile")
});

/// Derive the save-as name from a `content-disposition` header.
///
/// Only the last path component of the suggested name is used, so a header
/// cannot steer the write outside the output directory.
pub fn derive_filename(content_disposition: Option<&str>) -> String {
    content_disposition
        .and_then(|header| FILENAME_RE.captures(header))
        .and_then(|caps| caps.get(1))
        .and_then(|m| sanitize(m.as_str()))
        .unwrap_or_else(|| DEFAULT_REPORT_NAME.to_string())
}

fn sanitize(name: &str) -> Option<String> {
    let last = name.rsplit(['/', '\\']).next()?.trim();
    if last.is_empty() || last == "." || last == ".." {
        None
    } else {
        Some(last.to_string())
    }
}

/// Write the report into `dir` and return the saved path. The payload
/// buffer is consumed and dropped once written.
pub fn save_report(dir: &Path, report: Report) -> Result<PathBuf> {
    let name = derive_filename(report.content_disposition.as_deref());
    let path = dir.join(name);

    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create output directory {}", dir.display()))?;
    fs::write(&path, report.bytes)
        .with_context(|| format!("failed to write report to {}", path.display()))?;

    Ok(path)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_from_attachment_header() {
        assert_eq!(
            derive_filename(Some(r#"attachment; filename="report-42.pdf""#)),
            "report-42.pdf"
        );
    }

    #[test]
    fn missing_or_unquoted_header_falls_back() {
        assert_eq!(derive_filename(None), DEFAULT_REPORT_NAME);
        assert_eq!(derive_filename(Some("attachment")), DEFAULT_REPORT_NAME);
        assert_eq!(
            derive_filename(Some("attachment; filename=bare.pdf")),
            DEFAULT_REPORT_NAME
        );
    }

    #[test]
    fn path_components_are_stripped() {
        assert_eq!(
            derive_filename(Some(r#"attachment; filename="../../etc/evil.pdf""#)),
            "evil.pdf"
        );
        assert_eq!(
            derive_filename(Some(r#"attachment; filename="..""#)),
            DEFAULT_REPORT_NAME
        );
    }

    #[test]
    fn save_report_writes_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let report = Report {
            content_disposition: Some(r#"attachment; filename="equipment-report-a.pdf""#.into()),
            bytes: b"%PDF-1.4".to_vec(),
        };

        let path = save_report(&dir.path().join("reports"), report).unwrap();
        assert_eq!(path.file_name().unwrap(), "equipment-report-a.pdf");
        assert_eq!(fs::read(&path).unwrap(), b"%PDF-1.4");
    }
}
