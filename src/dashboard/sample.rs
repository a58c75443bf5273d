//! The sample CSV offered by the "load sample" action.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::api::SelectedFile;

/// File name the bundled sample is staged under.
pub const SAMPLE_FILE_NAME: &str = "sample_equipment_data.csv";

/// Bundled sample, compiled into the binary.
const BUNDLED_SAMPLE: &[u8] = include_bytes!("../../assets/sample_equipment_data.csv");

/// Where the sample CSV comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SampleSource {
    Bundled,
    Path(PathBuf),
}

impl SampleSource {
    /// An empty configured path selects the bundled sample.
    pub fn from_config_path(path: &str) -> Self {
        if path.trim().is_empty() {
            Self::Bundled
        } else {
            Self::Path(crate::config::expand_home(path))
        }
    }

    /// Load the sample as a file ready for upload.
    pub fn load(&self) -> Result<SelectedFile> {
        match self {
            Self::Bundled => Ok(SelectedFile {
                name: SAMPLE_FILE_NAME.to_string(),
                bytes: BUNDLED_SAMPLE.to_vec(),
            }),
            Self::Path(path) => read_selected_file(path),
        }
    }
}

/// Read a CSV from disk and name it after its final path component.
pub fn read_selected_file(path: &Path) -> Result<SelectedFile> {
    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| SAMPLE_FILE_NAME.to_string());
    Ok(SelectedFile { name, bytes })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
