//! Typed classification of failed API calls.
//!
//! Every failed request is turned into an [`ApiError`] exactly once, at the
//! transport boundary in [`crate::api::client`]. Dashboard handlers then
//! branch on [`ApiError::class`] instead of inspecting status codes inline.

use serde::Deserialize;
use thiserror::Error;

/// Coarse error taxonomy used by the dashboard handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Local guard failed (no credentials, no file). No request was sent.
    Precondition,
    /// The backend rejected the credentials (HTTP 401).
    Auth,
    /// HTTP 404. Only the latest-dataset fetch treats this as "no data".
    ExpectedEmpty,
    /// Anything else: transport failures, 5xx, other 4xx, bad bodies.
    General,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("no credentials configured")]
    MissingCredentials,

    #[error("no CSV file selected")]
    MissingFile,

    #[error("authentication failed (HTTP 401)")]
    Unauthorized { detail: Option<String> },

    #[error("resource not found (HTTP 404)")]
    NotFound { detail: Option<String> },

    #[error("backend returned HTTP {status}")]
    Status { status: u16, detail: Option<String> },

    #[error("request failed: {0}")]
    Transport(String),

    #[error("unexpected response body: {0}")]
    Decode(String),
}

/// Error payload shape used by the backend (`{"detail": "..."}`).
#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: Option<String>,
}

impl ApiError {
    /// Classify a non-2xx response from its status code and raw body.
    pub fn from_status(status: u16, body: &str) -> Self {
        let detail = extract_detail(body);
        match status {
            401 => Self::Unauthorized { detail },
            404 => Self::NotFound { detail },
            _ => Self::Status { status, detail },
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            Self::MissingCredentials | Self::MissingFile => ErrorClass::Precondition,
            Self::Unauthorized { .. } => ErrorClass::Auth,
            Self::NotFound { .. } => ErrorClass::ExpectedEmpty,
            Self::Status { .. } | Self::Transport(_) | Self::Decode(_) => ErrorClass::General,
        }
    }

    /// The backend-provided `detail` text, if the response carried one.
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::Unauthorized { detail }
            | Self::NotFound { detail }
            | Self::Status { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }

    /// User-facing message: the backend detail verbatim, else `fallback`.
    pub fn message_or(&self, fallback: &str) -> String {
        self.detail().unwrap_or(fallback).to_string()
    }
}

/// Pull `detail` out of a JSON error body. Empty strings count as absent.
fn extract_detail(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.detail)
        .filter(|d| !d.trim().is_empty())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
