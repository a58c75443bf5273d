/// Dashboard state and the user-action handlers that mutate it.
///
/// A [`Dashboard`] owns everything a session knows: the credentials, the
/// request client derived from them, the fetched dataset and history, and
/// the UI flags and messages. Each handler runs to completion on the calling
/// thread and leaves the dashboard in an interactive, retryable state; no
/// handler returns an error.
///
/// Flag ownership:
///
/// - `loading` belongs to [`Dashboard::connect`]
/// - `uploading` belongs to [`Dashboard::upload`]
/// - `connected` is written only by [`Dashboard::connect`]
///
/// Each flag is raised at the start of its handler and lowered in a final
/// step that runs on every path.
pub mod download;
pub mod sample;

use std::path::{Path, PathBuf};
use std::thread::ScopedJoinHandle;
use std::time::Instant;

use crate::activity::{ActivityLog, Outcome};
use crate::api::{Connector, Credentials, DatasetApi, Dataset, HistoryEntry, SelectedFile};
use crate::error::{ApiError, ErrorClass};

pub use download::DEFAULT_REPORT_NAME;
pub use sample::SampleSource;

// ---------------------------------------------------------------------------
// User-facing messages
// ---------------------------------------------------------------------------

pub const MSG_MISSING_CREDENTIALS: &str = "Please supply username and password first.";
pub const MSG_CONNECTED: &str = "Connected to backend successfully.";
pub const MSG_AUTH_FAILED: &str = "Authentication failed. Double-check your credentials.";
pub const MSG_UNREACHABLE: &str = "Unable to reach backend. Is the server running?";
pub const MSG_UPLOAD_GUARD: &str = "Pick a CSV file and ensure you are authenticated.";
pub const MSG_UPLOADING: &str = "Uploading CSV ...";
pub const MSG_UPLOAD_FAILED: &str = "Upload failed. Please try again.";
pub const MSG_HISTORY_FAILED: &str = "Unable to refresh history right now.";
pub const MSG_DOWNLOAD_FAILED: &str = "Unable to download PDF right now.";
pub const MSG_SAMPLE_READY: &str = "Sample file ready. Press Upload to send it to the API.";
pub const MSG_SAMPLE_MISSING: &str = "Sample file missing. Please use your own CSV instead.";

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Everything the dashboard displays. Lives only as long as the session.
#[derive(Debug, Clone, Default)]
pub struct DashboardState {
    pub connected: bool,
    pub loading: bool,
    pub uploading: bool,
    /// Connection and credential errors.
    pub error_message: Option<String>,
    /// Progress and soft-failure messages from every other handler.
    pub status_message: Option<String>,
    pub latest: Option<Dataset>,
    pub history: Vec<HistoryEntry>,
    pub selected_file: Option<SelectedFile>,
}

/// A dashboard session bound to one backend.
pub struct Dashboard<C: Connector> {
    connector: C,
    credentials: Credentials,
    client: Option<C::Client>,
    state: DashboardState,
    output_dir: PathBuf,
    activity: ActivityLog,
}

impl<C: Connector> Dashboard<C> {
    pub fn new(connector: C, credentials: Credentials) -> Self {
        let mut dashboard = Self {
            connector,
            credentials: Credentials::default(),
            client: None,
            state: DashboardState::default(),
            output_dir: PathBuf::from("."),
            activity: ActivityLog::disabled(),
        };
        dashboard.set_credentials(credentials);
        dashboard
    }

    /// Directory downloaded reports are written to.
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_activity_log(mut self, log: ActivityLog) -> Self {
        self.activity = log;
        self
    }

    pub fn state(&self) -> &DashboardState {
        &self.state
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn activity(&self) -> &ActivityLog {
        &self.activity
    }

    /// Whether a request client currently exists.
    pub fn has_client(&self) -> bool {
        self.client.is_some()
    }

    // -----------------------------------------------------------------------
    // Credentials
    // -----------------------------------------------------------------------

    /// Replace the credentials and rebuild the request client. The client is
    /// dropped when either field is empty.
    pub fn set_credentials(&mut self, credentials: Credentials) {
        self.client = credentials
            .is_complete()
            .then(|| self.connector.connect(&credentials));
        self.credentials = credentials;
    }

    pub fn set_username(&mut self, username: impl Into<String>) {
        let credentials = Credentials {
            username: username.into(),
            ..self.credentials.clone()
        };
        self.set_credentials(credentials);
    }

    pub fn set_password(&mut self, password: impl Into<String>) {
        let credentials = Credentials {
            password: password.into(),
            ..self.credentials.clone()
        };
        self.set_credentials(credentials);
    }

    // -----------------------------------------------------------------------
    // connect / refresh
    // -----------------------------------------------------------------------

    /// Fetch the latest dataset and the upload history concurrently.
    pub fn connect(&mut self) {
        let Some(client) = self.client.as_ref() else {
            self.state.error_message = Some(MSG_MISSING_CREDENTIALS.to_string());
            self.activity
                .record("connect", Outcome::Skipped, MSG_MISSING_CREDENTIALS, None);
            return;
        };

        self.state.loading = true;
        self.state.error_message = None;

        let started = Instant::now();
        let outcome = fetch_latest_and_history(client);
        let latency_ms = Some(started.elapsed().as_millis() as u64);

        match outcome {
            Ok((latest, history)) => {
                self.state.latest = latest;
                self.state.history = history;
                self.state.connected = true;
                self.state.status_message = Some(MSG_CONNECTED.to_string());
                self.activity
                    .record("connect", Outcome::Ok, MSG_CONNECTED, latency_ms);
            }
            Err(error) => {
                self.state.connected = false;
                let message = match error.class() {
                    ErrorClass::Auth => MSG_AUTH_FAILED.to_string(),
                    _ => error.message_or(MSG_UNREACHABLE),
                };
                self.activity.record(
                    "connect",
                    Outcome::Failed,
                    &format!("{message} ({error})"),
                    latency_ms,
                );
                self.state.error_message = Some(message);
            }
        }

        self.state.loading = false;
    }

    // -----------------------------------------------------------------------
    // upload
    // -----------------------------------------------------------------------

    /// Upload the selected CSV, then refresh the history list.
    pub fn upload(&mut self) {
        let (Some(client), Some(file)) = (self.client.as_ref(), self.state.selected_file.clone())
        else {
            self.state.status_message = Some(MSG_UPLOAD_GUARD.to_string());
            self.activity
                .record("upload", Outcome::Skipped, MSG_UPLOAD_GUARD, None);
            return;
        };

        self.state.uploading = true;
        self.state.status_message = Some(MSG_UPLOADING.to_string());

        let started = Instant::now();
        let result = client.upload(&file);
        let latency_ms = Some(started.elapsed().as_millis() as u64);

        match result {
            Ok(dataset) => {
                self.state.latest = Some(dataset);
                self.refresh_history();
                let message = format!("Uploaded {} successfully.", file.name);
                self.activity
                    .record("upload", Outcome::Ok, &message, latency_ms);
                self.state.status_message = Some(message);
                self.state.selected_file = None;
            }
            Err(error) => {
                let message = error.message_or(MSG_UPLOAD_FAILED);
                self.activity.record(
                    "upload",
                    Outcome::Failed,
                    &format!("{message} ({error})"),
                    latency_ms,
                );
                self.state.status_message = Some(message);
            }
        }

        self.state.uploading = false;
    }

    // -----------------------------------------------------------------------
    // history-only refresh
    // -----------------------------------------------------------------------

    /// Re-fetch the history list and overwrite it. Silent without a client.
    pub fn refresh_history(&mut self) {
        let Some(client) = self.client.as_ref() else {
            return;
        };

        let started = Instant::now();
        let result = client.history();
        let latency_ms = Some(started.elapsed().as_millis() as u64);

        match result {
            Ok(history) => {
                self.activity.record(
                    "history",
                    Outcome::Ok,
                    &format!("{} entries", history.len()),
                    latency_ms,
                );
                self.state.history = history;
            }
            Err(error) => {
                self.activity.record(
                    "history",
                    Outcome::SoftFailure,
                    &format!("{MSG_HISTORY_FAILED} ({error})"),
                    latency_ms,
                );
                self.state.status_message = Some(MSG_HISTORY_FAILED.to_string());
            }
        }
    }

    // -----------------------------------------------------------------------
    // download report
    // -----------------------------------------------------------------------

    /// Download the PDF report for `dataset_id` into the output directory.
    ///
    /// Returns the saved path, or `None` when there is no client or the
    /// download failed (the failure is reported in the status message).
    pub fn download_report(&mut self, dataset_id: &str) -> Option<PathBuf> {
        let client = self.client.as_ref()?;

        let started = Instant::now();
        let result = client
            .report(dataset_id)
            .map_err(anyhow::Error::from)
            .and_then(|report| download::save_report(&self.output_dir, report));
        let latency_ms = Some(started.elapsed().as_millis() as u64);

        match result {
            Ok(path) => {
                let message = format!("Report saved to {}.", path.display());
                self.activity
                    .record("report", Outcome::Ok, &message, latency_ms);
                self.state.status_message = Some(message);
                Some(path)
            }
            Err(error) => {
                self.activity.record(
                    "report",
                    Outcome::SoftFailure,
                    &format!("{MSG_DOWNLOAD_FAILED} ({error:#})"),
                    latency_ms,
                );
                self.state.status_message = Some(MSG_DOWNLOAD_FAILED.to_string());
                None
            }
        }
    }

    // -----------------------------------------------------------------------
    // file selection
    // -----------------------------------------------------------------------

    /// Stage the sample CSV as the selected file.
    pub fn load_sample(&mut self, source: &SampleSource) {
        match source.load() {
            Ok(file) => {
                self.activity
                    .record("sample", Outcome::Ok, &file.name, None);
                self.state.selected_file = Some(file);
                self.state.status_message = Some(MSG_SAMPLE_READY.to_string());
            }
            Err(error) => {
                self.activity.record(
                    "sample",
                    Outcome::SoftFailure,
                    &format!("{MSG_SAMPLE_MISSING} ({error:#})"),
                    None,
                );
                self.state.status_message = Some(MSG_SAMPLE_MISSING.to_string());
            }
        }
    }

    /// Stage a CSV from disk as the selected file.
    pub fn select_path(&mut self, path: &Path) {
        match sample::read_selected_file(path) {
            Ok(file) => self.select_file(file),
            Err(error) => {
                self.state.status_message = Some(format!("{error:#}"));
            }
        }
    }

    pub fn select_file(&mut self, file: SelectedFile) {
        self.state.selected_file = Some(file);
    }

    pub fn clear_selection(&mut self) {
        self.state.selected_file = None;
    }
}

// ---------------------------------------------------------------------------
// Concurrent fetch
// ---------------------------------------------------------------------------

/// Run both connect-time fetches on scoped threads and wait for both.
///
/// A 404 on the latest dataset is resolved to `None` inside its own task, so
/// it never cancels or masks the history fetch.
fn fetch_latest_and_history<A: DatasetApi>(
    client: &A,
) -> Result<(Option<Dataset>, Vec<HistoryEntry>), ApiError> {
    let (latest, history) = std::thread::scope(|scope| {
        let latest = scope.spawn(|| match client.latest_dataset() {
            Ok(dataset) => Ok(Some(dataset)),
            Err(error) if error.class() == ErrorClass::ExpectedEmpty => Ok(None),
            Err(error) => Err(error),
        });
        let history = scope.spawn(|| client.history());
        (join(latest), join(history))
    });

    Ok((latest?, history?))
}

fn join<T>(handle: ScopedJoinHandle<'_, Result<T, ApiError>>) -> Result<T, ApiError> {
    handle
        .join()
        .unwrap_or_else(|_| Err(ApiError::Transport("request worker panicked".to_string())))
}
