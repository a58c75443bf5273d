/// Dashboard orchestration tests.
///
/// Drive [`Dashboard`] through a scripted in-memory backend that counts
/// every call, so guard behaviour ("zero network calls") and refresh counts
/// can be asserted exactly. HTTP-level behaviour of the real client lives in
/// `client_tests.rs`.
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use equipviz::activity::{ActivityLog, Outcome};
use equipviz::api::{
    Connector, Credentials, DatasetApi, Dataset, HistoryEntry, Report, SelectedFile, Summary,
};
use equipviz::dashboard::{
    DEFAULT_REPORT_NAME, Dashboard, MSG_AUTH_FAILED, MSG_CONNECTED, MSG_DOWNLOAD_FAILED,
    MSG_HISTORY_FAILED, MSG_MISSING_CREDENTIALS, MSG_SAMPLE_MISSING, MSG_SAMPLE_READY,
    MSG_UNREACHABLE, MSG_UPLOAD_FAILED, MSG_UPLOAD_GUARD, SampleSource,
};
use equipviz::error::ApiError;

// ---------------------------------------------------------------------------
// Scripted backend
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum Scripted<T> {
    Ok(T),
    Status(u16, &'static str),
    Unreachable,
}

impl<T: Clone> Scripted<T> {
    fn produce(&self) -> Result<T, ApiError> {
        match self {
            Self::Ok(value) => Ok(value.clone()),
            Self::Status(code, body) => Err(ApiError::from_status(*code, body)),
            Self::Unreachable => Err(ApiError::Transport("connection refused".to_string())),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Calls {
    latest: usize,
    history: usize,
    upload: usize,
    report: usize,
}

impl Calls {
    fn total(&self) -> usize {
        self.latest + self.history + self.upload + self.report
    }
}

struct Inner {
    latest: Scripted<Dataset>,
    history: Scripted<Vec<HistoryEntry>>,
    upload: Scripted<Dataset>,
    report: Scripted<Report>,
    calls: Calls,
    connects: usize,
    uploaded_names: Vec<String>,
}

#[derive(Clone)]
struct FakeBackend {
    inner: Arc<Mutex<Inner>>,
}

impl FakeBackend {
    fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                latest: Scripted::Ok(dataset("plant.csv")),
                history: Scripted::Ok(history(&["h1", "h2"])),
                upload: Scripted::Ok(dataset("uploaded.csv")),
                report: Scripted::Ok(Report {
                    content_disposition: None,
                    bytes: b"%PDF-1.4 fake".to_vec(),
                }),
                calls: Calls::default(),
                connects: 0,
                uploaded_names: Vec::new(),
            })),
        }
    }

    fn script(&self, f: impl FnOnce(&mut Inner)) -> &Self {
        f(&mut self.inner.lock().unwrap());
        self
    }

    fn calls(&self) -> Calls {
        self.inner.lock().unwrap().calls.clone()
    }

    fn connects(&self) -> usize {
        self.inner.lock().unwrap().connects
    }
}

impl DatasetApi for FakeBackend {
    fn latest_dataset(&self) -> Result<Dataset, ApiError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.latest += 1;
        inner.latest.produce()
    }

    fn history(&self) -> Result<Vec<HistoryEntry>, ApiError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.history += 1;
        inner.history.produce()
    }

    fn upload(&self, file: &SelectedFile) -> Result<Dataset, ApiError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.upload += 1;
        inner.uploaded_names.push(file.name.clone());
        inner.upload.produce()
    }

    fn report(&self, _dataset_id: &str) -> Result<Report, ApiError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.report += 1;
        inner.report.produce()
    }
}

impl Connector for FakeBackend {
    type Client = FakeBackend;

    fn connect(&self, _credentials: &Credentials) -> FakeBackend {
        self.inner.lock().unwrap().connects += 1;
        self.clone()
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

fn dataset(name: &str) -> Dataset {
    serde_json::from_value(serde_json::json!({
        "id": format!("id-{name}"),
        "file_name": name,
        "uploaded_at": "2024-05-01T10:00:00Z",
        "data": [
            {"Equipment Name": "Pump A", "Type": "Pump", "Flowrate": 100},
            {"Equipment Name": "Valve C", "Type": "Valve", "Flowrate": 90}
        ],
        "summary": {
            "total_equipment": 2, "avg_flowrate": 95.0, "avg_pressure": 52.5,
            "avg_temperature": 295.0, "type_distribution": {"Pump": 1, "Valve": 1}
        }
    }))
    .unwrap()
}

fn history(ids: &[&str]) -> Vec<HistoryEntry> {
    ids.iter()
        .map(|id| HistoryEntry {
            id: id.to_string(),
            file_name: format!("{id}.csv"),
            uploaded_at: "2024-05-01T10:00:00Z".to_string(),
            summary: Some(Summary {
                total_equipment: Some(3),
                ..Summary::default()
            }),
        })
        .collect()
}

fn csv_file() -> SelectedFile {
    SelectedFile {
        name: "batch-7.csv".to_string(),
        bytes: b"Equipment Name,Type,Flowrate,Pressure,Temperature\n".to_vec(),
    }
}

fn dashboard(backend: &FakeBackend) -> Dashboard<FakeBackend> {
    Dashboard::new(backend.clone(), Credentials::new("demo", "demo123"))
}

// ---------------------------------------------------------------------------
// Credential guard
// ---------------------------------------------------------------------------

#[test]
fn incomplete_credentials_short_circuit_every_action() {
    let cases = [("", "demo123"), ("demo", ""), ("", "")];

    for (username, password) in cases {
        let backend = FakeBackend::new();
        let dir = tempfile::tempdir().unwrap();
        let mut dash = Dashboard::new(backend.clone(), Credentials::new(username, password))
            .with_output_dir(dir.path());

        assert!(!dash.has_client(), "{username:?}/{password:?}");

        dash.connect();
        assert_eq!(
            dash.state().error_message.as_deref(),
            Some(MSG_MISSING_CREDENTIALS)
        );
        assert!(!dash.state().loading);

        dash.select_file(csv_file());
        dash.upload();
        assert_eq!(dash.state().status_message.as_deref(), Some(MSG_UPLOAD_GUARD));
        assert!(dash.state().selected_file.is_some());

        dash.refresh_history();
        assert!(dash.state().history.is_empty());

        assert!(dash.download_report("id-1").is_none());

        assert_eq!(backend.calls().total(), 0, "{username:?}/{password:?}");
        assert_eq!(backend.connects(), 0);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}

#[test]
fn client_is_rebuilt_on_every_credential_change() {
    let backend = FakeBackend::new();
    let mut dash = Dashboard::new(backend.clone(), Credentials::new("demo", ""));
    assert!(!dash.has_client());
    assert_eq!(backend.connects(), 0);

    dash.set_password("demo123");
    assert!(dash.has_client());
    assert_eq!(backend.connects(), 1);

    dash.set_username("operator");
    assert!(dash.has_client());
    assert_eq!(backend.connects(), 2);
    assert_eq!(dash.credentials(), &Credentials::new("operator", "demo123"));

    dash.set_username("");
    assert!(!dash.has_client());
    assert_eq!(backend.connects(), 2);
}

// ---------------------------------------------------------------------------
// connect / refresh
// ---------------------------------------------------------------------------

#[test]
fn connect_populates_latest_and_history() {
    let backend = FakeBackend::new();
    let mut dash = dashboard(&backend);

    dash.connect();

    let state = dash.state();
    assert!(state.connected);
    assert!(!state.loading);
    assert_eq!(state.status_message.as_deref(), Some(MSG_CONNECTED));
    assert!(state.error_message.is_none());
    assert_eq!(state.latest, Some(dataset("plant.csv")));
    assert_eq!(state.history, history(&["h1", "h2"]));
    assert_eq!(
        backend.calls(),
        Calls {
            latest: 1,
            history: 1,
            ..Calls::default()
        }
    );
}

#[test]
fn connect_with_bad_credentials_reports_auth_failure() {
    let backend = FakeBackend::new();
    backend.script(|s| {
        s.latest = Scripted::Status(401, r#"{"detail": "Invalid username/password."}"#);
        s.history = Scripted::Status(401, r#"{"detail": "Invalid username/password."}"#);
    });
    let mut dash = dashboard(&backend);

    dash.connect();

    assert!(!dash.state().connected);
    assert!(!dash.state().loading);
    assert_eq!(dash.state().error_message.as_deref(), Some(MSG_AUTH_FAILED));
}

#[test]
fn connect_treats_missing_latest_dataset_as_empty() {
    let backend = FakeBackend::new();
    backend.script(|s| {
        s.latest = Scripted::Status(404, r#"{"detail": "No datasets uploaded yet."}"#);
    });
    let mut dash = dashboard(&backend);

    dash.connect();

    let state = dash.state();
    assert!(state.connected);
    assert!(state.latest.is_none());
    assert_eq!(state.history.len(), 2);
    assert!(state.error_message.is_none());
    assert_eq!(state.status_message.as_deref(), Some(MSG_CONNECTED));
}

#[test]
fn connect_404_does_not_mask_history_failure() {
    let backend = FakeBackend::new();
    backend.script(|s| {
        s.latest = Scripted::Status(404, "");
        s.history = Scripted::Status(401, "");
    });
    let mut dash = dashboard(&backend);

    dash.connect();

    assert!(!dash.state().connected);
    assert_eq!(dash.state().error_message.as_deref(), Some(MSG_AUTH_FAILED));
    assert_eq!(backend.calls().history, 1);
}

#[test]
fn connect_uses_backend_detail_then_generic_message() {
    let backend = FakeBackend::new();
    backend.script(|s| s.history = Scripted::Status(500, r#"{"detail": "Database is locked."}"#));
    let mut dash = dashboard(&backend);
    dash.connect();
    assert_eq!(
        dash.state().error_message.as_deref(),
        Some("Database is locked.")
    );

    backend.script(|s| s.history = Scripted::Unreachable);
    dash.connect();
    assert_eq!(dash.state().error_message.as_deref(), Some(MSG_UNREACHABLE));
    assert!(!dash.state().connected);
    assert!(!dash.state().loading);
}

#[test]
fn successful_reconnect_clears_previous_error() {
    let backend = FakeBackend::new();
    backend.script(|s| s.latest = Scripted::Unreachable);
    let mut dash = dashboard(&backend);
    dash.connect();
    assert!(dash.state().error_message.is_some());

    backend.script(|s| s.latest = Scripted::Ok(dataset("plant.csv")));
    dash.connect();
    assert!(dash.state().error_message.is_none());
    assert!(dash.state().connected);
}

// ---------------------------------------------------------------------------
// upload
// ---------------------------------------------------------------------------

#[test]
fn upload_without_file_is_rejected_locally() {
    let backend = FakeBackend::new();
    let mut dash = dashboard(&backend);

    dash.upload();

    assert_eq!(dash.state().status_message.as_deref(), Some(MSG_UPLOAD_GUARD));
    assert_eq!(backend.calls().total(), 0);
}

#[test]
fn upload_success_stores_dataset_and_refreshes_history_once() {
    let backend = FakeBackend::new();
    backend.script(|s| s.history = Scripted::Ok(history(&["new", "h1", "h2"])));
    let mut dash = dashboard(&backend);
    dash.select_file(csv_file());
    assert!(!dash.state().uploading);

    dash.upload();

    let state = dash.state();
    assert!(!state.uploading);
    assert_eq!(state.latest, Some(dataset("uploaded.csv")));
    assert!(state.selected_file.is_none());
    assert_eq!(state.history.len(), 3);
    assert_eq!(
        state.status_message.as_deref(),
        Some("Uploaded batch-7.csv successfully.")
    );
    assert_eq!(
        backend.calls(),
        Calls {
            upload: 1,
            history: 1,
            ..Calls::default()
        }
    );
    assert_eq!(
        backend.inner.lock().unwrap().uploaded_names,
        vec!["batch-7.csv"]
    );
}

#[test]
fn upload_failure_keeps_selection_and_reports_detail() {
    let backend = FakeBackend::new();
    backend.script(|s| {
        s.upload = Scripted::Status(
            400,
            r#"{"detail": "CSV is missing required columns: Pressure"}"#,
        )
    });
    let mut dash = dashboard(&backend);
    dash.select_file(csv_file());

    dash.upload();

    let state = dash.state();
    assert!(!state.uploading);
    assert_eq!(
        state.status_message.as_deref(),
        Some("CSV is missing required columns: Pressure")
    );
    assert!(state.selected_file.is_some());
    assert!(state.latest.is_none());
    assert_eq!(backend.calls().history, 0);

    backend.script(|s| s.upload = Scripted::Unreachable);
    dash.upload();
    assert_eq!(
        dash.state().status_message.as_deref(),
        Some(MSG_UPLOAD_FAILED)
    );
    assert!(!dash.state().uploading);
}

#[test]
fn history_failure_after_upload_is_soft() {
    let backend = FakeBackend::new();
    backend.script(|s| s.history = Scripted::Status(503, ""));
    let dir = tempfile::tempdir().unwrap();
    let log = ActivityLog::at(dir.path().join("activity.jsonl"));
    let mut dash = dashboard(&backend).with_activity_log(log.clone());
    dash.select_file(csv_file());

    dash.upload();

    assert_eq!(dash.state().latest, Some(dataset("uploaded.csv")));
    assert!(dash.state().selected_file.is_none());
    assert_eq!(
        dash.state().status_message.as_deref(),
        Some("Uploaded batch-7.csv successfully.")
    );

    let entries = log.read_all();
    let actions: Vec<_> = entries
        .iter()
        .map(|e| (e.action.as_str(), e.outcome))
        .collect();
    assert_eq!(
        actions,
        vec![("history", Outcome::SoftFailure), ("upload", Outcome::Ok)]
    );
}

// ---------------------------------------------------------------------------
// history-only refresh
// ---------------------------------------------------------------------------

#[test]
fn history_refresh_overwrites_and_is_idempotent() {
    let backend = FakeBackend::new();
    let mut dash = dashboard(&backend);

    dash.refresh_history();
    let first = dash.state().history.clone();
    dash.refresh_history();

    assert_eq!(dash.state().history, first);
    assert_eq!(first.len(), 2);
    assert_eq!(backend.calls().history, 2);
}

#[test]
fn history_refresh_failure_sets_soft_message() {
    let backend = FakeBackend::new();
    let mut dash = dashboard(&backend);
    dash.refresh_history();

    backend.script(|s| s.history = Scripted::Unreachable);
    dash.refresh_history();

    assert_eq!(
        dash.state().status_message.as_deref(),
        Some(MSG_HISTORY_FAILED)
    );
    assert_eq!(dash.state().history.len(), 2);
}

// ---------------------------------------------------------------------------
// download report
// ---------------------------------------------------------------------------

#[test]
fn download_uses_content_disposition_filename() {
    let backend = FakeBackend::new();
    backend.script(|s| {
        s.report = Scripted::Ok(Report {
            content_disposition: Some(r#"attachment; filename="report-42.pdf""#.to_string()),
            bytes: b"%PDF-1.4 report".to_vec(),
        })
    });
    let dir = tempfile::tempdir().unwrap();
    let mut dash = dashboard(&backend).with_output_dir(dir.path());

    let path = dash.download_report("42").unwrap();

    assert_eq!(path, dir.path().join("report-42.pdf"));
    assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.4 report");
    assert!(
        dash.state()
            .status_message
            .as_deref()
            .unwrap()
            .starts_with("Report saved to")
    );
}

#[test]
fn download_without_header_uses_default_name() {
    let backend = FakeBackend::new();
    let dir = tempfile::tempdir().unwrap();
    let mut dash = dashboard(&backend).with_output_dir(dir.path());

    let path = dash.download_report("7").unwrap();

    assert_eq!(path, dir.path().join(DEFAULT_REPORT_NAME));
}

#[test]
fn download_failures_degrade_to_soft_message() {
    let backend = FakeBackend::new();
    backend.script(|s| s.report = Scripted::Status(404, r#"{"detail": "Not found."}"#));
    let dir = tempfile::tempdir().unwrap();
    let mut dash = dashboard(&backend).with_output_dir(dir.path());

    assert!(dash.download_report("missing").is_none());
    assert_eq!(
        dash.state().status_message.as_deref(),
        Some(MSG_DOWNLOAD_FAILED)
    );

    // Output "directory" is a regular file: the write fails, not the fetch.
    backend.script(|s| {
        s.report = Scripted::Ok(Report {
            content_disposition: None,
            bytes: vec![1, 2, 3],
        })
    });
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, b"").unwrap();
    let mut dash = dashboard(&backend).with_output_dir(&blocker);

    assert!(dash.download_report("7").is_none());
    assert_eq!(
        dash.state().status_message.as_deref(),
        Some(MSG_DOWNLOAD_FAILED)
    );
}

// ---------------------------------------------------------------------------
// load sample / selection
// ---------------------------------------------------------------------------

#[test]
fn bundled_sample_is_staged_for_upload() {
    let backend = FakeBackend::new();
    let mut dash = dashboard(&backend);

    dash.load_sample(&SampleSource::Bundled);

    let file = dash.state().selected_file.as_ref().unwrap();
    assert_eq!(file.name, "sample_equipment_data.csv");
    assert!(!file.bytes.is_empty());
    assert_eq!(dash.state().status_message.as_deref(), Some(MSG_SAMPLE_READY));
    assert_eq!(backend.calls().total(), 0);

    dash.upload();
    assert_eq!(
        dash.state().status_message.as_deref(),
        Some("Uploaded sample_equipment_data.csv successfully.")
    );
}

#[test]
fn missing_sample_reports_soft_message() {
    let backend = FakeBackend::new();
    let mut dash = dashboard(&backend);

    dash.load_sample(&SampleSource::Path(PathBuf::from("/no/such/sample.csv")));

    assert!(dash.state().selected_file.is_none());
    assert_eq!(
        dash.state().status_message.as_deref(),
        Some(MSG_SAMPLE_MISSING)
    );
}

#[test]
fn selecting_unreadable_path_leaves_selection_empty() {
    let backend = FakeBackend::new();
    let mut dash = dashboard(&backend);

    dash.select_path(&PathBuf::from("/no/such/file.csv"));

    assert!(dash.state().selected_file.is_none());
    assert!(
        dash.state()
            .status_message
            .as_deref()
            .unwrap()
            .contains("failed to read")
    );
}
