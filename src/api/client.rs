/// Synchronous HTTP client for the analytics backend.
///
/// Built on `ureq` with a shared [`ureq::Agent`] per credential pair. Every
/// dataset request carries an `Authorization: Basic ...` header. Failed
/// responses are classified into [`ApiError`] here and nowhere else.
use std::io::Read;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use super::multipart;
use super::types::{Dataset, HistoryEntry, Report, SelectedFile};
use super::{Connector, Credentials, DatasetApi};
use crate::config::schema::ApiConfig;
use crate::error::ApiError;

/// MIME type announced for uploaded CSV parts.
const CSV_MIME: &str = "text/csv";

// ---------------------------------------------------------------------------
// Connector
// ---------------------------------------------------------------------------

/// Builds [`ApiClient`]s against one base URL.
#[derive(Debug, Clone)]
pub struct HttpConnector {
    base_url: String,
    timeout: Duration,
}

impl HttpConnector {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }

    pub fn from_config(config: &ApiConfig) -> Self {
        Self::new(&config.base_url, Duration::from_millis(config.timeout_ms))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET /health/`. Unauthenticated; returns the reported status string.
    pub fn health(&self) -> Result<String, ApiError> {
        #[derive(Deserialize)]
        struct HealthBody {
            status: String,
        }

        let agent = build_agent(self.timeout);
        let resp = agent
            .get(&join_url(&self.base_url, "/health/"))
            .call()
            .map_err(classify)?;
        let body: HealthBody = decode_json(resp)?;
        Ok(body.status)
    }
}

impl Connector for HttpConnector {
    type Client = ApiClient;

    fn connect(&self, credentials: &Credentials) -> ApiClient {
        ApiClient {
            agent: build_agent(self.timeout),
            base_url: self.base_url.clone(),
            authorization: basic_auth(credentials),
        }
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// A request client bound to one credential pair.
#[derive(Debug)]
pub struct ApiClient {
    agent: ureq::Agent,
    base_url: String,
    authorization: String,
}

impl ApiClient {
    fn get(&self, path: &str) -> ureq::Request {
        self.agent
            .get(&join_url(&self.base_url, path))
            .set("Authorization", &self.authorization)
    }
}

impl DatasetApi for ApiClient {
    fn latest_dataset(&self) -> Result<Dataset, ApiError> {
        let resp = self.get("/datasets/latest/").call().map_err(classify)?;
        decode_json(resp)
    }

    fn history(&self) -> Result<Vec<HistoryEntry>, ApiError> {
        let resp = self.get("/datasets/history/").call().map_err(classify)?;
        decode_json(resp)
    }

    fn upload(&self, file: &SelectedFile) -> Result<Dataset, ApiError> {
        let body = multipart::encode_file("file", &file.name, CSV_MIME, &file.bytes);
        let resp = self
            .agent
            .post(&join_url(&self.base_url, "/upload/"))
            .set("Authorization", &self.authorization)
            .set("Content-Type", &body.content_type)
            .send_bytes(&body.bytes)
            .map_err(classify)?;
        decode_json(resp)
    }

    fn report(&self, dataset_id: &str) -> Result<Report, ApiError> {
        let path = format!("/datasets/{dataset_id}/pdf/");
        let resp = self.get(&path).call().map_err(classify)?;

        let content_disposition = resp.header("content-disposition").map(str::to_string);
        let mut bytes = Vec::new();
        resp.into_reader()
            .read_to_end(&mut bytes)
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        Ok(Report {
            content_disposition,
            bytes,
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn build_agent(timeout: Duration) -> ureq::Agent {
    ureq::AgentBuilder::new().timeout(timeout).build()
}

fn basic_auth(credentials: &Credentials) -> String {
    let raw = format!("{}:{}", credentials.username, credentials.password);
    format!("Basic {}", STANDARD.encode(raw))
}

fn join_url(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Map a `ureq` failure onto the error taxonomy.
fn classify(error: ureq::Error) -> ApiError {
    match error {
        ureq::Error::Status(status, resp) => {
            let body = resp.into_string().unwrap_or_default();
            ApiError::from_status(status, &body)
        }
        ureq::Error::Transport(transport) => ApiError::Transport(transport.to_string()),
    }
}

fn decode_json<T: DeserializeOwned>(resp: ureq::Response) -> Result<T, ApiError> {
    resp.into_json::<T>()
        .map_err(|e| ApiError::Decode(e.to_string()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
