/// Backend API surface consumed by the dashboard.
///
/// The dashboard never talks HTTP directly. It goes through two seams:
///
/// - [`DatasetApi`]: the four authenticated dataset endpoints.
/// - [`Connector`]: builds a [`DatasetApi`] bound to one credential pair.
///
/// [`client::HttpConnector`] is the production implementation (synchronous
/// `ureq`). Tests swap in fakes to count calls and script responses.
pub mod client;
pub mod multipart;
pub mod types;

pub use client::{ApiClient, HttpConnector};
pub use types::{Dataset, HistoryEntry, Report, Row, SelectedFile, Summary};

use crate::error::ApiError;

/// Basic-auth credentials. Held in memory only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Both fields must be non-empty before a client may be built.
    pub fn is_complete(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }
}

/// The authenticated dataset endpoints.
///
/// Implementations must be shareable across threads: the connect action
/// fetches the latest dataset and the history concurrently.
pub trait DatasetApi: Send + Sync {
    /// `GET /datasets/latest/`
    fn latest_dataset(&self) -> Result<Dataset, ApiError>;

    /// `GET /datasets/history/`
    fn history(&self) -> Result<Vec<HistoryEntry>, ApiError>;

    /// `POST /upload/` with the CSV as multipart field `file`.
    fn upload(&self, file: &SelectedFile) -> Result<Dataset, ApiError>;

    /// `GET /datasets/{id}/pdf/`
    fn report(&self, dataset_id: &str) -> Result<Report, ApiError>;
}

/// Factory for credential-bound clients.
pub trait Connector {
    type Client: DatasetApi;

    fn connect(&self, credentials: &Credentials) -> Self::Client;
}
