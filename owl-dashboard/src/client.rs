//! Telemetry source: the backend endpoints the poller reads from
//!
//! All endpoints are idempotent GETs. Non-success responses are transport
//! failures; nothing here ever retries, the next poll tick does.

use crate::config::BackendConf;
use crate::models::{FleetListing, Overview, TelemetrySnapshot, UnitId};
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

pub const OVERVIEW_PATH: &str = "system_stats";
pub const FLEET_PATH: &str = "owls";

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("{url} answered {status}")]
    Status { url: String, status: u16 },
    #[error("invalid JSON payload: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid endpoint URL: {0}")]
    InvalidUrl(String),
}

/// What the poller needs from the backend
pub trait TelemetrySource: Send + Sync + 'static {
    /// Lightweight fleet-wide summary for the overview markers
    fn fetch_overview(&self) -> impl Future<Output = Result<Overview, FetchError>> + Send;

    /// Units currently known to the backend
    fn fetch_fleet(&self) -> impl Future<Output = Result<FleetListing, FetchError>> + Send;

    /// Detailed telemetry of a single unit
    fn fetch_unit_status(
        &self,
        id: &UnitId,
    ) -> impl Future<Output = Result<TelemetrySnapshot, FetchError>> + Send;
}

#[derive(Debug, Clone)]
pub struct HttpTelemetrySource {
    client: Client,
    base_url: Url,
}

impl HttpTelemetrySource {
    pub fn new(conf: &BackendConf) -> Result<Self, FetchError> {
        let mut base_url =
            Url::parse(&conf.base_url).map_err(|e| FetchError::InvalidUrl(format!("{}: {e}", conf.base_url)))?;
        if base_url.cannot_be_a_base() {
            return Err(FetchError::InvalidUrl(conf.base_url.clone()));
        }
        // "http://host/api" doit se comporter comme "http://host/api/"
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = Client::builder()
            .timeout(Duration::from_millis(conf.request_timeout_ms))
            .build()?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, FetchError> {
        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| FetchError::InvalidUrl(self.base_url.to_string()))?;
            path.pop_if_empty();
            path.extend(segments);
        }
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, FetchError> {
        debug!("GET {url}");
        let response = self.client.get(url.clone()).send().await?;
        if !response.status().is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

impl TelemetrySource for HttpTelemetrySource {
    async fn fetch_overview(&self) -> Result<Overview, FetchError> {
        let url = self.endpoint(&[OVERVIEW_PATH])?;
        self.get_json(url).await
    }

    async fn fetch_fleet(&self) -> Result<FleetListing, FetchError> {
        let url = self.endpoint(&[FLEET_PATH])?;
        self.get_json(url).await
    }

    async fn fetch_unit_status(&self, id: &UnitId) -> Result<TelemetrySnapshot, FetchError> {
        let url = self.endpoint(&["owl", id.as_str(), "status"])?;
        self.get_json(url).await
    }
}
