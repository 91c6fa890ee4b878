use crate::prelude::{ReportError, ReportResult};
use reqwest::Url;
use std::time::Duration;

/// Collector endpoint used when nothing else is configured.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:8000/api/detectbluetooth";

/// Where and how a [`ScanReporter`](super::ScanReporter) delivers detections.
#[derive(Debug, Clone)]
pub struct ReporterConfig {
    pub endpoint: Url,
    /// Whole-request timeout. `None` leaves the client default in place.
    pub timeout: Option<Duration>,
}

impl ReporterConfig {
    pub fn new(endpoint: &str) -> ReportResult<Self> {
        let endpoint = Url::parse(endpoint)
            .map_err(|err| ReportError::InvalidEndpoint(format!("{}: {}", endpoint, err)))?;
        match endpoint.scheme() {
            "http" | "https" => Ok(Self {
                endpoint,
                timeout: None,
            }),
            other => Err(ReportError::InvalidEndpoint(format!(
                "unsupported scheme {:?} in {}",
                other, endpoint
            ))),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}
