/// Common error type for building and delivering detection reports.
#[derive(thiserror::Error, Debug)]
pub enum ReportError {
    #[error("network failure")]
    Network(#[from] reqwest::Error),
    #[error("collector response is not valid json")]
    Parse(#[from] serde_json::Error),
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),
    #[error("invalid detection record: {0}")]
    InvalidRecord(String),
}

impl ReportError {
    /// True when the failure happened before a response was received.
    pub fn is_network(&self) -> bool {
        matches!(self, ReportError::Network(_))
    }
}

pub type ReportResult<T> = Result<T, ReportError>;
