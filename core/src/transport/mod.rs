pub mod config;
pub mod reporter;

pub use config::{ReporterConfig, DEFAULT_ENDPOINT};
pub use reporter::ScanReporter;
