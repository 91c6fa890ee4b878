//! Detection model and collector reporter for simulated Bluetooth scans.
//!
//! A detection is built once per report, serialized to JSON and posted to a
//! collector endpoint; the collector's JSON acknowledgement is handed back to
//! the caller untouched.

pub mod detection;
pub mod prelude;
pub mod telemetry;
pub mod transport;

pub use detection::{DetectionRecord, Location};
pub use prelude::{ReportError, ReportResult};
pub use transport::{ReporterConfig, ScanReporter};
