use crate::prelude::ReportError;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

/// What a reporter has delivered so far, and how the collector answered.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricsSnapshot {
    /// Reports the collector answered with a JSON body, whatever the status.
    pub sent: usize,
    pub failed: usize,
    /// Failures where no response arrived at all.
    pub network_failures: usize,
    /// Replies per HTTP status code.
    pub statuses: BTreeMap<u16, usize>,
    /// `detection_id` from the most recent reply that carried one.
    pub last_detection_id: Option<String>,
    pub last_error: Option<String>,
}

impl MetricsSnapshot {
    pub fn non_success_replies(&self) -> usize {
        self.statuses
            .iter()
            .filter(|(status, _)| !(200..300).contains(*status))
            .map(|(_, count)| count)
            .sum()
    }
}

#[derive(Default)]
pub struct ReportMetrics {
    ledger: Mutex<MetricsSnapshot>,
}

impl ReportMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_reply(&self, status: u16, reply: &Value) {
        let mut ledger = self.ledger.lock().unwrap_or_else(PoisonError::into_inner);
        ledger.sent += 1;
        *ledger.statuses.entry(status).or_insert(0) += 1;
        if let Some(detection_id) = reply.get("detection_id").and_then(Value::as_str) {
            ledger.last_detection_id = Some(detection_id.to_string());
        }
    }

    pub fn record_failure(&self, err: &ReportError) {
        let mut ledger = self.ledger.lock().unwrap_or_else(PoisonError::into_inner);
        ledger.failed += 1;
        if err.is_network() {
            ledger.network_failures += 1;
        }
        ledger.last_error = Some(describe(err));
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        self.ledger
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

fn describe(err: &ReportError) -> String {
    match std::error::Error::source(err) {
        Some(source) => format!("{}: {}", err, source),
        None => err.to_string(),
    }
}
