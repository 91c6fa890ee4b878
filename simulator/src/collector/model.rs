use chrono::{DateTime, Utc};
use scancore::DetectionRecord;
use serde::Serialize;

/// A detection as held by the mock collector.
#[derive(Debug, Clone, Serialize)]
pub struct StoredDetection {
    pub detection_id: String,
    pub received_at: DateTime<Utc>,
    #[serde(flatten)]
    pub record: DetectionRecord,
}

#[derive(Debug, Default)]
pub struct CollectorState {
    next_id: u64,
    pub detections: Vec<StoredDetection>,
}

impl CollectorState {
    pub fn store(&mut self, record: DetectionRecord) -> &StoredDetection {
        self.next_id += 1;
        let stored = StoredDetection {
            detection_id: format!("det-{:06}", self.next_id),
            received_at: Utc::now(),
            record,
        };
        self.detections.push(stored);
        &self.detections[self.detections.len() - 1]
    }

    pub fn find(&self, detection_id: &str) -> Option<&StoredDetection> {
        self.detections
            .iter()
            .find(|stored| stored.detection_id == detection_id)
    }
}
