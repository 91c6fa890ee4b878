use crate::prelude::{ReportError, ReportResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default device identifier used by the test fixture.
pub const FIXTURE_DEVICE_ID: &str = "pump_42";
pub const FIXTURE_DEVICE_NAME: &str = "HC-05";
pub const FIXTURE_MAC_ADDRESS: &str = "00:14:03:06:12:34";
pub const FIXTURE_RSSI: i32 = -45;
pub const FIXTURE_LATITUDE: f64 = 38.8462;
pub const FIXTURE_LONGITUDE: f64 = -77.3064;

/// GPS coordinates attached to a detection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// One simulated Bluetooth device detection, as posted to the collector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionRecord {
    pub device_id: String,
    /// Signal strength in dBm.
    pub rssi: i32,
    pub device_name: String,
    pub mac_address: String,
    #[serde(with = "iso_millis")]
    pub timestamp: DateTime<Utc>,
    pub location: Location,
}

impl DetectionRecord {
    /// Builds a record stamped with the current UTC instant.
    pub fn new(
        device_id: impl Into<String>,
        rssi: i32,
        device_name: impl Into<String>,
        mac_address: impl Into<String>,
        location: Location,
    ) -> Self {
        Self::observed_at(
            device_id,
            rssi,
            device_name,
            mac_address,
            location,
            Utc::now(),
        )
    }

    pub fn observed_at(
        device_id: impl Into<String>,
        rssi: i32,
        device_name: impl Into<String>,
        mac_address: impl Into<String>,
        location: Location,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            rssi,
            device_name: device_name.into(),
            mac_address: mac_address.into(),
            timestamp,
            location,
        }
    }

    /// The fixed `pump_42` / `HC-05` detection used for smoke tests.
    pub fn fixture() -> Self {
        Self::new(
            FIXTURE_DEVICE_ID,
            FIXTURE_RSSI,
            FIXTURE_DEVICE_NAME,
            FIXTURE_MAC_ADDRESS,
            Location::new(FIXTURE_LATITUDE, FIXTURE_LONGITUDE),
        )
    }

    pub fn validate(&self) -> ReportResult<()> {
        if self.device_id.trim().is_empty() {
            return Err(ReportError::InvalidRecord("device_id is empty".into()));
        }
        if !is_colon_hex_mac(&self.mac_address) {
            return Err(ReportError::InvalidRecord(format!(
                "mac_address {:?} is not six colon-delimited hex octets",
                self.mac_address
            )));
        }
        let Location {
            latitude,
            longitude,
        } = self.location;
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(ReportError::InvalidRecord(format!(
                "latitude {} out of range",
                latitude
            )));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(ReportError::InvalidRecord(format!(
                "longitude {} out of range",
                longitude
            )));
        }
        Ok(())
    }
}

fn is_colon_hex_mac(mac: &str) -> bool {
    let octets: Vec<&str> = mac.split(':').collect();
    octets.len() == 6
        && octets
            .iter()
            .all(|octet| octet.len() == 2 && octet.chars().all(|c| c.is_ascii_hexdigit()))
}

/// ISO-8601 UTC with millisecond precision and a `Z` suffix.
mod iso_millis {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(timestamp: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&timestamp.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|parsed| parsed.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}
