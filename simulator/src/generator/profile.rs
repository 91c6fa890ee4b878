use rand::{rngs::StdRng, Rng, SeedableRng};
use scancore::detection::record::{
    FIXTURE_DEVICE_ID, FIXTURE_DEVICE_NAME, FIXTURE_LATITUDE, FIXTURE_LONGITUDE,
    FIXTURE_MAC_ADDRESS, FIXTURE_RSSI,
};
use scancore::{DetectionRecord, Location};
use serde::{Deserialize, Serialize};

/// Configuration for generating simulated Bluetooth detections.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GeneratorConfig {
    pub device_id: String,
    pub device_name: String,
    pub mac_address: String,
    pub rssi: i32,
    /// Uniform jitter applied to `rssi`, in dBm either side.
    pub rssi_jitter: u16,
    pub latitude: f64,
    pub longitude: f64,
    pub seed: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            device_id: FIXTURE_DEVICE_ID.to_string(),
            device_name: FIXTURE_DEVICE_NAME.to_string(),
            mac_address: FIXTURE_MAC_ADDRESS.to_string(),
            rssi: FIXTURE_RSSI,
            rssi_jitter: 0,
            latitude: FIXTURE_LATITUDE,
            longitude: FIXTURE_LONGITUDE,
            seed: 0,
        }
    }
}

/// Produces detections from a [`GeneratorConfig`], one per call.
pub struct DetectionGenerator {
    config: GeneratorConfig,
    rng: StdRng,
}

impl DetectionGenerator {
    pub fn new(config: GeneratorConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self { config, rng }
    }

    pub fn next_record(&mut self) -> DetectionRecord {
        let jitter = i32::from(self.config.rssi_jitter);
        let rssi = if jitter > 0 {
            self.config.rssi + self.rng.gen_range(-jitter..=jitter)
        } else {
            self.config.rssi
        };

        DetectionRecord::new(
            self.config.device_id.clone(),
            rssi,
            self.config.device_name.clone(),
            self.config.mac_address.clone(),
            Location::new(self.config.latitude, self.config.longitude),
        )
    }
}
