use crate::generator::profile::GeneratorConfig;
use anyhow::Context;
use scancore::transport::{ReporterConfig, DEFAULT_ENDPOINT};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReportConfig {
    pub endpoint: String,
    pub timeout_seconds: Option<u64>,
    /// Number of reports to send in one run.
    pub count: usize,
    pub interval_ms: u64,
    pub device: GeneratorConfig,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout_seconds: None,
            count: 1,
            interval_ms: 0,
            device: GeneratorConfig::default(),
        }
    }
}

impl ReportConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading report config {}", path_ref.display()))?;
        let config: ReportConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing report config {}", path_ref.display()))?;
        Ok(config)
    }

    pub fn from_args(endpoint: &str, count: usize, interval_ms: u64) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            count,
            interval_ms,
            ..Default::default()
        }
    }

    pub fn to_reporter_config(&self) -> anyhow::Result<ReporterConfig> {
        let mut config = ReporterConfig::new(&self.endpoint)
            .with_context(|| format!("configuring collector endpoint {}", self.endpoint))?;
        if let Some(seconds) = self.timeout_seconds {
            config = config.with_timeout(Duration::from_secs(seconds));
        }
        Ok(config)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn config_from_args_targets_endpoint() {
        let cfg = ReportConfig::from_args("http://127.0.0.1:9100/api/detectbluetooth", 3, 250);
        let reporter = cfg.to_reporter_config().unwrap();
        assert_eq!(reporter.endpoint.port(), Some(9100));
        assert_eq!(cfg.count, 3);
        assert_eq!(cfg.interval(), Duration::from_millis(250));
    }

    #[test]
    fn config_load_reads_yaml() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(
            b"endpoint: http://collector.local:8000/api/detectbluetooth\n\
              timeout_seconds: 4\n\
              count: 2\n\
              device:\n  device_id: gate_3\n  rssi_jitter: 3\n",
        )
        .unwrap();
        let path = temp.into_temp_path();
        let cfg = ReportConfig::load(&path).unwrap();
        assert_eq!(cfg.count, 2);
        assert_eq!(cfg.device.device_id, "gate_3");
        assert_eq!(cfg.device.device_name, "HC-05");
        let reporter = cfg.to_reporter_config().unwrap();
        assert_eq!(reporter.timeout, Some(Duration::from_secs(4)));
    }

    #[test]
    fn bundled_config_parses() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../config/reporter.yaml");
        let cfg = ReportConfig::load(path).unwrap();
        assert_eq!(cfg.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(cfg.device.rssi_jitter, 4);
        assert!(cfg.to_reporter_config().is_ok());
    }

    #[test]
    fn bad_endpoint_is_reported_with_context() {
        let cfg = ReportConfig::from_args("localhost:8000", 1, 0);
        let err = cfg.to_reporter_config().unwrap_err();
        assert!(format!("{:#}", err).contains("localhost:8000"));
    }
}
