use crate::generator::profile::DetectionGenerator;
use crate::workflow::config::ReportConfig;
use anyhow::Context;
use log::warn;
use scancore::telemetry::MetricsSnapshot;
use scancore::ScanReporter;
use serde_json::Value;
use std::io::Write;

pub struct Runner {
    config: ReportConfig,
    reporter: ScanReporter,
}

impl Runner {
    pub fn new(config: ReportConfig) -> anyhow::Result<Self> {
        let reporter = ScanReporter::new(config.to_reporter_config()?)
            .context("building collector client")?;
        Ok(Self { config, reporter })
    }

    /// Sends the configured number of reports one after another, writing each
    /// reply to `out` as soon as it arrives. The first failure ends the run;
    /// replies already written stay written.
    pub async fn execute<W: Write>(&self, out: &mut W) -> anyhow::Result<MetricsSnapshot> {
        let mut generator = DetectionGenerator::new(self.config.device.clone());

        for index in 0..self.config.count {
            if index > 0 && self.config.interval_ms > 0 {
                tokio::time::sleep(self.config.interval()).await;
            }
            let record = generator.next_record();
            match self.reporter.report(&record).await {
                Ok(response) => emit_response(&response, out)?,
                Err(err) => {
                    let snapshot = self.reporter.metrics().snapshot();
                    warn!(
                        "run aborted: {} sent, {} failed",
                        snapshot.sent, snapshot.failed
                    );
                    return Err(anyhow::Error::new(err).context(format!(
                        "reporting detection {}/{} to {} ({} sent, {} failed)",
                        index + 1,
                        self.config.count,
                        self.reporter.endpoint(),
                        snapshot.sent,
                        snapshot.failed
                    )));
                }
            }
        }

        Ok(self.reporter.metrics().snapshot())
    }
}

/// Writes one collector reply as pretty-printed JSON.
pub fn emit_response<W: Write>(response: &Value, out: &mut W) -> anyhow::Result<()> {
    let rendered =
        serde_json::to_string_pretty(response).context("rendering collector response")?;
    writeln!(out, "{}", rendered).context("writing collector response")?;
    out.flush().context("flushing collector response")?;
    Ok(())
}
