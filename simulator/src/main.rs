use anyhow::Context;
use clap::Parser;
use collector::bridge::CollectorBridge;
use log::info;
use scancore::transport::DEFAULT_ENDPOINT;
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::runtime::Builder as TokioBuilder;
use tokio::signal;
use workflow::config::ReportConfig;
use workflow::runner::Runner;

mod collector;
mod generator;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Simulated Bluetooth detection reporter")]
struct Args {
    /// Load a report config from YAML
    #[arg(long)]
    config: Option<PathBuf>,
    /// Collector endpoint receiving detections
    #[arg(long)]
    endpoint: Option<String>,
    /// Number of detections to report
    #[arg(long)]
    count: Option<usize>,
    /// Pause between consecutive reports
    #[arg(long)]
    interval_ms: Option<u64>,
    /// Abort a report that takes longer than this
    #[arg(long)]
    timeout_secs: Option<u64>,
    /// Host the mock collector and keep it alive until Ctrl+C
    #[arg(long, default_value_t = false)]
    serve: bool,
    #[arg(long, default_value = "127.0.0.1:8000")]
    bind: SocketAddr,
}

impl Args {
    fn report_config(&self) -> anyhow::Result<ReportConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let mut config = ReportConfig::load(path)?;
                if let Some(endpoint) = &self.endpoint {
                    config.endpoint = endpoint.clone();
                }
                if let Some(count) = self.count {
                    config.count = count;
                }
                if let Some(interval_ms) = self.interval_ms {
                    config.interval_ms = interval_ms;
                }
                config
            }
            None => ReportConfig::from_args(
                self.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT),
                self.count.unwrap_or(1),
                self.interval_ms.unwrap_or(0),
            ),
        };
        if self.timeout_secs.is_some() {
            config.timeout_seconds = self.timeout_secs;
        }
        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();
    let report_config = args.report_config()?;

    let runtime = TokioBuilder::new_current_thread()
        .enable_all()
        .build()
        .context("creating runtime")?;

    runtime.block_on(async {
        if args.serve {
            let (_, server) = CollectorBridge::new().bind(args.bind)?;
            tokio::spawn(server);
        }

        let runner = Runner::new(report_config)?;
        let summary = runner.execute(&mut io::stdout()).await?;
        info!(
            "run finished: {} sent, {} failed, {} non-success replies",
            summary.sent,
            summary.failed,
            summary.non_success_replies()
        );

        if args.serve {
            eprintln!("[COLLECTOR] running on http://{} (Ctrl+C to stop)...", args.bind);
            signal::ctrl_c().await.context("awaiting Ctrl+C to exit")?;
        }
        Ok::<(), anyhow::Error>(())
    })
}
