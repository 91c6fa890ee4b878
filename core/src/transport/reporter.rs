use crate::detection::DetectionRecord;
use crate::prelude::ReportResult;
use crate::telemetry::ReportMetrics;
use crate::transport::config::ReporterConfig;
use log::{debug, info, warn};
use reqwest::Url;
use serde_json::Value;

/// Posts detection records to a collector and hands back its JSON reply.
///
/// One request is in flight per call; there is no retry. Replies are returned
/// verbatim whatever their HTTP status; a body that is not JSON is an error,
/// never a partial value.
pub struct ScanReporter {
    config: ReporterConfig,
    client: reqwest::Client,
    metrics: ReportMetrics,
}

impl ScanReporter {
    pub fn new(config: ReporterConfig) -> ReportResult<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            config,
            client: builder.build()?,
            metrics: ReportMetrics::new(),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.config.endpoint
    }

    pub fn metrics(&self) -> &ReportMetrics {
        &self.metrics
    }

    /// Reports the fixture detection, freshly timestamped.
    pub async fn report_detection(&self) -> ReportResult<Value> {
        self.report(&DetectionRecord::fixture()).await
    }

    pub async fn report(&self, record: &DetectionRecord) -> ReportResult<Value> {
        match self.deliver(record).await {
            Ok((status, reply)) => {
                self.metrics.record_reply(status, &reply);
                Ok(reply)
            }
            Err(err) => {
                warn!("report for {} failed: {}", record.device_id, err);
                self.metrics.record_failure(&err);
                Err(err)
            }
        }
    }

    async fn deliver(&self, record: &DetectionRecord) -> ReportResult<(u16, Value)> {
        record.validate()?;
        debug!(
            "posting detection {} ({} dBm) to {}",
            record.device_id, record.rssi, self.config.endpoint
        );

        let response = self
            .client
            .post(self.config.endpoint.clone())
            .json(record)
            .send()
            .await?;
        let status = response.status();
        let body = response.bytes().await?;

        // The reply is handed back whatever the status, as long as it is JSON.
        let parsed: Value = serde_json::from_slice(&body)?;
        if status.is_success() {
            info!("collector acknowledged {}: {}", record.device_id, parsed);
        } else {
            warn!(
                "collector answered {} with {}: {}",
                record.device_id, status, parsed
            );
        }
        Ok((status.as_u16(), parsed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prelude::ReportError;
    use chrono::{DateTime, Utc};
    use serde_json::json;
    use std::net::SocketAddr;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use warp::http::StatusCode;
    use warp::{Filter, Reply};

    type Captured = Arc<Mutex<Vec<(Option<String>, Value)>>>;

    #[derive(Clone)]
    enum CannedReply {
        Json(Value),
        Text(&'static str),
        Status(u16),
        Html(u16),
    }

    async fn spawn_collector(reply: CannedReply) -> (SocketAddr, Captured) {
        let captured: Captured = Arc::new(Mutex::new(Vec::new()));
        let sink = captured.clone();
        let route = warp::post()
            .and(warp::path!("api" / "detectbluetooth"))
            .and(warp::header::optional::<String>("content-type"))
            .and(warp::body::json())
            .map(move |content_type: Option<String>, body: Value| {
                sink.lock().unwrap().push((content_type, body));
                match &reply {
                    CannedReply::Json(value) => warp::reply::json(value).into_response(),
                    CannedReply::Text(text) => {
                        warp::reply::with_header(*text, "content-type", "text/plain")
                            .into_response()
                    }
                    CannedReply::Status(code) => warp::reply::with_status(
                        warp::reply::json(&json!({"detail": "validation"})),
                        StatusCode::from_u16(*code).unwrap(),
                    )
                    .into_response(),
                    CannedReply::Html(code) => warp::reply::with_status(
                        warp::reply::html("<h1>Bad Gateway</h1>"),
                        StatusCode::from_u16(*code).unwrap(),
                    )
                    .into_response(),
                }
            });
        let (addr, server) = warp::serve(route).bind_ephemeral(([127, 0, 0, 1], 0));
        tokio::spawn(server);
        (addr, captured)
    }

    fn reporter_for(addr: SocketAddr) -> ScanReporter {
        let config =
            ReporterConfig::new(&format!("http://{}/api/detectbluetooth", addr)).unwrap();
        ScanReporter::new(config).unwrap()
    }

    #[tokio::test]
    async fn returns_collector_acknowledgement() {
        let (addr, _) = spawn_collector(CannedReply::Json(json!({"status": "ok"}))).await;
        let reporter = reporter_for(addr);

        let response = reporter.report_detection().await.unwrap();

        assert_eq!(response, json!({"status": "ok"}));
        let snapshot = reporter.metrics().snapshot();
        assert_eq!((snapshot.sent, snapshot.failed), (1, 0));
    }

    #[tokio::test]
    async fn posts_fixture_body_as_json() {
        let (addr, captured) = spawn_collector(CannedReply::Json(json!({"status": "ok"}))).await;
        let reporter = reporter_for(addr);

        reporter.report_detection().await.unwrap();

        let captured = captured.lock().unwrap();
        assert_eq!(captured.len(), 1);
        let (content_type, body) = &captured[0];
        assert_eq!(content_type.as_deref(), Some("application/json"));

        let object = body.as_object().unwrap();
        let mut keys: Vec<&str> = object.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(
            keys,
            [
                "device_id",
                "device_name",
                "location",
                "mac_address",
                "rssi",
                "timestamp"
            ]
        );
        assert_eq!(body["device_id"], "pump_42");
        assert_eq!(body["rssi"], -45);
        assert_eq!(body["mac_address"], "00:14:03:06:12:34");
        assert_eq!(body["location"]["latitude"].as_f64(), Some(38.8462));
        assert_eq!(body["location"]["longitude"].as_f64(), Some(-77.3064));

        let stamped = DateTime::parse_from_rfc3339(body["timestamp"].as_str().unwrap())
            .unwrap()
            .with_timezone(&Utc);
        let drift = (Utc::now() - stamped).num_milliseconds().abs();
        assert!(drift <= 5_000, "timestamp drifted {} ms", drift);
    }

    #[tokio::test]
    async fn each_report_gets_a_fresh_timestamp() {
        let (addr, captured) = spawn_collector(CannedReply::Json(json!({"status": "ok"}))).await;
        let reporter = reporter_for(addr);

        reporter.report_detection().await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        reporter.report_detection().await.unwrap();

        let captured = captured.lock().unwrap();
        assert_ne!(captured[0].1["timestamp"], captured[1].1["timestamp"]);
    }

    #[tokio::test]
    async fn unreachable_collector_is_a_network_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let reporter = reporter_for(addr);

        let err = reporter.report_detection().await.unwrap_err();

        assert!(err.is_network(), "unexpected error: {}", err);
        let snapshot = reporter.metrics().snapshot();
        assert_eq!((snapshot.sent, snapshot.failed), (0, 1));
        assert_eq!(snapshot.network_failures, 1);
        assert!(snapshot
            .last_error
            .as_deref()
            .is_some_and(|text| text.starts_with("network failure: ")));
    }

    #[tokio::test]
    async fn non_json_reply_is_a_parse_error() {
        let (addr, _) = spawn_collector(CannedReply::Text("<html>ok</html>")).await;
        let reporter = reporter_for(addr);

        let err = reporter.report_detection().await.unwrap_err();

        assert!(matches!(err, ReportError::Parse(_)), "unexpected error: {}", err);
    }

    #[tokio::test]
    async fn error_status_with_json_body_is_returned_verbatim() {
        let (addr, _) = spawn_collector(CannedReply::Status(422)).await;
        let reporter = reporter_for(addr);

        let response = reporter.report_detection().await.unwrap();

        assert_eq!(response, json!({"detail": "validation"}));
        let snapshot = reporter.metrics().snapshot();
        assert_eq!(snapshot.statuses.get(&422), Some(&1));
        assert_eq!(snapshot.non_success_replies(), 1);
        assert_eq!(snapshot.failed, 0);
    }

    #[tokio::test]
    async fn error_status_with_html_body_is_a_parse_error() {
        let (addr, _) = spawn_collector(CannedReply::Html(502)).await;
        let reporter = reporter_for(addr);

        let err = reporter.report_detection().await.unwrap_err();

        assert!(matches!(err, ReportError::Parse(_)), "unexpected error: {}", err);
    }

    #[tokio::test]
    async fn invalid_record_is_not_sent() {
        let (addr, captured) = spawn_collector(CannedReply::Json(json!({"status": "ok"}))).await;
        let reporter = reporter_for(addr);
        let mut record = DetectionRecord::fixture();
        record.mac_address = "not-a-mac".into();

        let err = reporter.report(&record).await.unwrap_err();

        assert!(matches!(err, ReportError::InvalidRecord(_)));
        assert!(captured.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn slow_collector_times_out() {
        let route = warp::post().and_then(|| async {
            tokio::time::sleep(Duration::from_millis(500)).await;
            Ok::<_, warp::Rejection>(warp::reply::json(&json!({"status": "late"})))
        });
        let (addr, server) = warp::serve(route).bind_ephemeral(([127, 0, 0, 1], 0));
        tokio::spawn(server);
        let config = ReporterConfig::new(&format!("http://{}/api/detectbluetooth", addr))
            .unwrap()
            .with_timeout(Duration::from_millis(50));
        let reporter = ScanReporter::new(config).unwrap();

        let err = reporter.report_detection().await.unwrap_err();

        assert!(err.is_network(), "unexpected error: {}", err);
    }
}
