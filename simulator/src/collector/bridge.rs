use crate::collector::model::CollectorState;
use anyhow::Context;
use chrono::{SecondsFormat, Utc};
use log::info;
use scancore::DetectionRecord;
use serde_json::json;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, PoisonError, RwLock};
use warp::{http::StatusCode, Filter};

type SharedState = Arc<RwLock<CollectorState>>;

/// Local stand-in for the detection collector service.
#[derive(Clone, Default)]
pub struct CollectorBridge {
    state: SharedState,
}

impl CollectorBridge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn routes(
        &self,
    ) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
        let state = self.state.clone();
        let state_filter = warp::any().map(move || state.clone());

        let ingest_route = warp::path!("api" / "detectbluetooth")
            .and(warp::post())
            .and(warp::body::json())
            .and(state_filter.clone())
            .map(|record: DetectionRecord, state: SharedState| {
                let mut guard = state.write().unwrap_or_else(PoisonError::into_inner);
                let stored = guard.store(record);
                info!(
                    "[COLLECTOR] {} from {} ({} dBm)",
                    stored.detection_id, stored.record.device_id, stored.record.rssi
                );
                warp::reply::json(&json!({
                    "status": "ok",
                    "detection_id": stored.detection_id,
                }))
            });

        let list_route = warp::path!("api" / "detections")
            .and(warp::get())
            .and(state_filter.clone())
            .map(|state: SharedState| {
                let guard = state.read().unwrap_or_else(PoisonError::into_inner);
                warp::reply::json(&guard.detections)
            });

        let detail_route = warp::path!("api" / "detections" / String)
            .and(warp::get())
            .and(state_filter)
            .map(|detection_id: String, state: SharedState| {
                let guard = state.read().unwrap_or_else(PoisonError::into_inner);
                match guard.find(&detection_id) {
                    Some(stored) => warp::reply::with_status(
                        warp::reply::json(&json!({
                            "detection_id": detection_id,
                            "stored": stored,
                        })),
                        StatusCode::OK,
                    ),
                    None => warp::reply::with_status(
                        warp::reply::json(&json!({"detail": "Detection not found"})),
                        StatusCode::NOT_FOUND,
                    ),
                }
            });

        let health_route = warp::path!("health").and(warp::get()).map(|| {
            warp::reply::json(&json!({
                "status": "healthy",
                "time": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            }))
        });

        ingest_route
            .or(list_route)
            .or(detail_route)
            .or(health_route)
    }

    /// Binds the collector and returns the bound address with the server
    /// future; the caller decides where to drive it.
    pub fn bind(
        &self,
        addr: SocketAddr,
    ) -> anyhow::Result<(SocketAddr, impl Future<Output = ()> + Send + 'static)> {
        let (bound, server) = warp::serve(self.routes())
            .try_bind_ephemeral(addr)
            .with_context(|| format!("binding collector on {}", addr))?;
        info!("[COLLECTOR] listening on http://{}", bound);
        Ok((bound, server))
    }

    #[cfg(test)]
    pub fn snapshot(&self) -> Vec<crate::collector::model::StoredDetection> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .detections
            .clone()
    }
}
