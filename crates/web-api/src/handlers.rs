use crate::hub::BroadcastHub;
use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;
use vault_greeks_core::Snapshot;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub vaults: usize,
    pub subscribers: usize,
}

/// Current snapshot, for clients that poll instead of subscribing.
pub async fn get_snapshot(State(hub): State<Arc<BroadcastHub>>) -> Json<Snapshot> {
    Json(hub.snapshot())
}

pub async fn health(State(hub): State<Arc<BroadcastHub>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        vaults: hub.snapshot().deltas.len(),
        subscribers: hub.open_count(),
    })
}
