//! Liveness/readiness probes and the per-backend Ollama health snapshot.

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

#[derive(Debug, Serialize)]
pub struct InstanceHealth {
    pub name: String,
    pub specialization: tsa_core::query::BackendSpecialization,
    pub healthy: bool,
    pub in_flight: usize,
    pub last_rtt_ms: u64,
}

#[derive(Debug, Serialize)]
pub struct HealthDetailsResponse {
    pub status: &'static str,
    pub instances: Vec<InstanceHealth>,
}

pub async fn health_details(State(state): State<AppState>) -> Json<HealthDetailsResponse> {
    let instances: Vec<InstanceHealth> = state
        .pool
        .instances()
        .iter()
        .map(|backend| InstanceHealth {
            name: backend.name.clone(),
            specialization: backend.specialization,
            healthy: backend.is_healthy(),
            in_flight: backend.in_flight_count(),
            last_rtt_ms: backend.last_rtt().as_millis() as u64,
        })
        .collect();

    let status = if instances.iter().any(|i| i.healthy) { "ok" } else { "unhealthy" };
    Json(HealthDetailsResponse { status, instances })
}

#[derive(Debug, Serialize)]
pub struct OllamaHealthResponse {
    pub status: &'static str,
    pub healthy_instances: usize,
    pub total_instances: usize,
    pub instances: Vec<InstanceHealth>,
}

pub async fn ollama_health(State(state): State<AppState>) -> Json<OllamaHealthResponse> {
    let instances: Vec<InstanceHealth> = state
        .pool
        .instances()
        .iter()
        .map(|backend| InstanceHealth {
            name: backend.name.clone(),
            specialization: backend.specialization,
            healthy: backend.is_healthy(),
            in_flight: backend.in_flight_count(),
            last_rtt_ms: backend.last_rtt().as_millis() as u64,
        })
        .collect();

    let healthy_instances = instances.iter().filter(|i| i.healthy).count();
    let status = if healthy_instances > 0 { "healthy" } else { "unhealthy" };

    Json(OllamaHealthResponse { status, healthy_instances, total_instances: instances.len(), instances })
}
