//! Prometheus text exposition, grounded in the `metrics` +
//! `metrics-exporter-prometheus` pairing `bravo1goingdark-ucfp`'s `server`
//! feature already pulls in for its axum binary.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Installs the global `metrics` recorder and returns a handle whose
/// `render()` backs `GET /metrics`. Call once, at startup.
pub fn install_recorder() -> PrometheusHandle {
    PrometheusBuilder::new().install_recorder().expect("failed to install the Prometheus recorder")
}

pub async fn metrics_handler(
    axum::extract::State(handle): axum::extract::State<PrometheusHandle>,
) -> String {
    handle.render()
}
