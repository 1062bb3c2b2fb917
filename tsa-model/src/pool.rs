//! Backend pool: health-tracked Ollama instances with specialization-aware
//! selection.
//!
//! Mirrors `original_source/reranker/intelligent_router.py`'s
//! `IntelligentRouter`: a fixed instance list (from `OLLAMA_INSTANCES`, or
//! the 8-instance `ollama-server-{1..8}:11434` default with
//! primary/secondary/tertiary/quaternary/additional roles), each tagged
//! with a specialization and probed periodically. `pick` is pure selection
//! over the current state; it never itself probes.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use ollama_rs::Ollama;
use tracing::{debug, warn};
use tsa_core::query::BackendSpecialization;

use crate::error::BackendError;

/// Built-in fallback list, used when `OLLAMA_INSTANCES` is unset. Mirrors
/// `intelligent_router.py`'s hardcoded defaults.
const DEFAULT_INSTANCES: &[(&str, u16)] = &[
    ("ollama-server-1", 11434),
    ("ollama-server-2", 11434),
    ("ollama-server-3", 11434),
    ("ollama-server-4", 11434),
    ("ollama-server-5", 11434),
    ("ollama-server-6", 11434),
    ("ollama-server-7", 11434),
    ("ollama-server-8", 11434),
];

/// Instance-index → specialization cycle, generalizing
/// `instance_specializations`'s fixed 4-instance map (chat_qa,
/// code_technical, reasoning_math, embeddings_search) across N instances.
fn specialization_for_index(index: usize) -> BackendSpecialization {
    match index % 4 {
        0 => BackendSpecialization::Chat,
        1 => BackendSpecialization::Coding,
        2 => BackendSpecialization::Reasoning,
        _ => BackendSpecialization::Embedding,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceRole {
    Primary,
    Secondary,
    Tertiary,
    Quaternary,
    Additional,
}

impl InstanceRole {
    fn for_index(index: usize) -> Self {
        match index {
            0 => InstanceRole::Primary,
            1 => InstanceRole::Secondary,
            2 => InstanceRole::Tertiary,
            3 => InstanceRole::Quaternary,
            _ => InstanceRole::Additional,
        }
    }
}

/// A single backend endpoint and its live health state.
///
/// State fields use atomics rather than a `Mutex` so `pick` never blocks on
/// a probe in flight, per the "must not block on probing" invariant.
pub struct BackendInstance {
    pub name: String,
    pub host: String,
    pub port: u16,
    pub specialization: BackendSpecialization,
    pub role: InstanceRole,
    pub client: Ollama,
    healthy: AtomicBool,
    last_probe_at_millis: AtomicI64,
    last_rtt_millis: AtomicU64,
    in_flight: AtomicUsize,
}

impl BackendInstance {
    fn new(name: String, host: String, port: u16, specialization: BackendSpecialization, role: InstanceRole) -> Self {
        let url = format!("http://{host}:{port}");
        let client = Ollama::try_new(&url).unwrap_or_else(|_| Ollama::new(host.clone(), port));
        Self {
            name,
            host,
            port,
            specialization,
            role,
            client,
            healthy: AtomicBool::new(true),
            last_probe_at_millis: AtomicI64::new(0),
            last_rtt_millis: AtomicU64::new(0),
            in_flight: AtomicUsize::new(0),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Relaxed)
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.load(Ordering::Relaxed)
    }

    pub fn last_rtt(&self) -> Duration {
        Duration::from_millis(self.last_rtt_millis.load(Ordering::Relaxed))
    }

    fn record_probe(&self, healthy: bool, rtt: Duration, now_millis: i64) {
        self.healthy.store(healthy, Ordering::Relaxed);
        self.last_rtt_millis.store(rtt.as_millis() as u64, Ordering::Relaxed);
        self.last_probe_at_millis.store(now_millis, Ordering::Relaxed);
    }

    /// Demote to unhealthy after a failed real request, without waiting for
    /// the next probe tick.
    pub fn mark_failed(&self) {
        self.healthy.store(false, Ordering::Relaxed);
    }
}

/// RAII in-flight counter, incremented for the duration of a real request
/// so `pick`'s `(in_flight_count, last_rtt)` ordering reflects live load.
pub struct InFlightGuard<'a> {
    counter: &'a AtomicUsize,
}

impl<'a> InFlightGuard<'a> {
    fn new(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::Relaxed);
        Self { counter }
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::Relaxed);
    }
}

pub struct BackendPool {
    instances: Vec<Arc<BackendInstance>>,
    probe_interval: Duration,
}

impl BackendPool {
    /// Build the pool from `Settings::ollama_instances` (comma-separated
    /// `host:port` pairs), falling back to the built-in 8-instance list.
    pub fn new(instance_specs: &[String], probe_interval: Duration) -> Self {
        let instances = if instance_specs.is_empty() {
            DEFAULT_INSTANCES
                .iter()
                .enumerate()
                .map(|(i, (host, port))| {
                    Arc::new(BackendInstance::new(
                        format!("{host}:{port}"),
                        host.to_string(),
                        *port,
                        specialization_for_index(i),
                        InstanceRole::for_index(i),
                    ))
                })
                .collect()
        } else {
            instance_specs
                .iter()
                .enumerate()
                .map(|(i, spec)| {
                    let (host, port) = parse_host_port(spec);
                    Arc::new(BackendInstance::new(
                        spec.clone(),
                        host,
                        port,
                        specialization_for_index(i),
                        InstanceRole::for_index(i),
                    ))
                })
                .collect()
        };

        Self { instances, probe_interval }
    }

    pub fn instances(&self) -> &[Arc<BackendInstance>] {
        &self.instances
    }

    /// Prefers a specialization match, breaks ties on
    /// `(in_flight_count, last_rtt)`, falls back to any healthy backend,
    /// else `BackendError::Unavailable`.
    pub fn pick(&self, category: BackendSpecialization) -> Result<Arc<BackendInstance>, BackendError> {
        let specialized = self
            .instances
            .iter()
            .filter(|b| b.is_healthy() && b.specialization == category)
            .min_by_key(|b| (b.in_flight_count(), b.last_rtt()));

        if let Some(backend) = specialized {
            return Ok(Arc::clone(backend));
        }

        self.instances
            .iter()
            .filter(|b| b.is_healthy())
            .min_by_key(|b| (b.in_flight_count(), b.last_rtt()))
            .map(Arc::clone)
            .ok_or(BackendError::Unavailable)
    }

    /// Spawn the background probe loop. Returns a handle the caller should
    /// keep alive (dropping it does not abort the task; callers hold it for
    /// symmetry with graceful-shutdown bookkeeping in `tsa-cli`).
    pub fn spawn_probe_loop(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let pool = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(pool.probe_interval);
            loop {
                ticker.tick().await;
                pool.probe_all().await;
            }
        })
    }

    async fn probe_all(&self) {
        let now = chrono::Utc::now().timestamp_millis();
        for backend in &self.instances {
            let start = std::time::Instant::now();
            let healthy = backend.client.list_local_models().await.is_ok();
            let rtt = start.elapsed();
            if !healthy {
                debug!(backend = %backend.name, "probe failed, marking unhealthy");
            }
            backend.record_probe(healthy, rtt, now);
        }
    }

    /// Acquire an in-flight guard for `backend`, to be held for the
    /// duration of a real request.
    pub fn in_flight_guard<'a>(backend: &'a BackendInstance) -> InFlightGuard<'a> {
        InFlightGuard::new(&backend.in_flight)
    }
}

fn parse_host_port(spec: &str) -> (String, u16) {
    let trimmed = spec.trim().trim_start_matches("http://").trim_start_matches("https://");
    match trimmed.rsplit_once(':') {
        Some((host, port_str)) => {
            let port = port_str.parse().unwrap_or_else(|_| {
                warn!(spec = %spec, "could not parse port, defaulting to 11434");
                11434
            });
            (host.to_string(), port)
        }
        None => (trimmed.to_string(), 11434),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_pool_has_eight_instances() {
        let pool = BackendPool::new(&[], Duration::from_secs(30));
        assert_eq!(pool.instances().len(), 8);
    }

    #[test]
    fn default_pool_cycles_specializations() {
        let pool = BackendPool::new(&[], Duration::from_secs(30));
        let specs: Vec<_> = pool.instances().iter().map(|b| b.specialization).collect();
        assert_eq!(specs[0], BackendSpecialization::Chat);
        assert_eq!(specs[1], BackendSpecialization::Coding);
        assert_eq!(specs[2], BackendSpecialization::Reasoning);
        assert_eq!(specs[3], BackendSpecialization::Embedding);
        assert_eq!(specs[4], BackendSpecialization::Chat);
    }

    #[test]
    fn parse_host_port_handles_scheme_and_bare_host() {
        assert_eq!(parse_host_port("http://host-a:11434"), ("host-a".to_string(), 11434));
        assert_eq!(parse_host_port("host-b:9000"), ("host-b".to_string(), 9000));
        assert_eq!(parse_host_port("host-c"), ("host-c".to_string(), 11434));
    }

    #[test]
    fn pick_falls_back_to_any_healthy_backend_when_no_specialist_is_up() {
        let pool = BackendPool::new(&[], Duration::from_secs(30));
        for backend in pool.instances() {
            if backend.specialization == BackendSpecialization::Coding {
                backend.mark_failed();
            }
        }
        let picked = pool.pick(BackendSpecialization::Coding).unwrap();
        assert!(picked.is_healthy());
    }

    #[test]
    fn pick_returns_unavailable_when_all_backends_are_down() {
        let pool = BackendPool::new(&[], Duration::from_secs(30));
        for backend in pool.instances() {
            backend.mark_failed();
        }
        assert!(matches!(pool.pick(BackendSpecialization::Chat), Err(BackendError::Unavailable)));
    }

    #[test]
    fn pick_prefers_lower_in_flight_count_among_specialists() {
        let pool = BackendPool::new(&[], Duration::from_secs(30));
        let chat_backends: Vec<_> =
            pool.instances().iter().filter(|b| b.specialization == BackendSpecialization::Chat).collect();
        assert!(chat_backends.len() >= 2);
        chat_backends[0].in_flight.fetch_add(5, Ordering::Relaxed);
        let picked = pool.pick(BackendSpecialization::Chat).unwrap();
        assert_eq!(picked.name, chat_backends[1].name);
    }
}
