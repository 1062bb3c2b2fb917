//! Shared application state, built once in `tsa-cli` and cloned (cheaply,
//! via `Arc`) into every request.

use std::sync::Arc;

use tsa_auth::{AuthService, RateLimiter};
use tsa_core::config::Settings;
use tsa_model::BackendPool;
use tsa_rag::{Composer, HybridRetriever};
use tsa_store::{CorrectionStore, DocumentStore, EventStore, GlossaryStore, RbacStore};

use crate::analytics::Recorder;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub pool: Arc<BackendPool>,
    pub documents: Arc<DocumentStore>,
    pub glossary: Arc<GlossaryStore>,
    pub corrections: Arc<CorrectionStore>,
    pub rbac: Arc<RbacStore>,
    pub retriever: Arc<HybridRetriever>,
    pub composer: Arc<Composer>,
    pub auth: Arc<AuthService>,
    pub rate_limiter: Arc<RateLimiter>,
    pub recorder: Arc<Recorder>,
    pub events: Arc<EventStore>,
}
