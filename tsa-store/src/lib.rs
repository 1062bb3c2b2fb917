//! Postgres-backed persistence for the Technical Service Assistant
//! gateway: documents/chunks with vector + keyword search, the web search
//! cache, RBAC tables, search analytics, corrections, and glossary terms.

pub mod corrections;
pub mod documents;
pub mod error;
pub mod events;
pub mod glossary;
pub mod pool;
pub mod rbac;
pub mod verification;
pub mod web_cache;

pub use corrections::CorrectionStore;
pub use documents::DocumentStore;
pub use error::StoreError;
pub use events::EventStore;
pub use glossary::GlossaryStore;
pub use rbac::RbacStore;
pub use verification::{TokenPurpose, VerificationRecord, VerificationToken, VerificationTokenStore};
pub use web_cache::WebCache;
