//! Core domain entities shared across the gateway's components.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{ChunkId, DocumentId, RoleId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrivacyLevel {
    Public,
    Private,
}

/// Privacy filter passed to the store adapter's `search` operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrivacyFilter {
    Public,
    Private,
    All,
}

impl PrivacyFilter {
    /// Non-admin callers always see `public` only.
    pub fn for_role(is_admin: bool) -> Self {
        if is_admin { PrivacyFilter::All } else { PrivacyFilter::Public }
    }

    pub fn allows(&self, level: PrivacyLevel) -> bool {
        match self {
            PrivacyFilter::All => true,
            PrivacyFilter::Public => level == PrivacyLevel::Public,
            PrivacyFilter::Private => level == PrivacyLevel::Private,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub doc_id: DocumentId,
    pub file_name: String,
    pub content_hash: String,
    pub privacy_level: PrivacyLevel,
    pub classification: Option<String>,
    pub product: Option<String>,
    pub version: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkKind {
    Text,
    Table,
    ImageRef,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub chunk_id: ChunkId,
    pub doc_id: DocumentId,
    pub doc_name: String,
    pub ordinal: i32,
    pub page: Option<i32>,
    pub section_title: Option<String>,
    pub kind: ChunkKind,
    pub content: String,
    pub content_hash: String,
    pub token_count: i32,
    pub privacy_level: PrivacyLevel,
}

impl Chunk {
    /// Invariant: `chunk.privacy_level == document.privacy_level`.
    pub fn matches_document_privacy(&self, document: &Document) -> bool {
        self.privacy_level == document.privacy_level
    }
}

/// A candidate row surfaced by the vector/keyword store adapter, before
/// fusion/rerank scoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub chunk_id: ChunkId,
    pub content: String,
    pub doc_name: String,
    pub page: Option<i32>,
    pub section_title: Option<String>,
    pub kind: ChunkKind,
    pub ordinal: i32,
    pub vector_distance: f32,
    pub keyword_score: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMethod {
    Rag,
    Hybrid,
    Fusion,
    Web,
    Correction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchEvent {
    pub ts: DateTime<Utc>,
    pub query: String,
    pub method: SearchMethod,
    pub classification: String,
    pub strategy: String,
    pub rag_confidence: Option<f32>,
    pub final_confidence: f32,
    pub latency_ms: i64,
    pub chunk_count: i32,
    pub web_count: i32,
    pub fused_count: i32,
    pub model: String,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedWebResult {
    pub title: String,
    pub url: String,
    pub content: String,
    pub score: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebCacheEntry {
    pub query_hash: String,
    pub normalized_query: String,
    pub results: Vec<CachedWebResult>,
    pub expires_at: DateTime<Utc>,
    pub hit_count: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    Active,
    Inactive,
    Suspended,
    PendingVerification,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub user_id: UserId,
    pub email: String,
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role_id: RoleId,
    pub status: UserStatus,
    pub verified: bool,
    pub login_attempts: i32,
    pub locked_until: Option<DateTime<Utc>>,
    pub password_change_required: bool,
    pub last_login: Option<DateTime<Utc>>,
}

impl User {
    /// "A user is operationally active iff
    /// `status==active ∧ verified ∧ (locked_until is null ∨ locked_until < now)`."
    pub fn is_operationally_active(&self, now: DateTime<Utc>) -> bool {
        self.status == UserStatus::Active
            && self.verified
            && self.locked_until.is_none_or(|until| until < now)
    }

    pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
        self.locked_until.is_some_and(|until| until >= now)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    pub role_id: RoleId,
    pub name: String,
    pub description: Option<String>,
    pub is_system_role: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Permission {
    pub name: String,
    pub resource: String,
    pub action: String,
}

impl Permission {
    pub fn new(resource: impl Into<String>, action: impl Into<String>) -> Self {
        let resource = resource.into();
        let action = action.into();
        Self { name: format!("{resource}.{action}"), resource, action }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Acronym {
    pub acronym: String,
    pub definition: String,
    pub sources: Vec<String>,
    pub confidence: f32,
    pub verified: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SynonymKind {
    Abbreviation,
    Alternate,
    Related,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Synonym {
    pub term: String,
    pub synonym: String,
    pub kind: SynonymKind,
    pub confidence: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Correction {
    pub question_fingerprint: String,
    pub corrected_answer: String,
}

/// One entry in the fused `[DOC n]` / `[WEB n]` context list handed to the
/// prompt composer and surfaced to the client as a "sources" frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FusedSource {
    pub label: String,
    pub content: String,
    pub origin: String,
    pub score: f32,
    pub is_web: bool,
}

/// Output of the hybrid retriever: the fused sources plus bookkeeping the
/// confidence scorer and analytics recorder both need.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalOutcome {
    pub sources: Vec<FusedSource>,
    pub chunk_count: usize,
    pub web_count: usize,
    pub rerank_skipped: bool,
    pub top_score: f32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    fn user(status: UserStatus, verified: bool, locked_until: Option<DateTime<Utc>>) -> User {
        User {
            user_id: UserId(1),
            email: "a@example.com".into(),
            password_hash: String::new(),
            first_name: None,
            last_name: None,
            role_id: RoleId(1),
            status,
            verified,
            login_attempts: 0,
            locked_until,
            password_change_required: false,
            last_login: None,
        }
    }

    #[test]
    fn active_verified_unlocked_user_is_operationally_active() {
        let u = user(UserStatus::Active, true, None);
        assert!(u.is_operationally_active(Utc::now()));
    }

    #[test]
    fn locked_user_is_not_operationally_active() {
        let now = Utc::now();
        let u = user(UserStatus::Active, true, Some(now + ChronoDuration::minutes(5)));
        assert!(!u.is_operationally_active(now));
        assert!(u.is_locked(now));
    }

    #[test]
    fn lock_expiry_in_the_past_restores_active() {
        let now = Utc::now();
        let u = user(UserStatus::Active, true, Some(now - ChronoDuration::minutes(1)));
        assert!(u.is_operationally_active(now));
        assert!(!u.is_locked(now));
    }

    #[test]
    fn unverified_user_is_not_operationally_active() {
        let u = user(UserStatus::Active, false, None);
        assert!(!u.is_operationally_active(Utc::now()));
    }

    #[test]
    fn privacy_filter_for_non_admin_is_public_only() {
        let filter = PrivacyFilter::for_role(false);
        assert!(filter.allows(PrivacyLevel::Public));
        assert!(!filter.allows(PrivacyLevel::Private));
    }

    #[test]
    fn privacy_filter_for_admin_allows_all() {
        let filter = PrivacyFilter::for_role(true);
        assert!(filter.allows(PrivacyLevel::Public));
        assert!(filter.allows(PrivacyLevel::Private));
    }
}
