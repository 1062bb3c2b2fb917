//! Query classification vocabulary shared between `tsa-model` (backend
//! selection) and `tsa-rag` (retrieval strategy selection).

use serde::{Deserialize, Serialize};

/// Closed category set the classifier chooses from. Ties in the scoring
/// pass break in this declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryCategory {
    Technical,
    Code,
    Math,
    Creative,
    Factual,
    Chat,
    CurrentEvents,
    Comparison,
}

impl QueryCategory {
    pub const ALL: [QueryCategory; 8] = [
        QueryCategory::Technical,
        QueryCategory::Code,
        QueryCategory::Math,
        QueryCategory::Creative,
        QueryCategory::Factual,
        QueryCategory::Chat,
        QueryCategory::CurrentEvents,
        QueryCategory::Comparison,
    ];

    /// Which backend model a category prefers, absent explicit override.
    pub fn preferred_backend(&self) -> BackendSpecialization {
        match self {
            QueryCategory::Code => BackendSpecialization::Coding,
            QueryCategory::Math | QueryCategory::Comparison => BackendSpecialization::Reasoning,
            QueryCategory::Technical
            | QueryCategory::Creative
            | QueryCategory::Factual
            | QueryCategory::Chat
            | QueryCategory::CurrentEvents => BackendSpecialization::Chat,
        }
    }

    /// Base retrieval strategy for the category, before the retriever's
    /// own threshold escalation logic runs.
    pub fn base_strategy(&self) -> RetrievalStrategy {
        match self {
            QueryCategory::Technical | QueryCategory::Code | QueryCategory::Math => {
                RetrievalStrategy::RagFirst
            }
            QueryCategory::CurrentEvents => RetrievalStrategy::WebFirst,
            QueryCategory::Creative | QueryCategory::Factual | QueryCategory::Chat | QueryCategory::Comparison => {
                RetrievalStrategy::Balanced
            }
        }
    }

    /// Base confidence threshold before complexity adjustment: lower for
    /// technical/code/math (more willing to trust thin retrieval), higher
    /// for chit-chat (answers there carry little retrieved evidence).
    pub fn base_threshold(&self) -> f32 {
        match self {
            QueryCategory::Technical | QueryCategory::Code | QueryCategory::Math => 0.45,
            QueryCategory::Chat => 0.7,
            _ => 0.55,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalStrategy {
    RagFirst,
    WebFirst,
    Balanced,
}

/// Complexity estimate piggybacked on classification; feeds the
/// confidence scorer's complexity-adjustment term and the retriever's
/// chunk target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    Simple,
    Moderate,
    Complex,
    Expert,
}

impl Complexity {
    /// Multiplier applied to the confidence scorer's combined term.
    pub fn score_multiplier(&self) -> f32 {
        match self {
            Complexity::Simple => 1.0,
            Complexity::Moderate => 0.95,
            Complexity::Complex => 0.9,
            Complexity::Expert => 0.85,
        }
    }

    /// Chunk target (3-10) the confidence scorer's evidence-density term
    /// divides by.
    pub fn chunk_target(&self) -> usize {
        match self {
            Complexity::Simple => 3,
            Complexity::Moderate => 5,
            Complexity::Complex => 8,
            Complexity::Expert => 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendSpecialization {
    Chat,
    Coding,
    Reasoning,
    Embedding,
}

/// Output of the query classifier: a category, an estimated complexity,
/// and the retrieval strategy that should be applied downstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Strategy {
    pub category: QueryCategory,
    pub complexity: Complexity,
    pub retrieval: RetrievalStrategy,
    pub threshold: f32,
    pub chunk_target: usize,
    pub prefer_web: bool,
    pub confidence: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_prefers_coding_backend() {
        assert_eq!(QueryCategory::Code.preferred_backend(), BackendSpecialization::Coding);
    }

    #[test]
    fn technical_prefers_rag_first_with_a_lower_threshold() {
        assert_eq!(QueryCategory::Technical.base_strategy(), RetrievalStrategy::RagFirst);
        assert!(QueryCategory::Technical.base_threshold() < QueryCategory::Chat.base_threshold());
    }

    #[test]
    fn current_events_prefers_web_first() {
        assert_eq!(QueryCategory::CurrentEvents.base_strategy(), RetrievalStrategy::WebFirst);
    }

    #[test]
    fn complexity_multipliers_decrease_monotonically() {
        assert!(Complexity::Simple.score_multiplier() > Complexity::Moderate.score_multiplier());
        assert!(Complexity::Moderate.score_multiplier() > Complexity::Complex.score_multiplier());
        assert!(Complexity::Complex.score_multiplier() > Complexity::Expert.score_multiplier());
    }

    #[test]
    fn complexity_orders_simple_to_expert() {
        assert!(Complexity::Simple < Complexity::Moderate);
        assert!(Complexity::Moderate < Complexity::Complex);
        assert!(Complexity::Complex < Complexity::Expert);
    }

    #[test]
    fn chunk_targets_fall_within_the_three_to_ten_range() {
        for category in QueryCategory::ALL {
            let _ = category.base_strategy();
        }
        assert_eq!(Complexity::Simple.chunk_target(), 3);
        assert_eq!(Complexity::Expert.chunk_target(), 10);
    }
}
