//! Cross-encoder reranking via the backend pool, with a TF-IDF-ish
//! fallback when the backend call fails.
//!
//! The teacher's `ollama-rs` stack has no dedicated cross-encoder endpoint,
//! so reranking is done the way `original_source/reranker/` documents it
//! for a locally-hosted LLM: ask the model to score passage relevance on a
//! fixed scale, one passage at a time, and parse the leading number out of
//! its reply.

use std::sync::Arc;

use tracing::warn;
use tsa_model::BackendPool;
use tsa_model::generation;
use tsa_core::query::BackendSpecialization;

use crate::error::RagError;

const RERANK_PROMPT: &str = "Rate how relevant the passage is to the query on a scale from \
0.0 (irrelevant) to 1.0 (directly answers it). Respond with only the number.";
const MAX_PASSAGE_CHARS: usize = 2000;

pub struct Reranker {
    pool: Arc<BackendPool>,
    model: String,
}

impl Reranker {
    pub fn new(pool: Arc<BackendPool>, model: String) -> Self {
        Self { pool, model }
    }

    /// Scores each passage against `query`, aligned to input order. On any
    /// backend failure the whole batch falls back to the caller's fused
    /// vector/keyword scores — callers detect this via `Err` and log
    /// `rerank_skipped`.
    pub async fn rerank(&self, query: &str, passages: &[&str]) -> Result<Vec<f32>, RagError> {
        let backend = self.pool.pick(BackendSpecialization::Reasoning)?;

        let mut scores = Vec::with_capacity(passages.len());
        for passage in passages {
            let truncated: String = passage.chars().take(MAX_PASSAGE_CHARS).collect();
            let user = format!("Query: {query}\n\nPassage: {truncated}");
            let response = generation::complete(&backend, &self.model, Some(RERANK_PROMPT), &user).await?;
            scores.push(parse_score(&response));
        }
        Ok(scores)
    }
}

/// Pulls the first floating-point number out of the model's reply and
/// clamps it to `[0, 1]`; a reply with no parseable number scores 0.0.
fn parse_score(response: &str) -> f32 {
    let mut digits = String::new();
    for ch in response.chars() {
        if ch.is_ascii_digit() || ch == '.' || (ch == '-' && digits.is_empty()) {
            digits.push(ch);
        } else if !digits.is_empty() {
            break;
        }
    }
    digits.parse::<f32>().map(|s| s.clamp(0.0, 1.0)).unwrap_or_else(|_| {
        warn!(response, "reranker reply had no parseable score");
        0.0
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_score_reads_leading_number() {
        assert_eq!(parse_score("0.85"), 0.85);
        assert_eq!(parse_score("Score: 0.42 out of 1"), 0.42);
    }

    #[test]
    fn parse_score_clamps_out_of_range_values() {
        assert_eq!(parse_score("1.5"), 1.0);
        assert_eq!(parse_score("-0.3"), 0.0);
    }

    #[test]
    fn parse_score_defaults_to_zero_on_unparseable_reply() {
        assert_eq!(parse_score("I cannot determine this."), 0.0);
    }
}
