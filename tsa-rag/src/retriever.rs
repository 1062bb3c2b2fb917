//! Hybrid Retriever: embed, search vector + keyword stores, fuse, rerank,
//! and augment with web results when the fused confidence is thin.
//!
//! Grounded on `original_source/scripts/analysis/enhanced_retrieval.py`'s
//! vector-then-rerank pipeline, generalized to also carry a parallel
//! keyword search and a web-augmentation step lifted from
//! `original_source/reranker/intelligent_router.py`'s fallback-to-web path.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use sha2::{Digest, Sha256};
use tracing::{info, warn};
use tsa_core::domain::{Candidate, CachedWebResult, FusedSource, PrivacyFilter, RetrievalOutcome};
use tsa_core::query::{BackendSpecialization, RetrievalStrategy, Strategy};
use tsa_model::BackendPool;
use tsa_model::generation;
use tsa_store::{DocumentStore, WebCache};

use crate::error::RagError;
use crate::reranker::Reranker;

const FUSION_ALPHA: f32 = 0.7;
const MAX_FUSED_ITEMS: usize = 10;

pub struct RetrieverConfig {
    pub embedding_model: String,
    pub embedding_timeout: Duration,
    pub web_search_endpoint: String,
}

pub struct HybridRetriever {
    documents: Arc<DocumentStore>,
    web_cache: Arc<WebCache>,
    pool: Arc<BackendPool>,
    reranker: Reranker,
    http: reqwest::Client,
    config: RetrieverConfig,
}

impl HybridRetriever {
    pub fn new(
        documents: Arc<DocumentStore>,
        web_cache: Arc<WebCache>,
        pool: Arc<BackendPool>,
        reranker: Reranker,
        config: RetrieverConfig,
    ) -> Self {
        Self { documents, web_cache, pool, reranker, http: reqwest::Client::new(), config }
    }

    /// Runs the six-step retrieval algorithm and returns the fused,
    /// deduplicated, capped context list.
    pub async fn retrieve(
        &self,
        query: &str,
        strategy: &Strategy,
        privacy: PrivacyFilter,
        enable_web: bool,
    ) -> Result<RetrievalOutcome, RagError> {
        let top_k = strategy.chunk_target;
        let pool_size = (top_k * 3).max(30) as i64;

        let embedding_backend = self.pool.pick(BackendSpecialization::Embedding)?;
        let embedding = generation::embed(
            &embedding_backend,
            &self.config.embedding_model,
            query,
            self.config.embedding_timeout,
        )
        .await?;

        let (vector_hits, keyword_hits) = tokio::try_join!(
            self.documents.vector_search(&embedding, pool_size, privacy),
            self.documents.keyword_search(query, pool_size, privacy),
        )?;

        let fused_candidates = fuse_candidate_scores(vector_hits, keyword_hits);
        if fused_candidates.is_empty() {
            return self.web_only_outcome(query, enable_web).await;
        }

        let rerank_pool_size = (fused_candidates.len() / 2).max(1);
        let mut rerank_pool: Vec<(Candidate, f32)> = fused_candidates;
        rerank_pool.truncate(rerank_pool_size.max(top_k));

        let passages: Vec<&str> = rerank_pool.iter().map(|(c, _)| c.content.as_str()).collect();
        let rerank_outcome = self.reranker.rerank(query, &passages).await;

        let (rerank_scores, rerank_skipped) = match rerank_outcome {
            Ok(scores) => (scores, false),
            Err(err) => {
                warn!(error = %err, "reranker unavailable, falling back to fused vector/keyword scores");
                (rerank_pool.iter().map(|(_, score)| *score).collect(), true)
            }
        };

        let mut scored: Vec<(Candidate, f32)> =
            rerank_pool.into_iter().zip(rerank_scores).map(|((c, _), score)| (c, score)).collect();
        scored.sort_by(|a, b| tie_broken_cmp(a, b));
        scored.truncate(top_k);

        let top_score = scored.first().map(|(_, score)| *score).unwrap_or(0.0);

        let mut sources: Vec<FusedSource> = scored
            .iter()
            .enumerate()
            .map(|(i, (candidate, score))| FusedSource {
                label: format!("DOC {}", i + 1),
                content: candidate.content.clone(),
                origin: candidate.doc_name.clone(),
                score: *score,
                is_web: false,
            })
            .collect();
        let chunk_count = sources.len();

        let wants_web = enable_web
            && (strategy.retrieval == RetrievalStrategy::WebFirst || top_score < strategy.threshold);

        let mut web_count = 0;
        if wants_web {
            match self.fetch_web_results(query).await {
                Ok(results) => {
                    web_count = results.len();
                    for (i, result) in results.into_iter().enumerate() {
                        sources.push(FusedSource {
                            label: format!("WEB {}", i + 1),
                            content: result.content,
                            origin: result.url,
                            score: result.score,
                            is_web: true,
                        });
                    }
                }
                Err(err) => {
                    warn!(error = %err, "web augmentation failed, continuing with rag-only context");
                }
            }
        }

        let sources = dedupe_and_cap(sources);
        let top_score = sources.iter().map(|s| s.score).fold(top_score, f32::max);

        Ok(RetrievalOutcome { sources, chunk_count, web_count, rerank_skipped, top_score })
    }

    async fn web_only_outcome(&self, query: &str, enable_web: bool) -> Result<RetrievalOutcome, RagError> {
        if !enable_web {
            return Ok(RetrievalOutcome { sources: Vec::new(), chunk_count: 0, web_count: 0, rerank_skipped: false, top_score: 0.0 });
        }
        let results = self.fetch_web_results(query).await.unwrap_or_else(|err| {
            warn!(error = %err, "web augmentation failed with no rag candidates to fall back on");
            Vec::new()
        });
        let web_count = results.len();
        let top_score = results.iter().map(|r| r.score).fold(0.0_f32, f32::max);
        let sources = dedupe_and_cap(
            results
                .into_iter()
                .enumerate()
                .map(|(i, r)| FusedSource {
                    label: format!("WEB {}", i + 1),
                    content: r.content,
                    origin: r.url,
                    score: r.score,
                    is_web: true,
                })
                .collect(),
        );
        Ok(RetrievalOutcome { sources, chunk_count: 0, web_count, rerank_skipped: false, top_score })
    }

    /// Web Search Cache lookup, falling back to an outbound GET against the
    /// configured instant-answer endpoint on a miss. Cache writes and reads
    /// are fail-open; only the outbound HTTP call can fail this method.
    async fn fetch_web_results(&self, query: &str) -> Result<Vec<CachedWebResult>, RagError> {
        if let Some(cached) = self.web_cache.get(query).await {
            return Ok(cached);
        }

        let response = self
            .http
            .get(&self.config.web_search_endpoint)
            .query(&[("q", query), ("format", "json")])
            .timeout(Duration::from_secs(5))
            .send()
            .await?;

        let results = parse_web_response(response).await;
        if !results.is_empty() {
            self.web_cache.store(query, &results).await;
        }
        info!(query, count = results.len(), "fetched fresh web results");
        Ok(results)
    }
}

async fn parse_web_response(response: reqwest::Response) -> Vec<CachedWebResult> {
    #[derive(serde::Deserialize)]
    struct InstantAnswer {
        #[serde(rename = "AbstractText", default)]
        abstract_text: String,
        #[serde(rename = "AbstractURL", default)]
        abstract_url: String,
        #[serde(rename = "Heading", default)]
        heading: String,
    }

    let Ok(body) = response.json::<InstantAnswer>().await else {
        return Vec::new();
    };
    if body.abstract_text.trim().is_empty() {
        return Vec::new();
    }
    vec![CachedWebResult {
        title: body.heading,
        url: body.abstract_url,
        content: body.abstract_text,
        score: 0.5,
    }]
}

/// Min-max normalizes vector distance (lower is better, so inverted) and
/// keyword score (higher is better) independently, then combines with
/// `FUSION_ALPHA`.
fn fuse_candidate_scores(vector_hits: Vec<Candidate>, keyword_hits: Vec<Candidate>) -> Vec<(Candidate, f32)> {
    let mut by_chunk: std::collections::HashMap<String, (Candidate, f32, f32)> = std::collections::HashMap::new();

    let max_distance = vector_hits.iter().map(|c| c.vector_distance).fold(f32::MIN, f32::max);
    let min_distance = vector_hits.iter().map(|c| c.vector_distance).fold(f32::MAX, f32::min);
    for hit in vector_hits {
        let normalized = normalize_inverted(hit.vector_distance, min_distance, max_distance);
        let key = hit.chunk_id.to_string();
        by_chunk.insert(key, (hit, normalized, 0.0));
    }

    let max_kw = keyword_hits.iter().map(|c| c.keyword_score).fold(f32::MIN, f32::max);
    let min_kw = keyword_hits.iter().map(|c| c.keyword_score).fold(f32::MAX, f32::min);
    for hit in keyword_hits {
        let normalized = normalize(hit.keyword_score, min_kw, max_kw);
        let key = hit.chunk_id.to_string();
        by_chunk
            .entry(key)
            .and_modify(|(_, _, kw)| *kw = normalized)
            .or_insert((hit, 0.0, normalized));
    }

    let mut combined: Vec<(Candidate, f32)> = by_chunk
        .into_values()
        .map(|(candidate, vector_score, keyword_score)| {
            let score = FUSION_ALPHA * vector_score + (1.0 - FUSION_ALPHA) * keyword_score;
            (candidate, score)
        })
        .collect();

    combined.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    combined
}

fn normalize(value: f32, min: f32, max: f32) -> f32 {
    if (max - min).abs() < f32::EPSILON { 1.0 } else { (value - min) / (max - min) }
}

fn normalize_inverted(value: f32, min: f32, max: f32) -> f32 {
    1.0 - normalize(value, min, max)
}

/// Within equal combined scores, prefer the chunk that appears earlier in
/// its document, then the shorter of the two.
fn tie_broken_cmp(a: &(Candidate, f32), b: &(Candidate, f32)) -> std::cmp::Ordering {
    b.1.partial_cmp(&a.1)
        .unwrap_or(std::cmp::Ordering::Equal)
        .then_with(|| a.0.ordinal.cmp(&b.0.ordinal))
        .then_with(|| a.0.content.len().cmp(&b.0.content.len()))
}

/// Deduplicates by a hash of each source's content prefix and caps the
/// result at `MAX_FUSED_ITEMS`, preserving interleave order.
fn dedupe_and_cap(sources: Vec<FusedSource>) -> Vec<FusedSource> {
    let mut seen = HashSet::new();
    let mut deduped = Vec::with_capacity(sources.len());
    for source in sources {
        let prefix: String = source.content.chars().take(200).collect();
        let mut hasher = Sha256::new();
        hasher.update(prefix.as_bytes());
        let hash = format!("{:x}", hasher.finalize());
        if seen.insert(hash) {
            deduped.push(source);
        }
        if deduped.len() >= MAX_FUSED_ITEMS {
            break;
        }
    }
    deduped
}

#[cfg(test)]
mod tests {
    use super::*;
    use tsa_core::domain::ChunkKind;

    fn candidate(chunk_id: &str, vector_distance: f32, keyword_score: f32, ordinal: i32) -> Candidate {
        Candidate {
            chunk_id: chunk_id.to_string().into(),
            content: "x".repeat(10),
            doc_name: "doc.pdf".to_string(),
            page: None,
            section_title: None,
            kind: ChunkKind::Text,
            ordinal,
            vector_distance,
            keyword_score,
        }
    }

    #[test]
    fn fusion_ranks_low_distance_and_high_keyword_score_first() {
        let vector_hits = vec![candidate("a", 0.1, 0.0, 0), candidate("b", 0.9, 0.0, 1)];
        let keyword_hits = vec![candidate("a", 0.0, 0.1, 0), candidate("b", 0.0, 0.9, 1)];
        let fused = fuse_candidate_scores(vector_hits, keyword_hits);
        assert_eq!(fused[0].0.chunk_id.to_string(), "a");
    }

    #[test]
    fn empty_inputs_produce_empty_fusion() {
        assert!(fuse_candidate_scores(Vec::new(), Vec::new()).is_empty());
    }

    #[test]
    fn dedupe_collapses_identical_content_prefixes() {
        let sources = vec![
            FusedSource { label: "DOC 1".into(), content: "same content here".into(), origin: "a".into(), score: 0.9, is_web: false },
            FusedSource { label: "DOC 2".into(), content: "same content here".into(), origin: "b".into(), score: 0.5, is_web: false },
        ];
        assert_eq!(dedupe_and_cap(sources).len(), 1);
    }

    #[test]
    fn dedupe_caps_at_max_items() {
        let sources: Vec<_> = (0..20)
            .map(|i| FusedSource {
                label: format!("DOC {i}"),
                content: format!("unique content block number {i}"),
                origin: "doc.pdf".into(),
                score: 0.5,
                is_web: false,
            })
            .collect();
        assert_eq!(dedupe_and_cap(sources).len(), MAX_FUSED_ITEMS);
    }

    #[test]
    fn tie_break_prefers_earlier_ordinal_then_shorter_content() {
        let a = (candidate("a", 0.0, 0.0, 0), 0.5);
        let b = (candidate("b", 0.0, 0.0, 1), 0.5);
        assert_eq!(tie_broken_cmp(&a, &b), std::cmp::Ordering::Less);
    }
}
