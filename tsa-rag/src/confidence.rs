//! Confidence scorer: a five-term weighted combination of evidence
//! density, query-term overlap, output coherence, source diversity, and a
//! complexity multiplier.
//!
//! Term weights and the uncertainty-sentinel regex list are ported from
//! `original_source/reranker/intelligent_router.py`'s confidence
//! calculation.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use tsa_core::domain::FusedSource;
use tsa_core::query::Complexity;

const EVIDENCE_WEIGHT: f32 = 0.3;
const OVERLAP_WEIGHT: f32 = 0.25;
const DIVERSITY_WEIGHT: f32 = 0.15;
const COHERENCE_BONUS_MAX: f32 = 0.1;
const COHERENCE_PENALTY_MAX: f32 = 0.3;

const STOPWORDS: &[&str] = &[
    "a", "an", "the", "is", "are", "was", "were", "be", "been", "to", "of", "in", "on", "for",
    "and", "or", "do", "does", "did", "what", "how", "why", "when", "where", "who", "with", "i",
    "you", "it", "this", "that",
];

static UNCERTAINTY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)i don'?t know|cannot (?:answer|determine|find)|no information|not (?:sure|certain)|unable to (?:find|determine)")
        .unwrap()
});

/// `score(query, retrieved_chunks, generated_text, classification) -> [0,1]`.
/// A correction response bypasses this entirely and should use 1.0
/// directly rather than calling here.
pub fn score(query: &str, sources: &[FusedSource], generated_text: &str, complexity: Complexity) -> f32 {
    let evidence = evidence_density(sources, complexity);
    let overlap = query_term_overlap(query, sources);
    let coherence = output_coherence(generated_text);
    let diversity = source_diversity(sources);

    let combined = evidence * EVIDENCE_WEIGHT
        + overlap * OVERLAP_WEIGHT
        + diversity * DIVERSITY_WEIGHT
        + coherence;

    (combined * complexity.score_multiplier()).clamp(0.0, 1.0)
}

fn evidence_density(sources: &[FusedSource], complexity: Complexity) -> f32 {
    let target = complexity.chunk_target() as f32;
    (sources.len() as f32 / target).min(1.0)
}

fn query_term_overlap(query: &str, sources: &[FusedSource]) -> f32 {
    let query_terms: HashSet<String> =
        query.to_lowercase().split_whitespace().map(str::to_string).filter(|t| !STOPWORDS.contains(&t.as_str())).collect();
    if query_terms.is_empty() {
        return 0.0;
    }

    let context: String = sources.iter().map(|s| s.content.to_lowercase()).collect::<Vec<_>>().join(" ");
    let matched = query_terms.iter().filter(|term| context.contains(term.as_str())).count();
    matched as f32 / query_terms.len() as f32
}

/// Bonus up to `COHERENCE_BONUS_MAX` for longer, structured responses;
/// penalty up to `COHERENCE_PENALTY_MAX` when the response itself signals
/// uncertainty.
fn output_coherence(generated_text: &str) -> f32 {
    if UNCERTAINTY_PATTERN.is_match(generated_text) {
        return -COHERENCE_PENALTY_MAX;
    }

    let word_count = generated_text.split_whitespace().count();
    let has_structure =
        generated_text.contains('\n') || generated_text.contains("1.") || generated_text.contains("- ");

    let length_bonus = (word_count as f32 / 200.0).min(1.0) * COHERENCE_BONUS_MAX * 0.6;
    let structure_bonus = if has_structure { COHERENCE_BONUS_MAX * 0.4 } else { 0.0 };
    length_bonus + structure_bonus
}

fn source_diversity(sources: &[FusedSource]) -> f32 {
    if sources.is_empty() {
        return 0.0;
    }
    let distinct: HashSet<&str> = sources.iter().map(|s| s.origin.as_str()).collect();
    distinct.len() as f32 / sources.len() as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(origin: &str, content: &str) -> FusedSource {
        FusedSource { label: "DOC 1".into(), content: content.into(), origin: origin.into(), score: 0.8, is_web: false }
    }

    #[test]
    fn score_is_clamped_to_unit_interval() {
        let sources: Vec<_> = (0..10).map(|i| source("doc.pdf", &format!("evidence chunk {i}"))).collect();
        let s = score("how do I reset my vpn", &sources, &"a".repeat(1000), Complexity::Simple);
        assert!((0.0..=1.0).contains(&s));
    }

    #[test]
    fn uncertainty_sentinel_drags_score_down() {
        let sources = vec![source("doc.pdf", "reset the vpn client")];
        let confident = score("reset vpn", &sources, "Run these steps: 1. open settings 2. reset", Complexity::Simple);
        let uncertain = score("reset vpn", &sources, "I don't know how to help with that.", Complexity::Simple);
        assert!(uncertain < confident);
    }

    #[test]
    fn more_diverse_sources_score_higher_on_diversity_term() {
        let diverse = vec![source("a.pdf", "vpn reset"), source("b.pdf", "vpn reset")];
        let same = vec![source("a.pdf", "vpn reset"), source("a.pdf", "vpn reset")];
        assert!(source_diversity(&diverse) > source_diversity(&same));
    }

    #[test]
    fn empty_sources_have_zero_evidence_and_diversity() {
        assert_eq!(evidence_density(&[], Complexity::Simple), 0.0);
        assert_eq!(source_diversity(&[]), 0.0);
    }

    #[test]
    fn complexity_multiplier_lowers_score_for_harder_questions() {
        let sources: Vec<_> = (0..3).map(|i| source("doc.pdf", &format!("chunk {i} vpn reset"))).collect();
        let simple = score("vpn reset", &sources, "Here is how.", Complexity::Simple);
        let expert = score("vpn reset", &sources, "Here is how.", Complexity::Expert);
        assert!(expert <= simple);
    }
}
