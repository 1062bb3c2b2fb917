//! Heuristic query classifier: a scored keyword/regex match over the
//! lowercased question text, picking one of eight fixed categories and an
//! accompanying complexity estimate.

use std::sync::LazyLock;

use regex::Regex;
use tsa_core::query::{Complexity, QueryCategory, Strategy};

const TECHNICAL_TERMS: &[&str] = &[
    "install", "config", "setup", "error", "troubleshoot", "active directory", "database",
    "server", "network", "security", "documentation", "manual", "guide", "prerequisite",
    "firmware", "driver", "certificate",
];

const CODE_TERMS: &[&str] = &[
    "code", "script", "function", "class", "variable", "syntax", "programming", "python",
    "javascript", "sql", "api", "debug", "algorithm", "implementation", "compile", "stack trace",
];

const MATH_TERMS: &[&str] =
    &["calculate", "formula", "equation", "math", "percentage", "sum", "average", "statistics"];

const CREATIVE_TERMS: &[&str] =
    &["story", "creative", "poem", "brainstorm", "imagine", "fiction", "character", "plot"];

const CHAT_TERMS: &[&str] = &["hello", "hi", "hey", "thanks", "thank you", "how are you"];

const CURRENT_EVENTS_TERMS: &[&str] =
    &["latest", "recent", "today", "this week", "breaking", "news", "currently", "right now"];

const COMPARISON_TERMS: &[&str] = &["versus", " vs ", "compare", "difference between", "better than"];

static CODE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bdef |\bclass |\bimport |function\(|console\.log|\bSELECT\b|\bUPDATE\b").unwrap()
});

static MATH_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+\s*[+\-*/]\s*\d+|what is \d+").unwrap());

fn score(text_lower: &str, terms: &[&str]) -> u32 {
    terms.iter().filter(|term| text_lower.contains(*term)).count() as u32
}

fn classify_category(text: &str) -> (QueryCategory, u32, u32) {
    let lower = text.to_lowercase();

    let scores = [
        (QueryCategory::Technical, score(&lower, TECHNICAL_TERMS)),
        (
            QueryCategory::Code,
            score(&lower, CODE_TERMS) + if CODE_PATTERN.is_match(text) { 2 } else { 0 },
        ),
        (
            QueryCategory::Math,
            score(&lower, MATH_TERMS) + if MATH_PATTERN.is_match(&lower) { 2 } else { 0 },
        ),
        (QueryCategory::Creative, score(&lower, CREATIVE_TERMS)),
        (QueryCategory::Factual, 0),
        (
            QueryCategory::Chat,
            score(&lower, CHAT_TERMS) + if text.split_whitespace().count() < 4 { 1 } else { 0 },
        ),
        (QueryCategory::CurrentEvents, score(&lower, CURRENT_EVENTS_TERMS)),
        (QueryCategory::Comparison, score(&lower, COMPARISON_TERMS)),
    ];

    // `QueryCategory::ALL`'s declaration order is the tie-break order;
    // `scores` is built in that same order so a stable max-by keeps it.
    let total: u32 = scores.iter().map(|(_, s)| *s).sum();
    let (winner, winner_score) = scores
        .iter()
        .copied()
        .fold((QueryCategory::Factual, 0u32), |best, candidate| {
            if candidate.1 > best.1 { candidate } else { best }
        });

    // Factual is the default when nothing else scores.
    let winner = if winner_score == 0 { QueryCategory::Factual } else { winner };
    (winner, winner_score, total.max(1))
}

/// Word-count/structure heuristic for complexity: short or single-clause
/// questions are simple, long multi-clause or jargon-dense ones are
/// complex/expert.
fn estimate_complexity(text: &str) -> Complexity {
    let word_count = text.split_whitespace().count();
    let clause_count = text.matches(|c| c == ',' || c == ';').count()
        + text.matches(" and ").count()
        + text.matches(" or ").count();

    match (word_count, clause_count) {
        (w, _) if w <= 6 => Complexity::Simple,
        (w, c) if w <= 20 && c == 0 => Complexity::Moderate,
        (w, c) if w <= 40 || c <= 2 => Complexity::Complex,
        _ => Complexity::Expert,
    }
}

/// Classifies `text` into a category, complexity estimate, and retrieval
/// strategy. Pure function: no I/O, deterministic.
pub fn classify(text: &str) -> Strategy {
    let (category, winner_score, total_score) = classify_category(text);
    let confidence = (winner_score as f32 / total_score as f32).clamp(0.0, 1.0);
    let complexity = estimate_complexity(text);

    Strategy {
        category,
        complexity,
        retrieval: category.base_strategy(),
        threshold: category.base_threshold(),
        chunk_target: complexity.chunk_target(),
        prefer_web: category == QueryCategory::CurrentEvents,
        confidence,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tsa_core::query::RetrievalStrategy;

    #[test]
    fn greeting_is_chat() {
        let strategy = classify("hey there");
        assert_eq!(strategy.category, QueryCategory::Chat);
    }

    #[test]
    fn install_question_is_technical_and_rag_first() {
        let strategy = classify("How do I install the RNI server on Active Directory?");
        assert_eq!(strategy.category, QueryCategory::Technical);
        assert_eq!(strategy.retrieval, RetrievalStrategy::RagFirst);
    }

    #[test]
    fn python_snippet_is_code() {
        let strategy = classify("def handler(request): return process(request)");
        assert_eq!(strategy.category, QueryCategory::Code);
    }

    #[test]
    fn arithmetic_is_math() {
        let strategy = classify("what is 42 + 17?");
        assert_eq!(strategy.category, QueryCategory::Math);
    }

    #[test]
    fn breaking_news_question_prefers_web() {
        let strategy = classify("what's the latest breaking news on the outage today?");
        assert_eq!(strategy.category, QueryCategory::CurrentEvents);
        assert!(strategy.prefer_web);
        assert_eq!(strategy.retrieval, RetrievalStrategy::WebFirst);
    }

    #[test]
    fn versus_question_is_comparison() {
        let strategy = classify("What's the difference between TCP and UDP?");
        assert_eq!(strategy.category, QueryCategory::Comparison);
    }

    #[test]
    fn ambiguous_text_defaults_to_factual() {
        let strategy = classify("The meter reading was steady all afternoon.");
        assert_eq!(strategy.category, QueryCategory::Factual);
    }

    #[test]
    fn confidence_is_clamped_to_unit_interval() {
        let strategy = classify("install config setup error troubleshoot database server");
        assert!(strategy.confidence >= 0.0 && strategy.confidence <= 1.0);
    }

    #[test]
    fn short_question_is_simple_complexity() {
        assert_eq!(estimate_complexity("what is RNI"), Complexity::Simple);
    }

    #[test]
    fn long_multi_clause_question_is_complex_or_expert() {
        let text = "Can you explain, in detail, how the failover sequence works, and what happens \
                     when the primary database and the replica both lose connectivity at the same time?";
        assert!(estimate_complexity(text) >= Complexity::Complex);
    }
}
