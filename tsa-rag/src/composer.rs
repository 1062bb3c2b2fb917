//! Prompt Composer: system preamble, a bounded terminology glossary
//! section, the fused `[DOC n]`/`[WEB n]` context block, the verbatim
//! question, and citation instructions.
//!
//! Glossary lookup is grounded on
//! `original_source/utils/terminology_manager.py`'s noun-phrase-driven
//! acronym/synonym expansion, bounded here to the same `<=3` / `<=5`
//! counts the original documents.

use std::sync::Arc;

use tsa_core::domain::FusedSource;
use tsa_store::GlossaryStore;

const SYSTEM_PREAMBLE: &str = "You are a technical service assistant helping engineers and support \
staff resolve questions about internal products, infrastructure, and procedures. Answer precisely \
and only from the provided context; say so explicitly when the context does not cover the question.";

const MAX_ACRONYMS: usize = 3;
const MAX_SYNONYM_PAIRS: usize = 5;
const CITATION_INSTRUCTIONS: &str =
    "Cite [DOC n] or [WEB n] inline for every claim drawn from the context; mark conflicts between \
sources explicitly rather than silently picking one.";

/// Rough token estimate: characters / 4, matching the teacher's
/// `estimate_tokens` heuristic elsewhere in the pack (no tokenizer
/// dependency for a budget check).
fn estimate_tokens(text: &str) -> usize {
    text.len() / 4
}

pub struct Composer {
    glossary: Arc<GlossaryStore>,
}

pub struct ComposedPrompt {
    pub prompt: String,
    pub context_truncated: bool,
}

impl Composer {
    pub fn new(glossary: Arc<GlossaryStore>) -> Self {
        Self { glossary }
    }

    /// Composes the final prompt, dropping lowest-ranked context entries
    /// (assumed already ranked best-first in `sources`) until the estimate
    /// fits `context_window_tokens`, reporting whether any were dropped.
    pub async fn compose(
        &self,
        query: &str,
        sources: &[FusedSource],
        context_window_tokens: usize,
    ) -> ComposedPrompt {
        let glossary_section = self.glossary_section(query).await;

        let mut kept = sources.len();
        loop {
            let prompt = self.render(query, &glossary_section, &sources[..kept]);
            if estimate_tokens(&prompt) <= context_window_tokens || kept == 0 {
                return ComposedPrompt { prompt, context_truncated: kept < sources.len() };
            }
            kept -= 1;
        }
    }

    async fn glossary_section(&self, query: &str) -> String {
        let terms = noun_phrase_candidates(query);

        let mut acronyms = Vec::new();
        let mut synonym_pairs = Vec::new();

        for term in &terms {
            if acronyms.len() >= MAX_ACRONYMS && synonym_pairs.len() >= MAX_SYNONYM_PAIRS {
                break;
            }
            if acronyms.len() < MAX_ACRONYMS {
                if let Ok(Some(acronym)) = self.glossary.lookup_acronym(term).await {
                    acronyms.push(format!("{}: {}", acronym.acronym, acronym.definition));
                }
            }
            if synonym_pairs.len() < MAX_SYNONYM_PAIRS {
                if let Ok(synonyms) = self.glossary.synonyms_for(term).await {
                    for synonym in synonyms {
                        if synonym_pairs.len() >= MAX_SYNONYM_PAIRS {
                            break;
                        }
                        synonym_pairs.push(format!("{} ~ {}", synonym.term, synonym.synonym));
                    }
                }
            }
        }

        if acronyms.is_empty() && synonym_pairs.is_empty() {
            return String::new();
        }

        let mut section = String::from("\nTerminology:\n");
        for line in acronyms.iter().chain(synonym_pairs.iter()) {
            section.push_str("- ");
            section.push_str(line);
            section.push('\n');
        }
        section
    }

    fn render(&self, query: &str, glossary_section: &str, sources: &[FusedSource]) -> String {
        let mut context = String::new();
        for source in sources {
            context.push_str(&format!("[{}] ({})\n{}\n\n", source.label, source.origin, source.content));
        }

        format!(
            "{SYSTEM_PREAMBLE}\n{glossary_section}\nContext:\n{context}Question: {query}\n\n{CITATION_INSTRUCTIONS}"
        )
    }
}

/// Crude noun-phrase extraction: lowercased, stopword-free tokens of
/// length >= 2. Good enough to drive glossary lookups without an NLP
/// dependency the rest of the pack doesn't carry.
fn noun_phrase_candidates(query: &str) -> Vec<String> {
    const STOPWORDS: &[&str] =
        &["the", "a", "an", "is", "are", "how", "what", "why", "do", "does", "i", "to", "of", "for", "my"];
    query
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
        .filter(|w| w.len() >= 2 && !STOPWORDS.contains(&w.as_str()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimate_tokens_is_roughly_chars_over_four() {
        assert_eq!(estimate_tokens("abcdefgh"), 2);
    }

    #[test]
    fn noun_phrase_candidates_drops_stopwords_and_punctuation() {
        let terms = noun_phrase_candidates("How do I reset my VPN?");
        assert_eq!(terms, vec!["reset", "vpn"]);
    }
}
