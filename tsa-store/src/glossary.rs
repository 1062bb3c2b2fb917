//! Acronym/synonym lookups used by the query classifier and prompt
//! composer to expand domain shorthand.

use sqlx::{PgPool, Row};
use tsa_core::domain::{Acronym, Synonym, SynonymKind};

use crate::error::StoreError;

pub struct GlossaryStore {
    pool: PgPool,
}

fn synonym_kind_from_str(s: &str) -> SynonymKind {
    match s {
        "alternate" => SynonymKind::Alternate,
        "related" => SynonymKind::Related,
        _ => SynonymKind::Abbreviation,
    }
}

impl GlossaryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn lookup_acronym(&self, term: &str) -> Result<Option<Acronym>, StoreError> {
        let row = sqlx::query(
            "SELECT acronym, definition, sources, confidence, verified
             FROM acronyms WHERE lower(acronym) = lower($1)",
        )
        .bind(term)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| Acronym {
            acronym: row.get("acronym"),
            definition: row.get("definition"),
            sources: row.get("sources"),
            confidence: row.get::<f64, _>("confidence") as f32,
            verified: row.get("verified"),
        }))
    }

    pub async fn synonyms_for(&self, term: &str) -> Result<Vec<Synonym>, StoreError> {
        let rows = sqlx::query(
            "SELECT term, synonym, kind, confidence FROM synonyms WHERE lower(term) = lower($1)",
        )
        .bind(term)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| Synonym {
                term: row.get("term"),
                synonym: row.get("synonym"),
                kind: synonym_kind_from_str(row.get::<String, _>("kind").as_str()),
                confidence: row.get::<f64, _>("confidence") as f32,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_synonym_kind_defaults_to_abbreviation() {
        assert_eq!(synonym_kind_from_str("nonsense"), SynonymKind::Abbreviation);
    }
}
