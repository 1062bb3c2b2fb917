//! Human-submitted answer corrections, keyed by a fingerprint of the
//! question they apply to. Checked before retrieval runs: an exact
//! fingerprint match short-circuits retrieval entirely.

use sqlx::{PgPool, Row};
use tsa_core::domain::Correction;

use crate::error::StoreError;

pub struct CorrectionStore {
    pool: PgPool,
}

impl CorrectionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find(&self, fingerprint: &str) -> Result<Option<Correction>, StoreError> {
        let row = sqlx::query(
            "SELECT question_fingerprint, corrected_answer FROM corrections WHERE question_fingerprint = $1",
        )
        .bind(fingerprint)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| Correction {
            question_fingerprint: row.get("question_fingerprint"),
            corrected_answer: row.get("corrected_answer"),
        }))
    }

    pub async fn upsert(&self, fingerprint: &str, corrected_answer: &str) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO corrections (question_fingerprint, corrected_answer)
             VALUES ($1, $2)
             ON CONFLICT (question_fingerprint) DO UPDATE SET corrected_answer = EXCLUDED.corrected_answer",
        )
        .bind(fingerprint)
        .bind(corrected_answer)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

/// Normalizes a question into the fingerprint used as the corrections
/// table's key: lowercased, whitespace-collapsed, punctuation stripped.
pub fn fingerprint(question: &str) -> String {
    question
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_strips_punctuation_and_case() {
        assert_eq!(fingerprint("How do I reset my VPN?!"), "how do i reset my vpn");
    }

    #[test]
    fn fingerprint_is_stable_for_equivalent_phrasing() {
        assert_eq!(fingerprint("Reset  my VPN"), fingerprint("reset my vpn"));
    }
}
