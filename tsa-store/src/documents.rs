//! Document/chunk persistence and the vector + keyword candidate search
//! used by the hybrid retriever.

use sqlx::{PgPool, Row};
use tsa_core::domain::{Candidate, ChunkKind, Document, PrivacyFilter, PrivacyLevel};
use tsa_core::ids::DocumentId;

use crate::error::StoreError;

pub struct DocumentStore {
    pool: PgPool,
}

fn privacy_from_str(s: &str) -> PrivacyLevel {
    match s {
        "private" => PrivacyLevel::Private,
        _ => PrivacyLevel::Public,
    }
}

fn kind_from_str(s: &str) -> ChunkKind {
    match s {
        "table" => ChunkKind::Table,
        "image_ref" => ChunkKind::ImageRef,
        _ => ChunkKind::Text,
    }
}

impl DocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_document(&self, doc_id: &DocumentId) -> Result<Document, StoreError> {
        let row = sqlx::query(
            "SELECT doc_id, file_name, content_hash, privacy_level, classification, product, version, created_at
             FROM documents WHERE doc_id = $1",
        )
        .bind(doc_id.as_ref())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("document {doc_id}")))?;

        Ok(Document {
            doc_id: DocumentId(row.get::<String, _>("doc_id")),
            file_name: row.get("file_name"),
            content_hash: row.get("content_hash"),
            privacy_level: privacy_from_str(row.get::<String, _>("privacy_level").as_str()),
            classification: row.get("classification"),
            product: row.get("product"),
            version: row.get("version"),
            created_at: row.get("created_at"),
        })
    }

    /// Vector-similarity candidates: cosine distance against `embedding`,
    /// restricted to rows whose document passes `privacy`, capped at
    /// `limit` rows. Ordered ascending by distance (closer first).
    pub async fn vector_search(
        &self,
        embedding: &[f32],
        limit: i64,
        privacy: PrivacyFilter,
    ) -> Result<Vec<Candidate>, StoreError> {
        let privacy_clause = privacy_sql_clause(privacy);
        let sql = format!(
            "SELECT c.chunk_id, c.content, d.file_name AS doc_name, c.page, c.section_title,
                    c.kind, c.ordinal, (c.embedding <=> $1) AS vector_distance
             FROM chunks c JOIN documents d ON d.doc_id = c.doc_id
             WHERE {privacy_clause}
             ORDER BY c.embedding <=> $1
             LIMIT $2"
        );

        let vector_literal = pgvector_literal(embedding);
        let rows = sqlx::query(&sql).bind(vector_literal).bind(limit).fetch_all(&self.pool).await?;

        Ok(rows
            .into_iter()
            .map(|row| Candidate {
                chunk_id: row.get::<String, _>("chunk_id").into(),
                content: row.get("content"),
                doc_name: row.get("doc_name"),
                page: row.get("page"),
                section_title: row.get("section_title"),
                kind: kind_from_str(row.get::<String, _>("kind").as_str()),
                ordinal: row.get("ordinal"),
                vector_distance: row.get::<f64, _>("vector_distance") as f32,
                keyword_score: 0.0,
            })
            .collect())
    }

    /// Paginated listing for `/api/documents`, newest first.
    pub async fn list_documents(
        &self,
        privacy: PrivacyFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Document>, StoreError> {
        let privacy_clause = privacy_sql_clause_unqualified(privacy);
        let sql = format!(
            "SELECT doc_id, file_name, content_hash, privacy_level, classification, product, version, created_at
             FROM documents WHERE {privacy_clause}
             ORDER BY created_at DESC LIMIT $1 OFFSET $2"
        );

        let rows = sqlx::query(&sql).bind(limit).bind(offset).fetch_all(&self.pool).await?;

        Ok(rows
            .into_iter()
            .map(|row| Document {
                doc_id: DocumentId(row.get::<String, _>("doc_id")),
                file_name: row.get("file_name"),
                content_hash: row.get("content_hash"),
                privacy_level: privacy_from_str(row.get::<String, _>("privacy_level").as_str()),
                classification: row.get("classification"),
                product: row.get("product"),
                version: row.get("version"),
                created_at: row.get("created_at"),
            })
            .collect())
    }

    pub async fn chunk_count(&self, doc_id: &DocumentId) -> Result<i64, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM chunks WHERE doc_id = $1")
            .bind(doc_id.as_ref())
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("count"))
    }

    /// Requires the caller to have already checked `manage_documents`;
    /// cascades to the document's chunks via the FK.
    pub async fn delete_document(&self, doc_id: &DocumentId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM documents WHERE doc_id = $1")
            .bind(doc_id.as_ref())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("document {doc_id}")));
        }
        Ok(())
    }

    /// Keyword candidates via Postgres full-text search (`ts_rank`),
    /// restricted the same way as `vector_search`.
    pub async fn keyword_search(
        &self,
        query: &str,
        limit: i64,
        privacy: PrivacyFilter,
    ) -> Result<Vec<Candidate>, StoreError> {
        let privacy_clause = privacy_sql_clause(privacy);
        let sql = format!(
            "SELECT c.chunk_id, c.content, d.file_name AS doc_name, c.page, c.section_title,
                    c.kind, c.ordinal,
                    ts_rank(to_tsvector('english', c.content), plainto_tsquery('english', $1)) AS keyword_score
             FROM chunks c JOIN documents d ON d.doc_id = c.doc_id
             WHERE {privacy_clause}
               AND to_tsvector('english', c.content) @@ plainto_tsquery('english', $1)
             ORDER BY keyword_score DESC
             LIMIT $2"
        );

        let rows = sqlx::query(&sql).bind(query).bind(limit).fetch_all(&self.pool).await?;

        Ok(rows
            .into_iter()
            .map(|row| Candidate {
                chunk_id: row.get::<String, _>("chunk_id").into(),
                content: row.get("content"),
                doc_name: row.get("doc_name"),
                page: row.get("page"),
                section_title: row.get("section_title"),
                kind: kind_from_str(row.get::<String, _>("kind").as_str()),
                ordinal: row.get("ordinal"),
                vector_distance: 1.0,
                keyword_score: row.get::<f64, _>("keyword_score") as f32,
            })
            .collect())
    }
}

fn privacy_sql_clause(privacy: PrivacyFilter) -> &'static str {
    match privacy {
        PrivacyFilter::All => "TRUE",
        PrivacyFilter::Public => "d.privacy_level = 'public'",
        PrivacyFilter::Private => "d.privacy_level = 'private'",
    }
}

fn privacy_sql_clause_unqualified(privacy: PrivacyFilter) -> &'static str {
    match privacy {
        PrivacyFilter::All => "TRUE",
        PrivacyFilter::Public => "privacy_level = 'public'",
        PrivacyFilter::Private => "privacy_level = 'private'",
    }
}

/// `pgvector`'s text input format: `[0.1,0.2,...]`.
fn pgvector_literal(embedding: &[f32]) -> String {
    let mut s = String::with_capacity(embedding.len() * 8 + 2);
    s.push('[');
    for (i, v) in embedding.iter().enumerate() {
        if i > 0 {
            s.push(',');
        }
        s.push_str(&v.to_string());
    }
    s.push(']');
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pgvector_literal_formats_as_bracketed_csv() {
        assert_eq!(pgvector_literal(&[0.1, 0.2, 0.3]), "[0.1,0.2,0.3]");
    }

    #[test]
    fn pgvector_literal_handles_empty_vector() {
        assert_eq!(pgvector_literal(&[]), "[]");
    }

    #[test]
    fn privacy_clause_restricts_to_public_for_non_admin() {
        assert_eq!(privacy_sql_clause(PrivacyFilter::for_role(false)), "d.privacy_level = 'public'");
    }
}
