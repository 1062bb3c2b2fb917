//! Document listing, metadata, chunk counts, and deletion.

use axum::Json;
use axum::extract::{Path, Query, State};
use serde::Serialize;
use tsa_core::AppError;
use tsa_core::domain::PrivacyFilter;
use tsa_core::ids::DocumentId;

use crate::dto::{ApiOk, PageQuery};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct DocumentSummary {
    #[serde(flatten)]
    document: tsa_core::domain::Document,
    chunk_count: i64,
}

#[derive(Debug, Serialize)]
pub struct DocumentListResponse {
    documents: Vec<DocumentSummary>,
}

pub async fn list_documents(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
) -> ApiResult<Json<DocumentListResponse>> {
    // Listing is gated on `documents.view` at the router layer (public vs.
    // private listings are a later extension); every authenticated caller
    // that clears the guard sees the full catalog.
    let documents = state
        .documents
        .list_documents(PrivacyFilter::All, page.limit, page.offset)
        .await
        .map_err(AppError::from)
        .map_err(ApiError)?;

    let mut summaries = Vec::with_capacity(documents.len());
    for document in documents {
        let chunk_count =
            state.documents.chunk_count(&document.doc_id).await.map_err(AppError::from).map_err(ApiError)?;
        summaries.push(DocumentSummary { document, chunk_count });
    }

    Ok(Json(DocumentListResponse { documents: summaries }))
}

pub async fn get_document(
    State(state): State<AppState>,
    Path(doc_id): Path<String>,
) -> ApiResult<Json<DocumentSummary>> {
    let doc_id = DocumentId(doc_id);
    let document = state.documents.get_document(&doc_id).await.map_err(AppError::from).map_err(ApiError)?;
    let chunk_count = state.documents.chunk_count(&doc_id).await.map_err(AppError::from).map_err(ApiError)?;
    Ok(Json(DocumentSummary { document, chunk_count }))
}

pub async fn delete_document(State(state): State<AppState>, Path(doc_id): Path<String>) -> ApiResult<Json<ApiOk>> {
    state.documents.delete_document(&DocumentId(doc_id)).await.map_err(AppError::from).map_err(ApiError)?;
    Ok(Json(ApiOk::default()))
}
