//! `/api/rag-chat` (SSE) plus the non-streaming search variants built on
//! the same classify → retrieve → compose → generate pipeline.
//!
//! The corrections table is checked before anything else: a fingerprint
//! match short-circuits retrieval and generation entirely and is recorded
//! under its own `SearchMethod::Correction` analytics bucket.
//!
//! A generation backend that fails before producing any output gets one
//! retry on a different healthy backend; a failure once output has
//! started is not retried and ends the response in an error frame.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Instant;

use axum::Json;
use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use async_stream::stream;
use chrono::Utc;
use futures::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use tsa_core::AppError;
use tsa_core::domain::{PrivacyFilter, SearchEvent, SearchMethod};
use tsa_core::ids::MessageId;
use tsa_core::query::{BackendSpecialization, Strategy};
use tsa_model::generation;
use tsa_rag::classify;
use tsa_store::corrections::fingerprint;

use crate::dto::{
    ChatRequest, Classification, ClassifyQueryRequest, ClassifyQueryResponse, ContextItem,
    HybridSearchRequest, IntelligentRouteResponse, SearchResponse,
};
use crate::error::{ApiError, ApiResult};
use crate::sse::ChatFrame;
use crate::state::AppState;

/// Rough context budget in tokens handed to the composer; generous enough
/// for the configured chunk targets (up to 10 chunks) without risking the
/// backend's own context window.
const CONTEXT_WINDOW_TOKENS: usize = 3072;

fn model_for(state: &AppState, specialization: BackendSpecialization) -> String {
    match specialization {
        BackendSpecialization::Chat => state.settings.models.chat.clone(),
        BackendSpecialization::Coding => state.settings.models.coding.clone(),
        BackendSpecialization::Reasoning => state.settings.models.reasoning.clone(),
        BackendSpecialization::Embedding => state.settings.models.embedding.clone(),
    }
}

/// Kept distinct from `BackendSpecialization`'s own `snake_case` serde
/// rendering: `/api/intelligent-route` reports the instance-role label
/// (`code_technical`, not `coding`) that the pool's four-way specialization
/// cycle is built around.
fn specialization_label(specialization: BackendSpecialization) -> &'static str {
    match specialization {
        BackendSpecialization::Chat => "chat_qa",
        BackendSpecialization::Coding => "code_technical",
        BackendSpecialization::Reasoning => "reasoning_math",
        BackendSpecialization::Embedding => "embeddings_search",
    }
}

struct CancelOnDrop(CancellationToken);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

pub async fn rag_chat(
    State(state): State<AppState>,
    Json(body): Json<ChatRequest>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let cancel = CancellationToken::new();

    let stream = stream! {
        let _cancel_guard = CancelOnDrop(cancel.clone());
        let start = Instant::now();
        let query = body.message;

        match state.corrections.find(&fingerprint(&query)).await {
            Ok(Some(correction)) => {
                yield ChatFrame::Sources { sources: Vec::new(), confidence: 1.0, method: SearchMethod::Correction }
                    .into_event();
                yield ChatFrame::Token { token: correction.corrected_answer }.into_event();
                yield ChatFrame::Done { message_id: MessageId::new() }.into_event();

                state.recorder.enqueue(SearchEvent {
                    ts: Utc::now(),
                    query,
                    method: SearchMethod::Correction,
                    classification: "correction".to_string(),
                    strategy: "correction".to_string(),
                    rag_confidence: None,
                    final_confidence: 1.0,
                    latency_ms: start.elapsed().as_millis() as i64,
                    chunk_count: 0,
                    web_count: 0,
                    fused_count: 0,
                    model: "none".to_string(),
                    error: None,
                });
                return;
            }
            Ok(None) => {}
            Err(err) => warn!(error = %err, "corrections lookup failed, falling through to retrieval"),
        }

        let strategy: Strategy = classify(&query);

        let outcome = match state.retriever.retrieve(&query, &strategy, PrivacyFilter::Public, true).await {
            Ok(outcome) => outcome,
            Err(err) => {
                let app_err: AppError = err.into();
                yield ChatFrame::Error { code: app_err.error_code(), message: app_err.to_string() }.into_event();
                return;
            }
        };

        let method = match (outcome.chunk_count > 0, outcome.web_count > 0) {
            (true, true) => SearchMethod::Fusion,
            (false, true) => SearchMethod::Web,
            _ => SearchMethod::Rag,
        };

        yield ChatFrame::Sources {
            sources: outcome.sources.iter().map(|s| s.label.clone()).collect(),
            confidence: outcome.top_score,
            method,
        }
        .into_event();

        let composed = state.composer.compose(&query, &outcome.sources, CONTEXT_WINDOW_TOKENS).await;

        let specialization = strategy.category.preferred_backend();
        let model = model_for(&state, specialization);
        let backend = match state.pool.pick(specialization) {
            Ok(backend) => backend,
            Err(err) => {
                let app_err: AppError = err.into();
                yield ChatFrame::Error { code: app_err.error_code(), message: app_err.to_string() }.into_event();
                return;
            }
        };

        let mut current_backend = backend;
        let mut generated = String::new();
        let mut failure: Option<AppError> = None;
        let mut retried = false;

        loop {
            let mut token_stream = generation::stream_completion(
                Arc::clone(&current_backend),
                model.clone(),
                None,
                composed.prompt.clone(),
                cancel.clone(),
            );

            let mut attempt_failure: Option<AppError> = None;
            let mut received_token = false;

            while let Some(next) = token_stream.next().await {
                match next {
                    Ok(token) => {
                        received_token = true;
                        generated.push_str(&token);
                        yield ChatFrame::Token { token }.into_event();
                    }
                    Err(err) => {
                        attempt_failure = Some(err.into());
                        break;
                    }
                }
            }

            match attempt_failure {
                None => break,
                Some(err) if !received_token && !retried => {
                    retried = true;
                    current_backend.mark_failed();
                    match state.pool.pick(specialization) {
                        Ok(next_backend) => current_backend = next_backend,
                        Err(_) => {
                            failure = Some(err);
                            break;
                        }
                    }
                }
                Some(err) => {
                    failure = Some(err);
                    break;
                }
            }
        }

        let final_confidence = failure.is_none().then(|| {
            tsa_rag::confidence::score(&query, &outcome.sources, &generated, strategy.complexity)
        });

        if let Some(err) = &failure {
            yield ChatFrame::Error { code: err.error_code(), message: err.to_string() }.into_event();
        } else {
            yield ChatFrame::Done { message_id: MessageId::new() }.into_event();
        }

        state.recorder.enqueue(SearchEvent {
            ts: Utc::now(),
            query,
            method,
            classification: format!("{:?}", strategy.category).to_lowercase(),
            strategy: format!("{:?}", strategy.retrieval).to_lowercase(),
            rag_confidence: Some(outcome.top_score),
            final_confidence: final_confidence.unwrap_or(0.0),
            latency_ms: start.elapsed().as_millis() as i64,
            chunk_count: outcome.chunk_count as i32,
            web_count: outcome.web_count as i32,
            fused_count: outcome.sources.len() as i32,
            model,
            error: failure.as_ref().map(|e| e.to_string()),
        });
    };

    Sse::new(stream.map(Ok)).keep_alive(KeepAlive::default())
}

struct Answer {
    text: String,
    method: SearchMethod,
    sources: Vec<tsa_core::domain::FusedSource>,
    confidence: f32,
    context_truncated: bool,
}

/// Shared core for the three non-streaming search endpoints: classify,
/// retrieve, compose, generate a single completion, score confidence, and
/// record analytics. Callers differ only in how `enable_web` and the
/// threshold that decides web augmentation are derived.
async fn answer_query(
    state: &AppState,
    query: &str,
    enable_web: bool,
    threshold_override: Option<f32>,
    force_fusion: bool,
) -> ApiResult<Answer> {
    let start = Instant::now();
    let mut strategy = classify(query);
    if let Some(threshold) = threshold_override {
        strategy.threshold = threshold;
    }
    if force_fusion {
        // Guarantees the retriever's `top_score < threshold` web-augmentation
        // check always fires, so web results are fused in even when the rag
        // context alone would have been confident enough.
        strategy.threshold = f32::MAX;
    }

    let outcome = state
        .retriever
        .retrieve(query, &strategy, PrivacyFilter::Public, enable_web)
        .await
        .map_err(AppError::from)
        .map_err(ApiError)?;

    let method = match (outcome.chunk_count > 0, outcome.web_count > 0) {
        (true, true) => SearchMethod::Fusion,
        (false, true) => SearchMethod::Web,
        _ => SearchMethod::Hybrid,
    };

    let composed = state.composer.compose(query, &outcome.sources, CONTEXT_WINDOW_TOKENS).await;

    let specialization = strategy.category.preferred_backend();
    let model = model_for(state, specialization);
    let backend = state.pool.pick(specialization).map_err(AppError::from).map_err(ApiError)?;

    let text = match generation::complete(&backend, &model, None, &composed.prompt).await {
        Ok(text) => text,
        Err(_) => {
            backend.mark_failed();
            let retry_backend = state.pool.pick(specialization).map_err(AppError::from).map_err(ApiError)?;
            generation::complete(&retry_backend, &model, None, &composed.prompt)
                .await
                .map_err(AppError::from)
                .map_err(ApiError)?
        }
    };

    let confidence = tsa_rag::confidence::score(query, &outcome.sources, &text, strategy.complexity);

    state.recorder.enqueue(SearchEvent {
        ts: Utc::now(),
        query: query.to_string(),
        method,
        classification: format!("{:?}", strategy.category).to_lowercase(),
        strategy: format!("{:?}", strategy.retrieval).to_lowercase(),
        rag_confidence: Some(outcome.top_score),
        final_confidence: confidence,
        latency_ms: start.elapsed().as_millis() as i64,
        chunk_count: outcome.chunk_count as i32,
        web_count: outcome.web_count as i32,
        fused_count: outcome.sources.len() as i32,
        model: model.clone(),
        error: None,
    });

    Ok(Answer { text, method, sources: outcome.sources, confidence, context_truncated: composed.context_truncated })
}

fn search_response(answer: Answer) -> SearchResponse {
    SearchResponse {
        success: true,
        answer: answer.text,
        search_method: answer.method,
        context_used: answer.sources.iter().map(ContextItem::from).collect(),
        confidence_score: answer.confidence,
        context_truncated: answer.context_truncated,
    }
}

pub async fn hybrid_search(
    State(state): State<AppState>,
    Json(body): Json<HybridSearchRequest>,
) -> ApiResult<Response> {
    let answer = answer_query(
        &state,
        &body.query,
        body.enable_web_search.unwrap_or(false),
        body.confidence_threshold,
        false,
    )
    .await?;
    Ok(Json(search_response(answer)).into_response())
}

pub async fn fused_hybrid_search(
    State(state): State<AppState>,
    Json(body): Json<HybridSearchRequest>,
) -> ApiResult<Response> {
    let answer = answer_query(&state, &body.query, true, body.confidence_threshold, true).await?;
    Ok(Json(search_response(answer)).into_response())
}

pub async fn intelligent_hybrid_search(
    State(state): State<AppState>,
    Json(body): Json<HybridSearchRequest>,
) -> ApiResult<Response> {
    let answer = answer_query(&state, &body.query, true, None, false).await?;
    Ok(Json(search_response(answer)).into_response())
}

pub async fn classify_query(Json(body): Json<ClassifyQueryRequest>) -> Json<ClassifyQueryResponse> {
    let strategy = classify(&body.query);
    Json(ClassifyQueryResponse {
        classification: Classification {
            query_type: strategy.category,
            complexity: strategy.complexity,
            confidence: strategy.confidence,
        },
        strategy: strategy.retrieval,
        chunk_target: strategy.chunk_target,
        prefer_web: strategy.prefer_web,
    })
}

pub async fn intelligent_route(
    State(state): State<AppState>,
    Json(body): Json<ClassifyQueryRequest>,
) -> Json<IntelligentRouteResponse> {
    let strategy = classify(&body.query);
    let specialization = strategy.category.preferred_backend();
    Json(IntelligentRouteResponse {
        selected_model: model_for(&state, specialization),
        selected_backend: specialization_label(specialization),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn specialization_labels_match_the_original_four_way_cycle() {
        assert_eq!(specialization_label(BackendSpecialization::Coding), "code_technical");
        assert_eq!(specialization_label(BackendSpecialization::Chat), "chat_qa");
    }
}
