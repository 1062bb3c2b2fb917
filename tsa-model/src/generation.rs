//! Generation and embedding calls against a picked backend.
//!
//! Streaming follows the teacher's `OllamaModel::generate_content` shape
//! (`async_stream::try_stream!` over `ollama-rs`'s chat stream), generalized
//! from the ADK `Llm` trait's fixed content format to plain prompt/context
//! strings plus a `CancellationToken` for client-disconnect propagation.

use async_stream::try_stream;
use futures::Stream;
use ollama_rs::generation::chat::ChatMessage;
use ollama_rs::generation::chat::request::ChatMessageRequest;
use ollama_rs::generation::embeddings::request::GenerateEmbeddingsRequest;
use std::pin::Pin;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::error::BackendError;
use crate::pool::{BackendInstance, BackendPool};

pub type TokenStream = Pin<Box<dyn Stream<Item = Result<String, BackendError>> + Send>>;

/// Issue a non-streaming chat completion against `backend`, returning the
/// full response text. Used by components (reranker, confidence scorer)
/// that need a single synchronous answer rather than a token stream.
pub async fn complete(
    backend: &BackendInstance,
    model: &str,
    system: Option<&str>,
    user: &str,
) -> Result<String, BackendError> {
    let _guard = BackendPool::in_flight_guard(backend);
    let messages = build_messages(system, user);
    let request = ChatMessageRequest::new(model.to_string(), messages);

    let response = backend.client.send_chat_messages(request).await.map_err(|e| {
        backend.mark_failed();
        BackendError::Upstream(backend.name.clone(), e.to_string())
    })?;

    Ok(response.message.content)
}

/// Issue a streaming chat completion, yielding content deltas as they
/// arrive. The stream stops early (without an error frame) if `cancel` is
/// triggered, matching the SSE handler's client-disconnect contract.
pub fn stream_completion(
    backend: std::sync::Arc<BackendInstance>,
    model: String,
    system: Option<String>,
    user: String,
    cancel: CancellationToken,
) -> TokenStream {
    let stream = try_stream! {
        let _guard = BackendPool::in_flight_guard(&backend);
        let messages = build_messages(system.as_deref(), &user);
        let request = ChatMessageRequest::new(model, messages);

        let response_stream = backend
            .client
            .send_chat_messages_stream(request)
            .await
            .map_err(|e| {
                backend.mark_failed();
                BackendError::Upstream(backend.name.clone(), e.to_string())
            })?;

        let mut pinned = std::pin::pin!(response_stream);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                next = futures::StreamExt::next(&mut pinned) => {
                    match next {
                        Some(Ok(chunk)) => {
                            if !chunk.message.content.is_empty() {
                                yield chunk.message.content;
                            }
                            if chunk.done {
                                break;
                            }
                        }
                        Some(Err(e)) => {
                            backend.mark_failed();
                            Err(BackendError::Upstream(backend.name.clone(), e.to_string()))?;
                        }
                        None => break,
                    }
                }
            }
        }
    };

    Box::pin(stream)
}

/// Embed `text` on a backend specialized for embeddings, returning the
/// vector. Embedding calls are not streamed.
pub async fn embed(
    backend: &BackendInstance,
    model: &str,
    text: &str,
    timeout: std::time::Duration,
) -> Result<Vec<f32>, BackendError> {
    let _guard = BackendPool::in_flight_guard(backend);
    let start = Instant::now();
    let request = GenerateEmbeddingsRequest::new(model.to_string(), text.to_string().into());

    let result = tokio::time::timeout(timeout, backend.client.generate_embeddings(request)).await;

    match result {
        Err(_) => {
            backend.mark_failed();
            Err(BackendError::Timeout(start.elapsed(), backend.name.clone()))
        }
        Ok(Err(e)) => {
            backend.mark_failed();
            Err(BackendError::Upstream(backend.name.clone(), e.to_string()))
        }
        Ok(Ok(response)) => response.embeddings.into_iter().next().ok_or_else(|| {
            warn!(backend = %backend.name, "embedding response had no vectors");
            BackendError::Upstream(backend.name.clone(), "empty embedding response".to_string())
        }),
    }
}

fn build_messages(system: Option<&str>, user: &str) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(2);
    if let Some(system) = system {
        messages.push(ChatMessage::system(system.to_string()));
    }
    messages.push(ChatMessage::user(user.to_string()));
    messages
}
