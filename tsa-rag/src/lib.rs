//! Query classification, hybrid retrieval, reranking, confidence scoring,
//! and prompt composition.

pub mod classifier;
pub mod composer;
pub mod confidence;
pub mod error;
pub mod reranker;
pub mod retriever;

pub use classifier::classify;
pub use composer::{Composer, ComposedPrompt};
pub use error::RagError;
pub use reranker::Reranker;
pub use retriever::{HybridRetriever, RetrieverConfig};
