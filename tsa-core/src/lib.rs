//! Shared types, configuration, and error taxonomy for the Technical
//! Service Assistant gateway.
//!
//! This crate has no knowledge of HTTP, Postgres, or any particular LLM
//! backend — it exists so that `tsa-model`, `tsa-store`, `tsa-rag`,
//! `tsa-auth`, and `tsa-server` can agree on the same domain vocabulary
//! without depending on each other.

pub mod config;
pub mod domain;
pub mod error;
pub mod ids;
pub mod query;

pub use config::Settings;
pub use error::{AppError, ErrorKind, Result};
