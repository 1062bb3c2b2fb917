pub mod analytics;
pub mod auth;
pub mod chat;
pub mod documents;
pub mod health;
