//! Immutable application configuration.
//!
//! Built once at startup from the environment (Design Note "Global
//! settings": treat configuration as a single immutable struct built at
//! startup and passed by reference; do not consult environment after
//! init). Every configuration key this gateway needs is represented,
//! including the keys only carried for a future ingestion/mailer
//! component (`UPLOADS_DIR`, `SMTP_*`, ...).

use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub host: String,
    pub port: u16,
    pub name: String,
    pub user: String,
    pub password: String,
}

impl DbConfig {
    pub fn connection_string(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.user, self.password, self.host, self.port, self.name
        )
    }
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: Option<String>,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub use_tls: bool,
    pub verification_sender: String,
    pub verification_subject: String,
    pub verification_link_base: String,
}

#[derive(Debug, Clone)]
pub struct ModelNames {
    pub chat: String,
    pub coding: String,
    pub reasoning: String,
    pub vision: String,
    pub embedding: String,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub db: DbConfig,

    /// `OLLAMA_INSTANCES` — comma-separated `host:port` list. Empty means
    /// "use the built-in default list" (see `tsa-model::pool`).
    pub ollama_instances: Vec<String>,
    pub models: ModelNames,
    pub embedding_timeout: Duration,

    pub retrieval_candidates: usize,

    pub web_cache_enabled: bool,
    pub web_cache_ttl: Duration,
    pub web_cache_max_rows: u64,
    pub web_search_endpoint: String,

    pub jwt_secret: String,
    pub jwt_access_ttl: Duration,
    pub jwt_refresh_ttl: Duration,

    pub enable_metadata_weighting: bool,

    pub log_level: String,
    pub log_dir: String,

    pub api_host: String,
    pub api_port: u16,

    /// Ingestion-only; not consumed by the serving tier, carried so a
    /// future ingestion component can share this same `Settings`.
    pub uploads_dir: String,
    pub archive_dir: String,
    pub poll_interval: Duration,

    pub smtp: SmtpConfig,
}

fn env_string(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt_string(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.is_empty())
}

fn env_bool(key: &str, default: bool) -> bool {
    env::var(key).map(|v| v.eq_ignore_ascii_case("true") || v == "1").unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_u16(key: &str, default: u16) -> u16 {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

impl Settings {
    /// Parse configuration from the process environment. Called exactly
    /// once, at startup, by `tsa-cli`.
    pub fn from_env() -> anyhow::Result<Self> {
        let jwt_secret = env::var("JWT_SECRET").unwrap_or_default();
        if jwt_secret.trim().is_empty() {
            tracing::warn!(
                "JWT_SECRET is not configured; tokens will be signed with an \
                 ephemeral development secret. Set JWT_SECRET in production."
            );
        }

        let ollama_instances = env::var("OLLAMA_INSTANCES")
            .map(|v| v.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect())
            .unwrap_or_default();

        Ok(Settings {
            db: DbConfig {
                host: env_string("DB_HOST", "localhost"),
                port: env_u16("DB_PORT", 5432),
                name: env_string("DB_NAME", "tsa"),
                user: env_string("DB_USER", "tsa"),
                password: env_string("DB_PASSWORD", ""),
            },
            ollama_instances,
            models: ModelNames {
                chat: env_string("CHAT_MODEL", "mistral:7b"),
                coding: env_string("CODING_MODEL", "codellama:7b"),
                reasoning: env_string("REASONING_MODEL", "llama3.2:3b"),
                vision: env_string("VISION_MODEL", "llava:7b"),
                embedding: env_string("EMBEDDING_MODEL", "nomic-embed-text:v1.5"),
            },
            embedding_timeout: Duration::from_secs(env_u64("EMBEDDING_TIMEOUT_SECONDS", 30)),
            retrieval_candidates: env_u64("RETRIEVAL_CANDIDATES", 30) as usize,
            web_cache_enabled: env_bool("WEB_CACHE_ENABLED", true),
            web_cache_ttl: Duration::from_secs(env_u64("WEB_CACHE_TTL_SECONDS", 86_400)),
            web_cache_max_rows: env_u64("WEB_CACHE_MAX_ROWS", 10_000),
            web_search_endpoint: env_string(
                "WEB_SEARCH_ENDPOINT",
                "https://api.duckduckgo.com/",
            ),
            jwt_secret: if jwt_secret.trim().is_empty() {
                "dev-only-insecure-secret".to_string()
            } else {
                jwt_secret
            },
            jwt_access_ttl: Duration::from_secs(30 * 60),
            jwt_refresh_ttl: Duration::from_secs(7 * 24 * 60 * 60),
            enable_metadata_weighting: env_bool("ENABLE_METADATA_WEIGHTING", false),
            log_level: env_string("LOG_LEVEL", "INFO"),
            log_dir: env_string("LOG_DIR", "./logs"),
            api_host: env_string("API_HOST", "0.0.0.0"),
            api_port: env_u16("API_PORT", 8008),
            uploads_dir: env_string("UPLOADS_DIR", "./uploads"),
            archive_dir: env_string("ARCHIVE_DIR", "./archive"),
            poll_interval: Duration::from_secs(env_u64("POLL_INTERVAL_SECONDS", 60)),
            smtp: SmtpConfig {
                host: env_opt_string("SMTP_HOST"),
                port: env_u16("SMTP_PORT", 587),
                username: env_opt_string("SMTP_USERNAME"),
                password: env_opt_string("SMTP_PASSWORD"),
                use_tls: env_bool("SMTP_USE_TLS", true),
                verification_sender: env_string(
                    "VERIFICATION_EMAIL_SENDER",
                    "no-reply@example.com",
                ),
                verification_subject: env_string(
                    "VERIFICATION_EMAIL_SUBJECT",
                    "Verify your account",
                ),
                verification_link_base: env_string(
                    "VERIFICATION_EMAIL_LINK_BASE",
                    "http://localhost:8008/verify",
                ),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn defaults_are_sane_when_unconfigured() {
        let _guard = ENV_LOCK.lock().unwrap();
        for key in [
            "OLLAMA_INSTANCES",
            "RETRIEVAL_CANDIDATES",
            "WEB_CACHE_TTL_SECONDS",
            "API_PORT",
        ] {
            unsafe { env::remove_var(key) };
        }
        let settings = Settings::from_env().unwrap();
        assert!(settings.ollama_instances.is_empty());
        assert_eq!(settings.retrieval_candidates, 30);
        assert_eq!(settings.web_cache_ttl, Duration::from_secs(86_400));
        assert_eq!(settings.api_port, 8008);
        assert_eq!(settings.jwt_access_ttl, Duration::from_secs(30 * 60));
        assert_eq!(settings.jwt_refresh_ttl, Duration::from_secs(7 * 24 * 60 * 60));
    }

    #[test]
    fn ollama_instances_parsed_from_csv() {
        let _guard = ENV_LOCK.lock().unwrap();
        unsafe { env::set_var("OLLAMA_INSTANCES", "host-a:11434, host-b:11434") };
        let settings = Settings::from_env().unwrap();
        assert_eq!(settings.ollama_instances, vec!["host-a:11434", "host-b:11434"]);
        unsafe { env::remove_var("OLLAMA_INSTANCES") };
    }
}
