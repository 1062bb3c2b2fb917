//! Telemetry initialization and configuration.

use std::sync::Once;

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

static INIT: Once = Once::new();

/// Configuration for the logging subscriber.
#[derive(Debug, Clone, Default)]
pub struct TelemetryConfig {
    pub service_name: String,
    pub default_level: Option<String>,
    pub json: bool,
    pub log_directives: Vec<String>,
}

impl TelemetryConfig {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self { service_name: service_name.into(), ..Default::default() }
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.default_level = Some(level.into());
        self
    }

    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    pub fn with_log_directive(mut self, directive: impl Into<String>) -> Self {
        self.log_directives.push(directive.into());
        self
    }

    /// Reads `SERVICE_NAME`, `LOG_LEVEL`, and `LOG_FORMAT` (`"json"` or
    /// `"text"`, default `"text"`) from the environment.
    pub fn from_env() -> Self {
        let service_name = std::env::var("SERVICE_NAME").unwrap_or_else(|_| "tsa-gateway".to_string());
        let default_level = std::env::var("LOG_LEVEL").ok();
        let json = std::env::var("LOG_FORMAT").map(|v| v == "json").unwrap_or(false);

        Self { service_name, default_level, json, log_directives: Vec::new() }
    }
}

/// Initialize the global `tracing` subscriber with console output and an
/// `EnvFilter`. Safe to call more than once; only the first call takes
/// effect.
pub fn init_telemetry(config: TelemetryConfig) -> Result<(), Box<dyn std::error::Error>> {
    INIT.call_once(|| {
        let mut filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            let level = config.default_level.as_deref().unwrap_or("info");
            EnvFilter::try_new(level).expect("invalid default log level")
        });

        for directive in &config.log_directives {
            filter = filter.add_directive(directive.parse().expect("invalid log directive"));
        }

        let registry = tracing_subscriber::registry().with(filter);

        if config.json {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_target(true)
                        .with_current_span(true),
                )
                .init();
        } else {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_target(true)
                        .with_thread_ids(true)
                        .with_line_number(true),
                )
                .init();
        }

        tracing::info!(
            service.name = config.service_name,
            log.format = if config.json { "json" } else { "text" },
            "telemetry initialized"
        );
    });

    Ok(())
}
