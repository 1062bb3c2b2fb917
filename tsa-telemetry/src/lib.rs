pub mod init;

pub use init::{TelemetryConfig, init_telemetry};
