//! Logging infrastructure
//!
//! Structured logging using tracing and tracing-subscriber:
//! - Pretty or JSON formatting on stderr
//! - Optional rolling log files with retention cleanup
//! - Secret redaction for anything echoed back to the user

pub mod config;
pub mod logger;
pub mod redact;
pub mod retention;

pub use config::{LogConfig, LogFormat, RotationPolicy};
pub use logger::LoggerImpl;
pub use redact::{mask_secret, redact_secrets};
pub use retention::cleanup_old_logs;
