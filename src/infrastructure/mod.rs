//! Infrastructure layer module
//!
//! Process-level concerns that sit outside the domain:
//! - Configuration loading (figment: defaults, YAML, environment)
//! - Logging (tracing-subscriber, rolling files)

pub mod config;
pub mod logging;
