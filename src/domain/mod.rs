//! Domain layer: pure models and the ports adapters implement.

pub mod errors;
pub mod models;
pub mod ports;
