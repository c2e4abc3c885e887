//! CLI command implementations.

pub mod agent;
pub mod ask;
pub mod classify;
pub mod config;
pub mod init;
pub mod rag;
pub mod todo;
pub mod workspace;
