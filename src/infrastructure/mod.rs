//! Infrastructure layer module
//!
//! - Configuration management
//! - Logging infrastructure
//!
//! Persistence and the external services live in `adapters`.

pub mod config;
pub mod logging;
