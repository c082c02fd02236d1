//! Logging infrastructure
//!
//! Structured logging using tracing and tracing-subscriber:
//! - JSON or pretty console output
//! - Rolling JSON log files
//! - Credential redaction for error text

pub mod logger;
pub mod redact;

pub use logger::LoggerImpl;
pub use redact::{redact, SecretRedactor};
