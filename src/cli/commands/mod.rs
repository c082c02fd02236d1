//! CLI command implementations.

pub mod config;
pub mod pass;
pub mod records;
pub mod run;
