//! Domain layer for prtbot
//!
//! This module contains the merge request and notification models, the
//! error taxonomy and the port traits adapters implement.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{ChannelError, DomainError, DomainResult};
