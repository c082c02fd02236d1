//! Adapters for the systems around the reconciler.

pub mod gitlab;
pub mod memory;
pub mod mock;
pub mod sqlite;
pub mod telegram;
