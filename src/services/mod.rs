//! Reconciliation services.

pub mod pass_scheduler;
pub mod reconciler;
pub mod strategy_selector;

pub use pass_scheduler::{PassSchedule, PassScheduler, ScheduleError};
pub use reconciler::{ItemOutcome, PassReport, Reconciler, ReconcilerConfig};
pub use strategy_selector::StrategySelector;
