//! Cron-driven trigger for reconciliation passes.
//!
//! Every scheduled state gets its own tick loop. A loop awaits its pass
//! inline, so two passes for the same state never overlap, and fires that
//! elapse while a pass is running collapse into a single follow-up pass.

use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use cron::Schedule;
use thiserror::Error;
use tokio::task::JoinHandle;

use crate::domain::models::{JobsConfig, MergeRequestState};
use crate::services::strategy_selector::StrategySelector;

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("invalid cron expression '{expression}' for {state} pass: {reason}")]
    InvalidCron {
        state: MergeRequestState,
        expression: String,
        reason: String,
    },

    #[error("state {0} has no reconciler")]
    Untracked(MergeRequestState),
}

/// Cron schedule of the pass for one state.
#[derive(Debug, Clone)]
pub struct PassSchedule {
    pub state: MergeRequestState,
    pub expression: String,
    schedule: Schedule,
}

impl PassSchedule {
    pub fn parse(state: MergeRequestState, expression: &str) -> Result<Self, ScheduleError> {
        if !state.is_tracked() {
            return Err(ScheduleError::Untracked(state));
        }
        let schedule = Schedule::from_str(expression).map_err(|e| ScheduleError::InvalidCron {
            state,
            expression: expression.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            state,
            expression: expression.to_string(),
            schedule,
        })
    }

    /// First fire time strictly after `last`.
    pub fn next_after(&self, last: &DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedule.after(last).next()
    }

    /// Whether a fire is due at `now` given the previous fire at `last`.
    pub fn is_due(&self, last: &DateTime<Utc>, now: &DateTime<Utc>) -> bool {
        self.next_after(last).is_some_and(|next| *now >= next)
    }
}

/// Runs the configured passes until stopped.
pub struct PassScheduler {
    selector: Arc<StrategySelector>,
    schedules: Vec<PassSchedule>,
    tick_interval: Duration,
    running: Arc<AtomicBool>,
}

impl PassScheduler {
    pub fn new(selector: Arc<StrategySelector>, tick_interval: Duration) -> Self {
        Self {
            selector,
            schedules: Vec::new(),
            tick_interval,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Scheduler for every enabled job in `jobs`.
    pub fn from_config(
        selector: Arc<StrategySelector>,
        jobs: &JobsConfig,
    ) -> Result<Self, ScheduleError> {
        let mut scheduler = Self::new(selector, Duration::from_millis(jobs.tick_interval_ms));
        for (state, job) in [
            (MergeRequestState::Opened, &jobs.opened),
            (MergeRequestState::Merged, &jobs.merged),
        ] {
            if job.enabled {
                scheduler.add(PassSchedule::parse(state, &job.cron)?);
            } else {
                tracing::info!(%state, "pass disabled");
            }
        }
        Ok(scheduler)
    }

    /// Add a schedule, replacing any previous one for the same state.
    pub fn add(&mut self, schedule: PassSchedule) {
        self.schedules.retain(|s| s.state != schedule.state);
        self.schedules.push(schedule);
    }

    pub fn schedules(&self) -> &[PassSchedule] {
        &self.schedules
    }

    /// Spawn one tick loop per schedule.
    pub fn start(&self) -> Vec<JoinHandle<()>> {
        self.running.store(true, Ordering::SeqCst);

        self.schedules
            .iter()
            .cloned()
            .map(|schedule| {
                let selector = Arc::clone(&self.selector);
                let running = Arc::clone(&self.running);
                let tick_interval = self.tick_interval;

                tracing::info!(state = %schedule.state, cron = %schedule.expression, "scheduling pass");

                tokio::spawn(async move {
                    let mut last_fired = Utc::now();

                    while running.load(Ordering::SeqCst) {
                        tokio::time::sleep(tick_interval).await;

                        let now = Utc::now();
                        if !schedule.is_due(&last_fired, &now) {
                            continue;
                        }
                        last_fired = now;

                        match selector.process(schedule.state).await {
                            Ok(report) => {
                                tracing::debug!(
                                    state = %schedule.state,
                                    pass_id = %report.pass_id,
                                    writes = report.writes(),
                                    "scheduled pass completed"
                                );
                            }
                            Err(e) => {
                                tracing::error!(state = %schedule.state, error = %e, "scheduled pass failed");
                            }
                        }
                    }

                    tracing::debug!(state = %schedule.state, "pass loop stopped");
                })
            })
            .collect()
    }

    /// Stop the loops after their current tick.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}
