//! Per-invocation run controller.
//!
//! A run moves through `Idle -> Reading -> Evaluating -> Dispatching ->
//! Responding`. A read failure jumps straight to a failed response.
//! Dispatch failures stay inside `Dispatching`: once reading succeeded the
//! run always responds with success.

use chrono::{DateTime, Utc};
use tracing::{debug, error, info};

use crate::error::MonitorError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Success,
    Failure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    Reading,
    Evaluating,
    Dispatching,
    Responding(RunOutcome),
}

impl RunPhase {
    fn can_advance_to(self, next: RunPhase) -> bool {
        matches!(
            (self, next),
            (RunPhase::Idle, RunPhase::Reading)
                | (RunPhase::Reading, RunPhase::Evaluating)
                | (RunPhase::Evaluating, RunPhase::Dispatching)
                | (RunPhase::Dispatching, RunPhase::Responding(RunOutcome::Success))
                | (RunPhase::Reading, RunPhase::Responding(_))
                | (RunPhase::Evaluating, RunPhase::Responding(_))
        )
    }
}

/// One invocation of a monitor job.
#[derive(Debug)]
pub struct Run {
    job: &'static str,
    started_at: DateTime<Utc>,
    phases: Vec<RunPhase>,
}

impl Run {
    /// Start a run. `started_at` is the "now" every evaluation in the run uses.
    pub fn start(job: &'static str, started_at: DateTime<Utc>) -> Self {
        Self {
            job,
            started_at,
            phases: vec![RunPhase::Idle],
        }
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn phase(&self) -> RunPhase {
        *self.phases.last().unwrap_or(&RunPhase::Idle)
    }

    /// Every phase the run has been in, in order.
    pub fn phases(&self) -> &[RunPhase] {
        &self.phases
    }

    /// Move to the next phase.
    pub fn advance(&mut self, next: RunPhase) {
        let current = self.phase();
        debug_assert!(
            current.can_advance_to(next),
            "illegal run transition {current:?} -> {next:?}"
        );
        debug!(job = self.job, from = ?current, to = ?next, "Run phase");
        self.phases.push(next);
    }

    /// Enter the terminal phase for `result` and hand it back.
    pub fn finish<T>(&mut self, result: Result<T, MonitorError>) -> Result<T, MonitorError> {
        match &result {
            Ok(_) => {
                // Degenerate runs may skip straight from reading or evaluating
                self.advance(RunPhase::Responding(RunOutcome::Success));
                info!(job = self.job, started_at = %self.started_at, "Run succeeded");
            }
            Err(e) => {
                self.advance(RunPhase::Responding(RunOutcome::Failure));
                error!(job = self.job, started_at = %self.started_at, error = %e, "Run failed");
            }
        }
        result
    }
}
