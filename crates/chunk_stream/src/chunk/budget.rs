//! Per-tick build budgets.
//!
//! Defines the count, time and concurrency limits the scheduler checks before
//! each candidate, and why it stopped when one ran out.

use web_time::{Duration, Instant};

/// Reason the scheduler stopped consuming candidates this tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BudgetStop {
    /// `max_builds` builds were started this tick.
    CountExhausted,
    /// Elapsed tick time exceeded the time budget.
    TimeExceeded,
    /// Builds in flight reached the concurrency cap.
    ConcurrencyCapped,
}

/// Count, time and concurrency budget for one tick.
///
/// Reset exactly once at tick start with [`reset`](FrameBudget::reset); the
/// counters only move forward within a tick.
#[derive(Clone, Debug)]
pub struct FrameBudget {
    /// Maximum builds started per tick.
    pub max_builds: usize,

    /// Maximum wall-clock time spent building per tick.
    pub time_budget: Duration,

    /// Maximum builds in flight at once, including ones carried over from
    /// earlier ticks by asynchronous builders.
    pub max_in_flight: usize,

    started_at: Instant,
    builds_started: usize,
    in_flight: usize,
}

impl FrameBudget {
    pub fn new(max_builds: usize, time_budget: Duration, max_in_flight: usize) -> Self {
        Self {
            max_builds,
            time_budget,
            max_in_flight,
            started_at: Instant::now(),
            builds_started: 0,
            in_flight: 0,
        }
    }

    /// Start a new tick. `carried_in_flight` is the number of builds still
    /// outstanding from earlier ticks.
    pub fn reset(&mut self, started_at: Instant, carried_in_flight: usize) {
        self.started_at = started_at;
        self.builds_started = 0;
        self.in_flight = carried_in_flight;
    }

    /// First exhausted limit at `now`, if any.
    pub fn check(&self, now: Instant) -> Option<BudgetStop> {
        if self.builds_started >= self.max_builds {
            return Some(BudgetStop::CountExhausted);
        }
        if self.elapsed(now) > self.time_budget {
            return Some(BudgetStop::TimeExceeded);
        }
        if self.in_flight >= self.max_in_flight {
            return Some(BudgetStop::ConcurrencyCapped);
        }
        None
    }

    /// Record a build handed to the builder.
    pub fn record_started(&mut self) {
        self.builds_started += 1;
        self.in_flight += 1;
    }

    /// Record a build that delivered its result.
    pub fn record_finished(&mut self) {
        self.in_flight = self.in_flight.saturating_sub(1);
    }

    pub fn builds_started(&self) -> usize {
        self.builds_started
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    /// Time spent since the tick started.
    pub fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.started_at)
    }
}
