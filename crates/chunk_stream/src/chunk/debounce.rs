//! Debounced remesh requests for bursts of single-cell edits.
//!
//! Each chunk owns at most one live timer. Re-arming a key cancels the old
//! timer synchronously and issues a fresh [`TimerToken`], so a replaced timer
//! can never fire. Timers are plain deadlines polled by the tick loop through
//! [`EditDebouncer::fire_due`]; nothing runs in the background.

use std::collections::HashMap;

use log::trace;
use web_time::{Duration, Instant};

use super::coord::ChunkCoord;
use super::state::BoundaryFlags;

/// Default quiet interval before a remesh request is released.
pub const DEFAULT_DEBOUNCE_INTERVAL: Duration = Duration::from_millis(150);

/// Identity of one armed timer. Tokens are never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerToken(u64);

#[derive(Clone, Copy, Debug)]
struct Timer {
    token: TimerToken,
    due: Instant,
}

/// Table of per-chunk debounce timers.
#[derive(Debug)]
pub struct EditDebouncer {
    interval: Duration,
    timers: HashMap<ChunkCoord, Timer>,
    next_token: u64,
    cancelled: u64,
}

impl Default for EditDebouncer {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE_INTERVAL)
    }
}

impl EditDebouncer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            timers: HashMap::new(),
            next_token: 0,
            cancelled: 0,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Change the quiet interval. Already armed timers keep their deadline.
    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
    }

    /// Arm (or re-arm) the timer for `coord`, due one interval after `now`.
    pub fn schedule(&mut self, coord: ChunkCoord, now: Instant) -> TimerToken {
        self.cancel(coord);

        let token = TimerToken(self.next_token);
        self.next_token += 1;
        self.timers.insert(coord, Timer { token, due: now + self.interval });
        token
    }

    /// Arm the edited chunk and, independently, every neighbor sharing a
    /// touched boundary face.
    pub fn schedule_edit(&mut self, coord: ChunkCoord, boundary: BoundaryFlags, now: Instant) -> Vec<ChunkCoord> {
        let mut armed = Vec::with_capacity(1 + boundary.count());
        self.schedule(coord, now);
        armed.push(coord);

        for [dx, dz] in boundary.affected_neighbors() {
            let neighbor = coord.offset(dx, dz);
            self.schedule(neighbor, now);
            armed.push(neighbor);
        }
        armed
    }

    /// Cancel the live timer for `coord`. Returns true if one was armed.
    pub fn cancel(&mut self, coord: ChunkCoord) -> bool {
        if self.timers.remove(&coord).is_some() {
            self.cancelled += 1;
            true
        } else {
            false
        }
    }

    /// Whether `coord` has a live timer.
    pub fn is_armed(&self, coord: ChunkCoord) -> bool {
        self.timers.contains_key(&coord)
    }

    /// Whether `token` is still the live timer for `coord`.
    pub fn is_live(&self, coord: ChunkCoord, token: TimerToken) -> bool {
        self.timers.get(&coord).is_some_and(|t| t.token == token)
    }

    /// Deadline of the live timer for `coord`.
    pub fn deadline(&self, coord: ChunkCoord) -> Option<Instant> {
        self.timers.get(&coord).map(|t| t.due)
    }

    /// Earliest deadline across all live timers.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.values().map(|t| t.due).min()
    }

    /// Remove and return every timer due at or before `now`, in deadline order.
    pub fn fire_due(&mut self, now: Instant) -> Vec<ChunkCoord> {
        let mut due: Vec<(Instant, TimerToken, ChunkCoord)> = self
            .timers
            .iter()
            .filter(|(_, t)| t.due <= now)
            .map(|(&coord, t)| (t.due, t.token, coord))
            .collect();
        due.sort_unstable_by_key(|&(at, token, _)| (at, token));

        for &(_, token, coord) in &due {
            self.timers.remove(&coord);
            trace!("debounce timer {:?} fired for chunk {}", token, coord);
        }
        due.into_iter().map(|(_, _, coord)| coord).collect()
    }

    /// Number of live timers.
    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// Total timers cancelled, including ones replaced by a re-arm.
    pub fn cancelled_count(&self) -> u64 {
        self.cancelled
    }

    /// Cancel every live timer.
    pub fn clear(&mut self) {
        self.cancelled += self.timers.len() as u64;
        self.timers.clear();
    }
}
