//! Session phase, simulation clock, and the wall-clock fixed-step timer.
//!
//! The sim clock is a pure function of the tick counter:
//! `course_start + tick * tick_interval`. It never reads wall time, so two
//! runs with the same configuration see identical timestamps however fast
//! the host drives them. Wall time only enters through [`FixedStepTimer`],
//! which decides *when* to run the next tick, never *how far* it advances.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::fixed::Ticks;

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// Session phase. `Init → Run ⇄ Pause → End`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    Init,
    Run,
    Pause,
    End,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Phase::Init => "Init",
            Phase::Run => "Run",
            Phase::Pause => "Pause",
            Phase::End => "End",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// SimClock
// ---------------------------------------------------------------------------

/// Simulation time derived from the tick counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimClock {
    course_start: DateTime<Utc>,
    interval_nanos: i64,
    tick: Ticks,
}

impl SimClock {
    pub fn new(course_start: DateTime<Utc>, tick_interval_secs: f64) -> Self {
        Self {
            course_start,
            interval_nanos: (tick_interval_secs * 1e9).round() as i64,
            tick: 0,
        }
    }

    /// Rewind to tick 0 (the course start).
    pub fn reset(&mut self) {
        self.tick = 0;
    }

    /// Advance exactly one fixed interval.
    pub fn advance(&mut self) {
        self.tick += 1;
    }

    pub fn tick(&self) -> Ticks {
        self.tick
    }

    pub fn course_start(&self) -> DateTime<Utc> {
        self.course_start
    }

    pub fn tick_interval(&self) -> TimeDelta {
        TimeDelta::nanoseconds(self.interval_nanos)
    }

    pub fn tick_interval_secs(&self) -> f64 {
        self.interval_nanos as f64 / 1e9
    }

    /// Current simulation time.
    pub fn now(&self) -> DateTime<Utc> {
        let offset = self.interval_nanos.saturating_mul(self.tick as i64);
        self.course_start + TimeDelta::nanoseconds(offset)
    }

    /// Seconds of simulation time elapsed since the course start.
    pub fn elapsed_secs(&self) -> f64 {
        self.tick as f64 * self.tick_interval_secs()
    }
}

// ---------------------------------------------------------------------------
// FixedStepTimer
// ---------------------------------------------------------------------------

/// Wall-clock cadence driver.
///
/// The host feeds elapsed wall time into [`accumulate`](Self::accumulate);
/// the timer answers how many ticks are due and carries the remainder
/// forward. Stopping the timer discards any partial remainder.
#[derive(Debug, Clone)]
pub struct FixedStepTimer {
    cadence: Duration,
    accumulator: Duration,
    active: bool,
}

impl FixedStepTimer {
    pub fn new(cadence: Duration) -> Self {
        Self {
            cadence,
            accumulator: Duration::ZERO,
            active: false,
        }
    }

    /// (Re)start with a new cadence.
    pub fn start(&mut self, cadence: Duration) {
        self.cadence = cadence;
        self.accumulator = Duration::ZERO;
        self.active = true;
    }

    pub fn stop(&mut self) {
        self.active = false;
        self.accumulator = Duration::ZERO;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn cadence(&self) -> Duration {
        self.cadence
    }

    /// Add elapsed wall time; returns the number of ticks now due. An
    /// inactive timer, or one with a zero cadence, never fires.
    pub fn accumulate(&mut self, elapsed: Duration) -> u64 {
        if !self.active || self.cadence.is_zero() {
            return 0;
        }
        self.accumulator += elapsed;
        let mut due = 0;
        while self.accumulator >= self.cadence {
            self.accumulator -= self.cadence;
            due += 1;
        }
        due
    }
}

// ===========================================================================
// Tests
// ===========================================================================
