//! Session configuration.
//!
//! [`SessionConfig`] is what a scenario file or host supplies; every field is
//! optional on disk. [`SessionConfig::resolve`] applies defaults and floors
//! and produces the [`ResolvedSessionConfig`] the orchestrator runs with.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::event::DEFAULT_HISTORY;

/// Smallest accepted tick interval, in seconds.
pub const MIN_TICK_INTERVAL_SECS: f64 = 0.01;
/// Largest accepted tick interval: one simulated day.
pub const MAX_TICK_INTERVAL_SECS: f64 = 86_400.0;
/// Smallest accepted playback speed multiplier.
pub const MIN_SPEED_MULTIPLIER: f64 = 0.25;
pub const DEFAULT_TICK_INTERVAL_SECS: f64 = 5.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Simulated seconds per tick.
    pub tick_interval_secs: f64,
    /// Simulation time at tick 0. `None` means "now" at start.
    pub course_start: Option<DateTime<Utc>>,
    /// Base random seed. `None` derives it from the course start.
    pub seed: Option<u32>,
    /// Wall-clock playback multiplier. Never changes the tick interval.
    pub speed_multiplier: f64,
    /// Per-kind event history kept by each component's event bus.
    pub event_history: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: DEFAULT_TICK_INTERVAL_SECS,
            course_start: None,
            seed: None,
            speed_multiplier: 1.0,
            event_history: DEFAULT_HISTORY,
        }
    }
}

impl SessionConfig {
    pub fn with_course_start(mut self, course_start: DateTime<Utc>) -> Self {
        self.course_start = Some(course_start);
        self
    }

    pub fn with_tick_interval(mut self, secs: f64) -> Self {
        self.tick_interval_secs = secs;
        self
    }

    pub fn with_seed(mut self, seed: u32) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Apply defaults and floors. `now` is only consulted when no course
    /// start was configured.
    pub fn resolve(&self, now: DateTime<Utc>) -> ResolvedSessionConfig {
        let course_start = self.course_start.unwrap_or(now);
        let tick_interval_secs = clamp_tick_interval(self.tick_interval_secs);
        if tick_interval_secs != self.tick_interval_secs {
            log::warn!(
                "tick interval {} s clamped to {} s",
                self.tick_interval_secs,
                tick_interval_secs
            );
        }
        ResolvedSessionConfig {
            tick_interval_secs,
            course_start,
            seed: self.seed.unwrap_or_else(|| seed_from_timestamp(course_start)),
            speed_multiplier: clamp_speed_multiplier(self.speed_multiplier),
            event_history: self.event_history,
        }
    }
}

/// Configuration with every default applied.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSessionConfig {
    pub tick_interval_secs: f64,
    pub course_start: DateTime<Utc>,
    pub seed: u32,
    pub speed_multiplier: f64,
    pub event_history: usize,
}

impl ResolvedSessionConfig {
    /// Wall time between ticks at the current speed multiplier.
    pub fn cadence(&self) -> Duration {
        cadence_for(self.tick_interval_secs, self.speed_multiplier)
    }
}

/// Deterministic seed from a timestamp: the low 31 bits of its Unix seconds.
pub fn seed_from_timestamp(ts: DateTime<Utc>) -> u32 {
    (ts.timestamp() & 0x7FFF_FFFF) as u32
}

/// Clamp into `[MIN_TICK_INTERVAL_SECS, MAX_TICK_INTERVAL_SECS]`. Non-finite
/// input falls back to the default.
pub fn clamp_tick_interval(secs: f64) -> f64 {
    if !secs.is_finite() {
        return DEFAULT_TICK_INTERVAL_SECS;
    }
    secs.clamp(MIN_TICK_INTERVAL_SECS, MAX_TICK_INTERVAL_SECS)
}

/// Floor at `MIN_SPEED_MULTIPLIER`. Non-finite input means normal speed.
pub fn clamp_speed_multiplier(m: f64) -> f64 {
    if !m.is_finite() {
        return 1.0;
    }
    m.max(MIN_SPEED_MULTIPLIER)
}

/// `tick_interval / multiplier` as a wall-clock duration, both clamped first.
pub fn cadence_for(tick_interval_secs: f64, multiplier: f64) -> Duration {
    let secs = clamp_tick_interval(tick_interval_secs) / clamp_speed_multiplier(multiplier);
    Duration::try_from_secs_f64(secs).unwrap_or(Duration::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 6, 7, 30, 0).unwrap()
    }

    #[test]
    fn defaults() {
        let cfg = SessionConfig::default();
        assert_eq!(cfg.tick_interval_secs, 5.0);
        assert_eq!(cfg.speed_multiplier, 1.0);
        assert!(cfg.course_start.is_none());
        assert!(cfg.seed.is_none());
    }

    #[test]
    fn resolve_fills_course_start_and_seed() {
        let resolved = SessionConfig::default().resolve(t0());
        assert_eq!(resolved.course_start, t0());
        assert_eq!(resolved.seed, seed_from_timestamp(t0()));
    }

    #[test]
    fn explicit_seed_wins() {
        let resolved = SessionConfig::default().with_seed(7).resolve(t0());
        assert_eq!(resolved.seed, 7);
    }

    #[test]
    fn floors_are_applied() {
        let cfg = SessionConfig {
            tick_interval_secs: 0.0001,
            speed_multiplier: 0.01,
            ..SessionConfig::default()
        };
        let resolved = cfg.resolve(t0());
        assert_eq!(resolved.tick_interval_secs, MIN_TICK_INTERVAL_SECS);
        assert_eq!(resolved.speed_multiplier, MIN_SPEED_MULTIPLIER);
    }

    #[test]
    fn seed_masks_sign_bit() {
        let far = Utc.with_ymd_and_hms(2100, 1, 1, 0, 0, 0).unwrap();
        assert!(seed_from_timestamp(far) <= 0x7FFF_FFFF);
    }

    #[test]
    fn cadence_scales_with_multiplier() {
        assert_eq!(cadence_for(5.0, 2.0), Duration::from_millis(2500));
        assert_eq!(cadence_for(1.0, 0.5), Duration::from_secs(2));
    }

    #[test]
    fn extreme_intervals_are_clamped() {
        assert_eq!(clamp_tick_interval(f64::INFINITY), DEFAULT_TICK_INTERVAL_SECS);
        assert_eq!(clamp_tick_interval(f64::NEG_INFINITY), DEFAULT_TICK_INTERVAL_SECS);
        assert_eq!(clamp_tick_interval(1e300), MAX_TICK_INTERVAL_SECS);
        assert_eq!(clamp_speed_multiplier(f64::INFINITY), 1.0);

        let cfg = SessionConfig::default().with_tick_interval(1e300);
        assert_eq!(cfg.resolve(t0()).tick_interval_secs, MAX_TICK_INTERVAL_SECS);

        assert_eq!(cadence_for(f64::INFINITY, 1.0), Duration::from_secs(5));
        assert_eq!(cadence_for(1e300, 0.0), Duration::from_secs(86_400 * 4));
        assert_eq!(cadence_for(5.0, f64::NAN), Duration::from_secs(5));
    }

    #[test]
    fn deserialize_partial_json() {
        let cfg: SessionConfig = serde_json::from_str(r#"{ "tick_interval_secs": 1.5 }"#).unwrap();
        assert_eq!(cfg.tick_interval_secs, 1.5);
        assert_eq!(cfg.speed_multiplier, 1.0);
    }
}
