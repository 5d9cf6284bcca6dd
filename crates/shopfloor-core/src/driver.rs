//! The tick seam: anything that acts once per simulation step.
//!
//! Machine behavior drivers implement [`TickConsumer`] and are registered
//! with the orchestrator, which calls them in registration order with the
//! [`SessionContext`] and the tick that just began. Drivers pull whatever
//! state they need from the context; the orchestrator pushes nothing else.

use chrono::{DateTime, Utc};

use crate::fixed::Ticks;
use crate::session::SessionContext;

/// What a consumer learns about the step being run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickInfo {
    /// Fixed simulated seconds per tick.
    pub delta_secs: f64,
    pub tick: Ticks,
    /// Simulation time at this tick.
    pub sim_time: DateTime<Utc>,
}

/// A participant in the fixed-step loop.
///
/// Only `on_tick` is required; the session hooks default to no-ops.
pub trait TickConsumer: std::fmt::Debug {
    /// Human-readable name, used in logs.
    fn name(&self) -> &str;

    /// Called when a session begins, at tick 0.
    fn on_begin_session(&mut self, ctx: &mut SessionContext, info: &TickInfo) {
        let _ = (ctx, info);
    }

    fn on_tick(&mut self, ctx: &mut SessionContext, info: &TickInfo);

    /// Called when the session ends, with the final tick.
    fn on_end_session(&mut self, ctx: &mut SessionContext, info: &TickInfo) {
        let _ = (ctx, info);
    }
}
