//! Session lifecycle and the fixed-step loop.
//!
//! # Phases
//!
//! `Init -> Run -> (Pause -> Run)* -> End`. [`Orchestrator::start`] enters
//! `Init`, resolves configuration, seeds the random provider and begins a
//! session. After `End`, [`Orchestrator::begin_session`] starts a fresh
//! session from the same course start and seed.
//!
//! # Ticks
//!
//! Each tick, in order:
//!
//! 1. Advance the tick counter and the sim clock by exactly one interval.
//! 2. Push the new sim time into the scheduler and inventory.
//! 3. Tell the random provider about the tick boundary.
//! 4. Emit [`Event::Tick`].
//! 5. Call every [`TickConsumer`] in registration order.
//! 6. Call [`MetricsSink::end_tick`](crate::metrics::MetricsSink::end_tick).
//!
//! Sim time is `course_start + tick * interval`, never wall time. Wall time
//! only decides *how many* ticks [`Orchestrator::advance`] runs.

use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, error, info, trace, warn};

use crate::clock::{FixedStepTimer, Phase, SimClock};
use crate::config::{ResolvedSessionConfig, SessionConfig, cadence_for, clamp_speed_multiplier};
use crate::driver::{TickConsumer, TickInfo};
use crate::event::{Event, EventBus};
use crate::fixed::Ticks;
use crate::session::SessionContext;

#[derive(Debug)]
pub struct Orchestrator {
    config: SessionConfig,
    resolved: Option<ResolvedSessionConfig>,
    ctx: SessionContext,
    consumers: Vec<Box<dyn TickConsumer>>,
    phase: Phase,
    paused: bool,
    speed_multiplier: f64,
    clock: SimClock,
    timer: FixedStepTimer,
    events: EventBus,
}

impl Orchestrator {
    pub fn new(config: SessionConfig, ctx: SessionContext) -> Self {
        let placeholder = config.resolve(DateTime::<Utc>::UNIX_EPOCH);
        Self {
            speed_multiplier: placeholder.speed_multiplier,
            clock: SimClock::new(placeholder.course_start, placeholder.tick_interval_secs),
            timer: FixedStepTimer::new(placeholder.cadence()),
            events: EventBus::new(config.event_history),
            config,
            resolved: None,
            ctx,
            consumers: Vec::new(),
            phase: Phase::Init,
            paused: false,
        }
    }

    /// Register a consumer. Consumers run in registration order.
    pub fn add_consumer(&mut self, consumer: impl TickConsumer + 'static) {
        debug!("tick consumer '{}' registered", consumer.name());
        self.consumers.push(Box::new(consumer));
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Start with "now" as the default course start.
    pub fn start(&mut self) {
        self.start_at(Utc::now());
    }

    /// Enter `Init`, apply configuration defaults (using `now` only if no
    /// course start is configured), seed the random provider, signal
    /// readiness and begin the session.
    pub fn start_at(&mut self, now: DateTime<Utc>) {
        self.set_phase(Phase::Init);
        self.check_collaborators();

        let resolved = self.config.resolve(now);
        self.clock = SimClock::new(resolved.course_start, resolved.tick_interval_secs);
        self.speed_multiplier = resolved.speed_multiplier;
        if let Some(random) = self.ctx.random_mut() {
            random.initialize(resolved.seed);
        }
        info!(
            "simulation ready: course start {}, tick {} s, seed {}",
            resolved.course_start, resolved.tick_interval_secs, resolved.seed
        );
        self.events.emit(Event::SimulationReady {
            seed: resolved.seed,
        });
        self.resolved = Some(resolved);

        self.begin_session();
    }

    fn check_collaborators(&self) {
        if self.ctx.random().is_none() {
            error!("no random stream provider: draws will not be reproducible");
        }
        if self.ctx.scheduler().is_none() {
            warn!("no scheduler: work order scheduling unavailable");
        }
        if self.ctx.inventory().is_none() {
            warn!("no inventory: material tracking unavailable");
        }
        if self.ctx.metrics().is_none() {
            warn!("no metrics sink: production metrics unavailable");
        }
    }

    /// Reset to tick 0 at the course start, reseed, and start the timer.
    /// Returns `false` if a session is already running or the orchestrator
    /// was never started.
    pub fn begin_session(&mut self) -> bool {
        if self.phase == Phase::Run {
            warn!("begin session ignored: already running");
            return false;
        }
        let Some(seed) = self.resolved.as_ref().map(|r| r.seed) else {
            warn!("begin session ignored: orchestrator not started");
            return false;
        };

        self.paused = false;
        self.clock.reset();
        self.set_phase(Phase::Run);

        match self.ctx.random_mut() {
            Some(random) => {
                random.initialize(seed);
                random.begin_tick(0);
            }
            None => error!("session began without a random stream provider"),
        }
        self.push_time();

        self.events.emit(Event::SessionBegan { tick: 0 });
        self.timer
            .start(cadence_for(self.clock.tick_interval_secs(), self.speed_multiplier));

        let info = self.tick_info();
        for consumer in &mut self.consumers {
            consumer.on_begin_session(&mut self.ctx, &info);
        }
        info!("session began at {} (cadence {:?})", info.sim_time, self.timer.cadence());
        true
    }

    /// Run exactly one tick. Returns `false` (and does nothing) unless a
    /// session is running and not paused.
    pub fn step(&mut self) -> bool {
        if self.paused || self.phase != Phase::Run {
            trace!("tick skipped in phase {}", self.phase);
            return false;
        }
        self.on_tick();
        true
    }

    /// Feed elapsed wall time to the fixed-step timer and run every tick
    /// that came due. Returns the number of ticks run.
    pub fn advance(&mut self, wall_elapsed: Duration) -> u64 {
        if self.paused || self.phase != Phase::Run {
            return 0;
        }
        let due = self.timer.accumulate(wall_elapsed);
        let mut ran = 0;
        for _ in 0..due {
            if !self.step() {
                break;
            }
            ran += 1;
        }
        ran
    }

    /// Run `n` ticks back to back, ignoring cadence.
    pub fn run_ticks(&mut self, n: u64) -> u64 {
        let mut ran = 0;
        while ran < n && self.step() {
            ran += 1;
        }
        ran
    }

    fn on_tick(&mut self) {
        self.clock.advance();
        let tick = self.clock.tick();
        self.push_time();
        if let Some(random) = self.ctx.random_mut() {
            random.begin_tick(tick);
        }

        let info = self.tick_info();
        self.events.emit(Event::Tick {
            delta_secs: info.delta_secs,
            tick,
        });
        for consumer in &mut self.consumers {
            consumer.on_tick(&mut self.ctx, &info);
        }
        if let Some(metrics) = self.ctx.metrics_mut() {
            metrics.end_tick(tick);
        }
        trace!("tick {tick} at {} ({} consumers)", info.sim_time, self.consumers.len());
    }

    fn push_time(&mut self) {
        let now = self.clock.now();
        if let Some(scheduler) = self.ctx.scheduler_mut() {
            scheduler.set_time(now);
        }
        if let Some(inventory) = self.ctx.inventory_mut() {
            inventory.set_time(now);
        }
    }

    /// Freeze the loop, keeping tick count and sim clock. Only valid while
    /// running.
    pub fn pause(&mut self) -> bool {
        if self.paused || self.phase != Phase::Run {
            warn!("pause ignored: not running");
            return false;
        }
        self.paused = true;
        self.set_phase(Phase::Pause);
        self.events.emit(Event::SessionPaused {
            tick: self.clock.tick(),
        });
        self.timer.stop();
        info!("paused at {} (tick {})", self.clock.now(), self.clock.tick());
        true
    }

    /// Continue a paused session at the same cadence.
    pub fn resume(&mut self) -> bool {
        if !self.paused || self.phase != Phase::Pause {
            warn!("resume ignored: not paused");
            return false;
        }
        self.paused = false;
        self.set_phase(Phase::Run);
        self.events.emit(Event::SessionResumed {
            tick: self.clock.tick(),
        });
        self.timer
            .start(cadence_for(self.clock.tick_interval_secs(), self.speed_multiplier));
        info!("resumed at {} (tick {})", self.clock.now(), self.clock.tick());
        true
    }

    /// Change wall-clock playback speed. Floored at 0.25; the tick interval
    /// is never touched. A running timer restarts at the new cadence.
    pub fn set_sim_speed_multiplier(&mut self, multiplier: f64) {
        let clamped = clamp_speed_multiplier(multiplier);
        if (clamped - self.speed_multiplier).abs() < 1e-6 {
            return;
        }
        self.speed_multiplier = clamped;
        if let Some(resolved) = self.resolved.as_mut() {
            resolved.speed_multiplier = clamped;
        }
        if self.timer.is_active() {
            self.timer.stop();
            self.timer
                .start(cadence_for(self.clock.tick_interval_secs(), clamped));
        }
        debug!("speed multiplier {clamped} (cadence {:?})", self.timer.cadence());
    }

    /// Finish the session: stop the timer, let consumers finalize, flush
    /// metrics, move to `End`. Only valid from `Run` or `Pause`.
    pub fn end_session(&mut self) -> bool {
        if self.phase != Phase::Run && self.phase != Phase::Pause {
            warn!("end session ignored in phase {}", self.phase);
            return false;
        }
        self.timer.stop();

        let info = self.tick_info();
        for consumer in &mut self.consumers {
            consumer.on_end_session(&mut self.ctx, &info);
        }
        if let Some(metrics) = self.ctx.metrics_mut() {
            metrics.flush();
        }
        self.events.emit(Event::SessionEnded { tick: info.tick });

        self.paused = true;
        self.set_phase(Phase::End);
        info!("session ended at {} after {} ticks", info.sim_time, info.tick);
        true
    }

    pub fn stop(&mut self) -> bool {
        debug!("stop requested");
        self.end_session()
    }

    fn set_phase(&mut self, to: Phase) {
        let from = self.phase;
        self.phase = to;
        self.events.emit(Event::PhaseChanged { from, to });
    }

    fn tick_info(&self) -> TickInfo {
        TickInfo {
            delta_secs: self.clock.tick_interval_secs(),
            tick: self.clock.tick(),
            sim_time: self.clock.now(),
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn tick(&self) -> Ticks {
        self.clock.tick()
    }

    pub fn sim_time(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn clock(&self) -> &SimClock {
        &self.clock
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Effective configuration, once started.
    pub fn resolved(&self) -> Option<&ResolvedSessionConfig> {
        self.resolved.as_ref()
    }

    pub fn speed_multiplier(&self) -> f64 {
        self.speed_multiplier
    }

    pub fn cadence(&self) -> Duration {
        self.timer.cadence()
    }

    pub fn is_timer_active(&self) -> bool {
        self.timer.is_active()
    }

    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut SessionContext {
        &mut self.ctx
    }

    pub fn into_context(self) -> SessionContext {
        self.ctx
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut EventBus {
        &mut self.events
    }
}

// ===========================================================================
// Tests
// ===========================================================================
