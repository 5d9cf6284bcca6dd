//! The concrete metrics sink: a bounded event buffer plus per-machine
//! aggregates.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use log::{debug, info, trace};
use serde::{Deserialize, Serialize};
use shopfloor_core::fixed::{Fixed64, Ticks};
use shopfloor_core::id::{MachineId, Sku, WorkOrderId};
use shopfloor_core::metrics::{MachineState, MetricsSink, WorkOrderEventKind};

use crate::window::{RingBuffer, RollingWindow};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsConfig {
    /// Maximum number of raw events kept; the oldest are dropped first.
    pub event_capacity: usize,
    /// Window size in ticks for rolling throughput.
    pub window_size: Ticks,
    /// Throughput snapshots kept per machine.
    pub history_capacity: usize,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            event_capacity: 10_000,
            window_size: 60,
            history_capacity: 256,
        }
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One raw telemetry record, as exported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricEvent {
    pub source: MachineId,
    pub event_type: String,
    pub value: f64,
    pub context: String,
    /// Simulation time the driver reported.
    pub timestamp: DateTime<Utc>,
}

/// Aggregated view of one machine. Times are in simulated seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineStats {
    pub machine: MachineId,
    pub good_units: u64,
    pub scrap_units: u64,
    pub completed_work_orders: u64,
    pub production_secs: f64,
    pub idle_secs: f64,
    pub changeover_secs: f64,
    /// Time spent jammed, in a minor stop, or broken down.
    pub jammed_secs: f64,
    pub jam_count: u64,
    pub current_state: MachineState,
    /// good / (good + scrap); 1.0 before anything was made.
    pub quality_rate: f64,
    /// Production time over all tracked time.
    pub utilization: f64,
    /// Utilization x quality rate.
    pub oee: f64,
}

impl MachineStats {
    fn empty(machine: MachineId) -> Self {
        Self {
            machine,
            good_units: 0,
            scrap_units: 0,
            completed_work_orders: 0,
            production_secs: 0.0,
            idle_secs: 0.0,
            changeover_secs: 0.0,
            jammed_secs: 0.0,
            jam_count: 0,
            current_state: MachineState::default(),
            quality_rate: 1.0,
            utilization: 0.0,
            oee: 0.0,
        }
    }

    pub fn tracked_secs(&self) -> f64 {
        self.production_secs + self.idle_secs + self.changeover_secs + self.jammed_secs
    }

    /// Fill in quality rate, utilization and OEE from the raw counters.
    fn derive(&mut self) {
        let made = self.good_units + self.scrap_units;
        if made > 0 {
            self.quality_rate = self.good_units as f64 / made as f64;
        }
        let tracked = self.tracked_secs();
        if tracked > 0.0 {
            self.utilization = self.production_secs / tracked;
            self.oee = self.utilization * self.quality_rate;
        }
    }
}

#[derive(Debug, Clone)]
struct MachineTracker {
    stats: MachineStats,
    /// When the current state was entered.
    state_since: Option<DateTime<Utc>>,
    good_per_tick: RollingWindow,
    throughput_history: RingBuffer<Fixed64>,
}

impl MachineTracker {
    fn new(machine: MachineId, config: &StatsConfig) -> Self {
        Self {
            stats: MachineStats::empty(machine),
            state_since: None,
            good_per_tick: RollingWindow::new(config.window_size.max(1) as usize),
            throughput_history: RingBuffer::new(config.history_capacity.max(1)),
        }
    }

    fn close_state(&mut self, from: MachineState, at: DateTime<Utc>) {
        let Some(since) = self.state_since else {
            return;
        };
        let secs = (at - since).num_milliseconds().max(0) as f64 / 1000.0;
        let stats = &mut self.stats;
        match from {
            MachineState::Processing => stats.production_secs += secs,
            MachineState::Idle => stats.idle_secs += secs,
            MachineState::Changeover => stats.changeover_secs += secs,
            s if s.is_down() => stats.jammed_secs += secs,
            _ => {}
        }
    }

    fn end_tick(&mut self) {
        self.throughput_history.push(self.good_per_tick.rate());
        self.good_per_tick.commit();
    }
}

// ---------------------------------------------------------------------------
// MetricsRecorder
// ---------------------------------------------------------------------------

/// Collects driver telemetry into a bounded buffer of [`MetricEvent`]s and
/// per-machine [`MachineStats`].
#[derive(Debug)]
pub struct MetricsRecorder {
    config: StatsConfig,
    events: RingBuffer<MetricEvent>,
    machines: BTreeMap<MachineId, MachineTracker>,
    current_tick: Ticks,
    dropped: u64,
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new(StatsConfig::default())
    }
}

impl MetricsRecorder {
    pub fn new(config: StatsConfig) -> Self {
        Self {
            events: RingBuffer::new(config.event_capacity.max(1)),
            config,
            machines: BTreeMap::new(),
            current_tick: 0,
            dropped: 0,
        }
    }

    pub fn config(&self) -> &StatsConfig {
        &self.config
    }

    /// Last tick closed by [`MetricsSink::end_tick`].
    pub fn current_tick(&self) -> Ticks {
        self.current_tick
    }

    // -- Queries ------------------------------------------------------------

    /// Buffered events, oldest first.
    pub fn events(&self) -> impl Iterator<Item = &MetricEvent> {
        self.events.iter()
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    /// Events evicted because the buffer was full.
    pub fn dropped_events(&self) -> u64 {
        self.dropped
    }

    pub fn machine_events(&self, machine: &str) -> Vec<&MetricEvent> {
        self.events
            .iter()
            .filter(|e| e.source.as_str() == machine)
            .collect()
    }

    /// Aggregates for one machine. Unknown machines get empty stats.
    pub fn machine_stats(&self, machine: &str) -> MachineStats {
        match self.machines.get(machine) {
            Some(tracker) => {
                let mut stats = tracker.stats.clone();
                stats.derive();
                stats
            }
            None => MachineStats::empty(MachineId::new(machine)),
        }
    }

    /// Aggregates for every machine seen, in id order.
    pub fn all_machine_stats(&self) -> Vec<MachineStats> {
        self.machines
            .keys()
            .map(|m| self.machine_stats(m.as_str()))
            .collect()
    }

    /// Good units per tick over the rolling window.
    pub fn throughput(&self, machine: &str) -> Fixed64 {
        self.machines
            .get(machine)
            .map(|t| t.good_per_tick.rate())
            .unwrap_or(Fixed64::ZERO)
    }

    /// Throughput snapshot taken at each tick end, oldest first.
    pub fn throughput_history(&self, machine: &str) -> Vec<Fixed64> {
        self.machines
            .get(machine)
            .map(|t| t.throughput_history.to_vec())
            .unwrap_or_default()
    }

    pub fn tracked_machine_count(&self) -> usize {
        self.machines.len()
    }

    /// Forget every event and aggregate.
    pub fn clear(&mut self) {
        self.events.clear();
        self.machines.clear();
        self.current_tick = 0;
        self.dropped = 0;
    }

    // -- Internal helpers ---------------------------------------------------

    fn add_event(
        &mut self,
        source: &MachineId,
        event_type: &str,
        value: f64,
        context: String,
        at: DateTime<Utc>,
    ) {
        let overwrote = self.events.push(MetricEvent {
            source: source.clone(),
            event_type: event_type.to_string(),
            value,
            context,
            timestamp: at,
        });
        if overwrote {
            self.dropped += 1;
        }
    }

    fn tracker(&mut self, machine: &MachineId) -> &mut MachineTracker {
        let config = &self.config;
        self.machines
            .entry(machine.clone())
            .or_insert_with(|| MachineTracker::new(machine.clone(), config))
    }
}

impl MetricsSink for MetricsRecorder {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }

    fn record_state_change(
        &mut self,
        machine: &MachineId,
        from: MachineState,
        to: MachineState,
        at: DateTime<Utc>,
    ) {
        let context = format!("{from} → {to}");
        trace!("{machine} state change: {context}");
        self.add_event(machine, "StateChange", 0.0, context, at);

        let tracker = self.tracker(machine);
        tracker.close_state(from, at);
        tracker.stats.current_state = to;
        tracker.state_since = Some(at);
    }

    fn record_good_production(&mut self, machine: &MachineId, units: u32, sku: &Sku, at: DateTime<Utc>) {
        trace!("{machine} produced {units} good {sku}");
        self.add_event(machine, "Production", units as f64, sku.to_string(), at);
        let tracker = self.tracker(machine);
        tracker.stats.good_units += units as u64;
        tracker.good_per_tick.add(units as u64);
    }

    fn record_scrap(&mut self, machine: &MachineId, units: u32, sku: &Sku, at: DateTime<Utc>) {
        trace!("{machine} scrapped {units} {sku}");
        self.add_event(machine, "Scrap", units as f64, sku.to_string(), at);
        self.tracker(machine).stats.scrap_units += units as u64;
    }

    fn record_work_order_event(
        &mut self,
        machine: &MachineId,
        work_order: WorkOrderId,
        kind: WorkOrderEventKind,
        at: DateTime<Utc>,
    ) {
        trace!("{machine} work order event: {kind} (WO {work_order})");
        self.add_event(machine, kind.as_str(), work_order.0 as f64, format!("WO_{work_order}"), at);
        if kind == WorkOrderEventKind::Completed {
            self.tracker(machine).stats.completed_work_orders += 1;
        }
    }

    fn record_changeover(
        &mut self,
        machine: &MachineId,
        from_sku: &Sku,
        to_sku: &Sku,
        duration_secs: f64,
        at: DateTime<Utc>,
    ) {
        let context = format!("{from_sku} → {to_sku}");
        trace!("{machine} changeover: {context} ({duration_secs:.1}s)");
        self.add_event(machine, "Changeover", duration_secs, context, at);
        self.tracker(machine);
    }

    fn record_jam(&mut self, machine: &MachineId, duration_secs: f64, at: DateTime<Utc>) {
        trace!("{machine} jammed for {duration_secs:.1} seconds");
        self.add_event(machine, "Jam", duration_secs, String::new(), at);
        self.tracker(machine).stats.jam_count += 1;
    }

    fn end_tick(&mut self, tick: u64) {
        self.current_tick = tick;
        for tracker in self.machines.values_mut() {
            tracker.end_tick();
        }
    }

    /// Log every buffered event. The buffer is kept for later queries.
    fn flush(&mut self) {
        if self.events.is_empty() {
            debug!("metrics flush skipped (buffer empty)");
            return;
        }
        for e in self.events.iter() {
            info!(
                "[metrics] {} | {} | {:.2} | {} | {}",
                e.source,
                e.event_type,
                e.value,
                e.context,
                e.timestamp.to_rfc3339()
            );
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================
