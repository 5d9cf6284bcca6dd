//! Shared test helpers for unit tests, integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]`.

use std::cell::RefCell;
use std::rc::Rc;

use chrono::{DateTime, TimeZone, Utc};
use log::debug;

use crate::batch::BatchIdSource;
use crate::bom::BomEntry;
use crate::config::SessionConfig;
use crate::driver::{TickConsumer, TickInfo};
use crate::fixed::{Ticks, Volume, f64_to_fixed64};
use crate::id::*;
use crate::inventory::Inventory;
use crate::location::LocationType;
use crate::metrics::{MachineState, MetricsSink, WorkOrderEventKind};
use crate::orchestrator::Orchestrator;
use crate::random::{Channel, RandomStreams};
use crate::scheduler::{Scheduler, WorkOrder};
use crate::session::{SessionContext, SessionParts};

// ===========================================================================
// Scalars
// ===========================================================================

pub fn vol(v: f64) -> Volume {
    f64_to_fixed64(v)
}

/// Monday 2025-01-06 07:00 UTC.
pub fn course_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 6, 7, 0, 0).unwrap()
}

pub fn session_config() -> SessionConfig {
    SessionConfig::default()
        .with_course_start(course_start())
        .with_tick_interval(5.0)
}

// ===========================================================================
// Inventory fixtures
// ===========================================================================

pub const RAW_SKU: &str = "Steel_Bar";
pub const WAREHOUSE: &str = "Warehouse_A";
pub const FG_STORE: &str = "FG_Store";
pub const SCRAP_BIN: &str = "Scrap_Bin";

pub fn seeded_inventory(seed: u64) -> Inventory {
    Inventory::with_id_source(BatchIdSource::seeded(seed))
}

/// Warehouse, finished-goods store and scrap bin, with `units` of steel in
/// stock as ten equal batches (plus remainder in the last).
pub fn shop_inventory(units: u32) -> Inventory {
    let mut inv = seeded_inventory(0x5EED);
    inv.register_location(WAREHOUSE, LocationType::Warehouse, vol(10_000.0), 0);
    inv.register_location(FG_STORE, LocationType::Shipping, vol(10_000.0), 0);
    inv.register_location(SCRAP_BIN, LocationType::Scrap, Volume::ZERO, 0);
    let per_batch = (units / 10).max(1);
    let mut left = units;
    while left > 0 {
        let n = per_batch.min(left);
        inv.add_raw_material(RAW_SKU, n, WAREHOUSE, None, vol(0.5)).unwrap();
        left -= n;
    }
    inv
}

/// 2 x PartA + 1 x PartB -> 1 x Widget.
pub fn widget_bom() -> BomEntry {
    BomEntry::new("B1", "Widget")
        .with_input("PartA", 2)
        .with_input("PartB", 1)
        .with_output(1, vol(1.0))
}

// ===========================================================================
// Session fixtures
// ===========================================================================

/// Machines `M1..=Mn` registered, `orders` gear orders of `order_size`
/// units loaded, and a stocked shop inventory. The random provider is
/// reseeded from the session config at start.
pub fn shop_context(machines: usize, orders: i64, order_size: u32) -> SessionContext {
    let mut scheduler = Scheduler::new();
    for i in 1..=machines {
        scheduler.register_machine(format!("M{i}"));
    }
    scheduler.load_schedule((1..=orders).map(|id| WorkOrder::new(id, "Gear", order_size)));
    SessionContext::new()
        .with_random(RandomStreams::new(0))
        .with_scheduler(scheduler)
        .with_inventory(shop_inventory(orders as u32 * order_size * 2))
}

/// A started orchestrator with one [`TestMachineDriver`] per machine and
/// five-unit orders. Returns the decision logs in machine order.
pub fn shop_orchestrator(seed: u32, machines: usize, orders: i64) -> (Orchestrator, Vec<DecisionLog>) {
    let ctx = shop_context(machines, orders, 5);
    let mut orchestrator = Orchestrator::new(session_config().with_seed(seed), ctx);
    let mut logs = Vec::new();
    for i in 1..=machines {
        let driver = TestMachineDriver::new(format!("M{i}"));
        logs.push(driver.log());
        orchestrator.add_consumer(driver);
    }
    orchestrator.start_at(course_start());
    (orchestrator, logs)
}

// ===========================================================================
// Test machine driver
// ===========================================================================

/// One observable decision made by a [`TestMachineDriver`].
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Started(WorkOrderId),
    Starved(WorkOrderId),
    Jammed { ticks: i32 },
    Good,
    Scrap,
    Completed(WorkOrderId),
}

pub type DecisionLog = Rc<RefCell<Vec<(Ticks, Decision)>>>;

/// A minimal machine: pulls its next order, reserves steel for it, then
/// turns one unit per tick into a gear or scrap. Jams and quality are drawn
/// from keyed streams so the decisions are reproducible per seed.
#[derive(Debug)]
pub struct TestMachineDriver {
    machine: MachineId,
    /// Per-second jam rate.
    pub jam_rate: f64,
    /// Fraction of units scrapped.
    pub scrap_rate: f64,
    state: MachineState,
    current: Option<WorkOrderId>,
    remaining: u32,
    jam_ticks: i32,
    log: DecisionLog,
}

impl TestMachineDriver {
    pub fn new(machine: impl Into<MachineId>) -> Self {
        Self {
            machine: machine.into(),
            jam_rate: 0.01,
            scrap_rate: 0.1,
            state: MachineState::Idle,
            current: None,
            remaining: 0,
            jam_ticks: 0,
            log: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn log(&self) -> DecisionLog {
        Rc::clone(&self.log)
    }

    pub fn state(&self) -> MachineState {
        self.state
    }

    fn decide(&self, info: &TickInfo, decision: Decision) {
        self.log.borrow_mut().push((info.tick, decision));
    }

    fn change_state(&mut self, parts: &mut SessionParts<'_>, to: MachineState, info: &TickInfo) {
        if let Some(metrics) = &mut parts.metrics {
            metrics.record_state_change(&self.machine, self.state, to, info.sim_time);
        }
        self.state = to;
    }

    fn pick_up(&mut self, parts: &mut SessionParts<'_>, info: &TickInfo) {
        let (Some(scheduler), Some(inventory)) = (parts.scheduler.as_deref_mut(), parts.inventory.as_deref_mut())
        else {
            return;
        };
        if scheduler.next_for_machine(self.machine.as_str()).is_none() {
            scheduler.notify_machine_idle(self.machine.as_str());
        }
        let Some((id, quantity)) = scheduler
            .next_for_machine(self.machine.as_str())
            .map(|o| (o.id, o.quantity))
        else {
            return;
        };
        if inventory
            .reserve_material(RAW_SKU, quantity, WAREHOUSE, id, &self.machine)
            .is_err()
        {
            self.decide(info, Decision::Starved(id));
            return;
        }
        scheduler.start_work_order(id, &self.machine);
        self.current = Some(id);
        self.remaining = quantity;
        self.decide(info, Decision::Started(id));
        if let Some(metrics) = &mut parts.metrics {
            metrics.record_work_order_event(&self.machine, id, WorkOrderEventKind::Started, info.sim_time);
        }
        self.change_state(parts, MachineState::Processing, info);
    }

    fn work(&mut self, parts: &mut SessionParts<'_>, id: WorkOrderId, info: &TickInfo) {
        let key = self.machine.as_str();
        let (jam, good) = match parts.random.as_deref() {
            Some(random) => (
                random.bernoulli_event_in_step(key, Channel::FAILURES, self.jam_rate, info.delta_secs),
                random.uniform_float(key, Channel::QUALITY, 0.0, 1.0) >= self.scrap_rate,
            ),
            None => (false, true),
        };
        if jam {
            let ticks = parts
                .random
                .as_deref()
                .map_or(1, |r| r.uniform_int(key, Channel::TIMING, 1, 3));
            self.jam_ticks = ticks;
            self.decide(info, Decision::Jammed { ticks });
            if let Some(metrics) = &mut parts.metrics {
                metrics.record_jam(&self.machine, ticks as f64 * info.delta_secs, info.sim_time);
            }
            self.change_state(parts, MachineState::Jammed, info);
            return;
        }

        let Some(inventory) = parts.inventory.as_deref_mut() else {
            return;
        };
        if inventory.consume_reserved_material(&self.machine, id, RAW_SKU).is_err() {
            return;
        }
        let sku = Sku::from("Gear");
        if good {
            if inventory.produce_finished_good(&self.machine, id, &sku, FG_STORE).is_err() {
                return;
            }
            self.decide(info, Decision::Good);
            if let Some(metrics) = &mut parts.metrics {
                metrics.record_good_production(&self.machine, 1, &sku, info.sim_time);
            }
        } else {
            let scrap = Sku::from("Gear_Scrap");
            if inventory.produce_scrap(&self.machine, id, &scrap, SCRAP_BIN).is_err() {
                return;
            }
            self.decide(info, Decision::Scrap);
            if let Some(metrics) = &mut parts.metrics {
                metrics.record_scrap(&self.machine, 1, &scrap, info.sim_time);
            }
        }

        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining > 0 {
            return;
        }
        inventory.release_reservation(&self.machine, id);
        if let Some(scheduler) = parts.scheduler.as_deref_mut() {
            scheduler.complete_work_order(id);
        }
        self.current = None;
        self.decide(info, Decision::Completed(id));
        if let Some(metrics) = &mut parts.metrics {
            metrics.record_work_order_event(&self.machine, id, WorkOrderEventKind::Completed, info.sim_time);
        }
        self.change_state(parts, MachineState::Idle, info);
    }
}

impl TickConsumer for TestMachineDriver {
    fn name(&self) -> &str {
        self.machine.as_str()
    }

    fn on_begin_session(&mut self, _ctx: &mut SessionContext, _info: &TickInfo) {
        self.state = MachineState::Idle;
        self.current = None;
        self.remaining = 0;
        self.jam_ticks = 0;
        self.log.borrow_mut().clear();
    }

    fn on_tick(&mut self, ctx: &mut SessionContext, info: &TickInfo) {
        let mut parts = ctx.parts_mut();
        if self.jam_ticks > 0 {
            self.jam_ticks -= 1;
            if self.jam_ticks == 0 {
                self.change_state(&mut parts, MachineState::Processing, info);
            }
            return;
        }
        match self.current {
            None => self.pick_up(&mut parts, info),
            Some(id) => self.work(&mut parts, id, info),
        }
    }

    fn on_end_session(&mut self, _ctx: &mut SessionContext, info: &TickInfo) {
        debug!(
            "{} ended session after {} decisions (tick {})",
            self.machine,
            self.log.borrow().len(),
            info.tick
        );
    }
}

// ===========================================================================
// Recording metrics sink
// ===========================================================================

/// Metrics sink that records every call as a line of text.
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    pub lines: Rc<RefCell<Vec<String>>>,
}

impl RecordingSink {
    fn push(&self, line: String) {
        self.lines.borrow_mut().push(line);
    }
}

impl MetricsSink for RecordingSink {
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
        _at: DateTime<Utc>,
    ) {
        self.push(format!("state {machine} {from}->{to}"));
    }

    fn record_good_production(&mut self, machine: &MachineId, units: u32, sku: &Sku, _at: DateTime<Utc>) {
        self.push(format!("good {machine} {units} {sku}"));
    }

    fn record_scrap(&mut self, machine: &MachineId, units: u32, sku: &Sku, _at: DateTime<Utc>) {
        self.push(format!("scrap {machine} {units} {sku}"));
    }

    fn record_work_order_event(
        &mut self,
        machine: &MachineId,
        work_order: WorkOrderId,
        kind: WorkOrderEventKind,
        _at: DateTime<Utc>,
    ) {
        self.push(format!("{kind} {machine} {work_order}"));
    }

    fn record_changeover(
        &mut self,
        machine: &MachineId,
        from_sku: &Sku,
        to_sku: &Sku,
        duration_secs: f64,
        _at: DateTime<Utc>,
    ) {
        self.push(format!("changeover {machine} {from_sku}->{to_sku} {duration_secs}"));
    }

    fn record_jam(&mut self, machine: &MachineId, duration_secs: f64, _at: DateTime<Utc>) {
        self.push(format!("jam {machine} {duration_secs}"));
    }

    fn end_tick(&mut self, tick: u64) {
        self.push(format!("end_tick {tick}"));
    }

    fn flush(&mut self) {
        self.push("flush".to_string());
    }
}
