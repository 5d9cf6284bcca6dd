//! FIFO work order scheduling across registered machines.
//!
//! New orders enter a global pending pool. An order leaves the pool only
//! when a machine is idle and asks for work, which happens when:
//!
//! - the machine registers,
//! - an order arrives while the machine is idle,
//! - the machine completes an order or calls
//!   [`Scheduler::notify_machine_idle`].
//!
//! The pool is strictly first in, first out. `priority` is carried on every
//! order but never reorders the pool.
//!
//! A machine is idle when none of its orders is `Queued` or `Running`.
//! Unknown ids are expected conditions: operations return `false`/`None` and
//! log a warning rather than erroring.

use std::collections::{BTreeMap, HashMap, VecDeque};

use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::event::{DEFAULT_HISTORY, Event, EventBus};
use crate::id::{MachineId, OperatorId, Sku, WorkOrderId};

// ---------------------------------------------------------------------------
// Work orders
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum WorkOrderStatus {
    #[default]
    OnHold,
    Created,
    Assigned,
    Ready,
    Queued,
    Running,
    Completed,
    Cancelled,
}

impl WorkOrderStatus {
    /// Occupies a machine.
    pub fn is_active(self) -> bool {
        matches!(self, WorkOrderStatus::Queued | WorkOrderStatus::Running)
    }

    pub fn is_finished(self) -> bool {
        matches!(self, WorkOrderStatus::Completed | WorkOrderStatus::Cancelled)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum WorkOrderPriority {
    #[default]
    None,
    Low,
    Medium,
    High,
    Expedited,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum UnitOfMeasure {
    #[default]
    Each,
    Kilogram,
    Liter,
    Meter,
    Second,
    Pack,
    Carton,
    Case,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkOrder {
    pub id: WorkOrderId,
    pub sku: Sku,
    pub quantity: u32,
    #[serde(default)]
    pub unit: UnitOfMeasure,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub finish_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: WorkOrderStatus,
    #[serde(default)]
    pub priority: WorkOrderPriority,
    #[serde(default)]
    pub cost: f64,
    /// Machine the order is queued on or running at.
    #[serde(default)]
    pub machine: Option<MachineId>,
}

impl WorkOrder {
    pub fn new(id: i64, sku: impl Into<Sku>, quantity: u32) -> Self {
        Self {
            id: WorkOrderId(id),
            sku: sku.into(),
            quantity,
            unit: UnitOfMeasure::Each,
            due_date: None,
            start_date: None,
            finish_date: None,
            status: WorkOrderStatus::OnHold,
            priority: WorkOrderPriority::None,
            cost: 0.0,
            machine: None,
        }
    }

    pub fn with_due_date(mut self, due: DateTime<Utc>) -> Self {
        self.due_date = Some(due);
        self
    }

    pub fn with_priority(mut self, priority: WorkOrderPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_unit(mut self, unit: UnitOfMeasure) -> Self {
        self.unit = unit;
        self
    }

    pub fn with_cost(mut self, cost: f64) -> Self {
        self.cost = cost;
        self
    }

    /// Due strictly before `now` and not yet finished.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        !self.status.is_finished() && self.due_date.is_some_and(|due| due < now)
    }
}

// ---------------------------------------------------------------------------
// Operators
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorState {
    pub id: OperatorId,
    pub machine: Option<MachineId>,
    pub busy: bool,
}

// ---------------------------------------------------------------------------
// Assignment sink
// ---------------------------------------------------------------------------

/// Receives every order assigned to one machine, right after the
/// assignment is recorded.
///
/// Any `FnMut(&WorkOrder)` closure is a sink.
pub trait MachineAssignmentSink {
    fn on_assigned(&mut self, order: &WorkOrder);
}

impl<F: FnMut(&WorkOrder)> MachineAssignmentSink for F {
    fn on_assigned(&mut self, order: &WorkOrder) {
        self(order)
    }
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

pub struct Scheduler {
    orders: BTreeMap<WorkOrderId, WorkOrder>,
    /// Unassigned orders in arrival order.
    pending: VecDeque<WorkOrderId>,
    /// Registered machines in registration order.
    machines: Vec<MachineId>,
    queues: HashMap<MachineId, VecDeque<WorkOrderId>>,
    sinks: HashMap<MachineId, Box<dyn MachineAssignmentSink>>,
    operators: BTreeMap<OperatorId, OperatorState>,
    now: DateTime<Utc>,
    events: EventBus,
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("orders", &self.orders.len())
            .field("pending", &self.pending)
            .field("machines", &self.machines)
            .field("sinks", &self.sinks.len())
            .field("operators", &self.operators.len())
            .field("now", &self.now)
            .finish()
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            orders: BTreeMap::new(),
            pending: VecDeque::new(),
            machines: Vec::new(),
            queues: HashMap::new(),
            sinks: HashMap::new(),
            operators: BTreeMap::new(),
            now: DateTime::<Utc>::UNIX_EPOCH,
            events: EventBus::new(DEFAULT_HISTORY),
        }
    }

    pub fn with_event_history(mut self, capacity: usize) -> Self {
        self.events = EventBus::new(capacity);
        self
    }

    /// Simulation time stamped on start and finish dates.
    pub fn set_time(&mut self, now: DateTime<Utc>) {
        self.now = now;
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut EventBus {
        &mut self.events
    }

    // -----------------------------------------------------------------------
    // Machines
    // -----------------------------------------------------------------------

    /// Register a machine and hand it the oldest pending order, if any.
    /// Returns `false` if it was already registered.
    pub fn register_machine(&mut self, machine: impl Into<MachineId>) -> bool {
        let machine = machine.into();
        if self.queues.contains_key(&machine) {
            return false;
        }
        debug!("machine {machine} registered");
        self.queues.insert(machine.clone(), VecDeque::new());
        self.machines.push(machine.clone());
        self.try_assign(&machine);
        true
    }

    /// Deliver future assignments for `machine` to `sink`, replacing any
    /// earlier sink.
    pub fn set_assignment_sink(
        &mut self,
        machine: impl Into<MachineId>,
        sink: impl MachineAssignmentSink + 'static,
    ) {
        self.sinks.insert(machine.into(), Box::new(sink));
    }

    pub fn is_machine_registered(&self, machine: &str) -> bool {
        self.queues.contains_key(machine)
    }

    pub fn machines(&self) -> &[MachineId] {
        &self.machines
    }

    pub fn is_machine_idle(&self, machine: &str) -> bool {
        self.queues.get(machine).is_some_and(|queue| {
            queue
                .iter()
                .all(|id| self.orders.get(id).is_none_or(|o| !o.status.is_active()))
        })
    }

    /// A machine asks for work. Returns the order it was given, if any.
    pub fn notify_machine_idle(&mut self, machine: &str) -> Option<WorkOrderId> {
        let Some(machine) = self.machines.iter().find(|m| m.as_str() == machine).cloned() else {
            warn!("idle notification from unregistered machine {machine}");
            return None;
        };
        self.try_assign(&machine)
    }

    // -----------------------------------------------------------------------
    // Orders
    // -----------------------------------------------------------------------

    /// Put an order in the pending pool and assign it straight away if a
    /// machine is idle. An order with an existing id replaces the old one.
    pub fn add_work_order(&mut self, mut order: WorkOrder) {
        let id = order.id;
        if self.orders.contains_key(&id) {
            warn!("work order {id} resubmitted; replacing");
            self.detach(id);
        }
        order.status = WorkOrderStatus::Created;
        order.machine = None;
        self.orders.insert(id, order);
        self.pending.push_back(id);
        debug!("work order {id} pending ({} in pool)", self.pending.len());
        self.assign_pending();
    }

    pub fn load_schedule(&mut self, orders: impl IntoIterator<Item = WorkOrder>) {
        for order in orders {
            self.add_work_order(order);
        }
    }

    /// Forget an order entirely. Returns `false` if the id is unknown.
    pub fn remove_work_order(&mut self, id: WorkOrderId) -> bool {
        if self.orders.remove(&id).is_none() {
            warn!("remove: unknown work order {id}");
            return false;
        }
        self.detach(id);
        true
    }

    /// Mark an order running on `machine`. Pulls it out of the pending pool
    /// or another machine's queue if needed; a machine left idle by the move
    /// is offered the next pending order. An unregistered machine is
    /// registered on the spot.
    pub fn start_work_order(&mut self, id: WorkOrderId, machine: impl Into<MachineId>) -> bool {
        let machine = machine.into();
        let Some(status) = self.orders.get(&id).map(|o| o.status) else {
            warn!("start: unknown work order {id}");
            return false;
        };
        if status.is_finished() {
            warn!("start: work order {id} is already {status:?}");
            return false;
        }

        if !self.queues.contains_key(&machine) {
            debug!("machine {machine} registered by start of work order {id}");
            self.machines.push(machine.clone());
        }
        self.detach(id);
        self.queues.entry(machine.clone()).or_default().push_back(id);

        let mut previous = None;
        if let Some(order) = self.orders.get_mut(&id) {
            previous = order.machine.replace(machine.clone()).filter(|m| *m != machine);
            order.status = WorkOrderStatus::Running;
            order.start_date = Some(self.now);
        }
        debug!("work order {id} running on {machine}");
        self.events.emit(Event::WorkOrderStarted { order: id, machine });
        if let Some(previous) = previous {
            self.try_assign(&previous);
        }
        true
    }

    /// Mark an order done and hand its machine the next pending order.
    pub fn complete_work_order(&mut self, id: WorkOrderId) -> bool {
        self.finish(id, WorkOrderStatus::Completed)
    }

    /// Like [`Scheduler::complete_work_order`] but records `Cancelled`.
    pub fn cancel_work_order(&mut self, id: WorkOrderId) -> bool {
        self.finish(id, WorkOrderStatus::Cancelled)
    }

    fn finish(&mut self, id: WorkOrderId, status: WorkOrderStatus) -> bool {
        let Some(order) = self.orders.get_mut(&id) else {
            warn!("{status:?}: unknown work order {id}");
            return false;
        };
        if order.status.is_finished() {
            warn!("{status:?}: work order {id} is already {:?}", order.status);
            return false;
        }
        order.status = status;
        order.finish_date = Some(self.now);
        let machine = order.machine.clone();
        self.detach(id);

        debug!("work order {id} {status:?}");
        if status == WorkOrderStatus::Completed {
            self.events.emit(Event::WorkOrderCompleted {
                order: id,
                machine: machine.clone(),
            });
        }
        if let Some(machine) = machine {
            self.try_assign(&machine);
        }
        true
    }

    /// Drop `id` from the pool and every machine queue.
    fn detach(&mut self, id: WorkOrderId) {
        self.pending.retain(|&p| p != id);
        for queue in self.queues.values_mut() {
            queue.retain(|&q| q != id);
        }
    }

    /// Hand the oldest pending order to `machine` if it is idle.
    fn try_assign(&mut self, machine: &MachineId) -> Option<WorkOrderId> {
        if !self.is_machine_idle(machine.as_str()) {
            return None;
        }
        let id = loop {
            let id = self.pending.pop_front()?;
            if self.orders.contains_key(&id) {
                break id;
            }
        };

        self.queues.entry(machine.clone()).or_default().push_back(id);
        let order = self.orders.get_mut(&id)?;
        order.status = WorkOrderStatus::Queued;
        order.machine = Some(machine.clone());
        debug!("work order {id} assigned to {machine}");

        self.events.emit(Event::WorkOrderAssigned {
            order: id,
            machine: machine.clone(),
        });
        if let Some(sink) = self.sinks.get_mut(machine) {
            sink.on_assigned(order);
        }
        Some(id)
    }

    /// Offer pending orders to idle machines in registration order.
    fn assign_pending(&mut self) {
        for i in 0..self.machines.len() {
            if self.pending.is_empty() {
                break;
            }
            let machine = self.machines[i].clone();
            self.try_assign(&machine);
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn work_order(&self, id: WorkOrderId) -> Option<&WorkOrder> {
        self.orders.get(&id)
    }

    /// The first queued (not yet running) order on `machine`.
    pub fn next_for_machine(&self, machine: &str) -> Option<&WorkOrder> {
        self.queues
            .get(machine)?
            .iter()
            .filter_map(|id| self.orders.get(id))
            .find(|o| o.status == WorkOrderStatus::Queued)
    }

    /// Queued and running orders on `machine`, queue order.
    pub fn active_for_machine(&self, machine: &str) -> Vec<&WorkOrder> {
        self.queues.get(machine).map_or_else(Vec::new, |queue| {
            queue
                .iter()
                .filter_map(|id| self.orders.get(id))
                .filter(|o| o.status.is_active())
                .collect()
        })
    }

    /// Every known order, by id.
    pub fn schedule(&self) -> Vec<&WorkOrder> {
        self.orders.values().collect()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Unfinished orders whose due date is strictly before `now`.
    pub fn overdue_orders(&self, now: DateTime<Utc>) -> Vec<&WorkOrder> {
        self.orders.values().filter(|o| o.is_overdue(now)).collect()
    }

    // -----------------------------------------------------------------------
    // Operators
    // -----------------------------------------------------------------------

    pub fn register_operator(&mut self, operator: impl Into<OperatorId>) {
        let operator = operator.into();
        self.operators
            .entry(operator.clone())
            .or_insert_with(|| OperatorState {
                id: operator,
                machine: None,
                busy: false,
            });
    }

    /// Bind an operator to a machine, moving them if they were elsewhere.
    /// Already bound to the same machine is a no-op that still succeeds.
    pub fn assign_operator(
        &mut self,
        operator: impl Into<OperatorId>,
        machine: impl Into<MachineId>,
    ) -> bool {
        let operator = operator.into();
        let machine = machine.into();
        let state = self
            .operators
            .entry(operator.clone())
            .or_insert_with(|| OperatorState {
                id: operator.clone(),
                machine: None,
                busy: false,
            });
        if state.busy && state.machine.as_ref() == Some(&machine) {
            return true;
        }
        state.machine = Some(machine.clone());
        state.busy = true;
        debug!("operator {operator} assigned to {machine}");
        self.events.emit(Event::OperatorAssigned { operator, machine });
        true
    }

    /// Returns `false` if the operator was never seen.
    pub fn release_operator(&mut self, operator: &str) -> bool {
        let Some(state) = self.operators.get_mut(operator) else {
            warn!("release: unknown operator {operator}");
            return false;
        };
        state.machine = None;
        state.busy = false;
        let operator = state.id.clone();
        debug!("operator {operator} released");
        self.events.emit(Event::OperatorReleased { operator });
        true
    }

    pub fn operator(&self, operator: &str) -> Option<&OperatorState> {
        self.operators.get(operator)
    }

    pub fn operators(&self) -> impl Iterator<Item = &OperatorState> {
        self.operators.values()
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;
    use chrono::TimeZone;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn wo(id: i64) -> WorkOrder {
        WorkOrder::new(id, "Gear", 10)
    }

    fn t(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, hour, 0, 0).unwrap()
    }

    #[test]
    fn order_waits_in_pool_until_a_machine_registers() {
        let mut s = Scheduler::new();
        s.add_work_order(wo(1));
        assert_eq!(s.pending_count(), 1);
        assert_eq!(s.work_order(WorkOrderId(1)).unwrap().status, WorkOrderStatus::Created);

        assert!(s.register_machine("M1"));
        assert_eq!(s.pending_count(), 0);
        let order = s.next_for_machine("M1").unwrap();
        assert_eq!(order.id, WorkOrderId(1));
        assert_eq!(order.status, WorkOrderStatus::Queued);
        assert_eq!(order.machine, Some(MachineId::from("M1")));
    }

    #[test]
    fn register_machine_is_idempotent() {
        let mut s = Scheduler::new();
        assert!(s.register_machine("M1"));
        assert!(!s.register_machine("M1"));
        assert_eq!(s.machines().len(), 1);
    }

    #[test]
    fn busy_machine_takes_no_second_order() {
        let mut s = Scheduler::new();
        s.register_machine("M1");
        s.load_schedule([wo(1), wo(2)]);
        assert_eq!(s.active_for_machine("M1").len(), 1);
        assert_eq!(s.pending_count(), 1);
        assert!(!s.is_machine_idle("M1"));
    }

    #[test]
    fn arrivals_spread_over_idle_machines_in_registration_order() {
        let mut s = Scheduler::new();
        s.register_machine("M1");
        s.register_machine("M2");
        s.load_schedule([wo(1), wo(2), wo(3)]);
        assert_eq!(s.next_for_machine("M1").unwrap().id, WorkOrderId(1));
        assert_eq!(s.next_for_machine("M2").unwrap().id, WorkOrderId(2));
        assert_eq!(s.pending_count(), 1);
    }

    #[test]
    fn completion_pulls_the_oldest_pending_order() {
        let mut s = Scheduler::new();
        s.register_machine("M1");
        s.load_schedule([wo(1), wo(2), wo(3), wo(4)]);
        assert_eq!(s.pending_count(), 3);

        s.set_time(t(8));
        assert!(s.start_work_order(WorkOrderId(1), "M1"));
        s.set_time(t(9));
        assert!(s.complete_work_order(WorkOrderId(1)));

        let done = s.work_order(WorkOrderId(1)).unwrap();
        assert_eq!(done.status, WorkOrderStatus::Completed);
        assert_eq!(done.start_date, Some(t(8)));
        assert_eq!(done.finish_date, Some(t(9)));

        assert_eq!(s.next_for_machine("M1").unwrap().id, WorkOrderId(2));
        assert_eq!(s.pending_count(), 2);
    }

    #[test]
    fn priority_does_not_reorder_the_pool() {
        let mut s = Scheduler::new();
        s.add_work_order(wo(1).with_priority(WorkOrderPriority::Low));
        s.add_work_order(wo(2).with_priority(WorkOrderPriority::Expedited));
        s.register_machine("M1");
        assert_eq!(s.next_for_machine("M1").unwrap().id, WorkOrderId(1));
    }

    #[test]
    fn unknown_ids_return_false() {
        let mut s = Scheduler::new();
        s.register_machine("M1");
        assert!(!s.start_work_order(WorkOrderId(99), "M1"));
        assert!(!s.complete_work_order(WorkOrderId(99)));
        assert!(!s.remove_work_order(WorkOrderId(99)));
        assert!(s.notify_machine_idle("Ghost").is_none());
        assert_eq!(s.events().emitted_count(EventKind::WorkOrderStarted), 0);
    }

    #[test]
    fn starting_a_pending_order_moves_it_to_the_machine() {
        let mut s = Scheduler::new();
        s.add_work_order(wo(5));
        assert!(s.start_work_order(WorkOrderId(5), "M2"));
        assert_eq!(s.pending_count(), 0);
        assert!(s.is_machine_registered("M2"));
        let active = s.active_for_machine("M2");
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].status, WorkOrderStatus::Running);
        assert!(s.next_for_machine("M2").is_none());
    }

    #[test]
    fn finishing_twice_is_rejected() {
        let mut s = Scheduler::new();
        s.register_machine("M1");
        s.add_work_order(wo(1));
        s.set_time(t(8));
        assert!(s.complete_work_order(WorkOrderId(1)));

        s.set_time(t(10));
        assert!(!s.complete_work_order(WorkOrderId(1)));
        assert!(!s.cancel_work_order(WorkOrderId(1)));
        let done = s.work_order(WorkOrderId(1)).unwrap();
        assert_eq!(done.status, WorkOrderStatus::Completed);
        assert_eq!(done.finish_date, Some(t(8)));
        assert_eq!(s.events().emitted_count(EventKind::WorkOrderCompleted), 1);
    }

    #[test]
    fn moving_an_order_refills_the_machine_it_left() {
        let mut s = Scheduler::new();
        s.register_machine("M1");
        s.register_machine("M2");
        s.load_schedule([wo(1), wo(2), wo(3)]);
        assert_eq!(s.next_for_machine("M1").unwrap().id, WorkOrderId(1));
        assert!(s.start_work_order(WorkOrderId(2), "M2"));

        // WO 1 leaves M1 for M2; M1 picks up WO 3 from the pool.
        assert!(s.start_work_order(WorkOrderId(1), "M2"));
        assert_eq!(s.work_order(WorkOrderId(1)).unwrap().machine, Some(MachineId::from("M2")));
        let next = s.next_for_machine("M1").unwrap();
        assert_eq!(next.id, WorkOrderId(3));
        assert_eq!(next.status, WorkOrderStatus::Queued);
        assert_eq!(s.pending_count(), 0);
    }

    #[test]
    fn finished_orders_cannot_restart() {
        let mut s = Scheduler::new();
        s.register_machine("M1");
        s.add_work_order(wo(1));
        s.complete_work_order(WorkOrderId(1));
        assert!(!s.start_work_order(WorkOrderId(1), "M1"));
    }

    #[test]
    fn remove_clears_pool_and_queues() {
        let mut s = Scheduler::new();
        s.register_machine("M1");
        s.load_schedule([wo(1), wo(2)]);
        assert!(s.remove_work_order(WorkOrderId(1)));
        assert!(s.remove_work_order(WorkOrderId(2)));
        assert!(s.is_machine_idle("M1"));
        assert_eq!(s.pending_count(), 0);
        assert!(s.schedule().is_empty());
    }

    #[test]
    fn notify_idle_assigns_after_removal() {
        let mut s = Scheduler::new();
        s.register_machine("M1");
        s.load_schedule([wo(1), wo(2)]);
        s.remove_work_order(WorkOrderId(1));
        assert_eq!(s.notify_machine_idle("M1"), Some(WorkOrderId(2)));
        assert_eq!(s.notify_machine_idle("M1"), None);
    }

    #[test]
    fn cancellation_frees_the_machine_quietly() {
        let mut s = Scheduler::new();
        s.register_machine("M1");
        s.load_schedule([wo(1), wo(2)]);
        assert!(s.cancel_work_order(WorkOrderId(1)));
        assert_eq!(s.work_order(WorkOrderId(1)).unwrap().status, WorkOrderStatus::Cancelled);
        assert_eq!(s.next_for_machine("M1").unwrap().id, WorkOrderId(2));
        assert_eq!(s.events().emitted_count(EventKind::WorkOrderCompleted), 0);
    }

    #[test]
    fn sink_sees_every_assignment() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut s = Scheduler::new();
        let log = Rc::clone(&seen);
        s.set_assignment_sink("M1", move |o: &WorkOrder| log.borrow_mut().push(o.id));
        s.register_machine("M1");
        s.load_schedule([wo(1), wo(2)]);
        s.complete_work_order(WorkOrderId(1));
        assert_eq!(*seen.borrow(), vec![WorkOrderId(1), WorkOrderId(2)]);
        assert_eq!(s.events().emitted_count(EventKind::WorkOrderAssigned), 2);
    }

    #[test]
    fn overdue_compares_against_given_time() {
        let mut s = Scheduler::new();
        s.add_work_order(wo(1).with_due_date(t(10)));
        s.add_work_order(wo(2).with_due_date(t(12)));
        s.add_work_order(wo(3));
        assert!(s.overdue_orders(t(10)).is_empty());
        let late: Vec<_> = s.overdue_orders(t(11)).iter().map(|o| o.id).collect();
        assert_eq!(late, vec![WorkOrderId(1)]);

        s.register_machine("M1");
        s.complete_work_order(WorkOrderId(1));
        assert!(s.overdue_orders(t(11)).is_empty());
    }

    #[test]
    fn operator_binding_is_idempotent() {
        let mut s = Scheduler::new();
        s.register_operator("Alex");
        assert!(s.assign_operator("Alex", "M1"));
        assert!(s.assign_operator("Alex", "M1"));
        assert_eq!(s.events().emitted_count(EventKind::OperatorAssigned), 1);

        assert!(s.assign_operator("Alex", "M2"));
        assert_eq!(s.operator("Alex").unwrap().machine, Some(MachineId::from("M2")));

        assert!(s.release_operator("Alex"));
        let op = s.operator("Alex").unwrap();
        assert!(!op.busy);
        assert!(op.machine.is_none());
        assert!(!s.release_operator("Sam"));
    }

    #[test]
    fn work_order_deserializes_with_defaults() {
        let json = r#"{ "id": 7, "sku": "Gear", "quantity": 3 }"#;
        let order: WorkOrder = serde_json::from_str(json).unwrap();
        assert_eq!(order.id, WorkOrderId(7));
        assert_eq!(order.status, WorkOrderStatus::OnHold);
        assert_eq!(order.priority, WorkOrderPriority::None);
        assert!(order.machine.is_none());
    }
}
