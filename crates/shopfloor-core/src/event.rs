//! Typed signals with synchronous fan-out and per-kind history.
//!
//! Each component that raises signals (orchestrator, scheduler, inventory)
//! owns an [`EventBus`]. [`EventBus::emit`] calls every listener registered
//! for the event's kind in registration order, then records the event in
//! that kind's history ring buffer. Listeners are read-only observers: they
//! cannot reach back into the emitting component.

use crate::clock::Phase;
use crate::fixed::Ticks;
use crate::id::*;

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    // -- Session lifecycle --
    PhaseChanged {
        from: Phase,
        to: Phase,
    },
    SimulationReady {
        seed: u32,
    },
    SessionBegan {
        tick: Ticks,
    },
    SessionPaused {
        tick: Ticks,
    },
    SessionResumed {
        tick: Ticks,
    },
    SessionEnded {
        tick: Ticks,
    },
    Tick {
        delta_secs: f64,
        tick: Ticks,
    },

    // -- Inventory --
    InventoryChanged {
        sku: Sku,
        location: LocationId,
        delta: i64,
    },
    CapacityWarning {
        location: LocationId,
        usage_percent: f64,
    },
    LowStock {
        sku: Sku,
        remaining: u64,
    },

    // -- Scheduling --
    WorkOrderAssigned {
        order: WorkOrderId,
        machine: MachineId,
    },
    WorkOrderStarted {
        order: WorkOrderId,
        machine: MachineId,
    },
    WorkOrderCompleted {
        order: WorkOrderId,
        machine: Option<MachineId>,
    },
    OperatorAssigned {
        operator: OperatorId,
        machine: MachineId,
    },
    OperatorReleased {
        operator: OperatorId,
    },
}

/// Discriminant tag for event types, used for subscription and history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    PhaseChanged,
    SimulationReady,
    SessionBegan,
    SessionPaused,
    SessionResumed,
    SessionEnded,
    Tick,
    InventoryChanged,
    CapacityWarning,
    LowStock,
    WorkOrderAssigned,
    WorkOrderStarted,
    WorkOrderCompleted,
    OperatorAssigned,
    OperatorReleased,
}

/// Total number of event kinds.
const EVENT_KIND_COUNT: usize = 15;

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::PhaseChanged { .. } => EventKind::PhaseChanged,
            Event::SimulationReady { .. } => EventKind::SimulationReady,
            Event::SessionBegan { .. } => EventKind::SessionBegan,
            Event::SessionPaused { .. } => EventKind::SessionPaused,
            Event::SessionResumed { .. } => EventKind::SessionResumed,
            Event::SessionEnded { .. } => EventKind::SessionEnded,
            Event::Tick { .. } => EventKind::Tick,
            Event::InventoryChanged { .. } => EventKind::InventoryChanged,
            Event::CapacityWarning { .. } => EventKind::CapacityWarning,
            Event::LowStock { .. } => EventKind::LowStock,
            Event::WorkOrderAssigned { .. } => EventKind::WorkOrderAssigned,
            Event::WorkOrderStarted { .. } => EventKind::WorkOrderStarted,
            Event::WorkOrderCompleted { .. } => EventKind::WorkOrderCompleted,
            Event::OperatorAssigned { .. } => EventKind::OperatorAssigned,
            Event::OperatorReleased { .. } => EventKind::OperatorReleased,
        }
    }
}

impl EventKind {
    fn index(self) -> usize {
        self as usize
    }
}

// ---------------------------------------------------------------------------
// EventBuffer: pre-allocated ring buffer
// ---------------------------------------------------------------------------

/// A pre-allocated ring buffer for events. Fixed capacity; when full, the
/// oldest events are dropped.
#[derive(Debug)]
pub struct EventBuffer {
    events: Vec<Option<Event>>,
    /// Write position (wraps around).
    head: usize,
    len: usize,
    /// Total events ever written (including dropped).
    total_written: u64,
}

impl EventBuffer {
    /// Create a new ring buffer with the given capacity.
    /// A capacity of 0 is clamped to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: (0..capacity).map(|_| None).collect(),
            head: 0,
            len: 0,
            total_written: 0,
        }
    }

    /// Push an event into the ring buffer. If full, the oldest event is dropped.
    pub fn push(&mut self, event: Event) {
        self.events[self.head] = Some(event);
        self.head = (self.head + 1) % self.capacity();
        if self.len < self.capacity() {
            self.len += 1;
        }
        self.total_written += 1;
    }

    pub fn capacity(&self) -> usize {
        self.events.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn total_written(&self) -> u64 {
        self.total_written
    }

    /// Number of events that were dropped because the buffer was full.
    pub fn dropped_count(&self) -> u64 {
        self.total_written.saturating_sub(self.capacity() as u64)
    }

    /// Iterate over events in order from oldest to newest.
    pub fn iter(&self) -> EventBufferIter<'_> {
        let start = if self.len < self.capacity() {
            0
        } else {
            // head points to the next write position, which is the oldest entry
            self.head
        };
        EventBufferIter {
            buffer: self,
            index: start,
            remaining: self.len,
        }
    }

    pub fn clear(&mut self) {
        for slot in &mut self.events {
            *slot = None;
        }
        self.head = 0;
        self.len = 0;
    }
}

/// Iterator over events in an [`EventBuffer`], from oldest to newest.
pub struct EventBufferIter<'a> {
    buffer: &'a EventBuffer,
    index: usize,
    remaining: usize,
}

impl<'a> Iterator for EventBufferIter<'a> {
    type Item = &'a Event;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let event = self.buffer.events[self.index].as_ref();
        self.index = (self.index + 1) % self.buffer.capacity();
        self.remaining -= 1;
        event
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for EventBufferIter<'_> {}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// A listener receives events read-only, synchronously, at emit time.
pub type Listener = Box<dyn FnMut(&Event)>;

/// Default history capacity per event kind.
pub const DEFAULT_HISTORY: usize = 256;

pub struct EventBus {
    /// One history ring buffer per event kind, allocated on first emit.
    history: [Option<EventBuffer>; EVENT_KIND_COUNT],
    /// Listeners indexed by event kind, in registration order.
    listeners: [Vec<Listener>; EVENT_KIND_COUNT],
    history_capacity: usize,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("history", &self.history)
            .field(
                "listeners",
                &self.listeners.iter().map(Vec::len).sum::<usize>(),
            )
            .field("history_capacity", &self.history_capacity)
            .finish()
    }
}

impl EventBus {
    /// Create a new event bus with the given history capacity per kind.
    pub fn new(history_capacity: usize) -> Self {
        Self {
            history: Default::default(),
            listeners: std::array::from_fn(|_| Vec::new()),
            history_capacity,
        }
    }

    /// Register a listener for an event kind. Listeners run in registration
    /// order.
    pub fn on(&mut self, kind: EventKind, listener: Listener) {
        self.listeners[kind.index()].push(listener);
    }

    /// Number of listeners registered for a kind.
    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.listeners[kind.index()].len()
    }

    /// Record an event and deliver it to every listener of its kind.
    pub fn emit(&mut self, event: Event) {
        let idx = event.kind().index();
        for listener in &mut self.listeners[idx] {
            listener(&event);
        }

        let capacity = self.history_capacity;
        self.history[idx]
            .get_or_insert_with(|| EventBuffer::new(capacity))
            .push(event);
    }

    /// Recorded events of one kind, oldest first.
    pub fn history(&self, kind: EventKind) -> impl Iterator<Item = &Event> {
        self.history[kind.index()]
            .as_ref()
            .into_iter()
            .flat_map(EventBuffer::iter)
    }

    /// Total events of one kind emitted since creation (including any that
    /// have rolled out of history).
    pub fn emitted_count(&self, kind: EventKind) -> u64 {
        self.history[kind.index()]
            .as_ref()
            .map_or(0, EventBuffer::total_written)
    }

    /// Drop all recorded history. Listeners stay registered.
    pub fn clear_history(&mut self) {
        for buffer in self.history.iter_mut().flatten() {
            buffer.clear();
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY)
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn changed(sku: &str, delta: i64) -> Event {
        Event::InventoryChanged {
            sku: Sku::from(sku),
            location: LocationId::from("Warehouse_A"),
            delta,
        }
    }

    #[test]
    fn ring_buffer_drops_oldest() {
        let mut buf = EventBuffer::new(2);
        buf.push(changed("A", 1));
        buf.push(changed("B", 2));
        buf.push(changed("C", 3));
        let kept: Vec<_> = buf.iter().cloned().collect();
        assert_eq!(kept, vec![changed("B", 2), changed("C", 3)]);
        assert_eq!(buf.dropped_count(), 1);
        assert_eq!(buf.total_written(), 3);
    }

    #[test]
    fn zero_capacity_clamped_to_one() {
        let buf = EventBuffer::new(0);
        assert_eq!(buf.capacity(), 1);
    }

    #[test]
    fn listeners_called_in_registration_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut bus = EventBus::default();
        for tag in ["first", "second", "third"] {
            let log = Rc::clone(&log);
            bus.on(
                EventKind::InventoryChanged,
                Box::new(move |_| log.borrow_mut().push(tag)),
            );
        }
        bus.emit(changed("Widget", 1));
        assert_eq!(*log.borrow(), vec!["first", "second", "third"]);
    }

    #[test]
    fn listeners_only_see_their_kind() {
        let count = Rc::new(RefCell::new(0));
        let mut bus = EventBus::default();
        let c = Rc::clone(&count);
        bus.on(EventKind::LowStock, Box::new(move |_| *c.borrow_mut() += 1));
        bus.emit(changed("Widget", 1));
        assert_eq!(*count.borrow(), 0);
        bus.emit(Event::LowStock {
            sku: Sku::from("Widget"),
            remaining: 2,
        });
        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn history_is_per_kind_and_bounded() {
        let mut bus = EventBus::new(3);
        for i in 0..5 {
            bus.emit(changed("Widget", i));
        }
        bus.emit(Event::SessionBegan { tick: 0 });
        let deltas: Vec<i64> = bus
            .history(EventKind::InventoryChanged)
            .map(|e| match e {
                Event::InventoryChanged { delta, .. } => *delta,
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(deltas, vec![2, 3, 4]);
        assert_eq!(bus.emitted_count(EventKind::InventoryChanged), 5);
        assert_eq!(bus.history(EventKind::SessionBegan).count(), 1);

        bus.clear_history();
        assert_eq!(bus.history(EventKind::InventoryChanged).count(), 0);
    }
}
