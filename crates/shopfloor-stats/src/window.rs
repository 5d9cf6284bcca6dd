//! Bounded buffers: a generic overwrite-oldest ring and a per-tick rolling
//! counter.

use shopfloor_core::fixed::Fixed64;

// ---------------------------------------------------------------------------
// RingBuffer
// ---------------------------------------------------------------------------

/// A fixed-capacity ring buffer. When full, the oldest entry is overwritten.
/// Iterates oldest-to-newest.
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    data: Vec<T>,
    capacity: usize,
    /// Index of the oldest entry once the buffer has wrapped.
    head: usize,
}

impl<T> RingBuffer<T> {
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "RingBuffer capacity must be > 0");
        Self {
            data: Vec::with_capacity(capacity),
            capacity,
            head: 0,
        }
    }

    /// Push a value. Returns `true` if an older value was overwritten.
    pub fn push(&mut self, value: T) -> bool {
        if self.data.len() < self.capacity {
            self.data.push(value);
            return false;
        }
        self.data[self.head] = value;
        self.head = (self.head + 1) % self.capacity;
        true
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The most recently pushed value.
    pub fn latest(&self) -> Option<&T> {
        if self.data.len() < self.capacity {
            return self.data.last();
        }
        self.data.get((self.head + self.capacity - 1) % self.capacity)
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> {
        let (newer, older) = self.data.split_at(self.head);
        older.iter().chain(newer)
    }

    pub fn clear(&mut self) {
        self.data.clear();
        self.head = 0;
    }
}

impl<T: Clone> RingBuffer<T> {
    pub fn to_vec(&self) -> Vec<T> {
        self.iter().cloned().collect()
    }
}

// ---------------------------------------------------------------------------
// RollingWindow
// ---------------------------------------------------------------------------

/// Counts over the most recent N ticks.
///
/// Call [`add`](Self::add) any number of times during a tick and
/// [`commit`](Self::commit) once at its end. Queries include the
/// in-progress tick.
#[derive(Debug, Clone)]
pub(crate) struct RollingWindow {
    tick_counts: Vec<u64>,
    write_pos: usize,
    committed_total: u64,
    current: u64,
    committed_count: usize,
}

impl RollingWindow {
    pub(crate) fn new(window_size: usize) -> Self {
        assert!(window_size > 0, "RollingWindow size must be > 0");
        Self {
            tick_counts: vec![0; window_size],
            write_pos: 0,
            committed_total: 0,
            current: 0,
            committed_count: 0,
        }
    }

    pub(crate) fn add(&mut self, count: u64) {
        self.current += count;
    }

    /// Close the current tick, evicting the oldest once the window is full.
    pub(crate) fn commit(&mut self) {
        let window_size = self.tick_counts.len();
        if self.committed_count == window_size {
            self.committed_total -= self.tick_counts[self.write_pos];
        }
        self.tick_counts[self.write_pos] = self.current;
        self.committed_total += self.current;
        self.current = 0;
        self.write_pos = (self.write_pos + 1) % window_size;
        if self.committed_count < window_size {
            self.committed_count += 1;
        }
    }

    pub(crate) fn total(&self) -> u64 {
        self.committed_total + self.current
    }

    /// Average count per tick over the ticks seen so far in the window.
    pub(crate) fn rate(&self) -> Fixed64 {
        let ticks = self.committed_count + usize::from(self.current > 0);
        if ticks == 0 {
            return Fixed64::ZERO;
        }
        Fixed64::from_num(self.total()) / Fixed64::from_num(ticks)
    }
}

// ===========================================================================
// Tests
// ===========================================================================
