//! Append-only, bounded transaction ledger.
//!
//! Once the ledger holds more than its ceiling, the oldest records are
//! dropped in one chunk rather than one per push. Running totals per
//! transaction type survive pruning.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::*;

/// Default record ceiling.
pub const DEFAULT_LEDGER_CAPACITY: usize = 10_000;
/// Records dropped at once when the ceiling is exceeded.
pub const DEFAULT_PRUNE_CHUNK: usize = 1_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionType {
    Purchase,
    Reservation,
    Consumption,
    Production,
    Scrap,
    Shipment,
    Transfer,
    BomConsumption,
    BomProduction,
}

const TRANSACTION_TYPE_COUNT: usize = 9;

impl TransactionType {
    fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryTransaction {
    pub kind: TransactionType,
    pub sku: Sku,
    /// Signed unit delta.
    pub delta: i64,
    pub location: LocationId,
    pub sub_location: Option<String>,
    /// Affected batch, or [`BatchId::NIL`] for multi-batch records.
    pub batch: BatchId,
    pub timestamp: DateTime<Utc>,
    /// Free-text cross reference (work order, BOM, source location...).
    pub reference: String,
}

#[derive(Debug, Clone)]
pub struct TransactionLedger {
    records: VecDeque<InventoryTransaction>,
    capacity: usize,
    prune_chunk: usize,
    totals: [i64; TRANSACTION_TYPE_COUNT],
    pruned: u64,
}

impl TransactionLedger {
    /// `prune_chunk` is clamped to `1..=capacity`.
    pub fn new(capacity: usize, prune_chunk: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            records: VecDeque::new(),
            capacity,
            prune_chunk: prune_chunk.clamp(1, capacity),
            totals: [0; TRANSACTION_TYPE_COUNT],
            pruned: 0,
        }
    }

    pub fn push(&mut self, record: InventoryTransaction) {
        self.totals[record.kind.index()] += record.delta;
        self.records.push_back(record);
        if self.records.len() > self.capacity {
            let n = self.prune_chunk.min(self.records.len());
            self.records.drain(..n);
            self.pruned += n as u64;
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records dropped by pruning so far.
    pub fn pruned_count(&self) -> u64 {
        self.pruned
    }

    /// The most recent `max` records, oldest first.
    pub fn recent(&self, max: usize) -> impl Iterator<Item = &InventoryTransaction> {
        let skip = self.records.len().saturating_sub(max);
        self.records.iter().skip(skip)
    }

    pub fn iter(&self) -> impl Iterator<Item = &InventoryTransaction> {
        self.records.iter()
    }

    /// Sum of deltas ever logged for `kind`, including pruned records.
    pub fn total(&self, kind: TransactionType) -> i64 {
        self.totals[kind.index()]
    }
}

impl Default for TransactionLedger {
    fn default() -> Self {
        Self::new(DEFAULT_LEDGER_CAPACITY, DEFAULT_PRUNE_CHUNK)
    }
}
