//! Material batches: the unit of inventory tracking.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::fixed::{Volume, volume_for};
use crate::id::*;
use crate::rng::SimRng;

/// Lifecycle state of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MaterialState {
    RawMaterial,
    WorkInProcess,
    FinishedGoods,
    Scrap,
}

impl MaterialState {
    /// Stable tag for hashing and display.
    pub fn as_str(self) -> &'static str {
        match self {
            MaterialState::RawMaterial => "RawMaterial",
            MaterialState::WorkInProcess => "WorkInProcess",
            MaterialState::FinishedGoods => "FinishedGoods",
            MaterialState::Scrap => "Scrap",
        }
    }
}

impl std::fmt::Display for MaterialState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lineage of a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Genealogy {
    /// Batches this one was drawn or transformed from. Deduplicated.
    pub parents: Vec<BatchId>,
    pub source_machine: Option<MachineId>,
    pub source_work_order: Option<WorkOrderId>,
    /// BOM that produced this batch, if any.
    pub bom: Option<BomId>,
    pub created_at: DateTime<Utc>,
    pub quality_pass: bool,
}

impl Genealogy {
    pub fn new(created_at: DateTime<Utc>) -> Self {
        Self {
            parents: Vec::new(),
            source_machine: None,
            source_work_order: None,
            bom: None,
            created_at,
            quality_pass: true,
        }
    }

    pub fn with_parent(mut self, parent: BatchId) -> Self {
        self.parents.push(parent);
        self
    }

    pub fn with_source(mut self, machine: &MachineId, work_order: WorkOrderId) -> Self {
        self.source_machine = Some(machine.clone());
        self.source_work_order = Some(work_order);
        self
    }
}

/// Exclusive hold on a batch for one (machine, work order) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub work_order: WorkOrderId,
    pub machine: MachineId,
    pub reserved_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialBatch {
    pub id: BatchId,
    pub sku: Sku,
    pub state: MaterialState,
    pub quantity: u32,
    pub volume_per_unit: Volume,
    pub location: LocationId,
    pub sub_location: Option<String>,
    pub genealogy: Genealogy,
    /// `None` when unreserved; the whole record is cleared on release.
    pub reservation: Option<Reservation>,
}

impl MaterialBatch {
    /// Volume currently occupied by this batch.
    pub fn volume(&self) -> Volume {
        self.volume_of(self.quantity)
    }

    /// Volume of `quantity` units drawn from this batch. A batch is only
    /// admitted when its full volume fits, so a partial draw always does.
    pub fn volume_of(&self, quantity: u32) -> Volume {
        volume_for(quantity.min(self.quantity), self.volume_per_unit).unwrap_or(Volume::MAX)
    }

    pub fn is_reserved(&self) -> bool {
        self.reservation.is_some()
    }

    pub fn is_reserved_for(&self, machine: &MachineId, work_order: WorkOrderId) -> bool {
        self.reservation
            .as_ref()
            .is_some_and(|r| r.work_order == work_order && &r.machine == machine)
    }

    /// Unreserved batch of `sku` at `location`.
    pub(crate) fn is_free(&self, sku: &Sku, location: &LocationId) -> bool {
        !self.is_reserved() && &self.sku == sku && &self.location == location
    }
}

// ---------------------------------------------------------------------------
// Batch id source
// ---------------------------------------------------------------------------

/// Where fresh batch ids come from.
#[derive(Debug, Clone, Default)]
pub enum BatchIdSource {
    /// OS-random v4 UUIDs. Unique across sessions, different every run.
    #[default]
    Random,
    /// v4-layout UUIDs drawn from a seeded stream. Unique within a session
    /// and identical across runs with the same seed.
    Seeded(SimRng),
}

impl BatchIdSource {
    pub fn seeded(seed: u64) -> Self {
        BatchIdSource::Seeded(SimRng::new(seed))
    }

    pub fn next_id(&mut self) -> BatchId {
        match self {
            BatchIdSource::Random => BatchId(uuid::Uuid::new_v4()),
            BatchIdSource::Seeded(rng) => {
                let mut bytes = [0u8; 16];
                bytes[..8].copy_from_slice(&rng.next_u64().to_le_bytes());
                bytes[8..].copy_from_slice(&rng.next_u64().to_le_bytes());
                BatchId(uuid::Builder::from_random_bytes(bytes).into_uuid())
            }
        }
    }
}
