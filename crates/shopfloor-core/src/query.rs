//! Read-only views over the inventory.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::batch::{MaterialBatch, MaterialState};
use crate::fixed::{Fixed64, Volume};
use crate::id::{LocationId, Sku};

/// Aggregate of every live batch of one SKU. Rebuilt wholesale after each
/// committed transaction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InventorySummary {
    pub sku: Sku,
    pub total_quantity: u64,
    pub by_location: BTreeMap<LocationId, u64>,
    pub by_state: BTreeMap<MaterialState, u64>,
    pub reserved_quantity: u64,
    pub total_volume: Volume,
}

impl InventorySummary {
    pub fn empty(sku: Sku) -> Self {
        Self {
            sku,
            total_quantity: 0,
            by_location: BTreeMap::new(),
            by_state: BTreeMap::new(),
            reserved_quantity: 0,
            total_volume: Fixed64::ZERO,
        }
    }

    /// Quantity not held by any reservation.
    pub fn available_quantity(&self) -> u64 {
        self.total_quantity.saturating_sub(self.reserved_quantity)
    }

    pub(crate) fn add(&mut self, batch: &MaterialBatch) {
        let qty = batch.quantity as u64;
        self.total_quantity += qty;
        *self.by_location.entry(batch.location.clone()).or_insert(0) += qty;
        *self.by_state.entry(batch.state).or_insert(0) += qty;
        if batch.is_reserved() {
            self.reserved_quantity += qty;
        }
        self.total_volume = self.total_volume.saturating_add(batch.volume());
    }
}

impl std::fmt::Display for InventorySummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "{}: total {} (available {}, reserved {}), volume {}",
            self.sku,
            self.total_quantity,
            self.available_quantity(),
            self.reserved_quantity,
            self.total_volume
        )?;
        for (location, qty) in &self.by_location {
            writeln!(f, "  @ {location}: {qty}")?;
        }
        for (state, qty) in &self.by_state {
            writeln!(f, "  [{state}]: {qty}")?;
        }
        Ok(())
    }
}

/// One line of a location listing: material of one SKU and state, split by
/// reservation status.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationInventoryItem {
    pub sku: Sku,
    pub state: MaterialState,
    pub reserved: bool,
    pub quantity: u64,
    pub volume: Volume,
}

/// Group batches at one location by `(sku, state, reserved)`.
pub(crate) fn group_at_location<'a>(
    batches: impl Iterator<Item = &'a MaterialBatch>,
    location: &LocationId,
) -> Vec<LocationInventoryItem> {
    let mut groups: BTreeMap<(Sku, MaterialState, bool), (u64, Volume)> = BTreeMap::new();
    for batch in batches.filter(|b| &b.location == location) {
        let entry = groups
            .entry((batch.sku.clone(), batch.state, batch.is_reserved()))
            .or_insert((0, Fixed64::ZERO));
        entry.0 += batch.quantity as u64;
        entry.1 = entry.1.saturating_add(batch.volume());
    }
    groups
        .into_iter()
        .map(|((sku, state, reserved), (quantity, volume))| LocationInventoryItem {
            sku,
            state,
            reserved,
            quantity,
            volume,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::{Genealogy, Reservation};
    use crate::fixed::f64_to_fixed64;
    use crate::id::*;
    use chrono::{TimeZone, Utc};

    fn batch(sku: &str, loc: &str, qty: u32, reserved: bool) -> MaterialBatch {
        let at = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        MaterialBatch {
            id: BatchId::NIL,
            sku: Sku::from(sku),
            state: MaterialState::RawMaterial,
            quantity: qty,
            volume_per_unit: f64_to_fixed64(0.5),
            location: LocationId::from(loc),
            sub_location: None,
            genealogy: Genealogy::new(at),
            reservation: reserved.then(|| Reservation {
                work_order: WorkOrderId(1),
                machine: MachineId::from("M1"),
                reserved_at: at,
            }),
        }
    }

    #[test]
    fn summary_accumulates() {
        let mut s = InventorySummary::empty(Sku::from("Steel"));
        s.add(&batch("Steel", "A", 4, false));
        s.add(&batch("Steel", "B", 6, true));
        assert_eq!(s.total_quantity, 10);
        assert_eq!(s.reserved_quantity, 6);
        assert_eq!(s.available_quantity(), 4);
        assert_eq!(s.by_location[&LocationId::from("B")], 6);
        assert_eq!(s.by_state[&MaterialState::RawMaterial], 10);
        assert_eq!(s.total_volume, f64_to_fixed64(5.0));
    }

    #[test]
    fn summary_display_lists_locations() {
        let mut s = InventorySummary::empty(Sku::from("Steel"));
        s.add(&batch("Steel", "A", 4, false));
        let text = s.to_string();
        assert!(text.starts_with("Steel: total 4"));
        assert!(text.contains("@ A: 4"));
    }

    #[test]
    fn grouping_splits_reserved() {
        let batches = [
            batch("Steel", "A", 1, false),
            batch("Steel", "A", 2, false),
            batch("Steel", "A", 3, true),
            batch("Steel", "B", 9, false),
            batch("Bolt", "A", 5, false),
        ];
        let items = group_at_location(batches.iter(), &LocationId::from("A"));
        assert_eq!(items.len(), 3);
        let free_steel = items
            .iter()
            .find(|i| i.sku.as_str() == "Steel" && !i.reserved)
            .unwrap();
        assert_eq!(free_steel.quantity, 3);
        assert_eq!(free_steel.volume, f64_to_fixed64(1.5));
    }
}
