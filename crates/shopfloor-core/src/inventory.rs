//! Batch-level inventory with reservations, capacity limits, genealogy and
//! an audit ledger.
//!
//! # Transactions
//!
//! Every mutating operation runs in the same order:
//!
//! 1. Validate availability (quantities, reservations, BOM inputs).
//! 2. Validate and commit destination capacity. The capacity commit is the
//!    last step that can fail, so a rejected call leaves batches, capacity
//!    and ledger exactly as they were.
//! 3. Mutate batches.
//! 4. Append ledger records.
//! 5. Rebuild per-SKU aggregates.
//! 6. Emit [`Event::InventoryChanged`] (and [`Event::LowStock`] when a
//!    decrement drops a SKU below its threshold).
//!
//! Rejections return an [`InventoryError`] and log a warning. Capacity
//! rejections additionally emit [`Event::CapacityWarning`].
//!
//! # Work in process
//!
//! Consuming reserved material moves one unit into the machine's WIP
//! location (`"{machine}.WIP"`, see [`MachineId::wip_location`]) as a
//! single-unit batch still reserved for the same (machine, work order)
//! pair. WIP locations are not capacity tracked.
//!
//! # Determinism
//!
//! Batches live in a [`SlotMap`] and every scan walks it in slot order, so
//! identical call sequences select identical batches. With
//! [`BatchIdSource::Seeded`] the batch ids repeat too, and
//! [`Inventory::state_hash`] is stable across runs.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::Serialize;
use slotmap::SlotMap;

use crate::batch::{BatchIdSource, Genealogy, MaterialBatch, MaterialState, Reservation};
use crate::bom::BomEntry;
use crate::error::InventoryError;
use crate::event::{DEFAULT_HISTORY, Event, EventBus};
use crate::fixed::{Fixed64, Volume, fixed64_to_f64, volume_for};
use crate::hash::StateHash;
use crate::id::*;
use crate::ledger::{InventoryTransaction, TransactionLedger, TransactionType};
use crate::location::{CAPACITY_WARNING_PERCENT, LocationCapacity, LocationType};
use crate::query::{self, InventorySummary, LocationInventoryItem};

/// Point-in-time copy of everything a transaction may touch. Two snapshots
/// compare equal iff no batch, capacity record or ledger entry changed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InventorySnapshot {
    pub batches: Vec<MaterialBatch>,
    pub locations: Vec<LocationCapacity>,
    pub ledger_len: usize,
    pub ledger_pruned: u64,
}

#[derive(Debug)]
pub struct Inventory {
    batches: SlotMap<BatchKey, MaterialBatch>,
    by_id: HashMap<BatchId, BatchKey>,
    locations: BTreeMap<LocationId, LocationCapacity>,
    boms: HashMap<BomId, BomEntry>,
    ledger: TransactionLedger,
    summaries: BTreeMap<Sku, InventorySummary>,
    low_stock: HashMap<Sku, u64>,
    ids: BatchIdSource,
    now: DateTime<Utc>,
    events: EventBus,
}

impl Default for Inventory {
    fn default() -> Self {
        Self::new()
    }
}

impl Inventory {
    /// Empty inventory with random batch ids.
    pub fn new() -> Self {
        Self::with_id_source(BatchIdSource::Random)
    }

    pub fn with_id_source(ids: BatchIdSource) -> Self {
        Self {
            batches: SlotMap::with_key(),
            by_id: HashMap::new(),
            locations: BTreeMap::new(),
            boms: HashMap::new(),
            ledger: TransactionLedger::default(),
            summaries: BTreeMap::new(),
            low_stock: HashMap::new(),
            ids,
            now: DateTime::<Utc>::UNIX_EPOCH,
            events: EventBus::new(DEFAULT_HISTORY),
        }
    }

    /// Replace the ledger (e.g. to change its ceiling). Existing records
    /// are discarded.
    pub fn with_ledger(mut self, ledger: TransactionLedger) -> Self {
        self.ledger = ledger;
        self
    }

    pub fn with_event_history(mut self, capacity: usize) -> Self {
        self.events = EventBus::new(capacity);
        self
    }

    /// Simulation time stamped on new batches, reservations and ledger
    /// records.
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
    // Registration
    // -----------------------------------------------------------------------

    /// Declare a location's type and limits. Re-registering updates the
    /// limits and keeps the current usage. A zero limit is unconstrained.
    pub fn register_location(
        &mut self,
        location: impl Into<LocationId>,
        location_type: LocationType,
        max_volume: Volume,
        max_items: u32,
    ) {
        let location = location.into();
        info!(
            "location {location} registered as {location_type:?} (max volume {max_volume}, max batches {max_items})"
        );
        let cap = self
            .locations
            .entry(location.clone())
            .or_insert_with(|| LocationCapacity::unconstrained(location));
        cap.location_type = location_type;
        cap.max_volume = max_volume.max(Fixed64::ZERO);
        cap.max_items = max_items;
    }

    /// Register or replace a bill of materials. A negative output volume
    /// per unit is rejected.
    pub fn register_bom(&mut self, bom: BomEntry) -> Result<(), InventoryError> {
        if bom.output_volume_per_unit < Fixed64::ZERO {
            let err = InventoryError::InvalidVolume {
                volume_per_unit: bom.output_volume_per_unit,
            };
            warn!("BOM {} rejected: {err}", bom.id);
            return Err(err);
        }
        debug!("BOM {} registered: {} inputs -> {}", bom.id, bom.inputs.len(), bom.output_sku);
        self.boms.insert(bom.id.clone(), bom);
        Ok(())
    }

    pub fn bom(&self, id: &str) -> Option<&BomEntry> {
        self.boms.get(id)
    }

    /// Emit [`Event::LowStock`] whenever a decrement leaves fewer than
    /// `threshold` unreserved units of `sku`.
    pub fn set_low_stock_threshold(&mut self, sku: impl Into<Sku>, threshold: u64) {
        self.low_stock.insert(sku.into(), threshold);
    }

    // -----------------------------------------------------------------------
    // Capacity
    // -----------------------------------------------------------------------

    /// Apply signed capacity deltas to `location`, creating an
    /// unconstrained record if it was never registered.
    ///
    /// Rejections leave usage unchanged, log a warning and emit
    /// [`Event::CapacityWarning`]. An accepted increase that leaves the
    /// location above 80% usage also emits a warning.
    pub fn update_location_capacity(
        &mut self,
        location: &LocationId,
        volume_delta: Volume,
        items_delta: i64,
    ) -> Result<(), InventoryError> {
        let cap = self
            .locations
            .entry(location.clone())
            .or_insert_with(|| LocationCapacity::unconstrained(location.clone()));

        if let Err(err) = cap.try_apply(volume_delta, items_delta) {
            let usage_percent = match &err {
                InventoryError::InsufficientCapacity { .. } => {
                    fixed64_to_f64(cap.current_volume.saturating_add(volume_delta))
                        / fixed64_to_f64(cap.max_volume)
                        * 100.0
                }
                _ => 100.0,
            };
            warn!("capacity rejected at {location}: {err}");
            self.events.emit(Event::CapacityWarning {
                location: location.clone(),
                usage_percent,
            });
            return Err(err);
        }

        let increased = volume_delta > Fixed64::ZERO || items_delta > 0;
        if increased && cap.is_constrained() {
            let usage_percent = cap.usage_percent();
            if usage_percent > CAPACITY_WARNING_PERCENT {
                warn!("location {location} at {usage_percent:.1}% of capacity");
                self.events.emit(Event::CapacityWarning {
                    location: location.clone(),
                    usage_percent,
                });
            }
        }
        Ok(())
    }

    /// Whether `volume` more fits at `location`. Unregistered locations
    /// always have room.
    pub fn has_capacity(&self, location: &str, volume: Volume) -> bool {
        self.locations.get(location).is_none_or(|cap| cap.can_fit(volume))
    }

    pub fn location_capacity(&self, location: &str) -> Option<&LocationCapacity> {
        self.locations.get(location)
    }

    pub fn locations(&self) -> impl Iterator<Item = &LocationCapacity> {
        self.locations.values()
    }

    fn release_capacity(&mut self, location: &LocationId, volume: Volume, items: u32) {
        self.locations
            .entry(location.clone())
            .or_insert_with(|| LocationCapacity::unconstrained(location.clone()))
            .release(volume, items);
    }

    // -----------------------------------------------------------------------
    // Transactions
    // -----------------------------------------------------------------------

    /// Receive `quantity` units of raw material as one new batch.
    pub fn add_raw_material(
        &mut self,
        sku: impl Into<Sku>,
        quantity: u32,
        location: impl Into<LocationId>,
        sub_location: Option<&str>,
        volume_per_unit: Volume,
    ) -> Result<BatchId, InventoryError> {
        let sku = sku.into();
        let location = location.into();
        if quantity == 0 {
            warn!("rejected receipt of {sku} at {location}: quantity is zero");
            return Err(InventoryError::InvalidQuantity { quantity });
        }

        if volume_per_unit < Fixed64::ZERO {
            warn!("rejected receipt of {sku} at {location}: negative volume per unit");
            return Err(InventoryError::InvalidVolume { volume_per_unit });
        }
        let Some(volume) = volume_for(quantity, volume_per_unit) else {
            warn!("rejected receipt of {quantity} {sku} at {location}: volume overflows");
            return Err(InventoryError::VolumeOverflow { location });
        };
        self.update_location_capacity(&location, volume, 1)?;

        let id = self.spawn(MaterialBatch {
            id: BatchId::NIL,
            sku: sku.clone(),
            state: MaterialState::RawMaterial,
            quantity,
            volume_per_unit,
            location: location.clone(),
            sub_location: sub_location.map(str::to_string),
            genealogy: Genealogy::new(self.now),
            reservation: None,
        });

        let mut record = self.record(
            TransactionType::Purchase,
            &sku,
            quantity as i64,
            &location,
            id,
            String::new(),
        );
        record.sub_location = sub_location.map(str::to_string);
        self.ledger.push(record);
        self.update_aggregates();

        debug!("received {quantity} {sku} at {location} as batch {id}");
        self.notify_changed(&sku, &location, quantity as i64);
        Ok(id)
    }

    /// Reserve at least `quantity` units of `sku` at `location` for one
    /// (machine, work order) pair.
    ///
    /// Whole unreserved batches are taken in slot order until the total
    /// reaches `quantity`, so the reserved amount may exceed the request.
    /// All or nothing: if the location holds too little, nothing is
    /// reserved. Returns the number of units actually reserved.
    pub fn reserve_material(
        &mut self,
        sku: impl Into<Sku>,
        quantity: u32,
        location: impl Into<LocationId>,
        work_order: WorkOrderId,
        machine: impl Into<MachineId>,
    ) -> Result<u64, InventoryError> {
        let sku = sku.into();
        let location = location.into();
        let machine = machine.into();
        if quantity == 0 {
            warn!("rejected reservation of {sku} for WO {work_order}: quantity is zero");
            return Err(InventoryError::InvalidQuantity { quantity });
        }

        let requested = quantity as u64;
        let mut selected = Vec::new();
        let mut reserved: u64 = 0;
        for (key, batch) in &self.batches {
            if reserved >= requested {
                break;
            }
            if batch.quantity > 0 && batch.is_free(&sku, &location) {
                selected.push(key);
                reserved += batch.quantity as u64;
            }
        }
        if reserved < requested {
            let err = InventoryError::InsufficientMaterial {
                sku,
                location,
                requested,
                available: reserved,
            };
            warn!("rejected reservation for WO {work_order} on {machine}: {err}");
            return Err(err);
        }

        let reservation = Reservation {
            work_order,
            machine: machine.clone(),
            reserved_at: self.now,
        };
        for key in &selected {
            if let Some(batch) = self.batches.get_mut(*key) {
                batch.reservation = Some(reservation.clone());
            }
        }

        let record = self.record(
            TransactionType::Reservation,
            &sku,
            reserved as i64,
            &location,
            BatchId::NIL,
            format!("WO:{work_order} Machine:{machine} Batches:{}", selected.len()),
        );
        self.ledger.push(record);
        self.update_aggregates();

        debug!(
            "reserved {reserved} {sku} at {location} for WO {work_order} on {machine} ({} batches)",
            selected.len()
        );
        Ok(reserved)
    }

    /// Draw one unit of reserved `sku` into the machine's WIP location.
    ///
    /// Returns the id of the new single-unit WIP batch. Its parent is the
    /// batch the unit was drawn from, which is destroyed once empty.
    pub fn consume_reserved_material(
        &mut self,
        machine: impl Into<MachineId>,
        work_order: WorkOrderId,
        sku: impl Into<Sku>,
    ) -> Result<BatchId, InventoryError> {
        let machine = machine.into();
        let sku = sku.into();

        let found = self
            .batches
            .iter()
            .find(|(_, b)| {
                b.sku == sku
                    && b.quantity > 0
                    && b.state != MaterialState::WorkInProcess
                    && b.is_reserved_for(&machine, work_order)
            })
            .map(|(key, _)| key);
        let Some(key) = found else {
            let err = InventoryError::NoReservedMaterial {
                machine,
                work_order,
                sku,
            };
            warn!("consume rejected: {err}");
            return Err(err);
        };

        let source = &mut self.batches[key];
        source.quantity -= 1;
        let parent = source.id;
        let source_location = source.location.clone();
        let volume_per_unit = source.volume_per_unit;
        let depleted = source.quantity == 0;

        self.release_capacity(&source_location, volume_per_unit, depleted as u32);
        if depleted {
            self.destroy(key);
        }

        let wip_id = self.spawn(MaterialBatch {
            id: BatchId::NIL,
            sku: sku.clone(),
            state: MaterialState::WorkInProcess,
            quantity: 1,
            volume_per_unit,
            location: machine.wip_location(),
            sub_location: None,
            genealogy: Genealogy::new(self.now)
                .with_parent(parent)
                .with_source(&machine, work_order),
            reservation: Some(Reservation {
                work_order,
                machine: machine.clone(),
                reserved_at: self.now,
            }),
        });

        let record = self.record(
            TransactionType::Consumption,
            &sku,
            -1,
            &source_location,
            parent,
            format!("WO:{work_order} Machine:{machine}"),
        );
        self.ledger.push(record);
        self.update_aggregates();

        debug!("{machine} drew 1 {sku} from batch {parent} into WIP {wip_id}");
        Ok(wip_id)
    }

    /// Turn one unit of the pair's WIP into a good finished unit of
    /// `output_sku` at `output_location`.
    pub fn produce_finished_good(
        &mut self,
        machine: impl Into<MachineId>,
        work_order: WorkOrderId,
        output_sku: impl Into<Sku>,
        output_location: impl Into<LocationId>,
    ) -> Result<BatchId, InventoryError> {
        let machine = machine.into();
        let output_sku = output_sku.into();
        let output_location = output_location.into();

        let id = self.complete_wip(
            &machine,
            work_order,
            &output_sku,
            &output_location,
            MaterialState::FinishedGoods,
        )?;
        let record = self.record(
            TransactionType::Production,
            &output_sku,
            1,
            &output_location,
            id,
            format!("WO:{work_order} Machine:{machine}"),
        );
        self.ledger.push(record);
        self.update_aggregates();

        debug!("{machine} produced 1 {output_sku} at {output_location} (batch {id})");
        self.notify_changed(&output_sku, &output_location, 1);
        Ok(id)
    }

    /// Like [`Inventory::produce_finished_good`], but the unit fails
    /// quality and lands in [`MaterialState::Scrap`]. Scrap does not raise
    /// [`Event::InventoryChanged`].
    pub fn produce_scrap(
        &mut self,
        machine: impl Into<MachineId>,
        work_order: WorkOrderId,
        scrap_sku: impl Into<Sku>,
        scrap_location: impl Into<LocationId>,
    ) -> Result<BatchId, InventoryError> {
        let machine = machine.into();
        let scrap_sku = scrap_sku.into();
        let scrap_location = scrap_location.into();

        let id = self.complete_wip(
            &machine,
            work_order,
            &scrap_sku,
            &scrap_location,
            MaterialState::Scrap,
        )?;
        let record = self.record(
            TransactionType::Scrap,
            &scrap_sku,
            1,
            &scrap_location,
            id,
            format!("WO:{work_order} Machine:{machine}"),
        );
        self.ledger.push(record);
        self.update_aggregates();

        debug!("{machine} scrapped 1 {scrap_sku} to {scrap_location} (batch {id})");
        Ok(id)
    }

    /// Shared body of production and scrap: find the pair's WIP unit,
    /// commit output capacity, replace the WIP batch with the output.
    fn complete_wip(
        &mut self,
        machine: &MachineId,
        work_order: WorkOrderId,
        sku: &Sku,
        location: &LocationId,
        state: MaterialState,
    ) -> Result<BatchId, InventoryError> {
        let Some(key) = self.find_wip(machine, work_order) else {
            let err = InventoryError::NoWorkInProcess {
                machine: machine.clone(),
                work_order,
            };
            warn!("{state} output rejected: {err}");
            return Err(err);
        };
        let (wip_id, volume_per_unit) = {
            let wip = &self.batches[key];
            (wip.id, wip.volume_per_unit)
        };

        self.update_location_capacity(location, volume_per_unit, 1)?;

        self.destroy(key);
        let mut genealogy = Genealogy::new(self.now)
            .with_parent(wip_id)
            .with_source(machine, work_order);
        genealogy.quality_pass = state != MaterialState::Scrap;
        Ok(self.spawn(MaterialBatch {
            id: BatchId::NIL,
            sku: sku.clone(),
            state,
            quantity: 1,
            volume_per_unit,
            location: location.clone(),
            sub_location: None,
            genealogy,
            reservation: None,
        }))
    }

    fn find_wip(&self, machine: &MachineId, work_order: WorkOrderId) -> Option<BatchKey> {
        let wip_location = machine.wip_location();
        self.batches
            .iter()
            .find(|(_, b)| {
                b.state == MaterialState::WorkInProcess
                    && b.location == wip_location
                    && b.is_reserved_for(machine, work_order)
            })
            .map(|(key, _)| key)
    }

    /// Clear every reservation held by the pair, WIP included. Returns
    /// whether anything was released.
    pub fn release_reservation(
        &mut self,
        machine: impl Into<MachineId>,
        work_order: WorkOrderId,
    ) -> bool {
        let machine = machine.into();
        let mut released = 0usize;
        for batch in self.batches.values_mut() {
            if batch.is_reserved_for(&machine, work_order) {
                batch.reservation = None;
                released += 1;
            }
        }
        if released == 0 {
            debug!("no reservations held by WO {work_order} on {machine}");
            return false;
        }
        self.update_aggregates();
        debug!("released {released} batches held by WO {work_order} on {machine}");
        true
    }

    /// Convert the pair's WIP into the BOM's output.
    ///
    /// Inputs are drawn from WIP batches at the machine's WIP location that
    /// are reserved for the pair. Batches may be drawn partially. Nothing
    /// is consumed unless every input is fully covered and the output fits
    /// at `output_location`.
    pub fn transform_material(
        &mut self,
        bom: &str,
        machine: impl Into<MachineId>,
        work_order: WorkOrderId,
        output_location: impl Into<LocationId>,
    ) -> Result<BatchId, InventoryError> {
        let machine = machine.into();
        let output_location = output_location.into();
        let Some(bom) = self.boms.get(bom).cloned() else {
            let err = InventoryError::UnknownBom {
                bom: BomId::from(bom),
            };
            warn!("transform rejected: {err}");
            return Err(err);
        };
        if bom.output_quantity == 0 {
            warn!("transform rejected: BOM {} yields nothing", bom.id);
            return Err(InventoryError::InvalidQuantity { quantity: 0 });
        }

        // Phase 1: plan the draw.
        let wip_location = machine.wip_location();
        let mut plan: Vec<(BatchKey, u32)> = Vec::new();
        for (sku, &required) in &bom.inputs {
            let mut outstanding = required;
            for (key, batch) in &self.batches {
                if outstanding == 0 {
                    break;
                }
                if batch.state == MaterialState::WorkInProcess
                    && batch.location == wip_location
                    && &batch.sku == sku
                    && batch.quantity > 0
                    && batch.is_reserved_for(&machine, work_order)
                {
                    let take = outstanding.min(batch.quantity);
                    plan.push((key, take));
                    outstanding -= take;
                }
            }
            if outstanding > 0 {
                let err = InventoryError::MissingBomInput {
                    bom: bom.id.clone(),
                    sku: sku.clone(),
                    required,
                    available: required - outstanding,
                };
                warn!("transform on {machine} for WO {work_order} rejected: {err}");
                return Err(err);
            }
        }

        // Phase 2: output capacity.
        let Some(output_volume) = bom.output_volume() else {
            warn!("transform on {machine} for WO {work_order} rejected: output volume overflows");
            return Err(InventoryError::VolumeOverflow { location: output_location });
        };
        self.update_location_capacity(&output_location, output_volume, 1)?;

        // Phase 3: consume inputs.
        let reference = format!("BOM:{} WO:{work_order}", bom.id);
        let mut parents: Vec<BatchId> = Vec::new();
        for &(key, take) in &plan {
            let Some(batch) = self.batches.get_mut(key) else {
                continue;
            };
            batch.quantity -= take;
            let (id, sku, location, emptied) =
                (batch.id, batch.sku.clone(), batch.location.clone(), batch.quantity == 0);
            if emptied {
                self.destroy(key);
            }
            if !parents.contains(&id) {
                parents.push(id);
            }
            let record = self.record(
                TransactionType::BomConsumption,
                &sku,
                -(take as i64),
                &location,
                id,
                reference.clone(),
            );
            self.ledger.push(record);
        }

        // Phase 4: produce output.
        let mut genealogy = Genealogy::new(self.now).with_source(&machine, work_order);
        genealogy.bom = Some(bom.id.clone());
        let input_count = parents.len();
        genealogy.parents = parents;
        let id = self.spawn(MaterialBatch {
            id: BatchId::NIL,
            sku: bom.output_sku.clone(),
            state: MaterialState::FinishedGoods,
            quantity: bom.output_quantity,
            volume_per_unit: bom.output_volume_per_unit,
            location: output_location.clone(),
            sub_location: None,
            genealogy,
            reservation: None,
        });
        let record = self.record(
            TransactionType::BomProduction,
            &bom.output_sku,
            bom.output_quantity as i64,
            &output_location,
            id,
            format!("Inputs:{input_count}"),
        );
        self.ledger.push(record);
        self.update_aggregates();

        debug!(
            "{machine} transformed {input_count} input batches via {} into {} {} (batch {id})",
            bom.id, bom.output_quantity, bom.output_sku
        );
        self.notify_changed(&bom.output_sku, &output_location, bom.output_quantity as i64);
        Ok(id)
    }

    /// Ship exactly `quantity` unreserved finished units of `sku` from
    /// `location`. Whole batches are removed in slot order; the last one
    /// may be drawn partially.
    pub fn ship_finished_goods(
        &mut self,
        sku: impl Into<Sku>,
        quantity: u32,
        location: impl Into<LocationId>,
    ) -> Result<(), InventoryError> {
        let sku = sku.into();
        let location = location.into();
        if quantity == 0 {
            warn!("rejected shipment of {sku}: quantity is zero");
            return Err(InventoryError::InvalidQuantity { quantity });
        }

        let plan = self.plan_draw(&sku, &location, quantity, Some(MaterialState::FinishedGoods));
        let available: u64 = plan.iter().map(|&(_, take)| take as u64).sum();
        if available < quantity as u64 {
            let err = InventoryError::InsufficientMaterial {
                sku,
                location,
                requested: quantity as u64,
                available,
            };
            warn!("shipment rejected: {err}");
            return Err(err);
        }

        for &(key, take) in &plan {
            let Some(batch) = self.batches.get_mut(key) else {
                continue;
            };
            let volume = batch.volume_of(take);
            batch.quantity -= take;
            let emptied = batch.quantity == 0;
            self.release_capacity(&location, volume, emptied as u32);
            if emptied {
                self.destroy(key);
            }
        }

        let record = self.record(
            TransactionType::Shipment,
            &sku,
            -(quantity as i64),
            &location,
            BatchId::NIL,
            format!("Batches:{}", plan.len()),
        );
        self.ledger.push(record);
        self.update_aggregates();

        debug!("shipped {quantity} {sku} from {location} ({} batches)", plan.len());
        self.notify_changed(&sku, &location, -(quantity as i64));
        Ok(())
    }

    /// Move exactly `quantity` unreserved units of `sku` from `from` to
    /// `to`. Whole batches are relocated; a partially drawn batch is split
    /// and the moved part becomes a new batch whose parent is the original.
    pub fn transfer_material(
        &mut self,
        sku: impl Into<Sku>,
        quantity: u32,
        from: impl Into<LocationId>,
        to: impl Into<LocationId>,
    ) -> Result<(), InventoryError> {
        let sku = sku.into();
        let from = from.into();
        let to = to.into();
        if quantity == 0 {
            warn!("rejected transfer of {sku}: quantity is zero");
            return Err(InventoryError::InvalidQuantity { quantity });
        }
        if from == to {
            warn!("rejected transfer of {sku}: source and destination are both {from}");
            return Err(InventoryError::SameLocation { location: from });
        }

        let plan = self.plan_draw(&sku, &from, quantity, None);
        let available: u64 = plan.iter().map(|&(_, take)| take as u64).sum();
        if available < quantity as u64 {
            let err = InventoryError::InsufficientMaterial {
                sku,
                location: from,
                requested: quantity as u64,
                available,
            };
            warn!("transfer rejected: {err}");
            return Err(err);
        }

        let total_volume = plan
            .iter()
            .filter_map(|&(key, take)| self.batches.get(key).map(|b| b.volume_of(take)))
            .try_fold(Fixed64::ZERO, Fixed64::checked_add);
        let Some(total_volume) = total_volume else {
            warn!("transfer of {quantity} {sku} to {to} rejected: volume overflows");
            return Err(InventoryError::VolumeOverflow { location: to });
        };
        self.update_location_capacity(&to, total_volume, plan.len() as i64)?;

        for &(key, take) in &plan {
            let Some(batch) = self.batches.get_mut(key) else {
                continue;
            };
            let volume = batch.volume_of(take);
            if take == batch.quantity {
                batch.location = to.clone();
                batch.sub_location = None;
                self.release_capacity(&from, volume, 1);
            } else {
                batch.quantity -= take;
                let mut genealogy = batch.genealogy.clone();
                genealogy.parents = vec![batch.id];
                genealogy.created_at = self.now;
                let split = MaterialBatch {
                    id: BatchId::NIL,
                    sku: batch.sku.clone(),
                    state: batch.state,
                    quantity: take,
                    volume_per_unit: batch.volume_per_unit,
                    location: to.clone(),
                    sub_location: None,
                    genealogy,
                    reservation: None,
                };
                self.release_capacity(&from, volume, 0);
                self.spawn(split);
            }
        }

        let record = self.record(
            TransactionType::Transfer,
            &sku,
            quantity as i64,
            &to,
            BatchId::NIL,
            format!("From: {from}"),
        );
        self.ledger.push(record);
        self.update_aggregates();

        debug!("moved {quantity} {sku} from {from} to {to}");
        self.notify_changed(&sku, &from, -(quantity as i64));
        self.notify_changed(&sku, &to, quantity as i64);
        Ok(())
    }

    /// Unreserved batches of `sku` at `location` (optionally of one state),
    /// in slot order, with the units to take from each. The plan stops once
    /// `quantity` is covered; it falls short if stock is insufficient.
    fn plan_draw(
        &self,
        sku: &Sku,
        location: &LocationId,
        quantity: u32,
        state: Option<MaterialState>,
    ) -> Vec<(BatchKey, u32)> {
        let mut plan = Vec::new();
        let mut outstanding = quantity;
        for (key, batch) in &self.batches {
            if outstanding == 0 {
                break;
            }
            if batch.quantity > 0
                && batch.is_free(sku, location)
                && state.is_none_or(|s| batch.state == s)
            {
                let take = outstanding.min(batch.quantity);
                plan.push((key, take));
                outstanding -= take;
            }
        }
        plan
    }

    // -----------------------------------------------------------------------
    // Bookkeeping
    // -----------------------------------------------------------------------

    fn spawn(&mut self, mut batch: MaterialBatch) -> BatchId {
        batch.id = self.ids.next_id();
        let id = batch.id;
        let key = self.batches.insert(batch);
        self.by_id.insert(id, key);
        id
    }

    fn destroy(&mut self, key: BatchKey) -> Option<MaterialBatch> {
        let batch = self.batches.remove(key)?;
        self.by_id.remove(&batch.id);
        Some(batch)
    }

    fn record(
        &self,
        kind: TransactionType,
        sku: &Sku,
        delta: i64,
        location: &LocationId,
        batch: BatchId,
        reference: String,
    ) -> InventoryTransaction {
        InventoryTransaction {
            kind,
            sku: sku.clone(),
            delta,
            location: location.clone(),
            sub_location: None,
            batch,
            timestamp: self.now,
            reference,
        }
    }

    fn update_aggregates(&mut self) {
        self.summaries.clear();
        for batch in self.batches.values() {
            self.summaries
                .entry(batch.sku.clone())
                .or_insert_with(|| InventorySummary::empty(batch.sku.clone()))
                .add(batch);
        }
    }

    fn notify_changed(&mut self, sku: &Sku, location: &LocationId, delta: i64) {
        self.events.emit(Event::InventoryChanged {
            sku: sku.clone(),
            location: location.clone(),
            delta,
        });
        if delta >= 0 {
            return;
        }
        if let Some(&threshold) = self.low_stock.get(sku) {
            let remaining = self.available_quantity(sku.as_str(), None);
            if remaining < threshold {
                warn!("{sku} low: {remaining} available, threshold {threshold}");
                self.events.emit(Event::LowStock {
                    sku: sku.clone(),
                    remaining,
                });
            }
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Aggregate for `sku`; empty if none is held.
    pub fn inventory_summary(&self, sku: &str) -> InventorySummary {
        self.summaries
            .get(sku)
            .cloned()
            .unwrap_or_else(|| InventorySummary::empty(Sku::from(sku)))
    }

    pub fn summaries(&self) -> impl Iterator<Item = &InventorySummary> {
        self.summaries.values()
    }

    /// Unreserved units of `sku`, everywhere or at one location.
    pub fn available_quantity(&self, sku: &str, location: Option<&str>) -> u64 {
        match location {
            None => self
                .summaries
                .get(sku)
                .map_or(0, InventorySummary::available_quantity),
            Some(location) => self
                .batches
                .values()
                .filter(|b| !b.is_reserved() && b.sku.as_str() == sku && b.location.as_str() == location)
                .map(|b| b.quantity as u64)
                .sum(),
        }
    }

    /// Units of `sku` at `location` in a given state, reserved or not.
    pub fn quantity_in_state(&self, sku: &str, location: &str, state: MaterialState) -> u64 {
        self.batches
            .values()
            .filter(|b| b.state == state && b.sku.as_str() == sku && b.location.as_str() == location)
            .map(|b| b.quantity as u64)
            .sum()
    }

    /// Units held in any state by any batch.
    pub fn total_units(&self) -> u64 {
        self.batches.values().map(|b| b.quantity as u64).sum()
    }

    pub fn inventory_at_location(&self, location: &str) -> Vec<LocationInventoryItem> {
        query::group_at_location(self.batches.values(), &LocationId::from(location))
    }

    /// The most recent `max` ledger records, oldest first.
    pub fn transaction_history(&self, max: usize) -> Vec<&InventoryTransaction> {
        self.ledger.recent(max).collect()
    }

    pub fn ledger(&self) -> &TransactionLedger {
        &self.ledger
    }

    pub fn batch(&self, id: BatchId) -> Option<&MaterialBatch> {
        self.by_id.get(&id).and_then(|&key| self.batches.get(key))
    }

    /// Live batches in slot order.
    pub fn batches(&self) -> impl Iterator<Item = &MaterialBatch> {
        self.batches.values()
    }

    pub fn batch_count(&self) -> usize {
        self.batches.len()
    }

    /// Walk a batch's ancestry breadth first. Ancestors that no longer
    /// exist are still listed by id.
    pub fn lineage(&self, id: BatchId) -> Vec<BatchId> {
        let mut out = Vec::new();
        let mut frontier = vec![id];
        while let Some(next) = frontier.pop() {
            let Some(batch) = self.batch(next) else {
                continue;
            };
            for &parent in &batch.genealogy.parents {
                if !out.contains(&parent) {
                    out.push(parent);
                    frontier.insert(0, parent);
                }
            }
        }
        out
    }

    pub fn snapshot(&self) -> InventorySnapshot {
        InventorySnapshot {
            batches: self.batches.values().cloned().collect(),
            locations: self.locations.values().cloned().collect(),
            ledger_len: self.ledger.len(),
            ledger_pruned: self.ledger.pruned_count(),
        }
    }

    /// Serialize [`Inventory::snapshot`] as pretty JSON.
    #[cfg(feature = "json")]
    pub fn snapshot_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.snapshot())
    }

    /// Order-sensitive digest of batches and capacity usage. Equal across
    /// runs when the same seeded call sequence was applied.
    pub fn state_hash(&self) -> u64 {
        let mut h = StateHash::new();
        h.write_u64(self.batches.len() as u64);
        for batch in self.batches.values() {
            h.write(batch.id.0.as_bytes());
            h.write_str(batch.sku.as_str());
            h.write_str(batch.state.as_str());
            h.write_u32(batch.quantity);
            h.write_fixed64(batch.volume_per_unit);
            h.write_str(batch.location.as_str());
            match &batch.reservation {
                Some(r) => {
                    h.write_u32(1);
                    h.write_u64(r.work_order.0 as u64);
                    h.write_str(r.machine.as_str());
                }
                None => h.write_u32(0),
            }
        }
        for cap in self.locations.values() {
            h.write_str(cap.location.as_str());
            h.write_fixed64(cap.current_volume);
            h.write_u32(cap.current_items);
        }
        h.finish()
    }
}

// ===========================================================================
// Tests
// ===========================================================================
