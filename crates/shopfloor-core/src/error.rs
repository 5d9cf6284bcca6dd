use crate::fixed::Volume;
use crate::id::*;

/// Why an inventory transaction was rejected. Every variant is a business
/// rule rejection: the inventory is left exactly as it was before the call.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InventoryError {
    #[error("quantity must be positive, got {quantity}")]
    InvalidQuantity { quantity: u32 },

    #[error("volume per unit must not be negative, got {volume_per_unit}")]
    InvalidVolume { volume_per_unit: Volume },

    #[error("volume at '{location}' would overflow the representable range")]
    VolumeOverflow { location: LocationId },

    #[error("location '{location}' lacks room for {required} volume ({remaining} remaining)")]
    InsufficientCapacity {
        location: LocationId,
        required: Volume,
        remaining: Volume,
    },

    #[error("location '{location}' would hold {items} batches, limit is {max_items}")]
    ItemLimitExceeded {
        location: LocationId,
        items: u32,
        max_items: u32,
    },

    #[error("only {available} of {requested} '{sku}' available at '{location}'")]
    InsufficientMaterial {
        sku: Sku,
        location: LocationId,
        requested: u64,
        available: u64,
    },

    #[error("no reserved '{sku}' for machine '{machine}' on work order {work_order}")]
    NoReservedMaterial {
        machine: MachineId,
        work_order: WorkOrderId,
        sku: Sku,
    },

    #[error("no work in process at machine '{machine}' for work order {work_order}")]
    NoWorkInProcess {
        machine: MachineId,
        work_order: WorkOrderId,
    },

    #[error("unknown bill of materials '{bom}'")]
    UnknownBom { bom: BomId },

    #[error("BOM '{bom}' needs {required} '{sku}' in WIP, only {available} reserved")]
    MissingBomInput {
        bom: BomId,
        sku: Sku,
        required: u32,
        available: u32,
    },

    #[error("source and destination are both '{location}'")]
    SameLocation { location: LocationId },
}
