//! Capacity-constrained storage locations.

use serde::{Deserialize, Serialize};

use crate::error::InventoryError;
use crate::fixed::{Fixed64, Volume, fixed64_to_f64};
use crate::id::LocationId;

/// Usage percentage above which a capacity warning is raised.
pub const CAPACITY_WARNING_PERCENT: f64 = 80.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LocationType {
    #[default]
    Warehouse,
    MachineBuffer,
    Staging,
    Shipping,
    Scrap,
    Other,
}

/// Capacity limits and current usage of one location.
///
/// A limit of zero leaves that dimension unconstrained; usage is still
/// tracked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationCapacity {
    pub location: LocationId,
    pub location_type: LocationType,
    pub max_volume: Volume,
    /// Maximum number of batches.
    pub max_items: u32,
    pub current_volume: Volume,
    pub current_items: u32,
}

impl LocationCapacity {
    pub fn new(
        location: LocationId,
        location_type: LocationType,
        max_volume: Volume,
        max_items: u32,
    ) -> Self {
        Self {
            location,
            location_type,
            max_volume: max_volume.max(Fixed64::ZERO),
            max_items,
            current_volume: Fixed64::ZERO,
            current_items: 0,
        }
    }

    /// Tracked but unconstrained. Used for locations first seen implicitly.
    pub fn unconstrained(location: LocationId) -> Self {
        Self::new(location, LocationType::Other, Fixed64::ZERO, 0)
    }

    pub fn has_volume_limit(&self) -> bool {
        self.max_volume > Fixed64::ZERO
    }

    pub fn has_item_limit(&self) -> bool {
        self.max_items > 0
    }

    pub fn is_constrained(&self) -> bool {
        self.has_volume_limit() || self.has_item_limit()
    }

    /// Volume still available, or `Volume::MAX` without a volume limit.
    pub fn remaining_volume(&self) -> Volume {
        if self.has_volume_limit() {
            (self.max_volume - self.current_volume).max(Fixed64::ZERO)
        } else {
            Volume::MAX
        }
    }

    /// Whether `volume` more would fit by volume.
    pub fn can_fit(&self, volume: Volume) -> bool {
        self.remaining_volume() >= volume
    }

    /// Highest usage across constrained dimensions, 0-100+.
    pub fn usage_percent(&self) -> f64 {
        let mut pct: f64 = 0.0;
        if self.has_volume_limit() {
            pct = pct.max(
                fixed64_to_f64(self.current_volume) / fixed64_to_f64(self.max_volume) * 100.0,
            );
        }
        if self.has_item_limit() {
            pct = pct.max(self.current_items as f64 / self.max_items as f64 * 100.0);
        }
        pct
    }

    pub fn is_at_capacity(&self) -> bool {
        (self.has_volume_limit() && self.current_volume >= self.max_volume)
            || (self.has_item_limit() && self.current_items >= self.max_items)
    }

    /// Give back volume and batch slots. Never rejected; floors at zero.
    pub fn release(&mut self, volume: Volume, items: u32) {
        self.current_volume = (self.current_volume - volume.max(Fixed64::ZERO)).max(Fixed64::ZERO);
        self.current_items = self.current_items.saturating_sub(items);
    }

    /// Apply signed deltas if the result stays within limits. Usage is
    /// floored at zero. On `Err` nothing changes.
    pub fn try_apply(&mut self, volume_delta: Volume, items_delta: i64) -> Result<(), InventoryError> {
        let Some(new_volume) = self.current_volume.checked_add(volume_delta) else {
            return Err(InventoryError::VolumeOverflow {
                location: self.location.clone(),
            });
        };
        let new_items = self.current_items as i64 + items_delta;

        if self.has_volume_limit() && new_volume > self.max_volume {
            return Err(InventoryError::InsufficientCapacity {
                location: self.location.clone(),
                required: volume_delta,
                remaining: self.remaining_volume(),
            });
        }
        if self.has_item_limit() && new_items > self.max_items as i64 {
            return Err(InventoryError::ItemLimitExceeded {
                location: self.location.clone(),
                items: new_items.clamp(0, u32::MAX as i64) as u32,
                max_items: self.max_items,
            });
        }

        self.current_volume = new_volume.max(Fixed64::ZERO);
        self.current_items = new_items.clamp(0, u32::MAX as i64) as u32;
        Ok(())
    }
}
