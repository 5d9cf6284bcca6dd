//! Serde structs for scenario data files.
//!
//! Each list file (`locations`, `boms`, `materials`, `machines`,
//! `operators`, `work_orders`) deserializes to a `Vec` of one of these; the
//! optional `session` file is a [`SessionConfig`] directly.
//!
//! [`SessionConfig`]: shopfloor_core::config::SessionConfig

use chrono::{DateTime, Utc};
use serde::Deserialize;
use shopfloor_core::location::LocationType;
use shopfloor_core::scheduler::{UnitOfMeasure, WorkOrder, WorkOrderPriority};

// ===========================================================================
// Inventory
// ===========================================================================

/// A storage location. Zero limits leave that dimension unconstrained.
#[derive(Debug, Clone, Deserialize)]
pub struct LocationData {
    pub name: String,
    #[serde(default)]
    pub kind: LocationType,
    #[serde(default)]
    pub max_volume: f64,
    #[serde(default)]
    pub max_items: u32,
}

/// A bill of materials: `inputs` are `(sku, quantity)` pairs.
#[derive(Debug, Clone, Deserialize)]
pub struct BomData {
    pub id: String,
    pub output_sku: String,
    pub inputs: Vec<(String, u32)>,
    #[serde(default = "default_one")]
    pub output_quantity: u32,
    #[serde(default = "default_volume")]
    pub output_volume_per_unit: f64,
}

/// Opening stock, received as raw material when the scenario is built.
#[derive(Debug, Clone, Deserialize)]
pub struct MaterialData {
    pub sku: String,
    pub quantity: u32,
    pub location: String,
    #[serde(default)]
    pub sub_location: Option<String>,
    #[serde(default = "default_volume")]
    pub volume_per_unit: f64,
    /// Raise `LowStock` when available units fall below this.
    #[serde(default)]
    pub low_stock_threshold: Option<u64>,
}

fn default_one() -> u32 {
    1
}

fn default_volume() -> f64 {
    1.0
}

// ===========================================================================
// Scheduling
// ===========================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct MachineData {
    pub name: String,
}

/// An operator, optionally bound to a machine at start.
#[derive(Debug, Clone, Deserialize)]
pub struct OperatorData {
    pub name: String,
    #[serde(default)]
    pub machine: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkOrderData {
    pub id: i64,
    pub sku: String,
    pub quantity: u32,
    #[serde(default)]
    pub unit: UnitOfMeasure,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub priority: WorkOrderPriority,
    #[serde(default)]
    pub cost: f64,
}

impl WorkOrderData {
    pub fn to_work_order(&self) -> WorkOrder {
        let mut order = WorkOrder::new(self.id, self.sku.as_str(), self.quantity)
            .with_unit(self.unit)
            .with_priority(self.priority)
            .with_cost(self.cost);
        if let Some(due) = self.due_date {
            order = order.with_due_date(due);
        }
        order
    }
}

// ===========================================================================
// Tests
// ===========================================================================
