use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

new_key_type! {
    /// Arena handle for a live material batch. Generation-checked, so a
    /// handle to a destroyed batch never resolves to its slot's new tenant.
    pub struct BatchKey;
}

/// Globally unique batch identity, stable for the life of the batch and
/// recorded in genealogy and the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchId(pub uuid::Uuid);

impl BatchId {
    /// The all-zero id. Used as a ledger placeholder for records that are
    /// not tied to one batch (e.g. multi-batch shipments).
    pub const NIL: BatchId = BatchId(uuid::Uuid::nil());

    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }
}

impl std::fmt::Display for BatchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Identifies a work order. Assigned externally (ERP side), never generated
/// by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkOrderId(pub i64);

impl std::fmt::Display for WorkOrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&$name> for $name {
            fn from(value: &$name) -> Self {
                value.clone()
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id! {
    /// Stock-keeping unit: the item type of a batch.
    Sku
}

string_id! {
    /// Named storage location (warehouse, machine buffer, shipping dock...).
    LocationId
}

string_id! {
    /// Identifies a machine registered with the scheduler.
    MachineId
}

string_id! {
    /// Identifies an operator that can be bound to a machine.
    OperatorId
}

string_id! {
    /// Identifies a bill-of-materials entry.
    BomId
}

impl MachineId {
    /// The machine's work-in-process location, `"{machine}.WIP"`.
    pub fn wip_location(&self) -> LocationId {
        LocationId(format!("{}.WIP", self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn string_ids_compare_by_value() {
        assert_eq!(Sku::from("Steel_Bar"), Sku::new("Steel_Bar".to_string()));
        assert_ne!(Sku::from("Steel_Bar"), Sku::from("Steel_Rod"));
    }

    #[test]
    fn string_ids_borrow_as_str_for_lookup() {
        let mut map = HashMap::new();
        map.insert(LocationId::from("Warehouse_A"), 3);
        assert_eq!(map.get("Warehouse_A"), Some(&3));
    }

    #[test]
    fn wip_location_suffix() {
        let machine = MachineId::from("CNC_01");
        assert_eq!(machine.wip_location().as_str(), "CNC_01.WIP");
    }

    #[test]
    fn work_order_id_orders_numerically() {
        assert!(WorkOrderId(2) < WorkOrderId(10));
        assert_eq!(WorkOrderId(42).to_string(), "42");
    }

    #[test]
    fn nil_batch_id() {
        assert!(BatchId::NIL.is_nil());
        assert!(!BatchId(uuid::Uuid::new_v4()).is_nil());
    }
}
