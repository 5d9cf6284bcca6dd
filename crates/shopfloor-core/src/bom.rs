use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::fixed::{Volume, f64_to_fixed64, volume_for};
use crate::id::{BomId, Sku};

/// A bill of materials: consumes `inputs` from a machine's WIP and produces
/// `output_quantity` units of `output_sku`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BomEntry {
    pub id: BomId,
    pub output_sku: Sku,
    pub output_quantity: u32,
    pub output_volume_per_unit: Volume,
    /// Required quantity per input SKU. Ordered so validation and
    /// consumption visit inputs in a stable order.
    pub inputs: BTreeMap<Sku, u32>,
}

impl BomEntry {
    /// A BOM producing one unit of `output_sku` at 0.01 volume per unit.
    pub fn new(id: impl Into<BomId>, output_sku: impl Into<Sku>) -> Self {
        Self {
            id: id.into(),
            output_sku: output_sku.into(),
            output_quantity: 1,
            output_volume_per_unit: f64_to_fixed64(0.01),
            inputs: BTreeMap::new(),
        }
    }

    pub fn with_input(mut self, sku: impl Into<Sku>, quantity: u32) -> Self {
        self.inputs.insert(sku.into(), quantity);
        self
    }

    pub fn with_output(mut self, quantity: u32, volume_per_unit: Volume) -> Self {
        self.output_quantity = quantity;
        self.output_volume_per_unit = volume_per_unit;
        self
    }

    /// Volume of one invocation's output, `None` on overflow.
    pub fn output_volume(&self) -> Option<Volume> {
        volume_for(self.output_quantity, self.output_volume_per_unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_collects_inputs() {
        let bom = BomEntry::new("B1", "Widget")
            .with_input("PartA", 2)
            .with_input("PartB", 1);
        assert_eq!(bom.inputs.len(), 2);
        assert_eq!(bom.inputs[&Sku::from("PartA")], 2);
        assert_eq!(bom.output_quantity, 1);
    }

    #[test]
    fn output_volume_scales() {
        let bom = BomEntry::new("B2", "Crate").with_output(4, f64_to_fixed64(0.5));
        assert_eq!(bom.output_volume(), Some(f64_to_fixed64(2.0)));
    }

    #[test]
    fn inputs_iterate_in_sku_order() {
        let bom = BomEntry::new("B3", "Kit")
            .with_input("Zeta", 1)
            .with_input("Alpha", 1);
        let order: Vec<&str> = bom.inputs.keys().map(Sku::as_str).collect();
        assert_eq!(order, vec!["Alpha", "Zeta"]);
    }
}
