//! Scenario loading: read a directory of data files, validate names and
//! references, then build a ready-to-run inventory and scheduler.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::de::DeserializeOwned;
use shopfloor_core::batch::BatchIdSource;
use shopfloor_core::bom::BomEntry;
use shopfloor_core::config::SessionConfig;
use shopfloor_core::inventory::Inventory;
use shopfloor_core::scheduler::Scheduler;

use crate::loader::{
    DataLoadError, check_unique, deserialize_file, deserialize_list, find_data_file, parse_volume,
    require_data_file, resolve_name,
};
use crate::schema::*;

/// Everything read from a scenario directory, validated but not yet built.
#[derive(Debug, Clone, Default)]
pub struct ScenarioData {
    pub session: SessionConfig,
    pub locations: Vec<LocationData>,
    pub boms: Vec<BomData>,
    pub materials: Vec<MaterialData>,
    pub machines: Vec<MachineData>,
    pub operators: Vec<OperatorData>,
    pub work_orders: Vec<WorkOrderData>,
    /// Which file each section came from, for error reports.
    sources: HashMap<&'static str, PathBuf>,
}

/// A built scenario, ready to hand to a session context.
#[derive(Debug)]
pub struct LoadedScenario {
    pub config: SessionConfig,
    pub inventory: Inventory,
    pub scheduler: Scheduler,
}

/// Load and validate the scenario in `dir`. Only `locations` is required.
pub fn load_scenario(dir: &Path) -> Result<ScenarioData, DataLoadError> {
    let mut data = ScenarioData::default();

    let locations = require_data_file(dir, "locations")?;
    data.locations = deserialize_list(&locations, "locations")?;
    data.sources.insert("locations", locations);

    if let Some(path) = find_data_file(dir, "session")? {
        data.session = deserialize_file(&path)?;
        data.sources.insert("session", path);
    }
    data.boms = load_optional(dir, "boms", &mut data.sources)?;
    data.materials = load_optional(dir, "materials", &mut data.sources)?;
    data.machines = load_optional(dir, "machines", &mut data.sources)?;
    data.operators = load_optional(dir, "operators", &mut data.sources)?;
    data.work_orders = load_optional(dir, "work_orders", &mut data.sources)?;

    data.validate()?;
    info!(
        "scenario loaded from {}: {} locations, {} boms, {} materials, {} machines, {} work orders",
        dir.display(),
        data.locations.len(),
        data.boms.len(),
        data.materials.len(),
        data.machines.len(),
        data.work_orders.len()
    );
    Ok(data)
}

fn load_optional<T: DeserializeOwned>(
    dir: &Path,
    name: &'static str,
    sources: &mut HashMap<&'static str, PathBuf>,
) -> Result<Vec<T>, DataLoadError> {
    let Some(path) = find_data_file(dir, name)? else {
        debug!("no {name} file in {}", dir.display());
        return Ok(Vec::new());
    };
    let list = deserialize_list(&path, name)?;
    sources.insert(name, path);
    Ok(list)
}

impl ScenarioData {
    fn source(&self, section: &'static str) -> PathBuf {
        self.sources
            .get(section)
            .cloned()
            .unwrap_or_else(|| PathBuf::from(section))
    }

    /// Unique names in every list; materials and operators refer only to
    /// declared locations and machines. Every volume fits the fixed-point
    /// range.
    pub fn validate(&self) -> Result<(), DataLoadError> {
        let locations = check_unique(self.locations.iter().map(|l| l.name.as_str()), &self.source("locations"))?;
        check_unique(self.boms.iter().map(|b| b.id.as_str()), &self.source("boms"))?;
        let machines = check_unique(self.machines.iter().map(|m| m.name.as_str()), &self.source("machines"))?;
        check_unique(self.operators.iter().map(|o| o.name.as_str()), &self.source("operators"))?;

        let ids: Vec<String> = self.work_orders.iter().map(|w| w.id.to_string()).collect();
        check_unique(ids.iter().map(String::as_str), &self.source("work_orders"))?;

        let source = self.source("locations");
        for l in &self.locations {
            parse_volume(l.max_volume, &source, "max_volume")?;
        }
        let boms = self.source("boms");
        for b in &self.boms {
            parse_volume(b.output_volume_per_unit, &boms, "output_volume_per_unit")?;
        }
        let materials = self.source("materials");
        for m in &self.materials {
            resolve_name(&locations, &m.location, &materials, "location")?;
            parse_volume(m.volume_per_unit, &materials, "volume_per_unit")?;
        }
        let operators = self.source("operators");
        for o in &self.operators {
            if let Some(machine) = &o.machine {
                resolve_name(&machines, machine, &operators, "machine")?;
            }
        }
        Ok(())
    }

    /// Build the inventory and scheduler. Batch ids are seeded from the
    /// session seed when one is set, so a fixed-seed scenario builds
    /// identically every time.
    pub fn build(&self) -> Result<LoadedScenario, DataLoadError> {
        let config = self.session.clone();
        let ids = config
            .seed
            .map_or(BatchIdSource::Random, |seed| BatchIdSource::seeded(seed as u64));
        let mut inventory = Inventory::with_id_source(ids).with_event_history(config.event_history);
        if let Some(start) = config.course_start {
            inventory.set_time(start);
        }

        let locations = self.source("locations");
        for l in &self.locations {
            let max_volume = parse_volume(l.max_volume, &locations, "max_volume")?;
            inventory.register_location(l.name.as_str(), l.kind, max_volume, l.max_items);
        }
        let boms = self.source("boms");
        for b in &self.boms {
            let output_volume = parse_volume(b.output_volume_per_unit, &boms, "output_volume_per_unit")?;
            let bom = b
                .inputs
                .iter()
                .fold(BomEntry::new(b.id.as_str(), b.output_sku.as_str()), |bom, (sku, qty)| {
                    bom.with_input(sku.as_str(), *qty)
                })
                .with_output(b.output_quantity, output_volume);
            inventory.register_bom(bom).map_err(|source| DataLoadError::Rejected {
                file: boms.clone(),
                source,
            })?;
        }
        let materials = self.source("materials");
        for m in &self.materials {
            inventory
                .add_raw_material(
                    m.sku.as_str(),
                    m.quantity,
                    m.location.as_str(),
                    m.sub_location.as_deref(),
                    parse_volume(m.volume_per_unit, &materials, "volume_per_unit")?,
                )
                .map_err(|source| DataLoadError::Rejected {
                    file: materials.clone(),
                    source,
                })?;
            if let Some(threshold) = m.low_stock_threshold {
                inventory.set_low_stock_threshold(m.sku.as_str(), threshold);
            }
        }

        let mut scheduler = Scheduler::new().with_event_history(config.event_history);
        if let Some(start) = config.course_start {
            scheduler.set_time(start);
        }
        for m in &self.machines {
            scheduler.register_machine(m.name.as_str());
        }
        for o in &self.operators {
            scheduler.register_operator(o.name.as_str());
            if let Some(machine) = &o.machine {
                scheduler.assign_operator(o.name.as_str(), machine.as_str());
            }
        }
        scheduler.load_schedule(self.work_orders.iter().map(WorkOrderData::to_work_order));

        Ok(LoadedScenario {
            config,
            inventory,
            scheduler,
        })
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn location(name: &str) -> LocationData {
        LocationData {
            name: name.to_string(),
            kind: Default::default(),
            max_volume: 0.0,
            max_items: 0,
        }
    }

    #[test]
    fn unknown_material_location_is_unresolved() {
        let data = ScenarioData {
            locations: vec![location("Rack")],
            materials: vec![MaterialData {
                sku: "Steel_Bar".into(),
                quantity: 5,
                location: "Dock".into(),
                sub_location: None,
                volume_per_unit: 1.0,
                low_stock_threshold: None,
            }],
            ..Default::default()
        };
        assert!(matches!(
            data.validate(),
            Err(DataLoadError::UnresolvedRef { expected_kind: "location", ref name, .. }) if name == "Dock"
        ));
    }

    #[test]
    fn duplicate_work_order_ids_are_rejected() {
        let order = WorkOrderData {
            id: 7,
            sku: "Gear".into(),
            quantity: 1,
            unit: Default::default(),
            due_date: None,
            priority: Default::default(),
            cost: 0.0,
        };
        let data = ScenarioData {
            locations: vec![location("Rack")],
            work_orders: vec![order.clone(), order],
            ..Default::default()
        };
        assert!(matches!(
            data.validate(),
            Err(DataLoadError::DuplicateName { ref name, .. }) if name == "7"
        ));
    }

    #[test]
    fn build_surfaces_inventory_rejections() {
        let mut rack = location("Rack");
        rack.max_volume = 1.0;
        let data = ScenarioData {
            locations: vec![rack],
            materials: vec![MaterialData {
                sku: "Steel_Bar".into(),
                quantity: 5,
                location: "Rack".into(),
                sub_location: None,
                volume_per_unit: 1.0,
                low_stock_threshold: None,
            }],
            ..Default::default()
        };
        data.validate().unwrap();
        let err = data.build().unwrap_err();
        assert!(matches!(err, DataLoadError::Rejected { .. }));
    }

    #[test]
    fn negative_volume_per_unit_is_invalid() {
        let data = ScenarioData {
            locations: vec![location("Rack")],
            materials: vec![MaterialData {
                sku: "Steel_Bar".into(),
                quantity: 5,
                location: "Rack".into(),
                sub_location: None,
                volume_per_unit: -1.0,
                low_stock_threshold: None,
            }],
            ..Default::default()
        };
        assert!(matches!(
            data.validate(),
            Err(DataLoadError::InvalidValue { field: "volume_per_unit", value, .. }) if value == -1.0
        ));
        assert!(matches!(data.build(), Err(DataLoadError::InvalidValue { .. })));
    }

    #[test]
    fn overflowing_receipt_is_rejected_at_build() {
        let data = ScenarioData {
            locations: vec![location("Yard")],
            materials: vec![MaterialData {
                sku: "Gravel".into(),
                quantity: 3_000_000_000,
                location: "Yard".into(),
                sub_location: None,
                volume_per_unit: 1.0,
                low_stock_threshold: None,
            }],
            ..Default::default()
        };
        data.validate().unwrap();
        assert!(matches!(
            data.build(),
            Err(DataLoadError::Rejected {
                source: shopfloor_core::error::InventoryError::VolumeOverflow { .. },
                ..
            })
        ));
    }

    #[test]
    fn build_assigns_operators_and_schedule() {
        let data = ScenarioData {
            locations: vec![location("Rack")],
            machines: vec![MachineData { name: "M1".into() }],
            operators: vec![OperatorData {
                name: "Ana".into(),
                machine: Some("M1".into()),
            }],
            work_orders: vec![WorkOrderData {
                id: 1,
                sku: "Gear".into(),
                quantity: 3,
                unit: Default::default(),
                due_date: None,
                priority: Default::default(),
                cost: 0.0,
            }],
            ..Default::default()
        };
        let built = data.build().unwrap();
        assert_eq!(built.scheduler.operator("Ana").unwrap().machine.as_ref().unwrap().as_str(), "M1");
        assert_eq!(
            built.scheduler.next_for_machine("M1").map(|o| o.id.0),
            Some(1)
        );
    }
}
