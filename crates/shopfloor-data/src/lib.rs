//! Data-driven scenario loading for the shop-floor simulation.
//!
//! A scenario is a directory of data files, each in RON, TOML or JSON
//! (detected by extension; two formats for the same base name is an error):
//!
//! - `locations` (required): storage locations and their limits
//! - `session`: a [`SessionConfig`] (tick interval, course start, seed)
//! - `boms`: bills of materials
//! - `materials`: opening stock
//! - `machines`, `operators`: the floor
//! - `work_orders`: the schedule
//!
//! TOML list files hold their entries as an array of tables under the base
//! name, e.g. `[[locations]]`.
//!
//! [`load_scenario`] reads and validates the directory;
//! [`ScenarioData::build`] produces an [`Inventory`] and [`Scheduler`] ready
//! for a session context.
//!
//! [`SessionConfig`]: shopfloor_core::config::SessionConfig
//! [`Inventory`]: shopfloor_core::inventory::Inventory
//! [`Scheduler`]: shopfloor_core::scheduler::Scheduler

pub mod loader;
pub mod scenario;
pub mod schema;

pub use loader::DataLoadError;
pub use scenario::{LoadedScenario, ScenarioData, load_scenario};
