//! Shopfloor Core -- a deterministic discrete-event shop-floor simulation.
//!
//! This crate provides the session orchestrator and fixed-step clock, keyed
//! reproducible random streams, the work order scheduler, and the
//! batch-level inventory and material flow engine that machine behavior
//! drivers build on.
//!
//! # Tick Loop
//!
//! Once a session is running, each tick of [`orchestrator::Orchestrator`]
//! does the following, in order:
//!
//! 1. **Clock** -- Advance the tick counter and simulation time by exactly
//!    one tick interval.
//! 2. **Time push** -- Hand the new simulation time to the scheduler and the
//!    inventory so their records are stamped with it.
//! 3. **Random** -- Move the random provider to the new tick so every keyed
//!    draw is a pure function of (seed, tick, key, channel).
//! 4. **Consumers** -- Call every registered [`driver::TickConsumer`] in
//!    registration order with the [`session::SessionContext`].
//! 5. **Metrics** -- Let the metrics sink close out the tick.
//!
//! Wall-clock pacing only decides *how many* ticks run; the speed multiplier
//! never changes the simulated interval.
//!
//! # Inventory Transactions
//!
//! Every inventory operation validates first and mutates last. Capacity is
//! the final fallible step, so a rejected operation leaves no trace:
//!
//! ```rust,ignore
//! let batch = inventory.add_raw_material("Steel_Bar", 100, "Warehouse_A", None, vpu)?;
//! inventory.reserve_material("Steel_Bar", 5, "Warehouse_A", WorkOrderId(1), "M1")?;
//! inventory.consume_reserved_material("M1", WorkOrderId(1), "Steel_Bar")?;
//! inventory.produce_finished_good("M1", WorkOrderId(1), "Gear", "FG_Store")?;
//! ```
//!
//! # Key Types
//!
//! - [`orchestrator::Orchestrator`] -- Session lifecycle, pacing, and the
//!   tick loop.
//! - [`random::RandomStreams`] -- Keyed deterministic draws plus a
//!   sequential fallback stream.
//! - [`scheduler::Scheduler`] -- Work orders, machine queues, and operator
//!   assignment.
//! - [`inventory::Inventory`] -- Batches, locations, reservations, BOM
//!   transforms, and the transaction ledger.
//! - [`metrics::MetricsSink`] -- One-way production telemetry seam.
//! - [`fixed::Fixed64`] -- Q32.32 fixed-point type for volumes.
//! - [`event::EventBus`] -- Typed notifications with bounded history.

pub mod batch;
pub mod bom;
pub mod clock;
pub mod config;
pub mod driver;
pub mod error;
pub mod event;
pub mod fixed;
pub mod hash;
pub mod id;
pub mod inventory;
pub mod ledger;
pub mod location;
pub mod metrics;
pub mod orchestrator;
pub mod query;
pub mod random;
pub mod rng;
pub mod scheduler;
pub mod session;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
