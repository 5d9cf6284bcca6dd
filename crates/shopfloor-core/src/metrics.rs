//! The metrics seam: fire-and-forget notifications from machine drivers.
//!
//! The core never reads anything back from a sink. Aggregation, rolling
//! windows and export live in the `shopfloor-stats` crate, which provides
//! the concrete recorder.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::{MachineId, Sku, WorkOrderId};

/// Operating state of a machine as reported to metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MachineState {
    #[default]
    Idle,
    Processing,
    Jammed,
    MinorStop,
    Breakdown,
    Completed,
    Changeover,
    Maintenance,
    Unavailable,
}

impl MachineState {
    pub fn as_str(self) -> &'static str {
        match self {
            MachineState::Idle => "Idle",
            MachineState::Processing => "Processing",
            MachineState::Jammed => "Jammed",
            MachineState::MinorStop => "MinorStop",
            MachineState::Breakdown => "Breakdown",
            MachineState::Completed => "Completed",
            MachineState::Changeover => "Changeover",
            MachineState::Maintenance => "Maintenance",
            MachineState::Unavailable => "Unavailable",
        }
    }

    /// Unplanned stops.
    pub fn is_down(self) -> bool {
        matches!(
            self,
            MachineState::Jammed | MachineState::MinorStop | MachineState::Breakdown
        )
    }
}

impl std::fmt::Display for MachineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkOrderEventKind {
    Assigned,
    Started,
    Completed,
    Cancelled,
}

impl WorkOrderEventKind {
    /// Event type label used in exported metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            WorkOrderEventKind::Assigned => "WorkOrderAssigned",
            WorkOrderEventKind::Started => "WorkOrderStarted",
            WorkOrderEventKind::Completed => "WorkOrderCompleted",
            WorkOrderEventKind::Cancelled => "WorkOrderCancelled",
        }
    }
}

impl std::fmt::Display for WorkOrderEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receives production telemetry. Every method is a one-way notification.
///
/// `end_tick` and `flush` are driven by the orchestrator after every tick
/// and at session end; both default to no-ops.
pub trait MetricsSink: std::fmt::Debug {
    /// Downcast to `&dyn Any` to reach the concrete sink after a run.
    fn as_any(&self) -> &dyn std::any::Any;

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any;

    fn record_state_change(
        &mut self,
        machine: &MachineId,
        from: MachineState,
        to: MachineState,
        at: DateTime<Utc>,
    );

    fn record_good_production(&mut self, machine: &MachineId, units: u32, sku: &Sku, at: DateTime<Utc>);

    fn record_scrap(&mut self, machine: &MachineId, units: u32, sku: &Sku, at: DateTime<Utc>);

    fn record_work_order_event(
        &mut self,
        machine: &MachineId,
        work_order: WorkOrderId,
        kind: WorkOrderEventKind,
        at: DateTime<Utc>,
    );

    fn record_changeover(
        &mut self,
        machine: &MachineId,
        from_sku: &Sku,
        to_sku: &Sku,
        duration_secs: f64,
        at: DateTime<Utc>,
    );

    fn record_jam(&mut self, machine: &MachineId, duration_secs: f64, at: DateTime<Utc>);

    fn end_tick(&mut self, tick: u64) {
        let _ = tick;
    }

    fn flush(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downtime_states() {
        assert!(MachineState::Jammed.is_down());
        assert!(MachineState::Breakdown.is_down());
        assert!(!MachineState::Processing.is_down());
        assert!(!MachineState::Maintenance.is_down());
    }

    #[test]
    fn labels() {
        assert_eq!(MachineState::default().to_string(), "Idle");
        assert_eq!(WorkOrderEventKind::Completed.as_str(), "WorkOrderCompleted");
    }
}
