//! Session-scoped collaborators, owned in one place and handed explicitly
//! to every tick consumer.
//!
//! The random stream provider is the only collaborator the orchestrator
//! treats as critical; scheduler, inventory and metrics are optional and
//! their absence only disables the features that need them.

use crate::inventory::Inventory;
use crate::metrics::MetricsSink;
use crate::random::RandomStreams;
use crate::scheduler::Scheduler;

#[derive(Debug, Default)]
pub struct SessionContext {
    random: Option<RandomStreams>,
    scheduler: Option<Scheduler>,
    inventory: Option<Inventory>,
    metrics: Option<Box<dyn MetricsSink>>,
}

/// Simultaneous mutable access to every collaborator that is present.
pub struct SessionParts<'a> {
    pub random: Option<&'a mut RandomStreams>,
    pub scheduler: Option<&'a mut Scheduler>,
    pub inventory: Option<&'a mut Inventory>,
    pub metrics: Option<&'a mut (dyn MetricsSink + 'static)>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_random(mut self, random: RandomStreams) -> Self {
        self.random = Some(random);
        self
    }

    pub fn with_scheduler(mut self, scheduler: Scheduler) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    pub fn with_inventory(mut self, inventory: Inventory) -> Self {
        self.inventory = Some(inventory);
        self
    }

    pub fn with_metrics(mut self, metrics: impl MetricsSink + 'static) -> Self {
        self.metrics = Some(Box::new(metrics));
        self
    }

    pub fn random(&self) -> Option<&RandomStreams> {
        self.random.as_ref()
    }

    pub fn random_mut(&mut self) -> Option<&mut RandomStreams> {
        self.random.as_mut()
    }

    pub fn scheduler(&self) -> Option<&Scheduler> {
        self.scheduler.as_ref()
    }

    pub fn scheduler_mut(&mut self) -> Option<&mut Scheduler> {
        self.scheduler.as_mut()
    }

    pub fn inventory(&self) -> Option<&Inventory> {
        self.inventory.as_ref()
    }

    pub fn inventory_mut(&mut self) -> Option<&mut Inventory> {
        self.inventory.as_mut()
    }

    pub fn metrics(&self) -> Option<&dyn MetricsSink> {
        self.metrics.as_deref()
    }

    pub fn metrics_mut(&mut self) -> Option<&mut (dyn MetricsSink + 'static)> {
        self.metrics.as_deref_mut()
    }

    /// The metrics sink as its concrete type, if it is a `T`.
    pub fn metrics_as<T: MetricsSink + 'static>(&self) -> Option<&T> {
        self.metrics.as_deref()?.as_any().downcast_ref::<T>()
    }

    pub fn metrics_as_mut<T: MetricsSink + 'static>(&mut self) -> Option<&mut T> {
        self.metrics.as_deref_mut()?.as_any_mut().downcast_mut::<T>()
    }

    /// Take the metrics sink back out, e.g. to export after a run.
    pub fn take_metrics(&mut self) -> Option<Box<dyn MetricsSink>> {
        self.metrics.take()
    }

    pub fn parts_mut(&mut self) -> SessionParts<'_> {
        SessionParts {
            random: self.random.as_mut(),
            scheduler: self.scheduler.as_mut(),
            inventory: self.inventory.as_mut(),
            metrics: self.metrics.as_deref_mut(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_context_has_no_collaborators() {
        let mut ctx = SessionContext::new();
        assert!(ctx.random().is_none());
        assert!(ctx.scheduler().is_none());
        assert!(ctx.inventory().is_none());
        assert!(ctx.metrics().is_none());
        let parts = ctx.parts_mut();
        assert!(parts.random.is_none() && parts.metrics.is_none());
    }

    #[test]
    fn parts_borrow_disjointly() {
        let mut ctx = SessionContext::new()
            .with_random(RandomStreams::new(5))
            .with_scheduler(Scheduler::new())
            .with_inventory(Inventory::new());
        let SessionParts {
            random,
            scheduler,
            inventory,
            ..
        } = ctx.parts_mut();
        let (Some(random), Some(scheduler), Some(inventory)) = (random, scheduler, inventory)
        else {
            panic!("collaborators missing");
        };
        random.begin_tick(3);
        scheduler.register_machine("M1");
        inventory.set_time(scheduler.now());
        assert_eq!(ctx.random().unwrap().current_tick(), 3);
        assert!(ctx.scheduler().unwrap().is_machine_registered("M1"));
    }

    #[test]
    fn metrics_downcast_to_concrete_sink() {
        use crate::test_utils::RecordingSink;

        let mut ctx = SessionContext::new().with_metrics(RecordingSink::default());
        ctx.metrics_mut().unwrap().flush();
        let sink = ctx.metrics_as::<RecordingSink>().unwrap();
        assert_eq!(sink.lines.borrow().as_slice(), ["flush".to_string()]);
        assert!(ctx.metrics_as_mut::<RecordingSink>().is_some());
    }
}
