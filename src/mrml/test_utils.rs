use crate::event::{Event, EventKind};
use crate::node::NodeRef;
use crate::observer::ObserverLedger;
use crate::scene::Scene;
use std::cell::RefCell;
use std::rc::Rc;

/// Records every event raised by one observable.
#[derive(Clone, Default)]
pub struct EventLog {
    events: Rc<RefCell<Vec<Event>>>,
}

impl EventLog {
    fn attach(ledger: &ObserverLedger) -> Self {
        let log = Self::default();
        let sink = Rc::clone(&log.events);
        ledger.subscribe_all(move |event| {
            sink.borrow_mut().push(event.clone());
            Ok(())
        });
        log
    }

    pub fn attach_scene(scene: &Scene) -> Self {
        Self::attach(scene.observers())
    }

    pub fn attach_node(node: &NodeRef) -> Self {
        Self::attach(node.observers())
    }

    pub fn kinds(&self) -> Vec<EventKind> {
        self.events.borrow().iter().map(|e| e.kind).collect()
    }

    pub fn count(&self, kind: EventKind) -> usize {
        self.events.borrow().iter().filter(|e| e.kind == kind).count()
    }

    /// Number of dangling references carried by the last `BatchEnd`.
    pub fn last_dangling(&self) -> usize {
        self.events
            .borrow()
            .iter()
            .rev()
            .find(|e| e.kind == EventKind::BatchEnd)
            .map(|e| e.dangling().len())
            .unwrap_or(0)
    }
}
