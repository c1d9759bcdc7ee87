//! # Observer Ledger
//!
//! Every observable object (a [`crate::scene::Scene`] or a [`crate::node::Node`])
//! owns one [`ObserverLedger`]: the list of subscriptions made against it.
//!
//! ## Delivery Rules
//!
//! - Delivery is synchronous, on the calling thread, in subscription order.
//! - The subscriber list is snapshotted when [`ObserverLedger::emit`] starts.
//!   Callbacks may subscribe or unsubscribe while an event is being delivered:
//!   new subscriptions only see later events, and a subscription removed
//!   mid-delivery still receives the event already in flight. Nobody is
//!   skipped and nobody is called twice.
//! - A callback that returns an error does not stop delivery. The error is
//!   logged and collected into the [`EmitReport`].
//!
//! ## Handles
//!
//! [`SubscriptionHandle`]s are never reused by a ledger. Unsubscribing is
//! idempotent: the second call is a no-op that returns `false`.
//!
//! The ledger uses `Cell`/`RefCell` because the whole scene graph is
//! single-threaded; subscribing from inside a callback therefore only needs
//! `&self`.

use crate::event::{Event, EventKind};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

/// Callback invoked for each delivered event.
pub type Callback = dyn Fn(&Event) -> anyhow::Result<()>;

/// Opaque token returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionHandle(u64);

impl fmt::Display for SubscriptionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Filter {
    Kind(EventKind),
    All,
}

impl Filter {
    fn matches(&self, kind: EventKind) -> bool {
        match self {
            Filter::Kind(k) => *k == kind,
            Filter::All => true,
        }
    }
}

struct Subscription {
    handle: SubscriptionHandle,
    filter: Filter,
    callback: Rc<Callback>,
}

/// A callback error captured during delivery.
#[derive(Debug, Clone)]
pub struct CallbackFailure {
    pub handle: SubscriptionHandle,
    pub kind: EventKind,
    pub message: String,
}

/// Outcome of one [`ObserverLedger::emit`] call.
#[derive(Debug, Default)]
pub struct EmitReport {
    pub delivered: usize,
    pub failures: Vec<CallbackFailure>,
}

impl EmitReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Default)]
pub struct ObserverLedger {
    next_handle: Cell<u64>,
    subscriptions: RefCell<Vec<Subscription>>,
}

impl fmt::Debug for ObserverLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverLedger")
            .field("subscriptions", &self.len())
            .finish()
    }
}

impl ObserverLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes `callback` to events of `kind`.
    pub fn subscribe<F>(&self, kind: EventKind, callback: F) -> SubscriptionHandle
    where
        F: Fn(&Event) -> anyhow::Result<()> + 'static,
    {
        self.insert(Filter::Kind(kind), Rc::new(callback))
    }

    /// Subscribes `callback` to every event raised by the observable.
    pub fn subscribe_all<F>(&self, callback: F) -> SubscriptionHandle
    where
        F: Fn(&Event) -> anyhow::Result<()> + 'static,
    {
        self.insert(Filter::All, Rc::new(callback))
    }

    fn insert(&self, filter: Filter, callback: Rc<Callback>) -> SubscriptionHandle {
        let handle = SubscriptionHandle(self.next_handle.get() + 1);
        self.next_handle.set(handle.0);
        self.subscriptions.borrow_mut().push(Subscription {
            handle,
            filter,
            callback,
        });
        handle
    }

    /// Removes a subscription. Returns `false` if the handle was not live.
    pub fn unsubscribe(&self, handle: SubscriptionHandle) -> bool {
        let mut subs = self.subscriptions.borrow_mut();
        match subs.iter().position(|s| s.handle == handle) {
            Some(pos) => {
                subs.remove(pos);
                true
            }
            None => false,
        }
    }

    pub fn is_subscribed(&self, handle: SubscriptionHandle) -> bool {
        self.subscriptions
            .borrow()
            .iter()
            .any(|s| s.handle == handle)
    }

    pub fn has_observers(&self, kind: EventKind) -> bool {
        self.subscriptions
            .borrow()
            .iter()
            .any(|s| s.filter.matches(kind))
    }

    pub fn len(&self) -> usize {
        self.subscriptions.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.borrow().is_empty()
    }

    /// Drops every subscription. Outstanding handles become invalid.
    pub fn clear(&self) {
        self.subscriptions.borrow_mut().clear();
    }

    /// Delivers `event` to the subscribers registered at the time of the call.
    pub fn emit(&self, event: &Event) -> EmitReport {
        let snapshot: Vec<(SubscriptionHandle, Rc<Callback>)> = self
            .subscriptions
            .borrow()
            .iter()
            .filter(|s| s.filter.matches(event.kind))
            .map(|s| (s.handle, Rc::clone(&s.callback)))
            .collect();

        let mut report = EmitReport::default();
        for (handle, callback) in snapshot {
            report.delivered += 1;
            if let Err(err) = callback(event) {
                tracing::warn!(
                    subscription = %handle,
                    event = %event.kind,
                    error = %err,
                    "observer callback failed"
                );
                report.failures.push(CallbackFailure {
                    handle,
                    kind: event.kind,
                    message: format!("{:#}", err),
                });
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventSource;

    fn scene_event(kind: EventKind) -> Event {
        Event::new(kind, EventSource::Scene)
    }

    fn recorder() -> (Rc<RefCell<Vec<String>>>, impl Fn(&str) -> Rc<Callback>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let log_for_make = Rc::clone(&log);
        let make = move |tag: &str| -> Rc<Callback> {
            let log = Rc::clone(&log_for_make);
            let tag = tag.to_string();
            Rc::new(move |_event: &Event| -> anyhow::Result<()> {
                log.borrow_mut().push(tag.clone());
                Ok(())
            })
        };
        (log, make)
    }

    #[test]
    fn delivers_in_subscription_order() {
        let ledger = ObserverLedger::new();
        let (log, make) = recorder();
        for tag in ["a", "b", "c"] {
            let cb = make(tag);
            ledger.subscribe(EventKind::NodeAdded, move |e| cb(e));
        }

        let report = ledger.emit(&scene_event(EventKind::NodeAdded));

        assert_eq!(report.delivered, 3);
        assert_eq!(*log.borrow(), vec!["a", "b", "c"]);
    }

    #[test]
    fn filters_by_kind() {
        let ledger = ObserverLedger::new();
        let (log, make) = recorder();
        let added = make("added");
        let any = make("any");
        ledger.subscribe(EventKind::NodeAdded, move |e| added(e));
        ledger.subscribe_all(move |e| any(e));

        ledger.emit(&scene_event(EventKind::NodeRemoved));

        assert_eq!(*log.borrow(), vec!["any"]);
        assert!(ledger.has_observers(EventKind::BatchEnd));
    }

    #[test]
    fn unsubscribe_twice_is_a_noop() {
        let ledger = ObserverLedger::new();
        let (log, make) = recorder();
        let cb = make("x");
        let handle = ledger.subscribe(EventKind::NodeModified, move |e| cb(e));

        assert!(ledger.unsubscribe(handle));
        assert!(!ledger.unsubscribe(handle));
        ledger.emit(&scene_event(EventKind::NodeModified));

        assert!(log.borrow().is_empty());
    }

    #[test]
    fn handles_are_not_reused_after_clear() {
        let ledger = ObserverLedger::new();
        let first = ledger.subscribe_all(|_| Ok(()));
        ledger.clear();
        let second = ledger.subscribe_all(|_| Ok(()));

        assert_ne!(first, second);
        assert!(!ledger.is_subscribed(first));
        assert!(!ledger.unsubscribe(first));
    }

    #[test]
    fn failing_callback_does_not_stop_delivery() {
        let ledger = ObserverLedger::new();
        let (log, make) = recorder();
        let after = make("after");
        ledger.subscribe_all(|_| Err(anyhow::anyhow!("boom")));
        ledger.subscribe_all(move |e| after(e));

        let report = ledger.emit(&scene_event(EventKind::SceneModified));

        assert_eq!(*log.borrow(), vec!["after"]);
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].message.contains("boom"));
        assert!(!report.is_clean());
    }

    #[test]
    fn subscription_changes_during_emit_use_snapshot() {
        let ledger = Rc::new(ObserverLedger::new());
        let (log, make) = recorder();

        let victim_slot: Rc<Cell<Option<SubscriptionHandle>>> = Rc::new(Cell::new(None));
        let ledger_in_cb = Rc::clone(&ledger);
        let slot_in_cb = Rc::clone(&victim_slot);
        let make_late = make("late");
        let first = make("first");
        ledger.subscribe(EventKind::NodeAdded, move |e| {
            first(e)?;
            if let Some(victim) = slot_in_cb.get() {
                ledger_in_cb.unsubscribe(victim);
            }
            let late = Rc::clone(&make_late);
            ledger_in_cb.subscribe(EventKind::NodeAdded, move |e| late(e));
            Ok(())
        });
        let victim_cb = make("victim");
        let victim = ledger.subscribe(EventKind::NodeAdded, move |e| victim_cb(e));
        victim_slot.set(Some(victim));

        ledger.emit(&scene_event(EventKind::NodeAdded));
        // Removed mid-delivery but still scheduled; the late subscriber waits.
        assert_eq!(*log.borrow(), vec!["first", "victim"]);

        log.borrow_mut().clear();
        victim_slot.set(None);
        ledger.emit(&scene_event(EventKind::NodeAdded));
        assert_eq!(*log.borrow(), vec!["first", "late"]);
    }
}
