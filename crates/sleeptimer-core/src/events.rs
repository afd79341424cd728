//! Push events from the timer backend and the subscription registry that
//! fans them out.
//!
//! Every backend-initiated notification crossing the boundary is one variant
//! of [`PushEvent`], so handlers can match exhaustively. Subscription is
//! explicit: [`EventBus::subscribe`] returns a [`Subscription`] capability
//! that the consuming context must hold and drop on teardown, so no handler
//! is ever invoked against destroyed state.
//!
//! The bus is single-threaded. Within one event kind, handlers run in
//! subscription order and see events in publish (backend-emission) order;
//! ordering across kinds is unspecified.
//!
//! Handlers may subscribe, unsubscribe, or publish other event kinds while a
//! delivery is in flight, but re-publishing the kind currently being delivered
//! is unsupported: that kind's handlers are checked out of the registry for
//! the duration of the outer publish, so the nested event reaches no one.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::{Rc, Weak};

use serde::{Deserialize, Serialize};

/// A backend-initiated notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PushEvent {
    /// Countdown progress; last value wins. Zero means no timer is active.
    SecondsUpdated { seconds: u32 },
    /// Wholesale replacement of the recent-duration list.
    RefreshRecents { recents: Vec<u32> },
    /// The persisted subtle-mode flag changed.
    SubtleMode { subtle: bool },
    /// A countdown or daily alarm completed. Fires at most once per
    /// completion.
    TimerEvent { message: String, subtle: bool },
}

impl PushEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            PushEvent::SecondsUpdated { .. } => EventKind::SecondsUpdated,
            PushEvent::RefreshRecents { .. } => EventKind::RefreshRecents,
            PushEvent::SubtleMode { .. } => EventKind::SubtleMode,
            PushEvent::TimerEvent { .. } => EventKind::TimerEvent,
        }
    }
}

/// Discriminant used to register interest in one event kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    SecondsUpdated,
    RefreshRecents,
    SubtleMode,
    TimerEvent,
}

type Handler = Box<dyn FnMut(&PushEvent)>;

struct HandlerEntry {
    id: u64,
    handler: Handler,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    handlers: HashMap<EventKind, Vec<HandlerEntry>>,
}

/// Single-threaded publish/subscribe channel bound to the process lifetime.
///
/// Cloning yields another handle to the same registry.
#[derive(Clone, Default)]
pub struct EventBus {
    registry: Rc<RefCell<Registry>>,
    /// Ids of handlers whose subscription was dropped while a publish was
    /// in flight; they are skipped and swept on the next publish.
    dead: Rc<RefCell<HashSet<u64>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for one event kind.
    ///
    /// The returned [`Subscription`] is the unsubscribe capability; dropping
    /// it stops delivery.
    pub fn subscribe<F>(&self, kind: EventKind, handler: F) -> Subscription
    where
        F: FnMut(&PushEvent) + 'static,
    {
        let mut registry = self.registry.borrow_mut();
        let id = registry.next_id;
        registry.next_id += 1;
        registry.handlers.entry(kind).or_default().push(HandlerEntry {
            id,
            handler: Box::new(handler),
        });
        Subscription {
            id,
            kind,
            registry: Rc::downgrade(&self.registry),
            dead: Rc::downgrade(&self.dead),
        }
    }

    /// Deliver an event to every live handler of its kind, at most once
    /// each, in subscription order.
    pub fn publish(&self, event: &PushEvent) {
        let kind = event.kind();

        // Take the kind's handlers out of the registry so handler bodies can
        // subscribe or unsubscribe without re-entering the borrow.
        let mut snapshot = self
            .registry
            .borrow_mut()
            .handlers
            .remove(&kind)
            .unwrap_or_default();

        for entry in snapshot.iter_mut() {
            let is_dead = self.dead.borrow().contains(&entry.id);
            if !is_dead {
                (entry.handler)(event);
            }
        }

        // Merge back, appending handlers subscribed during delivery and
        // sweeping any dropped subscriptions.
        let mut registry = self.registry.borrow_mut();
        let added = registry.handlers.remove(&kind).unwrap_or_default();
        snapshot.extend(added);
        let dead = std::mem::take(&mut *self.dead.borrow_mut());
        if !dead.is_empty() {
            snapshot.retain(|entry| !dead.contains(&entry.id));
            for entries in registry.handlers.values_mut() {
                entries.retain(|entry| !dead.contains(&entry.id));
            }
        }
        if !snapshot.is_empty() {
            registry.handlers.insert(kind, snapshot);
        }
    }
}

/// Capability to cancel one subscription. Dropping it unsubscribes.
pub struct Subscription {
    id: u64,
    kind: EventKind,
    registry: Weak<RefCell<Registry>>,
    dead: Weak<RefCell<HashSet<u64>>>,
}

impl Subscription {
    /// Explicit teardown; equivalent to dropping.
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        // The handler may currently be checked out by an in-flight publish,
        // so the id is always tombstoned; the map entry is removed eagerly
        // when the registry is not busy.
        if let Some(dead) = self.dead.upgrade() {
            dead.borrow_mut().insert(self.id);
        }
        if let Some(registry) = self.registry.upgrade() {
            if let Ok(mut registry) = registry.try_borrow_mut() {
                if let Some(entries) = registry.handlers.get_mut(&self.kind) {
                    entries.retain(|entry| entry.id != self.id);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seconds(n: u32) -> PushEvent {
        PushEvent::SecondsUpdated { seconds: n }
    }

    #[test]
    fn handlers_run_in_subscription_order() {
        let bus = EventBus::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let first = {
            let seen = Rc::clone(&seen);
            bus.subscribe(EventKind::SecondsUpdated, move |_| seen.borrow_mut().push("a"))
        };
        let second = {
            let seen = Rc::clone(&seen);
            bus.subscribe(EventKind::SecondsUpdated, move |_| seen.borrow_mut().push("b"))
        };

        bus.publish(&seconds(10));
        assert_eq!(*seen.borrow(), vec!["a", "b"]);
        drop((first, second));
    }

    #[test]
    fn delivery_is_scoped_to_the_event_kind() {
        let bus = EventBus::new();
        let hits = Rc::new(RefCell::new(0u32));

        let sub = {
            let hits = Rc::clone(&hits);
            bus.subscribe(EventKind::SubtleMode, move |_| *hits.borrow_mut() += 1)
        };

        bus.publish(&seconds(1));
        bus.publish(&PushEvent::SubtleMode { subtle: true });
        assert_eq!(*hits.borrow(), 1);
        drop(sub);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let bus = EventBus::new();
        let hits = Rc::new(RefCell::new(0u32));

        let sub = {
            let hits = Rc::clone(&hits);
            bus.subscribe(EventKind::SecondsUpdated, move |_| *hits.borrow_mut() += 1)
        };
        bus.publish(&seconds(1));
        sub.unsubscribe();
        bus.publish(&seconds(2));

        assert_eq!(*hits.borrow(), 1);
    }

    #[test]
    fn dropping_a_subscription_inside_a_handler_is_safe() {
        let bus = EventBus::new();
        let hits = Rc::new(RefCell::new(0u32));

        let victim = {
            let hits = Rc::clone(&hits);
            bus.subscribe(EventKind::SecondsUpdated, move |_| *hits.borrow_mut() += 1)
        };
        let slot: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(Some(victim)));

        // Second handler tears down the first mid-delivery. The victim runs
        // once (it precedes the killer) and never again.
        let killer = {
            let slot = Rc::clone(&slot);
            bus.subscribe(EventKind::SecondsUpdated, move |_| {
                slot.borrow_mut().take();
            })
        };
        bus.publish(&seconds(1));
        bus.publish(&seconds(2));

        assert_eq!(*hits.borrow(), 1);
        drop(killer);
    }

    #[test]
    fn republishing_the_same_kind_inside_a_handler_reaches_no_one() {
        let bus = EventBus::new();
        let seconds_seen = Rc::new(RefCell::new(Vec::new()));
        let subtle_hits = Rc::new(RefCell::new(0u32));

        let recorder = {
            let seconds_seen = Rc::clone(&seconds_seen);
            bus.subscribe(EventKind::SecondsUpdated, move |event| {
                if let PushEvent::SecondsUpdated { seconds } = event {
                    seconds_seen.borrow_mut().push(*seconds);
                }
            })
        };
        // Nested publishes from inside delivery: the same kind is checked
        // out of the registry and vanishes, another kind goes through.
        let relay = {
            let handle = bus.clone();
            bus.subscribe(EventKind::SecondsUpdated, move |_| {
                handle.publish(&seconds(99));
                handle.publish(&PushEvent::SubtleMode { subtle: true });
            })
        };
        let subtle = {
            let subtle_hits = Rc::clone(&subtle_hits);
            bus.subscribe(EventKind::SubtleMode, move |_| *subtle_hits.borrow_mut() += 1)
        };

        bus.publish(&seconds(1));

        assert_eq!(*seconds_seen.borrow(), vec![1]);
        assert_eq!(*subtle_hits.borrow(), 1);
        drop((recorder, relay, subtle));
    }

    #[test]
    fn subscribing_during_delivery_takes_effect_on_the_next_event() {
        let bus = EventBus::new();
        let hits = Rc::new(RefCell::new(0u32));
        let late: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));

        let sub = {
            let bus2 = bus.clone();
            let hits = Rc::clone(&hits);
            let late = Rc::clone(&late);
            bus.subscribe(EventKind::SecondsUpdated, move |_| {
                if late.borrow().is_none() {
                    let hits = Rc::clone(&hits);
                    let added = bus2
                        .subscribe(EventKind::SecondsUpdated, move |_| *hits.borrow_mut() += 1);
                    *late.borrow_mut() = Some(added);
                }
            })
        };

        bus.publish(&seconds(1));
        assert_eq!(*hits.borrow(), 0);
        bus.publish(&seconds(2));
        assert_eq!(*hits.borrow(), 1);
        drop(sub);
    }

    #[test]
    fn wire_names_match_the_push_surface() {
        let event = PushEvent::TimerEvent {
            message: "Your session has ended!".into(),
            subtle: false,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "timer_event");
        assert_eq!(json["subtle"], false);

        let json = serde_json::to_value(seconds(30)).unwrap();
        assert_eq!(json["type"], "seconds_updated");
        assert_eq!(json["seconds"], 30);
    }
}
