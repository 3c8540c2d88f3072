//! Events and triggers.
//!
//! [`Event`] is a discrete, payload-carrying notification: unlike a
//! signal it has no current value and fires on every [`Event::emit`], even
//! when the payload repeats. Handlers run synchronously in subscription
//! order.
//!
//! [`Trigger`] is the seam used by deferred insertions. It is implemented
//! for [`Event`] and for `spark_signals::Signal` (fires on change).
//!
//! # Example
//!
//! ```ignore
//! use spark_slots::Event;
//!
//! let opened: Event<u32> = Event::new();
//! let sub = opened.watch(|id| println!("opened {id}"));
//! opened.emit(7);
//! sub.unsubscribe();
//! ```

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use spark_signals::{effect, Signal};

use crate::reactive::outside_reaction;

// =============================================================================
// Subscription
// =============================================================================

/// Handle returned by every subscription.
///
/// Dropping the handle does NOT unsubscribe; call [`Subscription::unsubscribe`].
pub struct Subscription {
    dispose: Box<dyn FnOnce()>,
}

impl Subscription {
    pub fn new(dispose: impl FnOnce() + 'static) -> Self {
        Self { dispose: Box::new(dispose) }
    }

    /// Stop receiving notifications.
    pub fn unsubscribe(self) {
        (self.dispose)();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Subscription")
    }
}

// =============================================================================
// Event
// =============================================================================

type Handler<T> = Rc<dyn Fn(&T)>;

struct HandlerEntry<T> {
    id: usize,
    active: Rc<Cell<bool>>,
    handler: Handler<T>,
}

/// Link from a derived event to the event it is derived from.
///
/// Connected while the derived event has at least one handler.
struct Upstream {
    connect: Rc<dyn Fn() -> Subscription>,
    live: Option<Subscription>,
}

struct EventInner<T> {
    handlers: Vec<HandlerEntry<T>>,
    next_id: usize,
    upstream: Option<Upstream>,
}

/// A discrete event with payload `T`.
///
/// Cloning yields another handle to the same event.
pub struct Event<T> {
    inner: Rc<RefCell<EventInner<T>>>,
}

impl<T: 'static> Event<T> {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(EventInner {
                handlers: Vec::new(),
                next_id: 0,
                upstream: None,
            })),
        }
    }

    /// Subscribe to every future emission.
    pub fn watch(&self, handler: impl Fn(&T) + 'static) -> Subscription {
        self.watch_rc(Rc::new(handler))
    }

    fn watch_rc(&self, handler: Handler<T>) -> Subscription {
        let active = Rc::new(Cell::new(true));
        let (id, connect) = {
            let mut inner = self.inner.borrow_mut();
            let id = inner.next_id;
            inner.next_id += 1;
            inner.handlers.push(HandlerEntry {
                id,
                active: active.clone(),
                handler,
            });
            let connect = match &inner.upstream {
                Some(upstream) if upstream.live.is_none() => Some(upstream.connect.clone()),
                _ => None,
            };
            (id, connect)
        };

        // First handler of a derived event: start listening upstream
        if let Some(connect) = connect {
            let live = connect();
            if let Some(upstream) = self.inner.borrow_mut().upstream.as_mut() {
                upstream.live = Some(live);
            }
        }

        let inner = Rc::downgrade(&self.inner);
        Subscription::new(move || {
            active.set(false);
            let Some(inner) = inner.upgrade() else {
                return;
            };
            let released = {
                let mut inner = inner.borrow_mut();
                inner.handlers.retain(|entry| entry.id != id);
                if inner.handlers.is_empty() {
                    inner.upstream.as_mut().and_then(|upstream| upstream.live.take())
                } else {
                    None
                }
            };
            // Last handler gone: stop listening upstream
            if let Some(upstream) = released {
                upstream.unsubscribe();
            }
        })
    }

    /// Fire the event.
    ///
    /// Handlers subscribed during this emission are not called for it.
    /// Handlers unsubscribed during this emission are skipped if they have
    /// not run yet.
    pub fn emit(&self, payload: T) {
        let snapshot: Vec<(Rc<Cell<bool>>, Handler<T>)> = self
            .inner
            .borrow()
            .handlers
            .iter()
            .map(|entry| (entry.active.clone(), entry.handler.clone()))
            .collect();

        for (active, handler) in snapshot {
            if active.get() {
                handler(&payload);
            }
        }
    }

    /// Derived event that fires only for payloads matching `predicate`.
    ///
    /// Listens to this event only while it has handlers of its own.
    pub fn filter(&self, predicate: impl Fn(&T) -> bool + 'static) -> Event<T>
    where
        T: Clone,
    {
        self.derive(move |payload, target| {
            if predicate(payload) {
                target.emit(payload.clone());
            }
        })
    }

    /// Derived event carrying `f(payload)`.
    ///
    /// Use this to unify differently-typed events into one trigger set.
    /// Listens to this event only while it has handlers of its own.
    pub fn map<U: 'static>(&self, f: impl Fn(&T) -> U + 'static) -> Event<U> {
        self.derive(move |payload, target| target.emit(f(payload)))
    }

    fn derive<U: 'static>(&self, forward: impl Fn(&T, &Event<U>) + 'static) -> Event<U> {
        let derived = Event::new();
        let source = self.clone();
        let target = Rc::downgrade(&derived.inner);
        let forward = Rc::new(forward);

        // While connected, the source keeps the derived event alive; the
        // link is cut when the derived event loses its last handler.
        let connect = move || {
            let forward = forward.clone();
            let target = target.upgrade().map(|inner| Event { inner });
            source.watch(move |payload| {
                if let Some(target) = &target {
                    forward(payload, target);
                }
            })
        };
        derived.inner.borrow_mut().upstream = Some(Upstream {
            connect: Rc::new(connect),
            live: None,
        });
        derived
    }

    /// Number of live handlers.
    pub fn subscriber_count(&self) -> usize {
        self.inner.borrow().handlers.len()
    }
}

impl<T: 'static> Default for Event<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Event<T> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

impl<T> fmt::Debug for Event<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("subscribers", &self.inner.borrow().handlers.len())
            .finish()
    }
}

// =============================================================================
// Trigger
// =============================================================================

/// A source of activation payloads for deferred insertions.
pub trait Trigger<T> {
    /// Call `handler` each time the trigger fires, until unsubscribed.
    fn subscribe(&self, handler: Rc<dyn Fn(&T)>) -> Subscription;
}

impl<T: 'static> Trigger<T> for Event<T> {
    fn subscribe(&self, handler: Rc<dyn Fn(&T)>) -> Subscription {
        self.watch_rc(handler)
    }
}

/// State shared between a signal watcher's effect and its subscription.
struct SignalWatch {
    stop: RefCell<Option<Box<dyn FnOnce()>>>,
    running: Cell<bool>,
    disposed: Cell<bool>,
}

/// A signal fires on every change after subscription; its value at
/// subscription time does not count as a firing.
///
/// The watcher is a root effect, so subscribing from inside another effect
/// does not tie it to that effect's lifetime.
impl<T: Clone + PartialEq + 'static> Trigger<T> for Signal<T> {
    fn subscribe(&self, handler: Rc<dyn Fn(&T)>) -> Subscription {
        let watch = Rc::new(SignalWatch {
            stop: RefCell::new(None),
            running: Cell::new(false),
            disposed: Cell::new(false),
        });

        let source = self.clone();
        let state = watch.clone();
        let primed = Cell::new(false);
        let stop = outside_reaction(move || {
            effect(move || {
                if state.disposed.get() {
                    return;
                }
                let value = source.get();
                if primed.replace(true) {
                    state.running.set(true);
                    handler(&value);
                    state.running.set(false);
                }
            })
        });
        *watch.stop.borrow_mut() = Some(Box::new(stop));

        Subscription::new(move || {
            watch.disposed.set(true);
            let stop = watch.stop.borrow_mut().take();
            // An effect cannot be destroyed while it runs. Releasing the
            // handle instead frees it once the current run returns.
            if !watch.running.get() {
                if let Some(stop) = stop {
                    stop();
                }
            }
        })
    }
}

// =============================================================================
// TriggerSet
// =============================================================================

/// One or more triggers sharing a payload type.
///
/// Non-empty by construction: "no triggers" means not gating at all.
pub struct TriggerSet<T> {
    triggers: Vec<Rc<dyn Trigger<T>>>,
}

impl<T: 'static> TriggerSet<T> {
    pub fn new(first: impl Trigger<T> + 'static) -> Self {
        Self { triggers: vec![Rc::new(first)] }
    }

    /// Add another trigger; whichever fires first wins.
    pub fn or(mut self, other: impl Trigger<T> + 'static) -> Self {
        self.triggers.push(Rc::new(other));
        self
    }

    /// Build a set from any number of triggers; `None` if there are none.
    pub fn any<I, G>(triggers: I) -> Option<Self>
    where
        I: IntoIterator<Item = G>,
        G: Trigger<T> + 'static,
    {
        let triggers: Vec<Rc<dyn Trigger<T>>> = triggers
            .into_iter()
            .map(|t| Rc::new(t) as Rc<dyn Trigger<T>>)
            .collect();
        if triggers.is_empty() {
            None
        } else {
            Some(Self { triggers })
        }
    }

    /// Number of triggers in the set.
    pub fn count(&self) -> usize {
        self.triggers.len()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Rc<dyn Trigger<T>>> {
        self.triggers.iter()
    }
}

impl<T: 'static> From<Event<T>> for TriggerSet<T> {
    fn from(event: Event<T>) -> Self {
        Self::new(event)
    }
}

impl<T: 'static> From<&Event<T>> for TriggerSet<T> {
    fn from(event: &Event<T>) -> Self {
        Self::new(event.clone())
    }
}

impl<T: Clone + PartialEq + 'static> From<Signal<T>> for TriggerSet<T> {
    fn from(signal: Signal<T>) -> Self {
        Self::new(signal)
    }
}

impl<T> fmt::Debug for TriggerSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TriggerSet")
            .field("len", &self.triggers.len())
            .finish()
    }
}
