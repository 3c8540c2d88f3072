//! Insertion requests and the trigger engine.
//!
//! An [`Insertion`] is resolved once, at the call boundary, into one of
//! three shapes:
//!
//! ```text
//! Plain   filler rendered with the slot data as-is      -> commit now
//! Bound   filler ∘ transform, ready to render          -> commit now
//! Gated   waiting on a TriggerSet                       -> arm, commit later
//! ```
//!
//! # Trigger lifecycle
//!
//! A gated request subscribes to every trigger in its set. The first
//! firing wins: the payload is captured, every subscription of the request
//! is disposed (the firing one included), and the request is re-submitted
//! without triggers, which commits it. Later firings do nothing.
//!
//! There is no way to cancel a request that is still waiting. A trigger
//! that never fires leaves the request dormant for the life of the
//! trigger.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::entry::{BoundRender, EntryId, EntryKind, Filler};
use crate::event::{Subscription, TriggerSet};
use crate::store::SlotStore;

// =============================================================================
// Insertion
// =============================================================================

/// Description of a filler to insert into a slot carrying data `D`.
///
/// # Example
///
/// ```ignore
/// // Rendered with the slot data unchanged
/// slot.insert(Insertion::new(banner));
///
/// // Rendered with mapped props, ahead of unranked fillers
/// slot.insert(Insertion::mapped(label, |d: &Panel| format!("id={}", d.id)).rank(-1));
///
/// // Rendered once `opened` fires, with its payload
/// slot.insert(Insertion::triggered(badge, &opened, |d: &Panel, n: &u32| d.id + n));
/// ```
pub struct Insertion<D, V> {
    body: Body<D, V>,
    rank: Option<i32>,
}

enum Body<D, V> {
    Plain(Filler<D, V>),
    Bound(BoundRender<D, V>, EntryKind),
    Gated(Box<dyn Gate<D, V>>),
}

impl<D: 'static, V: 'static> Insertion<D, V> {
    /// Filler rendered with the slot's data unchanged.
    ///
    /// For a slot without data (`D = ()`) the filler receives `()`.
    pub fn new(filler: Filler<D, V>) -> Self {
        Self {
            body: Body::Plain(filler),
            rank: None,
        }
    }

    /// Filler rendered with `transform(data)`.
    pub fn mapped<P: 'static>(filler: Filler<P, V>, transform: impl Fn(&D) -> P + 'static) -> Self {
        let render: BoundRender<D, V> = Rc::new(move |data: &D| filler.render(&transform(data)));
        Self {
            body: Body::Bound(render, EntryKind::Mapped),
            rank: None,
        }
    }

    /// Filler activated by the first of `triggers` to fire, rendered with
    /// `transform(data, payload)`.
    pub fn triggered<P, T>(
        filler: Filler<P, V>,
        triggers: impl Into<TriggerSet<T>>,
        transform: impl Fn(&D, &T) -> P + 'static,
    ) -> Self
    where
        P: 'static,
        T: Clone + 'static,
    {
        let bind: Rc<dyn Fn(&D, &T) -> V> =
            Rc::new(move |data: &D, payload: &T| filler.render(&transform(data, payload)));
        Self {
            body: Body::Gated(Box::new(TriggerGate {
                triggers: triggers.into(),
                on_fire: OnFire::Bind(bind),
            })),
            rank: None,
        }
    }

    /// Ordering key. Lower ranks render first; unranked counts as `0`.
    pub fn rank(mut self, rank: i32) -> Self {
        self.rank = Some(rank);
        self
    }

    /// Hold this insertion back until the first of `triggers` fires.
    ///
    /// The payload is discarded. Gating an already gated insertion waits
    /// for both sets, one after the other.
    pub fn when<T: Clone + 'static>(self, triggers: impl Into<TriggerSet<T>>) -> Self {
        Self {
            body: Body::Gated(Box::new(TriggerGate {
                triggers: triggers.into(),
                on_fire: OnFire::Release(self.body),
            })),
            rank: self.rank,
        }
    }

    /// True if this insertion waits on a trigger.
    pub fn is_deferred(&self) -> bool {
        matches!(self.body, Body::Gated(_))
    }
}

impl<D, V> fmt::Debug for Insertion<D, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shape = match &self.body {
            Body::Plain(_) => "Plain",
            Body::Bound(_, _) => "Bound",
            Body::Gated(_) => "Gated",
        };
        f.debug_struct("Insertion")
            .field("shape", &shape)
            .field("rank", &self.rank)
            .finish()
    }
}

/// What `insert` did with a request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InsertOutcome {
    /// Committed; the entry is in the slot's list.
    Active(EntryId),
    /// Waiting on a trigger.
    Pending,
}

// =============================================================================
// Engine
// =============================================================================

/// Submit a request: commit it now or arm its triggers.
pub(crate) fn insert<D: 'static, V: 'static>(store: &SlotStore<D, V>, insertion: Insertion<D, V>) -> InsertOutcome {
    let Insertion { body, rank } = insertion;
    match body {
        Body::Plain(filler) => {
            let render: BoundRender<D, V> = Rc::new(move |data: &D| filler.render(data));
            InsertOutcome::Active(store.commit(rank, EntryKind::Plain, render).id().clone())
        }
        Body::Bound(render, kind) => InsertOutcome::Active(store.commit(rank, kind, render).id().clone()),
        Body::Gated(gate) => {
            gate.arm(store.clone(), rank);
            InsertOutcome::Pending
        }
    }
}

trait Gate<D, V> {
    fn arm(self: Box<Self>, store: SlotStore<D, V>, rank: Option<i32>);
}

enum OnFire<D, V, T> {
    /// Payload discarded; re-submit the wrapped body.
    Release(Body<D, V>),
    /// Transform consumes the payload.
    Bind(Rc<dyn Fn(&D, &T) -> V>),
}

struct TriggerGate<D, V, T> {
    triggers: TriggerSet<T>,
    on_fire: OnFire<D, V, T>,
}

impl<D: 'static, V: 'static, T: Clone + 'static> Gate<D, V> for TriggerGate<D, V, T> {
    fn arm(self: Box<Self>, store: SlotStore<D, V>, rank: Option<i32>) {
        let TriggerGate { triggers, on_fire } = *self;

        // Taking the activation out is the one-shot guard.
        let pending: Rc<RefCell<Option<OnFire<D, V, T>>>> = Rc::new(RefCell::new(Some(on_fire)));
        let subscriptions: Rc<RefCell<Vec<Subscription>>> = Rc::new(RefCell::new(Vec::new()));

        tracing::trace!(slot = %store.name(), triggers = triggers.count(), ?rank, "insertion awaiting trigger");

        let handler: Rc<dyn Fn(&T)> = {
            let pending = pending.clone();
            let subscriptions = subscriptions.clone();
            Rc::new(move |payload: &T| {
                let Some(on_fire) = pending.borrow_mut().take() else {
                    return;
                };

                let losing: Vec<Subscription> = subscriptions.borrow_mut().drain(..).collect();
                for subscription in losing {
                    subscription.unsubscribe();
                }

                tracing::debug!(slot = %store.name(), "trigger fired, activating insertion");

                let body = match on_fire {
                    OnFire::Release(body) => body.into_triggered(),
                    OnFire::Bind(bind) => {
                        let payload = payload.clone();
                        let render: BoundRender<D, V> = Rc::new(move |data: &D| bind(data, &payload));
                        Body::Bound(render, EntryKind::Triggered)
                    }
                };
                insert(&store, Insertion { body, rank });
            })
        };

        for trigger in triggers.iter() {
            if pending.borrow().is_none() {
                break;
            }
            let subscription = trigger.subscribe(handler.clone());
            // A trigger may fire while we are still subscribing to the rest.
            if pending.borrow().is_none() {
                subscription.unsubscribe();
            } else {
                subscriptions.borrow_mut().push(subscription);
            }
        }
    }
}

impl<D: 'static, V: 'static> Body<D, V> {
    /// Mark a released body as trigger-activated.
    fn into_triggered(self) -> Self {
        match self {
            Body::Plain(filler) => {
                let render: BoundRender<D, V> = Rc::new(move |data: &D| filler.render(data));
                Body::Bound(render, EntryKind::Triggered)
            }
            Body::Bound(render, _) => Body::Bound(render, EntryKind::Triggered),
            gated @ Body::Gated(_) => gated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{Event, Trigger};
    use spark_signals::{effect, signal};
    use std::cell::Cell;

    /// Fires with `payload` as soon as it is subscribed to.
    struct Replay {
        payload: u32,
        disposed: Rc<Cell<usize>>,
    }

    impl Trigger<u32> for Replay {
        fn subscribe(&self, handler: Rc<dyn Fn(&u32)>) -> Subscription {
            handler(&self.payload);
            let disposed = self.disposed.clone();
            Subscription::new(move || disposed.set(disposed.get() + 1))
        }
    }

    fn store() -> SlotStore<u32, String> {
        SlotStore::new("Engine".into())
    }

    fn texts(store: &SlotStore<u32, String>, data: u32) -> Vec<String> {
        store.snapshot().iter().map(|e| e.render(&data)).collect()
    }

    #[test]
    fn test_plain_commits_immediately() {
        let store = store();
        let outcome = insert(&store, Insertion::new(Filler::new(|d: &u32| format!("plain {d}"))));

        assert!(matches!(outcome, InsertOutcome::Active(_)));
        assert_eq!(texts(&store, 3), vec!["plain 3"]);
        assert_eq!(store.snapshot()[0].kind(), EntryKind::Plain);
    }

    #[test]
    fn test_mapped_commits_immediately() {
        let store = store();
        let filler = Filler::new(|n: &u32| format!("double {n}"));
        insert(&store, Insertion::mapped(filler, |d: &u32| d * 2));

        assert_eq!(texts(&store, 4), vec!["double 8"]);
        assert_eq!(store.snapshot()[0].kind(), EntryKind::Mapped);
    }

    #[test]
    fn test_triggered_waits_for_first_firing() {
        let store = store();
        let ready: Event<u32> = Event::new();
        let filler = Filler::new(|n: &u32| format!("sum {n}"));

        let outcome = insert(&store, Insertion::triggered(filler, &ready, |d: &u32, p: &u32| d + p));
        assert_eq!(outcome, InsertOutcome::Pending);
        assert!(store.snapshot().is_empty());

        ready.emit(3);
        assert_eq!(texts(&store, 7), vec!["sum 10"]);
        assert_eq!(store.snapshot()[0].kind(), EntryKind::Triggered);

        ready.emit(100);
        assert_eq!(store.snapshot().len(), 1);
        assert_eq!(ready.subscriber_count(), 0);
    }

    #[test]
    fn test_first_trigger_in_set_wins() {
        let store = store();
        let a: Event<u32> = Event::new();
        let b: Event<u32> = Event::new();
        let filler = Filler::new(|n: &u32| n.to_string());

        let set = TriggerSet::new(a.clone()).or(b.clone());
        insert(&store, Insertion::triggered(filler, set, |_: &u32, p: &u32| *p));

        b.emit(2);
        a.emit(1);
        b.emit(5);

        assert_eq!(texts(&store, 0), vec!["2"]);
        assert_eq!(a.subscriber_count(), 0);
        assert_eq!(b.subscriber_count(), 0);
    }

    #[test]
    fn test_same_event_listed_twice_commits_once() {
        let store = store();
        let tick: Event<u32> = Event::new();
        let filler = Filler::new(|d: &u32| d.to_string());

        insert(&store, Insertion::new(filler).when(TriggerSet::new(tick.clone()).or(tick.clone())));
        tick.emit(0);

        assert_eq!(store.snapshot().len(), 1);
    }

    #[test]
    fn test_when_discards_payload_and_keeps_rank() {
        let store = store();
        let go: Event<&'static str> = Event::new();

        insert(&store, Insertion::new(Filler::new(|d: &u32| format!("a{d}"))).rank(5));
        insert(&store, Insertion::new(Filler::new(|d: &u32| format!("b{d}"))).rank(1).when(&go));
        assert_eq!(texts(&store, 1), vec!["a1"]);

        go.emit("ignored");
        assert_eq!(texts(&store, 1), vec!["b1", "a1"]);
    }

    #[test]
    fn test_nested_when_waits_for_both() {
        let store = store();
        let first: Event<()> = Event::new();
        let second: Event<()> = Event::new();

        insert(&store, Insertion::new(Filler::new(|d: &u32| d.to_string())).when(&second).when(&first));

        second.emit(());
        assert!(store.snapshot().is_empty());
        first.emit(());
        assert!(store.snapshot().is_empty());
        second.emit(());
        assert_eq!(store.snapshot().len(), 1);
    }

    #[test]
    fn test_commit_inside_trigger_is_synchronous() {
        let store = store();
        let go: Event<u32> = Event::new();
        let seen_len = Rc::new(Cell::new(0));

        insert(&store, Insertion::triggered(Filler::new(|n: &u32| n.to_string()), &go, |_: &u32, p: &u32| *p));

        // Subscribed after the gate, so it runs after the commit.
        let observer = store.clone();
        let seen = seen_len.clone();
        let _sub = go.watch(move |_| seen.set(observer.snapshot().len()));

        go.emit(9);
        assert_eq!(seen_len.get(), 1);
    }

    #[test]
    fn test_is_deferred() {
        let go: Event<()> = Event::new();
        let plain = Insertion::<u32, String>::new(Filler::new(|d: &u32| d.to_string()));
        assert!(!plain.is_deferred());
        assert!(plain.when(&go).is_deferred());
    }

    #[test]
    fn test_signal_trigger_commits_once() {
        let store = store();
        let user = signal(0_u32);

        let outcome = insert(&store, Insertion::triggered(Filler::new(|n: &u32| format!("user {n}")), user.clone(), |_: &u32, p: &u32| *p));
        assert_eq!(outcome, InsertOutcome::Pending);

        user.set(7);
        user.set(8);

        assert_eq!(texts(&store, 0), vec!["user 7"]);
    }

    #[test]
    fn test_gated_insert_from_effect_survives_rerun() {
        let store = store();
        let ready = signal(false);
        let tick = signal(0);

        let (writer, r, t) = (store.clone(), ready.clone(), tick.clone());
        let _stop = effect(move || {
            // Only the first run inserts; later runs must not cancel it
            if t.get() == 0 {
                insert(&writer, Insertion::new(Filler::new(|d: &u32| d.to_string())).when(r.clone()));
            }
        });

        tick.set(1);
        assert!(store.snapshot().is_empty());

        ready.set(true);
        assert_eq!(store.snapshot().len(), 1);
    }

    #[test]
    fn test_trigger_firing_on_subscribe_skips_the_rest() {
        let store = store();
        let later: Event<u32> = Event::new();
        let disposed = Rc::new(Cell::new(0));
        let replay = Replay { payload: 4, disposed: disposed.clone() };

        let set = TriggerSet::new(replay).or(later.clone());
        insert(&store, Insertion::triggered(Filler::new(|n: &u32| n.to_string()), set, |_: &u32, p: &u32| *p));

        assert_eq!(texts(&store, 0), vec!["4"]);
        assert_eq!(disposed.get(), 1);
        assert_eq!(later.subscriber_count(), 0);
    }

    #[test]
    fn test_trigger_firing_on_subscribe_disposes_earlier_ones() {
        let store = store();
        let earlier: Event<u32> = Event::new();
        let disposed = Rc::new(Cell::new(0));
        let replay = Replay { payload: 6, disposed: disposed.clone() };

        let set = TriggerSet::new(earlier.clone()).or(replay);
        insert(&store, Insertion::triggered(Filler::new(|n: &u32| n.to_string()), set, |_: &u32, p: &u32| *p));

        assert_eq!(texts(&store, 0), vec!["6"]);
        assert_eq!(earlier.subscriber_count(), 0);
        assert_eq!(disposed.get(), 1);

        earlier.emit(1);
        assert_eq!(store.snapshot().len(), 1);
    }
}

