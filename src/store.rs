//! Reactive slot store - the single source of truth for what a slot renders.
//!
//! Each slot owns one store. The store publishes immutable [`SlotList`]
//! snapshots through two channels:
//! - a `spark-signals` signal, read by deriveds and effects (`current`)
//! - synchronous watchers, called once per published change (`watch`)
//!
//! Only two operations mutate the list: `commit` and `clear`.
//!
//! # Publish order
//!
//! Setting the signal runs dependent effects synchronously, and those may
//! commit to the same slot. Nested publishes are queued and delivered after
//! the current one, so both channels see lists in commit order.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use spark_signals::{signal, Signal};

use crate::entry::{BoundRender, EntryKind, FillerEntry, SlotList};
use crate::event::{Event, Subscription};
use crate::ordering::insert_sorted;

pub(crate) struct SlotStore<D, V> {
    name: Rc<str>,
    /// Untracked copy of the newest list, read by writers.
    latest: Rc<RefCell<SlotList<D, V>>>,
    list: Signal<SlotList<D, V>>,
    changed: Event<SlotList<D, V>>,
    /// Lists committed but not yet delivered.
    outbox: Rc<RefCell<VecDeque<SlotList<D, V>>>>,
    delivering: Rc<Cell<bool>>,
}

impl<D, V> SlotStore<D, V> {
    pub(crate) fn name(&self) -> &Rc<str> {
        &self.name
    }

    /// Newest list without creating a reactive dependency.
    pub(crate) fn snapshot(&self) -> SlotList<D, V> {
        self.latest.borrow().clone()
    }
}

/// Clears the delivering flag on drop, so a panicking watcher does not
/// wedge the store.
struct Delivering(Rc<Cell<bool>>);

impl Drop for Delivering {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

impl<D: 'static, V: 'static> SlotStore<D, V> {
    pub(crate) fn new(name: Rc<str>) -> Self {
        let initial = SlotList::empty();
        Self {
            name,
            latest: Rc::new(RefCell::new(initial.clone())),
            list: signal(initial),
            changed: Event::new(),
            outbox: Rc::new(RefCell::new(VecDeque::new())),
            delivering: Rc::new(Cell::new(false)),
        }
    }

    /// Activate an entry: assign its id and merge it by rank.
    pub(crate) fn commit(&self, rank: Option<i32>, kind: EntryKind, render: BoundRender<D, V>) -> FillerEntry<D, V> {
        let entry = FillerEntry::new(rank, kind, render);
        let next = {
            let latest = self.latest.borrow();
            SlotList::from_vec(insert_sorted(&latest, entry.clone()))
        };

        tracing::debug!(
            slot = %self.name,
            entry = %entry.id(),
            ?rank,
            ?kind,
            len = next.len(),
            "slot entry committed"
        );
        self.publish(next);
        entry
    }

    /// Empty the list. No-op (and no notification) when already empty.
    pub(crate) fn clear(&self) {
        if self.latest.borrow().is_empty() {
            tracing::trace!(slot = %self.name, "clear skipped, slot already empty");
            return;
        }

        tracing::debug!(slot = %self.name, "slot cleared");
        self.publish(SlotList::empty());
    }

    fn publish(&self, next: SlotList<D, V>) {
        *self.latest.borrow_mut() = next.clone();
        self.outbox.borrow_mut().push_back(next);

        if self.delivering.replace(true) {
            tracing::trace!(slot = %self.name, "publish queued behind delivery in progress");
            return;
        }
        let _delivering = Delivering(self.delivering.clone());

        loop {
            let queued = self.outbox.borrow_mut().pop_front();
            let Some(list) = queued else {
                break;
            };
            self.list.set(list.clone());
            self.changed.emit(list);
        }
    }

    /// Current list; tracked when read inside a derived or effect.
    pub(crate) fn current(&self) -> SlotList<D, V> {
        self.list.get()
    }

    pub(crate) fn watch(&self, f: impl Fn(&SlotList<D, V>) + 'static) -> Subscription {
        self.changed.watch(f)
    }
}

impl<D, V> Clone for SlotStore<D, V> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            latest: self.latest.clone(),
            list: self.list.clone(),
            changed: self.changed.clone(),
            outbox: self.outbox.clone(),
            delivering: self.delivering.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spark_signals::effect;

    fn store() -> SlotStore<(), String> {
        SlotStore::new("Test".into())
    }

    fn label(text: &'static str) -> BoundRender<(), String> {
        Rc::new(move |_| text.to_string())
    }

    fn rendered(store: &SlotStore<(), String>) -> Vec<String> {
        store.snapshot().iter().map(|e| e.render(&())).collect()
    }

    #[test]
    fn test_commit_orders_by_rank() {
        let store = store();
        store.commit(Some(2), EntryKind::Plain, label("A"));
        store.commit(Some(1), EntryKind::Plain, label("B"));
        store.commit(Some(2), EntryKind::Plain, label("C"));

        assert_eq!(rendered(&store), vec!["B", "A", "C"]);
    }

    #[test]
    fn test_commit_notifies_once() {
        let store = store();
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        let _sub = store.watch(move |_| c.set(c.get() + 1));

        store.commit(None, EntryKind::Plain, label("A"));
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_clear_empty_is_silent() {
        let store = store();
        let before = store.snapshot();
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        let _sub = store.watch(move |_| c.set(c.get() + 1));

        store.clear();

        assert_eq!(count.get(), 0);
        assert_eq!(store.snapshot(), before);
    }

    #[test]
    fn test_clear_non_empty_notifies_once_with_empty_list() {
        let store = store();
        store.commit(None, EntryKind::Plain, label("A"));

        let lens = Rc::new(RefCell::new(Vec::new()));
        let l = lens.clone();
        let _sub = store.watch(move |list| l.borrow_mut().push(list.len()));

        store.clear();
        store.clear();

        assert_eq!(*lens.borrow(), vec![0]);
    }

    #[test]
    fn test_commit_assigns_fresh_ids() {
        let store = store();
        let a = store.commit(None, EntryKind::Plain, label("A"));
        let b = store.commit(None, EntryKind::Plain, label("A"));
        assert_ne!(a.id(), b.id());
        assert_eq!(store.snapshot().ids(), vec![a.id().clone(), b.id().clone()]);
    }

    #[test]
    fn test_signal_tracks_published_list() {
        let store = store();
        store.commit(None, EntryKind::Plain, label("A"));
        assert_eq!(store.current(), store.snapshot());
    }

    #[test]
    fn test_commit_from_effect_is_delivered_in_order() {
        let store = store();
        let lens = Rc::new(RefCell::new(Vec::new()));
        let l = lens.clone();
        let _sub = store.watch(move |list| l.borrow_mut().push(list.len()));

        // Reacts to the first entry by committing a second one
        let writer = store.clone();
        let done = Rc::new(Cell::new(false));
        let d = done.clone();
        let _stop = effect(move || {
            if writer.current().len() == 1 && !d.replace(true) {
                writer.commit(None, EntryKind::Plain, label("B"));
            }
        });

        store.commit(None, EntryKind::Plain, label("A"));

        assert_eq!(*lens.borrow(), vec![1, 2]);
        assert_eq!(rendered(&store), vec!["A", "B"]);
        assert_eq!(store.current(), store.snapshot());
    }
}
