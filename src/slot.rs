//! Slot handles - the per-slot surface exposed to producers and owners.

use std::fmt;
use std::rc::Rc;

use crate::entry::SlotList;
use crate::event::Subscription;
use crate::insert::{self, InsertOutcome, Insertion};
use crate::store::SlotStore;

/// Handle to one configured slot carrying render-time data `D` and
/// rendering into the host view type `V`.
///
/// Cloning is cheap; every clone addresses the same slot.
pub struct Slot<D, V> {
    pub(crate) store: SlotStore<D, V>,
}

impl<D: 'static, V: 'static> Slot<D, V> {
    pub(crate) fn new(name: Rc<str>) -> Self {
        Self { store: SlotStore::new(name) }
    }

    pub fn name(&self) -> &str {
        self.store.name()
    }

    /// Insert a filler, now or when its triggers fire.
    ///
    /// See [`Insertion`] for the available shapes.
    pub fn insert(&self, insertion: Insertion<D, V>) -> InsertOutcome {
        insert::insert(&self.store, insertion)
    }

    /// Remove every active entry.
    ///
    /// Does nothing when the slot is already empty. Requests still waiting
    /// on a trigger are not affected and will commit when it fires.
    pub fn clear(&self) {
        self.store.clear();
    }

    /// Active entries in render order.
    ///
    /// Creates a reactive dependency when called from a derived or effect.
    pub fn entries(&self) -> SlotList<D, V> {
        self.store.current()
    }

    /// Number of active entries (untracked).
    pub fn len(&self) -> usize {
        self.store.snapshot().len()
    }

    /// True if nothing is active (untracked).
    pub fn is_empty(&self) -> bool {
        self.store.snapshot().is_empty()
    }

    /// Call `f` with the new list after every change to this slot.
    ///
    /// Runs synchronously inside `insert`, `clear` or the firing trigger.
    pub fn watch(&self, f: impl Fn(&SlotList<D, V>) + 'static) -> Subscription {
        self.store.watch(f)
    }
}

impl<D, V> Clone for Slot<D, V> {
    fn clone(&self) -> Self {
        Self { store: self.store.clone() }
    }
}

impl<D, V> fmt::Debug for Slot<D, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Slot")
            .field("name", &self.store.name())
            .field("entries", &self.store.snapshot().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::Filler;
    use crate::event::Event;
    use std::cell::Cell;

    fn slot() -> Slot<(), &'static str> {
        Slot::new("Toolbar".into())
    }

    #[test]
    fn test_insert_and_len() {
        let slot = slot();
        assert!(slot.is_empty());

        for _ in 0..3 {
            slot.insert(Insertion::new(Filler::new(|_: &()| "item")));
        }
        assert_eq!(slot.len(), 3);
        assert_eq!(slot.name(), "Toolbar");
    }

    #[test]
    fn test_clear_then_insert_twice_keeps_one() {
        let slot = slot();
        let filler = Filler::new(|_: &()| "item");

        slot.clear();
        slot.insert(Insertion::new(filler.clone()));
        slot.clear();
        slot.insert(Insertion::new(filler));

        assert_eq!(slot.len(), 1);
    }

    #[test]
    fn test_clear_does_not_cancel_pending() {
        let slot = slot();
        let later: Event<()> = Event::new();

        slot.insert(Insertion::new(Filler::new(|_: &()| "now")));
        slot.insert(Insertion::new(Filler::new(|_: &()| "later")).when(&later));
        slot.clear();
        assert!(slot.is_empty());

        later.emit(());
        let views: Vec<_> = slot.entries().iter().map(|e| e.render(&())).collect();
        assert_eq!(views, vec!["later"]);
    }

    #[test]
    fn test_watch_counts_changes() {
        let slot = slot();
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        let sub = slot.watch(move |_| c.set(c.get() + 1));

        slot.clear();
        slot.insert(Insertion::new(Filler::new(|_: &()| "a")));
        slot.clear();
        slot.clear();
        sub.unsubscribe();
        slot.insert(Insertion::new(Filler::new(|_: &()| "b")));

        assert_eq!(count.get(), 2);
    }

    #[test]
    fn test_debug_shows_name_and_len() {
        let slot = slot();
        slot.insert(Insertion::new(Filler::new(|_: &()| "a")));
        assert_eq!(format!("{slot:?}"), r#"Slot { name: "Toolbar", entries: 1 }"#);
    }
}
