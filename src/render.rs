//! Rendering adapter - turns a slot's entries into keyed host views.
//!
//! Three ways to render a slot:
//! - [`Slot::render`] - one pass over the current entries
//! - [`Slot::view`] - a derived list, memoized per entry
//! - [`Slot::mount`] - keyed mounting via [`each`], no remounts on reorder
//!
//! # Memoization
//!
//! `view` keeps, per entry id, the data it last rendered with and the
//! resulting view. An entry is re-rendered only when the slot data changes
//! or the entry is new. Trigger payloads are fixed at commit time, so the
//! data is the only input that can change.
//!
//! # Keyed mounting
//!
//! `mount` follows the `each()` lifecycle:
//! - new entry ids: create signal + mount child
//! - surviving ids: update signal only (NO remount)
//! - removed ids (e.g. after `clear`): run the child's cleanup

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::rc::Rc;

use spark_signals::{derived, effect, signal, Derived, Signal};

use crate::entry::{EntryId, SlotList};
use crate::reactive::outside_reaction;
use crate::slot::Slot;

/// Cleanup function returned by mounted children.
///
/// Call this to unmount and release resources.
pub type Cleanup = Box<dyn FnOnce()>;

/// One rendered child, keyed by its entry id.
#[derive(Clone, Debug, PartialEq)]
pub struct Rendered<V> {
    pub key: EntryId,
    pub view: V,
}

/// Render every entry of `list` with `data`, in order.
pub fn render_list<D, V>(list: &SlotList<D, V>, data: &D) -> Vec<Rendered<V>> {
    list.iter()
        .map(|entry| Rendered {
            key: entry.id().clone(),
            view: entry.render(data),
        })
        .collect()
}

impl<D: 'static, V: 'static> Slot<D, V> {
    /// Render the current entries once.
    ///
    /// Tracked when called from a derived or effect.
    pub fn render(&self, data: &D) -> Vec<Rendered<V>> {
        render_list(&self.entries(), data)
    }
}

impl<D, V> Slot<D, V>
where
    D: Clone + PartialEq + 'static,
    V: Clone + PartialEq + 'static,
{
    /// Derived list of rendered children, recomputed when the entries or
    /// `data()` change.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let panel = signal(Panel { id: 7 });
    /// let data = panel.clone();
    /// let children = slot.view(move || data.get());
    ///
    /// let _stop = effect(move || draw(children.get()));
    /// panel.set(Panel { id: 8 }); // only entries' views recompute
    /// ```
    pub fn view(&self, data: impl Fn() -> D + 'static) -> Derived<Vec<Rendered<V>>> {
        let store = self.store.clone();
        let memo: RefCell<HashMap<EntryId, (D, V)>> = RefCell::new(HashMap::new());

        derived(move || {
            let list = store.current();
            let data = data();

            let mut memo = memo.borrow_mut();
            let mut next = HashMap::with_capacity(list.len());
            let rendered = list
                .iter()
                .map(|entry| {
                    let view = match memo.remove(entry.id()) {
                        Some((seen, view)) if seen == data => view,
                        _ => entry.render(&data),
                    };
                    next.insert(entry.id().clone(), (data.clone(), view.clone()));
                    Rendered {
                        key: entry.id().clone(),
                        view,
                    }
                })
                .collect();
            *memo = next;
            rendered
        })
    }

    /// Mount one child per entry, keyed by entry id.
    ///
    /// `mount_child` receives the entry id and a getter for the entry's
    /// current view; it runs once per entry, not on every change. The
    /// returned cleanup unmounts every child and stops tracking.
    pub fn mount(
        &self,
        data: impl Fn() -> D + 'static,
        mount_child: impl Fn(EntryId, Rc<dyn Fn() -> V>) -> Cleanup + 'static,
    ) -> Cleanup {
        let children = self.view(data);
        let mount_child = Rc::new(mount_child);

        tracing::debug!(slot = %self.name(), "slot mounted");

        each(
            move || children.get(),
            move |get_child: Rc<dyn Fn() -> Rendered<V>>, key: EntryId| {
                let get_view: Rc<dyn Fn() -> V> = Rc::new(move || get_child().view);
                mount_child(key, get_view)
            },
            |child: &Rendered<V>| child.key.clone(),
        )
    }
}

// =============================================================================
// each() - keyed list mounting
// =============================================================================

/// Mount one child per item, tracked by key, with fine-grained updates.
///
/// When the list changes:
/// - New keys: create signal + call `render_fn`
/// - Existing keys: update signal only (NO re-render!)
/// - Removed keys: run the child's cleanup
///
/// Duplicate keys are warned about and skipped; only the first
/// occurrence is tracked.
pub fn each<T, K, RenderF, R>(
    items_getter: impl Fn() -> Vec<T> + 'static,
    render_fn: RenderF,
    key_fn: impl Fn(&T) -> K + 'static,
) -> Cleanup
where
    T: Clone + PartialEq + 'static,
    K: Clone + Eq + Hash + std::fmt::Debug + 'static,
    RenderF: Fn(Rc<dyn Fn() -> T>, K) -> R + 'static,
    R: Into<Cleanup>,
{
    // Key -> Cleanup for unmounting the child
    let cleanups: Rc<RefCell<HashMap<K, Cleanup>>> = Rc::new(RefCell::new(HashMap::new()));
    // Key -> Signal<T> for fine-grained updates
    let item_signals: Rc<RefCell<HashMap<K, Signal<T>>>> = Rc::new(RefCell::new(HashMap::new()));

    let cleanups_effect = cleanups.clone();
    let item_signals_effect = item_signals.clone();

    let stop = effect(move || {
        let items = items_getter();
        let mut current_keys = HashSet::new();

        for item in items.iter() {
            let key = key_fn(item);

            if !current_keys.insert(key.clone()) {
                tracing::warn!(?key, "duplicate key in each(); keys must be unique, skipping");
                continue;
            }

            let existing = item_signals_effect.borrow().get(&key).cloned();
            match existing {
                // EXISTING item - just update the signal
                Some(sig) => {
                    sig.set(item.clone());
                }
                // NEW item - create signal and mount
                None => {
                    let item_signal = signal(item.clone());
                    item_signals_effect
                        .borrow_mut()
                        .insert(key.clone(), item_signal.clone());

                    let getter: Rc<dyn Fn() -> T> = Rc::new(move || item_signal.get());
                    // Children own their effects; a re-run of this effect must not destroy them.
                    let cleanup: Cleanup = outside_reaction(|| render_fn(getter, key.clone()).into());
                    cleanups_effect.borrow_mut().insert(key.clone(), cleanup);
                }
            }
        }

        // Unmount removed items
        let removed: Vec<K> = cleanups_effect
            .borrow()
            .keys()
            .filter(|k| !current_keys.contains(*k))
            .cloned()
            .collect();

        for key in removed {
            let cleanup = cleanups_effect.borrow_mut().remove(&key);
            item_signals_effect.borrow_mut().remove(&key);
            if let Some(cleanup) = cleanup {
                cleanup();
            }
        }
    });

    Box::new(move || {
        stop();
        let remaining: Vec<Cleanup> = cleanups.borrow_mut().drain().map(|(_, c)| c).collect();
        for cleanup in remaining {
            cleanup();
        }
        item_signals.borrow_mut().clear();
    })
}
