//! Fillers and the entries stored per slot.

use std::cell::Cell;
use std::fmt;
use std::ops::Deref;
use std::rc::Rc;

use crate::ordering::Ranked;

// =============================================================================
// EntryId
// =============================================================================

thread_local! {
    /// Counter for generating entry ids. Slots are `!Send`, so ids only
    /// need to be unique per thread.
    static ENTRY_COUNTER: Cell<u64> = const { Cell::new(0) };
}

/// Identity of an active entry, assigned when the entry is committed.
///
/// Used as the reconciliation key by the rendering adapter.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(Rc<str>);

impl EntryId {
    pub(crate) fn generate() -> Self {
        let n = ENTRY_COUNTER.with(|counter| {
            let n = counter.get();
            counter.set(n + 1);
            n
        });
        Self(format!("e{n}").into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Filler
// =============================================================================

/// A presentational unit: renders props `P` into the host view type `V`.
///
/// Owned by the caller; slots only hold clones of the handle.
pub struct Filler<P, V> {
    render: Rc<dyn Fn(&P) -> V>,
}

impl<P, V> Filler<P, V> {
    pub fn new(render: impl Fn(&P) -> V + 'static) -> Self {
        Self { render: Rc::new(render) }
    }

    pub fn render(&self, props: &P) -> V {
        (self.render)(props)
    }

    /// True if both handles point at the same renderer.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.render, &other.render)
    }
}

impl<P, V> Clone for Filler<P, V> {
    fn clone(&self) -> Self {
        Self { render: self.render.clone() }
    }
}

impl<P, V> fmt::Debug for Filler<P, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Filler")
    }
}

// =============================================================================
// FillerEntry
// =============================================================================

/// How an entry was built.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryKind {
    /// Filler rendered with the slot's data as-is.
    Plain,
    /// Filler rendered with `transform(data)`.
    Mapped,
    /// Filler activated by a trigger; any transform received its payload.
    Triggered,
}

/// Slot data `D` to view `V`: the filler composed with its transform.
pub(crate) type BoundRender<D, V> = Rc<dyn Fn(&D) -> V>;

/// An active entry in a slot's list.
pub struct FillerEntry<D, V> {
    id: EntryId,
    rank: Option<i32>,
    kind: EntryKind,
    render: BoundRender<D, V>,
}

impl<D, V> FillerEntry<D, V> {
    pub(crate) fn new(rank: Option<i32>, kind: EntryKind, render: BoundRender<D, V>) -> Self {
        Self {
            id: EntryId::generate(),
            rank,
            kind,
            render,
        }
    }

    pub fn id(&self) -> &EntryId {
        &self.id
    }

    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    /// Render this entry for the given slot data.
    ///
    /// A panicking transform propagates to the caller.
    pub fn render(&self, data: &D) -> V {
        (self.render)(data)
    }
}

impl<D, V> Ranked for FillerEntry<D, V> {
    fn rank(&self) -> Option<i32> {
        self.rank
    }
}

impl<D, V> Clone for FillerEntry<D, V> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            rank: self.rank,
            kind: self.kind,
            render: self.render.clone(),
        }
    }
}

impl<D, V> fmt::Debug for FillerEntry<D, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FillerEntry")
            .field("id", &self.id)
            .field("rank", &self.rank)
            .field("kind", &self.kind)
            .finish()
    }
}

// =============================================================================
// SlotList
// =============================================================================

/// Immutable snapshot of a slot's active entries.
///
/// Equality is identity: two lists are equal only if they are the same
/// published snapshot. Every mutation publishes a new allocation.
pub struct SlotList<D, V>(Rc<[FillerEntry<D, V>]>);

impl<D, V> SlotList<D, V> {
    pub fn empty() -> Self {
        Self(Rc::from(Vec::new()))
    }

    pub(crate) fn from_vec(entries: Vec<FillerEntry<D, V>>) -> Self {
        Self(Rc::from(entries))
    }

    /// Ids in list order.
    pub fn ids(&self) -> Vec<EntryId> {
        self.0.iter().map(|e| e.id.clone()).collect()
    }
}

impl<D, V> Deref for SlotList<D, V> {
    type Target = [FillerEntry<D, V>];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<D, V> Clone for SlotList<D, V> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<D, V> PartialEq for SlotList<D, V> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl<D, V> fmt::Debug for SlotList<D, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.0.iter()).finish()
    }
}
