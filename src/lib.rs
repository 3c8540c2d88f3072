//! # spark-slots
//!
//! Reactive extension-point slots for UIs built on
//! [spark-signals](https://github.com/RLabs-Inc/spark-signals).
//!
//! A slot is a named insertion point. Its owner renders it with some
//! render-time data; independent producers insert *fillers* into it at
//! runtime, without the owner knowing about them in advance.
//!
//! ## Architecture
//!
//! ```text
//! Slot::insert ─→ trigger engine ─→ SlotStore (signal per slot) ─→ view / mount
//!                  │                     ▲
//!                  └── awaits Trigger ───┘ (first firing wins)
//! ```
//!
//! - Entries are ordered by rank, ties by arrival.
//! - Every change publishes a new immutable list; unrelated slots are untouched.
//! - Views are spark-signals deriveds, memoized per entry.
//!
//! ## Example
//!
//! ```ignore
//! use spark_slots::*;
//!
//! let registry = create_slots(
//!     SlotConfig::<String>::new().slot("Panel", create_slot_identifier::<Panel>()),
//! )?;
//! let panel = registry.slot::<Panel>("Panel")?;
//!
//! panel.insert(Insertion::mapped(label, |d: &Panel| format!("id={}", d.id)).rank(5));
//! panel.insert(Insertion::triggered(badge, &opened, |d: &Panel, n: &u32| d.id + n));
//!
//! let children = panel.view(move || current_panel.get());
//! ```
//!
//! ## Modules
//!
//! - [`identifier`] - Slot identifiers (type-level markers)
//! - [`ordering`] - Rank-ordered insertion
//! - [`entry`] - Fillers, entries, entry ids, list snapshots
//! - [`event`] - Events, triggers, subscriptions
//! - [`insert`] - Insertion requests and the trigger engine
//! - [`slot`] - Per-slot handle (insert, clear, watch)
//! - [`render`] - Rendering adapter (render, view, mount, each)
//! - [`registry`] - Configuration and typed slot lookup

pub mod entry;
pub mod error;
pub mod event;
pub mod identifier;
pub mod insert;
pub mod ordering;
pub mod registry;
pub mod render;
pub mod slot;

mod reactive;
mod store;

pub use entry::{EntryId, EntryKind, Filler, FillerEntry, SlotList};
pub use error::SlotError;
pub use event::{Event, Subscription, Trigger, TriggerSet};
pub use identifier::{create_slot_identifier, SlotIdentifier};
pub use insert::{InsertOutcome, Insertion};
pub use ordering::{insert_sorted, Ranked};
pub use registry::{create_slots, SlotConfig, SlotRegistry};
pub use render::{each, render_list, Cleanup, Rendered};
pub use slot::Slot;
