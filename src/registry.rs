//! Slot registry - setup-time configuration and typed slot lookup.
//!
//! # Example
//!
//! ```ignore
//! use spark_slots::{create_slot_identifier, create_slots, SlotConfig};
//!
//! let registry = create_slots(
//!     SlotConfig::<String>::new()
//!         .slot("ConfirmScreenBottom", create_slot_identifier::<Confirmed>())
//!         .slot("StatusBar", create_slot_identifier::<()>()),
//! )?;
//!
//! let bottom = registry.slot::<Confirmed>("ConfirmScreenBottom")?;
//! ```

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::error::SlotError;
use crate::identifier::SlotIdentifier;
use crate::slot::Slot;

// =============================================================================
// Configuration
// =============================================================================

struct SlotDecl {
    name: String,
    type_id: TypeId,
    type_name: &'static str,
    build: fn(Rc<str>) -> Rc<dyn Any>,
}

fn build_slot<D: 'static, V: 'static>(name: Rc<str>) -> Rc<dyn Any> {
    Rc::new(Slot::<D, V>::new(name))
}

/// Mapping from slot name to identifier, in declaration order.
///
/// Validation happens when the registry is built, not here.
pub struct SlotConfig<V> {
    decls: Vec<SlotDecl>,
    _view: std::marker::PhantomData<fn() -> V>,
}

impl<V: 'static> SlotConfig<V> {
    pub fn new() -> Self {
        Self {
            decls: Vec::new(),
            _view: std::marker::PhantomData,
        }
    }

    /// Declare a slot carrying render-time data `D`.
    pub fn slot<D: 'static>(mut self, name: impl Into<String>, identifier: SlotIdentifier<D>) -> Self {
        self.decls.push(SlotDecl {
            name: name.into(),
            type_id: TypeId::of::<D>(),
            type_name: identifier.payload_type_name(),
            build: build_slot::<D, V>,
        });
        self
    }

    pub fn len(&self) -> usize {
        self.decls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }
}

impl<V: 'static> Default for SlotConfig<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> fmt::Debug for SlotConfig<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.decls.iter().map(|d| (&d.name, d.type_name)))
            .finish()
    }
}

// =============================================================================
// Registry
// =============================================================================

struct RegisteredSlot {
    type_id: TypeId,
    type_name: &'static str,
    slot: Rc<dyn Any>,
}

struct RegistryInner {
    order: Vec<Rc<str>>,
    slots: HashMap<Rc<str>, RegisteredSlot>,
}

/// Owns one slot per configured name.
///
/// Construct one registry per set of slot names and share it; cloning is
/// cheap and every clone addresses the same slots.
pub struct SlotRegistry<V> {
    inner: Rc<RegistryInner>,
    _view: std::marker::PhantomData<fn() -> V>,
}

impl<V: 'static> SlotRegistry<V> {
    /// Build the registry, rejecting empty configurations, blank names and
    /// duplicate names.
    pub fn new(config: SlotConfig<V>) -> Result<Self, SlotError> {
        if config.is_empty() {
            return Err(SlotError::EmptyConfig);
        }

        let mut order = Vec::with_capacity(config.len());
        let mut slots = HashMap::with_capacity(config.len());

        for decl in config.decls {
            if decl.name.trim().is_empty() {
                return Err(SlotError::EmptyName);
            }

            let name: Rc<str> = decl.name.into();
            if slots.contains_key(&name) {
                return Err(SlotError::DuplicateSlot(name.to_string()));
            }

            let slot = (decl.build)(name.clone());
            slots.insert(
                name.clone(),
                RegisteredSlot {
                    type_id: decl.type_id,
                    type_name: decl.type_name,
                    slot,
                },
            );
            order.push(name);
        }

        tracing::debug!(slots = order.len(), "slot registry created");

        Ok(Self {
            inner: Rc::new(RegistryInner { order, slots }),
            _view: std::marker::PhantomData,
        })
    }

    /// Typed handle to the slot called `name`.
    ///
    /// `D` must be the data type the slot was declared with.
    pub fn slot<D: 'static>(&self, name: &str) -> Result<Slot<D, V>, SlotError> {
        let registered = self
            .inner
            .slots
            .get(name)
            .ok_or_else(|| SlotError::UnknownSlot(name.to_string()))?;

        let mismatch = || SlotError::PayloadMismatch {
            slot: name.to_string(),
            expected: registered.type_name,
            requested: std::any::type_name::<D>(),
        };

        if registered.type_id != TypeId::of::<D>() {
            return Err(mismatch());
        }
        registered
            .slot
            .downcast_ref::<Slot<D, V>>()
            .cloned()
            .ok_or_else(mismatch)
    }

    /// Configured names, in declaration order.
    pub fn slot_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.inner.order.iter().map(|name| &**name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.slots.contains_key(name)
    }
}

impl<V> Clone for SlotRegistry<V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            _view: std::marker::PhantomData,
        }
    }
}

impl<V> fmt::Debug for SlotRegistry<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotRegistry")
            .field("slots", &self.inner.order)
            .finish()
    }
}

/// Build a registry from `config`. Same as [`SlotRegistry::new`].
pub fn create_slots<V: 'static>(config: SlotConfig<V>) -> Result<SlotRegistry<V>, SlotError> {
    SlotRegistry::new(config)
}
