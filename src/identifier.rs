//! Slot identifiers - type-level markers for a slot's render-time data.

use std::fmt;
use std::marker::PhantomData;

/// Marker binding a slot to the data type `D` its owner passes to every
/// filler at render time.
///
/// Zero-sized; carries no runtime state. Use `()` for slots without data.
pub struct SlotIdentifier<D> {
    _data: PhantomData<fn(&D)>,
}

impl<D> SlotIdentifier<D> {
    pub const fn new() -> Self {
        Self { _data: PhantomData }
    }

    /// Name of the render-time data type, for diagnostics.
    pub fn payload_type_name(&self) -> &'static str {
        std::any::type_name::<D>()
    }
}

/// Create the identifier for a slot carrying render-time data `D`.
pub const fn create_slot_identifier<D>() -> SlotIdentifier<D> {
    SlotIdentifier::new()
}

impl<D> Clone for SlotIdentifier<D> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<D> Copy for SlotIdentifier<D> {}

impl<D> Default for SlotIdentifier<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D> fmt::Debug for SlotIdentifier<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SlotIdentifier<{}>", self.payload_type_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_is_zero_sized() {
        let id = create_slot_identifier::<u32>();
        assert_eq!(std::mem::size_of_val(&id), 0);
        assert_eq!(id.payload_type_name(), "u32");
    }

    #[test]
    fn test_identifier_debug() {
        let id = create_slot_identifier::<()>();
        assert_eq!(format!("{:?}", id), "SlotIdentifier<()>");
    }
}
