//! Slot registry errors.

use thiserror::Error;

/// Errors raised while building a registry or resolving a slot handle.
///
/// Configuration errors are reported by [`SlotRegistry::new`](crate::SlotRegistry::new)
/// and never deferred to first use.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SlotError {
    /// The configuration declared no slots at all.
    #[error("slot configuration is empty")]
    EmptyConfig,
    /// A slot was declared with an empty or blank name.
    #[error("slot name must not be empty")]
    EmptyName,
    /// The same slot name was declared twice.
    #[error("duplicate slot: {0}")]
    DuplicateSlot(String),
    /// No slot with this name was configured.
    #[error("unknown slot: {0}")]
    UnknownSlot(String),
    /// The slot exists but carries a different render-time data type.
    #[error("slot {slot} carries {expected}, not {requested}")]
    PayloadMismatch {
        slot: String,
        expected: &'static str,
        requested: &'static str,
    },
}
