//! Error types for property marshalling.
//!
//! Precondition violations (wrong-arity accessors, invoking a non-function
//! variant, tuple capture below the stack depth) are programming errors and
//! panic; `MarshalError` covers only the recoverable conversion outcomes a
//! caller may want to branch on.

use crate::reflect::PropertyKind;

/// A failed conversion between a variant and a host property slot.
#[derive(Debug, Clone, thiserror::Error)]
pub enum MarshalError {
    /// No converter is registered for the property's runtime kind
    #[error("no marshaller registered for property kind {0:?}")]
    UnsupportedKind(PropertyKind),

    /// The script value's kind does not satisfy the property's kind
    #[error("type mismatch: expected {expected}, got {got}")]
    TypeMismatch {
        /// Kind the property requires
        expected: String,
        /// Kind the script value carried
        got: String,
    },

    /// The value was the right kind but could not be stored
    #[error("value rejected: {0}")]
    Rejected(String),

    /// A string does not fit the property slot's declared capacity
    #[error("string slot needs {needed} bytes, capacity is {have}")]
    Capacity {
        /// Bytes the value requires (length prefix included)
        needed: usize,
        /// Declared slot capacity
        have: usize,
    },
}
