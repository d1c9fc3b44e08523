//! silk-bridge — polymorphic variant values between the silk scripting
//! engine and a host reflection model.
//!
//! The central type is [`Variant`]: an ordered run of tagged slots read as
//! nil, a scalar, or a tuple. Variants are built from native host values or
//! captured from the engine's stack; they move into and out of host
//! reflected properties through the kind-keyed [`marshal`] table, and they
//! drive invocation of script-side functions with host-typed arguments.
//!
//! Ownership model: string slots share reference-counted [`StringRef`]
//! cells; function, table, and userdata slots share [`HandleRef`] registry
//! pins that unpin when the last variant copy drops. Acquire and release
//! are paired on every path, including error paths — nothing is collected
//! early and nothing stays pinned forever.

#![warn(missing_docs)]

pub mod array;
pub mod cell;
pub mod error;
pub mod marshal;
pub mod reflect;
pub mod variant;

pub use array::{ArrayProxy, HostArray, ARRAY_TYPE_NAME};
pub use cell::{HandleCell, HandleRef, StringRef};
pub use error::MarshalError;
pub use marshal::{default_registry, MarshallerRegistry, PushFn, WriteFn};
pub use reflect::{FunctionDesc, ParamDesc, PropertyDesc, PropertyKind};
pub use variant::{push_error_handler, Variant, VariantType};
