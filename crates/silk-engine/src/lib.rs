//! silk-engine — embedded scripting-engine substrate.
//!
//! This crate provides the engine surface the silk bridge marshals against:
//! - dynamic values ([`ScriptValue`]) with reference-counted heap cells
//! - a value stack with Lua-convention 1-based/negative indexes
//! - a pin [`Registry`] keeping values reachable beyond their stack life
//! - protected calls with an optional message handler
//!
//! Script compilation and execution semantics are out of scope: function
//! values are natively-registered closures, which is all the boundary layer
//! needs to exercise its call protocol.

#![warn(missing_docs)]

pub mod engine;
pub mod error;
pub mod registry;
pub mod value;

pub use engine::Engine;
pub use error::{ScriptError, ScriptResult};
pub use registry::{Registry, RegistryKey};
pub use value::{ScriptFn, ScriptValue, Table, TableKey, TypeTag, Userdata};
