//! Reference-counted cells shared across variant copies.
//!
//! A string slot shares one immutable [`StringRef`] cell; a function, table,
//! or userdata slot shares one [`HandleCell`] holding a registry pin. Every
//! clone of a slot bumps the cell's strong count, every drop releases exactly
//! one reference, and the last drop frees the buffer or removes the pin.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use silk_engine::{Engine, Registry, RegistryKey};

/// Reference-counted immutable string cell. Cloning shares the buffer; the
/// buffer is freed when the last clone drops.
pub type StringRef = Rc<str>;

/// Shared ownership of one registry pin. Cloning is the explicit `addRef`;
/// two handles are never merged even when they pin equal script values.
pub type HandleRef = Rc<HandleCell>;

/// One registry pin keeping a script-side value reachable beyond its
/// originating stack slot.
///
/// The cell holds the owning engine's registry weakly: when the last strong
/// reference drops, the pin is removed; if the engine is already gone the
/// registry died with it and nothing is left to unpin.
pub struct HandleCell {
    registry: Weak<RefCell<Registry>>,
    key: RegistryKey,
}

impl HandleCell {
    /// Duplicate the stack value at `index` and pin it under a fresh key.
    /// The original slot may be popped afterwards; the pin keeps the value
    /// reachable.
    pub(crate) fn pin_stack_value(engine: &mut Engine, index: i32) -> HandleRef {
        engine.dup(index);
        let key = engine.pin();
        Rc::new(HandleCell {
            registry: engine.registry_handle(),
            key,
        })
    }

    /// Push the pinned value back onto the engine's stack.
    pub(crate) fn push_onto(&self, engine: &mut Engine) {
        debug_assert!(
            self.belongs_to(engine),
            "handle cell pushed onto a different engine"
        );
        engine.push_pinned(self.key);
    }

    /// Whether this cell's pin lives in `engine`'s registry.
    pub fn belongs_to(&self, engine: &Engine) -> bool {
        Weak::ptr_eq(&self.registry, &engine.registry_handle())
    }

    /// The pin's registry key.
    pub fn key(&self) -> RegistryKey {
        self.key
    }
}

impl Drop for HandleCell {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.borrow_mut().unpin(self.key);
        }
    }
}

impl fmt::Debug for HandleCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandleCell")
            .field("key", &self.key)
            .field("engine_alive", &(self.registry.strong_count() > 0))
            .finish()
    }
}
