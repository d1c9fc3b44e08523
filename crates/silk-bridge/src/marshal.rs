//! Property marshalling: kind-keyed conversion between engine stack values
//! and raw host property slots.
//!
//! Converters are looked up by the property's runtime kind in a registered
//! table, so a new host property kind is supported by registering a pusher
//! and a writer — `Variant` itself never changes. The default table covers
//! every built-in [`PropertyKind`] and is populated once at startup.

use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;

use silk_engine::{Engine, TypeTag};

use crate::error::MarshalError;
use crate::reflect::{raw, PropertyDesc, PropertyKind};

/// Push the property's slot value from `block` onto the engine stack.
/// Pushes exactly one slot on success, nothing on failure.
pub type PushFn = fn(&mut Engine, &PropertyDesc, &[u8]) -> Result<(), MarshalError>;

/// Store the stack value at the given absolute index into the property's
/// slot inside `block`.
pub type WriteFn = fn(&mut Engine, &PropertyDesc, &mut [u8], i32) -> Result<(), MarshalError>;

/// Conversion table keyed by property kind.
pub struct MarshallerRegistry {
    pushers: FxHashMap<PropertyKind, PushFn>,
    writers: FxHashMap<PropertyKind, WriteFn>,
}

impl MarshallerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            pushers: FxHashMap::default(),
            writers: FxHashMap::default(),
        }
    }

    /// Create a registry covering every built-in property kind.
    pub fn with_defaults() -> Self {
        let mut reg = Self::new();
        reg.register(PropertyKind::Bool, push_bool, write_bool);
        reg.register(PropertyKind::Int32, push_i32, write_i32);
        reg.register(PropertyKind::Int64, push_i64, write_i64);
        reg.register(PropertyKind::Float, push_f32, write_f32);
        reg.register(PropertyKind::Double, push_f64, write_f64);
        reg.register(PropertyKind::Str, push_str, write_str);
        reg
    }

    /// Register both converters for a kind, replacing any existing pair.
    pub fn register(&mut self, kind: PropertyKind, pusher: PushFn, writer: WriteFn) {
        self.pushers.insert(kind, pusher);
        self.writers.insert(kind, writer);
    }

    /// Look up the pusher for a kind.
    pub fn pusher(&self, kind: PropertyKind) -> Option<PushFn> {
        self.pushers.get(&kind).copied()
    }

    /// Look up the writer for a kind.
    pub fn writer(&self, kind: PropertyKind) -> Option<WriteFn> {
        self.writers.get(&kind).copied()
    }

    /// Whether a kind has converters registered.
    pub fn contains(&self, kind: PropertyKind) -> bool {
        self.writers.contains_key(&kind)
    }
}

impl Default for MarshallerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// The startup-populated default conversion table.
pub fn default_registry() -> &'static MarshallerRegistry {
    static DEFAULT: Lazy<MarshallerRegistry> = Lazy::new(MarshallerRegistry::with_defaults);
    &DEFAULT
}

// ============================================================================
// Default pushers: property slot -> engine stack
// ============================================================================

fn push_bool(engine: &mut Engine, prop: &PropertyDesc, block: &[u8]) -> Result<(), MarshalError> {
    engine.push_bool(raw::read_bool(block, prop.offset));
    Ok(())
}

fn push_i32(engine: &mut Engine, prop: &PropertyDesc, block: &[u8]) -> Result<(), MarshalError> {
    engine.push_int(raw::read_i32(block, prop.offset) as i64);
    Ok(())
}

fn push_i64(engine: &mut Engine, prop: &PropertyDesc, block: &[u8]) -> Result<(), MarshalError> {
    engine.push_int(raw::read_i64(block, prop.offset));
    Ok(())
}

fn push_f32(engine: &mut Engine, prop: &PropertyDesc, block: &[u8]) -> Result<(), MarshalError> {
    engine.push_number(raw::read_f32(block, prop.offset) as f64);
    Ok(())
}

fn push_f64(engine: &mut Engine, prop: &PropertyDesc, block: &[u8]) -> Result<(), MarshalError> {
    engine.push_number(raw::read_f64(block, prop.offset));
    Ok(())
}

fn push_str(engine: &mut Engine, prop: &PropertyDesc, block: &[u8]) -> Result<(), MarshalError> {
    let s = raw::read_str(block, prop.offset)?;
    engine.push_str(s);
    Ok(())
}

// ============================================================================
// Default writers: engine stack -> property slot
// ============================================================================

fn mismatch(engine: &Engine, index: i32, expected: PropertyKind) -> MarshalError {
    MarshalError::TypeMismatch {
        expected: expected.name().to_string(),
        got: engine.value_at(index).type_name().to_string(),
    }
}

fn numeric_at(engine: &mut Engine, index: i32) -> Option<f64> {
    match engine.type_at(index) {
        TypeTag::Int | TypeTag::Number => Some(engine.number_at(index)),
        _ => None,
    }
}

fn write_bool(
    engine: &mut Engine,
    prop: &PropertyDesc,
    block: &mut [u8],
    index: i32,
) -> Result<(), MarshalError> {
    match engine.type_at(index) {
        TypeTag::Bool => {
            raw::write_bool(block, prop.offset, engine.bool_at(index));
            Ok(())
        }
        _ => Err(mismatch(engine, index, PropertyKind::Bool)),
    }
}

fn write_i32(
    engine: &mut Engine,
    prop: &PropertyDesc,
    block: &mut [u8],
    index: i32,
) -> Result<(), MarshalError> {
    match numeric_at(engine, index) {
        Some(n) => {
            raw::write_i32(block, prop.offset, n as i32);
            Ok(())
        }
        None => Err(mismatch(engine, index, PropertyKind::Int32)),
    }
}

fn write_i64(
    engine: &mut Engine,
    prop: &PropertyDesc,
    block: &mut [u8],
    index: i32,
) -> Result<(), MarshalError> {
    match engine.type_at(index) {
        TypeTag::Int => {
            raw::write_i64(block, prop.offset, engine.int_at(index));
            Ok(())
        }
        TypeTag::Number => {
            raw::write_i64(block, prop.offset, engine.number_at(index) as i64);
            Ok(())
        }
        _ => Err(mismatch(engine, index, PropertyKind::Int64)),
    }
}

fn write_f32(
    engine: &mut Engine,
    prop: &PropertyDesc,
    block: &mut [u8],
    index: i32,
) -> Result<(), MarshalError> {
    match numeric_at(engine, index) {
        Some(n) => {
            raw::write_f32(block, prop.offset, n as f32);
            Ok(())
        }
        None => Err(mismatch(engine, index, PropertyKind::Float)),
    }
}

fn write_f64(
    engine: &mut Engine,
    prop: &PropertyDesc,
    block: &mut [u8],
    index: i32,
) -> Result<(), MarshalError> {
    match numeric_at(engine, index) {
        Some(n) => {
            raw::write_f64(block, prop.offset, n);
            Ok(())
        }
        None => Err(mismatch(engine, index, PropertyKind::Double)),
    }
}

fn write_str(
    engine: &mut Engine,
    prop: &PropertyDesc,
    block: &mut [u8],
    index: i32,
) -> Result<(), MarshalError> {
    match engine.type_at(index) {
        TypeTag::Str => {
            let s = engine.str_at(index);
            raw::write_str(block, prop.offset, prop.size, &s)
        }
        _ => Err(mismatch(engine, index, PropertyKind::Str)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry_covers_all_kinds() {
        let reg = default_registry();
        for kind in [
            PropertyKind::Bool,
            PropertyKind::Int32,
            PropertyKind::Int64,
            PropertyKind::Float,
            PropertyKind::Double,
            PropertyKind::Str,
        ] {
            assert!(reg.contains(kind), "missing converters for {:?}", kind);
            assert!(reg.pusher(kind).is_some());
            assert!(reg.writer(kind).is_some());
        }
    }

    #[test]
    fn test_empty_registry_has_no_converters() {
        let reg = MarshallerRegistry::new();
        assert!(!reg.contains(PropertyKind::Int32));
        assert!(reg.pusher(PropertyKind::Int32).is_none());
    }

    #[test]
    fn test_numeric_writer_accepts_both_subtypes() {
        let mut e = Engine::new();
        let prop = PropertyDesc::scalar("x", PropertyKind::Double, 0);
        let mut block = vec![0u8; 8];

        e.push_int(3);
        write_f64(&mut e, &prop, &mut block, 1).unwrap();
        assert_eq!(raw::read_f64(&block, 0), 3.0);
        e.pop(1);

        e.push_number(2.5);
        write_f64(&mut e, &prop, &mut block, 1).unwrap();
        assert_eq!(raw::read_f64(&block, 0), 2.5);
        e.pop(1);
    }

    #[test]
    fn test_bool_writer_rejects_numbers() {
        let mut e = Engine::new();
        let prop = PropertyDesc::scalar("flag", PropertyKind::Bool, 0);
        let mut block = vec![0u8; 1];
        e.push_int(1);
        let err = write_bool(&mut e, &prop, &mut block, 1).unwrap_err();
        assert!(matches!(err, MarshalError::TypeMismatch { .. }));
        e.pop(1);
    }
}
