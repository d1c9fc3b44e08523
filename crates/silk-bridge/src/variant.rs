//! The bridging value type.
//!
//! A [`Variant`] is an ordered run of tagged slots: zero slots is nil, one
//! slot is a scalar of the slot's kind, more than one is a tuple (multiple
//! simultaneous values, e.g. a call's return values). String slots own a
//! shared [`StringRef`] cell; function, table, and userdata slots own a
//! shared [`HandleRef`] pin so the script-side value stays reachable for as
//! long as any variant copy references it. Tuples are only ever captured
//! from a contiguous stack window and never nest.

use std::cell::RefCell;
use std::rc::Weak;

use silk_engine::{Engine, Registry, ScriptValue, TypeTag};

use crate::cell::{HandleCell, HandleRef, StringRef};
use crate::error::MarshalError;
use crate::marshal::{default_registry, MarshallerRegistry};
use crate::reflect::{FunctionDesc, PropertyDesc};

/// Logical type of a variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariantType {
    /// Zero slots
    Nil,
    /// Integer scalar
    Int,
    /// Float scalar
    Number,
    /// Boolean scalar
    Bool,
    /// String scalar
    String,
    /// Script function handle
    Function,
    /// Script table handle
    Table,
    /// Host-defined opaque handle
    Userdata,
    /// More than one slot
    Tuple,
}

/// One tagged slot. The handle-kind cases share storage (a registry pin);
/// the tag records the intended use.
#[derive(Debug, Clone)]
enum Slot {
    Nil,
    Int(i64),
    Number(f64),
    Bool(bool),
    Str(StringRef),
    Function(HandleRef),
    Table(HandleRef),
    Userdata(HandleRef),
}

impl Slot {
    fn variant_type(&self) -> VariantType {
        match self {
            Slot::Nil => VariantType::Nil,
            Slot::Int(_) => VariantType::Int,
            Slot::Number(_) => VariantType::Number,
            Slot::Bool(_) => VariantType::Bool,
            Slot::Str(_) => VariantType::String,
            Slot::Function(_) => VariantType::Function,
            Slot::Table(_) => VariantType::Table,
            Slot::Userdata(_) => VariantType::Userdata,
        }
    }
}

/// The bridging value: nil, a scalar, or a tuple of tagged slots.
///
/// Cloning duplicates the slot run and bumps every contained cell's strong
/// count; dropping releases exactly one reference per slot. The engine is
/// held weakly and only by the registry pins — a variant never keeps its
/// engine alive.
#[derive(Debug, Clone, Default)]
pub struct Variant {
    engine: Weak<RefCell<Registry>>,
    slots: Vec<Slot>,
}

impl Variant {
    // ========================================================================
    // Construction
    // ========================================================================

    /// The nil variant.
    pub fn nil() -> Self {
        Self::default()
    }

    /// An integer scalar.
    pub fn from_int(value: i64) -> Self {
        Self {
            engine: Weak::new(),
            slots: vec![Slot::Int(value)],
        }
    }

    /// A float scalar.
    pub fn from_number(value: f64) -> Self {
        Self {
            engine: Weak::new(),
            slots: vec![Slot::Number(value)],
        }
    }

    /// A boolean scalar.
    pub fn from_bool(value: bool) -> Self {
        Self {
            engine: Weak::new(),
            slots: vec![Slot::Bool(value)],
        }
    }

    /// A string scalar, allocating a fresh shared cell.
    pub fn from_str(value: &str) -> Self {
        Self {
            engine: Weak::new(),
            slots: vec![Slot::Str(StringRef::from(value))],
        }
    }

    /// Capture the stack value at `index` without popping it.
    ///
    /// Function, table, and userdata values are duplicated and pinned in the
    /// engine's registry, so the original stack slot may be popped safely
    /// afterwards.
    pub fn from_stack(engine: &mut Engine, index: i32) -> Self {
        let slot = classify(engine, index);
        Self {
            engine: engine.registry_handle(),
            slots: vec![slot],
        }
    }

    /// Capture every value from the 1-based absolute position `base` to the
    /// top of the stack as a tuple, left to right, without popping.
    ///
    /// Only for callers that own a known, fixed stack layout (e.g. "the N
    /// results of a call"); a window that does not exist is a programming
    /// error.
    pub fn from_stack_tuple(engine: &mut Engine, base: usize) -> Self {
        let top = engine.top();
        assert!(
            base >= 1 && top >= base,
            "tuple capture window [{}..={}] does not exist",
            base,
            top
        );
        let mut slots = Vec::with_capacity(top - base + 1);
        for pos in base..=top {
            slots.push(classify(engine, pos as i32));
        }
        Self {
            engine: engine.registry_handle(),
            slots,
        }
    }

    // ========================================================================
    // In-place setters
    // ========================================================================

    /// Replace any existing slots with an integer scalar.
    pub fn set_int(&mut self, value: i64) {
        self.slots.clear();
        self.slots.push(Slot::Int(value));
    }

    /// Replace any existing slots with a float scalar.
    pub fn set_number(&mut self, value: f64) {
        self.slots.clear();
        self.slots.push(Slot::Number(value));
    }

    /// Replace any existing slots with a boolean scalar.
    pub fn set_bool(&mut self, value: bool) {
        self.slots.clear();
        self.slots.push(Slot::Bool(value));
    }

    /// Replace any existing slots with a string scalar.
    pub fn set_str(&mut self, value: &str) {
        self.slots.clear();
        self.slots.push(Slot::Str(StringRef::from(value)));
    }

    // ========================================================================
    // Typing
    // ========================================================================

    /// Logical type: nil for zero slots, the slot's kind for one, tuple for
    /// more.
    pub fn type_of(&self) -> VariantType {
        match self.slots.len() {
            0 => VariantType::Nil,
            1 => self.slots[0].variant_type(),
            _ => VariantType::Tuple,
        }
    }

    /// Number of slots (0 for nil, 1 for scalars, N for tuples). For table
    /// length see [`Variant::len`].
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// True when the variant holds no slots.
    pub fn is_nil(&self) -> bool {
        self.slots.is_empty()
    }

    /// True for an integer scalar.
    pub fn is_int(&self) -> bool {
        matches!(self.slots.as_slice(), [Slot::Int(_)])
    }

    /// True for a float scalar.
    pub fn is_number(&self) -> bool {
        matches!(self.slots.as_slice(), [Slot::Number(_)])
    }

    /// True for a boolean scalar.
    pub fn is_bool(&self) -> bool {
        matches!(self.slots.as_slice(), [Slot::Bool(_)])
    }

    /// True for a string scalar.
    pub fn is_string(&self) -> bool {
        matches!(self.slots.as_slice(), [Slot::Str(_)])
    }

    /// True for a function handle.
    pub fn is_function(&self) -> bool {
        matches!(self.slots.as_slice(), [Slot::Function(_)])
    }

    /// True for a table handle.
    pub fn is_table(&self) -> bool {
        matches!(self.slots.as_slice(), [Slot::Table(_)])
    }

    /// True when the variant holds more than one slot.
    pub fn is_tuple(&self) -> bool {
        self.slots.len() > 1
    }

    /// Typed userdata check. A tag match alone is not enough for a generic
    /// opaque handle, so the value is pushed and cast against the
    /// host-defined kind name through the engine.
    pub fn is_userdata(&self, engine: &mut Engine, expected: &str) -> bool {
        if !matches!(self.slots.as_slice(), [Slot::Userdata(_)]) {
            return false;
        }
        self.push(engine);
        let ok = engine.test_userdata(-1, expected);
        engine.pop(1);
        ok
    }

    // ========================================================================
    // Extraction
    // ========================================================================

    /// Integer value of a numeric scalar; `-1` for any other kind so that
    /// probe-then-branch callers need not pre-check. Panics on non-scalars.
    pub fn as_int(&self) -> i64 {
        assert_eq!(self.slots.len(), 1, "as_int requires a scalar variant");
        match self.slots[0] {
            Slot::Int(i) => i,
            Slot::Number(n) => n as i64,
            _ => -1,
        }
    }

    /// Float value of a numeric scalar; NaN for any other kind. Panics on
    /// non-scalars.
    pub fn as_float(&self) -> f32 {
        assert_eq!(self.slots.len(), 1, "as_float requires a scalar variant");
        match self.slots[0] {
            Slot::Int(i) => i as f32,
            Slot::Number(n) => n as f32,
            _ => f32::NAN,
        }
    }

    /// Double value of a numeric scalar; NaN for any other kind. Panics on
    /// non-scalars.
    pub fn as_double(&self) -> f64 {
        assert_eq!(self.slots.len(), 1, "as_double requires a scalar variant");
        match self.slots[0] {
            Slot::Int(i) => i as f64,
            Slot::Number(n) => n,
            _ => f64::NAN,
        }
    }

    /// String value. Panics unless the variant is a string scalar.
    pub fn as_str(&self) -> &str {
        match self.slots.as_slice() {
            [Slot::Str(s)] => s,
            _ => panic!("as_str requires a string variant"),
        }
    }

    /// Boolean value. Panics unless the variant is a boolean scalar.
    pub fn as_bool(&self) -> bool {
        match self.slots.as_slice() {
            [Slot::Bool(b)] => *b,
            _ => panic!("as_bool requires a boolean variant"),
        }
    }

    /// Logical length. A table handle delegates to the engine's raw length
    /// of the referenced table (live, never cached); every other variant
    /// reports its slot count.
    pub fn len(&self, engine: &mut Engine) -> usize {
        if self.is_table() {
            self.push(engine);
            let n = engine.raw_len_at(-1);
            engine.pop(1);
            n
        } else {
            self.slots.len()
        }
    }

    /// True when `len` would report zero.
    pub fn is_empty(&self, engine: &mut Engine) -> bool {
        self.len(engine) == 0
    }

    /// Indexed read, 1-based.
    ///
    /// A table handle performs a live indexed lookup through the engine and
    /// wraps the single result. A tuple (or scalar) clones the slot at
    /// `index`, sharing its cells; the index is bounds-checked against the
    /// slot count.
    pub fn get_at(&self, engine: &mut Engine, index: usize) -> Variant {
        if self.is_table() {
            self.push(engine);
            engine.get_index(-1, index as i64);
            let result = Variant::from_stack(engine, -1);
            engine.pop(2);
            result
        } else {
            assert!(
                index >= 1 && index <= self.slots.len(),
                "get_at index {} out of range 1..={}",
                index,
                self.slots.len()
            );
            Variant {
                engine: self.engine.clone(),
                slots: vec![self.slots[index - 1].clone()],
            }
        }
    }

    /// Generic keyed read of a table handle: pushes the table and the key,
    /// performs the engine's table get, and wraps the single result.
    pub fn get_from_table(&self, engine: &mut Engine, key: &Variant) -> Variant {
        assert!(self.is_table(), "get_from_table requires a table variant");
        self.push(engine);
        key.push(engine);
        engine.get_table(-2);
        let result = Variant::from_stack(engine, -1);
        engine.pop(2);
        result
    }

    // ========================================================================
    // Pushing
    // ========================================================================

    /// Push the variant onto the engine stack: nil pushes one nil slot, a
    /// scalar pushes its payload, a tuple pushes every slot in order.
    /// Returns the number of slots pushed.
    pub fn push(&self, engine: &mut Engine) -> usize {
        if self.slots.is_empty() {
            engine.push_nil();
            return 1;
        }
        for slot in &self.slots {
            push_slot(engine, slot);
        }
        self.slots.len()
    }

    // ========================================================================
    // Reference management
    // ========================================================================

    /// Reset to nil, releasing one strong reference per slot. Idempotent.
    pub fn clear(&mut self) {
        self.slots.clear();
    }

    /// Move the slots out in O(1), leaving this variant nil.
    pub fn take(&mut self) -> Variant {
        std::mem::take(self)
    }

    // ========================================================================
    // Invocation
    // ========================================================================

    /// Call the referenced script function with the `nargs` values already
    /// pushed on the stack, requesting all results.
    ///
    /// The bridge's error handler is inserted below the arguments and the
    /// function value above it, then a protected call runs. A script-side
    /// failure is absorbed: the error value is popped and zero results are
    /// reported. Returns the number of result values now sitting above the
    /// original call base; consuming them (e.g. via
    /// [`Variant::from_stack_tuple`]) is the caller's responsibility.
    pub fn invoke(&self, engine: &mut Engine, nargs: usize) -> usize {
        assert!(self.is_function(), "invoke requires a function variant");
        let top = engine.top();
        assert!(nargs <= top, "invoke: {} args not on the stack", nargs);
        let base = top - nargs + 1;

        push_error_handler(engine);
        engine.insert(base as i32);
        self.push(engine);
        engine.insert(base as i32 + 1);

        if engine.protected_call(nargs, Some(base)).is_err() {
            engine.pop(1);
        }
        engine.remove(base as i32);
        engine.top() - (base - 1)
    }

    /// Delegate a host callable to this script function.
    ///
    /// Walks the descriptor's parameters in declaration order, skips return
    /// parameters, pushes each input from its slot in `block` through the
    /// default marshaller table, and invokes with the pushed count. Results
    /// are discarded; the count of discarded results is returned.
    pub fn call_through_host_function(
        &self,
        engine: &mut Engine,
        func: &FunctionDesc,
        block: &[u8],
    ) -> Result<usize, MarshalError> {
        assert!(
            self.is_function(),
            "call_through_host_function requires a function variant"
        );
        let registry = default_registry();
        let mut pushed = 0usize;
        for param in func.params() {
            if param.is_return {
                continue;
            }
            let pusher = match registry.pusher(param.prop.kind) {
                Some(p) => p,
                None => {
                    engine.pop(pushed);
                    return Err(MarshalError::UnsupportedKind(param.prop.kind));
                }
            };
            if let Err(e) = pusher(engine, &param.prop, block) {
                engine.pop(pushed);
                return Err(e);
            }
            pushed += 1;
        }
        let nresults = self.invoke(engine, pushed);
        engine.pop(nresults);
        Ok(nresults)
    }

    // ========================================================================
    // Marshalling to a host property
    // ========================================================================

    /// Store this variant into a host property slot using the default
    /// marshaller table. See [`Variant::write_to_property_in`].
    pub fn write_to_property(
        &self,
        engine: &mut Engine,
        prop: &PropertyDesc,
        block: &mut [u8],
    ) -> Result<(), MarshalError> {
        self.write_to_property_in(default_registry(), engine, prop, block)
    }

    /// Store this variant into a host property slot.
    ///
    /// Looks up the writer for the property's kind; an unregistered kind
    /// fails without side effects. Otherwise the variant is pushed, the
    /// writer runs against the pushed value's absolute stack index, the
    /// stack is restored, and the writer's verdict is returned.
    pub fn write_to_property_in(
        &self,
        registry: &MarshallerRegistry,
        engine: &mut Engine,
        prop: &PropertyDesc,
        block: &mut [u8],
    ) -> Result<(), MarshalError> {
        let writer = registry
            .writer(prop.kind)
            .ok_or(MarshalError::UnsupportedKind(prop.kind))?;
        let pushed = self.push(engine);
        let index = engine.top() as i32;
        let result = writer(engine, prop, block, index);
        engine.pop(pushed);
        result
    }
}

/// Push the bridge's error handler: a pass-through message handler that
/// returns the error value unchanged, keeping the protected-call shape
/// uniform for embedders that install a richer handler.
pub fn push_error_handler(engine: &mut Engine) {
    engine.push_function(|_, nargs| Ok(nargs.min(1)));
}

fn classify(engine: &mut Engine, index: i32) -> Slot {
    match engine.type_at(index) {
        TypeTag::Nil => Slot::Nil,
        TypeTag::Bool => Slot::Bool(engine.bool_at(index)),
        // The engine's number tags carry exactness: an integer-subtype slot
        // captures as Int, a float-subtype slot as Number.
        TypeTag::Int => Slot::Int(engine.int_at(index)),
        TypeTag::Number => Slot::Number(engine.number_at(index)),
        TypeTag::Str => Slot::Str(engine.str_at(index)),
        TypeTag::Function => Slot::Function(HandleCell::pin_stack_value(engine, index)),
        TypeTag::Table => Slot::Table(HandleCell::pin_stack_value(engine, index)),
        TypeTag::Userdata => Slot::Userdata(HandleCell::pin_stack_value(engine, index)),
    }
}

fn push_slot(engine: &mut Engine, slot: &Slot) {
    match slot {
        Slot::Nil => engine.push_nil(),
        Slot::Int(i) => engine.push_int(*i),
        Slot::Number(n) => engine.push_number(*n),
        Slot::Bool(b) => engine.push_bool(*b),
        Slot::Str(s) => engine.push_value(ScriptValue::Str(StringRef::clone(s))),
        Slot::Function(h) | Slot::Table(h) | Slot::Userdata(h) => h.push_onto(engine),
    }
}
