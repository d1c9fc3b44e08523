//! Script-facing adapter over one host array-typed property.
//!
//! The proxy exposes the host's native buffer to script code as a userdata
//! with `len` and `get` methods, marshalling elements through the registered
//! pusher for the array's declared element kind. `get` is 0-based by the
//! host convention — deliberately not unified with `Variant::get_at`'s
//! 1-based contract.

use std::cell::RefCell;
use std::rc::Rc;

use silk_engine::{Engine, ScriptError, ScriptValue, Table};

use crate::error::MarshalError;
use crate::marshal::default_registry;
use crate::reflect::{PropertyDesc, PropertyKind};

/// Userdata kind name of array proxies, checked by typed casts.
pub const ARRAY_TYPE_NAME: &str = "silk.array";

/// A host-owned native array buffer: element kind, element size, raw bytes.
#[derive(Debug)]
pub struct HostArray {
    /// Declared element property kind
    pub elem_kind: PropertyKind,
    /// Element stride in bytes
    pub elem_size: usize,
    /// Raw element storage, `len() * elem_size` bytes
    pub data: Vec<u8>,
}

impl HostArray {
    /// An empty buffer for the given element layout.
    pub fn new(elem_kind: PropertyKind, elem_size: usize) -> Self {
        assert!(elem_size > 0, "element size must be positive");
        Self {
            elem_kind,
            elem_size,
            data: Vec::new(),
        }
    }

    /// Wrap existing raw storage. The byte length must be a whole number of
    /// elements.
    pub fn from_bytes(elem_kind: PropertyKind, elem_size: usize, data: Vec<u8>) -> Self {
        assert!(elem_size > 0, "element size must be positive");
        assert!(
            data.len() % elem_size == 0,
            "buffer length {} is not a multiple of element size {}",
            data.len(),
            elem_size
        );
        Self {
            elem_kind,
            elem_size,
            data,
        }
    }

    /// Element count.
    pub fn len(&self) -> usize {
        self.data.len() / self.elem_size
    }

    /// True when the buffer holds no elements.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// The proxy: the array's declared element property plus a bookkeeping
/// reference to the host buffer.
///
/// Dropping the proxy (when the userdata leaves the stack and registry)
/// releases only this reference; the buffer itself stays owned by the host
/// property.
#[derive(Debug)]
pub struct ArrayProxy {
    elem: PropertyDesc,
    buf: Rc<RefCell<HostArray>>,
}

impl ArrayProxy {
    /// Element count of the backing buffer (O(1)).
    pub fn len(&self) -> usize {
        self.buf.borrow().len()
    }

    /// True when the backing buffer holds no elements.
    pub fn is_empty(&self) -> bool {
        self.buf.borrow().is_empty()
    }

    /// Marshal the element at `index` (0-based) onto the engine stack.
    /// The index must be in range; script-side range checks happen in the
    /// `get` method before delegating here.
    pub fn push_element(&self, engine: &mut Engine, index: usize) -> Result<(), MarshalError> {
        let arr = self.buf.borrow();
        assert!(index < arr.len(), "push_element index {} out of range", index);
        let desc = PropertyDesc::new(
            self.elem.name.clone(),
            arr.elem_kind,
            index * arr.elem_size,
            arr.elem_size,
        );
        let pusher = default_registry()
            .pusher(arr.elem_kind)
            .ok_or(MarshalError::UnsupportedKind(arr.elem_kind))?;
        pusher(engine, &desc, &arr.data)
    }

    /// Push a new proxy over `buf` as a script-facing userdata.
    ///
    /// The userdata's method table exposes `len()` and `get(index)`; both
    /// may be called method-style (the userdata itself as a leading
    /// argument) or plain — only the trailing index argument is read.
    pub fn push_new(engine: &mut Engine, buf: Rc<RefCell<HostArray>>) {
        let elem = {
            let arr = buf.borrow();
            PropertyDesc::new("element", arr.elem_kind, 0, arr.elem_size)
        };
        let proxy = Rc::new(ArrayProxy {
            elem,
            buf: Rc::clone(&buf),
        });

        let methods = Rc::new(RefCell::new(Table::new()));
        {
            let p = Rc::clone(&proxy);
            methods.borrow_mut().set(
                &ScriptValue::Str(Rc::from("len")),
                ScriptValue::Function(Rc::new(move |eng: &mut Engine, _nargs| {
                    eng.push_int(p.len() as i64);
                    Ok(1)
                })),
            );
        }
        {
            let p = Rc::clone(&proxy);
            methods.borrow_mut().set(
                &ScriptValue::Str(Rc::from("get")),
                ScriptValue::Function(Rc::new(move |eng: &mut Engine, nargs| {
                    if nargs == 0 {
                        return Err(ScriptError::Runtime("get expects an index".into()));
                    }
                    let index = eng.int_at(-1);
                    let len = p.len();
                    if index < 0 || index as usize >= len {
                        return Err(ScriptError::IndexOutOfRange { index, len });
                    }
                    p.push_element(eng, index as usize)
                        .map_err(|e| ScriptError::Runtime(e.to_string()))?;
                    Ok(1)
                })),
            );
        }

        engine.push_userdata(ARRAY_TYPE_NAME, proxy, Some(methods));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflect::raw;

    fn int32_buffer(values: &[i32]) -> Rc<RefCell<HostArray>> {
        let mut data = vec![0u8; values.len() * 4];
        for (i, v) in values.iter().enumerate() {
            raw::write_i32(&mut data, i * 4, *v);
        }
        Rc::new(RefCell::new(HostArray::from_bytes(
            PropertyKind::Int32,
            4,
            data,
        )))
    }

    #[test]
    fn test_len_and_element_marshalling() {
        let mut e = Engine::new();
        let buf = int32_buffer(&[10, 20, 30]);
        ArrayProxy::push_new(&mut e, Rc::clone(&buf));
        assert!(e.test_userdata(-1, ARRAY_TYPE_NAME));

        assert!(e.push_method(-1, "len"));
        let n = e.protected_call(0, None).unwrap();
        assert_eq!(n, 1);
        assert_eq!(e.int_at(-1), 3);
        e.pop(2);
    }

    #[test]
    fn test_get_is_zero_based() {
        let mut e = Engine::new();
        let buf = int32_buffer(&[10, 20, 30]);
        ArrayProxy::push_new(&mut e, Rc::clone(&buf));

        assert!(e.push_method(-1, "get"));
        e.dup(-2); // method-style: the proxy itself
        e.push_int(0);
        e.protected_call(2, None).unwrap();
        assert_eq!(e.int_at(-1), 10);
        e.pop(2);
    }

    #[test]
    fn test_get_out_of_range_raises() {
        let mut e = Engine::new();
        let buf = int32_buffer(&[1]);
        ArrayProxy::push_new(&mut e, Rc::clone(&buf));

        assert!(e.push_method(-1, "get"));
        e.push_int(5);
        let err = e.protected_call(1, None).unwrap_err();
        assert!(matches!(err, ScriptError::IndexOutOfRange { index: 5, len: 1 }));
        e.pop(2); // error value + proxy
    }

    #[test]
    fn test_proxy_drop_leaves_host_buffer() {
        let mut e = Engine::new();
        let buf = int32_buffer(&[7]);
        ArrayProxy::push_new(&mut e, Rc::clone(&buf));
        e.pop(1); // proxy collected with its stack slot

        assert_eq!(Rc::strong_count(&buf), 1);
        assert_eq!(buf.borrow().len(), 1);
    }

    #[test]
    fn test_proxy_reflects_host_mutation() {
        let mut e = Engine::new();
        let buf = int32_buffer(&[1, 2]);
        ArrayProxy::push_new(&mut e, Rc::clone(&buf));

        // Host grows the buffer; the proxy sees the new length.
        {
            let mut arr = buf.borrow_mut();
            let mut extra = vec![0u8; 4];
            raw::write_i32(&mut extra, 0, 3);
            arr.data.extend_from_slice(&extra);
        }
        assert!(e.push_method(-1, "len"));
        e.protected_call(0, None).unwrap();
        assert_eq!(e.int_at(-1), 3);
        e.pop(2);
    }
}
