//! Host reflection model: property descriptors, callable descriptors, and
//! raw typed slots inside parameter blocks.
//!
//! A property knows its runtime kind and where its slot sits inside a raw
//! byte block; a callable enumerates its parameters in declaration order
//! with a return-parameter flag. Slot layout is little-endian; string slots
//! are length-prefixed (`u32` length + UTF-8 bytes) within the property's
//! declared capacity.

use crate::error::MarshalError;

/// Runtime kind tag of a host reflected property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyKind {
    /// One-byte boolean slot
    Bool,
    /// 32-bit signed integer slot
    Int32,
    /// 64-bit signed integer slot
    Int64,
    /// 32-bit float slot
    Float,
    /// 64-bit float slot
    Double,
    /// Length-prefixed UTF-8 slot; capacity comes from the descriptor
    Str,
}

impl PropertyKind {
    /// Fixed slot size in bytes, or `None` for kinds sized by the descriptor.
    pub fn element_size(self) -> Option<usize> {
        match self {
            PropertyKind::Bool => Some(1),
            PropertyKind::Int32 => Some(4),
            PropertyKind::Int64 => Some(8),
            PropertyKind::Float => Some(4),
            PropertyKind::Double => Some(8),
            PropertyKind::Str => None,
        }
    }

    /// Kind name for diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            PropertyKind::Bool => "bool",
            PropertyKind::Int32 => "int32",
            PropertyKind::Int64 => "int64",
            PropertyKind::Float => "float",
            PropertyKind::Double => "double",
            PropertyKind::Str => "string",
        }
    }
}

/// One host reflected property: kind plus its slot inside a raw block.
#[derive(Debug, Clone)]
pub struct PropertyDesc {
    /// Property name
    pub name: String,
    /// Runtime kind tag
    pub kind: PropertyKind,
    /// Byte offset of the slot within its block
    pub offset: usize,
    /// Slot size in bytes (capacity for string slots)
    pub size: usize,
}

impl PropertyDesc {
    /// Describe a property with an explicit slot size.
    pub fn new(name: impl Into<String>, kind: PropertyKind, offset: usize, size: usize) -> Self {
        Self {
            name: name.into(),
            kind,
            offset,
            size,
        }
    }

    /// Describe a fixed-size property, taking the size from its kind.
    pub fn scalar(name: impl Into<String>, kind: PropertyKind, offset: usize) -> Self {
        let size = kind
            .element_size()
            .expect("scalar() requires a fixed-size property kind");
        Self::new(name, kind, offset, size)
    }

    /// Slot size in bytes.
    pub fn element_size(&self) -> usize {
        self.size
    }
}

/// One declared parameter of a host callable.
#[derive(Debug, Clone)]
pub struct ParamDesc {
    /// The parameter's property descriptor (kind, offset, size)
    pub prop: PropertyDesc,
    /// Return parameters carry results back and are never pushed as inputs
    pub is_return: bool,
}

/// A host callable's parameter layout, in declaration order.
#[derive(Debug, Clone)]
pub struct FunctionDesc {
    /// Callable name
    pub name: String,
    params: Vec<ParamDesc>,
}

impl FunctionDesc {
    /// Start describing a callable.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
        }
    }

    /// Append an input parameter.
    pub fn param(mut self, prop: PropertyDesc) -> Self {
        self.params.push(ParamDesc {
            prop,
            is_return: false,
        });
        self
    }

    /// Append a return parameter.
    pub fn return_param(mut self, prop: PropertyDesc) -> Self {
        self.params.push(ParamDesc {
            prop,
            is_return: true,
        });
        self
    }

    /// Parameters in declaration order.
    pub fn params(&self) -> &[ParamDesc] {
        &self.params
    }

    /// Bytes a parameter block for this callable must span.
    pub fn block_size(&self) -> usize {
        self.params
            .iter()
            .map(|p| p.prop.offset + p.prop.size)
            .max()
            .unwrap_or(0)
    }
}

/// Raw typed slot access inside a parameter or array block.
pub mod raw {
    use super::MarshalError;

    /// Read a one-byte boolean slot.
    pub fn read_bool(block: &[u8], offset: usize) -> bool {
        block[offset] != 0
    }

    /// Write a one-byte boolean slot.
    pub fn write_bool(block: &mut [u8], offset: usize, value: bool) {
        block[offset] = value as u8;
    }

    /// Read a 32-bit integer slot.
    pub fn read_i32(block: &[u8], offset: usize) -> i32 {
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&block[offset..offset + 4]);
        i32::from_le_bytes(bytes)
    }

    /// Write a 32-bit integer slot.
    pub fn write_i32(block: &mut [u8], offset: usize, value: i32) {
        block[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    }

    /// Read a 64-bit integer slot.
    pub fn read_i64(block: &[u8], offset: usize) -> i64 {
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&block[offset..offset + 8]);
        i64::from_le_bytes(bytes)
    }

    /// Write a 64-bit integer slot.
    pub fn write_i64(block: &mut [u8], offset: usize, value: i64) {
        block[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
    }

    /// Read a 32-bit float slot.
    pub fn read_f32(block: &[u8], offset: usize) -> f32 {
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&block[offset..offset + 4]);
        f32::from_le_bytes(bytes)
    }

    /// Write a 32-bit float slot.
    pub fn write_f32(block: &mut [u8], offset: usize, value: f32) {
        block[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    }

    /// Read a 64-bit float slot.
    pub fn read_f64(block: &[u8], offset: usize) -> f64 {
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&block[offset..offset + 8]);
        f64::from_le_bytes(bytes)
    }

    /// Write a 64-bit float slot.
    pub fn write_f64(block: &mut [u8], offset: usize, value: f64) {
        block[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
    }

    /// Read a length-prefixed string slot.
    pub fn read_str(block: &[u8], offset: usize) -> Result<&str, MarshalError> {
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&block[offset..offset + 4]);
        let len = u32::from_le_bytes(bytes) as usize;
        let start = offset + 4;
        if start + len > block.len() {
            return Err(MarshalError::Rejected(
                "string slot length exceeds its block".into(),
            ));
        }
        std::str::from_utf8(&block[start..start + len])
            .map_err(|_| MarshalError::Rejected("string slot holds invalid UTF-8".into()))
    }

    /// Write a length-prefixed string slot within `capacity` bytes.
    pub fn write_str(
        block: &mut [u8],
        offset: usize,
        capacity: usize,
        value: &str,
    ) -> Result<(), MarshalError> {
        let needed = value.len() + 4;
        if needed > capacity {
            return Err(MarshalError::Capacity {
                needed,
                have: capacity,
            });
        }
        block[offset..offset + 4].copy_from_slice(&(value.len() as u32).to_le_bytes());
        block[offset + 4..offset + 4 + value.len()].copy_from_slice(value.as_bytes());
        Ok(())
    }
}
