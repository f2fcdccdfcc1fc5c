//! Foreign values
//!
//! `ForeignValue` is the uniform tagged representation a call argument is
//! marshalled into, one variant per `ArgumentKind`. An `ObjectRef` carries a
//! `Retained` ownership guard: the marshaller retained the object before
//! handing the value out, and the guard releases when the consumer drops it
//! — so the value may safely outlive the call frame it was extracted from.

use tripwire_object::{ClassId, ObjectId, Retained, Selector};

use crate::descriptor::ArgumentKind;

/// Uninterpreted argument bytes, compared structurally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpaqueBlob {
    bytes: Box<[u8]>,
    align: usize,
}

impl OpaqueBlob {
    /// Wrap raw bytes with their recorded alignment.
    pub fn new(bytes: Box<[u8]>, align: usize) -> Self {
        Self { bytes, align }
    }

    /// The raw bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Recorded alignment.
    pub fn align(&self) -> usize {
        self.align
    }
}

/// One marshalled call argument.
#[derive(Debug, Clone, PartialEq)]
pub enum ForeignValue {
    /// Signed 8-bit integer
    Int8(i8),
    /// Signed 16-bit integer
    Int16(i16),
    /// Signed 32-bit integer
    Int32(i32),
    /// Signed 64-bit integer
    Int64(i64),
    /// Unsigned 8-bit integer
    UInt8(u8),
    /// Unsigned 16-bit integer
    UInt16(u16),
    /// Unsigned 32-bit integer
    UInt32(u32),
    /// Unsigned 64-bit integer
    UInt64(u64),
    /// 32-bit float
    Float32(f32),
    /// 64-bit float
    Float64(f64),
    /// Boolean
    Bool(bool),
    /// Retained reference to a runtime object
    ObjectRef(Retained),
    /// Reference to a runtime class (classes are immortal in the host model,
    /// so no ownership guard is needed)
    TypeRef(ClassId),
    /// An interned selector
    OperationRef(Selector),
    /// Uninterpreted bytes
    Opaque(OpaqueBlob),
}

impl ForeignValue {
    /// The kind this value is tagged with.
    pub fn kind(&self) -> ArgumentKind {
        match self {
            ForeignValue::Int8(_) => ArgumentKind::Int8,
            ForeignValue::Int16(_) => ArgumentKind::Int16,
            ForeignValue::Int32(_) => ArgumentKind::Int32,
            ForeignValue::Int64(_) => ArgumentKind::Int64,
            ForeignValue::UInt8(_) => ArgumentKind::UInt8,
            ForeignValue::UInt16(_) => ArgumentKind::UInt16,
            ForeignValue::UInt32(_) => ArgumentKind::UInt32,
            ForeignValue::UInt64(_) => ArgumentKind::UInt64,
            ForeignValue::Float32(_) => ArgumentKind::Float32,
            ForeignValue::Float64(_) => ArgumentKind::Float64,
            ForeignValue::Bool(_) => ArgumentKind::Bool,
            ForeignValue::ObjectRef(_) => ArgumentKind::ObjectRef,
            ForeignValue::TypeRef(_) => ArgumentKind::TypeRef,
            ForeignValue::OperationRef(_) => ArgumentKind::OperationRef,
            ForeignValue::Opaque(blob) => ArgumentKind::Opaque {
                size: blob.bytes().len(),
                align: blob.align(),
            },
        }
    }

    /// Extract an `Int32`.
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            ForeignValue::Int32(v) => Some(*v),
            _ => None,
        }
    }

    /// Extract an `Int64`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ForeignValue::Int64(v) => Some(*v),
            _ => None,
        }
    }

    /// Extract a `Float64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ForeignValue::Float64(v) => Some(*v),
            _ => None,
        }
    }

    /// Extract a `Bool`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ForeignValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Identity of a referenced object.
    pub fn as_object(&self) -> Option<ObjectId> {
        match self {
            ForeignValue::ObjectRef(r) => Some(r.id()),
            _ => None,
        }
    }

    /// Referenced class.
    pub fn as_class(&self) -> Option<ClassId> {
        match self {
            ForeignValue::TypeRef(c) => Some(*c),
            _ => None,
        }
    }

    /// Opaque bytes, if this is a blob.
    pub fn as_opaque(&self) -> Option<&[u8]> {
        match self {
            ForeignValue::Opaque(blob) => Some(blob.bytes()),
            _ => None,
        }
    }
}
