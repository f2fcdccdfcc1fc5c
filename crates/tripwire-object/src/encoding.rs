//! Type encodings and method signatures
//!
//! Every method carries a `Signature`: a return encoding plus an ordered
//! parameter list. The parameter list follows the host calling convention and
//! **includes** two implicit leading entries — the receiver (`Object`) and
//! the selector (`Selector`) — before any explicit parameters.
//!
//! Aggregate shapes (`Record`, `Union`, `FixedArray`, `Vector`) exist in the
//! alphabet because the host model can declare and dispatch them as raw byte
//! blobs; whether a consumer can safely introspect them is the consumer's
//! decision (the interception engine rejects them at setup time).

/// One slot in a method signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeEncoding {
    /// Signed 8-bit integer
    Int8,
    /// Signed 16-bit integer
    Int16,
    /// Signed 32-bit integer
    Int32,
    /// Signed 64-bit integer
    Int64,
    /// Unsigned 8-bit integer
    UInt8,
    /// Unsigned 16-bit integer
    UInt16,
    /// Unsigned 32-bit integer
    UInt32,
    /// Unsigned 64-bit integer
    UInt64,
    /// 32-bit IEEE float
    Float32,
    /// 64-bit IEEE float
    Float64,
    /// Boolean (one byte, 0 or 1)
    Bool,
    /// Reference to a runtime object (`ObjectId`)
    Object,
    /// Reference to a runtime class (`ClassId`)
    Class,
    /// An interned selector
    Selector,
    /// Uninterpreted bytes of a declared size and alignment
    Opaque {
        /// Byte size of the blob
        size: usize,
        /// Required alignment of the blob
        align: usize,
    },
    /// A record (struct) passed by value
    Record {
        /// Byte size of the record
        size: usize,
        /// Required alignment of the record
        align: usize,
    },
    /// A union passed by value
    Union {
        /// Byte size of the union
        size: usize,
        /// Required alignment of the union
        align: usize,
    },
    /// A fixed-length array passed by value
    FixedArray {
        /// Byte size of the array
        size: usize,
        /// Required alignment of the array
        align: usize,
    },
    /// A SIMD vector passed by value
    Vector {
        /// Byte size of the vector
        size: usize,
        /// Required alignment of the vector
        align: usize,
    },
    /// No value (return slots only)
    Void,
}

impl TypeEncoding {
    /// Byte size of a value with this encoding in a call frame.
    pub fn size(&self) -> usize {
        match self {
            TypeEncoding::Int8 | TypeEncoding::UInt8 | TypeEncoding::Bool => 1,
            TypeEncoding::Int16 | TypeEncoding::UInt16 => 2,
            TypeEncoding::Int32
            | TypeEncoding::UInt32
            | TypeEncoding::Float32
            | TypeEncoding::Selector => 4,
            TypeEncoding::Int64
            | TypeEncoding::UInt64
            | TypeEncoding::Float64
            | TypeEncoding::Object
            | TypeEncoding::Class => 8,
            TypeEncoding::Opaque { size, .. }
            | TypeEncoding::Record { size, .. }
            | TypeEncoding::Union { size, .. }
            | TypeEncoding::FixedArray { size, .. }
            | TypeEncoding::Vector { size, .. } => *size,
            TypeEncoding::Void => 0,
        }
    }

    /// Required alignment of a value with this encoding.
    pub fn align(&self) -> usize {
        match self {
            TypeEncoding::Opaque { align, .. }
            | TypeEncoding::Record { align, .. }
            | TypeEncoding::Union { align, .. }
            | TypeEncoding::FixedArray { align, .. }
            | TypeEncoding::Vector { align, .. } => *align,
            TypeEncoding::Void => 1,
            other => other.size(),
        }
    }

    /// Whether this is an aggregate shape (record, union, fixed array,
    /// vector) that per-field introspection cannot decompose.
    pub fn is_aggregate(&self) -> bool {
        matches!(
            self,
            TypeEncoding::Record { .. }
                | TypeEncoding::Union { .. }
                | TypeEncoding::FixedArray { .. }
                | TypeEncoding::Vector { .. }
        )
    }

    /// Human-readable name of the encoding shape.
    pub fn shape_name(&self) -> &'static str {
        match self {
            TypeEncoding::Int8 => "int8",
            TypeEncoding::Int16 => "int16",
            TypeEncoding::Int32 => "int32",
            TypeEncoding::Int64 => "int64",
            TypeEncoding::UInt8 => "uint8",
            TypeEncoding::UInt16 => "uint16",
            TypeEncoding::UInt32 => "uint32",
            TypeEncoding::UInt64 => "uint64",
            TypeEncoding::Float32 => "float32",
            TypeEncoding::Float64 => "float64",
            TypeEncoding::Bool => "bool",
            TypeEncoding::Object => "object",
            TypeEncoding::Class => "class",
            TypeEncoding::Selector => "selector",
            TypeEncoding::Opaque { .. } => "opaque",
            TypeEncoding::Record { .. } => "record",
            TypeEncoding::Union { .. } => "union",
            TypeEncoding::FixedArray { .. } => "fixed-array",
            TypeEncoding::Vector { .. } => "vector",
            TypeEncoding::Void => "void",
        }
    }
}

/// A method's call signature: return encoding plus the full parameter list
/// in calling-convention order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    ret: TypeEncoding,
    params: Vec<TypeEncoding>,
}

impl Signature {
    /// Number of implicit leading parameters (receiver + selector).
    pub const IMPLICIT_PARAMS: usize = 2;

    /// Build a method signature from a return encoding and the explicit
    /// parameter encodings. The implicit receiver and selector slots are
    /// prepended automatically.
    ///
    /// Panics if an explicit parameter is `Void` (return-only encoding).
    pub fn method(ret: TypeEncoding, explicit: Vec<TypeEncoding>) -> Self {
        assert!(
            !explicit.contains(&TypeEncoding::Void),
            "void is a return-only encoding"
        );
        let mut params = Vec::with_capacity(explicit.len() + Self::IMPLICIT_PARAMS);
        params.push(TypeEncoding::Object);
        params.push(TypeEncoding::Selector);
        params.extend(explicit);
        Self { ret, params }
    }

    /// Return encoding.
    pub fn ret(&self) -> &TypeEncoding {
        &self.ret
    }

    /// Full parameter list including the implicit receiver and selector.
    pub fn params(&self) -> &[TypeEncoding] {
        &self.params
    }

    /// Parameters after the implicit receiver and selector are stripped.
    pub fn explicit_params(&self) -> &[TypeEncoding] {
        &self.params[Self::IMPLICIT_PARAMS..]
    }
}
