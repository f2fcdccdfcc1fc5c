//! Call frames
//!
//! A `CallFrame` describes one in-flight invocation: the receiver, the
//! selector, the explicit arguments as raw native-endian byte buffers laid
//! out per the method's signature, and a raw return slot the implementation
//! writes into.
//!
//! Frames are built from a typed `Argument` list validated against the
//! signature; implementations read arguments through the typed accessors (or
//! raw bytes) and set the return through `set_return`. Argument indices count
//! explicit parameters only — the implicit receiver and selector are carried
//! as dedicated fields.

use std::sync::Arc;

use crate::class::ClassId;
use crate::encoding::{Signature, TypeEncoding};
use crate::object::ObjectId;
use crate::selector::Selector;

/// Frame construction and access errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    /// Wrong number of explicit arguments for the signature
    #[error("arity mismatch: expected {expected} arguments, got {got}")]
    ArityMismatch {
        /// Arguments the signature declares
        expected: usize,
        /// Arguments supplied
        got: usize,
    },

    /// Argument value does not match the declared encoding
    #[error("argument {index} does not match declared {expected} encoding")]
    KindMismatch {
        /// Explicit argument position
        index: usize,
        /// Shape name of the declared encoding
        expected: &'static str,
    },

    /// Opaque/aggregate argument has the wrong byte length
    #[error("argument {index} is {got} bytes, declared size is {expected}")]
    SizeMismatch {
        /// Explicit argument position
        index: usize,
        /// Declared byte size
        expected: usize,
        /// Supplied byte size
        got: usize,
    },

    /// Argument index past the end of the frame
    #[error("argument index {0} out of bounds")]
    OutOfBounds(usize),

    /// Return value does not match the signature's return encoding
    #[error("return value does not match declared {expected} encoding")]
    ReturnKindMismatch {
        /// Shape name of the declared return encoding
        expected: &'static str,
    },

    /// Implementation returned without setting a non-void return slot
    #[error("implementation did not set the return slot")]
    MissingReturn,
}

/// A typed argument supplied to dispatch.
#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    /// Signed 8-bit integer
    I8(i8),
    /// Signed 16-bit integer
    I16(i16),
    /// Signed 32-bit integer
    I32(i32),
    /// Signed 64-bit integer
    I64(i64),
    /// Unsigned 8-bit integer
    U8(u8),
    /// Unsigned 16-bit integer
    U16(u16),
    /// Unsigned 32-bit integer
    U32(u32),
    /// Unsigned 64-bit integer
    U64(u64),
    /// 32-bit float
    F32(f32),
    /// 64-bit float
    F64(f64),
    /// Boolean
    Bool(bool),
    /// Object reference
    Object(ObjectId),
    /// Class reference
    Class(ClassId),
    /// Selector value
    Selector(Selector),
    /// Raw bytes for opaque and aggregate encodings
    Opaque(Box<[u8]>),
}

impl Argument {
    fn to_bytes(&self) -> Box<[u8]> {
        match self {
            Argument::I8(v) => Box::new(v.to_ne_bytes()),
            Argument::I16(v) => Box::new(v.to_ne_bytes()),
            Argument::I32(v) => Box::new(v.to_ne_bytes()),
            Argument::I64(v) => Box::new(v.to_ne_bytes()),
            Argument::U8(v) => Box::new(v.to_ne_bytes()),
            Argument::U16(v) => Box::new(v.to_ne_bytes()),
            Argument::U32(v) => Box::new(v.to_ne_bytes()),
            Argument::U64(v) => Box::new(v.to_ne_bytes()),
            Argument::F32(v) => Box::new(v.to_ne_bytes()),
            Argument::F64(v) => Box::new(v.to_ne_bytes()),
            Argument::Bool(v) => Box::new([*v as u8]),
            Argument::Object(v) => Box::new(v.raw().to_ne_bytes()),
            Argument::Class(v) => Box::new((v.raw() as u64).to_ne_bytes()),
            Argument::Selector(v) => Box::new(v.raw().to_ne_bytes()),
            Argument::Opaque(bytes) => bytes.clone(),
        }
    }

    fn check(&self, index: usize, encoding: &TypeEncoding) -> Result<(), FrameError> {
        let matches = matches!(
            (self, encoding),
            (Argument::I8(_), TypeEncoding::Int8)
                | (Argument::I16(_), TypeEncoding::Int16)
                | (Argument::I32(_), TypeEncoding::Int32)
                | (Argument::I64(_), TypeEncoding::Int64)
                | (Argument::U8(_), TypeEncoding::UInt8)
                | (Argument::U16(_), TypeEncoding::UInt16)
                | (Argument::U32(_), TypeEncoding::UInt32)
                | (Argument::U64(_), TypeEncoding::UInt64)
                | (Argument::F32(_), TypeEncoding::Float32)
                | (Argument::F64(_), TypeEncoding::Float64)
                | (Argument::Bool(_), TypeEncoding::Bool)
                | (Argument::Object(_), TypeEncoding::Object)
                | (Argument::Class(_), TypeEncoding::Class)
                | (Argument::Selector(_), TypeEncoding::Selector)
                | (Argument::Opaque(_), TypeEncoding::Opaque { .. })
                | (Argument::Opaque(_), TypeEncoding::Record { .. })
                | (Argument::Opaque(_), TypeEncoding::Union { .. })
                | (Argument::Opaque(_), TypeEncoding::FixedArray { .. })
                | (Argument::Opaque(_), TypeEncoding::Vector { .. })
        );
        if !matches {
            return Err(FrameError::KindMismatch {
                index,
                expected: encoding.shape_name(),
            });
        }
        if let Argument::Opaque(bytes) = self {
            if bytes.len() != encoding.size() {
                return Err(FrameError::SizeMismatch {
                    index,
                    expected: encoding.size(),
                    got: bytes.len(),
                });
            }
        }
        Ok(())
    }
}

/// A method's decoded return value.
#[derive(Debug, Clone, PartialEq)]
pub enum ReturnValue {
    /// Void return
    Void,
    /// Signed 8-bit integer
    I8(i8),
    /// Signed 16-bit integer
    I16(i16),
    /// Signed 32-bit integer
    I32(i32),
    /// Signed 64-bit integer
    I64(i64),
    /// Unsigned 8-bit integer
    U8(u8),
    /// Unsigned 16-bit integer
    U16(u16),
    /// Unsigned 32-bit integer
    U32(u32),
    /// Unsigned 64-bit integer
    U64(u64),
    /// 32-bit float
    F32(f32),
    /// 64-bit float
    F64(f64),
    /// Boolean
    Bool(bool),
    /// Object reference
    Object(ObjectId),
    /// Class reference
    Class(ClassId),
    /// Selector value
    Selector(Selector),
    /// Raw bytes for opaque and aggregate encodings
    Opaque(Box<[u8]>),
}

struct RawArg {
    bytes: Box<[u8]>,
    align: usize,
}

/// One in-flight invocation.
pub struct CallFrame {
    receiver: ObjectId,
    selector: Selector,
    signature: Arc<Signature>,
    args: Vec<RawArg>,
    ret: Option<Box<[u8]>>,
}

impl CallFrame {
    /// Build a frame from typed arguments, validating arity and per-position
    /// encoding against the signature's explicit parameters.
    pub fn new(
        receiver: ObjectId,
        selector: Selector,
        signature: Arc<Signature>,
        args: &[Argument],
    ) -> Result<Self, FrameError> {
        let declared = signature.explicit_params();
        if args.len() != declared.len() {
            return Err(FrameError::ArityMismatch {
                expected: declared.len(),
                got: args.len(),
            });
        }
        let mut raw = Vec::with_capacity(args.len());
        for (index, (arg, encoding)) in args.iter().zip(declared).enumerate() {
            arg.check(index, encoding)?;
            raw.push(RawArg {
                bytes: arg.to_bytes(),
                align: encoding.align(),
            });
        }
        Ok(Self {
            receiver,
            selector,
            signature,
            args: raw,
            ret: None,
        })
    }

    /// The receiving object.
    pub fn receiver(&self) -> ObjectId {
        self.receiver
    }

    /// The invoked selector.
    pub fn selector(&self) -> Selector {
        self.selector
    }

    /// The method signature this frame was laid out against.
    pub fn signature(&self) -> &Arc<Signature> {
        &self.signature
    }

    /// Number of explicit arguments.
    pub fn arg_count(&self) -> usize {
        self.args.len()
    }

    /// Raw bytes of an explicit argument.
    pub fn arg_bytes(&self, index: usize) -> Option<&[u8]> {
        self.args.get(index).map(|a| &*a.bytes)
    }

    /// Declared alignment of an explicit argument.
    pub fn arg_align(&self, index: usize) -> Option<usize> {
        self.args.get(index).map(|a| a.align)
    }

    fn checked_bytes(&self, index: usize, encoding: TypeEncoding) -> Result<&[u8], FrameError> {
        let declared = self
            .signature
            .explicit_params()
            .get(index)
            .ok_or(FrameError::OutOfBounds(index))?;
        if *declared != encoding {
            return Err(FrameError::KindMismatch {
                index,
                expected: declared.shape_name(),
            });
        }
        Ok(&self.args[index].bytes)
    }

    /// Read an `Int32` argument.
    pub fn arg_i32(&self, index: usize) -> Result<i32, FrameError> {
        let bytes = self.checked_bytes(index, TypeEncoding::Int32)?;
        let mut buf = [0u8; 4];
        buf.copy_from_slice(bytes);
        Ok(i32::from_ne_bytes(buf))
    }

    /// Read an `Int64` argument.
    pub fn arg_i64(&self, index: usize) -> Result<i64, FrameError> {
        let bytes = self.checked_bytes(index, TypeEncoding::Int64)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(bytes);
        Ok(i64::from_ne_bytes(buf))
    }

    /// Read a `UInt32` argument.
    pub fn arg_u32(&self, index: usize) -> Result<u32, FrameError> {
        let bytes = self.checked_bytes(index, TypeEncoding::UInt32)?;
        let mut buf = [0u8; 4];
        buf.copy_from_slice(bytes);
        Ok(u32::from_ne_bytes(buf))
    }

    /// Read a `UInt64` argument.
    pub fn arg_u64(&self, index: usize) -> Result<u64, FrameError> {
        let bytes = self.checked_bytes(index, TypeEncoding::UInt64)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(bytes);
        Ok(u64::from_ne_bytes(buf))
    }

    /// Read a `Float32` argument.
    pub fn arg_f32(&self, index: usize) -> Result<f32, FrameError> {
        let bytes = self.checked_bytes(index, TypeEncoding::Float32)?;
        let mut buf = [0u8; 4];
        buf.copy_from_slice(bytes);
        Ok(f32::from_ne_bytes(buf))
    }

    /// Read a `Float64` argument.
    pub fn arg_f64(&self, index: usize) -> Result<f64, FrameError> {
        let bytes = self.checked_bytes(index, TypeEncoding::Float64)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(bytes);
        Ok(f64::from_ne_bytes(buf))
    }

    /// Read a `Bool` argument.
    pub fn arg_bool(&self, index: usize) -> Result<bool, FrameError> {
        let bytes = self.checked_bytes(index, TypeEncoding::Bool)?;
        Ok(bytes[0] != 0)
    }

    /// Read an `Object` argument.
    pub fn arg_object(&self, index: usize) -> Result<ObjectId, FrameError> {
        let bytes = self.checked_bytes(index, TypeEncoding::Object)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(bytes);
        Ok(ObjectId::from_raw(u64::from_ne_bytes(buf)))
    }

    /// Write the return slot, validating against the signature's return
    /// encoding. A `Void` signature accepts only `ReturnValue::Void`.
    pub fn set_return(&mut self, value: ReturnValue) -> Result<(), FrameError> {
        let declared = self.signature.ret();
        let mismatch = || FrameError::ReturnKindMismatch {
            expected: declared.shape_name(),
        };
        let bytes: Box<[u8]> = match (&value, declared) {
            (ReturnValue::Void, TypeEncoding::Void) => {
                self.ret = Some(Box::new([]));
                return Ok(());
            }
            (ReturnValue::I8(v), TypeEncoding::Int8) => Box::new(v.to_ne_bytes()),
            (ReturnValue::I16(v), TypeEncoding::Int16) => Box::new(v.to_ne_bytes()),
            (ReturnValue::I32(v), TypeEncoding::Int32) => Box::new(v.to_ne_bytes()),
            (ReturnValue::I64(v), TypeEncoding::Int64) => Box::new(v.to_ne_bytes()),
            (ReturnValue::U8(v), TypeEncoding::UInt8) => Box::new(v.to_ne_bytes()),
            (ReturnValue::U16(v), TypeEncoding::UInt16) => Box::new(v.to_ne_bytes()),
            (ReturnValue::U32(v), TypeEncoding::UInt32) => Box::new(v.to_ne_bytes()),
            (ReturnValue::U64(v), TypeEncoding::UInt64) => Box::new(v.to_ne_bytes()),
            (ReturnValue::F32(v), TypeEncoding::Float32) => Box::new(v.to_ne_bytes()),
            (ReturnValue::F64(v), TypeEncoding::Float64) => Box::new(v.to_ne_bytes()),
            (ReturnValue::Bool(v), TypeEncoding::Bool) => Box::new([*v as u8]),
            (ReturnValue::Object(v), TypeEncoding::Object) => Box::new(v.raw().to_ne_bytes()),
            (ReturnValue::Class(v), TypeEncoding::Class) => {
                Box::new((v.raw() as u64).to_ne_bytes())
            }
            (ReturnValue::Selector(v), TypeEncoding::Selector) => Box::new(v.raw().to_ne_bytes()),
            (ReturnValue::Opaque(b), enc)
                if matches!(
                    enc,
                    TypeEncoding::Opaque { .. }
                        | TypeEncoding::Record { .. }
                        | TypeEncoding::Union { .. }
                        | TypeEncoding::FixedArray { .. }
                        | TypeEncoding::Vector { .. }
                ) =>
            {
                if b.len() != enc.size() {
                    return Err(mismatch());
                }
                b.clone()
            }
            _ => return Err(mismatch()),
        };
        self.ret = Some(bytes);
        Ok(())
    }

    /// Decode the return slot per the signature. Errors if a non-void
    /// implementation never set the slot.
    pub fn decode_return(&self) -> Result<ReturnValue, FrameError> {
        let declared = self.signature.ret();
        if *declared == TypeEncoding::Void {
            return Ok(ReturnValue::Void);
        }
        let bytes = self.ret.as_deref().ok_or(FrameError::MissingReturn)?;
        let mut buf8 = [0u8; 8];
        let mut buf4 = [0u8; 4];
        let mut buf2 = [0u8; 2];
        Ok(match declared {
            TypeEncoding::Int8 => ReturnValue::I8(bytes[0] as i8),
            TypeEncoding::Int16 => {
                buf2.copy_from_slice(bytes);
                ReturnValue::I16(i16::from_ne_bytes(buf2))
            }
            TypeEncoding::Int32 => {
                buf4.copy_from_slice(bytes);
                ReturnValue::I32(i32::from_ne_bytes(buf4))
            }
            TypeEncoding::Int64 => {
                buf8.copy_from_slice(bytes);
                ReturnValue::I64(i64::from_ne_bytes(buf8))
            }
            TypeEncoding::UInt8 => ReturnValue::U8(bytes[0]),
            TypeEncoding::UInt16 => {
                buf2.copy_from_slice(bytes);
                ReturnValue::U16(u16::from_ne_bytes(buf2))
            }
            TypeEncoding::UInt32 => {
                buf4.copy_from_slice(bytes);
                ReturnValue::U32(u32::from_ne_bytes(buf4))
            }
            TypeEncoding::UInt64 => {
                buf8.copy_from_slice(bytes);
                ReturnValue::U64(u64::from_ne_bytes(buf8))
            }
            TypeEncoding::Float32 => {
                buf4.copy_from_slice(bytes);
                ReturnValue::F32(f32::from_ne_bytes(buf4))
            }
            TypeEncoding::Float64 => {
                buf8.copy_from_slice(bytes);
                ReturnValue::F64(f64::from_ne_bytes(buf8))
            }
            TypeEncoding::Bool => ReturnValue::Bool(bytes[0] != 0),
            TypeEncoding::Object => {
                buf8.copy_from_slice(bytes);
                ReturnValue::Object(ObjectId::from_raw(u64::from_ne_bytes(buf8)))
            }
            TypeEncoding::Class => {
                buf8.copy_from_slice(bytes);
                ReturnValue::Class(ClassId::from_raw(u64::from_ne_bytes(buf8) as usize))
            }
            TypeEncoding::Selector => {
                buf4.copy_from_slice(bytes);
                ReturnValue::Selector(Selector::from_raw(u32::from_ne_bytes(buf4)))
            }
            _ => ReturnValue::Opaque(bytes.into()),
        })
    }
}

impl std::fmt::Debug for CallFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallFrame")
            .field("receiver", &self.receiver)
            .field("selector", &self.selector.name())
            .field("args", &self.args.len())
            .finish()
    }
}
