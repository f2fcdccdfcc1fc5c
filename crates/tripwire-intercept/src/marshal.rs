//! Argument marshalling
//!
//! `unpack` extracts every explicit argument of a call frame into
//! `ForeignValue`s, guided by the operation's cached `TypeDescriptor`. The
//! bytes are copied out of the frame into a correctly sized scratch buffer
//! and reinterpreted per kind; object references are retained before being
//! handed out, because the frame's reference does not survive the call.
//!
//! Structural disagreement between frame and descriptor (arity, byte size)
//! has no failure path. If `describe` succeeded at setup time the two agree
//! by construction; a mismatch observed here means the signature changed
//! after caching or the registry is corrupt, and continuing would risk
//! producing a mis-tagged value that downstream consumers trust absolutely.
//! Such a violation aborts.
//!
//! Object *lifetime* is not part of that contract: frames carry raw identity
//! bits and the host never promises an argument is alive. A dangling
//! reference yields `None` — the call itself proceeds untouched, it just
//! cannot be observed.

use tripwire_object::{CallFrame, ClassId, ObjectId, Runtime, Selector};

use crate::descriptor::{ArgumentKind, TypeDescriptor};
use crate::foreign::{ForeignValue, OpaqueBlob};

#[cold]
#[track_caller]
fn contract_violation(detail: std::fmt::Arguments<'_>) -> ! {
    panic!("marshal contract violation: {}", detail)
}

fn scalar_bytes<const N: usize>(bytes: &[u8], index: usize) -> [u8; N] {
    if bytes.len() != N {
        contract_violation(format_args!(
            "argument {} is {} bytes, descriptor expects {}",
            index,
            bytes.len(),
            N
        ));
    }
    let mut buf = [0u8; N];
    buf.copy_from_slice(bytes);
    buf
}

/// Extract all explicit arguments of `frame` per `descriptor`.
///
/// Returns `None` if an object argument's lifetime already ended. Aborts on
/// any structural frame/descriptor inconsistency; never returns a wrong
/// value.
pub fn unpack(
    runtime: &Runtime,
    frame: &CallFrame,
    descriptor: &TypeDescriptor,
) -> Option<Vec<ForeignValue>> {
    if frame.arg_count() != descriptor.args().len() {
        contract_violation(format_args!(
            "frame for `{}` has {} arguments, descriptor expects {}",
            frame.selector(),
            frame.arg_count(),
            descriptor.args().len()
        ));
    }

    let mut values = Vec::with_capacity(descriptor.args().len());
    for (index, kind) in descriptor.args().iter().enumerate() {
        let bytes = match frame.arg_bytes(index) {
            Some(b) => b,
            None => contract_violation(format_args!("argument {} missing from frame", index)),
        };
        let value = match kind {
            ArgumentKind::Int8 => {
                ForeignValue::Int8(i8::from_ne_bytes(scalar_bytes::<1>(bytes, index)))
            }
            ArgumentKind::Int16 => {
                ForeignValue::Int16(i16::from_ne_bytes(scalar_bytes::<2>(bytes, index)))
            }
            ArgumentKind::Int32 => {
                ForeignValue::Int32(i32::from_ne_bytes(scalar_bytes::<4>(bytes, index)))
            }
            ArgumentKind::Int64 => {
                ForeignValue::Int64(i64::from_ne_bytes(scalar_bytes::<8>(bytes, index)))
            }
            ArgumentKind::UInt8 => {
                ForeignValue::UInt8(u8::from_ne_bytes(scalar_bytes::<1>(bytes, index)))
            }
            ArgumentKind::UInt16 => {
                ForeignValue::UInt16(u16::from_ne_bytes(scalar_bytes::<2>(bytes, index)))
            }
            ArgumentKind::UInt32 => {
                ForeignValue::UInt32(u32::from_ne_bytes(scalar_bytes::<4>(bytes, index)))
            }
            ArgumentKind::UInt64 => {
                ForeignValue::UInt64(u64::from_ne_bytes(scalar_bytes::<8>(bytes, index)))
            }
            ArgumentKind::Float32 => {
                ForeignValue::Float32(f32::from_ne_bytes(scalar_bytes::<4>(bytes, index)))
            }
            ArgumentKind::Float64 => {
                ForeignValue::Float64(f64::from_ne_bytes(scalar_bytes::<8>(bytes, index)))
            }
            ArgumentKind::Bool => ForeignValue::Bool(scalar_bytes::<1>(bytes, index)[0] != 0),
            ArgumentKind::ObjectRef => {
                let id = ObjectId::from_raw(u64::from_ne_bytes(scalar_bytes::<8>(bytes, index)));
                // The caller handed a dangling reference; the frame is
                // still a valid frame.
                ForeignValue::ObjectRef(runtime.objects().retain_guard(id)?)
            }
            ArgumentKind::TypeRef => {
                let raw = u64::from_ne_bytes(scalar_bytes::<8>(bytes, index));
                ForeignValue::TypeRef(ClassId::from_raw(raw as usize))
            }
            ArgumentKind::OperationRef => {
                let raw = u32::from_ne_bytes(scalar_bytes::<4>(bytes, index));
                ForeignValue::OperationRef(Selector::from_raw(raw))
            }
            ArgumentKind::Opaque { size, align } => {
                if bytes.len() != *size {
                    contract_violation(format_args!(
                        "argument {} is {} bytes, descriptor records {}",
                        index,
                        bytes.len(),
                        size
                    ));
                }
                ForeignValue::Opaque(OpaqueBlob::new(bytes.into(), *align))
            }
        };
        values.push(value);
    }
    Some(values)
}
