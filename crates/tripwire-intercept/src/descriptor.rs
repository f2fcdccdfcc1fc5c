//! Type descriptors
//!
//! A `TypeDescriptor` is a method signature decoded, once, into the
//! marshaller's structured vocabulary: an ordered `ArgumentKind` sequence
//! (implicit receiver/selector parameters stripped) plus a `ReturnKind`.
//! Descriptors are immutable and shared read-only by every call to the
//! operation.
//!
//! `describe` is pure introspection: it either produces a descriptor that
//! `unpack` can trust unconditionally, or refuses with a `SetupError` —
//! aggregate encodings (records, unions, fixed arrays, vectors) need ABI
//! knowledge beyond per-field introspection and are rejected rather than
//! silently mishandled.

use tripwire_object::{ClassId, Runtime, Selector, Signature, TypeEncoding};

use crate::error::SetupError;

/// Semantic kind of one marshalled argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgumentKind {
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
    /// 32-bit float
    Float32,
    /// 64-bit float
    Float64,
    /// Boolean
    Bool,
    /// Reference to a runtime object (retained when marshalled)
    ObjectRef,
    /// Reference to a runtime class
    TypeRef,
    /// An interned selector
    OperationRef,
    /// Uninterpreted bytes of recorded size and alignment
    Opaque {
        /// Byte size of the blob
        size: usize,
        /// Required alignment of the blob
        align: usize,
    },
}

impl ArgumentKind {
    /// Byte size the marshaller expects for this kind in a call frame.
    pub fn size(&self) -> usize {
        match self {
            ArgumentKind::Int8 | ArgumentKind::UInt8 | ArgumentKind::Bool => 1,
            ArgumentKind::Int16 | ArgumentKind::UInt16 => 2,
            ArgumentKind::Int32
            | ArgumentKind::UInt32
            | ArgumentKind::Float32
            | ArgumentKind::OperationRef => 4,
            ArgumentKind::Int64
            | ArgumentKind::UInt64
            | ArgumentKind::Float64
            | ArgumentKind::ObjectRef
            | ArgumentKind::TypeRef => 8,
            ArgumentKind::Opaque { size, .. } => *size,
        }
    }
}

/// Semantic kind of a method's return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnKind {
    /// No return value
    Void,
    /// A value of the given kind
    Value(ArgumentKind),
}

/// A method signature decoded for marshalling. Immutable after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDescriptor {
    args: Vec<ArgumentKind>,
    ret: ReturnKind,
}

impl TypeDescriptor {
    /// Kinds of the explicit arguments, in declaration order.
    pub fn args(&self) -> &[ArgumentKind] {
        &self.args
    }

    /// Kind of the return value.
    pub fn ret(&self) -> ReturnKind {
        self.ret
    }
}

fn kind_of(encoding: &TypeEncoding) -> Result<ArgumentKind, &'static str> {
    Ok(match encoding {
        TypeEncoding::Int8 => ArgumentKind::Int8,
        TypeEncoding::Int16 => ArgumentKind::Int16,
        TypeEncoding::Int32 => ArgumentKind::Int32,
        TypeEncoding::Int64 => ArgumentKind::Int64,
        TypeEncoding::UInt8 => ArgumentKind::UInt8,
        TypeEncoding::UInt16 => ArgumentKind::UInt16,
        TypeEncoding::UInt32 => ArgumentKind::UInt32,
        TypeEncoding::UInt64 => ArgumentKind::UInt64,
        TypeEncoding::Float32 => ArgumentKind::Float32,
        TypeEncoding::Float64 => ArgumentKind::Float64,
        TypeEncoding::Bool => ArgumentKind::Bool,
        TypeEncoding::Object => ArgumentKind::ObjectRef,
        TypeEncoding::Class => ArgumentKind::TypeRef,
        TypeEncoding::Selector => ArgumentKind::OperationRef,
        TypeEncoding::Opaque { size, align } => ArgumentKind::Opaque {
            size: *size,
            align: *align,
        },
        other => return Err(other.shape_name()),
    })
}

fn decode(signature: &Signature) -> Result<TypeDescriptor, &'static str> {
    let ret = match signature.ret() {
        TypeEncoding::Void => ReturnKind::Void,
        other => ReturnKind::Value(kind_of(other)?),
    };
    let args = signature
        .explicit_params()
        .iter()
        .map(kind_of)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(TypeDescriptor { args, ret })
}

/// Decode the signature of `selector` as seen from `class`.
///
/// Pure introspection; the result is safe to cache keyed by
/// (class, selector).
pub fn describe(
    runtime: &Runtime,
    class: ClassId,
    selector: Selector,
) -> Result<TypeDescriptor, SetupError> {
    let signature = {
        let classes = runtime.classes().read();
        match classes.signature_of(class, selector) {
            Some(sig) => sig,
            None => {
                return Err(SetupError::UnknownOperation {
                    class: classes.name_of(class).unwrap_or("?").to_string(),
                    selector: selector.name(),
                })
            }
        }
    };
    decode(&signature).map_err(|encoding| SetupError::UnsupportedEncoding {
        class: runtime
            .classes()
            .read()
            .name_of(class)
            .unwrap_or("?")
            .to_string(),
        selector: selector.name(),
        encoding,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tripwire_object::Signature;

    fn runtime_with_method(name: &str, sig: Signature) -> (Runtime, ClassId, Selector) {
        let rt = Runtime::new();
        let sel = Selector::intern(name);
        let class = {
            let mut classes = rt.classes().write();
            let class = classes.define("Described", None);
            classes.add_method(class, sel, sig, Arc::new(|_, _| Ok(())));
            class
        };
        (rt, class, sel)
    }

    #[test]
    fn test_describe_strips_implicit_params() {
        let (rt, class, sel) = runtime_with_method(
            "desc_scalars",
            Signature::method(
                TypeEncoding::Int32,
                vec![TypeEncoding::Int32, TypeEncoding::Bool, TypeEncoding::Object],
            ),
        );
        let desc = describe(&rt, class, sel).unwrap();
        assert_eq!(
            desc.args(),
            &[ArgumentKind::Int32, ArgumentKind::Bool, ArgumentKind::ObjectRef]
        );
        assert_eq!(desc.ret(), ReturnKind::Value(ArgumentKind::Int32));
    }

    #[test]
    fn test_describe_void_return() {
        let (rt, class, sel) = runtime_with_method(
            "desc_void",
            Signature::method(TypeEncoding::Void, vec![]),
        );
        let desc = describe(&rt, class, sel).unwrap();
        assert!(desc.args().is_empty());
        assert_eq!(desc.ret(), ReturnKind::Void);
    }

    #[test]
    fn test_describe_opaque_records_size() {
        let (rt, class, sel) = runtime_with_method(
            "desc_opaque",
            Signature::method(
                TypeEncoding::Void,
                vec![TypeEncoding::Opaque { size: 12, align: 4 }],
            ),
        );
        let desc = describe(&rt, class, sel).unwrap();
        assert_eq!(desc.args(), &[ArgumentKind::Opaque { size: 12, align: 4 }]);
    }

    #[test]
    fn test_describe_unknown_operation() {
        let rt = Runtime::new();
        let class = rt.classes().write().define("Bare", None);
        let err = describe(&rt, class, Selector::intern("desc_unknown")).unwrap_err();
        assert_eq!(
            err,
            SetupError::UnknownOperation {
                class: "Bare".to_string(),
                selector: "desc_unknown".to_string(),
            }
        );
    }

    #[test]
    fn test_describe_rejects_record_argument() {
        let (rt, class, sel) = runtime_with_method(
            "desc_record",
            Signature::method(
                TypeEncoding::Void,
                vec![TypeEncoding::Record { size: 16, align: 8 }],
            ),
        );
        let err = describe(&rt, class, sel).unwrap_err();
        assert!(matches!(
            err,
            SetupError::UnsupportedEncoding { encoding: "record", .. }
        ));
    }

    #[test]
    fn test_describe_rejects_vector_return() {
        let (rt, class, sel) = runtime_with_method(
            "desc_vector_ret",
            Signature::method(TypeEncoding::Vector { size: 16, align: 16 }, vec![]),
        );
        let err = describe(&rt, class, sel).unwrap_err();
        assert!(matches!(
            err,
            SetupError::UnsupportedEncoding { encoding: "vector", .. }
        ));
    }

    #[test]
    fn test_describe_inherited_method() {
        let rt = Runtime::new();
        let sel = Selector::intern("desc_inherited");
        let sub = {
            let mut classes = rt.classes().write();
            let base = classes.define("DescBase", None);
            let sub = classes.define("DescSub", Some(base));
            classes.add_method(
                base,
                sel,
                Signature::method(TypeEncoding::Void, vec![TypeEncoding::Float64]),
                Arc::new(|_, _| Ok(())),
            );
            sub
        };
        let desc = describe(&rt, sub, sel).unwrap();
        assert_eq!(desc.args(), &[ArgumentKind::Float64]);
    }
}
