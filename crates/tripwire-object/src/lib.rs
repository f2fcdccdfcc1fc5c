//! Tripwire host object model
//!
//! This crate provides the dynamic object model the interception engine
//! operates against:
//! - Interned operation selectors
//! - Type encodings and method signatures
//! - Raw-byte call frames with a return slot
//! - Refcounted object instances with finalizer hooks
//! - A class registry with inheritance and replaceable implementations
//! - Message dispatch (`Runtime::send`)
//!
//! The engine crate (`tripwire-intercept`) consumes this model purely through
//! its public surface: introspection (`ClassRegistry`), implementation
//! replacement (`install_implementation`), lifetime hooks (`add_finalizer`),
//! and ownership primitives (`retain`/`release`/`Retained`).

#![warn(rust_2018_idioms)]

pub mod class;
pub mod dispatch;
pub mod encoding;
pub mod frame;
pub mod object;
pub mod selector;

pub use class::{Class, ClassId, ClassRegistry, Imp, Method};
pub use dispatch::{DispatchError, Runtime};
pub use encoding::{Signature, TypeEncoding};
pub use frame::{Argument, CallFrame, FrameError, ReturnValue};
pub use object::{ObjectId, ObjectTable, Retained};
pub use selector::Selector;
