//! Tripwire interception engine
//!
//! Given a live object and a selector, `Interceptor::intercept` produces an
//! event stream that fires once per completed invocation of that selector on
//! that object — including invocations made by code that knows nothing about
//! the interception — without changing the method's observable behavior.
//!
//! Pipeline per interception request:
//! 1. `descriptor::describe` validates the method's signature and decodes it
//!    into `ArgumentKind`s, rejecting aggregate encodings up front.
//! 2. `InterceptionRegistry` installs a forwarding trampoline over the
//!    method's current implementation, at most once per (class, selector).
//! 3. `StateTable` tracks one `InterceptionState` per (object, selector);
//!    the state multicasts marshalled argument lists to subscribers and
//!    closes when the object's lifetime ends.
//!
//! Per call, the trampoline (`forwarder`) marshals the frame
//! (`marshal::unpack`) for observed instances, runs the original
//! implementation unshadowed, and publishes once the call completes —
//! unobserved instances skip marshalling entirely.

#![warn(rust_2018_idioms)]

pub mod descriptor;
pub mod engine;
pub mod error;
pub mod foreign;
pub mod forwarder;
pub mod marshal;
pub mod registry;
pub mod state;
pub mod stream;

pub use descriptor::{describe, ArgumentKind, ReturnKind, TypeDescriptor};
pub use engine::Interceptor;
pub use error::SetupError;
pub use foreign::ForeignValue;
pub use marshal::unpack;
pub use registry::{ForwardingRecord, InterceptionRegistry};
pub use state::{InterceptionState, StateTable};
pub use stream::{CallEvent, CallStream};
