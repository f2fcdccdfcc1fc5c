//! Message dispatch and the runtime aggregate
//!
//! `Runtime` bundles the class registry and the object table into one
//! injectable service: construct a fresh instance per process (or per test)
//! and pass it by reference. `send` is the dispatch entry point: resolve the
//! receiver's method, build a frame, invoke the implementation, decode the
//! return slot.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::class::{ClassId, ClassRegistry};
use crate::frame::{Argument, CallFrame, FrameError, ReturnValue};
use crate::object::{ObjectId, ObjectTable};
use crate::selector::Selector;

/// Dispatch-time errors.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// No class in the receiver's chain implements the selector
    #[error("class `{class}` does not recognize selector `{selector}`")]
    UnrecognizedSelector {
        /// Receiver's class name
        class: String,
        /// Selector name
        selector: String,
    },

    /// Receiver is no longer alive
    #[error("object {0:?} is not alive")]
    DeadObject(ObjectId),

    /// Frame construction or return decoding failed
    #[error(transparent)]
    Frame(#[from] FrameError),

    /// Error raised by the method implementation itself
    #[error("{0}")]
    Raised(String),
}

/// The host runtime: class registry plus object table.
pub struct Runtime {
    classes: RwLock<ClassRegistry>,
    objects: Arc<ObjectTable>,
}

impl Runtime {
    /// Create an empty runtime.
    pub fn new() -> Self {
        Self {
            classes: RwLock::new(ClassRegistry::new()),
            objects: Arc::new(ObjectTable::new()),
        }
    }

    /// The class registry.
    pub fn classes(&self) -> &RwLock<ClassRegistry> {
        &self.classes
    }

    /// The object table.
    pub fn objects(&self) -> &Arc<ObjectTable> {
        &self.objects
    }

    /// Allocate a new instance of `class`.
    pub fn alloc(&self, class: ClassId) -> ObjectId {
        self.objects.alloc(class)
    }

    /// Send a message: resolve the receiver's current implementation of
    /// `selector`, invoke it with a frame built from `args`, and decode the
    /// return slot.
    pub fn send(
        &self,
        receiver: ObjectId,
        selector: Selector,
        args: &[Argument],
    ) -> Result<ReturnValue, DispatchError> {
        let class = self
            .objects
            .class_of(receiver)
            .ok_or(DispatchError::DeadObject(receiver))?;

        // Clone the method out and drop the lock before invoking: the
        // implementation may send further messages or install overrides.
        let method = {
            let classes = self.classes.read();
            let resolved = classes.resolve_method(class, selector).cloned();
            match resolved.and_then(|m| m.imp.clone().map(|imp| (m.signature, imp))) {
                Some(m) => m,
                None => {
                    return Err(DispatchError::UnrecognizedSelector {
                        class: classes.name_of(class).unwrap_or("?").to_string(),
                        selector: selector.name(),
                    })
                }
            }
        };

        let (signature, imp) = method;
        let mut frame = CallFrame::new(receiver, selector, signature, args)?;
        imp(self, &mut frame)?;
        Ok(frame.decode_return()?)
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("classes", &self.classes.read().len())
            .field("objects", &self.objects.live_count())
            .finish()
    }
}
