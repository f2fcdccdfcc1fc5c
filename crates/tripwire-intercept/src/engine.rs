//! The interception engine service
//!
//! `Interceptor` bundles the forwarding registry, the state side table, and
//! the shared trampoline over one host runtime. It is an explicit service:
//! construct one at startup (or one per test) and pass it by reference —
//! there is no ambient global engine.

use std::sync::Arc;

use tripwire_object::{Imp, ObjectId, Runtime, Selector};

use crate::error::SetupError;
use crate::forwarder::make_trampoline;
use crate::registry::InterceptionRegistry;
use crate::state::StateTable;
use crate::stream::CallStream;

/// Interception engine bound to one host runtime.
pub struct Interceptor {
    runtime: Arc<Runtime>,
    registry: Arc<InterceptionRegistry>,
    states: Arc<StateTable>,
    trampoline: Imp,
}

impl Interceptor {
    /// Create an engine over `runtime`.
    pub fn new(runtime: Arc<Runtime>) -> Self {
        let registry = Arc::new(InterceptionRegistry::new());
        let states = Arc::new(StateTable::new());
        let trampoline = make_trampoline(registry.clone(), states.clone());
        Self {
            runtime,
            registry,
            states,
            trampoline,
        }
    }

    /// The runtime this engine observes.
    pub fn runtime(&self) -> &Arc<Runtime> {
        &self.runtime
    }

    /// The engine's forwarding registry (install bookkeeping).
    pub fn registry(&self) -> &Arc<InterceptionRegistry> {
        &self.registry
    }

    /// Observe calls to `selector` on `object`.
    ///
    /// Ensures the trampoline is installed over the class that provides the
    /// implementation (validating the signature, at most one install per
    /// class/selector),
    /// then subscribes to the pair's event stream. Repeated calls for the
    /// same pair share one underlying state; each call returns an
    /// independent subscriber. The stream terminates when the object's
    /// lifetime ends.
    pub fn intercept(
        &self,
        object: ObjectId,
        selector: Selector,
    ) -> Result<CallStream, SetupError> {
        let class = self
            .runtime
            .objects()
            .class_of(object)
            .ok_or(SetupError::DeadObject(object))?;

        self.registry
            .ensure_installed(&self.runtime, class, selector, &self.trampoline)?;

        let (state, created) = self.states.get_or_create(object, selector);
        if created {
            let states = self.states.clone();
            let hooked = self.runtime.objects().add_finalizer(
                object,
                Box::new(move || states.close_pair(object, selector)),
            );
            if !hooked {
                // The object died between the class lookup and now; the
                // state is stillborn.
                self.states.close_pair(object, selector);
            }
        }
        Ok(state.subscribe())
    }
}

impl std::fmt::Debug for Interceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interceptor")
            .field("records", &self.registry.len())
            .field("states", &self.states.len())
            .finish()
    }
}
