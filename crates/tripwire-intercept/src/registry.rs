//! Interception registry
//!
//! Process-wide (per-engine) record of which (class, selector) pairs carry a
//! forwarding trampoline. Entries accumulate monotonically and are never
//! removed: runtime shadowing is irreversible for the lifetime of the
//! engine's runtime.
//!
//! Installation is serialized behind one coarse mutex — installs happen once
//! per (class, selector) while calls happen constantly, so contention is
//! acceptable. Record *lookup* on the call path takes the same mutex only
//! briefly and never while holding the class registry lock (callers snapshot
//! the class chain first), so the two locks are always acquired in the order
//! registry-then-classes and cannot deadlock.

use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use tripwire_object::{ClassId, Imp, Runtime, Selector};

use crate::descriptor::{describe, TypeDescriptor};
use crate::error::SetupError;

/// Per-(class, selector) interception record.
pub struct ForwardingRecord {
    /// The implementation the trampoline shadows. None when the class
    /// declared the selector's signature without an implementation.
    pub original: Option<Imp>,
    /// The operation's cached descriptor, built once at install time.
    pub descriptor: Arc<TypeDescriptor>,
}

impl std::fmt::Debug for ForwardingRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForwardingRecord")
            .field("has_original", &self.original.is_some())
            .field("descriptor", &self.descriptor)
            .finish()
    }
}

/// Table of installed trampolines.
#[derive(Default)]
pub struct InterceptionRegistry {
    records: Mutex<FxHashMap<(ClassId, Selector), Arc<ForwardingRecord>>>,
}

impl InterceptionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensure calls to `selector` on instances of `class` run through the
    /// trampoline.
    ///
    /// Validates the signature first; on failure nothing is installed and no
    /// state is mutated. If an ancestor already carries the trampoline for
    /// this selector and `class` merely inherits it, nothing new is
    /// installed — the existing record covers the subtype. Otherwise the
    /// current implementation is captured as `original` and the trampoline
    /// replaces it on exactly the concrete class. At most one trampoline is
    /// ever installed per (class, selector), even under concurrent first
    /// use.
    pub fn ensure_installed(
        &self,
        runtime: &Runtime,
        class: ClassId,
        selector: Selector,
        trampoline: &Imp,
    ) -> Result<(), SetupError> {
        let mut records = self.records.lock();
        if records.contains_key(&(class, selector)) {
            return Ok(());
        }

        // Validate before touching anything; a refusal here must leave no
        // partial installation.
        let descriptor = Arc::new(describe(runtime, class, selector)?);

        let mut classes = runtime.classes().write();
        // describe() succeeded, so the selector resolves somewhere.
        let providing = classes
            .providing_class(class, selector)
            .expect("selector resolved during describe");

        if providing != class && records.contains_key(&(providing, selector)) {
            // The ancestor's trampoline already shadows this selector for
            // every subtype; the forwarder resolves its record by walking
            // the chain.
            return Ok(());
        }

        let original = classes
            .resolve_method(class, selector)
            .and_then(|m| m.imp.clone());
        // Record goes in before the trampoline becomes callable, so a call
        // racing with installation always finds its record.
        records.insert(
            (providing, selector),
            Arc::new(ForwardingRecord {
                original,
                descriptor,
            }),
        );
        if let Err(err) = classes.install_implementation(providing, selector, trampoline.clone()) {
            records.remove(&(providing, selector));
            unreachable!("install failed for a resolved selector: {err}");
        }
        Ok(())
    }

    /// The record governing `selector` for a receiver whose class chain is
    /// `chain` (nearest first): the record of the nearest class that has
    /// one.
    pub fn record_for(
        &self,
        chain: &[ClassId],
        selector: Selector,
    ) -> Option<Arc<ForwardingRecord>> {
        let records = self.records.lock();
        chain
            .iter()
            .find_map(|class| records.get(&(*class, selector)).cloned())
    }

    /// Whether a trampoline is installed for exactly this (class, selector).
    pub fn is_installed(&self, class: ClassId, selector: Selector) -> bool {
        self.records.lock().contains_key(&(class, selector))
    }

    /// Number of installed records.
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Whether no records exist.
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl std::fmt::Debug for InterceptionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterceptionRegistry")
            .field("records", &self.len())
            .finish()
    }
}
