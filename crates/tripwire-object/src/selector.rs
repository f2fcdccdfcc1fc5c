//! Interned operation selectors
//!
//! A `Selector` names a method on a runtime class. Selectors are interned in
//! a process-wide table: interning the same name twice yields the same
//! selector, so equality is structural and comparison is a u32 compare.

use dashmap::DashMap;
use once_cell::sync::Lazy;
use parking_lot::RwLock;

static SELECTORS: Lazy<SelectorTable> = Lazy::new(SelectorTable::default);

#[derive(Default)]
struct SelectorTable {
    by_name: DashMap<String, u32>,
    names: RwLock<Vec<String>>,
}

/// Interned name of an operation on a runtime class.
///
/// Copyable handle; the backing string lives in the process-wide intern
/// table for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Selector(u32);

impl Selector {
    /// Intern a selector by name. The same name always returns the same
    /// selector.
    pub fn intern(name: &str) -> Self {
        if let Some(id) = SELECTORS.by_name.get(name) {
            return Selector(*id);
        }
        // The names vec's write lock serializes new interning; re-check under
        // it so concurrent interns of the same name agree on one id.
        let mut names = SELECTORS.names.write();
        if let Some(id) = SELECTORS.by_name.get(name) {
            return Selector(*id);
        }
        let id = names.len() as u32;
        names.push(name.to_string());
        SELECTORS.by_name.insert(name.to_string(), id);
        Selector(id)
    }

    /// The interned name.
    pub fn name(self) -> String {
        SELECTORS.names.read()[self.0 as usize].clone()
    }

    /// Raw interned id (used by frame encoding).
    pub fn raw(self) -> u32 {
        self.0
    }

    /// Rebuild a selector from its raw id.
    ///
    /// The id must have come from a previously interned selector.
    pub fn from_raw(raw: u32) -> Self {
        Selector(raw)
    }
}

impl std::fmt::Display for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
