//! Classes, method tables, and the class registry
//!
//! A `Class` is a runtime type: a name, an optional parent, and a method
//! table mapping selectors to implementations. Method resolution walks the
//! parent chain. `install_implementation` replaces a class's implementation
//! of a selector in place (adding an override on that class if the method is
//! inherited) — the primitive the interception engine builds trampolines on.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::dispatch::{DispatchError, Runtime};
use crate::encoding::Signature;
use crate::frame::CallFrame;
use crate::selector::Selector;

/// Identity handle for a runtime class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(usize);

impl ClassId {
    /// Raw identity bits (used by frame encoding).
    pub fn raw(self) -> usize {
        self.0
    }

    /// Rebuild an id from its raw bits.
    pub fn from_raw(raw: usize) -> Self {
        ClassId(raw)
    }
}

/// A method implementation.
///
/// Implementations receive the runtime (so they can send further messages or
/// touch objects) and the mutable call frame they read arguments from and
/// write their return into.
pub type Imp =
    Arc<dyn Fn(&Runtime, &mut CallFrame) -> Result<(), DispatchError> + Send + Sync>;

/// A class's entry for one selector: signature plus current implementation.
///
/// A class may declare a selector's signature without supplying an
/// implementation; sending such a selector reports the same
/// unrecognized-selector condition as a selector with no entry at all.
#[derive(Clone)]
pub struct Method {
    /// Call signature, shared read-only
    pub signature: Arc<Signature>,
    /// Current implementation, if one was supplied
    pub imp: Option<Imp>,
}

impl std::fmt::Debug for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Method")
            .field("signature", &self.signature)
            .field("has_imp", &self.imp.is_some())
            .finish()
    }
}

/// Class definition metadata.
#[derive(Debug)]
pub struct Class {
    /// Class ID (unique identifier)
    pub id: ClassId,
    /// Class name
    pub name: String,
    /// Parent class ID (None for root classes)
    pub parent: Option<ClassId>,
    /// Method table for selectors this class declares or overrides
    methods: FxHashMap<Selector, Method>,
}

impl Class {
    /// Whether this class itself carries an entry for the selector.
    pub fn declares(&self, selector: Selector) -> bool {
        self.methods.contains_key(&selector)
    }

    /// This class's own entry for the selector, ignoring inheritance.
    pub fn own_method(&self, selector: Selector) -> Option<&Method> {
        self.methods.get(&selector)
    }
}

/// Registry of runtime classes.
#[derive(Debug, Default)]
pub struct ClassRegistry {
    classes: Vec<Class>,
    by_name: FxHashMap<String, ClassId>,
}

impl ClassRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Define a new class, optionally inheriting from a parent.
    pub fn define(&mut self, name: &str, parent: Option<ClassId>) -> ClassId {
        let id = ClassId(self.classes.len());
        self.classes.push(Class {
            id,
            name: name.to_string(),
            parent,
            methods: FxHashMap::default(),
        });
        self.by_name.insert(name.to_string(), id);
        id
    }

    /// Declare a method on a class with an implementation.
    pub fn add_method(&mut self, class: ClassId, selector: Selector, signature: Signature, imp: Imp) {
        self.classes[class.0].methods.insert(
            selector,
            Method {
                signature: Arc::new(signature),
                imp: Some(imp),
            },
        );
    }

    /// Declare a selector's signature on a class without an implementation.
    pub fn declare(&mut self, class: ClassId, selector: Selector, signature: Signature) {
        self.classes[class.0].methods.insert(
            selector,
            Method {
                signature: Arc::new(signature),
                imp: None,
            },
        );
    }

    /// Get a class by id.
    pub fn get(&self, id: ClassId) -> Option<&Class> {
        self.classes.get(id.0)
    }

    /// Look up a class by name.
    pub fn get_by_name(&self, name: &str) -> Option<&Class> {
        self.by_name.get(name).and_then(|id| self.get(*id))
    }

    /// A class's name, if the id is valid.
    pub fn name_of(&self, id: ClassId) -> Option<&str> {
        self.get(id).map(|c| c.name.as_str())
    }

    /// The class and its ancestors, nearest first.
    pub fn chain(&self, class: ClassId) -> Vec<ClassId> {
        let mut out = Vec::new();
        let mut cursor = Some(class);
        while let Some(id) = cursor {
            out.push(id);
            cursor = self.get(id).and_then(|c| c.parent);
        }
        out
    }

    /// Resolve the selector's current method for a class, walking the parent
    /// chain.
    pub fn resolve_method(&self, class: ClassId, selector: Selector) -> Option<&Method> {
        let mut cursor = Some(class);
        while let Some(id) = cursor {
            let c = self.get(id)?;
            if let Some(m) = c.methods.get(&selector) {
                return Some(m);
            }
            cursor = c.parent;
        }
        None
    }

    /// The class in the chain that supplies the selector's current
    /// implementation. This is the explicit own-vs-inherited primitive;
    /// consumers must not infer it from implementation identity.
    pub fn providing_class(&self, class: ClassId, selector: Selector) -> Option<ClassId> {
        let mut cursor = Some(class);
        while let Some(id) = cursor {
            let c = self.get(id)?;
            if c.methods.contains_key(&selector) {
                return Some(id);
            }
            cursor = c.parent;
        }
        None
    }

    /// Whether the class itself (not an ancestor) carries the selector.
    pub fn declares(&self, class: ClassId, selector: Selector) -> bool {
        self.get(class).map(|c| c.declares(selector)).unwrap_or(false)
    }

    /// The selector's signature as seen from a class (own or inherited).
    pub fn signature_of(&self, class: ClassId, selector: Selector) -> Option<Arc<Signature>> {
        self.resolve_method(class, selector)
            .map(|m| m.signature.clone())
    }

    /// Replace the class's implementation of a selector.
    ///
    /// If the class declares the selector, its implementation is replaced in
    /// place; if it only inherits it, an override entry is added on exactly
    /// this class with the inherited signature. Fails if the selector does
    /// not resolve anywhere in the chain.
    pub fn install_implementation(
        &mut self,
        class: ClassId,
        selector: Selector,
        imp: Imp,
    ) -> Result<(), String> {
        let signature = self
            .signature_of(class, selector)
            .ok_or_else(|| format!("selector `{}` does not resolve on class", selector))?;
        self.classes[class.0]
            .methods
            .insert(selector, Method { signature, imp: Some(imp) });
        Ok(())
    }

    /// Number of defined classes.
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Whether no classes are defined.
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::TypeEncoding;

    fn noop_imp() -> Imp {
        Arc::new(|_, _| Ok(()))
    }

    fn void_sig() -> Signature {
        Signature::method(TypeEncoding::Void, vec![])
    }

    #[test]
    fn test_define_and_lookup() {
        let mut reg = ClassRegistry::new();
        let base = reg.define("Base", None);
        let sub = reg.define("Sub", Some(base));

        assert_eq!(reg.name_of(base), Some("Base"));
        assert_eq!(reg.get_by_name("Sub").unwrap().id, sub);
        assert_eq!(reg.chain(sub), vec![sub, base]);
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn test_resolution_walks_chain() {
        let mut reg = ClassRegistry::new();
        let base = reg.define("Base", None);
        let sub = reg.define("Sub", Some(base));
        let sel = Selector::intern("class_inherited");
        reg.add_method(base, sel, void_sig(), noop_imp());

        assert!(reg.resolve_method(sub, sel).is_some());
        assert_eq!(reg.providing_class(sub, sel), Some(base));
        assert!(reg.declares(base, sel));
        assert!(!reg.declares(sub, sel));
        assert!(reg.signature_of(sub, sel).is_some());
    }

    #[test]
    fn test_override_shadows_parent() {
        let mut reg = ClassRegistry::new();
        let base = reg.define("Base", None);
        let sub = reg.define("Sub", Some(base));
        let sel = Selector::intern("class_override");
        reg.add_method(base, sel, void_sig(), noop_imp());
        reg.add_method(sub, sel, void_sig(), noop_imp());

        assert_eq!(reg.providing_class(sub, sel), Some(sub));
        assert_eq!(reg.providing_class(base, sel), Some(base));
    }

    #[test]
    fn test_install_adds_override_on_exact_class() {
        let mut reg = ClassRegistry::new();
        let base = reg.define("Base", None);
        let sub = reg.define("Sub", Some(base));
        let sel = Selector::intern("class_install");
        reg.add_method(base, sel, void_sig(), noop_imp());

        reg.install_implementation(sub, sel, noop_imp()).unwrap();
        // The override lands on Sub; Base keeps its own entry.
        assert!(reg.declares(sub, sel));
        assert_eq!(reg.providing_class(sub, sel), Some(sub));
        assert_eq!(reg.providing_class(base, sel), Some(base));
        // Signature carried over from the inherited declaration.
        assert_eq!(
            reg.signature_of(sub, sel).unwrap(),
            reg.signature_of(base, sel).unwrap()
        );
    }

    #[test]
    fn test_signature_only_declaration() {
        let mut reg = ClassRegistry::new();
        let base = reg.define("Base", None);
        let sel = Selector::intern("class_declared");
        reg.declare(base, sel, void_sig());

        let method = reg.resolve_method(base, sel).unwrap();
        assert!(method.imp.is_none());
        assert!(reg.signature_of(base, sel).is_some());
        assert!(reg.declares(base, sel));
    }

    #[test]
    fn test_install_unresolvable_selector_fails() {
        let mut reg = ClassRegistry::new();
        let base = reg.define("Base", None);
        let sel = Selector::intern("class_missing");
        assert!(reg.install_implementation(base, sel, noop_imp()).is_err());
    }
}
