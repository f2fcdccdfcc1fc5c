//! Object instances, refcounting, and lifetime hooks
//!
//! Objects live in an `ObjectTable`: a sharded map from `ObjectId` to a slot
//! holding the object's class, refcount, and registered finalizers. Callers
//! manage lifetime explicitly via `retain`/`release`; a release that drops
//! the count to zero removes the slot and runs the finalizers exactly once.
//!
//! `Retained` is the ownership guard form of `retain`: it holds one count and
//! releases it on drop.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;

use crate::class::ClassId;

/// Identity handle for an object instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(u64);

impl ObjectId {
    /// Raw identity bits (used by frame encoding).
    pub fn raw(self) -> u64 {
        self.0
    }

    /// Rebuild an id from its raw bits.
    pub fn from_raw(raw: u64) -> Self {
        ObjectId(raw)
    }
}

type Finalizer = Box<dyn FnOnce() + Send>;

struct ObjectSlot {
    class: ClassId,
    refcount: AtomicUsize,
    finalizers: Mutex<Vec<Finalizer>>,
}

/// Table of live object instances.
///
/// Sharded internally; lookups and refcount traffic on distinct objects do
/// not contend.
pub struct ObjectTable {
    slots: DashMap<ObjectId, ObjectSlot>,
    next_id: AtomicU64,
}

impl ObjectTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self {
            slots: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Allocate a new instance of `class` with refcount 1.
    pub fn alloc(&self, class: ClassId) -> ObjectId {
        let id = ObjectId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.slots.insert(
            id,
            ObjectSlot {
                class,
                refcount: AtomicUsize::new(1),
                finalizers: Mutex::new(Vec::new()),
            },
        );
        id
    }

    /// Increment the object's refcount. Returns false if the object is dead
    /// or already dying (count observed at zero).
    pub fn retain(&self, id: ObjectId) -> bool {
        let Some(slot) = self.slots.get(&id) else {
            return false;
        };
        let mut count = slot.refcount.load(Ordering::Relaxed);
        loop {
            if count == 0 {
                return false;
            }
            match slot.refcount.compare_exchange_weak(
                count,
                count + 1,
                Ordering::Acquire,
                Ordering::Relaxed,
            ) {
                Ok(_) => return true,
                Err(actual) => count = actual,
            }
        }
    }

    /// Decrement the object's refcount. When the count reaches zero the slot
    /// is removed and finalizers run, in registration order. Releasing a
    /// dead id is a no-op.
    pub fn release(&self, id: ObjectId) {
        let dead = {
            let Some(slot) = self.slots.get(&id) else {
                return;
            };
            slot.refcount.fetch_sub(1, Ordering::Release) == 1
        };
        if !dead {
            return;
        }
        // Remove the slot before running finalizers so re-entrant lookups
        // observe the object as dead.
        let Some((_, slot)) = self.slots.remove(&id) else {
            return;
        };
        let finalizers = std::mem::take(&mut *slot.finalizers.lock());
        for f in finalizers {
            f();
        }
    }

    /// Retain and wrap in an ownership guard. Returns None if the object is
    /// dead.
    pub fn retain_guard(self: &Arc<Self>, id: ObjectId) -> Option<Retained> {
        if self.retain(id) {
            Some(Retained {
                id,
                table: Arc::clone(self),
            })
        } else {
            None
        }
    }

    /// The object's concrete runtime class, or None if dead.
    pub fn class_of(&self, id: ObjectId) -> Option<ClassId> {
        self.slots.get(&id).map(|slot| slot.class)
    }

    /// Whether the object is still alive.
    pub fn is_live(&self, id: ObjectId) -> bool {
        self.slots.contains_key(&id)
    }

    /// Current refcount, or None if dead.
    pub fn refcount(&self, id: ObjectId) -> Option<usize> {
        self.slots
            .get(&id)
            .map(|slot| slot.refcount.load(Ordering::Relaxed))
    }

    /// Register a hook to run when the object's lifetime ends. Returns false
    /// (without registering) if the object is already dead.
    pub fn add_finalizer(&self, id: ObjectId, hook: Finalizer) -> bool {
        match self.slots.get(&id) {
            Some(slot) => {
                slot.finalizers.lock().push(hook);
                true
            }
            None => false,
        }
    }

    /// Number of live objects.
    pub fn live_count(&self) -> usize {
        self.slots.len()
    }
}

impl Default for ObjectTable {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ObjectTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectTable")
            .field("live", &self.slots.len())
            .finish()
    }
}

/// Ownership guard over one retained reference to an object.
///
/// Holds one refcount; cloning retains again, dropping releases. Equality is
/// by object identity.
pub struct Retained {
    id: ObjectId,
    table: Arc<ObjectTable>,
}

impl Retained {
    /// The referenced object.
    pub fn id(&self) -> ObjectId {
        self.id
    }
}

impl Clone for Retained {
    fn clone(&self) -> Self {
        // We hold a count, so the object cannot die under us.
        let ok = self.table.retain(self.id);
        debug_assert!(ok, "retain of a held object failed");
        Self {
            id: self.id,
            table: Arc::clone(&self.table),
        }
    }
}

impl Drop for Retained {
    fn drop(&mut self) {
        self.table.release(self.id);
    }
}

impl PartialEq for Retained {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Retained {}

impl std::fmt::Debug for Retained {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Retained").field(&self.id).finish()
    }
}
