//! Interception state
//!
//! One `InterceptionState` exists per observed (object, selector) pair. It
//! owns the producing end of the pair's multicast event stream: `publish`
//! delivers one marshalled argument list to every live subscriber, `close`
//! terminates the stream when the object's lifetime ends.
//!
//! States live in a `StateTable`, a sharded side table keyed by object
//! identity — lookups for independent pairs do not contend, and creation is
//! atomic per pair under concurrent first-subscription.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam::channel::{unbounded, Sender};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;

use tripwire_object::{ObjectId, Selector};

use crate::stream::{CallEvent, CallStream};

/// Producing end of one (object, selector) pair's event stream.
pub struct InterceptionState {
    subscribers: Mutex<Vec<Sender<CallEvent>>>,
    closed: AtomicBool,
}

impl InterceptionState {
    /// Create an open state with no subscribers.
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// Attach a new subscriber. Subscribing to a closed state yields a
    /// stream that is already terminated.
    pub fn subscribe(&self) -> CallStream {
        let (tx, rx) = unbounded();
        if !self.closed.load(Ordering::Acquire) {
            let mut subscribers = self.subscribers.lock();
            // Re-check under the lock so we never register after close.
            if !self.closed.load(Ordering::Acquire) {
                subscribers.push(tx);
                return CallStream::new(rx);
            }
        }
        // tx dropped here; rx observes an already-terminated stream.
        CallStream::new(rx)
    }

    /// Deliver one event to every live subscriber, atomically with respect
    /// to other publishes on this state. Subscribers that went away are
    /// pruned. No-op after close.
    pub fn publish(&self, event: CallEvent) {
        let mut subscribers = self.subscribers.lock();
        if self.closed.load(Ordering::Acquire) {
            return;
        }
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Terminate the stream. Idempotent; later publishes and notifications
    /// are no-ops.
    pub fn close(&self) {
        let mut subscribers = self.subscribers.lock();
        self.closed.store(true, Ordering::Release);
        // Dropping the senders disconnects every subscriber.
        subscribers.clear();
    }

    /// Whether the stream has terminated.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Current number of attached subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}

impl Default for InterceptionState {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InterceptionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterceptionState")
            .field("closed", &self.is_closed())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// Side table of interception states, keyed by (object, selector).
#[derive(Default)]
pub struct StateTable {
    states: DashMap<(ObjectId, Selector), Arc<InterceptionState>>,
}

impl StateTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// The pair's state, if anyone ever subscribed on it.
    pub fn get(&self, object: ObjectId, selector: Selector) -> Option<Arc<InterceptionState>> {
        self.states.get(&(object, selector)).map(|s| s.clone())
    }

    /// Look up or atomically create the pair's state. The second value is
    /// true when this call created it.
    pub fn get_or_create(
        &self,
        object: ObjectId,
        selector: Selector,
    ) -> (Arc<InterceptionState>, bool) {
        match self.states.entry((object, selector)) {
            Entry::Occupied(entry) => (entry.get().clone(), false),
            Entry::Vacant(entry) => {
                let state = Arc::new(InterceptionState::new());
                entry.insert(state.clone());
                (state, true)
            }
        }
    }

    /// Close and remove the pair's state. No-op if absent or already
    /// closed — lifetime notifications may arrive more than once.
    pub fn close_pair(&self, object: ObjectId, selector: Selector) {
        if let Some((_, state)) = self.states.remove(&(object, selector)) {
            state.close();
        }
    }

    /// Number of live states.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Whether no states exist.
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

impl std::fmt::Debug for StateTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateTable")
            .field("states", &self.states.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foreign::ForeignValue;

    fn event(n: i32) -> CallEvent {
        vec![ForeignValue::Int32(n)]
    }

    #[test]
    fn test_publish_reaches_all_subscribers_in_order() {
        let state = InterceptionState::new();
        let a = state.subscribe();
        let b = state.subscribe();

        state.publish(event(1));
        state.publish(event(2));

        assert_eq!(a.try_recv(), Some(event(1)));
        assert_eq!(a.try_recv(), Some(event(2)));
        assert_eq!(b.drain(), vec![event(1), event(2)]);
    }

    #[test]
    fn test_close_terminates_streams() {
        let state = InterceptionState::new();
        let stream = state.subscribe();
        state.publish(event(5));
        state.close();
        state.publish(event(6));

        // Buffered emission still readable, then terminated.
        assert_eq!(stream.recv(), Some(event(5)));
        assert_eq!(stream.recv(), None);
        assert!(state.is_closed());
    }

    #[test]
    fn test_close_is_idempotent() {
        let state = InterceptionState::new();
        let stream = state.subscribe();
        state.close();
        state.close();
        assert_eq!(stream.recv(), None);
    }

    #[test]
    fn test_subscribe_after_close_is_terminated() {
        let state = InterceptionState::new();
        state.close();
        let stream = state.subscribe();
        assert_eq!(stream.recv(), None);
        assert_eq!(state.subscriber_count(), 0);
    }

    #[test]
    fn test_dropped_subscriber_is_pruned() {
        let state = InterceptionState::new();
        let a = state.subscribe();
        let b = state.subscribe();
        drop(b);

        state.publish(event(1));
        assert_eq!(state.subscriber_count(), 1);
        assert_eq!(a.try_recv(), Some(event(1)));
    }

    #[test]
    fn test_table_one_state_per_pair() {
        let table = StateTable::new();
        let obj = ObjectId::from_raw(1);
        let sel = Selector::intern("state_pair");

        let (first, created) = table.get_or_create(obj, sel);
        assert!(created);
        let (second, created) = table.get_or_create(obj, sel);
        assert!(!created);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_table_pairs_are_independent() {
        let table = StateTable::new();
        let sel = Selector::intern("state_independent");
        let (a, _) = table.get_or_create(ObjectId::from_raw(1), sel);
        let (b, _) = table.get_or_create(ObjectId::from_raw(2), sel);
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_close_pair_tolerates_double_notification() {
        let table = StateTable::new();
        let obj = ObjectId::from_raw(3);
        let sel = Selector::intern("state_double_close");
        let (state, _) = table.get_or_create(obj, sel);
        let stream = state.subscribe();

        table.close_pair(obj, sel);
        table.close_pair(obj, sel);
        assert_eq!(stream.recv(), None);
        assert!(table.get(obj, sel).is_none());
    }
}
