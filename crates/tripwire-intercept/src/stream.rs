//! Subscriber-side event streams
//!
//! A `CallStream` is one subscriber's view of an interception state's
//! events. Emissions are delivered in publish order and buffered until read;
//! publishing is synchronous with the intercepted call, so there is no
//! overflow condition. The stream ends — `recv` returns `None` — only when
//! the observed object's lifetime ends; dropping the stream detaches this
//! subscriber without affecting others.

use std::time::Duration;

use crossbeam::channel::Receiver;

use crate::foreign::ForeignValue;

/// One emission: the call's explicit arguments in declaration order.
pub type CallEvent = Vec<ForeignValue>;

/// One subscriber's ordered view of an intercepted operation's calls.
pub struct CallStream {
    rx: Receiver<CallEvent>,
}

impl CallStream {
    pub(crate) fn new(rx: Receiver<CallEvent>) -> Self {
        Self { rx }
    }

    /// Block until the next emission, or `None` once the stream has
    /// terminated and all buffered emissions were read.
    pub fn recv(&self) -> Option<CallEvent> {
        self.rx.recv().ok()
    }

    /// A buffered emission if one is ready; `None` when empty or
    /// terminated.
    pub fn try_recv(&self) -> Option<CallEvent> {
        self.rx.try_recv().ok()
    }

    /// Like `recv`, but gives up after `timeout`.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<CallEvent> {
        self.rx.recv_timeout(timeout).ok()
    }

    /// Drain everything currently buffered.
    pub fn drain(&self) -> Vec<CallEvent> {
        let mut out = Vec::new();
        while let Some(event) = self.try_recv() {
            out.push(event);
        }
        out
    }
}

impl std::fmt::Debug for CallStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallStream")
            .field("buffered", &self.rx.len())
            .finish()
    }
}
