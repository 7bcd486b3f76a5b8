//! Typed observer registration
//!
//! Each component owns one registry per event type instead of sharing a
//! global stringly-typed bus, so every wiring point is checked at compile time.

use std::collections::BTreeMap;

/// Observer invoked with each emitted event
pub type Callback<E> = Box<dyn Fn(&E) + Send>;

/// Callback registration handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallbackHandle(u32);

impl CallbackHandle {
    fn new(id: u32) -> Self {
        CallbackHandle(id)
    }

    pub fn id(&self) -> u32 {
        self.0
    }
}

/// Observers for one event type, invoked in registration order
pub struct CallbackRegistry<E> {
    counter: u32,
    callbacks: BTreeMap<CallbackHandle, Callback<E>>,
}

impl<E> Default for CallbackRegistry<E> {
    fn default() -> Self {
        Self {
            counter: 0,
            callbacks: BTreeMap::new(),
        }
    }
}

impl<E> std::fmt::Debug for CallbackRegistry<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackRegistry")
            .field("registered", &self.callbacks.len())
            .finish()
    }
}

impl<E> CallbackRegistry<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, callback: Callback<E>) -> CallbackHandle {
        self.counter += 1;
        let handle = CallbackHandle::new(self.counter);
        self.callbacks.insert(handle, callback);
        handle
    }

    /// Returns `false` if the handle was unknown
    pub fn unregister(&mut self, handle: CallbackHandle) -> bool {
        self.callbacks.remove(&handle).is_some()
    }

    pub fn emit(&self, event: &E) {
        for callback in self.callbacks.values() {
            callback(event);
        }
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }

    pub fn clear(&mut self) {
        self.callbacks.clear();
    }
}
