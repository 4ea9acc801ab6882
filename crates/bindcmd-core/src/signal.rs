#![forbid(unsafe_code)]

//! Multicast invalidation signal.
//!
//! An [`InvalidationSource`] is what a command exposes to the binding layer:
//! listeners subscribe to learn that `can_execute` may now answer
//! differently and should be polled again.
//!
//! # Invariants
//!
//! 1. Listeners are invoked in registration order.
//! 2. `raise()` with no listeners is a no-op.
//! 3. `raise()` delivers to the listeners registered when it was called;
//!    listeners added or removed during delivery take effect on the next
//!    raise.
//!
//! # Failure Modes
//!
//! - **Listener panics**: the panic unwinds out of `raise()` and the
//!   remaining listeners are not notified. Failures are not isolated.
//! - **Re-entrant raise**: a listener that raises the same source recurses
//!   without any guard. Callers must not build such cycles.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

/// Handle returned by [`InvalidationSource::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl ListenerId {
    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

type Listener = Rc<dyn Fn()>;

/// "State may have changed" signal with zero-argument listeners.
#[derive(Default)]
pub struct InvalidationSource {
    listeners: RefCell<Vec<(ListenerId, Listener)>>,
    next_id: Cell<u64>,
}

impl fmt::Debug for InvalidationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvalidationSource")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl InvalidationSource {
    /// Create a source with no listeners.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener. It stays registered until [`unsubscribe`]
    /// is called with the returned id or the source is dropped.
    ///
    /// [`unsubscribe`]: InvalidationSource::unsubscribe
    pub fn subscribe(&self, listener: impl Fn() + 'static) -> ListenerId {
        let id = ListenerId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.listeners.borrow_mut().push((id, Rc::new(listener)));
        id
    }

    /// Remove a listener. Returns `false` if `id` was not registered.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    /// Notify every registered listener, in registration order.
    pub fn raise(&self) {
        // Snapshot so listeners may subscribe, unsubscribe or raise.
        let snapshot: Vec<Listener> = self
            .listeners
            .borrow()
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect();
        if snapshot.is_empty() {
            return;
        }
        tracing::trace!(message = "bindcmd.invalidate", listeners = snapshot.len());
        for listener in snapshot {
            listener();
        }
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    /// Whether no listener is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listeners.borrow().is_empty()
    }
}
