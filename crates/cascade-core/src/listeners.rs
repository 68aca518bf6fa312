//! Ordered listener registry with snapshot-at-notify semantics.
//!
//! # Design
//!
//! A [`ListenerRegistry`] maps monotonically increasing ids to zero-argument
//! callbacks. Notification iterates a point-in-time snapshot taken at the
//! start of the pass, so callbacks may freely subscribe or unsubscribe
//! (themselves or siblings) while a pass is running.
//!
//! # Invariants
//!
//! 1. Callbacks run in registration order.
//! 2. Unsubscribing during a pass marks the entry inert; the snapshot is
//!    never resized mid-iteration.
//! 3. Callbacks added during a pass are not visited until the next pass.
//! 4. `unsubscribe` is idempotent: a removed or stale token is a no-op,
//!    never an error.
//! 5. Ids are process-global, so a token minted by one registry can never
//!    accidentally remove an entry from another (relevant when a node's
//!    registry is rebuilt and old tokens survive in children).

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

// Import logging macros (no-op when the tracing feature is disabled).
#[cfg(feature = "tracing")]
use crate::logging::trace;
#[cfg(not(feature = "tracing"))]
use crate::trace;

static NEXT_LISTENER_ID: AtomicU64 = AtomicU64::new(1);

fn next_listener_id() -> u64 {
    NEXT_LISTENER_ID.fetch_add(1, Ordering::Relaxed)
}

/// A registered zero-argument, side-effecting callback.
pub type Listener = Rc<dyn Fn()>;

/// Opaque handle for removing a registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerToken(u64);

struct Entry {
    id: u64,
    /// Shared with in-flight snapshots so removal takes effect mid-pass.
    active: Rc<Cell<bool>>,
    callback: Listener,
}

/// An ordered collection of callbacks supporting safe registration and
/// removal while notification is in progress.
#[derive(Default)]
pub struct ListenerRegistry {
    entries: RefCell<Vec<Entry>>,
}

impl ListenerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback; returns the token that removes it.
    pub fn subscribe(&self, callback: impl Fn() + 'static) -> ListenerToken {
        self.subscribe_shared(Rc::new(callback))
    }

    /// Register an already-shared callback handle.
    ///
    /// Used when carrying registrations across a registry rebuild.
    pub fn subscribe_shared(&self, callback: Listener) -> ListenerToken {
        let id = next_listener_id();
        self.entries.borrow_mut().push(Entry {
            id,
            active: Rc::new(Cell::new(true)),
            callback,
        });
        ListenerToken(id)
    }

    /// Remove the callback keyed by `token`. No-op if already removed.
    pub fn unsubscribe(&self, token: ListenerToken) {
        let mut entries = self.entries.borrow_mut();
        if let Some(pos) = entries.iter().position(|e| e.id == token.0) {
            let entry = entries.remove(pos);
            // Snapshots in flight hold a clone of this flag.
            entry.active.set(false);
        }
    }

    /// Invoke every currently registered callback in registration order.
    ///
    /// Iterates a snapshot taken at call start: removals during the pass are
    /// honored via the inert flag, additions wait for the next pass. A
    /// panicking callback is not caught here; surfacing it is the caller's
    /// responsibility.
    pub fn notify(&self) {
        let snapshot: Vec<(Rc<Cell<bool>>, Listener)> = self
            .entries
            .borrow()
            .iter()
            .map(|e| (Rc::clone(&e.active), Rc::clone(&e.callback)))
            .collect();
        trace!(listeners = snapshot.len(), "registry notify pass");
        for (active, callback) in snapshot {
            if active.get() {
                callback();
            }
        }
    }

    /// Live callback handles, in registration order.
    ///
    /// Used to carry child registrations forward when a subscription node is
    /// rebuilt.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Listener> {
        self.entries
            .borrow()
            .iter()
            .map(|e| Rc::clone(&e.callback))
            .collect()
    }

    /// Remove all listeners, marking any in-flight snapshot entries inert.
    pub fn clear(&self) {
        let mut entries = self.entries.borrow_mut();
        for entry in entries.iter() {
            entry.active.set(false);
        }
        entries.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl std::fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("len", &self.len())
            .finish()
    }
}
