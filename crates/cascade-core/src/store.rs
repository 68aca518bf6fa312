//! Store capability: the shared mutable state container the engine consumes.
//!
//! The engine never mutates a store. It reads state snapshots, subscribes a
//! listener, and hands the dispatch capability to selector factories. Any
//! container implementing [`Store`] plugs in; [`ReducerStore`] is the
//! reference implementation used by tests, fixtures, and hosts without a
//! store of their own.
//!
//! # Invariants
//!
//! 1. `state()` is a cheap shared snapshot (`Rc` clone); identity comparison
//!    between snapshots is `Rc::ptr_eq`.
//! 2. Every `dispatch` runs the reducer and notifies all subscribers, even
//!    when the reducer reports no change — the state-unchanged short-circuit
//!    belongs to subscribers, not the store.
//! 3. A reducer expresses "no change" by returning the same handle it was
//!    given, preserving snapshot identity.

use std::cell::RefCell;
use std::rc::Rc;

use crate::listeners::{Listener, ListenerRegistry, ListenerToken};

// Import logging macros (no-op when the tracing feature is disabled).
#[cfg(feature = "tracing")]
use crate::logging::trace;
#[cfg(not(feature = "tracing"))]
use crate::trace;

/// Shared mutable state container consumed by the engine.
pub trait Store {
    type State: 'static;
    type Action;

    /// Current state snapshot. Cheap (`Rc` clone), identity-comparable.
    fn state(&self) -> Rc<Self::State>;

    /// Apply an action. The only way state changes.
    fn dispatch(&self, action: Self::Action);

    /// Register a top-level change listener.
    fn subscribe(&self, listener: Listener) -> ListenerToken;

    /// Remove a previously registered listener. No-op if already removed.
    fn unsubscribe(&self, token: ListenerToken);
}

/// The dispatch capability of a store, narrowed for selector factories.
///
/// Factories bind action creators to this handle outside their projection as
/// an optimization; the projection itself never needs the full store.
pub struct Dispatcher<S: Store> {
    store: Rc<S>,
}

impl<S: Store> Clone for Dispatcher<S> {
    fn clone(&self) -> Self {
        Self {
            store: Rc::clone(&self.store),
        }
    }
}

impl<S: Store> Dispatcher<S> {
    #[must_use]
    pub fn new(store: Rc<S>) -> Self {
        Self { store }
    }

    pub fn dispatch(&self, action: S::Action) {
        self.store.dispatch(action);
    }
}

impl<S: Store> std::fmt::Debug for Dispatcher<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher").finish_non_exhaustive()
    }
}

type Reducer<St, A> = Box<dyn Fn(&Rc<St>, A) -> Rc<St>>;

/// Reference store: a reducer over shared state snapshots.
///
/// The reducer receives the current snapshot handle and returns the next
/// one. Returning `Rc::clone` of the input means "unchanged" and keeps
/// snapshot identity; returning a fresh `Rc` is a real state change.
pub struct ReducerStore<St: 'static, A: 'static> {
    state: RefCell<Rc<St>>,
    reducer: Reducer<St, A>,
    listeners: ListenerRegistry,
}

impl<St: 'static, A: 'static> ReducerStore<St, A> {
    pub fn new(initial: St, reducer: impl Fn(&Rc<St>, A) -> Rc<St> + 'static) -> Self {
        Self {
            state: RefCell::new(Rc::new(initial)),
            reducer: Box::new(reducer),
            listeners: ListenerRegistry::new(),
        }
    }

    /// Number of registered top-level listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl<St: 'static, A: 'static> Store for ReducerStore<St, A> {
    type State = St;
    type Action = A;

    fn state(&self) -> Rc<St> {
        Rc::clone(&self.state.borrow())
    }

    fn dispatch(&self, action: A) {
        let next = {
            let current = self.state.borrow();
            (self.reducer)(&current, action)
        };
        *self.state.borrow_mut() = next;
        trace!("store dispatch, notifying subscribers");
        self.listeners.notify();
    }

    fn subscribe(&self, listener: Listener) -> ListenerToken {
        self.listeners.subscribe_shared(listener)
    }

    fn unsubscribe(&self, token: ListenerToken) {
        self.listeners.unsubscribe(token);
    }
}

impl<St: 'static, A: 'static> std::fmt::Debug for ReducerStore<St, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReducerStore")
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}
