//! Downward-flowing tree context and the provider that roots it.
//!
//! [`TreeContext`] is the pair every consumer receives from above: the store
//! handle and, when the nearest subscribing ancestor exists, that ancestor's
//! subscription node. [`Provider`] sits at the tree root and hands out the
//! root context, in which the subscription slot is empty so first-level
//! consumers attach directly to the store.

use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};

use cascade_core::Store;
use tracing::warn;

use crate::node::SubscriptionNode;

/// What flows down the consumer tree.
pub struct TreeContext<S: Store> {
    pub store: Rc<S>,
    /// The nearest subscribing ancestor's node; `None` at the root level.
    pub subscription: Option<Rc<SubscriptionNode<S>>>,
}

impl<S: Store> Clone for TreeContext<S> {
    fn clone(&self) -> Self {
        Self {
            store: Rc::clone(&self.store),
            subscription: self.subscription.clone(),
        }
    }
}

impl<S: Store> TreeContext<S> {
    /// Root-level context: store only, no upstream subscription.
    #[must_use]
    pub fn root(store: Rc<S>) -> Self {
        Self {
            store,
            subscription: None,
        }
    }
}

impl<S: Store> std::fmt::Debug for TreeContext<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeContext")
            .field("has_subscription", &self.subscription.is_some())
            .finish()
    }
}

static STORE_SWAP_WARNED: AtomicBool = AtomicBool::new(false);

/// Tree root holding the store and issuing the root [`TreeContext`].
///
/// The store handle is fixed for the provider's lifetime: consumers capture
/// it at bind time and a silent swap would leave part of the tree reading
/// one store and part another.
pub struct Provider<S: Store> {
    store: Rc<S>,
}

impl<S: Store> Provider<S> {
    #[must_use]
    pub fn new(store: Rc<S>) -> Self {
        Self { store }
    }

    /// The context consumers directly under this provider inherit.
    #[must_use]
    pub fn context(&self) -> TreeContext<S> {
        TreeContext::root(Rc::clone(&self.store))
    }

    #[must_use]
    pub fn store(&self) -> &Rc<S> {
        &self.store
    }

    /// Attempted store replacement. Ignored; warns once per process. Tear
    /// the tree down and build a new provider to change stores.
    pub fn set_store(&self, next: &Rc<S>) {
        if Rc::ptr_eq(&self.store, next) {
            return;
        }
        if !STORE_SWAP_WARNED.swap(true, Ordering::Relaxed) {
            warn!("provider does not support changing the store; rebuild the tree instead");
        }
    }
}

impl<S: Store> std::fmt::Debug for Provider<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Provider").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cascade_core::ReducerStore;

    type TestStore = ReducerStore<i64, i64>;

    fn test_store() -> Rc<TestStore> {
        Rc::new(ReducerStore::new(0, |state, delta| Rc::new(**state + delta)))
    }

    #[test]
    fn root_context_has_no_subscription() {
        let store = test_store();
        let provider = Provider::new(Rc::clone(&store));
        let ctx = provider.context();
        assert!(Rc::ptr_eq(&ctx.store, &store));
        assert!(ctx.subscription.is_none());
    }

    #[test]
    fn set_store_keeps_the_original() {
        let original = test_store();
        let replacement = test_store();
        let provider = Provider::new(Rc::clone(&original));

        provider.set_store(&replacement);
        assert!(Rc::ptr_eq(provider.store(), &original));

        // Same handle again is silently accepted.
        provider.set_store(&original);
        assert!(Rc::ptr_eq(provider.store(), &original));
    }
}
