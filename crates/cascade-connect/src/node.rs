//! Per-consumer subscription node: one upstream link, one child registry.
//!
//! # Design
//!
//! A node receives notifications from exactly one upstream source — the
//! store directly (root consumers) or its parent node (nested consumers) —
//! and owns a [`ListenerRegistry`] its children attach to. The
//! upstream-facing wrapper calls only the node's own-notify hook; it never
//! forwards to children itself. Whether children are notified immediately or
//! deferred past a render commit is the consumer binding's decision, made
//! *between* those two steps — that separation is what makes top-down
//! ordering possible.
//!
//! # Invariants
//!
//! 1. A node is connected to at most one upstream source, never both store
//!    and parent, never zero sources while reporting connected.
//! 2. `try_connect`/`try_disconnect` are idempotent.
//! 3. The upstream wrapper holds only a `Weak` back-reference; a dropped
//!    node leaves an inert wrapper behind, never a dangling callback.
//! 4. Parent links are strong `Rc`s but the downward edge is weak, so the
//!    tree contains no strong cycle.

use std::cell::RefCell;
use std::mem;
use std::rc::Rc;

use cascade_core::{Listener, ListenerRegistry, ListenerToken, Store};
use tracing::debug;

/// Upstream connection state.
enum UpstreamLink {
    Disconnected,
    /// Registered directly with the store.
    ViaStore(ListenerToken),
    /// Registered with the parent node's child registry.
    ViaParent(ListenerToken),
}

/// One tree-connected consumer's link into the notification hierarchy.
pub struct SubscriptionNode<S: Store> {
    store: Rc<S>,
    parent: Option<Rc<SubscriptionNode<S>>>,
    listeners: ListenerRegistry,
    /// Hook run when the upstream source notifies. Cleared on teardown so
    /// in-flight notifications arriving afterwards are no-ops.
    on_notify: RefCell<Option<Listener>>,
    upstream: RefCell<UpstreamLink>,
}

impl<S: Store + 'static> SubscriptionNode<S> {
    /// Connect to the upstream source. Idempotent.
    ///
    /// With a parent, registers with the parent's child registry and
    /// recursively ensures the parent is connected; otherwise registers
    /// directly with the store.
    pub fn try_connect(self: &Rc<Self>) {
        if self.is_connected() {
            return;
        }
        let weak = Rc::downgrade(self);
        let wrapper: Listener = Rc::new(move || {
            if let Some(node) = weak.upgrade() {
                node.handle_upstream();
            }
        });
        let link = match &self.parent {
            Some(parent) => {
                parent.try_connect();
                UpstreamLink::ViaParent(parent.listeners.subscribe_shared(wrapper))
            }
            None => UpstreamLink::ViaStore(self.store.subscribe(wrapper)),
        };
        *self.upstream.borrow_mut() = link;
        debug!(
            nested = self.parent.is_some(),
            "subscription node connected"
        );
    }
}

impl<S: Store> SubscriptionNode<S> {
    /// Create a node. Does not subscribe anywhere yet; connection is lazy.
    #[must_use]
    pub fn new(
        store: Rc<S>,
        parent: Option<Rc<SubscriptionNode<S>>>,
        on_notify: Listener,
    ) -> Rc<Self> {
        Rc::new(Self {
            store,
            parent,
            listeners: ListenerRegistry::new(),
            on_notify: RefCell::new(Some(on_notify)),
            upstream: RefCell::new(UpstreamLink::Disconnected),
        })
    }

    /// Release the upstream registration. Idempotent.
    pub fn try_disconnect(&self) {
        let link = mem::replace(&mut *self.upstream.borrow_mut(), UpstreamLink::Disconnected);
        match link {
            UpstreamLink::Disconnected => {}
            UpstreamLink::ViaStore(token) => {
                self.store.unsubscribe(token);
                debug!("subscription node disconnected from store");
            }
            UpstreamLink::ViaParent(token) => {
                if let Some(parent) = &self.parent {
                    parent.listeners.unsubscribe(token);
                }
                debug!("subscription node disconnected from parent");
            }
        }
    }

    /// Called by the upstream wrapper. Runs the own-notify hook only; child
    /// notification stays the binding's decision.
    fn handle_upstream(&self) {
        let hook = self.on_notify.borrow().clone();
        if let Some(hook) = hook {
            hook();
        }
    }

    /// Attach a child's callback to this node's registry.
    pub fn add_child_listener(&self, callback: impl Fn() + 'static) -> ListenerToken {
        self.listeners.subscribe(callback)
    }

    /// Remove a child registration. No-op if already removed.
    pub fn remove_child_listener(&self, token: ListenerToken) {
        self.listeners.unsubscribe(token);
    }

    /// Notify all attached children, in registration order.
    pub fn notify_children(&self) {
        self.listeners.notify();
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        !matches!(*self.upstream.borrow(), UpstreamLink::Disconnected)
    }

    /// Number of attached child listeners.
    #[must_use]
    pub fn child_count(&self) -> usize {
        self.listeners.len()
    }

    /// Live child callbacks, for carrying across a node rebuild.
    #[must_use]
    pub fn child_snapshot(&self) -> Vec<Listener> {
        self.listeners.snapshot()
    }

    /// Re-attach callbacks carried over from a torn-down node.
    pub fn adopt_children(&self, children: Vec<Listener>) {
        for child in children {
            self.listeners.subscribe_shared(child);
        }
    }

    /// Full teardown: disconnect upstream, drop the own-notify hook, clear
    /// the child registry. Safe to call more than once and from within a
    /// notification pass.
    pub fn clear(&self) {
        self.on_notify.borrow_mut().take();
        self.try_disconnect();
        self.listeners.clear();
    }

    #[must_use]
    pub fn store(&self) -> &Rc<S> {
        &self.store
    }

    /// The upstream parent node, if this node is nested.
    #[must_use]
    pub fn parent(&self) -> Option<Rc<SubscriptionNode<S>>> {
        self.parent.clone()
    }
}

impl<S: Store> Drop for SubscriptionNode<S> {
    fn drop(&mut self) {
        // Release the upstream registration if teardown was skipped.
        self.try_disconnect();
    }
}

impl<S: Store> std::fmt::Debug for SubscriptionNode<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionNode")
            .field("connected", &!matches!(*self.upstream.borrow(), UpstreamLink::Disconnected))
            .field("nested", &self.parent.is_some())
            .field("children", &self.listeners.len())
            .finish()
    }
}
