//! Consumer binding: composes one subscription node and one memoized
//! selector with the host lifecycle.
//!
//! # State machine
//!
//! `Unmounted → Mounting → Subscribed ⇄ PendingNotify → Unmounted`
//!
//! - `Mounting → Subscribed` on the mount-completed signal: connect the
//!   node, re-run the selector (a dispatch may have raced the mount), and
//!   request a render if the output changed.
//! - In `Subscribed`, an upstream notification re-runs the selector. An
//!   unchanged output forwards to children immediately without rendering;
//!   a changed output moves to `PendingNotify`, requests a render, and
//!   defers child notification until the render-committed signal.
//! - `PendingNotify → Subscribed` on render-committed: notify children
//!   exactly once.
//! - Any phase → `Unmounted` on the unmount signal: disconnect, clear the
//!   node, disable the selector, drop the store. Every further signal is a
//!   no-op. Deferred notification is this explicit phase, not a swapped
//!   callable.
//!
//! # Shadowing
//!
//! A binding whose store came from an explicit override ("direct" mode)
//! forwards the context it inherited — not its own subscription node — to
//! descendants. Otherwise a locally-overridden consumer would silently
//! become the ordering anchor for a subtree that logically belongs to an
//! ancestor's store. The converse also holds: direct-mode bindings always
//! subscribe straight to their override store, so adjacent override
//! consumers of the same store never chain to one another and carry no
//! ordering guarantee between them.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use cascade_core::{CascadeError, Listener, Result, Store};
use tracing::{debug, error, trace};

use crate::connector::{BindSite, ConnectorCore};
use crate::context::TreeContext;
use crate::node::SubscriptionNode;
use crate::selector::MemoizedSelector;
use crate::version;

static NEXT_BINDING_ID: AtomicU64 = AtomicU64::new(1);

fn next_binding_id() -> u64 {
    NEXT_BINDING_ID.fetch_add(1, Ordering::Relaxed)
}

/// Identifier the host uses to correlate render requests with bindings.
pub type BindingId = u64;

/// Render-request capability consumed from the host framework.
pub trait Host {
    /// Ask the host to schedule a render for `id`. The host later drives
    /// the render and the render-committed signal, in that order.
    fn request_render(&self, id: BindingId);
}

/// Binding lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Unmounted,
    /// Constructed and initially projected, mount not yet completed.
    Mounting,
    Subscribed,
    /// Output changed; child notification deferred until render commit.
    PendingNotify,
}

pub(crate) struct BindingInner<S: Store + 'static, I: 'static, O: 'static> {
    id: BindingId,
    name: String,
    phase: Cell<Phase>,
    store: RefCell<Option<Rc<S>>>,
    node: RefCell<Option<Rc<SubscriptionNode<S>>>>,
    selector: RefCell<MemoizedSelector<S, I, O>>,
    input: RefCell<Rc<I>>,
    inherited: Option<TreeContext<S>>,
    direct_mode: bool,
    subscribe_to_store: bool,
    host: Rc<dyn Host>,
    version: Cell<u64>,
    render_count: Cell<u64>,
    core: Rc<ConnectorCore<S, I, O>>,
}

impl<S: Store + 'static, I: 'static, O: 'static> BindingInner<S, I, O> {
    fn make_on_notify(inner: &Rc<Self>) -> Listener {
        let weak = Rc::downgrade(inner);
        Rc::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.handle_upstream_notify();
            }
        })
    }

    fn parent_node(&self) -> Option<Rc<SubscriptionNode<S>>> {
        // Direct-mode consumers subscribe straight to their override store;
        // the inherited subscription chain belongs to a different anchor.
        if self.direct_mode {
            None
        } else {
            self.inherited
                .as_ref()
                .and_then(|ctx| ctx.subscription.clone())
        }
    }

    fn run_selector(&self, input_changed: bool) {
        let input = Rc::clone(&self.input.borrow());
        self.selector.borrow().run(&input, input_changed);
    }

    fn notify_children_now(&self) {
        let node = self.node.borrow().clone();
        if let Some(node) = node {
            node.notify_children();
        }
    }

    fn handle_upstream_notify(&self) {
        match self.phase.get() {
            Phase::Subscribed | Phase::PendingNotify => {}
            Phase::Unmounted | Phase::Mounting => return,
        }
        self.run_selector(false);
        if self.selector.borrow().should_update() {
            trace!(name = %self.name, "output changed; deferring child notification");
            self.phase.set(Phase::PendingNotify);
            self.host.request_render(self.id);
        } else {
            trace!(name = %self.name, "output unchanged; forwarding to children");
            self.notify_children_now();
        }
    }

    fn refresh(self: &Rc<Self>) {
        let current = version::current();
        if self.version.get() == current {
            return;
        }
        self.version.set(current);
        let Some(store) = self.store.borrow().clone() else {
            return;
        };
        debug!(name = %self.name, version = current, "stale binding; rebuilding");

        *self.selector.borrow_mut() = self.core.build_selector(Rc::clone(&store));
        self.run_selector(true);

        if self.subscribe_to_store {
            let old = self.node.borrow_mut().take();
            let (carried, was_connected) = match old {
                Some(old) => {
                    let carried = old.child_snapshot();
                    let was_connected = old.is_connected();
                    old.clear();
                    (carried, was_connected)
                }
                None => (Vec::new(), false),
            };
            let node = SubscriptionNode::new(store, self.parent_node(), Self::make_on_notify(self));
            node.adopt_children(carried);
            if was_connected
                || matches!(self.phase.get(), Phase::Subscribed | Phase::PendingNotify)
            {
                node.try_connect();
            }
            *self.node.borrow_mut() = Some(node);
        }

        if self.selector.borrow().should_update() {
            self.host.request_render(self.id);
        }
    }
}

/// One consumer's connection to the tree: node + selector + host lifecycle.
///
/// Cloning yields another handle to the same binding.
pub struct ConsumerBinding<S: Store + 'static, I: 'static, O: 'static> {
    inner: Rc<BindingInner<S, I, O>>,
}

impl<S: Store + 'static, I: 'static, O: 'static> Clone for ConsumerBinding<S, I, O> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<S: Store + 'static, I: 'static, O: 'static> ConsumerBinding<S, I, O> {
    /// Instantiate a binding at a tree position. Fails fast when no store is
    /// reachable from the override or the inherited context.
    pub(crate) fn bind(
        core: Rc<ConnectorCore<S, I, O>>,
        site: BindSite<S>,
        initial_input: I,
    ) -> Result<Self> {
        let BindSite {
            inherited,
            store_override,
            host,
        } = site;
        let direct_mode = store_override.is_some();
        let store = match store_override
            .or_else(|| inherited.as_ref().map(|ctx| Rc::clone(&ctx.store)))
        {
            Some(store) => store,
            None => {
                error!(name = %core.options.display_name(), "no store reachable at bind site");
                return Err(CascadeError::MissingStore);
            }
        };

        let selector = core.build_selector(Rc::clone(&store));
        let inner = Rc::new(BindingInner {
            id: next_binding_id(),
            name: core.options.display_name().to_owned(),
            phase: Cell::new(Phase::Mounting),
            store: RefCell::new(Some(Rc::clone(&store))),
            node: RefCell::new(None),
            selector: RefCell::new(selector),
            input: RefCell::new(Rc::new(initial_input)),
            inherited,
            direct_mode,
            subscribe_to_store: core.options.subscribes_to_store(),
            host,
            version: Cell::new(core.version),
            render_count: Cell::new(0),
            core,
        });

        if inner.subscribe_to_store {
            let node = SubscriptionNode::new(
                store,
                inner.parent_node(),
                BindingInner::make_on_notify(&inner),
            );
            *inner.node.borrow_mut() = Some(node);
        }

        // Initial projection, before any lifecycle signal.
        inner.run_selector(true);
        debug!(name = %inner.name, id = inner.id, direct = direct_mode, "binding created");
        Ok(Self { inner })
    }

    /// Mount-completed lifecycle signal: connect lazily, catch up on state
    /// changes that raced the mount.
    pub fn on_mount_completed(&self) {
        let inner = &self.inner;
        if inner.phase.get() != Phase::Mounting {
            return;
        }
        inner.phase.set(Phase::Subscribed);
        if inner.subscribe_to_store {
            let node = inner.node.borrow().clone();
            if let Some(node) = node {
                node.try_connect();
            }
        }
        // Inputs have not changed since bind, so the state-identity skip
        // makes this a no-op unless a dispatch raced the mount.
        inner.run_selector(false);
        if inner.selector.borrow().should_update() {
            inner.host.request_render(inner.id);
        }
    }

    /// Fresh non-derived input from the host. Synchronous re-run; the host's
    /// already-pending render picks the result up.
    pub fn on_inputs_changed(&self, new_input: I) {
        let inner = &self.inner;
        if inner.phase.get() == Phase::Unmounted {
            return;
        }
        *inner.input.borrow_mut() = Rc::new(new_input);
        inner.run_selector(true);
    }

    /// Render-committed lifecycle signal: release a deferred child
    /// notification exactly once.
    pub fn on_render_committed(&self) {
        let inner = &self.inner;
        if inner.phase.get() == Phase::PendingNotify {
            inner.phase.set(Phase::Subscribed);
            inner.notify_children_now();
        }
    }

    /// Unmount lifecycle signal. Safe at any point, including mid-sweep from
    /// inside a notification callback; all further signals are no-ops.
    pub fn on_unmount(&self) {
        let inner = &self.inner;
        if inner.phase.get() == Phase::Unmounted {
            return;
        }
        inner.phase.set(Phase::Unmounted);
        if let Some(node) = inner.node.borrow_mut().take() {
            node.clear();
        }
        inner.selector.borrow().disable();
        inner.store.borrow_mut().take();
        debug!(name = %inner.name, id = inner.id, "binding unmounted");
    }

    /// Produce the projection for the host to render. Clears the pending
    /// update flag and re-raises a captured projection failure.
    pub fn render(&self) -> Result<Rc<O>> {
        let inner = &self.inner;
        inner.render_count.set(inner.render_count.get() + 1);
        let selector = inner.selector.borrow();
        selector.clear_should_update();
        selector.output()
    }

    /// The context this binding exposes to descendants.
    ///
    /// Direct-mode and non-subscribing bindings forward their inherited
    /// context unchanged; everyone else shadows it with their own node.
    #[must_use]
    pub fn child_context(&self) -> Option<TreeContext<S>> {
        let inner = &self.inner;
        if inner.direct_mode || !inner.subscribe_to_store {
            inner.inherited.clone()
        } else {
            let store = inner.store.borrow().clone()?;
            Some(TreeContext {
                store,
                subscription: inner.node.borrow().clone(),
            })
        }
    }

    /// Rebuild selector and subscription node if the process-wide version
    /// stamp moved past this binding (hot refresh). Child registrations are
    /// carried across the rebuild. Must not be called from a projection.
    pub fn refresh(&self) {
        self.inner.refresh();
    }

    #[must_use]
    pub fn id(&self) -> BindingId {
        self.inner.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.inner.phase.get()
    }

    /// Whether the subscription node currently holds an upstream
    /// registration.
    #[must_use]
    pub fn is_subscribed(&self) -> bool {
        self.inner
            .node
            .borrow()
            .as_ref()
            .is_some_and(|node| node.is_connected())
    }

    /// Whether the store came from an explicit override.
    #[must_use]
    pub fn is_direct(&self) -> bool {
        self.inner.direct_mode
    }

    /// This binding's own subscription node, if it subscribes at all.
    #[must_use]
    pub fn subscription(&self) -> Option<Rc<SubscriptionNode<S>>> {
        self.inner.node.borrow().clone()
    }

    /// Renders performed so far; diagnostic counterpart of the host's
    /// unnecessary-re-render watching.
    #[must_use]
    pub fn render_count(&self) -> u64 {
        self.inner.render_count.get()
    }

    /// Whether the most recent selector run demands a render.
    #[must_use]
    pub fn should_update(&self) -> bool {
        self.inner.selector.borrow().should_update()
    }
}

impl<S: Store + 'static, I: 'static, O: 'static> std::fmt::Debug for ConsumerBinding<S, I, O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsumerBinding")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .field("phase", &self.inner.phase.get())
            .field("direct", &self.inner.direct_mode)
            .finish()
    }
}

/// Object-safe surface a host drives, independent of store and projection
/// types.
pub trait HostBinding {
    fn id(&self) -> BindingId;
    fn name(&self) -> &str;
    /// Mount-completed signal.
    fn complete_mount(&self);
    /// Render then render-committed, as one host step. Surfaces a captured
    /// projection failure.
    fn commit_render(&self) -> Result<()>;
    /// Unmount signal.
    fn unmount(&self);
    fn phase(&self) -> Phase;
}

impl<S: Store + 'static, I: 'static, O: 'static> HostBinding for ConsumerBinding<S, I, O> {
    fn id(&self) -> BindingId {
        ConsumerBinding::id(self)
    }

    fn name(&self) -> &str {
        ConsumerBinding::name(self)
    }

    fn complete_mount(&self) {
        self.on_mount_completed();
    }

    fn commit_render(&self) -> Result<()> {
        self.render()?;
        self.on_render_committed();
        Ok(())
    }

    fn unmount(&self) {
        self.on_unmount();
    }

    fn phase(&self) -> Phase {
        ConsumerBinding::phase(self)
    }
}
