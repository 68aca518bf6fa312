//! Connector: the reusable factory a host registers once per consumer kind
//! and instantiates at each tree position.
//!
//! A [`Connector`] holds a selector factory plus [`ConnectOptions`]; calling
//! [`Connector::bind`] with a [`BindSite`] yields a
//! [`ConsumerBinding`](crate::ConsumerBinding) wired to whichever store that
//! site resolves. The factory receives a [`Dispatcher`] so projections can
//! close over dispatch without holding the store handle itself.

use std::rc::Rc;

use cascade_core::{Dispatcher, EqFn, Result, ShallowEq, Store, equality};
use tracing::debug;

use crate::binding::{ConsumerBinding, Host};
use crate::context::TreeContext;
use crate::selector::{MemoizedSelector, Projection};
use crate::version;

/// Per-connector behavior knobs.
pub struct ConnectOptions<St: ?Sized + 'static, O: ?Sized + 'static> {
    display_name: String,
    subscribe_to_store: bool,
    are_states_equal: EqFn<St>,
    are_outputs_equal: EqFn<O>,
}

impl<St: ?Sized + 'static, O: ?Sized + 'static> ConnectOptions<St, O> {
    /// Defaults: subscribes to the store, identity equality for both the
    /// state short-circuit and the output comparison.
    #[must_use]
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            subscribe_to_store: true,
            are_states_equal: equality::identity(),
            are_outputs_equal: equality::identity(),
        }
    }

    /// Whether bindings subscribe to change notifications at all. A
    /// non-subscribing binding projects only on mount and input changes, and
    /// forwards its inherited context untouched.
    #[must_use]
    pub fn subscribe_to_store(mut self, subscribe: bool) -> Self {
        self.subscribe_to_store = subscribe;
        self
    }

    /// Predicate for the unchanged-state short-circuit.
    #[must_use]
    pub fn state_equality(mut self, eq: EqFn<St>) -> Self {
        self.are_states_equal = eq;
        self
    }

    /// Predicate deciding whether a fresh output counts as a change.
    #[must_use]
    pub fn output_equality(mut self, eq: EqFn<O>) -> Self {
        self.are_outputs_equal = eq;
        self
    }

    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub(crate) fn subscribes_to_store(&self) -> bool {
        self.subscribe_to_store
    }
}

impl<St: ?Sized + 'static, O: ShallowEq + 'static> ConnectOptions<St, O> {
    /// Compare outputs field-wise instead of by identity, suppressing renders
    /// for freshly allocated outputs whose fields are shallow-equal.
    #[must_use]
    pub fn shallow_output_equality(self) -> Self {
        self.output_equality(equality::shallow())
    }
}

type SelectorFactory<S, I, O> = Box<
    dyn Fn(
        Dispatcher<S>,
        &ConnectOptions<<S as Store>::State, O>,
    ) -> Projection<<S as Store>::State, I, O>,
>;

/// Shared core behind every binding a connector produces.
pub(crate) struct ConnectorCore<S: Store + 'static, I: 'static, O: 'static> {
    factory: SelectorFactory<S, I, O>,
    pub(crate) options: ConnectOptions<S::State, O>,
    /// Version stamp at construction; bindings compare against
    /// [`version::current`] to detect staleness.
    pub(crate) version: u64,
}

impl<S: Store + 'static, I: 'static, O: 'static> ConnectorCore<S, I, O> {
    pub(crate) fn build_selector(&self, store: Rc<S>) -> MemoizedSelector<S, I, O> {
        let projection = (self.factory)(Dispatcher::new(Rc::clone(&store)), &self.options);
        MemoizedSelector::new(
            store,
            projection,
            Rc::clone(&self.options.are_states_equal),
            Rc::clone(&self.options.are_outputs_equal),
        )
    }
}

/// Factory for consumer bindings of one kind. Cheap to clone; all clones
/// share the same core and version stamp.
pub struct Connector<S: Store + 'static, I: 'static, O: 'static> {
    core: Rc<ConnectorCore<S, I, O>>,
}

impl<S: Store + 'static, I: 'static, O: 'static> Clone for Connector<S, I, O> {
    fn clone(&self) -> Self {
        Self {
            core: Rc::clone(&self.core),
        }
    }
}

impl<S: Store + 'static, I: 'static, O: 'static> Connector<S, I, O> {
    /// Build a connector from a selector factory. The factory runs once per
    /// binding (and again per binding on refresh), producing the projection
    /// that binding will memoize.
    #[must_use]
    pub fn new(
        factory: impl Fn(Dispatcher<S>, &ConnectOptions<S::State, O>) -> Projection<S::State, I, O>
        + 'static,
        options: ConnectOptions<S::State, O>,
    ) -> Self {
        let version = version::next();
        debug!(name = %options.display_name(), version, "connector created");
        Self {
            core: Rc::new(ConnectorCore {
                factory: Box::new(factory),
                options,
                version,
            }),
        }
    }

    /// Convenience constructor for a plain infallible state+input mapping.
    #[must_use]
    pub fn from_map(
        map: impl Fn(&S::State, &I) -> O + Clone + 'static,
        options: ConnectOptions<S::State, O>,
    ) -> Self {
        Self::new(
            move |_dispatcher, _options| crate::selector::infallible(map.clone()),
            options,
        )
    }

    /// Instantiate a binding at `site`. Fails when neither an override nor
    /// an inherited context supplies a store.
    pub fn bind(&self, site: BindSite<S>, initial_input: I) -> Result<ConsumerBinding<S, I, O>> {
        ConsumerBinding::bind(Rc::clone(&self.core), site, initial_input)
    }

    #[must_use]
    pub fn version(&self) -> u64 {
        self.core.version
    }

    #[must_use]
    pub fn options(&self) -> &ConnectOptions<S::State, O> {
        &self.core.options
    }
}

/// Where a binding is being instantiated: the context inherited from the
/// tree, an optional per-binding store override, and the host's render
/// scheduler.
pub struct BindSite<S: Store> {
    pub(crate) inherited: Option<TreeContext<S>>,
    pub(crate) store_override: Option<Rc<S>>,
    pub(crate) host: Rc<dyn Host>,
}

impl<S: Store> BindSite<S> {
    #[must_use]
    pub fn new(host: Rc<dyn Host>) -> Self {
        Self {
            inherited: None,
            store_override: None,
            host,
        }
    }

    /// Context flowing down from the nearest provider or subscribing
    /// ancestor.
    #[must_use]
    pub fn inherited(mut self, context: TreeContext<S>) -> Self {
        self.inherited = Some(context);
        self
    }

    /// Explicit store for this binding alone. Puts the binding in direct
    /// mode: it subscribes straight to this store and shadows nothing.
    #[must_use]
    pub fn store_override(mut self, store: Rc<S>) -> Self {
        self.store_override = Some(store);
        self
    }
}
