#![forbid(unsafe_code)]

//! Hierarchical change-propagation and memoized-projection engine.
//!
//! Consumers form a tree mirroring a UI component hierarchy. Each
//! tree-connected consumer owns a [`SubscriptionNode`] (its link upstream and
//! its children's registry) and a [`MemoizedSelector`] (its cached projection
//! of store state). A [`ConsumerBinding`] composes the two with the host
//! lifecycle and enforces strict top-down ordering: a store mutation reaches
//! a consumer exactly once, and an ancestor finishes its own selector run —
//! and, if its output changed, its render commit — before any descendant's
//! selector runs against the same mutation.
//!
//! # Architecture
//!
//! - [`node::SubscriptionNode`]: upstream connection (store or parent node,
//!   never both) plus a child listener registry. Receiving a notification and
//!   forwarding it downward are deliberately separate operations.
//! - [`selector::MemoizedSelector`]: wraps a fallible projection with cached
//!   output, equality-based update suppression, and error capture.
//! - [`binding::ConsumerBinding`]: the orchestrator state machine
//!   (`Unmounted → Mounting → Subscribed ⇄ PendingNotify → Unmounted`).
//!   Child notification after a changed output is deferred to the host's
//!   render-committed signal; an unchanged output forwards immediately.
//! - [`connector::Connector`]: the factory exposed upward — given a selector
//!   factory and options, yields bindings ready to instantiate at each tree
//!   position.
//! - [`context::TreeContext`] / [`context::Provider`]: what flows down the
//!   tree (store handle plus optional upstream subscription identity).
//!
//! # Invariants
//!
//! 1. Every consumer observes a store mutation at most once.
//! 2. Ancestor selector evaluation and (when changed) render commit complete
//!    before descendant selector evaluation for the same mutation.
//! 3. Unmounting at any point, including mid-sweep from inside a
//!    notification callback, never panics and never corrupts an in-progress
//!    notification pass.
//! 4. A non-committing mount never leaks a subscription: nodes connect
//!    lazily on the mount-completed signal.

pub mod binding;
pub mod connector;
pub mod context;
pub mod node;
pub mod selector;
pub mod version;

pub use binding::{BindingId, ConsumerBinding, Host, HostBinding, Phase};
pub use connector::{BindSite, ConnectOptions, Connector};
pub use context::{Provider, TreeContext};
pub use node::SubscriptionNode;
pub use selector::{MemoizedSelector, Projection, infallible};
