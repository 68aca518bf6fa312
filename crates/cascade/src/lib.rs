#![forbid(unsafe_code)]

//! Cascade public facade crate.
//!
//! This crate provides the stable, ergonomic surface area for users.

pub mod prelude {
    pub use cascade_connect as connect;
    pub use cascade_core as core;

    pub use cascade_connect::{
        BindSite, BindingId, ConnectOptions, Connector, ConsumerBinding, Host, HostBinding,
        MemoizedSelector, Phase, Provider, SubscriptionNode, TreeContext, infallible,
    };
    pub use cascade_core::{
        CascadeError, Dispatcher, EqFn, Listener, ListenerRegistry, ListenerToken, ReducerStore,
        Result, ShallowEq, Store, equality,
    };
}
