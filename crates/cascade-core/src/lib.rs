#![forbid(unsafe_code)]

//! Core primitives for cascade: listener registry, store capability, equality
//! policies, and errors.
//!
//! Everything here is single-threaded by design: the engine built on top of
//! these primitives is synchronous callback dispatch, so shared ownership is
//! `Rc`/`RefCell`/`Cell`, never locks.

pub mod equality;
pub mod error;
pub mod listeners;
pub mod logging;
pub mod store;

pub use equality::{EqFn, ShallowEq};
pub use error::{CascadeError, Result};
pub use listeners::{Listener, ListenerRegistry, ListenerToken};
pub use store::{Dispatcher, ReducerStore, Store};

// No-op logging macro fallbacks when the `tracing` feature is disabled.
// With the feature on, `crate::logging` re-exports the real tracing macros.

#[cfg(not(feature = "tracing"))]
#[macro_export]
macro_rules! trace {
    ($($arg:tt)*) => {};
}

#[cfg(not(feature = "tracing"))]
#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => {};
}

#[cfg(not(feature = "tracing"))]
#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {};
}
