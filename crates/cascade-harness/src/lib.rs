#![forbid(unsafe_code)]

//! Test harness for the cascade engine: a scripted host, an event trace, and
//! reference fixtures.
//!
//! The engine itself is host-agnostic; nothing in `cascade-connect` schedules
//! renders. [`host::Stage`] plays the host role for tests: it queues render
//! requests and drains them in arrival order, driving the render and
//! render-committed signals the way a real UI scheduler would. Fixtures
//! record selector runs into a shared [`trace::TraceLog`] so tests assert on
//! the exact order of runs and renders across a consumer tree.

pub mod fixtures;
pub mod host;
pub mod trace;

pub use fixtures::{CounterAction, CounterState, CounterStore};
pub use host::{Stage, TestHost};
pub use trace::TraceLog;
