//! Reference store and connectors used across the e2e suites.

use std::rc::Rc;

use cascade_connect::{ConnectOptions, Connector, infallible};
use cascade_core::{CascadeError, ReducerStore};

use crate::trace::TraceLog;

/// Two independent fields so a mutation can change one projection's slice
/// while leaving another's untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterState {
    pub value: i64,
    pub label: String,
}

#[derive(Debug, Clone)]
pub enum CounterAction {
    Add(i64),
    Relabel(String),
    /// Reducer returns the same snapshot handle: identity is preserved.
    Noop,
}

pub type CounterStore = ReducerStore<CounterState, CounterAction>;

#[must_use]
pub fn counter_store() -> Rc<CounterStore> {
    Rc::new(ReducerStore::new(
        CounterState {
            value: 0,
            label: "idle".to_owned(),
        },
        |state, action| match action {
            CounterAction::Add(n) => Rc::new(CounterState {
                value: state.value + n,
                label: state.label.clone(),
            }),
            CounterAction::Relabel(label) => Rc::new(CounterState {
                value: state.value,
                label,
            }),
            CounterAction::Noop => Rc::clone(state),
        },
    ))
}

/// Connector projecting `value`, recording `"{name}:run"` per projection
/// invocation. Identity output equality: every real run counts as a change.
#[must_use]
pub fn value_connector(name: &str, trace: &TraceLog) -> Connector<CounterStore, (), i64> {
    let trace = trace.clone();
    let run_event = format!("{name}:run");
    Connector::new(
        move |_dispatcher, _options| {
            let trace = trace.clone();
            let run_event = run_event.clone();
            infallible(move |state: &CounterState, _: &()| {
                trace.record(run_event.clone());
                state.value
            })
        },
        ConnectOptions::new(name),
    )
}

/// Connector projecting `label` under shallow output equality: a run whose
/// label is unchanged does not count as a change.
#[must_use]
pub fn label_connector(name: &str, trace: &TraceLog) -> Connector<CounterStore, (), String> {
    let trace = trace.clone();
    let run_event = format!("{name}:run");
    Connector::new(
        move |_dispatcher, _options| {
            let trace = trace.clone();
            let run_event = run_event.clone();
            infallible(move |state: &CounterState, _: &()| {
                trace.record(run_event.clone());
                state.label.clone()
            })
        },
        ConnectOptions::new(name).shallow_output_equality(),
    )
}

/// Connector whose projection fails on negative values.
#[must_use]
pub fn fallible_connector(name: &str, trace: &TraceLog) -> Connector<CounterStore, (), i64> {
    let trace = trace.clone();
    let run_event = format!("{name}:run");
    Connector::new(
        move |_dispatcher, _options| {
            let trace = trace.clone();
            let run_event = run_event.clone();
            Box::new(move |state: &CounterState, _: &()| {
                trace.record(run_event.clone());
                if state.value < 0 {
                    Err(CascadeError::projection("value went negative"))
                } else {
                    Ok(Rc::new(state.value))
                }
            })
        },
        ConnectOptions::new(name),
    )
}
