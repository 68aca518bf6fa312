//! Memoized selector: a projection with cached-result tracking, equality
//! based update suppression, and error capture.
//!
//! # Design
//!
//! [`MemoizedSelector`] wraps a fallible projection
//! `Fn(&State, &Input) -> Result<Rc<O>>` together with the store handle it
//! reads state from. A run stores the output (or the error) in a `RefCell`
//! cache; the cache borrow is released before user code executes, so a
//! projection that dispatches — and thereby triggers nested notification —
//! cannot poison the cache. A `running` flag makes a transitively re-entrant
//! run on the same instance a no-op.
//!
//! # Invariants
//!
//! 1. `should_update()` is true iff the most recent run produced an output
//!    not equal (under the configured output predicate) to the previous one,
//!    or failed. Runs never clear the flag; `clear_should_update()` (called
//!    at render) does.
//! 2. When inputs are unchanged and the state snapshot is identical under
//!    the state predicate, a run is a no-op (the projection is not invoked).
//! 3. A captured failure is re-raised by `output()` until the next
//!    successful run replaces it.
//! 4. After `disable()`, `run` is a no-op and `should_update()` is false
//!    forever — in-flight notifications arriving after teardown do nothing.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use cascade_core::{CascadeError, EqFn, Result, Store};
use tracing::warn;

/// A projection from (state, own input) to derived output.
///
/// Failures are returned, not panicked: the selector captures the error and
/// the binding re-raises it at render time.
pub type Projection<St, I, O> = Box<dyn Fn(&St, &I) -> Result<Rc<O>>>;

/// Wrap an infallible mapping function as a [`Projection`].
pub fn infallible<St, I, O>(map: impl Fn(&St, &I) -> O + 'static) -> Projection<St, I, O> {
    Box::new(move |state, input| Ok(Rc::new(map(state, input))))
}

struct SelectorCache<St, O> {
    /// State snapshot of the last run, for the unchanged short-circuit.
    state: Option<Rc<St>>,
    output: Option<Rc<O>>,
    error: Option<CascadeError>,
    should_update: bool,
}

/// A projection with memoized output and captured failures.
pub struct MemoizedSelector<S: Store, I: 'static, O: 'static> {
    store: Rc<S>,
    projection: Projection<S::State, I, O>,
    are_states_equal: EqFn<S::State>,
    are_outputs_equal: EqFn<O>,
    cache: RefCell<SelectorCache<S::State, O>>,
    running: Cell<bool>,
    disabled: Cell<bool>,
}

impl<S: Store, I: 'static, O: 'static> MemoizedSelector<S, I, O> {
    #[must_use]
    pub fn new(
        store: Rc<S>,
        projection: Projection<S::State, I, O>,
        are_states_equal: EqFn<S::State>,
        are_outputs_equal: EqFn<O>,
    ) -> Self {
        Self {
            store,
            projection,
            are_states_equal,
            are_outputs_equal,
            cache: RefCell::new(SelectorCache {
                state: None,
                output: None,
                error: None,
                should_update: false,
            }),
            running: Cell::new(false),
            disabled: Cell::new(false),
        }
    }

    /// Run the projection against the current state snapshot and `input`.
    ///
    /// `input_changed` tells the selector whether the caller's own input is
    /// fresh; when it is not and the state snapshot is unchanged under the
    /// state predicate, the projection is skipped entirely.
    pub fn run(&self, input: &I, input_changed: bool) {
        if self.disabled.get() {
            return;
        }
        if self.running.replace(true) {
            // Re-entrant run through a dispatching projection; the outer run
            // finishes with the state it started from.
            return;
        }

        let state = self.store.state();
        let skip = !input_changed && {
            let cache = self.cache.borrow();
            cache.error.is_none()
                && cache
                    .state
                    .as_ref()
                    .is_some_and(|prev| (self.are_states_equal)(prev, &state))
        };
        if skip {
            self.running.set(false);
            return;
        }

        // Borrow released: the projection is user code and may dispatch.
        let outcome = (self.projection)(&state, input);

        let mut cache = self.cache.borrow_mut();
        cache.state = Some(state);
        match outcome {
            Ok(next) => {
                let changed = cache.error.is_some()
                    || !cache
                        .output
                        .as_ref()
                        .is_some_and(|prev| (self.are_outputs_equal)(prev, &next));
                if changed {
                    cache.should_update = true;
                    cache.output = Some(next);
                    cache.error = None;
                }
            }
            Err(err) => {
                warn!(error = %err, "projection failed; captured for render");
                cache.should_update = true;
                cache.error = Some(err);
            }
        }
        drop(cache);
        self.running.set(false);
    }

    /// The current projection, re-raising a captured failure.
    pub fn output(&self) -> Result<Rc<O>> {
        let cache = self.cache.borrow();
        if let Some(err) = &cache.error {
            return Err(err.clone());
        }
        cache
            .output
            .clone()
            .ok_or_else(|| CascadeError::projection("selector has not produced an output"))
    }

    /// The captured failure of the most recent run, if any.
    #[must_use]
    pub fn error(&self) -> Option<CascadeError> {
        self.cache.borrow().error.clone()
    }

    #[must_use]
    pub fn should_update(&self) -> bool {
        !self.disabled.get() && self.cache.borrow().should_update
    }

    /// Consume the pending-update flag; called when the output is rendered.
    pub fn clear_should_update(&self) {
        self.cache.borrow_mut().should_update = false;
    }

    /// Make every further `run` a no-op that never reports an update.
    /// Irreversible; used at binding teardown.
    pub fn disable(&self) {
        self.disabled.set(true);
        self.cache.borrow_mut().should_update = false;
    }
}

impl<S: Store, I: 'static, O: 'static> std::fmt::Debug for MemoizedSelector<S, I, O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let cache = self.cache.borrow();
        f.debug_struct("MemoizedSelector")
            .field("has_output", &cache.output.is_some())
            .field("error", &cache.error)
            .field("should_update", &cache.should_update)
            .field("disabled", &self.disabled.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cascade_core::{ReducerStore, equality};
    use std::cell::Cell;

    type CounterStore = ReducerStore<i64, i64>;

    fn counter_store() -> Rc<CounterStore> {
        Rc::new(ReducerStore::new(0, |state, delta| {
            if delta == 0 {
                Rc::clone(state)
            } else {
                Rc::new(**state + delta)
            }
        }))
    }

    fn doubling_selector(
        store: &Rc<CounterStore>,
        runs: &Rc<Cell<u32>>,
    ) -> MemoizedSelector<CounterStore, (), i64> {
        let runs = Rc::clone(runs);
        MemoizedSelector::new(
            Rc::clone(store),
            Box::new(move |state: &i64, _: &()| {
                runs.set(runs.get() + 1);
                Ok(Rc::new(state * 2))
            }),
            equality::identity(),
            equality::identity(),
        )
    }

    #[test]
    fn first_run_reports_update() {
        let store = counter_store();
        let runs = Rc::new(Cell::new(0));
        let selector = doubling_selector(&store, &runs);

        assert!(!selector.should_update());
        selector.run(&(), true);
        assert!(selector.should_update());
        assert_eq!(*selector.output().unwrap(), 0);
    }

    #[test]
    fn unchanged_state_short_circuits_projection() {
        let store = counter_store();
        let runs = Rc::new(Cell::new(0));
        let selector = doubling_selector(&store, &runs);

        selector.run(&(), true);
        selector.clear_should_update();
        assert_eq!(runs.get(), 1);

        // Same snapshot, same input: projection not invoked.
        selector.run(&(), false);
        assert_eq!(runs.get(), 1);
        assert!(!selector.should_update());

        // Identity-preserving dispatch keeps the short-circuit.
        store.dispatch(0);
        selector.run(&(), false);
        assert_eq!(runs.get(), 1);

        // Real change recomputes.
        store.dispatch(3);
        selector.run(&(), false);
        assert_eq!(runs.get(), 2);
        assert!(selector.should_update());
        assert_eq!(*selector.output().unwrap(), 6);
    }

    #[test]
    fn fresh_input_bypasses_short_circuit() {
        let store = counter_store();
        let runs = Rc::new(Cell::new(0));
        let selector = doubling_selector(&store, &runs);
        selector.run(&(), true);
        selector.run(&(), true);
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn identity_equality_reports_change_on_fresh_allocations() {
        let store = counter_store();
        let selector: MemoizedSelector<CounterStore, (), i64> = MemoizedSelector::new(
            Rc::clone(&store),
            infallible(|state: &i64, _: &()| *state),
            equality::identity(),
            equality::identity(),
        );
        selector.run(&(), true);
        selector.clear_should_update();
        // Same value, new allocation: identity says "changed".
        selector.run(&(), true);
        assert!(selector.should_update());
    }

    #[test]
    fn shallow_equality_suppresses_equal_values() {
        let store = counter_store();
        let selector: MemoizedSelector<CounterStore, (), i64> = MemoizedSelector::new(
            Rc::clone(&store),
            infallible(|state: &i64, _: &()| *state),
            equality::identity(),
            equality::shallow(),
        );
        selector.run(&(), true);
        assert!(selector.should_update());
        selector.clear_should_update();

        selector.run(&(), true);
        assert!(!selector.should_update());
    }

    #[test]
    fn failure_is_captured_and_reraised_at_output() {
        let store = counter_store();
        let selector: MemoizedSelector<CounterStore, (), i64> = MemoizedSelector::new(
            Rc::clone(&store),
            Box::new(|state: &i64, _: &()| {
                if *state < 0 {
                    Err(CascadeError::projection("negative state"))
                } else {
                    Ok(Rc::new(*state))
                }
            }),
            equality::identity(),
            equality::identity(),
        );

        selector.run(&(), true);
        assert!(selector.error().is_none());

        store.dispatch(-1);
        selector.run(&(), false);
        assert!(selector.should_update(), "a failed run must force an update");
        let err = selector.output().unwrap_err();
        assert_eq!(err, CascadeError::projection("negative state"));

        // Recovery: a successful run clears the captured error and reports
        // an update even if the output value matches the pre-error one.
        store.dispatch(1);
        selector.run(&(), false);
        assert!(selector.error().is_none());
        assert_eq!(*selector.output().unwrap(), 0);
    }

    #[test]
    fn disabled_selector_never_updates() {
        let store = counter_store();
        let runs = Rc::new(Cell::new(0));
        let selector = doubling_selector(&store, &runs);
        selector.run(&(), true);
        selector.disable();

        assert!(!selector.should_update());
        store.dispatch(5);
        selector.run(&(), false);
        assert_eq!(runs.get(), 1, "disabled run must not invoke projection");
        assert!(!selector.should_update());

        // The last output remains readable.
        assert_eq!(*selector.output().unwrap(), 0);
    }

    #[test]
    fn reentrant_run_is_a_noop() {
        let store = counter_store();
        let selector: Rc<RefCell<Option<Rc<MemoizedSelector<CounterStore, (), i64>>>>> =
            Rc::new(RefCell::new(None));
        let selector_slot = Rc::clone(&selector);
        let depth = Rc::new(Cell::new(0u32));
        let depth_clone = Rc::clone(&depth);

        let built = Rc::new(MemoizedSelector::new(
            Rc::clone(&store),
            Box::new(move |state: &i64, _: &()| {
                depth_clone.set(depth_clone.get() + 1);
                if depth_clone.get() == 1
                    && let Some(inner) = selector_slot.borrow().clone()
                {
                    // Transitive re-entrancy: must return without recursing.
                    inner.run(&(), true);
                }
                Ok(Rc::new(*state))
            }),
            equality::identity(),
            equality::identity(),
        ));
        *selector.borrow_mut() = Some(Rc::clone(&built));

        built.run(&(), true);
        assert_eq!(depth.get(), 1);
        assert!(built.should_update());
    }

    #[test]
    fn output_before_any_run_is_an_error() {
        let store = counter_store();
        let runs = Rc::new(Cell::new(0));
        let selector = doubling_selector(&store, &runs);
        assert!(selector.output().is_err());
    }
}
