//! Shared event trace for ordering assertions.

use std::cell::RefCell;
use std::rc::Rc;

/// An append-only log of string events, cheap to clone into fixtures.
///
/// Events are plain `"name:kind"` strings; tests assert on the full sequence
/// when ordering matters and on counts when it does not.
#[derive(Clone, Default)]
pub struct TraceLog {
    events: Rc<RefCell<Vec<String>>>,
}

impl TraceLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, event: impl Into<String>) {
        self.events.borrow_mut().push(event.into());
    }

    /// The events recorded so far, oldest first.
    #[must_use]
    pub fn events(&self) -> Vec<String> {
        self.events.borrow().clone()
    }

    /// How many times `event` was recorded.
    #[must_use]
    pub fn count(&self, event: &str) -> usize {
        self.events.borrow().iter().filter(|e| *e == event).count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }
}

impl std::fmt::Debug for TraceLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.events.borrow().iter()).finish()
    }
}
