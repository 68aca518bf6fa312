//! Process-wide version stamp for hot refresh.
//!
//! Creating a [`Connector`](crate::Connector) issues a fresh version. A live
//! binding compares its own stamp against [`current`] in
//! [`refresh`](crate::ConsumerBinding::refresh) and rebuilds its selector and
//! subscription node on mismatch. Host reload tooling may also call [`bump`]
//! directly to force staleness.
//!
//! A single explicit global with reset-on-test semantics, not hidden state.

use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_VERSION: AtomicU64 = AtomicU64::new(1);

/// Issue the next version stamp.
pub(crate) fn next() -> u64 {
    NEXT_VERSION.fetch_add(1, Ordering::Relaxed)
}

/// The most recently issued version, or 0 if none has been issued.
#[must_use]
pub fn current() -> u64 {
    NEXT_VERSION.load(Ordering::Relaxed).saturating_sub(1)
}

/// Force staleness of every live binding, as reload tooling does after
/// swapping code. Returns the new current version.
pub fn bump() -> u64 {
    next()
}

/// Reset the counter. Test-only semantics: callers own the race with any
/// other test touching versions in the same process.
pub fn reset_for_tests() {
    NEXT_VERSION.store(1, Ordering::Relaxed);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn versions_are_monotonic() {
        let a = next();
        let b = next();
        assert!(b > a);
        assert!(current() >= b);
    }

    #[test]
    fn bump_advances_current() {
        let before = current();
        let issued = bump();
        assert!(issued > before);
        assert_eq!(current(), issued);
    }
}
