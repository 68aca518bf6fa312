//! Error types for the cascade engine.
//!
//! Only two conditions are errors here. Everything else the engine can hit
//! mid-sweep (double disconnect, stale unsubscribe token, redundant connect)
//! is a defined no-op, because mid-sweep teardown is a normal interleaving.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CascadeError>;

/// Failures surfaced by the engine.
///
/// `Clone` is required because a captured projection failure is held in the
/// selector cache and re-raised every time the output is consumed until the
/// next successful run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CascadeError {
    /// The projection function failed during a selector run.
    ///
    /// Captured at run time, re-raised at render time so the host observes
    /// it at a natural consumption point rather than inside a notification
    /// sweep.
    #[error("projection failed: {detail}")]
    Projection { detail: String },

    /// A consumer reached a bind site with no resolvable store: neither an
    /// explicit override nor an inherited tree context provided one.
    ///
    /// Fatal configuration error, reported immediately at bind time.
    #[error(
        "no store reachable at this bind site: pass a store override or mount under a provider"
    )]
    MissingStore,
}

impl CascadeError {
    /// Build a projection failure from any displayable detail.
    #[must_use]
    pub fn projection(detail: impl Into<String>) -> Self {
        Self::Projection {
            detail: detail.into(),
        }
    }
}
