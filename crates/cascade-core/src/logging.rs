//! Feature-gated logging.
//!
//! With the `tracing` feature enabled this module re-exports the `tracing`
//! macros; without it, the crate root provides no-op `macro_rules!`
//! fallbacks under the same names. Call sites import one or the other:
//!
//! ```ignore
//! #[cfg(feature = "tracing")]
//! use crate::logging::debug;
//! #[cfg(not(feature = "tracing"))]
//! use crate::debug;
//! ```

#[cfg(feature = "tracing")]
pub use tracing::{debug, trace, warn};
