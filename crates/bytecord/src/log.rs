//! Logging shim.
//!
//! With the `tracing` feature enabled the macros below are the ones from the
//! `tracing` crate; without it they expand to nothing, so call sites cost
//! nothing at runtime.

#[cfg(feature = "tracing")]
pub(crate) use tracing::{debug, trace};

#[cfg(not(feature = "tracing"))]
macro_rules! debug {
    ($($arg:tt)*) => {};
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace {
    ($($arg:tt)*) => {};
}

#[cfg(not(feature = "tracing"))]
pub(crate) use {debug, trace};
