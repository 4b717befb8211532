//! Verbosity-aware tracing helpers.
//!
//! Lifecycle diagnostics are emitted at a level chosen at runtime from the
//! session's `verbose` flag: `INFO` when verbose, `TRACE` otherwise. Errors
//! and malformed input are logged at fixed levels elsewhere.

use tracing::Level;

/// Emit a tracing event at a dynamically selected level.
///
/// Each branch calls the corresponding `tracing::<level>!` macro so the
/// callsite metadata stays static while the branch selection is dynamic.
macro_rules! dynamic_event {
    ($level:expr, $($arg:tt)+) => {
        match $level {
            ::tracing::Level::ERROR => ::tracing::error!($($arg)+),
            ::tracing::Level::WARN => ::tracing::warn!($($arg)+),
            ::tracing::Level::INFO => ::tracing::info!($($arg)+),
            ::tracing::Level::DEBUG => ::tracing::debug!($($arg)+),
            ::tracing::Level::TRACE => ::tracing::trace!($($arg)+),
        }
    };
}

pub(crate) use dynamic_event;

/// Level used for lifecycle diagnostics.
#[must_use]
pub(crate) const fn diagnostic_level(verbose: bool) -> Level {
    if verbose { Level::INFO } else { Level::TRACE }
}
