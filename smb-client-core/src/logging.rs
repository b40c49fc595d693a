//! Logging facade for the client crates.
//!
//! With the `tracing` feature on, the level macros come straight from
//! the `tracing` crate. Without it, they expand to unit so call sites
//! stay unchanged and the dependency drops out entirely.

#[cfg(feature = "tracing")]
pub use tracing::{debug, error, info, trace, warn};

#[cfg(not(feature = "tracing"))]
#[macro_export]
macro_rules! trace {
    ($($t:tt)*) => {()};
}

#[cfg(not(feature = "tracing"))]
#[macro_export]
macro_rules! debug {
    ($($t:tt)*) => {()};
}

#[cfg(not(feature = "tracing"))]
#[macro_export]
macro_rules! info {
    ($($t:tt)*) => {()};
}

#[cfg(not(feature = "tracing"))]
#[macro_export]
macro_rules! warn {
    ($($t:tt)*) => {()};
}

#[cfg(not(feature = "tracing"))]
#[macro_export]
macro_rules! error {
    ($($t:tt)*) => {()};
}

#[cfg(not(feature = "tracing"))]
pub use crate::{debug, error, info, trace, warn};

#[cfg(test)]
mod tests {
    #[test]
    fn level_macros_accept_format_args() {
        super::trace!("negotiating");
        super::debug!("connected to {}", "host");
        super::warn!("retry {} of {}", 1, 3);
    }
}
