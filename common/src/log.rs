//! Thin wrappers over `tracing` so every crate logs with the same targets.
//!
//! `success!` is rendered with its own glyph by the CLI formatter.

pub const SUCCESS_TARGET: &str = "slidelink::success";
pub const PRINT_TARGET: &str = "slidelink::print";

#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {
        ::tracing::info!($($arg)*)
    };
}

#[macro_export]
macro_rules! success {
    ($($arg:tt)*) => {
        ::tracing::info!(target: "slidelink::success", $($arg)*)
    };
}

#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {
        ::tracing::warn!($($arg)*)
    };
}

#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {
        ::tracing::error!($($arg)*)
    };
}
