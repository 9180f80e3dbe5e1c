//! # Slidelink Common
//!
//! Models and helpers shared by every crate in the workspace.
//!
//! * **[`network`]**: endpoints, address prefixes and network-attachment inference.
//! * **[`store`]**: the flat key-value store used for "last known endpoint".
//! * **[`config`]**: runtime configuration assembled by the CLI.
//! * **[`log`]**: logging macros layered over `tracing`.

pub mod config;
pub mod log;
pub mod network;
pub mod store;
