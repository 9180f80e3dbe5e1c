//! # Slidelink Core
//!
//! The engine behind the remote control:
//!
//! * **[`probe`]**: one bounded liveness check against one endpoint.
//! * **[`scanner`]**: concurrent, phased discovery across /24 segments.
//! * **[`session`]**: lifecycle of the WebSocket channel to the service.
//! * **[`timer`]**: the elapsed-timer reconciler (local vs remote authority).
//! * **[`control`]**: the façade the user interface talks to.
//!
//! Nothing here blocks the caller on network I/O and nothing panics across
//! the async boundary; failures surface as observer events.

pub mod control;
pub mod probe;
pub mod scanner;
pub mod session;
pub mod timer;
