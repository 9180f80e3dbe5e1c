//! End-to-end checks across crates, against loopback listeners and an
//! in-process presentation server.

pub mod server;

#[cfg(test)]
mod control;
#[cfg(test)]
mod discovery;
#[cfg(test)]
mod session;
#[cfg(test)]
mod store;
