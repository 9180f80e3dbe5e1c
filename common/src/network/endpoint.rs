//! # Endpoint Model
//!
//! An [`Endpoint`] is the address and port of the presentation-control service.
//! The port is fixed by the service, so most callers only ever supply an IP.

use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

/// Port the presentation service listens on.
pub const DEFAULT_PORT: u16 = 10696;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Endpoint {
    pub addr: IpAddr,
    pub port: u16,
}

impl Endpoint {
    pub fn new(addr: IpAddr, port: u16) -> Self {
        Self { addr, port }
    }

    /// An endpoint on the default service port.
    pub fn with_default_port(addr: IpAddr) -> Self {
        Self::new(addr, DEFAULT_PORT)
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.addr, self.port)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}", self.socket_addr())
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.socket_addr())
    }
}

impl From<SocketAddr> for Endpoint {
    fn from(addr: SocketAddr) -> Self {
        Self::new(addr.ip(), addr.port())
    }
}

impl FromStr for Endpoint {
    type Err = String;

    /// Parses `"ip"` (default port) or `"ip:port"` / `"[v6]:port"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let s = s.strip_prefix("ws://").unwrap_or(s);

        if let Ok(addr) = s.parse::<IpAddr>() {
            return Ok(Self::with_default_port(addr));
        }

        s.parse::<SocketAddr>()
            .map(Self::from)
            .map_err(|e| format!("invalid endpoint '{s}': {e}"))
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
