//! # Address Prefixes
//!
//! The scanner searches /24 segments only. An [`Ipv4Prefix`] holds the three
//! network octets of such a segment (e.g. `192.168.1`).

use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;

use pnet::ipnetwork::Ipv4Network;

/// Conventional private segments searched when nothing better is known.
pub const FALLBACK_PREFIXES: [Ipv4Prefix; 3] = [
    Ipv4Prefix([192, 168, 1]),
    Ipv4Prefix([192, 168, 0]),
    Ipv4Prefix([10, 0, 0]),
];

/// Usable host octets of a /24 (network and broadcast excluded).
pub const HOST_OCTETS: std::ops::RangeInclusive<u8> = 1..=254;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ipv4Prefix(pub [u8; 3]);

impl Ipv4Prefix {
    pub fn new(a: u8, b: u8, c: u8) -> Self {
        Self([a, b, c])
    }

    /// The /24 segment an address belongs to.
    pub fn of(addr: Ipv4Addr) -> Self {
        let [a, b, c, _] = addr.octets();
        Self([a, b, c])
    }

    /// Same as [`Ipv4Prefix::of`] but for any IP; IPv6 has no /24 segment.
    pub fn of_ip(addr: &IpAddr) -> Option<Self> {
        match addr {
            IpAddr::V4(v4) => Some(Self::of(*v4)),
            IpAddr::V6(_) => None,
        }
    }

    pub fn host(&self, octet: u8) -> Ipv4Addr {
        let [a, b, c] = self.0;
        Ipv4Addr::new(a, b, c, octet)
    }

    pub fn hosts(&self) -> impl Iterator<Item = Ipv4Addr> + '_ {
        HOST_OCTETS.map(move |octet| self.host(octet))
    }

    pub fn contains(&self, addr: Ipv4Addr) -> bool {
        Self::of(addr) == *self
    }
}

impl fmt::Display for Ipv4Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c] = self.0;
        write!(f, "{a}.{b}.{c}")
    }
}

impl FromStr for Ipv4Prefix {
    type Err = String;

    /// Parses `"10.0.0"`, `"10.0.0.x"` or a CIDR no wider than /24.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        if let Some(target) = parse_cidr(s)? {
            return Ok(target);
        }

        let head = s
            .strip_suffix(".x")
            .or_else(|| s.strip_suffix(".*"))
            .unwrap_or(s);

        let octets: Vec<u8> = head
            .split('.')
            .map(|octet| octet.parse::<u8>())
            .collect::<Result<Vec<u8>, _>>()
            .map_err(|e| format!("invalid prefix '{s}': {e}"))?;

        match octets.as_slice() {
            [a, b, c] => Ok(Self([*a, *b, *c])),
            _ => Err(format!("invalid prefix '{s}': expected three octets")),
        }
    }
}

fn parse_cidr(s: &str) -> Result<Option<Ipv4Prefix>, String> {
    let Some((ip_str, len_str)) = s.split_once('/') else {
        return Ok(None);
    };

    let ip = ip_str
        .parse::<Ipv4Addr>()
        .map_err(|e| format!("Invalid IP in CIDR '{ip_str}': {e}"))?;
    let len = len_str
        .parse::<u8>()
        .map_err(|e| format!("Invalid prefix in CIDR '{len_str}': {e}"))?;
    let network = Ipv4Network::new(ip, len).map_err(|e| e.to_string())?;

    if network.prefix() < 24 {
        return Err(format!("'{s}' spans more than one /24 segment"));
    }

    Ok(Some(Ipv4Prefix::of(network.network())))
}

/// Removes repeated prefixes while keeping the first occurrence's position.
pub fn dedup_ordered(prefixes: impl IntoIterator<Item = Ipv4Prefix>) -> Vec<Ipv4Prefix> {
    let mut seen = std::collections::HashSet::new();
    prefixes
        .into_iter()
        .filter(|prefix| seen.insert(*prefix))
        .collect()
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
