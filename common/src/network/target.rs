//! # Scan Target Model
//!
//! Defines what a discovery run should search.
//!
//! A target can be:
//! * The local network, derived from the device's attachments (`lan`).
//! * A /24 segment (e.g., `192.168.1`, `192.168.1.x`, `192.168.1.0/24`).
//! * A single host (e.g., `192.168.1.5`).
//! * A comma-separated mix of the above.

use std::net::IpAddr;
use std::str::FromStr;

use crate::network::prefix::{self, Ipv4Prefix};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Target {
    /// Let the scanner derive segments from the current network attachment.
    LAN,
    /// Sweep one /24 segment.
    Segment { prefix: Ipv4Prefix },
    /// Probe a single host only.
    Host { target_addr: IpAddr },
    /// Holds a list of different targets
    Multi { targets: Vec<Target> },
}

/// What a list of targets resolves to once flattened.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TargetSet {
    /// Segments to sweep, in priority order.
    pub prefixes: Vec<Ipv4Prefix>,
    /// Individual hosts to probe alongside the common addresses.
    pub hosts: Vec<IpAddr>,
    /// Whether segments should also be derived automatically.
    pub derive: bool,
}

impl FromStr for Target {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        if s.eq_ignore_ascii_case("lan") || s.eq_ignore_ascii_case("auto") {
            return Ok(Target::LAN);
        }

        if s.contains(',') {
            return parse_commas(s);
        }

        if let Ok(target_addr) = s.parse::<IpAddr>() {
            return Ok(Target::Host { target_addr });
        }

        s.parse::<Ipv4Prefix>()
            .map(|prefix| Target::Segment { prefix })
            .map_err(|e| format!("invalid target: {e}"))
    }
}

/// Parses a comma-separated list of targets (e.g., "10.0.0.5, 192.168.1, lan").
fn parse_commas(s: &str) -> Result<Target, String> {
    let mut targets = Vec::new();

    for part in s.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }

        let target = Target::from_str(part)
            .map_err(|e| format!("Failed to parse target '{part}': {e}"))?;
        targets.push(target);
    }

    Ok(Target::Multi { targets })
}

fn resolve_target(target: Target, set: &mut TargetSet) {
    match target {
        Target::LAN => set.derive = true,
        Target::Segment { prefix } => set.prefixes.push(prefix),
        Target::Host { target_addr } => {
            if !set.hosts.contains(&target_addr) {
                set.hosts.push(target_addr);
            }
        }
        Target::Multi { targets } => {
            for target in targets {
                resolve_target(target, set);
            }
        }
    }
}

/// Flattens targets into a [`TargetSet`]. No targets at all means `lan`.
pub fn to_target_set(targets: impl IntoIterator<Item = Target>) -> TargetSet {
    let mut set = TargetSet::default();
    let mut any = false;

    for target in targets {
        any = true;
        resolve_target(target, &mut set);
    }

    if !any {
        set.derive = true;
    }
    set.prefixes = prefix::dedup_ordered(set.prefixes);
    set
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
