//! Turns a [`ScanConfig`] plus stored state into the ordered probe lists of
//! each phase. Pure apart from reading the store.

use std::collections::HashSet;
use std::str::FromStr;

use slidelink_common::network::endpoint::Endpoint;
use slidelink_common::network::prefix::{FALLBACK_PREFIXES, HOST_OCTETS, Ipv4Prefix, dedup_ordered};
use slidelink_common::store::{KeyValueStore, LAST_ENDPOINT_KEY, LAST_PREFIX_KEY};
use tracing::debug;

use super::ScanConfig;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanPlan {
    pub last_known: Option<Endpoint>,
    pub prefixes: Vec<Ipv4Prefix>,
    pub common: Vec<Endpoint>,
    pub sweep: Vec<Endpoint>,
}

impl ScanPlan {
    pub fn build(
        config: &ScanConfig,
        store: &dyn KeyValueStore,
        inferred: impl FnOnce() -> Vec<Ipv4Prefix>,
    ) -> Self {
        let last_known = match config.use_last_known {
            true => stored_endpoint(store, config.port),
            false => None,
        };
        let prefixes = target_prefixes(config, inferred, stored_prefix(store));

        let mut seen: HashSet<Endpoint> = last_known.into_iter().collect();
        let mut admit = |endpoint: Endpoint| seen.insert(endpoint).then_some(endpoint);

        let mut common: Vec<Endpoint> = config
            .hosts
            .iter()
            .map(|ip| Endpoint::new(*ip, config.port))
            .filter_map(&mut admit)
            .collect();

        for prefix in &prefixes {
            for octet in &config.common_octets {
                if !HOST_OCTETS.contains(octet) {
                    continue;
                }
                let endpoint = Endpoint::new(prefix.host(*octet).into(), config.port);
                common.extend(admit(endpoint));
            }
        }

        let mut sweep = Vec::new();
        if config.sweep {
            for prefix in &prefixes {
                for host in prefix.hosts() {
                    sweep.extend(admit(Endpoint::new(host.into(), config.port)));
                }
            }
        }

        debug!(
            "scan plan: last known {:?}, {} prefixes, {} common, {} sweep",
            last_known,
            prefixes.len(),
            common.len(),
            sweep.len()
        );

        Self {
            last_known,
            prefixes,
            common,
            sweep,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.last_known.is_none() && self.common.is_empty() && self.sweep.is_empty()
    }
}

/// Explicit prefixes first; when deriving, the attached networks and then
/// the last successful segment. The conventional segments are used only
/// when nothing else is known.
pub fn target_prefixes(
    config: &ScanConfig,
    inferred: impl FnOnce() -> Vec<Ipv4Prefix>,
    stored: Option<Ipv4Prefix>,
) -> Vec<Ipv4Prefix> {
    let mut prefixes = config.prefixes.clone();

    if config.derive_prefixes {
        prefixes.extend(inferred());
        prefixes.extend(stored);
        if prefixes.is_empty() {
            prefixes.extend(FALLBACK_PREFIXES);
        }
    }

    dedup_ordered(prefixes)
}

/// The stored address, dialled on the configured port.
pub fn stored_endpoint(store: &dyn KeyValueStore, port: u16) -> Option<Endpoint> {
    let raw = store.get(LAST_ENDPOINT_KEY)?;
    match Endpoint::from_str(&raw) {
        Ok(endpoint) => Some(Endpoint::new(endpoint.addr, port)),
        Err(e) => {
            debug!("ignoring stored endpoint {raw:?}: {e}");
            None
        }
    }
}

pub fn stored_prefix(store: &dyn KeyValueStore) -> Option<Ipv4Prefix> {
    store
        .get(LAST_PREFIX_KEY)
        .and_then(|raw| Ipv4Prefix::from_str(&raw).ok())
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
