use std::path::PathBuf;
use std::time::Duration;

use crate::network::endpoint::DEFAULT_PORT;

pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_millis(250);
pub const DEFAULT_MAX_IN_FLIGHT: usize = 24;
pub const DEFAULT_SCAN_DEADLINE: Duration = Duration::from_secs(25);
pub const DEFAULT_KEEPALIVE_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

const STATE_DIR: &str = "slidelink";
const STATE_FILE: &str = "state.json";

#[derive(Debug, Clone)]
pub struct Config {
    /// Remote port of the presentation service.
    pub port: u16,
    /// Hard limit for a single liveness probe.
    pub probe_timeout: Duration,
    /// Maximum number of probes in flight during one phase.
    pub max_in_flight: usize,
    /// Wall-clock budget for a whole scan.
    pub scan_deadline: Duration,
    /// Interval between keep-alive pings while a session is open.
    pub keepalive_interval: Duration,
    /// Limit for the WebSocket handshake when opening a session.
    pub connect_timeout: Duration,
    /// Location of the key-value state file.
    pub state_file: PathBuf,
    /// Probe with a full WebSocket handshake instead of a bare TCP connect.
    pub handshake_probe: bool,
    pub quiet: u8,
    pub no_banner: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            scan_deadline: DEFAULT_SCAN_DEADLINE,
            keepalive_interval: DEFAULT_KEEPALIVE_INTERVAL,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            state_file: default_state_file(),
            handshake_probe: false,
            quiet: 0,
            no_banner: false,
        }
    }
}

/// `$XDG_CONFIG_HOME/slidelink/state.json`, falling back to `$HOME/.config`.
pub fn default_state_file() -> PathBuf {
    let base: PathBuf = std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))
        .unwrap_or_else(|| PathBuf::from("."));

    base.join(STATE_DIR).join(STATE_FILE)
}
