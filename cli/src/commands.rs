pub mod connect;
pub mod discover;
pub mod forget;
pub mod info;
pub mod send;

use std::net::IpAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::anyhow;
use clap::{ArgAction, Parser, Subcommand};
use slidelink_common::config::Config;
use slidelink_common::network::endpoint::{DEFAULT_PORT, Endpoint};
use slidelink_common::network::target::Target;
use slidelink_core::timer::TimerMode;

#[derive(Parser)]
#[command(name = "slidelink")]
#[command(about = "Remote control for a presentation running on the local network.")]
pub struct CommandLine {
    #[command(subcommand)]
    pub command: Commands,

    /// Port of the presentation service
    #[arg(long, global = true, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Limit for a single liveness probe, in milliseconds
    #[arg(long, global = true, value_name = "MS")]
    pub probe_timeout_ms: Option<u64>,

    /// Maximum number of probes in flight
    #[arg(long, global = true, value_name = "N")]
    pub max_in_flight: Option<usize>,

    /// Wall-clock budget for a whole scan, in seconds
    #[arg(long, global = true, value_name = "SECS")]
    pub scan_deadline_secs: Option<u64>,

    /// Interval between keep-alive pings, in seconds
    #[arg(long, global = true, value_name = "SECS")]
    pub keepalive_secs: Option<u64>,

    /// Where the last connected host is remembered
    #[arg(long, global = true, value_name = "PATH")]
    pub state_file: Option<PathBuf>,

    /// Require a WebSocket handshake for a host to count as found
    #[arg(long, global = true)]
    pub handshake_probe: bool,

    /// Less output; repeat for even less
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub quiet: u8,

    #[arg(long, global = true)]
    pub no_banner: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Search the local network for presentation hosts
    #[command(alias = "d")]
    Discover {
        /// Segment, host or `lan` to search; repeatable
        #[arg(short = 'p', long = "prefix", value_name = "TARGET")]
        targets: Vec<Target>,
    },
    /// Connect and control the presentation interactively
    #[command(alias = "c")]
    Connect {
        /// Host to connect to; discovered when omitted
        host: Option<String>,
        /// Where to search when no host is given
        #[arg(short = 'p', long = "prefix", value_name = "TARGET")]
        targets: Vec<Target>,
        /// Which side keeps the presentation timer
        #[arg(long, default_value_t = TimerMode::Local)]
        mode: TimerMode,
    },
    /// Send a single command and disconnect
    #[command(alias = "s")]
    Send {
        host: String,
        #[arg(required = true, num_args = 1.., trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },
    /// Forget the last connected host
    Forget,
    /// Show what is remembered and where a scan would look
    #[command(alias = "i")]
    Info,
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn config(&self) -> Config {
        let defaults = Config::default();
        Config {
            port: self.port,
            probe_timeout: self
                .probe_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.probe_timeout),
            max_in_flight: self.max_in_flight.unwrap_or(defaults.max_in_flight),
            scan_deadline: self
                .scan_deadline_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.scan_deadline),
            keepalive_interval: self
                .keepalive_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.keepalive_interval),
            connect_timeout: defaults.connect_timeout,
            state_file: self.state_file.clone().unwrap_or(defaults.state_file),
            handshake_probe: self.handshake_probe,
            quiet: self.quiet,
            no_banner: self.no_banner,
        }
    }
}

/// A bare address takes the configured port; `ip:port` keeps its own.
pub fn resolve_host(host: &str, port: u16) -> anyhow::Result<Endpoint> {
    if let Ok(addr) = host.trim().parse::<IpAddr>() {
        return Ok(Endpoint::new(addr, port));
    }
    Endpoint::from_str(host).map_err(|e| anyhow!("invalid host '{host}': {e}"))
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
