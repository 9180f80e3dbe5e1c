use std::io::BufRead;
use std::str::FromStr;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, bail};
use colored::*;
use slidelink_common::config::Config;
use slidelink_common::network::endpoint::Endpoint;
use slidelink_common::network::target::{Target, to_target_set};
use slidelink_common::store::KeyValueStore;
use slidelink_common::{error, info, success, warn};
use slidelink_core::control::{ConnectionEvent, RemoteControl};
use slidelink_core::scanner::ScanConfig;
use slidelink_core::session::SessionState;
use slidelink_core::timer::TimerMode;
use slidelink_protocols::command::Command;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;
use tokio::time::timeout;

use crate::commands::discover;
use crate::commands::resolve_host;
use crate::terminal::colors;
use crate::terminal::print::{self, GLOBAL_KEY_WIDTH};

/// Extra wait on top of the connect timeout before giving up on the driver.
const OPEN_GRACE: Duration = Duration::from_secs(1);
const CLOSE_WAIT: Duration = Duration::from_secs(3);

const HELP: &[(&str, &str)] = &[
    ("next, prev", "move one slide"),
    ("goto N", "jump to slide N"),
    ("skip N", "skip N slides, negative goes back"),
    ("start, end", "start or end the presentation"),
    ("blank", "blank the screen"),
    ("timer start", "start, stop or reset the timer"),
    ("mode M", "keep the timer local or remote"),
    ("status", "show timer and connection"),
    ("quit", "disconnect and exit"),
];

/// One line typed at the prompt.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplInput {
    Send(Command),
    Mode(TimerMode),
    Status,
    Help,
    Quit,
    Empty,
}

impl FromStr for ReplInput {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let mut words = line.split_whitespace();
        let head = words.next().map(str::to_ascii_lowercase);

        match (head.as_deref(), words.next(), words.next()) {
            (None, _, _) => Ok(ReplInput::Empty),
            (Some("quit" | "exit" | "q"), None, _) => Ok(ReplInput::Quit),
            (Some("help" | "?"), None, _) => Ok(ReplInput::Help),
            (Some("status"), None, _) => Ok(ReplInput::Status),
            (Some("mode"), Some(mode), None) => mode.parse().map(ReplInput::Mode),
            (Some("mode"), _, _) => Err("usage: mode local|remote".to_string()),
            _ => Command::from_str(line)
                .map(ReplInput::Send)
                .map_err(|e| e.to_string()),
        }
    }
}

pub async fn connect(
    host: Option<String>,
    targets: Vec<Target>,
    mode: TimerMode,
    cfg: &Config,
    store: Arc<dyn KeyValueStore>,
) -> anyhow::Result<()> {
    let mut control = RemoteControl::from_config(cfg, store);
    control.timer().set_mode(mode);

    let endpoint = match host {
        Some(host) => resolve_host(&host, cfg.port)?,
        None => first_host(&mut control, targets, cfg).await?,
    };

    open_session(&mut control, endpoint, cfg).await?;
    repl(&control, cfg).await;
    close_session(&mut control).await;
    Ok(())
}

async fn first_host(
    control: &mut RemoteControl,
    targets: Vec<Target>,
    cfg: &Config,
) -> anyhow::Result<Endpoint> {
    let config = ScanConfig::from(cfg)
        .with_targets(to_target_set(targets))
        .first_match(true);
    let report = discover::run_scan(control, config, false).await;

    report
        .found
        .first()
        .copied()
        .ok_or_else(|| anyhow!("no presentation host answered, pass one explicitly"))
}

/// Connects and waits until the session is open or has failed.
pub async fn open_session(
    control: &mut RemoteControl,
    endpoint: Endpoint,
    cfg: &Config,
) -> anyhow::Result<()> {
    let mut events = control.subscribe_connection();
    control.connect(endpoint);
    if cfg.quiet == 0 {
        print::print_status(format!("Connecting to {}", endpoint.ws_url()));
    }

    let opened = timeout(cfg.connect_timeout + OPEN_GRACE, async {
        loop {
            match events.recv().await {
                Ok(ConnectionEvent::Opened(endpoint)) => return Ok(endpoint),
                Ok(ConnectionEvent::Error(cause)) => return Err(anyhow!(cause)),
                Ok(ConnectionEvent::Closed) => return Err(anyhow!("connection closed")),
                Ok(_) | Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => return Err(anyhow!("connection closed")),
            }
        }
    })
    .await;

    match opened {
        Ok(Ok(endpoint)) => {
            success!("Connected to {}", endpoint.to_string().color(colors::IPV4_ADDR));
            Ok(())
        }
        Ok(Err(cause)) => Err(cause.context(format!("could not connect to {endpoint}"))),
        Err(_) => {
            control.disconnect();
            bail!("could not connect to {endpoint}: no answer")
        }
    }
}

/// Disconnects and waits for the driver to finish the close handshake.
pub async fn close_session(control: &mut RemoteControl) {
    let mut state = control.subscribe_session_state();
    control.disconnect();

    let settled = state.wait_for(|state| !state.is_active() && *state != SessionState::Closing);
    if timeout(CLOSE_WAIT, settled).await.is_err() {
        warn!("Connection did not close cleanly");
    }
}

/// Reads stdin on its own thread so a pending read never holds up exit.
fn spawn_line_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

async fn repl(control: &RemoteControl, cfg: &Config) {
    if cfg.quiet == 0 {
        print::print_status("Type a command, 'help' for the list, 'quit' to exit");
    }

    let mut lines = spawn_line_reader();
    let mut connection = control.subscribe_connection();

    loop {
        tokio::select! {
            line = lines.recv() => {
                let Some(line) = line else { break };
                match line.parse::<ReplInput>() {
                    Ok(ReplInput::Quit) => break,
                    Ok(ReplInput::Empty) => {}
                    Ok(ReplInput::Help) => print_help(),
                    Ok(ReplInput::Status) => print_state(control),
                    Ok(ReplInput::Mode(mode)) => {
                        control.timer().set_mode(mode);
                        info!("Timer mode is now {mode}");
                    }
                    Ok(ReplInput::Send(command)) => match control.send_command(&command) {
                        true => info!("Sent {command}"),
                        false => warn!("Not connected, {command} was dropped"),
                    },
                    Err(e) => warn!("{e}"),
                }
            }
            event = connection.recv() => match event {
                Ok(ConnectionEvent::Status(text)) => print::print_status(text),
                Ok(ConnectionEvent::Error(cause)) => error!("{cause}"),
                Ok(ConnectionEvent::Closed) => {
                    warn!("Connection closed by the host");
                    break;
                }
                Ok(_) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => break,
            }
        }
    }
}

fn print_help() {
    GLOBAL_KEY_WIDTH.set(HELP.iter().map(|(key, _)| key.len()).max().unwrap_or(0));
    for (key, what) in HELP {
        print::aligned_line(key, *what);
    }
}

fn print_state(control: &RemoteControl) {
    let snapshot = control.timer().snapshot();
    let running = match snapshot.running {
        true => "running".green(),
        false => "stopped".yellow(),
    };

    GLOBAL_KEY_WIDTH.set(10);
    print::aligned_line("Connection", control.session_state().to_string());
    print::aligned_line("Timer", snapshot.elapsed.color(colors::TIMER));
    print::aligned_line("Clock", running);
    print::aligned_line("Mode", snapshot.source.to_string());
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_words_are_recognised() {
        assert_eq!("quit".parse::<ReplInput>(), Ok(ReplInput::Quit));
        assert_eq!(" EXIT ".parse::<ReplInput>(), Ok(ReplInput::Quit));
        assert_eq!("status".parse::<ReplInput>(), Ok(ReplInput::Status));
        assert_eq!("?".parse::<ReplInput>(), Ok(ReplInput::Help));
        assert_eq!("   ".parse::<ReplInput>(), Ok(ReplInput::Empty));
    }

    #[test]
    fn mode_switch_needs_a_known_mode() {
        assert_eq!("mode remote".parse::<ReplInput>(), Ok(ReplInput::Mode(TimerMode::Remote)));
        assert_eq!("mode LOCAL".parse::<ReplInput>(), Ok(ReplInput::Mode(TimerMode::Local)));
        assert!("mode sideways".parse::<ReplInput>().is_err());
        assert!("mode".parse::<ReplInput>().is_err());
    }

    #[test]
    fn everything_else_is_a_command() {
        assert_eq!("next".parse::<ReplInput>(), Ok(ReplInput::Send(Command::NextSlide)));
        assert_eq!("goto 4".parse::<ReplInput>(), Ok(ReplInput::Send(Command::GotoSlide(4))));
        assert_eq!(
            "timer reset".parse::<ReplInput>(),
            Ok(ReplInput::Send(Command::TimerReset))
        );
        assert!("goto zero".parse::<ReplInput>().is_err());
    }
}
