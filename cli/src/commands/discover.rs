use std::sync::Arc;
use std::time::{Duration, Instant};

use colored::*;
use slidelink_common::config::Config;
use slidelink_common::network::endpoint::Endpoint;
use slidelink_common::network::prefix::Ipv4Prefix;
use slidelink_common::network::target::{Target, to_target_set};
use slidelink_common::store::KeyValueStore;
use slidelink_common::{info, success, warn};
use slidelink_core::control::{RemoteControl, ScanEvent};
use slidelink_core::probe::Liveness;
use slidelink_core::scanner::{ScanConfig, ScanOutcome};
use tokio::sync::broadcast::error::RecvError;
use tracing::{Instrument, debug};

use crate::mprint;
use crate::terminal::input::InputHandle;
use crate::terminal::{colors, print, spinner};

const KEY_POLL: Duration = Duration::from_millis(100);

/// How a scan run by the terminal came to an end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Completed,
    TimedOut,
    /// Interrupted from the keyboard.
    Stopped,
}

pub struct ScanReport {
    pub found: Vec<Endpoint>,
    pub completion: Completion,
}

pub async fn discover(
    targets: Vec<Target>,
    cfg: &Config,
    store: Arc<dyn KeyValueStore>,
) -> anyhow::Result<()> {
    let mut control = RemoteControl::from_config(cfg, store);
    let scan_config = ScanConfig::from(cfg).with_targets(to_target_set(targets));

    if cfg.quiet == 0 {
        let prefixes = control.planned_prefixes(&scan_config);
        print::print_status(format!("Searching {}", describe_prefixes(&prefixes)));
    }

    let start_time = Instant::now();
    let report = run_scan(&mut control, scan_config, true).await;

    discovery_ends(report, start_time.elapsed(), cfg);
    Ok(())
}

/// Runs one scan behind the spinner and gathers what it found. With
/// `interruptible`, `q` stops the scan early.
pub async fn run_scan(
    control: &mut RemoteControl,
    config: ScanConfig,
    interruptible: bool,
) -> ScanReport {
    let span = spinner::discovery_span(interruptible.then_some("You can press 'q' to finish early"));
    watch_scan(control, config, interruptible, span.clone())
        .instrument(span)
        .await
}

async fn watch_scan(
    control: &mut RemoteControl,
    config: ScanConfig,
    interruptible: bool,
    span: tracing::Span,
) -> ScanReport {
    let mut events = control.subscribe_scan();
    let _scan = control.start_scan(config);

    let mut input = InputHandle::new();
    if interruptible {
        input.start();
    }
    let mut keys = tokio::time::interval(KEY_POLL);

    let mut phase = None;
    let mut found: Vec<Endpoint> = Vec::new();

    let completion = loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(ScanEvent::Phase(next)) => {
                    phase = Some(next);
                    debug!("scan phase {next:?}");
                }
                Ok(ScanEvent::LastKnown(endpoint, Liveness::Live)) => {
                    success!("Last known host {endpoint} answered");
                }
                Ok(ScanEvent::LastKnown(endpoint, Liveness::Dead)) => {
                    info!("Last known host {endpoint} did not answer, searching");
                }
                Ok(ScanEvent::Progress(percent)) => {
                    spinner::report_progress(&span, phase, percent, found.len());
                }
                Ok(ScanEvent::Found(endpoint)) => {
                    found.push(endpoint);
                    spinner::report_found(&span, endpoint, found.len());
                }
                Ok(ScanEvent::Finished(outcome)) => {
                    found = outcome.found().to_vec();
                    break match outcome {
                        ScanOutcome::Completed(_) => Completion::Completed,
                        ScanOutcome::TimedOut(_) => Completion::TimedOut,
                    };
                }
                Err(RecvError::Lagged(skipped)) => debug!("skipped {skipped} scan events"),
                Err(RecvError::Closed) => break Completion::Stopped,
            },
            _ = keys.tick() => {
                if input.should_interrupt() {
                    control.cancel_scan();
                    break Completion::Stopped;
                }
            }
        }
    };

    ScanReport { found, completion }
}

pub fn describe_prefixes(prefixes: &[Ipv4Prefix]) -> String {
    match prefixes {
        [] => "no segments".to_string(),
        _ => prefixes
            .iter()
            .map(|prefix| format!("{prefix}.0/24"))
            .collect::<Vec<String>>()
            .join(", "),
    }
}

fn discovery_ends(mut report: ScanReport, total_time: Duration, cfg: &Config) {
    match report.completion {
        Completion::TimedOut => warn!("Discovery hit its deadline; results may be incomplete"),
        Completion::Stopped => warn!("Discovery stopped early"),
        Completion::Completed => {}
    }

    if report.found.is_empty() {
        no_hosts_found(cfg);
        return;
    }

    if cfg.quiet > 0 {
        mprint!();
    }

    print::header("presentation hosts", cfg.quiet);
    report.found.sort();
    print_hosts(&report.found, cfg);
    print_summary(report.found.len(), total_time, cfg);
}

fn no_hosts_found(cfg: &Config) {
    print::header("zero hosts detected", cfg.quiet);
    print::no_results();
}

fn print_hosts(hosts: &[Endpoint], cfg: &Config) {
    for (idx, host) in hosts.iter().enumerate() {
        match cfg.quiet {
            2 => print::print(&host.to_string()),
            _ => print_host_tree(host, idx),
        }
        if cfg.quiet < 2 && idx + 1 != hosts.len() {
            mprint!();
        }
    }
}

fn print_host_tree(host: &Endpoint, idx: usize) {
    print::tree_head(idx, &host.addr.to_string());
    print::as_tree_one_level(vec![
        ("Port".to_string(), host.port.to_string().color(colors::PORT)),
        ("URL".to_string(), host.ws_url().color(colors::IPV4_ADDR)),
    ]);
}

fn print_summary(hosts_len: usize, total_time: Duration, cfg: &Config) {
    let noun = if hosts_len == 1 { "host" } else { "hosts" };
    let active_hosts: ColoredString = format!("{hosts_len} {noun}").bold().green();
    let total_time: ColoredString = format!("{:.2}s", total_time.as_secs_f64()).bold().yellow();
    let output: ColoredString =
        format!("Discovery Complete: {active_hosts} identified in {total_time}")
            .color(colors::TEXT_DEFAULT);

    match cfg.quiet {
        0 => {
            print::fat_separator();
            print::centerln(&output.to_string());
        }
        _ => {
            mprint!();
            success!("{}", output)
        }
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
