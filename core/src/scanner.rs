//! Discovery of the presentation service on the local network.
//!
//! A scan runs in up to three phases, strictly one after another:
//!
//! 1. **LastKnown**: the endpoint of the last successful session, if stored.
//!    A live answer ends the scan right there.
//! 2. **Common**: explicit hosts, then high-probability last octets in every
//!    target `/24`.
//! 3. **Sweep**: every remaining host octet of every target `/24`.
//!
//! Within a phase probes fan out on a [`JoinSet`], never more than
//! `max_in_flight` at once. The whole run sits under one wall-clock deadline;
//! running past it yields [`ScanOutcome::TimedOut`] with whatever was found.
//!
//! All observer calls pass through a gate. Cancelling closes the gate before
//! aborting the task, so once [`ScanHandle::cancel`] returns no further
//! `on_found`, `on_progress` or `on_complete` can arrive.

use std::collections::HashSet;
use std::net::IpAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use slidelink_common::config::{
    Config, DEFAULT_MAX_IN_FLIGHT, DEFAULT_PROBE_TIMEOUT, DEFAULT_SCAN_DEADLINE,
};
use slidelink_common::network::endpoint::{DEFAULT_PORT, Endpoint};
use slidelink_common::network::interface;
use slidelink_common::network::prefix::Ipv4Prefix;
use slidelink_common::network::target::TargetSet;
use slidelink_common::store::KeyValueStore;
use tokio::task::{AbortHandle, JoinHandle, JoinSet};
use tokio::time::{Instant, sleep_until};
use tracing::{debug, warn};

use crate::probe::{Liveness, Prober};

mod plan;
mod progress;

pub use plan::{ScanPlan, target_prefixes};
use progress::ProgressTracker;

/// Last octets tried before the full sweep, most likely first.
pub const COMMON_OCTETS: [u8; 8] = [1, 100, 101, 150, 200, 254, 2, 10];

#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Explicit `/24` segments, searched first.
    pub prefixes: Vec<Ipv4Prefix>,
    /// Explicit hosts, probed at the head of the common phase.
    pub hosts: Vec<IpAddr>,
    /// Add segments inferred from the attached networks and the store.
    pub derive_prefixes: bool,
    pub port: u16,
    pub probe_timeout: Duration,
    pub max_in_flight: usize,
    pub deadline: Duration,
    pub common_octets: Vec<u8>,
    /// Run the full sweep after the common phase.
    pub sweep: bool,
    /// Stop after the phase that produced the first live endpoint.
    pub first_match: bool,
    /// Probe the stored endpoint before anything else.
    pub use_last_known: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            prefixes: Vec::new(),
            hosts: Vec::new(),
            derive_prefixes: true,
            port: DEFAULT_PORT,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            deadline: DEFAULT_SCAN_DEADLINE,
            common_octets: COMMON_OCTETS.to_vec(),
            sweep: true,
            first_match: false,
            use_last_known: true,
        }
    }
}

impl From<&Config> for ScanConfig {
    fn from(config: &Config) -> Self {
        Self {
            port: config.port,
            probe_timeout: config.probe_timeout,
            max_in_flight: config.max_in_flight,
            deadline: config.scan_deadline,
            ..Self::default()
        }
    }
}

impl ScanConfig {
    pub fn with_targets(mut self, targets: TargetSet) -> Self {
        self.prefixes = targets.prefixes;
        self.hosts = targets.hosts;
        self.derive_prefixes = targets.derive;
        self
    }

    pub fn first_match(mut self, first_match: bool) -> Self {
        self.first_match = first_match;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    LastKnown,
    Common,
    Sweep,
}

impl Phase {
    fn index(self) -> usize {
        match self {
            Phase::LastKnown => 0,
            Phase::Common => 1,
            Phase::Sweep => 2,
        }
    }

    /// Share of the progress bar, before renormalisation.
    fn weight(self) -> u32 {
        match self {
            Phase::LastKnown => 5,
            Phase::Common => 15,
            Phase::Sweep => 80,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    Completed(Vec<Endpoint>),
    TimedOut(Vec<Endpoint>),
}

impl ScanOutcome {
    pub fn found(&self) -> &[Endpoint] {
        match self {
            ScanOutcome::Completed(found) | ScanOutcome::TimedOut(found) => found,
        }
    }

    pub fn timed_out(&self) -> bool {
        matches!(self, ScanOutcome::TimedOut(_))
    }
}

/// Receives the events of one scan, in order, from the scan task.
///
/// Callbacks run while the cancellation gate is held: they must not call
/// back into [`Scanner::cancel`] or [`ScanHandle::cancel`].
pub trait ScanObserver: Send + Sync {
    fn on_phase(&self, _phase: Phase) {}
    fn on_last_known(&self, _endpoint: Endpoint, _liveness: Liveness) {}
    fn on_progress(&self, percent: u8);
    fn on_found(&self, endpoint: Endpoint);
    fn on_complete(&self, outcome: &ScanOutcome);
}

/// Closed once, never reopened.
#[derive(Debug)]
struct Gate {
    open: Mutex<bool>,
}

impl Gate {
    fn new() -> Self {
        Self {
            open: Mutex::new(true),
        }
    }

    fn emit(&self, deliver: impl FnOnce()) -> bool {
        let open = self.open.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if *open {
            deliver();
        }
        *open
    }

    fn close(&self) {
        *self.open.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = false;
    }

    fn is_open(&self) -> bool {
        *self.open.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Supplies the segments of the currently attached networks.
pub type PrefixSource = Arc<dyn Fn() -> Vec<Ipv4Prefix> + Send + Sync>;

fn attached_prefixes() -> Vec<Ipv4Prefix> {
    interface::lan_prefixes().unwrap_or_else(|e| {
        warn!("could not inspect network interfaces: {e:#}");
        Vec::new()
    })
}

pub struct Scanner {
    prober: Arc<dyn Prober>,
    store: Arc<dyn KeyValueStore>,
    prefix_source: PrefixSource,
    current: Option<(Arc<Gate>, AbortHandle)>,
}

impl Scanner {
    pub fn new(prober: Arc<dyn Prober>, store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            prober,
            store,
            prefix_source: Arc::new(attached_prefixes),
            current: None,
        }
    }

    pub fn with_prefix_source(mut self, source: PrefixSource) -> Self {
        self.prefix_source = source;
        self
    }

    /// Segments a scan with `config` would visit, in order.
    pub fn planned_prefixes(&self, config: &ScanConfig) -> Vec<Ipv4Prefix> {
        let source = Arc::clone(&self.prefix_source);
        target_prefixes(config, || source(), plan::stored_prefix(self.store.as_ref()))
    }

    /// Starts a scan on the current runtime. A running scan is cancelled
    /// first; its observer hears nothing more.
    pub fn scan(&mut self, config: ScanConfig, observer: Arc<dyn ScanObserver>) -> ScanHandle {
        self.cancel();

        let gate = Arc::new(Gate::new());
        let run = ScanRun {
            prober: Arc::clone(&self.prober),
            store: Arc::clone(&self.store),
            prefix_source: Arc::clone(&self.prefix_source),
            observer,
            gate: Arc::clone(&gate),
            found: Vec::new(),
            seen: HashSet::new(),
        };
        let task = tokio::spawn(run.execute(config));

        self.current = Some((Arc::clone(&gate), task.abort_handle()));
        ScanHandle { gate, task }
    }

    pub fn cancel(&mut self) {
        if let Some((gate, abort)) = self.current.take() {
            gate.close();
            abort.abort();
        }
    }
}

impl Drop for Scanner {
    fn drop(&mut self) {
        self.cancel();
    }
}

pub struct ScanHandle {
    gate: Arc<Gate>,
    task: JoinHandle<ScanOutcome>,
}

impl ScanHandle {
    pub fn cancel(&self) {
        self.gate.close();
        self.task.abort();
    }

    /// The outcome, or `None` if the scan was cancelled.
    pub async fn wait(self) -> Option<ScanOutcome> {
        match self.task.await {
            Ok(outcome) if self.gate.is_open() => Some(outcome),
            _ => None,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

enum PhaseEnd {
    Drained,
    DeadlineHit,
    Cancelled,
}

struct ScanRun {
    prober: Arc<dyn Prober>,
    store: Arc<dyn KeyValueStore>,
    prefix_source: PrefixSource,
    observer: Arc<dyn ScanObserver>,
    gate: Arc<Gate>,
    found: Vec<Endpoint>,
    seen: HashSet<Endpoint>,
}

impl ScanRun {
    async fn execute(mut self, config: ScanConfig) -> ScanOutcome {
        let deadline = Instant::now() + config.deadline;
        let source = Arc::clone(&self.prefix_source);
        let plan = ScanPlan::build(&config, self.store.as_ref(), || source());
        let mut progress = ProgressTracker::new([
            usize::from(plan.last_known.is_some()),
            plan.common.len(),
            plan.sweep.len(),
        ]);

        let mut timed_out = false;

        if let Some(endpoint) = plan.last_known {
            self.emit(|o| o.on_phase(Phase::LastKnown));
            let prober = Arc::clone(&self.prober);
            let probed = tokio::select! {
                liveness = prober.probe(endpoint, config.probe_timeout) => Some(liveness),
                _ = sleep_until(deadline) => None,
            };

            match probed {
                Some(liveness) => {
                    debug!("last known endpoint {endpoint} is {liveness:?}");
                    self.emit(|o| o.on_last_known(endpoint, liveness));
                    self.record(endpoint, liveness);
                    if let Some(percent) = progress.advance(Phase::LastKnown) {
                        self.emit(|o| o.on_progress(percent));
                    }
                }
                None => timed_out = true,
            }
        }

        let short_circuit = !self.found.is_empty();
        let phases = [(Phase::Common, plan.common), (Phase::Sweep, plan.sweep)];

        for (phase, targets) in phases {
            if short_circuit || timed_out || targets.is_empty() {
                continue;
            }
            if config.first_match && !self.found.is_empty() {
                break;
            }

            self.emit(|o| o.on_phase(phase));
            match self
                .run_phase(phase, targets, &config, deadline, &mut progress)
                .await
            {
                PhaseEnd::Drained => {}
                PhaseEnd::DeadlineHit => timed_out = true,
                PhaseEnd::Cancelled => break,
            }
        }

        let found = std::mem::take(&mut self.found);
        let outcome = match timed_out {
            true => ScanOutcome::TimedOut(found),
            false => ScanOutcome::Completed(found),
        };
        debug!("scan finished: {outcome:?}");

        let percent = progress.finish();
        self.emit(|o| o.on_progress(percent));
        self.emit(|o| o.on_complete(&outcome));
        outcome
    }

    async fn run_phase(
        &mut self,
        phase: Phase,
        targets: Vec<Endpoint>,
        config: &ScanConfig,
        deadline: Instant,
        progress: &mut ProgressTracker,
    ) -> PhaseEnd {
        debug!("{phase:?} phase: {} endpoints", targets.len());

        let limit = config.max_in_flight.max(1);
        let mut pending = targets.into_iter();
        let mut in_flight: JoinSet<(Endpoint, Liveness)> = JoinSet::new();

        loop {
            while in_flight.len() < limit {
                if !self.gate.is_open() {
                    return PhaseEnd::Cancelled;
                }
                let Some(endpoint) = pending.next() else {
                    break;
                };
                let prober = Arc::clone(&self.prober);
                let timeout = config.probe_timeout;
                in_flight.spawn(async move { (endpoint, prober.probe(endpoint, timeout).await) });
            }

            if in_flight.is_empty() {
                return PhaseEnd::Drained;
            }

            tokio::select! {
                _ = sleep_until(deadline) => {
                    debug!("{phase:?} phase cut short by the deadline");
                    // Dropping the set aborts the probes still running.
                    return PhaseEnd::DeadlineHit;
                }
                Some(joined) = in_flight.join_next() => {
                    let Ok((endpoint, liveness)) = joined else {
                        continue;
                    };

                    self.record(endpoint, liveness);
                    if let Some(percent) = progress.advance(phase) {
                        self.emit(|o| o.on_progress(percent));
                    }
                }
            }
        }
    }

    /// Surfaces a live endpoint the first time it is seen.
    fn record(&mut self, endpoint: Endpoint, liveness: Liveness) {
        if liveness.is_live() && self.seen.insert(endpoint) {
            self.found.push(endpoint);
            self.emit(|o| o.on_found(endpoint));
        }
    }

    fn emit(&self, deliver: impl FnOnce(&dyn ScanObserver)) {
        let observer = self.observer.as_ref();
        self.gate.emit(|| deliver(observer));
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
