//! Presentation timer.
//!
//! Exactly one authority drives the snapshot at a time:
//!
//! * [`TimerMode::Local`]: a once-per-second ticker measures wall-clock time
//!   between `start` and `stop`. Server reports are ignored.
//! * [`TimerMode::Remote`]: server status lines and timer objects set the
//!   snapshot. Local controls are ignored.
//!
//! Switching modes throws away the accumulated time of the mode being left;
//! the new mode starts stopped at `00:00:00`.

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use slidelink_protocols::{TimerPayload, TimerStatus, format_hms};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::debug;

const TICK: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimerMode {
    #[default]
    Local,
    Remote,
}

impl fmt::Display for TimerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimerMode::Local => f.write_str("local"),
            TimerMode::Remote => f.write_str("remote"),
        }
    }
}

impl FromStr for TimerMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(TimerMode::Local),
            "remote" | "server" => Ok(TimerMode::Remote),
            other => Err(format!("unknown timer mode '{other}', expected local or remote")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerSnapshot {
    /// `HH:MM:SS`.
    pub elapsed: String,
    pub seconds: u64,
    pub running: bool,
    pub source: TimerMode,
}

impl TimerSnapshot {
    fn new(seconds: u64, running: bool, source: TimerMode) -> Self {
        Self {
            elapsed: format_hms(seconds),
            seconds,
            running,
            source,
        }
    }
}

#[derive(Debug, Default)]
struct Clock {
    mode: TimerMode,
    /// Local time accumulated before `started_at`.
    base: Duration,
    started_at: Option<Instant>,
    remote_seconds: u64,
    remote_running: bool,
    ticker: Option<JoinHandle<()>>,
}

impl Clock {
    fn local_elapsed(&self, now: Instant) -> Duration {
        match self.started_at {
            Some(started) => self.base + now.saturating_duration_since(started),
            None => self.base,
        }
    }

    fn snapshot(&self, now: Instant) -> TimerSnapshot {
        match self.mode {
            TimerMode::Local => TimerSnapshot::new(
                self.local_elapsed(now).as_secs(),
                self.started_at.is_some(),
                TimerMode::Local,
            ),
            TimerMode::Remote => {
                TimerSnapshot::new(self.remote_seconds, self.remote_running, TimerMode::Remote)
            }
        }
    }

    fn stop_ticker(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
    }
}

struct Shared {
    clock: Mutex<Clock>,
    snapshots: watch::Sender<TimerSnapshot>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Clock> {
        self.clock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn publish(&self, clock: &Clock) {
        self.snapshots.send_replace(clock.snapshot(Instant::now()));
    }
}

pub struct TimerReconciler {
    shared: Arc<Shared>,
}

impl Default for TimerReconciler {
    fn default() -> Self {
        Self::new(TimerMode::Local)
    }
}

impl TimerReconciler {
    pub fn new(mode: TimerMode) -> Self {
        let clock = Clock {
            mode,
            ..Clock::default()
        };
        let (snapshots, _) = watch::channel(clock.snapshot(Instant::now()));
        Self {
            shared: Arc::new(Shared {
                clock: Mutex::new(clock),
                snapshots,
            }),
        }
    }

    pub fn mode(&self) -> TimerMode {
        self.shared.lock().mode
    }

    pub fn set_mode(&self, mode: TimerMode) {
        let mut clock = self.shared.lock();
        if clock.mode == mode {
            return;
        }

        debug!("timer authority {} -> {mode}", clock.mode);
        clock.stop_ticker();
        *clock = Clock {
            mode,
            ..Clock::default()
        };
        self.shared.publish(&clock);
    }

    pub fn start(&self) {
        let mut clock = self.local("start");
        let Some(clock) = clock.as_mut() else {
            return;
        };
        if clock.started_at.is_some() {
            return;
        }

        clock.started_at = Some(Instant::now());
        clock.ticker = Some(self.spawn_ticker());
        self.shared.publish(clock);
    }

    /// Halts ticking; a later `start` resumes from the accumulated time.
    pub fn stop(&self) {
        let mut clock = self.local("stop");
        let Some(clock) = clock.as_mut() else {
            return;
        };
        let Some(started) = clock.started_at.take() else {
            return;
        };

        clock.base += Instant::now().saturating_duration_since(started);
        clock.stop_ticker();
        self.shared.publish(clock);
    }

    /// Back to `00:00:00`; a running timer keeps running from zero.
    pub fn reset(&self) {
        let mut clock = self.local("reset");
        let Some(clock) = clock.as_mut() else {
            return;
        };

        clock.base = Duration::ZERO;
        if clock.started_at.is_some() {
            clock.stop_ticker();
            clock.started_at = Some(Instant::now());
            clock.ticker = Some(self.spawn_ticker());
        }
        self.shared.publish(clock);
    }

    /// Applies a server status line. `true` if it described the timer and
    /// was taken into account.
    pub fn apply_status(&self, text: &str) -> bool {
        let Some(status) = TimerStatus::parse(text) else {
            return false;
        };
        let mut clock = self.remote("status");
        let Some(clock) = clock.as_mut() else {
            return false;
        };

        match status {
            // The server only reports elapsed time while its timer runs.
            TimerStatus::Elapsed(seconds) => {
                clock.remote_seconds = seconds;
                clock.remote_running = true;
            }
            TimerStatus::Started => clock.remote_running = true,
            TimerStatus::Stopped => clock.remote_running = false,
            TimerStatus::Reset => clock.remote_seconds = 0,
        }
        self.shared.publish(clock);
        true
    }

    pub fn apply_timer(&self, payload: &TimerPayload) -> bool {
        let mut clock = self.remote("timer object");
        let Some(clock) = clock.as_mut() else {
            return false;
        };

        if let Some(value) = &payload.value {
            match value.as_seconds() {
                Ok(seconds) => clock.remote_seconds = seconds,
                Err(e) => debug!("ignoring timer value: {e}"),
            }
        }
        if let Some(active) = payload.active {
            clock.remote_running = active;
        }
        self.shared.publish(clock);
        true
    }

    /// Current reading, computed now rather than at the last tick.
    pub fn snapshot(&self) -> TimerSnapshot {
        self.shared.lock().snapshot(Instant::now())
    }

    pub fn subscribe(&self) -> watch::Receiver<TimerSnapshot> {
        self.shared.snapshots.subscribe()
    }

    /// The clock, if local controls currently apply.
    fn local(&self, action: &str) -> Option<MutexGuard<'_, Clock>> {
        let clock = self.shared.lock();
        if clock.mode != TimerMode::Local {
            debug!("ignoring local timer {action} in remote mode");
            return None;
        }
        Some(clock)
    }

    fn remote(&self, input: &str) -> Option<MutexGuard<'_, Clock>> {
        let clock = self.shared.lock();
        if clock.mode != TimerMode::Remote {
            debug!("ignoring server timer {input} in local mode");
            return None;
        }
        Some(clock)
    }

    fn spawn_ticker(&self) -> JoinHandle<()> {
        let shared = Arc::downgrade(&self.shared);
        tokio::spawn(async move {
            let mut ticks = interval_at(Instant::now() + TICK, TICK);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticks.tick().await;
                let Some(shared) = shared.upgrade() else {
                    break;
                };
                let clock = shared.lock();
                shared.publish(&clock);
            }
        })
    }
}

impl Drop for TimerReconciler {
    fn drop(&mut self) {
        self.shared.lock().stop_ticker();
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
