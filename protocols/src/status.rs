//! Timer state carried inside free-form status lines.
//!
//! The service has no dedicated timer frame in older releases; it reports
//! the timer through `status` text such as `"elapsed: 00:03:10"` or, for the
//! Portuguese server builds, `"Tempo decorrido: 00:03:10"`.

use crate::CodecError;

const ELAPSED_MARKERS: [&str; 2] = ["elapsed:", "tempo decorrido:"];
const TIMER_NOUNS: [&str; 2] = ["timer", "temporizador"];
const STARTED_WORDS: [&str; 2] = ["started", "iniciado"];
const STOPPED_WORDS: [&str; 3] = ["stopped", "paused", "parado"];
const RESET_WORDS: [&str; 2] = ["reset", "resetado"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerStatus {
    Elapsed(u64),
    Started,
    Stopped,
    Reset,
}

impl TimerStatus {
    /// Recognises a timer status line; anything else yields `None`.
    ///
    /// Bare keywords (`"started"`) match, as do phrases naming the timer
    /// (`"Timer stopped"`, `"Temporizador resetado"`). A status about
    /// something else, like `"Presentation started"`, does not.
    pub fn parse(text: &str) -> Option<TimerStatus> {
        let lower = text.trim().to_lowercase();

        for marker in ELAPSED_MARKERS {
            if let Some(idx) = lower.find(marker) {
                let rest = lower[idx + marker.len()..].trim_start();
                let clock: String = rest
                    .chars()
                    .take_while(|c| c.is_ascii_digit() || *c == ':')
                    .collect();
                return parse_hms(&clock).ok().map(TimerStatus::Elapsed);
            }
        }

        let words: Vec<&str> = lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|word| !word.is_empty())
            .collect();
        let about_timer = words.len() == 1 || words.iter().any(|w| TIMER_NOUNS.contains(w));
        if !about_timer {
            return None;
        }

        let has = |set: &[&str]| words.iter().any(|w| set.contains(w));
        if has(&RESET_WORDS) {
            Some(TimerStatus::Reset)
        } else if has(&STOPPED_WORDS) {
            Some(TimerStatus::Stopped)
        } else if has(&STARTED_WORDS) {
            Some(TimerStatus::Started)
        } else {
            None
        }
    }
}

/// `3725` → `"01:02:05"`. Hours are not capped at 99.
pub fn format_hms(total_secs: u64) -> String {
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

/// `"01:02:05"` → `3725`. Minutes and seconds must be below 60.
pub fn parse_hms(text: &str) -> Result<u64, CodecError> {
    let bad = || CodecError::BadDuration(text.to_string());

    let parts: Vec<u64> = text
        .trim()
        .split(':')
        .map(|part| part.parse::<u64>())
        .collect::<Result<Vec<u64>, _>>()
        .map_err(|_| bad())?;

    match parts.as_slice() {
        [h, m, s] if *m < 60 && *s < 60 => h
            .checked_mul(3600)
            .and_then(|hours| hours.checked_add(m * 60 + s))
            .ok_or_else(bad),
        _ => Err(bad()),
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
