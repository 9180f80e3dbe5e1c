use std::fmt;
use std::str::FromStr;

use serde_json::{Map, Value, json};

use crate::CodecError;

/// Everything the client can ask the presentation service to do.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Command {
    NextSlide,
    PrevSlide,
    StartPresentation,
    EndPresentation,
    BlankScreen,
    TimerStart,
    TimerStop,
    TimerReset,
    GotoSlide(u32),
    /// Negative counts skip backwards.
    SkipSlides(i32),
    /// Anything outside the vocabulary; sent uppercased as-is.
    Other(String),
}

impl Command {
    pub fn other(raw: &str) -> Self {
        Command::Other(raw.trim().to_uppercase())
    }

    pub fn token(&self) -> &str {
        match self {
            Command::NextSlide => "NEXT_SLIDE",
            Command::PrevSlide => "PREV_SLIDE",
            Command::StartPresentation => "START_PRESENTATION",
            Command::EndPresentation => "END_PRESENTATION",
            Command::BlankScreen => "BLANK_SCREEN",
            Command::TimerStart => "TIMER_START",
            Command::TimerStop => "TIMER_STOP",
            Command::TimerReset => "TIMER_RESET",
            Command::GotoSlide(_) => "GOTO_SLIDE",
            Command::SkipSlides(_) => "SKIP_SLIDES",
            Command::Other(token) => token,
        }
    }

    pub fn is_timer(&self) -> bool {
        matches!(
            self,
            Command::TimerStart | Command::TimerStop | Command::TimerReset
        )
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::GotoSlide(number) => write!(f, "{} {number}", self.token()),
            Command::SkipSlides(count) => write!(f, "{} {count}", self.token()),
            _ => f.write_str(self.token()),
        }
    }
}

/// Serializes a command into its outbound frame: `{"command": "<TOKEN>", ...}`.
pub fn encode_command(command: &Command) -> String {
    let mut frame: Map<String, Value> = Map::new();
    frame.insert("command".into(), json!(command.token()));

    match command {
        Command::GotoSlide(number) => {
            frame.insert("number".into(), json!(number));
        }
        Command::SkipSlides(count) => {
            frame.insert("count".into(), json!(count));
        }
        _ => {}
    }

    Value::Object(frame).to_string()
}

impl FromStr for Command {
    type Err = CodecError;

    /// Parses user vocabulary into a command.
    ///
    /// Accepts wire tokens (any case), the short words `next`, `prev`,
    /// `start`, `end`, `blank`, the forms `goto N`, `skip N` and
    /// `timer start|stop|reset`. Unknown input becomes [`Command::Other`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let words: Vec<&str> = s.split_whitespace().collect();
        let Some((head, rest)) = words.split_first() else {
            return Ok(Command::other(s));
        };
        let head = head.to_ascii_lowercase();

        let command = match (head.as_str(), rest) {
            ("next" | "next_slide", []) => Command::NextSlide,
            ("prev" | "previous" | "prev_slide", []) => Command::PrevSlide,
            ("start" | "start_presentation", []) => Command::StartPresentation,
            ("end" | "end_presentation", []) => Command::EndPresentation,
            ("blank" | "blank_screen", []) => Command::BlankScreen,
            ("timer_start", []) => Command::TimerStart,
            ("timer_stop", []) => Command::TimerStop,
            ("timer_reset", []) => Command::TimerReset,
            ("timer", [action]) => match action.to_ascii_lowercase().as_str() {
                "start" => Command::TimerStart,
                "stop" => Command::TimerStop,
                "reset" => Command::TimerReset,
                _ => Command::other(s),
            },
            ("goto" | "goto_slide", [number]) => {
                let number = number
                    .parse::<u32>()
                    .ok()
                    .filter(|n| *n > 0)
                    .ok_or_else(|| CodecError::BadArgument {
                        command: "GOTO_SLIDE",
                        value: number.to_string(),
                    })?;
                Command::GotoSlide(number)
            }
            ("skip" | "skip_slides", [count]) => {
                let count = count.parse::<i32>().map_err(|_| CodecError::BadArgument {
                    command: "SKIP_SLIDES",
                    value: count.to_string(),
                })?;
                Command::SkipSlides(count)
            }
            _ => Command::other(s),
        };

        Ok(command)
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
