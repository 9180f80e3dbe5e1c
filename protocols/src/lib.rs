//! Wire protocol spoken with the presentation-control service.
//!
//! Frames are single-line JSON objects carried as WebSocket text messages.
//! Outbound frames carry a [`Command`]; inbound frames are decoded into an
//! [`InboundFrame`] whose `status` text may describe timer state.

pub mod command;
pub mod frame;
pub mod status;

pub use command::{Command, encode_command};
pub use frame::{InboundFrame, TimerPayload, TimerValue, encode_pong};
pub use status::{TimerStatus, format_hms, parse_hms};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("invalid JSON frame: {0}")]
    Json(#[from] serde_json::Error),
    #[error("frame is not a JSON object")]
    NotAnObject,
    #[error("invalid argument for {command}: '{value}'")]
    BadArgument { command: &'static str, value: String },
    #[error("invalid duration '{0}', expected HH:MM:SS")]
    BadDuration(String),
}
