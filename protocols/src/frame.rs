use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{Value, json};

use crate::CodecError;
use crate::status::parse_hms;

/// A decoded server → client frame. Every field is optional; unknown keys
/// are ignored so newer servers stay compatible. A field of the wrong type
/// reads as absent and does not reject the rest of the frame.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct InboundFrame {
    /// Free-form status line; may describe timer state.
    #[serde(default, deserialize_with = "lenient")]
    pub status: Option<String>,
    /// Liveness probe from the server; must be echoed back as `pong`.
    #[serde(default)]
    pub ping: Option<Value>,
    /// Set when the server is going away.
    #[serde(default, deserialize_with = "lenient")]
    pub server_shutdown: bool,
    #[serde(default, deserialize_with = "lenient")]
    pub timer: Option<TimerPayload>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TimerPayload {
    #[serde(default, deserialize_with = "lenient")]
    pub value: Option<TimerValue>,
    #[serde(default, deserialize_with = "lenient")]
    pub active: Option<bool>,
}

fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

/// Servers report elapsed time either formatted or as whole seconds.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TimerValue {
    Seconds(u64),
    Formatted(String),
}

impl TimerValue {
    pub fn as_seconds(&self) -> Result<u64, CodecError> {
        match self {
            TimerValue::Seconds(secs) => Ok(*secs),
            TimerValue::Formatted(text) => parse_hms(text),
        }
    }
}

impl InboundFrame {
    pub fn decode(text: &str) -> Result<Self, CodecError> {
        let value: Value = serde_json::from_str(text)?;
        if !value.is_object() {
            return Err(CodecError::NotAnObject);
        }
        Ok(serde_json::from_value(value)?)
    }

    /// `ping` with a JSON `null` is treated as absent, like an empty field.
    pub fn ping_token(&self) -> Option<&Value> {
        self.ping.as_ref().filter(|value| !value.is_null())
    }
}

/// Reply to a server ping, echoing its value untouched.
pub fn encode_pong(token: &Value) -> String {
    json!({ "pong": token }).to_string()
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
